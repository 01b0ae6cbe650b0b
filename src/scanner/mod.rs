//! Scanner module for directory traversal and content hashing.
//!
//! The scanner is divided into submodules:
//! - [`walker`]: fd-relative directory traversal and inode coalescing
//! - [`hasher`]: SHA-256 content hashing over read-only memory maps
//! - [`exclude`]: glob-based entry name exclusion
//!
//! Discovery produces one [`InodeRecord`] per distinct inode, carrying the
//! full set of paths that refer to it. Hard links found during the walk are
//! therefore coalesced up front instead of being treated as duplicates.

pub mod exclude;
pub mod hasher;
pub mod walker;

use std::collections::HashMap;
use std::path::PathBuf;

use nix::sys::stat::FileStat;

pub use exclude::ExcludeSet;
pub use hasher::{hash_to_hex, Digest, Hasher, HASH_CHUNK_SIZE};
pub use walker::Walker;

/// Modification time with nanosecond resolution.
///
/// Ordering is lexicographic over (seconds, nanoseconds), which is what the
/// relinker's oldest-first keeper selection relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mtime {
    /// Seconds since the Unix epoch.
    pub sec: i64,
    /// Nanosecond remainder.
    pub nsec: i64,
}

impl Mtime {
    #[must_use]
    pub fn new(sec: i64, nsec: i64) -> Self {
        Self { sec, nsec }
    }
}

/// A distinct inode discovered during the walk.
///
/// Created on first encounter of its inode number; later encounters of the
/// same inode only append to `paths`. The digest is filled in lazily by the
/// hashing stage and stays `None` for inodes that never become duplicate
/// candidates.
#[derive(Debug, Clone)]
pub struct InodeRecord {
    /// Inode number on the run's root device.
    pub ino: u64,
    /// File size in bytes at discovery time.
    pub size: u64,
    /// Modification time at discovery time.
    pub mtime: Mtime,
    /// SHA-256 of the file contents, filled by the hashing stage.
    pub digest: Option<Digest>,
    /// Every path that referred to this inode, in discovery order.
    pub paths: Vec<PathBuf>,
}

impl InodeRecord {
    /// Build a record from a `fstatat` result and the first discovered path.
    #[must_use]
    pub fn from_stat(stat: &FileStat, first_path: PathBuf) -> Self {
        Self {
            ino: stat.st_ino,
            size: stat.st_size.max(0) as u64,
            mtime: Mtime::new(stat.st_mtime, stat.st_mtime_nsec),
            digest: None,
            paths: vec![first_path],
        }
    }
}

/// Arena of inode records plus an inode-number index.
///
/// Records are appended during the walk and never removed; size buckets,
/// the hash worklist and digest groups all refer to records by arena index.
#[derive(Debug, Default)]
pub struct InodeTable {
    records: Vec<InodeRecord>,
    by_ino: HashMap<u64, usize>,
}

impl InodeTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All records, in discovery order.
    #[must_use]
    pub fn records(&self) -> &[InodeRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Arena index for an already-seen inode number.
    #[must_use]
    pub fn lookup(&self, ino: u64) -> Option<usize> {
        self.by_ino.get(&ino).copied()
    }

    /// Insert a freshly stat'ed record, returning its arena index.
    pub fn insert(&mut self, ino: u64, record: InodeRecord) -> usize {
        let idx = self.records.len();
        self.records.push(record);
        self.by_ino.insert(ino, idx);
        idx
    }

    /// Record one more path referring to an existing inode.
    pub fn push_path(&mut self, idx: usize, path: PathBuf) {
        self.records[idx].paths.push(path);
    }

    pub fn set_digest(&mut self, idx: usize, digest: Digest) {
        self.records[idx].digest = Some(digest);
    }
}

/// Errors surfaced by the hashing stage.
///
/// Walk-stage failures are reported on the diagnostic channel and skipped
/// inline; hashing failures are typed because the pipeline must drop the
/// affected inode from the candidate set.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// Every path of the inode failed to open for reading.
    #[error("no readable path for inode {ino} (last: {path})")]
    NoReadablePath {
        /// Inode number that could not be opened.
        ino: u64,
        /// The last path that was attempted.
        path: PathBuf,
    },

    /// Memory-mapping the file failed.
    #[error("mmap failed for {path}: {source}")]
    Mmap {
        /// Path that was being mapped.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mtime_orders_by_seconds_then_nanos() {
        assert!(Mtime::new(1, 999_999_999) < Mtime::new(2, 0));
        assert!(Mtime::new(5, 10) < Mtime::new(5, 11));
        assert_eq!(Mtime::new(5, 10), Mtime::new(5, 10));
    }

    #[test]
    fn table_coalesces_by_inode_number() {
        let mut table = InodeTable::new();
        assert!(table.lookup(42).is_none());

        let record = InodeRecord {
            ino: 42,
            size: 128,
            mtime: Mtime::new(100, 0),
            digest: None,
            paths: vec![PathBuf::from("a/x")],
        };
        let idx = table.insert(42, record);

        assert_eq!(table.lookup(42), Some(idx));
        table.push_path(idx, PathBuf::from("b/y"));
        assert_eq!(table.records()[idx].paths.len(), 2);
        assert_eq!(table.records()[idx].paths[0], PathBuf::from("a/x"));
    }

    #[test]
    fn digest_starts_unset() {
        let mut table = InodeTable::new();
        let idx = table.insert(
            7,
            InodeRecord {
                ino: 7,
                size: 0,
                mtime: Mtime::new(0, 0),
                digest: None,
                paths: vec![PathBuf::from("f")],
            },
        );
        assert!(table.records()[idx].digest.is_none());
        table.set_digest(idx, [0xAB; 32]);
        assert_eq!(table.records()[idx].digest, Some([0xAB; 32]));
    }
}
