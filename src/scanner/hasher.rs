//! SHA-256 content hashing over read-only memory maps.
//!
//! The digest always covers exactly the length recorded at discovery time,
//! not whatever end-of-file happens to be reached at hash time. Large files
//! are fed to the streaming hasher in fixed chunks so byte-level progress
//! can be reported mid-file; the result is bit-identical to a single-shot
//! hash. Zero-length files never create a mapping and take the digest of
//! empty input.

use std::fs::File;
use std::os::fd::AsFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use memmap2::MmapOptions;
use sha2::{Digest as _, Sha256};

use super::{HashError, InodeRecord};
use crate::cache::XattrCache;
use crate::progress::Progress;

/// 32-byte SHA-256 digest of a file's contents.
pub type Digest = [u8; 32];

/// Chunk size fed to the streaming hasher, sized for progress granularity.
pub const HASH_CHUNK_SIZE: usize = 32 * 1024 * 1024;

/// Render a digest as lowercase hex.
#[must_use]
pub fn hash_to_hex(digest: &Digest) -> String {
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Content hasher with an optional extended-attribute digest cache.
pub struct Hasher<'a> {
    cache: &'a XattrCache,
    progress: &'a Progress,
}

impl<'a> Hasher<'a> {
    #[must_use]
    pub fn new(cache: &'a XattrCache, progress: &'a Progress) -> Self {
        Self { cache, progress }
    }

    /// Compute (or recall from cache) the digest for one inode.
    ///
    /// The record's paths are tried in discovery order; the first that opens
    /// read-only without following symlinks is used. Open failures along the
    /// way are reported and the next path is tried.
    ///
    /// # Errors
    ///
    /// [`HashError::NoReadablePath`] when every path fails to open and
    /// [`HashError::Mmap`] when the mapping fails; in both cases the caller
    /// drops the inode from the candidate set.
    pub fn hash_inode(&self, record: &InodeRecord) -> Result<Digest, HashError> {
        let (file, path) = self.open_any(record)?;
        self.progress.hash_file(path);

        if let Some(digest) = self.cache.load(file.as_fd(), record.mtime) {
            log::debug!("{}: digest served from xattr cache", path.display());
            self.progress.hash_advance(record.size);
            return Ok(digest);
        }

        let digest = self.hash_contents(&file, path, record.size)?;
        self.cache.store(file.as_fd(), &digest, record.mtime);
        Ok(digest)
    }

    fn open_any<'r>(&self, record: &'r InodeRecord) -> Result<(File, &'r Path), HashError> {
        for path in &record.paths {
            match File::options()
                .read(true)
                .custom_flags(libc::O_NOFOLLOW | libc::O_CLOEXEC)
                .open(path)
            {
                Ok(file) => return Ok((file, path)),
                Err(err) => log::warn!("{}: {}", path.display(), err),
            }
        }
        Err(HashError::NoReadablePath {
            ino: record.ino,
            path: record
                .paths
                .last()
                .cloned()
                .unwrap_or_else(|| PathBuf::from("?")),
        })
    }

    fn hash_contents(&self, file: &File, path: &Path, size: u64) -> Result<Digest, HashError> {
        let mut hasher = Sha256::new();

        if size > 0 {
            let map = unsafe { MmapOptions::new().len(size as usize).map(file) }.map_err(
                |source| HashError::Mmap {
                    path: path.to_path_buf(),
                    source,
                },
            )?;
            for chunk in map.chunks(HASH_CHUNK_SIZE) {
                hasher.update(chunk);
                self.progress.hash_advance(chunk.len() as u64);
            }
        }

        Ok(hasher.finalize().into())
    }
}
