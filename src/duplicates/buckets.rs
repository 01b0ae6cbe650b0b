//! Size bucketing, hash worklist selection, and digest grouping.
//!
//! Size is a necessary condition for content equality, so inodes whose size
//! is unique in the tree are dropped before any byte of content is read.
//! After hashing, the same winnowing happens again on digests. Empty files
//! take part like any other size bucket: two zero-length files are genuine
//! duplicates of each other.

use std::collections::HashMap;

use crate::scanner::{Digest, InodeTable};

/// Inodes selected for hashing, ordered by ascending file size.
#[derive(Debug, Default)]
pub struct HashWorklist {
    /// Arena indices into the inode table.
    pub records: Vec<usize>,
    /// Total bytes across the worklist, for progress reporting.
    pub total_bytes: u64,
}

/// Inodes sharing one content digest.
#[derive(Debug)]
pub struct DigestGroup {
    pub digest: Digest,
    /// Arena indices of the members; at least two.
    pub members: Vec<usize>,
}

/// Bucket all inodes by size and keep only sizes seen more than once.
///
/// The surviving records are returned sorted ascending by size; ties keep
/// their bucket order, which is arbitrary but stable within a run.
#[must_use]
pub fn collect_candidates(table: &InodeTable) -> HashWorklist {
    let mut buckets: HashMap<u64, Vec<usize>> = HashMap::new();
    for (idx, record) in table.records().iter().enumerate() {
        buckets.entry(record.size).or_default().push(idx);
    }

    let mut worklist = HashWorklist::default();
    for (size, members) in buckets {
        if members.len() < 2 {
            continue;
        }
        worklist.total_bytes += size * members.len() as u64;
        worklist.records.extend(members);
    }
    worklist
        .records
        .sort_by_key(|&idx| table.records()[idx].size);

    log::debug!(
        "{} of {} inodes need hashing ({} bytes)",
        worklist.records.len(),
        table.len(),
        worklist.total_bytes
    );
    worklist
}

/// Bucket hashed inodes by digest, keep only digests seen more than once,
/// and order the groups by digest so output is deterministic across runs.
#[must_use]
pub fn group_by_digest(table: &InodeTable) -> Vec<DigestGroup> {
    let mut buckets: HashMap<Digest, Vec<usize>> = HashMap::new();
    for (idx, record) in table.records().iter().enumerate() {
        if let Some(digest) = record.digest {
            buckets.entry(digest).or_default().push(idx);
        }
    }

    let mut groups: Vec<DigestGroup> = buckets
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(digest, members)| DigestGroup { digest, members })
        .collect();
    groups.sort_by(|a, b| a.digest.cmp(&b.digest));
    groups
}
