//! Duplicate detection pipeline.
//!
//! - [`buckets`]: size bucketing, hash worklist selection, digest grouping
//! - [`finder`]: the [`Deduplicator`] that runs the stages in sequence

pub mod buckets;
pub mod finder;

pub use buckets::{collect_candidates, group_by_digest, DigestGroup, HashWorklist};
pub use finder::{DedupeConfig, Deduplicator, FinderError, ScanSummary};
