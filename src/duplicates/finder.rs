//! Pipeline orchestration.
//!
//! [`Deduplicator::run`] executes the stages strictly in sequence over a
//! single mutable state: walk and coalesce, bucket by size, hash the
//! candidates, group by digest, relink each group, then summarize. There is
//! no parallelism anywhere; every stage finishes before the next starts.

use std::path::{Path, PathBuf};

use crate::actions::relink::{RelinkOptions, RelinkStats, Relinker};
use crate::cache::XattrCache;
use crate::duplicates::buckets::{collect_candidates, group_by_digest};
use crate::progress::Progress;
use crate::report::Reporter;
use crate::scanner::{ExcludeSet, Hasher, InodeTable, Walker};

/// Errors that abort the run before any filesystem work happens.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The first root could not be stat'ed, so there is no reference device.
    #[error("{path}: {source}")]
    RootStat {
        /// The root that failed.
        path: PathBuf,
        /// The underlying errno.
        source: nix::errno::Errno,
    },

    /// An exclude pattern failed to compile.
    #[error("invalid exclude pattern: {0}")]
    Pattern(#[from] globset::Error),
}

/// Run configuration assembled from the command line.
#[derive(Debug, Clone, Default)]
pub struct DedupeConfig {
    /// Directory roots to scan, already normalized.
    pub dirs: Vec<PathBuf>,
    /// Glob patterns excluding entry names from the walk.
    pub exclude: Vec<String>,
    /// Skip all filesystem mutations.
    pub dry_run: bool,
    /// Prompt before relinking each duplicate group.
    pub interactive: bool,
    /// Read and write the digest cache in user extended attributes.
    pub use_xattrs: bool,
    /// Emit progress and duplicate-group reports.
    pub verbose: bool,
    /// Disable colors and animated progress output.
    pub boring: bool,
}

impl DedupeConfig {
    #[must_use]
    pub fn with_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.dirs = dirs;
        self
    }

    #[must_use]
    pub fn with_exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns;
        self
    }

    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    #[must_use]
    pub fn with_use_xattrs(mut self, use_xattrs: bool) -> Self {
        self.use_xattrs = use_xattrs;
        self
    }

    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub fn with_boring(mut self, boring: bool) -> Self {
        self.boring = boring;
        self
    }
}

/// What a run saw and did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Distinct inodes discovered by the walk.
    pub inodes: usize,
    /// Inodes that entered the hash worklist.
    pub candidates: usize,
    /// Total bytes across the hash worklist.
    pub candidate_bytes: u64,
    /// Duplicate groups found.
    pub groups: usize,
    /// Paths replaced with hard links.
    pub relinked_count: u64,
    /// Upper bound on bytes reclaimed.
    pub relinked_size: u64,
}

/// Single-threaded deduplication driver.
pub struct Deduplicator {
    config: DedupeConfig,
}

impl Deduplicator {
    #[must_use]
    pub fn new(config: DedupeConfig) -> Self {
        Self { config }
    }

    /// Execute the full pipeline.
    ///
    /// # Errors
    ///
    /// Fails only on setup: an uncompilable exclude pattern or an
    /// un-stat-able first root. Everything after that degrades per file.
    pub fn run(&self) -> Result<ScanSummary, FinderError> {
        let excludes = ExcludeSet::new(&self.config.exclude)?;
        let device = self.root_device()?;
        let progress = Progress::new(self.config.verbose, self.config.boring);
        let reporter = Reporter::new(self.config.verbose, self.config.boring);

        let mut table = InodeTable::new();
        {
            let walker = Walker::new(device, &excludes, &progress);
            for dir in &self.config.dirs {
                walker.walk_root(dir, &mut table);
            }
        }
        progress.scan_done();
        log::debug!("walk complete: {} distinct inodes", table.len());

        let worklist = collect_candidates(&table);
        let mut summary = ScanSummary {
            inodes: table.len(),
            candidates: worklist.records.len(),
            candidate_bytes: worklist.total_bytes,
            ..ScanSummary::default()
        };

        progress.hash_start(worklist.total_bytes);
        let cache = XattrCache::new(self.config.use_xattrs);
        let hasher = Hasher::new(&cache, &progress);
        let mut hashed_bytes = 0u64;
        for &idx in &worklist.records {
            match hasher.hash_inode(&table.records()[idx]) {
                Ok(digest) => table.set_digest(idx, digest),
                Err(err) => log::warn!("{err}"),
            }
            hashed_bytes += table.records()[idx].size;
            progress.hash_position(hashed_bytes);
        }
        progress.hash_done();

        let groups = group_by_digest(&table);
        summary.groups = groups.len();
        log::debug!("{} duplicate groups", groups.len());

        let mut stats = RelinkStats::default();
        let relinker = Relinker::new(
            RelinkOptions {
                dry_run: self.config.dry_run,
                interactive: self.config.interactive,
                verbose: self.config.verbose,
            },
            &reporter,
        );
        for group in &groups {
            relinker.relink_group(&table, group, &mut stats);
        }

        summary.relinked_count = stats.relinked_count;
        summary.relinked_size = stats.relinked_size;
        reporter.summary(&stats);
        Ok(summary)
    }

    /// `st_dev` of the first root; every descent is checked against it.
    fn root_device(&self) -> Result<u64, FinderError> {
        let first = self
            .config
            .dirs
            .first()
            .map_or_else(|| Path::new("."), PathBuf::as_path);
        let stat = nix::sys::stat::stat(first).map_err(|source| FinderError::RootStat {
            path: first.to_path_buf(),
            source,
        })?;
        Ok(stat.st_dev)
    }
}
