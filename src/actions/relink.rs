//! Crash-safe replacement of duplicate paths with hard links.
//!
//! # Replacement protocol
//!
//! For every path `D` of every non-keeper inode in a duplicate group:
//!
//! 1. a temporary name `.tmp<HEX8>~` is generated in `D`'s parent directory
//!    from 32 bits of OS-seeded randomness;
//! 2. the temporary is created as a hard link to one of the keeper's paths,
//!    tried in discovery order (`AlreadyExists` regenerates the name and
//!    starts over; other failures advance to the next keeper path);
//! 3. the temporary is renamed over `D`.
//!
//! Rename over an existing entry is atomic on a POSIX filesystem when both
//! names live on one device, which the walker's mount-point check
//! guarantees. At no instant does `D` stop resolving to valid content: it
//! points at the old inode until the rename commits, at the keeper's inode
//! after. A failed rename unlinks the temporary and leaves `D` untouched.
//!
//! The keeper of a group is its oldest member by mtime, with the inode
//! number as the deterministic tiebreak.

use std::fs;
use std::io;
use std::path::Path;

use crate::duplicates::buckets::DigestGroup;
use crate::report::Reporter;
use crate::scanner::{InodeRecord, InodeTable};

/// Counters reported at the end of the run.
///
/// `relinked_size` adds the keeper's size once per replaced path, so it is
/// an upper bound on space actually freed: other hard links to a replaced
/// inode may keep its extent alive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelinkStats {
    /// Paths successfully renamed onto keeper links.
    pub relinked_count: u64,
    /// Upper bound on reclaimed bytes.
    pub relinked_size: u64,
}

/// Behavior switches for the relink stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelinkOptions {
    /// Report groups but perform no filesystem mutation.
    pub dry_run: bool,
    /// Ask for confirmation before each group.
    pub interactive: bool,
    /// Print each duplicate group before acting on it.
    pub verbose: bool,
}

enum LinkOutcome {
    /// The temporary now links to keeper content.
    Linked,
    /// The temporary name is taken; pick a new one.
    Collision,
    /// Every keeper path failed; give up on this destination.
    Failed,
}

/// Executes the replacement protocol over digest groups.
pub struct Relinker<'a> {
    options: RelinkOptions,
    reporter: &'a Reporter,
}

impl<'a> Relinker<'a> {
    #[must_use]
    pub fn new(options: RelinkOptions, reporter: &'a Reporter) -> Self {
        Self { options, reporter }
    }

    /// Relink every non-keeper path of one duplicate group.
    ///
    /// Failures are reported per path; the rest of the group still
    /// proceeds. Statistics only count completed renames.
    pub fn relink_group(&self, table: &InodeTable, group: &DigestGroup, stats: &mut RelinkStats) {
        let mut ordered: Vec<&InodeRecord> = group
            .members
            .iter()
            .map(|&idx| &table.records()[idx])
            .collect();
        ordered.sort_by_key(|record| (record.mtime, record.ino));

        if self.options.verbose || self.options.interactive {
            self.reporter.print_group(&group.digest, &ordered);
        }
        if self.options.interactive && !self.reporter.confirm_relink() {
            return;
        }
        if self.options.dry_run {
            return;
        }

        let keeper = ordered[0];
        for duplicate in &ordered[1..] {
            for dest in &duplicate.paths {
                if self.replace_path(keeper, dest) {
                    stats.relinked_count += 1;
                    stats.relinked_size += keeper.size;
                }
            }
        }
    }

    fn replace_path(&self, keeper: &InodeRecord, dest: &Path) -> bool {
        let parent = dest.parent().unwrap_or_else(|| Path::new("."));

        let tmp = loop {
            let candidate = parent.join(format!(".tmp{:08X}~", rand::random::<u32>()));
            match self.link_any(keeper, &candidate) {
                LinkOutcome::Linked => break candidate,
                LinkOutcome::Collision => continue,
                LinkOutcome::Failed => return false,
            }
        };

        if let Err(err) = fs::rename(&tmp, dest) {
            log::warn!("{}: {}", tmp.display(), err);
            if let Err(err) = fs::remove_file(&tmp) {
                log::warn!("{}: {}", tmp.display(), err);
            }
            return false;
        }

        log::debug!("relinked {}", dest.display());
        true
    }

    fn link_any(&self, keeper: &InodeRecord, tmp: &Path) -> LinkOutcome {
        for source in &keeper.paths {
            match fs::hard_link(source, tmp) {
                Ok(()) => return LinkOutcome::Linked,
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    return LinkOutcome::Collision;
                }
                Err(err) => log::warn!("{}: {}", source.display(), err),
            }
        }
        LinkOutcome::Failed
    }
}
