//! Directory walker built on fd-relative syscalls.
//!
//! # Overview
//!
//! The walker descends each root with an `openat` + `Dir` iteration pattern:
//! child entries are always resolved against their parent's open directory
//! handle, never against a rebuilt path string. This tolerates path
//! components being renamed mid-walk and avoids TOCTOU races between
//! `readdir` and `stat`.
//!
//! Every directory is `fstat`ed right after opening and compared against the
//! run's root device; a mismatch is reported as `EXDEV` and the directory is
//! skipped, so the walk never crosses a mount point.
//!
//! Regular files are coalesced into the [`InodeTable`] by inode number: the
//! first sighting stats the entry (without following symlinks) and creates
//! an [`InodeRecord`]; later sightings only append the new path.

use std::ffi::OsStr;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use nix::dir::{Dir, Type};
use nix::errno::Errno;
use nix::fcntl::{open, openat, AtFlags, OFlag};
use nix::sys::stat::{fstat, fstatat, FileStat, Mode};

use super::{ExcludeSet, InodeRecord, InodeTable};
use crate::progress::Progress;

const DIR_OPEN_FLAGS: OFlag = OFlag::O_RDONLY
    .union(OFlag::O_DIRECTORY)
    .union(OFlag::O_CLOEXEC);

/// Recursive directory walker bound to a single device.
///
/// All failures below the root (unreadable directory, vanished entry,
/// cross-device mount) are reported on the diagnostic channel and skipped;
/// the walk always continues.
pub struct Walker<'a> {
    device: u64,
    excludes: &'a ExcludeSet,
    progress: &'a Progress,
}

impl<'a> Walker<'a> {
    #[must_use]
    pub fn new(device: u64, excludes: &'a ExcludeSet, progress: &'a Progress) -> Self {
        Self {
            device,
            excludes,
            progress,
        }
    }

    /// Walk one root directory, accumulating records into `table`.
    pub fn walk_root(&self, root: &Path, table: &mut InodeTable) {
        self.progress.scan_dir(root);

        match open(root, DIR_OPEN_FLAGS, Mode::empty()) {
            Ok(fd) => self.scan_open_dir(&fd, root, table),
            Err(err) => log::warn!("{}: {}", root.display(), err),
        }
    }

    fn scan_open_dir(&self, fd: &OwnedFd, dpath: &Path, table: &mut InodeTable) {
        let stat = match fstat(fd.as_fd()) {
            Ok(stat) => stat,
            Err(err) => {
                log::warn!("{}: {}", dpath.display(), err);
                return;
            }
        };
        if stat.st_dev != self.device {
            log::warn!("{}: {}", dpath.display(), Errno::EXDEV);
            return;
        }

        // A second fd for iteration keeps `fd` usable as the *at anchor.
        let mut dir = match Dir::openat(fd.as_fd(), ".", OFlag::O_RDONLY | OFlag::O_CLOEXEC, Mode::empty()) {
            Ok(dir) => dir,
            Err(err) => {
                log::warn!("{}: {}", dpath.display(), err);
                return;
            }
        };

        for entry in dir.iter() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("{}: {}", dpath.display(), err);
                    continue;
                }
            };

            let name = entry.file_name();
            let name_os = OsStr::from_bytes(name.to_bytes());
            if name_os == "." || name_os == ".." || self.excludes.is_match(name_os) {
                continue;
            }

            let child_path = dpath.join(name_os);
            match entry.file_type() {
                Some(Type::Directory) => self.descend(fd.as_fd(), &child_path, name_os, table),
                Some(Type::File) => {
                    self.record_file(fd.as_fd(), entry.ino(), name_os, child_path, table);
                }
                Some(_) => {}
                None => {
                    // Filesystem did not report a dirent type; classify by stat.
                    match fstatat(fd.as_fd(), name_os, AtFlags::AT_SYMLINK_NOFOLLOW) {
                        Ok(stat) if is_dir(&stat) => {
                            self.descend(fd.as_fd(), &child_path, name_os, table);
                        }
                        Ok(stat) if is_regular(&stat) => {
                            self.record_stated(stat, child_path, table);
                        }
                        Ok(_) => {}
                        Err(err) => log::warn!("{}: {}", child_path.display(), err),
                    }
                }
            }
        }
    }

    fn descend(&self, parent: BorrowedFd<'_>, child_path: &Path, name: &OsStr, table: &mut InodeTable) {
        self.progress.scan_dir(child_path);

        match openat(parent, name, DIR_OPEN_FLAGS, Mode::empty()) {
            Ok(fd) => self.scan_open_dir(&fd, child_path, table),
            Err(err) => log::warn!("{}: {}", child_path.display(), err),
        }
    }

    fn record_file(
        &self,
        parent: BorrowedFd<'_>,
        ino: u64,
        name: &OsStr,
        path: PathBuf,
        table: &mut InodeTable,
    ) {
        if let Some(idx) = table.lookup(ino) {
            table.push_path(idx, path);
            return;
        }

        match fstatat(parent, name, AtFlags::AT_SYMLINK_NOFOLLOW) {
            Ok(stat) if is_regular(&stat) => {
                table.insert(ino, InodeRecord::from_stat(&stat, path));
            }
            // The entry stopped being a regular file between readdir and stat.
            Ok(_) => {}
            Err(err) => log::warn!("{}: {}", path.display(), err),
        }
    }

    fn record_stated(&self, stat: FileStat, path: PathBuf, table: &mut InodeTable) {
        if let Some(idx) = table.lookup(stat.st_ino) {
            table.push_path(idx, path);
        } else {
            table.insert(stat.st_ino, InodeRecord::from_stat(&stat, path));
        }
    }
}

fn is_dir(stat: &FileStat) -> bool {
    stat.st_mode & libc::S_IFMT == libc::S_IFDIR
}

fn is_regular(stat: &FileStat) -> bool {
    stat.st_mode & libc::S_IFMT == libc::S_IFREG
}
