//! Opt-in digest cache kept in user extended attributes.
//!
//! When enabled, a successfully computed digest is stored on the file itself
//! under `user.dedupe.hash`, together with the file's mtime at hash time
//! under `user.dedupe.hash_mtime`. A later run can then skip mapping and
//! hashing any file whose mtime still matches.
//!
//! The cache is advisory: every attribute read or write failure is tolerated
//! and at most logged at debug level. A stored digest with no mtime
//! companion is accepted unconditionally, which keeps caches written by
//! older versions (before the mtime attribute existed) usable.

use std::ffi::CStr;
use std::os::fd::BorrowedFd;

use crate::scanner::{Digest, Mtime};

/// Attribute holding the 32 raw digest bytes.
pub const HASH_ATTR: &CStr = c"user.dedupe.hash";
/// Attribute holding the mtime at hash time: native-endian i64 seconds
/// followed by native-endian i64 nanoseconds.
pub const HASH_MTIME_ATTR: &CStr = c"user.dedupe.hash_mtime";

const MTIME_LEN: usize = 16;

/// Extended-attribute digest cache; a disabled instance never touches
/// attributes at all.
#[derive(Debug, Clone, Copy)]
pub struct XattrCache {
    enabled: bool,
}

impl XattrCache {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Fetch a cached digest for a file whose current mtime is `mtime`.
    ///
    /// Returns `Some` only when the stored digest has the exact digest
    /// length and either the stored mtime matches or no mtime attribute is
    /// present.
    #[must_use]
    pub fn load(&self, fd: BorrowedFd<'_>, mtime: Mtime) -> Option<Digest> {
        if !self.enabled {
            return None;
        }

        let mut digest = [0u8; 32];
        if sys::fgetxattr(fd, HASH_ATTR, &mut digest) != Some(digest.len()) {
            return None;
        }

        let mut stored = [0u8; MTIME_LEN];
        match sys::fgetxattr(fd, HASH_MTIME_ATTR, &mut stored) {
            // Digest written by a version that predates the mtime attribute.
            None => Some(digest),
            Some(MTIME_LEN) if stored == encode_mtime(mtime) => Some(digest),
            Some(_) => None,
        }
    }

    /// Store a freshly computed digest and the mtime it was computed at.
    pub fn store(&self, fd: BorrowedFd<'_>, digest: &Digest, mtime: Mtime) {
        if !self.enabled {
            return;
        }

        if !sys::fsetxattr(fd, HASH_ATTR, digest) {
            log::debug!("failed to store digest xattr");
            return;
        }
        if !sys::fsetxattr(fd, HASH_MTIME_ATTR, &encode_mtime(mtime)) {
            log::debug!("failed to store digest mtime xattr");
        }
    }
}

fn encode_mtime(mtime: Mtime) -> [u8; MTIME_LEN] {
    let mut out = [0u8; MTIME_LEN];
    out[..8].copy_from_slice(&mtime.sec.to_ne_bytes());
    out[8..].copy_from_slice(&mtime.nsec.to_ne_bytes());
    out
}

#[cfg(target_os = "linux")]
mod sys {
    use std::ffi::CStr;
    use std::os::fd::{AsRawFd, BorrowedFd};

    pub fn fgetxattr(fd: BorrowedFd<'_>, name: &CStr, buf: &mut [u8]) -> Option<usize> {
        let ret = unsafe {
            libc::fgetxattr(
                fd.as_raw_fd(),
                name.as_ptr(),
                buf.as_mut_ptr().cast(),
                buf.len(),
            )
        };
        usize::try_from(ret).ok()
    }

    pub fn fsetxattr(fd: BorrowedFd<'_>, name: &CStr, value: &[u8]) -> bool {
        let ret = unsafe {
            libc::fsetxattr(
                fd.as_raw_fd(),
                name.as_ptr(),
                value.as_ptr().cast(),
                value.len(),
                0,
            )
        };
        ret == 0
    }
}

#[cfg(not(target_os = "linux"))]
mod sys {
    use std::ffi::CStr;
    use std::os::fd::BorrowedFd;

    pub fn fgetxattr(_fd: BorrowedFd<'_>, _name: &CStr, _buf: &mut [u8]) -> Option<usize> {
        None
    }

    pub fn fsetxattr(_fd: BorrowedFd<'_>, _name: &CStr, _value: &[u8]) -> bool {
        false
    }
}
