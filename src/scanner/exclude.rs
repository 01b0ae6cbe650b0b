//! Glob-based exclusion of directory entry names.
//!
//! Patterns are matched against the bare entry name, not the full path, and
//! a `/` in a pattern only ever matches a literal `/` (the classic
//! `fnmatch(3)` `FNM_PATHNAME` behavior).

use std::ffi::OsStr;
use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Compiled set of exclusion patterns.
#[derive(Debug)]
pub struct ExcludeSet {
    set: GlobSet,
}

impl ExcludeSet {
    /// Compile user-supplied patterns into a matcher.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`globset::Error`] for a malformed pattern;
    /// the caller treats this as a usage error.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = GlobBuilder::new(pattern.as_ref())
                .literal_separator(true)
                .build()?;
            builder.add(glob);
        }
        Ok(Self {
            set: builder.build()?,
        })
    }

    /// Whether a directory entry name matches any exclusion pattern.
    #[must_use]
    pub fn is_match(&self, name: &OsStr) -> bool {
        !self.set.is_empty() && self.set.is_match(Path::new(name))
    }
}
