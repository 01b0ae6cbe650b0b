//! Command-line interface definitions.
//!
//! All options are defined with the clap derive API. The binary exits 0 on
//! success and 1 on a usage error, a fatal setup error, or after printing
//! help. The auto-generated help flag is replaced with an explicit one so
//! `-?` works alongside `-h` and `--help`.

use std::path::PathBuf;

use clap::Parser;

/// Content-addressed file deduplicator.
///
/// Finds files with identical contents under the given directories and
/// replaces duplicates with hard links to the oldest copy. Operates on a
/// single filesystem: directories on other devices are skipped.
#[derive(Debug, Parser)]
#[command(name = "dupelink", version, about, long_about = None)]
#[command(disable_help_flag = true)]
pub struct Cli {
    /// Don't output colors on the terminal
    #[arg(short = 'b', long = "boring")]
    pub boring: bool,

    /// Print directory and file names as they are being scanned
    /// (repeat for more log detail)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Don't do any write operations to the file system
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// Ask for confirmation before relinking each duplicate group
    #[arg(short = 'i', long = "interactive")]
    pub interactive: bool,

    /// Exclude file or directory name pattern from the scan
    #[arg(short = 'e', long = "exclude", value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Cache file hashes in user extended attributes
    #[arg(short = 'x', long = "use-xattrs")]
    pub use_xattrs: bool,

    /// Show program usage
    #[arg(
        short = 'h',
        long = "help",
        short_alias = '?',
        action = clap::ArgAction::Help
    )]
    pub help: Option<bool>,

    /// Directories to scan (defaults to the current directory)
    #[arg(value_name = "DIR")]
    pub dirs: Vec<String>,
}

impl Cli {
    /// Positional directories with trailing slashes stripped, defaulting to
    /// the current directory when none were given.
    #[must_use]
    pub fn scan_dirs(&self) -> Vec<PathBuf> {
        if self.dirs.is_empty() {
            return vec![PathBuf::from(".")];
        }
        self.dirs.iter().map(|raw| normalize_dir(raw)).collect()
    }
}

/// Strip trailing `/` characters; a bare root stays `/`.
fn normalize_dir(raw: &str) -> PathBuf {
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() {
        PathBuf::from("/")
    } else {
        PathBuf::from(trimmed)
    }
}
