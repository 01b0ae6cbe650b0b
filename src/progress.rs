//! Progress reporting using indicatif.
//!
//! Two phases get live feedback when verbose mode is on: a spinner naming
//! the directory being walked, then a byte-denominated bar while candidate
//! contents are hashed. With `--boring` the styles fall back to plain ASCII
//! with no animation. Progress output never influences what the pipeline
//! does; it can be disabled entirely without changing a single decision.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Progress reporter for the walk and hash phases.
pub struct Progress {
    enabled: bool,
    boring: bool,
    scan: Mutex<Option<ProgressBar>>,
    hash: Mutex<Option<ProgressBar>>,
}

impl Progress {
    #[must_use]
    pub fn new(enabled: bool, boring: bool) -> Self {
        Self {
            enabled,
            boring,
            scan: Mutex::new(None),
            hash: Mutex::new(None),
        }
    }

    /// A reporter that never draws anything; used by tests and library
    /// callers that bring their own feedback.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(false, true)
    }

    fn scan_style(&self) -> ProgressStyle {
        if self.boring {
            ProgressStyle::with_template("scanning {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
        } else {
            ProgressStyle::with_template("{spinner:.green} scanning {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
        }
    }

    fn hash_style(&self) -> ProgressStyle {
        if self.boring {
            ProgressStyle::with_template("[{bar:40}] {bytes}/{total_bytes} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-")
        } else {
            ProgressStyle::with_template(
                "[{elapsed_precise}] [{bar:40.green/blue}] {bytes}/{total_bytes} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█>-")
        }
    }

    /// Note the directory currently being walked.
    pub fn scan_dir(&self, path: &Path) {
        if !self.enabled {
            return;
        }

        let mut scan = self.scan.lock().unwrap();
        let bar = scan.get_or_insert_with(|| {
            let bar = ProgressBar::new_spinner();
            bar.set_style(self.scan_style());
            if !self.boring {
                bar.enable_steady_tick(Duration::from_millis(100));
            }
            bar
        });
        bar.set_message(truncate_path(&path.display().to_string(), 60));
    }

    pub fn scan_done(&self) {
        if let Some(bar) = self.scan.lock().unwrap().take() {
            bar.finish_and_clear();
        }
    }

    /// Begin the hashing phase over `total_bytes` of candidate content.
    pub fn hash_start(&self, total_bytes: u64) {
        if !self.enabled || total_bytes == 0 {
            return;
        }

        let bar = ProgressBar::new(total_bytes);
        bar.set_style(self.hash_style());
        *self.hash.lock().unwrap() = Some(bar);
    }

    /// Note the file currently being hashed.
    pub fn hash_file(&self, path: &Path) {
        if let Some(bar) = self.hash.lock().unwrap().as_ref() {
            bar.set_message(truncate_path(&path.display().to_string(), 40));
        }
    }

    /// Advance by bytes consumed inside the current file.
    pub fn hash_advance(&self, bytes: u64) {
        if let Some(bar) = self.hash.lock().unwrap().as_ref() {
            bar.inc(bytes);
        }
    }

    /// Snap the bar to the cumulative byte count after each inode, so
    /// skipped or failed inodes still move the bar.
    pub fn hash_position(&self, bytes: u64) {
        if let Some(bar) = self.hash.lock().unwrap().as_ref() {
            bar.set_position(bytes);
        }
    }

    pub fn hash_done(&self) {
        if let Some(bar) = self.hash.lock().unwrap().take() {
            bar.finish_and_clear();
        }
    }
}

/// Shorten a path for display, keeping the trailing file name.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.len() <= max_len {
        return path.to_string();
    }

    let file_name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    if file_name.len() >= max_len {
        return format!("...{}", &file_name[file_name.len() - max_len + 3..]);
    }

    format!(".../{file_name}")
}
