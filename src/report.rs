//! Duplicate-group listings, interactive confirmation, and the run summary.
//!
//! Output goes to stdout. ANSI styling is applied only when stdout is a
//! terminal and `--boring` was not given; presentation never affects what
//! gets relinked.

use std::io::{self, BufRead, IsTerminal, Write};

use chrono::{Local, TimeZone};

use crate::actions::relink::RelinkStats;
use crate::scanner::{hash_to_hex, Digest, InodeRecord, Mtime};

const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const DEFAULT_FG: &str = "\x1b[39m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Stdout reporter for group listings and the final summary.
#[derive(Debug)]
pub struct Reporter {
    verbose: bool,
    color: bool,
}

impl Reporter {
    #[must_use]
    pub fn new(verbose: bool, boring: bool) -> Self {
        Self {
            verbose,
            color: !boring && io::stdout().is_terminal(),
        }
    }

    /// Print one duplicate group: digest header, then each member's inode
    /// number, size and local mtime, then every path of that member.
    pub fn print_group(&self, digest: &Digest, members: &[&InodeRecord]) {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        if let Err(err) = self.write_group(&mut out, digest, members) {
            log::warn!("failed to write group report: {err}");
        }
    }

    fn write_group<W: Write>(
        &self,
        out: &mut W,
        digest: &Digest,
        members: &[&InodeRecord],
    ) -> io::Result<()> {
        let hex = hash_to_hex(digest);
        if self.color {
            writeln!(out, "{BOLD}Duplicate {RED}{hex}{DEFAULT_FG}:{RESET}")?;
        } else {
            writeln!(out, "Duplicate {hex}:")?;
        }

        for record in members {
            let when = format_mtime(record.mtime);
            if self.color {
                writeln!(
                    out,
                    " {BOLD}#{}{RESET} ({} bytes) {DIM}modified {when}{RESET}",
                    record.ino, record.size
                )?;
            } else {
                writeln!(out, " #{} ({} bytes) modified {when}", record.ino, record.size)?;
            }
            for path in &record.paths {
                writeln!(out, "  {}", path.display())?;
            }
        }
        Ok(())
    }

    /// Line-oriented confirmation prompt.
    ///
    /// Only `y`/`yes` confirm and only `n`/`no` decline; anything else asks
    /// again. End of input counts as declining.
    #[must_use]
    pub fn confirm_relink(&self) -> bool {
        let stdin = io::stdin();
        loop {
            if self.color {
                print!(" {BOLD}Relink? [{GREEN}yes{DEFAULT_FG}/{RED}no{DEFAULT_FG}]{RESET} ");
            } else {
                print!(" Relink? [yes/no] ");
            }
            let _ = io::stdout().flush();

            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => return false,
                Ok(_) => {}
            }
            match line.trim() {
                "y" | "yes" => return true,
                "n" | "no" => return false,
                _ => {}
            }
        }
    }

    /// Final run summary; silent unless verbose and something was relinked.
    pub fn summary(&self, stats: &RelinkStats) {
        if !self.verbose || stats.relinked_count == 0 {
            return;
        }

        let plural = if stats.relinked_count > 1 { "s" } else { "" };
        if self.color {
            println!(
                "{BOLD}Performed {GREEN}{}{DEFAULT_FG} relink{plural}, saved {GREEN}{}{DEFAULT_FG} bytes.{RESET}",
                stats.relinked_count, stats.relinked_size
            );
        } else {
            println!(
                "Performed {} relink{plural}, saved {} bytes.",
                stats.relinked_count, stats.relinked_size
            );
        }
    }
}

fn format_mtime(mtime: Mtime) -> String {
    let nsec = u32::try_from(mtime.nsec.clamp(0, 999_999_999)).unwrap_or(0);
    Local
        .timestamp_opt(mtime.sec, nsec)
        .single()
        .map_or_else(|| mtime.sec.to_string(), |dt| dt.format("%c").to_string())
}
