//! Logging infrastructure.
//!
//! Diagnostics (unreadable directories, cross-device skips, failed opens)
//! go through the `log` facade with an `env_logger` backend writing to
//! stderr. The level comes from, in priority order:
//!
//! 1. the `RUST_LOG` environment variable, when set
//! 2. the `-v` count: 0 = warn, 1 = info, 2 = debug, 3+ = trace
//!
//! Warnings stay visible without `-v` because per-file failures are part of
//! the tool's contract: work is skipped, never silently lost.

use std::env;
use std::io::Write;

use env_logger::Builder;
use log::LevelFilter;

/// Initialize the logging subsystem; call once, before any log statement.
pub fn init_logging(verbose: u8) {
    let mut builder = Builder::new();

    if env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else {
        builder.filter_level(level_for(verbose));
    }

    builder.format(|buf, record| {
        let level = record.level();
        let level_style = buf.default_level_style(level);
        writeln!(
            buf,
            "{level_style}{:<5}{level_style:#} {}",
            level,
            record.args()
        )
    });

    builder.init();
}

fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
