//! Entry point for the dupelink CLI.

use anyhow::Result;
use clap::Parser;
use dupelink::{
    cli::Cli,
    duplicates::{DedupeConfig, Deduplicator},
    logging,
};

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Covers parse errors and -h/-?/--help; usage always exits 1.
            let _ = err.print();
            std::process::exit(1);
        }
    };

    logging::init_logging(cli.verbose);

    let config = DedupeConfig::default()
        .with_dirs(cli.scan_dirs())
        .with_exclude(cli.exclude.clone())
        .with_dry_run(cli.dry_run)
        .with_interactive(cli.interactive)
        .with_use_xattrs(cli.use_xattrs)
        .with_verbose(cli.verbose > 0)
        .with_boring(cli.boring);

    let summary = Deduplicator::new(config).run()?;
    log::debug!(
        "{} inodes, {} candidates, {} groups, {} relinks",
        summary.inodes,
        summary.candidates,
        summary.groups,
        summary.relinked_count
    );

    Ok(())
}
