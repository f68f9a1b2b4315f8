mod cli;
mod config;
mod progress;
mod run;

use clap::Parser;
use gallery_logging::gallery_info;

use crate::run::RunReport;

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    gallery_logging::initialize(args.log_level(), args.log_destination());

    if let RunReport::Downloaded(summary) = run::run(&args)? {
        gallery_info!(
            "{} pictures saved, {} empty, {} failed",
            summary.saved,
            summary.not_saved,
            summary.failed
        );
    }
    Ok(())
}
