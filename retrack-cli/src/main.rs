mod extract;
mod introns;
mod merge;

use anyhow::Result;
use clap::Command;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const PKG_NAME: &str = "retrack";
    pub const BIN_NAME: &str = "retrack";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .author("annotation-evidence")
        .about("Tools for turning mapped RNA-seq reads into coverage and intron evidence tracks for genome annotation.")
        .subcommand_required(true)
        .subcommand(extract::cli::create_extract_cli())
        .subcommand(merge::cli::create_merge_coverage_cli())
        .subcommand(merge::cli::create_merge_introns_cli())
        .subcommand(introns::cli::create_introns_cli())
}

fn main() -> Result<()> {
    let app = build_parser();
    let matches = app.get_matches();

    match matches.subcommand() {
        //
        // EXTRACT
        //
        Some((extract::cli::EXTRACT_CMD, matches)) => {
            extract::handlers::run_extract(matches)?;
        }

        //
        // SHARD MERGING
        //
        Some((merge::cli::MERGE_COVERAGE_CMD, matches)) => {
            merge::handlers::run_merge_coverage(matches)?;
        }
        Some((merge::cli::MERGE_INTRONS_CMD, matches)) => {
            merge::handlers::run_merge_introns(matches)?;
        }

        //
        // INTRON STATISTICS
        //
        Some((introns::cli::INTRONS_CMD, matches)) => {
            introns::handlers::run_introns(matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}
