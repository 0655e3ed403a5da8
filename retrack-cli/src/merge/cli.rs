use clap::{Arg, Command};

pub const MERGE_COVERAGE_CMD: &str = "merge-coverage";
pub const MERGE_INTRONS_CMD: &str = "merge-introns";

pub fn create_merge_coverage_cli() -> Command {
    Command::new(MERGE_COVERAGE_CMD)
        .about("Merge per-shard coverage files into one sorted, run-length compressed file.")
        .arg(Arg::new("output").required(true).help("Consolidated output file"))
        .arg(
            Arg::new("shards")
                .required(true)
                .num_args(1..)
                .help("Per-shard coverage files"),
        )
}

pub fn create_merge_introns_cli() -> Command {
    Command::new(MERGE_INTRONS_CMD)
        .about("Merge per-shard intron files, summing support per junction.")
        .arg(Arg::new("output").required(true).help("Consolidated output file"))
        .arg(
            Arg::new("shards")
                .required(true)
                .num_args(1..)
                .help("Per-shard intron files"),
        )
}
