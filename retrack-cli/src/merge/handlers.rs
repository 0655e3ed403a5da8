use std::path::PathBuf;

use anyhow::Result;
use clap::ArgMatches;

use retrack_merge::{merge_coverage_files, merge_intron_files};

fn output_and_shards(matches: &ArgMatches) -> (PathBuf, Vec<PathBuf>) {
    let output = matches
        .get_one::<String>("output")
        .expect("an output path is required");
    let shards: Vec<PathBuf> = matches
        .get_many::<String>("shards")
        .expect("at least one shard is required")
        .map(PathBuf::from)
        .collect();
    (PathBuf::from(output), shards)
}

pub fn run_merge_coverage(matches: &ArgMatches) -> Result<()> {
    let (output, shards) = output_and_shards(matches);
    merge_coverage_files(&output, &shards)
}

pub fn run_merge_introns(matches: &ArgMatches) -> Result<()> {
    let (output, shards) = output_and_shards(matches);
    merge_intron_files(&output, &shards)
}
