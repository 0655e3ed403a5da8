use std::path::PathBuf;

use anyhow::Result;
use clap::ArgMatches;

use retrack_core::utils::read_fasta;
use retrack_report::report_introns;

pub fn run_introns(matches: &ArgMatches) -> Result<()> {
    let genome_path = matches
        .get_one::<String>("genome")
        .expect("a genome path is required");
    let files: Vec<PathBuf> = matches
        .get_many::<String>("files")
        .expect("at least one intron file is required")
        .map(PathBuf::from)
        .collect();
    let verbose = matches.get_flag("verbose");

    let genome = read_fasta(genome_path)?;
    let report = report_introns(&genome, &files, verbose)?;

    print!("{report}");
    if verbose && !report.non_canonical.is_empty() {
        println!();
        println!("non-canonical junctions:");
        for line in &report.non_canonical {
            println!("{line}");
        }
    }

    Ok(())
}
