use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ArgMatches;

use retrack_evidence::{ExtractOptions, Strandedness, extract_evidence};

pub fn run_extract(matches: &ArgMatches) -> Result<()> {
    let bams: Vec<PathBuf> = matches
        .get_many::<String>("bam")
        .expect("--bam is required")
        .map(PathBuf::from)
        .collect();

    let output = matches
        .get_one::<String>("output")
        .expect("--output is required");

    let strandedness: Strandedness = matches
        .get_one::<String>("stranded")
        .unwrap()
        .parse()
        .context("--stranded must be unstranded, first or second")?;

    let min_quality: u8 = matches
        .get_one::<String>("min-quality")
        .unwrap()
        .parse()
        .context("--min-quality must be 0..=255")?;

    let min_context: u32 = matches
        .get_one::<String>("min-context")
        .unwrap()
        .parse()
        .context("--min-context must be a non-negative integer")?;

    let min_intron_length: u32 = matches
        .get_one::<String>("min-intron-length")
        .unwrap()
        .parse()
        .context("--min-intron-length must be a non-negative integer")?;

    let max_coverage: Option<u32> = matches
        .get_one::<String>("max-coverage")
        .map(|v| v.parse().context("--max-coverage must be a positive integer"))
        .transpose()?;

    let positions_around_splice_site: u32 = matches
        .get_one::<String>("around-splice")
        .unwrap()
        .parse()
        .context("--around-splice must be a non-negative integer")?;

    let max_mismatches: u32 = matches
        .get_one::<String>("max-mismatches")
        .unwrap()
        .parse()
        .context("--max-mismatches must be a non-negative integer")?;

    let sensitivity: f64 = matches
        .get_one::<String>("sensitivity")
        .unwrap()
        .parse()
        .context("--sensitivity must be a number")?;

    let options = ExtractOptions {
        strandedness,
        min_quality,
        min_context,
        min_intron_length,
        max_coverage,
        positions_around_splice_site,
        max_mismatches,
        genome: matches.get_one::<String>("genome").map(PathBuf::from),
        sensitivity,
        coverage: !matches.get_flag("no-coverage"),
        use_secondary: matches.get_flag("use-secondary"),
    };

    let summary = extract_evidence(&bams, &options, &PathBuf::from(output))?;
    print!("{summary}");

    Ok(())
}
