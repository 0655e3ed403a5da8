use clap::{Arg, ArgAction, Command};

pub const EXTRACT_CMD: &str = "extract";

pub fn create_extract_cli() -> Command {
    Command::new(EXTRACT_CMD)
        .about("Extract coverage and intron evidence from mapped RNA-seq reads.")
        .arg(
            Arg::new("bam")
                .long("bam")
                .required(true)
                .num_args(1..)
                .help("One or more BAM files"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .required(true)
                .help("Prefix for the evidence files of this shard"),
        )
        .arg(
            Arg::new("stranded")
                .long("stranded")
                .default_value("unstranded")
                .help("Library layout: unstranded, first or second"),
        )
        .arg(
            Arg::new("min-quality")
                .long("min-quality")
                .default_value("40")
                .help("Minimum mapping quality"),
        )
        .arg(
            Arg::new("min-context")
                .long("min-context")
                .default_value("1")
                .help("Minimum flanking match length for a reported intron"),
        )
        .arg(
            Arg::new("min-intron-length")
                .long("min-intron-length")
                .default_value("30")
                .help("Reference gaps at or below this length count as coverage, not introns"),
        )
        .arg(
            Arg::new("max-coverage")
                .long("max-coverage")
                .required(false)
                .help("Cap reported coverage depth"),
        )
        .arg(
            Arg::new("around-splice")
                .long("around-splice")
                .default_value("10")
                .help("Bases checked for mismatches at each block edge"),
        )
        .arg(
            Arg::new("max-mismatches")
                .long("max-mismatches")
                .default_value("3")
                .help("Maximum mismatches near splice sites before a read is questionable"),
        )
        .arg(
            Arg::new("genome")
                .long("genome")
                .required(false)
                .help("Reference FASTA; enables the splice-site mismatch filter"),
        )
        .arg(
            Arg::new("sensitivity")
                .long("sensitivity")
                .default_value("0")
                .help("Sensitivity of the length-scaled intron support filter; 0 disables calibration"),
        )
        .arg(
            Arg::new("no-coverage")
                .long("no-coverage")
                .action(ArgAction::SetTrue)
                .help("Skip the coverage tracks, write introns only"),
        )
        .arg(
            Arg::new("use-secondary")
                .long("use-secondary")
                .action(ArgAction::SetTrue)
                .help("Count secondary alignments as evidence"),
        )
}
