use clap::{Arg, ArgAction, Command};

pub const INTRONS_CMD: &str = "introns";

pub fn create_introns_cli() -> Command {
    Command::new(INTRONS_CMD)
        .about("Report strand distribution and donor/acceptor dinucleotides of intron files.")
        .arg(Arg::new("genome").required(true).help("Reference FASTA"))
        .arg(
            Arg::new("files")
                .required(true)
                .num_args(1..)
                .help("Intron files to inspect"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Also print every non-canonical junction"),
        )
}
