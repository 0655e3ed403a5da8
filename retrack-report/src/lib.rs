//! Splice-site statistics over merged intron files.
//!
//! For every junction the reporter looks up the donor and acceptor
//! dinucleotides in the reference genome (reverse-complemented for `-`
//! junctions) and tallies how often each pair occurs and how often it matches
//! the canonical `GT-AG` motif. Unstranded junctions reading `CT-AC` are the
//! canonical motif seen from the other side, so they count as canonical too.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use anyhow::Result;

use retrack_core::models::{IntronKey, IntronRecord, Strand};
use retrack_core::tracks::read_intron_file;
use retrack_core::utils::complement;

pub const CANONICAL_PAIR: &str = "GT-AG";
/// The canonical motif read in the opposite orientation; only meaningful for
/// junctions without a strand assignment.
pub const CANONICAL_PAIR_FLIPPED: &str = "CT-AC";

/// Tallies for one donor-acceptor dinucleotide pair.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PairCounts {
    pub total: u64,
    pub canonical: u64,
}

/// Everything the intron reporter collects.
#[derive(Debug, Default)]
pub struct IntronReport {
    /// Dinucleotide pair -> counts, keys in lexicographic order.
    pub pairs: BTreeMap<String, PairCounts>,
    /// Junctions per strand assignment.
    pub strands: BTreeMap<Strand, u64>,
    /// Junctions on reference sequences absent from the genome, or with
    /// coordinates outside the sequence.
    pub skipped: u64,
    /// One line per non-canonical junction, kept only in verbose mode.
    pub non_canonical: Vec<String>,
}

impl IntronReport {
    /// `pair\ttotal\tcanonical` rows, lexicographically sorted.
    pub fn pair_rows(&self) -> Vec<String> {
        self.pairs
            .iter()
            .map(|(pair, counts)| format!("{pair}\t{}\t{}", counts.total, counts.canonical))
            .collect()
    }

    pub fn strand_rows(&self) -> Vec<String> {
        self.strands
            .iter()
            .map(|(strand, count)| format!("{strand}\t{count}"))
            .collect()
    }
}

impl std::fmt::Display for IntronReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "strand\tintrons")?;
        for row in self.strand_rows() {
            writeln!(f, "{row}")?;
        }
        writeln!(f)?;
        writeln!(f, "pair\ttotal\tcanonical")?;
        for row in self.pair_rows() {
            writeln!(f, "{row}")?;
        }
        if self.skipped > 0 {
            writeln!(f)?;
            writeln!(f, "skipped (unknown sequence or out of range): {}", self.skipped)?;
        }
        Ok(())
    }
}

/// Tally strand distribution and donor/acceptor pairs over intron files.
pub fn report_introns(
    genome: &HashMap<String, Vec<u8>>,
    files: &[PathBuf],
    verbose: bool,
) -> Result<IntronReport> {
    let mut report = IntronReport::default();

    for path in files {
        let file = read_intron_file(path)?;
        for record in &file.records {
            tally(genome, record, verbose, &mut report);
        }
    }

    Ok(report)
}

fn tally(
    genome: &HashMap<String, Vec<u8>>,
    record: &IntronRecord,
    verbose: bool,
    report: &mut IntronReport,
) {
    *report.strands.entry(record.key.strand).or_insert(0) += 1;

    let Some(pair) = genome
        .get(&record.chrom)
        .and_then(|seq| splice_pair(seq, &record.key))
    else {
        report.skipped += 1;
        return;
    };

    let canonical = pair == CANONICAL_PAIR
        || (record.key.strand == Strand::Unknown && pair == CANONICAL_PAIR_FLIPPED);
    let counts = report.pairs.entry(pair.clone()).or_default();
    counts.total += 1;
    if canonical {
        counts.canonical += 1;
    } else if verbose {
        report
            .non_canonical
            .push(format!("{}\t{}", record.as_row(), pair));
    }
}

/// Donor/acceptor dinucleotides of one junction, read in transcript
/// orientation. `start` is the 1-based first intronic base and `end` one past
/// the last, so for a `+` junction the donor is `seq[start-1..start+1]` in
/// 0-based terms and the acceptor `seq[end-3..end-1]`.
pub fn splice_pair(seq: &[u8], key: &IntronKey) -> Option<String> {
    if key.start == 0 || key.len() < 4 || key.end as usize - 1 > seq.len() {
        return None;
    }
    let s = key.start as usize - 1;
    let e = key.end as usize - 1;

    let (donor, acceptor) = match key.strand {
        Strand::Forward | Strand::Unknown => {
            ([seq[s], seq[s + 1]], [seq[e - 2], seq[e - 1]])
        }
        Strand::Reverse => (
            [complement(seq[e - 1]), complement(seq[e - 2])],
            [complement(seq[s + 1]), complement(seq[s])],
        ),
    };

    Some(format!(
        "{}{}-{}{}",
        donor[0] as char, donor[1] as char, acceptor[0] as char, acceptor[1] as char
    ))
}
