use std::fmt::{self, Display};

use crate::models::strand::Strand;

///
/// Identity of one splice junction on a reference sequence. `start` is the
/// 1-based position of the first intronic base, `end` is one past the last,
/// so `end - start` is the intron length.
///
/// The derived ordering (start, then end, then strand) is the deterministic
/// row ordering of consolidated intron files.
///
#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Clone, Copy)]
pub struct IntronKey {
    pub start: u32,
    pub end: u32,
    pub strand: Strand,
}

impl IntronKey {
    pub fn new(start: u32, end: u32, strand: Strand) -> Self {
        IntronKey { start, end, strand }
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

///
/// One data row of an intron file: a junction plus the number of split
/// reads supporting it. Unique per `(chrom, key)` in consolidated output.
///
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct IntronRecord {
    pub chrom: String,
    pub key: IntronKey,
    pub support: u64,
}

impl IntronRecord {
    pub fn new(chrom: impl Into<String>, key: IntronKey, support: u64) -> Self {
        IntronRecord {
            chrom: chrom.into(),
            key,
            support,
        }
    }

    /// GFF-style 9-column row as written to intron files.
    pub fn as_row(&self) -> String {
        format!(
            "{}\tRNAseq\tintron\t{}\t{}\t{}\t{}\t.\t.",
            self.chrom, self.key.start, self.key.end, self.support, self.key.strand
        )
    }
}

impl Display for IntronRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_row())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intron_row_layout() {
        let record = IntronRecord::new("chr1", IntronKey::new(100, 200, Strand::Forward), 3);
        assert_eq!(record.as_row(), "chr1\tRNAseq\tintron\t100\t200\t3\t+\t.\t.");
    }

    #[test]
    fn key_ordering_is_start_end_strand() {
        let a = IntronKey::new(100, 200, Strand::Unknown);
        let b = IntronKey::new(100, 250, Strand::Forward);
        let c = IntronKey::new(150, 160, Strand::Forward);
        assert!(a < b);
        assert!(b < c);

        let plus = IntronKey::new(100, 200, Strand::Forward);
        let minus = IntronKey::new(100, 200, Strand::Reverse);
        assert!(plus < minus);
    }
}
