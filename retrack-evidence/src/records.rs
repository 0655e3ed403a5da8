//! Alignment record model and the BAM-backed record source.
//!
//! The rest of the pipeline only ever sees [`AlignmentRecord`]: reference
//! name, mapping quality, the ordered matched blocks, the read sequence and
//! the handful of flags the strand logic needs. Anything that can produce
//! those is a valid source; [`BamSource`] adapts a `noodles` BAM reader.

use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use noodles::bam;
use noodles::bgzf;
use noodles::sam::alignment::record::cigar::op::Kind;

use retrack_core::Strand;

/// One maximal contiguous matched segment of an alignment.
/// `ref_start` is 1-based, `read_start` is a 0-based offset into the read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentBlock {
    pub ref_start: u32,
    pub read_start: usize,
    pub len: u32,
}

impl AlignmentBlock {
    /// One past the last 1-based reference position of this block.
    pub fn ref_end(&self) -> u32 {
        self.ref_start + self.len
    }
}

/// A parsed alignment, reduced to what filtering and counting need.
#[derive(Debug, Clone)]
pub struct AlignmentRecord {
    pub chrom: String,
    pub mapping_quality: u8,
    pub blocks: Vec<AlignmentBlock>,
    pub sequence: Vec<u8>,
    pub paired: bool,
    pub first_in_pair: bool,
    pub reverse: bool,
    pub secondary: bool,
}

impl AlignmentRecord {
    /// A record with more than one block spans at least one reference gap.
    pub fn is_spliced(&self) -> bool {
        self.blocks.len() > 1
    }

    /// Gaps between consecutive blocks as half-open `(start, end)` reference
    /// intervals; these are the junction candidates.
    pub fn gaps(&self) -> Vec<(u32, u32)> {
        self.blocks
            .windows(2)
            .map(|pair| (pair[0].ref_end(), pair[1].ref_start))
            .collect()
    }

    /// Shortest block length; the "context" a split read offers a junction.
    pub fn min_block_len(&self) -> u32 {
        self.blocks.iter().map(|b| b.len).min().unwrap_or(0)
    }
}

/// Library layout of the sequencing run, deciding how read flags translate
/// into genomic strands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strandedness {
    Unstranded,
    /// First read of a pair maps reverse to the mRNA (e.g. Illumina TruSeq).
    FirstStrand,
    SecondStrand,
}

impl Strandedness {
    /// Strand assigned to junctions of this record.
    pub fn junction_strand(&self, record: &AlignmentRecord) -> Strand {
        let second = record.paired && !record.first_in_pair;
        match self {
            Strandedness::Unstranded => Strand::Unknown,
            Strandedness::FirstStrand => match (second, record.reverse) {
                (true, true) => Strand::Reverse,
                (true, false) => Strand::Forward,
                (false, true) => Strand::Forward,
                (false, false) => Strand::Reverse,
            },
            Strandedness::SecondStrand => match (second, record.reverse) {
                (true, true) => Strand::Forward,
                (true, false) => Strand::Reverse,
                (false, true) => Strand::Reverse,
                (false, false) => Strand::Forward,
            },
        }
    }

    /// Whether this record's coverage belongs on the forward track.
    /// Unstranded libraries count everything as forward.
    pub fn counts_as_forward(&self, record: &AlignmentRecord) -> bool {
        let first = !record.paired || record.first_in_pair;
        match self {
            Strandedness::Unstranded => true,
            Strandedness::FirstStrand => {
                (first && record.reverse) || (!first && !record.reverse)
            }
            Strandedness::SecondStrand => {
                (first && !record.reverse) || (!first && record.reverse)
            }
        }
    }
}

impl FromStr for Strandedness {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unstranded" => Ok(Strandedness::Unstranded),
            "first" | "first-strand" => Ok(Strandedness::FirstStrand),
            "second" | "second-strand" => Ok(Strandedness::SecondStrand),
            _ => Err(anyhow!("Invalid strandedness: {}", s)),
        }
    }
}

/// Walk a CIGAR, producing maximal matched blocks. Blocks split on every
/// read- or reference-gap operation (insertion, deletion, skip), so the gaps
/// between consecutive blocks carry both short indel gaps and true introns;
/// the minimum-intron-length cutoff separates the two downstream.
fn blocks_from_cigar<C>(cigar: C, alignment_start: u32) -> Result<Vec<AlignmentBlock>>
where
    C: IntoIterator<Item = std::io::Result<noodles::sam::alignment::record::cigar::Op>>,
{
    let mut blocks = Vec::new();
    let mut ref_pos = alignment_start;
    let mut read_pos = 0usize;
    let mut current: Option<AlignmentBlock> = None;

    for op in cigar {
        let op = op?;
        let len = op.len() as u32;
        match op.kind() {
            Kind::Match | Kind::SequenceMatch | Kind::SequenceMismatch => {
                match current.as_mut() {
                    Some(block) => block.len += len,
                    None => {
                        current = Some(AlignmentBlock {
                            ref_start: ref_pos,
                            read_start: read_pos,
                            len,
                        });
                    }
                }
                ref_pos += len;
                read_pos += len as usize;
            }
            Kind::Deletion | Kind::Skip => {
                if let Some(block) = current.take() {
                    blocks.push(block);
                }
                ref_pos += len;
            }
            Kind::Insertion | Kind::SoftClip => {
                if let Some(block) = current.take() {
                    blocks.push(block);
                }
                read_pos += len as usize;
            }
            Kind::HardClip | Kind::Pad => {}
        }
    }

    if let Some(block) = current.take() {
        blocks.push(block);
    }

    Ok(blocks)
}

/// Sequential reader over one BAM file, yielding [`AlignmentRecord`]s for
/// every mapped record. Unmapped records are skipped at the source.
pub struct BamSource {
    reader: bam::io::Reader<bgzf::Reader<File>>,
    reference_names: Vec<String>,
    buffer: bam::Record,
}

impl BamSource {
    pub fn open<T: AsRef<Path>>(path: T) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = bam::io::reader::Builder::default()
            .build_from_path(path)
            .with_context(|| format!("Failed to open BAM file {:?}", path))?;
        let header = reader
            .read_header()
            .with_context(|| format!("Failed to read BAM header of {:?}", path))?;

        let reference_names = header
            .reference_sequences()
            .keys()
            .map(|name| name.to_string())
            .collect();

        Ok(BamSource {
            reader,
            reference_names,
            buffer: bam::Record::default(),
        })
    }

    fn convert(&self, record: &bam::Record) -> Result<Option<AlignmentRecord>> {
        let flags = record.flags();
        if flags.is_unmapped() {
            return Ok(None);
        }

        let chrom = match record.reference_sequence_id() {
            Some(id) => {
                let id = id?;
                self.reference_names
                    .get(id)
                    .ok_or_else(|| anyhow!("Reference id {} not present in BAM header", id))?
                    .clone()
            }
            None => return Ok(None),
        };

        let alignment_start = match record.alignment_start() {
            Some(position) => position?.get() as u32,
            None => return Ok(None),
        };

        let blocks = blocks_from_cigar(record.cigar().iter(), alignment_start)?;
        let sequence: Vec<u8> = record.sequence().iter().collect();

        Ok(Some(AlignmentRecord {
            chrom,
            mapping_quality: record
                .mapping_quality()
                .map(|q| q.get())
                .unwrap_or(255),
            blocks,
            sequence,
            paired: flags.is_segmented(),
            first_in_pair: flags.is_first_segment(),
            reverse: flags.is_reverse_complemented(),
            secondary: flags.is_secondary() || flags.is_supplementary(),
        }))
    }
}

impl Iterator for BamSource {
    type Item = Result<AlignmentRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.reader.read_record(&mut self.buffer) {
                Ok(0) => return None,
                Ok(_) => match self.convert(&self.buffer) {
                    Ok(Some(record)) => return Some(Ok(record)),
                    Ok(None) => continue,
                    Err(err) => return Some(Err(err)),
                },
                Err(err) => return Some(Err(err.into())),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Build a record from `(ref_start, read_start, len)` block triples.
    pub fn record_with_blocks(chrom: &str, mapq: u8, blocks: &[(u32, usize, u32)]) -> AlignmentRecord {
        let read_len = blocks.iter().map(|&(_, _, l)| l as usize).sum::<usize>();
        AlignmentRecord {
            chrom: chrom.to_string(),
            mapping_quality: mapq,
            blocks: blocks
                .iter()
                .map(|&(ref_start, read_start, len)| AlignmentBlock {
                    ref_start,
                    read_start,
                    len,
                })
                .collect(),
            sequence: vec![b'A'; read_len],
            paired: false,
            first_in_pair: true,
            reverse: false,
            secondary: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::record_with_blocks;
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn gaps_come_from_consecutive_blocks() {
        let record = record_with_blocks("chr1", 40, &[(100, 0, 50), (500, 50, 50)]);
        assert!(record.is_spliced());
        assert_eq!(record.gaps(), vec![(150, 500)]);
        assert_eq!(record.min_block_len(), 50);
    }

    #[test]
    fn unspliced_record_has_no_gaps() {
        let record = record_with_blocks("chr1", 40, &[(100, 0, 75)]);
        assert!(!record.is_spliced());
        assert!(record.gaps().is_empty());
    }

    fn stranded_record(paired: bool, first: bool, reverse: bool) -> AlignmentRecord {
        let mut record = record_with_blocks("chr1", 40, &[(1, 0, 10)]);
        record.paired = paired;
        record.first_in_pair = first;
        record.reverse = reverse;
        record
    }

    #[test]
    fn unstranded_layout_knows_nothing() {
        let record = stranded_record(true, true, true);
        assert_eq!(
            Strandedness::Unstranded.junction_strand(&record),
            Strand::Unknown
        );
        assert!(Strandedness::Unstranded.counts_as_forward(&record));
    }

    #[test]
    fn first_strand_layout_flips_the_first_mate() {
        // first mate on the reverse strand => transcript on the forward strand
        let record = stranded_record(true, true, true);
        assert_eq!(
            Strandedness::FirstStrand.junction_strand(&record),
            Strand::Forward
        );
        assert!(Strandedness::FirstStrand.counts_as_forward(&record));

        let mate = stranded_record(true, false, false);
        assert_eq!(
            Strandedness::FirstStrand.junction_strand(&mate),
            Strand::Forward
        );
        assert!(Strandedness::FirstStrand.counts_as_forward(&mate));
    }

    #[test]
    fn second_strand_layout_is_the_mirror_image() {
        let record = stranded_record(true, true, true);
        assert_eq!(
            Strandedness::SecondStrand.junction_strand(&record),
            Strand::Reverse
        );
        assert!(!Strandedness::SecondStrand.counts_as_forward(&record));
    }

    #[test]
    fn single_end_reads_behave_like_first_mates() {
        let record = stranded_record(false, true, false);
        assert_eq!(
            Strandedness::FirstStrand.junction_strand(&record),
            Strand::Reverse
        );
        assert!(!Strandedness::FirstStrand.counts_as_forward(&record));
    }

    #[test]
    fn strandedness_parses_cli_names() {
        assert_eq!(
            "first".parse::<Strandedness>().unwrap(),
            Strandedness::FirstStrand
        );
        assert_eq!(
            "UNSTRANDED".parse::<Strandedness>().unwrap(),
            Strandedness::Unstranded
        );
        assert!("both".parse::<Strandedness>().is_err());
    }
}
