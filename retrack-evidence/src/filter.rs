//! Mapping-reliability filter for alignment records.

use std::collections::HashMap;

use crate::records::AlignmentRecord;

/// Outcome of filtering one record. `Mismatched` records passed the quality
/// floor but disagreed with the reference around their splice boundaries;
/// the run summary reports them as questionable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    LowQuality,
    Mismatched,
}

///
/// Pure accept/reject predicate over alignment records.
///
/// A record is rejected when its mapping quality falls below the configured
/// floor, or — when a reference genome is supplied and the record is spliced —
/// when the read disagrees with the reference too often near its splice
/// boundaries. The mismatch check inspects up to `positions_around_splice_site`
/// bases at both the leading and trailing edge of every block, clipped to half
/// the block length so the two windows of a short block never overlap.
///
pub struct ReadFilter<'a> {
    min_quality: u8,
    positions_around_splice_site: u32,
    max_mismatches: u32,
    genome: Option<&'a HashMap<String, Vec<u8>>>,
}

impl<'a> ReadFilter<'a> {
    /// Filter on mapping quality alone.
    pub fn new(min_quality: u8) -> Self {
        ReadFilter {
            min_quality,
            positions_around_splice_site: 0,
            max_mismatches: u32::MAX,
            genome: None,
        }
    }

    /// Additionally reject spliced reads with too many mismatches against
    /// `genome` around their splice boundaries.
    pub fn with_mismatch_filter(
        min_quality: u8,
        positions_around_splice_site: u32,
        max_mismatches: u32,
        genome: &'a HashMap<String, Vec<u8>>,
    ) -> Self {
        ReadFilter {
            min_quality,
            positions_around_splice_site,
            max_mismatches,
            genome: Some(genome),
        }
    }

    /// A record at exactly `min_quality` is accepted.
    pub fn accept(&self, record: &AlignmentRecord) -> bool {
        self.verdict(record) == Verdict::Accept
    }

    pub fn verdict(&self, record: &AlignmentRecord) -> Verdict {
        if record.mapping_quality < self.min_quality {
            return Verdict::LowQuality;
        }

        let Some(genome) = self.genome else {
            return Verdict::Accept;
        };
        if !record.is_spliced() {
            return Verdict::Accept;
        }
        // reads on sequences that are not in the supplied genome can't be checked
        let Some(reference) = genome.get(&record.chrom) else {
            return Verdict::Accept;
        };

        let mut mismatches = 0u32;
        for block in &record.blocks {
            let check = self.positions_around_splice_site.min(block.len / 2);
            for i in 0..check {
                // leading edge
                mismatches += self.mismatch_at(
                    reference,
                    &record.sequence,
                    block.ref_start + i,
                    block.read_start + i as usize,
                );
                // trailing edge
                mismatches += self.mismatch_at(
                    reference,
                    &record.sequence,
                    block.ref_start + block.len - 1 - i,
                    block.read_start + (block.len - 1 - i) as usize,
                );
            }
        }

        if mismatches <= self.max_mismatches {
            Verdict::Accept
        } else {
            Verdict::Mismatched
        }
    }

    fn mismatch_at(&self, reference: &[u8], read: &[u8], ref_pos: u32, read_pos: usize) -> u32 {
        let ref_idx = ref_pos as usize - 1; // ref_pos is 1-based
        match (reference.get(ref_idx), read.get(read_pos)) {
            (Some(&r), Some(&q)) if r.to_ascii_uppercase() != q.to_ascii_uppercase() => 1,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::records::test_support::record_with_blocks;

    fn genome_with(chrom: &str, seq: &[u8]) -> HashMap<String, Vec<u8>> {
        HashMap::from([(chrom.to_string(), seq.to_vec())])
    }

    #[test]
    fn mapping_quality_boundary_is_inclusive() {
        let filter = ReadFilter::new(40);
        let at_boundary = record_with_blocks("chr1", 40, &[(1, 0, 10)]);
        let below = record_with_blocks("chr1", 39, &[(1, 0, 10)]);
        assert!(filter.accept(&at_boundary));
        assert!(!filter.accept(&below));
    }

    #[test]
    fn unspliced_records_skip_the_mismatch_check() {
        // genome totally disagrees with the read, but there is only one block
        let genome = genome_with("chr1", &[b'T'; 20]);
        let filter = ReadFilter::with_mismatch_filter(0, 5, 0, &genome);
        let record = record_with_blocks("chr1", 40, &[(1, 0, 10)]);
        assert!(filter.accept(&record));
    }

    #[test]
    fn spliced_record_with_too_many_edge_mismatches_is_rejected() {
        // read is all A; reference is all A except the first two bases of
        // the second block
        let mut seq = vec![b'A'; 40];
        seq[20] = b'C';
        seq[21] = b'C';
        let genome = genome_with("chr1", &seq);

        let record = record_with_blocks("chr1", 40, &[(1, 0, 10), (21, 10, 10)]);

        let strict = ReadFilter::with_mismatch_filter(0, 3, 1, &genome);
        assert!(!strict.accept(&record));

        let lenient = ReadFilter::with_mismatch_filter(0, 3, 2, &genome);
        assert!(lenient.accept(&record));
    }

    #[test]
    fn short_blocks_clip_the_window_to_half_their_length() {
        // with a window of 10 on a block of length 6, the clipped window is 3
        // on each edge and every base is inspected exactly once
        let mut seq = vec![b'A'; 40];
        seq[2] = b'C'; // offset 2 of the first block, leading window only
        let genome = genome_with("chr1", &seq);

        let record = record_with_blocks("chr1", 40, &[(1, 0, 6), (21, 6, 6)]);
        let filter = ReadFilter::with_mismatch_filter(0, 10, 0, &genome);
        assert!(!filter.accept(&record));

        let allows_one = ReadFilter::with_mismatch_filter(0, 10, 1, &genome);
        assert!(allows_one.accept(&record));
    }

    #[test]
    fn unknown_reference_sequences_pass_unchecked() {
        let genome = genome_with("chr1", &[b'T'; 20]);
        let filter = ReadFilter::with_mismatch_filter(0, 5, 0, &genome);
        let record = record_with_blocks("chrUn", 40, &[(1, 0, 5), (11, 5, 5)]);
        assert!(filter.accept(&record));
    }
}
