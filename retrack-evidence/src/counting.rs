//! Per-shard coverage and junction accumulators.
//!
//! Both accumulators key their sparse maps by reference sequence name so that
//! emission order is lexicographic without an explicit sort. Memory stays
//! proportional to the number of covered positions and distinct junctions, not
//! to chromosome length.

use std::collections::BTreeMap;
use std::io::Write;

use retrack_core::models::{CoverageRun, IntronKey, IntronRecord, LengthHistogram};
use retrack_core::tracks::{COVERAGE_TRACK_HEADER, INTRON_GFF_HEADER, compress_depths};

use crate::stats::SpliceStatistics;

/// Sparse position→depth counter per reference sequence.
#[derive(Debug, Default)]
pub struct CoverageAccumulator {
    depths: BTreeMap<String, BTreeMap<u32, u32>>,
    max_depth: Option<u32>,
}

impl CoverageAccumulator {
    pub fn new(max_depth: Option<u32>) -> Self {
        CoverageAccumulator {
            depths: BTreeMap::new(),
            max_depth,
        }
    }

    /// Count one aligned block covering 1-based positions
    /// `[ref_start, ref_start + len)`.
    pub fn add_block(&mut self, chrom: &str, ref_start: u32, len: u32) {
        self.add_span(chrom, ref_start, ref_start + len);
    }

    /// Count a half-open span of 1-based positions.
    pub fn add_span(&mut self, chrom: &str, start: u32, end: u32) {
        let per_pos = self.depths.entry(chrom.to_string()).or_default();
        let cap = self.max_depth.unwrap_or(u32::MAX);
        for pos in start..end {
            let depth = per_pos.entry(pos).or_insert(0);
            if *depth < cap {
                *depth += 1;
            }
        }
    }

    /// Maximal constant-depth runs, reference sequences in lexicographic
    /// order, runs ascending by start.
    pub fn runs(&self) -> Vec<CoverageRun> {
        self.depths
            .iter()
            .flat_map(|(chrom, per_pos)| compress_depths(chrom, per_pos))
            .collect()
    }

    pub fn write_bedgraph<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "{COVERAGE_TRACK_HEADER}")?;
        for run in self.runs() {
            writeln!(writer, "{}", run.as_row())?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.depths.values().all(|per_pos| per_pos.is_empty())
    }
}

/// Support gathered for one junction within a shard.
#[derive(Debug, Clone, Copy, Default)]
struct JunctionSupport {
    count: u64,
    /// Longest flanking match observed next to this junction.
    best_context: u32,
}

/// Read counts per (reference sequence, junction key).
#[derive(Debug, Default)]
pub struct JunctionAccumulator {
    junctions: BTreeMap<String, BTreeMap<IntronKey, JunctionSupport>>,
}

/// Junction table after context and support filtering.
#[derive(Debug)]
pub struct EmittedIntrons {
    pub records: Vec<IntronRecord>,
    pub lengths: LengthHistogram,
    /// Junctions dropped for insufficient flanking context.
    pub dropped_context: u64,
    /// Junctions dropped by the calibrated support rule.
    pub dropped_support: u64,
}

impl JunctionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one split read spanning `key`, flanked by matched stretches of
    /// at least `context` bases on the shorter side.
    pub fn add(&mut self, chrom: &str, key: IntronKey, context: u32) {
        let support = self
            .junctions
            .entry(chrom.to_string())
            .or_default()
            .entry(key)
            .or_default();
        support.count += 1;
        support.best_context = support.best_context.max(context);
    }

    pub fn distinct_junctions(&self) -> usize {
        self.junctions.values().map(BTreeMap::len).sum()
    }

    /// Emit sorted intron records, keeping only junctions whose best flanking
    /// context reaches `min_context` and, when calibration statistics are
    /// given, whose count passes the length-scaled support rule.
    pub fn emit(&self, min_context: u32, stats: Option<&SpliceStatistics>) -> EmittedIntrons {
        let mut records = Vec::new();
        let mut lengths = LengthHistogram::new();
        let mut dropped_context = 0;
        let mut dropped_support = 0;

        for (chrom, per_key) in &self.junctions {
            for (key, support) in per_key {
                if support.best_context < min_context {
                    dropped_context += 1;
                    continue;
                }
                if let Some(stats) = stats
                    && !stats.is_supported(key.len(), support.count)
                {
                    dropped_support += 1;
                    continue;
                }
                lengths.add(key.len());
                records.push(IntronRecord::new(chrom.clone(), *key, support.count));
            }
        }

        EmittedIntrons {
            records,
            lengths,
            dropped_context,
            dropped_support,
        }
    }
}

impl EmittedIntrons {
    pub fn write_gff<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "{INTRON_GFF_HEADER}")?;
        for record in &self.records {
            writeln!(writer, "{}", record.as_row())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use retrack_core::models::Strand;

    #[test]
    fn overlapping_blocks_produce_maximal_runs() {
        let mut acc = CoverageAccumulator::new(None);
        acc.add_block("chr1", 1, 10);
        acc.add_block("chr1", 6, 10);

        let rows: Vec<String> = acc.runs().iter().map(CoverageRun::as_row).collect();
        assert_eq!(rows, vec!["chr1\t1\t6\t1", "chr1\t6\t11\t2", "chr1\t11\t16\t1"]);
    }

    #[test]
    fn depth_is_clamped_to_the_configured_maximum() {
        let mut acc = CoverageAccumulator::new(Some(2));
        for _ in 0..5 {
            acc.add_block("chr1", 1, 3);
        }
        let runs = acc.runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].depth, 2);
    }

    #[test]
    fn chromosomes_emit_in_lexicographic_order() {
        let mut acc = CoverageAccumulator::new(None);
        acc.add_block("chr2", 1, 5);
        acc.add_block("chr1", 1, 5);
        acc.add_block("chr10", 1, 5);

        let runs = acc.runs();
        let chroms: Vec<&str> = runs.iter().map(|r| r.chrom.as_str()).collect();
        assert_eq!(chroms, vec!["chr1", "chr10", "chr2"]);
    }

    #[test]
    fn junction_counts_accumulate_per_key() {
        let mut acc = JunctionAccumulator::new();
        let key = IntronKey::new(100, 200, Strand::Forward);
        acc.add("chr1", key, 20);
        acc.add("chr1", key, 35);
        acc.add("chr1", IntronKey::new(100, 200, Strand::Reverse), 20);

        let emitted = acc.emit(0, None);
        assert_eq!(emitted.records.len(), 2);
        assert_eq!(emitted.records[0].support, 2);
        assert_eq!(emitted.records[0].key.strand, Strand::Forward);
        assert_eq!(emitted.records[1].support, 1);
    }

    #[test]
    fn context_filter_uses_the_best_observation() {
        let mut acc = JunctionAccumulator::new();
        let key = IntronKey::new(100, 200, Strand::Forward);
        acc.add("chr1", key, 3);
        acc.add("chr1", key, 12);

        let emitted = acc.emit(10, None);
        assert_eq!(emitted.records.len(), 1);
        assert_eq!(emitted.records[0].support, 2);
        assert_eq!(emitted.dropped_context, 0);

        let strict = acc.emit(13, None);
        assert!(strict.records.is_empty());
        assert_eq!(strict.dropped_context, 1);
    }

    #[test]
    fn calibrated_support_rule_drops_long_weak_junctions() {
        let stats = SpliceStatistics {
            mean_gap: 100.0,
            sd_gap: 10.0,
            mean_read_length: 100.0,
            sensitivity: 1.0,
        };
        let mut acc = JunctionAccumulator::new();
        // length 1000: threshold (1000 - 100) / 10 = 90, one read is not enough
        acc.add("chr1", IntronKey::new(1, 1001, Strand::Forward), 20);
        // length 100: threshold 0
        acc.add("chr1", IntronKey::new(1, 101, Strand::Forward), 20);

        let emitted = acc.emit(0, Some(&stats));
        assert_eq!(emitted.records.len(), 1);
        assert_eq!(emitted.records[0].key.len(), 100);
        assert_eq!(emitted.dropped_support, 1);
        assert_eq!(emitted.lengths.total(), 1);
    }

    #[test]
    fn intron_rows_follow_the_gff_layout() {
        let mut acc = JunctionAccumulator::new();
        acc.add("chr1", IntronKey::new(100, 200, Strand::Forward), 20);
        let emitted = acc.emit(0, None);

        let mut out = Vec::new();
        emitted.write_gff(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "##gff-version 3\nchr1\tRNAseq\tintron\t100\t200\t1\t+\t.\t.\n"
        );
    }
}
