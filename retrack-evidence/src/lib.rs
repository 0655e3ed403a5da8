//! RNA-seq evidence extraction from BAM alignments.
//!
//! This crate streams alignment records through a mapping-reliability filter
//! and turns the survivors into per-shard evidence files: run-length
//! compressed coverage tracks (bedgraph) and split-read junction tables
//! (GFF). An optional calibration pass measures the gap-length distribution
//! first so long junctions with thin support can be suppressed.

pub mod counting;
pub mod filter;
pub mod records;
pub mod stats;

pub use counting::{CoverageAccumulator, EmittedIntrons, JunctionAccumulator};
pub use filter::{ReadFilter, Verdict};
pub use records::{AlignmentBlock, AlignmentRecord, BamSource, Strandedness};
pub use stats::{SpliceStatsBuilder, SpliceStatistics};

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::ProgressBar;

use retrack_core::models::IntronKey;
use retrack_core::utils::read_fasta;

/// Knobs of one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub strandedness: Strandedness,
    /// Mapping-quality floor; a record exactly at the floor passes.
    pub min_quality: u8,
    /// Shortest flanking match a junction needs to be reported.
    pub min_context: u32,
    /// Reference gaps at or below this length are indels, not introns.
    pub min_intron_length: u32,
    /// Cap on reported coverage depth.
    pub max_coverage: Option<u32>,
    pub positions_around_splice_site: u32,
    pub max_mismatches: u32,
    /// Reference genome; enables the splice-boundary mismatch filter.
    pub genome: Option<PathBuf>,
    /// Sensitivity of the length-scaled support rule; `0.0` disables the
    /// calibration pass entirely.
    pub sensitivity: f64,
    /// Whether to write coverage tracks at all.
    pub coverage: bool,
    pub use_secondary: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            strandedness: Strandedness::Unstranded,
            min_quality: 40,
            min_context: 1,
            min_intron_length: 30,
            max_coverage: None,
            positions_around_splice_site: 10,
            max_mismatches: 3,
            genome: None,
            sensitivity: 0.0,
            coverage: true,
            use_secondary: false,
        }
    }
}

/// Mapping-quality tallies: all mapped records, records that passed the
/// filter, and spliced records that passed.
pub struct MapqHistogram {
    seen: [u64; 256],
    used: [u64; 256],
    split: [u64; 256],
}

impl Default for MapqHistogram {
    fn default() -> Self {
        MapqHistogram {
            seen: [0; 256],
            used: [0; 256],
            split: [0; 256],
        }
    }
}

impl MapqHistogram {
    fn observe(&mut self, mapq: u8, used: bool, split: bool) {
        let q = mapq as usize;
        self.seen[q] += 1;
        if used {
            self.used[q] += 1;
        }
        if used && split {
            self.split[q] += 1;
        }
    }

    /// `mapq\treads\tused\tsplit` rows for every quality actually seen.
    pub fn rows(&self) -> Vec<String> {
        (0..256)
            .filter(|&q| self.seen[q] > 0)
            .map(|q| format!("{q}\t{}\t{}\t{}", self.seen[q], self.used[q], self.split[q]))
            .collect()
    }
}

impl fmt::Debug for MapqHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapqHistogram")
            .field("rows", &self.rows())
            .finish()
    }
}

/// Per-input-file tallies for the run summary.
#[derive(Debug, Clone)]
pub struct FileCounts {
    pub path: PathBuf,
    pub records: u64,
    pub split_records: u64,
}

/// Everything the run summary reports.
#[derive(Debug, Default)]
pub struct ExtractSummary {
    pub per_file: Vec<FileCounts>,
    pub records_seen: u64,
    pub records_used: u64,
    pub split_records: u64,
    /// Passed the quality floor but failed the splice-boundary mismatch check.
    pub questionable: u64,
    /// Reference gaps too short to be introns, counted as contiguous coverage.
    pub too_short: u64,
    pub introns_written: u64,
    pub dropped_context: u64,
    pub dropped_support: u64,
    pub intron_length_range: Option<(u32, u32)>,
    pub mapq: MapqHistogram,
    pub outputs: Vec<PathBuf>,
}

impl fmt::Display for ExtractSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for counts in &self.per_file {
            writeln!(
                f,
                "{}\t{} reads\t{} split reads",
                counts.path.display(),
                counts.records,
                counts.split_records
            )?;
        }
        writeln!(f)?;
        writeln!(f, "reads: {}", self.records_seen)?;
        writeln!(f, "used reads: {}", self.records_used)?;
        writeln!(f, "split reads: {}", self.split_records)?;
        writeln!(f, "questionable reads: {}", self.questionable)?;
        writeln!(f, "removed short introns: {}", self.too_short)?;
        match self.intron_length_range {
            Some((min, max)) => writeln!(
                f,
                "introns: {} (length {min}..{max})",
                self.introns_written
            )?,
            None => writeln!(f, "introns: 0")?,
        }
        writeln!(f, "introns dropped for context: {}", self.dropped_context)?;
        writeln!(f, "introns dropped for support: {}", self.dropped_support)?;
        writeln!(f)?;
        writeln!(f, "mapq\treads\tused\tsplit")?;
        for row in self.mapq.rows() {
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}

/// Accumulating state of one extraction shard. Records are fed in one at a
/// time; the BAM plumbing lives in [`extract_evidence`], so tests can drive
/// this directly with synthetic records.
pub struct EvidenceBuilder<'a> {
    options: &'a ExtractOptions,
    filter: ReadFilter<'a>,
    forward: CoverageAccumulator,
    reverse: CoverageAccumulator,
    junctions: JunctionAccumulator,
    summary: ExtractSummary,
}

impl<'a> EvidenceBuilder<'a> {
    pub fn new(options: &'a ExtractOptions, genome: Option<&'a HashMap<String, Vec<u8>>>) -> Self {
        let filter = match genome {
            Some(genome) => ReadFilter::with_mismatch_filter(
                options.min_quality,
                options.positions_around_splice_site,
                options.max_mismatches,
                genome,
            ),
            None => ReadFilter::new(options.min_quality),
        };

        EvidenceBuilder {
            options,
            filter,
            forward: CoverageAccumulator::new(options.max_coverage),
            reverse: CoverageAccumulator::new(options.max_coverage),
            junctions: JunctionAccumulator::new(),
            summary: ExtractSummary::default(),
        }
    }

    /// Returns true when the record was counted into the evidence.
    pub fn observe(&mut self, record: &AlignmentRecord) -> bool {
        if record.secondary && !self.options.use_secondary {
            return false;
        }
        self.summary.records_seen += 1;

        let verdict = self.filter.verdict(record);
        let used = verdict == Verdict::Accept;
        self.summary
            .mapq
            .observe(record.mapping_quality, used, record.is_spliced());
        match verdict {
            Verdict::LowQuality => return false,
            Verdict::Mismatched => {
                self.summary.questionable += 1;
                return false;
            }
            Verdict::Accept => {}
        }

        self.summary.records_used += 1;
        if record.is_spliced() {
            self.summary.split_records += 1;
        }

        let coverage = if self.options.strandedness.counts_as_forward(record) {
            &mut self.forward
        } else {
            &mut self.reverse
        };
        if self.options.coverage {
            for block in &record.blocks {
                coverage.add_block(&record.chrom, block.ref_start, block.len);
            }
        }

        let strand = self.options.strandedness.junction_strand(record);
        let context = record.min_block_len();
        for (gap_start, gap_end) in record.gaps() {
            let gap_len = gap_end.saturating_sub(gap_start);
            if gap_len > self.options.min_intron_length {
                self.junctions
                    .add(&record.chrom, IntronKey::new(gap_start, gap_end, strand), context);
            } else if gap_len > 0 {
                // short gaps are indels; count them as covered
                self.summary.too_short += 1;
                if self.options.coverage {
                    coverage.add_span(&record.chrom, gap_start, gap_end);
                }
            }
        }

        true
    }

    /// Write the shard's evidence files and finish the summary.
    pub fn finish(
        mut self,
        out_prefix: &Path,
        stats: Option<&SpliceStatistics>,
    ) -> Result<ExtractSummary> {
        let emitted = self.junctions.emit(self.options.min_context, stats);
        self.summary.introns_written = emitted.records.len() as u64;
        self.summary.dropped_context = emitted.dropped_context;
        self.summary.dropped_support = emitted.dropped_support;
        self.summary.intron_length_range = emitted.lengths.range();

        if self.options.coverage {
            let written = match self.options.strandedness {
                Strandedness::Unstranded => {
                    vec![self.write_coverage(out_prefix, "coverage.bedgraph", &self.forward)?]
                }
                _ => vec![
                    self.write_coverage(out_prefix, "coverage_forward.bedgraph", &self.forward)?,
                    self.write_coverage(out_prefix, "coverage_reverse.bedgraph", &self.reverse)?,
                ],
            };
            self.summary.outputs.extend(written);
        }

        let intron_path = suffixed(out_prefix, "introns.gff");
        let mut writer = BufWriter::new(
            File::create(&intron_path)
                .with_context(|| format!("Failed to create {:?}", intron_path))?,
        );
        emitted.write_gff(&mut writer)?;
        writer.flush()?;
        self.summary.outputs.push(intron_path);

        Ok(self.summary)
    }

    fn write_coverage(
        &self,
        out_prefix: &Path,
        suffix: &str,
        coverage: &CoverageAccumulator,
    ) -> Result<PathBuf> {
        let path = suffixed(out_prefix, suffix);
        let mut writer = BufWriter::new(
            File::create(&path).with_context(|| format!("Failed to create {:?}", path))?,
        );
        coverage.write_bedgraph(&mut writer)?;
        writer.flush()?;
        Ok(path)
    }
}

fn suffixed(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    name.push("_");
    name.push(suffix);
    PathBuf::from(name)
}

/// Run the full extraction over one or more BAM files.
///
/// When `options.sensitivity > 0` a calibration pass streams every file once
/// to measure the gap-length distribution before the counting pass.
pub fn extract_evidence(
    bams: &[PathBuf],
    options: &ExtractOptions,
    out_prefix: &Path,
) -> Result<ExtractSummary> {
    let genome = match &options.genome {
        Some(path) => Some(read_fasta(path)?),
        None => None,
    };

    let stats = if options.sensitivity > 0.0 {
        Some(calibrate(bams, options, genome.as_ref())?)
    } else {
        None
    };

    let mut builder = EvidenceBuilder::new(options, genome.as_ref());
    let spinner = ProgressBar::new_spinner();
    for path in bams {
        spinner.set_message(format!("processing {}", path.display()));
        let mut records = 0u64;
        let mut split_records = 0u64;
        for record in BamSource::open(path)? {
            let record = record.with_context(|| format!("Failed to read {:?}", path))?;
            if builder.observe(&record) {
                records += 1;
                if record.is_spliced() {
                    split_records += 1;
                }
            }
            spinner.tick();
        }
        builder.summary.per_file.push(FileCounts {
            path: path.clone(),
            records,
            split_records,
        });
    }
    spinner.finish_and_clear();

    builder.finish(out_prefix, stats.as_ref())
}

/// Calibration pass: gap-length moments over every record the filter accepts.
fn calibrate(
    bams: &[PathBuf],
    options: &ExtractOptions,
    genome: Option<&HashMap<String, Vec<u8>>>,
) -> Result<SpliceStatistics> {
    let filter = match genome {
        Some(genome) => ReadFilter::with_mismatch_filter(
            options.min_quality,
            options.positions_around_splice_site,
            options.max_mismatches,
            genome,
        ),
        None => ReadFilter::new(options.min_quality),
    };

    let spinner = ProgressBar::new_spinner();
    let mut builder = SpliceStatsBuilder::new(options.min_intron_length);
    for path in bams {
        spinner.set_message(format!("calibrating on {}", path.display()));
        for record in BamSource::open(path)? {
            let record = record.with_context(|| format!("Failed to read {:?}", path))?;
            if (!record.secondary || options.use_secondary) && filter.accept(&record) {
                builder.add_record(&record);
            }
            spinner.tick();
        }
    }
    spinner.finish_and_clear();

    Ok(builder.finish(options.sensitivity))
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use crate::records::test_support::record_with_blocks;

    #[test]
    fn unspliced_records_only_feed_coverage() {
        let options = ExtractOptions {
            min_quality: 0,
            ..Default::default()
        };
        let mut builder = EvidenceBuilder::new(&options, None);
        assert!(builder.observe(&record_with_blocks("chr1", 40, &[(1, 0, 50)])));

        assert_eq!(builder.summary.records_used, 1);
        assert_eq!(builder.summary.split_records, 0);
        assert_eq!(builder.junctions.distinct_junctions(), 0);
        assert!(!builder.forward.is_empty());
    }

    #[test]
    fn long_gaps_become_junctions_and_short_gaps_become_coverage() {
        let options = ExtractOptions {
            min_quality: 0,
            min_intron_length: 30,
            ..Default::default()
        };
        let mut builder = EvidenceBuilder::new(&options, None);
        // gap 1: 51..101 (length 50, junction); gap 2: 151..161 (length 10)
        builder.observe(&record_with_blocks(
            "chr1",
            40,
            &[(1, 0, 50), (101, 50, 50), (161, 100, 50)],
        ));

        assert_eq!(builder.junctions.distinct_junctions(), 1);
        assert_eq!(builder.summary.too_short, 1);

        // the short gap is covered, so 101..211 is one contiguous stretch
        let runs = builder.forward.runs();
        assert_eq!(runs.len(), 2);
        assert_eq!((runs[0].start, runs[0].end), (1, 51));
        assert_eq!((runs[1].start, runs[1].end), (101, 211));
    }

    #[test]
    fn secondary_records_are_skipped_by_default() {
        let options = ExtractOptions {
            min_quality: 0,
            ..Default::default()
        };
        let mut builder = EvidenceBuilder::new(&options, None);
        let mut record = record_with_blocks("chr1", 40, &[(1, 0, 50)]);
        record.secondary = true;
        assert!(!builder.observe(&record));
        assert_eq!(builder.summary.records_seen, 0);

        let permissive = ExtractOptions {
            min_quality: 0,
            use_secondary: true,
            ..Default::default()
        };
        let mut builder = EvidenceBuilder::new(&permissive, None);
        assert!(builder.observe(&record));
    }

    #[test]
    fn stranded_layouts_split_coverage_by_mate_orientation() {
        let options = ExtractOptions {
            min_quality: 0,
            strandedness: Strandedness::SecondStrand,
            ..Default::default()
        };
        let mut builder = EvidenceBuilder::new(&options, None);

        let forward_mate = record_with_blocks("chr1", 40, &[(1, 0, 50)]);
        let mut reverse_mate = record_with_blocks("chr1", 40, &[(1, 0, 50)]);
        reverse_mate.reverse = true;

        builder.observe(&forward_mate);
        builder.observe(&reverse_mate);

        assert!(!builder.forward.is_empty());
        assert!(!builder.reverse.is_empty());
    }

    #[test]
    fn questionable_records_are_counted_but_not_used() {
        let genome = HashMap::from([("chr1".to_string(), vec![b'T'; 200])]);
        let options = ExtractOptions {
            min_quality: 0,
            max_mismatches: 0,
            ..Default::default()
        };
        let mut builder = EvidenceBuilder::new(&options, Some(&genome));
        // spliced, all-A read over an all-T reference
        assert!(!builder.observe(&record_with_blocks("chr1", 40, &[(1, 0, 50), (101, 50, 50)])));

        assert_eq!(builder.summary.questionable, 1);
        assert_eq!(builder.summary.records_used, 0);
        assert!(builder.forward.is_empty());
    }

    #[test]
    fn finish_writes_the_shard_files() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("shard0");

        let options = ExtractOptions {
            min_quality: 0,
            ..Default::default()
        };
        let mut builder = EvidenceBuilder::new(&options, None);
        builder.observe(&record_with_blocks("chr1", 40, &[(1, 0, 50), (101, 50, 50)]));
        let summary = builder.finish(&prefix, None).unwrap();

        assert_eq!(summary.introns_written, 1);
        assert_eq!(summary.intron_length_range, Some((50, 50)));

        let coverage = std::fs::read_to_string(dir.path().join("shard0_coverage.bedgraph")).unwrap();
        assert_eq!(
            coverage,
            "track type=bedgraph\nchr1\t1\t51\t1\nchr1\t101\t151\t1\n"
        );
        let introns = std::fs::read_to_string(dir.path().join("shard0_introns.gff")).unwrap();
        assert_eq!(
            introns,
            "##gff-version 3\nchr1\tRNAseq\tintron\t51\t101\t1\t.\t.\t.\n"
        );
    }

    #[test]
    fn summary_display_carries_the_mapq_table() {
        let options = ExtractOptions {
            min_quality: 30,
            ..Default::default()
        };
        let mut builder = EvidenceBuilder::new(&options, None);
        builder.observe(&record_with_blocks("chr1", 40, &[(1, 0, 50)]));
        builder.observe(&record_with_blocks("chr1", 10, &[(1, 0, 50)]));

        let text = builder.summary.to_string();
        assert!(text.contains("reads: 2"));
        assert!(text.contains("used reads: 1"));
        assert!(text.contains("mapq\treads\tused\tsplit"));
        assert!(text.contains("40\t1\t1\t0"));
        assert!(text.contains("10\t1\t0\t0"));
    }
}
