//! Flat-file contracts for coverage and intron tracks.
//!
//! Coverage files are tab-separated `chrom  start  end  depth` rows behind a
//! single `track type=bedgraph` header line. Intron files are GFF-style with
//! `#`-prefixed header lines and at least seven data columns. Both the shard
//! merger and the intron reporter parse through these functions so the two
//! never disagree about the format. Malformed rows are not skipped; parsing
//! failures propagate and abort the run.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::errors::TrackError;
use crate::models::{CoverageRun, IntronKey, IntronRecord, Strand};
use crate::utils::get_dynamic_reader;
use std::io::BufRead;

/// Header line written at the top of every coverage file.
pub const COVERAGE_TRACK_HEADER: &str = "track type=bedgraph";

/// First header line of every intron file.
pub const INTRON_GFF_HEADER: &str = "##gff-version 3";

fn parse_u32(field: &'static str, value: &str) -> Result<u32, TrackError> {
    value.parse::<u32>().map_err(|_| TrackError::NumericField {
        field,
        value: value.to_string(),
    })
}

fn parse_u64(field: &'static str, value: &str) -> Result<u64, TrackError> {
    value.parse::<u64>().map_err(|_| TrackError::NumericField {
        field,
        value: value.to_string(),
    })
}

/// Parse one coverage data row: `chrom\tstart\tend\tdepth`.
pub fn parse_coverage_row(line: &str) -> Result<CoverageRun, TrackError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 4 {
        return Err(TrackError::ColumnCount {
            expected: 4,
            found: fields.len(),
            line: line.to_string(),
        });
    }

    let start = parse_u32("start", fields[1])?;
    let end = parse_u32("end", fields[2])?;
    if end < start {
        return Err(TrackError::InvertedInterval {
            start,
            end,
            line: line.to_string(),
        });
    }

    Ok(CoverageRun {
        chrom: fields[0].to_string(),
        start,
        end,
        depth: parse_u32("depth", fields[3])?,
    })
}

/// Parse one intron data row. At least seven GFF columns are required:
/// `chrom  source  type  start  end  score  strand`.
pub fn parse_intron_row(line: &str) -> Result<IntronRecord, TrackError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 7 {
        return Err(TrackError::ColumnCount {
            expected: 7,
            found: fields.len(),
            line: line.to_string(),
        });
    }

    let strand: Strand = fields[6].parse()?;
    let start = parse_u32("start", fields[3])?;
    let end = parse_u32("end", fields[4])?;
    if end < start {
        return Err(TrackError::InvertedInterval {
            start,
            end,
            line: line.to_string(),
        });
    }

    Ok(IntronRecord {
        chrom: fields[0].to_string(),
        key: IntronKey { start, end, strand },
        support: parse_u64("score", fields[5])?,
    })
}

/// Fold a sparse per-position depth map into the unique maximal-run
/// decomposition for one reference sequence.
///
/// Positions are visited in ascending order; a run is extended while the next
/// position abuts the current end and carries the same depth. Uncovered
/// positions never appear in the map, so they break runs naturally.
pub fn compress_depths(chrom: &str, depths: &BTreeMap<u32, u32>) -> Vec<CoverageRun> {
    let mut runs: Vec<CoverageRun> = Vec::new();

    for (&pos, &depth) in depths {
        match runs.last_mut() {
            Some(run) if run.end == pos && run.depth == depth => run.end = pos + 1,
            _ => runs.push(CoverageRun::new(chrom, pos, pos + 1, depth)),
        }
    }

    runs
}

/// Contents of one intron file: leading `#` header lines verbatim, then the
/// parsed data rows in file order.
#[derive(Debug, Default)]
pub struct IntronFile {
    pub headers: Vec<String>,
    pub records: Vec<IntronRecord>,
}

/// Read an entire intron file. Header lines may only appear before the first
/// data row; a malformed data row aborts with the offending line in context.
pub fn read_intron_file<T: AsRef<Path>>(path: T) -> Result<IntronFile> {
    let path = path.as_ref();
    let reader = get_dynamic_reader(path)?;

    let mut file = IntronFile::default();
    for line in reader.lines() {
        let line = line.with_context(|| format!("Failed reading intron file {:?}", path))?;
        if line.is_empty() {
            continue;
        }
        if line.starts_with('#') && file.records.is_empty() {
            file.headers.push(line);
            continue;
        }
        let record = parse_intron_row(&line)
            .with_context(|| format!("Malformed intron row in {:?}", path))?;
        file.records.push(record);
    }

    Ok(file)
}
