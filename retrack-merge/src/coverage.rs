//! Coverage shard merging.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;

use retrack_core::models::CoverageRun;
use retrack_core::tracks::{compress_depths, parse_coverage_row};
use retrack_core::utils::get_dynamic_reader;

/// Sparse per-position depth sums, keyed by reference sequence.
type DepthMap = BTreeMap<String, BTreeMap<u32, u32>>;

/// Merge per-shard coverage files into one consolidated, maximally
/// run-length compressed file.
///
/// The first shard's header line is passed through; later headers are
/// discarded. Depths are summed per position, so the result is the same for
/// any shard order or grouping. Protocol lines go to standard output: one
/// `index\tpath` line per shard, a blank line, then a `write` marker.
pub fn merge_coverage_files(output: &Path, shards: &[PathBuf]) -> Result<()> {
    let mut header: Option<String> = None;
    let mut depths = DepthMap::new();

    for (index, path) in shards.iter().enumerate() {
        println!("{index}\t{}", path.display());
        let shard_header = read_shard(path, &mut depths)?;
        if header.is_none() {
            header = shard_header;
        }
    }
    println!();

    println!("write");
    let mut writer = BufWriter::new(
        File::create(output).with_context(|| format!("Failed to create {:?}", output))?,
    );
    if let Some(header) = header {
        writeln!(writer, "{header}")?;
    }
    for block in format_chroms(&depths) {
        writer.write_all(block.as_bytes())?;
    }
    writer.flush()?;

    Ok(())
}

/// Read one shard into the depth sums; returns its header line, if any.
fn read_shard(path: &Path, depths: &mut DepthMap) -> Result<Option<String>> {
    let reader = get_dynamic_reader(path)?;
    let mut lines = reader.lines();

    let header = match lines.next() {
        Some(line) => line.with_context(|| format!("Failed reading {:?}", path))?,
        None => return Ok(None),
    };

    for line in lines {
        let line = line.with_context(|| format!("Failed reading {:?}", path))?;
        if line.is_empty() {
            continue;
        }
        let run = parse_coverage_row(&line)
            .with_context(|| format!("Malformed coverage row in {:?}", path))?;
        add_run(depths, &run);
    }

    Ok(Some(header))
}

fn add_run(depths: &mut DepthMap, run: &CoverageRun) {
    let per_pos = depths.entry(run.chrom.clone()).or_default();
    for pos in run.start..run.end {
        *per_pos.entry(pos).or_insert(0) += run.depth;
    }
}

/// Recompress and format the merged depths, one text block per reference
/// sequence. Blocks are built in parallel but returned in map order, so the
/// consolidated file stays lexicographically sorted.
fn format_chroms(depths: &DepthMap) -> Vec<String> {
    depths
        .par_iter()
        .map(|(chrom, per_pos)| {
            let mut block = String::new();
            for run in compress_depths(chrom, per_pos) {
                block.push_str(&run.as_row());
                block.push('\n');
            }
            block
        })
        .collect()
}
