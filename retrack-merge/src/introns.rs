//! Intron shard merging.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use retrack_core::models::{IntronKey, IntronRecord, LengthHistogram};
use retrack_core::tracks::read_intron_file;

/// Support sums keyed by reference sequence, then junction.
type JunctionMap = BTreeMap<String, BTreeMap<IntronKey, u64>>;

/// Merge per-shard intron files into one consolidated, sorted file.
///
/// Support counts are summed per `(chrom, start, end, strand)` key. The first
/// shard's `#` header lines are passed through; later headers are discarded.
/// Protocol output matches the coverage merger, followed by the merged
/// length-distribution table.
pub fn merge_intron_files(output: &Path, shards: &[PathBuf]) -> Result<()> {
    let mut headers: Vec<String> = Vec::new();
    let mut junctions = JunctionMap::new();

    for (index, path) in shards.iter().enumerate() {
        println!("{index}\t{}", path.display());
        let file = read_intron_file(path)?;
        // a header-less shard defers to the next one that has headers
        if headers.is_empty() {
            headers = file.headers;
        }
        for record in &file.records {
            add_record(&mut junctions, record);
        }
    }
    println!();

    println!("write");
    let records = sorted_records(&junctions);
    let mut writer = BufWriter::new(
        File::create(output).with_context(|| format!("Failed to create {:?}", output))?,
    );
    for header in &headers {
        writeln!(writer, "{header}")?;
    }
    for record in &records {
        writeln!(writer, "{}", record.as_row())?;
    }
    writer.flush()?;

    for line in length_report(&records) {
        println!("{line}");
    }

    Ok(())
}

fn add_record(junctions: &mut JunctionMap, record: &IntronRecord) {
    *junctions
        .entry(record.chrom.clone())
        .or_default()
        .entry(record.key)
        .or_insert(0) += record.support;
}

/// Flatten the merged map: chromosomes lexicographic, keys by
/// (start, end, strand).
fn sorted_records(junctions: &JunctionMap) -> Vec<IntronRecord> {
    junctions
        .iter()
        .flat_map(|(chrom, per_key)| {
            per_key
                .iter()
                .map(|(key, &support)| IntronRecord::new(chrom.clone(), *key, support))
        })
        .collect()
}

/// `length\tcount\tcumulative-fraction` rows over the merged junctions,
/// ascending by length.
fn length_report(records: &[IntronRecord]) -> Vec<String> {
    let mut lengths = LengthHistogram::new();
    for record in records {
        lengths.add(record.key.len());
    }
    lengths
        .cumulative_report()
        .into_iter()
        .map(|(length, count, fraction)| format!("{length}\t{count}\t{fraction:.4}"))
        .collect()
}
