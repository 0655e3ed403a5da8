use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result, bail};
use flate2::read::MultiGzDecoder;

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
    let file: Box<dyn Read> = match is_gzipped {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    Ok(BufReader::new(file))
}

///
/// Load a (optionally gzipped) FASTA file fully into memory as a map from
/// sequence name to uppercase sequence bytes.
///
/// The sequence name is the first whitespace-separated token of the header,
/// matching the reference names alignments carry. Acceptable at genome
/// scale; one genome is loaded per run and shared by reference.
///
pub fn read_fasta<T: AsRef<Path>>(path: T) -> Result<HashMap<String, Vec<u8>>> {
    let reader = get_dynamic_reader(path.as_ref())?;

    let mut sequences: HashMap<String, Vec<u8>> = HashMap::new();
    let mut current: Option<String> = None;

    for line in reader.lines() {
        let line = line?;
        if let Some(header) = line.strip_prefix('>') {
            let name = header
                .split_whitespace()
                .next()
                .with_context(|| format!("Empty FASTA header in {:?}", path.as_ref()))?
                .to_string();
            sequences.entry(name.clone()).or_default();
            current = Some(name);
        } else if !line.trim().is_empty() {
            let Some(name) = current.as_ref() else {
                bail!(
                    "FASTA file {:?} has sequence data before the first header",
                    path.as_ref()
                );
            };
            let seq = sequences.get_mut(name).unwrap();
            seq.extend(line.trim_end().bytes().map(|b| b.to_ascii_uppercase()));
        }
    }

    if sequences.is_empty() {
        bail!("No sequences found in FASTA file {:?}", path.as_ref());
    }

    Ok(sequences)
}

/// Complement of one IUPAC nucleotide, identity for unknown codes.
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'G' => b'C',
        b'C' => b'G',
        b'U' => b'A',
        other => other,
    }
}
