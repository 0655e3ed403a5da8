//! Consolidation of per-shard evidence files.
//!
//! Cluster jobs produce one coverage file and one intron file per shard;
//! the functions here merge N shards of either kind into a single globally
//! sorted file. Merging is keyed per position (coverage) or per junction
//! (introns), so the result is independent of shard order and grouping.

pub mod coverage;
pub mod introns;

pub use coverage::merge_coverage_files;
pub use introns::merge_intron_files;
