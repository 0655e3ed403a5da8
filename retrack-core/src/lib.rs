//! # Core models and contracts for RNA-seq evidence tracks.
//!
//! This crate holds the pieces every other `retrack` crate needs: the interval
//! models (coverage runs, intron records, strands), the error type for track
//! parsing, the shared readers/writers for the flat coverage and intron file
//! formats, and small I/O helpers (gzip-aware readers, FASTA loading).
pub mod errors;
pub mod models;
pub mod tracks;
pub mod utils;

// re-expose the most used items
pub use errors::*;
pub use models::*;
