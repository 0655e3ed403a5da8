pub mod coverage;
pub mod histogram;
pub mod intron;
pub mod strand;

// re-export for cleaner imports
pub use self::coverage::CoverageRun;
pub use self::histogram::LengthHistogram;
pub use self::intron::{IntronKey, IntronRecord};
pub use self::strand::Strand;
