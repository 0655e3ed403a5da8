use std::fmt::{self, Display};

///
/// One maximal run of constant read depth on a reference sequence,
/// half-open `[start, end)`.
///
/// Runs are maximal by construction: two adjacent runs on the same
/// reference sequence with `a.end == b.start` never share a depth.
///
#[derive(Eq, PartialEq, Hash, Debug, Clone)]
pub struct CoverageRun {
    pub chrom: String,
    pub start: u32,
    pub end: u32,
    pub depth: u32,
}

impl CoverageRun {
    pub fn new(chrom: impl Into<String>, start: u32, end: u32, depth: u32) -> Self {
        CoverageRun {
            chrom: chrom.into(),
            start,
            end,
            depth,
        }
    }

    /// Number of positions covered by this run.
    pub fn width(&self) -> u32 {
        self.end - self.start
    }

    /// Tab-separated row as written to coverage files.
    pub fn as_row(&self) -> String {
        format!("{}\t{}\t{}\t{}", self.chrom, self.start, self.end, self.depth)
    }
}

impl Display for CoverageRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_row())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_row_is_tab_separated() {
        let run = CoverageRun::new("chr1", 10, 25, 3);
        assert_eq!(run.as_row(), "chr1\t10\t25\t3");
        assert_eq!(run.width(), 15);
    }
}
