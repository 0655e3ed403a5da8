use std::collections::BTreeMap;

///
/// Histogram of junction lengths, accumulated while emitting intron rows.
/// Owned by one run and passed explicitly; there is no process-global state.
///
#[derive(Debug, Default, Clone)]
pub struct LengthHistogram {
    counts: BTreeMap<u32, u64>,
    total: u64,
}

impl LengthHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, length: u32) {
        *self.counts.entry(length).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Smallest and largest observed length, `None` while empty.
    pub fn range(&self) -> Option<(u32, u32)> {
        let min = self.counts.keys().next()?;
        let max = self.counts.keys().next_back()?;
        Some((*min, *max))
    }

    /// Report rows in ascending length order:
    /// `(length, count at length, cumulative fraction of all junctions)`.
    pub fn cumulative_report(&self) -> Vec<(u32, u64, f64)> {
        let mut seen = 0u64;
        self.counts
            .iter()
            .map(|(&length, &count)| {
                seen += count;
                (length, count, seen as f64 / self.total as f64)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cumulative_fractions_ascend_to_one() {
        let mut hist = LengthHistogram::new();
        for length in [100, 100, 100, 250, 4000] {
            hist.add(length);
        }

        let report = hist.cumulative_report();
        assert_eq!(report[0], (100, 3, 0.6));
        assert_eq!(report[1], (250, 1, 0.8));
        assert_eq!(report[2], (4000, 1, 1.0));
        assert_eq!(hist.range(), Some((100, 4000)));
    }

    #[test]
    fn empty_histogram_reports_nothing() {
        let hist = LengthHistogram::new();
        assert!(hist.is_empty());
        assert!(hist.cumulative_report().is_empty());
        assert_eq!(hist.range(), None);
    }
}
