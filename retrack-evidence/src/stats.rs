//! Split-read gap calibration.
//!
//! A calibration pass over one or more alignment sources measures the mean and
//! standard deviation of intronic gap lengths together with the mean read
//! length. The resulting [`SpliceStatistics`] value is read-only and offers the
//! acceptance rule downstream junction filtering uses: longer introns require
//! proportionally more supporting reads.

use crate::records::AlignmentRecord;

/// Streaming accumulator for gap and read-length moments.
#[derive(Debug, Default)]
pub struct SpliceStatsBuilder {
    min_intron_length: u32,
    gap_sum: f64,
    gap_sum_sq: f64,
    gap_count: u64,
    read_length_sum: u64,
    read_count: u64,
}

impl SpliceStatsBuilder {
    pub fn new(min_intron_length: u32) -> Self {
        SpliceStatsBuilder {
            min_intron_length,
            ..Default::default()
        }
    }

    pub fn add_record(&mut self, record: &AlignmentRecord) {
        self.read_length_sum += record.sequence.len() as u64;
        self.read_count += 1;

        for pair in record.blocks.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let gap =
                (i64::from(b.ref_start) - i64::from(a.ref_start + a.len)).unsigned_abs() + 1;
            if gap > u64::from(self.min_intron_length) {
                let g = gap as f64;
                self.gap_sum += g;
                self.gap_sum_sq += g * g;
                self.gap_count += 1;
            }
        }
    }

    /// With no qualifying gaps the mean and standard deviation are NaN, and
    /// [`SpliceStatistics::is_supported`] accepts everything.
    pub fn finish(self, sensitivity: f64) -> SpliceStatistics {
        let n = self.gap_count as f64;
        let mean_gap = self.gap_sum / n;
        let sd_gap = (self.gap_sum_sq / n - mean_gap * mean_gap).sqrt();
        let mean_read_length = if self.read_count == 0 {
            f64::NAN
        } else {
            self.read_length_sum as f64 / self.read_count as f64
        };

        SpliceStatistics {
            mean_gap,
            sd_gap,
            mean_read_length,
            sensitivity,
        }
    }
}

/// Gap-length moments for one calibration run. Immutable once built.
#[derive(Debug, Clone, Copy)]
pub struct SpliceStatistics {
    pub mean_gap: f64,
    pub sd_gap: f64,
    pub mean_read_length: f64,
    pub sensitivity: f64,
}

impl SpliceStatistics {
    /// Whether `count` split reads are enough support for a junction of
    /// length `gap_length`.
    ///
    /// The required support grows linearly with how far the junction length
    /// sits above the calibrated mean, in units of the standard deviation.
    pub fn is_supported(&self, gap_length: u32, count: u64) -> bool {
        let threshold = self.sensitivity * (f64::from(gap_length) - self.mean_gap) / self.sd_gap;
        // a NaN threshold (degenerate calibration) never rejects
        threshold.is_nan() || count as f64 >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::records::test_support::record_with_blocks;

    #[test]
    fn moments_over_a_fixed_record_set_are_deterministic() {
        // gaps: |101 - (1 + 50)| + 1 = 51 and |201 - (1 + 50)| + 1 = 151
        let records = vec![
            record_with_blocks("chr1", 40, &[(1, 0, 50), (101, 50, 50)]),
            record_with_blocks("chr1", 40, &[(1, 0, 50), (201, 50, 50)]),
        ];

        let mut builder = SpliceStatsBuilder::new(30);
        for record in &records {
            builder.add_record(record);
        }
        let stats = builder.finish(1.0);

        assert_eq!(stats.mean_gap, 101.0);
        assert_eq!(stats.sd_gap, 50.0);
        assert_eq!(stats.mean_read_length, 100.0);
    }

    #[test]
    fn gaps_at_or_below_the_minimum_are_ignored() {
        // gap = |61 - 51| + 1 = 11
        let record = record_with_blocks("chr1", 40, &[(1, 0, 50), (61, 50, 50)]);
        let mut builder = SpliceStatsBuilder::new(11);
        builder.add_record(&record);
        let stats = builder.finish(1.0);
        assert!(stats.mean_gap.is_nan());
        assert!(stats.sd_gap.is_nan());
    }

    #[test]
    fn support_threshold_scales_with_gap_length() {
        let stats = SpliceStatistics {
            mean_gap: 100.0,
            sd_gap: 50.0,
            mean_read_length: 100.0,
            sensitivity: 2.0,
        };
        // threshold for gap 200: 2 * (200 - 100) / 50 = 4
        assert!(stats.is_supported(200, 4));
        assert!(!stats.is_supported(200, 3));
        // gaps below the mean have a negative threshold, always supported
        assert!(stats.is_supported(50, 0));
    }

    #[test]
    fn degenerate_calibration_never_rejects() {
        let stats = SpliceStatsBuilder::new(30).finish(10.0);
        assert!(stats.mean_gap.is_nan());
        assert!(stats.is_supported(10_000, 0));
    }
}
