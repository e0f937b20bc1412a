use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::types::Percentiles;

/// Descriptive statistics over a sorted sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub percentiles: Percentiles,
}

/// Sort ascending; NaN-free input is assumed (validated upstream).
pub fn sort_ascending(values: &mut [f64]) {
    values.sort_by(|a, b| a.total_cmp(b));
}

/// Index `floor(n * p)`, clamped to the last element.
pub fn percentile_index(n: usize, p: f64) -> usize {
    debug_assert!(n > 0);
    ((n as f64 * p).floor() as usize).min(n - 1)
}

/// Percentiles of a **sorted**, non-empty slice at index `floor(n * p)`.
pub fn percentiles_sorted(sorted: &[f64]) -> Percentiles {
    let n = sorted.len();
    let at = |p: f64| sorted[percentile_index(n, p)];
    Percentiles {
        p5: at(0.05),
        p25: at(0.25),
        p50: at(0.50),
        p75: at(0.75),
        p95: at(0.95),
    }
}

/// Mean, population standard deviation, range and percentiles of a
/// **sorted**, non-empty slice.
pub fn summarize_sorted(sorted: &[f64]) -> SummaryStats {
    let std_dev = if sorted.len() > 1 {
        sorted.iter().population_std_dev()
    } else {
        0.0
    };
    SummaryStats {
        mean: sorted.iter().mean(),
        std_dev,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        percentiles: percentiles_sorted(sorted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_index_floor() {
        assert_eq!(percentile_index(10_000, 0.05), 500);
        assert_eq!(percentile_index(10_000, 0.95), 9_500);
        assert_eq!(percentile_index(3, 0.50), 1);
        assert_eq!(percentile_index(1, 0.95), 0);
    }

    #[test]
    fn test_percentiles_of_known_sample() {
        let sorted: Vec<f64> = (0..100).map(f64::from).collect();
        let p = percentiles_sorted(&sorted);
        assert_eq!(p.as_array(), [5.0, 25.0, 50.0, 75.0, 95.0]);
    }

    #[test]
    fn test_summary_of_constant_sample() {
        let sorted = vec![3.5; 1_000];
        let s = summarize_sorted(&sorted);
        assert_eq!(s.mean, 3.5);
        assert_eq!(s.std_dev, 0.0);
        assert_eq!(s.min, s.max);
    }

    #[test]
    fn test_sort_ascending() {
        let mut v = vec![3.0, -1.0, 2.0];
        sort_ascending(&mut v);
        assert_eq!(v, vec![-1.0, 2.0, 3.0]);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(128))]

            #[test]
            fn percentiles_are_ordered(mut values in prop::collection::vec(-1.0e9f64..1.0e9, 1..500)) {
                sort_ascending(&mut values);
                let s = summarize_sorted(&values);
                let p = s.percentiles.as_array();
                prop_assert!(p.windows(2).all(|w| w[0] <= w[1]));
                prop_assert!(s.min <= p[0] && p[4] <= s.max);
            }
        }
    }
}
