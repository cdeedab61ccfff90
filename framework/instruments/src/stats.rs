//! Summary statistics over observed durations, in milliseconds.
//!
//! Quantiles use the indexed rule: the value at `floor(p * n)` of the sorted sequence, clamped to
//! the last index. No interpolation is done so results are reproducible across tools.

use itertools::{Itertools, MinMaxResult};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StatsError {
    #[error("Cannot compute the {0} of an empty sequence")]
    Empty(&'static str),
    #[error("Quantile probability must be within [0, 1], got {0}")]
    ProbabilityOutOfRange(f64),
    #[error("A histogram needs at least one bin")]
    NoBins,
}

pub type StatsResult<T> = Result<T, StatsError>;

pub fn min(values: &[f64]) -> StatsResult<f64> {
    values
        .iter()
        .copied()
        .min_by(f64::total_cmp)
        .ok_or(StatsError::Empty("min"))
}

pub fn max(values: &[f64]) -> StatsResult<f64> {
    values
        .iter()
        .copied()
        .max_by(f64::total_cmp)
        .ok_or(StatsError::Empty("max"))
}

pub fn mean(values: &[f64]) -> StatsResult<f64> {
    if values.is_empty() {
        return Err(StatsError::Empty("mean"));
    }

    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation.
pub fn standard_deviation(values: &[f64]) -> StatsResult<f64> {
    let mean = mean(values).map_err(|_| StatsError::Empty("standard deviation"))?;
    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / values.len() as f64;

    Ok(variance.sqrt())
}

pub fn quantile(values: &[f64], p: f64) -> StatsResult<f64> {
    if !(0.0..=1.0).contains(&p) {
        return Err(StatsError::ProbabilityOutOfRange(p));
    }
    if values.is_empty() {
        return Err(StatsError::Empty("quantile"));
    }

    Ok(quantile_sorted(&sorted(values), p))
}

pub fn median(values: &[f64]) -> StatsResult<f64> {
    quantile(values, 0.5).map_err(|_| StatsError::Empty("median"))
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// `sorted` must be non-empty.
fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let index = ((p * sorted.len() as f64).floor() as usize).min(sorted.len() - 1);
    sorted[index]
}

/// Box plot figures for one series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhiskerStats {
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
}

impl WhiskerStats {
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Whiskers reach 1.5 IQR beyond the quartiles, clipped to the observed range. Values outside the
/// whiskers are outliers for display only.
pub fn whisker_stats(values: &[f64]) -> StatsResult<WhiskerStats> {
    if values.is_empty() {
        return Err(StatsError::Empty("whiskers"));
    }

    let sorted = sorted(values);
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let q1 = quantile_sorted(&sorted, 0.25);
    let median = quantile_sorted(&sorted, 0.5);
    let q3 = quantile_sorted(&sorted, 0.75);
    let iqr = q3 - q1;

    Ok(WhiskerStats {
        min,
        max,
        median,
        q1,
        q3,
        lower_whisker: min.max(q1 - 1.5 * iqr),
        upper_whisker: max.min(q3 + 1.5 * iqr),
    })
}

/// Count `values` into `bins` equal-width bins spanning `[min, max]`.
///
/// A value equal to `max` lands in the last bin. When `min == max` every value lands in the first
/// bin.
pub fn histogram(values: &[f64], bins: usize, min: f64, max: f64) -> StatsResult<Vec<usize>> {
    if bins == 0 {
        return Err(StatsError::NoBins);
    }

    let bin_width = (max - min) / bins as f64;
    let mut histogram = vec![0; bins];
    for value in values {
        let bin = if bin_width > 0.0 {
            // Casting saturates, values below `min` end up in the first bin.
            (((value - min) / bin_width).floor() as usize).min(bins - 1)
        } else {
            0
        };
        histogram[bin] += 1;
    }

    Ok(histogram)
}

/// Histograms for several series sharing one global range, so the bins line up for comparison.
pub fn histograms(series: &[&[f64]], bins: usize) -> StatsResult<Histograms> {
    if bins == 0 {
        return Err(StatsError::NoBins);
    }

    let range = series
        .iter()
        .flat_map(|values| values.iter().copied())
        .minmax_by(f64::total_cmp);
    let (min, max) = match range {
        MinMaxResult::NoElements => return Err(StatsError::Empty("histogram")),
        MinMaxResult::OneElement(value) => (value, value),
        MinMaxResult::MinMax(min, max) => (min, max),
    };

    let counts = series
        .iter()
        .map(|values| histogram(values, bins, min, max))
        .collect::<StatsResult<Vec<_>>>()?;

    Ok(Histograms { min, max, counts })
}

#[derive(Debug, Clone, PartialEq)]
pub struct Histograms {
    pub min: f64,
    pub max: f64,
    /// One row of bin counts per input series.
    pub counts: Vec<Vec<usize>>,
}

impl Histograms {
    pub fn bins(&self) -> usize {
        self.counts.first().map(Vec::len).unwrap_or_default()
    }

    pub fn bin_width(&self) -> f64 {
        match self.bins() {
            0 => 0.0,
            bins => (self.max - self.min) / bins as f64,
        }
    }
}

/// Mean per batch for live charting. An empty batch repeats the last known mean, or `0` when no
/// batch has had data yet.
pub fn forward_fill_means<'a>(batches: impl IntoIterator<Item = &'a [f64]>) -> Vec<f64> {
    let mut last_known = 0.0;
    batches
        .into_iter()
        .map(|batch| {
            if let Ok(mean) = mean(batch) {
                last_known = mean;
            }
            last_known
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const ONE_TO_TEN: [f64; 10] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];

    #[test]
    fn median_uses_the_indexed_rule() {
        assert_eq!(median(&ONE_TO_TEN), Ok(6.0));
        assert_eq!(median(&[3.0, 1.0, 2.0]), Ok(2.0));
        assert_eq!(median(&[7.0]), Ok(7.0));
    }

    #[test]
    fn quartiles_of_one_to_ten() {
        assert_eq!(quantile(&ONE_TO_TEN, 0.25), Ok(3.0));
        assert_eq!(quantile(&ONE_TO_TEN, 0.75), Ok(8.0));
    }

    #[test]
    fn quantile_is_clamped_at_the_top() {
        assert_eq!(quantile(&ONE_TO_TEN, 1.0), Ok(10.0));
        assert_eq!(quantile(&ONE_TO_TEN, 0.0), Ok(1.0));
    }

    #[test]
    fn quantile_does_not_depend_on_input_order() {
        let shuffled = [9.0, 2.0, 10.0, 4.0, 1.0, 7.0, 3.0, 8.0, 6.0, 5.0];
        assert_eq!(quantile(&shuffled, 0.25), Ok(3.0));
    }

    #[test]
    fn quantile_rejects_bad_probability() {
        assert_eq!(
            quantile(&ONE_TO_TEN, 1.5),
            Err(StatsError::ProbabilityOutOfRange(1.5))
        );
        assert!(quantile(&ONE_TO_TEN, f64::NAN).is_err());
    }

    #[test]
    fn mean_and_population_standard_deviation() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), Ok(5.0));
        assert_eq!(standard_deviation(&values), Ok(2.0));
    }

    #[test]
    fn empty_input_is_an_explicit_error() {
        assert_eq!(min(&[]), Err(StatsError::Empty("min")));
        assert_eq!(max(&[]), Err(StatsError::Empty("max")));
        assert_eq!(mean(&[]), Err(StatsError::Empty("mean")));
        assert_eq!(median(&[]), Err(StatsError::Empty("median")));
        assert_eq!(
            standard_deviation(&[]),
            Err(StatsError::Empty("standard deviation"))
        );
        assert!(whisker_stats(&[]).is_err());
        assert!(histograms(&[&[]], 4).is_err());
    }

    #[test]
    fn whiskers_are_clipped_to_the_observed_range() {
        let stats = whisker_stats(&ONE_TO_TEN).unwrap();

        assert_eq!(stats.q1, 3.0);
        assert_eq!(stats.median, 6.0);
        assert_eq!(stats.q3, 8.0);
        assert_eq!(stats.iqr(), 5.0);
        assert_eq!(stats.lower_whisker, 1.0);
        assert_eq!(stats.upper_whisker, 10.0);
    }

    #[test]
    fn whiskers_exclude_outliers() {
        let mut values = vec![10.0; 8];
        values.extend([11.0, 12.0, 13.0, 14.0, 500.0]);

        let stats = whisker_stats(&values).unwrap();

        // q1 = 10, q3 = 12, iqr = 2
        assert_eq!(stats.upper_whisker, 15.0);
        assert_eq!(stats.lower_whisker, 10.0);
        assert_eq!(stats.max, 500.0);
    }

    #[test]
    fn maximum_lands_in_the_last_bin() {
        assert_eq!(histogram(&[0.0, 5.0, 10.0], 2, 0.0, 10.0), Ok(vec![1, 2]));
        assert_eq!(histogram(&ONE_TO_TEN, 3, 1.0, 10.0), Ok(vec![3, 3, 4]));
    }

    #[test]
    fn degenerate_range_uses_the_first_bin() {
        assert_eq!(histogram(&[4.0, 4.0], 3, 4.0, 4.0), Ok(vec![2, 0, 0]));
    }

    #[test]
    fn zero_bins_is_an_error() {
        assert_eq!(histogram(&[1.0], 0, 0.0, 1.0), Err(StatsError::NoBins));
        assert_eq!(histograms(&[&[1.0]], 0), Err(StatsError::NoBins));
    }

    #[test]
    fn histograms_share_a_global_range() {
        let fast = [1.0, 2.0];
        let slow = [9.0, 11.0];

        let result = histograms(&[&fast, &slow], 2).unwrap();

        assert_eq!(result.min, 1.0);
        assert_eq!(result.max, 11.0);
        assert_eq!(result.bin_width(), 5.0);
        assert_eq!(result.counts, vec![vec![2, 0], vec![0, 2]]);
    }

    #[test]
    fn forward_fill_carries_the_last_mean() {
        let batches: Vec<Vec<f64>> = vec![vec![], vec![2.0, 4.0], vec![], vec![10.0], vec![]];

        let means = forward_fill_means(batches.iter().map(Vec::as_slice));

        assert_eq!(means, vec![0.0, 3.0, 3.0, 10.0, 10.0]);
    }
}
