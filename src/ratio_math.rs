//! Numeric helpers over sequences of optional floats.
//!
//! Missing and non-finite values are dropped before any computation; they are
//! never treated as zero. Aggregates run over the values sorted with
//! [`f64::total_cmp`], which makes every result independent of input order.

/// Finite values from `xs`, sorted ascending.
pub fn clean<I>(xs: I) -> Vec<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut values: Vec<f64> = xs.into_iter().flatten().filter(|x| x.is_finite()).collect();
    values.sort_by(f64::total_cmp);
    values
}

/// Sum of the finite values; `0.0` on empty input.
pub fn sum<I>(xs: I) -> f64
where
    I: IntoIterator<Item = Option<f64>>,
{
    clean(xs).iter().sum()
}

/// Arithmetic mean, `None` on empty input.
pub fn mean<I>(xs: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    mean_sorted(&clean(xs))
}

/// Sample standard deviation (n - 1), `None` for fewer than two values.
pub fn sample_stddev<I>(xs: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let values = clean(xs);
    let n = values.len();
    if n < 2 {
        return None;
    }
    Some((sum_sq_dev(&values)? / (n - 1) as f64).sqrt())
}

/// Population standard deviation (n), `None` for fewer than two values.
pub fn population_stddev<I>(xs: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let values = clean(xs);
    let n = values.len();
    if n < 2 {
        return None;
    }
    Some((sum_sq_dev(&values)? / n as f64).sqrt())
}

/// Continuous percentile with linear interpolation between closest ranks.
///
/// `p` is a fraction in `[0, 1]`; values outside are clamped.
pub fn percentile<I>(xs: I, p: f64) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    percentile_sorted(&clean(xs), p)
}

/// 50th percentile, interpolated.
pub fn median<I>(xs: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    percentile(xs, 0.5)
}

/// Share of the population at or below `target`, scaled to 0-100.
///
/// Undefined when the population is empty or `target` is not one of its values.
pub fn percentile_rank(population: &[f64], target: f64) -> Option<f64> {
    let values = clean(population.iter().copied().map(Some));
    if !values.iter().any(|x| x.to_bits() == target.to_bits()) {
        return None;
    }
    rank_within(&values, target)
}

/// Like [`percentile_rank`] but `target` need not belong to the population.
pub fn projected_percentile_rank(population: &[f64], target: f64) -> Option<f64> {
    let values = clean(population.iter().copied().map(Some));
    rank_within(&values, target)
}

/// Round half away from zero to `places` decimals.
pub fn round_to(x: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (x * factor).round() / factor
}

/// `100 * part / whole`, `None` when `whole == 0`.
pub fn pct(part: usize, whole: usize) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(part as f64 * 100.0 / whole as f64)
    }
}

// Helpers on already-cleaned, sorted slices

fn mean_sorted(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn sum_sq_dev(values: &[f64]) -> Option<f64> {
    let m = mean_sorted(values)?;
    let mut devs: Vec<f64> = values.iter().map(|x| (x - m) * (x - m)).collect();
    devs.sort_by(f64::total_cmp);
    Some(devs.iter().sum())
}

fn percentile_sorted(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() || p.is_nan() {
        return None;
    }
    let p = p.clamp(0.0, 1.0);
    let pos = p * (values.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(values[lo] + (values[hi] - values[lo]) * frac)
}

fn rank_within(values: &[f64], target: f64) -> Option<f64> {
    if values.is_empty() || !target.is_finite() {
        return None;
    }
    let at_or_below = values.iter().filter(|x| **x <= target).count();
    pct(at_or_below, values.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(xs: &[f64]) -> Vec<Option<f64>> {
        xs.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_mean_excludes_missing() {
        assert_eq!(mean(vec![Some(1.0), None, Some(3.0), Some(f64::NAN)]), Some(2.0));
        assert_eq!(mean(Vec::<Option<f64>>::new()), None);
        assert_eq!(mean(vec![None, None]), None);
    }

    #[test]
    fn test_sum_empty_is_zero() {
        assert_eq!(sum(vec![None]), 0.0);
        assert_eq!(sum(some(&[1.5, 2.5])), 4.0);
    }

    #[test]
    fn test_stddev() {
        let xs = some(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(population_stddev(xs.clone()), Some(2.0));
        let sample = sample_stddev(xs).unwrap();
        assert!((sample - 2.138_089_935_299_395).abs() < 1e-12);
        assert_eq!(sample_stddev(some(&[1.0])), None);
        assert_eq!(population_stddev(some(&[1.0])), None);
    }

    #[test]
    fn test_median_interpolates() {
        assert_eq!(median(some(&[1.0, 2.0, 3.0, 4.0])), Some(2.5));
        assert_eq!(median(some(&[3.0, 1.0, 2.0])), Some(2.0));
        assert_eq!(median(some(&[0.9])), Some(0.9));
        assert_eq!(median(vec![None]), None);
    }

    #[test]
    fn test_percentile_bounds() {
        let xs = some(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        assert_eq!(percentile(xs.clone(), 0.0), Some(10.0));
        assert_eq!(percentile(xs.clone(), 1.0), Some(50.0));
        assert_eq!(percentile(xs.clone(), 0.25), Some(20.0));
        assert!((percentile(xs, 0.1).unwrap() - 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentile_rank_requires_membership() {
        let pop = [0.8, 0.9, 1.0, 1.1];
        assert_eq!(percentile_rank(&pop, 0.9), Some(50.0));
        assert_eq!(percentile_rank(&pop, 1.1), Some(100.0));
        assert_eq!(percentile_rank(&pop, 0.95), None);
        assert_eq!(percentile_rank(&[], 0.9), None);
    }

    #[test]
    fn test_projected_percentile_rank() {
        let pop = [0.8, 0.9, 1.0, 1.1];
        assert_eq!(projected_percentile_rank(&pop, 0.95), Some(50.0));
        assert_eq!(projected_percentile_rank(&pop, 0.5), Some(0.0));
        assert_eq!(projected_percentile_rank(&[], 0.5), None);
        assert_eq!(projected_percentile_rank(&pop, f64::NAN), None);
    }

    #[test]
    fn test_order_independent_sum() {
        let a = some(&[0.1, 0.2, 0.3, 1e16, -1e16]);
        let mut b = a.clone();
        b.reverse();
        assert_eq!(sum(a.clone()).to_bits(), sum(b.clone()).to_bits());
        assert_eq!(mean(a).map(f64::to_bits), mean(b).map(f64::to_bits));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(66.666_666, 2), 66.67);
        assert_eq!(round_to(12.25, 1), 12.3);
        assert_eq!(round_to(100.0, 2), 100.0);
    }

    #[test]
    fn test_pct() {
        assert_eq!(pct(1, 4), Some(25.0));
        assert_eq!(pct(0, 0), None);
    }
}
