//! Small numeric helpers shared by the sampler and the estimator.

use geolift_core::AggregationMethod;

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance with Bessel's correction. Zero for fewer than two values.
pub fn sample_variance(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let squared: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    squared / (values.len() - 1) as f64
}

/// Median, averaging the two middle values for even-length input.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Collapse a location's values with the chosen method.
pub fn aggregate(method: AggregationMethod, values: &[f64]) -> Option<f64> {
    match method {
        AggregationMethod::Mean => mean(values),
        AggregationMethod::Sum if values.is_empty() => None,
        AggregationMethod::Sum => Some(values.iter().sum()),
        AggregationMethod::Median => median(values),
    }
}

/// Linearly interpolated quantile of an ascending slice.
///
/// Position is `p * (len - 1)`; a whole-number position returns that sample,
/// anything else blends the two bracketing order statistics.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&p) {
        return None;
    }
    let index = p * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;
    if lower == upper {
        return Some(sorted[lower]);
    }
    let weight = index - lower as f64;
    Some(sorted[lower] * (1.0 - weight) + sorted[upper] * weight)
}

/// `n` evenly spaced probabilities covering `[0, 1]`; `[0]` when `n == 1`.
pub fn evenly_spaced_probabilities(n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..n).map(|i| i as f64 / (n - 1) as f64).collect(),
    }
}

/// Index of the value closest to `target`. Ties keep the earliest index.
pub fn nearest_index(values: &[f64], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.iter().enumerate() {
        let distance = (v - target).abs();
        match best {
            Some((_, d)) if distance >= d => {}
            _ => best = Some((i, distance)),
        }
    }
    best.map(|(i, _)| i)
}

/// Two-sided p-value for a z-score using the Abramowitz–Stegun tail
/// approximation of the standard normal.
pub fn two_sided_p_value(z: f64) -> f64 {
    if !z.is_finite() {
        return if z.is_nan() { 1.0 } else { 0.0 };
    }
    let z = z.abs();
    let t = 1.0 / (1.0 + 0.2316419 * z);
    let d = 0.3989422804014327;
    let tail = d
        * (-z * z / 2.0).exp()
        * (t * (0.3193815
            + t * (-0.3565638 + t * (1.781478 + t * (-1.821256 + t * 1.330274)))));
    (2.0 * tail).clamp(0.0, 1.0)
}

/// Welch–Satterthwaite degrees of freedom for two independent samples.
pub fn welch_degrees_of_freedom(var_a: f64, n_a: usize, var_b: f64, n_b: usize) -> Option<f64> {
    if n_a < 2 || n_b < 2 {
        return None;
    }
    let a = var_a / n_a as f64;
    let b = var_b / n_b as f64;
    let denominator = a * a / (n_a - 1) as f64 + b * b / (n_b - 1) as f64;
    if denominator <= 0.0 {
        return None;
    }
    Some((a + b).powi(2) / denominator)
}
