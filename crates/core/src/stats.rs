//! Small statistics helpers shared by the metric stages.

/// Arithmetic mean. Returns `None` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation. Returns `None` for an empty slice.
#[must_use]
pub fn population_std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Sample standard deviation (n - 1). Returns `None` with fewer than two values.
#[must_use]
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() as f64 - 1.0);
    Some(variance.sqrt())
}

/// Calculates the z-score of `current` against historical values.
///
/// Returns `None` with insufficient history or zero spread.
#[must_use]
pub fn zscore(history: &[f64], current: f64) -> Option<f64> {
    let m = mean(history)?;
    let stddev = sample_std(history)?;
    if stddev > f64::EPSILON {
        Some((current - m) / stddev)
    } else {
        None
    }
}

/// Divides every value by the largest magnitude so results fall in [-1, 1].
///
/// An all-zero input stays all zero.
#[must_use]
pub fn normalize_max_abs(values: &[f64]) -> Vec<f64> {
    let max_abs = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if max_abs < f64::EPSILON {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| v / max_abs).collect()
}

/// Returns `numerator / denominator`, or `fallback` when the denominator is ~0.
#[must_use]
pub fn safe_div(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if denominator.abs() < f64::EPSILON {
        fallback
    } else {
        numerator / denominator
    }
}

/// Sign agreement of two values: +1 aligned, -1 opposed, 0 if either is zero.
#[must_use]
pub fn alignment(a: f64, b: f64) -> f64 {
    if a.abs() < f64::EPSILON || b.abs() < f64::EPSILON {
        0.0
    } else {
        a.signum() * b.signum()
    }
}
