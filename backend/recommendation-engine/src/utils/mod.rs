// Utility functions for recommendation-engine

use std::cmp::Ordering;

/// Small constant added to the standard deviation before dividing
pub const STD_EPSILON: f64 = 1e-8;

/// Keep the `k` best items according to `cmp` and return them sorted.
///
/// Runs a partial selection over the whole slice, then sorts only the retained
/// prefix. `cmp` must be a total order (ties broken inside it) for the output
/// to be deterministic.
pub fn top_k_by<T, F>(mut items: Vec<T>, k: usize, mut cmp: F) -> Vec<T>
where
    F: FnMut(&T, &T) -> Ordering,
{
    if k == 0 || items.is_empty() {
        return Vec::new();
    }

    if k < items.len() {
        items.select_nth_unstable_by(k - 1, &mut cmp);
        items.truncate(k);
    }

    items.sort_by(cmp);
    items
}

/// Descending by score, then ascending by id. NaN sorts last.
pub fn score_desc_then_id(a: (f64, u32), b: (f64, u32)) -> Ordering {
    match (a.0.is_nan(), b.0.is_nan()) {
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        _ => {}
    }
    b.0.partial_cmp(&a.0)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.1.cmp(&b.1))
}

/// Round to a fixed number of decimal digits
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// z-score standardization with population standard deviation
pub fn standardize(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt() + STD_EPSILON;

    values.iter().map(|v| (v - mean) / std).collect()
}
