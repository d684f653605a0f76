//! Small numeric routines: softmax, argmax, rounding and probability checks.

/// Numerically stable softmax.
///
/// The maximum score is subtracted before exponentiating so large scores
/// cannot overflow. Returns `None` for empty or non-finite input.
pub fn softmax(scores: &[f64]) -> Option<Vec<f64>> {
    if scores.is_empty() || scores.iter().any(|s| !s.is_finite()) {
        return None;
    }
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return None;
    }
    Some(exps.into_iter().map(|e| e / total).collect())
}

/// Index of the largest value; ties resolve to the lowest index.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((idx, v)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Whether `probs` is a usable distribution over `n_classes` classes.
///
/// Entries must be finite and non-negative, and the total positive.
pub fn is_probability_vector(probs: &[f64], n_classes: usize) -> bool {
    if probs.len() != n_classes || n_classes == 0 {
        return false;
    }
    if probs.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return false;
    }
    probs.iter().sum::<f64>() > 0.0
}
