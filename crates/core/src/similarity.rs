use crate::errors::DomainError;

/// Cosine similarity of two equal-length vectors, in `[-1, 1]`.
///
/// A zero-norm operand yields `0.0`. Vectors of different length are an
/// integration error and are never truncated or padded. A `NaN` or infinite
/// component in either operand is rejected.
pub fn cosine_similarity(left: &[f32], right: &[f32]) -> Result<f64, DomainError> {
    if left.len() != right.len() {
        return Err(DomainError::DimensionMismatch { left: left.len(), right: right.len() });
    }
    ensure_finite(left)?;
    ensure_finite(right)?;

    let mut dot = 0.0f64;
    let mut left_norm = 0.0f64;
    let mut right_norm = 0.0f64;
    for (a, b) in left.iter().zip(right.iter()) {
        let (a, b) = (f64::from(*a), f64::from(*b));
        dot += a * b;
        left_norm += a * a;
        right_norm += b * b;
    }

    let left_norm = left_norm.sqrt();
    let right_norm = right_norm.sqrt();
    if left_norm == 0.0 || right_norm == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (left_norm * right_norm))
}

/// Fails on the first component that is `NaN` or infinite.
pub fn ensure_finite(vector: &[f32]) -> Result<(), DomainError> {
    match vector.iter().position(|component| !component.is_finite()) {
        Some(index) => Err(DomainError::NonFiniteVector { index }),
        None => Ok(()),
    }
}

/// Rounds to two decimal places for presentation.
pub fn round_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}
