use std::cmp::Ordering;

use ndarray::ArrayView1;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VectorMathError {
    #[error("vectors must not be empty")]
    Empty,
    #[error("vector length mismatch: {0} != {1}")]
    LengthMismatch(usize, usize),
}

/// Cosine similarity in [-1, 1]. A zero vector on either side scores 0.0.
pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, VectorMathError> {
    if query.is_empty() || candidate.is_empty() {
        return Err(VectorMathError::Empty);
    }
    if query.len() != candidate.len() {
        return Err(VectorMathError::LengthMismatch(query.len(), candidate.len()));
    }

    let query = ArrayView1::from(query);
    let candidate = ArrayView1::from(candidate);

    let dot = query.dot(&candidate);
    let denom = query.dot(&query).sqrt() * candidate.dot(&candidate).sqrt();
    if denom <= f32::EPSILON {
        return Ok(0.0);
    }

    Ok((dot / denom).clamp(-1.0, 1.0))
}

pub fn rank_descending_by_cosine(
    query: &[f32],
    candidates: &[Vec<f32>],
) -> Result<Vec<(usize, f32)>, VectorMathError> {
    let mut scores = Vec::with_capacity(candidates.len());
    for (idx, candidate) in candidates.iter().enumerate() {
        let score = cosine_similarity(query, candidate)?;
        scores.push((idx, score));
    }

    scores.sort_by(|left, right| descending(left.1, right.1));
    Ok(scores)
}

/// Descending comparator; NaN compares as 0.0 so it can never poison a sort.
pub fn descending(left: f32, right: f32) -> Ordering {
    let left = if left.is_nan() { 0.0 } else { left };
    let right = if right.is_nan() { 0.0 } else { right };
    right.partial_cmp(&left).unwrap_or(Ordering::Equal)
}
