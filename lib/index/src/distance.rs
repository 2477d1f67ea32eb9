//! Distance and similarity functions for the two halves of a hybrid vector
//!
//! Both similarities are normalized to [0.0, 1.0] where 1.0 means identical,
//! so they can be blended by plain weights.

use atomx_core::{Error, Result};

/// Squared Euclidean distance. Returns `f32::INFINITY` on dimension mismatch.
#[inline]
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    // Two accumulators for better pipelining
    let mut sum1 = 0.0f32;
    let mut sum2 = 0.0f32;
    let chunks = a.len() / 2;
    for i in 0..chunks {
        let d1 = a[2 * i] - b[2 * i];
        let d2 = a[2 * i + 1] - b[2 * i + 1];
        sum1 += d1 * d1;
        sum2 += d2 * d2;
    }
    if a.len() % 2 == 1 {
        let last = a.len() - 1;
        let d = a[last] - b[last];
        sum1 += d * d;
    }
    sum1 + sum2
}

/// Tensor similarity in [0, 1].
///
/// Tensor values live in the unit hypercube, so the squared distance is at
/// most `dim` and `1 - d² / dim` is a monotone, bounded similarity.
#[inline]
pub fn tensor_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let max = a.len() as f32;
    (1.0 - squared_euclidean(a, b) / max).clamp(0.0, 1.0)
}

#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[inline]
pub fn norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

/// An externally computed text embedding with its norm cached
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticVector {
    values: Vec<f32>,
    norm: f32,
}

impl SemanticVector {
    pub fn new(values: Vec<f32>) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::InvalidEmbedding("embedding is empty".into()));
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(Error::InvalidEmbedding(format!("component {} is not finite", i)));
        }
        let norm = norm(&values);
        Ok(Self { values, norm })
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Cosine similarity mapped from [-1, 1] onto [0, 1]
    #[inline]
    pub fn similarity(&self, other: &SemanticVector) -> f32 {
        if self.dim() != other.dim() || self.norm == 0.0 || other.norm == 0.0 {
            return 0.0;
        }
        let cosine = dot(&self.values, &other.values) / (self.norm * other.norm);
        ((cosine + 1.0) / 2.0).clamp(0.0, 1.0)
    }
}
