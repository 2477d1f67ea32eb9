//! Hybrid query definitions
//!
//! A query carries an optional tensor half, an optional semantic half, and a
//! filter. How the halves are blended is the caller's [`Weighting`]: the
//! right blend is a product decision, not an index invariant.

use atomx_core::{AtomId, AtomKind, Error, Result};
use serde::{Deserialize, Serialize};

/// Caller-supplied blend of the two similarity halves
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weighting {
    pub tensor: f32,
    pub semantic: f32,
}

impl Default for Weighting {
    fn default() -> Self {
        Self {
            tensor: 0.5,
            semantic: 0.5,
        }
    }
}

impl Weighting {
    pub fn new(tensor: f32, semantic: f32) -> Self {
        Self { tensor, semantic }
    }

    pub fn tensor_only() -> Self {
        Self::new(1.0, 0.0)
    }

    pub fn semantic_only() -> Self {
        Self::new(0.0, 1.0)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, weight) in [("tensor", self.tensor), ("semantic", self.semantic)] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::InvalidWeighting(format!(
                    "{} weight {} must be a non-negative number",
                    name, weight
                )));
            }
        }
        Ok(())
    }

    /// Effective weights for the halves the query actually carries,
    /// normalized to sum to 1.0.
    ///
    /// A half contributes only when it is both present in the query and
    /// weighted above zero, so a zero weight can never leak into the score.
    pub fn resolve(&self, has_tensor: bool, has_semantic: bool) -> Result<(f32, f32)> {
        self.validate()?;
        let tensor = if has_tensor { self.tensor } else { 0.0 };
        let semantic = if has_semantic { self.semantic } else { 0.0 };
        let total = tensor + semantic;
        if total <= 0.0 {
            return Err(Error::InvalidWeighting(
                "no query half carries a positive weight".into(),
            ));
        }
        Ok((tensor / total, semantic / total))
    }
}

/// Restricts which entries may appear in results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilter {
    /// Only these kinds; `None` admits all
    pub kinds: Option<Vec<AtomKind>>,
    pub exclude: Vec<AtomId>,
}

impl SearchFilter {
    pub fn kind(kind: AtomKind) -> Self {
        Self {
            kinds: Some(vec![kind]),
            exclude: Vec::new(),
        }
    }

    #[must_use]
    pub fn excluding(mut self, atom: AtomId) -> Self {
        self.exclude.push(atom);
        self
    }

    pub fn matches(&self, atom: &AtomId, kind: AtomKind) -> bool {
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&kind) {
                return false;
            }
        }
        !self.exclude.contains(atom)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HybridQuery {
    /// Values in tensor-schema order
    #[serde(default)]
    pub tensor: Option<Vec<f32>>,
    #[serde(default)]
    pub semantic: Option<Vec<f32>>,
    #[serde(default)]
    pub filter: SearchFilter,
}

impl HybridQuery {
    pub fn tensor(values: Vec<f32>) -> Self {
        Self {
            tensor: Some(values),
            ..Default::default()
        }
    }

    pub fn semantic(values: Vec<f32>) -> Self {
        Self {
            semantic: Some(values),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_tensor(mut self, values: Vec<f32>) -> Self {
        self.tensor = Some(values);
        self
    }

    #[must_use]
    pub fn with_semantic(mut self, values: Vec<f32>) -> Self {
        self.semantic = Some(values);
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tensor.is_none() && self.semantic.is_none()
    }
}
