//! Bounded efficacy/risk tensors.
//!
//! Every atom carries exactly one tensor: a fixed, ordered set of named
//! dimensions, each valued in `[0.0, 1.0]`. The dimension set belongs to the
//! deployment ([`TensorSchema`]), never to an individual atom.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The 17 dimensions of the reference data set, in storage order.
pub const REFERENCE_DIMENSIONS: [&str; 17] = [
    "hydration",
    "sebum_regulation",
    "anti_aging",
    "brightening",
    "anti_inflammatory",
    "barrier_repair",
    "exfoliation",
    "antioxidant",
    "acne_fighting",
    "soothing",
    "sensitivity_risk",
    "photosensitivity",
    "irritation_potential",
    "stability",
    "formulation_compatibility",
    "penetration",
    "clinical_evidence",
];

/// Ordered dimension names shared by every tensor in a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorSchema {
    dimensions: Vec<String>,
}

impl TensorSchema {
    pub fn new(dimensions: Vec<String>) -> Result<Self> {
        if dimensions.is_empty() {
            return Err(Error::InvalidConfig("tensor schema needs at least one dimension".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for name in &dimensions {
            if name.trim().is_empty() {
                return Err(Error::InvalidConfig("tensor dimension names cannot be blank".into()));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::InvalidConfig(format!("duplicate tensor dimension '{}'", name)));
            }
        }
        Ok(Self { dimensions })
    }

    #[must_use]
    pub fn reference() -> Self {
        Self {
            dimensions: REFERENCE_DIMENSIONS.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dimensions.len()
    }

    #[inline]
    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    pub fn position(&self, dimension: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d == dimension)
    }

    /// Validate a dimension map and lay it out in schema order.
    ///
    /// Rejects missing dimensions, undeclared dimensions and values that are
    /// NaN or outside `[0, 1]`.
    pub fn layout(&self, values: &HashMap<String, f32>) -> Result<Vec<f32>> {
        self.layout_with(values, None)
    }

    /// Like [`TensorSchema::layout`], but dimensions absent from `values`
    /// take `fill`. Used for query tensors, where callers name only the
    /// dimensions they care about.
    pub fn layout_partial(&self, values: &HashMap<String, f32>, fill: f32) -> Result<Vec<f32>> {
        self.layout_with(values, Some(fill))
    }

    fn layout_with(&self, values: &HashMap<String, f32>, fill: Option<f32>) -> Result<Vec<f32>> {
        for name in values.keys() {
            if self.position(name).is_none() {
                return Err(Error::InvalidTensor(format!("undeclared dimension '{}'", name)));
            }
        }

        let mut ordered = Vec::with_capacity(self.dim());
        for name in &self.dimensions {
            let value = match (values.get(name), fill) {
                (Some(value), _) => *value,
                (None, Some(fill)) => fill,
                (None, None) => {
                    return Err(Error::InvalidTensor(format!("missing dimension '{}'", name)))
                }
            };
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidTensor(format!(
                    "dimension '{}' has value {} outside [0, 1]",
                    name, value
                )));
            }
            ordered.push(value);
        }
        Ok(ordered)
    }
}

impl Default for TensorSchema {
    fn default() -> Self {
        Self::reference()
    }
}

/// A validated tensor. Immutable: replacement swaps the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    values: Vec<f32>,
    /// Store-wide write sequence number of this tensor
    revision: u64,
}

impl Tensor {
    pub(crate) fn new(values: Vec<f32>, revision: u64) -> Self {
        Self { values, revision }
    }

    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, schema: &TensorSchema, dimension: &str) -> Option<f32> {
        schema.position(dimension).and_then(|i| self.values.get(i).copied())
    }

    /// Named view of the values, the inverse of [`TensorSchema::layout`]
    pub fn to_map(&self, schema: &TensorSchema) -> HashMap<String, f32> {
        schema
            .dimensions()
            .iter()
            .cloned()
            .zip(self.values.iter().copied())
            .collect()
    }
}
