use anyhow::Context;
use atomx_compat::CompatibilityConfig;
use atomx_core::{Result, TensorSchema, REFERENCE_DIMENSIONS};
use atomx_index::{IndexConfig, Weighting};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Everything needed to compose an [`crate::Engine`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ordered tensor dimension names shared by every atom
    pub tensor_dimensions: Vec<String>,
    pub index: IndexConfig,
    pub compatibility: CompatibilityConfig,
    /// Used when a search does not carry its own weighting
    pub default_weighting: Weighting,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tensor_dimensions: REFERENCE_DIMENSIONS.iter().map(|d| d.to_string()).collect(),
            index: IndexConfig::default(),
            compatibility: CompatibilityConfig::default(),
            default_weighting: Weighting::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn tensor_schema(&self) -> Result<TensorSchema> {
        TensorSchema::new(self.tensor_dimensions.clone())
    }

    pub fn validate(&self) -> Result<()> {
        self.tensor_schema()?;
        self.index.validate()?;
        self.compatibility.validate()?;
        self.default_weighting.validate()
    }
}
