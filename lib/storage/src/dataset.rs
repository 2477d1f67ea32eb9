//! Declarative dataset documents
//!
//! A [`Dataset`] is static reference data: atoms with their tensors,
//! goldilocks rows and optional embeddings, plus curated relationships. It
//! carries no control flow; [`crate::Ingestor`] is what writes it.

use anyhow::{Context, Result};
use atomx_core::{AtomId, AtomMetadata, GoldilocksParameter, Relationship};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// One atom and everything attached to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomRecord {
    pub id: AtomId,
    #[serde(flatten)]
    pub metadata: AtomMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tensor: Option<BTreeMap<String, f32>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub goldilocks: Vec<GoldilocksParameter>,
    /// Pre-computed semantic embedding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl AtomRecord {
    pub fn new(id: impl Into<AtomId>, metadata: AtomMetadata) -> Self {
        Self {
            id: id.into(),
            metadata,
            tensor: None,
            goldilocks: Vec::new(),
            embedding: None,
        }
    }

    pub(crate) fn tensor_map(&self) -> Option<HashMap<String, f32>> {
        self.tensor
            .as_ref()
            .map(|t| t.iter().map(|(k, v)| (k.clone(), *v)).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub atoms: Vec<AtomRecord>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl Dataset {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse dataset")
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid dataset {}", path.display()))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize dataset")
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty() && self.relationships.is_empty()
    }

    pub fn atom(&self, id: &AtomId) -> Option<&AtomRecord> {
        self.atoms.iter().find(|a| &a.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atomx_core::{AtomCategory, RelationshipType};

    #[test]
    fn test_parse_minimal_document() {
        let json = r#"{
            "atoms": [
                {"id": "retinol", "name": "Retinol", "category": "retinoid",
                 "tensor": {"hydration": 0.1},
                 "goldilocks": [{"name": "concentration", "unit": "%",
                    "opt_min": 0.25, "opt_max": 1.0, "abs_min": 0.0, "abs_max": 2.0,
                    "context": "facial"}]},
                {"id": "squalane", "name": "Squalane"}
            ],
            "relationships": [
                {"from": "retinol", "to": "squalane", "type": "SYNERGIZES_WITH", "strength": 0.6}
            ]
        }"#;
        let dataset = Dataset::from_json(json).unwrap();
        assert_eq!(dataset.atoms.len(), 2);

        let retinol = dataset.atom(&"retinol".into()).unwrap();
        assert_eq!(retinol.metadata.category, AtomCategory::Retinoid);
        assert_eq!(retinol.goldilocks.len(), 1);
        assert_eq!(retinol.tensor_map().unwrap()["hydration"], 0.1);
        assert!(dataset.atom(&"squalane".into()).unwrap().tensor.is_none());
        assert_eq!(dataset.relationships[0].kind, RelationshipType::SynergizesWith);
        assert!(dataset.relationships[0].evidence.is_empty());
    }

    #[test]
    fn test_rejects_unknown_relationship_type() {
        let json = r#"{"relationships": [
            {"from": "a", "to": "b", "type": "LIKES", "strength": 0.5}
        ]}"#;
        assert!(Dataset::from_json(json).is_err());
    }

    #[test]
    fn test_from_file_reports_path() {
        let err = Dataset::from_file("/nonexistent/atoms.json").unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/atoms.json"));
    }
}
