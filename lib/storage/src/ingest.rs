//! Idempotent loader over a [`Dataset`]
//!
//! Records are written in dependency order: atoms, tensors, goldilocks rows,
//! embeddings, then relationships. Each write validates on its own and is
//! all-or-nothing; the first invalid record stops the load with its error.
//! Replaying the same dataset leaves the store, graph and index unchanged.

use crate::dataset::Dataset;
use atomx_core::{EdgeOutcome, RelationshipGraph, Result};
use atomx_index::HybridIndex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// What a load touched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub atoms: usize,
    pub tensors: usize,
    pub goldilocks: usize,
    pub embeddings: usize,
    pub relationships: usize,
    /// Atom, tensor and relationship writes that altered stored state
    pub changes: usize,
}

pub struct Ingestor<'a> {
    graph: &'a RelationshipGraph,
    index: Option<&'a HybridIndex>,
}

impl<'a> Ingestor<'a> {
    pub fn new(graph: &'a RelationshipGraph) -> Self {
        Self { graph, index: None }
    }

    /// Also load embeddings into `index`, which must already follow the
    /// graph's store.
    #[must_use]
    pub fn with_index(mut self, index: &'a HybridIndex) -> Self {
        self.index = Some(index);
        self
    }

    pub fn load(&self, dataset: &Dataset) -> Result<IngestStats> {
        let store = self.graph.store();
        let mut stats = IngestStats::default();

        for record in &dataset.atoms {
            let previous = store.get_atom(&record.id).ok();
            let atom = store.upsert_atom(record.id.clone(), record.metadata.clone())?;
            if !previous.map_or(false, |p| Arc::ptr_eq(&p, &atom)) {
                stats.changes += 1;
            }
            stats.atoms += 1;
        }

        for record in &dataset.atoms {
            if let Some(values) = record.tensor_map() {
                let previous = store.get_tensor(&record.id).ok().map(|t| t.revision());
                let tensor = store.set_tensor(&record.id, &values)?;
                if previous != Some(tensor.revision()) {
                    stats.changes += 1;
                }
                stats.tensors += 1;
            }
        }

        for record in &dataset.atoms {
            for parameter in &record.goldilocks {
                store.upsert_goldilocks(&record.id, parameter.clone())?;
                stats.goldilocks += 1;
            }
        }

        if let Some(index) = self.index {
            for record in &dataset.atoms {
                if let Some(embedding) = &record.embedding {
                    index.upsert_embedding(&record.id, embedding.clone())?;
                    stats.embeddings += 1;
                }
            }
        } else {
            let skipped = dataset.atoms.iter().filter(|a| a.embedding.is_some()).count();
            if skipped > 0 {
                debug!(skipped, "no index attached, embeddings not loaded");
            }
        }

        for relationship in &dataset.relationships {
            if self.graph.add_relationship(relationship.clone())? != EdgeOutcome::Unchanged {
                stats.changes += 1;
            }
            stats.relationships += 1;
        }

        info!(
            atoms = stats.atoms,
            tensors = stats.tensors,
            goldilocks = stats.goldilocks,
            embeddings = stats.embeddings,
            relationships = stats.relationships,
            changes = stats.changes,
            "dataset loaded"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::AtomRecord;
    use atomx_core::{
        AtomMetadata, AtomStore, Error, Relationship, RelationshipType, TensorSchema,
    };
    use atomx_index::{IndexConfig, SearchBackend};
    use std::collections::BTreeMap;

    fn schema() -> TensorSchema {
        TensorSchema::new(vec!["hydration".into(), "soothing".into()]).unwrap()
    }

    fn record(id: &str, hydration: f32) -> AtomRecord {
        let mut record = AtomRecord::new(id, AtomMetadata::new(id));
        record.tensor = Some(BTreeMap::from([
            ("hydration".to_string(), hydration),
            ("soothing".to_string(), 0.5),
        ]));
        record
    }

    fn dataset() -> Dataset {
        let mut a = record("panthenol", 0.7);
        a.embedding = Some(vec![1.0, 0.0]);
        let b = record("allantoin", 0.4);
        Dataset {
            atoms: vec![a, b],
            relationships: vec![Relationship::new(
                "panthenol".into(),
                "allantoin".into(),
                RelationshipType::SynergizesWith,
                0.6,
            )
            .with_evidence("both soothe")],
        }
    }

    fn graph() -> RelationshipGraph {
        RelationshipGraph::new(Arc::new(AtomStore::new(schema())))
    }

    #[test]
    fn test_replay_is_idempotent() {
        let graph = graph();
        let ingestor = Ingestor::new(&graph);

        let first = ingestor.load(&dataset()).unwrap();
        assert_eq!(first.atoms, 2);
        assert_eq!(first.tensors, 2);
        assert_eq!(first.relationships, 1);
        assert_eq!(first.changes, 5);
        let edges = graph.relationships();
        let tensor = graph.store().get_tensor(&"panthenol".into()).unwrap();

        let second = ingestor.load(&dataset()).unwrap();
        assert_eq!(second.changes, 0);
        assert_eq!(graph.relationships(), edges);
        assert_eq!(graph.len(), 1);
        let again = graph.store().get_tensor(&"panthenol".into()).unwrap();
        assert_eq!(again.revision(), tensor.revision());
        assert_eq!(graph.store().get_atom(&"panthenol".into()).unwrap().version, 1);
    }

    #[test]
    fn test_replay_of_merged_evidence_is_idempotent() {
        let graph = graph();
        let conflict = |evidence: &str| {
            Relationship::new(
                "panthenol".into(),
                "allantoin".into(),
                RelationshipType::ConflictsWith,
                0.4,
            )
            .with_evidence(evidence)
        };
        let mut data = dataset();
        data.relationships.push(conflict("low pH | oxidation"));
        data.relationships.push(conflict("oxidation | chelation"));

        let ingestor = Ingestor::new(&graph);
        ingestor.load(&data).unwrap();
        let merged = graph.relationship_between(&"panthenol".into(), &"allantoin".into());
        let evidence: Vec<_> = merged
            .iter()
            .filter(|d| d.relationship.kind == RelationshipType::ConflictsWith)
            .map(|d| d.relationship.evidence.clone())
            .collect();
        assert_eq!(evidence, vec!["low pH | oxidation | chelation".to_string()]);

        assert_eq!(ingestor.load(&data).unwrap().changes, 0);
        let exported = crate::export::export_dataset(&graph, None);
        assert_eq!(ingestor.load(&exported).unwrap().changes, 0);
        assert_eq!(graph.relationships(), exported.relationships);
    }

    #[test]
    fn test_invalid_record_stops_load() {
        let graph = graph();
        let mut data = dataset();
        data.relationships.push(Relationship::new(
            "allantoin".into(),
            "allantoin".into(),
            RelationshipType::Replaces,
            0.5,
        ));
        let result = Ingestor::new(&graph).load(&data);
        assert!(matches!(result, Err(Error::SelfLoop(_))));
    }

    #[test]
    fn test_out_of_range_tensor_rejected() {
        let graph = graph();
        let data = Dataset {
            atoms: vec![record("broken", 1.5)],
            relationships: Vec::new(),
        };
        assert!(matches!(
            Ingestor::new(&graph).load(&data),
            Err(Error::InvalidTensor(_))
        ));
        assert!(graph.store().get_tensor(&"broken".into()).is_err());
    }

    #[test]
    fn test_embeddings_reach_index() {
        let graph = graph();
        let index = Arc::new(HybridIndex::new(2, IndexConfig::default()));
        graph.store().subscribe(index.clone());

        let stats = Ingestor::new(&graph).with_index(&index).load(&dataset()).unwrap();
        assert_eq!(stats.embeddings, 1);
        assert_eq!(index.len(), 2);
        assert_eq!(index.embedding(&"panthenol".into()), Some(vec![1.0, 0.0]));
        assert_eq!(index.embedding(&"allantoin".into()), None);
    }
}
