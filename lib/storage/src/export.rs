use crate::dataset::{AtomRecord, Dataset};
use atomx_core::RelationshipGraph;
use atomx_index::HybridIndex;
use std::collections::BTreeMap;

/// Capture the graph (and its store) as a dataset that loads back into an
/// identical state. Embeddings are included when `index` is given.
pub fn export_dataset(graph: &RelationshipGraph, index: Option<&HybridIndex>) -> Dataset {
    let store = graph.store();
    let schema = store.tensor_schema();

    let atoms = store
        .atoms()
        .into_iter()
        .map(|atom| {
            let tensor = store
                .get_tensor(&atom.id)
                .ok()
                .map(|t| t.to_map(schema).into_iter().collect::<BTreeMap<_, _>>());
            AtomRecord {
                id: atom.id.clone(),
                metadata: atom.metadata.clone(),
                tensor,
                goldilocks: store.get_goldilocks(&atom.id, None, None).unwrap_or_default(),
                embedding: index.and_then(|i| i.embedding(&atom.id)),
            }
        })
        .collect();

    Dataset {
        atoms,
        relationships: graph.relationships(),
    }
}
