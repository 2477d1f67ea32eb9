//! The composed engine.
//!
//! [`Engine`] owns one atom store, the relationship graph over it, the
//! hybrid index following it, a compatibility checker and the search
//! backend. Callers construct it explicitly and pass it by reference; there
//! is no global instance.

use crate::config::EngineConfig;
use atomx_compat::{CompatibilityEngine, CompatibilityReport, Routine};
use atomx_core::{
    ApplicationContext, Atom, AtomId, AtomMetadata, AtomStore, DirectedRelationship, EdgeOutcome,
    Error, GoldilocksParameter, Relationship, RelationshipGraph, RelationshipType, Result,
    SkinType, Tensor,
};
use atomx_index::{
    HybridIndex, HybridQuery, SearchBackend, SearchContext, SearchFilter, SearchHit, Weighting,
};
use atomx_storage::{Dataset, IngestStats, Ingestor};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct Engine {
    config: EngineConfig,
    store: Arc<AtomStore>,
    graph: Arc<RelationshipGraph>,
    index: Arc<HybridIndex>,
    compat: CompatibilityEngine,
    backend: Arc<dyn SearchBackend>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let schema = config.tensor_schema()?;
        let store = Arc::new(AtomStore::new(schema));
        let index = Arc::new(HybridIndex::new(store.tensor_schema().dim(), config.index.clone()));
        store.subscribe(index.clone());

        let graph = Arc::new(RelationshipGraph::new(store.clone()));
        let compat = CompatibilityEngine::new(graph.clone(), config.compatibility.clone());
        Ok(Self {
            config,
            store,
            graph,
            backend: index.clone(),
            index,
            compat,
        })
    }

    /// Answer searches from `backend` instead of the in-memory index.
    ///
    /// The in-memory index is still maintained and used for embeddings and
    /// exports.
    #[must_use]
    pub fn with_search_backend(mut self, backend: Arc<dyn SearchBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<AtomStore> {
        &self.store
    }

    pub fn graph(&self) -> &Arc<RelationshipGraph> {
        &self.graph
    }

    pub fn index(&self) -> &Arc<HybridIndex> {
        &self.index
    }

    pub fn search_backend(&self) -> &Arc<dyn SearchBackend> {
        &self.backend
    }

    // Ingestion

    pub fn upsert_atom(&self, id: AtomId, metadata: AtomMetadata) -> Result<Arc<Atom>> {
        self.store.upsert_atom(id, metadata)
    }

    pub fn set_tensor(&self, id: &AtomId, values: &HashMap<String, f32>) -> Result<Arc<Tensor>> {
        self.store.set_tensor(id, values)
    }

    pub fn upsert_goldilocks(&self, id: &AtomId, parameter: GoldilocksParameter) -> Result<()> {
        self.store.upsert_goldilocks(id, parameter)
    }

    pub fn add_relationship(&self, relationship: Relationship) -> Result<EdgeOutcome> {
        self.graph.add_relationship(relationship)
    }

    pub fn set_embedding(&self, id: &AtomId, embedding: Vec<f32>) -> Result<()> {
        if !self.store.contains(id) {
            return Err(Error::NotFound(id.clone()));
        }
        self.index.upsert_embedding(id, embedding)
    }

    /// Delete an atom no relationship references; its tensor, goldilocks
    /// rows and index entry go with it.
    pub fn remove_atom(&self, id: &AtomId) -> Result<Arc<Atom>> {
        self.graph.remove_atom(id)
    }

    pub fn load_dataset(&self, dataset: &Dataset) -> Result<IngestStats> {
        Ingestor::new(&self.graph).with_index(&self.index).load(dataset)
    }

    pub fn export_dataset(&self) -> Dataset {
        atomx_storage::export_dataset(&self.graph, Some(&self.index))
    }

    // Reads

    pub fn get_atom(&self, id: &AtomId) -> Result<Arc<Atom>> {
        self.store.get_atom(id)
    }

    pub fn get_tensor(&self, id: &AtomId) -> Result<Arc<Tensor>> {
        self.store.get_tensor(id)
    }

    pub fn get_goldilocks(
        &self,
        id: &AtomId,
        context: Option<ApplicationContext>,
        skin_type: Option<SkinType>,
    ) -> Result<Vec<GoldilocksParameter>> {
        self.store.get_goldilocks(id, context, skin_type)
    }

    pub fn neighbors(
        &self,
        id: &AtomId,
        kind: Option<RelationshipType>,
    ) -> Result<Vec<Relationship>> {
        self.graph.neighbors(id, kind)
    }

    pub fn relationship_between(&self, a: &AtomId, b: &AtomId) -> Vec<DirectedRelationship> {
        self.graph.relationship_between(a, b)
    }

    pub fn find_path(
        &self,
        from: &AtomId,
        to: &AtomId,
        max_depth: usize,
        kinds: Option<&[RelationshipType]>,
    ) -> Result<Option<Vec<Relationship>>> {
        self.graph.find_path(from, to, max_depth, kinds)
    }

    // Queries

    pub fn check_routine(&self, routine: &Routine) -> Result<CompatibilityReport> {
        self.compat.check_routine(routine)
    }

    /// Rank atoms against `query`, blending with `weighting` or the
    /// configured default.
    ///
    /// Backend failures surface as `SearchUnavailable` without retry.
    pub fn search(
        &self,
        query: &HybridQuery,
        k: usize,
        weighting: Option<&Weighting>,
    ) -> Result<Vec<SearchHit>> {
        self.search_within(query, k, weighting, &SearchContext::default())
    }

    /// [`Engine::search`] bounded by the caller's deadline and
    /// cancellation flag, which are handed to the backend as is.
    pub fn search_within(
        &self,
        query: &HybridQuery,
        k: usize,
        weighting: Option<&Weighting>,
        context: &SearchContext,
    ) -> Result<Vec<SearchHit>> {
        let weighting = weighting.unwrap_or(&self.config.default_weighting);
        match self.backend.search_within(query, k, weighting, context) {
            Err(Error::SearchUnavailable(reason)) => {
                warn!(backend = self.backend.name(), %reason, "search backend unavailable");
                Err(Error::SearchUnavailable(reason))
            }
            other => other,
        }
    }

    /// Lay out a complete named tensor map in schema order for use as a query
    pub fn tensor_query(&self, values: &HashMap<String, f32>) -> Result<Vec<f32>> {
        self.store.tensor_schema().layout(values)
    }

    /// Lay out a query naming only some dimensions; the rest take `fill`
    pub fn partial_tensor_query(
        &self,
        values: &HashMap<String, f32>,
        fill: f32,
    ) -> Result<Vec<f32>> {
        self.store.tensor_schema().layout_partial(values, fill)
    }

    /// Atoms most similar to `id`, using whichever halves it has, itself
    /// excluded.
    pub fn search_like(
        &self,
        id: &AtomId,
        k: usize,
        weighting: Option<&Weighting>,
        filter: SearchFilter,
    ) -> Result<Vec<SearchHit>> {
        self.store.get_atom(id)?;
        let mut query = HybridQuery::default().with_filter(filter.excluding(id.clone()));
        if let Ok(tensor) = self.store.get_tensor(id) {
            query = query.with_tensor(tensor.values().to_vec());
        }
        if let Some(embedding) = self.index.embedding(id) {
            query = query.with_semantic(embedding);
        }
        debug!(
            atom = %id,
            has_tensor = query.tensor.is_some(),
            has_semantic = query.semantic.is_some(),
            "search like"
        );
        self.search(&query, k, weighting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atomx_compat::RoutineEntry;
    use atomx_storage::reference_dataset;

    fn reference_engine() -> Engine {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        engine.load_dataset(&reference_dataset().unwrap()).unwrap();
        engine
    }

    #[test]
    fn test_remove_atom_leaves_index() {
        let engine = reference_engine();
        let id = AtomId::from("centella_asiatica");
        assert!(matches!(engine.remove_atom(&id), Err(Error::AtomInUse { .. })));

        engine.upsert_atom("orphan".into(), AtomMetadata::new("Orphan")).unwrap();
        let orphan = AtomId::from("orphan");
        assert!(engine.index().entry(&orphan).is_some());
        engine.remove_atom(&orphan).unwrap();
        assert!(engine.index().entry(&orphan).is_none());
        assert!(matches!(engine.get_atom(&orphan), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_set_embedding_requires_atom() {
        let engine = reference_engine();
        assert!(matches!(
            engine.set_embedding(&"ghost".into(), vec![0.0; 8]),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_search_like_excludes_self() {
        let engine = reference_engine();
        let hits = engine
            .search_like(&"hyaluronic_acid".into(), 3, None, SearchFilter::default())
            .unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|h| h.atom.as_str() != "hyaluronic_acid"));
        assert!(hits
            .iter()
            .all(|h| h.tensor_similarity.is_some() && h.semantic_similarity.is_some()));
        assert_eq!(hits[0].atom.as_str(), "squalane");
    }

    #[test]
    fn test_partial_tensor_query() {
        let engine = reference_engine();
        let values = HashMap::from([("hydration".to_string(), 0.9), ("soothing".to_string(), 0.4)]);
        assert!(matches!(engine.tensor_query(&values), Err(Error::InvalidTensor(_))));

        let query = engine.partial_tensor_query(&values, 0.0).unwrap();
        assert_eq!(query.len(), 17);
        assert_eq!(query.iter().filter(|v| **v > 0.0).count(), 2);
        let hits = engine
            .search(&HybridQuery::tensor(query), 3, Some(&Weighting::tensor_only()))
            .unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_reference_routine() {
        let engine = reference_engine();
        let routine = Routine::new(vec![
            RoutineEntry::new("retinol", 0.5, ApplicationContext::Facial, SkinType::All),
            RoutineEntry::new("niacinamide", 4.0, ApplicationContext::Facial, SkinType::All),
        ]);
        let report = engine.check_routine(&routine).unwrap();
        assert!(report.conflicts.is_empty());
        assert_eq!(report.synergies.len(), 1);
        assert!(report.range_violations.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            tensor_dimensions: Vec::new(),
            ..Default::default()
        };
        assert!(Engine::new(config).is_err());
    }
}
