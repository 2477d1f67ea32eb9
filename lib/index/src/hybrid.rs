//! Hybrid Index: exact nearest-neighbor search over paired vectors.
//!
//! Each atom owns one immutable [`IndexEntry`] holding its tensor half and
//! its semantic half. Any change to either half swaps in a whole new entry,
//! and a search scores a snapshot of entries, so both halves used for one
//! atom always come from the same entry revision.
//!
//! The index follows the atom store as a [`TensorObserver`]; tensor updates
//! carrying an older revision than the one held are ignored.

use crate::backend::{SearchBackend, SearchContext, SearchHit};
use crate::distance::{tensor_similarity, SemanticVector};
use crate::query::{HybridQuery, SearchFilter, Weighting};
use ahash::AHashMap;
use atomx_core::{Atom, AtomId, AtomKind, AtomStore, Error, Result, Tensor, TensorObserver};
use ordered_float::OrderedFloat;
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Configuration for the hybrid index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Fixed semantic dimensionality; `None` lets the first embedding decide
    pub semantic_dim: Option<usize>,
    /// Entry count from which scoring runs on the rayon pool
    pub parallel_threshold: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            semantic_dim: None,
            parallel_threshold: 4096,
        }
    }
}

impl IndexConfig {
    pub fn validate(&self) -> Result<()> {
        if self.semantic_dim == Some(0) {
            return Err(Error::InvalidConfig("semantic_dim must be positive".into()));
        }
        Ok(())
    }
}

/// Both halves of one atom's hybrid vector
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub atom: AtomId,
    pub kind: AtomKind,
    pub tensor: Option<Arc<Tensor>>,
    pub semantic: Option<Arc<SemanticVector>>,
}

impl IndexEntry {
    fn new(atom: AtomId, kind: AtomKind) -> Self {
        Self {
            atom,
            kind,
            tensor: None,
            semantic: None,
        }
    }
}

struct IndexState {
    entries: AHashMap<AtomId, Arc<IndexEntry>>,
    semantic_dim: Option<usize>,
}

pub struct HybridIndex {
    tensor_dim: usize,
    config: IndexConfig,
    state: RwLock<IndexState>,
}

/// Ordering wrapper: higher score first, then lower atom id
struct Ranked(SearchHit);

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        OrderedFloat(self.0.score)
            .cmp(&OrderedFloat(other.0.score))
            .then_with(|| other.0.atom.cmp(&self.0.atom))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

/// Per-query scoring context shared by all workers
struct Scorer<'a> {
    tensor: Option<&'a [f32]>,
    semantic: Option<&'a SemanticVector>,
    tensor_weight: f32,
    semantic_weight: f32,
    filter: &'a SearchFilter,
}

impl Scorer<'_> {
    fn score(&self, entry: &IndexEntry) -> Option<SearchHit> {
        if !self.filter.matches(&entry.atom, entry.kind) {
            return None;
        }

        let mut score = 0.0;
        let mut tensor_similarity_part = None;
        let mut tensor_revision = None;
        if self.tensor_weight > 0.0 {
            let query = self.tensor?;
            let tensor = entry.tensor.as_ref()?;
            let similarity = tensor_similarity(query, tensor.values());
            score += self.tensor_weight * similarity;
            tensor_similarity_part = Some(similarity);
            tensor_revision = Some(tensor.revision());
        }

        let mut semantic_similarity = None;
        if self.semantic_weight > 0.0 {
            let query = self.semantic?;
            let semantic = entry.semantic.as_ref()?;
            let similarity = query.similarity(semantic);
            score += self.semantic_weight * similarity;
            semantic_similarity = Some(similarity);
        }

        Some(SearchHit {
            atom: entry.atom.clone(),
            kind: entry.kind,
            score,
            tensor_similarity: tensor_similarity_part,
            semantic_similarity,
            tensor_revision,
        })
    }
}

fn top_k(hits: Vec<SearchHit>, k: usize) -> Vec<SearchHit> {
    let capacity = k.min(hits.len()).saturating_add(1);
    let mut heap: BinaryHeap<Reverse<Ranked>> = BinaryHeap::with_capacity(capacity);
    for hit in hits {
        heap.push(Reverse(Ranked(hit)));
        if heap.len() > k {
            heap.pop();
        }
    }
    heap.into_sorted_vec().into_iter().map(|Reverse(r)| r.0).collect()
}

impl HybridIndex {
    pub fn new(tensor_dim: usize, config: IndexConfig) -> Self {
        let semantic_dim = config.semantic_dim;
        Self {
            tensor_dim,
            config,
            state: RwLock::new(IndexState {
                entries: AHashMap::new(),
                semantic_dim,
            }),
        }
    }

    #[inline]
    pub fn tensor_dim(&self) -> usize {
        self.tensor_dim
    }

    pub fn semantic_dim(&self) -> Option<usize> {
        self.state.read().semantic_dim
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn entry(&self, atom: &AtomId) -> Option<Arc<IndexEntry>> {
        self.state.read().entries.get(atom).cloned()
    }

    /// Attach or replace the semantic half of an atom's entry.
    ///
    /// The atom must already be indexed; the first embedding fixes the
    /// deployment's semantic dimensionality unless the config did.
    pub fn upsert_embedding(&self, atom: &AtomId, values: Vec<f32>) -> Result<()> {
        let vector = SemanticVector::new(values)?;

        let mut state = self.state.write();
        if let Some(expected) = state.semantic_dim {
            if vector.dim() != expected {
                return Err(Error::InvalidDimension {
                    expected,
                    actual: vector.dim(),
                });
            }
        }
        let current = state
            .entries
            .get(atom)
            .cloned()
            .ok_or_else(|| Error::NotFound(atom.clone()))?;
        if current.semantic.as_deref() == Some(&vector) {
            return Ok(());
        }

        state.semantic_dim.get_or_insert(vector.dim());
        let entry = IndexEntry {
            semantic: Some(Arc::new(vector)),
            ..(*current).clone()
        };
        state.entries.insert(atom.clone(), Arc::new(entry));
        debug!(%atom, "replaced semantic vector");
        Ok(())
    }

    pub fn embedding(&self, atom: &AtomId) -> Option<Vec<f32>> {
        self.entry(atom)
            .and_then(|e| e.semantic.as_ref().map(|s| s.as_slice().to_vec()))
    }

    pub fn remove(&self, atom: &AtomId) -> bool {
        self.state.write().entries.remove(atom).is_some()
    }

    /// Re-derive every tensor half and kind from the store, keeping the
    /// semantic halves of atoms that still exist.
    ///
    /// Reads the store before taking the index lock; run it while ingestion
    /// is quiescent.
    pub fn rebuild_from(&self, store: &AtomStore) {
        let atoms = store.atoms();
        let tensors: AHashMap<AtomId, Arc<Tensor>> = store.tensors().into_iter().collect();

        let mut state = self.state.write();
        let mut entries = AHashMap::with_capacity(atoms.len());
        for atom in atoms {
            let semantic = state.entries.get(&atom.id).and_then(|e| e.semantic.clone());
            let tensor = tensors
                .get(&atom.id)
                .filter(|t| t.dim() == self.tensor_dim)
                .cloned();
            entries.insert(
                atom.id.clone(),
                Arc::new(IndexEntry {
                    atom: atom.id.clone(),
                    kind: atom.kind(),
                    tensor,
                    semantic,
                }),
            );
        }
        state.entries = entries;
        info!(entries = state.entries.len(), "rebuilt hybrid index");
    }

    fn snapshot(&self) -> (Vec<Arc<IndexEntry>>, Option<usize>) {
        let state = self.state.read();
        (state.entries.values().cloned().collect(), state.semantic_dim)
    }
}

impl SearchBackend for HybridIndex {
    /// Rank entries against the query.
    ///
    /// Entries that lack a half the query weights are not candidates. An
    /// empty index yields an empty result, never an error. The context is
    /// checked before and after the scan.
    fn search_within(
        &self,
        query: &HybridQuery,
        k: usize,
        weighting: &Weighting,
        context: &SearchContext,
    ) -> Result<Vec<SearchHit>> {
        if query.is_empty() {
            return Err(Error::EmptyQuery);
        }
        let (tensor_weight, semantic_weight) =
            weighting.resolve(query.tensor.is_some(), query.semantic.is_some())?;

        if let Some(tensor) = &query.tensor {
            if tensor.len() != self.tensor_dim {
                return Err(Error::InvalidDimension {
                    expected: self.tensor_dim,
                    actual: tensor.len(),
                });
            }
            if tensor.iter().any(|v| !v.is_finite() || !(0.0..=1.0).contains(v)) {
                return Err(Error::InvalidTensor(
                    "query tensor values must be finite and within [0, 1]".into(),
                ));
            }
        }
        let semantic = match (&query.semantic, semantic_weight > 0.0) {
            (Some(values), true) => Some(SemanticVector::new(values.clone())?),
            _ => None,
        };

        let (entries, semantic_dim) = self.snapshot();
        if let (Some(vector), Some(expected)) = (&semantic, semantic_dim) {
            if vector.dim() != expected {
                return Err(Error::InvalidDimension {
                    expected,
                    actual: vector.dim(),
                });
            }
        }
        if entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        context.check()?;

        let scorer = Scorer {
            tensor: query.tensor.as_deref(),
            semantic: semantic.as_ref(),
            tensor_weight,
            semantic_weight,
            filter: &query.filter,
        };
        let hits: Vec<SearchHit> = if entries.len() >= self.config.parallel_threshold {
            entries.par_iter().filter_map(|e| scorer.score(e)).collect()
        } else {
            entries.iter().filter_map(|e| scorer.score(e)).collect()
        };

        context.check()?;

        let candidates = hits.len();
        let results = top_k(hits, k);
        debug!(candidates, returned = results.len(), "hybrid search");
        Ok(results)
    }

    fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

impl TensorObserver for HybridIndex {
    fn atom_changed(&self, atom: &Arc<Atom>) {
        let mut state = self.state.write();
        let entry = match state.entries.get(&atom.id) {
            Some(current) if current.kind == atom.kind() => return,
            Some(current) => IndexEntry {
                kind: atom.kind(),
                ..(**current).clone()
            },
            None => IndexEntry::new(atom.id.clone(), atom.kind()),
        };
        state.entries.insert(atom.id.clone(), Arc::new(entry));
    }

    fn tensor_replaced(&self, atom: &AtomId, tensor: Arc<Tensor>) {
        if tensor.dim() != self.tensor_dim {
            warn!(
                %atom,
                dim = tensor.dim(),
                expected = self.tensor_dim,
                "ignoring tensor of foreign dimensionality"
            );
            return;
        }

        let mut state = self.state.write();
        let current = state.entries.get(atom).cloned();
        let stale = current
            .as_ref()
            .and_then(|e| e.tensor.as_ref())
            .map_or(false, |held| held.revision() >= tensor.revision());
        if stale {
            return;
        }

        let entry = match current {
            Some(current) => IndexEntry {
                tensor: Some(tensor),
                ..(*current).clone()
            },
            None => IndexEntry {
                tensor: Some(tensor),
                ..IndexEntry::new(atom.clone(), AtomKind::default())
            },
        };
        state.entries.insert(atom.clone(), Arc::new(entry));
    }

    fn atom_removed(&self, atom: &AtomId) {
        self.state.write().entries.remove(atom);
    }
}
