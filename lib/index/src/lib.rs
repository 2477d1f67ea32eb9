//! # atomx Index
//!
//! Hybrid nearest-neighbor search over atoms.
//!
//! Every atom is indexed by a pair of vectors:
//!
//! - the **tensor half**: its bounded efficacy/risk profile, compared by
//!   squared Euclidean distance
//! - the **semantic half**: an externally computed text embedding, compared
//!   by cosine similarity
//!
//! Both similarities are mapped onto `[0, 1]` and blended by a caller-chosen
//! [`Weighting`]. The search is exact; results are ordered by descending
//! score with ties broken by ascending atom id.
//!
//! ## Example
//!
//! ```rust
//! use atomx_core::{AtomMetadata, AtomStore, TensorSchema};
//! use atomx_index::{HybridIndex, HybridQuery, IndexConfig, SearchBackend, Weighting};
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! let schema = TensorSchema::new(vec!["hydration".into(), "soothing".into()]).unwrap();
//! let store = Arc::new(AtomStore::new(schema));
//! let index = Arc::new(HybridIndex::new(2, IndexConfig::default()));
//! store.subscribe(index.clone());
//!
//! store.upsert_atom("squalane".into(), AtomMetadata::new("Squalane")).unwrap();
//! let values = HashMap::from([("hydration".to_string(), 0.8), ("soothing".to_string(), 0.4)]);
//! store.set_tensor(&"squalane".into(), &values).unwrap();
//!
//! let hits = index
//!     .search(&HybridQuery::tensor(vec![0.8, 0.4]), 5, &Weighting::tensor_only())
//!     .unwrap();
//! assert_eq!(hits[0].atom.as_str(), "squalane");
//! ```

pub mod backend;
pub mod distance;
pub mod hybrid;
pub mod query;

pub use backend::{SearchBackend, SearchContext, SearchHit};
pub use distance::{squared_euclidean, tensor_similarity, SemanticVector};
pub use hybrid::{HybridIndex, IndexConfig, IndexEntry};
pub use query::{HybridQuery, SearchFilter, Weighting};
