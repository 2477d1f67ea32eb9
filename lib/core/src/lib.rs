//! # atomx Core
//!
//! Core library for the atomx ingredient intelligence engine.
//!
//! This crate provides the knowledge-graph data model and its two stores:
//!
//! - [`Atom`] - An ingredient or product with stable identity
//! - [`Tensor`] - Bounded `[0, 1]` efficacy/risk profile laid out by a [`TensorSchema`]
//! - [`GoldilocksParameter`] - Optimal and absolute usage ranges per context and skin type
//! - [`Relationship`] - Directed, typed, weighted edge between two atoms
//! - [`AtomStore`] - Validated, copy-on-write storage for atoms, tensors and ranges
//! - [`RelationshipGraph`] - Adjacency-indexed edges with pair and path queries
//!
//! ## Example
//!
//! ```rust
//! use atomx_core::{AtomStore, AtomMetadata, RelationshipGraph, Relationship, RelationshipType};
//! use std::sync::Arc;
//!
//! let store = Arc::new(AtomStore::default());
//! store.upsert_atom("retinol".into(), AtomMetadata::new("Retinol")).unwrap();
//! store.upsert_atom("glycolic_acid".into(), AtomMetadata::new("Glycolic Acid")).unwrap();
//!
//! let graph = RelationshipGraph::new(store);
//! graph
//!     .add_relationship(Relationship::new(
//!         "retinol".into(),
//!         "glycolic_acid".into(),
//!         RelationshipType::ConflictsWith,
//!         0.8,
//!     ))
//!     .unwrap();
//!
//! let between = graph.relationship_between(&"glycolic_acid".into(), &"retinol".into());
//! assert_eq!(between.len(), 1);
//! ```

pub mod atom;
pub mod error;
pub mod goldilocks;
pub mod graph;
pub mod relationship;
pub mod store;
pub mod tensor;

pub use atom::{Atom, AtomCategory, AtomId, AtomKind, AtomMetadata, Purging};
pub use error::{Error, Result};
pub use goldilocks::{
    ApplicationContext, GoldilocksKey, GoldilocksParameter, RangePosition, SkinType,
};
pub use graph::{EdgeOutcome, RelationshipGraph};
pub use relationship::{DirectedRelationship, Direction, Relationship, RelationshipType};
pub use store::{AtomStore, TensorObserver};
pub use tensor::{Tensor, TensorSchema, REFERENCE_DIMENSIONS};
