//! # atomx
//!
//! A skincare ingredient intelligence engine.
//!
//! atomx keeps a knowledge graph of ingredient "atoms", each carrying a
//! bounded efficacy/risk tensor and goldilocks usage ranges, connected by
//! typed and weighted synergy, conflict and replacement relationships. On
//! top of it sit two capabilities:
//!
//! - **Routine validation**: conflicts, synergies, redundancies and
//!   out-of-range usage for a proposed set of ingredients
//! - **Hybrid search**: nearest neighbors by a caller-weighted blend of
//!   tensor distance and semantic embedding similarity
//!
//! ## Quick Start
//!
//! ### As a CLI
//!
//! ```bash
//! atomx check routine.json
//! atomx search --like retinol -k 5 --semantic-weight 0.3
//! atomx path bakuchiol niacinamide --max-depth 3
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use atomx::prelude::*;
//!
//! let engine = Engine::new(EngineConfig::default()).unwrap();
//! engine.load_dataset(&reference_dataset().unwrap()).unwrap();
//!
//! let routine = Routine::new(vec![
//!     RoutineEntry::new("retinol", 0.5, ApplicationContext::Facial, SkinType::All),
//!     RoutineEntry::new("glycolic_acid", 8.0, ApplicationContext::Facial, SkinType::All),
//! ]);
//! let report = engine.check_routine(&routine).unwrap();
//! assert_eq!(report.conflicts.len(), 1);
//! assert_eq!(report.verdict, Verdict::Incompatible);
//! ```
//!
//! ## Crate Structure
//!
//! - `atomx-core` - Data model, atom store and relationship graph
//! - `atomx-compat` - Routine compatibility engine
//! - `atomx-index` - Hybrid tensor + semantic index
//! - `atomx-storage` - Datasets, ingestion, reference data and snapshots

pub mod config;
pub mod engine;

pub use config::EngineConfig;
pub use engine::Engine;

// Re-export core types
pub use atomx_core::{
    ApplicationContext, Atom, AtomCategory, AtomId, AtomKind, AtomMetadata, AtomStore,
    DirectedRelationship, Direction, EdgeOutcome, Error, GoldilocksParameter, Purging,
    RangePosition, Relationship, RelationshipGraph, RelationshipType, Result, SkinType, Tensor,
    TensorSchema,
};

pub use atomx_compat::{
    CompatibilityConfig, CompatibilityEngine, CompatibilityReport, Notice, Routine, RoutineEntry,
    Severity, Verdict,
};

pub use atomx_index::{
    HybridIndex, HybridQuery, IndexConfig, SearchBackend, SearchContext, SearchFilter, SearchHit,
    Weighting,
};

pub use atomx_storage::{
    reference_dataset, AtomRecord, Dataset, IngestStats, Ingestor, SnapshotDescription,
    SnapshotManager,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        reference_dataset, ApplicationContext, AtomId, AtomKind, AtomMetadata, CompatibilityReport,
        Dataset, Engine, EngineConfig, Error, GoldilocksParameter, HybridQuery, Relationship,
        RelationshipType, Result, Routine, RoutineEntry, SearchFilter, SearchHit, SkinType,
        Verdict, Weighting,
    };
}
