//! # atomx Compat
//!
//! Routine validation on top of the atomx knowledge graph.
//!
//! Given a routine (atoms with the concentration, context and skin type they
//! are used at) the [`CompatibilityEngine`] produces a [`CompatibilityReport`]:
//!
//! - **Conflicts** and **synergies**: every `CONFLICTS_WITH` / `SYNERGIZES_WITH`
//!   edge between two atoms of the routine, in either direction
//! - **Redundancies**: `REPLACES` edges whose both ends are in the routine
//! - **Range violations**: entries outside a goldilocks range, `suboptimal`
//!   between the optimal and absolute bounds, `unsafe` beyond the absolute ones
//! - **Contradictions**: pairs curated as both synergy and conflict
//! - **Notices**: entries for which no goldilocks guidance exists
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌─────────────┐
//! │   Routine   │────>│   Pair checks    │────>│   Report    │
//! │  (entries)  │     │ (relationships)  │     │  + verdict  │
//! └─────────────┘     └──────────────────┘     └─────────────┘
//!        │                                            ^
//!        │            ┌──────────────────┐            │
//!        └───────────>│  Range checks    │────────────┘
//!                     │  (goldilocks)    │
//!                     └──────────────────┘
//! ```

pub mod engine;
pub mod report;
pub mod routine;

pub use engine::{CompatibilityConfig, CompatibilityEngine};
pub use report::{
    CompatibilityReport, Contradiction, Notice, PairFinding, RangeViolation, Redundancy,
    ReportSummary, Severity, Verdict,
};
pub use routine::{Routine, RoutineEntry};
