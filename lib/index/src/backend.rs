use crate::query::{HybridQuery, Weighting};
use atomx_core::{AtomId, AtomKind, Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One ranked result with its per-half breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub atom: AtomId,
    pub kind: AtomKind,
    /// Weighted blend of the active halves, in [0, 1]
    pub score: f32,
    /// Present when the tensor half took part in scoring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tensor_similarity: Option<f32>,
    /// Present when the semantic half took part in scoring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_similarity: Option<f32>,
    /// Revision of the tensor that was scored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tensor_revision: Option<u64>,
}

/// Caller deadline and cancellation flag carried into a search.
///
/// Backends check it at their suspension points and give up with
/// `Error::SearchUnavailable` once it has expired or been cancelled.
#[derive(Debug, Clone, Default)]
pub struct SearchContext {
    deadline: Option<Instant>,
    cancelled: Option<Arc<AtomicBool>>,
}

impl SearchContext {
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now().checked_add(timeout);
        match deadline {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Share `flag`; storing `true` cancels every search holding it
    #[must_use]
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = Some(flag);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::Acquire))
    }

    /// Fail with `SearchUnavailable` if the caller gave up
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::SearchUnavailable("search cancelled by caller".into()));
        }
        if self.remaining() == Some(Duration::ZERO) {
            return Err(Error::SearchUnavailable("search deadline exceeded".into()));
        }
        Ok(())
    }
}

/// Anything that can answer hybrid nearest-neighbor queries.
///
/// An out-of-process implementation propagates the [`SearchContext`]
/// deadline to its transport, reports failures as
/// `Error::SearchUnavailable` and must not retry on its own; retry policy
/// belongs to the caller.
pub trait SearchBackend: Send + Sync {
    fn search_within(
        &self,
        query: &HybridQuery,
        k: usize,
        weighting: &Weighting,
        context: &SearchContext,
    ) -> Result<Vec<SearchHit>>;

    /// Search with no deadline and no cancellation
    fn search(
        &self,
        query: &HybridQuery,
        k: usize,
        weighting: &Weighting,
    ) -> Result<Vec<SearchHit>> {
        self.search_within(query, k, weighting, &SearchContext::default())
    }

    /// Number of searchable entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn name(&self) -> &str;
}
