//! Relationship Graph: directed, typed, weighted edges between atoms.
//!
//! Edges are stored in an outgoing adjacency list per atom with a reverse
//! index for incoming lookups, so neighbor and pair queries cost O(degree).
//! Symmetry is never inferred: a reverse edge is its own fact.

use crate::atom::{Atom, AtomId};
use crate::relationship::{DirectedRelationship, Direction, Relationship, RelationshipType};
use crate::store::AtomStore;
use crate::{Error, Result};
use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

type EdgeList = SmallVec<[Relationship; 4]>;
type BackRefs = SmallVec<[(AtomId, RelationshipType); 4]>;

/// What `add_relationship` did with an assertion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    Inserted,
    /// Folded into an existing (from, to, type) edge
    Merged,
    /// Duplicate that carried nothing new
    Unchanged,
}

#[derive(Default)]
struct Adjacency {
    outgoing: AHashMap<AtomId, EdgeList>,
    incoming: AHashMap<AtomId, BackRefs>,
    edge_count: usize,
}

impl Adjacency {
    fn edges_from<'a>(&'a self, atom: &AtomId) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.outgoing.get(atom).into_iter().flat_map(|edges| edges.iter())
    }

    fn edge(&self, from: &AtomId, to: &AtomId, kind: RelationshipType) -> Option<&Relationship> {
        self.edges_from(from).find(|e| &e.to == to && e.kind == kind)
    }

    fn has_edge_between(&self, a: &AtomId, b: &AtomId, kind: RelationshipType) -> bool {
        self.edge(a, b, kind).is_some() || self.edge(b, a, kind).is_some()
    }

    fn degree(&self, atom: &AtomId) -> usize {
        self.outgoing.get(atom).map_or(0, |e| e.len())
            + self.incoming.get(atom).map_or(0, |e| e.len())
    }
}

pub struct RelationshipGraph {
    store: Arc<AtomStore>,
    adjacency: RwLock<Adjacency>,
}

impl RelationshipGraph {
    pub fn new(store: Arc<AtomStore>) -> Self {
        Self {
            store,
            adjacency: RwLock::new(Adjacency::default()),
        }
    }

    #[inline]
    pub fn store(&self) -> &Arc<AtomStore> {
        &self.store
    }

    /// Number of distinct (from, to, type) edges
    pub fn len(&self) -> usize {
        self.adjacency.read().edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Assert a directed edge.
    ///
    /// Fails with `SelfLoop`, `InvalidStrength` or `UnknownAtom` without
    /// mutating anything. A duplicate (from, to, type) keeps the higher
    /// strength and appends evidence it has not seen yet.
    pub fn add_relationship(&self, relationship: Relationship) -> Result<EdgeOutcome> {
        relationship.validate()?;

        let mut adjacency = self.adjacency.write();
        for endpoint in [&relationship.from, &relationship.to] {
            if !self.store.contains(endpoint) {
                return Err(Error::UnknownAtom(endpoint.clone()));
            }
        }

        let from = relationship.from.clone();
        let to = relationship.to.clone();
        let kind = relationship.kind;

        let edges = adjacency.outgoing.entry(from.clone()).or_default();
        if let Some(existing) = edges.iter_mut().find(|e| e.to == to && e.kind == kind) {
            let outcome = if existing.merge(&relationship) {
                debug!(%from, %to, %kind, strength = existing.strength, "merged relationship");
                EdgeOutcome::Merged
            } else {
                EdgeOutcome::Unchanged
            };
            return Ok(outcome);
        }

        let mut relationship = relationship;
        relationship.evidence = relationship.evidence.trim().to_string();
        edges.push(relationship);
        adjacency
            .incoming
            .entry(to.clone())
            .or_default()
            .push((from.clone(), kind));
        adjacency.edge_count += 1;
        debug!(%from, %to, %kind, "inserted relationship");

        let opposite = match kind {
            RelationshipType::SynergizesWith => Some(RelationshipType::ConflictsWith),
            RelationshipType::ConflictsWith => Some(RelationshipType::SynergizesWith),
            RelationshipType::Replaces => None,
        };
        if let Some(opposite) = opposite {
            if adjacency.has_edge_between(&from, &to, opposite) {
                warn!(%from, %to, "pair is curated as both synergy and conflict");
            }
        }
        Ok(EdgeOutcome::Inserted)
    }

    /// Outgoing edges of an atom, optionally of one type
    pub fn neighbors(
        &self,
        atom: &AtomId,
        kind: Option<RelationshipType>,
    ) -> Result<Vec<Relationship>> {
        let adjacency = self.adjacency.read();
        if !self.store.contains(atom) {
            return Err(Error::NotFound(atom.clone()));
        }
        Ok(adjacency
            .edges_from(atom)
            .filter(|e| kind.map_or(true, |k| e.kind == k))
            .cloned()
            .collect())
    }

    /// Incoming edges of an atom, optionally of one type
    pub fn incoming(
        &self,
        atom: &AtomId,
        kind: Option<RelationshipType>,
    ) -> Result<Vec<Relationship>> {
        let adjacency = self.adjacency.read();
        if !self.store.contains(atom) {
            return Err(Error::NotFound(atom.clone()));
        }
        let refs = match adjacency.incoming.get(atom) {
            Some(refs) => refs,
            None => return Ok(Vec::new()),
        };
        Ok(refs
            .iter()
            .filter(|(_, k)| kind.map_or(true, |want| *k == want))
            .filter_map(|(from, k)| adjacency.edge(from, atom, *k).cloned())
            .collect())
    }

    pub fn degree(&self, atom: &AtomId) -> usize {
        self.adjacency.read().degree(atom)
    }

    /// Every edge between `a` and `b` in either direction, tagged relative to `a`
    pub fn relationship_between(&self, a: &AtomId, b: &AtomId) -> Vec<DirectedRelationship> {
        let adjacency = self.adjacency.read();
        let forward = adjacency
            .edges_from(a)
            .filter(|e| &e.to == b)
            .map(|e| DirectedRelationship {
                direction: Direction::Forward,
                relationship: e.clone(),
            });
        let reverse = adjacency
            .edges_from(b)
            .filter(|e| &e.to == a)
            .map(|e| DirectedRelationship {
                direction: Direction::Reverse,
                relationship: e.clone(),
            });
        forward.chain(reverse).collect()
    }

    /// Shortest directed path from `from` to `to` of at most `max_depth`
    /// edges, optionally following only the given edge types.
    pub fn find_path(
        &self,
        from: &AtomId,
        to: &AtomId,
        max_depth: usize,
        kinds: Option<&[RelationshipType]>,
    ) -> Result<Option<Vec<Relationship>>> {
        let adjacency = self.adjacency.read();
        for endpoint in [from, to] {
            if !self.store.contains(endpoint) {
                return Err(Error::NotFound(endpoint.clone()));
            }
        }
        if from == to {
            return Ok(Some(Vec::new()));
        }

        let allowed = |kind: RelationshipType| kinds.map_or(true, |ks| ks.contains(&kind));
        let mut parents: AHashMap<AtomId, Relationship> = AHashMap::new();
        let mut visited: AHashSet<AtomId> = AHashSet::new();
        let mut queue: VecDeque<(AtomId, usize)> = VecDeque::new();
        visited.insert(from.clone());
        queue.push_back((from.clone(), 0));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for edge in adjacency.edges_from(&current).filter(|e| allowed(e.kind)) {
                if !visited.insert(edge.to.clone()) {
                    continue;
                }
                parents.insert(edge.to.clone(), edge.clone());
                if &edge.to == to {
                    let mut path = Vec::with_capacity(depth + 1);
                    let mut cursor = to.clone();
                    while let Some(step) = parents.remove(&cursor) {
                        cursor = step.from.clone();
                        path.push(step);
                    }
                    path.reverse();
                    return Ok(Some(path));
                }
                queue.push_back((edge.to.clone(), depth + 1));
            }
        }
        Ok(None)
    }

    /// All edges ordered by (from, to, type)
    pub fn relationships(&self) -> Vec<Relationship> {
        let adjacency = self.adjacency.read();
        let mut all: Vec<Relationship> = adjacency
            .outgoing
            .values()
            .flat_map(|edges| edges.iter().cloned())
            .collect();
        all.sort_by(|a, b| (&a.from, &a.to, a.kind).cmp(&(&b.from, &b.to, b.kind)));
        all
    }

    /// Delete an atom that no relationship references any more.
    ///
    /// The atom's own tensor and goldilocks rows go with it.
    pub fn remove_atom(&self, atom: &AtomId) -> Result<Arc<Atom>> {
        let adjacency = self.adjacency.write();
        let edges = adjacency.degree(atom);
        if edges > 0 {
            return Err(Error::AtomInUse {
                atom: atom.clone(),
                edges,
            });
        }
        let removed = self.store.remove_atom(atom)?;
        drop(adjacency);
        Ok(removed)
    }
}
