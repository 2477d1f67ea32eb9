use crate::atom::AtomId;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator placed between merged evidence fragments
pub const EVIDENCE_SEPARATOR: &str = " | ";

/// Closed set of edge types. Never assumed symmetric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    SynergizesWith,
    ConflictsWith,
    /// `from` can stand in for `to`
    Replaces,
}

impl RelationshipType {
    pub const ALL: [RelationshipType; 3] = [
        RelationshipType::SynergizesWith,
        RelationshipType::ConflictsWith,
        RelationshipType::Replaces,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::SynergizesWith => "SYNERGIZES_WITH",
            RelationshipType::ConflictsWith => "CONFLICTS_WITH",
            RelationshipType::Replaces => "REPLACES",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "SYNERGIZES_WITH" | "SYNERGY" => Ok(RelationshipType::SynergizesWith),
            "CONFLICTS_WITH" | "CONFLICT" => Ok(RelationshipType::ConflictsWith),
            "REPLACES" => Ok(RelationshipType::Replaces),
            _ => Err(format!("unknown relationship type '{}'", s)),
        }
    }
}

/// A directed, typed, weighted edge between two distinct atoms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub from: AtomId,
    pub to: AtomId,
    #[serde(rename = "type")]
    pub kind: RelationshipType,
    pub strength: f32,
    #[serde(default)]
    pub evidence: String,
}

impl Relationship {
    #[inline]
    #[must_use]
    pub fn new(from: AtomId, to: AtomId, kind: RelationshipType, strength: f32) -> Self {
        Self {
            from,
            to,
            kind,
            strength,
            evidence: String::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = evidence.into();
        self
    }

    /// Checks that do not need the store: self-loops and strength bounds
    pub fn validate(&self) -> Result<()> {
        if self.from == self.to {
            return Err(Error::SelfLoop(self.from.clone()));
        }
        if !self.strength.is_finite() || !(0.0..=1.0).contains(&self.strength) {
            return Err(Error::InvalidStrength(self.strength));
        }
        Ok(())
    }

    /// Fold a duplicate `(from, to, type)` assertion into this edge.
    ///
    /// The higher strength wins; each evidence fragment is appended unless
    /// it is already present. Returns whether anything changed.
    pub(crate) fn merge(&mut self, other: &Relationship) -> bool {
        let mut changed = false;
        if other.strength > self.strength {
            self.strength = other.strength;
            changed = true;
        }
        for fragment in other.evidence_fragments() {
            if self.evidence_fragments().any(|f| f == fragment) {
                continue;
            }
            if !self.evidence.trim().is_empty() {
                self.evidence.push_str(EVIDENCE_SEPARATOR);
            }
            self.evidence.push_str(fragment);
            changed = true;
        }
        changed
    }

    pub fn evidence_fragments(&self) -> impl Iterator<Item = &str> {
        self.evidence
            .split(EVIDENCE_SEPARATOR)
            .map(str::trim)
            .filter(|f| !f.is_empty())
    }
}

/// Orientation of an edge relative to the pair a caller asked about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Edge runs from the first atom to the second
    Forward,
    /// Edge runs from the second atom to the first
    Reverse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectedRelationship {
    pub direction: Direction,
    pub relationship: Relationship,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(strength: f32, evidence: &str) -> Relationship {
        Relationship::new("a".into(), "b".into(), RelationshipType::ConflictsWith, strength)
            .with_evidence(evidence)
    }

    #[test]
    fn test_self_loop_rejected() {
        let r = Relationship::new("a".into(), "a".into(), RelationshipType::SynergizesWith, 0.5);
        assert!(matches!(r.validate(), Err(Error::SelfLoop(_))));
    }

    #[test]
    fn test_strength_bounds() {
        assert!(matches!(edge(1.2, "").validate(), Err(Error::InvalidStrength(_))));
        assert!(matches!(edge(-0.1, "").validate(), Err(Error::InvalidStrength(_))));
        assert!(edge(0.0, "").validate().is_ok());
        assert!(edge(1.0, "").validate().is_ok());
    }

    #[test]
    fn test_merge_keeps_max_strength_and_concatenates() {
        let mut base = edge(0.4, "pH clash");
        assert!(base.merge(&edge(0.8, "oxidation")));
        assert_eq!(base.strength, 0.8);
        assert_eq!(base.evidence, "pH clash | oxidation");

        assert!(!base.merge(&edge(0.3, "oxidation")));
        assert_eq!(base.strength, 0.8);
        assert_eq!(base.evidence_fragments().count(), 2);
    }

    #[test]
    fn test_merge_multi_fragment_evidence_is_idempotent() {
        let mut base = edge(0.8, "low pH | oxidation");
        assert!(!base.merge(&edge(0.8, "low pH | oxidation")));
        assert!(!base.merge(&edge(0.8, "oxidation | low pH")));
        assert_eq!(base.evidence, "low pH | oxidation");

        assert!(base.merge(&edge(0.8, "oxidation | clinical report")));
        assert_eq!(base.evidence, "low pH | oxidation | clinical report");
    }

    #[test]
    fn test_type_serde_names() {
        let json = serde_json::to_string(&RelationshipType::ConflictsWith).unwrap();
        assert_eq!(json, "\"CONFLICTS_WITH\"");
        assert_eq!(
            "synergizes-with".parse::<RelationshipType>().unwrap(),
            RelationshipType::SynergizesWith
        );
    }
}
