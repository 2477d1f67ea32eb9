//! Compatibility report structures
//!
//! The report keeps every finding the engine made, bucketed by kind, so a
//! caller can explain exactly why a routine was flagged.

use atomx_core::{ApplicationContext, AtomId, Direction, SkinType};
use serde::{Deserialize, Serialize};

/// A synergy or conflict edge found between two routine atoms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairFinding {
    /// Earlier of the two atoms in routine order
    pub first: AtomId,
    pub second: AtomId,
    /// Orientation of the stored edge relative to (first, second)
    pub direction: Direction,
    pub strength: f32,
    pub evidence: String,
}

impl PairFinding {
    pub fn involves(&self, a: &AtomId, b: &AtomId) -> bool {
        (&self.first == a && &self.second == b) || (&self.first == b && &self.second == a)
    }
}

/// Both the replacing and the replaced atom are in the routine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Redundancy {
    pub replacement: AtomId,
    pub replaced: AtomId,
    pub strength: f32,
    pub evidence: String,
}

/// A pair curated as both synergistic and conflicting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contradiction {
    pub first: AtomId,
    pub second: AtomId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Between the optimal and absolute bounds
    Suboptimal,
    /// Beyond the absolute bounds
    Unsafe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeViolation {
    pub atom: AtomId,
    /// Index of the offending routine entry
    pub entry: usize,
    pub parameter: String,
    pub unit: String,
    pub value: f64,
    pub severity: Severity,
    pub opt_min: f64,
    pub opt_max: f64,
    pub abs_min: f64,
    pub abs_max: f64,
    /// Context and skin type of the goldilocks row that applied
    pub context: ApplicationContext,
    pub skin_type: SkinType,
}

impl RangeViolation {
    pub fn is_above(&self) -> bool {
        self.value > self.opt_max
    }
}

/// Informational findings that do not fail the check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    NoGuidanceAvailable {
        atom: AtomId,
        entry: usize,
        parameter: String,
        context: ApplicationContext,
        skin_type: SkinType,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    #[default]
    Compatible,
    Caution,
    Incompatible,
}

/// Result of checking one routine
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompatibilityReport {
    pub conflicts: Vec<PairFinding>,
    pub synergies: Vec<PairFinding>,
    pub redundancies: Vec<Redundancy>,
    pub range_violations: Vec<RangeViolation>,
    pub contradictions: Vec<Contradiction>,
    pub notices: Vec<Notice>,
    pub verdict: Verdict,
}

/// Per-bucket counts of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub conflicts: usize,
    pub synergies: usize,
    pub redundancies: usize,
    pub unsafe_violations: usize,
    pub suboptimal_violations: usize,
    pub contradictions: usize,
    pub notices: usize,
    pub verdict: Verdict,
}

impl CompatibilityReport {
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
            && self.synergies.is_empty()
            && self.redundancies.is_empty()
            && self.range_violations.is_empty()
            && self.contradictions.is_empty()
            && self.notices.is_empty()
    }

    pub fn unsafe_violations(&self) -> impl Iterator<Item = &RangeViolation> {
        self.range_violations
            .iter()
            .filter(|v| v.severity == Severity::Unsafe)
    }

    pub fn conflicts_between<'a>(
        &'a self,
        a: &'a AtomId,
        b: &'a AtomId,
    ) -> impl Iterator<Item = &'a PairFinding> + 'a {
        self.conflicts.iter().filter(move |f| f.involves(a, b))
    }

    /// Aggregate verdict.
    ///
    /// `Incompatible` on any unsafe range or any conflict at or above
    /// `severe_conflict_threshold`; `Caution` on any other finding except
    /// synergies; otherwise `Compatible`.
    pub fn assess(&self, severe_conflict_threshold: f32) -> Verdict {
        let severe_conflict = self
            .conflicts
            .iter()
            .any(|c| c.strength >= severe_conflict_threshold);
        if severe_conflict || self.unsafe_violations().next().is_some() {
            return Verdict::Incompatible;
        }
        if !self.conflicts.is_empty()
            || !self.redundancies.is_empty()
            || !self.range_violations.is_empty()
            || !self.contradictions.is_empty()
            || !self.notices.is_empty()
        {
            return Verdict::Caution;
        }
        Verdict::Compatible
    }

    pub fn summary(&self) -> ReportSummary {
        let unsafe_violations = self.unsafe_violations().count();
        ReportSummary {
            conflicts: self.conflicts.len(),
            synergies: self.synergies.len(),
            redundancies: self.redundancies.len(),
            unsafe_violations,
            suboptimal_violations: self.range_violations.len() - unsafe_violations,
            contradictions: self.contradictions.len(),
            notices: self.notices.len(),
            verdict: self.verdict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict(strength: f32) -> PairFinding {
        PairFinding {
            first: "a".into(),
            second: "b".into(),
            direction: Direction::Forward,
            strength,
            evidence: String::new(),
        }
    }

    #[test]
    fn test_empty_report_is_compatible() {
        let report = CompatibilityReport::default();
        assert!(report.is_empty());
        assert_eq!(report.assess(0.7), Verdict::Compatible);
    }

    #[test]
    fn test_conflict_strength_drives_verdict() {
        let mut report = CompatibilityReport::default();
        report.conflicts.push(conflict(0.4));
        assert_eq!(report.assess(0.7), Verdict::Caution);

        report.conflicts.push(conflict(0.7));
        assert_eq!(report.assess(0.7), Verdict::Incompatible);
    }

    #[test]
    fn test_synergy_alone_is_compatible() {
        let mut report = CompatibilityReport::default();
        report.synergies.push(conflict(0.9));
        assert!(!report.is_empty());
        assert_eq!(report.assess(0.7), Verdict::Compatible);
    }

    #[test]
    fn test_involves_is_order_free() {
        let finding = conflict(0.5);
        assert!(finding.involves(&"b".into(), &"a".into()));
        assert!(!finding.involves(&"a".into(), &"c".into()));
    }

    #[test]
    fn test_notice_serializes_with_kind_tag() {
        let notice = Notice::NoGuidanceAvailable {
            atom: "bakuchiol".into(),
            entry: 0,
            parameter: "concentration".into(),
            context: ApplicationContext::Facial,
            skin_type: SkinType::Dry,
        };
        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(json["kind"], "no_guidance_available");
        assert_eq!(json["skin_type"], "dry");
    }
}
