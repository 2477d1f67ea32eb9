//! Compatibility engine
//!
//! Checks a routine against the relationship graph (pairwise conflicts,
//! synergies and redundancies) and against goldilocks ranges (per-entry
//! concentration and pH). The work is local to the routine's atom set:
//! O(n²) pair lookups plus O(n·g) range checks, never a graph traversal.

use crate::report::{
    CompatibilityReport, Contradiction, Notice, PairFinding, RangeViolation, Redundancy, Severity,
};
use crate::routine::{Routine, RoutineEntry};
use atomx_core::goldilocks::{CONCENTRATION, PH};
use atomx_core::{
    AtomId, Direction, Error, GoldilocksParameter, RangePosition, RelationshipGraph,
    RelationshipType, Result, SkinType,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Configuration for routine checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatibilityConfig {
    /// Conflicts at or above this strength make a routine incompatible
    pub severe_conflict_threshold: f32,
}

impl Default for CompatibilityConfig {
    fn default() -> Self {
        Self {
            severe_conflict_threshold: 0.7,
        }
    }
}

impl CompatibilityConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.severe_conflict_threshold) {
            return Err(Error::InvalidConfig(format!(
                "severe_conflict_threshold {} outside [0, 1]",
                self.severe_conflict_threshold
            )));
        }
        Ok(())
    }
}

/// Stateless checker over a shared graph (and, through it, the atom store)
#[derive(Clone)]
pub struct CompatibilityEngine {
    graph: Arc<RelationshipGraph>,
    config: CompatibilityConfig,
}

impl CompatibilityEngine {
    pub fn new(graph: Arc<RelationshipGraph>, config: CompatibilityConfig) -> Self {
        Self { graph, config }
    }

    pub fn config(&self) -> &CompatibilityConfig {
        &self.config
    }

    /// Check a routine.
    ///
    /// Any malformed entry (unknown atom, negative or non-finite
    /// concentration, impossible pH, blank unit) rejects the whole routine
    /// with `InvalidRoutine`. Missing goldilocks guidance is reported as a
    /// notice, not an error.
    pub fn check_routine(&self, routine: &Routine) -> Result<CompatibilityReport> {
        self.validate(routine)?;

        let mut report = CompatibilityReport::default();
        self.check_pairs(routine, &mut report);
        for (index, entry) in routine.entries.iter().enumerate() {
            self.check_ranges(index, entry, &mut report)?;
        }
        report.verdict = report.assess(self.config.severe_conflict_threshold);

        debug!(
            entries = routine.len(),
            conflicts = report.conflicts.len(),
            violations = report.range_violations.len(),
            verdict = ?report.verdict,
            "checked routine"
        );
        Ok(report)
    }

    fn validate(&self, routine: &Routine) -> Result<()> {
        let store = self.graph.store();
        for (index, entry) in routine.entries.iter().enumerate() {
            if !store.contains(&entry.atom) {
                return Err(Error::InvalidRoutine(format!(
                    "entry {}: unknown atom '{}'",
                    index, entry.atom
                )));
            }
            if !entry.concentration.is_finite() || entry.concentration < 0.0 {
                return Err(Error::InvalidRoutine(format!(
                    "entry {}: concentration {} for '{}' must be a non-negative number",
                    index, entry.concentration, entry.atom
                )));
            }
            if entry.unit.trim().is_empty() {
                return Err(Error::InvalidRoutine(format!("entry {}: unit is empty", index)));
            }
            if let Some(ph) = entry.ph {
                if !ph.is_finite() || !(0.0..=14.0).contains(&ph) {
                    return Err(Error::InvalidRoutine(format!(
                        "entry {}: pH {} outside [0, 14]",
                        index, ph
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_pairs(&self, routine: &Routine, report: &mut CompatibilityReport) {
        let atoms = routine.distinct_atoms();
        for (i, first) in atoms.iter().enumerate() {
            for second in &atoms[i + 1..] {
                let mut synergy = false;
                let mut conflict = false;

                for directed in self.graph.relationship_between(first, second) {
                    let edge = directed.relationship;
                    match edge.kind {
                        RelationshipType::ConflictsWith => {
                            conflict = true;
                            report.conflicts.push(pair_finding(
                                first,
                                second,
                                directed.direction,
                                edge.strength,
                                edge.evidence,
                            ));
                        }
                        RelationshipType::SynergizesWith => {
                            synergy = true;
                            report.synergies.push(pair_finding(
                                first,
                                second,
                                directed.direction,
                                edge.strength,
                                edge.evidence,
                            ));
                        }
                        RelationshipType::Replaces => {
                            report.redundancies.push(Redundancy {
                                replacement: edge.from,
                                replaced: edge.to,
                                strength: edge.strength,
                                evidence: edge.evidence,
                            });
                        }
                    }
                }

                if synergy && conflict {
                    warn!(
                        first = %first,
                        second = %second,
                        "contradictory curation surfaced in routine check"
                    );
                    report.contradictions.push(Contradiction {
                        first: (*first).clone(),
                        second: (*second).clone(),
                    });
                }
            }
        }
    }

    fn check_ranges(
        &self,
        index: usize,
        entry: &RoutineEntry,
        report: &mut CompatibilityReport,
    ) -> Result<()> {
        let rows = self
            .graph
            .store()
            .get_goldilocks(&entry.atom, Some(entry.context), None)
            .map_err(|e| match e {
                Error::NotFound(id) => {
                    Error::InvalidRoutine(format!("atom '{}' was removed during the check", id))
                }
                other => other,
            })?;

        let concentration_rows: Vec<&GoldilocksParameter> = rows
            .iter()
            .filter(|r| r.is_named(CONCENTRATION) && r.unit.eq_ignore_ascii_case(entry.unit.trim()))
            .collect();
        self.check_value(
            index,
            entry,
            CONCENTRATION,
            entry.concentration,
            &concentration_rows,
            report,
        );

        if let Some(ph) = entry.ph {
            let ph_rows: Vec<&GoldilocksParameter> =
                rows.iter().filter(|r| r.is_named(PH)).collect();
            self.check_value(index, entry, PH, ph, &ph_rows, report);
        }
        Ok(())
    }

    fn check_value(
        &self,
        index: usize,
        entry: &RoutineEntry,
        parameter: &str,
        value: f64,
        rows: &[&GoldilocksParameter],
        report: &mut CompatibilityReport,
    ) {
        let applicable = applicable_rows(rows, entry.skin_type);
        if applicable.is_empty() {
            report.notices.push(Notice::NoGuidanceAvailable {
                atom: entry.atom.clone(),
                entry: index,
                parameter: parameter.to_string(),
                context: entry.context,
                skin_type: entry.skin_type,
            });
            return;
        }

        for row in applicable {
            let severity = match row.classify(value) {
                RangePosition::Optimal => continue,
                RangePosition::Suboptimal => Severity::Suboptimal,
                RangePosition::Unsafe => Severity::Unsafe,
            };
            report.range_violations.push(RangeViolation {
                atom: entry.atom.clone(),
                entry: index,
                parameter: row.name.clone(),
                unit: row.unit.clone(),
                value,
                severity,
                opt_min: row.opt_min,
                opt_max: row.opt_max,
                abs_min: row.abs_min,
                abs_max: row.abs_max,
                context: row.context,
                skin_type: row.skin_type,
            });
        }
    }
}

/// Rows for the exact skin type, falling back to `all`
fn applicable_rows<'a>(
    rows: &[&'a GoldilocksParameter],
    skin_type: SkinType,
) -> Vec<&'a GoldilocksParameter> {
    let exact: Vec<&GoldilocksParameter> = rows
        .iter()
        .copied()
        .filter(|r| r.skin_type == skin_type)
        .collect();
    if !exact.is_empty() || skin_type == SkinType::All {
        return exact;
    }
    rows.iter().copied().filter(|r| r.skin_type == SkinType::All).collect()
}

fn pair_finding(
    first: &AtomId,
    second: &AtomId,
    direction: Direction,
    strength: f32,
    evidence: String,
) -> PairFinding {
    PairFinding {
        first: first.clone(),
        second: second.clone(),
        direction,
        strength,
        evidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Verdict;
    use atomx_core::{ApplicationContext, AtomMetadata, AtomStore, Relationship};

    fn create_test_graph() -> Arc<RelationshipGraph> {
        let store = Arc::new(AtomStore::default());
        for id in ["retinol", "glycolic_acid", "niacinamide", "bakuchiol", "vitamin_c"] {
            store.upsert_atom(id.into(), AtomMetadata::new(id)).unwrap();
        }
        store
            .upsert_goldilocks(
                &"retinol".into(),
                GoldilocksParameter::concentration(
                    "%",
                    (0.25, 1.0),
                    (0.0, 2.0),
                    ApplicationContext::Facial,
                    SkinType::All,
                ),
            )
            .unwrap();
        store
            .upsert_goldilocks(
                &"retinol".into(),
                GoldilocksParameter::concentration(
                    "%",
                    (0.01, 0.1),
                    (0.0, 0.3),
                    ApplicationContext::Periorbital,
                    SkinType::Sensitive,
                ),
            )
            .unwrap();
        store
            .upsert_goldilocks(
                &"vitamin_c".into(),
                GoldilocksParameter {
                    name: PH.to_string(),
                    unit: "pH".to_string(),
                    opt_min: 2.5,
                    opt_max: 3.5,
                    abs_min: 2.0,
                    abs_max: 4.0,
                    context: ApplicationContext::Facial,
                    skin_type: SkinType::All,
                },
            )
            .unwrap();
        Arc::new(RelationshipGraph::new(store))
    }

    fn engine(graph: &Arc<RelationshipGraph>) -> CompatibilityEngine {
        CompatibilityEngine::new(graph.clone(), CompatibilityConfig::default())
    }

    fn facial(atom: &str, concentration: f64) -> RoutineEntry {
        RoutineEntry::new(atom, concentration, ApplicationContext::Facial, SkinType::All)
    }

    fn relate(
        graph: &RelationshipGraph,
        from: &str,
        to: &str,
        kind: RelationshipType,
        strength: f32,
    ) {
        graph
            .add_relationship(
                Relationship::new(from.into(), to.into(), kind, strength).with_evidence("test"),
            )
            .unwrap();
    }

    #[test]
    fn test_empty_routine() {
        let graph = create_test_graph();
        let report = engine(&graph).check_routine(&Routine::default()).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.verdict, Verdict::Compatible);
    }

    #[test]
    fn test_single_conflict_reported_once() {
        let graph = create_test_graph();
        relate(&graph, "retinol", "glycolic_acid", RelationshipType::ConflictsWith, 0.8);

        let routine = Routine::new(vec![facial("retinol", 0.5), facial("glycolic_acid", 5.0)]);
        let report = engine(&graph).check_routine(&routine).unwrap();

        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].strength, 0.8);
        assert!(report.conflicts[0].involves(&"glycolic_acid".into(), &"retinol".into()));
        assert_eq!(report.verdict, Verdict::Incompatible);
    }

    #[test]
    fn test_reverse_edge_found_from_either_order() {
        let graph = create_test_graph();
        relate(&graph, "glycolic_acid", "retinol", RelationshipType::ConflictsWith, 0.5);

        let routine = Routine::new(vec![facial("retinol", 0.5), facial("glycolic_acid", 5.0)]);
        let report = engine(&graph).check_routine(&routine).unwrap();
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].direction, Direction::Reverse);
        assert_eq!(report.verdict, Verdict::Caution);
    }

    #[test]
    fn test_contradiction_reports_both_buckets() {
        let graph = create_test_graph();
        relate(&graph, "vitamin_c", "niacinamide", RelationshipType::ConflictsWith, 0.3);
        relate(&graph, "niacinamide", "vitamin_c", RelationshipType::SynergizesWith, 0.6);

        let routine = Routine::new(vec![facial("vitamin_c", 10.0), facial("niacinamide", 5.0)]);
        let report = engine(&graph).check_routine(&routine).unwrap();
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.synergies.len(), 1);
        assert_eq!(report.contradictions.len(), 1);
    }

    #[test]
    fn test_redundancy_needs_both_atoms() {
        let graph = create_test_graph();
        relate(&graph, "bakuchiol", "retinol", RelationshipType::Replaces, 0.6);

        let only_one = Routine::new(vec![facial("bakuchiol", 1.0)]);
        assert!(engine(&graph).check_routine(&only_one).unwrap().redundancies.is_empty());

        let both = Routine::new(vec![facial("retinol", 0.5), facial("bakuchiol", 1.0)]);
        let report = engine(&graph).check_routine(&both).unwrap();
        assert_eq!(report.redundancies.len(), 1);
        assert_eq!(report.redundancies[0].replacement.as_str(), "bakuchiol");
        assert_eq!(report.redundancies[0].replaced.as_str(), "retinol");
    }

    #[test]
    fn test_concentration_classification() {
        let graph = create_test_graph();
        let engine = engine(&graph);

        let report = engine.check_routine(&Routine::new(vec![facial("retinol", 3.0)])).unwrap();
        assert_eq!(report.range_violations.len(), 1);
        assert_eq!(report.range_violations[0].severity, Severity::Unsafe);
        assert!(report.range_violations[0].is_above());

        let report = engine.check_routine(&Routine::new(vec![facial("retinol", 1.5)])).unwrap();
        assert_eq!(report.range_violations[0].severity, Severity::Suboptimal);

        let report = engine.check_routine(&Routine::new(vec![facial("retinol", 0.5)])).unwrap();
        assert!(report.range_violations.is_empty());
        assert!(report.notices.is_empty());
    }

    #[test]
    fn test_skin_type_falls_back_to_all() {
        let graph = create_test_graph();
        let entry = RoutineEntry::new("retinol", 1.5, ApplicationContext::Facial, SkinType::Dry);
        let report = engine(&graph).check_routine(&Routine::new(vec![entry])).unwrap();
        assert_eq!(report.range_violations.len(), 1);
        assert_eq!(report.range_violations[0].skin_type, SkinType::All);
    }

    #[test]
    fn test_exact_skin_type_preferred() {
        let graph = create_test_graph();
        let entry = RoutineEntry::new(
            "retinol",
            0.5,
            ApplicationContext::Periorbital,
            SkinType::Sensitive,
        );
        let report = engine(&graph).check_routine(&Routine::new(vec![entry])).unwrap();
        assert_eq!(report.range_violations.len(), 1);
        assert_eq!(report.range_violations[0].severity, Severity::Unsafe);
    }

    #[test]
    fn test_missing_guidance_is_a_notice() {
        let graph = create_test_graph();
        let periorbital_dry =
            RoutineEntry::new("retinol", 0.05, ApplicationContext::Periorbital, SkinType::Dry);
        let routine = Routine::new(vec![facial("bakuchiol", 1.0), periorbital_dry]);
        let report = engine(&graph).check_routine(&routine).unwrap();

        assert_eq!(report.notices.len(), 2);
        assert!(report.range_violations.is_empty());
        assert_eq!(report.verdict, Verdict::Caution);
    }

    #[test]
    fn test_unit_mismatch_has_no_guidance() {
        let graph = create_test_graph();
        let entry = facial("retinol", 3000.0).with_unit("ppm");
        let report = engine(&graph).check_routine(&Routine::new(vec![entry])).unwrap();
        assert!(report.range_violations.is_empty());
        assert_eq!(report.notices.len(), 1);
    }

    #[test]
    fn test_ph_checked_when_present() {
        let graph = create_test_graph();
        let entry = facial("vitamin_c", 15.0).with_ph(4.5);
        let report = engine(&graph).check_routine(&Routine::new(vec![entry])).unwrap();

        let ph_violation = report
            .range_violations
            .iter()
            .find(|v| v.parameter == PH)
            .unwrap();
        assert_eq!(ph_violation.severity, Severity::Unsafe);
        // vitamin_c has no concentration guidance
        assert_eq!(report.notices.len(), 1);
    }

    #[test]
    fn test_malformed_entries_reject_whole_routine() {
        let graph = create_test_graph();
        let engine = engine(&graph);

        let unknown = Routine::new(vec![facial("retinol", 0.5), facial("unobtainium", 1.0)]);
        assert!(matches!(engine.check_routine(&unknown), Err(Error::InvalidRoutine(_))));

        let negative = Routine::new(vec![facial("retinol", -0.5)]);
        assert!(matches!(engine.check_routine(&negative), Err(Error::InvalidRoutine(_))));

        let bad_ph = Routine::new(vec![facial("vitamin_c", 10.0).with_ph(15.0)]);
        assert!(matches!(engine.check_routine(&bad_ph), Err(Error::InvalidRoutine(_))));
    }

    #[test]
    fn test_config_validation() {
        let config = CompatibilityConfig {
            severe_conflict_threshold: 1.5,
        };
        assert!(config.validate().is_err());
        assert!(CompatibilityConfig::default().validate().is_ok());
    }
}
