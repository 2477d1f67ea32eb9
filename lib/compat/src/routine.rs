//! Routine definitions
//!
//! A routine is the caller's proposed set of products/ingredients, each with
//! the concentration it is used at and where it is applied.

use atomx_core::{ApplicationContext, AtomId, SkinType};
use serde::{Deserialize, Serialize};

fn default_unit() -> String {
    "%".to_string()
}

/// One (atom, concentration, unit, context, skin type) tuple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineEntry {
    pub atom: AtomId,
    pub concentration: f64,
    #[serde(default = "default_unit")]
    pub unit: String,
    pub context: ApplicationContext,
    #[serde(default)]
    pub skin_type: SkinType,
    /// Formulation pH, checked against `pH` goldilocks rows when present
    #[serde(default)]
    pub ph: Option<f64>,
}

impl RoutineEntry {
    /// Entry measured in percent
    pub fn new(
        atom: impl Into<AtomId>,
        concentration: f64,
        context: ApplicationContext,
        skin_type: SkinType,
    ) -> Self {
        Self {
            atom: atom.into(),
            concentration,
            unit: default_unit(),
            context,
            skin_type,
            ph: None,
        }
    }

    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    #[must_use]
    pub fn with_ph(mut self, ph: f64) -> Self {
        self.ph = Some(ph);
        self
    }
}

/// Ordered list of routine entries
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Routine {
    pub entries: Vec<RoutineEntry>,
}

impl Routine {
    pub fn new(entries: Vec<RoutineEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct atoms in first-appearance order
    pub fn distinct_atoms(&self) -> Vec<&AtomId> {
        let mut seen = ahash::AHashSet::new();
        self.entries
            .iter()
            .map(|e| &e.atom)
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

impl From<Vec<RoutineEntry>> for Routine {
    fn from(entries: Vec<RoutineEntry>) -> Self {
        Self::new(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_defaults_from_json() {
        let entry: RoutineEntry = serde_json::from_str(
            r#"{"atom": "retinol", "concentration": 0.5, "context": "facial"}"#,
        )
        .unwrap();
        assert_eq!(entry.unit, "%");
        assert_eq!(entry.skin_type, SkinType::All);
        assert!(entry.ph.is_none());
    }

    #[test]
    fn test_distinct_atoms_keeps_order() {
        let routine = Routine::new(vec![
            RoutineEntry::new("b", 1.0, ApplicationContext::Facial, SkinType::All),
            RoutineEntry::new("a", 1.0, ApplicationContext::Facial, SkinType::All),
            RoutineEntry::new("b", 2.0, ApplicationContext::Body, SkinType::All),
        ]);
        let atoms: Vec<&str> = routine.distinct_atoms().iter().map(|a| a.as_str()).collect();
        assert_eq!(atoms, vec!["b", "a"]);
    }
}
