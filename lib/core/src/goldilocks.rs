//! Goldilocks usage ranges.
//!
//! A goldilocks parameter says how much of an ingredient (or what pH) works
//! best, and how far one may stray before it becomes unsafe, for a given
//! application context and skin type.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const CONCENTRATION: &str = "concentration";
pub const PH: &str = "pH";

/// Where on the body a product is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationContext {
    Facial,
    Periorbital,
    Body,
    Scalp,
    Lips,
    Hands,
}

impl fmt::Display for ApplicationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ApplicationContext::Facial => "facial",
            ApplicationContext::Periorbital => "periorbital",
            ApplicationContext::Body => "body",
            ApplicationContext::Scalp => "scalp",
            ApplicationContext::Lips => "lips",
            ApplicationContext::Hands => "hands",
        };
        f.write_str(s)
    }
}

impl FromStr for ApplicationContext {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "facial" | "face" => Ok(ApplicationContext::Facial),
            "periorbital" | "eye" => Ok(ApplicationContext::Periorbital),
            "body" => Ok(ApplicationContext::Body),
            "scalp" => Ok(ApplicationContext::Scalp),
            "lips" => Ok(ApplicationContext::Lips),
            "hands" => Ok(ApplicationContext::Hands),
            other => Err(format!("unknown application context '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinType {
    /// Applies regardless of skin type
    #[default]
    All,
    Normal,
    Dry,
    Oily,
    Combination,
    Sensitive,
    AcneProne,
}

impl fmt::Display for SkinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkinType::All => "all",
            SkinType::Normal => "normal",
            SkinType::Dry => "dry",
            SkinType::Oily => "oily",
            SkinType::Combination => "combination",
            SkinType::Sensitive => "sensitive",
            SkinType::AcneProne => "acne_prone",
        };
        f.write_str(s)
    }
}

impl FromStr for SkinType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "all" => Ok(SkinType::All),
            "normal" => Ok(SkinType::Normal),
            "dry" => Ok(SkinType::Dry),
            "oily" => Ok(SkinType::Oily),
            "combination" => Ok(SkinType::Combination),
            "sensitive" => Ok(SkinType::Sensitive),
            "acne_prone" => Ok(SkinType::AcneProne),
            other => Err(format!("unknown skin type '{}'", other)),
        }
    }
}

/// A usage-range recommendation for one atom.
///
/// Invariant once stored: `abs_min <= opt_min <= opt_max <= abs_max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldilocksParameter {
    /// e.g. `concentration`, `pH`
    pub name: String,
    pub unit: String,
    pub opt_min: f64,
    pub opt_max: f64,
    pub abs_min: f64,
    pub abs_max: f64,
    pub context: ApplicationContext,
    #[serde(default)]
    pub skin_type: SkinType,
}

/// Upsert key: at most one row per (atom, name, context, skin type).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GoldilocksKey {
    name: String,
    pub context: ApplicationContext,
    pub skin_type: SkinType,
}

/// Where a value sits relative to a goldilocks range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePosition {
    Optimal,
    /// Outside the optimal band but within the absolute range
    Suboptimal,
    /// Outside the absolute range
    Unsafe,
}

impl GoldilocksParameter {
    pub fn concentration(
        unit: impl Into<String>,
        (opt_min, opt_max): (f64, f64),
        (abs_min, abs_max): (f64, f64),
        context: ApplicationContext,
        skin_type: SkinType,
    ) -> Self {
        Self {
            name: CONCENTRATION.to_string(),
            unit: unit.into(),
            opt_min,
            opt_max,
            abs_min,
            abs_max,
            context,
            skin_type,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidRange("parameter name cannot be empty".into()));
        }
        let bounds = [self.opt_min, self.opt_max, self.abs_min, self.abs_max];
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(Error::InvalidRange(format!("'{}' has a non-finite bound", self.name)));
        }
        if self.opt_min > self.opt_max {
            return Err(Error::InvalidRange(format!(
                "'{}': optMin {} > optMax {}",
                self.name, self.opt_min, self.opt_max
            )));
        }
        if self.opt_max > self.abs_max {
            return Err(Error::InvalidRange(format!(
                "'{}': optMax {} > absMax {}",
                self.name, self.opt_max, self.abs_max
            )));
        }
        if self.abs_min > self.opt_min {
            return Err(Error::InvalidRange(format!(
                "'{}': absMin {} > optMin {}",
                self.name, self.abs_min, self.opt_min
            )));
        }
        Ok(())
    }

    pub fn key(&self) -> GoldilocksKey {
        GoldilocksKey {
            name: self.name.to_ascii_lowercase(),
            context: self.context,
            skin_type: self.skin_type,
        }
    }

    #[inline]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn classify(&self, value: f64) -> RangePosition {
        if value < self.abs_min || value > self.abs_max {
            RangePosition::Unsafe
        } else if value < self.opt_min || value > self.opt_max {
            RangePosition::Suboptimal
        } else {
            RangePosition::Optimal
        }
    }
}
