use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier of an atom. Unique and immutable once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AtomId(String);

impl AtomId {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh id for records that arrive without a natural key
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AtomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AtomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<Uuid> for AtomId {
    fn from(u: Uuid) -> Self {
        Self(u.to_string())
    }
}

impl AsRef<str> for AtomId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtomKind {
    /// A single active or excipient
    #[default]
    Ingredient,
    /// A finished formulation
    Product,
}

impl FromStr for AtomKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ingredient" => Ok(AtomKind::Ingredient),
            "product" => Ok(AtomKind::Product),
            other => Err(format!("unknown atom kind '{}'", other)),
        }
    }
}

/// Functional family of an ingredient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtomCategory {
    Retinoid,
    Exfoliant,
    Antioxidant,
    Humectant,
    Emollient,
    Occlusive,
    Peptide,
    BarrierLipid,
    Botanical,
    UvFilter,
    Antimicrobial,
    Soothing,
    Brightening,
    #[default]
    Other,
}

impl FromStr for AtomCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        let category = match normalized.as_str() {
            "retinoid" => AtomCategory::Retinoid,
            "exfoliant" => AtomCategory::Exfoliant,
            "antioxidant" => AtomCategory::Antioxidant,
            "humectant" => AtomCategory::Humectant,
            "emollient" => AtomCategory::Emollient,
            "occlusive" => AtomCategory::Occlusive,
            "peptide" => AtomCategory::Peptide,
            "barrier_lipid" => AtomCategory::BarrierLipid,
            "botanical" => AtomCategory::Botanical,
            "uv_filter" => AtomCategory::UvFilter,
            "antimicrobial" => AtomCategory::Antimicrobial,
            "soothing" => AtomCategory::Soothing,
            "brightening" => AtomCategory::Brightening,
            "other" => AtomCategory::Other,
            _ => return Err(format!("unknown atom category '{}'", s)),
        };
        Ok(category)
    }
}

/// Temporary adverse reaction ("purging") an ingredient is known to induce.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Purging {
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Everything about an atom except its identity and version.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AtomMetadata {
    pub name: String,
    #[serde(default)]
    pub kind: AtomKind,
    #[serde(default)]
    pub chemical_name: Option<String>,
    /// CAS registry number
    #[serde(default)]
    pub registry_number: Option<String>,
    #[serde(default)]
    pub category: AtomCategory,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub mechanism: Option<String>,
    #[serde(default)]
    pub purging: Option<Purging>,
}

impl AtomMetadata {
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn with_kind(mut self, kind: AtomKind) -> Self {
        self.kind = kind;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_category(mut self, category: AtomCategory) -> Self {
        self.category = category;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_chemical_name(mut self, chemical_name: impl Into<String>) -> Self {
        self.chemical_name = Some(chemical_name.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_purging(mut self, purging: Purging) -> Self {
        self.purging = Some(purging);
        self
    }
}

/// An ingredient or product in the knowledge graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    pub id: AtomId,
    /// Incremented each time the metadata actually changes
    pub version: u64,
    #[serde(flatten)]
    pub metadata: AtomMetadata,
}

impl Atom {
    #[inline]
    #[must_use]
    pub fn new(id: AtomId, metadata: AtomMetadata) -> Self {
        Self {
            id,
            version: 1,
            metadata,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    #[inline]
    pub fn kind(&self) -> AtomKind {
        self.metadata.kind
    }

    #[inline]
    pub fn induces_purging(&self) -> bool {
        self.metadata.purging.is_some()
    }
}
