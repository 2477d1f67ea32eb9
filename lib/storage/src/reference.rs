//! Bundled reference data: thirteen common actives with full tensors,
//! goldilocks ranges, demo embeddings and curated relationships.

use crate::dataset::Dataset;
use anyhow::Result;

const REFERENCE_ATOMS: &str = include_str!("../data/reference_atoms.json");

pub fn reference_dataset() -> Result<Dataset> {
    Dataset::from_json(REFERENCE_ATOMS)
}
