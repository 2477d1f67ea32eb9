//! Atom Store: ingredient records, their tensors and goldilocks rows.
//!
//! Readers never block each other. Every write validates before it takes a
//! lock and holds the exclusive section for one upsert only. Records are
//! kept behind `Arc` and replaced wholesale, so a reader holding a tensor
//! sees either the complete old values or the complete new ones.
//!
//! Lock order is `atoms` -> `tensors` -> `goldilocks`.

use crate::atom::{Atom, AtomId, AtomMetadata};
use crate::goldilocks::{ApplicationContext, GoldilocksParameter, SkinType};
use crate::tensor::{Tensor, TensorSchema};
use crate::{Error, Result};
use ahash::AHashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Receives store changes that derived structures must follow.
///
/// Callbacks run while the store still holds the atom lock, so an
/// implementation must not call back into the store.
pub trait TensorObserver: Send + Sync {
    fn atom_changed(&self, _atom: &Arc<Atom>) {}
    fn tensor_replaced(&self, atom: &AtomId, tensor: Arc<Tensor>);
    fn atom_removed(&self, atom: &AtomId);
}

pub struct AtomStore {
    schema: Arc<TensorSchema>,
    atoms: RwLock<AHashMap<AtomId, Arc<Atom>>>,
    tensors: RwLock<AHashMap<AtomId, Arc<Tensor>>>,
    goldilocks: RwLock<AHashMap<AtomId, Vec<GoldilocksParameter>>>,
    next_revision: AtomicU64,
    observers: RwLock<Vec<Arc<dyn TensorObserver>>>,
}

impl AtomStore {
    pub fn new(schema: TensorSchema) -> Self {
        Self {
            schema: Arc::new(schema),
            atoms: RwLock::new(AHashMap::new()),
            tensors: RwLock::new(AHashMap::new()),
            goldilocks: RwLock::new(AHashMap::new()),
            next_revision: AtomicU64::new(1),
            observers: RwLock::new(Vec::new()),
        }
    }

    #[inline]
    pub fn tensor_schema(&self) -> &Arc<TensorSchema> {
        &self.schema
    }

    pub fn subscribe(&self, observer: Arc<dyn TensorObserver>) {
        self.observers.write().push(observer);
    }

    pub fn len(&self) -> usize {
        self.atoms.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.read().is_empty()
    }

    pub fn contains(&self, id: &AtomId) -> bool {
        self.atoms.read().contains_key(id)
    }

    /// All atom ids, sorted
    pub fn atom_ids(&self) -> Vec<AtomId> {
        let mut ids: Vec<AtomId> = self.atoms.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Create or replace an atom's metadata.
    ///
    /// The version only moves when the metadata differs from what is stored,
    /// so replaying an ingestion batch leaves the store untouched.
    pub fn upsert_atom(&self, id: AtomId, metadata: AtomMetadata) -> Result<Arc<Atom>> {
        if id.as_str().trim().is_empty() {
            return Err(Error::InvalidAtomId("atom id cannot be empty".into()));
        }

        let mut atoms = self.atoms.write();
        let atom = match atoms.get(&id) {
            Some(existing) if existing.metadata == metadata => return Ok(existing.clone()),
            Some(existing) => Arc::new(Atom {
                id: id.clone(),
                version: existing.version + 1,
                metadata,
            }),
            None => Arc::new(Atom::new(id.clone(), metadata)),
        };
        debug!(atom = %id, version = atom.version, "upserted atom");
        atoms.insert(id, atom.clone());

        for observer in self.observers.read().iter() {
            observer.atom_changed(&atom);
        }
        Ok(atom)
    }

    pub fn get_atom(&self, id: &AtomId) -> Result<Arc<Atom>> {
        self.atoms
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.clone()))
    }

    /// All atoms, sorted by id
    pub fn atoms(&self) -> Vec<Arc<Atom>> {
        let mut atoms: Vec<Arc<Atom>> = self.atoms.read().values().cloned().collect();
        atoms.sort_by(|a, b| a.id.cmp(&b.id));
        atoms
    }

    /// Replace an atom's whole tensor.
    ///
    /// Fails with `InvalidTensor` before touching any state if a declared
    /// dimension is missing, an undeclared one is present, or a value falls
    /// outside `[0, 1]`.
    pub fn set_tensor(&self, id: &AtomId, values: &HashMap<String, f32>) -> Result<Arc<Tensor>> {
        let ordered = self.schema.layout(values)?;

        let atoms = self.atoms.read();
        if !atoms.contains_key(id) {
            return Err(Error::NotFound(id.clone()));
        }

        let tensor = {
            let mut tensors = self.tensors.write();
            if let Some(existing) = tensors.get(id) {
                if existing.values() == ordered.as_slice() {
                    return Ok(existing.clone());
                }
            }
            let revision = self.next_revision.fetch_add(1, Ordering::SeqCst);
            let tensor = Arc::new(Tensor::new(ordered, revision));
            tensors.insert(id.clone(), tensor.clone());
            tensor
        };
        debug!(atom = %id, revision = tensor.revision(), "replaced tensor");

        for observer in self.observers.read().iter() {
            observer.tensor_replaced(id, tensor.clone());
        }
        drop(atoms);
        Ok(tensor)
    }

    pub fn get_tensor(&self, id: &AtomId) -> Result<Arc<Tensor>> {
        if let Some(tensor) = self.tensors.read().get(id) {
            return Ok(tensor.clone());
        }
        if self.contains(id) {
            Err(Error::TensorNotFound(id.clone()))
        } else {
            Err(Error::NotFound(id.clone()))
        }
    }

    /// Every stored tensor, for index rebuilds
    pub fn tensors(&self) -> Vec<(AtomId, Arc<Tensor>)> {
        self.tensors
            .read()
            .iter()
            .map(|(id, t)| (id.clone(), t.clone()))
            .collect()
    }

    /// Insert or replace the row keyed by (atom, name, context, skin type)
    pub fn upsert_goldilocks(&self, id: &AtomId, parameter: GoldilocksParameter) -> Result<()> {
        parameter.validate()?;

        let atoms = self.atoms.read();
        if !atoms.contains_key(id) {
            return Err(Error::NotFound(id.clone()));
        }

        let mut goldilocks = self.goldilocks.write();
        let rows = goldilocks.entry(id.clone()).or_default();
        let key = parameter.key();
        match rows.iter_mut().find(|row| row.key() == key) {
            Some(row) => *row = parameter,
            None => rows.push(parameter),
        }
        debug!(atom = %id, rows = rows.len(), "upserted goldilocks parameter");
        Ok(())
    }

    /// Goldilocks rows for an atom, optionally narrowed to an exact context
    /// and/or skin type. With no filter every row is returned.
    pub fn get_goldilocks(
        &self,
        id: &AtomId,
        context: Option<ApplicationContext>,
        skin_type: Option<SkinType>,
    ) -> Result<Vec<GoldilocksParameter>> {
        let atoms = self.atoms.read();
        if !atoms.contains_key(id) {
            return Err(Error::NotFound(id.clone()));
        }

        let goldilocks = self.goldilocks.read();
        let rows = goldilocks
            .get(id)
            .map(|rows| {
                rows.iter()
                    .filter(|row| context.map_or(true, |c| row.context == c))
                    .filter(|row| skin_type.map_or(true, |s| row.skin_type == s))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }

    /// Drop an atom with its tensor and goldilocks rows. Relationship checks
    /// are the graph's job, which is why this is crate-private.
    pub(crate) fn remove_atom(&self, id: &AtomId) -> Result<Arc<Atom>> {
        let mut atoms = self.atoms.write();
        let atom = atoms.remove(id).ok_or_else(|| Error::NotFound(id.clone()))?;
        self.tensors.write().remove(id);
        self.goldilocks.write().remove(id);
        debug!(atom = %id, "removed atom");

        for observer in self.observers.read().iter() {
            observer.atom_removed(id);
        }
        Ok(atom)
    }
}

impl Default for AtomStore {
    fn default() -> Self {
        Self::new(TensorSchema::reference())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goldilocks::CONCENTRATION;
    use crate::tensor::REFERENCE_DIMENSIONS;
    use parking_lot::Mutex;

    fn tensor_map(value: f32) -> HashMap<String, f32> {
        REFERENCE_DIMENSIONS.iter().map(|d| (d.to_string(), value)).collect()
    }

    fn store_with(id: &str) -> AtomStore {
        let store = AtomStore::default();
        store.upsert_atom(id.into(), AtomMetadata::new(id)).unwrap();
        store
    }

    fn concentration(opt: (f64, f64), abs: (f64, f64), skin_type: SkinType) -> GoldilocksParameter {
        GoldilocksParameter::concentration("%", opt, abs, ApplicationContext::Facial, skin_type)
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl TensorObserver for Recorder {
        fn tensor_replaced(&self, atom: &AtomId, tensor: Arc<Tensor>) {
            self.events.lock().push(format!("tensor:{}:{}", atom, tensor.revision()));
        }

        fn atom_removed(&self, atom: &AtomId) {
            self.events.lock().push(format!("removed:{}", atom));
        }
    }

    #[test]
    fn test_upsert_atom_is_idempotent() {
        let store = AtomStore::default();
        let niacinamide = || AtomMetadata::new("Niacinamide");
        let first = store.upsert_atom("niacinamide".into(), niacinamide()).unwrap();
        let again = store.upsert_atom("niacinamide".into(), niacinamide()).unwrap();
        assert_eq!(first.version, 1);
        assert_eq!(again.version, 1);
        assert_eq!(store.len(), 1);

        let renamed = store
            .upsert_atom("niacinamide".into(), AtomMetadata::new("Vitamin B3"))
            .unwrap();
        assert_eq!(renamed.version, 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_set_tensor_requires_atom() {
        let store = AtomStore::default();
        let result = store.set_tensor(&"ghost".into(), &tensor_map(0.5));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_invalid_tensor_leaves_previous_values() {
        let store = store_with("retinol");
        let id = AtomId::from("retinol");
        store.set_tensor(&id, &tensor_map(0.4)).unwrap();

        let mut bad = tensor_map(0.9);
        bad.insert("stability".into(), 1.5);
        assert!(matches!(store.set_tensor(&id, &bad), Err(Error::InvalidTensor(_))));

        let current = store.get_tensor(&id).unwrap();
        assert!(current.values().iter().all(|v| *v == 0.4));
    }

    #[test]
    fn test_missing_tensor_and_blank_id() {
        let store = store_with("retinol");
        assert!(matches!(store.get_tensor(&"retinol".into()), Err(Error::TensorNotFound(_))));
        assert!(matches!(store.get_tensor(&"ghost".into()), Err(Error::NotFound(_))));

        let blank = store.upsert_atom("  ".into(), AtomMetadata::new("Blank"));
        assert!(matches!(blank, Err(Error::InvalidAtomId(_))));
        assert!(blank.unwrap_err().is_validation());
    }

    #[test]
    fn test_concurrent_readers_see_whole_tensors() {
        let store = Arc::new(store_with("retinol"));
        let id = AtomId::from("retinol");
        store.set_tensor(&id, &tensor_map(0.2)).unwrap();
        let low = tensor_map(0.2);
        let high = tensor_map(0.8);

        std::thread::scope(|scope| {
            let writer_store = store.clone();
            let writer_id = id.clone();
            scope.spawn(move || {
                for i in 0..500 {
                    let values = if i % 2 == 0 { &high } else { &low };
                    writer_store.set_tensor(&writer_id, values).unwrap();
                }
            });

            for _ in 0..4 {
                let store = store.clone();
                let id = id.clone();
                scope.spawn(move || {
                    for _ in 0..2_000 {
                        let tensor = store.get_tensor(&id).unwrap();
                        let first = tensor.values()[0];
                        assert!(first == 0.2 || first == 0.8);
                        assert!(tensor.values().iter().all(|v| *v == first));
                    }
                });
            }
        });
    }

    #[test]
    fn test_tensor_replacement_is_wholesale() {
        let store = store_with("retinol");
        let id = AtomId::from("retinol");
        let old = store.set_tensor(&id, &tensor_map(0.2)).unwrap();
        let new = store.set_tensor(&id, &tensor_map(0.8)).unwrap();

        // A reader holding the old record still sees it intact
        assert!(old.values().iter().all(|v| *v == 0.2));
        assert!(new.values().iter().all(|v| *v == 0.8));
        assert!(new.revision() > old.revision());
    }

    #[test]
    fn test_identical_tensor_keeps_revision() {
        let store = store_with("retinol");
        let id = AtomId::from("retinol");
        let first = store.set_tensor(&id, &tensor_map(0.3)).unwrap();
        let second = store.set_tensor(&id, &tensor_map(0.3)).unwrap();
        assert_eq!(first.revision(), second.revision());
    }

    #[test]
    fn test_goldilocks_upsert_replaces_by_key() {
        let store = store_with("retinol");
        let id = AtomId::from("retinol");
        let all = concentration((0.25, 1.0), (0.0, 2.0), SkinType::All);
        store.upsert_goldilocks(&id, all).unwrap();
        store.upsert_goldilocks(&id, concentration((0.3, 1.0), (0.0, 2.0), SkinType::All)).unwrap();
        let sensitive = concentration((0.1, 0.3), (0.0, 0.5), SkinType::Sensitive);
        store.upsert_goldilocks(&id, sensitive).unwrap();

        let all = store.get_goldilocks(&id, None, None).unwrap();
        assert_eq!(all.len(), 2);

        let generic = store
            .get_goldilocks(&id, Some(ApplicationContext::Facial), Some(SkinType::All))
            .unwrap();
        assert_eq!(generic.len(), 1);
        assert_eq!(generic[0].opt_min, 0.3);
        assert_eq!(generic[0].name, CONCENTRATION);
    }

    #[test]
    fn test_goldilocks_invalid_range() {
        let store = store_with("retinol");
        let result = store.upsert_goldilocks(
            &"retinol".into(),
            concentration((50.0, 10.0), (0.0, 100.0), SkinType::All),
        );
        assert!(matches!(result, Err(Error::InvalidRange(_))));
        assert!(store.get_goldilocks(&"retinol".into(), None, None).unwrap().is_empty());
    }

    #[test]
    fn test_goldilocks_unknown_atom() {
        let store = AtomStore::default();
        assert!(matches!(
            store.get_goldilocks(&"ghost".into(), None, None),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_observers_follow_changes() {
        let store = store_with("retinol");
        let recorder = Arc::new(Recorder::default());
        store.subscribe(recorder.clone());

        let id = AtomId::from("retinol");
        let tensor = store.set_tensor(&id, &tensor_map(0.5)).unwrap();
        store.set_tensor(&id, &tensor_map(0.5)).unwrap();
        store.remove_atom(&id).unwrap();

        let events = recorder.events.lock().clone();
        assert_eq!(
            events,
            vec![format!("tensor:retinol:{}", tensor.revision()), "removed:retinol".to_string()]
        );
        assert!(matches!(store.get_tensor(&id), Err(Error::NotFound(_))));
    }
}
