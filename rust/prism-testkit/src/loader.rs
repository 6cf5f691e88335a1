use std::sync::atomic::{AtomicUsize, Ordering};

use ahash::AHashMap;
use prism_common::{DocumentReference, Result, Value};
use prism_index_core::EntityLoader;

/// An [`EntityLoader`] serving entities from a map.
///
/// References absent from the map are reported as failed loads. The number of
/// batched `load` calls is recorded so tests can check that loading is batched.
#[derive(Debug, Default)]
pub struct MapEntityLoader {
    entities: AHashMap<DocumentReference, Value>,
    load_calls: AtomicUsize,
    loaded_references: AtomicUsize,
}

impl MapEntityLoader {
    pub fn new() -> MapEntityLoader {
        Default::default()
    }

    pub fn with_entity(
        mut self,
        type_name: &str,
        id: &str,
        entity: impl Into<Value>,
    ) -> MapEntityLoader {
        self.insert(DocumentReference::new(type_name, id), entity.into());
        self
    }

    pub fn insert(&mut self, reference: DocumentReference, entity: Value) {
        self.entities.insert(reference, entity);
    }

    pub fn remove(&mut self, reference: &DocumentReference) -> Option<Value> {
        self.entities.remove(reference)
    }

    /// Number of `load` calls served so far.
    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::Relaxed)
    }

    /// Total number of references requested across all `load` calls.
    pub fn loaded_references(&self) -> usize {
        self.loaded_references.load(Ordering::Relaxed)
    }
}

impl EntityLoader for MapEntityLoader {
    fn load(&self, references: &[DocumentReference]) -> Result<Vec<Option<Value>>> {
        self.load_calls.fetch_add(1, Ordering::Relaxed);
        self.loaded_references
            .fetch_add(references.len(), Ordering::Relaxed);
        Ok(references
            .iter()
            .map(|reference| self.entities.get(reference).cloned())
            .collect())
    }

    fn convert_reference(&self, reference: &DocumentReference) -> Result<Value> {
        Ok(Value::String(reference.to_string()))
    }
}
