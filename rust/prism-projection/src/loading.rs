//! Planning and resolution of entity loads.
//!
//! The extraction phase must never call the entity loader: it only *plans* loads
//! through a [`LoadingPlan`], receiving an opaque [`LoadHandle`]. Once every
//! segment has been scanned, the plan is resolved with one batched call to the
//! [`EntityLoader`], producing [`LoadedEntities`] for the transform phase.

use std::sync::{Arc, Mutex};

use ahash::AHashMap;
use prism_common::{DocumentReference, Result, Value, error::Error};
use prism_index_core::EntityLoader;

/// Opaque handle of a planned entity load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadHandle(u32);

#[derive(Default)]
struct PlanState {
    references: Vec<DocumentReference>,
    handles: AHashMap<DocumentReference, LoadHandle>,
}

/// Collects the document references whose entities must be loaded.
///
/// Planning the same reference twice returns the same handle, so an entity
/// referenced by several projections is loaded once.
#[derive(Default)]
pub struct LoadingPlan {
    state: Mutex<PlanState>,
}

impl LoadingPlan {
    pub fn new() -> LoadingPlan {
        Default::default()
    }

    pub fn plan(&self, reference: DocumentReference) -> Result<LoadHandle> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::invalid_operation("loading plan lock poisoned"))?;
        if let Some(handle) = state.handles.get(&reference) {
            return Ok(*handle);
        }
        let handle = LoadHandle(u32::try_from(state.references.len()).map_err(|_| {
            Error::invalid_operation("too many planned entity loads")
        })?);
        state.references.push(reference.clone());
        state.handles.insert(reference, handle);
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.references.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves every planned load with one call to `loader`, leaving the plan
    /// empty.
    pub fn load(&self, loader: Arc<dyn EntityLoader>) -> Result<LoadedEntities> {
        let state = std::mem::take(
            &mut *self
                .state
                .lock()
                .map_err(|_| Error::invalid_operation("loading plan lock poisoned"))?,
        );
        let entities = if state.references.is_empty() {
            Vec::new()
        } else {
            loader.load(&state.references)?
        };
        if entities.len() != state.references.len() {
            return Err(Error::invalid_operation(format!(
                "entity loader returned {} entities for {} references",
                entities.len(),
                state.references.len()
            )));
        }
        Ok(LoadedEntities { entities, loader })
    }
}

/// Entities materialized by the loader, available to the transform phase.
pub struct LoadedEntities {
    entities: Vec<Option<Value>>,
    loader: Arc<dyn EntityLoader>,
}

impl LoadedEntities {
    /// Returns the entity loaded for `handle`, or `None` if it could not be
    /// materialized.
    pub fn get(&self, handle: LoadHandle) -> Option<&Value> {
        self.entities
            .get(handle.0 as usize)
            .and_then(|entity| entity.as_ref())
    }

    pub fn convert_reference(&self, reference: &DocumentReference) -> Result<Value> {
        self.loader.convert_reference(reference)
    }

    /// Number of planned loads that could not be materialized.
    pub fn failed_count(&self) -> usize {
        self.entities.iter().filter(|e| e.is_none()).count()
    }
}
