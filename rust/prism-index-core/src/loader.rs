//! Entity-loading collaborator contract.

use prism_common::{DocumentReference, Result, Value};

/// Materializes entities referenced by search hits from the primary data store.
///
/// Loading happens after every segment has been scanned, in one batched call; it
/// may block. A `None` entry means the entity could not be materialized (for
/// instance because it was deleted after being indexed), which is not an error.
pub trait EntityLoader: Send + Sync {
    /// Loads the entities for `references`. The returned vector must have the
    /// same length and order as `references`.
    fn load(&self, references: &[DocumentReference]) -> Result<Vec<Option<Value>>>;

    /// Converts a document reference into the caller-facing entity reference type.
    fn convert_reference(&self, reference: &DocumentReference) -> Result<Value>;
}
