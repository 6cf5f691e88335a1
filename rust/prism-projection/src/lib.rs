//! The prism result projection pipeline.
//!
//! A projection describes the data wanted for every hit of a search query: a
//! field, the identifier, the score, a distance, highlighted fragments, the
//! loaded entity, or any composition of these.
//!
//! # Phases
//!
//! - **Request**: [`SearchProjection::request`] validates the projection against
//!   the schemas of the targeted indexes (a [`ProjectionScope`]), registers its
//!   low-level needs in an [`ExtractionRequirementsBuilder`] and returns an
//!   [`ExtractorTree`]. All structural errors surface here, before any segment
//!   is scanned.
//! - **Extraction**: while segments are scanned, one [`Values`] cursor per tree
//!   is rebound to each segment and queried for every hit. Cursors only read
//!   index data; entity loads are merely planned.
//! - **Loading**: planned loads are resolved with one batched call to the
//!   [`EntityLoader`](prism_index_core::EntityLoader).
//! - **Transform**: [`Extractor::transform`] turns the extracted data of each hit
//!   into its final [`Value`](prism_common::Value).
//!
//! [`ProjectionExecutor`] drives the four phases over a list of hits.

pub mod accumulator;
pub mod collector;
pub mod context;
pub mod execution;
pub mod extracted;
pub mod extractor;
pub mod loading;
pub mod projection;
pub mod requirements;
pub mod scope;
pub mod values;

#[cfg(test)]
mod tests;

pub use accumulator::{Accumulated, Accumulator};
pub use context::{ExtractionContext, ProjectionRequestContext, TransformContext};
pub use execution::{ExecutionOptions, ProjectedHits, ProjectionExecutor};
pub use extracted::Extracted;
pub use extractor::{Combiner, Extractor, ExtractorTree};
pub use loading::{LoadHandle, LoadedEntities, LoadingPlan};
pub use projection::SearchProjection;
pub use requirements::{ExtractionRequirement, ExtractionRequirements, ExtractionRequirementsBuilder};
pub use scope::{ProjectionScope, ResolvedField};
pub use values::{SegmentContext, Values};
