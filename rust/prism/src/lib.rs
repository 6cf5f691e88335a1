//! # Prism: search result projections
//!
//! Prism turns the hits of a search query into application values. A query
//! produces matching documents scattered across the segments of one or more
//! indexes; a projection describes what the caller wants for each of them:
//! a field, the identifier, the score, a distance, highlighted fragments, the
//! entity the document was indexed from, or any composition of these.
//!
//! ## Module Organization
//!
//! * [`common`] - Errors and the dynamic value model
//! * [`index_core`] - Contracts of the index engine, the highlighter and the
//!   entity loader, plus index schemas
//! * [`projection`] - Projections, their validation against index schemas, and
//!   their execution over the hits of a query
//!
//! ## Example
//!
//! ```ignore
//! use prism::projection::{
//!     ExecutionOptions, ProjectionExecutor, ProjectionScope,
//!     projection::{CompositeProjection, FieldProjection, IdentifierProjection, ScoreProjection},
//! };
//!
//! let projection = CompositeProjection::builder()
//!     .add(IdentifierProjection::new())
//!     .add(ScoreProjection)
//!     .add(FieldProjection::list("authors.name"))
//!     .as_list();
//! let executor = ProjectionExecutor::prepare(
//!     &projection,
//!     ProjectionScope::from_readers(&readers)?,
//!     ExecutionOptions::default(),
//! )?;
//! let values = executor.execute_on_readers(&readers, &hits, loader)?;
//! ```

pub use prism_common as common;
pub use prism_index_core as index_core;
pub use prism_projection as projection;
