//! Concrete projections.
//!
//! A projection is a user-declared description of the data wanted for every hit.
//! Requesting it against a [`ProjectionRequestContext`] validates it against the
//! schemas of the targeted indexes, registers what it needs in the requirements
//! builder, and returns the [`ExtractorTree`] that will produce its values.

use std::sync::Arc;

use prism_common::{Result, error::Error};

use crate::{
    context::ProjectionRequestContext, extracted::Extracted, extractor::ExtractorTree,
    requirements::ExtractionRequirementsBuilder,
};

pub mod by_mapped_type;
pub mod composite;
pub mod constant;
pub mod dispatch;
pub mod distance;
pub mod entity;
pub mod field;
pub mod highlight;
pub mod identifier;
pub mod object;
pub mod root_context;
pub mod score;
pub mod stored_document;

pub use by_mapped_type::ByMappedTypeProjection;
pub use composite::{CompositeProjection, CompositeProjectionBuilder};
pub use constant::ConstantProjection;
pub use distance::{DistanceProjection, DistanceProjectionBuilder, DistanceUnit};
pub use entity::{DocumentReferenceProjection, EntityProjection, EntityReferenceProjection};
pub use field::{FieldProjection, FieldProjectionBuilder};
pub use highlight::{HighlightProjection, HighlightProjectionBuilder};
pub use identifier::IdentifierProjection;
pub use object::ObjectProjection;
pub use root_context::RootContextProjection;
pub use score::ScoreProjection;
pub use stored_document::StoredDocumentProjection;

pub trait SearchProjection: Send + Sync {
    fn request(
        &self,
        context: &ProjectionRequestContext,
        requirements: &mut ExtractionRequirementsBuilder,
    ) -> Result<ExtractorTree>;
}

impl<T: SearchProjection + ?Sized> SearchProjection for Arc<T> {
    fn request(
        &self,
        context: &ProjectionRequestContext,
        requirements: &mut ExtractionRequirementsBuilder,
    ) -> Result<ExtractorTree> {
        self.as_ref().request(context, requirements)
    }
}

impl<T: SearchProjection + ?Sized> SearchProjection for Box<T> {
    fn request(
        &self,
        context: &ProjectionRequestContext,
        requirements: &mut ExtractionRequirementsBuilder,
    ) -> Result<ExtractorTree> {
        self.as_ref().request(context, requirements)
    }
}

fn unexpected(extractor: &str, data: &Extracted) -> Error {
    Error::invalid_operation(format!("{extractor} cannot transform {data:?}"))
}
