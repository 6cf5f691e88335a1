//! Contexts threaded through the request, extraction and transform phases.

use std::sync::Arc;

use prism_common::{DocumentReference, Result, error::Error};
use prism_index_core::schema::is_same_or_ancestor;

use crate::{
    accumulator::Accumulator,
    loading::{LoadHandle, LoadingPlan},
    requirements::ExtractionRequirementsBuilder,
    scope::{ProjectionScope, ResolvedField},
    values::nested::NestedDocsProvider,
};

/// Position of a projection request within the object structure of the indexed
/// documents.
///
/// The context is immutable: [`for_field`](Self::for_field) and
/// [`root`](Self::root) return new contexts, so sibling projections never observe
/// each other's scoping.
#[derive(Debug, Clone)]
pub struct ProjectionRequestContext {
    scope: Arc<ProjectionScope>,
    /// Nearest enclosing object field, `None` at the root.
    current_field_path: Option<String>,
    /// Nearest enclosing nested object field, `None` outside nested objects.
    current_nested_field_path: Option<String>,
}

impl ProjectionRequestContext {
    pub fn new(scope: Arc<ProjectionScope>) -> ProjectionRequestContext {
        ProjectionRequestContext {
            scope,
            current_field_path: None,
            current_nested_field_path: None,
        }
    }

    pub fn scope(&self) -> &Arc<ProjectionScope> {
        &self.scope
    }

    pub fn current_field_path(&self) -> Option<&str> {
        self.current_field_path.as_deref()
    }

    pub fn current_nested_field_path(&self) -> Option<&str> {
        self.current_nested_field_path.as_deref()
    }

    pub fn is_root(&self) -> bool {
        self.current_field_path.is_none()
    }

    /// Returns a context reset to the document root.
    pub fn root(&self) -> ProjectionRequestContext {
        ProjectionRequestContext::new(self.scope.clone())
    }

    /// Returns a context scoped to the object field at `path`.
    pub fn for_field(&self, path: &str, nested: bool) -> ProjectionRequestContext {
        ProjectionRequestContext {
            scope: self.scope.clone(),
            current_field_path: Some(path.to_string()),
            current_nested_field_path: if nested {
                Some(path.to_string())
            } else {
                self.current_nested_field_path.clone()
            },
        }
    }

    /// Fails unless `path` lies strictly inside the current nested object.
    pub fn check_valid_field(&self, path: &str) -> Result<()> {
        match self.current_nested_field_path() {
            Some(nested) if nested == path || !is_same_or_ancestor(nested, path) => {
                Err(Error::invalid_nesting_context(
                    path,
                    &self.scope.index_names(),
                    format!("field is not inside the enclosing nested object '{nested}'"),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Fails if the context is inside an object field: projections of kind
    /// `kind` are only meaningful for root documents.
    pub fn check_not_nested(&self, kind: &str, hint: &str) -> Result<()> {
        match self.current_field_path() {
            Some(path) => Err(Error::invalid_nesting_context(
                path,
                &self.scope.index_names(),
                format!("{kind} projections cannot be used inside object '{path}'; {hint}"),
            )),
            None => Ok(()),
        }
    }

    /// Fails if a single-valued `accumulator` is bound to a field that may hold
    /// several values for one document of this context.
    pub fn check_cardinality(&self, field: &ResolvedField, accumulator: Accumulator) -> Result<()> {
        if accumulator.is_single_valued()
            && field.is_multi_valued_relative_to(self.current_field_path())
        {
            return Err(Error::invalid_nesting_context(
                field.path(),
                &field.index_names(),
                match self.current_field_path() {
                    Some(context) => format!(
                        "field is multi-valued relative to object '{context}', use a multi-valued accumulator"
                    ),
                    None => "field is multi-valued, use a multi-valued accumulator".to_string(),
                },
            ));
        }
        Ok(())
    }

    /// Returns the child document resolution needed to reach documents at
    /// `nested_path` from the documents of this context, and registers the
    /// nested objects requirement.
    ///
    /// Returns `None` when values live on the context documents themselves.
    pub fn nested_docs(
        &self,
        nested_path: Option<&str>,
        requirements: &mut ExtractionRequirementsBuilder,
    ) -> Option<NestedDocsProvider> {
        let nested_path = nested_path?;
        if self.current_nested_field_path() == Some(nested_path) {
            return None;
        }
        requirements.require_nested_objects([nested_path]);
        Some(NestedDocsProvider::new(
            self.scope.nested_lineage(self.current_nested_field_path()),
            nested_path,
        ))
    }
}

/// Shared state of the extraction phase.
///
/// Value cursors may only plan entity loads; loads are resolved once scanning is
/// over.
#[derive(Clone, Default)]
pub struct ExtractionContext {
    plan: Arc<LoadingPlan>,
}

impl ExtractionContext {
    pub fn new() -> ExtractionContext {
        Default::default()
    }

    pub fn plan_loading(&self, reference: DocumentReference) -> Result<LoadHandle> {
        self.plan.plan(reference)
    }

    pub fn loading_plan(&self) -> &Arc<LoadingPlan> {
        &self.plan
    }
}

/// Mutable state of the transform phase, reset between hit batches.
#[derive(Debug, Default)]
pub struct TransformContext {
    failed_load: bool,
}

impl TransformContext {
    pub fn new() -> TransformContext {
        Default::default()
    }

    /// Records that a referenced entity could not be loaded.
    pub fn report_failed_load(&mut self) {
        self.failed_load = true;
    }

    pub fn has_failed_load(&self) -> bool {
        self.failed_load
    }

    pub fn reset(&mut self) {
        self.failed_load = false;
    }
}

#[cfg(test)]
mod tests {
    use prism_common::error::ErrorKind;
    use prism_index_core::{
        IndexSchema,
        codec::StringCodec,
        schema::FieldDefinition,
    };

    use super::*;

    fn context() -> ProjectionRequestContext {
        let schema = IndexSchema::builder("library")
            .field(FieldDefinition::value("title", StringCodec).stored())
            .field(FieldDefinition::nested("authors").multi_valued())
            .field(FieldDefinition::value("authors.name", StringCodec).stored())
            .field(FieldDefinition::value("tags", StringCodec).multi_valued().stored())
            .build()
            .unwrap();
        ProjectionRequestContext::new(ProjectionScope::new([schema]).unwrap())
    }

    #[test]
    fn test_for_field_does_not_mutate_parent() {
        let root = context();
        let authors = root.for_field("authors", true);
        assert!(root.is_root());
        assert_eq!(authors.current_field_path(), Some("authors"));
        assert_eq!(authors.current_nested_field_path(), Some("authors"));
        assert!(authors.root().is_root());
    }

    #[test]
    fn test_check_valid_field() {
        let authors = context().for_field("authors", true);
        assert!(authors.check_valid_field("authors.name").is_ok());
        assert!(authors.check_valid_field("authors").is_err());
        assert!(authors.check_valid_field("authorship").is_err());
        let err = authors.check_valid_field("title").err().unwrap();
        assert!(matches!(err.kind(), ErrorKind::InvalidNestingContext { .. }));
        assert!(context().check_valid_field("title").is_ok());
    }

    #[test]
    fn test_check_not_nested() {
        let root = context();
        assert!(root.check_not_nested("identifier", "").is_ok());
        let err = root
            .for_field("authors", true)
            .check_not_nested("identifier", "wrap it in a root projection")
            .err()
            .unwrap();
        assert!(matches!(err.kind(), ErrorKind::InvalidNestingContext { .. }));
    }

    #[test]
    fn test_check_cardinality() {
        let root = context();
        let name = root.scope().resolve_field("authors.name").unwrap();
        assert!(root.check_cardinality(&name, Accumulator::Single).is_err());
        assert!(root.check_cardinality(&name, Accumulator::List).is_ok());
        let authors = root.for_field("authors", true);
        assert!(authors.check_cardinality(&name, Accumulator::Single).is_ok());

        let tags = root.scope().resolve_field("tags").unwrap();
        assert!(authors.check_cardinality(&tags, Accumulator::Optional).is_err());
    }

    #[test]
    fn test_transform_context_reset() {
        let mut context = TransformContext::new();
        assert!(!context.has_failed_load());
        context.report_failed_load();
        assert!(context.has_failed_load());
        context.reset();
        assert!(!context.has_failed_load());
    }
}
