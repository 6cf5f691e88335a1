//! Composition of several projections into one value.

use std::sync::Arc;

use prism_common::{Result, Value};

use super::SearchProjection;
use crate::{
    context::ProjectionRequestContext,
    extractor::{Combiner, ExtractorTree},
    requirements::ExtractionRequirementsBuilder,
};

/// Collects the children of a [`CompositeProjection`].
#[derive(Default)]
pub struct CompositeProjectionBuilder {
    children: Vec<Arc<dyn SearchProjection>>,
}

impl CompositeProjectionBuilder {
    pub fn new() -> CompositeProjectionBuilder {
        Default::default()
    }

    pub fn add(mut self, projection: impl SearchProjection + 'static) -> Self {
        self.children.push(Arc::new(projection));
        self
    }

    pub fn add_shared(mut self, projection: Arc<dyn SearchProjection>) -> Self {
        self.children.push(projection);
        self
    }

    /// Returns the children's values as a `Value::List`, in the order they were
    /// added.
    pub fn as_list(self) -> CompositeProjection {
        CompositeProjection {
            children: self.children,
            combiner: Combiner::list(),
        }
    }

    /// Combines the children's values, passed in the order they were added.
    pub fn combine(
        self,
        combiner: impl Fn(Vec<Value>) -> Result<Value> + Send + Sync + 'static,
    ) -> CompositeProjection {
        CompositeProjection {
            children: self.children,
            combiner: Combiner::new(combiner),
        }
    }
}

/// A fixed-arity composition of projections.
///
/// Each child keeps its position: its extracted data occupies its own slot, and
/// is replaced in place with the child's transformed value before the combiner
/// runs.
#[derive(Clone)]
pub struct CompositeProjection {
    children: Vec<Arc<dyn SearchProjection>>,
    combiner: Combiner,
}

impl CompositeProjection {
    pub fn builder() -> CompositeProjectionBuilder {
        CompositeProjectionBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl SearchProjection for CompositeProjection {
    fn request(
        &self,
        context: &ProjectionRequestContext,
        requirements: &mut ExtractionRequirementsBuilder,
    ) -> Result<ExtractorTree> {
        let children = self
            .children
            .iter()
            .map(|child| child.request(context, requirements))
            .collect::<Result<Vec<_>>>()?;
        Ok(ExtractorTree::compose(children, self.combiner.clone()))
    }
}
