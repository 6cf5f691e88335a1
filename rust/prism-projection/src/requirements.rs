//! Aggregation of the low-level computations needed by the projections of one
//! query.
//!
//! Every projection registers what it needs while it is requested. Requirements
//! are kept in a set keyed by their identity, so any number of projections
//! needing the same stored field or the same collector produce exactly one entry,
//! and thus one physical read or one collector.

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use prism_index_core::StoredFieldFilter;

use crate::collector::{CollectorFactory, CollectorKey, ScoreCollectorFactory};

/// One deduplicable per-hit computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExtractionRequirement {
    Score,
    StoredField {
        path: String,
        nested_path: Option<String>,
    },
    AllStoredFields,
    NestedObjects {
        path: String,
    },
    Collector(CollectorKey),
}

/// Mutable set of requirements, threaded through the request phase of one query.
#[derive(Default)]
pub struct ExtractionRequirementsBuilder {
    seen: AHashSet<ExtractionRequirement>,
    ordered: Vec<ExtractionRequirement>,
    factories: AHashMap<CollectorKey, Arc<dyn CollectorFactory>>,
}

impl ExtractionRequirementsBuilder {
    pub fn new() -> ExtractionRequirementsBuilder {
        Default::default()
    }

    pub fn require_score(&mut self) {
        self.insert(ExtractionRequirement::Score);
    }

    pub fn require_stored_field(&mut self, path: &str, nested_path: Option<&str>) {
        self.insert(ExtractionRequirement::StoredField {
            path: path.to_string(),
            nested_path: nested_path.map(str::to_string),
        });
    }

    pub fn require_all_stored_fields(&mut self) {
        self.insert(ExtractionRequirement::AllStoredFields);
    }

    pub fn require_nested_objects<'a>(&mut self, paths: impl IntoIterator<Item = &'a str>) {
        for path in paths {
            self.insert(ExtractionRequirement::NestedObjects {
                path: path.to_string(),
            });
        }
    }

    pub fn require_collector(&mut self, factory: Arc<dyn CollectorFactory>) {
        let key = factory.key();
        if self.insert(ExtractionRequirement::Collector(key.clone())) {
            self.factories.insert(key, factory);
        }
    }

    fn insert(&mut self, requirement: ExtractionRequirement) -> bool {
        if self.seen.contains(&requirement) {
            return false;
        }
        self.seen.insert(requirement.clone());
        self.ordered.push(requirement);
        true
    }

    pub fn build(self) -> ExtractionRequirements {
        let mut factories = Vec::with_capacity(self.factories.len() + 1);
        if self.seen.contains(&ExtractionRequirement::Score) {
            factories.push(Arc::new(ScoreCollectorFactory) as Arc<dyn CollectorFactory>);
        }
        let mut by_key = self.factories;
        for requirement in &self.ordered {
            if let ExtractionRequirement::Collector(key) = requirement {
                if let Some(factory) = by_key.remove(key) {
                    factories.push(factory);
                }
            }
        }
        ExtractionRequirements {
            requirements: self.ordered,
            factories,
        }
    }
}

/// The immutable, aggregated requirements of one query, handed to the executor
/// before segment iteration starts.
pub struct ExtractionRequirements {
    requirements: Vec<ExtractionRequirement>,
    factories: Vec<Arc<dyn CollectorFactory>>,
}

impl ExtractionRequirements {
    /// The distinct requirements, in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, ExtractionRequirement> {
        self.requirements.iter()
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn requires_score(&self) -> bool {
        self.requirements.contains(&ExtractionRequirement::Score)
    }

    pub fn stored_field_count(&self) -> usize {
        self.requirements
            .iter()
            .filter(|r| matches!(r, ExtractionRequirement::StoredField { .. }))
            .count()
    }

    /// The stored fields the engine must decode when loading a stored document.
    pub fn stored_field_filter(&self) -> StoredFieldFilter {
        if self.requirements.contains(&ExtractionRequirement::AllStoredFields) {
            return StoredFieldFilter::All;
        }
        let paths = self
            .requirements
            .iter()
            .filter_map(|r| match r {
                ExtractionRequirement::StoredField { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect::<AHashSet<_>>();
        StoredFieldFilter::Fields(Arc::new(paths))
    }

    /// One factory per distinct collector; the score collector comes first when
    /// scores are required.
    pub fn collector_factories(&self) -> &[Arc<dyn CollectorFactory>] {
        &self.factories
    }
}
