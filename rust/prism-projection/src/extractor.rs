//! The two-phase extractor contract and the flattened extractor tree.

use std::{fmt, sync::Arc};

use log::debug;
use prism_common::{Result, Value, error::Error, verify_state};
use prism_index_core::DocId;

use crate::{
    context::{ExtractionContext, TransformContext},
    extracted::Extracted,
    loading::LoadedEntities,
    values::{SegmentContext, Values},
};

/// The request-time product of one projection.
///
/// Extraction and transformation are strictly separated: [`values`](Self::values)
/// cursors run while segments are scanned and must not call the entity loader;
/// [`transform`](Self::transform) runs once every segment has been scanned and
/// every planned load has been resolved.
pub trait Extractor: Send + Sync {
    fn values(&self, context: &ExtractionContext) -> Result<Box<dyn Values>>;

    /// Converts the data extracted for one hit into its final value.
    ///
    /// An entity that could not be loaded is reported through `context` and
    /// yields `Value::Null`; it is not an error.
    fn transform(
        &self,
        loaded: &LoadedEntities,
        data: Extracted,
        context: &mut TransformContext,
    ) -> Result<Value>;
}

/// Combines the transformed values of a composite's children into one value.
#[derive(Clone)]
pub struct Combiner(Arc<dyn Fn(Vec<Value>) -> Result<Value> + Send + Sync>);

impl Combiner {
    pub fn new(f: impl Fn(Vec<Value>) -> Result<Value> + Send + Sync + 'static) -> Combiner {
        Combiner(Arc::new(f))
    }

    /// Returns the values as a `Value::List`, in child order.
    pub fn list() -> Combiner {
        Combiner::new(|values| Ok(Value::List(values)))
    }

    pub fn apply(&self, values: Vec<Value>) -> Result<Value> {
        (self.0)(values)
    }
}

impl fmt::Debug for Combiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Combiner")
    }
}

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf(usize),
    Combine { arity: usize, combiner: Combiner },
}

/// A projection tree flattened at request time.
///
/// Leaves are the extractors that actually read segment data; composites are
/// represented by `Combine` nodes. Nodes are kept in post-order so that both
/// phases walk the tree iteratively: extraction produces one [`Extracted`] per
/// leaf, and transformation evaluates the nodes with a value stack.
#[derive(Clone)]
pub struct ExtractorTree {
    leaves: Vec<Arc<dyn Extractor>>,
    nodes: Vec<TreeNode>,
}

impl ExtractorTree {
    pub fn leaf(extractor: impl Extractor + 'static) -> ExtractorTree {
        ExtractorTree::from_arc(Arc::new(extractor))
    }

    pub fn from_arc(extractor: Arc<dyn Extractor>) -> ExtractorTree {
        ExtractorTree {
            leaves: vec![extractor],
            nodes: vec![TreeNode::Leaf(0)],
        }
    }

    /// Builds the tree of a composite whose children are `children`, in order.
    pub fn compose(children: Vec<ExtractorTree>, combiner: Combiner) -> ExtractorTree {
        let arity = children.len();
        let mut leaves = Vec::new();
        let mut nodes = Vec::new();
        for child in children {
            let offset = leaves.len();
            leaves.extend(child.leaves);
            nodes.extend(child.nodes.into_iter().map(|node| match node {
                TreeNode::Leaf(i) => TreeNode::Leaf(i + offset),
                combine => combine,
            }));
        }
        nodes.push(TreeNode::Combine { arity, combiner });
        ExtractorTree { leaves, nodes }
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    fn single_leaf(&self) -> Option<&Arc<dyn Extractor>> {
        match self.nodes.as_slice() {
            [TreeNode::Leaf(0)] => self.leaves.first(),
            _ => None,
        }
    }

    /// Creates one cursor per leaf.
    pub fn leaf_values(&self, context: &ExtractionContext) -> Result<Vec<Box<dyn Values>>> {
        self.leaves.iter().map(|leaf| leaf.values(context)).collect()
    }

    /// Transforms the per-leaf data of one hit, then evaluates the composites.
    pub fn transform_leaves(
        &self,
        loaded: &LoadedEntities,
        data: Vec<Extracted>,
        context: &mut TransformContext,
    ) -> Result<Value> {
        verify_state!(leaves, data.len() == self.leaves.len());
        let mut leaf_values = self
            .leaves
            .iter()
            .zip(data)
            .map(|(leaf, data)| leaf.transform(loaded, data, context).map(Some))
            .collect::<Result<Vec<_>>>()?;

        let mut stack: Vec<Value> = Vec::new();
        for node in &self.nodes {
            match node {
                TreeNode::Leaf(i) => {
                    let value = leaf_values
                        .get_mut(*i)
                        .and_then(Option::take)
                        .ok_or_else(|| Error::invalid_operation("leaf evaluated twice"))?;
                    stack.push(value);
                }
                TreeNode::Combine { arity, combiner } => {
                    let start = stack.len().checked_sub(*arity).ok_or_else(|| {
                        Error::invalid_operation("composite evaluated with missing children")
                    })?;
                    let children = stack.split_off(start);
                    stack.push(combiner.apply(children)?);
                }
            }
        }
        match (stack.pop(), stack.is_empty()) {
            (Some(value), true) => Ok(value),
            _ => Err(Error::invalid_operation("malformed extractor tree")),
        }
    }
}

impl Extractor for ExtractorTree {
    fn values(&self, context: &ExtractionContext) -> Result<Box<dyn Values>> {
        if let Some(leaf) = self.single_leaf() {
            return leaf.values(context);
        }
        debug!(
            "extractor tree: {} leaves, {} nodes",
            self.leaves.len(),
            self.nodes.len()
        );
        Ok(Box::new(TreeValues {
            leaves: self.leaf_values(context)?,
        }))
    }

    fn transform(
        &self,
        loaded: &LoadedEntities,
        data: Extracted,
        context: &mut TransformContext,
    ) -> Result<Value> {
        if let Some(leaf) = self.single_leaf() {
            return leaf.transform(loaded, data, context);
        }
        match data {
            Extracted::Leaves(leaves) => self.transform_leaves(loaded, leaves, context),
            other => Err(Error::invalid_operation(format!(
                "extractor tree cannot transform {other:?}"
            ))),
        }
    }
}

/// Drives the cursors of every leaf of a tree.
pub struct TreeValues {
    leaves: Vec<Box<dyn Values>>,
}

impl TreeValues {
    pub fn new(leaves: Vec<Box<dyn Values>>) -> TreeValues {
        TreeValues { leaves }
    }

    pub fn get_leaves(&mut self, doc: DocId) -> Result<Vec<Extracted>> {
        self.leaves.iter_mut().map(|leaf| leaf.get(doc)).collect()
    }
}

impl Values for TreeValues {
    fn context(&mut self, segment: &Arc<SegmentContext>) -> Result<()> {
        self.leaves
            .iter_mut()
            .try_for_each(|leaf| leaf.context(segment))
    }

    fn get(&mut self, doc: DocId) -> Result<Extracted> {
        Ok(Extracted::Leaves(self.get_leaves(doc)?))
    }
}
