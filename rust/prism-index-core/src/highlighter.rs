//! Highlighter collaborator contract.

use prism_common::Result;

/// The highlighting algorithms a field may declare support for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HighlighterType {
    Plain,
    Unified,
    FastVector,
}

/// Computes highlighted fragments for the text of one field occurrence.
///
/// A highlighter is bound to the query being executed; fragment selection and
/// markup are entirely up to the implementation.
pub trait Highlighter: Send + Sync {
    fn highlighter_type(&self) -> HighlighterType;

    /// Maximum number of fragments returned per field occurrence, or `None` when
    /// unbounded.
    fn max_fragments(&self) -> Option<usize>;

    /// Returns the highlighted fragments of `text`, an occurrence of the field at
    /// `path`. An empty result means nothing matched.
    fn fragments(&self, path: &str, text: &str) -> Result<Vec<String>>;
}
