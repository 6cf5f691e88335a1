//! The set of indexes targeted by a query, and field resolution across them.

use std::sync::Arc;

use prism_common::{Result, error::Error, verify_arg};
use prism_index_core::{
    IndexReader, IndexSchema, SchemaFieldNode,
    schema::{FieldKind, parent_of},
};

/// The indexes a query runs against, sorted by name.
#[derive(Debug)]
pub struct ProjectionScope {
    indexes: Vec<Arc<IndexSchema>>,
}

impl ProjectionScope {
    /// Creates a scope over `schemas`.
    ///
    /// # Errors
    ///
    /// Fails if `schemas` is empty or names the same index twice.
    pub fn new(schemas: impl IntoIterator<Item = Arc<IndexSchema>>) -> Result<Arc<ProjectionScope>> {
        let mut indexes = schemas.into_iter().collect::<Vec<_>>();
        verify_arg!(schemas, !indexes.is_empty());
        indexes.sort_by(|a, b| a.name().cmp(b.name()));
        if let Some(pair) = indexes.windows(2).find(|pair| pair[0].name() == pair[1].name()) {
            return Err(Error::invalid_arg(
                "schemas",
                format!("index '{}' listed twice", pair[0].name()),
            ));
        }
        Ok(Arc::new(ProjectionScope { indexes }))
    }

    pub fn from_readers(readers: &[Arc<dyn IndexReader>]) -> Result<Arc<ProjectionScope>> {
        ProjectionScope::new(readers.iter().map(|reader| reader.schema().clone()))
    }

    pub fn indexes(&self) -> &[Arc<IndexSchema>] {
        &self.indexes
    }

    pub fn index(&self, name: &str) -> Option<&Arc<IndexSchema>> {
        self.indexes
            .binary_search_by(|schema| schema.name().cmp(name))
            .ok()
            .map(|i| &self.indexes[i])
    }

    pub fn index_names(&self) -> Vec<&str> {
        self.indexes.iter().map(|schema| schema.name()).collect()
    }

    pub fn is_single_index(&self) -> bool {
        self.indexes.len() == 1
    }

    /// Resolves `path` in every index of the scope.
    ///
    /// # Errors
    ///
    /// Fails with `UnknownField` if no index declares `path`, and with
    /// `CrossIndexSchemaConflict` if the indexes declaring it disagree on its kind
    /// or on its nested path.
    pub fn resolve_field(&self, path: &str) -> Result<ResolvedField> {
        let mut nodes = Vec::with_capacity(self.indexes.len());
        let mut missing = Vec::new();
        for schema in &self.indexes {
            match schema.field(path) {
                Some(node) => nodes.push((schema.clone(), node.clone())),
                None => missing.push(schema.name().to_string()),
            }
        }
        if nodes.is_empty() {
            return Err(Error::unknown_field(path, &missing));
        }
        let resolved = ResolvedField {
            path: path.to_string(),
            nodes,
            missing,
        };
        resolved.check_consistent_structure()?;
        Ok(resolved)
    }

    /// The nested object paths enclosing `path` (inclusive), deepest first, as
    /// declared in any index of the scope.
    pub fn nested_lineage(&self, path: Option<&str>) -> Vec<String> {
        let mut lineage: Vec<String> = Vec::new();
        let mut current = path;
        while let Some(p) = current {
            let nested = self.indexes.iter().any(|schema| {
                schema
                    .field(p)
                    .is_some_and(|node| node.is_nested_object())
            });
            if nested {
                lineage.push(p.to_string());
            }
            current = parent_of(p);
        }
        lineage
    }
}

/// A field path resolved across the indexes of a scope.
pub struct ResolvedField {
    path: String,
    /// The indexes declaring the field, in index name order.
    nodes: Vec<(Arc<IndexSchema>, Arc<SchemaFieldNode>)>,
    /// Names of the indexes that do not declare the field.
    missing: Vec<String>,
}

impl ResolvedField {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn nodes(&self) -> &[(Arc<IndexSchema>, Arc<SchemaFieldNode>)] {
        &self.nodes
    }

    /// Any of the resolved nodes; all of them share kind and nested path.
    pub fn node(&self) -> &Arc<SchemaFieldNode> {
        &self.nodes[0].1
    }

    pub fn index_names(&self) -> Vec<&str> {
        self.nodes.iter().map(|(schema, _)| schema.name()).collect()
    }

    pub fn missing_indexes(&self) -> &[String] {
        &self.missing
    }

    /// Whether some index of the scope does not declare the field.
    pub fn is_partial(&self) -> bool {
        !self.missing.is_empty()
    }

    pub fn kind(&self) -> FieldKind {
        self.node().kind()
    }

    pub fn nested_path(&self) -> Option<&str> {
        self.node().nested_path()
    }

    /// Whether the field may hold several values for one document of the object
    /// context at `context_path`, in any of the indexes.
    pub fn is_multi_valued_relative_to(&self, context_path: Option<&str>) -> bool {
        self.nodes
            .iter()
            .any(|(schema, node)| schema.is_multi_valued_relative_to(node, context_path))
    }

    /// Fails unless the field's codecs are compatible across indexes.
    pub fn check_compatible_codecs(&self) -> Result<()> {
        let mut codecs = self.nodes.iter().filter_map(|(_, node)| node.codec());
        if let Some(first) = codecs.next() {
            if let Some(other) = codecs.find(|codec| !first.is_compatible_with(codec.as_ref())) {
                return Err(self.conflict(format!(
                    "codec '{}' is incompatible with codec '{}'",
                    first.name(),
                    other.name()
                )));
            }
        }
        Ok(())
    }

    /// Fails unless the field's projection converters are compatible across
    /// indexes.
    pub fn check_compatible_converters(&self) -> Result<()> {
        let mut converters = self.nodes.iter().filter_map(|(_, node)| node.converter());
        if let Some(first) = converters.next() {
            if let Some(other) =
                converters.find(|converter| !first.is_compatible_with(converter.as_ref()))
            {
                return Err(self.conflict(format!(
                    "converter '{}' is incompatible with converter '{}'",
                    first.name(),
                    other.name()
                )));
            }
        }
        Ok(())
    }

    fn check_consistent_structure(&self) -> Result<()> {
        let first = self.node();
        for (_, node) in &self.nodes[1..] {
            if node.kind() != first.kind() {
                return Err(self.conflict(format!(
                    "declared as {:?} and as {:?}",
                    first.kind(),
                    node.kind()
                )));
            }
            if node.nested_path() != first.nested_path() {
                return Err(self.conflict(format!(
                    "nested under {:?} and under {:?}",
                    first.nested_path(),
                    node.nested_path()
                )));
            }
        }
        Ok(())
    }

    fn conflict(&self, message: String) -> Error {
        Error::cross_index_schema_conflict(&self.path, &self.index_names(), message)
    }
}

#[cfg(test)]
mod tests {
    use prism_common::error::ErrorKind;
    use prism_index_core::{
        codec::{I64Codec, StringCodec},
        schema::FieldDefinition,
    };

    use super::*;

    fn schema(name: &str, fields: Vec<FieldDefinition>) -> Arc<IndexSchema> {
        fields
            .into_iter()
            .fold(IndexSchema::builder(name), |builder, f| builder.field(f))
            .build()
            .unwrap()
    }

    #[test]
    fn test_unknown_field_lists_every_index() {
        let scope = ProjectionScope::new([
            schema("b", vec![FieldDefinition::value("title", StringCodec)]),
            schema("a", vec![FieldDefinition::value("title", StringCodec)]),
        ])
        .unwrap();
        assert_eq!(scope.index_names(), vec!["a", "b"]);
        let err = scope.resolve_field("isbn").err().unwrap();
        match err.kind() {
            ErrorKind::UnknownField { path, indexes } => {
                assert_eq!(path, "isbn");
                assert_eq!(indexes, &["a", "b"]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_partial_resolution() {
        let scope = ProjectionScope::new([
            schema("a", vec![FieldDefinition::value("title", StringCodec)]),
            schema("b", vec![FieldDefinition::value("isbn", StringCodec)]),
        ])
        .unwrap();
        let title = scope.resolve_field("title").unwrap();
        assert!(title.is_partial());
        assert_eq!(title.index_names(), vec!["a"]);
        assert_eq!(title.missing_indexes(), &["b".to_string()]);
    }

    #[test]
    fn test_incompatible_codecs_conflict() {
        let scope = ProjectionScope::new([
            schema("a", vec![FieldDefinition::value("year", StringCodec)]),
            schema("b", vec![FieldDefinition::value("year", I64Codec)]),
        ])
        .unwrap();
        let year = scope.resolve_field("year").unwrap();
        let err = year.check_compatible_codecs().err().unwrap();
        assert!(matches!(
            err.kind(),
            ErrorKind::CrossIndexSchemaConflict { .. }
        ));
    }

    #[test]
    fn test_structure_conflict() {
        let scope = ProjectionScope::new([
            schema(
                "a",
                vec![
                    FieldDefinition::nested("authors").multi_valued(),
                    FieldDefinition::value("authors.name", StringCodec),
                ],
            ),
            schema(
                "b",
                vec![
                    FieldDefinition::object("authors"),
                    FieldDefinition::value("authors.name", StringCodec),
                ],
            ),
        ])
        .unwrap();
        assert!(scope.resolve_field("authors").is_err());
        let err = scope.resolve_field("authors.name").err().unwrap();
        assert!(matches!(
            err.kind(),
            ErrorKind::CrossIndexSchemaConflict { .. }
        ));
    }

    #[test]
    fn test_nested_lineage() {
        let scope = ProjectionScope::new([schema(
            "a",
            vec![
                FieldDefinition::nested("authors").multi_valued(),
                FieldDefinition::object("authors.address"),
                FieldDefinition::nested("authors.books").multi_valued(),
            ],
        )])
        .unwrap();
        assert_eq!(
            scope.nested_lineage(Some("authors.books")),
            vec!["authors.books".to_string(), "authors".to_string()]
        );
        assert_eq!(
            scope.nested_lineage(Some("authors.address")),
            vec!["authors".to_string()]
        );
        assert!(scope.nested_lineage(None).is_empty());
    }
}
