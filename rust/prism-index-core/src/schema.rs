//! Per-index schema model consumed by projection builders.
//!
//! An [`IndexSchema`] is built once, before the first query, and is immutable
//! afterwards: projections only ever read [`SchemaFieldNode`]s through shared
//! `Arc`s, which makes them safe to use from concurrent queries.
//!
//! Field paths are absolute and dot-separated (`"authors.name"`). Every proper
//! prefix of a field path must be declared as an object field.

use std::{fmt, sync::Arc};

use ahash::AHashMap;
use prism_common::{Result, ValueType, error::Error};

use crate::{
    codec::FieldCodec,
    convert::{IdentityConverter, ProjectionConverter},
    highlighter::HighlighterType,
};

/// Distinguishes value fields from object fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Value,
    /// An object field; nested objects are indexed as separate child documents.
    Object { nested: bool },
}

/// Metadata of one field of one index.
pub struct SchemaFieldNode {
    path: String,
    kind: FieldKind,
    multi_valued: bool,
    /// The closest enclosing object field.
    parent_path: Option<String>,
    /// The closest enclosing nested object, or this field itself when it is a
    /// nested object.
    nested_path: Option<String>,
    stored: bool,
    doc_values: bool,
    codec: Option<Arc<dyn FieldCodec>>,
    converter: Option<Arc<dyn ProjectionConverter>>,
    highlighters: Vec<HighlighterType>,
}

impl SchemaFieldNode {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_object(&self) -> bool {
        matches!(self.kind, FieldKind::Object { .. })
    }

    pub fn is_nested_object(&self) -> bool {
        matches!(self.kind, FieldKind::Object { nested: true })
    }

    /// Whether the field itself holds several values (or objects) per owning
    /// document. Enclosing objects are not taken into account, see
    /// [`IndexSchema::is_multi_valued_relative_to`].
    pub fn is_multi_valued(&self) -> bool {
        self.multi_valued
    }

    pub fn parent_path(&self) -> Option<&str> {
        self.parent_path.as_deref()
    }

    pub fn nested_path(&self) -> Option<&str> {
        self.nested_path.as_deref()
    }

    pub fn is_stored(&self) -> bool {
        self.stored
    }

    pub fn has_doc_values(&self) -> bool {
        self.doc_values
    }

    /// The native codec of a value field; `None` for object fields.
    pub fn codec(&self) -> Option<&Arc<dyn FieldCodec>> {
        self.codec.as_ref()
    }

    /// The projection converter of a value field; `None` for object fields.
    pub fn converter(&self) -> Option<&Arc<dyn ProjectionConverter>> {
        self.converter.as_ref()
    }

    pub fn highlighters(&self) -> &[HighlighterType] {
        &self.highlighters
    }

    pub fn supports_highlighter(&self, highlighter_type: HighlighterType) -> bool {
        self.highlighters.contains(&highlighter_type)
    }
}

impl fmt::Debug for SchemaFieldNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaFieldNode")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("multi_valued", &self.multi_valued)
            .field("nested_path", &self.nested_path)
            .field("stored", &self.stored)
            .field("doc_values", &self.doc_values)
            .field("codec", &self.codec.as_ref().map(|c| c.name().to_string()))
            .finish()
    }
}

/// The schema of one index.
pub struct IndexSchema {
    name: String,
    fields: AHashMap<String, Arc<SchemaFieldNode>>,
    identifier_converter: Arc<dyn ProjectionConverter>,
    mapped_types: Vec<String>,
}

impl IndexSchema {
    pub fn builder(name: impl Into<String>) -> IndexSchemaBuilder {
        IndexSchemaBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self, path: &str) -> Option<&Arc<SchemaFieldNode>> {
        self.fields.get(path)
    }

    pub fn fields(&self) -> impl Iterator<Item = &Arc<SchemaFieldNode>> {
        self.fields.values()
    }

    /// Converter applied to document identifiers by identifier projections.
    pub fn identifier_converter(&self) -> &Arc<dyn ProjectionConverter> {
        &self.identifier_converter
    }

    /// Names of the mapped types whose documents live in this index.
    pub fn mapped_types(&self) -> &[String] {
        &self.mapped_types
    }

    /// Returns `true` if `node` may hold several values for one document of the
    /// object context at `context_path` (`None` for the root).
    ///
    /// A field is multi-valued relative to a context if it is multi-valued itself,
    /// or if any object between the context (exclusive) and the field is.
    pub fn is_multi_valued_relative_to(
        &self,
        node: &SchemaFieldNode,
        context_path: Option<&str>,
    ) -> bool {
        if node.multi_valued {
            return true;
        }
        let mut parent = node.parent_path();
        while let Some(path) = parent {
            if context_path.is_some_and(|ctx| is_same_or_ancestor(path, ctx)) {
                break;
            }
            match self.fields.get(path) {
                Some(object) if object.multi_valued => return true,
                Some(object) => parent = object.parent_path(),
                None => break,
            }
        }
        false
    }
}

impl fmt::Debug for IndexSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexSchema")
            .field("name", &self.name)
            .field("fields", &self.fields.len())
            .field("mapped_types", &self.mapped_types)
            .finish()
    }
}

/// Returns `true` if `path` equals `other` or is one of its ancestors.
pub fn is_same_or_ancestor(path: &str, other: &str) -> bool {
    other == path
        || (other.len() > path.len()
            && other.starts_with(path)
            && other.as_bytes()[path.len()] == b'.')
}

/// Returns the parent path of a dot-separated field path.
pub fn parent_of(path: &str) -> Option<&str> {
    path.rfind('.').map(|i| &path[..i])
}

/// Declaration of one field, consumed by [`IndexSchemaBuilder`].
pub struct FieldDefinition {
    path: String,
    kind: FieldKind,
    multi_valued: bool,
    stored: bool,
    doc_values: bool,
    codec: Option<Arc<dyn FieldCodec>>,
    converter: Option<Arc<dyn ProjectionConverter>>,
    highlighters: Vec<HighlighterType>,
}

impl FieldDefinition {
    /// Declares a value field decoded by `codec`. Projections return native values
    /// unless a converter is set with [`converter`](Self::converter).
    pub fn value(path: impl Into<String>, codec: impl FieldCodec) -> FieldDefinition {
        FieldDefinition {
            path: path.into(),
            kind: FieldKind::Value,
            multi_valued: false,
            stored: false,
            doc_values: false,
            codec: Some(Arc::new(codec)),
            converter: None,
            highlighters: Vec::new(),
        }
    }

    /// Declares a flattened (non-nested) object field.
    pub fn object(path: impl Into<String>) -> FieldDefinition {
        FieldDefinition {
            path: path.into(),
            kind: FieldKind::Object { nested: false },
            multi_valued: false,
            stored: false,
            doc_values: false,
            codec: None,
            converter: None,
            highlighters: Vec::new(),
        }
    }

    /// Declares a nested object field, indexed as separate child documents.
    pub fn nested(path: impl Into<String>) -> FieldDefinition {
        FieldDefinition {
            kind: FieldKind::Object { nested: true },
            ..FieldDefinition::object(path)
        }
    }

    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    pub fn stored(mut self) -> Self {
        self.stored = true;
        self
    }

    pub fn doc_values(mut self) -> Self {
        self.doc_values = true;
        self
    }

    pub fn converter(mut self, converter: impl ProjectionConverter) -> Self {
        self.converter = Some(Arc::new(converter));
        self
    }

    pub fn highlighters(mut self, types: impl IntoIterator<Item = HighlighterType>) -> Self {
        self.highlighters = types.into_iter().collect();
        self
    }
}

/// Builds an immutable [`IndexSchema`].
pub struct IndexSchemaBuilder {
    name: String,
    definitions: Vec<FieldDefinition>,
    identifier_converter: Arc<dyn ProjectionConverter>,
    mapped_types: Vec<String>,
}

impl IndexSchemaBuilder {
    pub fn new(name: impl Into<String>) -> IndexSchemaBuilder {
        IndexSchemaBuilder {
            name: name.into(),
            definitions: Vec::new(),
            identifier_converter: Arc::new(IdentityConverter(ValueType::String)),
            mapped_types: Vec::new(),
        }
    }

    pub fn field(mut self, definition: FieldDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn identifier_converter(mut self, converter: impl ProjectionConverter) -> Self {
        self.identifier_converter = Arc::new(converter);
        self
    }

    pub fn mapped_type(mut self, name: impl Into<String>) -> Self {
        self.mapped_types.push(name.into());
        self
    }

    /// Resolves parent and nested paths and publishes the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if a path is declared twice, or if a proper prefix of a
    /// field path is not declared as an object field.
    pub fn build(self) -> Result<Arc<IndexSchema>> {
        let mut kinds = AHashMap::with_capacity(self.definitions.len());
        for definition in &self.definitions {
            if kinds
                .insert(definition.path.clone(), definition.kind)
                .is_some()
            {
                return Err(Error::invalid_arg(
                    "path",
                    format!("field '{}' declared twice in '{}'", definition.path, self.name),
                ));
            }
        }

        let mut fields = AHashMap::with_capacity(self.definitions.len());
        for definition in self.definitions {
            let parent_path = parent_of(&definition.path).map(str::to_string);
            if let Some(parent) = &parent_path {
                if !matches!(kinds.get(parent.as_str()), Some(FieldKind::Object { .. })) {
                    return Err(Error::invalid_arg(
                        "path",
                        format!(
                            "parent '{parent}' of field '{}' is not an object field",
                            definition.path
                        ),
                    ));
                }
            }

            let nested_path = if definition.kind == (FieldKind::Object { nested: true }) {
                Some(definition.path.clone())
            } else {
                let mut ancestor = parent_path.as_deref();
                loop {
                    match ancestor {
                        Some(path) if kinds.get(path) == Some(&(FieldKind::Object { nested: true })) => {
                            break Some(path.to_string());
                        }
                        Some(path) => ancestor = parent_of(path),
                        None => break None,
                    }
                }
            };

            let node = SchemaFieldNode {
                path: definition.path.clone(),
                kind: definition.kind,
                multi_valued: definition.multi_valued,
                parent_path,
                nested_path,
                stored: definition.stored,
                doc_values: definition.doc_values,
                converter: definition.converter.or_else(|| {
                    definition.codec.as_ref().map(|codec| {
                        Arc::new(IdentityConverter(codec.value_type()))
                            as Arc<dyn ProjectionConverter>
                    })
                }),
                codec: definition.codec,
                highlighters: definition.highlighters,
            };
            fields.insert(definition.path, Arc::new(node));
        }

        Ok(Arc::new(IndexSchema {
            name: self.name,
            fields,
            identifier_converter: self.identifier_converter,
            mapped_types: self.mapped_types,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::StringCodec;

    fn library_schema() -> Arc<IndexSchema> {
        IndexSchema::builder("library")
            .field(FieldDefinition::value("title", StringCodec).stored())
            .field(FieldDefinition::nested("authors").multi_valued())
            .field(FieldDefinition::value("authors.name", StringCodec).stored())
            .field(FieldDefinition::object("authors.address"))
            .field(FieldDefinition::value("authors.address.city", StringCodec).stored())
            .build()
            .unwrap()
    }

    #[test]
    fn test_nested_paths_resolved() {
        let schema = library_schema();
        assert_eq!(schema.field("title").unwrap().nested_path(), None);
        assert_eq!(
            schema.field("authors").unwrap().nested_path(),
            Some("authors")
        );
        assert_eq!(
            schema.field("authors.address.city").unwrap().nested_path(),
            Some("authors")
        );
        assert_eq!(
            schema.field("authors.address.city").unwrap().parent_path(),
            Some("authors.address")
        );
    }

    #[test]
    fn test_multi_valued_relative_to_context() {
        let schema = library_schema();
        let name = schema.field("authors.name").unwrap();
        assert!(!name.is_multi_valued());
        assert!(schema.is_multi_valued_relative_to(name, None));
        assert!(!schema.is_multi_valued_relative_to(name, Some("authors")));

        let city = schema.field("authors.address.city").unwrap();
        assert!(!schema.is_multi_valued_relative_to(city, Some("authors")));
        assert!(!schema.is_multi_valued_relative_to(city, Some("authors.address")));
        assert!(schema.is_multi_valued_relative_to(city, None));
    }

    #[test]
    fn test_undeclared_parent_is_rejected() {
        let result = IndexSchema::builder("broken")
            .field(FieldDefinition::value("a.b", StringCodec))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_path_helpers() {
        assert!(is_same_or_ancestor("a", "a.b"));
        assert!(is_same_or_ancestor("a.b", "a.b"));
        assert!(!is_same_or_ancestor("a", "ab.c"));
        assert_eq!(parent_of("a.b.c"), Some("a.b"));
        assert_eq!(parent_of("a"), None);
    }
}
