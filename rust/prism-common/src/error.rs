use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Returns `true` for errors raised while building projections, before any
    /// segment has been scanned.
    pub fn is_structural(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::UnknownField { .. }
                | ErrorKind::TypeIncompatibility { .. }
                | ErrorKind::InvalidNestingContext { .. }
                | ErrorKind::CrossIndexSchemaConflict { .. }
                | ErrorKind::HighlighterIncompatible { .. }
                | ErrorKind::FieldNotProjectable { .. }
        )
    }

    pub fn unknown_field(path: impl Into<String>, indexes: &[impl AsRef<str>]) -> Error {
        Error(
            ErrorKind::UnknownField {
                path: path.into(),
                indexes: index_names(indexes),
            }
            .into(),
        )
    }

    pub fn type_incompatibility(
        path: impl Into<String>,
        indexes: &[impl AsRef<str>],
        message: impl Into<String>,
    ) -> Error {
        Error(
            ErrorKind::TypeIncompatibility {
                path: path.into(),
                indexes: index_names(indexes),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_nesting_context(
        path: impl Into<String>,
        indexes: &[impl AsRef<str>],
        message: impl Into<String>,
    ) -> Error {
        Error(
            ErrorKind::InvalidNestingContext {
                path: path.into(),
                indexes: index_names(indexes),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn cross_index_schema_conflict(
        path: impl Into<String>,
        indexes: &[impl AsRef<str>],
        message: impl Into<String>,
    ) -> Error {
        Error(
            ErrorKind::CrossIndexSchemaConflict {
                path: path.into(),
                indexes: index_names(indexes),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn highlighter_incompatible(
        path: impl Into<String>,
        indexes: &[impl AsRef<str>],
        message: impl Into<String>,
    ) -> Error {
        Error(
            ErrorKind::HighlighterIncompatible {
                path: path.into(),
                indexes: index_names(indexes),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn field_not_projectable(
        path: impl Into<String>,
        indexes: &[impl AsRef<str>],
        message: impl Into<String>,
    ) -> Error {
        Error(
            ErrorKind::FieldNotProjectable {
                path: path.into(),
                indexes: index_names(indexes),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn unresolved_mapped_type(type_name: impl Into<String>) -> Error {
        Error(
            ErrorKind::UnresolvedMappedType {
                type_name: type_name.into(),
            }
            .into(),
        )
    }

    pub fn conversion(context: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::Conversion {
                context: context.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn engine<E>(context: impl Into<String>, source: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error(
            ErrorKind::Engine {
                context: context.into(),
                source: Box::new(source),
            }
            .into(),
        )
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("unknown field '{path}' in indexes {indexes:?}")]
    UnknownField { path: String, indexes: Vec<String> },

    #[error("incompatible projection type for field '{path}' in indexes {indexes:?}: {message}")]
    TypeIncompatibility {
        path: String,
        indexes: Vec<String>,
        message: String,
    },

    #[error("invalid nesting context for '{path}' in indexes {indexes:?}: {message}")]
    InvalidNestingContext {
        path: String,
        indexes: Vec<String>,
        message: String,
    },

    #[error("conflicting configuration of field '{path}' across indexes {indexes:?}: {message}")]
    CrossIndexSchemaConflict {
        path: String,
        indexes: Vec<String>,
        message: String,
    },

    #[error("highlighter cannot be applied to field '{path}' in indexes {indexes:?}: {message}")]
    HighlighterIncompatible {
        path: String,
        indexes: Vec<String>,
        message: String,
    },

    #[error("field '{path}' in indexes {indexes:?} cannot be projected: {message}")]
    FieldNotProjectable {
        path: String,
        indexes: Vec<String>,
        message: String,
    },

    #[error("no projection registered for mapped type '{type_name}'")]
    UnresolvedMappedType { type_name: String },

    #[error("conversion failed for '{context}': {message}")]
    Conversion { context: String, message: String },

    #[error("index engine error: {context}")]
    Engine {
        context: String,
        source: StdErrorBoxed,
    },

    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(_: std::convert::Infallible) -> Self {
        Error::invalid_operation("conversion")
    }
}

fn index_names(indexes: &[impl AsRef<str>]) -> Vec<String> {
    let mut names = indexes
        .iter()
        .map(|name| name.as_ref().to_string())
        .collect::<Vec<_>>();
    names.sort();
    names.dedup();
    names
}
