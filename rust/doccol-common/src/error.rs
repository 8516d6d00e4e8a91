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

    /// Returns `true` for mistakes in the caller-supplied configuration (type specs,
    /// field lists, orderings, pipelines, namespaces). These are always detected
    /// before any I/O is attempted.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidTypeSpec { .. }
                | ErrorKind::TooManyColumns { .. }
                | ErrorKind::FieldNameTooLong { .. }
                | ErrorKind::InvalidFieldName { .. }
                | ErrorKind::DuplicateField { .. }
                | ErrorKind::ConflictingNestedField { .. }
                | ErrorKind::NestingTooDeep { .. }
                | ErrorKind::InvalidOrdering { .. }
                | ErrorKind::InvalidPipelineShape { .. }
                | ErrorKind::InvalidNamespace { .. }
                | ErrorKind::InvalidArgument { .. }
                | ErrorKind::InvalidConfig { .. }
        )
    }

    /// Returns `true` if the error was raised by the document-database driver
    /// (network, authentication or server-side failure).
    pub fn is_connection(&self) -> bool {
        matches!(self.kind(), ErrorKind::Connection { .. })
    }

    pub fn invalid_type_spec(spec: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidTypeSpec {
                spec: spec.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_field_name(field: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidFieldName {
                field: field.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_ordering(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidOrdering {
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_pipeline(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidPipelineShape {
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_namespace(ns: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidNamespace {
                ns: ns.into(),
                message: message.into(),
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

    pub fn invalid_config(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidConfig {
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    pub fn invalid_document(context: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidDocument {
                context: context.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn missing_identifier(row: usize) -> Error {
        Error(ErrorKind::MissingIdentifier { row }.into())
    }

    pub fn connection<E>(context: impl Into<String>, source: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error(
            ErrorKind::Connection {
                context: context.into(),
                source: Box::new(source),
            }
            .into(),
        )
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid type spec '{spec}': {message}")]
    InvalidTypeSpec { spec: String, message: String },

    #[error("number of fields ({count}) exceeds maximum of {max}")]
    TooManyColumns { count: usize, max: usize },

    #[error("field name of length {len} exceeds maximum of {max}")]
    FieldNameTooLong { len: usize, max: usize },

    #[error("invalid field name '{field}': {message}")]
    InvalidFieldName { field: String, message: String },

    #[error("duplicate field '{field}'")]
    DuplicateField { field: String },

    #[error("field '{field}' conflicts with nested field '{nested}'")]
    ConflictingNestedField { field: String, nested: String },

    #[error("field '{field}' exceeds max nested document level ({max})")]
    NestingTooDeep { field: String, max: usize },

    #[error("invalid ordering: {message}")]
    InvalidOrdering { message: String },

    #[error("invalid pipeline shape: {message}")]
    InvalidPipelineShape { message: String },

    #[error("invalid namespace '{ns}': {message}")]
    InvalidNamespace { ns: String, message: String },

    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("invalid document ({context}): {message}")]
    InvalidDocument { context: String, message: String },

    #[error("identifier is masked at row {row}")]
    MissingIdentifier { row: usize },

    #[error("connection error: {context}: {source}")]
    Connection {
        context: String,
        source: StdErrorBoxed,
    },

    #[error("IO error for '{context}': {source}'")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(_: std::convert::Infallible) -> Self {
        Error::invalid_operation("conversion")
    }
}
