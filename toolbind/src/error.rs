//! Registration and invocation errors.

use thiserror::Error;

use crate::config::ConfigError;
use crate::convert::{ConvertError, ConvertErrorKind};
use crate::scope::ScopeError;

/// Boxed error returned by callables and provider factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias for registration-time operations.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

/// Result alias for invocation-time operations.
pub type InvokeResult<T> = Result<T, InvokeError>;

/// Fatal errors raised while building tools. Nothing is registered when one
/// of these is returned.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The type has no caller-facing representation.
    #[error("unsupported argument type `{ty}` ({kind})")]
    UnsupportedType {
        /// Rendered type name.
        ty: String,
        /// Descriptor kind.
        kind: &'static str,
    },

    /// Map keys must be string-like.
    #[error("map keys must be strings, found `{ty}`")]
    NonStringMapKey {
        /// Rendered map type.
        ty: String,
    },

    /// Map values cannot be open values.
    #[error("map values cannot be dynamic, found `{ty}`")]
    DynamicMapValue {
        /// Rendered map type.
        ty: String,
    },

    /// Two fields or parameters resolve to the same name.
    #[error("`{owner}` exposes `{name}` more than once")]
    DuplicateField {
        /// Struct or tool owning the duplicate.
        owner: String,
        /// The duplicated name.
        name: String,
    },

    /// A parameter type failed to map.
    #[error("parameter `{parameter}` of `{tool}`: {source}")]
    Parameter {
        /// Tool being registered.
        tool: String,
        /// Offending parameter.
        parameter: String,
        /// Underlying failure.
        #[source]
        source: Box<RegistrationError>,
    },

    /// Variable-length tails cannot be bound from named arguments.
    #[error("tool `{tool}` is variadic")]
    Variadic {
        /// Tool being registered.
        tool: String,
    },

    /// At most two results are supported.
    #[error("tool `{tool}` returns {count} results, at most 2 are supported")]
    TooManyResults {
        /// Tool being registered.
        tool: String,
        /// Declared result count.
        count: usize,
    },

    /// With two results, the second must be the error.
    #[error("second result of tool `{tool}` must be an error")]
    SecondResultNotError {
        /// Tool being registered.
        tool: String,
    },

    /// The documentation provider has no entry for the callable.
    #[error("missing documentation for `{id}`")]
    MissingDocumentation {
        /// Fully qualified callable identifier.
        id: String,
    },

    /// Documented parameter names do not match the signature.
    #[error("tool `{tool}` documents {found} parameter names, expected {expected}")]
    ParameterNames {
        /// Tool being registered.
        tool: String,
        /// Number of names required.
        expected: usize,
        /// Number of names documented.
        found: usize,
    },

    /// A tool with this name already exists.
    #[error("tool `{name}` is already registered")]
    DuplicateTool {
        /// The duplicated name.
        name: String,
    },

    /// Registry configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RegistrationError {
    pub(crate) fn for_parameter(self, tool: &str, parameter: &str) -> Self {
        Self::Parameter {
            tool: tool.to_owned(),
            parameter: parameter.to_owned(),
            source: Box::new(self),
        }
    }
}

/// Flat classification of invocation failures.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// No tool with the requested name.
    NotFound,
    /// A required argument was absent.
    MissingArgument,
    /// An argument or struct key matched nothing.
    UnexpectedArgument,
    /// A value had the wrong shape.
    TypeMismatch,
    /// A fixed-length array had the wrong length.
    LengthMismatch,
    /// No scope provides an injected type.
    NoProvider,
    /// A provider factory failed.
    Provider,
    /// The callable returned an error.
    Execution,
    /// The callable's result could not be encoded.
    Output,
    /// A callable disagreed with its own signature.
    Internal,
}

/// Recoverable errors returned while dispatching a call.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// No tool with the requested name.
    #[error("tool `{name}` not found")]
    NotFound {
        /// Requested name.
        name: String,
    },

    /// A required argument was absent.
    #[error("missing argument: {name}")]
    MissingArgument {
        /// Parameter name.
        name: String,
    },

    /// An argument matched no parameter.
    #[error("unexpected argument: {name}")]
    UnexpectedArgument {
        /// Offending key.
        name: String,
    },

    /// An argument could not be converted to its parameter type.
    #[error("argument {parameter}: {source}")]
    Conversion {
        /// Parameter name.
        parameter: String,
        /// Underlying conversion failure.
        #[source]
        source: ConvertError,
    },

    /// No scope in the chain provides an injected type.
    #[error("no provider for type: {type_name}")]
    NoProvider {
        /// Requested type.
        type_name: &'static str,
    },

    /// A provider factory failed.
    #[error("provider for {type_name} failed: {source}")]
    Provider {
        /// Requested type.
        type_name: &'static str,
        /// Factory error.
        #[source]
        source: BoxError,
    },

    /// The callable's result could not be encoded as JSON.
    #[error("failed to encode tool output: {source}")]
    Output {
        /// Encoding error.
        #[from]
        source: serde_json::Error,
    },

    /// The callable returned an error.
    #[error("{source}")]
    Failed {
        /// Error returned by the callable.
        #[source]
        source: BoxError,
    },

    /// A callable disagreed with its own signature.
    #[error("internal binding error: {reason}")]
    Internal {
        /// What went wrong.
        reason: String,
    },
}

impl InvokeError {
    pub(crate) fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// Classifies the failure.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::MissingArgument { .. } => ErrorKind::MissingArgument,
            Self::UnexpectedArgument { .. } => ErrorKind::UnexpectedArgument,
            Self::Conversion { source, .. } => match source.kind() {
                ConvertErrorKind::TypeMismatch { .. } => ErrorKind::TypeMismatch,
                ConvertErrorKind::LengthMismatch { .. } => ErrorKind::LengthMismatch,
                ConvertErrorKind::UnexpectedArgument { .. } => ErrorKind::UnexpectedArgument,
            },
            Self::NoProvider { .. } => ErrorKind::NoProvider,
            Self::Provider { .. } => ErrorKind::Provider,
            Self::Failed { .. } => ErrorKind::Execution,
            Self::Output { .. } => ErrorKind::Output,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Returns `true` when the caller supplied bad input, as opposed to a
    /// failure inside the tool or its environment.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotFound
                | ErrorKind::MissingArgument
                | ErrorKind::UnexpectedArgument
                | ErrorKind::TypeMismatch
                | ErrorKind::LengthMismatch
        )
    }
}

impl From<ScopeError> for InvokeError {
    fn from(error: ScopeError) -> Self {
        match error {
            ScopeError::NoProvider { type_name } => Self::NoProvider { type_name },
            ScopeError::DuplicateProvider { type_name } => {
                Self::internal(format!("duplicate provider for {type_name}"))
            }
            ScopeError::Provider { type_name, source } => Self::Provider { type_name, source },
        }
    }
}
