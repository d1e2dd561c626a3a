//! Error types for SQLSession Rust.
//!
//! Two layers of errors exist:
//!
//! - [`Error`] is the detailed taxonomy produced while reading and resolving a
//!   configuration document (I/O, encoding, syntax, unknown settings, missing
//!   environments and so on).
//! - [`BuildError`] is the single error surfaced by the session factory
//!   builder. It wraps whatever went wrong underneath, keeps it reachable via
//!   [`std::error::Error::source`], and carries a snapshot of the diagnostic
//!   [`ErrorContext`](crate::ErrorContext) taken at the failure point.

use std::error::Error as StdError;
use std::fmt;

use crate::error_context::ErrorContext;

/// Errors raised while reading or resolving a configuration document.
#[derive(Debug)]
pub enum Error {
    /// Reading from the configuration stream failed.
    Io(std::io::Error),
    /// The configuration stream was not valid UTF-8.
    Encoding(std::string::FromUtf8Error),
    /// The configuration document is malformed.
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
    /// A `settings` entry names a setting that does not exist.
    UnknownSetting(String),
    /// A `settings` entry has a value that cannot be converted.
    InvalidSetting {
        name: String,
        value: String,
        expected: &'static str,
    },
    /// Environments are declared but none was selected.
    NoEnvironment,
    /// The selected environment id is not declared.
    UnknownEnvironment(String),
    /// The environment has no `transactionManager` block.
    MissingTransactionManager(String),
    /// The environment has no `dataSource` block.
    MissingDataSource(String),
    /// Any other failure, described by a message.
    Custom(String),
}

impl Error {
    /// Create a custom error from a message.
    pub fn custom(message: impl Into<String>) -> Self {
        Error::Custom(message.into())
    }

    /// Whether the error came from the underlying stream rather than the document.
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Encoding(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "failed to read configuration: {}", err),
            Error::Encoding(err) => write!(f, "configuration is not valid UTF-8: {}", err),
            Error::Syntax {
                line,
                column,
                message,
            } => write!(
                f,
                "malformed configuration at line {}, column {}: {}",
                line, column, message
            ),
            Error::UnknownSetting(name) => write!(
                f,
                "the setting '{}' is not known; make sure you spelled it correctly (case sensitive)",
                name
            ),
            Error::InvalidSetting {
                name,
                value,
                expected,
            } => write!(
                f,
                "invalid value '{}' for setting '{}': expected {}",
                value, name, expected
            ),
            Error::NoEnvironment => write!(f, "no environment specified"),
            Error::UnknownEnvironment(id) => write!(f, "environment '{}' is not declared", id),
            Error::MissingTransactionManager(id) => write!(
                f,
                "environment '{}' requires a transactionManager declaration",
                id
            ),
            Error::MissingDataSource(id) => {
                write!(f, "environment '{}' requires a dataSource declaration", id)
            }
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Encoding(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::Encoding(err)
    }
}

/// Result alias used across the workspace.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The one error kind returned by the session factory builder.
#[derive(Debug)]
pub struct BuildError {
    message: &'static str,
    context: ErrorContext,
    cause: Box<dyn StdError + Send + Sync + 'static>,
}

impl BuildError {
    /// Fixed prefix of every build failure message.
    pub const MESSAGE: &'static str = "Error building session factory";

    /// Wrap a failure, capturing the calling thread's diagnostic context.
    ///
    /// Must be called before the context is reset, otherwise the snapshot is empty.
    pub fn wrap(cause: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        let cause = cause.into();
        let mut context = ErrorContext::snapshot();
        context.set_cause(cause.to_string());
        Self {
            message: Self::MESSAGE,
            context,
            cause,
        }
    }

    /// The fixed human-readable message.
    pub fn message(&self) -> &str {
        self.message
    }

    /// Diagnostic context captured when the failure was wrapped.
    pub fn context(&self) -> &ErrorContext {
        &self.context
    }

    /// The underlying failure.
    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.cause.as_ref()
    }

    /// Downcast the underlying failure to a concrete type.
    pub fn cause_as<E: StdError + 'static>(&self) -> Option<&E> {
        self.cause.downcast_ref::<E>()
    }

    /// Consume the error and return the underlying failure.
    pub fn into_cause(self) -> Box<dyn StdError + Send + Sync + 'static> {
        self.cause
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        write!(f, "{}", self.context)
    }
}

impl StdError for BuildError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.cause.as_ref())
    }
}

impl From<Error> for BuildError {
    fn from(err: Error) -> Self {
        BuildError::wrap(err)
    }
}
