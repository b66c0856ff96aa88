use backtrace::Backtrace;
use parking_lot::Mutex;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

/// Error kinds for Haven operations.
///
/// Each kind names one category of failure so callers can react precisely,
/// e.g. turning [`ErrorKind::DuplicateKey`] into an "already exists" reply.
///
/// # Examples
///
/// ```rust,ignore
/// use haven::errors::{HavenError, ErrorKind, HavenResult};
///
/// fn example() -> HavenResult<()> {
///     Err(HavenError::new("E11000 duplicate key", ErrorKind::DuplicateKey))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // DNS Errors
    /// DNS-over-HTTPS or platform name resolution failed
    ResolutionFailure,
    /// A DNS-over-HTTPS response body could not be parsed
    MalformedResponse,

    // Connection Errors
    /// The remote database could not be reached in time
    ConnectionFailure,
    /// A connection string could not be parsed
    InvalidUri,

    // Constraint Violation Errors
    /// A unique index (or the `_id` field) would be violated
    DuplicateKey,

    // Query Errors
    /// A filter document used an unsupported shape or operator
    InvalidFilter,
    /// An update document used an unsupported shape or operator
    InvalidUpdate,
    /// The operation is not valid in the current context
    InvalidOperation,

    // Configuration Errors
    /// Configuration is missing or contradictory
    ConfigurationError,

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::ResolutionFailure => write!(f, "Resolution failure"),
            ErrorKind::MalformedResponse => write!(f, "Malformed response"),
            ErrorKind::ConnectionFailure => write!(f, "Connection failure"),
            ErrorKind::InvalidUri => write!(f, "Invalid URI"),
            ErrorKind::DuplicateKey => write!(f, "Duplicate key"),
            ErrorKind::InvalidFilter => write!(f, "Invalid filter"),
            ErrorKind::InvalidUpdate => write!(f, "Invalid update"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::ConfigurationError => write!(f, "Configuration error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom Haven error type.
///
/// `HavenError` carries a message, an [`ErrorKind`], an optional cause and a
/// backtrace captured at construction. The cause chain is exposed through
/// [`Error::source`].
///
/// # Examples
///
/// ```rust,ignore
/// use haven::errors::{HavenError, ErrorKind};
///
/// let cause = HavenError::new("connection reset", ErrorKind::ResolutionFailure);
/// let err = HavenError::new_with_cause("SRV lookup failed", ErrorKind::ResolutionFailure, cause);
/// assert!(err.cause().is_some());
/// ```
#[derive(Clone)]
pub struct HavenError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<HavenError>>,
    backtrace: Arc<Mutex<Backtrace>>,
}

impl HavenError {
    /// Creates a new `HavenError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        HavenError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Arc::new(Mutex::new(Backtrace::new_unresolved())),
        }
    }

    /// Creates a new `HavenError` that wraps the error which caused it.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: HavenError) -> Self {
        HavenError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: Arc::new(Mutex::new(Backtrace::new_unresolved())),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&HavenError> {
        self.cause.as_deref()
    }

    /// Returns `true` when a unique index rejected the write.
    pub fn is_duplicate_key(&self) -> bool {
        self.error_kind == ErrorKind::DuplicateKey
    }
}

impl Display for HavenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for HavenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => {
                let mut backtrace = self.backtrace.lock();
                backtrace.resolve();
                write!(f, "{}\n{:?}", self.message, *backtrace)
            }
        }
    }
}

impl Error for HavenError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for Haven operations.
pub type HavenResult<T> = Result<T, HavenError>;

impl From<std::io::Error> for HavenError {
    fn from(err: std::io::Error) -> Self {
        let error_kind = match err.kind() {
            std::io::ErrorKind::TimedOut => ErrorKind::ConnectionFailure,
            std::io::ErrorKind::ConnectionRefused => ErrorKind::ConnectionFailure,
            std::io::ErrorKind::ConnectionReset => ErrorKind::ConnectionFailure,
            _ => ErrorKind::ResolutionFailure,
        };
        HavenError::new(&format!("IO error: {}", err), error_kind)
    }
}

impl From<serde_json::Error> for HavenError {
    fn from(err: serde_json::Error) -> Self {
        HavenError::new(
            &format!("Malformed JSON body: {}", err),
            ErrorKind::MalformedResponse,
        )
    }
}

impl From<url::ParseError> for HavenError {
    fn from(err: url::ParseError) -> Self {
        HavenError::new(&format!("Invalid URI: {}", err), ErrorKind::InvalidUri)
    }
}

impl From<hyper::Error> for HavenError {
    fn from(err: hyper::Error) -> Self {
        HavenError::new(
            &format!("HTTP transport error: {}", err),
            ErrorKind::ResolutionFailure,
        )
    }
}

impl From<http::Error> for HavenError {
    fn from(err: http::Error) -> Self {
        HavenError::new(
            &format!("HTTP request error: {}", err),
            ErrorKind::InternalError,
        )
    }
}

impl From<tokio::time::error::Elapsed> for HavenError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        HavenError::new("Operation timed out", ErrorKind::ResolutionFailure)
    }
}

impl From<String> for HavenError {
    fn from(msg: String) -> Self {
        HavenError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for HavenError {
    fn from(msg: &str) -> Self {
        HavenError::new(msg, ErrorKind::InternalError)
    }
}
