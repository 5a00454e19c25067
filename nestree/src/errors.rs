use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for tree operations.
///
/// Every failure surfaced by the engine or by a store adapter falls into one
/// of these categories. Callers branch on the kind, never on the message.
///
/// # Examples
///
/// ```rust
/// use nestree::errors::{ErrorKind, TreeError, TreeResult};
///
/// fn example() -> TreeResult<()> {
///     Err(TreeError::new("node 42 not found", ErrorKind::NotFound))
/// }
///
/// assert_eq!(example().unwrap_err().kind(), &ErrorKind::NotFound);
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// A referenced node id does not resolve to an existing row
    NotFound,
    /// The request is structurally impossible (cycle, self target, position out of range)
    InvalidOperation,
    /// The store reported a serialization failure, or the tree lock timed out
    ConcurrencyConflict,
    /// The underlying store failed (closed, constraint violation, backend error)
    StoreFailure,
    /// Stored rows or configuration values violate a tree invariant
    ValidationError,
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::ConcurrencyConflict => write!(f, "Concurrency conflict"),
            ErrorKind::StoreFailure => write!(f, "Store failure"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Error type for all tree and store operations.
///
/// `TreeError` carries a message, an [`ErrorKind`], an optional cause and the
/// backtrace captured where the error was created.
///
/// # Examples
///
/// ```rust
/// use nestree::errors::{ErrorKind, TreeError};
///
/// let cause = TreeError::new("commit rejected", ErrorKind::ConcurrencyConflict);
/// let err = TreeError::new_with_cause("move failed", ErrorKind::StoreFailure, cause);
/// assert!(err.cause().is_some());
/// ```
#[derive(Clone)]
pub struct TreeError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<TreeError>>,
    backtrace: Atomic<Backtrace>,
}

impl TreeError {
    /// Creates a new `TreeError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        TreeError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `TreeError` that wraps the error which caused it.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: TreeError) -> Self {
        TreeError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&TreeError> {
        self.cause.as_deref()
    }

    /// Returns `true` when retrying the whole operation from a fresh read may succeed.
    pub fn is_retryable(&self) -> bool {
        self.error_kind == ErrorKind::ConcurrencyConflict
    }
}

impl Display for TreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for TreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for TreeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;

impl From<std::num::TryFromIntError> for TreeError {
    fn from(err: std::num::TryFromIntError) -> Self {
        TreeError::new(
            &format!("Bound arithmetic out of range: {}", err),
            ErrorKind::InternalError,
        )
    }
}
