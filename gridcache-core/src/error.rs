//! Error types for gridcache operations.

use std::fmt;
use std::io;
use thiserror::Error;

/// The main error type for gridcache operations.
#[derive(Debug, Error)]
pub enum GridError {
    /// Connection-related errors reported by the transport.
    #[error("connection error: {0}")]
    Connection(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Operation timeout errors.
    #[error("timeout error: {0}")]
    Timeout(String),

    /// Configuration errors (invalid settings).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The operation is not valid for the current state of the target object.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A pool with the same name is already registered.
    #[error("duplicate name: a pool named '{0}' already exists")]
    DuplicateName(String),

    /// One or more pools failed while being torn down.
    #[error("teardown failed for {} pool(s): {}", .0.len(), TeardownList(.0))]
    Teardown(Vec<TeardownFailure>),

    /// I/O errors from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl GridError {
    /// Returns true if this is an [`GridError::IllegalState`] error.
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Self::IllegalState(_))
    }
}

/// A teardown failure for a single pool, collected during a bulk close.
#[derive(Debug)]
pub struct TeardownFailure {
    pool: String,
    error: Box<GridError>,
}

impl TeardownFailure {
    /// Creates a failure record for the named pool.
    pub fn new(pool: impl Into<String>, error: GridError) -> Self {
        Self {
            pool: pool.into(),
            error: Box::new(error),
        }
    }

    /// Returns the name of the pool that failed.
    pub fn pool(&self) -> &str {
        &self.pool
    }

    /// Returns the underlying error.
    pub fn error(&self) -> &GridError {
        &self.error
    }
}

impl fmt::Display for TeardownFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pool, self.error)
    }
}

struct TeardownList<'a>(&'a [TeardownFailure]);

impl fmt::Display for TeardownList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

/// A specialized `Result` type for gridcache operations.
pub type Result<T> = std::result::Result<T, GridError>;
