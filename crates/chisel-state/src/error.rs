//! Error types for chisel-state operations.

use crate::Path;
use thiserror::Error;

/// Result type alias for chisel-state operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during draft and produce operations.
#[derive(Debug, Error)]
pub enum StateError {
    /// Path does not exist in the value graph.
    #[error("path not found: {path}")]
    PathNotFound {
        /// The path that was not found.
        path: Path,
    },

    /// Array index is out of bounds.
    #[error("index {index} out of bounds (len: {len}) at path {path}")]
    IndexOutOfBounds {
        /// The path to the array.
        path: Path,
        /// The index that was accessed.
        index: usize,
        /// The actual length of the array.
        len: usize,
    },

    /// Type mismatch when accessing a node.
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        /// The path where the mismatch occurred.
        path: Path,
        /// The expected node kind.
        expected: &'static str,
        /// The actual node kind found.
        found: &'static str,
    },

    /// A cyclic graph cannot be rendered as a tree value.
    #[error("cyclic reference at {path} cannot be converted to a tree value")]
    CyclicValue {
        /// The path where the cycle was detected.
        path: Path,
    },

    /// Invalid operation error.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of what went wrong.
        message: String,
    },

    /// A recipe failed during `produce`; the input snapshot is untouched.
    #[error("recipe failed: {message}")]
    RecipeFailure {
        /// Message of the underlying recipe error.
        message: String,
    },

    /// Shard count and recipe count disagree; no chunk was processed.
    #[error("shard mismatch: {chunks} chunks for {recipes} recipes")]
    ShardMismatch {
        /// Number of chunks the sharder produced.
        chunks: usize,
        /// Number of recipes supplied.
        recipes: usize,
    },

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StateError {
    /// Create a path not found error.
    #[inline]
    pub fn path_not_found(path: Path) -> Self {
        StateError::PathNotFound { path }
    }

    /// Create an index out of bounds error.
    #[inline]
    pub fn index_out_of_bounds(path: Path, index: usize, len: usize) -> Self {
        StateError::IndexOutOfBounds { path, index, len }
    }

    /// Create a type mismatch error.
    #[inline]
    pub fn type_mismatch(path: Path, expected: &'static str, found: &'static str) -> Self {
        StateError::TypeMismatch {
            path,
            expected,
            found,
        }
    }

    /// Create a cyclic value error.
    #[inline]
    pub fn cyclic_value(path: Path) -> Self {
        StateError::CyclicValue { path }
    }

    /// Create an invalid operation error.
    #[inline]
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        StateError::InvalidOperation {
            message: message.into(),
        }
    }

    /// Wrap an arbitrary recipe error into the single `RecipeFailure` kind.
    #[inline]
    pub fn recipe_failure(source: &StateError) -> Self {
        StateError::RecipeFailure {
            message: source.to_string(),
        }
    }

    /// Create a shard mismatch error.
    #[inline]
    pub fn shard_mismatch(chunks: usize, recipes: usize) -> Self {
        StateError::ShardMismatch { chunks, recipes }
    }
}
