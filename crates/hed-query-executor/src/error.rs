//! Error types for query execution.

use thiserror::Error;

use crate::traits::NodeId;

/// Errors that can occur while compiling or evaluating a search query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// Query compile error from the hed-query parser.
    #[error("query parse error: {0}")]
    Query(#[from] hed_query::QueryError),

    /// Two results for different groups were merged by an AND.
    ///
    /// This is an evaluator invariant violation and cannot be triggered by a
    /// query that compiled successfully.
    #[error("internal error: cannot merge results for group {left} with results for group {right}")]
    InternalMergeMismatch {
        /// Group of the left result.
        left: NodeId,
        /// Group of the right result.
        right: NodeId,
    },
}

/// Result type for query executor operations.
pub type HedResult<T> = std::result::Result<T, ExecutorError>;
