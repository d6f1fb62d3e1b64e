//! Typed errors for the comment service layer.

use thiserror::Error;

/// Result type alias for comment service operations.
pub type CommentResult<T> = Result<T, CommentError>;

/// Errors surfaced by the comment service. All of them are recoverable.
#[derive(Debug, Error)]
pub enum CommentError {
    /// The thread a comment refers to does not exist.
    #[error("Thread not found: {thread_id}")]
    ThreadNotFound { thread_id: i64 },

    /// The replied-to comment does not exist in this thread.
    #[error("Parent comment not found: {parent_id}")]
    ParentNotFound { parent_id: i64 },

    /// The comment being read, edited or removed does not exist.
    #[error("Comment not found: {comment_id}")]
    CommentNotFound { comment_id: i64 },

    /// A reply chain loops back on itself and cannot be turned into a tree.
    #[error("Reply chain through comment {comment_id} forms a cycle")]
    CycleDetected { comment_id: i64 },

    /// The caller does not own the comment.
    #[error("{actor} is not allowed to modify comment {comment_id}")]
    Forbidden { comment_id: i64, actor: String },

    /// Nothing is left of the body once unsafe markup is stripped.
    #[error("Comment body is empty")]
    EmptyBody,

    /// The submitted body is longer than allowed.
    #[error("Comment must be at most {max} characters")]
    BodyTooLong { max: usize },

    /// An internal storage error.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
