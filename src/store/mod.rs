// src/store/mod.rs

//! Persistence seams used by the comment service.
//!
//! Every method returns `anyhow::Result`; "row absent" is reported through `Option`,
//! `bool` or [`InsertOutcome`], never as an error, so the service decides which domain
//! error applies.

pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    comment::{Comment, NewComment},
    notification::Notification,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// What [`CommentStore::insert`] did with a new comment.
#[derive(Debug)]
pub enum InsertOutcome {
    Created(Comment),
    /// The thread does not exist. Nothing was written.
    UnknownThread,
    /// The parent does not exist or belongs to another thread. Nothing was written.
    UnknownParent(i64),
}

impl InsertOutcome {
    pub fn created(self) -> Option<Comment> {
        match self {
            InsertOutcome::Created(comment) => Some(comment),
            _ => None,
        }
    }
}

/// Durable collection of comment rows.
///
/// All listing methods return rows in creation order, ties broken by increasing id.
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Persists a comment, assigning its id and both timestamps.
    ///
    /// The thread and the parent are checked in the same atomic step as the write, and
    /// neither can disappear between the check and the insert.
    async fn insert(&self, comment: NewComment) -> Result<InsertOutcome>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Comments of the thread that have no parent.
    async fn find_roots_by_thread(&self, thread_id: i64) -> Result<Vec<Comment>>;

    /// Direct replies to `parent_id`.
    async fn find_children(&self, parent_id: i64) -> Result<Vec<Comment>>;

    /// Every comment of the thread in one pass.
    async fn find_all_by_thread(&self, thread_id: i64) -> Result<Vec<Comment>>;

    /// Rewrites the body and bumps `modified_at`. `None` if the comment does not exist.
    async fn update_body(&self, id: i64, body: &str) -> Result<Option<Comment>>;

    /// Removes exactly one row. `false` if the comment does not exist.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// Read-only view of the threads comments attach to.
#[async_trait]
pub trait ThreadLookup: Send + Sync {
    async fn exists(&self, thread_id: i64) -> Result<bool>;

    /// User id of the thread's author, `None` if the thread does not exist.
    async fn owner_user_id(&self, thread_id: i64) -> Result<Option<i64>>;
}

/// Side channel told about new comments. Delivery is best effort.
#[async_trait]
pub trait NotificationEmitter: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<()>;
}
