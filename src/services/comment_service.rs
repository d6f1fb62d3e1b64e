// src/services/comment_service.rs

use std::sync::Arc;

use crate::{
    models::{
        comment::{Comment, CommentView, MAX_BODY_CHARS, NewComment},
        notification::Notification,
    },
    store::{CommentStore, InsertOutcome, NotificationEmitter, ThreadLookup},
    utils::html::clean_comment_body,
};

use super::{
    comment_tree::build_forest,
    errors::{CommentError, CommentResult},
};

/// Who is asking for a mutation.
#[derive(Debug, Clone)]
pub struct Actor {
    pub username: String,
    pub is_admin: bool,
}

/// Create, list, edit and remove comments on a thread.
///
/// Holds no state of its own besides the store handles, so clones are cheap and can be
/// shared across concurrent requests.
#[derive(Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentStore>,
    threads: Arc<dyn ThreadLookup>,
    notifier: Arc<dyn NotificationEmitter>,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentStore>,
        threads: Arc<dyn ThreadLookup>,
        notifier: Arc<dyn NotificationEmitter>,
    ) -> Self {
        Self {
            comments,
            threads,
            notifier,
        }
    }

    /// Adds a root comment or a reply.
    ///
    /// The thread must exist, and a parent, when given, must be a comment of that same
    /// thread. Both are checked up front for a fast answer and again by the store inside
    /// the write, so a thread or parent removed in between still yields the matching
    /// error. The body is limited to [`MAX_BODY_CHARS`] as submitted. The thread's owner
    /// is notified once the row is stored; a failed notification is logged and does not
    /// affect the result.
    pub async fn add_comment(&self, comment: NewComment) -> CommentResult<CommentView> {
        let thread_id = comment.thread_id;

        // 1. Thread must exist
        if !self.threads.exists(thread_id).await? {
            return Err(CommentError::ThreadNotFound { thread_id });
        }

        // 2. Parent must be a comment of the same thread
        if let Some(parent_id) = comment.parent_id {
            match self.comments.find_by_id(parent_id).await? {
                Some(parent) if parent.thread_id == thread_id => {}
                _ => return Err(CommentError::ParentNotFound { parent_id }),
            }
        }

        let body = clean_body(&comment.body)?;

        // 3. Insert Comment
        let created = match self.comments.insert(NewComment { body, ..comment }).await? {
            InsertOutcome::Created(created) => created,
            InsertOutcome::UnknownThread => return Err(CommentError::ThreadNotFound { thread_id }),
            InsertOutcome::UnknownParent(parent_id) => {
                return Err(CommentError::ParentNotFound { parent_id });
            }
        };
        tracing::info!(
            comment_id = created.id,
            thread_id,
            parent_id = ?created.parent_id,
            "comment added"
        );

        // 4. Notify the thread owner, best effort
        match self.threads.owner_user_id(thread_id).await {
            Ok(Some(owner)) => {
                let notification = Notification::new_comment(owner, thread_id, created.id, &created.author);
                if let Err(e) = self.notifier.notify(notification).await {
                    tracing::warn!(comment_id = created.id, "Failed to deliver comment notification: {:?}", e);
                }
            }
            Ok(None) => {
                tracing::warn!(comment_id = created.id, thread_id, "Thread vanished before its owner could be notified");
            }
            Err(e) => {
                tracing::warn!(comment_id = created.id, "Failed to look up thread owner: {:?}", e);
            }
        }

        Ok(created.into())
    }

    /// Lists the comments of a thread as a forest of reply trees.
    pub async fn list_comments(&self, thread_id: i64) -> CommentResult<Vec<CommentView>> {
        if !self.threads.exists(thread_id).await? {
            return Err(CommentError::ThreadNotFound { thread_id });
        }

        let rows = self.comments.find_all_by_thread(thread_id).await?;
        build_forest(rows).inspect_err(|e| {
            tracing::error!(thread_id, "Failed to rebuild comment tree: {}", e);
        })
    }

    pub async fn get_comment(&self, comment_id: i64) -> CommentResult<Comment> {
        self.comments
            .find_by_id(comment_id)
            .await?
            .ok_or(CommentError::CommentNotFound { comment_id })
    }

    /// Replaces the body of a comment. Only its author may do so.
    pub async fn edit_comment(&self, comment_id: i64, body: &str, actor: &Actor) -> CommentResult<CommentView> {
        let existing = self.get_comment(comment_id).await?;

        if existing.author != actor.username {
            return Err(CommentError::Forbidden {
                comment_id,
                actor: actor.username.clone(),
            });
        }

        let body = clean_body(body)?;

        let updated = self
            .comments
            .update_body(comment_id, &body)
            .await?
            .ok_or(CommentError::CommentNotFound { comment_id })?;
        tracing::info!(comment_id, "comment edited");

        Ok(updated.into())
    }

    /// Removes a single comment. Its replies stay in place and become orphans.
    /// Allowed for the author and for admins.
    pub async fn remove_comment(&self, comment_id: i64, actor: &Actor) -> CommentResult<()> {
        let existing = self.get_comment(comment_id).await?;

        if existing.author != actor.username && !actor.is_admin {
            return Err(CommentError::Forbidden {
                comment_id,
                actor: actor.username.clone(),
            });
        }

        if !self.comments.delete(comment_id).await? {
            return Err(CommentError::CommentNotFound { comment_id });
        }
        tracing::info!(comment_id, thread_id = existing.thread_id, by = %actor.username, "comment removed");

        Ok(())
    }
}

/// Length check on the submitted text, then sanitizing.
fn clean_body(submitted: &str) -> CommentResult<String> {
    if submitted.chars().count() > MAX_BODY_CHARS {
        return Err(CommentError::BodyTooLong { max: MAX_BODY_CHARS });
    }
    clean_comment_body(submitted).ok_or(CommentError::EmptyBody)
}
