// src/store/postgres.rs

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;

use super::{CommentStore, InsertOutcome, NotificationEmitter, ThreadLookup};
use crate::models::{
    comment::{Comment, NewComment},
    notification::Notification,
};

/// Postgres-backed implementation of every store seam.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentStore for PgStore {
    async fn insert(&self, comment: NewComment) -> Result<InsertOutcome> {
        let mut tx = self.pool.begin().await?;

        // Locks are taken thread first, then comment, the same order as delete and the
        // thread cascade, so concurrent writers queue up instead of deadlocking.

        // 1. Update Thread Count; this also locks the thread against deletion
        let thread: Option<i64> = sqlx::query_scalar(
            "UPDATE threads SET comment_count = comment_count + 1 WHERE id = $1 RETURNING id",
        )
        .bind(comment.thread_id)
        .fetch_optional(&mut *tx)
        .await?;
        if thread.is_none() {
            tx.rollback().await?;
            return Ok(InsertOutcome::UnknownThread);
        }

        // 2. Check Parent; FOR SHARE keeps it alive until commit
        if let Some(parent_id) = comment.parent_id {
            let parent_thread: Option<i64> =
                sqlx::query_scalar("SELECT thread_id FROM comments WHERE id = $1 FOR SHARE")
                    .bind(parent_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if parent_thread != Some(comment.thread_id) {
                tx.rollback().await?;
                return Ok(InsertOutcome::UnknownParent(parent_id));
            }
        }

        // 3. Insert Comment
        let created = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (thread_id, parent_id, author, body)
            VALUES ($1, $2, $3, $4)
            RETURNING id, thread_id, parent_id, author, body, created_at, modified_at
            "#,
        )
        .bind(comment.thread_id)
        .bind(comment.parent_id)
        .bind(&comment.author)
        .bind(&comment.body)
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("failed to insert comment on thread {}", comment.thread_id))?;

        tx.commit().await?;

        Ok(InsertOutcome::Created(created))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, thread_id, parent_id, author, body, created_at, modified_at
            FROM comments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn find_roots_by_thread(&self, thread_id: i64) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, thread_id, parent_id, author, body, created_at, modified_at
            FROM comments
            WHERE thread_id = $1 AND parent_id IS NULL
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn find_children(&self, parent_id: i64) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, thread_id, parent_id, author, body, created_at, modified_at
            FROM comments
            WHERE parent_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn find_all_by_thread(&self, thread_id: i64) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, thread_id, parent_id, author, body, created_at, modified_at
            FROM comments
            WHERE thread_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("failed to load comments of thread {thread_id}"))?;

        Ok(comments)
    }

    async fn update_body(&self, id: i64, body: &str) -> Result<Option<Comment>> {
        // modified_at must move forward even when NOW() has not ticked since the last write.
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            UPDATE comments
            SET body = $2,
                modified_at = GREATEST(NOW(), modified_at + INTERVAL '1 microsecond')
            WHERE id = $1
            RETURNING id, thread_id, parent_id, author, body, created_at, modified_at
            "#,
        )
        .bind(id)
        .bind(body)
        .fetch_optional(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let thread_id: Option<i64> = sqlx::query_scalar("SELECT thread_id FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(thread_id) = thread_id else {
            tx.rollback().await?;
            return Ok(false);
        };

        // Thread row first, same lock order as insert.
        sqlx::query(
            "UPDATE threads SET comment_count = GREATEST(0, comment_count - 1) WHERE id = $1",
        )
        .bind(thread_id)
        .execute(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM comments WHERE id = $1 AND thread_id = $2")
            .bind(id)
            .bind(thread_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        // Someone else removed it in the meantime; undo the counter change.
        if deleted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;

        Ok(true)
    }
}

#[async_trait]
impl ThreadLookup for PgStore {
    async fn exists(&self, thread_id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM threads WHERE id = $1)")
            .bind(thread_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn owner_user_id(&self, thread_id: i64) -> Result<Option<i64>> {
        let owner: Option<i64> = sqlx::query_scalar("SELECT user_id FROM threads WHERE id = $1")
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(owner)
    }
}

#[async_trait]
impl NotificationEmitter for PgStore {
    async fn notify(&self, notification: Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (user_id, thread_id, comment_id, message)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(notification.recipient_user_id)
        .bind(notification.thread_id)
        .bind(notification.comment_id)
        .bind(&notification.message)
        .execute(&self.pool)
        .await
        .context("failed to record notification")?;

        Ok(())
    }
}
