// src/store/memory.rs

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use super::{CommentStore, InsertOutcome, NotificationEmitter, ThreadLookup};
use crate::models::{
    comment::{Comment, NewComment},
    notification::Notification,
};

/// In-process store implementing every seam, used by tests and local runs without Postgres.
///
/// A single lock guards all tables, so each operation is atomic and readers never see a
/// half-written row.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    last_thread_id: i64,
    last_comment_id: i64,
    threads: HashMap<i64, ThreadRow>,
    comments: BTreeMap<i64, Comment>,
    notifications: Vec<Notification>,
}

struct ThreadRow {
    owner_user_id: i64,
    comment_count: i64,
}

impl Tables {
    /// Rows matching `keep`, in creation order.
    fn select(&self, keep: impl Fn(&Comment) -> bool) -> Vec<Comment> {
        let mut rows: Vec<Comment> = self.comments.values().filter(|&c| keep(c)).cloned().collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        rows
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a thread owned by `owner_user_id` and returns its id.
    pub async fn add_thread(&self, owner_user_id: i64) -> i64 {
        let mut tables = self.inner.write().await;
        tables.last_thread_id += 1;
        let id = tables.last_thread_id;
        tables.threads.insert(
            id,
            ThreadRow {
                owner_user_id,
                comment_count: 0,
            },
        );
        id
    }

    /// Deletes a thread and every comment attached to it.
    pub async fn delete_thread(&self, thread_id: i64) -> bool {
        let mut tables = self.inner.write().await;
        if tables.threads.remove(&thread_id).is_none() {
            return false;
        }
        tables.comments.retain(|_, c| c.thread_id != thread_id);
        true
    }

    pub async fn comment_count(&self, thread_id: i64) -> Option<i64> {
        let tables = self.inner.read().await;
        tables.threads.get(&thread_id).map(|t| t.comment_count)
    }

    /// Total number of stored comments across all threads.
    pub async fn len(&self) -> usize {
        self.inner.read().await.comments.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Notifications delivered so far, oldest first.
    pub async fn notifications(&self) -> Vec<Notification> {
        self.inner.read().await.notifications.clone()
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn insert(&self, comment: NewComment) -> Result<InsertOutcome> {
        let mut tables = self.inner.write().await;

        if !tables.threads.contains_key(&comment.thread_id) {
            return Ok(InsertOutcome::UnknownThread);
        }
        if let Some(parent_id) = comment.parent_id {
            let same_thread = tables
                .comments
                .get(&parent_id)
                .is_some_and(|parent| parent.thread_id == comment.thread_id);
            if !same_thread {
                return Ok(InsertOutcome::UnknownParent(parent_id));
            }
        }

        if let Some(thread) = tables.threads.get_mut(&comment.thread_id) {
            thread.comment_count += 1;
        }

        tables.last_comment_id += 1;
        let now = Utc::now();
        let created = Comment {
            id: tables.last_comment_id,
            thread_id: comment.thread_id,
            parent_id: comment.parent_id,
            author: comment.author,
            body: comment.body,
            created_at: now,
            modified_at: now,
        };
        tables.comments.insert(created.id, created.clone());

        Ok(InsertOutcome::Created(created))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>> {
        Ok(self.inner.read().await.comments.get(&id).cloned())
    }

    async fn find_roots_by_thread(&self, thread_id: i64) -> Result<Vec<Comment>> {
        let tables = self.inner.read().await;
        Ok(tables.select(|c| c.thread_id == thread_id && c.parent_id.is_none()))
    }

    async fn find_children(&self, parent_id: i64) -> Result<Vec<Comment>> {
        let tables = self.inner.read().await;
        Ok(tables.select(|c| c.parent_id == Some(parent_id)))
    }

    async fn find_all_by_thread(&self, thread_id: i64) -> Result<Vec<Comment>> {
        let tables = self.inner.read().await;
        Ok(tables.select(|c| c.thread_id == thread_id))
    }

    async fn update_body(&self, id: i64, body: &str) -> Result<Option<Comment>> {
        let mut tables = self.inner.write().await;
        let Some(comment) = tables.comments.get_mut(&id) else {
            return Ok(None);
        };

        // modified_at strictly increases on every edit.
        comment.modified_at = Utc::now().max(comment.modified_at + Duration::microseconds(1));
        comment.body = body.to_string();

        Ok(Some(comment.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut tables = self.inner.write().await;
        let Some(removed) = tables.comments.remove(&id) else {
            return Ok(false);
        };

        if let Some(thread) = tables.threads.get_mut(&removed.thread_id) {
            thread.comment_count = (thread.comment_count - 1).max(0);
        }

        Ok(true)
    }
}

#[async_trait]
impl ThreadLookup for MemoryStore {
    async fn exists(&self, thread_id: i64) -> Result<bool> {
        Ok(self.inner.read().await.threads.contains_key(&thread_id))
    }

    async fn owner_user_id(&self, thread_id: i64) -> Result<Option<i64>> {
        let tables = self.inner.read().await;
        Ok(tables.threads.get(&thread_id).map(|t| t.owner_user_id))
    }
}

#[async_trait]
impl NotificationEmitter for MemoryStore {
    async fn notify(&self, notification: Notification) -> Result<()> {
        self.inner.write().await.notifications.push(notification);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(thread_id: i64, parent_id: Option<i64>, body: &str) -> NewComment {
        NewComment {
            thread_id,
            parent_id,
            author: "alice".to_string(),
            body: body.to_string(),
        }
    }

    async fn add(store: &MemoryStore, thread_id: i64, parent_id: Option<i64>, body: &str) -> Comment {
        store
            .insert(reply(thread_id, parent_id, body))
            .await
            .unwrap()
            .created()
            .unwrap()
    }

    #[tokio::test]
    async fn roots_and_children_are_listed_in_creation_order() {
        let store = MemoryStore::new();
        let thread = store.add_thread(1).await;

        let first = add(&store, thread, None, "first").await;
        let second = add(&store, thread, None, "second").await;
        let a = add(&store, thread, Some(first.id), "a").await;
        let b = add(&store, thread, Some(first.id), "b").await;

        let roots: Vec<i64> = store
            .find_roots_by_thread(thread)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(roots, vec![first.id, second.id]);

        let children: Vec<i64> = store
            .find_children(first.id)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(children, vec![a.id, b.id]);
        assert!(store.find_children(second.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_into_unknown_thread_writes_nothing() {
        let store = MemoryStore::new();
        let outcome = store.insert(reply(42, None, "lost")).await.unwrap();
        assert!(matches!(outcome, InsertOutcome::UnknownThread));

        // Thread is checked before the parent.
        let outcome = store.insert(reply(42, Some(1), "lost")).await.unwrap();
        assert!(matches!(outcome, InsertOutcome::UnknownThread));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn insert_under_missing_or_foreign_parent_writes_nothing() {
        let store = MemoryStore::new();
        let thread = store.add_thread(1).await;
        let other = store.add_thread(2).await;
        let foreign = add(&store, other, None, "elsewhere").await;

        let outcome = store.insert(reply(thread, Some(999), "x")).await.unwrap();
        assert!(matches!(outcome, InsertOutcome::UnknownParent(999)));

        let outcome = store.insert(reply(thread, Some(foreign.id), "x")).await.unwrap();
        assert!(matches!(outcome, InsertOutcome::UnknownParent(id) if id == foreign.id));

        assert_eq!(store.len().await, 1);
        assert_eq!(store.comment_count(thread).await, Some(0));
    }

    #[tokio::test]
    async fn comment_count_follows_inserts_and_deletes() {
        let store = MemoryStore::new();
        let thread = store.add_thread(1).await;

        let c = add(&store, thread, None, "x").await;
        add(&store, thread, None, "y").await;
        assert_eq!(store.comment_count(thread).await, Some(2));

        assert!(store.delete(c.id).await.unwrap());
        assert!(!store.delete(c.id).await.unwrap());
        assert_eq!(store.comment_count(thread).await, Some(1));
    }

    #[tokio::test]
    async fn deleting_a_thread_removes_its_comments() {
        let store = MemoryStore::new();
        let kept = store.add_thread(1).await;
        let doomed = store.add_thread(2).await;
        add(&store, kept, None, "stay").await;
        add(&store, doomed, None, "go").await;

        assert!(store.delete_thread(doomed).await);
        assert!(!store.exists(doomed).await.unwrap());
        assert_eq!(store.len().await, 1);
        assert!(store.find_all_by_thread(doomed).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_always_advances_modified_at() {
        let store = MemoryStore::new();
        let thread = store.add_thread(1).await;
        let c = add(&store, thread, None, "v1").await;

        let v2 = store.update_body(c.id, "v2").await.unwrap().unwrap();
        let v3 = store.update_body(c.id, "v3").await.unwrap().unwrap();
        assert!(v2.modified_at > c.modified_at);
        assert!(v3.modified_at > v2.modified_at);
        assert_eq!(v3.created_at, c.created_at);
        assert!(store.update_body(999, "nope").await.unwrap().is_none());
    }
}
