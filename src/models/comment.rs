use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'comments' table in the database.
///
/// `parent_id` is `None` for root comments. It is never rewritten after insert, so once
/// the parent is removed it keeps pointing at the deleted row.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub thread_id: i64,
    pub parent_id: Option<i64>,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// A comment that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub thread_id: i64,
    pub parent_id: Option<i64>,
    pub author: String,
    pub body: String,
}

/// Longest body a client may submit, in characters. Sanitizing never lengthens a body,
/// so stored bodies stay within the same bound.
pub const MAX_BODY_CHARS: usize = 1000;

/// A comment together with its replies, as returned to clients.
///
/// Reply chains can be arbitrarily deep, so nothing here recurses per level: dropping
/// goes through a manual [`Drop`] and JSON goes through [`CommentView::forest_to_json`].
#[derive(Debug)]
pub struct CommentView {
    pub comment_id: i64,
    pub thread_id: i64,
    pub parent_id: Option<i64>,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub children: Vec<CommentView>,
}

impl CommentView {
    pub fn with_children(comment: Comment, children: Vec<CommentView>) -> Self {
        Self {
            comment_id: comment.id,
            thread_id: comment.thread_id,
            parent_id: comment.parent_id,
            author: comment.author,
            body: comment.body,
            created_at: comment.created_at,
            modified_at: comment.modified_at,
            children,
        }
    }

    /// Number of comments in this subtree, the node itself included.
    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            count += 1;
            pending.extend(node.children.iter());
        }
        count
    }

    /// Encodes a forest as a JSON array of nested comment objects.
    pub fn forest_to_json(forest: &[CommentView]) -> serde_json::Result<Vec<u8>> {
        let mut out = Vec::new();
        out.push(b'[');
        write_trees(forest, &mut out)?;
        out.push(b']');
        Ok(out)
    }

    /// Encodes this comment and all of its replies as one JSON object.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        let mut out = Vec::new();
        write_trees(std::slice::from_ref(self), &mut out)?;
        Ok(out)
    }

    /// Writes every field up to and including the opening bracket of `children`.
    fn write_head(&self, out: &mut Vec<u8>) -> serde_json::Result<()> {
        out.extend_from_slice(b"{\"comment_id\":");
        serde_json::to_writer(&mut *out, &self.comment_id)?;
        out.extend_from_slice(b",\"thread_id\":");
        serde_json::to_writer(&mut *out, &self.thread_id)?;
        out.extend_from_slice(b",\"parent_id\":");
        serde_json::to_writer(&mut *out, &self.parent_id)?;
        out.extend_from_slice(b",\"author\":");
        serde_json::to_writer(&mut *out, &self.author)?;
        out.extend_from_slice(b",\"body\":");
        serde_json::to_writer(&mut *out, &self.body)?;
        out.extend_from_slice(b",\"created_at\":");
        serde_json::to_writer(&mut *out, &self.created_at)?;
        out.extend_from_slice(b",\"modified_at\":");
        serde_json::to_writer(&mut *out, &self.modified_at)?;
        out.extend_from_slice(b",\"children\":[");
        Ok(())
    }
}

/// Comma-separated JSON objects for `trees`, walked with one iterator per open level.
fn write_trees(trees: &[CommentView], out: &mut Vec<u8>) -> serde_json::Result<()> {
    let mut levels = vec![trees.iter()];
    let mut first = true;

    while let Some(level) = levels.last_mut() {
        match level.next() {
            Some(node) => {
                if !first {
                    out.push(b',');
                }
                node.write_head(out)?;
                levels.push(node.children.iter());
                first = true;
            }
            None => {
                levels.pop();
                // Closes the children array and the object that owns it.
                if !levels.is_empty() {
                    out.extend_from_slice(b"]}");
                }
                first = false;
            }
        }
    }

    Ok(())
}

impl Drop for CommentView {
    fn drop(&mut self) {
        // Detach replies onto a local stack so each node drops with no children left.
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

impl From<Comment> for CommentView {
    fn from(comment: Comment) -> Self {
        Self::with_children(comment, Vec::new())
    }
}

/// DTO for creating a new comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    pub thread_id: i64,

    #[validate(
        length(
            min = 1,
            max = 1000,
            message = "Comment must be between 1 and 1000 characters"
        ),
        custom(function = validate_not_blank)
    )]
    pub body: String,

    /// Optional: the ID of the comment being replied to.
    pub parent_id: Option<i64>,
}

/// DTO for editing a comment. Only the body can change.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(
        length(
            min = 1,
            max = 1000,
            message = "Comment must be between 1 and 1000 characters"
        ),
        custom(function = validate_not_blank)
    )]
    pub body: String,
}

fn validate_not_blank(body: &str) -> Result<(), validator::ValidationError> {
    if body.trim().is_empty() {
        return Err(validator::ValidationError::new("blank_body"));
    }
    Ok(())
}
