use serde::{Deserialize, Serialize};

/// A "someone replied on your thread" notice, addressed to the thread's owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient_user_id: i64,
    pub thread_id: i64,
    pub comment_id: i64,
    pub message: String,
}

impl Notification {
    pub fn new_comment(recipient_user_id: i64, thread_id: i64, comment_id: i64, author: &str) -> Self {
        Self {
            recipient_user_id,
            thread_id,
            comment_id,
            message: format!("{author} left a comment on your thread."),
        }
    }
}
