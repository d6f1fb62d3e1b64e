// src/services/mod.rs

pub mod comment_service;
pub mod comment_tree;
pub mod errors;

pub use comment_service::{Actor, CommentService};
pub use errors::{CommentError, CommentResult};
