// src/handlers/comment.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use validator::Validate;

use crate::{
    error::AppError,
    models::comment::{CommentView, CreateCommentRequest, NewComment, UpdateCommentRequest},
    services::CommentService,
    utils::jwt::Claims,
};

/// JSON body for comment trees, encoded without recursing per reply level.
struct TreeJson(Vec<u8>);

impl TreeJson {
    fn forest(forest: &[CommentView]) -> Result<Self, AppError> {
        CommentView::forest_to_json(forest)
            .map(Self)
            .map_err(|e| AppError::InternalServerError(format!("Failed to encode comments: {}", e)))
    }

    fn single(view: &CommentView) -> Result<Self, AppError> {
        view.to_json()
            .map(Self)
            .map_err(|e| AppError::InternalServerError(format!("Failed to encode comment: {}", e)))
    }
}

impl IntoResponse for TreeJson {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, "application/json")], self.0).into_response()
    }
}

/// Create a comment or a reply.
/// The author is the logged-in user.
pub async fn create_comment(
    State(service): State<CommentService>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let comment = service
        .add_comment(NewComment {
            thread_id: payload.thread_id,
            parent_id: payload.parent_id,
            author: claims.username,
            body: payload.body,
        })
        .await?;

    Ok((StatusCode::CREATED, TreeJson::single(&comment)?))
}

/// List the comments of a thread, replies nested under their parent.
pub async fn list_comments(
    State(service): State<CommentService>,
    Path(thread_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let forest = service.list_comments(thread_id).await?;

    TreeJson::forest(&forest)
}

/// Get a single comment by ID, without its replies.
pub async fn get_comment(
    State(service): State<CommentService>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let comment = service.get_comment(id).await?;

    Ok(Json(comment))
}

/// Edit the body of a comment.
/// Requires: Login + Author.
pub async fn update_comment(
    State(service): State<CommentService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let comment = service
        .edit_comment(id, &payload.body, &claims.actor())
        .await?;

    TreeJson::single(&comment)
}

/// Delete a comment. Replies are kept.
/// Requires: Login + (Author OR Admin).
pub async fn delete_comment(
    State(service): State<CommentService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    service.remove_comment(id, &claims.actor()).await?;

    Ok(StatusCode::NO_CONTENT)
}
