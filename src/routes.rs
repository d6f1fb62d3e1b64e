// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handlers::comment, state::AppState, utils::jwt::auth_middleware};

/// Assembles the main application router.
///
/// * Reads are public; creating, editing and deleting comments require a Bearer token.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (comment service, config).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let comment_routes = Router::new()
        .route("/", post(comment::create_comment).route_layer(auth.clone()))
        .route("/thread/{thread_id}", get(comment::list_comments))
        .route(
            "/{id}",
            get(comment::get_comment).merge(
                put(comment::update_comment)
                    .delete(comment::delete_comment)
                    .route_layer(auth),
            ),
        );

    Router::new()
        .nest("/api/comments", comment_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
