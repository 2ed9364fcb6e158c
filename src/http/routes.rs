use axum::extract::DefaultBodyLimit;
use axum::{routing::get, routing::post, Router};

use crate::app::images::{POST_IMAGE_LIMIT, PROFILE_IMAGE_LIMIT};
use crate::http::handlers;
use crate::AppState;

// Room for the text fields and multipart framing around the image.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

fn upload_limit(image_bytes: usize) -> DefaultBodyLimit {
    DefaultBodyLimit::max(image_bytes + FORM_OVERHEAD_BYTES)
}

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route(
            "/posts",
            get(handlers::list_feed)
                .post(handlers::create_post)
                .layer(upload_limit(POST_IMAGE_LIMIT.max_bytes)),
        )
        .route("/posts/:id", get(handlers::get_post))
        .route(
            "/posts/:id/update",
            post(handlers::update_post).layer(upload_limit(POST_IMAGE_LIMIT.max_bytes)),
        )
        .route("/posts/:id/delete", post(handlers::delete_post))
        .route("/posts/:id/like", post(handlers::like_post))
        .route("/posts/:id/dislike", post(handlers::dislike_post))
}

pub fn comments() -> Router<AppState> {
    Router::new()
        .route("/posts/:id/comment/add", post(handlers::add_comment))
        .route("/posts/:id/comment/get", get(handlers::get_comments))
        .route("/posts/:id/comment/like", post(handlers::comment_like_stub))
        .route("/comments/:id/like", post(handlers::like_comment))
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route("/me", get(handlers::me))
        .route(
            "/me/image",
            post(handlers::upload_profile_image).layer(upload_limit(PROFILE_IMAGE_LIMIT.max_bytes)),
        )
        .route("/users/:id", get(handlers::profile))
        .route("/users/:id/follow", post(handlers::follow_user))
}

pub fn chat() -> Router<AppState> {
    Router::new()
        .route("/chat", get(handlers::list_conversations))
        .route("/chat/:id", get(handlers::open_chat))
        .route("/chat/:id/send", post(handlers::send_message))
        .route("/chat/:id/get", get(handlers::get_messages))
}
