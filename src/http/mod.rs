use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod extract;
mod handlers;
mod routes;

pub use error::AppError;
pub use auth::AuthUser;
pub use extract::JsonBody;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .merge(routes::auth())
        .merge(routes::posts())
        .merge(routes::comments())
        .merge(routes::users())
        .merge(routes::chat())
        .with_state(state)
}
