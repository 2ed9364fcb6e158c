use axum::extract::FromRequest;

use crate::http::AppError;

/// `Json` whose rejections (bad syntax, wrong field types, missing
/// content type) answer 400 with the usual `{"error": ...}` body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);
