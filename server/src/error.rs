use std::any::Any;
use std::io;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use kernel::ErrorReply;
use thiserror::Error;

pub const NO_FILE_UPLOADED: &str = "No file uploaded";
pub const UNEXPECTED_FIELD: &str = "Unexpected field";
pub const FILE_TOO_LARGE: &str = "File too large";
pub const NO_IMAGE_URL: &str = "No image URL provided";
pub const INVALID_IMAGE_URL: &str = "Invalid image URL";
pub const INVALID_JSON: &str = "Invalid JSON body";
pub const DELETE_FAILED: &str = "Failed to delete file";
pub const READ_DIR_FAILED: &str = "Failed to read directory";
pub const NO_USER_ID: &str = "No userID provided";
pub const INVALID_ROUTE: &str = "Invalid route";

/// Failures of the on-disk store.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid file name '{0}'")]
    InvalidFileName(String),

    #[error("'{0}' is outside of the user directory")]
    OutsideUserDir(String),

    #[error("'{0}' is not a regular file")]
    NotAFile(String),
}

/// Errors returned to HTTP clients as `{ "error": ... }`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Io(String),

    #[error("{0}")]
    Unhandled(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Io(_) | ApiError::Unhandled(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(ErrorReply::new(self.to_string()))).into_response()
    }
}

/// Renders a panic caught by the panic layer as a JSON 500.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_owned()
    } else {
        String::from("Unknown panic message")
    };
    tracing::error!("handler panicked: {message}");
    ApiError::Unhandled(message).into_response()
}

/// Re-renders a 413 produced outside the handlers (the request body limit) as JSON.
pub async fn payload_too_large_response(response: Response) -> Response {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .is_some_and(|v| v.as_bytes().starts_with(b"application/json"));
    if response.status() != StatusCode::PAYLOAD_TOO_LARGE || is_json {
        return response;
    }
    tracing::error!("request body exceeds the limit");
    ApiError::PayloadTooLarge(String::from(FILE_TOO_LARGE)).into_response()
}
