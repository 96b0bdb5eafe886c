#![allow(clippy::unused_async)]
use std::io;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use kernel::{DeleteReply, DeleteRequest, ErrorReply, ImagesReply, UploadReply};
use url::Url;
use utoipa::ToSchema;

use crate::disk::DiskStorage;
use crate::domain::Storage;
use crate::error::{
    ApiError, StorageError, DELETE_FAILED, FILE_TOO_LARGE, INVALID_IMAGE_URL, INVALID_JSON,
    INVALID_ROUTE, NO_FILE_UPLOADED, NO_IMAGE_URL, READ_DIR_FAILED, UNEXPECTED_FIELD,
};
use crate::user::UserContext;
use crate::AppState;

/// Multipart field that carries the uploaded image.
pub const IMAGE_FIELD: &str = "image";

/// Largest accepted image, 500 KiB.
pub const MAX_FILE_SIZE: usize = 500 * 1024;

/// Multipart upload form.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// Image file content
    #[schema(value_type = String, format = Binary)]
    image: Vec<u8>,
}

/// Stores a single image for the current user.
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image stored", body = UploadReply),
        (status = 400, description = "No file or unexpected field", body = ErrorReply),
        (status = 413, description = "File exceeds 500 KiB", body = ErrorReply),
        (status = 500, description = "Server error", body = ErrorReply)
    ),
    tag = "images",
)]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadReply>, ApiError> {
    // a request that is not multipart at all carries no file either
    let mut multipart = multipart.map_err(|e| {
        tracing::error!("upload is not a multipart request: {e}");
        ApiError::validation(NO_FILE_UPLOADED)
    })?;
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        // plain form values are not files
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        if field.name() != Some(IMAGE_FIELD) || upload.is_some() {
            tracing::error!(
                "unexpected file field '{}' ({file_name})",
                field.name().unwrap_or_default()
            );
            return Err(ApiError::validation(UNEXPECTED_FIELD));
        }
        let data = read_field(field, MAX_FILE_SIZE).await?;
        upload = Some((file_name, data));
    }

    let Some((file_name, data)) = upload else {
        tracing::error!("upload without '{IMAGE_FIELD}' file");
        return Err(ApiError::validation(NO_FILE_UPLOADED));
    };

    let user_id = user.user_id.clone();
    let read_bytes = data.len();
    let stored = execute(&state, move |storage| {
        storage.store(&user_id, &file_name, &data)
    })
    .await
    .map_err(|e| {
        tracing::error!("file not stored. Error: {e}");
        match e {
            StorageError::InvalidFileName(name) => {
                ApiError::validation(format!("Invalid file name '{name}'"))
            }
            e => ApiError::io(e.to_string()),
        }
    })?;

    tracing::info!(
        "file: {} read: {} stored as: {}",
        stored.path.display(),
        read_bytes,
        stored.name
    );
    let url = state.config.file_url(&user.user_id, &stored.name);
    Ok(Json(UploadReply { url }))
}

/// Deletes an image by the URL it is served under.
#[utoipa::path(
    delete,
    path = "/delete",
    request_body = DeleteRequest,
    responses(
        (status = 200, description = "File deleted", body = DeleteReply),
        (status = 400, description = "Missing or invalid image URL", body = ErrorReply),
        (status = 500, description = "File could not be deleted", body = ErrorReply)
    ),
    tag = "images",
)]
pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    body: Bytes,
) -> Result<Json<DeleteReply>, ApiError> {
    let request = parse_delete_request(&body)?;
    let image_url = request
        .image_url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::validation(NO_IMAGE_URL))?;
    let file_name = file_name_from_url(&image_url).ok_or_else(|| {
        tracing::error!("cannot extract file name from '{image_url}'");
        ApiError::validation(INVALID_IMAGE_URL)
    })?;

    let user_id = user.user_id.clone();
    let name = file_name.clone();
    execute(&state, move |storage| storage.delete(&user_id, &name))
        .await
        .map_err(|e| {
            tracing::error!("file '{file_name}' not deleted. Error: {e}");
            match e {
                StorageError::InvalidFileName(_) | StorageError::OutsideUserDir(_) => {
                    ApiError::validation(INVALID_IMAGE_URL)
                }
                _ => ApiError::io(DELETE_FAILED),
            }
        })?;

    tracing::info!("file: {file_name} deleted");
    Ok(Json(DeleteReply {
        message: String::from("File deleted successfully"),
    }))
}

/// Lists URLs of all images of the current user.
#[utoipa::path(
    get,
    path = "/images",
    responses(
        (status = 200, description = "Images listed", body = ImagesReply),
        (status = 400, description = "No user", body = ErrorReply),
        (status = 500, description = "User directory cannot be read", body = ErrorReply)
    ),
    tag = "images",
)]
pub async fn list_images(
    State(state): State<Arc<AppState>>,
    user: UserContext,
) -> Result<Json<ImagesReply>, ApiError> {
    let user_id = user.user_id.clone();
    let files = execute(&state, move |storage| storage.list(&user_id))
        .await
        .map_err(|e| {
            tracing::error!("user '{}' directory not read. Error: {e}", user.user_id);
            ApiError::io(READ_DIR_FAILED)
        })?;

    tracing::info!("user: {} files: {}", user.user_id, files.len());
    let images = files
        .iter()
        .map(|f| state.config.file_url(&user.user_id, &f.name))
        .collect();
    Ok(Json(ImagesReply { images }))
}

pub async fn invalid_route() -> ApiError {
    ApiError::NotFound(String::from(INVALID_ROUTE))
}

/// Runs a storage call on the blocking pool.
async fn execute<F, R>(state: &Arc<AppState>, action: F) -> Result<R, StorageError>
where
    F: FnOnce(&DiskStorage) -> Result<R, StorageError> + Send + 'static,
    R: Send + 'static,
{
    let state = Arc::clone(state);
    let start = Instant::now();
    let result = tokio::task::spawn_blocking(move || action(&state.storage)).await;
    tracing::debug!("storage operation time: {:?}", start.elapsed());
    match result {
        Ok(r) => r,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(io::Error::other(e).into()),
    }
}

async fn read_field(mut field: Field<'_>, limit: usize) -> Result<Vec<u8>, ApiError> {
    let mut buffer = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if buffer.len() + chunk.len() > limit {
            tracing::error!("file exceeds {limit} bytes");
            return Err(ApiError::PayloadTooLarge(String::from(FILE_TOO_LARGE)));
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer)
}

fn multipart_error(e: MultipartError) -> ApiError {
    tracing::error!("multipart error: {e}");
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(String::from(FILE_TOO_LARGE))
    } else {
        ApiError::validation(e.body_text())
    }
}

fn parse_delete_request(body: &[u8]) -> Result<DeleteRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(DeleteRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        tracing::error!("delete request body: {e}");
        ApiError::validation(INVALID_JSON)
    })
}

/// Decoded last path segment of an image URL.
fn file_name_from_url(image_url: &str) -> Option<String> {
    let url = Url::parse(image_url).ok()?;
    let segment = url.path_segments()?.next_back()?;
    let name = urlencoding::decode(segment).ok()?;
    if name.is_empty() {
        None
    } else {
        Some(name.into_owned())
    }
}
