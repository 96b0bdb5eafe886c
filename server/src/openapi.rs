use axum::Json;
use kernel::{DeleteReply, DeleteRequest, ErrorReply, ImagesReply, UploadReply};
use utoipa::OpenApi;

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::upload, handlers::delete_image, handlers::list_images),
    components(schemas(
        UploadReply,
        DeleteRequest,
        DeleteReply,
        ImagesReply,
        ErrorReply,
        handlers::UploadForm
    )),
    tags((name = "images", description = "Per user image storage API"))
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
