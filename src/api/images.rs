/// Item image endpoints: upload, serve, delete
use crate::{
    account::Principal,
    api::items::ItemResponse,
    blob_store::ByteStream,
    context::AppContext,
    error::{ApiError, ApiResult},
    images::{ImageUpload, MAX_IMAGE_BYTES},
};
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::{get, put},
    Json, Router,
};
use futures::TryStreamExt;
use tokio_util::io::ReaderStream;

/// Build image routes.
///
/// The default body limit is raised past the image cap so the upload
/// reaches the coordinator, where the exact limit is enforced; the
/// slack covers multipart framing.
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/api/list/:list_id/items/:item_id/image",
            put(upload_item_image).delete(delete_item_image),
        )
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES as usize + 64 * 1024))
        .route("/api/images/:image_id", get(get_image))
}

/// Store or replace an item's image from a `file` multipart part and
/// return the updated item
async fn upload_item_image(
    State(ctx): State<AppContext>,
    principal: Principal,
    Path((_list_id, item_id)): Path<(i64, i64)>,
    mut multipart: Multipart,
) -> ApiResult<Json<ItemResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Internal(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().map(String::from);
        let content_type = field.content_type().map(String::from);
        let body: ByteStream<'_> = Box::pin(
            field.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e)),
        );

        ctx.images
            .upload_or_replace(
                item_id,
                Some(ImageUpload {
                    original_name,
                    content_type,
                    body,
                }),
                &principal,
            )
            .await?;

        break;
    }

    // Re-read the item so the response carries the fresh image reference
    let item = ctx.items.get(item_id, &principal).await?;

    Ok(Json(item.into()))
}

/// Serve image bytes with the canonical MIME as Content-Type
async fn get_image(
    State(ctx): State<AppContext>,
    principal: Principal,
    Path(image_id): Path<i64>,
) -> ApiResult<Response> {
    let (reader, mime) = ctx.images.load(image_id, &principal).await?;

    let body = Body::from_stream(ReaderStream::new(reader.file));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime)
        .header(header::CONTENT_LENGTH, reader.size.to_string())
        .body(body)
        .map_err(|e| ApiError::Internal(format!("failed to build response: {}", e)))
}

/// Remove an item's image
async fn delete_item_image(
    State(ctx): State<AppContext>,
    principal: Principal,
    Path((_list_id, item_id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    ctx.images.delete_for_item(item_id, &principal).await?;

    Ok(StatusCode::NO_CONTENT)
}
