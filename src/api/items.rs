/// Item endpoints
use crate::{
    account::Principal,
    context::AppContext,
    error::ApiResult,
    items::{ItemInput, ItemWithImage},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build item routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/list/:list_id/items", get(get_items).post(add_item))
        .route(
            "/api/list/:list_id/items/:item_id",
            get(get_item).put(update_item).delete(remove_item),
        )
}

#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    pub name: String,
    pub count: f64,
    #[serde(default)]
    pub purchased: bool,
}

/// An item as the frontend sees it
#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: i64,
    pub name: String,
    pub count: f64,
    #[serde(rename = "list_id")]
    pub list_id: i64,
    pub purchased: bool,
    pub image: Option<ImageRef>,
}

/// Reference to an item's image; `url` is where the bytes are served
#[derive(Debug, Serialize)]
pub struct ImageRef {
    pub id: i64,
    pub url: String,
    #[serde(rename = "items_id")]
    pub items_id: i64,
}

impl From<ItemWithImage> for ItemResponse {
    fn from(value: ItemWithImage) -> Self {
        let image = value.image_id.map(|id| ImageRef {
            id,
            url: format!("/api/images/{}", id),
            items_id: value.item.id,
        });

        ItemResponse {
            id: value.item.id,
            name: value.item.name,
            count: value.item.count,
            list_id: value.item.list_id,
            purchased: value.item.purchased,
            image,
        }
    }
}

impl From<ItemRequest> for ItemInput {
    fn from(value: ItemRequest) -> Self {
        ItemInput {
            name: value.name,
            count: value.count,
            purchased: value.purchased,
        }
    }
}

/// All items of a list
async fn get_items(
    State(ctx): State<AppContext>,
    principal: Principal,
    Path(list_id): Path<i64>,
) -> ApiResult<Json<Vec<ItemResponse>>> {
    let items = ctx.items.list_for(list_id, &principal).await?;

    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

/// Add an item to a list
async fn add_item(
    State(ctx): State<AppContext>,
    principal: Principal,
    Path(list_id): Path<i64>,
    Json(req): Json<ItemRequest>,
) -> ApiResult<Json<ItemResponse>> {
    let created = ctx.items.add(list_id, &principal, req.into()).await?;

    Ok(Json(created.into()))
}

/// A single item
async fn get_item(
    State(ctx): State<AppContext>,
    principal: Principal,
    Path((_list_id, item_id)): Path<(i64, i64)>,
) -> ApiResult<Json<ItemResponse>> {
    let item = ctx.items.get(item_id, &principal).await?;

    Ok(Json(item.into()))
}

/// Update an item's fields
async fn update_item(
    State(ctx): State<AppContext>,
    principal: Principal,
    Path((_list_id, item_id)): Path<(i64, i64)>,
    Json(req): Json<ItemRequest>,
) -> ApiResult<Json<ItemResponse>> {
    let updated = ctx.items.update(item_id, &principal, req.into()).await?;

    Ok(Json(updated.into()))
}

/// Delete an item.
///
/// The image goes first so its blob is cleaned up; an item without an
/// image passes straight through.
async fn remove_item(
    State(ctx): State<AppContext>,
    principal: Principal,
    Path((_list_id, item_id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    ctx.images.delete_for_item(item_id, &principal).await?;
    ctx.items.remove(item_id, &principal).await?;

    Ok(StatusCode::NO_CONTENT)
}
