/// Shopping list endpoints
use crate::{
    account::Principal,
    api::items::ItemResponse,
    context::AppContext,
    error::ApiResult,
    lists::{ItemDraft, List, ListDraft, ListSummary},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Build list routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/list", get(get_lists).post(add_list))
        .route("/api/list/import", post(import_lists))
        .route(
            "/api/list/:list_id",
            get(get_list)
                .put(update_list)
                .post(share_list)
                .delete(remove_list),
        )
}

#[derive(Debug, Deserialize)]
struct ListRequest {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ShareRequest {
    email: String,
}

#[derive(Debug, Deserialize)]
struct ImportListRequest {
    name: String,
    #[serde(default)]
    items: Vec<ImportItemRequest>,
}

#[derive(Debug, Deserialize)]
struct ImportItemRequest {
    name: String,
    count: f64,
    #[serde(default)]
    purchased: bool,
}

/// A list as shown in the overview
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(rename = "_id")]
    id: i64,
    name: String,
    owner_id: i64,
    items_count: i64,
}

/// A list with its items
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListDetailResponse {
    #[serde(rename = "_id")]
    id: i64,
    name: String,
    owner_id: i64,
    items: Vec<ItemResponse>,
}

impl From<ListSummary> for ListResponse {
    fn from(value: ListSummary) -> Self {
        ListResponse {
            id: value.id,
            name: value.name,
            owner_id: value.owner_id,
            items_count: value.items_count,
        }
    }
}

impl From<List> for ListResponse {
    fn from(value: List) -> Self {
        ListResponse {
            id: value.id,
            name: value.name,
            owner_id: value.owner_id,
            items_count: 0,
        }
    }
}

/// Create a new list owned by the caller
async fn add_list(
    State(ctx): State<AppContext>,
    principal: Principal,
    Json(req): Json<ListRequest>,
) -> ApiResult<Json<ListResponse>> {
    let list = ctx.lists.create(&principal, &req.name).await?;

    Ok(Json(list.into()))
}

/// All lists the caller owns or has been shared
async fn get_lists(
    State(ctx): State<AppContext>,
    principal: Principal,
) -> ApiResult<Json<Vec<ListResponse>>> {
    let lists = ctx.lists.list_accessible(&principal).await?;

    Ok(Json(lists.into_iter().map(ListResponse::from).collect()))
}

/// One list together with its items
async fn get_list(
    State(ctx): State<AppContext>,
    principal: Principal,
    Path(list_id): Path<i64>,
) -> ApiResult<Json<ListDetailResponse>> {
    let list = ctx.lists.require_access(list_id, &principal).await?;
    let items = ctx.items.list_for(list_id, &principal).await?;

    Ok(Json(ListDetailResponse {
        id: list.id,
        name: list.name,
        owner_id: list.owner_id,
        items: items.into_iter().map(ItemResponse::from).collect(),
    }))
}

/// Rename a list
async fn update_list(
    State(ctx): State<AppContext>,
    principal: Principal,
    Path(list_id): Path<i64>,
    Json(req): Json<ListRequest>,
) -> ApiResult<Json<ListResponse>> {
    let list = ctx.lists.rename(list_id, &principal, &req.name).await?;

    Ok(Json(list.into()))
}

/// Share a list with another user by email
async fn share_list(
    State(ctx): State<AppContext>,
    principal: Principal,
    Path(list_id): Path<i64>,
    Json(req): Json<ShareRequest>,
) -> ApiResult<Json<Value>> {
    ctx.lists.share(list_id, &principal, &req.email).await?;

    Ok(Json(json!({ "message": "shared" })))
}

/// Remove a list; image blobs of cascaded items are swept afterwards
async fn remove_list(
    State(ctx): State<AppContext>,
    principal: Principal,
    Path(list_id): Path<i64>,
) -> ApiResult<StatusCode> {
    let cascaded = ctx.lists.remove(list_id, &principal).await?;

    ctx.images
        .remove_blobs(cascaded.owner_id, &cascaded.stored_names)
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Import guest drafts carried over from the browser after login
async fn import_lists(
    State(ctx): State<AppContext>,
    principal: Principal,
    Json(req): Json<Vec<ImportListRequest>>,
) -> ApiResult<StatusCode> {
    let drafts = req
        .into_iter()
        .map(|list| ListDraft {
            name: list.name,
            items: list
                .items
                .into_iter()
                .map(|item| ItemDraft {
                    name: item.name,
                    count: item.count,
                    purchased: item.purchased,
                })
                .collect(),
        })
        .collect();

    ctx.lists.import(&principal, drafts).await?;

    Ok(StatusCode::OK)
}
