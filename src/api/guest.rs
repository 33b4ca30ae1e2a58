/// Guest-mode draft endpoints
///
/// Anonymous clients identify themselves with an `X-Session-Id` header;
/// drafts live in memory until the user registers and imports them.
use crate::{
    context::AppContext,
    error::{ApiError, ApiResult},
    guest::{GuestItem, GuestList},
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

/// Build guest routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/api/guest-lists",
            post(add_list).get(get_lists).delete(clear_lists),
        )
        .route(
            "/api/guest-list/:id/guest-items",
            post(add_item).delete(clear_items),
        )
        .route("/api/guest-list/:id/guest-items/:list_id", get(get_items))
}

fn session_id(headers: &HeaderMap) -> ApiResult<String> {
    headers
        .get("x-session-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .ok_or_else(|| ApiError::Authentication("Missing X-Session-Id header".to_string()))
}

#[derive(Debug, Deserialize)]
struct GuestListRequest {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GuestItemRequest {
    #[serde(rename = "list_id")]
    list_id: i64,
    name: String,
    count: f64,
    #[serde(default)]
    purchased: bool,
}

/// Create a draft list for the guest session
async fn add_list(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(req): Json<GuestListRequest>,
) -> ApiResult<Json<GuestList>> {
    let session = session_id(&headers)?;

    Ok(Json(ctx.guest.add_list(&session, req.name)))
}

/// All draft lists of the guest session
async fn get_lists(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<GuestList>>> {
    let session = session_id(&headers)?;

    Ok(Json(ctx.guest.lists(&session)))
}

/// Forget the session's draft lists
async fn clear_lists(State(ctx): State<AppContext>, headers: HeaderMap) -> ApiResult<StatusCode> {
    let session = session_id(&headers)?;
    ctx.guest.clear_lists(&session);

    Ok(StatusCode::NO_CONTENT)
}

/// Add a draft item to one of the session's draft lists
async fn add_item(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(req): Json<GuestItemRequest>,
) -> ApiResult<Json<GuestItem>> {
    let session = session_id(&headers)?;

    Ok(Json(ctx.guest.add_item(
        &session,
        req.list_id,
        req.name,
        req.count,
        req.purchased,
    )))
}

/// Draft items of one draft list
async fn get_items(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Path((_id, list_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Vec<GuestItem>>> {
    let session = session_id(&headers)?;

    Ok(Json(ctx.guest.items(&session, list_id)))
}

/// Forget the session's draft items
async fn clear_items(State(ctx): State<AppContext>, headers: HeaderMap) -> ApiResult<StatusCode> {
    let session = session_id(&headers)?;
    ctx.guest.clear_items(&session);

    Ok(StatusCode::NO_CONTENT)
}
