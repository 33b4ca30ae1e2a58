/// Registration, login, and session endpoints
use crate::{
    account::Principal,
    auth,
    context::AppContext,
    error::ApiResult,
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{delete, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build user routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/auth", post(login).get(current_user))
        .route("/api/logout", delete(logout))
}

#[derive(Debug, Deserialize)]
struct CredentialsRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct UserResponse {
    #[serde(rename = "_id")]
    id: i64,
    email: String,
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    #[serde(rename = "_id")]
    id: i64,
    email: String,
    token: String,
}

/// Register a new user
async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<CredentialsRequest>,
) -> ApiResult<Json<UserResponse>> {
    let user = ctx.accounts.register(&req.email, &req.password).await?;

    Ok(Json(UserResponse {
        id: user.id,
        email: user.email,
    }))
}

/// Authenticate and open a session; the returned token goes into the
/// Authorization header of subsequent requests
async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<CredentialsRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let (user, session) = ctx.accounts.login(&req.email, &req.password).await?;

    Ok(Json(SessionResponse {
        id: user.id,
        email: user.email,
        token: session.token,
    }))
}

/// The currently logged-in user
async fn current_user(principal: Principal) -> Json<UserResponse> {
    Json(UserResponse {
        id: principal.user_id,
        email: principal.email,
    })
}

/// Delete the caller's session
async fn logout(State(ctx): State<AppContext>, headers: HeaderMap) -> ApiResult<StatusCode> {
    if let Some(token) = auth::extract_bearer_token(&headers) {
        ctx.accounts.logout(&token).await?;
    }

    Ok(StatusCode::OK)
}
