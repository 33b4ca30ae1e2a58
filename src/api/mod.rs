/// API routes and handlers
pub mod guest;
pub mod images;
pub mod items;
pub mod lists;
pub mod users;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(users::routes())
        .merge(lists::routes())
        .merge(items::routes())
        .merge(images::routes())
        .merge(guest::routes())
}
