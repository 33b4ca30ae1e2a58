/// Trolley - multi-user shopping list backend
///
/// Authenticated users keep named shopping lists, attach images to items,
/// and share lists with other users; guests can sketch lists in memory and
/// import them after registering.

mod account;
mod api;
mod auth;
mod blob_store;
mod config;
mod context;
mod db;
mod error;
mod guest;
mod images;
mod items;
mod lists;
mod server;

use config::ServerConfig;
use context::AppContext;
use error::ApiResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ApiResult<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trolley=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}
