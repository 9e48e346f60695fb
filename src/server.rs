use axum::{Extension, Router, routing::get};
use std::{net::SocketAddr, str::FromStr, sync::Arc};

use crate::{Res, api, config::ScraperConfig, info};

pub fn router(config: ScraperConfig) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/scrape", get(api::scrape))
        .layer(Extension(Arc::new(config)))
}

pub async fn start_api_server(addr: &str, config: ScraperConfig) -> Res<()> {
    let addr = SocketAddr::from_str(addr)
        .map_err(|e| format!("Failed to parse server address {}: {}", addr, e))?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, router(config)).await?;
    Ok(())
}
