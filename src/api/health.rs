use std::sync::Arc;

use axum::{Extension, response::Json};
use serde_json::{Value, json};

use crate::config::ScraperConfig;

pub async fn health(Extension(config): Extension<Arc<ScraperConfig>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "baseUrl": config.base_url,
        "maxAttempts": config.max_attempts,
    }))
}
