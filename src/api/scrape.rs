use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::{config::ScraperConfig, scrape::Scraper, types::ScrapeRequest};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeQuery {
    pub artist: Option<String>,
    pub song: Option<String>,
    pub track_id: Option<String>,
}

pub async fn scrape(
    Query(params): Query<ScrapeQuery>,
    Extension(config): Extension<Arc<ScraperConfig>>,
) -> Response {
    let request = match ScrapeRequest::new(
        params.artist.as_deref().unwrap_or_default(),
        params.song.as_deref().unwrap_or_default(),
        params.track_id.as_deref().unwrap_or_default(),
    ) {
        Ok(request) => request,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": e })),
            )
                .into_response();
        }
    };

    let result = Scraper::new(config.as_ref().clone()).run(&request).await;
    let status = if result.is_success() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };

    (status, Json(result)).into_response()
}
