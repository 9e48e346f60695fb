use std::time::Duration;

use reqwest::{Client, StatusCode};
use tokio::time::sleep;

use crate::{config, types::Track, warning};

/// Longest `Retry-After` the lookup is willing to sit out.
const MAX_RETRY_AFTER_SECS: u64 = 120;

/// Retrieves a single track from the Spotify Web API.
///
/// The artist and track names of the response are what the scraper needs to
/// build its page URL; see [`crate::types::ScrapeRequest`]'s `TryFrom<&Track>`.
///
/// # Arguments
///
/// * `track_id` - Spotify track id (22 base62 characters)
/// * `token` - Bearer token obtained by the caller
///
/// # Retry Logic
///
/// 502 Bad Gateway responses are retried after 10 seconds. A 429 Too Many
/// Requests response is retried once its `Retry-After` delay has passed,
/// unless that delay is unreasonably long, in which case the error is
/// returned.
pub async fn get_track(track_id: &str, token: &str) -> Result<Track, reqwest::Error> {
    let api_url = format!(
        "{uri}/tracks/{id}",
        uri = &config::spotify_apiurl(),
        id = track_id
    );
    let client = Client::new();

    loop {
        let response = client.get(&api_url).bearer_auth(token).send().await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(0);
            if retry_after <= MAX_RETRY_AFTER_SECS {
                sleep(Duration::from_secs(retry_after.max(1))).await;
                continue;
            }

            warning!(
                "Retry after has reached an abnormal high of {} seconds.",
                retry_after
            );
        }

        let response = match response.error_for_status() {
            Ok(valid_response) => valid_response,
            Err(err) => {
                if err.status() == Some(StatusCode::BAD_GATEWAY) {
                    sleep(Duration::from_secs(10)).await;
                    continue; // retry
                }
                return Err(err); // propagate other errors
            }
        };

        return response.json::<Track>().await;
    }
}
