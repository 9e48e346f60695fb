use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tabled::Table;

use crate::{
    config::{self, ScraperConfig},
    error, info,
    scrape::Scraper,
    spotify, success,
    types::{RecommendationTableRow, ScrapeRequest, ScrapeResult},
    utils, warning,
};

/// Scrapes the attributes of one track and prints them.
///
/// # Arguments
///
/// * `artist` - Artist name as shown on the track page
/// * `song` - Song title
/// * `track_id` - Spotify track id, URI or URL
/// * `json` - Print the raw `ScrapeResult` JSON instead of tables
///
/// # Exit Status
///
/// Terminates with exit code 1 when the scrape fails.
pub async fn scrape(artist: String, song: String, track_id: String, json: bool) {
    let track_id = utils::spotify_track_id(&track_id).unwrap_or(track_id);
    let request = match ScrapeRequest::new(&artist, &song, &track_id) {
        Ok(request) => request,
        Err(e) => error!("Invalid request: {}", e),
    };

    run(&request, json).await;
}

/// Looks a track up on Spotify, then scrapes it.
///
/// Needs `SPOTIFY_ACCESS_TOKEN` to be set.
pub async fn lookup(track: String, json: bool) {
    let Some(track_id) = utils::spotify_track_id(&track) else {
        error!("Not a Spotify track id, URI or URL: {}", track);
    };

    let Some(token) = config::spotify_access_token() else {
        error!("SPOTIFY_ACCESS_TOKEN must be set for lookups");
    };

    let pb = ProgressBar::new_spinner();
    pb.set_message("Fetching track from Spotify...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );

    let track = match spotify::track::get_track(&track_id, &token).await {
        Ok(track) => {
            pb.finish_and_clear();
            track
        }
        Err(e) => {
            pb.finish_and_clear();
            error!("Failed to fetch track {}: {}", track_id, e);
        }
    };

    let request = match ScrapeRequest::try_from(&track) {
        Ok(request) => request,
        Err(e) => error!("Track {} is missing data: {}", track_id, e),
    };
    info!(
        "Found \"{}\" by {} on {}",
        request.song_name, request.artist_name, track.album.name
    );

    run(&request, json).await;
}

/// Prints the page URL a scrape would visit.
pub fn url(artist: String, song: String, track_id: String) {
    println!(
        "{}",
        utils::build_track_url(&config::base_url(), &artist, &song, &track_id)
    );
}

async fn run(request: &ScrapeRequest, json: bool) {
    let result = Scraper::new(ScraperConfig::from_env()).run(request).await;

    if json {
        match serde_json::to_string_pretty(&result) {
            Ok(out) => println!("{}", out),
            Err(e) => error!("Failed to serialize result: {}", e),
        }
        if !result.is_success() {
            std::process::exit(1);
        }
        return;
    }

    print_result(&result);
}

fn print_result(result: &ScrapeResult) {
    match result {
        ScrapeResult::Success {
            source_url,
            data,
            screenshot,
        } => {
            success!("Scraped {}", source_url);
            println!("{}", Table::new(data.table_rows()));

            if data.recommendations.is_empty() {
                warning!("No recommendations found.");
            } else {
                info!("{} recommendation(s):", data.recommendations.len());
                let rows: Vec<RecommendationTableRow> = data
                    .recommendations
                    .iter()
                    .map(RecommendationTableRow::from)
                    .collect();
                println!("{}", Table::new(rows));
            }
            info!("Debug screenshot: {}", screenshot.display());
        }
        ScrapeResult::Failure {
            source_url,
            error,
            screenshot,
        } => {
            if let Some(source_url) = source_url {
                info!("Source: {}", source_url);
                info!("Debug screenshot: {}", screenshot.display());
            }
            error!("Scrape failed: {}", error);
        }
    }
}
