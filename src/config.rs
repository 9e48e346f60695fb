//! Configuration management for the track attribute scraper.
//!
//! This module handles loading and accessing configuration values from environment
//! variables and `.env` files. Every value has a default so the scraper runs
//! without any configuration at all.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use crate::warning;

pub const DEFAULT_BASE_URL: &str = "https://tunebat.com";
pub const DEFAULT_SCREENSHOT_PATH: &str = "debug-screenshot.png";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:3000";
pub const DEFAULT_SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";

/// Loads environment variables from a `.env` file in the local data directory.
///
/// The function looks for the `.env` file in:
/// - Linux: `~/.local/share/tunescrape/.env`
/// - macOS: `~/Library/Application Support/tunescrape/.env`
/// - Windows: `%LOCALAPPDATA%/tunescrape/.env`
///
/// A missing file is fine; variables already present in the process
/// environment are never overridden.
///
/// # Errors
///
/// Returns an error string if the directory cannot be created or the file
/// exists but cannot be parsed.
pub async fn load_env() -> Result<(), String> {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("tunescrape/.env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if !path.is_file() {
        return Ok(());
    }

    dotenv::from_path(&path).map_err(|e| format!("{}: {}", path.display(), e))
}

/// Settings consumed by a single scrape invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScraperConfig {
    pub base_url: String,
    pub screenshot_path: PathBuf,
    pub max_attempts: u32,
    pub navigation_timeout: Duration,
    pub chrome_executable: Option<PathBuf>,
    pub headless: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            screenshot_path: PathBuf::from(DEFAULT_SCREENSHOT_PATH),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            navigation_timeout: Duration::from_secs(DEFAULT_NAVIGATION_TIMEOUT_SECS),
            chrome_executable: None,
            headless: true,
        }
    }
}

impl ScraperConfig {
    /// Builds the configuration from the current environment.
    pub fn from_env() -> Self {
        Self {
            base_url: base_url(),
            screenshot_path: screenshot_path(),
            max_attempts: max_attempts(),
            navigation_timeout: navigation_timeout(),
            chrome_executable: chrome_executable(),
            headless: headless(),
        }
    }
}

/// Returns the base URL of the attribute site, without a trailing slash.
pub fn base_url() -> String {
    env::var("TUNESCRAPE_BASE_URL")
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

/// Returns the relative path the debug screenshot is written to.
pub fn screenshot_path() -> PathBuf {
    env::var("TUNESCRAPE_SCREENSHOT_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_SCREENSHOT_PATH))
}

/// Returns the total number of navigation attempts per scrape.
pub fn max_attempts() -> u32 {
    parsed_or("TUNESCRAPE_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS).max(1)
}

/// Returns the upper bound for a single navigation attempt.
pub fn navigation_timeout() -> Duration {
    Duration::from_secs(parsed_or(
        "TUNESCRAPE_NAVIGATION_TIMEOUT_SECS",
        DEFAULT_NAVIGATION_TIMEOUT_SECS,
    ))
}

/// Returns an explicit browser executable, if configured.
///
/// When unset, the executable is auto-detected at launch time.
pub fn chrome_executable() -> Option<PathBuf> {
    env::var("TUNESCRAPE_CHROME_EXECUTABLE")
        .ok()
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
}

/// Returns whether the browser runs without a window.
pub fn headless() -> bool {
    parsed_or("TUNESCRAPE_HEADLESS", true)
}

/// Returns the address the HTTP server binds to.
pub fn server_addr() -> String {
    env::var("SERVER_ADDRESS").unwrap_or_else(|_| DEFAULT_SERVER_ADDRESS.to_string())
}

/// Returns the Spotify Web API base URL used for track lookups.
pub fn spotify_apiurl() -> String {
    env::var("SPOTIFY_API_URL").unwrap_or_else(|_| DEFAULT_SPOTIFY_API_URL.to_string())
}

/// Returns a caller supplied Spotify bearer token.
///
/// Obtaining and refreshing the token happens outside this crate.
pub fn spotify_access_token() -> Option<String> {
    env::var("SPOTIFY_ACCESS_TOKEN")
        .ok()
        .filter(|token| !token.trim().is_empty())
}

fn parsed_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warning!("Ignoring invalid {}={:?}, using {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}
