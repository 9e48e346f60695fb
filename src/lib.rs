//! Track Attribute Scraper Library
//!
//! This library extracts musical attributes (key, camelot code, BPM, energy and
//! friends) for a single track from a third-party page that only renders its
//! content after client-side script execution. It drives a headless Chromium
//! session, retries past rate-limit interstitials and reads a fixed schema of
//! fields from the rendered page.
//!
//! # Modules
//!
//! - `api` - HTTP endpoints forwarding scrape results
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `scrape` - Browser session, retry loop and field extraction
//! - `server` - Local HTTP server exposing the scraper
//! - `spotify` - Upstream track metadata lookup
//! - `types` - Data structures and type definitions
//! - `utils` - Slugs, URL building and other pure helpers
//!
//! # Example
//!
//! ```
//! use tunescrape::{config, scrape};
//!
//! #[tokio::main]
//! async fn main() -> tunescrape::Res<()> {
//!     config::load_env().await?;
//!     let result = scrape::scrape("Daft Punk", "One More Time", "0TyaAdfWWdTCBtCw3HrDwO").await;
//!     println!("{}", serde_json::to_string_pretty(&result)?);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod scrape;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// A convenient Result type alias for operations that may fail.
///
/// Used by the binary-facing glue (CLI commands, server startup) where any
/// error is reported to the user rather than matched on. The scrape core uses
/// [`scrape::ScrapeError`] instead.
///
/// # Example
///
/// ```
/// use tunescrape::Res;
///
/// async fn fetch_data() -> Res<String> {
///     Ok("data".to_string())
/// }
/// ```
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Navigating to {}", url);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Extracted attributes after {} attempt(s)", attempts);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only the binary uses this. Nothing under `scrape` may terminate the
/// process; failures there are reported through `ScrapeResult`.
///
/// # Example
///
/// ```
/// error!("Failed to load configuration");
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// # Example
///
/// ```
/// warning!("Block page detected on attempt {}", attempt);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
