//! # API Module
//!
//! HTTP endpoints exposing the scraper to other processes.
//!
//! ## Endpoints
//!
//! - [`scrape`] - `GET /scrape?artist=&song=&trackId=` runs one scrape in its
//!   own browser session and returns the `ScrapeResult` JSON verbatim. Failed
//!   scrapes answer 502, missing parameters 400.
//! - [`health`] - `GET /health` returns application status and version.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use axum::{Router, routing::get};
//! use tunescrape::api::{health, scrape};
//!
//! let app = Router::new()
//!     .route("/scrape", get(scrape))
//!     .route("/health", get(health));
//! ```

mod health;
mod scrape;

pub use health::health;
pub use scrape::{ScrapeQuery, scrape};
