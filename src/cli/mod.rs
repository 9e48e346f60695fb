//! # CLI Module
//!
//! Command implementations behind the `tunescrape` binary. Each command
//! delegates to the scrape core, the Spotify lookup or the HTTP server and
//! takes care of presenting the outcome.
//!
//! ## Commands
//!
//! - [`scrape`] - Scrape one track given artist, song and track id
//! - [`lookup`] - Resolve a Spotify track first, then scrape it
//! - [`url`] - Print the page URL a scrape would visit
//! - [`serve`] - Expose the scraper over HTTP
//!
//! ## Usage Patterns
//!
//! ```bash
//! tunescrape scrape "Daft Punk" "One More Time" 0TyaAdfWWdTCBtCw3HrDwO
//! tunescrape lookup https://open.spotify.com/track/0TyaAdfWWdTCBtCw3HrDwO --json
//! tunescrape url "Daft Punk" "One More Time" 0TyaAdfWWdTCBtCw3HrDwO
//! tunescrape serve --addr 0.0.0.0:3000
//! ```
//!
//! ## Error Handling
//!
//! Commands terminate the process with exit code 1 through the `error!`
//! macro when they cannot produce a result.

mod scrape;
mod serve;

pub use scrape::lookup;
pub use scrape::scrape;
pub use scrape::url;
pub use serve::serve;
