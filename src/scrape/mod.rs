//! # Scrape Module
//!
//! Pulls the attribute record of one track out of a page that resists
//! automated access and only renders after its scripts ran.
//!
//! ```text
//! Launcher (session)  ──▶  build_track_url  ──▶  retry::run  ──▶  ScrapeResult
//!      │                                          │
//!      │                              extract + recommendations
//!      └────────────── session.close() on every exit path ─────────┘
//! ```
//!
//! - [`session`] launches Chromium with the fingerprint-evasion settings.
//! - [`retry`] navigates, detects block pages and backs off.
//! - [`extract`] and [`recommendations`] read the rendered DOM.
//!
//! The public entry points always return a [`ScrapeResult`]; no error or
//! panic escapes them. A panic inside the retry loop still closes the session
//! before it is reported.

pub mod error;
pub mod extract;
pub mod recommendations;
pub mod retry;
pub mod session;

use std::{any::Any, panic::AssertUnwindSafe};

use futures::FutureExt;

pub use error::ScrapeError;
pub use retry::{JitterPacer, LoopOutcome, NoPause, Pacer, PauseKind, RetryPolicy};
pub use session::{ChromeLauncher, Launcher, Session};

use crate::{
    config::ScraperConfig,
    info,
    types::{ScrapeRequest, ScrapeResult},
    utils, warning,
};

/// Error reported when every attempt ended without a record.
pub const EXHAUSTED_MESSAGE: &str = "Failed to extract data";

/// Scrapes one track with configuration taken from the environment.
pub async fn scrape(artist_name: &str, song_name: &str, track_id: &str) -> ScrapeResult {
    Scraper::new(ScraperConfig::from_env())
        .scrape(artist_name, song_name, track_id)
        .await
}

/// A configured scraper. Each call to [`Scraper::run`] uses its own browser
/// session, so one `Scraper` can serve concurrent requests.
pub struct Scraper {
    config: ScraperConfig,
    launcher: Box<dyn Launcher>,
    pacer: Box<dyn Pacer>,
}

impl Scraper {
    pub fn new(config: ScraperConfig) -> Self {
        let launcher = ChromeLauncher::new(&config);
        Self {
            config,
            launcher: Box::new(launcher),
            pacer: Box::new(JitterPacer),
        }
    }

    pub fn with_launcher(mut self, launcher: impl Launcher + 'static) -> Self {
        self.launcher = Box::new(launcher);
        self
    }

    pub fn with_pacer(mut self, pacer: impl Pacer + 'static) -> Self {
        self.pacer = Box::new(pacer);
        self
    }

    pub fn track_url(&self, request: &ScrapeRequest) -> String {
        utils::build_track_url(
            &self.config.base_url,
            &request.artist_name,
            &request.song_name,
            &request.track_id,
        )
    }

    pub async fn scrape(&self, artist_name: &str, song_name: &str, track_id: &str) -> ScrapeResult {
        match ScrapeRequest::new(artist_name, song_name, track_id) {
            Ok(request) => self.run(&request).await,
            Err(e) => self.failure(None, ScrapeError::InvalidRequest(e).to_string()),
        }
    }

    pub async fn run(&self, request: &ScrapeRequest) -> ScrapeResult {
        let outcome = AssertUnwindSafe(self.execute(request))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok((source_url, LoopOutcome::Succeeded { data, .. }))) => ScrapeResult::Success {
                source_url,
                data,
                screenshot: self.config.screenshot_path.clone(),
            },
            Ok(Ok((source_url, LoopOutcome::Exhausted { attempts, last_error }))) => {
                warning!(
                    "No data for {} after {} attempt(s), last error: {}",
                    source_url,
                    attempts,
                    last_error
                );
                self.failure(Some(source_url), EXHAUSTED_MESSAGE.to_string())
            }
            Ok(Err(e)) => {
                warning!("Scrape failed: {}", e);
                self.failure(None, e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warning!("Scrape panicked: {}", message);
                self.failure(None, message)
            }
        }
    }

    async fn execute(&self, request: &ScrapeRequest) -> Result<(String, LoopOutcome), ScrapeError> {
        let mut session = self.launcher.launch().await?;

        let source_url = self.track_url(request);
        info!("Scraping {}", source_url);

        let policy = RetryPolicy::from(&self.config);
        let outcome = AssertUnwindSafe(retry::run(
            session.as_mut(),
            &source_url,
            &policy,
            self.pacer.as_ref(),
        ))
        .catch_unwind()
        .await;
        session.close().await;

        match outcome {
            Ok(outcome) => Ok((source_url, outcome?)),
            Err(panic) => Err(ScrapeError::Panicked(panic_message(panic.as_ref()))),
        }
    }

    fn failure(&self, source_url: Option<String>, error: String) -> ScrapeResult {
        ScrapeResult::Failure {
            source_url,
            error,
            screenshot: self.config.screenshot_path.clone(),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "scrape panicked".to_string()
    }
}
