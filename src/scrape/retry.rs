//! Navigation retry loop.
//!
//! ```text
//! Attempting --block page--> Blocked --> Backoff --> Attempting
//!     |      --empty page--> (short pause) ------->  Attempting
//!     |      --nav error---> (long pause) -------->  Attempting
//!     |      --session lost--> (returned to the caller)
//!     +--record--> Succeeded        budget spent --> Exhausted
//! ```
//!
//! Navigation and page inspection each run under the navigation timeout, so
//! one attempt is bounded by twice that plus its pauses.
//!
//! Pauses go through a [`Pacer`] so tests can run the loop without waiting.

use std::{
    fmt,
    ops::RangeInclusive,
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use rand::Rng;

use crate::{
    config::ScraperConfig,
    info, success,
    types::{PageSnapshot, TrackAttributes},
    utils, warning,
};

use super::{ScrapeError, extract, session::Session};

/// The randomized waits a scrape performs, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseKind {
    /// Human-like dwell after a load before reading the page.
    AfterLoad,
    /// Backing off from a block page.
    Blocked,
    /// The page loaded but had nothing to extract.
    SoftFailure,
    /// Navigation threw.
    NavigationFailure,
}

impl PauseKind {
    pub fn window(&self) -> RangeInclusive<f64> {
        match self {
            PauseKind::AfterLoad => 4.0..=5.4,
            PauseKind::Blocked => 4.0..=6.0,
            PauseKind::SoftFailure => 2.5..=3.5,
            PauseKind::NavigationFailure => 4.5..=6.0,
        }
    }
}

#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, kind: PauseKind);
}

/// Sleeps for a uniformly random duration within the pause window.
#[derive(Debug, Clone, Copy, Default)]
pub struct JitterPacer;

#[async_trait]
impl Pacer for JitterPacer {
    async fn pause(&self, kind: PauseKind) {
        let secs = rand::rng().random_range(kind.window());
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }
}

/// Never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPause;

#[async_trait]
impl Pacer for NoPause {
    async fn pause(&self, _kind: PauseKind) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub navigation_timeout: Duration,
    /// Overwritten after every content inspection.
    pub screenshot_path: PathBuf,
}

impl From<&ScraperConfig> for RetryPolicy {
    fn from(config: &ScraperConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            navigation_timeout: config.navigation_timeout,
            screenshot_path: config.screenshot_path.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Attempting,
    Blocked,
    Backoff,
    Succeeded,
    Exhausted,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopState::Attempting => "attempting",
            LoopState::Blocked => "blocked",
            LoopState::Backoff => "backoff",
            LoopState::Succeeded => "succeeded",
            LoopState::Exhausted => "exhausted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutcome {
    Succeeded {
        attempts: u32,
        data: TrackAttributes,
    },
    /// Every attempt failed. `last_error` is the failure of the final attempt.
    Exhausted {
        attempts: u32,
        last_error: String,
    },
}

impl LoopOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            LoopOutcome::Succeeded { attempts, .. } | LoopOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }
}

fn log_state(state: LoopState, attempt: u32, max_attempts: u32) {
    info!("[{}/{}] {}", attempt, max_attempts, state);
}

/// Drives navigation until a record is extracted or the budget is spent.
///
/// Retryable failures never escape: they are logged and retried. A failure
/// the loop cannot recover from (see [`ScrapeError::is_retryable`]) ends it
/// immediately and is returned as the error. Screenshot failures are logged
/// and otherwise ignored.
pub async fn run(
    session: &mut dyn Session,
    url: &str,
    policy: &RetryPolicy,
    pacer: &dyn Pacer,
) -> Result<LoopOutcome, ScrapeError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut remaining = max_attempts;
    let mut attempt = 0;
    let mut last_error = ScrapeError::ExhaustedRetries {
        attempts: max_attempts,
    };

    while remaining > 0 {
        attempt += 1;
        remaining -= 1;
        log_state(LoopState::Attempting, attempt, max_attempts);

        let error = match try_once(session, url, policy, pacer).await {
            Ok(data) => {
                log_state(LoopState::Succeeded, attempt, max_attempts);
                success!("Extracted \"{}\" after {} attempt(s)", data.title, attempt);
                return Ok(LoopOutcome::Succeeded {
                    attempts: attempt,
                    data,
                });
            }
            Err(e) if !e.is_retryable() => {
                warning!("Attempt {} failed, giving up: {}", attempt, e);
                return Err(e);
            }
            Err(e) => e,
        };

        let pause = match &error {
            ScrapeError::BlockedPage => {
                log_state(LoopState::Blocked, attempt, max_attempts);
                PauseKind::Blocked
            }
            ScrapeError::ExtractionEmpty => {
                warning!("Attempt {}: no data found on page, retrying", attempt);
                PauseKind::SoftFailure
            }
            e => {
                warning!("Attempt {} failed: {}", attempt, e);
                PauseKind::NavigationFailure
            }
        };
        last_error = error;

        if remaining > 0 {
            if pause == PauseKind::Blocked {
                log_state(LoopState::Backoff, attempt, max_attempts);
            }
            pacer.pause(pause).await;
        }
    }

    log_state(LoopState::Exhausted, attempt, max_attempts);
    Ok(LoopOutcome::Exhausted {
        attempts: attempt,
        last_error: last_error.to_string(),
    })
}

/// Runs one stage of an attempt under the per-attempt deadline.
async fn within<T>(
    limit: Duration,
    stage: &str,
    work: impl Future<Output = Result<T, ScrapeError>>,
) -> Result<T, ScrapeError> {
    match tokio::time::timeout(limit, work).await {
        Ok(result) => result,
        Err(_) => Err(ScrapeError::Navigation(format!(
            "{} timed out after {}s",
            stage,
            limit.as_secs()
        ))),
    }
}

async fn try_once(
    session: &mut dyn Session,
    url: &str,
    policy: &RetryPolicy,
    pacer: &dyn Pacer,
) -> Result<TrackAttributes, ScrapeError> {
    within(policy.navigation_timeout, "navigation", session.navigate(url)).await?;

    // The dwell doubles as the settle time for late script-driven requests.
    pacer.pause(PauseKind::AfterLoad).await;

    let snapshot = within(
        policy.navigation_timeout,
        "page inspection",
        inspect(session, policy),
    )
    .await?;

    if utils::is_block_page(&snapshot.text) {
        return Err(ScrapeError::BlockedPage);
    }

    extract::extract_track(&snapshot).ok_or(ScrapeError::ExtractionEmpty)
}

async fn inspect(session: &mut dyn Session, policy: &RetryPolicy) -> Result<PageSnapshot, ScrapeError> {
    let snapshot = session
        .snapshot()
        .await
        .map_err(|e| ScrapeError::Navigation(e.to_string()))?;

    if let Err(e) = save_screenshot(session, &policy.screenshot_path).await {
        warning!(
            "Could not save debug screenshot to {}: {}",
            policy.screenshot_path.display(),
            e
        );
    }

    Ok(snapshot)
}

async fn save_screenshot(session: &mut dyn Session, path: &Path) -> Result<(), ScrapeError> {
    let bytes = session.screenshot().await?;
    async_fs::write(path, bytes).await?;
    Ok(())
}
