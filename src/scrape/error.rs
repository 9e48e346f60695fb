use thiserror::Error;

/// Failure taxonomy of the scrape pipeline.
///
/// `BlockedPage`, `ExtractionEmpty` and `Navigation` describe single attempts
/// and are absorbed by the retry loop. `ExhaustedRetries` is the loop's
/// terminal failure. Everything else ends the loop early and reaches the
/// result assembler.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("blocked by a security check or rate limit page")]
    BlockedPage,

    #[error("page loaded but no title, artist or album was found")]
    ExtractionEmpty,

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("gave up after {attempts} attempt(s)")]
    ExhaustedRetries { attempts: u32 },

    #[error("browser session error: {0}")]
    Session(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A panic caught while the session was open. Carries the panic message.
    #[error("{0}")]
    Panicked(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    /// Whether the retry loop may try again after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScrapeError::BlockedPage | ScrapeError::ExtractionEmpty | ScrapeError::Navigation(_)
        )
    }
}

impl From<chromiumoxide::error::CdpError> for ScrapeError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        ScrapeError::Session(err.to_string())
    }
}
