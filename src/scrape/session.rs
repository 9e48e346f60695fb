//! Browser session configuration.
//!
//! A [`Launcher`] produces a ready [`Session`]: one browser process with one
//! page that has already been dressed up to look like a regular desktop
//! browser. The evasion settings are applied exactly once, before the first
//! navigation, and are never touched again for the lifetime of the session.

use std::path::PathBuf;

use async_trait::async_trait;
use chromiumoxide::{
    Browser, BrowserConfig, Page,
    cdp::browser_protocol::{
        network::{Headers, SetExtraHttpHeadersParams},
        page::{AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat},
    },
    handler::viewport::Viewport,
    page::ScreenshotParams,
};
use futures::StreamExt;
use serde_json::json;
use tokio::task::JoinHandle;

use crate::{
    config::ScraperConfig,
    types::{PageSnapshot, visible_text},
    warning,
};

use super::ScrapeError;

pub const VIEWPORT_WIDTH: u32 = 1920;
pub const VIEWPORT_HEIGHT: u32 = 1080;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Flags needed to run inside constrained containers and to drop the most
/// obvious automation hints.
pub const LAUNCH_ARGS: [&str; 5] = [
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--no-first-run",
];

/// Injected before any document script runs.
pub const STEALTH_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined, configurable: true });
delete Object.getPrototypeOf(navigator).webdriver;
window.chrome = window.chrome || {};
window.chrome.runtime = window.chrome.runtime || {};
"#;

const INNER_TEXT_SCRIPT: &str = "document.body ? document.body.innerText : ''";

pub fn request_headers() -> serde_json::Value {
    json!({
        "Accept": "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        "Accept-Language": "en-US,en;q=0.9",
        "DNT": "1",
        "Connection": "keep-alive",
        "Upgrade-Insecure-Requests": "1",
    })
}

/// A single page inside a live browser.
///
/// `close` consumes the session, so teardown can happen at most once.
#[async_trait]
pub trait Session: Send {
    /// Navigates and waits for the page to finish loading.
    async fn navigate(&mut self, url: &str) -> Result<(), ScrapeError>;

    /// Captures the rendered markup and visible text.
    async fn snapshot(&mut self) -> Result<PageSnapshot, ScrapeError>;

    /// Captures a PNG of the whole page.
    async fn screenshot(&mut self) -> Result<Vec<u8>, ScrapeError>;

    async fn close(self: Box<Self>);
}

#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn Session>, ScrapeError>;
}

/// Launches a local Chromium through the DevTools protocol.
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    executable: Option<PathBuf>,
    headless: bool,
}

impl ChromeLauncher {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            executable: config.chrome_executable.clone(),
            headless: config.headless,
        }
    }

    /// Fails with [`ScrapeError::Launch`] when no browser executable can be found.
    pub fn browser_config(&self) -> Result<BrowserConfig, ScrapeError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
            .viewport(Viewport {
                width: VIEWPORT_WIDTH,
                height: VIEWPORT_HEIGHT,
                ..Default::default()
            })
            .args(LAUNCH_ARGS);

        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &self.executable {
            builder = builder.chrome_executable(executable);
        }

        builder.build().map_err(ScrapeError::Launch)
    }
}

#[async_trait]
impl Launcher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn Session>, ScrapeError> {
        let config = self.browser_config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::Launch(e.to_string()))?;

        // The handler drives the CDP connection; the browser stalls without it.
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = match prepare_page(&browser).await {
            Ok(page) => page,
            Err(e) => {
                let session = ChromeSession {
                    browser,
                    page: None,
                    handler_task,
                };
                Box::new(session).close().await;
                return Err(e);
            }
        };

        Ok(Box::new(ChromeSession {
            browser,
            page: Some(page),
            handler_task,
        }))
    }
}

async fn prepare_page(browser: &Browser) -> Result<Page, ScrapeError> {
    let page = browser.new_page("about:blank").await?;
    page.set_user_agent(USER_AGENT).await?;
    page.execute(SetExtraHttpHeadersParams::new(Headers::new(request_headers())))
        .await?;
    page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
        .await?;
    Ok(page)
}

pub struct ChromeSession {
    browser: Browser,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
}

impl ChromeSession {
    fn page(&self) -> Result<&Page, ScrapeError> {
        self.page
            .as_ref()
            .ok_or_else(|| ScrapeError::Session("page is not available".to_string()))
    }
}

#[async_trait]
impl Session for ChromeSession {
    async fn navigate(&mut self, url: &str) -> Result<(), ScrapeError> {
        // `goto` resolves on the load event. Requests fired by page scripts
        // after that are covered by the dwell the retry loop takes.
        self.page()?
            .goto(url)
            .await
            .map_err(|e| ScrapeError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn snapshot(&mut self) -> Result<PageSnapshot, ScrapeError> {
        let page = self.page()?;
        let html = page.content().await?;
        let text = match page.evaluate(INNER_TEXT_SCRIPT).await?.into_value::<String>() {
            Ok(text) => text,
            Err(_) => visible_text(&scraper::Html::parse_document(&html)),
        };
        Ok(PageSnapshot::new(html, text))
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, ScrapeError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        Ok(self.page()?.screenshot(params).await?)
    }

    async fn close(self: Box<Self>) {
        let mut session = *self;
        if let Err(e) = session.browser.close().await {
            warning!("Failed to close browser: {}", e);
        }
        if let Err(e) = session.browser.wait().await {
            warning!("Failed to wait for browser exit: {}", e);
        }
        session.handler_task.abort();
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        // Browser's own Drop kills the child process if close() never ran.
        self.handler_task.abort();
    }
}
