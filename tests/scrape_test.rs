use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tunescrape::{
    config::ScraperConfig,
    scrape::{
        EXHAUSTED_MESSAGE, Launcher, LoopOutcome, NoPause, Pacer, PauseKind, RetryPolicy,
        ScrapeError, Scraper, Session, retry,
    },
    types::PageSnapshot,
};

const TRACK_PAGE: &str = r#"<html><body>
    <h1>One More Time</h1>
    <div class="track-artist">Daft Punk</div>
    <div class="track-album">Discovery</div>
    <p>Key: F Minor</p>
    <p>120 BPM</p>
    <p>Energy: 75 Energy</p>
    </body></html>"#;

const BLOCK_PAGE: &str =
    "<html><body><h1>Security Check</h1><p>Checking your browser.</p></body></html>";

const EMPTY_PAGE: &str = "<html><body><p>Loading...</p></body></html>";

#[derive(Clone)]
enum Step {
    Page(&'static str),
    NavError,
    Hang,
    Panic,
    SessionLost,
    FrozenRenderer,
}

#[derive(Default)]
struct Probe {
    launches: AtomicUsize,
    navigations: AtomicUsize,
    snapshots: AtomicUsize,
    closes: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

struct MockSession {
    steps: Arc<Mutex<VecDeque<Step>>>,
    current: Option<Step>,
    probe: Arc<Probe>,
}

#[async_trait]
impl Session for MockSession {
    async fn navigate(&mut self, url: &str) -> Result<(), ScrapeError> {
        self.probe.navigations.fetch_add(1, Ordering::SeqCst);
        self.probe.urls.lock().unwrap().push(url.to_string());

        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Page(EMPTY_PAGE));

        match step {
            Step::NavError => Err(ScrapeError::Navigation("net::ERR_CONNECTION_RESET".into())),
            Step::Hang => {
                futures::future::pending::<()>().await;
                Ok(())
            }
            Step::Panic => panic!("renderer crashed"),
            Step::SessionLost => Err(ScrapeError::Session("target closed".into())),
            page => {
                self.current = Some(page);
                Ok(())
            }
        }
    }

    async fn snapshot(&mut self) -> Result<PageSnapshot, ScrapeError> {
        self.probe.snapshots.fetch_add(1, Ordering::SeqCst);
        match &self.current {
            Some(Step::FrozenRenderer) => {
                futures::future::pending::<()>().await;
                Ok(PageSnapshot::default())
            }
            Some(Step::Page(html)) => Ok(PageSnapshot::from_html(html)),
            _ => Err(ScrapeError::Session("no page loaded".into())),
        }
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, ScrapeError> {
        Ok(b"\x89PNG mock".to_vec())
    }

    async fn close(self: Box<Self>) {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
    }
}

struct MockLauncher {
    steps: Arc<Mutex<VecDeque<Step>>>,
    probe: Arc<Probe>,
    fail: bool,
}

impl MockLauncher {
    fn new(steps: Vec<Step>) -> (Self, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        let launcher = Self {
            steps: Arc::new(Mutex::new(steps.into())),
            probe: probe.clone(),
            fail: false,
        };
        (launcher, probe)
    }

    fn failing() -> (Self, Arc<Probe>) {
        let (mut launcher, probe) = Self::new(Vec::new());
        launcher.fail = true;
        (launcher, probe)
    }

    fn session(&self) -> MockSession {
        MockSession {
            steps: self.steps.clone(),
            current: None,
            probe: self.probe.clone(),
        }
    }
}

#[async_trait]
impl Launcher for MockLauncher {
    async fn launch(&self) -> Result<Box<dyn Session>, ScrapeError> {
        self.probe.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ScrapeError::Launch("chrome not found".into()));
        }
        Ok(Box::new(self.session()))
    }
}

#[derive(Clone, Default)]
struct RecordingPacer {
    pauses: Arc<Mutex<Vec<PauseKind>>>,
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, kind: PauseKind) {
        self.pauses.lock().unwrap().push(kind);
    }
}

fn test_config(dir: &tempfile::TempDir) -> ScraperConfig {
    ScraperConfig {
        base_url: "https://tunebat.com".to_string(),
        screenshot_path: dir.path().join("debug-screenshot.png"),
        max_attempts: 3,
        navigation_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_daft_punk_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let (launcher, probe) = MockLauncher::new(vec![Step::Page(TRACK_PAGE)]);
    let scraper = Scraper::new(test_config(&dir))
        .with_launcher(launcher)
        .with_pacer(NoPause);

    let result = scraper
        .scrape("Daft Punk", "One More Time", "0TyaAdfWWdTCBtCw3HrDwO")
        .await;

    assert!(result.is_success());
    assert_eq!(
        result.source_url(),
        Some("https://tunebat.com/Info/One-More-Time-Daft-Punk/0TyaAdfWWdTCBtCw3HrDwO")
    );
    let data = result.data().unwrap();
    assert_eq!(data.title, "One More Time");
    assert_eq!(data.key, "F Minor");
    assert_eq!(data.bpm, "120");
    assert_eq!(data.energy, "75");

    assert_eq!(probe.navigations.load(Ordering::SeqCst), 1);
    assert_eq!(probe.closes.load(Ordering::SeqCst), 1);

    let screenshot = std::fs::read(result.screenshot()).unwrap();
    assert_eq!(screenshot, b"\x89PNG mock");

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["key"], "F Minor");
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn test_always_blocked_exhausts_exactly_three_attempts() {
    let dir = tempfile::tempdir().unwrap();
    let (launcher, probe) = MockLauncher::new(vec![Step::Page(BLOCK_PAGE); 5]);
    let pacer = RecordingPacer::default();
    let scraper = Scraper::new(test_config(&dir))
        .with_launcher(launcher)
        .with_pacer(pacer.clone());

    let result = scraper.scrape("Daft Punk", "One More Time", "id").await;

    assert!(!result.is_success());
    assert_eq!(result.error(), Some(EXHAUSTED_MESSAGE));
    assert!(result.source_url().is_some());
    assert_eq!(probe.navigations.load(Ordering::SeqCst), 3);
    assert_eq!(probe.closes.load(Ordering::SeqCst), 1);

    // No backoff after the final attempt.
    assert_eq!(
        *pacer.pauses.lock().unwrap(),
        vec![
            PauseKind::AfterLoad,
            PauseKind::Blocked,
            PauseKind::AfterLoad,
            PauseKind::Blocked,
            PauseKind::AfterLoad,
        ]
    );

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["data"], serde_json::json!({}));
    assert_eq!(json["error"], EXHAUSTED_MESSAGE);
}

#[tokio::test]
async fn test_success_on_second_attempt() {
    let (launcher, probe) = MockLauncher::new(vec![Step::Page(EMPTY_PAGE), Step::Page(TRACK_PAGE)]);
    let pacer = RecordingPacer::default();
    let dir = tempfile::tempdir().unwrap();
    let policy = RetryPolicy::from(&test_config(&dir));

    let mut session = launcher.launch().await.unwrap();
    let outcome = retry::run(session.as_mut(), "https://tunebat.com/Info/x/y", &policy, &pacer)
        .await
        .unwrap();
    session.close().await;

    match outcome {
        LoopOutcome::Succeeded { attempts, data } => {
            assert_eq!(attempts, 2);
            assert_eq!(data.artist, "Daft Punk");
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(probe.navigations.load(Ordering::SeqCst), 2);
    assert_eq!(
        *pacer.pauses.lock().unwrap(),
        vec![
            PauseKind::AfterLoad,
            PauseKind::SoftFailure,
            PauseKind::AfterLoad
        ]
    );
}

#[tokio::test]
async fn test_navigation_errors_are_retried() {
    let (launcher, probe) = MockLauncher::new(vec![Step::NavError, Step::Page(TRACK_PAGE)]);
    let pacer = RecordingPacer::default();
    let dir = tempfile::tempdir().unwrap();
    let policy = RetryPolicy::from(&test_config(&dir));

    let mut session = launcher.launch().await.unwrap();
    let outcome = retry::run(session.as_mut(), "https://tunebat.com/Info/x/y", &policy, &pacer)
        .await
        .unwrap();

    assert_eq!(outcome.attempts(), 2);
    assert!(matches!(outcome, LoopOutcome::Succeeded { .. }));
    assert_eq!(probe.navigations.load(Ordering::SeqCst), 2);
    assert_eq!(
        pacer.pauses.lock().unwrap()[0],
        PauseKind::NavigationFailure
    );
}

#[tokio::test(start_paused = true)]
async fn test_navigation_timeout_counts_as_failed_attempt() {
    let (launcher, probe) = MockLauncher::new(vec![Step::Hang, Step::Hang, Step::Hang]);
    let dir = tempfile::tempdir().unwrap();
    let policy = RetryPolicy::from(&test_config(&dir));

    let mut session = launcher.launch().await.unwrap();
    let outcome = retry::run(session.as_mut(), "https://tunebat.com/Info/x/y", &policy, &NoPause)
        .await
        .unwrap();

    match outcome {
        LoopOutcome::Exhausted {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("timed out"), "{}", last_error);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(probe.navigations.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_launch_failure_has_no_source_url() {
    let dir = tempfile::tempdir().unwrap();
    let (launcher, probe) = MockLauncher::failing();
    let scraper = Scraper::new(test_config(&dir))
        .with_launcher(launcher)
        .with_pacer(NoPause);

    let result = scraper.scrape("Daft Punk", "One More Time", "id").await;

    assert!(!result.is_success());
    assert_eq!(result.source_url(), None);
    assert!(result.error().unwrap().contains("chrome not found"));
    assert_eq!(probe.navigations.load(Ordering::SeqCst), 0);
    assert_eq!(probe.closes.load(Ordering::SeqCst), 0);

    let json = serde_json::to_value(&result).unwrap();
    assert!(json.get("sourceUrl").is_none());
    assert!(json.get("data").is_none());
}

#[tokio::test]
async fn test_blank_input_never_launches() {
    let dir = tempfile::tempdir().unwrap();
    let (launcher, probe) = MockLauncher::new(vec![Step::Page(TRACK_PAGE)]);
    let scraper = Scraper::new(test_config(&dir))
        .with_launcher(launcher)
        .with_pacer(NoPause);

    let result = scraper.scrape("Daft Punk", "   ", "id").await;

    assert!(!result.is_success());
    assert!(result.error().unwrap().contains("song name"));
    assert_eq!(probe.launches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_panic_becomes_failure_result() {
    let dir = tempfile::tempdir().unwrap();
    let (launcher, probe) = MockLauncher::new(vec![Step::Panic]);
    let scraper = Scraper::new(test_config(&dir))
        .with_launcher(launcher)
        .with_pacer(NoPause);

    let result = scraper.scrape("Daft Punk", "One More Time", "id").await;

    assert!(!result.is_success());
    assert_eq!(result.error(), Some("renderer crashed"));
    assert_eq!(result.source_url(), None);
    assert_eq!(probe.navigations.load(Ordering::SeqCst), 1);
    assert_eq!(probe.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_lost_session_ends_loop_without_retrying() {
    let dir = tempfile::tempdir().unwrap();
    let (launcher, probe) = MockLauncher::new(vec![Step::SessionLost, Step::Page(TRACK_PAGE)]);
    let pacer = RecordingPacer::default();
    let scraper = Scraper::new(test_config(&dir))
        .with_launcher(launcher)
        .with_pacer(pacer.clone());

    let result = scraper.scrape("Daft Punk", "One More Time", "id").await;

    assert!(!result.is_success());
    assert_eq!(result.source_url(), None);
    assert!(result.error().unwrap().contains("target closed"));
    assert_eq!(probe.navigations.load(Ordering::SeqCst), 1);
    assert_eq!(probe.closes.load(Ordering::SeqCst), 1);
    assert!(pacer.pauses.lock().unwrap().is_empty());
}

#[test]
fn test_retryable_errors() {
    assert!(ScrapeError::BlockedPage.is_retryable());
    assert!(ScrapeError::ExtractionEmpty.is_retryable());
    assert!(ScrapeError::Navigation("timeout".into()).is_retryable());
    assert!(!ScrapeError::Session("target closed".into()).is_retryable());
    assert!(!ScrapeError::Launch("no chrome".into()).is_retryable());
    assert!(!ScrapeError::from(std::io::Error::other("disk full")).is_retryable());
}

#[tokio::test(start_paused = true)]
async fn test_frozen_renderer_is_bounded_by_timeout() {
    let (launcher, probe) = MockLauncher::new(vec![Step::FrozenRenderer; 3]);
    let dir = tempfile::tempdir().unwrap();
    let policy = RetryPolicy::from(&test_config(&dir));

    let mut session = launcher.launch().await.unwrap();
    let outcome = retry::run(session.as_mut(), "https://tunebat.com/Info/x/y", &policy, &NoPause)
        .await
        .unwrap();

    match outcome {
        LoopOutcome::Exhausted {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("page inspection timed out"), "{}", last_error);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(probe.snapshots.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_unwritable_screenshot_path_does_not_fail_scrape() {
    let dir = tempfile::tempdir().unwrap();
    let (launcher, _probe) = MockLauncher::new(vec![Step::Page(TRACK_PAGE)]);
    let config = ScraperConfig {
        screenshot_path: dir.path().join("missing").join("shot.png"),
        ..test_config(&dir)
    };
    let scraper = Scraper::new(config).with_launcher(launcher).with_pacer(NoPause);

    let result = scraper.scrape("Daft Punk", "One More Time", "id").await;

    assert!(result.is_success());
    assert!(!result.screenshot().exists());
}

/// Records how far the session got each time the loop pauses.
#[derive(Clone)]
struct ProgressPacer {
    probe: Arc<Probe>,
    seen: Arc<Mutex<Vec<(PauseKind, usize, usize)>>>,
}

#[async_trait]
impl Pacer for ProgressPacer {
    async fn pause(&self, kind: PauseKind) {
        let navigations = self.probe.navigations.load(Ordering::SeqCst);
        let snapshots = self.probe.snapshots.load(Ordering::SeqCst);
        self.seen.lock().unwrap().push((kind, navigations, snapshots));
    }
}

#[tokio::test]
async fn test_page_settles_before_it_is_read() {
    let (launcher, probe) = MockLauncher::new(vec![Step::Page(TRACK_PAGE)]);
    let pacer = ProgressPacer {
        probe: probe.clone(),
        seen: Arc::default(),
    };
    let dir = tempfile::tempdir().unwrap();
    let policy = RetryPolicy::from(&test_config(&dir));

    let mut session = launcher.launch().await.unwrap();
    let outcome = retry::run(session.as_mut(), "https://tunebat.com/Info/x/y", &policy, &pacer)
        .await
        .unwrap();

    assert_eq!(outcome.attempts(), 1);
    // Dwell after the load, before anything is read from the page.
    assert_eq!(*pacer.seen.lock().unwrap(), vec![(PauseKind::AfterLoad, 1, 0)]);
    assert_eq!(probe.snapshots.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_scrapes_use_separate_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let (launcher, probe) = MockLauncher::new(vec![Step::Page(TRACK_PAGE), Step::Page(TRACK_PAGE)]);
    let scraper = Scraper::new(test_config(&dir))
        .with_launcher(launcher)
        .with_pacer(NoPause);

    let (first, second) = tokio::join!(
        scraper.scrape("Daft Punk", "One More Time", "a"),
        scraper.scrape("Daft Punk", "Aerodynamic", "b"),
    );

    assert!(first.is_success());
    assert!(second.is_success());
    assert_eq!(probe.launches.load(Ordering::SeqCst), 2);
    assert_eq!(probe.closes.load(Ordering::SeqCst), 2);

    let mut urls = probe.urls.lock().unwrap().clone();
    urls.sort();
    assert_eq!(
        urls,
        vec![
            "https://tunebat.com/Info/Aerodynamic-Daft-Punk/b".to_string(),
            "https://tunebat.com/Info/One-More-Time-Daft-Punk/a".to_string(),
        ]
    );
}
