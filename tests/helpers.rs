#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

use pagewash::{
    app_state::AppState,
    extractor::{ExtractError, ExtractionPipeline, SanitizePolicy},
    gateway,
    session::{LoadedPage, PageSession, StaticPage},
};

pub const GATEWAY: &str = "http://localhost:5000";

pub const STORY: &str = r#"<html><head><title>Quay</title><script>track()</script></head>
<body><article><h1>Harbour lights</h1><p>The lights are back. See the <a href="/story/43">follow-up</a>.</p></article></body></html>"#;

/// Serves one fixed document for every URL and remembers what it was asked
/// for.
pub struct FakeSession {
    html: String,
    alive: AtomicBool,
    pub opened: AtomicUsize,
    pub last_url: std::sync::Mutex<Option<Url>>,
}

impl FakeSession {
    pub fn new(html: &str) -> Self {
        Self {
            html: html.to_string(),
            alive: AtomicBool::new(true),
            opened: AtomicUsize::new(0),
            last_url: std::sync::Mutex::new(None),
        }
    }

    pub fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl PageSession for FakeSession {
    async fn open(&self, url: &Url) -> Result<Box<dyn LoadedPage>, ExtractError> {
        if url.host_str() == Some("slow.example") {
            return Err(ExtractError::NavigationTimeout(Duration::from_secs(45)));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        *self.last_url.lock().unwrap() = Some(url.clone());
        Ok(Box::new(StaticPage::new(self.html.clone())))
    }

    async fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

pub fn test_state(session: Arc<FakeSession>) -> AppState {
    AppState::new(
        session,
        ExtractionPipeline::new(GATEWAY, SanitizePolicy::full(), Duration::ZERO),
        Some(4),
    )
}

pub fn test_app(session: Arc<FakeSession>) -> Router {
    gateway::router(test_state(session))
}
