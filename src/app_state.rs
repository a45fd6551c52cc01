use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};
use url::Url;

use crate::config::Config;
use crate::extractor::{ExtractError, ExtractedPage, ExtractionPipeline, SanitizePolicy};
use crate::session::{
    BrowserOptions, BrowserSession, HttpSession, PageSession, RenderMode, profile::ProfileDir,
};

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<dyn PageSession>,
    pub pipeline: Arc<ExtractionPipeline>,
    limiter: Option<Arc<Semaphore>>,
}

impl AppState {
    pub fn new(
        session: Arc<dyn PageSession>,
        pipeline: ExtractionPipeline,
        max_concurrent_pages: Option<usize>,
    ) -> Self {
        Self {
            session,
            pipeline: Arc::new(pipeline),
            limiter: max_concurrent_pages.map(|permits| Arc::new(Semaphore::new(permits))),
        }
    }

    /// Start the configured rendering session and build the pipeline around
    /// it. Fails when the browser cannot be launched.
    pub async fn from_config(config: &Config) -> Result<Self, ExtractError> {
        let session: Arc<dyn PageSession> = match config.render_mode() {
            RenderMode::Browser => Arc::new(
                BrowserSession::launch(BrowserOptions {
                    executable: config.chromium_path().map(|path| path.to_path_buf()),
                    profile: ProfileDir::resolve(config.profile_dir()),
                    user_agent: config.user_agent().to_string(),
                    navigation_timeout: config.navigation_timeout(),
                })
                .await?,
            ),
            RenderMode::Static => Arc::new(HttpSession::new(config.user_agent())?),
        };
        let pipeline = ExtractionPipeline::new(
            config.gateway_origin(),
            SanitizePolicy::for_kind(config.sanitize_policy()),
            config.settle_delay(),
        );
        info!(
            engine = session.name(),
            policy = %config.sanitize_policy(),
            max_concurrent_pages = ?config.max_concurrent_pages(),
            "extraction service ready"
        );
        Ok(Self::new(session, pipeline, config.max_concurrent_pages()))
    }

    /// Validate `raw_url`, load it in a fresh page and run the pipeline.
    /// The page is closed whether or not extraction succeeds.
    #[instrument(skip_all, fields(url = %raw_url))]
    pub async fn extract(&self, raw_url: &str) -> Result<ExtractedPage, ExtractError> {
        let url = normalize_target_url(raw_url)?;

        let _permit = match &self.limiter {
            Some(limiter) => Some(
                limiter
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| ExtractError::Engine(e.to_string()))?,
            ),
            None => None,
        };

        let page = self.session.open(&url).await?;
        let result = self.pipeline.extract(page.as_ref(), &url).await;
        if let Err(e) = page.close().await {
            warn!(error = %e, "failed to close page");
        }

        match &result {
            Ok(extracted) => info!(
                raw_bytes = extracted.size.raw_bytes,
                sanitized_bytes = extracted.size.sanitized_bytes,
                minified_bytes = extracted.size.minified_bytes,
                "extraction finished"
            ),
            Err(e) => warn!(error = %e, transient = e.is_transient(), "extraction failed"),
        }
        result
    }
}

/// Accept bare hosts (`example.com`) by assuming https, reject any other
/// explicit scheme.
pub fn normalize_target_url(raw: &str) -> Result<Url, ExtractError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::InvalidUrl("empty url".to_string()));
    }

    if let Some(scheme) = explicit_scheme(trimmed) {
        let scheme = scheme.to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(ExtractError::UnsupportedScheme(scheme));
        }
    }

    let candidate = if trimmed.starts_with("http") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    let url = Url::parse(&candidate).map_err(|e| ExtractError::InvalidUrl(e.to_string()))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        "http" | "https" => Err(ExtractError::InvalidUrl("missing host".to_string())),
        other => Err(ExtractError::UnsupportedScheme(other.to_string())),
    }
}

/// Scheme of a leading `scheme://`. A `://` further in, e.g. inside a
/// query parameter, does not count.
fn explicit_scheme(raw: &str) -> Option<&str> {
    let (scheme, _) = raw.split_once("://")?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    let valid = first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{LoadedPage, MockPageSession, PageSession, StaticPage};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_normalize_prepends_https() {
        let url = normalize_target_url("  news.example/story/42 ").unwrap();
        assert_eq!(url.as_str(), "https://news.example/story/42");
    }

    #[test]
    fn test_normalize_ignores_urls_inside_the_query() {
        let url = normalize_target_url("news.example/redirect?to=https://other.example/x").unwrap();
        assert_eq!(
            url.as_str(),
            "https://news.example/redirect?to=https://other.example/x"
        );
        assert!(matches!(
            normalize_target_url("ftp://files.example/?next=https://news.example"),
            Err(ExtractError::UnsupportedScheme(scheme)) if scheme == "ftp"
        ));
    }

    #[test]
    fn test_normalize_keeps_http() {
        let url = normalize_target_url("http://news.example").unwrap();
        assert_eq!(url.as_str(), "http://news.example/");
    }

    #[test]
    fn test_normalize_rejects_other_schemes() {
        assert!(matches!(
            normalize_target_url("ftp://files.example/x"),
            Err(ExtractError::UnsupportedScheme(scheme)) if scheme == "ftp"
        ));
        assert!(matches!(
            normalize_target_url(""),
            Err(ExtractError::InvalidUrl(_))
        ));
        assert!(matches!(
            normalize_target_url("http://"),
            Err(ExtractError::InvalidUrl(_))
        ));
    }

    fn state_with(session: MockPageSession) -> AppState {
        AppState::new(
            Arc::new(session),
            ExtractionPipeline::new("http://localhost:5000", SanitizePolicy::full(), Duration::ZERO),
            Some(2),
        )
    }

    #[tokio::test]
    async fn test_extract_rejects_bad_url_before_opening() {
        let mut session = MockPageSession::new();
        session.expect_open().never();

        let err = state_with(session).extract("ftp://x").await.unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedScheme(_)));
    }

    #[tokio::test]
    async fn test_extract_runs_pipeline_on_opened_page() {
        let mut session = MockPageSession::new();
        session
            .expect_open()
            .withf(|url| url.as_str() == "https://news.example/")
            .times(1)
            .returning(|_| {
                Ok(Box::new(StaticPage::new("<article><p>Hello</p></article>")) as Box<dyn LoadedPage>)
            });

        let page = state_with(session).extract("news.example").await.unwrap();
        assert!(page.html.contains("Hello"));
        assert!(page.size.raw_bytes > 0);
    }

    #[tokio::test]
    async fn test_extract_propagates_navigation_timeout() {
        let mut session = MockPageSession::new();
        session
            .expect_open()
            .returning(|_| Err(ExtractError::NavigationTimeout(Duration::from_secs(45))));

        let err = state_with(session).extract("https://slow.example").await.unwrap_err();
        assert!(matches!(err, ExtractError::NavigationTimeout(_)));
    }

    /// Page that counts how often it is closed and can fail on script
    /// evaluation.
    struct RecordingPage {
        closes: Arc<AtomicUsize>,
        fail_evaluate: bool,
    }

    #[async_trait]
    impl LoadedPage for RecordingPage {
        async fn content(&self) -> Result<String, ExtractError> {
            Ok("<article><p>Recorded</p></article>".to_string())
        }

        async fn evaluate(&self, _script: &str) -> Result<Value, ExtractError> {
            if self.fail_evaluate {
                Err(ExtractError::Engine("execution context was destroyed".to_string()))
            } else {
                Ok(Value::Null)
            }
        }

        async fn close(&self) -> Result<(), ExtractError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn recording_session(closes: &Arc<AtomicUsize>, fail_evaluate: bool) -> MockPageSession {
        let closes = closes.clone();
        let mut session = MockPageSession::new();
        session.expect_open().times(1).returning(move |_| {
            Ok(Box::new(RecordingPage {
                closes: closes.clone(),
                fail_evaluate,
            }) as Box<dyn LoadedPage>)
        });
        session
    }

    #[tokio::test]
    async fn test_page_closed_once_when_pipeline_fails() {
        let closes = Arc::new(AtomicUsize::new(0));
        let state = state_with(recording_session(&closes, true));

        let err = state.extract("https://news.example/story/42").await.unwrap_err();
        assert!(matches!(err, ExtractError::Engine(_)));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_page_closed_once_when_pipeline_succeeds() {
        let closes = Arc::new(AtomicUsize::new(0));
        let state = state_with(recording_session(&closes, false));

        let page = state.extract("https://news.example/story/42").await.unwrap();
        assert!(page.html.contains("Recorded"));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    /// Session whose `open` takes a while, tracking how many run at once.
    #[derive(Default)]
    struct SlowSession {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl PageSession for SlowSession {
        async fn open(&self, _url: &Url) -> Result<Box<dyn LoadedPage>, ExtractError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Box::new(StaticPage::new("<p>slow</p>")))
        }

        async fn is_alive(&self) -> bool {
            true
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    async fn peak_with_limit(limit: Option<usize>) -> usize {
        let session = Arc::new(SlowSession::default());
        let state = AppState::new(
            session.clone(),
            ExtractionPipeline::new("http://localhost:5000", SanitizePolicy::full(), Duration::ZERO),
            limit,
        );

        let requests = (0..6).map(|i| {
            let state = state.clone();
            async move { state.extract(&format!("news.example/story/{}", i)).await }
        });
        for result in futures::future::join_all(requests).await {
            assert!(result.is_ok());
        }
        session.peak.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_limiter_bounds_concurrent_pages() {
        assert_eq!(peak_with_limit(Some(2)).await, 2);
    }

    #[tokio::test]
    async fn test_unlimited_by_default() {
        assert_eq!(peak_with_limit(None).await, 6);
    }
}
