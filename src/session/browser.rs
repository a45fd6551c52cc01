use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, SetBypassCspParams,
};
use futures::StreamExt;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};
use url::Url;

use crate::extractor::ExtractError;
use crate::session::profile::ProfileDir;
use crate::session::{LoadedPage, PageSession};

pub const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 9) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";

const VIEWPORT: (u32, u32) = (412, 915);

const HIDE_WEBDRIVER: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined });";

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub executable: Option<PathBuf>,
    pub profile: ProfileDir,
    pub user_agent: String,
    pub navigation_timeout: Duration,
}

impl BrowserOptions {
    fn launch_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "--disable-setuid-sandbox",
            "--disable-gpu",
            "--disable-blink-features=AutomationControlled",
            "--disable-extensions",
            "--disable-popup-blocking",
            "--disable-notifications",
            "--ignore-certificate-errors",
            "--crashpad-handler-pid=0",
        ]
        .iter()
        .map(|arg| arg.to_string())
        .collect();
        args.push(format!(
            "--crash-dumps-dir={}",
            self.profile.crashes_dir().display()
        ));
        args.push(format!(
            "--crash-handler-database={}",
            self.profile.crashpad_dir().display()
        ));
        args
    }

    fn user_agent_override(&self) -> SetUserAgentOverrideParams {
        SetUserAgentOverrideParams::new(self.user_agent.clone())
    }

    /// Pixel-sized touch screen. Without it chromiumoxide emulates an
    /// 800x600 desktop regardless of the window size.
    fn viewport(&self) -> Viewport {
        Viewport {
            width: VIEWPORT.0,
            height: VIEWPORT.1,
            device_scale_factor: None,
            emulating_mobile: true,
            is_landscape: false,
            has_touch: true,
        }
    }
}

/// One headless Chromium process shared by every request. Each `open`
/// gets its own tab.
pub struct BrowserSession {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    options: BrowserOptions,
}

impl BrowserSession {
    #[instrument(skip_all, fields(profile = %options.profile.root().display()))]
    pub async fn launch(options: BrowserOptions) -> Result<Self, ExtractError> {
        let removed_locks = options
            .profile
            .prepare()
            .map_err(|e| ExtractError::Engine(format!("profile directory: {}", e)))?;
        if removed_locks > 0 {
            info!(removed_locks, "cleared stale profile locks");
        }

        let mut builder = BrowserConfig::builder()
            .user_data_dir(options.profile.root())
            .window_size(VIEWPORT.0, VIEWPORT.1)
            .viewport(options.viewport())
            .request_timeout(options.navigation_timeout)
            .no_sandbox()
            .args(options.launch_args());
        if let Some(executable) = &options.executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder.build().map_err(ExtractError::Engine)?;

        let (browser, mut events) = Browser::launch(config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    trace!(error = %e, "browser handler event error");
                }
            }
            warn!("browser handler loop ended");
        });

        info!("browser launched");
        Ok(Self {
            browser: Mutex::new(browser),
            handler,
            options,
        })
    }

    async fn new_tab(&self) -> Result<Page, ExtractError> {
        let page = self.browser.lock().await.new_page("about:blank").await?;
        page.set_user_agent(self.options.user_agent_override()).await?;
        page.execute(SetBypassCspParams::new(true)).await?;
        page.evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(HIDE_WEBDRIVER))
            .await?;
        Ok(page)
    }
}

#[async_trait]
impl PageSession for BrowserSession {
    #[instrument(skip_all, fields(url = %url))]
    async fn open(&self, url: &Url) -> Result<Box<dyn LoadedPage>, ExtractError> {
        let page = BrowserPage::new(self.new_tab().await?);
        let timeout = self.options.navigation_timeout;

        let navigation = tokio::time::timeout(timeout, page.page.goto(url.as_str()))
            .await
            .map(|loaded| loaded.map(|_| ()));
        match navigation {
            Err(_) => {
                warn!(?timeout, "navigation timed out");
                page.close().await.ok();
                Err(ExtractError::NavigationTimeout(timeout))
            }
            Ok(Err(e)) => {
                page.close().await.ok();
                Err(e.into())
            }
            Ok(Ok(())) => {
                debug!("page loaded");
                Ok(Box::new(page))
            }
        }
    }

    async fn is_alive(&self) -> bool {
        !self.handler.is_finished()
    }

    fn name(&self) -> &'static str {
        "chromium"
    }

    async fn shutdown(&self) -> Result<(), ExtractError> {
        let mut browser = self.browser.lock().await;
        browser.close().await?;
        browser.wait().await.map_err(|e| ExtractError::Engine(e.to_string()))?;
        self.handler.abort();
        info!("browser closed");
        Ok(())
    }
}

/// A tab that is closed exactly once: explicitly through
/// [`LoadedPage::close`], or from `Drop` when the request future went away
/// first.
struct BrowserPage {
    page: Page,
    closed: AtomicBool,
}

impl BrowserPage {
    fn new(page: Page) -> Self {
        Self {
            page,
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl LoadedPage for BrowserPage {
    async fn content(&self) -> Result<String, ExtractError> {
        Ok(self.page.content().await?)
    }

    async fn evaluate(&self, script: &str) -> Result<Value, ExtractError> {
        let result = self.page.evaluate(script).await?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn close(&self) -> Result<(), ExtractError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.page.clone().close().await?;
        Ok(())
    }
}

impl Drop for BrowserPage {
    fn drop(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let page = self.page.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = page.close().await {
                        warn!(error = %e, "page cleanup on drop failed");
                    }
                });
            }
            Err(_) => warn!("page dropped outside a runtime, tab left open"),
        }
    }
}
