//! Rendering sessions. A session opens one page per request; the pipeline
//! only ever talks to the [`LoadedPage`] it gets back.

pub mod browser;
pub mod http;
pub mod profile;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use url::Url;

use crate::extractor::ExtractError;

pub use browser::{BrowserOptions, BrowserSession};
pub use http::HttpSession;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Navigate a fresh page to `url` and wait for the document to load.
    async fn open(&self, url: &Url) -> Result<Box<dyn LoadedPage>, ExtractError>;

    async fn is_alive(&self) -> bool;

    fn name(&self) -> &'static str;

    async fn shutdown(&self) -> Result<(), ExtractError> {
        Ok(())
    }
}

#[async_trait]
pub trait LoadedPage: Send + Sync {
    /// Serialized DOM as it is right now.
    async fn content(&self) -> Result<String, ExtractError>;

    async fn evaluate(&self, script: &str) -> Result<Value, ExtractError>;

    async fn close(&self) -> Result<(), ExtractError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    Browser,
    Static,
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "browser" => Ok(Self::Browser),
            "static" => Ok(Self::Static),
            other => Err(format!("unknown render mode '{}'", other)),
        }
    }
}

impl Display for RenderMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Browser => write!(f, "browser"),
            Self::Static => write!(f, "static"),
        }
    }
}

/// A page whose DOM is fixed HTML. Scripts are never run, so evaluation
/// yields `null`.
#[derive(Debug, Clone)]
pub struct StaticPage {
    html: String,
}

impl StaticPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }
}

#[async_trait]
impl LoadedPage for StaticPage {
    async fn content(&self) -> Result<String, ExtractError> {
        Ok(self.html.clone())
    }

    async fn evaluate(&self, _script: &str) -> Result<Value, ExtractError> {
        Ok(Value::Null)
    }

    async fn close(&self) -> Result<(), ExtractError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_page() {
        let page = StaticPage::new("<p>x</p>");
        assert_eq!(page.content().await.unwrap(), "<p>x</p>");
        assert_eq!(page.evaluate("1 + 1").await.unwrap(), Value::Null);
        assert!(page.close().await.is_ok());
    }

    #[test]
    fn test_render_mode_parsing() {
        assert_eq!("Browser".parse::<RenderMode>(), Ok(RenderMode::Browser));
        assert_eq!("static".parse::<RenderMode>(), Ok(RenderMode::Static));
        assert!("headless".parse::<RenderMode>().is_err());
        assert_eq!(RenderMode::Static.to_string(), "static");
    }
}
