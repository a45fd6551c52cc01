use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const NO_URL_MESSAGE: &str = "No URL provided. Use ?url=https://example.com";
pub const BAD_FRAME_MESSAGE: &str = r#"Invalid request format. Send {"url": "https://example.com"}"#;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page to load; `https://` is assumed when no scheme is given.
    pub url: Option<String>,
}

impl PageQuery {
    pub fn validate(&self) -> Result<&str, String> {
        match self.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(NO_URL_MESSAGE.to_string()),
        }
    }
}

/// Frame a WebSocket client sends per page.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ScrapeRequest {
    pub url: String,
}

impl ScrapeRequest {
    pub fn parse(frame: &str) -> Result<Self, String> {
        let request: Self = serde_json::from_str(frame).map_err(|_| BAD_FRAME_MESSAGE.to_string())?;
        if request.url.trim().is_empty() {
            return Err(NO_URL_MESSAGE.to_string());
        }
        Ok(request)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScrapeResponse {
    pub status: String,
    pub content: String,
}

impl ScrapeResponse {
    pub fn success(content: String) -> Self {
        Self {
            status: "success".to_string(),
            content,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub status: String,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: error.into(),
        }
    }
}
