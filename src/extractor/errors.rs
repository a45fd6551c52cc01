use axum::http::StatusCode;
use std::time::Duration;
use thiserror::Error;

use crate::fetcher::FetchError;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),

    #[error("navigation timed out after {0:?}")]
    NavigationTimeout(Duration),

    #[error("rendering engine error: {0}")]
    Engine(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("invalid selector: {0}")]
    Selector(String),

    #[error("minification failed: {0}")]
    Minify(String),
}

impl ExtractError {
    /// Message safe to hand back to a caller. Engine and fetch details can
    /// carry local paths or protocol noise, so they are collapsed.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidUrl(_) => "Invalid URL format".to_string(),
            Self::UnsupportedScheme(_) => "URL must start with http:// or https://".to_string(),
            Self::NavigationTimeout(timeout) => {
                format!("Page did not load within {} seconds", timeout.as_secs())
            }
            Self::Engine(_) => "Error processing the webpage.".to_string(),
            Self::Fetch(err) => match err {
                FetchError::Http { status, .. } => {
                    format!("Upstream responded with status {}", status.as_u16())
                }
                FetchError::UnsupportedContentType(content_type) => {
                    format!("Unsupported content type: {}", content_type)
                }
                FetchError::BodyTooLarge(_) => "Page is too large".to_string(),
                _ => "Error processing the webpage.".to_string(),
            },
            Self::Selector(_) | Self::Minify(_) => "Error processing the webpage.".to_string(),
        }
    }

    /// Failures that say nothing about the page itself; the same URL may
    /// well work on the next request.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NavigationTimeout(_) | Self::Engine(_) => true,
            Self::Fetch(err) => err.should_retry(),
            Self::InvalidUrl(_) | Self::UnsupportedScheme(_) | Self::Selector(_) | Self::Minify(_) => {
                false
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidUrl(_) | Self::UnsupportedScheme(_) => StatusCode::BAD_REQUEST,
            Self::NavigationTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Fetch(FetchError::InvalidUrl(_)) => StatusCode::BAD_REQUEST,
            Self::Fetch(FetchError::ConnectTimeout | FetchError::RequestTimeout) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            Self::Engine(_) | Self::Fetch(_) => StatusCode::BAD_GATEWAY,
            Self::Selector(_) | Self::Minify(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<chromiumoxide::error::CdpError> for ExtractError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Self::Engine(err.to_string())
    }
}
