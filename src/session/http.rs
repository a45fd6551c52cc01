use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use crate::extractor::ExtractError;
use crate::fetcher::{build_client, fetch_with};
use crate::session::{LoadedPage, PageSession, StaticPage};

/// Loads pages with a plain HTTP GET. Nothing on the page runs, so the
/// result is the server-rendered markup only.
pub struct HttpSession {
    client: Client,
}

impl HttpSession {
    pub fn new(user_agent: &str) -> Result<Self, ExtractError> {
        Ok(Self {
            client: build_client(user_agent)?,
        })
    }
}

#[async_trait]
impl PageSession for HttpSession {
    #[instrument(skip_all, fields(url = %url))]
    async fn open(&self, url: &Url) -> Result<Box<dyn LoadedPage>, ExtractError> {
        let response = fetch_with(&self.client, url.as_str()).await?;
        debug!(
            final_url = %response.url_final,
            status = response.status.as_u16(),
            charset = %response.charset,
            "loaded static page"
        );
        Ok(Box::new(StaticPage::new(response.body_utf8)))
    }

    async fn is_alive(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
