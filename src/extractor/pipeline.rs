use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::extractor::document::PageDocument;
use crate::extractor::errors::ExtractError;
use crate::extractor::images::downscale;
use crate::extractor::links::LinkRewritePolicy;
use crate::extractor::minify::{ensure_document_shell, minify};
use crate::extractor::policy::{SanitizePolicy, SelectorPolicy};
use crate::extractor::preprocess::preprocess;
use crate::extractor::sanitizer::sanitize;
use crate::extractor::scroll::unlock;
use crate::session::LoadedPage;

/// Installs a pass-through default Trusted Types policy so later DOM writes
/// are not rejected. Resolves to whether the page supports the API.
pub const TRUSTED_TYPES_PROBE: &str = r#"(() => {
  if (!(window.trustedTypes && window.trustedTypes.createPolicy)) return false;
  try {
    window.trustedTypes.createPolicy("default", {
      createHTML: (s) => s,
      createScriptURL: (s) => s,
      createScript: (s) => s,
    });
  } catch (e) {}
  return true;
})()"#;

pub const SCROLL_TO_BOTTOM: &str =
    "window.scrollTo(0, document.body ? document.body.scrollHeight : 0)";

pub const SCROLL_TO_TOP: &str = "window.scrollTo(0, 0)";

/// Script removing every element matching `selectors` from the live page.
/// Resolves to the number of removed nodes.
pub fn remove_artifacts_script(selectors: &[&str]) -> String {
    let joined = serde_json::Value::from(selectors.join(", "));
    format!(
        "(() => {{ const nodes = document.querySelectorAll({}); nodes.forEach((n) => n.remove()); return nodes.length; }})()",
        joined
    )
}

/// Byte counts at the three measurement points. Purely observational.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeReport {
    pub raw_bytes: usize,
    pub sanitized_bytes: usize,
    pub minified_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct ExtractedPage {
    pub html: String,
    pub size: SizeReport,
}

#[derive(Debug, Clone)]
pub struct ExtractionPipeline {
    gateway_origin: String,
    sanitize_policy: SanitizePolicy,
    selectors: &'static SelectorPolicy,
    settle_delay: Duration,
}

impl ExtractionPipeline {
    pub fn new(
        gateway_origin: impl Into<String>,
        sanitize_policy: SanitizePolicy,
        settle_delay: Duration,
    ) -> Self {
        Self {
            gateway_origin: gateway_origin.into(),
            sanitize_policy,
            selectors: SelectorPolicy::standard(),
            settle_delay,
        }
    }

    pub fn gateway_origin(&self) -> &str {
        &self.gateway_origin
    }

    pub fn sanitize_policy(&self) -> &SanitizePolicy {
        &self.sanitize_policy
    }

    /// Run every stage against a loaded page. Only strings cross an await
    /// point; the parsed tree lives inside [`Self::transform`].
    #[instrument(skip_all, fields(url = %page_url))]
    pub async fn extract(
        &self,
        page: &dyn LoadedPage,
        page_url: &Url,
    ) -> Result<ExtractedPage, ExtractError> {
        let raw = page.content().await?;
        let raw_bytes = raw.len();
        info!(raw_bytes, "captured raw page");

        let trusted_types = page.evaluate(TRUSTED_TYPES_PROBE).await?;
        debug!(supported = trusted_types.as_bool().unwrap_or(false), "trusted types probe");

        let removed = page
            .evaluate(&remove_artifacts_script(self.selectors.artifacts))
            .await?;
        debug!(removed = removed.as_u64().unwrap_or(0), "removed live artifacts");

        page.evaluate(SCROLL_TO_BOTTOM).await?;
        tokio::time::sleep(self.settle_delay).await;
        page.evaluate(SCROLL_TO_TOP).await?;

        let snapshot = page.content().await?;
        let page_origin = page_url.origin().ascii_serialization();
        let sanitized = self.transform(&snapshot, &page_origin)?;
        let sanitized_bytes = sanitized.len();
        info!(sanitized_bytes, "sanitized page");

        let html = minify(&ensure_document_shell(&sanitized))?;
        let size = SizeReport {
            raw_bytes,
            sanitized_bytes,
            minified_bytes: html.len(),
        };
        if size.minified_bytes > size.raw_bytes {
            warn!(?size, "output larger than the raw page");
        }
        info!(minified_bytes = size.minified_bytes, "minified page");

        Ok(ExtractedPage { html, size })
    }

    /// The synchronous DOM stages, in order, over one parsed snapshot.
    pub fn transform(&self, html: &str, page_origin: &str) -> Result<String, ExtractError> {
        let links = LinkRewritePolicy::new(&self.gateway_origin, page_origin)?;
        let mut doc = PageDocument::parse(html);

        let artifacts = SelectorPolicy::compile("artifacts", self.selectors.artifacts)?;
        doc.remove_matching(&artifacts);

        downscale(&doc);
        preprocess(&mut doc, self.selectors)?;
        sanitize(&doc, &self.sanitize_policy, &links);
        unlock(&doc, self.selectors)?;

        Ok(if self.sanitize_policy.require_whole_document() {
            doc.to_html()
        } else {
            doc.body_html()
        })
    }
}
