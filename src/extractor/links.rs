use kuchiki::NodeRef;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

use crate::extractor::document::{get_attr, set_attr};
use crate::extractor::errors::ExtractError;

/// Characters `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const SCRIPT_SCHEMES: &[&str] = &["javascript", "vbscript", "data"];

/// Schemes that execute when loaded from `src`. `data:` stays allowed
/// there since inline images use it.
const EXECUTABLE_SCHEMES: &[&str] = &["javascript", "vbscript"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Routed through the gateway.
    Rewritten,
    /// Resolved and hardened but pointing at its original destination.
    Kept,
    /// No usable href; left exactly as found.
    Untouched,
    /// Script-scheme link; the anchor must go.
    Remove,
}

#[derive(Debug, Clone)]
pub struct LinkRewritePolicy {
    gateway_origin: Url,
    page_origin: Url,
}

impl LinkRewritePolicy {
    pub fn new(gateway_origin: &str, page_origin: &str) -> Result<Self, ExtractError> {
        let gateway_origin = Url::parse(gateway_origin)
            .map_err(|e| ExtractError::InvalidUrl(format!("gateway origin: {}", e)))?;
        let page_origin = Url::parse(page_origin)
            .map_err(|e| ExtractError::InvalidUrl(format!("page origin: {}", e)))?;
        Ok(Self {
            gateway_origin,
            page_origin,
        })
    }

    pub fn gateway_origin(&self) -> &Url {
        &self.gateway_origin
    }

    pub fn page_origin(&self) -> &Url {
        &self.page_origin
    }

    /// Gateway URL serving `target`.
    pub fn gateway_link(&self, target: &Url) -> String {
        format!(
            "{}/?url={}",
            self.gateway_origin.origin().ascii_serialization(),
            utf8_percent_encode(target.as_str(), COMPONENT)
        )
    }

    fn on_gateway(&self, target: &Url) -> bool {
        target.origin() == self.gateway_origin.origin()
    }

    /// Rewrite one anchor in place. The caller detaches it on
    /// [`LinkOutcome::Remove`].
    pub fn rewrite(&self, anchor: &NodeRef) -> LinkOutcome {
        let Some(href) = get_attr(anchor, "href") else {
            return LinkOutcome::Untouched;
        };
        let Ok(resolved) = self.page_origin.join(href.trim()) else {
            return LinkOutcome::Untouched;
        };

        let outcome = match resolved.scheme() {
            scheme if SCRIPT_SCHEMES.contains(&scheme) => return LinkOutcome::Remove,
            "http" | "https" if !self.on_gateway(&resolved) => {
                set_attr(anchor, "href", self.gateway_link(&resolved));
                LinkOutcome::Rewritten
            }
            "http" | "https" => LinkOutcome::Kept,
            _ => {
                set_attr(anchor, "href", resolved.as_str());
                LinkOutcome::Kept
            }
        };

        set_attr(anchor, "target", "_blank");
        set_attr(anchor, "rel", "noopener noreferrer");
        outcome
    }
}

/// `true` for `javascript:`-style values that must never reach an
/// attribute that loads or navigates.
pub fn is_script_url(value: &str) -> bool {
    let trimmed: String = value
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .collect();
    trimmed
        .split_once(':')
        .is_some_and(|(scheme, _)| {
            EXECUTABLE_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str())
        })
}
