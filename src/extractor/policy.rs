//! Selector and sanitize policy tables shared by every pipeline stage.
//!
//! Both tables live here so the pipeline variants differ only in which
//! policy they are handed, never in code.

use kuchiki::Selectors;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::extractor::errors::ExtractError;

pub const POLICY_VERSION: &str = "2024.11";

/// CSS selector groups driving removal, artifact stripping and scroll
/// unlocking. Matching is done with kuchiki's selector engine, so
/// `[class*=...]` substring matches behave as in a browser.
#[derive(Debug)]
pub struct SelectorPolicy {
    pub version: &'static str,
    pub removal: &'static [&'static str],
    pub artifacts: &'static [&'static str],
    pub main_content: &'static [&'static str],
    pub scroll_block: &'static [&'static str],
    pub lock_state_classes: &'static [&'static str],
    pub lock_state_attributes: &'static [&'static str],
    pub interactive: &'static [&'static str],
    pub revealed: &'static [&'static str],
}

pub static SELECTOR_POLICY: SelectorPolicy = SelectorPolicy {
    version: POLICY_VERSION,
    removal: &[
        "script",
        "noscript",
        "iframe",
        "style:not([data-essential])",
        r#"[class*="tracking"]"#,
        r#"[class*="analytics"]"#,
        r#"[class*="modal"]"#,
        r#"[class*="popup"]"#,
        r#"[class*="overlay"]"#,
        r#"[class*="drawer"]"#,
        r#"[class*="dialog"]"#,
        ".tp-modal",
        ".tp-backdrop",
        ".tp-please-wait",
        r#"[class*="share"]"#,
        r#"[class*="social"]"#,
        r#"[class*="comment"]"#,
        r#"[class*="related"]"#,
        r#"[class*="recommendation"]"#,
        r#"[class*="newsletter"]"#,
        r#"[class^="ad-"]"#,
        r#"[class*=" ad-"]"#,
        r#"[class*="advertisement"]"#,
    ],
    artifacts: &["script[src]", r#"link[rel="preload"]"#, "#gateway-content"],
    main_content: &["article", ".content"],
    scroll_block: &[
        ".sp-message-open",
        r#"[class*="modal"]"#,
        r#"[class*="popup"]"#,
        r#"[class*="overlay"]"#,
        r#"[class*="dialog"]"#,
        ".o-header__drawer",
        ".o-header__mega",
        ".o-header__search",
        ".typeahead__main-container",
    ],
    lock_state_classes: &[
        "sp-message-open",
        "modal-open",
        "no-scroll",
        "noscroll",
        "scroll-lock",
    ],
    lock_state_attributes: &["aria-hidden", "aria-expanded"],
    interactive: &["a", "button", "input", "select", r#"[role="button"]"#],
    revealed: &[".o-header__nav-link", ".o-header__top-link-label"],
};

impl SelectorPolicy {
    pub fn standard() -> &'static SelectorPolicy {
        &SELECTOR_POLICY
    }

    /// Compile one selector group into a single kuchiki selector list.
    pub fn compile(group: &str, patterns: &[&str]) -> Result<Selectors, ExtractError> {
        Selectors::compile(&patterns.join(", "))
            .map_err(|_| ExtractError::Selector(format!("{} selectors failed to compile", group)))
    }
}

/// Tags that never survive sanitization, whatever a policy lists. Their
/// content is either executable or parsed outside the regular tree.
const DESTRUCTIVE_TAGS: &[&str] = &[
    "script", "style", "iframe", "frame", "frameset", "embed", "object", "template", "noscript",
];

/// Tags whose content is dropped with them instead of being hoisted when
/// `keep_text_content` is set.
const DROP_CONTENT_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "frame", "frameset", "object", "embed", "template",
    "svg", "math", "noembed", "noframes", "xmp", "plaintext",
];

const FULL_ALLOWED_TAGS: &[&str] = &[
    "html", "head", "body", "title", "main", "article", "section", "header", "footer", "nav",
    "aside", "div", "span", "p", "br", "hr", "h1", "h2", "h3", "h4", "h5", "h6", "a", "strong",
    "b", "em", "i", "u", "s", "small", "sub", "sup", "mark", "code", "pre", "kbd", "samp",
    "blockquote", "q", "cite", "abbr", "time", "figure", "figcaption", "img", "picture",
    "source", "ul", "ol", "li", "dl", "dt", "dd", "table", "thead", "tbody", "tfoot", "tr",
    "td", "th", "caption", "details", "summary", "video", "audio", "track", "wbr", "del", "ins",
];

const FULL_FORBIDDEN_TAGS: &[&str] = &[
    "script", "style", "iframe", "frame", "embed", "object", "param", "form", "input",
    "textarea", "button", "select", "option",
];

const LEAN_EXTRA_FORBIDDEN_TAGS: &[&str] = &["nav", "header", "footer", "aside"];

const ALLOWED_ATTRIBUTES: &[&str] = &["src", "alt", "href", "target", "rel", "title"];

const FORBIDDEN_ATTRIBUTES: &[&str] = &["onclick", "onload", "onerror"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Full,
    Lean,
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "lean" => Ok(Self::Lean),
            other => Err(format!("unknown sanitize policy '{}'", other)),
        }
    }
}

impl Display for PolicyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Lean => write!(f, "lean"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagVerdict {
    Allow,
    /// Drop the element but keep its children in place.
    Unwrap,
    /// Drop the element and everything under it.
    Drop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizePolicy {
    kind: PolicyKind,
    allowed_tags: HashSet<String>,
    forbidden_tags: HashSet<String>,
    allowed_attributes: HashSet<String>,
    forbidden_attributes: HashSet<String>,
    keep_text_content: bool,
    require_whole_document: bool,
    strip_data_attributes: bool,
}

static FULL_POLICY: Lazy<SanitizePolicy> = Lazy::new(|| {
    SanitizePolicy::new(
        PolicyKind::Full,
        FULL_ALLOWED_TAGS,
        FULL_FORBIDDEN_TAGS,
        ALLOWED_ATTRIBUTES,
        FORBIDDEN_ATTRIBUTES,
    )
});

static LEAN_POLICY: Lazy<SanitizePolicy> = Lazy::new(|| {
    let forbidden: Vec<&str> = FULL_FORBIDDEN_TAGS
        .iter()
        .chain(LEAN_EXTRA_FORBIDDEN_TAGS)
        .copied()
        .collect();
    let mut policy = SanitizePolicy::new(
        PolicyKind::Lean,
        FULL_ALLOWED_TAGS,
        &forbidden,
        ALLOWED_ATTRIBUTES,
        FORBIDDEN_ATTRIBUTES,
    );
    policy.require_whole_document = false;
    policy
});

fn to_set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|item| item.to_ascii_lowercase()).collect()
}

impl SanitizePolicy {
    /// Build a policy. The destructive tag floor is always merged into the
    /// deny-list.
    pub fn new(
        kind: PolicyKind,
        allowed_tags: &[&str],
        forbidden_tags: &[&str],
        allowed_attributes: &[&str],
        forbidden_attributes: &[&str],
    ) -> Self {
        let mut forbidden_tags = to_set(forbidden_tags);
        forbidden_tags.extend(to_set(DESTRUCTIVE_TAGS));

        Self {
            kind,
            allowed_tags: to_set(allowed_tags),
            forbidden_tags,
            allowed_attributes: to_set(allowed_attributes),
            forbidden_attributes: to_set(forbidden_attributes),
            keep_text_content: true,
            require_whole_document: true,
            strip_data_attributes: true,
        }
    }

    pub fn full() -> Self {
        FULL_POLICY.clone()
    }

    pub fn lean() -> Self {
        LEAN_POLICY.clone()
    }

    pub fn for_kind(kind: PolicyKind) -> Self {
        match kind {
            PolicyKind::Full => Self::full(),
            PolicyKind::Lean => Self::lean(),
        }
    }

    pub fn with_keep_text_content(mut self, keep: bool) -> Self {
        self.keep_text_content = keep;
        self
    }

    pub fn with_whole_document(mut self, whole: bool) -> Self {
        self.require_whole_document = whole;
        self
    }

    pub fn with_data_attributes(mut self, allow: bool) -> Self {
        self.strip_data_attributes = !allow;
        self
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind
    }
    pub fn keep_text_content(&self) -> bool {
        self.keep_text_content
    }
    pub fn require_whole_document(&self) -> bool {
        self.require_whole_document
    }
    pub fn strip_data_attributes(&self) -> bool {
        self.strip_data_attributes
    }

    pub fn is_forbidden_tag(&self, tag: &str) -> bool {
        self.forbidden_tags.contains(&tag.to_ascii_lowercase())
    }

    pub fn is_forbidden_attribute(&self, name: &str) -> bool {
        self.forbidden_attributes.contains(&name.to_ascii_lowercase())
    }

    /// Deny-list wins over the allow-list.
    pub fn tag_verdict(&self, tag: &str) -> TagVerdict {
        let tag = tag.to_ascii_lowercase();
        if !self.forbidden_tags.contains(&tag) && self.allowed_tags.contains(&tag) {
            return TagVerdict::Allow;
        }
        if self.keep_text_content && !DROP_CONTENT_TAGS.contains(&tag.as_str()) {
            TagVerdict::Unwrap
        } else {
            TagVerdict::Drop
        }
    }

    /// Whether an attribute may stay on an element. Forbidden names and
    /// event handlers never survive; `style` is only kept on the main
    /// content node.
    pub fn attribute_allowed(&self, name: &str, on_main_content: bool) -> bool {
        let name = name.to_ascii_lowercase();
        if self.forbidden_attributes.contains(&name) || name.starts_with("on") {
            return false;
        }
        if self.allowed_attributes.contains(&name) {
            return true;
        }
        if name == "style" {
            return on_main_content;
        }
        !self.strip_data_attributes && name.starts_with("data-")
    }
}

impl Default for SanitizePolicy {
    fn default() -> Self {
        Self::full()
    }
}
