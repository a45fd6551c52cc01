//! Undo scroll locks and disabled controls left behind by consent walls and
//! overlays.

use kuchiki::NodeRef;
use tracing::debug;

use crate::extractor::document::{PageDocument, get_attr, remove_attr, set_attr, tag_name};
use crate::extractor::errors::ExtractError;
use crate::extractor::policy::SelectorPolicy;
use crate::extractor::style::{replace_style, set_property};

pub const BLOCK_RESET: &str = "
    position: static !important;
    overflow: visible !important;
    height: auto !important;
    width: auto !important;
    margin: 0 !important;
    padding: 0 !important;
    top: auto !important;
    left: auto !important;
    right: auto !important;
    bottom: auto !important;
    transform: none !important;
    pointer-events: auto !important;
    display: block !important;
";

pub const ROOT_RESET: &str = "
    overflow: auto !important;
    overflow-x: auto !important;
    overflow-y: auto !important;
    position: static !important;
    height: auto !important;
    width: auto !important;
    margin: 0 !important;
    padding: 0 !important;
    pointer-events: auto !important;
";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UnlockReport {
    pub blocks_reset: usize,
    pub interactive_enabled: usize,
    pub revealed: usize,
}

/// Release scroll locks and re-enable controls.
///
/// Inside [`ExtractionPipeline::transform`](crate::extractor::ExtractionPipeline::transform)
/// this runs after preprocessing and sanitizing. By then modal-like nodes
/// are gone and `class` attributes are stripped, so the scroll-block reset
/// finds nothing there and the root reset plus the per-element pass do the
/// work. Run on its own, the block reset applies as written.
pub fn unlock(doc: &PageDocument, policy: &SelectorPolicy) -> Result<UnlockReport, ExtractError> {
    let scroll_block = SelectorPolicy::compile("scroll block", policy.scroll_block)?;
    let interactive = SelectorPolicy::compile("interactive", policy.interactive)?;
    let revealed = SelectorPolicy::compile("revealed", policy.revealed)?;
    let mut report = UnlockReport::default();

    for node in doc.select_all(&scroll_block) {
        clear_lock_state(&node, policy);
        replace_style(&node, BLOCK_RESET);
        report.blocks_reset += 1;
    }

    let roots = [doc.html_element(), doc.body()];
    for node in roots.iter().flatten() {
        remove_lock_classes(node, policy.lock_state_classes);
        replace_style(node, ROOT_RESET);
    }

    for node in doc.root().descendants().filter(|node| node.as_element().is_some()) {
        set_property(&node, "pointer-events", "auto");
        let cursor = match tag_name(&node) {
            Some("a" | "button") => "pointer",
            _ => "auto",
        };
        set_property(&node, "cursor", cursor);
    }

    for node in doc.select_all(&interactive) {
        set_property(&node, "cursor", "pointer");
        remove_attr(&node, "disabled");
        remove_attr(&node, "aria-disabled");
        set_attr(&node, "tabindex", "0");
        report.interactive_enabled += 1;
    }

    for node in doc.select_all(&revealed) {
        if remove_attr(&node, "aria-hidden") {
            report.revealed += 1;
        }
    }

    debug!(
        blocks_reset = report.blocks_reset,
        interactive_enabled = report.interactive_enabled,
        revealed = report.revealed,
        "unlocked scrolling"
    );
    Ok(report)
}

fn clear_lock_state(node: &NodeRef, policy: &SelectorPolicy) {
    remove_lock_classes(node, policy.lock_state_classes);
    for attribute in policy.lock_state_attributes {
        remove_attr(node, attribute);
    }
}

fn remove_lock_classes(node: &NodeRef, lock_classes: &[&str]) {
    let Some(class) = get_attr(node, "class") else {
        return;
    };
    let kept: Vec<&str> = class
        .split_ascii_whitespace()
        .filter(|name| !lock_classes.contains(name))
        .collect();
    if kept.is_empty() {
        remove_attr(node, "class");
    } else {
        set_attr(node, "class", kept.join(" "));
    }
}
