//! Policy enforcement over the page tree. A single pre-order walk decides
//! every node, then a post-order cleanup prunes what the walk emptied.

use kuchiki::iter::NodeEdge;
use kuchiki::{NodeData, NodeRef};
use tracing::{debug, trace};

use crate::extractor::document::{
    PageDocument, TreeVisitor, Visit, is_blank, is_skeleton, remove_attr, tag_name, walk,
};
use crate::extractor::links::{LinkOutcome, LinkRewritePolicy, is_script_url};
use crate::extractor::policy::{SanitizePolicy, TagVerdict};

/// Elements that carry meaning without any text or children.
const CONTENT_BEARING_TAGS: &[&str] = &[
    "img", "picture", "source", "video", "audio", "track", "br", "hr", "wbr", "html", "head",
    "body", "title",
];

/// Attributes that load or navigate, and so must never hold script URLs.
const URL_ATTRIBUTES: &[&str] = &["src", "href"];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeReport {
    pub visited: usize,
    pub removed_nodes: usize,
    pub unwrapped_nodes: usize,
    pub stripped_attributes: usize,
    pub links_rewritten: usize,
    pub links_removed: usize,
    pub pruned_empty: usize,
}

struct SanitizeVisitor<'a> {
    policy: &'a SanitizePolicy,
    links: &'a LinkRewritePolicy,
    main_content: Option<NodeRef>,
    report: SanitizeReport,
}

impl SanitizeVisitor<'_> {
    fn is_main_content(&self, node: &NodeRef) -> bool {
        self.main_content.as_ref().is_some_and(|main| main == node)
    }

    fn strip_attributes(&mut self, node: &NodeRef) {
        let Some(element) = node.as_element() else {
            return;
        };
        let on_main_content = self.is_main_content(node);
        let mut attributes = element.attributes.borrow_mut();
        let before = attributes.map.len();

        attributes.map.retain(|name, attribute| {
            let local = &*name.local;
            self.policy.attribute_allowed(local, on_main_content)
                && !(URL_ATTRIBUTES.contains(&local) && is_script_url(&attribute.value))
        });
        self.report.stripped_attributes += before - attributes.map.len();
    }
}

impl TreeVisitor for SanitizeVisitor<'_> {
    fn on_before_visit(&mut self, node: &NodeRef) {
        self.report.visited += 1;
        if let Some(tag) = tag_name(node) {
            trace!(tag, "sanitizer visiting element");
        }
    }

    fn on_visit(&mut self, node: &NodeRef) -> Visit {
        match node.data() {
            NodeData::Comment(_) | NodeData::ProcessingInstruction(_) => {
                self.report.removed_nodes += 1;
                return Visit::Remove;
            }
            NodeData::Element(_) => {}
            _ => return Visit::Skip,
        }
        let Some(tag) = tag_name(node).map(str::to_string) else {
            return Visit::Skip;
        };

        if tag == "a" {
            match self.links.rewrite(node) {
                LinkOutcome::Remove => {
                    self.report.links_removed += 1;
                    return Visit::Remove;
                }
                LinkOutcome::Rewritten => self.report.links_rewritten += 1,
                LinkOutcome::Kept | LinkOutcome::Untouched => {}
            }
        }

        if is_skeleton(node) {
            self.strip_attributes(node);
            return Visit::Descend;
        }

        if !CONTENT_BEARING_TAGS.contains(&tag.as_str()) && is_blank(node) {
            self.report.removed_nodes += 1;
            return Visit::Remove;
        }

        match self.policy.tag_verdict(&tag) {
            TagVerdict::Allow => {
                self.strip_attributes(node);
                Visit::Descend
            }
            TagVerdict::Unwrap => {
                self.report.unwrapped_nodes += 1;
                Visit::Unwrap
            }
            TagVerdict::Drop => {
                self.report.removed_nodes += 1;
                Visit::Remove
            }
        }
    }
}

/// Enforce `policy` on the document in place. With
/// `require_whole_document` unset only `<body>` is walked, and callers are
/// expected to serialize just the body.
pub fn sanitize(
    doc: &PageDocument,
    policy: &SanitizePolicy,
    links: &LinkRewritePolicy,
) -> SanitizeReport {
    let scope = if policy.require_whole_document() {
        Some(doc.root().clone())
    } else {
        doc.body()
    };
    let Some(scope) = scope else {
        return SanitizeReport::default();
    };

    let mut visitor = SanitizeVisitor {
        policy,
        links,
        main_content: doc.main_content().cloned(),
        report: SanitizeReport::default(),
    };
    walk(&scope, &mut visitor);

    let mut report = visitor.report;
    report.pruned_empty = cleanup(&scope, doc);

    debug!(
        policy = %policy.kind(),
        visited = report.visited,
        removed = report.removed_nodes,
        unwrapped = report.unwrapped_nodes,
        stripped_attributes = report.stripped_attributes,
        links_rewritten = report.links_rewritten,
        links_removed = report.links_removed,
        pruned_empty = report.pruned_empty,
        "sanitized document"
    );
    report
}

/// Post-order pass so a parent is judged after its children were pruned.
fn cleanup(scope: &NodeRef, doc: &PageDocument) -> usize {
    let elements: Vec<NodeRef> = scope
        .traverse()
        .filter_map(|edge| match edge {
            NodeEdge::End(node) if node.as_element().is_some() => Some(node),
            _ => None,
        })
        .collect();

    let mut pruned = 0;
    for node in elements {
        if node == *scope {
            continue;
        }
        let content_bearing =
            tag_name(&node).is_some_and(|tag| CONTENT_BEARING_TAGS.contains(&tag));
        if !content_bearing && !is_skeleton(&node) && is_blank(&node) {
            node.detach();
            pruned += 1;
            continue;
        }
        if !doc.is_main_content(&node) {
            remove_attr(&node, "style");
        }
    }
    pruned
}
