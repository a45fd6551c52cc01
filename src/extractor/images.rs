//! Responsive image down-selection. Every `<picture>` and `srcset` keeps
//! only its smallest candidate, the opposite of what a browser would pick.

use kuchiki::NodeRef;
use tracing::debug;

use crate::extractor::document::{PageDocument, get_attr, remove_attr, set_attr, tag_name};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownscaleReport {
    pub pictures: usize,
    pub srcsets: usize,
    pub removed_sources: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcsetCandidate {
    pub url: String,
    /// Numeric part of the descriptor; `None` when missing or malformed.
    pub size: Option<u64>,
}

pub fn downscale(doc: &PageDocument) -> DownscaleReport {
    let mut report = DownscaleReport::default();

    for picture in doc.elements_by_tag("picture") {
        report.removed_sources += downscale_picture(&picture);
        report.pictures += 1;
    }

    for img in doc.elements_by_tag("img") {
        let Some(srcset) = get_attr(&img, "srcset") else {
            continue;
        };
        let candidates = parse_srcset(&srcset);
        if let Some(index) = smallest(candidates.iter().map(|candidate| candidate.size)) {
            set_attr(&img, "src", candidates[index].url.clone());
            remove_attr(&img, "srcset");
            remove_attr(&img, "sizes");
            report.srcsets += 1;
        }
    }

    debug!(
        pictures = report.pictures,
        srcsets = report.srcsets,
        removed_sources = report.removed_sources,
        "downscaled images"
    );
    report
}

fn downscale_picture(picture: &NodeRef) -> usize {
    let sources: Vec<NodeRef> = picture
        .descendants()
        .filter(|node| tag_name(node) == Some("source"))
        .collect();
    let Some(index) = smallest(sources.iter().map(declared_width)) else {
        return 0;
    };
    let chosen = &sources[index];

    let img = picture
        .descendants()
        .find(|node| tag_name(node) == Some("img"));
    if let Some(img) = img {
        let url = get_attr(chosen, "srcset")
            .and_then(|srcset| first_url_token(&srcset))
            .or_else(|| get_attr(chosen, "src"));
        if let Some(url) = url {
            set_attr(&img, "src", url);
            remove_attr(&img, "srcset");
            remove_attr(&img, "sizes");
        }
    }

    let mut removed = 0;
    for (position, source) in sources.iter().enumerate() {
        if position != index {
            source.detach();
            removed += 1;
        }
    }
    removed
}

/// `width`, else `data-width`; anything unparsable counts as unbounded.
fn declared_width(source: &NodeRef) -> Option<u64> {
    get_attr(source, "width")
        .or_else(|| get_attr(source, "data-width"))
        .and_then(|value| leading_integer(&value))
}

/// Index of the minimum size. Unbounded (`None`) never beats a real size,
/// and ties keep the earliest candidate, so a list without any hints
/// yields the first entry.
fn smallest(sizes: impl Iterator<Item = Option<u64>>) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;
    for (index, size) in sizes.enumerate() {
        let size = size.unwrap_or(u64::MAX);
        match best {
            Some((_, best_size)) if size >= best_size => {}
            _ => best = Some((index, size)),
        }
    }
    best.map(|(index, _)| index)
}

/// Integer prefix, as `parseInt` reads `"320w"` or `"640px"`.
fn leading_integer(value: &str) -> Option<u64> {
    let trimmed = value.trim_start();
    let digits: &str = &trimmed[..trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len())];
    digits.parse().ok()
}

fn first_url_token(srcset: &str) -> Option<String> {
    parse_srcset(srcset)
        .into_iter()
        .next()
        .map(|candidate| candidate.url)
}

/// Parse a `srcset` list. URLs end at whitespace, descriptors at a comma,
/// so commas inside data URLs survive.
pub fn parse_srcset(srcset: &str) -> Vec<SrcsetCandidate> {
    let mut candidates = Vec::new();
    let mut rest = srcset;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }

        let url_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let raw_url = &rest[..url_end];
        rest = &rest[url_end..];

        let url = raw_url.trim_end_matches(',');
        let descriptor = if url.len() != raw_url.len() {
            ""
        } else {
            let descriptor_end = rest.find(',').unwrap_or(rest.len());
            let descriptor = rest[..descriptor_end].trim();
            rest = &rest[descriptor_end..];
            descriptor
        };

        if !url.is_empty() {
            candidates.push(SrcsetCandidate {
                url: url.to_string(),
                size: leading_integer(descriptor),
            });
        }
    }

    candidates
}
