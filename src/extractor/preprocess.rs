use tracing::debug;

use crate::extractor::document::PageDocument;
use crate::extractor::errors::ExtractError;
use crate::extractor::policy::SelectorPolicy;
use crate::extractor::style::replace_style;

pub const READABLE_LAYOUT: &str = "
    max-width: 800px;
    margin: 0 auto;
    padding: 20px;
    font-family: system-ui, -apple-system, sans-serif;
    font-size: 18px;
    line-height: 1.6;
    color: #222;
    background: #fff;
";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessReport {
    pub removed: usize,
    pub main_content_found: bool,
}

/// Remove tracking, ad and modal-like nodes, then give the main content a
/// readable layout. Rerunning on the same document is a no-op apart from
/// restyling the same node.
pub fn preprocess(
    doc: &mut PageDocument,
    policy: &SelectorPolicy,
) -> Result<PreprocessReport, ExtractError> {
    let removal = SelectorPolicy::compile("removal", policy.removal)?;
    let removed = doc.remove_matching(&removal);

    let mut main_content = None;
    for pattern in policy.main_content {
        let selectors = SelectorPolicy::compile("main content", &[*pattern])?;
        if let Some(node) = doc.select_first(&selectors) {
            main_content = Some(node);
            break;
        }
    }

    if let Some(node) = &main_content {
        replace_style(node, READABLE_LAYOUT);
    }
    let main_content_found = main_content.is_some();
    doc.set_main_content(main_content);

    debug!(removed, main_content_found, "preprocessed document");
    Ok(PreprocessReport {
        removed,
        main_content_found,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::document::{get_attr, tag_name};

    fn run(html: &str) -> (PageDocument, PreprocessReport) {
        let mut doc = PageDocument::parse(html);
        let report = preprocess(&mut doc, SelectorPolicy::standard()).unwrap();
        (doc, report)
    }

    #[test]
    fn test_removes_tracking_and_modal_nodes() {
        let (doc, report) = run(r#"
            <script>track()</script>
            <noscript><img src="pixel.gif"></noscript>
            <iframe src="https://ads.example"></iframe>
            <div class="cookie-modal">Accept cookies</div>
            <div class="site-analytics-beacon"></div>
            <div class="tp-backdrop"></div>
            <aside class="related-stories">More</aside>
            <div class="ad-slot">Buy</div>
            <div class="wrapper ad-banner">Buy more</div>
            <p class="lead">Story text</p>
        "#);

        let html = doc.to_html();
        assert!(!html.contains("track()"));
        assert!(!html.contains("pixel.gif"));
        assert!(!html.contains("ads.example"));
        assert!(!html.contains("Accept cookies"));
        assert!(!html.contains("tp-backdrop"));
        assert!(!html.contains("More"));
        assert!(!html.contains("Buy"));
        assert!(html.contains("Story text"));
        assert!(report.removed >= 8);
    }

    #[test]
    fn test_ad_prefix_does_not_match_inner_substring() {
        let (doc, _) = run(r#"<h2 class="entry-head-title">Headline</h2>"#);
        assert!(doc.to_html().contains("Headline"));
    }

    #[test]
    fn test_keeps_essential_styles() {
        let (doc, _) = run(r#"<style data-essential>p{margin:0}</style><style>.x{}</style>"#);
        let html = doc.to_html();
        assert!(html.contains("p{margin:0}"));
        assert!(!html.contains(".x{}"));
    }

    #[test]
    fn test_styles_article_as_main_content() {
        let (doc, report) = run(
            r#"<div class="content">fallback</div><article style="width:10px">Body</article>"#,
        );
        assert!(report.main_content_found);

        let main = doc.main_content().unwrap();
        assert_eq!(tag_name(main), Some("article"));
        let style = get_attr(main, "style").unwrap();
        assert!(style.contains("max-width: 800px;"));
        assert!(style.contains("line-height: 1.6;"));
        assert!(!style.contains("width:10px"));
    }

    #[test]
    fn test_falls_back_to_content_class() {
        let (doc, report) = run(r#"<div class="content">Body</div>"#);
        assert!(report.main_content_found);
        assert!(get_attr(doc.main_content().unwrap(), "style").is_some());
    }

    #[test]
    fn test_missing_main_content_is_fine() {
        let (doc, report) = run("<p>Just text</p>");
        assert!(!report.main_content_found);
        assert!(doc.main_content().is_none());
    }

    #[test]
    fn test_idempotent() {
        let mut doc = PageDocument::parse(r#"<div class="popup">x</div><article>Body</article>"#);
        preprocess(&mut doc, SelectorPolicy::standard()).unwrap();
        let first = doc.to_html();
        let second = preprocess(&mut doc, SelectorPolicy::standard()).unwrap();

        assert_eq!(second.removed, 0);
        assert_eq!(doc.to_html(), first);
    }
}
