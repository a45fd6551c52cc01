use std::fs;
use std::time::Duration;
use url::Url;

use crate::extractor::{ExtractionPipeline, SanitizePolicy};
use crate::session::StaticPage;

const GATEWAY: &str = "http://localhost:5000";
const STORY_URL: &str = "https://news.example/story/42";

fn fixture(name: &str) -> String {
    fs::read_to_string(format!("src/extractor/tests/fixtures/{}", name))
        .expect("Failed to read test fixture")
}

fn pipeline(policy: SanitizePolicy) -> ExtractionPipeline {
    ExtractionPipeline::new(GATEWAY, policy, Duration::ZERO)
}

#[test]
fn test_news_page_is_cleaned() {
    let html = pipeline(SanitizePolicy::full())
        .transform(&fixture("news.html"), "https://news.example")
        .unwrap();

    assert!(html.contains("The first paragraph explains why the lights went dark."));
    assert!(html.contains("Harbour lights return to the old quay</title>"));

    for gone in [
        "<script",
        "<style",
        "<iframe",
        "<form",
        "<input",
        "<button",
        "dataLayer",
        "stale render",
        "We value your privacy",
        "Buy now",
        "First!",
        "Share",
        "onclick",
        "data-track",
        "javascript:",
        "Win a prize",
    ] {
        assert!(!html.contains(gone), "{} survived sanitization", gone);
    }
}

#[test]
fn test_news_links_route_through_gateway() {
    let html = pipeline(SanitizePolicy::full())
        .transform(&fixture("news.html"), "https://news.example")
        .unwrap();

    assert!(html.contains(
        r#"href="http://localhost:5000/?url=https%3A%2F%2Fnews.example%2Fstory%2F43""#
    ));
    assert!(html.contains(
        r#"href="http://localhost:5000/?url=https%3A%2F%2Farchive.example%2Fquay%3Fyear%3D1998""#
    ));
    assert!(html.contains(r#"target="_blank""#));
    assert!(html.contains(r#"rel="noopener noreferrer""#));
}

#[test]
fn test_news_images_use_smallest_candidate() {
    let html = pipeline(SanitizePolicy::full())
        .transform(&fixture("news.html"), "https://news.example")
        .unwrap();

    assert!(html.contains("/img/quay-800.jpg"));
    assert!(!html.contains("/img/quay-1600.jpg\" width"));
    assert!(html.contains(r#"src="/img/crowd-400.jpg""#));
    assert!(!html.contains("crowd-1200"));
    assert!(!html.contains("sizes="));
}

#[test]
fn test_news_scroll_lock_is_released() {
    let html = pipeline(SanitizePolicy::full())
        .transform(&fixture("news.html"), "https://news.example")
        .unwrap();

    assert!(!html.contains("modal-open"));
    assert!(!html.contains("no-scroll"));
    assert!(!html.contains("sp-message-open"));
    assert!(!html.contains("position: fixed"));
    assert!(html.contains("overflow: auto !important"));
}

#[test]
fn test_news_main_content_keeps_layout() {
    let html = pipeline(SanitizePolicy::full())
        .transform(&fixture("news.html"), "https://news.example")
        .unwrap();

    assert!(html.contains("max-width: 800px"));
}

#[test]
fn test_lean_policy_drops_page_chrome() {
    let full = pipeline(SanitizePolicy::full())
        .transform(&fixture("news.html"), "https://news.example")
        .unwrap();
    let lean = pipeline(SanitizePolicy::lean())
        .transform(&fixture("news.html"), "https://news.example")
        .unwrap();

    assert!(full.contains("<footer"));
    assert!(lean.contains("Copyright Harbour News"));
    assert!(!lean.contains("<footer"));
    assert!(!lean.contains("<nav"));
    assert!(!lean.contains("<title"));
    assert!(lean.contains("The first paragraph"));
    assert!(lean.len() < full.len());
}

#[tokio::test]
async fn test_extract_end_to_end() {
    let raw = fixture("news.html");
    let page = StaticPage::new(raw.clone());
    let url = Url::parse(STORY_URL).unwrap();

    let extracted = pipeline(SanitizePolicy::full())
        .extract(&page, &url)
        .await
        .unwrap();

    assert_eq!(extracted.size.raw_bytes, raw.len());
    assert!(extracted.size.minified_bytes <= extracted.size.sanitized_bytes);
    assert_eq!(extracted.size.minified_bytes, extracted.html.len());

    assert!(extracted.html.contains("https%3A%2F%2Fnews.example%2Fstory%2F43"));
    assert!(extracted.html.contains("The first paragraph explains why the lights went dark."));
    assert!(!extracted.html.contains("<script"));
    assert!(!extracted.html.contains("<!--"));
}

#[tokio::test]
async fn test_extract_wraps_fragment_in_document_shell() {
    let page = StaticPage::new("<p>Just a fragment</p>");
    let url = Url::parse(STORY_URL).unwrap();

    let extracted = pipeline(SanitizePolicy::lean())
        .extract(&page, &url)
        .await
        .unwrap();

    assert!(extracted.html.to_ascii_lowercase().contains("<html"));
    assert!(extracted.html.contains("Just a fragment"));
}

#[tokio::test]
async fn test_extract_wraps_fragment_with_html_in_attribute() {
    let page = StaticPage::new(r#"<p>hi <img alt="<html>" src="a.png"></p>"#);
    let url = Url::parse(STORY_URL).unwrap();

    let extracted = pipeline(SanitizePolicy::lean())
        .extract(&page, &url)
        .await
        .unwrap();

    assert!(extracted.html.starts_with("<html><head>"));
    assert!(extracted.html.contains("hi"));
}

#[cfg(feature = "fuzz")]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn transform_never_panics(html in ".{0,512}") {
            let _ = pipeline(SanitizePolicy::full()).transform(&html, "https://news.example");
            let _ = pipeline(SanitizePolicy::lean()).transform(&html, "https://news.example");
        }
    }
}
