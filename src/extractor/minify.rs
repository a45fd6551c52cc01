use tracing::debug;

use crate::extractor::errors::ExtractError;

/// Wrap a fragment in a bare document unless it already starts with
/// `<html>`, optionally after a doctype. Only the leading tag counts, since
/// attribute values may contain a literal `<html`.
pub fn ensure_document_shell(html: &str) -> String {
    if starts_with_html_tag(html) {
        html.to_string()
    } else {
        format!("<html><head></head><body>{}</body></html>", html)
    }
}

fn starts_with_html_tag(html: &str) -> bool {
    let mut rest = html.trim_start();
    if rest
        .get(..9)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("<!doctype"))
    {
        rest = match rest.find('>') {
            Some(end) => rest[end + 1..].trim_start(),
            None => return false,
        };
    }
    rest.get(..5)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("<html"))
}

/// Collapse whitespace, drop comments and minify inline CSS. Scripts are
/// gone by now, so JS minification stays off.
pub fn minify(html: &str) -> Result<String, ExtractError> {
    let mut cfg = minify_html::Cfg::new();
    cfg.minify_css = true;
    cfg.minify_js = false;
    cfg.keep_comments = false;
    cfg.keep_html_and_head_opening_tags = true;

    let minified = minify_html::minify(html.as_bytes(), &cfg);
    let minified = String::from_utf8(minified).map_err(|e| ExtractError::Minify(e.to_string()))?;
    debug!(before = html.len(), after = minified.len(), "minified document");
    Ok(minified)
}
