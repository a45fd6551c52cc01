use bytes::Bytes;
use regex::Regex;
use reqwest::StatusCode;
use std::sync::LazyLock;
use tracing::warn;
use url::Url;

use crate::fetcher::types::{Charset, PageResponse};

/// How far into the body a `<meta>` charset declaration is looked for.
const SNIFF_LIMIT: usize = 4096;

static HEADER_CHARSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).unwrap());

static META_CHARSET: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r#"(?i)<meta\s+[^>]*?charset\s*=\s*["']?([^"'\s/>]+)"#).unwrap(),
        Regex::new(r#"(?i)<meta\s+[^>]*?http-equiv\s*=\s*["']?content-type["']?[^>]*?content\s*=\s*["']?[^"'>]*?charset\s*=\s*([^"'\s;/>]+)"#).unwrap(),
    ]
});

pub fn decode_response(
    url_final: Url,
    status: StatusCode,
    body: Bytes,
    content_type: &str,
) -> PageResponse {
    let charset = detect_charset(content_type, &body);
    let body_utf8 = decode_to_utf8(&body, charset);

    PageResponse {
        url_final,
        status,
        body_utf8,
        charset,
    }
}

/// Content-Type header first, then `<meta>` declarations, then a
/// statistical guess over the sniffed prefix.
pub fn detect_charset(content_type: &str, body: &[u8]) -> Charset {
    let declared = HEADER_CHARSET
        .captures(content_type)
        .and_then(|captures| captures.get(1))
        .and_then(|label| Charset::from_label(label.as_str()));
    if let Some(charset) = declared {
        return charset;
    }

    let prefix = &body[..body.len().min(SNIFF_LIMIT)];
    let head = String::from_utf8_lossy(prefix);
    let meta = META_CHARSET.iter().find_map(|pattern| {
        pattern
            .captures(&head)
            .and_then(|captures| captures.get(1))
            .and_then(|label| Charset::from_label(label.as_str()))
    });
    if let Some(charset) = meta {
        return charset;
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(prefix, prefix.len() == body.len());
    Charset::new(detector.guess(None, true))
}

/// Malformed sequences become U+FFFD, the same way a browser would show
/// them.
pub fn decode_to_utf8(body: &[u8], charset: Charset) -> String {
    let (decoded, used, had_errors) = charset.encoding().decode(body);
    if had_errors {
        warn!(charset = used.name(), "page contained malformed byte sequences");
    }
    decoded.into_owned()
}
