use chrono::{DateTime, Utc};
use url::Url;

use reader_core::NewsItem;

use crate::viewer::ContentSource;

const SERVER_NAME: &str = "reader-relay/0.1";

/// Render the full response for a resolved item list.
///
/// Byte-for-byte repeatable given the same `(source, items, now)`: status
/// line, `Date` header, the fixed header set, blank line, document
/// preamble, the source's head content, an optional base reference derived
/// from the first item, every item's rendering escaped to printable ASCII,
/// and the closing trailer. A `None` source (unknown viewer) produces the
/// empty document.
pub fn render_response(
    source: Option<&dyn ContentSource>,
    items: &[NewsItem],
    now: DateTime<Utc>,
) -> Vec<u8> {
    let mut out = String::new();

    out.push_str("HTTP/1.1 200 OK\r\n");
    out.push_str(&format!(
        "Date: {}\r\n",
        now.format("%a, %d %b %Y %H:%M:%S GMT")
    ));
    out.push_str(&format!("Server: {SERVER_NAME}\r\n"));
    out.push_str("Content-Type: text/html; charset=UTF-8\r\n");
    out.push_str("Connection: close\r\n");
    out.push_str("Expires: 0\r\n");
    out.push_str("\r\n");

    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    out.push_str("<meta http-equiv=\"Content-Type\" content=\"text/html; charset=UTF-8\">\n");
    if let Some(head) = source.and_then(|source| source.preamble()) {
        out.push_str(&escape_non_ascii(&head));
        out.push('\n');
    }
    if let Some(base) = items.first().and_then(base_reference) {
        out.push_str(&format!("<base href=\"{base}\">\n"));
    }
    out.push_str("</head>\n<body>\n");

    if let Some(source) = source {
        for item in items {
            out.push_str(&escape_non_ascii(&source.render_item(item)));
            out.push('\n');
        }
    }

    out.push_str("</body>\n</html>\n");
    out.into_bytes()
}

/// Base reference for the document: the item's explicit override if it
/// carries one, else the feed's homepage, else the feed link. Anything
/// that does not parse as an absolute URL is dropped.
fn base_reference(item: &NewsItem) -> Option<String> {
    let candidate = item
        .base
        .clone()
        .or_else(|| item.feed.homepage.clone())
        .unwrap_or_else(|| item.feed.link.clone());
    Url::parse(&candidate).ok().map(|url| url.to_string())
}

/// Replace every character outside printable ASCII and whitespace with a
/// numeric character reference, zero-padded to four hex digits.
pub fn escape_non_ascii(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        let printable = matches!(ch, ' '..='~') || matches!(ch, '\t' | '\n' | '\r');
        if printable {
            out.push(ch);
        } else {
            out.push_str(&format!("&#x{:04X};", ch as u32));
        }
    }
    out
}
