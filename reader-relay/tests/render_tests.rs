use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use reader_core::{EntityRef, FeedInfo, ItemState, NewsItem, StoreError};
use reader_relay::{escape_non_ascii, render_response, ContentSource};

struct EchoSource {
    head: Option<String>,
}

#[async_trait]
impl ContentSource for EchoSource {
    async fn resolve(&self, _refs: &[EntityRef]) -> Result<Vec<NewsItem>, StoreError> {
        Ok(Vec::new())
    }

    fn render_item(&self, item: &NewsItem) -> String {
        format!("<div>{}</div>", item.title)
    }

    fn preamble(&self) -> Option<String> {
        self.head.clone()
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 5, 15, 30, 0).unwrap()
}

fn item(id: u64, title: &str) -> NewsItem {
    NewsItem {
        id,
        title: title.into(),
        link: None,
        description: None,
        author: None,
        category: None,
        labels: Vec::new(),
        rating: 0,
        sticky: false,
        state: ItemState::Unread,
        parent_bin: 0,
        feed: FeedInfo {
            id: 1,
            title: Some("Feed".into()),
            link: "http://example.com/feed.xml".into(),
            homepage: Some("http://example.com/".into()),
        },
        in_reply_to: None,
        base: None,
        received_at: now(),
        published_at: None,
        modified_at: None,
    }
}

fn response_text(source: Option<&dyn ContentSource>, items: &[NewsItem]) -> String {
    String::from_utf8(render_response(source, items, now())).unwrap()
}

#[test]
fn escapes_exactly_the_non_ascii_characters() {
    assert_eq!(escape_non_ascii("café"), "caf&#x00E9;");
    assert_eq!(escape_non_ascii("plain ASCII, kept.\tok\n"), "plain ASCII, kept.\tok\n");
    assert_eq!(escape_non_ascii("naïve — yes"), "na&#x00EF;ve &#x2014; yes");
}

#[test]
fn response_carries_the_fixed_header_set() {
    let source = EchoSource { head: None };
    let text = response_text(Some(&source), &[item(1, "Hello")]);

    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.contains("Date: Wed, 05 Aug 2026 15:30:00 GMT\r\n"));
    assert!(text.contains("Content-Type: text/html; charset=UTF-8\r\n"));
    assert!(text.contains("Connection: close\r\n"));
    assert!(text.contains("Expires: 0\r\n"));
    assert!(text.contains("\r\n\r\n"));
}

#[test]
fn items_render_in_order_and_escaped() {
    let source = EchoSource { head: None };
    let text = response_text(Some(&source), &[item(1, "First"), item(2, "Café")]);

    let first = text.find("<div>First</div>").expect("first item rendered");
    let second = text
        .find("<div>Caf&#x00E9;</div>")
        .expect("second item rendered escaped");
    assert!(first < second);
}

#[test]
fn base_reference_prefers_the_explicit_override() {
    let source = EchoSource { head: None };

    let from_feed = response_text(Some(&source), &[item(1, "A")]);
    assert!(from_feed.contains("<base href=\"http://example.com/\">"));

    let mut overridden = item(1, "A");
    overridden.base = Some("http://override.example.com/base/".into());
    let text = response_text(Some(&source), &[overridden]);
    assert!(text.contains("<base href=\"http://override.example.com/base/\">"));
}

#[test]
fn unparsable_base_candidates_are_dropped() {
    let source = EchoSource { head: None };
    let mut bad = item(1, "A");
    bad.base = None;
    bad.feed.homepage = None;
    bad.feed.link = "not a url".into();

    let text = response_text(Some(&source), &[bad]);
    assert!(!text.contains("<base"));
}

#[test]
fn source_preamble_lands_in_the_head() {
    let source = EchoSource {
        head: Some("<style>body { margin: 0; }</style>".into()),
    };
    let text = response_text(Some(&source), &[item(1, "A")]);
    let head_end = text.find("</head>").unwrap();
    let style = text.find("<style>").unwrap();
    assert!(style < head_end);
}

#[test]
fn output_is_byte_deterministic() {
    let source = EchoSource { head: None };
    let items = [item(1, "A"), item(2, "B")];
    assert_eq!(
        render_response(Some(&source), &items, now()),
        render_response(Some(&source), &items, now())
    );
}

#[test]
fn missing_source_still_yields_a_complete_empty_document() {
    let text = response_text(None, &[]);
    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.contains("<body>\n</body>"));
}
