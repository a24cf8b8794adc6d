use reader_core::EntityRef;

/// Query key naming the viewer the request is addressed to.
pub const KEY_VIEWER: &str = "id";
/// Query keys carrying comma-separated id lists, one per reference kind.
pub const KEY_BOOKMARK: &str = "displayBookmark";
pub const KEY_NEWS_BIN: &str = "displayNewsBin";
pub const KEY_SEARCH_MARK: &str = "displaySearchMark";
pub const KEY_NEWS: &str = "displayNews";

/// Literal marking a handshake message. Lines carrying it are forwarded
/// verbatim to the registered handshake handler, whatever their shape.
pub const HANDSHAKE_TOKEN: &str = "startupHandshake";
/// A bare blank-document path is also treated as a handshake.
pub const HANDSHAKE_PATH: &str = "/about:blank";

const PROTOCOL_TOKEN: &str = "HTTP/1.1";

/// Result of decoding one request line. Decoding is total: malformed input
/// yields [`Decoded::Malformed`], never an error or a panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Display(DisplayRequest),
    Handshake(String),
    Malformed,
}

/// A decoded display request: the addressed viewer plus the referenced ids
/// per reference kind, each list in wire order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplayRequest {
    pub viewer_id: String,
    pub bookmarks: Vec<u64>,
    pub bins: Vec<u64>,
    pub searches: Vec<u64>,
    pub news: Vec<u64>,
}

impl DisplayRequest {
    /// Flatten to entity references in fixed kind order (bookmarks, bins,
    /// searches, news), preserving per-kind wire order.
    pub fn refs(&self) -> Vec<EntityRef> {
        let mut refs = Vec::with_capacity(
            self.bookmarks.len() + self.bins.len() + self.searches.len() + self.news.len(),
        );
        refs.extend(self.bookmarks.iter().map(|id| EntityRef::Bookmark(*id)));
        refs.extend(self.bins.iter().map(|id| EntityRef::NewsBin(*id)));
        refs.extend(self.searches.iter().map(|id| EntityRef::SearchMark(*id)));
        refs.extend(self.news.iter().map(|id| EntityRef::News(*id)));
        refs
    }
}

/// Decode one request line.
///
/// Grammar: `<verb> <path> <proto>` where `<path>` starts with `/` and
/// carries a `&`-separated query of `key=value` segments. Duplicate keys:
/// first occurrence wins. A display key with an empty value list counts as
/// explicitly zero references. Unknown keys and non-decimal list elements
/// are ignored. A structurally valid line with no display key and no
/// handshake marker is malformed ("no content"), not a handshake.
pub fn decode(line: &str) -> Decoded {
    let line = line.trim_end_matches(['\r', '\n']).trim();
    if line.is_empty() {
        return Decoded::Malformed;
    }
    if line.contains(HANDSHAKE_TOKEN) {
        return Decoded::Handshake(line.to_string());
    }

    let parts: Vec<&str> = line.split_whitespace().collect();
    let [_verb, path, _proto] = parts.as_slice() else {
        return Decoded::Malformed;
    };
    if !path.starts_with('/') {
        return Decoded::Malformed;
    }

    let (route, query) = match path.split_once('?') {
        Some((route, query)) => (route, query),
        None => (*path, ""),
    };
    if route == HANDSHAKE_PATH {
        return Decoded::Handshake(line.to_string());
    }

    let mut request = DisplayRequest::default();
    let mut viewer_seen = false;
    let mut bookmarks_seen = false;
    let mut bins_seen = false;
    let mut searches_seen = false;
    let mut news_seen = false;

    for segment in query.split('&').filter(|segment| !segment.is_empty()) {
        let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
        match key {
            KEY_VIEWER if !viewer_seen => {
                viewer_seen = true;
                request.viewer_id = value.to_string();
            }
            KEY_BOOKMARK if !bookmarks_seen => {
                bookmarks_seen = true;
                request.bookmarks = parse_ids(value);
            }
            KEY_NEWS_BIN if !bins_seen => {
                bins_seen = true;
                request.bins = parse_ids(value);
            }
            KEY_SEARCH_MARK if !searches_seen => {
                searches_seen = true;
                request.searches = parse_ids(value);
            }
            KEY_NEWS if !news_seen => {
                news_seen = true;
                request.news = parse_ids(value);
            }
            _ => {}
        }
    }

    if bookmarks_seen || bins_seen || searches_seen || news_seen {
        Decoded::Display(request)
    } else {
        Decoded::Malformed
    }
}

/// Build the request line the viewer shell sends for a display request.
pub fn encode_display(request: &DisplayRequest) -> String {
    let mut query = format!("{KEY_VIEWER}={}", request.viewer_id);
    for (key, ids) in [
        (KEY_BOOKMARK, &request.bookmarks),
        (KEY_NEWS_BIN, &request.bins),
        (KEY_SEARCH_MARK, &request.searches),
        (KEY_NEWS, &request.news),
    ] {
        if ids.is_empty() {
            continue;
        }
        let joined = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        query.push('&');
        query.push_str(key);
        query.push('=');
        query.push_str(&joined);
    }
    format!("GET /?{query} {PROTOCOL_TOKEN}")
}

/// Build the handshake line used for single-instance coordination.
pub fn encode_handshake(payload: &str) -> String {
    format!("GET /?{HANDSHAKE_TOKEN}={payload} {PROTOCOL_TOKEN}")
}

fn parse_ids(value: &str) -> Vec<u64> {
    value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| token.parse::<u64>().ok())
        .collect()
}
