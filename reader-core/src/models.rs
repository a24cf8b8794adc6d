use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ItemId = u64;

/// Lifecycle state of a news item. Hidden and deleted items are kept in the
/// backing store for a while but never surface in caches or responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemState {
    New,
    Updated,
    Unread,
    Read,
    Hidden,
    Deleted,
}

impl ItemState {
    pub fn is_visible(self) -> bool {
        !matches!(self, ItemState::Hidden | ItemState::Deleted)
    }
}

/// Feed identity carried inline on every item so grouping by feed and
/// deriving a render base need no extra store round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedInfo {
    pub id: u64,
    pub title: Option<String>,
    pub link: String,
    pub homepage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: ItemId,
    pub title: String,
    pub link: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub labels: Vec<String>,
    /// 0..=100
    pub rating: u8,
    pub sticky: bool,
    pub state: ItemState,
    /// Id of the news bin this item was copied into, 0 if none.
    pub parent_bin: u64,
    pub feed: FeedInfo,
    pub in_reply_to: Option<ItemId>,
    /// Explicit base reference for rendering, overrides the feed link.
    pub base: Option<String>,
    pub received_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl NewsItem {
    pub fn is_visible(&self) -> bool {
        self.state.is_visible()
    }

    /// The timestamp date-grouping and snapshot ordering run on:
    /// modification date, else publication date, else arrival date.
    pub fn relevant_date(&self) -> DateTime<Utc> {
        self.modified_at
            .or(self.published_at)
            .unwrap_or(self.received_at)
    }
}

/// Lightweight (kind, id) pointer to a domain object. Resolution is always
/// a lookup; a reference never owns the entity it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    Bookmark(u64),
    NewsBin(u64),
    SearchMark(u64),
    News(ItemId),
}

impl EntityRef {
    pub fn id(self) -> u64 {
        match self {
            EntityRef::Bookmark(id)
            | EntityRef::NewsBin(id)
            | EntityRef::SearchMark(id)
            | EntityRef::News(id) => id,
        }
    }
}

/// A named collection of news items, the unit of cache scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub id: u64,
    pub name: String,
    pub kind: MarkKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarkKind {
    /// A subscribed feed.
    Bookmark { feed_id: u64 },
    /// A bin items are copied into by hand.
    NewsBin,
    /// A stored search over the whole store.
    SavedSearch,
    /// Synthetic mark aggregating a folder's descendant marks.
    Aggregate { members: Vec<Mark> },
}

impl Mark {
    /// Marks that can cheaply enumerate references only, resolved lazily.
    /// Bookmarks and bins load their items eagerly instead.
    pub fn loads_references_only(&self) -> bool {
        matches!(self.kind, MarkKind::SavedSearch | MarkKind::Aggregate { .. })
    }

    /// Whether `r` names this mark. Aggregates are synthetic and never
    /// addressed over the wire.
    pub fn matches_ref(&self, r: &EntityRef) -> bool {
        match (&self.kind, r) {
            (MarkKind::Bookmark { .. }, EntityRef::Bookmark(id)) => *id == self.id,
            (MarkKind::NewsBin, EntityRef::NewsBin(id)) => *id == self.id,
            (MarkKind::SavedSearch, EntityRef::SearchMark(id)) => *id == self.id,
            _ => false,
        }
    }
}
