use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::{EntityRef, ItemId, Mark, MarkKind, NewsItem};

/// Backing store the cache refreshes from. The desktop application plugs its
/// persistent store in here; [`MemoryStore`] serves the standalone binary
/// and the test suites.
#[async_trait]
pub trait NewsStore: Send + Sync {
    /// All visible items belonging to `mark`, newest first.
    async fn load_visible_items(&self, mark: &Mark) -> Result<Vec<NewsItem>, StoreError>;

    /// Cheap path: only the ids of visible items belonging to `mark`.
    async fn load_references(&self, mark: &Mark) -> Result<Vec<ItemId>, StoreError>;

    /// Resolve ids to items, preserving input order. Unknown ids are
    /// skipped, not an error.
    async fn resolve_items(&self, ids: &[ItemId]) -> Result<Vec<NewsItem>, StoreError>;

    /// Look a mark up by its wire reference.
    async fn lookup_mark(&self, r: &EntityRef) -> Result<Option<Mark>, StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: Arc<RwLock<HashMap<ItemId, NewsItem>>>,
    marks: Arc<RwLock<HashMap<u64, Mark>>>,
    // saved-search id -> matching item ids
    searches: Arc<RwLock<HashMap<u64, Vec<ItemId>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_item(&self, item: NewsItem) {
        let mut items = self.items.write().await;
        items.insert(item.id, item);
    }

    pub async fn update_item(&self, item: NewsItem) {
        self.insert_item(item).await;
    }

    pub async fn remove_item(&self, id: ItemId) {
        let mut items = self.items.write().await;
        items.remove(&id);
    }

    pub async fn upsert_mark(&self, mark: Mark) {
        let mut marks = self.marks.write().await;
        marks.insert(mark.id, mark);
    }

    pub async fn set_search_results(&self, search_id: u64, ids: Vec<ItemId>) {
        let mut searches = self.searches.write().await;
        searches.insert(search_id, ids);
    }

    fn belongs(&self, mark: &Mark, item: &NewsItem, searches: &HashMap<u64, Vec<ItemId>>) -> bool {
        match &mark.kind {
            MarkKind::Bookmark { feed_id } => item.feed.id == *feed_id,
            MarkKind::NewsBin => item.parent_bin == mark.id,
            MarkKind::SavedSearch => searches
                .get(&mark.id)
                .map(|ids| ids.contains(&item.id))
                .unwrap_or(false),
            MarkKind::Aggregate { members } => members
                .iter()
                .any(|member| self.belongs(member, item, searches)),
        }
    }

    async fn member_items(&self, mark: &Mark) -> Vec<NewsItem> {
        let items = self.items.read().await;
        let searches = self.searches.read().await;
        let mut found: Vec<NewsItem> = items
            .values()
            .filter(|item| item.is_visible() && self.belongs(mark, item, &searches))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.relevant_date()
                .cmp(&a.relevant_date())
                .then(a.id.cmp(&b.id))
        });
        found
    }
}

#[async_trait]
impl NewsStore for MemoryStore {
    async fn load_visible_items(&self, mark: &Mark) -> Result<Vec<NewsItem>, StoreError> {
        Ok(self.member_items(mark).await)
    }

    async fn load_references(&self, mark: &Mark) -> Result<Vec<ItemId>, StoreError> {
        Ok(self
            .member_items(mark)
            .await
            .into_iter()
            .map(|item| item.id)
            .collect())
    }

    async fn resolve_items(&self, ids: &[ItemId]) -> Result<Vec<NewsItem>, StoreError> {
        let items = self.items.read().await;
        Ok(ids.iter().filter_map(|id| items.get(id).cloned()).collect())
    }

    async fn lookup_mark(&self, r: &EntityRef) -> Result<Option<Mark>, StoreError> {
        if let EntityRef::News(_) = r {
            return Ok(None);
        }
        let marks = self.marks.read().await;
        Ok(marks.get(&r.id()).filter(|mark| mark.matches_ref(r)).cloned())
    }
}
