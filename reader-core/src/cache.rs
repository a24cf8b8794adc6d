use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StoreError;
use crate::models::{ItemId, Mark, NewsItem};
use crate::store::NewsStore;

/// In-memory set of the visible news items belonging to one mark.
///
/// Every mutation and snapshot goes through a single mutex, so readers
/// always observe a fully-applied state. The handle is cheap to clone; all
/// clones share the same underlying set. One cache exists per active mark
/// and is rebuilt wholesale on mark change, never shared across marks.
#[derive(Debug, Clone, Default)]
pub struct EntityCache {
    inner: Arc<Mutex<HashMap<ItemId, NewsItem>>>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reload the cache from the backing store.
    ///
    /// With `incremental` false the cached set is replaced by the store's
    /// current view of `mark`; with `incremental` true only items not yet
    /// present are added. Returns exactly the items that entered the cache.
    ///
    /// The store is queried before the lock is taken: a refresh that fails
    /// leaves the cache at its state before the call.
    pub async fn refresh(
        &self,
        store: &dyn NewsStore,
        mark: &Mark,
        incremental: bool,
    ) -> Result<Vec<NewsItem>, StoreError> {
        let loaded = if mark.loads_references_only() {
            let refs = store.load_references(mark).await?;
            store.resolve_items(&refs).await?
        } else {
            store.load_visible_items(mark).await?
        };
        let loaded: Vec<NewsItem> = loaded.into_iter().filter(NewsItem::is_visible).collect();

        let mut items = self.inner.lock().await;
        if !incremental {
            items.clear();
            for item in &loaded {
                items.insert(item.id, item.clone());
            }
            debug!(mark = %mark.name, count = loaded.len(), "cache reloaded");
            return Ok(loaded);
        }

        let mut added = Vec::new();
        for item in loaded {
            if !items.contains_key(&item.id) {
                items.insert(item.id, item.clone());
                added.push(item);
            }
        }
        debug!(mark = %mark.name, count = added.len(), "cache refreshed incrementally");
        Ok(added)
    }

    /// Add items. Re-adding an already cached id overwrites it in place,
    /// the set never holds two entries for one id.
    pub async fn apply_added(&self, added: &[NewsItem]) {
        let mut items = self.inner.lock().await;
        for item in added {
            if item.is_visible() {
                items.insert(item.id, item.clone());
            }
        }
    }

    /// Apply updated items. An update into hidden/deleted drops the entry;
    /// an update of an absent but visible item restores it.
    pub async fn apply_updated(&self, updated: &[NewsItem]) {
        let mut items = self.inner.lock().await;
        for item in updated {
            if item.is_visible() {
                items.insert(item.id, item.clone());
            } else {
                items.remove(&item.id);
            }
        }
    }

    /// Discard items by id, whatever instance the caller holds.
    pub async fn apply_removed(&self, removed: &[NewsItem]) {
        let mut items = self.inner.lock().await;
        for item in removed {
            items.remove(&item.id);
        }
    }

    pub async fn contains(&self, id: ItemId) -> bool {
        self.inner.lock().await.contains_key(&id)
    }

    pub async fn get(&self, id: ItemId) -> Option<NewsItem> {
        self.inner.lock().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Copy of the cached items, newest first, id as tiebreak.
    pub async fn snapshot(&self) -> Vec<NewsItem> {
        let items = self.inner.lock().await;
        let mut all: Vec<NewsItem> = items.values().cloned().collect();
        all.sort_by(|a, b| {
            b.relevant_date()
                .cmp(&a.relevant_date())
                .then(a.id.cmp(&b.id))
        });
        all
    }

    pub async fn clear(&self) {
        self.inner.lock().await.clear();
    }
}
