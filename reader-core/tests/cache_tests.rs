use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};

use reader_core::{
    EntityCache, EntityRef, FeedInfo, ItemId, ItemState, Mark, MarkKind, MemoryStore, NewsItem,
    NewsStore, StoreError,
};

fn feed() -> FeedInfo {
    FeedInfo {
        id: 1,
        title: Some("Feed".into()),
        link: "http://example.com/feed.xml".into(),
        homepage: None,
    }
}

fn item(id: u64, state: ItemState) -> NewsItem {
    NewsItem {
        id,
        title: format!("Item {id}"),
        link: Some(format!("http://example.com/{id}")),
        description: None,
        author: None,
        category: None,
        labels: Vec::new(),
        rating: 0,
        sticky: false,
        state,
        parent_bin: 0,
        feed: feed(),
        in_reply_to: None,
        base: None,
        received_at: Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap()
            + Duration::minutes(id as i64),
        published_at: None,
        modified_at: None,
    }
}

fn bookmark() -> Mark {
    Mark {
        id: 10,
        name: "Feed".into(),
        kind: MarkKind::Bookmark { feed_id: 1 },
    }
}

struct FailingStore;

#[async_trait]
impl NewsStore for FailingStore {
    async fn load_visible_items(&self, _mark: &Mark) -> Result<Vec<NewsItem>, StoreError> {
        Err(StoreError::Unavailable("store offline".into()))
    }

    async fn load_references(&self, _mark: &Mark) -> Result<Vec<ItemId>, StoreError> {
        Err(StoreError::Unavailable("store offline".into()))
    }

    async fn resolve_items(&self, _ids: &[ItemId]) -> Result<Vec<NewsItem>, StoreError> {
        Err(StoreError::Unavailable("store offline".into()))
    }

    async fn lookup_mark(&self, _r: &EntityRef) -> Result<Option<Mark>, StoreError> {
        Err(StoreError::Unavailable("store offline".into()))
    }
}

#[tokio::test]
async fn full_refresh_loads_only_visible_items() {
    let store = MemoryStore::new();
    store.insert_item(item(1, ItemState::New)).await;
    store.insert_item(item(2, ItemState::Hidden)).await;
    store.insert_item(item(3, ItemState::Deleted)).await;
    store.insert_item(item(4, ItemState::Read)).await;

    let cache = EntityCache::new();
    let loaded = cache.refresh(&store, &bookmark(), false).await.unwrap();

    assert_eq!(loaded.len(), 2);
    assert!(cache.contains(1).await);
    assert!(cache.contains(4).await);
    assert!(!cache.contains(2).await);
    assert!(!cache.contains(3).await);
}

#[tokio::test]
async fn incremental_refresh_returns_only_new_items() {
    let store = MemoryStore::new();
    store.insert_item(item(1, ItemState::New)).await;
    store.insert_item(item(2, ItemState::New)).await;

    let cache = EntityCache::new();
    cache.refresh(&store, &bookmark(), false).await.unwrap();

    store.insert_item(item(3, ItemState::New)).await;
    let added = cache.refresh(&store, &bookmark(), true).await.unwrap();

    assert_eq!(added.len(), 1);
    assert_eq!(added[0].id, 3);
    assert_eq!(cache.len().await, 3);
}

#[tokio::test]
async fn apply_added_is_idempotent() {
    let cache = EntityCache::new();
    let batch = vec![item(1, ItemState::New), item(2, ItemState::New)];

    cache.apply_added(&batch).await;
    cache.apply_added(&batch).await;

    assert_eq!(cache.len().await, 2);
}

#[tokio::test]
async fn add_remove_add_leaves_item_present() {
    let cache = EntityCache::new();
    let batch = vec![item(1, ItemState::New)];

    cache.apply_added(&batch).await;
    cache.apply_removed(&batch).await;
    cache.apply_added(&batch).await;

    assert!(cache.contains(1).await);
    assert_eq!(cache.len().await, 1);
}

#[tokio::test]
async fn apply_removed_discards_by_id_whatever_the_instance() {
    let cache = EntityCache::new();
    cache.apply_added(&[item(1, ItemState::New)]).await;

    let mut other_instance = item(1, ItemState::Read);
    other_instance.title = "edited elsewhere".into();
    cache.apply_removed(&[other_instance]).await;

    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn apply_updated_drops_hidden_and_restores_visible() {
    let cache = EntityCache::new();
    cache.apply_added(&[item(1, ItemState::New)]).await;

    cache.apply_updated(&[item(1, ItemState::Hidden)]).await;
    assert!(!cache.contains(1).await);

    // restoration: hidden -> visible arrives as an update for an absent id
    cache.apply_updated(&[item(1, ItemState::Read)]).await;
    assert!(cache.contains(1).await);
}

#[tokio::test]
async fn failed_refresh_keeps_last_known_good_state() {
    let store = MemoryStore::new();
    store.insert_item(item(1, ItemState::New)).await;
    store.insert_item(item(2, ItemState::New)).await;

    let cache = EntityCache::new();
    cache.refresh(&store, &bookmark(), false).await.unwrap();
    let before = cache.snapshot().await;

    let result = cache.refresh(&FailingStore, &bookmark(), false).await;
    assert!(result.is_err());
    assert_eq!(cache.snapshot().await, before);
}

#[tokio::test]
async fn saved_search_refreshes_through_the_reference_path() {
    let store = MemoryStore::new();
    store.insert_item(item(1, ItemState::New)).await;
    store.insert_item(item(2, ItemState::New)).await;
    store.insert_item(item(3, ItemState::Hidden)).await;
    store.set_search_results(20, vec![2, 3]).await;

    let search = Mark {
        id: 20,
        name: "Search".into(),
        kind: MarkKind::SavedSearch,
    };
    assert!(search.loads_references_only());

    let cache = EntityCache::new();
    let loaded = cache.refresh(&store, &search, false).await.unwrap();

    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, 2);
}

#[tokio::test]
async fn snapshot_is_newest_first() {
    let cache = EntityCache::new();
    cache
        .apply_added(&[
            item(1, ItemState::New),
            item(3, ItemState::New),
            item(2, ItemState::New),
        ])
        .await;

    let ids: Vec<u64> = cache.snapshot().await.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![3, 2, 1]);
}
