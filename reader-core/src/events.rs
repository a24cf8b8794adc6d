use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::EntityCache;
use crate::error::SyncError;
use crate::grouping::{needs_regroup, GroupingMode};
use crate::models::NewsItem;

/// One batch of domain changes, in the order the store observed them.
/// Batches for unrelated ids may be delivered in any order; within a batch
/// the add/update/remove ordering is preserved by construction.
#[derive(Debug, Clone)]
pub enum ItemEvent {
    Added(Vec<NewsItem>),
    Updated(Vec<ItemUpdate>),
    Removed(Vec<NewsItem>),
}

/// An update with its pre-image, so regroup classification can tell which
/// field actually changed.
#[derive(Debug, Clone)]
pub struct ItemUpdate {
    pub previous: NewsItem,
    pub current: NewsItem,
}

pub struct SyncHandle {
    cancel_tx: broadcast::Sender<()>,
    join: JoinHandle<()>,
}

impl SyncHandle {
    pub async fn stop(self) -> Result<(), SyncError> {
        let _ = self.cancel_tx.send(());
        self.join.await.map_err(SyncError::from)
    }
}

/// Consume domain event batches and keep `cache` in sync.
///
/// All mutation funnels through this single loop; batches are applied in
/// arrival order. Whenever a batch is relevant to the active grouping mode
/// a unit notification is sent on `regroup_tx` so consumers re-pull the
/// snapshot and regroup.
pub fn spawn_cache_sync(
    cache: EntityCache,
    mode: Arc<RwLock<GroupingMode>>,
    mut events_rx: mpsc::Receiver<ItemEvent>,
    regroup_tx: mpsc::Sender<()>,
) -> SyncHandle {
    let (cancel_tx, mut cancel_rx) = broadcast::channel(1);
    let join = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel_rx.recv() => {
                    info!("cache sync shutdown requested");
                    break;
                }
                event = events_rx.recv() => {
                    let Some(event) = event else {
                        debug!("event source closed, cache sync stopping");
                        break;
                    };
                    apply(&cache, &event).await;
                    let active = *mode.read().await;
                    if needs_regroup(active, &event) {
                        if regroup_tx.send(()).await.is_err() {
                            warn!("regroup receiver dropped");
                        }
                    }
                }
            }
        }
    });

    SyncHandle { cancel_tx, join }
}

async fn apply(cache: &EntityCache, event: &ItemEvent) {
    match event {
        ItemEvent::Added(items) => cache.apply_added(items).await,
        ItemEvent::Updated(updates) => {
            let current: Vec<NewsItem> =
                updates.iter().map(|update| update.current.clone()).collect();
            cache.apply_updated(&current).await;
        }
        ItemEvent::Removed(items) => cache.apply_removed(items).await,
    }
}
