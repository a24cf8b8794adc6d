use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use reader_core::{FeedInfo, ItemState, Mark, MarkKind, MemoryStore, NewsItem};
use reader_relay::{encode_display, DisplayRequest, MarkContentProvider, RelayConfig, RelayServer};

/// Standalone relay: seeds an in-memory store with a demo feed and serves
/// it until interrupted. The desktop application embeds [`RelayServer`]
/// directly and substitutes its persistent store.
#[tokio::main]
async fn main() {
    init_tracing();

    let config = RelayConfig::load();
    let store = Arc::new(MemoryStore::new());
    seed_demo(&store).await;

    let (handshake_tx, mut handshake_rx) = mpsc::channel(8);
    let mut server = RelayServer::new(config).with_handshake(handshake_tx);
    server
        .registry()
        .register("main", Arc::new(MarkContentProvider::new(store)));

    let Some(addr) = server.start(true).await else {
        warn!("no port available, another instance is probably running");
        return;
    };

    let sample = DisplayRequest {
        viewer_id: "main".into(),
        bookmarks: vec![1],
        ..Default::default()
    };
    info!(%addr, request = %encode_display(&sample), "relay ready");

    tokio::spawn(async move {
        while let Some(token) = handshake_rx.recv().await {
            info!(%token, "handshake message received");
        }
    });

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to wait for interrupt");
    }
    if let Err(err) = server.stop().await {
        warn!(error = %err, "relay stop failed");
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn seed_demo(store: &MemoryStore) {
    let feed = FeedInfo {
        id: 1,
        title: Some("Relay Demo".into()),
        link: "http://localhost/feed.xml".into(),
        homepage: Some("http://localhost/".into()),
    };
    store
        .upsert_mark(Mark {
            id: 1,
            name: "Relay Demo".into(),
            kind: MarkKind::Bookmark { feed_id: 1 },
        })
        .await;
    for (id, title) in [(1u64, "Hello from the relay"), (2, "A second item")] {
        store
            .insert_item(NewsItem {
                id,
                title: title.into(),
                link: Some(format!("http://localhost/items/{id}")),
                description: Some("Demo content served over the loopback relay.".into()),
                author: None,
                category: None,
                labels: Vec::new(),
                rating: 0,
                sticky: false,
                state: ItemState::New,
                parent_bin: 0,
                feed: feed.clone(),
                in_reply_to: None,
                base: None,
                received_at: Utc::now(),
                published_at: None,
                modified_at: None,
            })
            .await;
    }
}
