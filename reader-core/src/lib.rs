pub mod cache;
pub mod error;
pub mod events;
pub mod grouping;
pub mod models;
pub mod store;

pub use cache::EntityCache;
pub use error::{StoreError, SyncError};
pub use events::{spawn_cache_sync, ItemEvent, ItemUpdate, SyncHandle};
pub use grouping::{group, needs_regroup, EntityGroup, GroupingMode};
pub use models::{EntityRef, FeedInfo, ItemId, ItemState, Mark, MarkKind, NewsItem};
pub use store::{MemoryStore, NewsStore};
