use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use reader_core::{EntityCache, EntityRef, Mark, NewsItem, NewsStore, StoreError};

use crate::viewer::ContentSource;

/// The default cache-backed content source.
///
/// Owns the entity cache for exactly one mark at a time; switching marks
/// rebuilds the cache wholesale. News references resolve from the cache
/// first and fall back to the store; mark references switch or refresh the
/// bound mark and serve its snapshot. The desktop shell wraps this with
/// its richer item template.
pub struct MarkContentProvider {
    store: Arc<dyn NewsStore>,
    cache: EntityCache,
    mark: RwLock<Option<Mark>>,
}

impl MarkContentProvider {
    pub fn new(store: Arc<dyn NewsStore>) -> Self {
        Self {
            store,
            cache: EntityCache::new(),
            mark: RwLock::new(None),
        }
    }

    /// Bind to `mark`, rebuilding the cache from the store. Returns the
    /// freshly loaded items.
    pub async fn set_mark(&self, mark: Mark) -> Result<Vec<NewsItem>, StoreError> {
        let loaded = self.cache.refresh(self.store.as_ref(), &mark, false).await?;
        *self.mark.write().await = Some(mark);
        Ok(loaded)
    }

    pub async fn current_mark(&self) -> Option<Mark> {
        self.mark.read().await.clone()
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    async fn resolve_mark_ref(&self, r: &EntityRef) -> Result<Vec<NewsItem>, StoreError> {
        let bound = self.mark.read().await.clone();
        if let Some(mark) = bound.filter(|mark| mark.matches_ref(r)) {
            // already bound: pick up anything new, then serve the snapshot
            self.cache.refresh(self.store.as_ref(), &mark, true).await?;
            return Ok(self.cache.snapshot().await);
        }
        match self.store.lookup_mark(r).await? {
            Some(mark) => {
                self.set_mark(mark).await?;
                Ok(self.cache.snapshot().await)
            }
            None => {
                debug!(reference = ?r, "reference names no known mark");
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl ContentSource for MarkContentProvider {
    async fn resolve(&self, refs: &[EntityRef]) -> Result<Vec<NewsItem>, StoreError> {
        let mut items = Vec::new();
        for r in refs {
            match r {
                EntityRef::News(id) => {
                    if let Some(item) = self.cache.get(*id).await {
                        items.push(item);
                    } else {
                        let resolved = self.store.resolve_items(&[*id]).await?;
                        items.extend(resolved.into_iter().filter(NewsItem::is_visible));
                    }
                }
                EntityRef::Bookmark(_) | EntityRef::NewsBin(_) | EntityRef::SearchMark(_) => {
                    items.extend(self.resolve_mark_ref(r).await?);
                }
            }
        }
        Ok(items)
    }

    fn render_item(&self, item: &NewsItem) -> String {
        let title = if item.title.is_empty() {
            "(untitled)"
        } else {
            item.title.as_str()
        };
        let mut block = String::from("<div class=\"news\">");
        match &item.link {
            Some(link) => block.push_str(&format!("<h2><a href=\"{link}\">{title}</a></h2>")),
            None => block.push_str(&format!("<h2>{title}</h2>")),
        }
        if let Some(description) = &item.description {
            block.push_str(&format!("<p>{description}</p>"));
        }
        block.push_str("</div>");
        block
    }
}
