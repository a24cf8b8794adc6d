use async_trait::async_trait;

use reader_core::{EntityRef, NewsItem, StoreError};

/// Capability a viewer registers with the relay.
///
/// The relay hands every decoded display request to the viewer's source:
/// references are resolved to a flat ordered item list, and each resolved
/// item is rendered to the text block the response embeds. Implementations
/// must be shareable across the registry and the listener task.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Resolve references to live items, preserving request order.
    async fn resolve(&self, refs: &[EntityRef]) -> Result<Vec<NewsItem>, StoreError>;

    /// Textual rendering of one resolved item. The relay escapes the
    /// result, implementations emit plain markup.
    fn render_item(&self, item: &NewsItem) -> String;

    /// Extra head content written before the items, e.g. a platform
    /// marker or shared style block.
    fn preamble(&self) -> Option<String> {
        None
    }
}
