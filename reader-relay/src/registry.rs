use std::sync::Arc;

use dashmap::DashMap;

use crate::viewer::ContentSource;

/// Process-wide map from viewer id to registered content source.
///
/// Viewers register on construction and unregister on disposal; requests
/// look sources up concurrently from the listener task. Lookups clone the
/// `Arc` out, so a concurrently removed entry is either fully present or
/// fully absent to a caller, never half torn down.
#[derive(Clone, Default)]
pub struct ViewerRegistry {
    sources: Arc<DashMap<String, Arc<dyn ContentSource>>>,
}

impl ViewerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `source` under `id`. Re-registering an active id silently
    /// replaces the previous entry.
    pub fn register(&self, id: impl Into<String>, source: Arc<dyn ContentSource>) {
        self.sources.insert(id.into(), source);
    }

    pub fn unregister(&self, id: &str) -> bool {
        self.sources.remove(id).is_some()
    }

    pub fn lookup(&self, id: &str) -> Option<Arc<dyn ContentSource>> {
        self.sources.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
