//! In-memory snapshot of the collection registry.
//!
//! Every request resolves its collection name here. The snapshot is immutable once built and is
//! replaced wholesale after each registry rebuild; entries are never patched in place.

use std::sync::Arc;

use mea::rwlock::RwLock;

use crate::{
    descriptor::CollectionDescriptor,
    error::{DivanError, DivanResult},
    registry::CollectionMap,
};

/// Read-mostly, atomically replaceable map from collection name to descriptor.
#[derive(Debug, Default)]
pub struct ConfigCache {
    snapshot: RwLock<Arc<CollectionMap>>,
}

impl ConfigCache {
    /// Creates an empty cache. Nothing resolves until the first [`ConfigCache::replace`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a collection name to its descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`DivanError::CollectionNotFound`] if the name is not in the current snapshot.
    pub async fn resolve(&self, name: &str) -> DivanResult<CollectionDescriptor> {
        self.snapshot
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| DivanError::CollectionNotFound(name.to_string()))
    }

    /// Returns the current snapshot.
    ///
    /// The returned map stays valid and unchanged even if the cache is replaced afterwards.
    pub async fn snapshot(&self) -> Arc<CollectionMap> {
        self.snapshot.read().await.clone()
    }

    /// Swaps in a freshly loaded map.
    pub async fn replace(&self, collections: CollectionMap) {
        *self.snapshot.write().await = Arc::new(collections);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(names: &[&str]) -> CollectionMap {
        names
            .iter()
            .map(|name| (name.to_string(), CollectionDescriptor::new(*name)))
            .collect()
    }

    #[tokio::test]
    async fn empty_cache_resolves_nothing() {
        let cache = ConfigCache::new();

        assert_eq!(
            cache.resolve("users").await,
            Err(DivanError::CollectionNotFound("users".into())),
        );
    }

    #[tokio::test]
    async fn replace_swaps_the_whole_map() {
        let cache = ConfigCache::new();
        cache.replace(map(&["users", "events"])).await;

        assert_eq!(cache.resolve("users").await.unwrap().name(), "users");

        cache.replace(map(&["events"])).await;

        assert!(cache.resolve("users").await.is_err());
        assert!(cache.resolve("events").await.is_ok());
    }

    #[tokio::test]
    async fn old_snapshots_are_not_mutated() {
        let cache = ConfigCache::new();
        cache.replace(map(&["users"])).await;

        let before = cache.snapshot().await;
        cache.replace(map(&[])).await;

        assert!(before.contains_key("users"));
        assert!(cache.snapshot().await.is_empty());
    }
}
