//! The server facade tying the registry, the config cache and the backend together.
//!
//! [`Divan`] is what a transport layer talks to. Collection names are resolved against the
//! config cache; resolved collections then go straight to the backend, so document operations
//! are always immediately consistent while collection metadata is eventually consistent (it is
//! refreshed after every create/delete and on start).
//!
//! # Example
//!
//! ```ignore
//! use divan_core::server::Divan;
//! use divan_memory::InMemoryStore;
//!
//! let divan = Divan::new(InMemoryStore::new());
//! divan.start(true).await?;
//!
//! divan.create_collection("users").await?;
//! let users = divan.collection("users").await?;
//! let written = users.post(json!({"name": "Ann"})).await?;
//! ```

use tracing::info;

use crate::{
    backend::StoreBackend,
    cache::ConfigCache,
    collection::Collection,
    descriptor::CollectionDescriptor,
    error::DivanResult,
    manager::CollectionManager,
    registry::Registry,
};

/// A document store server bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct Divan<B: StoreBackend> {
    backend: B,
    cache: ConfigCache,
}

impl<B: StoreBackend> Divan<B> {
    /// Creates a server over `backend` with an empty config cache.
    ///
    /// Call [`Divan::start`] before resolving collections.
    pub fn new(backend: B) -> Self {
        Self { backend, cache: ConfigCache::new() }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns a handle on the registry collection.
    pub fn registry(&self) -> Registry<'_, B> {
        Registry::new(&self.backend)
    }

    /// Optionally bootstraps the registry, then loads the config cache from it.
    ///
    /// # Errors
    ///
    /// Returns [`DivanError::Initialization`](crate::error::DivanError::Initialization) if the
    /// registry is missing and `bootstrap` is `false`.
    pub async fn start(&self, bootstrap: bool) -> DivanResult<()> {
        info!(target: "divan::server", "Starting Divan...");

        if bootstrap {
            info!(target: "divan::server", "Bootstrapping...");
            self.bootstrap().await?;
        }

        info!(target: "divan::server", "Loading config...");
        self.load_config().await
    }

    /// Creates the registry relation if it does not exist yet.
    pub async fn bootstrap(&self) -> DivanResult<bool> {
        self.registry().bootstrap().await
    }

    /// Rebuilds the config cache from a full registry scan.
    pub async fn load_config(&self) -> DivanResult<()> {
        let collections = self.registry().list().await?;

        let mut names = collections.keys().cloned().collect::<Vec<_>>();
        names.sort();
        info!(target: "divan::server", collections = ?names, "Loaded config");

        self.cache.replace(collections).await;

        Ok(())
    }

    /// Resolves a collection name against the config cache.
    ///
    /// # Errors
    ///
    /// Returns [`DivanError::CollectionNotFound`](crate::error::DivanError::CollectionNotFound)
    /// if the name is not registered.
    pub async fn resolve(&self, name: &str) -> DivanResult<CollectionDescriptor> {
        self.cache.resolve(name).await
    }

    /// Resolves `name` and returns a handle for document operations on it.
    pub async fn collection(&self, name: &str) -> DivanResult<Collection<'_, B>> {
        Ok(Collection::new(self.resolve(name).await?, &self.backend))
    }

    /// Names of all cached collections, sorted.
    pub async fn collection_names(&self) -> Vec<String> {
        let mut names = self
            .cache
            .snapshot()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    /// Creates a collection and refreshes the config cache.
    ///
    /// Accepts a bare name (documents go in the `doc` column) or a full descriptor.
    ///
    /// # Errors
    ///
    /// See [`CollectionManager::create`]. On error the cache is left as it was.
    pub async fn create_collection(&self, descriptor: impl Into<CollectionDescriptor>) -> DivanResult<()> {
        CollectionManager::new(&self.backend)
            .create(&descriptor.into())
            .await?;

        self.load_config().await
    }

    /// Deletes a registered collection with all its documents and refreshes the config cache.
    ///
    /// # Errors
    ///
    /// Returns [`DivanError::CollectionNotFound`](crate::error::DivanError::CollectionNotFound)
    /// if `name` does not resolve. See [`CollectionManager::delete`] for the rest.
    pub async fn delete_collection(&self, name: &str) -> DivanResult<()> {
        let descriptor = self.resolve(name).await?;

        CollectionManager::new(&self.backend)
            .delete(&descriptor)
            .await?;

        self.load_config().await
    }

    /// Shuts down the backend.
    pub async fn shutdown(self) -> DivanResult<()> {
        self.backend.shutdown().await
    }
}
