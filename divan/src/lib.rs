//! Main divan crate: a schema-light JSON document store on a relational engine.
//!
//! This crate is the entry point for users of divan. It re-exports the core types from
//! `divan-core` and gives access to the storage backends.
//!
//! # Features
//!
//! - **Collections as relations** - Every collection is a relation with `id`, `rev` and a document column
//! - **Optimistic concurrency** - Updates and deletes carry the revision they were based on
//! - **Self-describing registry** - The `divan` collection records every other collection
//! - **Multiple backends** - In-memory and SQLite storage behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use divan::{prelude::*, memory::InMemoryStore};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> DivanResult<()> {
//!     let divan = Divan::new(InMemoryStore::new());
//!     divan.start(true).await?;
//!
//!     divan.create_collection("users").await?;
//!     let users = divan.collection("users").await?;
//!
//!     let written = users.post(json!({"name": "Ann"})).await?;
//!     let updated = users
//!         .put(&written.id, json!({"_rev": written.rev, "name": "Ann B."}))
//!         .await?;
//!     users.delete(&updated.id, &updated.rev).await?;
//!
//!     divan.shutdown().await
//! }
//! ```
//!
//! # Opening from the environment
//!
//! ```ignore
//! let divan = divan::open(&DivanConfig::from_env()?).await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`sqlite`] - Persistent SQLite backend (requires the `sqlite` feature)

pub mod prelude;

pub use divan_core::{
    backend, cache, collection, config, descriptor, document, error, manager, query, registry, server, token,
};

// Re-export JSON types for convenience
pub use serde_json;

/// In-memory storage backend implementations.
pub mod memory {
    pub use divan_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// SQLite storage backend implementations.
///
/// This module is only available when the `sqlite` feature is enabled.
#[cfg(feature = "sqlite")]
pub mod sqlite {
    pub use divan_sqlite::{SqliteStore, SqliteStoreBuilder};
}

/// Opens the SQLite database named by `config` and starts a server over it.
///
/// Bootstraps the registry first when `config.bootstrap` is set.
#[cfg(feature = "sqlite")]
pub async fn open(
    config: &config::DivanConfig,
) -> error::DivanResult<server::Divan<sqlite::SqliteStore>> {
    use backend::StoreBackendBuilder;

    let backend = sqlite::SqliteStore::builder(&config.database_url).build().await?;
    let divan = server::Divan::new(backend);
    divan.start(config.bootstrap).await?;

    Ok(divan)
}
