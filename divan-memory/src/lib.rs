//! In-memory relational backend for divan.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is ideal for development,
//! testing, and single-process deployments that do not need durability.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Relational layout** - One relation per collection, rows keyed by document id
//! - **Atomic schema batches** - Collection create/delete commit all steps or none
//! - **Token defaults** - Ids and revisions default to fresh unique tokens
//!
//! # Quick Start
//!
//! ```ignore
//! use divan_core::server::Divan;
//! use divan_memory::InMemoryStore;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let divan = Divan::new(InMemoryStore::new());
//!     divan.start(true).await?;
//!     divan.create_collection("users").await?;
//!
//!     let users = divan.collection("users").await?;
//!     users.post(json!({"name": "Alice"})).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as divan_memory;

pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
