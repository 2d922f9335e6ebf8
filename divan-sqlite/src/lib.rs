//! SQLite backend implementation for divan.
//!
//! This crate provides a SQLite-based implementation of the `StoreBackend` trait. Each
//! collection is a table with `id`, `rev` and a JSON document column; ids and revisions are
//! generated by the engine, and collection create/delete batches run inside one transaction.
//!
//! Statements run on tokio's blocking thread pool, against one writer connection and, for
//! file databases in WAL mode, a set of reader connections.
//!
//! To use this backend, keep the default `sqlite` feature of the `divan` crate enabled.
//!
//! # Connection
//!
//! The builder takes a file path, a `sqlite://` URL or `:memory:`.
//!
//! # Example
//!
//! ```ignore
//! use divan::{backend::StoreBackendBuilder, sqlite::SqliteStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStore::builder("sqlite://divan.db")
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as divan_sqlite;

mod pool;
mod query;
pub mod store;

pub use store::{SqliteStore, SqliteStoreBuilder};
