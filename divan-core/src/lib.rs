//! A schema-light JSON document store on top of a relational engine.
//!
//! This crate is the core of the divan project and provides:
//!
//! - **Store backend abstraction** ([`backend`]) - The relational surface a storage engine must offer
//! - **Documents** ([`document`]) - Document bodies, the `_id`/`_rev` reserved keys, write receipts
//! - **Collections** ([`collection`]) - Per-collection post/get/head/put/delete with revision checks
//! - **Descriptors** ([`descriptor`]) - Collection descriptors and identifier validation
//! - **Registry** ([`registry`]) - The `divan` collection describing every other collection
//! - **Collection manager** ([`manager`]) - Atomic creation and destruction of collections
//! - **Config cache** ([`cache`]) - Swappable snapshot of the registry used for name resolution
//! - **Server** ([`server`]) - The [`server::Divan`] facade a transport layer talks to
//! - **Filters** ([`query`]) - Top-level field filters used to scan the registry
//! - **Tokens** ([`token`]) - Unique id/revision generation
//! - **Configuration** ([`config`]) - Settings for opening a store
//! - **Error handling** ([`error`]) - The error taxonomy and result type
//!
//! # Example
//!
//! ```ignore
//! use divan_core::server::Divan;
//! use serde_json::json;
//!
//! let divan = Divan::new(backend);
//! divan.start(true).await?;
//! divan.create_collection("users").await?;
//!
//! let users = divan.collection("users").await?;
//! let written = users.post(json!({"name": "Ann"})).await?;
//! let doc = users.get(&written.id).await?;
//! assert_eq!(doc.to_json()["name"], "Ann");
//! ```

#[allow(unused_extern_crates)]
extern crate self as divan_core;

pub mod backend;
pub mod cache;
pub mod collection;
pub mod config;
pub mod descriptor;
pub mod document;
pub mod error;
pub mod manager;
pub mod query;
pub mod registry;
pub mod server;
pub mod token;
