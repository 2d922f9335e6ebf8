//! Storage backend abstraction for the document store.
//!
//! A backend is a relational engine seen through the narrow surface this store needs: one
//! relation per collection with `id`, `rev` and a document column, server-side generation of
//! unique tokens for `id`/`rev` defaults, a "get top-level field" filter, and all-or-nothing
//! execution of schema batches.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use divan_core::{backend::{StoreBackend, SchemaOp}, descriptor::CollectionDescriptor};
//! use serde_json::json;
//!
//! let users = CollectionDescriptor::new("users");
//! backend.apply_schema(vec![SchemaOp::CreateRelation(users.clone())]).await?;
//!
//! let written = backend.insert_row(&users, None, json!({"name": "Ann"})).await?;
//! let row = backend.fetch_row(&users, &written.id).await?;
//! ```

use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;

use crate::{
    descriptor::CollectionDescriptor,
    document::{StoredDocument, WriteResult},
    error::DivanResult,
    query::Expr,
};

/// One step of an atomic schema batch.
///
/// Batches passed to [`StoreBackend::apply_schema`] either commit every step or none of them.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaOp {
    /// Creates the relation `name(id, rev, <docField>)` with primary key `id`.
    ///
    /// Fails with [`DivanError::CollectionExists`](crate::error::DivanError::CollectionExists)
    /// if the name is taken.
    CreateRelation(CollectionDescriptor),
    /// Drops the relation and every row in it.
    ///
    /// Fails with [`DivanError::CollectionNotFound`](crate::error::DivanError::CollectionNotFound)
    /// if it does not exist.
    DropRelation(CollectionDescriptor),
    /// Inserts a row with an explicit id and a fresh revision.
    ///
    /// Fails with [`DivanError::ConflictingId`](crate::error::DivanError::ConflictingId) if the
    /// id is taken.
    InsertRow {
        relation: CollectionDescriptor,
        id: String,
        doc: Value,
    },
    /// Deletes the row with the given id regardless of its revision.
    ///
    /// Fails with [`DivanError::DocumentNotFound`](crate::error::DivanError::DocumentNotFound)
    /// if no row matches.
    DeleteRow {
        relation: CollectionDescriptor,
        id: String,
    },
}

/// Abstract interface for relational storage backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks. Single-row operations are individually atomic; [`StoreBackend::apply_schema`]
/// is atomic across its whole batch.
///
/// # Error Handling
///
/// Engine and connection failures surface as
/// [`DivanError::StorageUnavailable`](crate::error::DivanError::StorageUnavailable). Operations
/// addressing a relation that does not exist fail with
/// [`DivanError::CollectionNotFound`](crate::error::DivanError::CollectionNotFound). Nothing is
/// retried by the backend.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts one row and returns the stored `(id, rev)`.
    ///
    /// When `id` is `None` the engine assigns a fresh token. The revision is always assigned by
    /// the engine.
    ///
    /// # Errors
    ///
    /// Returns [`DivanError::ConflictingId`](crate::error::DivanError::ConflictingId) if a row
    /// with the same id exists.
    async fn insert_row(
        &self,
        relation: &CollectionDescriptor,
        id: Option<String>,
        doc: Value,
    ) -> DivanResult<WriteResult>;

    /// Fetches `(id, rev, doc)` for `id`, or `None` if no row matches.
    async fn fetch_row(
        &self,
        relation: &CollectionDescriptor,
        id: &str,
    ) -> DivanResult<Option<StoredDocument>>;

    /// Fetches only the current revision of `id`, or `None` if no row matches.
    async fn fetch_rev(&self, relation: &CollectionDescriptor, id: &str) -> DivanResult<Option<String>>;

    /// Replaces the document of `id` and assigns a fresh revision, but only if the row's current
    /// revision is `rev`.
    ///
    /// Returns `None` when no row matches both `id` and `rev`.
    async fn update_row(
        &self,
        relation: &CollectionDescriptor,
        id: &str,
        rev: &str,
        doc: Value,
    ) -> DivanResult<Option<WriteResult>>;

    /// Deletes the row matching both `id` and `rev`.
    ///
    /// Returns `true` if a row was removed.
    async fn delete_row(&self, relation: &CollectionDescriptor, id: &str, rev: &str) -> DivanResult<bool>;

    /// Returns every row whose document matches `filter`.
    async fn query_rows(
        &self,
        relation: &CollectionDescriptor,
        filter: &Expr,
    ) -> DivanResult<Vec<StoredDocument>>;

    /// Reports whether a relation called `name` exists.
    async fn relation_exists(&self, name: &str) -> DivanResult<bool>;

    /// Runs `ops` in order inside one transaction.
    ///
    /// If any step fails, no step is visible afterwards and the first error is returned.
    async fn apply_schema(&self, ops: Vec<SchemaOp>) -> DivanResult<()>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DivanResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DivanResult<Self::Backend>;
}
