//! Per-collection document operations.
//!
//! A [`Collection`] pairs a resolved [`CollectionDescriptor`] with a backend reference and
//! implements the document lifecycle on top of it: post, get, head, put and delete. Every write
//! is gated by the revision protocol: a document's `rev` changes on each successful write, and
//! updates or deletes are only accepted from a caller that presents the current `rev`.
//!
//! # Example
//!
//! ```ignore
//! let users = divan.collection("users").await?;
//!
//! let written = users.post(json!({"name": "Ann"})).await?;
//! let updated = users
//!     .put(&written.id, json!({"_rev": written.rev, "name": "Annie"}))
//!     .await?;
//! users.delete(&updated.id, &updated.rev).await?;
//! ```

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    backend::StoreBackend,
    descriptor::CollectionDescriptor,
    document::{DocumentBody, StoredDocument, WriteResult},
    error::{DivanError, DivanResult},
};

/// A resolved collection with a reference to a storage backend.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the backend reference
/// * `B` - The storage backend type
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    descriptor: CollectionDescriptor,
    backend: &'a B,
}

impl<'a, B: StoreBackend> Collection<'a, B> {
    /// Creates a new collection handle (internal use).
    pub(crate) fn new(descriptor: CollectionDescriptor, backend: &'a B) -> Self {
        Self { descriptor, backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Returns the descriptor this handle was resolved to.
    pub fn descriptor(&self) -> &CollectionDescriptor {
        &self.descriptor
    }

    /// Inserts a new document.
    ///
    /// A non-empty `_id` in `body` is used verbatim as the document id; otherwise the store
    /// assigns one. The revision is always assigned by the store, and any `_rev` in `body` is
    /// ignored: posting never checks revisions.
    ///
    /// # Errors
    ///
    /// Returns [`DivanError::ConflictingId`] if the id is already taken, or
    /// [`DivanError::InvalidDocument`] if `body` is not a JSON object.
    pub async fn post(&self, body: Value) -> DivanResult<WriteResult> {
        self.insert(DocumentBody::from_value(body)?).await
    }

    /// Fetches a document by id.
    ///
    /// # Errors
    ///
    /// Returns [`DivanError::DocumentNotFound`] if no document has this id.
    pub async fn get(&self, id: &str) -> DivanResult<StoredDocument> {
        self.backend
            .fetch_row(&self.descriptor, id)
            .await?
            .ok_or_else(|| self.not_found(id))
    }

    /// Fetches only the current revision of a document.
    ///
    /// # Errors
    ///
    /// Returns [`DivanError::DocumentNotFound`] if no document has this id.
    pub async fn head(&self, id: &str) -> DivanResult<String> {
        self.backend
            .fetch_rev(&self.descriptor, id)
            .await?
            .ok_or_else(|| self.not_found(id))
    }

    /// Creates or updates the document `id`.
    ///
    /// If no document has this id, `body` is inserted under it and any `_rev` is ignored.
    /// Otherwise `body._rev` must equal the current revision; the document content is then
    /// replaced and a fresh revision assigned.
    ///
    /// # Errors
    ///
    /// Returns [`DivanError::UpdateConflict`] if `_rev` is missing or stale. The stored document
    /// is left unchanged in that case.
    pub async fn put(&self, id: &str, body: Value) -> DivanResult<WriteResult> {
        let mut body = DocumentBody::from_value(body)?;

        let current = match self.head(id).await {
            Ok(rev) => rev,
            Err(DivanError::DocumentNotFound(..)) => {
                body.set_id(id);
                return self.insert(body).await;
            }
            Err(err) => return Err(err),
        };

        if body.rev() != Some(current.as_str()) {
            warn!(
                target: "divan::repo",
                collection = %self.name(),
                id = %id,
                expected = %current,
                "Rejected update with stale revision"
            );
            return Err(self.conflict(id));
        }

        // A writer committing between head and update makes the guard miss.
        let written = self
            .backend
            .update_row(&self.descriptor, id, &current, body.into_value())
            .await?
            .ok_or_else(|| self.conflict(id))?;

        debug!(target: "divan::repo", collection = %self.name(), id = %id, rev = %written.rev, "Updated document");

        Ok(written)
    }

    /// Deletes the document `id` if its current revision is `rev`.
    ///
    /// # Errors
    ///
    /// Returns [`DivanError::DocumentNotFound`] if no document has this id, or
    /// [`DivanError::UpdateConflict`] if it exists under a different revision. The document is
    /// left untouched in both cases.
    pub async fn delete(&self, id: &str, rev: &str) -> DivanResult<()> {
        if self.backend.delete_row(&self.descriptor, id, rev).await? {
            debug!(target: "divan::repo", collection = %self.name(), id = %id, "Deleted document");
            return Ok(());
        }

        match self.backend.fetch_rev(&self.descriptor, id).await? {
            None => Err(self.not_found(id)),
            Some(_) => Err(self.conflict(id)),
        }
    }

    async fn insert(&self, body: DocumentBody) -> DivanResult<WriteResult> {
        let id = body.id().map(str::to_string);
        let written = self
            .backend
            .insert_row(&self.descriptor, id, body.into_value())
            .await?;

        debug!(target: "divan::repo", collection = %self.name(), id = %written.id, rev = %written.rev, "Inserted document");

        Ok(written)
    }

    fn not_found(&self, id: &str) -> DivanError {
        DivanError::DocumentNotFound(id.to_string(), self.name().to_string())
    }

    fn conflict(&self, id: &str) -> DivanError {
        DivanError::UpdateConflict(id.to_string(), self.name().to_string())
    }
}
