//! Error types and result types for document store operations.
//!
//! Every operation in this crate returns a [`DivanResult<T>`]. The variants are split so callers
//! can tell a conflict (retry after re-reading) from a missing collection or document (abandon)
//! and from a validation failure (fix the request and resend).

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with the document store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DivanError {
    /// A collection name or document field name failed the `^[a-z0-9_-]+$` pattern.
    #[error("Invalid name: {0}")]
    InvalidName(String),
    /// A relation with the given name already exists.
    #[error("Collection already exists: {0}")]
    CollectionExists(String),
    /// The requested collection is not known to the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// The requested document was not found in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// A document with the given ID already exists in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    ConflictingId(String, String),
    /// The revision presented by the caller is not the document's current revision.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document update conflict for {0} in collection {1}")]
    UpdateConflict(String, String),
    /// A guarded delete matched no row and the cause could not be determined.
    ///
    /// [`Collection::delete`](crate::collection::Collection::delete) resolves the cause with a
    /// follow-up read, so it reports [`DivanError::DocumentNotFound`] or
    /// [`DivanError::UpdateConflict`] instead.
    #[error("Document {0} in collection {1} not found or revision is stale")]
    NotFoundOrConflict(String, String),
    /// The underlying storage engine failed or could not be reached.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    /// Serialization/deserialization error while converting document bodies.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The document body is not a JSON object or carries a malformed reserved key.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
}

impl DivanError {
    /// Returns `true` when the caller lost a revision race and may retry after re-reading.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DivanError::UpdateConflict(..) | DivanError::ConflictingId(..) | DivanError::NotFoundOrConflict(..)
        )
    }

    /// Returns `true` when the addressed collection or document does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DivanError::CollectionNotFound(_) | DivanError::DocumentNotFound(..)
        )
    }
}

/// A specialized `Result` type for document store operations.
pub type DivanResult<T> = Result<T, DivanError>;

impl From<SerdeJsonError> for DivanError {
    fn from(err: SerdeJsonError) -> Self {
        DivanError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_and_misses_are_distinguishable() {
        let conflict = DivanError::UpdateConflict("x".into(), "users".into());
        let missing = DivanError::DocumentNotFound("x".into(), "users".into());
        let invalid = DivanError::InvalidName("Users".into());

        assert!(conflict.is_conflict());
        assert!(!conflict.is_not_found());
        assert!(missing.is_not_found());
        assert!(!missing.is_conflict());
        assert!(!invalid.is_conflict() && !invalid.is_not_found());
    }

    #[test]
    fn serde_errors_become_serialization_errors() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();

        assert!(matches!(DivanError::from(err), DivanError::Serialization(_)));
    }
}
