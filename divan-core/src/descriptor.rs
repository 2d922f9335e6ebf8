//! Collection descriptors and identifier validation.
//!
//! A [`CollectionDescriptor`] is the value that names a collection's backing relation and its
//! document column. It is stored as a document in the registry and cached by the server, and
//! every document operation is parametrised by one.

use serde::{Deserialize, Serialize};

use crate::error::{DivanError, DivanResult};

/// Name of the registry collection that describes every other collection.
pub const REGISTRY_COLLECTION: &str = "divan";

/// Default name of the column holding the document payload.
pub const DEFAULT_DOC_FIELD: &str = "doc";

/// Value of the `type` tag carried by every registry descriptor.
pub const COLLECTION_TYPE: &str = "collection";

/// Fixed columns of every backing relation; a document column may not reuse them.
pub const RESERVED_COLUMNS: [&str; 2] = ["id", "rev"];

/// Describes one collection: its relation name, document column and optional public key.
///
/// Serialized as `{"type": "collection", "name": .., "docField": .., "pubKey": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDescriptor {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    doc_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub_key: Option<String>,
}

impl CollectionDescriptor {
    /// Creates a descriptor for `name` storing documents in the default `doc` column.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            kind: COLLECTION_TYPE.to_string(),
            name: name.into(),
            doc_field: DEFAULT_DOC_FIELD.to_string(),
            pub_key: None,
        }
    }

    /// Descriptor of the registry collection itself.
    pub fn registry() -> Self {
        Self::new(REGISTRY_COLLECTION)
    }

    /// Stores documents in `doc_field` instead of the default column.
    pub fn with_doc_field(mut self, doc_field: impl Into<String>) -> Self {
        self.doc_field = doc_field.into();
        self
    }

    /// Attaches a public key used by access-control layers in front of the store.
    pub fn with_pub_key(mut self, pub_key: impl Into<String>) -> Self {
        self.pub_key = Some(pub_key.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc_field(&self) -> &str {
        &self.doc_field
    }

    pub fn pub_key(&self) -> Option<&str> {
        self.pub_key.as_deref()
    }

    /// Id of the registry document describing this collection.
    pub fn registry_id(&self) -> String {
        registry_id(&self.name)
    }

    /// Checks both the collection name and the document column name.
    ///
    /// # Errors
    ///
    /// Returns [`DivanError::InvalidName`] naming the first identifier that fails. The
    /// document column must also differ from the [`RESERVED_COLUMNS`].
    pub fn validate(&self) -> DivanResult<()> {
        validate_identifier(&self.name)?;
        validate_identifier(&self.doc_field)?;

        if RESERVED_COLUMNS.contains(&self.doc_field.as_str()) {
            return Err(DivanError::InvalidName(self.doc_field.clone()));
        }

        Ok(())
    }
}

impl From<&str> for CollectionDescriptor {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for CollectionDescriptor {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Id of the registry document describing the collection called `name`.
pub fn registry_id(name: &str) -> String {
    format!("{COLLECTION_TYPE}/{name}")
}

/// Checks `identifier` against `^[a-z0-9_-]+$`.
///
/// This is the only content validation the store performs, and it is what makes it safe to
/// splice collection and column names into statements.
pub fn validate_identifier(identifier: &str) -> DivanResult<()> {
    let valid = !identifier.is_empty()
        && identifier
            .bytes()
            .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-'));

    if !valid {
        return Err(DivanError::InvalidName(identifier.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_lowercase_digits_underscore_and_hyphen() {
        for name in ["users", "a", "user_events", "user-events", "2024", "_-_"] {
            assert!(validate_identifier(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_everything_else() {
        for name in ["", "Users", "user events", "users;drop", "us\"ers", "naïve", "a.b"] {
            assert_eq!(
                validate_identifier(name),
                Err(DivanError::InvalidName(name.to_string())),
            );
        }
    }

    #[test]
    fn validate_checks_doc_field_too() {
        let descriptor = CollectionDescriptor::new("users").with_doc_field("Body");

        assert_eq!(descriptor.validate(), Err(DivanError::InvalidName("Body".into())));
    }

    #[test]
    fn doc_field_cannot_shadow_fixed_columns() {
        for column in ["id", "rev"] {
            let descriptor = CollectionDescriptor::new("users").with_doc_field(column);

            assert_eq!(descriptor.validate(), Err(DivanError::InvalidName(column.into())));
        }

        assert!(CollectionDescriptor::new("users").with_doc_field("revision").validate().is_ok());
    }

    #[test]
    fn serializes_with_type_tag() {
        let descriptor = CollectionDescriptor::new("users").with_pub_key("abc");

        assert_eq!(
            serde_json::to_value(&descriptor).unwrap(),
            json!({"type": "collection", "name": "users", "docField": "doc", "pubKey": "abc"}),
        );
        assert_eq!(descriptor.registry_id(), "collection/users");
    }

    #[test]
    fn pub_key_is_optional() {
        let descriptor: CollectionDescriptor = serde_json::from_value(json!({
            "type": "collection",
            "name": "events",
            "docField": "payload",
        }))
        .unwrap();

        assert_eq!(descriptor.doc_field(), "payload");
        assert_eq!(descriptor.pub_key(), None);
        assert_eq!(
            serde_json::to_value(&descriptor).unwrap().get("pubKey"),
            None,
        );
    }
}
