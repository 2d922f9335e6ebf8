//! Document bodies, stored documents and write receipts.
//!
//! Documents are opaque JSON objects. The only keys the store ever looks at are the two reserved
//! top-level keys `_id` and `_rev`: they are stripped before a body is stored and re-injected when
//! a stored document is rendered back to the caller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DivanError, DivanResult};

/// Reserved key carrying the document id.
pub const ID_KEY: &str = "_id";

/// Reserved key carrying the document revision.
pub const REV_KEY: &str = "_rev";

/// A caller-supplied document body split into its reserved keys and its content.
///
/// # Example
///
/// ```ignore
/// let body = DocumentBody::from_value(json!({"_id": "ann", "name": "Ann"}))?;
/// assert_eq!(body.id(), Some("ann"));
/// assert_eq!(body.into_value(), json!({"name": "Ann"}));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentBody {
    id: Option<String>,
    rev: Option<String>,
    fields: Map<String, Value>,
}

impl DocumentBody {
    /// Splits `value` into reserved keys and content.
    ///
    /// An empty or null `_id` counts as absent. A `_rev` that is not a string counts as absent,
    /// which makes it fail any revision check.
    ///
    /// # Errors
    ///
    /// Returns [`DivanError::InvalidDocument`] if `value` is not an object or if `_id` is neither
    /// a string nor null.
    pub fn from_value(value: Value) -> DivanResult<Self> {
        let Value::Object(mut fields) = value else {
            return Err(DivanError::InvalidDocument("document body must be a JSON object".into()));
        };

        let id = match fields.remove(ID_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) if id.is_empty() => None,
            Some(Value::String(id)) => Some(id),
            Some(other) => {
                return Err(DivanError::InvalidDocument(format!("{ID_KEY} must be a string, got {other}")));
            }
        };

        let rev = match fields.remove(REV_KEY) {
            Some(Value::String(rev)) => Some(rev),
            _ => None,
        };

        Ok(Self { id, rev, fields })
    }

    /// The caller-chosen id, if any.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The revision the caller claims to have read, if any.
    pub fn rev(&self) -> Option<&str> {
        self.rev.as_deref()
    }

    /// Forces the id this body will be inserted under.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// The body content with reserved keys removed.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Consumes the body, returning the content to store.
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl TryFrom<Value> for DocumentBody {
    type Error = DivanError;

    fn try_from(value: Value) -> DivanResult<Self> {
        Self::from_value(value)
    }
}

/// A document as persisted in a collection's backing relation.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub rev: String,
    pub body: Map<String, Value>,
}

impl StoredDocument {
    /// Builds a stored document from a raw row.
    ///
    /// # Errors
    ///
    /// Returns [`DivanError::InvalidDocument`] if the document column does not hold an object.
    pub fn from_row(id: String, rev: String, doc: Value) -> DivanResult<Self> {
        match doc {
            Value::Object(body) => Ok(Self { id, rev, body }),
            other => Err(DivanError::InvalidDocument(format!(
                "stored document {id} is not an object: {other}"
            ))),
        }
    }

    /// Renders the document the way callers see it: the body with `_id` and `_rev` re-injected.
    pub fn to_json(&self) -> Value {
        let mut body = self.body.clone();
        body.insert(ID_KEY.to_string(), Value::String(self.id.clone()));
        body.insert(REV_KEY.to_string(), Value::String(self.rev.clone()));

        Value::Object(body)
    }

    /// Deserializes the body (without reserved keys) into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`DivanError::Serialization`] if the body does not match `T`.
    pub fn deserialize<T>(&self) -> DivanResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        Ok(serde_json::from_value(Value::Object(self.body.clone()))?)
    }
}

/// The `(id, rev)` pair returned by every successful document write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    pub id: String,
    pub rev: String,
}

impl WriteResult {
    pub fn new(id: impl Into<String>, rev: impl Into<String>) -> Self {
        Self { id: id.into(), rev: rev.into() }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn strips_reserved_keys() {
        let body = DocumentBody::from_value(json!({"_id": "ann", "_rev": "r1", "name": "Ann"})).unwrap();

        assert_eq!(body.id(), Some("ann"));
        assert_eq!(body.rev(), Some("r1"));
        assert_eq!(body.into_value(), json!({"name": "Ann"}));
    }

    #[test]
    fn empty_or_null_id_is_absent() {
        for value in [json!({"_id": ""}), json!({"_id": null}), json!({})] {
            assert_eq!(DocumentBody::from_value(value).unwrap().id(), None);
        }
    }

    #[test]
    fn non_string_rev_is_absent() {
        let body = DocumentBody::from_value(json!({"_rev": 3, "n": 1})).unwrap();

        assert_eq!(body.rev(), None);
        assert_eq!(body.fields().len(), 1);
    }

    #[test]
    fn rejects_non_objects_and_bad_ids() {
        assert!(matches!(
            DocumentBody::from_value(json!([1, 2])),
            Err(DivanError::InvalidDocument(_))
        ));
        assert!(matches!(
            DocumentBody::from_value(json!({"_id": 42})),
            Err(DivanError::InvalidDocument(_))
        ));
    }

    #[test]
    fn nested_reserved_keys_are_untouched() {
        let body = DocumentBody::from_value(json!({"inner": {"_id": "keep", "_rev": "keep"}})).unwrap();

        assert_eq!(body.into_value(), json!({"inner": {"_id": "keep", "_rev": "keep"}}));
    }

    #[test]
    fn to_json_reinjects_reserved_keys() {
        let doc = StoredDocument::from_row("x".into(), "r1".into(), json!({"name": "Ann"})).unwrap();

        assert_eq!(doc.to_json(), json!({"_id": "x", "_rev": "r1", "name": "Ann"}));
    }

    #[test]
    fn from_row_rejects_scalar_payloads() {
        assert!(StoredDocument::from_row("x".into(), "r1".into(), json!("text")).is_err());
    }

    #[test]
    fn deserializes_body_into_types() {
        #[derive(Deserialize)]
        struct Person {
            name: String,
        }

        let doc = StoredDocument::from_row("x".into(), "r1".into(), json!({"name": "Ann"})).unwrap();

        assert_eq!(doc.deserialize::<Person>().unwrap().name, "Ann");
    }
}
