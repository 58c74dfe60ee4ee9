//! Schema-free documents returned by the documents endpoint.

use revsync_codec::{decode_revision, RevisionId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field holding a document's key.
pub const KEY_FIELD: &str = "_key";
/// Field holding a document's encoded revision.
pub const REVISION_FIELD: &str = "_rev";

/// A document as a field-to-value map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Sets a field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the fields.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// The `_key` field, if it is a string.
    pub fn key(&self) -> Option<&str> {
        self.get(KEY_FIELD).and_then(Value::as_str)
    }

    /// The decoded `_rev` field, if present.
    pub fn revision(&self) -> Option<RevisionId> {
        self.get(REVISION_FIELD)
            .and_then(Value::as_str)
            .map(|rev| decode_revision(rev.as_bytes()))
    }

    /// Converts the document into a typed value.
    pub fn deserialize_into<T: DeserializeOwned>(self) -> serde_json::Result<T> {
        serde_json::from_value(Value::Object(self.0))
    }

    /// Returns the underlying map.
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revsync_codec::WireFormat;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        name: String,
        age: u32,
    }

    fn parse(value: Value) -> Document {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn system_fields() {
        let doc = parse(json!({"_key": "alice", "_rev": "_-", "name": "Alice"}));
        assert_eq!(doc.key(), Some("alice"));
        assert_eq!(doc.revision(), Some(RevisionId::new(64)));
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn missing_system_fields() {
        let doc = parse(json!({"name": "Bob"}));
        assert_eq!(doc.key(), None);
        assert_eq!(doc.revision(), None);
    }

    #[test]
    fn typed_view() {
        let doc = parse(json!({"_key": "1", "name": "User1", "age": 30}));
        let user: User = doc.deserialize_into().unwrap();
        assert_eq!(
            user,
            User {
                name: "User1".into(),
                age: 30
            }
        );
    }

    #[test]
    fn non_object_rejected() {
        assert!(serde_json::from_value::<Document>(json!([1, 2])).is_err());
    }

    #[test]
    fn cbor_document() {
        let mut doc = Document::new();
        doc.insert("name", json!("Carol"));
        doc.insert("tags", json!(["a", "b"]));
        let bytes = WireFormat::Cbor.to_vec(&doc).unwrap();
        let back: Document = WireFormat::Cbor.from_slice(&bytes).unwrap();
        assert_eq!(back, doc);
    }
}
