//! Core data types for the document store
//!
//! - `Document`: a stored record with its store-assigned id
//! - `NewDocument`: fields for an insert, plus fields the store timestamps
//! - `Snapshot`: the full ordered result set of a live query

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{StoreError, StoreResult};

/// Opaque store-assigned document identifier
pub type DocumentId = String;

/// Flat document body
pub type Fields = serde_json::Map<String, Value>;

/// A stored document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    #[serde(default)]
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<DocumentId>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Get a field value
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Decode into a typed record
    ///
    /// The document id is exposed to the record as an `id` field.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let mut body = self.fields.clone();
        body.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(body)).map_err(|e| {
            StoreError::InvalidDocument(format!("document {}: {}", self.id, e))
        })
    }
}

/// Fields for a document insert
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewDocument {
    #[serde(default)]
    pub fields: Fields,
    /// Fields the store fills with its own commit timestamp (ms)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub server_timestamps: Vec<String>,
}

impl NewDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a serializable value that must encode as a JSON object
    pub fn from_value<T: Serialize>(value: &T) -> StoreResult<Self> {
        match serde_json::to_value(value)? {
            Value::Object(fields) => Ok(Self {
                fields,
                server_timestamps: Vec::new(),
            }),
            other => Err(StoreError::InvalidDocument(format!(
                "expected an object, got {}",
                other
            ))),
        }
    }

    /// Builder method: set a field
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Builder method: let the store assign this field at commit time
    pub fn server_timestamp(mut self, name: impl Into<String>) -> Self {
        self.server_timestamps.push(name.into());
        self
    }
}

/// Full ordered result set of a query at one point in time
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub documents: Vec<Document>,
}

impl Snapshot {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }

    /// Decode every document, failing on the first malformed one
    pub fn decode_all<T: DeserializeOwned>(&self) -> StoreResult<Vec<T>> {
        self.documents.iter().map(Document::decode).collect()
    }

    /// Decode the documents that fit `T`, returning the failures separately
    pub fn decode_each<T: DeserializeOwned>(&self) -> (Vec<T>, Vec<StoreError>) {
        let mut records = Vec::with_capacity(self.documents.len());
        let mut rejected = Vec::new();
        for document in &self.documents {
            match document.decode() {
                Ok(record) => records.push(record),
                Err(e) => rejected.push(e),
            }
        }
        (records, rejected)
    }
}

/// One delivery on a live subscription
pub type SnapshotEvent = StoreResult<Snapshot>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Row {
        id: String,
        text: String,
    }

    #[test]
    fn test_document_decode_injects_id() {
        let doc = Document::new(
            "doc-1",
            json!({"text": "hello"}).as_object().unwrap().clone(),
        );
        let row: Row = doc.decode().unwrap();
        assert_eq!(row.id, "doc-1");
        assert_eq!(row.text, "hello");
    }

    #[test]
    fn test_document_decode_missing_field() {
        let doc = Document::new("doc-2", Fields::new());
        let result: StoreResult<Row> = doc.decode();
        assert!(matches!(result, Err(StoreError::InvalidDocument(_))));
    }

    #[test]
    fn test_decode_each_skips_misfits() {
        let snapshot = Snapshot::new(vec![
            Document::new("a", json!({"text": "one"}).as_object().unwrap().clone()),
            Document::new("b", Fields::new()),
            Document::new("c", json!({"text": "three"}).as_object().unwrap().clone()),
        ]);

        let (rows, rejected) = snapshot.decode_each::<Row>();
        let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(rejected.len(), 1);
        assert!(matches!(rejected[0], StoreError::InvalidDocument(_)));
    }

    #[test]
    fn test_new_document_builder() {
        let doc = NewDocument::new()
            .field("text", "hi")
            .field("user", "Ana")
            .server_timestamp("createdAt");
        assert_eq!(doc.fields.get("text"), Some(&json!("hi")));
        assert_eq!(doc.server_timestamps, vec!["createdAt"]);
    }

    #[test]
    fn test_new_document_from_non_object() {
        assert!(NewDocument::from_value(&42).is_err());
    }
}
