// Document model - one JSON file parsed as named record collections

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single record: field name to JSON value.
pub type Record = Map<String, Value>;

/// The parsed contents of one managed file: collection name to record array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// An empty document with no collections.
    pub fn new() -> Self {
        Document(Map::new())
    }

    /// The fallback returned when neither the primary file nor its backup is
    /// readable: a single empty `users` collection.
    pub fn initial() -> Self {
        let mut map = Map::new();
        map.insert("users".to_string(), Value::Array(Vec::new()));
        Document(map)
    }

    pub fn get(&self, collection: &str) -> Option<&Value> {
        self.0.get(collection)
    }

    pub fn get_mut(&mut self, collection: &str) -> Option<&mut Value> {
        self.0.get_mut(collection)
    }

    pub fn insert(&mut self, collection: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(collection.into(), value)
    }

    pub fn contains(&self, collection: &str) -> bool {
        self.0.contains_key(collection)
    }

    /// Entry API over the underlying map; the record layer uses it to create
    /// collections on demand.
    pub fn entry(&mut self, collection: impl Into<String>) -> serde_json::map::Entry<'_> {
        self.0.entry(collection.into())
    }

    pub fn collections(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Document(map)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Object(doc.0)
    }
}

/// Current UTC time in the millisecond-precision RFC 3339 form records carry
/// in `createdAt`/`updatedAt`, e.g. `2026-08-22T09:15:04.123Z`.
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
