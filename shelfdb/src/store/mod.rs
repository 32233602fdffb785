use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::backup;
use crate::document::{now_timestamp, Document, Record};
use crate::error::{Result, ShelfDbError};
use crate::lock::FileLock;
use crate::schema;

/// The engine for one managed JSON file.
/// Holds the primary path plus the derived backup and lock sibling paths;
/// construction does no I/O, so a store pointing at nothing yet is valid and
/// reads as the default empty document. Handles are cheap to clone and share
/// no state beyond the files themselves: the on-disk lock marker is the only
/// coordination between writers.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    backup_path: PathBuf,
    lock_path: PathBuf,
}

impl Store {
    /// Create a handle for the managed file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Store {
        let path = path.into();
        let backup_path = sibling(&path, ".backup");
        let lock_path = sibling(&path, ".lock");
        Store {
            path,
            backup_path,
            lock_path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Load the document. A missing file falls back to backup recovery and
    /// then to [`Document::initial`]; a file that exists but fails to parse
    /// is treated as corruption and recovered the same way. Permission
    /// failures and unusable paths propagate as `Io`. Reads take no lock, so
    /// a read racing a write observes either the old or the new contents,
    /// never a partial file.
    pub fn read(&self) -> Result<Document> {
        self.ensure_directory_exists()?;

        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(backup::recover(&self.path, &self.backup_path)
                    .unwrap_or_else(Document::initial));
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                log::warn!(
                    "{} is corrupt, attempting recovery: {e}",
                    self.path.display()
                );
                Ok(backup::recover(&self.path, &self.backup_path)
                    .unwrap_or_else(Document::initial))
            }
        }
    }

    /// Persist the document: directory check, schema gate, lock, backup
    /// snapshot, then an atomic replace (serialize to a `.tmp` sibling and
    /// rename it over the primary). The rename swaps the destination in one
    /// step, so no reader can observe a half-written file. The lock guard is
    /// released on every path out, including early errors.
    pub fn write(&self, doc: &Document) -> Result<()> {
        self.ensure_directory_exists()?;
        schema::validate_document(doc)?;

        let _lock = FileLock::acquire(&self.lock_path)?;

        backup::snapshot(&self.path, &self.backup_path);

        let json = serde_json::to_vec_pretty(doc)?;
        let tmp = sibling(&self.path, ".tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;

        Ok(())
    }

    /// Append a record to `collection`, creating the collection if absent.
    /// A missing, null, or empty-string `id` gets a generated one; both
    /// timestamps are stamped to now, overwriting caller-supplied values.
    /// Returns the record as stored.
    pub fn add_record(&self, collection: &str, mut record: Record) -> Result<Record> {
        let mut doc = self.read()?;

        if needs_generated_id(&record) {
            record.insert("id".to_string(), Value::String(generate_id()));
        }
        let now = now_timestamp();
        record.insert("createdAt".to_string(), Value::String(now.clone()));
        record.insert("updatedAt".to_string(), Value::String(now));

        let slot = doc.entry(collection).or_insert(Value::Array(Vec::new()));
        if slot.is_null() {
            *slot = Value::Array(Vec::new());
        }
        match slot {
            Value::Array(records) => records.push(Value::Object(record.clone())),
            other => return Err(not_an_array(collection, other)),
        }

        self.write(&doc)?;
        Ok(record)
    }

    /// Merge `updates` over the record with the given id, patch fields
    /// winning, and refresh `updatedAt` last so a caller-supplied value
    /// never survives. Returns the updated record.
    pub fn update_record(&self, collection: &str, id: &str, updates: Record) -> Result<Record> {
        let mut doc = self.read()?;

        let records = match records_in_mut(&mut doc, collection)? {
            Some(records) => records,
            None => return Err(ShelfDbError::CollectionNotFound(collection.to_string())),
        };

        let existing = records
            .iter_mut()
            .filter_map(Value::as_object_mut)
            .find(|rec| rec.get("id").and_then(Value::as_str) == Some(id))
            .ok_or_else(|| ShelfDbError::RecordNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        for (key, value) in updates {
            existing.insert(key, value);
        }
        existing.insert("updatedAt".to_string(), Value::String(now_timestamp()));
        let updated = existing.clone();

        self.write(&doc)?;
        Ok(updated)
    }

    /// Records of `collection` where every filter key equals the record's
    /// field exactly. An empty filter returns the whole collection; a
    /// missing collection returns no records rather than an error.
    pub fn find_records(&self, collection: &str, filter: &Record) -> Result<Vec<Record>> {
        let doc = self.read()?;

        let records = match records_in(&doc, collection)? {
            Some(records) => records,
            None => return Ok(Vec::new()),
        };

        Ok(records
            .iter()
            .filter_map(Value::as_object)
            .filter(|rec| {
                filter
                    .iter()
                    .all(|(key, expected)| rec.get(key) == Some(expected))
            })
            .cloned()
            .collect())
    }

    /// Remove the record with the given id from `collection`.
    pub fn delete_record(&self, collection: &str, id: &str) -> Result<()> {
        let mut doc = self.read()?;

        let records = match records_in_mut(&mut doc, collection)? {
            Some(records) => records,
            None => return Err(ShelfDbError::CollectionNotFound(collection.to_string())),
        };

        let before = records.len();
        records.retain(|rec| rec.get("id").and_then(Value::as_str) != Some(id));
        if records.len() == before {
            return Err(ShelfDbError::RecordNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        self.write(&doc)?;
        Ok(())
    }

    fn ensure_directory_exists(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }
}

/// A fresh version-4 UUID in canonical lowercase form, used for record ids.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Append `suffix` to the full file name, so `data.json` becomes
/// `data.json.backup` rather than `data.backup`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn needs_generated_id(record: &Record) -> bool {
    match record.get("id") {
        None | Some(Value::Null) => true,
        Some(Value::String(id)) => id.is_empty(),
        Some(_) => false,
    }
}

fn not_an_array(collection: &str, value: &Value) -> ShelfDbError {
    ShelfDbError::Schema(format!(
        "collection {collection} must be an array, got {}",
        schema::type_name(value)
    ))
}

// A null collection value counts as absent, the same as no key at all.
fn records_in<'a>(doc: &'a Document, collection: &str) -> Result<Option<&'a Vec<Value>>> {
    match doc.get(collection) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(records)) => Ok(Some(records)),
        Some(other) => Err(not_an_array(collection, other)),
    }
}

fn records_in_mut<'a>(
    doc: &'a mut Document,
    collection: &str,
) -> Result<Option<&'a mut Vec<Value>>> {
    match doc.get_mut(collection) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(records)) => Ok(Some(records)),
        Some(other) => Err(not_an_array(collection, other)),
    }
}
