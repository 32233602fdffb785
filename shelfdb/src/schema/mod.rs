// Schema gate - allow-list checks run before every write

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::document::Document;
use crate::error::{Result, ShelfDbError};

/// Top-level keys a document may carry.
pub const ALLOWED_COLLECTIONS: &[&str] = &[
    "users",
    "profiles",
    "workshops",
    "sessions",
    "applications",
    "messages",
    "notifications",
    "config",
];

/// Fields a record in the `users` collection may carry.
pub const USER_FIELDS: &[&str] = &[
    "id",
    "email",
    "firstName",
    "lastName",
    "role",
    "phone",
    "name",
    "createdAt",
    "updatedAt",
    "password",
    "isActive",
    "lastLogin",
    "sessions",
    "status",
];

/// Accepted values for a user's `role` field.
pub const USER_ROLES: &[&str] = &["volunteer", "coordinator", "admin"];

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Check a whole document against the collection allow-list and, for the
/// `users` collection, the per-record field rules. No side effects; the
/// write pipeline runs this before taking the lock.
pub fn validate_document(doc: &Document) -> Result<()> {
    // User record checks run first so their message wins when a document
    // violates both a record rule and the top-level allow-list.
    match doc.get("users") {
        None | Some(Value::Null) => {}
        Some(Value::Array(records)) => {
            for record in records {
                validate_user(record)?;
            }
        }
        Some(other) => {
            return Err(ShelfDbError::Schema(format!(
                "users must be an array, got {}",
                type_name(other)
            )));
        }
    }

    let unknown: Vec<&str> = doc
        .collections()
        .map(String::as_str)
        .filter(|key| !ALLOWED_COLLECTIONS.contains(key))
        .collect();
    if !unknown.is_empty() {
        return Err(ShelfDbError::Schema(format!(
            "Unknown fields: {}",
            unknown.join(", ")
        )));
    }

    Ok(())
}

fn validate_user(record: &Value) -> Result<()> {
    let fields = record.as_object().ok_or_else(|| {
        ShelfDbError::Schema(format!(
            "user record must be an object, got {}",
            type_name(record)
        ))
    })?;

    // Null counts as absent for the optional email/role fields; any other
    // non-string value can never satisfy the checks and is rejected.
    match fields.get("email") {
        None | Some(Value::Null) => {}
        Some(Value::String(email)) if EMAIL_RE.is_match(email) => {}
        Some(_) => return Err(ShelfDbError::Schema("Invalid email format".to_string())),
    }

    match fields.get("role") {
        None | Some(Value::Null) => {}
        Some(Value::String(role)) if USER_ROLES.contains(&role.as_str()) => {}
        Some(_) => return Err(ShelfDbError::Schema("Invalid role".to_string())),
    }

    let unknown: Vec<&str> = fields
        .keys()
        .map(String::as_str)
        .filter(|key| !USER_FIELDS.contains(key))
        .collect();
    if !unknown.is_empty() {
        return Err(ShelfDbError::Schema(format!(
            "Invalid user fields: {}",
            unknown.join(", ")
        )));
    }

    Ok(())
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
