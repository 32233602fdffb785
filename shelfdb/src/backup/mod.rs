// Backup manager - best-effort snapshot and recovery for one managed file

use std::io::ErrorKind;
use std::path::Path;

use crate::document::Document;

/// Copy the current file to its backup path. Runs before every accepted
/// write; a missing primary means there is nothing to snapshot yet, and any
/// copy failure is logged at warn level but never blocks the write.
pub fn snapshot(path: &Path, backup_path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(e) = std::fs::copy(path, backup_path) {
        log::warn!("failed to create backup {}: {e}", backup_path.display());
    }
}

/// Restore the document from the backup file. On success the primary file
/// is rewritten with the recovered contents as a repair side effect; the
/// document is returned only once that repair write has gone through.
/// A missing, unreadable, or unparseable backup yields `None` (logged,
/// never raised), as does a failed repair write.
pub fn recover(path: &Path, backup_path: &Path) -> Option<Document> {
    let bytes = match std::fs::read(backup_path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            log::error!("failed to read backup {}: {e}", backup_path.display());
            return None;
        }
    };

    let doc: Document = match serde_json::from_slice(&bytes) {
        Ok(doc) => doc,
        Err(e) => {
            log::error!("backup {} is corrupt: {e}", backup_path.display());
            return None;
        }
    };

    let pretty = match serde_json::to_vec_pretty(&doc) {
        Ok(pretty) => pretty,
        Err(e) => {
            log::error!("could not reserialize backup {}: {e}", backup_path.display());
            return None;
        }
    };
    if let Err(e) = std::fs::write(path, pretty) {
        log::error!("failed to restore {} from backup: {e}", path.display());
        return None;
    }

    Some(doc)
}
