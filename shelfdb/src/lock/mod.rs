// Lock manager - marker-file mutual exclusion for writers

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::error::{Result, ShelfDbError};

/// How many times acquisition is attempted before giving up.
pub const MAX_ATTEMPTS: u32 = 50;

/// Pause between attempts. With [`MAX_ATTEMPTS`] this bounds a blocked
/// writer at roughly five seconds.
pub const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Exclusive write access to one managed file, held as a marker file beside
/// it. Dropping the guard removes the marker, so release is guaranteed on
/// every exit path of a write. There is no fairness among waiters and no
/// stale-lock takeover: a crashed holder blocks later writers until the
/// marker is cleaned up externally.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    released: bool,
}

impl FileLock {
    /// Acquire the lock marker at `path`, retrying on contention until the
    /// default attempt limit is exhausted.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<FileLock> {
        Self::acquire_with(path.into(), MAX_ATTEMPTS, RETRY_DELAY)
    }

    /// Acquire with an explicit attempt limit. Creation is all-or-nothing:
    /// an existing marker means another writer holds the lock.
    pub(crate) fn acquire_with(path: PathBuf, attempts: u32, delay: Duration) -> Result<FileLock> {
        for _ in 0..attempts {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut marker) => {
                    // The holder pid is diagnostic only; nothing reads it back.
                    if let Err(e) = marker.write_all(std::process::id().to_string().as_bytes()) {
                        log::warn!("could not record holder pid in {}: {e}", path.display());
                    }
                    return Ok(FileLock {
                        path,
                        released: false,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => thread::sleep(delay),
                Err(e) => return Err(e.into()),
            }
        }

        Err(ShelfDbError::LockTimeout {
            path: path.display().to_string(),
            attempts,
        })
    }

    /// Remove the marker now instead of at drop. Idempotent; failures are
    /// logged and swallowed so cleanup can never fail a write.
    pub fn release(mut self) {
        self.release_inner();
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => log::warn!("failed to release lock {}: {e}", self.path.display()),
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        self.release_inner();
    }
}
