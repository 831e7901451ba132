//! Advisory run lock.
//!
//! A run drops a `<16 hex digits>.lock` marker in the root and removes it
//! when the guard is dropped. Before taking the lock a run waits while any
//! other marker is present, giving up after a deadline. Other `.lock` files,
//! such as a committed `Gemfile.lock`, are not markers.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::core::constants;
use crate::error::{LockError, Result};

/// Polling interval and deadline for acquisition.
#[derive(Debug, Clone, Copy)]
pub struct LockOptions {
    pub poll: Duration,
    pub timeout: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            poll: Duration::from_secs(constants::LOCK_POLL_SECS),
            timeout: Duration::from_secs(constants::LOCK_TIMEOUT_SECS),
        }
    }
}

/// Held for the duration of a run.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

const MARKER_DIGITS: usize = 16;

/// Whether a file name is a run marker.
pub fn is_marker(name: &str) -> bool {
    name.strip_suffix(constants::LOCK_SUFFIX)
        .is_some_and(|stem| {
            stem.len() == MARKER_DIGITS && stem.bytes().all(|b| b.is_ascii_hexdigit())
        })
}

fn existing_marker(dir: &Path) -> Result<Option<PathBuf>> {
    for entry in std::fs::read_dir(dir).map_err(LockError::Io)? {
        let path = entry.map_err(LockError::Io)?.path();
        let is_marker = path.file_name().and_then(|n| n.to_str()).is_some_and(is_marker);
        if is_marker && path.is_file() {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

impl LockGuard {
    /// Wait for other markers to clear, then create ours.
    ///
    /// # Errors
    ///
    /// Returns `LockError::Contention` when a marker is still present after
    /// `options.timeout`.
    pub fn acquire(dir: &Path, options: LockOptions) -> Result<Self> {
        let started = Instant::now();

        while let Some(marker) = existing_marker(dir)? {
            if started.elapsed() >= options.timeout {
                return Err(LockError::Contention { marker }.into());
            }
            info!(marker = %marker.display(), "waiting for another run to finish");
            thread::sleep(options.poll);
        }

        let path = dir.join(format!(
            "{:0width$x}{}",
            rand::random::<u64>(),
            constants::LOCK_SUFFIX,
            width = MARKER_DIGITS
        ));
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(LockError::Io)?;
        debug!(marker = %path.display(), "lock acquired");

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(marker = %self.path.display(), "lock released"),
            Err(e) => warn!(marker = %self.path.display(), error = %e, "failed to remove lock"),
        }
    }
}
