//! Exclusive per-project lock shared by every process using a workspace.
//!
//! The lock is a file created with `create_new` and removed when the guard
//! drops. A lock file older than [`STALE_AFTER`] is assumed to belong to a
//! crashed run and is taken over.

use crate::config::get_lock_path;
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use triage_core::AppResult;

/// Age after which an abandoned lock file is removed.
pub const STALE_AFTER: Duration = Duration::from_secs(2 * 60 * 60);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Guard for a held project lock.
#[derive(Debug)]
pub struct ProjectLock {
    path: PathBuf,
}

impl ProjectLock {
    /// Wait until the project's lock is free and take it.
    pub async fn acquire(workspace: &Path, project_key: &str) -> AppResult<Self> {
        let path = get_lock_path(workspace, project_key);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let mut announced = false;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    writeln!(file, "{} {}", std::process::id(), Utc::now().to_rfc3339())?;
                    tracing::debug!("Acquired project lock {:?}", path);
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if is_stale(&path) {
                        tracing::warn!("Removing stale project lock {:?}", path);
                        if let Err(e) = fs::remove_file(&path) {
                            if e.kind() != ErrorKind::NotFound {
                                return Err(e.into());
                            }
                        }
                        continue;
                    }
                    if !announced {
                        tracing::info!("Waiting for another ingestion of '{}' to finish", project_key);
                        announced = true;
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Released project lock {:?}", self.path),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to release project lock {:?}: {}", self.path, e),
        }
    }
}

fn is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > STALE_AFTER)
}
