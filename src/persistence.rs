//! Durable metrics snapshots
//!
//! Best-effort persistence of the metrics store: the full per-selector
//! snapshot is written wholesale as JSON (timestamps serialize to RFC 3339,
//! which is textual and sortable) and loaded back at startup. Failures are
//! logged and never surface to evaluation callers.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::metrics::{MetricsSnapshot, MetricsStore};

/// File-backed snapshot store for quality metrics
#[derive(Debug)]
pub struct MetricsSnapshotStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl MetricsSnapshotStore {
    /// Create a snapshot store writing to the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Snapshot file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load a snapshot into the store at startup
    ///
    /// A missing file is normal (first run). Read or parse failures are
    /// logged and leave the store empty.
    pub fn load(&self, store: &MetricsStore) {
        if !self.path.exists() {
            return;
        }
        let snapshot = match self.read_snapshot() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    "failed to load metrics snapshot: {err}"
                );
                return;
            }
        };
        let selectors = snapshot.len();
        store.restore(snapshot);
        info!(
            path = %self.path.display(),
            selectors,
            "loaded metrics snapshot"
        );
    }

    /// Write the full store snapshot to durable storage
    ///
    /// Failures are logged and otherwise ignored. Writes are serialized so
    /// concurrent snapshot triggers cannot interleave on the temp file.
    pub fn save(&self, store: &MetricsStore) {
        let snapshot = store.snapshot();
        let _guard = self.write_lock.lock();
        if let Err(err) = self.write_snapshot(&snapshot) {
            warn!(
                path = %self.path.display(),
                "failed to save metrics snapshot: {err}"
            );
        }
    }

    fn read_snapshot(&self) -> io::Result<MetricsSnapshot> {
        let raw = fs::read_to_string(&self.path)?;
        serde_json::from_str(&raw).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }

    fn write_snapshot(&self, snapshot: &MetricsSnapshot) -> io::Result<()> {
        let data = serde_json::to_vec_pretty(snapshot)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?;
        write_atomic(&self.path, &data)
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(tmp, path)?;
    Ok(())
}
