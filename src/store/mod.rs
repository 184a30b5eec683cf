pub mod json_file;
pub mod record;

pub use json_file::JsonFilePersistence;
pub use record::MeasurementRecord;

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::monitor::Snapshot;

// ─── Errors ──────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),
}

// ─── Persistence seam ────────────────────────────────────────────

/// Durable storage for the latest snapshot.
pub trait SnapshotPersistence: Send + Sync {
    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError>;

    /// `Ok(None)` when nothing has been persisted yet.
    fn load(&self) -> Result<Option<Snapshot>, StoreError>;
}

// ─── ResultStore ─────────────────────────────────────────────────

/// Holds the latest committed snapshot.
/// The monitor calls `commit()` once per round, handlers call `current()`.
pub struct ResultStore {
    current: RwLock<Arc<Snapshot>>,
    persistence: Option<Box<dyn SnapshotPersistence>>,
}

impl ResultStore {
    /// A store with no durable backing.
    pub fn in_memory() -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty())),
            persistence: None,
        }
    }

    pub fn with_persistence(persistence: impl SnapshotPersistence + 'static) -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty())),
            persistence: Some(Box::new(persistence)),
        }
    }

    /// Replace the current snapshot. Readers holding the old `Arc`
    /// keep seeing the old round in full.
    pub fn commit(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        *self.current.write() = Arc::clone(&snapshot);
        snapshot
    }

    /// The latest committed snapshot, or an empty one before the first round.
    pub fn current(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    pub fn persist(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        match &self.persistence {
            Some(p) => p.save(snapshot),
            None => Ok(()),
        }
    }

    /// The last persisted snapshot, or an empty one if there is none.
    pub fn load_persisted(&self) -> Result<Snapshot, StoreError> {
        match &self.persistence {
            Some(p) => Ok(p.load()?.unwrap_or_default()),
            None => Ok(Snapshot::empty()),
        }
    }
}

// ─── Test backend ────────────────────────────────────────────────
