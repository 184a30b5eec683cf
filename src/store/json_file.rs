use std::fs;
use std::io;
use std::path::PathBuf;

use crate::monitor::{Measurement, Snapshot};

use super::record::MeasurementRecord;
use super::{SnapshotPersistence, StoreError};

/// Persists the snapshot as a pretty-printed JSON array.
///
/// Writes go to a `.tmp` sibling first and are renamed into place, so
/// an external reader never sees a half-written file.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "results.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotPersistence for JsonFilePersistence {
    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let records: Vec<MeasurementRecord> =
            snapshot.measurements.iter().map(MeasurementRecord::from).collect();
        let json =
            serde_json::to_string_pretty(&records).map_err(StoreError::Encode)?;

        let tmp = self.tmp_path();
        fs::write(&tmp, json).map_err(|source| StoreError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }

    fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let records: Vec<MeasurementRecord> =
            serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })?;

        let measurements: Vec<Measurement> =
            records.into_iter().map(Measurement::from).collect();
        let started_at = measurements.iter().map(|m| m.observed_at).min();

        // The file does not record round numbers.
        Ok(Some(Snapshot {
            round: 0,
            started_at,
            measurements,
        }))
    }
}
