//! Snapshot persistence on top of a [`BlobStorage`] backend.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::ListingRecord;
use crate::storage::BlobStorage;

/// Metadata about a snapshot write.
#[derive(Debug, Clone)]
pub struct WriteMetadata {
    /// Number of records written
    pub record_count: usize,
    /// Where the snapshot was written
    pub location: String,
    /// Timestamp of the write
    pub timestamp: DateTime<Utc>,
}

/// The previously seen listing set, stored as a JSON array of records.
pub struct SnapshotStore<'a> {
    storage: &'a dyn BlobStorage,
    key: String,
}

impl<'a> SnapshotStore<'a> {
    pub fn new(storage: &'a dyn BlobStorage, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn location(&self) -> String {
        self.storage.location(&self.key)
    }

    /// Load the snapshot, or `None` when there is none yet.
    pub async fn try_load(&self) -> Result<Option<Vec<ListingRecord>>> {
        match self.storage.read_bytes(&self.key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Load the snapshot. Missing, unreadable or malformed data is empty.
    pub async fn load(&self) -> Vec<ListingRecord> {
        match self.try_load().await {
            Ok(Some(records)) => {
                log::info!(
                    "Loaded {} records from {}",
                    records.len(),
                    self.location()
                );
                records
            }
            Ok(None) => {
                log::warn!("No snapshot at {}", self.location());
                Vec::new()
            }
            Err(e) => {
                log::error!("Error loading snapshot from {}: {}", self.location(), e);
                Vec::new()
            }
        }
    }

    /// Overwrite the snapshot with `records`.
    pub async fn save(&self, records: &[ListingRecord]) -> Result<WriteMetadata> {
        let bytes = serde_json::to_vec_pretty(records)?;
        self.storage.write_bytes(&self.key, &bytes).await?;

        let location = self.location();
        log::info!("Snapshot of {} records saved to {}", records.len(), location);

        Ok(WriteMetadata {
            record_count: records.len(),
            location,
            timestamp: Utc::now(),
        })
    }
}
