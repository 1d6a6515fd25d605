//! In-memory override store
//!
//! Backed by a `DashMap`, whose sharded locks let writes to different CMLs
//! proceed concurrently while writes to the same CML serialize. Not durable;
//! data is lost when the process exits.

use dashmap::DashMap;

use super::{stamp_write_time, validate_override, OverrideStore, StorageError};
use crate::types::SmeOverride;

#[derive(Debug, Default)]
pub struct InMemoryOverrideStore {
    records: DashMap<String, SmeOverride>,
}

impl InMemoryOverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl OverrideStore for InMemoryOverrideStore {
    fn put_override(&self, record: SmeOverride) -> Result<SmeOverride, StorageError> {
        validate_override(&record)?;

        // The entry guard holds the shard lock until the stamped record is in place
        let mut slot = self.records.entry(record.id_number.clone()).insert(record);
        stamp_write_time(&mut slot);
        Ok(slot.value().clone())
    }

    fn get_override(&self, id_number: &str) -> Result<Option<SmeOverride>, StorageError> {
        Ok(self.records.get(id_number).map(|r| r.value().clone()))
    }

    fn delete_override(&self, id_number: &str) -> Result<Option<SmeOverride>, StorageError> {
        Ok(self.records.remove(id_number).map(|(_, v)| v))
    }

    fn list_overrides(&self) -> Result<Vec<SmeOverride>, StorageError> {
        let mut all: Vec<SmeOverride> = self.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| a.id_number.cmp(&b.id_number));
        Ok(all)
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}
