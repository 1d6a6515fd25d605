//! Sled-backed override store
//!
//! Records live in a named tree ("sme_overrides"), keyed by the CML id bytes
//! with a JSON value. Writes go through `update_and_fetch`, which swaps the
//! whole value with a compare-and-swap loop, so concurrent writers to one key
//! never produce a torn record and writers to different keys do not contend.
//! The write time is stamped inside that loop, so the committed record always
//! carries the latest date.

use std::path::Path;
use tracing::{debug, info, warn};

use super::{stamp_write_time, validate_override, OverrideStore, StorageError};
use crate::config::defaults::OVERRIDE_TREE;
use crate::types::SmeOverride;

#[derive(Clone)]
pub struct SledOverrideStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledOverrideStore {
    /// Open or create the override database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path_ref = path.as_ref();
        let db = sled::open(path_ref)?;
        let store = Self::from_db(db)?;
        info!("Override storage opened at {:?}", path_ref);
        Ok(store)
    }

    /// Open a throwaway database that is removed on drop
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, StorageError> {
        let tree = db.open_tree(OVERRIDE_TREE)?;
        Ok(Self { db, tree })
    }

    pub fn count(&self) -> usize {
        self.tree.len()
    }

    fn decode(bytes: &[u8]) -> Result<SmeOverride, StorageError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl OverrideStore for SledOverrideStore {
    fn put_override(&self, record: SmeOverride) -> Result<SmeOverride, StorageError> {
        validate_override(&record)?;

        let mut stored = record;
        let mut encode_error = None;
        let key = stored.id_number.clone();

        // Re-run on every CAS retry; the last run is the one committed
        self.tree.update_and_fetch(key.as_bytes(), |current| {
            stamp_write_time(&mut stored);
            match serde_json::to_vec(&stored) {
                Ok(value) => {
                    encode_error = None;
                    Some(value)
                }
                Err(e) => {
                    encode_error = Some(e);
                    current.map(<[u8]>::to_vec)
                }
            }
        })?;
        if let Some(e) = encode_error {
            return Err(e.into());
        }

        debug!(
            id_number = %stored.id_number,
            decision = %stored.sme_decision,
            "Stored SME override"
        );

        Ok(stored)
    }

    fn get_override(&self, id_number: &str) -> Result<Option<SmeOverride>, StorageError> {
        match self.tree.get(id_number.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn delete_override(&self, id_number: &str) -> Result<Option<SmeOverride>, StorageError> {
        match self.tree.remove(id_number.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn list_overrides(&self) -> Result<Vec<SmeOverride>, StorageError> {
        let mut all = Vec::with_capacity(self.tree.len());

        // Keys are id bytes, so iteration is already ordered by id_number
        for item in self.tree.iter() {
            let (key, value) = item?;
            match Self::decode(&value) {
                Ok(record) => all.push(record),
                Err(e) => {
                    warn!(
                        key = %String::from_utf8_lossy(&key),
                        error = %e,
                        "Skipping undecodable override record"
                    );
                }
            }
        }

        Ok(all)
    }

    fn backend_name(&self) -> &'static str {
        "Sled"
    }

    fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Recommendation;

    #[test]
    fn test_store_open() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SledOverrideStore::open(temp_dir.path()).unwrap();
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_store_and_retrieve() {
        let store = SledOverrideStore::temporary().unwrap();
        let record =
            SmeOverride::new("CML-042", Recommendation::Keep, "high-risk process area", "Dr. Smith")
                .with_original(Recommendation::Eliminate, Some(0.85));
        store.put_override(record).unwrap();

        let found = store.get_override("CML-042").unwrap().unwrap();
        assert_eq!(found.sme_decision, Recommendation::Keep);
        assert_eq!(found.original_probability, Some(0.85));
        assert!(store.get_override("CML-043").unwrap().is_none());
    }

    #[test]
    fn test_list_is_ordered_by_id() {
        let store = SledOverrideStore::temporary().unwrap();
        for id in ["CML-300", "CML-100", "CML-200"] {
            store
                .put_override(SmeOverride::new(id, Recommendation::Keep, "ordering", "B. Chen"))
                .unwrap();
        }
        let ids: Vec<String> = store
            .list_overrides()
            .unwrap()
            .into_iter()
            .map(|o| o.id_number)
            .collect();
        assert_eq!(ids, vec!["CML-100", "CML-200", "CML-300"]);
    }

    #[test]
    fn test_records_survive_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        {
            let store = SledOverrideStore::open(temp_dir.path()).unwrap();
            let record =
                SmeOverride::new("CML-5", Recommendation::Eliminate, "redundant", "B. Chen");
            store.put_override(record).unwrap();
            store.flush().unwrap();
        }

        let reopened = SledOverrideStore::open(temp_dir.path()).unwrap();
        assert_eq!(reopened.count(), 1);
        assert!(reopened.get_override("CML-5").unwrap().is_some());
    }

    #[test]
    fn test_rewrite_commits_the_returned_stamp() {
        let store = SledOverrideStore::temporary().unwrap();
        let first = store
            .put_override(SmeOverride::new("CML-8", Recommendation::Keep, "first", "B. Chen"))
            .unwrap();
        let second = store
            .put_override(SmeOverride::new("CML-8", Recommendation::Eliminate, "second", "B. Chen"))
            .unwrap();

        assert!(second.override_date >= first.override_date);
        let current = store.get_override("CML-8").unwrap().unwrap();
        assert_eq!(current.override_date, second.override_date);
        assert_eq!(current.reason, "second");
    }
}
