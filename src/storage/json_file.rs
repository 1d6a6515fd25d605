//! JSON document override store
//!
//! Keeps every override in one JSON array on disk (`sme_overrides.json`).
//! Each write serializes the full collection to a temp file next to the
//! target and renames it into place, so a concurrent reader sees either the
//! old or the new document, never a partial one.
//!
//! On load, duplicate ids resolve to the last entry in the array. Dates
//! written without an offset are read as UTC.
//!
//! One `RwLock` guards the whole collection and is held across the disk
//! write. Writers to different CMLs therefore serialize, and readers wait
//! while a document is being written. Use the sled backend when many SMEs
//! write at once.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info};

use super::{stamp_write_time, validate_override, OverrideStore, StorageError};
use crate::types::SmeOverride;

pub struct JsonFileOverrideStore {
    path: PathBuf,
    records: RwLock<BTreeMap<String, SmeOverride>>,
}

impl JsonFileOverrideStore {
    /// Open the document at `path`, starting empty if it does not exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let mut records = BTreeMap::new();

        if path.exists() {
            let data = std::fs::read(&path).map_err(|e| io_error(&path, &e))?;
            let entries: Vec<SmeOverride> = serde_json::from_slice(&data)?;
            for entry in entries {
                records.insert(entry.id_number.clone(), entry);
            }
        }

        info!(
            path = %path.display(),
            records = records.len(),
            "JSON override document loaded"
        );

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the collection atomically (temp file, then rename).
    fn persist(&self, records: &BTreeMap<String, SmeOverride>) -> Result<(), StorageError> {
        let entries: Vec<&SmeOverride> = records.values().collect();
        let json = serde_json::to_vec_pretty(&entries)?;

        let tmp_path = self.path.with_extension("json.tmp");
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| io_error(parent, &e))?;
            }
        }
        std::fs::write(&tmp_path, &json).map_err(|e| io_error(&tmp_path, &e))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| io_error(&self.path, &e))?;
        Ok(())
    }
}

fn io_error(path: &Path, err: &std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

impl OverrideStore for JsonFileOverrideStore {
    fn put_override(&self, record: SmeOverride) -> Result<SmeOverride, StorageError> {
        validate_override(&record)?;
        let mut records = self
            .records
            .write()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let mut stored = record;
        stamp_write_time(&mut stored);

        let previous = records.insert(stored.id_number.clone(), stored.clone());
        if let Err(e) = self.persist(&records) {
            // Roll the in-memory view back to match the untouched file
            match previous {
                Some(prev) => records.insert(prev.id_number.clone(), prev),
                None => records.remove(&stored.id_number),
            };
            return Err(e);
        }

        debug!(id_number = %stored.id_number, "Persisted SME override document");
        Ok(stored)
    }

    fn get_override(&self, id_number: &str) -> Result<Option<SmeOverride>, StorageError> {
        let records = self
            .records
            .read()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(records.get(id_number).cloned())
    }

    fn delete_override(&self, id_number: &str) -> Result<Option<SmeOverride>, StorageError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let Some(removed) = records.remove(id_number) else {
            return Ok(None);
        };
        if let Err(e) = self.persist(&records) {
            records.insert(removed.id_number.clone(), removed);
            return Err(e);
        }
        Ok(Some(removed))
    }

    fn list_overrides(&self) -> Result<Vec<SmeOverride>, StorageError> {
        let records = self
            .records
            .read()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(records.values().cloned().collect())
    }

    fn backend_name(&self) -> &'static str {
        "JsonFile"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Recommendation;

    #[test]
    fn test_document_roundtrip_through_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("sme_overrides.json");

        let store = JsonFileOverrideStore::open(&path).unwrap();
        store
            .put_override(SmeOverride::new("CML-2", Recommendation::Keep, "dead leg", "B. Chen"))
            .unwrap();
        store
            .put_override(SmeOverride::new(
                "CML-1",
                Recommendation::Eliminate,
                "redundant",
                "B. Chen",
            ))
            .unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = JsonFileOverrideStore::open(&path).unwrap();
        let ids: Vec<String> = reopened
            .list_overrides()
            .unwrap()
            .into_iter()
            .map(|o| o.id_number)
            .collect();
        assert_eq!(ids, vec!["CML-1", "CML-2"]);
    }

    #[test]
    fn test_duplicate_entries_resolve_to_last() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sme_overrides.json");

        let older = SmeOverride::new("CML-3", Recommendation::Keep, "first call", "A. Ortiz");
        let newer = SmeOverride::new("CML-3", Recommendation::Eliminate, "revised", "A. Ortiz");
        std::fs::write(&path, serde_json::to_vec(&vec![older, newer]).unwrap()).unwrap();

        let store = JsonFileOverrideStore::open(&path).unwrap();
        let rec = store.get_override("CML-3").unwrap().unwrap();
        assert_eq!(rec.sme_decision, Recommendation::Eliminate);
        assert_eq!(store.list_overrides().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sme_overrides.json");

        let store = JsonFileOverrideStore::open(&path).unwrap();
        store
            .put_override(SmeOverride::new("CML-4", Recommendation::Keep, "reason", "B. Chen"))
            .unwrap();
        assert!(store.delete_override("CML-4").unwrap().is_some());

        let reopened = JsonFileOverrideStore::open(&path).unwrap();
        assert!(reopened.get_override("CML-4").unwrap().is_none());
    }

    /// Swap the document for a non-empty directory so the final rename fails.
    fn block_document(path: &Path) {
        std::fs::remove_file(path).unwrap();
        std::fs::create_dir(path).unwrap();
        std::fs::write(path.join("occupied"), b"x").unwrap();
    }

    #[test]
    fn test_failed_put_rolls_back_to_prior_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sme_overrides.json");

        let store = JsonFileOverrideStore::open(&path).unwrap();
        store
            .put_override(SmeOverride::new("CML-6", Recommendation::Keep, "original", "B. Chen"))
            .unwrap();
        block_document(&path);

        let revised = SmeOverride::new("CML-6", Recommendation::Eliminate, "revised", "B. Chen");
        let err = store.put_override(revised).unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
        let current = store.get_override("CML-6").unwrap().unwrap();
        assert_eq!(current.reason, "original");
        assert_eq!(current.sme_decision, Recommendation::Keep);

        // a brand new id is dropped again
        assert!(store
            .put_override(SmeOverride::new("CML-7", Recommendation::Keep, "new", "B. Chen"))
            .is_err());
        assert!(store.get_override("CML-7").unwrap().is_none());
        assert_eq!(store.list_overrides().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_delete_keeps_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sme_overrides.json");

        let store = JsonFileOverrideStore::open(&path).unwrap();
        store
            .put_override(SmeOverride::new("CML-6", Recommendation::Keep, "original", "B. Chen"))
            .unwrap();
        block_document(&path);

        let err = store.delete_override("CML-6").unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
        assert_eq!(store.get_override("CML-6").unwrap().unwrap().reason, "original");
    }

    #[test]
    fn test_opens_document_with_zone_less_dates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sme_overrides.json");
        let legacy = r#"[
            {
                "id_number": "CML-10",
                "sme_decision": "KEEP",
                "reason": "Injection point downstream",
                "sme_name": "Dr. Smith",
                "override_date": "2024-01-15T10:30:00.123456",
                "original_prediction": "ELIMINATE",
                "original_probability": 0.85
            },
            {
                "id_number": "CML-11",
                "sme_decision": "ELIMINATE",
                "reason": "Dead leg",
                "sme_name": "A. Ortiz",
                "override_date": "2024-02-01T08:00:00",
                "original_prediction": null,
                "original_probability": null
            }
        ]"#;
        std::fs::write(&path, legacy).unwrap();

        let store = JsonFileOverrideStore::open(&path).unwrap();
        let first = store.get_override("CML-10").unwrap().unwrap();
        assert_eq!(first.override_date.to_rfc3339(), "2024-01-15T10:30:00.123456+00:00");
        assert_eq!(first.original_prediction, Some(Recommendation::Eliminate));
        let second = store.get_override("CML-11").unwrap().unwrap();
        assert_eq!(second.override_date.to_rfc3339(), "2024-02-01T08:00:00+00:00");
        assert!(second.original_prediction.is_none());

        // rewriting the document upgrades every date to RFC 3339
        store
            .put_override(SmeOverride::new("CML-12", Recommendation::Keep, "new", "B. Chen"))
            .unwrap();
        let reopened = JsonFileOverrideStore::open(&path).unwrap();
        assert_eq!(reopened.list_overrides().unwrap().len(), 3);
        assert_eq!(
            reopened.get_override("CML-10").unwrap().unwrap().override_date,
            first.override_date
        );
    }
}
