//! SME Override Storage
//!
//! The override collection is the only mutable shared state in the engine.
//! `OverrideStore` abstracts it so backends can be swapped without touching
//! the reconciler or the CLI:
//! - `InMemoryOverrideStore`: sharded concurrent map, not durable
//! - `SledOverrideStore`: embedded sled database, one record per key
//! - `JsonFileOverrideStore`: a single JSON document replaced atomically
//!
//! Every backend keeps at most one record per `id_number`. A write replaces
//! the whole record (last write wins) and stamps `override_date`.

mod json_file;
mod memory;
mod sled_store;

pub use json_file::JsonFileOverrideStore;
pub use memory::InMemoryOverrideStore;
pub use sled_store::SledOverrideStore;

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};
use crate::types::{OverrideStatistics, SmeOverride};

/// Trait for pluggable override backends
///
/// Implementations must be thread-safe (Send + Sync). Writes to different
/// keys must not block each other; writes to the same key serialize so a
/// reader only ever sees a complete record.
pub trait OverrideStore: Send + Sync {
    /// Validate, stamp and store an override, replacing any prior record for
    /// the same id. Returns the record as stored.
    fn put_override(&self, record: SmeOverride) -> Result<SmeOverride, StorageError>;

    /// Look up the override for a CML. A miss is `Ok(None)`.
    fn get_override(&self, id_number: &str) -> Result<Option<SmeOverride>, StorageError>;

    /// Remove the override for a CML, returning it if one existed.
    fn delete_override(&self, id_number: &str) -> Result<Option<SmeOverride>, StorageError>;

    /// All stored overrides ordered by `id_number`.
    fn list_overrides(&self) -> Result<Vec<SmeOverride>, StorageError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;

    /// Make completed writes durable. A no-op for backends that write through.
    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Agreement statistics over every stored override.
    fn compute_statistics(&self) -> Result<OverrideStatistics, StorageError> {
        Ok(OverrideStatistics::from_overrides(&self.list_overrides()?))
    }
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid override for {id_number}: {reason}")]
    Validation { id_number: String, reason: String },
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("I/O error ({path}): {message}")]
    Io { path: String, message: String },
}

impl StorageError {
    pub fn id_number(&self) -> Option<&str> {
        match self {
            Self::Validation { id_number, .. } => Some(id_number),
            _ => None,
        }
    }
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Check an override payload before any write.
pub fn validate_override(record: &SmeOverride) -> Result<(), StorageError> {
    let fail = |reason: &str| StorageError::Validation {
        id_number: record.id_number.clone(),
        reason: reason.to_string(),
    };

    if record.id_number.trim().is_empty() {
        return Err(fail("id_number must not be empty"));
    }
    if record.reason.trim().is_empty() {
        return Err(fail("reason must not be empty"));
    }
    if let Some(p) = record.original_probability {
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(fail("original_probability must be within [0, 1]"));
        }
    }
    Ok(())
}

/// Stamp the write time. Backends call this while holding the per-key
/// critical section so the last committed write carries the latest date.
pub(crate) fn stamp_write_time(record: &mut SmeOverride) {
    record.override_date = Utc::now();
}

/// Open the backend named in the configuration.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn OverrideStore>, StorageError> {
    let store: Arc<dyn OverrideStore> = match config.backend {
        StorageBackend::Memory => Arc::new(InMemoryOverrideStore::new()),
        StorageBackend::Sled => Arc::new(SledOverrideStore::open(&config.path)?),
        StorageBackend::JsonFile => Arc::new(JsonFileOverrideStore::open(&config.path)?),
    };
    info!(
        backend = store.backend_name(),
        path = %config.path.display(),
        "Override store opened"
    );
    Ok(store)
}
