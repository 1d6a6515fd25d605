//! Override store integration tests
//!
//! The same behavioural checks run against every backend through the
//! `OverrideStore` trait object returned by `open_store`.

use std::sync::Arc;
use std::thread;

use cml_alo::config::{StorageBackend, StorageConfig};
use cml_alo::storage::{open_store, OverrideStore, StorageError};
use cml_alo::{Recommendation, SmeOverride};

fn backends(dir: &tempfile::TempDir) -> Vec<Arc<dyn OverrideStore>> {
    vec![
        open_store(&StorageConfig {
            backend: StorageBackend::Memory,
            path: dir.path().join("unused"),
        })
        .unwrap(),
        open_store(&StorageConfig {
            backend: StorageBackend::Sled,
            path: dir.path().join("overrides.db"),
        })
        .unwrap(),
        open_store(&StorageConfig {
            backend: StorageBackend::JsonFile,
            path: dir.path().join("sme_overrides.json"),
        })
        .unwrap(),
    ]
}

fn keep(id: &str) -> SmeOverride {
    SmeOverride::new(id, Recommendation::Keep, "process safety review", "Dr. Smith")
}

#[test]
fn repeated_put_counts_once() {
    let dir = tempfile::tempdir().unwrap();
    for store in backends(&dir) {
        store.put_override(keep("CML-042")).unwrap();
        store.put_override(keep("CML-042")).unwrap();

        let stats = store.compute_statistics().unwrap();
        assert_eq!(stats.total_overrides, 1, "backend {}", store.backend_name());
    }
}

#[test]
fn validation_failure_leaves_prior_record() {
    let dir = tempfile::tempdir().unwrap();
    for store in backends(&dir) {
        store.put_override(keep("CML-9")).unwrap();

        let bad = SmeOverride::new("CML-9", Recommendation::Eliminate, "  ", "Dr. Smith");
        let err = store.put_override(bad).unwrap_err();
        assert!(matches!(err, StorageError::Validation { .. }));

        let current = store.get_override("CML-9").unwrap().unwrap();
        let backend = store.backend_name();
        assert_eq!(current.sme_decision, Recommendation::Keep, "backend {backend}");
    }
}

#[test]
fn statistics_track_disagreement_with_model() {
    let dir = tempfile::tempdir().unwrap();
    for store in backends(&dir) {
        assert_eq!(store.compute_statistics().unwrap().agreement_rate, 100.0);

        store
            .put_override(keep("CML-1").with_original(Recommendation::Eliminate, Some(0.85)))
            .unwrap();
        store
            .put_override(
                SmeOverride::new("CML-2", Recommendation::Eliminate, "redundant", "A. Ortiz")
                    .with_original(Recommendation::Eliminate, Some(0.9)),
            )
            .unwrap();
        store.put_override(keep("CML-3")).unwrap();
        store
            .put_override(
                SmeOverride::new("CML-4", Recommendation::Eliminate, "dead leg", "A. Ortiz")
                    .with_original(Recommendation::Keep, Some(0.3)),
            )
            .unwrap();

        let stats = store.compute_statistics().unwrap();
        assert_eq!(stats.total_overrides, 4);
        assert_eq!(stats.keep_overrides, 2);
        assert_eq!(stats.eliminate_overrides, 2);
        assert_eq!(stats.disagreements_with_ml, 2);
        assert!((stats.agreement_rate - 50.0).abs() < 1e-9);
    }
}

#[test]
fn concurrent_writers_on_distinct_keys_all_land() {
    let dir = tempfile::tempdir().unwrap();
    for store in backends(&dir) {
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..25 {
                        store.put_override(keep(&format!("CML-{t}-{i:02}"))).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let all = store.list_overrides().unwrap();
        assert_eq!(all.len(), 100, "backend {}", store.backend_name());
        assert!(all.windows(2).all(|w| w[0].id_number < w[1].id_number));
    }
}

#[test]
fn concurrent_writers_on_one_key_leave_a_whole_record() {
    let dir = tempfile::tempdir().unwrap();
    for store in backends(&dir) {
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..20 {
                        let decision = if t % 2 == 0 {
                            Recommendation::Keep
                        } else {
                            Recommendation::Eliminate
                        };
                        store
                            .put_override(SmeOverride::new(
                                "CML-HOT",
                                decision,
                                format!("writer {t} pass {i}"),
                                format!("sme-{t}"),
                            ))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let all = store.list_overrides().unwrap();
        assert_eq!(all.len(), 1);
        let rec = &all[0];
        let writer = rec.sme_name.trim_start_matches("sme-");
        assert!(rec.reason.starts_with(&format!("writer {writer} ")));
    }
}

#[test]
fn last_committed_write_carries_the_latest_date() {
    let dir = tempfile::tempdir().unwrap();
    for store in backends(&dir) {
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    (0..20)
                        .map(|i| {
                            let record = SmeOverride::new(
                                "CML-DATE",
                                Recommendation::Keep,
                                format!("writer {t} pass {i}"),
                                format!("sme-{t}"),
                            );
                            store.put_override(record).unwrap().override_date
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let returned: Vec<_> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();

        let latest = returned.iter().max().copied().unwrap();
        let stored = store.get_override("CML-DATE").unwrap().unwrap();
        assert_eq!(stored.override_date, latest, "backend {}", store.backend_name());
    }
}

#[test]
fn json_document_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig {
        backend: StorageBackend::JsonFile,
        path: dir.path().join("sme_overrides.json"),
    };

    {
        let store = open_store(&config).unwrap();
        store.put_override(keep("CML-5")).unwrap();
        store.flush().unwrap();
    }

    let store = open_store(&config).unwrap();
    let rec = store.get_override("CML-5").unwrap().unwrap();
    assert_eq!(rec.sme_name, "Dr. Smith");
    assert!(store.delete_override("CML-5").unwrap().is_some());
    assert!(store.get_override("CML-5").unwrap().is_none());
}
