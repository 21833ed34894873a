// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory config store fake for testing without filesystem I/O.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracker_app_core::config::{ConfigError, ConfigStore};

/// In-memory implementation of [`ConfigStore`].
///
/// Clones share state, so a test can hand one clone to a `ConfigService`
/// and inspect the other.
///
/// # Example
///
/// ```
/// use tracker_dry_tests::InMemoryConfigStore;
/// use tracker_app_core::config::ConfigService;
/// use tracker_app_core::prefs::ReconstructionPrefs;
///
/// let store = InMemoryConfigStore::new();
/// let service = ConfigService::new(store.clone());
///
/// let prefs: ReconstructionPrefs = service.load_or_init("reconstruction");
/// assert_eq!(prefs, ReconstructionPrefs::default());
/// assert!(store.contains_key("reconstruction"));
/// assert_eq!(store.save_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryConfigStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    data: HashMap<String, Vec<u8>>,
    load_count: usize,
    save_count: usize,
    fail_on_load: bool,
    fail_on_save: bool,
}

impl InMemoryConfigStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `value` serialized under `key`.
    pub fn with_json(key: &str, value: &serde_json::Value) -> Self {
        let store = Self::new();
        store.lock().data.insert(key.to_owned(), value.to_string().into_bytes());
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make subsequent loads fail.
    pub fn set_fail_on_load(&self, fail: bool) {
        self.lock().fail_on_load = fail;
    }

    /// Make subsequent saves fail.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.lock().fail_on_save = fail;
    }

    /// Number of `load_raw` attempts, failed ones included.
    pub fn load_count(&self) -> usize {
        self.lock().load_count
    }

    /// Number of `save_raw` attempts, failed ones included.
    pub fn save_count(&self) -> usize {
        self.lock().save_count
    }

    /// Returns `true` if `key` holds a value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().data.contains_key(key)
    }

    /// Raw bytes stored under `key`.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().data.get(key).cloned()
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let mut inner = self.lock();
        inner.load_count += 1;
        if inner.fail_on_load {
            return Err(ConfigError::Other("simulated load failure".into()));
        }
        inner.data.get(key).cloned().ok_or(ConfigError::NotFound)
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let mut inner = self.lock();
        inner.save_count += 1;
        if inner.fail_on_save {
            return Err(ConfigError::Other("simulated save failure".into()));
        }
        inner.data.insert(key.to_string(), data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracker_app_core::config::ConfigService;
    use tracker_app_core::prefs::{DedupOrder, ReconstructionPrefs};

    #[test]
    fn missing_key_is_not_found() {
        let store = InMemoryConfigStore::new();
        assert!(matches!(store.load_raw("missing"), Err(ConfigError::NotFound)));
        assert_eq!(store.load_count(), 1);
    }

    #[test]
    fn stored_prefs_are_loaded_not_overwritten() {
        let store = InMemoryConfigStore::with_json(
            "reconstruction",
            &json!({"areaThreshold": 0.6, "dedupOrder": "asQueried"}),
        );
        let service = ConfigService::new(store.clone());
        let prefs: ReconstructionPrefs = service.load_or_init("reconstruction");
        assert!((prefs.area_threshold - 0.6).abs() < f64::EPSILON);
        assert_eq!(prefs.dedup_order, DedupOrder::AsQueried);
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn load_failure_falls_back_to_defaults_without_saving() {
        let store = InMemoryConfigStore::new();
        store.set_fail_on_load(true);
        let service = ConfigService::new(store.clone());
        let prefs: ReconstructionPrefs = service.load_or_init("reconstruction");
        assert_eq!(prefs, ReconstructionPrefs::default());
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn save_failure_still_returns_defaults() {
        let store = InMemoryConfigStore::new();
        store.set_fail_on_save(true);
        let service = ConfigService::new(store.clone());
        let prefs: ReconstructionPrefs = service.load_or_init("reconstruction");
        assert_eq!(prefs, ReconstructionPrefs::default());
        assert_eq!(store.save_count(), 1);
        assert!(!store.contains_key("reconstruction"));
    }

    #[test]
    fn clones_share_state() {
        let a = InMemoryConfigStore::new();
        let b = a.clone();
        a.save_raw("k", b"v").unwrap();
        assert_eq!(b.raw("k").unwrap(), b"v");
        assert_eq!(b.save_count(), 1);
    }
}
