// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Offline cache: bounded persistent buffer for events that could not be delivered.
//!
//! # Layout
//!
//! One named entry of a [`Storage`] backend holds a JSON array of
//! [`FormattedLogEvent`]s, oldest first, capped at
//! [`OFFLINE_CAPACITY`](crate::logs::constants::OFFLINE_CAPACITY) entries.
//!
//! # Semantics
//!
//! - **push**: append, then evict from the front until the bound holds
//! - **drain_all**: read everything and remove the entry in one step. Entries are
//!   gone as soon as they are read, not when their delivery is confirmed; a crash
//!   between the drain and a re-persist loses them
//! - **Errors**: storage and serialization failures are logged and degrade to
//!   "not persisted"; nothing here returns an error to the pipeline. A backend that
//!   panics is treated like one that failed
//! - **Corruption**: an entry that is not a JSON array is reset. Inside a valid
//!   array, records that do not decode are skipped and the rest are kept
//!
//! Writes are dropped when `useLocalStorage` is off.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::logs::constants::OFFLINE_CAPACITY;
use crate::logs::event::FormattedLogEvent;
use crate::logs::hooks::run_guarded;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("offline logs are not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage lock poisoned")]
    Poisoned,
    #[error("storage backend panicked during {0}")]
    Panicked(&'static str),
}

/// String key-value store backing the offline cache.
pub trait Storage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local storage. Contents do not survive a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        MemoryStorage::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        items.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per entry under a directory. Writes go through a temporary
/// file and a rename, so a reader never sees a half-written entry.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStorage { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn write_atomic(path: &Path, value: &str) -> io::Result<()> {
        let tmp = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        Self::write_atomic(&self.path(key), value)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

pub struct OfflineCache {
    storage: Arc<dyn Storage>,
    key: String,
    capacity: usize,
    enabled: bool,
}

impl OfflineCache {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, key: impl Into<String>, enabled: bool) -> Self {
        OfflineCache {
            storage,
            key: key.into(),
            capacity: OFFLINE_CAPACITY,
            enabled,
        }
    }

    fn get_raw(&self) -> Result<Option<String>, StorageError> {
        run_guarded("storage get_item", || self.storage.get_item(&self.key))
            .unwrap_or(Err(StorageError::Panicked("get_item")))
    }

    fn set_raw(&self, raw: &str) -> Result<(), StorageError> {
        run_guarded("storage set_item", || self.storage.set_item(&self.key, raw))
            .unwrap_or(Err(StorageError::Panicked("set_item")))
    }

    fn remove_raw(&self) -> Result<(), StorageError> {
        run_guarded("storage remove_item", || self.storage.remove_item(&self.key))
            .unwrap_or(Err(StorageError::Panicked("remove_item")))
    }

    fn load(&self) -> Result<Vec<FormattedLogEvent>, StorageError> {
        let raw = match self.get_raw()? {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return Ok(Vec::new()),
        };
        let entries: Vec<Value> = serde_json::from_str(&raw)?;
        let total = entries.len();
        let logs: Vec<FormattedLogEvent> = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(log) => Some(log),
                Err(e) => {
                    debug!("OFFLINE | Skipping unreadable offline log: {e}");
                    None
                }
            })
            .collect();
        if logs.len() < total {
            warn!(
                "OFFLINE | Skipped {} of {total} unreadable offline logs",
                total - logs.len()
            );
        }
        Ok(logs)
    }

    fn save(&self, logs: &[FormattedLogEvent]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(logs)?;
        self.set_raw(&raw)
    }

    pub fn push(&self, event: FormattedLogEvent) {
        self.push_all(vec![event]);
    }

    /// Appends `events` in order. Same result as pushing them one by one.
    pub fn push_all(&self, events: Vec<FormattedLogEvent>) {
        if events.is_empty() {
            return;
        }
        if !self.enabled {
            debug!(
                "OFFLINE | Local storage disabled, dropping {} undeliverable logs",
                events.len()
            );
            return;
        }

        let mut logs = self.load().unwrap_or_else(|e| {
            error!("OFFLINE | Failed to read offline logs, starting over: {e}");
            Vec::new()
        });
        logs.extend(events);
        if logs.len() > self.capacity {
            let overflow = logs.len() - self.capacity;
            logs.drain(..overflow);
            debug!("OFFLINE | Offline cache full, evicted {overflow} oldest logs");
        }

        if let Err(e) = self.save(&logs) {
            error!("OFFLINE | Failed to persist offline logs: {e}");
        }
    }

    /// Current contents, oldest first, without clearing them.
    #[must_use]
    pub fn read_all(&self) -> Vec<FormattedLogEvent> {
        if !self.enabled {
            return Vec::new();
        }
        self.load().unwrap_or_else(|e| {
            error!("OFFLINE | Failed to read offline logs: {e}");
            Vec::new()
        })
    }

    /// Reads and clears the cache.
    pub fn drain_all(&self) -> Vec<FormattedLogEvent> {
        if !self.enabled {
            return Vec::new();
        }
        let logs = self.read_all();
        if let Err(e) = self.remove_raw() {
            error!("OFFLINE | Failed to clear offline logs: {e}");
        }
        logs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read_all().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::log_level::Level;
    use crate::logs::event::now_iso8601;
    use serde_json::Map;
    use tracing_test::traced_test;

    fn event(message: &str) -> FormattedLogEvent {
        FormattedLogEvent {
            url: "/".to_string(),
            log_type: Level::Fatal,
            message: message.to_string(),
            detail_message: String::new(),
            timestamp: now_iso8601(),
            browser_info: None,
            screen_resolution: None,
            user_id: None,
            session_id: None,
            environment: None,
            extra: Map::new(),
        }
    }

    fn memory_cache() -> OfflineCache {
        OfflineCache::new(Arc::new(MemoryStorage::new()), "offline", true)
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let cache = memory_cache();
        for i in 0..42 {
            cache.push(event(&i.to_string()));
        }

        let drained = cache.drain_all();
        assert_eq!(drained.len(), 42);
        for (i, log) in drained.iter().enumerate() {
            assert_eq!(log.message, i.to_string());
        }
        assert!(cache.is_empty());
        assert!(cache.drain_all().is_empty());
    }

    #[test]
    fn test_bounded_to_capacity() {
        let cache = memory_cache();
        for i in 0..600 {
            cache.push(event(&i.to_string()));
        }

        let logs = cache.read_all();
        assert_eq!(logs.len(), OFFLINE_CAPACITY);
        assert_eq!(logs[0].message, "100");
        assert_eq!(logs[OFFLINE_CAPACITY - 1].message, "599");
    }

    #[test]
    fn test_push_all_matches_individual_pushes() {
        let cache = memory_cache();
        cache.push_all((0..550).map(|i| event(&i.to_string())).collect());

        let logs = cache.read_all();
        assert_eq!(logs.len(), OFFLINE_CAPACITY);
        assert_eq!(logs[0].message, "50");
    }

    #[test]
    fn test_disabled_drops_writes() {
        let cache = OfflineCache::new(Arc::new(MemoryStorage::new()), "offline", false);
        cache.push(event("lost"));
        assert!(cache.read_all().is_empty());
    }

    #[test]
    fn test_corrupt_entry_is_reset() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("offline", "{not json").unwrap();
        let cache = OfflineCache::new(storage, "offline", true);

        assert!(cache.read_all().is_empty());
        cache.push(event("fresh"));
        let logs = cache.read_all();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "fresh");
    }

    #[test]
    #[traced_test]
    fn test_unreadable_records_are_skipped() {
        let storage = Arc::new(MemoryStorage::new());
        let raw = format!(
            r#"[{},{{"bogus":1}},{}]"#,
            serde_json::to_string(&event("a")).unwrap(),
            serde_json::to_string(&event("b")).unwrap()
        );
        storage.set_item("offline", &raw).unwrap();
        let cache = OfflineCache::new(storage, "offline", true);

        let logs = cache.read_all();
        assert_eq!(logs.len(), 2);
        assert!(logs_contain("Skipped 1 of 3 unreadable offline logs"));

        cache.push(event("c"));
        let messages: Vec<String> = cache.read_all().into_iter().map(|l| l.message).collect();
        assert_eq!(messages, ["a", "b", "c"]);
    }

    #[test]
    fn test_duplicate_keys_in_record_do_not_reset_cache() {
        let storage = Arc::new(MemoryStorage::new());
        let mut record = serde_json::to_string(&event("dup")).unwrap();
        record.insert_str(1, r#""url":"/other","#);
        storage.set_item("offline", &format!("[{record}]")).unwrap();
        let cache = OfflineCache::new(storage, "offline", true);

        cache.push(event("next"));
        let logs = cache.read_all();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].message, "dup");
        assert_eq!(logs[1].message, "next");
    }

    struct PanickingStorage;

    impl Storage for PanickingStorage {
        fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
            panic!("quota exceeded")
        }
        fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            panic!("quota exceeded")
        }
        fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
            panic!("quota exceeded")
        }
    }

    #[test]
    #[traced_test]
    fn test_panicking_backend_degrades_to_not_persisted() {
        let cache = OfflineCache::new(Arc::new(PanickingStorage), "offline", true);
        cache.push(event("lost"));
        assert!(cache.read_all().is_empty());
        assert!(cache.drain_all().is_empty());
        assert!(logs_contain("storage set_item panicked: quota exceeded"));
        assert!(logs_contain("storage backend panicked during set_item"));
    }

    #[test]
    fn test_file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        let cache = OfflineCache::new(Arc::new(FileStorage::new(dir.path())), "offline", true);
        cache.push(event("a"));
        cache.push(event("b"));
        drop(cache);

        let reopened = OfflineCache::new(Arc::new(FileStorage::new(dir.path())), "offline", true);
        let logs = reopened.drain_all();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[1].message, "b");
        assert!(!dir.path().join("offline.json").exists());
    }

    #[test]
    fn test_file_storage_missing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));
        assert!(storage.get_item("missing").unwrap().is_none());
        storage.remove_item("missing").unwrap();
    }
}
