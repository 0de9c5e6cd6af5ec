//! Keyed JSON persistence for profiles and the weight ledger.
//!
//! Persistence is a key -> JSON document interface with whole-document
//! overwrite semantics; no merging, no migrations. Callers read-modify-write.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::domain::Profile;

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed document {key}: {source}")]
    Malformed {
        key: String,
        source: serde_json::Error,
    },
}

/// Key -> JSON document store. One document per key, overwritten whole.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;
    fn put(&self, key: &str, doc: serde_json::Value) -> Result<(), StoreError>;
}

/// Stores each document as `<dir>/<key>.json`.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Write {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path).map_err(|source| StoreError::Read {
            path: path.clone(),
            source,
        })?;
        let doc = serde_json::from_str(&text).map_err(|source| StoreError::Malformed {
            key: key.to_string(),
            source,
        })?;
        Ok(Some(doc))
    }

    fn put(&self, key: &str, doc: serde_json::Value) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let text = serde_json::to_string_pretty(&doc).map_err(|source| StoreError::Malformed {
            key: key.to_string(),
            source,
        })?;
        fs::write(&path, text).map_err(|source| StoreError::Write { path, source })
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        Ok(self.docs.lock().unwrap().get(key).cloned())
    }

    fn put(&self, key: &str, doc: serde_json::Value) -> Result<(), StoreError> {
        self.docs.lock().unwrap().insert(key.to_string(), doc);
        Ok(())
    }
}

// === Typed stores ===

fn get_typed<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key)? {
        Some(doc) => {
            let value = serde_json::from_value(doc).map_err(|source| StoreError::Malformed {
                key: key.to_string(),
                source,
            })?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

fn put_typed<T: Serialize>(store: &dyn KvStore, key: &str, value: &T) -> Result<(), StoreError> {
    let doc = serde_json::to_value(value).map_err(|source| StoreError::Malformed {
        key: key.to_string(),
        source,
    })?;
    store.put(key, doc)
}

/// Profile records keyed by user id. Direct replace-by-key, no merging.
pub struct ProfileStore<'a> {
    store: &'a dyn KvStore,
}

impl<'a> ProfileStore<'a> {
    pub fn new(store: &'a dyn KvStore) -> Self {
        Self { store }
    }

    pub fn get(&self, user_id: u64) -> Result<Option<Profile>, StoreError> {
        get_typed(self.store, &format!("profile_{user_id}"))
    }

    pub fn put(&self, user_id: u64, profile: &Profile) -> Result<(), StoreError> {
        put_typed(self.store, &format!("profile_{user_id}"), profile)
    }
}

/// Per-user date -> weight mapping. A later write for the same date
/// overwrites; the latest entry is the maximum ISO date (lexicographic
/// order on `%Y-%m-%d` keys equals chronological order).
pub struct WeightLedger<'a> {
    store: &'a dyn KvStore,
}

impl<'a> WeightLedger<'a> {
    pub fn new(store: &'a dyn KvStore) -> Self {
        Self { store }
    }

    fn key(user_id: u64) -> String {
        format!("weights_{user_id}")
    }

    fn load(&self, user_id: u64) -> Result<BTreeMap<String, f64>, StoreError> {
        Ok(get_typed(self.store, &Self::key(user_id))?.unwrap_or_default())
    }

    /// Records a weight for the given date, overwriting a same-date entry.
    pub fn set(&self, user_id: u64, date: NaiveDate, weight_kg: f64) -> Result<(), StoreError> {
        let mut log = self.load(user_id)?;
        log.insert(date.format("%Y-%m-%d").to_string(), weight_kg);
        put_typed(self.store, &Self::key(user_id), &log)
    }

    /// The most recent weight, if any entry exists.
    pub fn latest(&self, user_id: u64) -> Result<Option<f64>, StoreError> {
        let log = self.load(user_id)?;
        Ok(log.iter().next_back().map(|(_, w)| *w))
    }

    /// True when a weight entry exists for the given date.
    pub fn has_entry(&self, user_id: u64, date: NaiveDate) -> Result<bool, StoreError> {
        let log = self.load(user_id)?;
        Ok(log.contains_key(&date.format("%Y-%m-%d").to_string()))
    }

    /// Full history in chronological order.
    pub fn history(&self, user_id: u64) -> Result<Vec<(NaiveDate, f64)>, StoreError> {
        let log = self.load(user_id)?;
        Ok(log
            .into_iter()
            .filter_map(|(d, w)| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok().map(|d| (d, w)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DietGoal, Gender};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_profile() -> Profile {
        Profile {
            gender: Gender::Male,
            age: 30,
            height_cm: 180,
            activity_level: 3,
            diet_goal: DietGoal::Balanced,
            preferences: vec!["salmon".into()],
            exclusions: vec![],
        }
    }

    #[test]
    fn test_profile_round_trip() {
        let store = MemoryStore::new();
        let profiles = ProfileStore::new(&store);

        assert!(profiles.get(1).unwrap().is_none());
        profiles.put(1, &sample_profile()).unwrap();

        let loaded = profiles.get(1).unwrap().unwrap();
        assert_eq!(loaded.age, 30);
        assert_eq!(loaded.preferences, vec!["salmon".to_string()]);
    }

    #[test]
    fn test_profile_overwrite_replaces_whole_document() {
        let store = MemoryStore::new();
        let profiles = ProfileStore::new(&store);

        profiles.put(1, &sample_profile()).unwrap();
        let mut updated = sample_profile();
        updated.age = 31;
        updated.preferences.clear();
        profiles.put(1, &updated).unwrap();

        let loaded = profiles.get(1).unwrap().unwrap();
        assert_eq!(loaded.age, 31);
        assert!(loaded.preferences.is_empty());
    }

    #[test]
    fn test_ledger_latest_by_date() {
        let store = MemoryStore::new();
        let ledger = WeightLedger::new(&store);

        ledger.set(7, date(2024, 3, 10), 81.0).unwrap();
        ledger.set(7, date(2024, 3, 1), 82.5).unwrap();
        // Latest is by date, not by insertion order.
        assert_eq!(ledger.latest(7).unwrap(), Some(81.0));
    }

    #[test]
    fn test_ledger_same_day_overwrites() {
        let store = MemoryStore::new();
        let ledger = WeightLedger::new(&store);

        ledger.set(7, date(2024, 3, 10), 81.0).unwrap();
        ledger.set(7, date(2024, 3, 10), 80.5).unwrap();

        assert_eq!(ledger.latest(7).unwrap(), Some(80.5));
        assert_eq!(ledger.history(7).unwrap().len(), 1);
    }

    #[test]
    fn test_ledger_has_entry_and_isolation_between_users() {
        let store = MemoryStore::new();
        let ledger = WeightLedger::new(&store);

        ledger.set(1, date(2024, 3, 10), 81.0).unwrap();
        assert!(ledger.has_entry(1, date(2024, 3, 10)).unwrap());
        assert!(!ledger.has_entry(1, date(2024, 3, 11)).unwrap());
        assert_eq!(ledger.latest(2).unwrap(), None);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();

        assert!(store.get("missing").unwrap().is_none());
        store
            .put("doc", serde_json::json!({"a": 1, "b": [2, 3]}))
            .unwrap();
        let loaded = store.get("doc").unwrap().unwrap();
        assert_eq!(loaded["a"], 1);

        // Survives a fresh handle over the same directory.
        let reopened = JsonFileStore::new(dir.path()).unwrap();
        assert!(reopened.get("doc").unwrap().is_some());
    }
}
