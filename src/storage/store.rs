// Key-value store adapters.
// A flat JSON record store with get/set/remove, backed by memory or a JSON file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{Result, TailorError};

/// A flat set of keys and JSON values.
pub type Record = Map<String, Value>;

/// Local extension storage.
///
/// Not transactional: callers that need all-or-nothing updates must put every
/// change into a single `set`. A `null` value in `set` removes the key, and
/// `get` never returns nulls.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the given keys. Missing keys are absent from the result.
    async fn get(&self, keys: &[&str]) -> Result<Record>;

    /// Merge `record` into the store.
    async fn set(&self, record: Record) -> Result<()>;

    /// Delete the given keys.
    async fn remove(&self, keys: &[&str]) -> Result<()>;
}

fn select(entries: &Record, keys: &[&str]) -> Record {
    keys.iter()
        .filter_map(|key| {
            entries
                .get(*key)
                .filter(|value| !value.is_null())
                .map(|value| (key.to_string(), value.clone()))
        })
        .collect()
}

fn merge(entries: &mut Record, record: Record) {
    for (key, value) in record {
        if value.is_null() {
            entries.remove(&key);
        } else {
            entries.insert(key, value);
        }
    }
}

/// In-process store. Can be told to fail, for exercising error paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<Record>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `entries`.
    pub fn with_entries(entries: Record) -> Self {
        let store = Self::default();
        if let Ok(mut guard) = store.entries.lock() {
            merge(&mut guard, entries);
        }
        store
    }

    /// Make every subsequent read fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `set` and `remove` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Snapshot of all entries.
    pub fn entries(&self) -> Record {
        self.entries
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// A callback that writes `key` directly, bypassing failure injection.
    /// Stands in for another script touching storage mid-operation.
    #[cfg(test)]
    pub fn inserter(&self, key: &str, value: Value) -> impl Fn() + Send + Sync + use<> {
        let entries = Arc::clone(&self.entries);
        let key = key.to_string();
        move || {
            if let Ok(mut guard) = entries.lock() {
                guard.insert(key.clone(), value.clone());
            }
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Record>> {
        self.entries
            .lock()
            .map_err(|_| TailorError::Infra("memory store lock poisoned".to_string()))
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TailorError::Infra("write rejected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<Record> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(TailorError::Infra("read rejected".to_string()));
        }
        let entries = self.lock()?;
        Ok(select(&entries, keys))
    }

    async fn set(&self, record: Record) -> Result<()> {
        self.check_write()?;
        {
            let mut entries = self.lock()?;
            merge(&mut entries, record);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        self.check_write()?;
        {
            let mut entries = self.lock()?;
            for key in keys {
                entries.remove(*key);
            }
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Store persisted as a single JSON object on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Open the store at the platform data directory.
    pub fn open_default() -> Result<Self> {
        super::paths::storage_path()
            .map(Self::new)
            .ok_or_else(|| TailorError::Infra("no data directory for this platform".to_string()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Record> {
        if !self.path.exists() {
            return Ok(Record::new());
        }

        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Record::new());
        }
        let record: Record = serde_json::from_str(&contents)?;
        Ok(record)
    }

    fn write_all(&self, record: &Record) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(record)?;

        // Write atomically via temp file
        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, keys: &[&str]) -> Result<Record> {
        Ok(select(&self.read_all()?, keys))
    }

    async fn set(&self, record: Record) -> Result<()> {
        let mut entries = self.read_all()?;
        merge(&mut entries, record);
        self.write_all(&entries)
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut entries = self.read_all()?;
        for key in keys {
            entries.remove(*key);
        }
        self.write_all(&entries)
    }
}
