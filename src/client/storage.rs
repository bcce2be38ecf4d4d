//! Durable client-side state: the browser's localStorage, as a JSON file.

use crate::models::ItemId;
use log::{info, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::block_in_place;
use uuid::Uuid;

pub const USER_ID_KEY: &str = "user_id";
pub const USER_NAME_KEY: &str = "user_name";
pub const SELECTION_KEY: &str = "selection";

pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// Key/value pairs kept as one JSON object, rewritten on every change.
///
/// Writes are synchronous. Inside a multi-threaded runtime the worker is
/// handed over with `block_in_place` while the file is written.
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring unreadable profile {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> io::Result<()> {
        let raw = serde_json::to_string_pretty(entries)?;
        let write = || fs::write(&self.path, &raw);
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => block_in_place(write),
            _ => write(),
        }
    }
}

impl LocalStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

pub fn load_selection(storage: &dyn LocalStorage) -> BTreeSet<ItemId> {
    storage
        .get(SELECTION_KEY)
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default()
}

pub fn save_selection(storage: &dyn LocalStorage, selection: &BTreeSet<ItemId>) -> io::Result<()> {
    let raw = serde_json::to_string(selection)?;
    storage.set(SELECTION_KEY, &raw)
}

/// Who this client is: a stable generated id plus the last name typed in.
pub struct Profile {
    pub user_id: String,
    pub user_name: String,
    storage: Arc<dyn LocalStorage>,
}

impl Profile {
    pub fn load(storage: Arc<dyn LocalStorage>) -> io::Result<Self> {
        let user_id = match storage.get(USER_ID_KEY) {
            Some(id) if !id.trim().is_empty() => id,
            _ => {
                let id = Uuid::new_v4().to_string();
                storage.set(USER_ID_KEY, &id)?;
                info!("Generated new user id {}", id);
                id
            }
        };
        let user_name = storage.get(USER_NAME_KEY).unwrap_or_default();

        Ok(Self {
            user_id,
            user_name,
            storage,
        })
    }

    pub fn set_name(&mut self, name: &str) -> io::Result<()> {
        self.user_name = name.trim().to_string();
        self.storage.set(USER_NAME_KEY, &self.user_name)
    }
}
