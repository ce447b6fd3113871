use super::StoreError;
use crate::model::Memory;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, info};

/// Long-term facts about the user, persisted across sessions.
pub trait MemoryStore: Send + Sync {
    fn save(&self, category: &str, fact: &str) -> Result<Memory, StoreError>;

    fn all(&self) -> Vec<Memory>;

    /// Case-insensitive substring search over facts and categories.
    fn search(&self, query: &str) -> Vec<Memory> {
        let query = query.to_lowercase();
        self.all()
            .into_iter()
            .filter(|m| {
                m.fact.to_lowercase().contains(&query) || m.category.to_lowercase().contains(&query)
            })
            .collect()
    }
}

fn new_memory(existing: usize, category: &str, fact: &str) -> Memory {
    let timestamp = Utc::now().timestamp_millis();
    Memory {
        id: format!("{:x}-{}", timestamp, existing),
        category: category.to_string(),
        fact: fact.to_string(),
        timestamp,
    }
}

/// Volatile store, mostly for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    memories: Mutex<Vec<Memory>>,
}

impl MemoryStore for InMemoryStore {
    fn save(&self, category: &str, fact: &str) -> Result<Memory, StoreError> {
        let mut memories = self.memories.lock().map_err(|_| StoreError::Poisoned)?;
        let memory = new_memory(memories.len(), category, fact);
        memories.push(memory.clone());
        Ok(memory)
    }

    fn all(&self) -> Vec<Memory> {
        self.memories.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

/// Runs file IO on the calling thread. On a multi-threaded runtime the worker
/// first hands its other tasks to another thread.
fn blocking_io<R>(io: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => tokio::task::block_in_place(io),
        _ => io(),
    }
}

/// Store backed by a JSON array on disk, rewritten on every save.
///
/// `save` blocks on the file write. It is called from the dispatcher task,
/// so the write goes through [`tokio::task::block_in_place`] when the runtime
/// allows it.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    memories: Mutex<Vec<Memory>>,
}

impl JsonFileStore {
    /// Opens the store, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let memories = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => Vec::new(),
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        info!("Loaded {} memories from {}", memories.len(), path.display());
        Ok(Self {
            path,
            memories: Mutex::new(memories),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, memories: &[Memory]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(memories)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!("Persisted {} memories", memories.len());
        Ok(())
    }
}

impl MemoryStore for JsonFileStore {
    fn save(&self, category: &str, fact: &str) -> Result<Memory, StoreError> {
        let mut memories = self.memories.lock().map_err(|_| StoreError::Poisoned)?;
        let memory = new_memory(memories.len(), category, fact);
        memories.push(memory.clone());
        if let Err(e) = blocking_io(|| self.persist(&memories)) {
            memories.pop();
            return Err(e);
        }
        Ok(memory)
    }

    fn all(&self) -> Vec<Memory> {
        self.memories.lock().map(|m| m.clone()).unwrap_or_default()
    }
}
