//! Application state shared with the tool handlers.

mod medications;
mod memory;

pub use medications::MedicationList;
pub use memory::{InMemoryStore, JsonFileStore, MemoryStore};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}
