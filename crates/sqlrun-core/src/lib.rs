pub mod config;
pub mod history;
pub mod storage;
pub mod util;

pub use config::{load_config, Config, Settings};
pub use history::{HistoryEntry, HistoryError, QueryHistory, HISTORY_KEY, MAX_HISTORY_QUERIES};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
