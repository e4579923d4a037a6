//! Persistence for the autoposter
//!
//! The only persistent state is the publication history; everything else
//! (failure counters, circuit state) lives in process memory.

pub mod history;

pub use history::{HistoryStore, MockHistoryStore, SharedHistoryStore, SqliteHistoryStore};

use std::path::Path;
use std::sync::Arc;

use crate::error::Result;

/// Create a shared SQLite history store
pub fn open_history(path: impl AsRef<Path>) -> Result<SharedHistoryStore> {
    Ok(Arc::new(SqliteHistoryStore::new(path)?))
}
