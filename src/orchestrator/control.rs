//! External control commands
//!
//! Another process asks the running bot to do something by dropping a
//! marker file into the control directory:
//!
//! | Marker | Command |
//! |--------|---------|
//! | `autoposter.stop` | stop the loop |
//! | `autoposter.restart` | exit so a supervisor restarts the process |
//! | `autoposter.publish_now` | publish one post outside the schedule |
//! | `autoposter.status` | print today's status |
//! | `autoposter.reset_today` | delete today's history |
//!
//! The loop polls the queue, runs each command and acknowledges it, which
//! removes the marker.

use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};

/// A control command, ordered by handling priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ControlCommand {
    Stop,
    Restart,
    PublishNow,
    Status,
    ResetToday,
}

impl ControlCommand {
    /// Every command, in priority order
    pub fn all() -> [ControlCommand; 5] {
        [
            Self::Stop,
            Self::Restart,
            Self::PublishNow,
            Self::Status,
            Self::ResetToday,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::PublishNow => "publish_now",
            Self::Status => "status",
            Self::ResetToday => "reset_today",
        }
    }

    /// Marker file name
    pub fn marker_name(&self) -> String {
        format!("autoposter.{}", self.as_str())
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Polled command queue
pub trait CommandQueue: Send + Sync {
    /// Pending commands, highest priority first
    fn poll(&self) -> Result<Vec<ControlCommand>>;

    /// Request a command
    fn enqueue(&self, command: ControlCommand) -> Result<()>;

    /// Mark a command as handled
    fn ack(&self, command: ControlCommand) -> Result<()>;
}

// ============================================================================
// Marker files
// ============================================================================

/// Commands backed by marker files in a directory
#[derive(Debug, Clone)]
pub struct FileCommandQueue {
    dir: PathBuf,
}

impl FileCommandQueue {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn marker_path(&self, command: ControlCommand) -> PathBuf {
        self.dir.join(command.marker_name())
    }
}

impl CommandQueue for FileCommandQueue {
    fn poll(&self) -> Result<Vec<ControlCommand>> {
        Ok(ControlCommand::all()
            .into_iter()
            .filter(|c| self.marker_path(*c).exists())
            .collect())
    }

    fn enqueue(&self, command: ControlCommand) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.marker_path(command);
        std::fs::write(&path, b"").map_err(|e| {
            Error::control(format!("failed to create {}: {e}", path.display()))
        })?;
        tracing::debug!(command = %command, marker = %path.display(), "Command marker created");
        Ok(())
    }

    fn ack(&self, command: ControlCommand) -> Result<()> {
        match std::fs::remove_file(self.marker_path(command)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// In-memory queue for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryCommandQueue {
    pending: Mutex<BTreeSet<ControlCommand>>,
}

impl MemoryCommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> Result<std::sync::MutexGuard<'_, BTreeSet<ControlCommand>>> {
        self.pending
            .lock()
            .map_err(|_| Error::control("command queue lock poisoned"))
    }
}

impl CommandQueue for MemoryCommandQueue {
    fn poll(&self) -> Result<Vec<ControlCommand>> {
        Ok(self.pending()?.iter().copied().collect())
    }

    fn enqueue(&self, command: ControlCommand) -> Result<()> {
        self.pending()?.insert(command);
        Ok(())
    }

    fn ack(&self, command: ControlCommand) -> Result<()> {
        self.pending()?.remove(&command);
        Ok(())
    }
}
