//! Ordered command registry with copy-on-write snapshots for matching passes.

use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::command::{load_commands, Command, CommandFileError};
use crate::lock::{read_or_recover, write_or_recover};

/// Holds the defined commands in insertion order.
///
/// Matching passes take an `Arc` snapshot and never block on edits; the editor
/// publishes a whole new command set through [`CommandRegistry::replace`].
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: RwLock<Arc<Vec<Command>>>,
}

impl CommandRegistry {
    pub fn new(commands: Vec<Command>) -> Self {
        Self {
            commands: RwLock::new(Arc::new(commands)),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self, CommandFileError> {
        load_commands(path).map(Self::new)
    }

    /// Snapshot of every command in registration order.
    #[must_use = "the snapshot is the consistent view for one matching pass"]
    pub fn all(&self) -> Arc<Vec<Command>> {
        Arc::clone(&read_or_recover(&self.commands, "command registry read"))
    }

    /// Atomically publish a new command set. In-flight passes keep their old snapshot.
    pub fn replace(&self, commands: Vec<Command>) {
        let count = commands.len();
        *write_or_recover(&self.commands, "command registry replace") = Arc::new(commands);
        tracing::debug!(count, "command registry replaced");
    }

    pub fn len(&self) -> usize {
        self.all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.all().is_empty()
    }
}
