#![forbid(unsafe_code)]

//! Reversible commands over the object graph.
//!
//! A [`PdmCommand`] addresses its targets by root-relative path, never by
//! id, so it keeps working after the objects it touched were destroyed and
//! rebuilt by other undo steps. State is captured as whole-field tokens from
//! the serialization round trip.
//!
//! # Invariants
//!
//! - `redo()` followed by `undo()` restores the prior graph content.
//! - `undo()` followed by `redo()` restores the executed content.
//! - `size_bytes()` covers captured tokens and records, for history limits.
//!
//! # Failure Modes
//!
//! - **Stale reference on first redo**: the command fails with
//!   [`CommandError::StaleReference`] and is never recorded.
//! - **Stale reference later**: an undo or redo whose path no longer
//!   resolves logs a warning and changes nothing.

use std::fmt;

use pdm_core::{ObjectGraph, ObjectId, PdmError};
use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::notification::NotificationCenter;
use crate::selection::SelectionManager;

/// Everything a command may touch while it runs.
pub struct CommandContext<'a> {
    pub graph: &'a mut ObjectGraph,
    /// Root that every command path is relative to.
    pub root: ObjectId,
    pub selection: &'a mut SelectionManager,
    pub notifications: &'a NotificationCenter,
}

impl fmt::Debug for CommandContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("root", &self.root)
            .field("objects", &self.graph.len())
            .finish()
    }
}

/// Category used to switch undo recording per command type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    FieldChange,
    AddItem,
    DeleteItem,
    Macro,
    Custom,
}

/// Who triggered a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandSource {
    /// Direct user action.
    #[default]
    User,
    Programmatic,
    /// Part of a macro.
    Macro,
    /// Scripts and other external callers.
    External,
}

/// Metadata attached to every command.
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    /// Human-readable description, shown as the undo entry name.
    pub description: String,
    pub timestamp: Instant,
    pub source: CommandSource,
    pub batch_id: Option<u64>,
}

impl CommandMetadata {
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            timestamp: Instant::now(),
            source: CommandSource::User,
            batch_id: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: CommandSource) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn with_batch(mut self, batch_id: u64) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    #[must_use]
    pub fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.description.len()
    }
}

impl Default for CommandMetadata {
    fn default() -> Self {
        Self::new("Unknown")
    }
}

pub type CommandResult = Result<(), CommandError>;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// A stored path no longer resolves.
    #[error("stale reference: {0}")]
    StaleReference(String),
    #[error("option index {index} out of range ({len} options)")]
    OptionOutOfRange { index: usize, len: usize },
    #[error("no macro is being recorded")]
    NoOpenMacro,
    #[error("macro '{0}' is still being recorded")]
    MacroOpen(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error(transparent)]
    Model(#[from] PdmError),
}

/// A reversible mutation of the object graph.
pub trait PdmCommand {
    /// Apply the command. The first call executes it; later calls re-apply
    /// the captured result.
    fn redo(&mut self, cx: &mut CommandContext<'_>) -> CommandResult;

    /// Revert the command.
    fn undo(&mut self, cx: &mut CommandContext<'_>) -> CommandResult;

    fn description(&self) -> &str {
        &self.metadata().description
    }

    fn metadata(&self) -> &CommandMetadata;

    fn kind(&self) -> CommandKind;

    /// Approximate heap footprint for history limits.
    fn size_bytes(&self) -> usize;

    fn debug_name(&self) -> &'static str {
        "PdmCommand"
    }
}

impl fmt::Debug for dyn PdmCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(self.debug_name())
            .field("description", &self.description())
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}

/// Outcome of resolving a stored path inside a command.
///
/// Before the first successful redo a stale path is an error; afterwards
/// it is logged and skipped.
pub(crate) fn stale(executed: bool, what: &str, path: &str) -> CommandResult {
    if executed {
        tracing::warn!(target: "pdm.command", what, path, "stale reference, step skipped");
        Ok(())
    } else {
        Err(CommandError::StaleReference(format!("{what} '{path}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_builders() {
        let meta = CommandMetadata::new("Rename")
            .with_source(CommandSource::External)
            .with_batch(7);
        assert_eq!(meta.description, "Rename");
        assert_eq!(meta.source, CommandSource::External);
        assert_eq!(meta.batch_id, Some(7));
        assert!(meta.size_bytes() > "Rename".len());
        assert_eq!(CommandMetadata::default().description, "Unknown");
    }

    #[test]
    fn stale_is_fatal_only_before_first_run() {
        assert!(matches!(
            stale(false, "field", "Items 3 Label"),
            Err(CommandError::StaleReference(msg)) if msg == "field 'Items 3 Label'"
        ));
        assert!(stale(true, "field", "Items 3 Label").is_ok());
    }

    #[test]
    fn model_errors_convert() {
        let err: CommandError = PdmError::InvalidKeyword("1x".into()).into();
        assert!(matches!(err, CommandError::Model(_)));
    }
}
