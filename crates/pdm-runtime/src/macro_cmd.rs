#![forbid(unsafe_code)]

//! Several commands recorded as one undo entry.

use std::fmt;

use tracing::warn;

use crate::command::{CommandContext, CommandKind, CommandMetadata, CommandResult, PdmCommand};

/// An ordered group of commands undone and redone as a unit.
///
/// Redo runs the commands not yet applied in insertion order; undo runs the
/// applied ones in reverse. A failure in either direction puts back the
/// commands already stepped over before the error is returned, so the macro
/// is always fully applied or fully reverted.
pub struct MacroCommand {
    commands: Vec<Box<dyn PdmCommand>>,
    metadata: CommandMetadata,
    /// Number of leading commands currently applied.
    executed_to: usize,
}

impl fmt::Debug for MacroCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacroCommand")
            .field("commands_count", &self.commands.len())
            .field("metadata", &self.metadata)
            .field("executed_to", &self.executed_to)
            .finish()
    }
}

impl MacroCommand {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            commands: Vec::new(),
            metadata: CommandMetadata::new(name),
            executed_to: 0,
        }
    }

    /// A macro built from `commands` that have not run yet.
    #[must_use]
    pub fn from_commands(name: impl Into<String>, commands: Vec<Box<dyn PdmCommand>>) -> Self {
        let mut cmd = Self::new(name);
        cmd.commands = commands;
        cmd
    }

    pub fn push(&mut self, cmd: Box<dyn PdmCommand>) {
        self.commands.push(cmd);
    }

    /// Add a command that already ran outside the macro.
    pub fn push_executed(&mut self, cmd: Box<dyn PdmCommand>) {
        self.commands.push(cmd);
        self.executed_to = self.commands.len();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// `true` when every command is applied.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        self.executed_to == self.commands.len()
    }

    /// Descriptions of the recorded commands, in order.
    #[must_use]
    pub fn descriptions(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.description()).collect()
    }
}

impl PdmCommand for MacroCommand {
    fn redo(&mut self, cx: &mut CommandContext<'_>) -> CommandResult {
        for i in self.executed_to..self.commands.len() {
            if let Err(err) = self.commands[i].redo(cx) {
                for j in (0..i).rev() {
                    if let Err(undo_err) = self.commands[j].undo(cx) {
                        warn!(target: "pdm.command", %undo_err, "macro rollback step failed");
                    }
                }
                self.executed_to = 0;
                return Err(err);
            }
            self.executed_to = i + 1;
        }
        Ok(())
    }

    fn undo(&mut self, cx: &mut CommandContext<'_>) -> CommandResult {
        let applied = self.executed_to;
        for i in (0..applied).rev() {
            if let Err(err) = self.commands[i].undo(cx) {
                for j in i + 1..applied {
                    if let Err(redo_err) = self.commands[j].redo(cx) {
                        warn!(target: "pdm.command", %redo_err, "macro rollback step failed");
                    }
                }
                self.executed_to = applied;
                return Err(err);
            }
            self.executed_to = i;
        }
        Ok(())
    }

    fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Macro
    }

    fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.metadata.size_bytes()
            + self.commands.iter().map(|c| c.size_bytes()).sum::<usize>()
    }

    fn debug_name(&self) -> &'static str {
        "MacroCommand"
    }
}
