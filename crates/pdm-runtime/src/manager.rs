#![forbid(unsafe_code)]

//! Command execution and macro recording.
//!
//! [`CommandManager`] is the only way commands reach the history. It runs
//! each command once, then either records it or drops it depending on
//! whether undo is enabled for the command's [`CommandKind`].
//!
//! # Macros
//!
//! `begin_macro` / `end_macro` pairs may nest; only the outermost pair
//! produces a history entry, named after the outermost `begin_macro`.
//! While a macro is open, commands still run immediately but are collected
//! into it, and undo/redo are refused.
//!
//! ```text
//! begin("Batch edit")  execute(a)  execute(b)  end()
//!                      └─ runs ─┘  └─ runs ─┘  └─▶ history: [Batch edit{a, b}]
//! ```

use std::collections::HashSet;

use tracing::{debug, info};

use crate::command::{CommandContext, CommandError, CommandKind, CommandResult, PdmCommand};
use crate::history::{HistoryConfig, HistoryManager};
use crate::macro_cmd::MacroCommand;
use crate::notification::{NotificationCenter, PdmEvent};

struct OpenMacro {
    command: MacroCommand,
    depth: usize,
}

/// Executes commands and owns the undo history.
pub struct CommandManager {
    history: HistoryManager,
    undo_enabled: bool,
    disabled_kinds: HashSet<CommandKind>,
    recording: Option<OpenMacro>,
    notifications: NotificationCenter,
}

impl std::fmt::Debug for CommandManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandManager")
            .field("history", &self.history)
            .field("undo_enabled", &self.undo_enabled)
            .field("disabled_kinds", &self.disabled_kinds)
            .field("macro_depth", &self.macro_depth())
            .finish()
    }
}

impl Default for CommandManager {
    fn default() -> Self {
        Self::new(HistoryConfig::default(), NotificationCenter::new())
    }
}

impl CommandManager {
    /// A manager publishing `UndoStackChanged` through `notifications`.
    #[must_use]
    pub fn new(config: HistoryConfig, notifications: NotificationCenter) -> Self {
        Self {
            history: HistoryManager::new(config),
            undo_enabled: true,
            disabled_kinds: HashSet::new(),
            recording: None,
            notifications,
        }
    }

    fn announce(&self) {
        self.notifications.notify(&PdmEvent::UndoStackChanged {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        });
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Run `cmd` and record it when undo is enabled for its kind.
    ///
    /// A command whose first redo fails is never recorded.
    pub fn execute(
        &mut self,
        cx: &mut CommandContext<'_>,
        mut cmd: Box<dyn PdmCommand>,
    ) -> CommandResult {
        cmd.redo(cx)?;
        if !self.is_undo_enabled_for(cmd.kind()) {
            debug!(target: "pdm.command", description = cmd.description(), "undo disabled, command dropped");
            return Ok(());
        }
        match &mut self.recording {
            Some(open) => open.command.push_executed(cmd),
            None => {
                debug!(target: "pdm.command", description = cmd.description(), "command recorded");
                self.history.push(cmd);
                self.announce();
            }
        }
        Ok(())
    }

    /// Run `commands` in order as one history entry named `name`.
    ///
    /// If one fails, the ones before it are undone and nothing is recorded.
    pub fn execute_as_macro(
        &mut self,
        cx: &mut CommandContext<'_>,
        name: impl Into<String>,
        commands: Vec<Box<dyn PdmCommand>>,
    ) -> CommandResult {
        if commands.is_empty() {
            return Ok(());
        }
        self.execute(cx, Box::new(MacroCommand::from_commands(name, commands)))
    }

    /// Start collecting executed commands into one entry.
    pub fn begin_macro(&mut self, name: impl Into<String>) {
        match &mut self.recording {
            Some(open) => open.depth += 1,
            None => {
                let name = name.into();
                info!(target: "pdm.command", name = %name, "macro started");
                self.recording = Some(OpenMacro {
                    command: MacroCommand::new(name),
                    depth: 1,
                });
            }
        }
    }

    /// Close the innermost open macro. Closing the outermost one records
    /// the collected commands, unless there were none.
    pub fn end_macro(&mut self) -> CommandResult {
        let Some(open) = &mut self.recording else {
            return Err(CommandError::NoOpenMacro);
        };
        open.depth -= 1;
        if open.depth > 0 {
            return Ok(());
        }
        let Some(open) = self.recording.take() else {
            return Err(CommandError::NoOpenMacro);
        };
        info!(
            target: "pdm.command",
            name = open.command.description(),
            commands = open.command.len(),
            "macro finished"
        );
        if !open.command.is_empty() {
            self.history.push(Box::new(open.command));
            self.announce();
        }
        Ok(())
    }

    /// Nesting depth of open macros (0 when none is open).
    #[must_use]
    pub fn macro_depth(&self) -> usize {
        self.recording.as_ref().map_or(0, |open| open.depth)
    }

    fn refuse_while_recording(&self) -> CommandResult {
        match &self.recording {
            Some(open) => Err(CommandError::MacroOpen(
                open.command.description().to_string(),
            )),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Undo / Redo
    // ========================================================================

    /// Undo the newest entry. Returns its description, or `None` when there
    /// is nothing to undo.
    pub fn undo(&mut self, cx: &mut CommandContext<'_>) -> Result<Option<String>, CommandError> {
        self.refuse_while_recording()?;
        let Some(result) = self.history.undo(cx) else {
            return Ok(None);
        };
        let description = result?;
        debug!(target: "pdm.command", %description, "undone");
        self.announce();
        Ok(Some(description))
    }

    /// Redo the most recently undone entry.
    pub fn redo(&mut self, cx: &mut CommandContext<'_>) -> Result<Option<String>, CommandError> {
        self.refuse_while_recording()?;
        let Some(result) = self.history.redo(cx) else {
            return Ok(None);
        };
        let description = result?;
        debug!(target: "pdm.command", %description, "redone");
        self.announce();
        Ok(Some(description))
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Description of the entry the next undo would revert.
    #[must_use]
    pub fn top_name(&self) -> Option<&str> {
        self.history.next_undo_description()
    }

    // ========================================================================
    // Policy
    // ========================================================================

    /// Turn recording on or off for every kind.
    pub fn set_undo_enabled(&mut self, enabled: bool) {
        self.undo_enabled = enabled;
    }

    #[must_use]
    pub fn is_undo_enabled(&self) -> bool {
        self.undo_enabled
    }

    /// Turn recording on or off for one kind.
    pub fn set_undo_enabled_for(&mut self, kind: CommandKind, enabled: bool) {
        if enabled {
            self.disabled_kinds.remove(&kind);
        } else {
            self.disabled_kinds.insert(kind);
        }
    }

    #[must_use]
    pub fn is_undo_enabled_for(&self, kind: CommandKind) -> bool {
        self.undo_enabled && !self.disabled_kinds.contains(&kind)
    }

    /// Drop the whole history.
    pub fn clear(&mut self) {
        self.history.clear();
        self.announce();
    }

    #[must_use]
    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut HistoryManager {
        &mut self.history
    }
}
