#![forbid(unsafe_code)]

//! Undo and redo stacks.
//!
//! [`HistoryManager`] owns executed commands. Undo moves the newest entry to
//! the redo stack; redo moves it back. Any newly pushed command starts a new
//! branch and discards the redo stack.
//!
//! # Invariants
//!
//! 1. `total_bytes` always equals the sum of `size_bytes()` over both stacks.
//! 2. `undo_depth() <= config.max_depth` after every operation.
//! 3. `total_bytes <= config.max_bytes` after every operation when a byte
//!    limit is set.
//! 4. The redo stack is empty right after a push.
//!
//! ```text
//! push(c4)        undo: [c1 c2 c3 c4]  redo: []
//! undo() x2       undo: [c1 c2]        redo: [c4 c3]
//! push(c5)        undo: [c1 c2 c5]     redo: []
//! ```
//!
//! # Failure Modes
//!
//! - **Failing undo/redo**: the command stays where it was and the error is
//!   returned; the stacks are unchanged.
//! - **Eviction past the clean point**: the history can no longer return to
//!   the saved state, so [`HistoryManager::is_clean`] stays `false` until the
//!   next [`HistoryManager::set_clean`].

use std::collections::VecDeque;
use std::fmt;

use tracing::debug;

use crate::command::{CommandContext, CommandError, PdmCommand};

/// Limits for the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum number of undo entries.
    pub max_depth: usize,
    /// Maximum total bytes over both stacks (0 = unlimited).
    pub max_bytes: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: 100,
            max_bytes: 10 * 1024 * 1024, // 10 MB
        }
    }
}

impl HistoryConfig {
    #[must_use]
    pub fn new(max_depth: usize, max_bytes: usize) -> Self {
        Self {
            max_depth,
            max_bytes,
        }
    }

    /// No depth or byte limit (for testing).
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            max_depth: usize::MAX,
            max_bytes: 0,
        }
    }
}

/// Linear undo history.
pub struct HistoryManager {
    /// Newest at the back.
    undo_stack: VecDeque<Box<dyn PdmCommand>>,
    /// Newest at the back.
    redo_stack: VecDeque<Box<dyn PdmCommand>>,
    config: HistoryConfig,
    total_bytes: usize,
    /// Undo depth at the last save, if still reachable.
    clean_depth: Option<usize>,
}

impl fmt::Debug for HistoryManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryManager")
            .field("undo_depth", &self.undo_stack.len())
            .field("redo_depth", &self.redo_stack.len())
            .field("total_bytes", &self.total_bytes)
            .field("clean_depth", &self.clean_depth)
            .field("config", &self.config)
            .finish()
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl HistoryManager {
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            config,
            total_bytes: 0,
            clean_depth: Some(0),
        }
    }

    // ========================================================================
    // Core Operations
    // ========================================================================

    /// Record an already executed command.
    ///
    /// Clears the redo stack and enforces limits.
    pub fn push(&mut self, cmd: Box<dyn PdmCommand>) {
        self.clear_redo();
        if self.clean_depth.is_some_and(|d| d > self.undo_stack.len()) {
            self.clean_depth = None;
        }
        self.total_bytes += cmd.size_bytes();
        self.undo_stack.push_back(cmd);
        self.enforce_limits();
    }

    /// Undo the newest command.
    ///
    /// Returns the command's description, the error if its undo failed, or
    /// `None` when there is nothing to undo.
    pub fn undo(&mut self, cx: &mut CommandContext<'_>) -> Option<Result<String, CommandError>> {
        let mut cmd = self.undo_stack.pop_back()?;
        let description = cmd.description().to_string();
        match cmd.undo(cx) {
            Ok(()) => {
                self.redo_stack.push_back(cmd);
                Some(Ok(description))
            }
            Err(e) => {
                self.undo_stack.push_back(cmd);
                Some(Err(e))
            }
        }
    }

    /// Redo the most recently undone command.
    pub fn redo(&mut self, cx: &mut CommandContext<'_>) -> Option<Result<String, CommandError>> {
        let mut cmd = self.redo_stack.pop_back()?;
        let description = cmd.description().to_string();
        match cmd.redo(cx) {
            Ok(()) => {
                self.undo_stack.push_back(cmd);
                Some(Ok(description))
            }
            Err(e) => {
                self.redo_stack.push_back(cmd);
                Some(Err(e))
            }
        }
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Description of the entry the next undo would revert.
    #[must_use]
    pub fn next_undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|c| c.description())
    }

    /// Replace the limits and evict whatever no longer fits.
    pub fn set_config(&mut self, config: HistoryConfig) {
        self.config = config;
        self.enforce_limits();
    }

    // ========================================================================
    // Clean State
    // ========================================================================

    /// Mark the current position as the saved state.
    pub fn set_clean(&mut self) {
        self.clean_depth = Some(self.undo_stack.len());
    }

    /// `true` when undo/redo has returned to the saved state.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.clean_depth == Some(self.undo_stack.len())
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Drop both stacks. The empty history counts as clean.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.total_bytes = 0;
        self.clean_depth = Some(0);
    }

    fn clear_redo(&mut self) {
        for cmd in self.redo_stack.drain(..) {
            self.total_bytes = self.total_bytes.saturating_sub(cmd.size_bytes());
        }
    }

    fn evict_oldest_undo(&mut self) -> bool {
        let Some(cmd) = self.undo_stack.pop_front() else {
            return false;
        };
        self.total_bytes = self.total_bytes.saturating_sub(cmd.size_bytes());
        self.clean_depth = self.clean_depth.and_then(|d| d.checked_sub(1));
        debug!(target: "pdm.command", description = cmd.description(), "history entry evicted");
        true
    }

    fn over_byte_budget(&self) -> bool {
        self.config.max_bytes > 0 && self.total_bytes > self.config.max_bytes
    }

    fn enforce_limits(&mut self) {
        let excess = self.undo_stack.len().saturating_sub(self.config.max_depth);
        for _ in 0..excess {
            self.evict_oldest_undo();
        }
        // Redo entries go first, furthest from the current state first.
        while self.over_byte_budget() {
            let Some(cmd) = self.redo_stack.pop_front() else {
                break;
            };
            self.total_bytes = self.total_bytes.saturating_sub(cmd.size_bytes());
        }
        while self.over_byte_budget() && self.evict_oldest_undo() {}
    }
}
