#![forbid(unsafe_code)]

//! PDM Runtime
//!
//! Everything that changes a `pdm-core` object graph on a user's behalf.
//!
//! # Key Components
//!
//! - [`PdmCommand`] - Reversible mutation addressed by root-relative paths
//! - [`FieldChangeCommand`], [`AddItemCommand`], [`DeleteItemCommand`],
//!   [`MacroCommand`] - The built-in commands
//! - [`CommandManager`] - Executes commands, records macros, owns the history
//! - [`HistoryManager`] - Bounded undo/redo stacks with a clean marker
//! - [`SelectionManager`] - Multi-level selection of objects and fields
//! - [`NotificationCenter`] - Synchronous event fan-out
//! - [`PdmContext`] - One document's graph, history, selection and events
//! - [`RuntimeConfig`] - Tunables loadable from TOML or JSON
//!
//! # Role
//! `pdm-core` describes the data; this crate decides how it changes. Every
//! user-visible edit goes through a command so it can be undone, and every
//! change is announced through the notification center so views can refresh.

pub mod command;
pub mod config;
pub mod context;
pub mod field_change;
pub mod history;
pub mod item_commands;
pub mod logging;
pub mod macro_cmd;
pub mod manager;
pub mod notification;
pub mod selection;

pub use command::{
    CommandContext, CommandError, CommandKind, CommandMetadata, CommandResult, CommandSource,
    PdmCommand,
};
pub use config::{ConfigError, HistoryPolicy, LogFormat, LoggingPolicy, RuntimeConfig, UndoPolicy};
pub use context::PdmContext;
pub use field_change::{FieldChangeCommand, UiValue, value_options};
pub use history::{HistoryConfig, HistoryManager};
pub use item_commands::{AddItemCommand, DeleteItemCommand, ItemSource};
pub use logging::{LoggingError, init_logging};
pub use macro_cmd::MacroCommand;
pub use manager::CommandManager;
pub use notification::{EventLog, NotificationCenter, PdmEvent, Subscription};
pub use selection::{SelectionItem, SelectionManager, SelectionReference};
