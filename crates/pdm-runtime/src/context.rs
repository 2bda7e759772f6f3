#![forbid(unsafe_code)]

//! One document's runtime state.
//!
//! [`PdmContext`] owns the object graph, its root, the command manager, the
//! selection and the notification center. Each verb builds the matching
//! command and runs it through the manager.
//!
//! ```text
//! PdmContext
//! ├── graph + root      the document
//! ├── commands          history, macros, undo policy
//! ├── selection         per-level selection
//! └── notifications     shared by commands, selection and subscribers
//! ```

use std::path::Path;

use pdm_core::{
    FieldHandle, ObjectGraph, ObjectId, PdmError, read_document, reference_from_root_to_field,
    write_document,
};

use crate::command::{CommandContext, CommandError, CommandResult, PdmCommand};
use crate::config::RuntimeConfig;
use crate::field_change::{FieldChangeCommand, UiValue};
use crate::item_commands::{AddItemCommand, DeleteItemCommand, ItemSource};
use crate::manager::CommandManager;
use crate::notification::{NotificationCenter, PdmEvent, Subscription};
use crate::selection::{SelectionItem, SelectionManager};

#[derive(Debug)]
pub struct PdmContext {
    graph: ObjectGraph,
    root: ObjectId,
    commands: CommandManager,
    selection: SelectionManager,
    notifications: NotificationCenter,
}

impl PdmContext {
    /// Context over `root` with default limits and policies.
    #[must_use]
    pub fn new(graph: ObjectGraph, root: ObjectId) -> Self {
        Self::with_config(graph, root, &RuntimeConfig::default())
    }

    #[must_use]
    pub fn with_config(graph: ObjectGraph, root: ObjectId, config: &RuntimeConfig) -> Self {
        let notifications = NotificationCenter::new();
        let mut commands = CommandManager::new(config.to_history_config(), notifications.clone());
        config.apply_undo_policy(&mut commands);
        Self {
            graph,
            root,
            commands,
            selection: SelectionManager::new(notifications.clone()),
            notifications,
        }
    }

    /// Read a document into `graph` and open a context on it. The history
    /// starts clean.
    pub fn load_document(
        mut graph: ObjectGraph,
        path: impl AsRef<Path>,
        config: &RuntimeConfig,
    ) -> Result<Self, PdmError> {
        let root = read_document(&mut graph, path)?;
        Ok(Self::with_config(graph, root, config))
    }

    /// Write the document and mark the history clean.
    pub fn save_document(&mut self, path: impl AsRef<Path>) -> Result<(), PdmError> {
        write_document(&mut self.graph, self.root, path)?;
        self.commands.history_mut().set_clean();
        Ok(())
    }

    /// `true` while undo/redo sits at the last save.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.commands.history().is_clean()
    }

    // ========================================================================
    // Access
    // ========================================================================

    #[must_use]
    pub fn graph(&self) -> &ObjectGraph {
        &self.graph
    }

    /// Direct graph access. Edits made here bypass the history.
    pub fn graph_mut(&mut self) -> &mut ObjectGraph {
        &mut self.graph
    }

    #[must_use]
    pub fn root(&self) -> ObjectId {
        self.root
    }

    #[must_use]
    pub fn commands(&self) -> &CommandManager {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut CommandManager {
        &mut self.commands
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    /// Register for every runtime event.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&PdmEvent) + 'static) -> Subscription {
        self.notifications.subscribe(callback)
    }

    /// Split borrow handed to commands.
    fn split(&mut self) -> (&mut CommandManager, CommandContext<'_>) {
        (
            &mut self.commands,
            CommandContext {
                graph: &mut self.graph,
                root: self.root,
                selection: &mut self.selection,
                notifications: &self.notifications,
            },
        )
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Run any command through the history.
    pub fn execute(&mut self, cmd: Box<dyn PdmCommand>) -> CommandResult {
        let (commands, mut cx) = self.split();
        commands.execute(&mut cx, cmd)
    }

    /// Run `cmds` in order as one undo entry.
    pub fn execute_as_macro(
        &mut self,
        name: impl Into<String>,
        cmds: Vec<Box<dyn PdmCommand>>,
    ) -> CommandResult {
        let (commands, mut cx) = self.split();
        commands.execute_as_macro(&mut cx, name, cmds)
    }

    /// Change one field the way an editor would.
    pub fn change_field_from_ui(
        &mut self,
        field: FieldHandle,
        value: impl Into<UiValue>,
    ) -> CommandResult {
        let cmd = FieldChangeCommand::for_field(&self.graph, self.root, field, value)?;
        self.execute(Box::new(cmd))
    }

    /// Apply the same value to several fields as one undo entry, as editors
    /// do for multi-selections.
    pub fn change_fields_from_ui(&mut self, fields: &[FieldHandle], value: UiValue) -> CommandResult {
        let mut cmds: Vec<Box<dyn PdmCommand>> = Vec::with_capacity(fields.len());
        for &field in fields {
            cmds.push(Box::new(FieldChangeCommand::for_field(
                &self.graph,
                self.root,
                field,
                value.clone(),
            )?));
        }
        match cmds.len() {
            0 => Ok(()),
            1 => self.execute(cmds.remove(0)),
            n => {
                let name = format!("Change {n} fields");
                self.execute_as_macro(name, cmds)
            }
        }
    }

    /// Add a new object of `class` to `field`. `index` of `None` appends.
    ///
    /// Returns the id of the added object.
    pub fn add_item(
        &mut self,
        field: FieldHandle,
        class: &str,
        index: Option<usize>,
    ) -> Result<ObjectId, CommandError> {
        self.add_from(field, ItemSource::Class(class.to_string()), index)
    }

    /// Add an object built from `source`.
    pub fn add_from(
        &mut self,
        field: FieldHandle,
        source: ItemSource,
        index: Option<usize>,
    ) -> Result<ObjectId, CommandError> {
        let path = reference_from_root_to_field(&self.graph, self.root, field)
            .ok_or_else(|| CommandError::StaleReference(field.to_string()))?;
        let at = index.unwrap_or_else(|| self.graph.child_count(field));
        self.execute(Box::new(AddItemCommand::new(path, source, index)))?;
        self.graph
            .child_objects(field)
            .get(at)
            .copied()
            .ok_or_else(|| CommandError::InvalidState(format!("no object at {field} index {at}")))
    }

    /// Delete a parented object below the root.
    pub fn delete_item(&mut self, object: ObjectId) -> CommandResult {
        let cmd = DeleteItemCommand::for_object(&self.graph, self.root, object)?;
        self.execute(Box::new(cmd))
    }

    /// Delete several objects as one undo entry.
    ///
    /// Deletions run deepest path first and, within one field, from the
    /// highest index down, so the stored paths stay valid.
    pub fn delete_items(&mut self, objects: &[ObjectId]) -> CommandResult {
        let mut cmds: Vec<(String, usize, DeleteItemCommand)> = Vec::new();
        for &object in objects {
            let cmd = DeleteItemCommand::for_object(&self.graph, self.root, object)?;
            cmds.push((cmd.field().to_string(), cmd.index(), cmd));
        }
        cmds.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
        cmds.dedup_by(|a, b| a.0 == b.0 && a.1 == b.1);
        let cmds: Vec<Box<dyn PdmCommand>> = cmds
            .into_iter()
            .map(|(_, _, cmd)| Box::new(cmd) as Box<dyn PdmCommand>)
            .collect();
        let name = format!("Delete {} items", cmds.len());
        self.execute_as_macro(name, cmds)
    }

    pub fn begin_macro(&mut self, name: impl Into<String>) {
        self.commands.begin_macro(name);
    }

    pub fn end_macro(&mut self) -> CommandResult {
        self.commands.end_macro()
    }

    /// Undo the newest entry; returns its description.
    pub fn undo(&mut self) -> Result<Option<String>, CommandError> {
        let (commands, mut cx) = self.split();
        commands.undo(&mut cx)
    }

    pub fn redo(&mut self) -> Result<Option<String>, CommandError> {
        let (commands, mut cx) = self.split();
        commands.redo(&mut cx)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.commands.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.commands.can_redo()
    }

    // ========================================================================
    // Selection
    // ========================================================================

    pub fn set_selected_items(
        &mut self,
        items: impl IntoIterator<Item = SelectionItem>,
        level: i32,
    ) {
        self.selection.set_selected_items(&self.graph, items, level);
    }

    #[must_use]
    pub fn selected_items(&self, level: i32) -> Vec<SelectionItem> {
        self.selection.selected_items(&self.graph, level)
    }

    pub fn clear_selection(&mut self, level: i32) {
        self.selection.clear(&self.graph, level);
    }
}
