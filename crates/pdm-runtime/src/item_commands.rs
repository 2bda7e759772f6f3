#![forbid(unsafe_code)]

//! Adding and deleting objects in child fields.
//!
//! Both commands keep the full [`ObjectRecord`] of the object they move, so
//! undoing a delete rebuilds the subtree with every field restored. Rebuilt
//! objects go through [`finish_read`] before anything else sees them.
//!
//! # Structural change order
//!
//! ```text
//! removal:  evict from selection ─▶ erase from field ─▶ destroy
//!               ─▶ child_removed on owner and each ancestor (nearest first)
//!               ─▶ ObjectRemoved
//! addition: insert into field ─▶ finish_read
//!               ─▶ child_added on owner and each ancestor (nearest first)
//!               ─▶ ObjectAdded
//! ```

use pdm_core::{
    FieldHandle, FieldPath, ObjectGraph, ObjectId, ObjectPath, ObjectRecord, field_from_reference,
    finish_read, object_from_reference, read_object, reference_from_root_to_field,
    reference_from_root_to_object, write_object,
};
use tracing::{debug_span, warn};

use crate::command::{
    CommandContext, CommandError, CommandKind, CommandMetadata, CommandResult, PdmCommand, stale,
};
use crate::notification::PdmEvent;

/// What a new object is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemSource {
    /// A fresh object of this class keyword.
    Class(String),
    /// A copy of a previously written object.
    Record(ObjectRecord),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Structure {
    Added,
    Removed,
}

/// Tell the owner of `field` and every ancestor, nearest first, that an
/// object entered or left it.
fn notify_upwards(graph: &mut ObjectGraph, field: FieldHandle, change: Structure) {
    let mut chain = vec![field.object];
    chain.extend(graph.ancestors(field.object));
    for id in chain {
        let Some(class) = graph.class_of(id) else {
            continue;
        };
        match change {
            Structure::Added => class.child_added(graph, id, field),
            Structure::Removed => class.child_removed(graph, id, field),
        }
    }
}

/// Remove `object` from `field` and destroy it.
fn remove_object(cx: &mut CommandContext<'_>, field: FieldHandle, object: ObjectId) -> CommandResult {
    cx.selection
        .remove_object_from_all_selections(cx.graph, object);
    let index = cx
        .graph
        .index_in_parent(object)
        .ok_or_else(|| CommandError::InvalidState(format!("{object} is not parented")))?;
    let removed = cx.graph.erase_child(field, index)?;
    cx.graph.destroy(removed)?;
    notify_upwards(cx.graph, field, Structure::Removed);
    cx.notifications.notify(&PdmEvent::ObjectRemoved {
        parent: field,
        object,
    });
    Ok(())
}

/// Rebuild `record`, place it at `index` (clamped to the end) and finish it.
fn restore_object(
    cx: &mut CommandContext<'_>,
    field: FieldHandle,
    index: usize,
    record: &ObjectRecord,
) -> Result<ObjectId, CommandError> {
    let object = read_object(cx.graph, record)?;
    let index = index.min(cx.graph.child_count(field));
    if let Err(err) = cx.graph.insert_child(field, Some(index), object) {
        cx.graph.destroy(object)?;
        return Err(err.into());
    }
    finish_read(cx.graph, object, cx.root);
    notify_upwards(cx.graph, field, Structure::Added);
    cx.notifications.notify(&PdmEvent::ObjectAdded {
        parent: field,
        object,
    });
    Ok(object)
}

// ============================================================================
// AddItemCommand
// ============================================================================

/// Adds one object to a child or child-array field.
#[derive(Debug)]
pub struct AddItemCommand {
    field: FieldPath,
    source: ItemSource,
    index: Option<usize>,
    placed_at: Option<usize>,
    record: Option<ObjectRecord>,
    metadata: CommandMetadata,
}

impl AddItemCommand {
    /// Append or insert a new object. `index` of `None` appends.
    #[must_use]
    pub fn new(field: FieldPath, source: ItemSource, index: Option<usize>) -> Self {
        let what = match &source {
            ItemSource::Class(class) => class.clone(),
            ItemSource::Record(record) => record.class.clone(),
        };
        Self {
            metadata: CommandMetadata::new(format!("Add {what}")),
            field,
            source,
            index,
            placed_at: None,
            record: None,
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: CommandMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use]
    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    /// Index the object landed at, once executed.
    #[must_use]
    pub fn placed_at(&self) -> Option<usize> {
        self.placed_at
    }

    fn execute_first(&mut self, cx: &mut CommandContext<'_>, field: FieldHandle) -> CommandResult {
        let object = match &self.source {
            ItemSource::Class(class) => cx.graph.create(class)?,
            ItemSource::Record(record) => read_object(cx.graph, record)?,
        };
        if let Err(err) = cx.graph.insert_child(field, self.index, object) {
            cx.graph.destroy(object)?;
            return Err(err.into());
        }
        finish_read(cx.graph, object, cx.root);
        notify_upwards(cx.graph, field, Structure::Added);

        self.record = Some(write_object(cx.graph, object)?);
        self.placed_at = cx.graph.index_in_parent(object);
        cx.notifications.notify(&PdmEvent::ObjectAdded {
            parent: field,
            object,
        });
        Ok(())
    }
}

impl PdmCommand for AddItemCommand {
    fn redo(&mut self, cx: &mut CommandContext<'_>) -> CommandResult {
        let path = self.field.to_string();
        let _span = debug_span!(target: "pdm.command", "add_item", %path).entered();
        let Some(field) = field_from_reference(cx.graph, cx.root, &self.field) else {
            return stale(self.record.is_some(), "field", &path);
        };
        match (&self.record, self.placed_at) {
            (Some(record), Some(index)) => {
                let record = record.clone();
                restore_object(cx, field, index, &record).map(drop)
            }
            _ => self.execute_first(cx, field),
        }
    }

    fn undo(&mut self, cx: &mut CommandContext<'_>) -> CommandResult {
        let Some(index) = self.placed_at else {
            return Ok(());
        };
        let path = self.field.to_string();
        let _span = debug_span!(target: "pdm.command", "add_item_undo", %path).entered();
        let Some(field) = field_from_reference(cx.graph, cx.root, &self.field) else {
            return stale(true, "field", &path);
        };
        let Some(object) = cx.graph.child_objects(field).get(index).copied() else {
            return stale(true, "item", &format!("{path} {index}"));
        };
        remove_object(cx, field, object)
    }

    fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }

    fn kind(&self) -> CommandKind {
        CommandKind::AddItem
    }

    fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.metadata.size_bytes() + record_size(self.record.as_ref())
    }

    fn debug_name(&self) -> &'static str {
        "AddItemCommand"
    }
}

fn record_size(record: Option<&ObjectRecord>) -> usize {
    record
        .and_then(|r| serde_json::to_string(r).ok())
        .map_or(0, |text| text.len())
}

// ============================================================================
// DeleteItemCommand
// ============================================================================

/// Deletes the object at one index of a child field.
///
/// Pointer fields elsewhere under the root that targeted the deleted subtree
/// are remembered and pointed back at it on undo.
#[derive(Debug)]
pub struct DeleteItemCommand {
    field: FieldPath,
    index: usize,
    record: Option<ObjectRecord>,
    referrers: Vec<(FieldPath, ObjectPath)>,
    metadata: CommandMetadata,
}

impl DeleteItemCommand {
    #[must_use]
    pub fn new(field: FieldPath, index: usize) -> Self {
        let metadata = CommandMetadata::new(format!("Delete {} {index}", field.keyword));
        Self {
            field,
            index,
            record: None,
            referrers: Vec::new(),
            metadata,
        }
    }

    /// Command deleting a live, parented `object` below `root`.
    pub fn for_object(
        graph: &ObjectGraph,
        root: ObjectId,
        object: ObjectId,
    ) -> Result<Self, CommandError> {
        let field = graph
            .parent_field(object)
            .ok_or_else(|| CommandError::InvalidState(format!("{object} has no parent")))?;
        let index = graph
            .index_in_parent(object)
            .ok_or_else(|| CommandError::InvalidState(format!("{object} has no parent")))?;
        let path = reference_from_root_to_field(graph, root, field)
            .ok_or_else(|| CommandError::StaleReference(object.to_string()))?;
        let mut command = Self::new(path, index);
        if let Some(obj) = graph.object(object) {
            command.metadata.description = format!("Delete {}", obj.ui_name());
        }
        Ok(command)
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: CommandMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use]
    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Record of the deleted object, once executed.
    #[must_use]
    pub fn record(&self) -> Option<&ObjectRecord> {
        self.record.as_ref()
    }

    fn capture(&mut self, cx: &CommandContext<'_>, object: ObjectId) -> CommandResult {
        self.record = Some(write_object(cx.graph, object)?);
        self.referrers = cx
            .graph
            .pointers_into(cx.root, object)
            .into_iter()
            .filter_map(|handle| {
                let target = cx.graph.pointer(handle)?;
                Some((
                    reference_from_root_to_field(cx.graph, cx.root, handle)?,
                    reference_from_root_to_object(cx.graph, cx.root, target)?,
                ))
            })
            .collect();
        Ok(())
    }

    fn restore_referrers(&self, cx: &mut CommandContext<'_>) {
        for (field_path, target_path) in &self.referrers {
            let field = field_from_reference(cx.graph, cx.root, field_path);
            let target = object_from_reference(cx.graph, cx.root, target_path);
            let (Some(field), Some(target)) = (field, target) else {
                warn!(target: "pdm.command", field = %field_path, "pointer not restored");
                continue;
            };
            if let Err(err) = cx.graph.set_pointer(field, Some(target)) {
                warn!(target: "pdm.command", field = %field_path, %err, "pointer not restored");
            }
        }
    }
}

impl PdmCommand for DeleteItemCommand {
    fn redo(&mut self, cx: &mut CommandContext<'_>) -> CommandResult {
        let path = self.field.to_string();
        let _span =
            debug_span!(target: "pdm.command", "delete_item", %path, index = self.index).entered();
        let executed = self.record.is_some();
        let Some(field) = field_from_reference(cx.graph, cx.root, &self.field) else {
            return stale(executed, "field", &path);
        };
        let Some(object) = cx.graph.child_objects(field).get(self.index).copied() else {
            return stale(executed, "item", &format!("{path} {}", self.index));
        };
        if !executed {
            self.capture(cx, object)?;
        }
        remove_object(cx, field, object)
    }

    fn undo(&mut self, cx: &mut CommandContext<'_>) -> CommandResult {
        let Some(record) = self.record.clone() else {
            return Ok(());
        };
        let path = self.field.to_string();
        let _span =
            debug_span!(target: "pdm.command", "delete_item_undo", %path, index = self.index)
                .entered();
        let Some(field) = field_from_reference(cx.graph, cx.root, &self.field) else {
            return stale(true, "field", &path);
        };
        restore_object(cx, field, self.index, &record)?;
        self.restore_referrers(cx);
        Ok(())
    }

    fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }

    fn kind(&self) -> CommandKind {
        CommandKind::DeleteItem
    }

    fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.metadata.size_bytes()
            + record_size(self.record.as_ref())
            + self
                .referrers
                .iter()
                .map(|(f, o)| f.to_string().len() + o.to_string().len())
                .sum::<usize>()
    }

    fn debug_name(&self) -> &'static str {
        "DeleteItemCommand"
    }
}
