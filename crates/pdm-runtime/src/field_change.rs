#![forbid(unsafe_code)]

//! Undoable change of one field's content.
//!
//! The first redo resolves the requested UI value, snapshots the field,
//! applies the value and snapshots again. Later redo and undo steps only
//! replay the two snapshots, so the command restores exactly what was
//! there, whatever the field kind.
//!
//! ```text
//! redo #1:  resolve UiValue ─▶ before = write_value ─▶ apply ─▶ after = write_value
//! undo:     read_value(before)
//! redo #n:  read_value(after)
//! ```

use pdm_core::{
    EnumDef, FieldHandle, FieldPath, FieldValue, ObjectGraph, ObjectId, OptionItem, UiCapability,
    field_from_reference, read_value, reference_from_root_to_field, write_value,
};
use tracing::debug_span;

use crate::command::{
    CommandContext, CommandError, CommandKind, CommandMetadata, CommandResult, PdmCommand, stale,
};
use crate::notification::PdmEvent;

/// A new field value as an editor produces it.
#[derive(Debug, Clone, PartialEq)]
pub enum UiValue {
    /// A typed value, applied as is.
    Value(FieldValue),
    /// Position in the field's option list (combo boxes).
    OptionIndex(usize),
    /// A raw round-trip token; works for every field kind.
    Token(String),
}

impl UiValue {
    #[must_use]
    pub fn value(value: impl Into<FieldValue>) -> Self {
        Self::Value(value.into())
    }

    #[must_use]
    pub fn token(token: impl Into<String>) -> Self {
        Self::Token(token.into())
    }
}

impl From<FieldValue> for UiValue {
    fn from(value: FieldValue) -> Self {
        Self::Value(value)
    }
}

/// Options an editor offers for `field`.
///
/// Served from the field's UI option cache. An empty cache is filled from
/// the owning class's `calculate_value_options` hook, falling back to the
/// field's enum definition.
pub fn value_options(graph: &mut ObjectGraph, field: FieldHandle) -> Vec<OptionItem> {
    let cached = graph
        .field(field)
        .and_then(|f| f.ui())
        .map(|ui| ui.option_cache().to_vec())
        .unwrap_or_default();
    if !cached.is_empty() {
        return cached;
    }

    let computed = graph
        .class_of(field.object)
        .and_then(|class| class.calculate_value_options(graph, field.object, field))
        .or_else(|| graph.field(field).and_then(|f| f.enum_def()).map(EnumDef::options))
        .unwrap_or_default();
    if let Some(ui) = graph
        .field_mut(field)
        .and_then(|f| f.capability_mut::<UiCapability>())
    {
        ui.set_option_cache(computed.clone());
    }
    computed
}

enum Resolved {
    Value(FieldValue),
    Token(String),
}

fn resolve_ui_value(
    graph: &mut ObjectGraph,
    field: FieldHandle,
    value: &UiValue,
) -> Result<Resolved, CommandError> {
    Ok(match value {
        UiValue::Value(v) => Resolved::Value(v.clone()),
        UiValue::Token(t) => Resolved::Token(t.clone()),
        UiValue::OptionIndex(index) => {
            let options = value_options(graph, field);
            let len = options.len();
            let option = options
                .into_iter()
                .nth(*index)
                .ok_or(CommandError::OptionOutOfRange { index: *index, len })?;
            Resolved::Value(option.value)
        }
    })
}

/// Changes one field, addressed by path from the context root.
#[derive(Debug)]
pub struct FieldChangeCommand {
    path: FieldPath,
    new_value: UiValue,
    before: Option<String>,
    after: Option<String>,
    metadata: CommandMetadata,
}

impl FieldChangeCommand {
    #[must_use]
    pub fn new(path: FieldPath, value: impl Into<UiValue>) -> Self {
        let metadata = CommandMetadata::new(format!("Change {}", path.keyword));
        Self {
            path,
            new_value: value.into(),
            before: None,
            after: None,
            metadata,
        }
    }

    /// Command for a live field below `root`.
    pub fn for_field(
        graph: &ObjectGraph,
        root: ObjectId,
        field: FieldHandle,
        value: impl Into<UiValue>,
    ) -> Result<Self, CommandError> {
        let path = reference_from_root_to_field(graph, root, field)
            .ok_or_else(|| CommandError::StaleReference(field.to_string()))?;
        let mut command = Self::new(path, value);
        if let Some(f) = graph.field(field) {
            command.metadata.description = format!("Change {}", f.ui_name());
        }
        Ok(command)
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: CommandMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use]
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Token captured before the first redo.
    #[must_use]
    pub fn before(&self) -> Option<&str> {
        self.before.as_deref()
    }

    /// Token captured after the first redo.
    #[must_use]
    pub fn after(&self) -> Option<&str> {
        self.after.as_deref()
    }

    fn resolve(&self, cx: &CommandContext<'_>) -> Option<FieldHandle> {
        field_from_reference(cx.graph, cx.root, &self.path)
    }

    fn execute_first(&mut self, cx: &mut CommandContext<'_>, field: FieldHandle) -> CommandResult {
        let value = resolve_ui_value(cx.graph, field, &self.new_value)?;
        let before = write_value(cx.graph, field)?;
        match value {
            Resolved::Value(v) => cx.graph.set_value(field, v)?,
            Resolved::Token(t) => read_value(cx.graph, field, &t)?,
        }
        let after = write_value(cx.graph, field)?;
        announce(cx, field, &before, &after);
        self.before = Some(before);
        self.after = Some(after);
        Ok(())
    }
}

/// Run the owner's UI-change hook and publish the change.
fn announce(cx: &mut CommandContext<'_>, field: FieldHandle, old: &str, new: &str) {
    if let Some(class) = cx.graph.class_of(field.object) {
        class.field_changed_by_ui(cx.graph, field.object, field, old, new);
    }
    cx.notifications.notify(&PdmEvent::FieldChanged {
        field,
        old: old.to_string(),
        new: new.to_string(),
    });
}

impl PdmCommand for FieldChangeCommand {
    fn redo(&mut self, cx: &mut CommandContext<'_>) -> CommandResult {
        let path = self.path.to_string();
        let _span = debug_span!(target: "pdm.command", "field_change", %path).entered();
        let Some(field) = self.resolve(cx) else {
            return stale(self.after.is_some(), "field", &path);
        };

        match (&self.before, &self.after) {
            (Some(before), Some(after)) => {
                let (before, after) = (before.clone(), after.clone());
                read_value(cx.graph, field, &after)?;
                announce(cx, field, &before, &after);
                Ok(())
            }
            _ => self.execute_first(cx, field),
        }
    }

    fn undo(&mut self, cx: &mut CommandContext<'_>) -> CommandResult {
        let (Some(before), Some(after)) = (self.before.clone(), self.after.clone()) else {
            return Ok(());
        };
        let path = self.path.to_string();
        let _span = debug_span!(target: "pdm.command", "field_change_undo", %path).entered();
        let Some(field) = self.resolve(cx) else {
            return stale(true, "field", &path);
        };
        read_value(cx.graph, field, &before)?;
        announce(cx, field, &after, &before);
        Ok(())
    }

    fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }

    fn kind(&self) -> CommandKind {
        CommandKind::FieldChange
    }

    fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.metadata.size_bytes()
            + self.path.to_string().len()
            + self.before.as_ref().map_or(0, String::len)
            + self.after.as_ref().map_or(0, String::len)
    }

    fn debug_name(&self) -> &'static str {
        "FieldChangeCommand"
    }
}
