#![forbid(unsafe_code)]

//! Presentation facet consumed by tree views and property editors.

use crate::value::FieldValue;

/// Editor family a property panel should use for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorHint {
    /// Pick from the value kind.
    #[default]
    Auto,
    LineEdit,
    CheckBox,
    ComboBox,
    TextArea,
    ListEditor,
}

/// One entry of a field's option list.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionItem {
    pub ui_text: String,
    pub value: FieldValue,
    pub icon: Option<String>,
}

impl OptionItem {
    #[must_use]
    pub fn new(ui_text: impl Into<String>, value: FieldValue) -> Self {
        Self {
            ui_text: ui_text.into(),
            value,
            icon: None,
        }
    }

    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// Presentation metadata for an object or a field.
///
/// `hidden` hides the host everywhere. `tree_hidden` hides it from tree
/// projections only; `tree_children_hidden` keeps the host but hides what
/// it owns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UiCapability {
    ui_name: String,
    icon: Option<String>,
    tooltip: String,
    whats_this: String,
    hidden: bool,
    tree_hidden: bool,
    tree_children_hidden: bool,
    read_only: bool,
    editor: EditorHint,
    option_cache: Vec<OptionItem>,
}

impl UiCapability {
    #[must_use]
    pub fn new(ui_name: impl Into<String>) -> Self {
        Self {
            ui_name: ui_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn ui_name(&self) -> &str {
        &self.ui_name
    }

    pub fn set_ui_name(&mut self, name: impl Into<String>) {
        self.ui_name = name.into();
    }

    #[must_use]
    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn set_icon(&mut self, icon: impl Into<String>) {
        self.icon = Some(icon.into());
    }

    #[must_use]
    pub fn tooltip(&self) -> &str {
        &self.tooltip
    }

    pub fn set_tooltip(&mut self, tooltip: impl Into<String>) {
        self.tooltip = tooltip.into();
    }

    #[must_use]
    pub fn whats_this(&self) -> &str {
        &self.whats_this
    }

    pub fn set_whats_this(&mut self, text: impl Into<String>) {
        self.whats_this = text.into();
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    /// Hidden from trees, either directly or because the host is hidden.
    #[must_use]
    pub fn is_tree_hidden(&self) -> bool {
        self.tree_hidden || self.hidden
    }

    pub fn set_tree_hidden(&mut self, hidden: bool) {
        self.tree_hidden = hidden;
    }

    #[must_use]
    pub fn is_tree_children_hidden(&self) -> bool {
        self.tree_children_hidden
    }

    pub fn set_tree_children_hidden(&mut self, hidden: bool) {
        self.tree_children_hidden = hidden;
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    #[must_use]
    pub fn editor(&self) -> EditorHint {
        self.editor
    }

    pub fn set_editor(&mut self, editor: EditorHint) {
        self.editor = editor;
    }

    /// Options last computed for an editor, in display order.
    #[must_use]
    pub fn option_cache(&self) -> &[OptionItem] {
        &self.option_cache
    }

    pub fn set_option_cache(&mut self, options: Vec<OptionItem>) {
        self.option_cache = options;
    }

    pub fn clear_option_cache(&mut self) {
        self.option_cache.clear();
    }
}
