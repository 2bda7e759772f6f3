#![forbid(unsafe_code)]

//! Enumerations exposed to the UI and to persistence.
//!
//! An [`EnumDef`] lists the legal items of an enum field. Items persist by
//! their text and are presented by their UI text; the declaration order is
//! the option order offered to editors.

use crate::capability::OptionItem;
use crate::value::FieldValue;

/// One legal value of an [`EnumDef`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumItem {
    /// Persisted text.
    pub text: String,
    /// Presentation text.
    pub ui_text: String,
}

/// Definition of an application enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    name: String,
    items: Vec<EnumItem>,
    default_index: usize,
}

impl EnumDef {
    /// Create an empty definition named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
            default_index: 0,
        }
    }

    /// Append an item.
    #[must_use]
    pub fn item(mut self, text: impl Into<String>, ui_text: impl Into<String>) -> Self {
        self.items.push(EnumItem {
            text: text.into(),
            ui_text: ui_text.into(),
        });
        self
    }

    /// Make `text` the default item. Unknown text leaves the first item as default.
    #[must_use]
    pub fn with_default(mut self, text: &str) -> Self {
        if let Some(index) = self.index_of(text) {
            self.default_index = index;
        }
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn items(&self) -> &[EnumItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn index_of(&self, text: &str) -> Option<usize> {
        self.items.iter().position(|item| item.text == text)
    }

    #[must_use]
    pub fn contains(&self, text: &str) -> bool {
        self.index_of(text).is_some()
    }

    /// Text of the default item, or an empty string for an empty enum.
    #[must_use]
    pub fn default_text(&self) -> &str {
        self.items
            .get(self.default_index)
            .map_or("", |item| item.text.as_str())
    }

    #[must_use]
    pub fn ui_text(&self, text: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|item| item.text == text)
            .map(|item| item.ui_text.as_str())
    }

    /// Option list for combo-box style editors, in declaration order.
    #[must_use]
    pub fn options(&self) -> Vec<OptionItem> {
        self.items
            .iter()
            .map(|item| OptionItem::new(item.ui_text.clone(), FieldValue::Enum(item.text.clone())))
            .collect()
    }
}
