#![forbid(unsafe_code)]

//! Fields: named, typed storage slots owned by one object.
//!
//! A field is addressed by [`FieldHandle`] (owning object + position in the
//! object's field list). Fields never move between objects, so a handle
//! stays valid for as long as its object is alive.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::app_enum::EnumDef;
use crate::capability::{CapabilitySet, Facet, SerializationCapability, UiCapability};
use crate::object::ObjectId;
use crate::value::{FieldValue, ValueKind};

/// Address of a field: the owning object and the field's position in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldHandle {
    pub object: ObjectId,
    pub index: usize,
}

impl FieldHandle {
    #[must_use]
    pub const fn new(object: ObjectId, index: usize) -> Self {
        Self { object, index }
    }
}

impl fmt::Display for FieldHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.object, self.index)
    }
}

/// Storage shape of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Value(ValueKind),
    /// Owns at most one object.
    Child,
    /// Owns an ordered list of objects.
    ChildArray,
    /// Non-owning link to an object elsewhere in the graph.
    Pointer,
}

impl FieldKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Value(_) => "value field",
            Self::Child => "child field",
            Self::ChildArray => "child array field",
            Self::Pointer => "pointer field",
        }
    }

    /// Returns `true` for fields that own objects.
    #[must_use]
    pub const fn owns_children(self) -> bool {
        matches!(self, Self::Child | Self::ChildArray)
    }
}

/// Field payload.
#[derive(Debug, Clone)]
pub enum FieldData {
    Value {
        value: FieldValue,
        default: FieldValue,
        enum_def: Option<Arc<EnumDef>>,
    },
    Child(Option<ObjectId>),
    ChildArray(Vec<ObjectId>),
    /// `pending` holds a path read from a document that has not been
    /// resolved against a root yet.
    Pointer {
        target: Option<ObjectId>,
        pending: Option<String>,
    },
}

impl FieldData {
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Value { value, .. } => FieldKind::Value(value.kind()),
            Self::Child(_) => FieldKind::Child,
            Self::ChildArray(_) => FieldKind::ChildArray,
            Self::Pointer { .. } => FieldKind::Pointer,
        }
    }
}

/// A named storage slot.
#[derive(Debug, Clone)]
pub struct Field {
    pub(crate) keyword: String,
    pub(crate) aliases: SmallVec<[String; 1]>,
    pub(crate) owner_class: String,
    pub(crate) data: FieldData,
    pub(crate) capabilities: CapabilitySet,
}

impl Field {
    pub(crate) fn new(keyword: String, owner_class: String, data: FieldData) -> Self {
        Self {
            keyword,
            aliases: SmallVec::new(),
            owner_class,
            data,
            capabilities: CapabilitySet::default(),
        }
    }

    #[must_use]
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Older keywords still accepted when reading documents.
    #[must_use]
    pub fn deprecated_keywords(&self) -> &[String] {
        &self.aliases
    }

    /// Matches the keyword or any deprecated alias.
    #[must_use]
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        self.keyword == keyword || self.aliases.iter().any(|a| a == keyword)
    }

    /// Keyword of the class that declared the field.
    #[must_use]
    pub fn owner_class(&self) -> &str {
        &self.owner_class
    }

    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.data.kind()
    }

    #[must_use]
    pub fn data(&self) -> &FieldData {
        &self.data
    }

    #[must_use]
    pub fn value(&self) -> Option<&FieldValue> {
        match &self.data {
            FieldData::Value { value, .. } => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn default_value(&self) -> Option<&FieldValue> {
        match &self.data {
            FieldData::Value { default, .. } => Some(default),
            _ => None,
        }
    }

    #[must_use]
    pub fn enum_def(&self) -> Option<&EnumDef> {
        match &self.data {
            FieldData::Value { enum_def, .. } => enum_def.as_deref(),
            _ => None,
        }
    }

    /// Owned objects in order. Empty for value and pointer fields.
    #[must_use]
    pub fn children(&self) -> &[ObjectId] {
        match &self.data {
            FieldData::Child(child) => child.as_slice(),
            FieldData::ChildArray(children) => children,
            _ => &[],
        }
    }

    #[must_use]
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn capabilities_mut(&mut self) -> &mut CapabilitySet {
        &mut self.capabilities
    }

    #[must_use]
    pub fn capability<F: Facet>(&self) -> Option<&F> {
        self.capabilities.get::<F>()
    }

    pub fn capability_mut<F: Facet>(&mut self) -> Option<&mut F> {
        self.capabilities.get_mut::<F>()
    }

    /// The presentation facet, if the field is visible to UI traversals at all.
    #[must_use]
    pub fn ui(&self) -> Option<&UiCapability> {
        self.capability::<UiCapability>()
    }

    /// UI name, falling back to the keyword.
    #[must_use]
    pub fn ui_name(&self) -> &str {
        self.ui()
            .map(UiCapability::ui_name)
            .filter(|name| !name.is_empty())
            .unwrap_or(self.keyword.as_str())
    }

    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.capability::<SerializationCapability>()
            .is_some_and(|io| io.writable)
    }

    #[must_use]
    pub fn is_readable(&self) -> bool {
        self.capability::<SerializationCapability>()
            .is_some_and(|io| io.readable)
    }
}
