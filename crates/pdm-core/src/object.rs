#![forbid(unsafe_code)]

//! Objects: graph nodes owning an ordered list of fields.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::capability::{CapabilitySet, Facet, UiCapability};
use crate::class::ObjectClass;
use crate::field::{Field, FieldHandle};

/// Generation-checked handle into an [`crate::ObjectGraph`].
///
/// A handle whose slot has been reused carries an older generation and no
/// longer resolves, which is how weak references are modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl ObjectId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Lookup-only link from a child to the field that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLink {
    pub object: ObjectId,
    pub field: usize,
}

impl ParentLink {
    #[must_use]
    pub const fn field_handle(self) -> FieldHandle {
        FieldHandle::new(self.object, self.field)
    }
}

/// A node of the data graph.
pub struct Object {
    pub(crate) id: ObjectId,
    pub(crate) class: Arc<dyn ObjectClass>,
    pub(crate) class_chain: SmallVec<[String; 2]>,
    pub(crate) fields: Vec<Field>,
    pub(crate) parent: Option<ParentLink>,
    pub(crate) capabilities: CapabilitySet,
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.id)
            .field("class", &self.class_keyword())
            .field("fields", &self.fields.len())
            .field("parent", &self.parent)
            .finish()
    }
}

impl Object {
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Keyword of the concrete class.
    #[must_use]
    pub fn class_keyword(&self) -> &str {
        self.class.keyword()
    }

    #[must_use]
    pub fn class(&self) -> &Arc<dyn ObjectClass> {
        &self.class
    }

    /// Class keywords from the base class to the concrete class.
    #[must_use]
    pub fn class_chain(&self) -> &[String] {
        &self.class_chain
    }

    /// Returns `true` if the object is of class `keyword` or derives from it.
    #[must_use]
    pub fn is_of_class(&self, keyword: &str) -> bool {
        self.class_chain.iter().any(|c| c == keyword)
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    #[must_use]
    pub fn field_index(&self, keyword: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.keyword == keyword)
    }

    /// Like [`Self::field_index`] but also matching deprecated aliases.
    #[must_use]
    pub fn field_index_any(&self, keyword: &str) -> Option<usize> {
        self.field_index(keyword)
            .or_else(|| self.fields.iter().position(|f| f.matches_keyword(keyword)))
    }

    #[must_use]
    pub fn parent(&self) -> Option<ParentLink> {
        self.parent
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

    #[must_use]
    pub fn ui(&self) -> Option<&UiCapability> {
        self.capability::<UiCapability>()
    }

    /// UI name, falling back to the class keyword.
    #[must_use]
    pub fn ui_name(&self) -> &str {
        self.ui()
            .map(UiCapability::ui_name)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.class_keyword())
    }
}
