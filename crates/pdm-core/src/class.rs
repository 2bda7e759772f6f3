#![forbid(unsafe_code)]

//! Class declarations.
//!
//! A class is a value implementing [`ObjectClass`]. Its [`ObjectClass::define`]
//! fills an [`ObjectDefinition`] with object-level metadata and an ordered
//! list of [`FieldSpec`]s; the graph turns that into a live object. Derived
//! classes call the base class `define` first and then
//! [`ObjectDefinition::begin_class`] with their own keyword, so every field
//! records the class that declared it.
//!
//! ```
//! use pdm_core::{FieldSpec, ObjectClass, ObjectDefinition};
//!
//! struct Well;
//!
//! impl ObjectClass for Well {
//!     fn keyword(&self) -> &str {
//!         "Well"
//!     }
//!
//!     fn define(&self, def: &mut ObjectDefinition) {
//!         def.begin_class("Well");
//!         def.ui("Well");
//!         def.field(FieldSpec::value("Name", "").ui_name("Name"));
//!         def.field(FieldSpec::value("Depth", 0.0).tooltip("Measured depth"));
//!     }
//! }
//! ```

use std::sync::Arc;

use crate::app_enum::EnumDef;
use crate::capability::{
    EditorHint, OptionItem, ScriptingCapability, SerializationCapability, UiCapability,
};
use crate::field::{Field, FieldData, FieldHandle};
use crate::graph::ObjectGraph;
use crate::object::ObjectId;
use crate::ui_tree::UiTreeOrdering;
use crate::value::FieldValue;

/// Behaviour shared by every object of one class.
///
/// All hooks default to doing nothing.
pub trait ObjectClass: Send + Sync + 'static {
    /// Class keyword; also the persisted element name.
    fn keyword(&self) -> &str;

    /// Declare fields and object metadata.
    fn define(&self, def: &mut ObjectDefinition);

    /// Runs post-order after a subtree was read and its references resolved.
    fn init_after_read(&self, _graph: &mut ObjectGraph, _this: ObjectId) {}

    /// Runs pre-order before the object is written to a document.
    fn setup_before_save(&self, _graph: &mut ObjectGraph, _this: ObjectId) {}

    /// A field of this object was changed through the UI. `old` and `new`
    /// are value tokens.
    fn field_changed_by_ui(
        &self,
        _graph: &mut ObjectGraph,
        _this: ObjectId,
        _field: FieldHandle,
        _old: &str,
        _new: &str,
    ) {
    }

    /// An object was added to `into_field` somewhere below this object.
    fn child_added(&self, _graph: &mut ObjectGraph, _this: ObjectId, _into_field: FieldHandle) {}

    /// An object was removed from `from_field` somewhere below this object.
    fn child_removed(&self, _graph: &mut ObjectGraph, _this: ObjectId, _from_field: FieldHandle) {}

    /// Place children of this object in a tree projection. Anything left out
    /// is appended afterwards unless the ordering opts out.
    fn define_ui_tree_ordering(
        &self,
        _graph: &ObjectGraph,
        _this: ObjectId,
        _ordering: &mut UiTreeOrdering,
    ) {
    }

    /// Options offered by a combo-box editor for `field`.
    fn calculate_value_options(
        &self,
        _graph: &ObjectGraph,
        _this: ObjectId,
        _field: FieldHandle,
    ) -> Option<Vec<OptionItem>> {
        None
    }
}

// ============================================================================
// ObjectDefinition
// ============================================================================

/// Builder filled by [`ObjectClass::define`].
#[derive(Debug, Default)]
pub struct ObjectDefinition {
    chain: Vec<String>,
    ui: Option<UiCapability>,
    fields: Vec<FieldSpec>,
}

impl ObjectDefinition {
    /// Start declaring the fields of class `keyword`.
    pub fn begin_class(&mut self, keyword: impl Into<String>) {
        self.chain.push(keyword.into());
    }

    /// Object-level presentation facet, created on first use.
    pub fn ui(&mut self, ui_name: impl Into<String>) -> &mut UiCapability {
        let ui = self.ui.get_or_insert_with(UiCapability::default);
        ui.set_ui_name(ui_name);
        ui
    }

    /// Append a field declared by the current class.
    pub fn field(&mut self, mut spec: FieldSpec) {
        if spec.owner_class.is_empty() {
            spec.owner_class = self.chain.last().cloned().unwrap_or_default();
        }
        self.fields.push(spec);
    }

    #[must_use]
    pub fn class_chain(&self) -> &[String] {
        &self.chain
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Close the definition for a class with keyword `concrete`.
    pub(crate) fn finish(
        mut self,
        concrete: &str,
    ) -> (Vec<String>, Option<UiCapability>, Vec<FieldSpec>) {
        if self.chain.last().map(String::as_str) != Some(concrete) {
            self.chain.push(concrete.to_string());
        }
        for spec in &mut self.fields {
            if spec.owner_class.is_empty() {
                spec.owner_class = concrete.to_string();
            }
        }
        (self.chain, self.ui, self.fields)
    }
}

// ============================================================================
// FieldSpec
// ============================================================================

#[derive(Debug, Clone)]
enum SpecKind {
    Value {
        default: FieldValue,
        enum_def: Option<Arc<EnumDef>>,
    },
    Child,
    ChildArray,
    Pointer,
}

/// Declaration of one field.
///
/// Fields get a presentation facet named after the keyword and a
/// persistence facet unless told otherwise.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    keyword: String,
    aliases: Vec<String>,
    owner_class: String,
    kind: SpecKind,
    ui: Option<UiCapability>,
    serialization: Option<SerializationCapability>,
    scripting: Option<ScriptingCapability>,
    default_object: Option<String>,
}

impl FieldSpec {
    fn base(keyword: String, kind: SpecKind) -> Self {
        Self {
            ui: Some(UiCapability::new(keyword.clone())),
            keyword,
            aliases: Vec::new(),
            owner_class: String::new(),
            kind,
            serialization: Some(SerializationCapability::default()),
            scripting: None,
            default_object: None,
        }
    }

    /// A value field with a default.
    #[must_use]
    pub fn value(keyword: impl Into<String>, default: impl Into<FieldValue>) -> Self {
        Self::base(
            keyword.into(),
            SpecKind::Value {
                default: default.into(),
                enum_def: None,
            },
        )
    }

    /// An enum field defaulting to the enum's default item.
    #[must_use]
    pub fn enumeration(keyword: impl Into<String>, def: Arc<EnumDef>) -> Self {
        let default = FieldValue::Enum(def.default_text().to_string());
        Self::base(
            keyword.into(),
            SpecKind::Value {
                default,
                enum_def: Some(def),
            },
        )
        .editor(EditorHint::ComboBox)
    }

    #[must_use]
    pub fn child(keyword: impl Into<String>) -> Self {
        Self::base(keyword.into(), SpecKind::Child)
    }

    #[must_use]
    pub fn child_array(keyword: impl Into<String>) -> Self {
        Self::base(keyword.into(), SpecKind::ChildArray)
    }

    #[must_use]
    pub fn pointer(keyword: impl Into<String>) -> Self {
        Self::base(keyword.into(), SpecKind::Pointer)
    }

    #[must_use]
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    fn ui_mut(&mut self) -> &mut UiCapability {
        self.ui
            .get_or_insert_with(|| UiCapability::new(self.keyword.clone()))
    }

    #[must_use]
    pub fn ui_name(mut self, name: impl Into<String>) -> Self {
        self.ui_mut().set_ui_name(name);
        self
    }

    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.ui_mut().set_icon(icon);
        self
    }

    #[must_use]
    pub fn tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.ui_mut().set_tooltip(tooltip);
        self
    }

    #[must_use]
    pub fn whats_this(mut self, text: impl Into<String>) -> Self {
        self.ui_mut().set_whats_this(text);
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.ui_mut().set_hidden(true);
        self
    }

    #[must_use]
    pub fn tree_hidden(mut self) -> Self {
        self.ui_mut().set_tree_hidden(true);
        self
    }

    #[must_use]
    pub fn tree_children_hidden(mut self) -> Self {
        self.ui_mut().set_tree_children_hidden(true);
        self
    }

    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.ui_mut().set_read_only(true);
        self
    }

    #[must_use]
    pub fn editor(mut self, hint: EditorHint) -> Self {
        self.ui_mut().set_editor(hint);
        self
    }

    /// Accept `keyword` as an alias when reading older documents.
    #[must_use]
    pub fn deprecated_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.aliases.push(keyword.into());
        self
    }

    /// Expose the field to scripting under its snake_case keyword.
    #[must_use]
    pub fn scriptable(mut self) -> Self {
        self.scripting = Some(ScriptingCapability::for_field(&self.keyword));
        self
    }

    #[must_use]
    pub fn script_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.scripting = Some(ScriptingCapability::with_keyword(keyword));
        self
    }

    /// Drop the presentation facet; UI traversals will skip the field.
    #[must_use]
    pub fn without_ui(mut self) -> Self {
        self.ui = None;
        self
    }

    /// Keep the field out of documents.
    #[must_use]
    pub fn without_serialization(mut self) -> Self {
        self.serialization = None;
        self
    }

    /// Populate a child field with a fresh object of `class` on creation.
    #[must_use]
    pub fn default_object(mut self, class: impl Into<String>) -> Self {
        self.default_object = Some(class.into());
        self
    }

    pub(crate) fn owned_by(mut self, class: &str) -> Self {
        if self.owner_class.is_empty() {
            self.owner_class = class.to_string();
        }
        self
    }

    /// Build the live field, returning the class of its default child, if any.
    pub(crate) fn into_field(self) -> (Field, Option<String>) {
        let data = match self.kind {
            SpecKind::Value { default, enum_def } => FieldData::Value {
                value: default.clone(),
                default,
                enum_def,
            },
            SpecKind::Child => FieldData::Child(None),
            SpecKind::ChildArray => FieldData::ChildArray(Vec::new()),
            SpecKind::Pointer => FieldData::Pointer {
                target: None,
                pending: None,
            },
        };

        let mut field = Field::new(self.keyword, self.owner_class, data);
        field.aliases.extend(self.aliases);

        if let Some(mut ui) = self.ui {
            if let Some(scripting) = &self.scripting {
                let help = scripting.help_string(ui.tooltip());
                ui.set_tooltip(help);
            }
            field.capabilities.replace(ui.into());
        }
        if let Some(io) = self.serialization {
            field.capabilities.replace(io.into());
        }
        if let Some(scripting) = self.scripting {
            field.capabilities.replace(scripting.into());
        }

        (field, self.default_object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityKind;

    #[test]
    fn fields_are_tagged_with_declaring_class() {
        let mut def = ObjectDefinition::default();
        def.begin_class("Base");
        def.field(FieldSpec::value("A", 1));
        def.begin_class("Derived");
        def.field(FieldSpec::value("B", 2));

        let (chain, _, fields) = def.finish("Derived");
        assert_eq!(chain, ["Base", "Derived"]);
        assert_eq!(fields[0].owner_class, "Base");
        assert_eq!(fields[1].owner_class, "Derived");
    }

    #[test]
    fn finish_appends_missing_concrete_class() {
        let mut def = ObjectDefinition::default();
        def.field(FieldSpec::value("A", 1));
        let (chain, _, fields) = def.finish("Plain");
        assert_eq!(chain, ["Plain"]);
        assert_eq!(fields[0].owner_class, "Plain");
    }

    #[test]
    fn default_facets() {
        let (field, default_object) = FieldSpec::value("Count", 0).into_field();
        let kinds: Vec<_> = field.capabilities().iter().map(|a| a.kind()).collect();
        assert_eq!(kinds, [CapabilityKind::Ui, CapabilityKind::Serialization]);
        assert_eq!(field.ui_name(), "Count");
        assert!(default_object.is_none());
    }

    #[test]
    fn bookkeeping_field_has_no_ui() {
        let (field, _) = FieldSpec::value("Cache", 0)
            .without_ui()
            .without_serialization()
            .into_field();
        assert!(field.ui().is_none());
        assert!(!field.is_writable());
        assert!(field.capabilities().is_empty());
    }

    #[test]
    fn scriptable_field_extends_tooltip() {
        let (field, _) = FieldSpec::value("UserDescription", "")
            .tooltip("Free text")
            .scriptable()
            .into_field();
        let scripting = field.capability::<ScriptingCapability>().unwrap();
        assert_eq!(scripting.script_keyword(), "user_description");
        assert_eq!(
            field.ui().unwrap().tooltip(),
            "Free text. Available to scripts as the attribute 'user_description'"
        );
    }

    #[test]
    fn enum_spec_defaults_to_enum_default() {
        let def = Arc::new(EnumDef::new("E").item("A", "a").item("B", "b").with_default("B"));
        let (field, _) = FieldSpec::enumeration("Kind", def).into_field();
        assert_eq!(field.value(), Some(&FieldValue::Enum("B".into())));
        assert_eq!(field.ui().unwrap().editor(), EditorHint::ComboBox);
    }
}
