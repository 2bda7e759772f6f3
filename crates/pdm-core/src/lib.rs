#![forbid(unsafe_code)]

//! Reflective object model for the PDM runtime.
//!
//! # Role
//! `pdm-core` holds the data side of the runtime: an arena of objects made
//! of keyword-addressed fields, capability facets that extend objects and
//! fields without the core depending on them, a text round trip for every
//! field kind, path references that survive unrelated edits, document files
//! and the UI-tree projection.
//!
//! # Primary responsibilities
//! - **Graph**: [`ObjectGraph`], [`ObjectFactory`], [`ObjectClass`].
//! - **Facets**: [`CapabilitySet`] with [`UiCapability`],
//!   [`SerializationCapability`] and [`ScriptingCapability`].
//! - **Round trip**: [`write_value`] / [`read_value`] and [`ObjectRecord`].
//! - **Addressing**: [`ObjectPath`], [`FieldPath`] and the `reference_*`
//!   functions.
//! - **Projection**: [`UiTreeOrdering`] and [`expand_ui_tree`].
//!
//! # How it fits
//! `pdm-runtime` builds commands, undo history and selection on top of this
//! crate; the `pdm` facade re-exports both.

pub mod app_enum;
pub mod capability;
pub mod class;
pub mod document;
pub mod error;
pub mod factory;
pub mod field;
pub mod graph;
pub mod io;
pub mod keyword;
pub mod object;
pub mod reference;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;
pub mod ui_tree;
pub mod value;

pub use app_enum::{EnumDef, EnumItem};
pub use capability::{
    Attachment, Capability, CapabilityKind, CapabilitySet, EditorHint, Facet, OptionItem,
    ScriptingCapability, SerializationCapability, UiCapability,
};
pub use class::{FieldSpec, ObjectClass, ObjectDefinition};
pub use document::{
    DOCUMENT_FORMAT, DOCUMENT_VERSION, DocumentFile, document_from_str, document_to_string,
    read_document, write_document,
};
pub use error::{PdmError, PdmResult};
pub use factory::ObjectFactory;
pub use field::{Field, FieldData, FieldHandle, FieldKind};
pub use graph::ObjectGraph;
pub use io::{
    FieldContent, FieldRecord, NULL_POINTER_TOKEN, ObjectRecord, copy_object, finish_read,
    read_object, read_value, setup_before_save, write_object, write_value,
};
pub use keyword::{UNDEFINED_KEYWORD, is_valid_keyword, to_script_keyword};
pub use object::{Object, ObjectId, ParentLink};
pub use reference::{
    FieldPath, ObjectPath, PathHop, field_from_reference, object_from_reference,
    reference_from_root_to_field, reference_from_root_to_object,
};
pub use ui_tree::{TreeItem, UiTreeOrdering, expand_ui_tree, refresh_ui_tree, ui_tree_ordering};
pub use value::{FieldValue, ParsedToken, ValueKind, parse_token};
