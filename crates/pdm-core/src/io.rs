#![forbid(unsafe_code)]

//! Field-value round trip and object records.
//!
//! [`write_value`] and [`read_value`] turn any field into a text token and
//! back. Value fields use the [`crate::value`] token form, pointer fields the
//! root-relative path of their target, and child fields a JSON list of
//! [`ObjectRecord`]s. Commands use the same tokens as undo snapshots.
//!
//! A pointer to the root itself is the empty path; a pointer with no target
//! is [`NULL_POINTER_TOKEN`], written as `null` inside records.
//!
//! # Invariants
//!
//! - `write_value(f)`, then `read_value(f, t)`, then `write_value(f)` yields
//!   `t` byte for byte.
//! - Reading never fails on content: unknown classes and keywords are
//!   skipped, unreadable values keep the prior value, and pointer paths that
//!   do not resolve stay pending.
//!
//! # Record layout
//!
//! ```text
//! {"class":"Item","fields":[
//!    {"keyword":"Label","content":{"value":"first"}},
//!    {"keyword":"Link","content":{"pointer":"Items 1"}},
//!    {"keyword":"Owner","content":{"pointer":null}},
//!    {"keyword":"Parts","content":{"children":[ ... ]}}]}
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PdmError, PdmResult};
use crate::field::{FieldData, FieldHandle, FieldKind};
use crate::graph::ObjectGraph;
use crate::object::ObjectId;
use crate::reference::reference_from_root_to_object;
use crate::value::parse_token;

/// Pointer token meaning "no target". Odd token count, so never a path.
pub const NULL_POINTER_TOKEN: &str = "null";

/// Serialized form of one object and everything it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub class: String,
    #[serde(default)]
    pub fields: Vec<FieldRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub keyword: String,
    pub content: FieldContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldContent {
    Value(String),
    /// Root-relative target path; `None` when the pointer is null.
    Pointer(Option<String>),
    Child(Option<Box<ObjectRecord>>),
    Children(Vec<ObjectRecord>),
}

impl ObjectRecord {
    /// Content stored for `keyword`, if any.
    #[must_use]
    pub fn content(&self, keyword: &str) -> Option<&FieldContent> {
        self.fields
            .iter()
            .find(|f| f.keyword == keyword)
            .map(|f| &f.content)
    }
}

// ============================================================================
// Writing
// ============================================================================

/// Capture `object` and its owned subtree.
pub fn write_object(graph: &ObjectGraph, object: ObjectId) -> PdmResult<ObjectRecord> {
    let obj = graph.object(object).ok_or(PdmError::StaleObject(object))?;
    let root = graph.root_of(object);
    let mut fields = Vec::with_capacity(obj.fields().len());

    for (index, field) in obj.fields().iter().enumerate() {
        if !field.is_writable() {
            continue;
        }
        let handle = FieldHandle::new(object, index);
        fields.push(FieldRecord {
            keyword: field.keyword().to_string(),
            content: write_content(graph, root, handle)?,
        });
    }

    Ok(ObjectRecord {
        class: obj.class_keyword().to_string(),
        fields,
    })
}

fn write_content(graph: &ObjectGraph, root: ObjectId, field: FieldHandle) -> PdmResult<FieldContent> {
    let data = graph.field(field).ok_or(PdmError::StaleField(field))?.data();
    Ok(match data {
        FieldData::Value { value, .. } => FieldContent::Value(value.to_token()),
        FieldData::Pointer { target, pending } => {
            FieldContent::Pointer(pointer_token(graph, root, *target, pending.as_deref()))
        }
        FieldData::Child(child) => FieldContent::Child(match child {
            Some(child) => Some(Box::new(write_object(graph, *child)?)),
            None => None,
        }),
        FieldData::ChildArray(children) => FieldContent::Children(
            children
                .iter()
                .map(|&child| write_object(graph, child))
                .collect::<PdmResult<Vec<_>>>()?,
        ),
    })
}

fn pointer_token(
    graph: &ObjectGraph,
    root: ObjectId,
    target: Option<ObjectId>,
    pending: Option<&str>,
) -> Option<String> {
    if let Some(pending) = pending {
        return Some(pending.to_string());
    }
    target
        .and_then(|t| reference_from_root_to_object(graph, root, t))
        .map(|path| path.to_string())
}

/// Portable token for the current content of `field`.
pub fn write_value(graph: &ObjectGraph, field: FieldHandle) -> PdmResult<String> {
    let root = graph.root_of(field.object);
    Ok(match write_content(graph, root, field)? {
        FieldContent::Value(token) | FieldContent::Pointer(Some(token)) => token,
        FieldContent::Pointer(None) => NULL_POINTER_TOKEN.to_string(),
        FieldContent::Child(child) => serde_json::to_string(&child)?,
        FieldContent::Children(children) => serde_json::to_string(&children)?,
    })
}

// ============================================================================
// Reading
// ============================================================================

/// Rebuild an object from `record`.
///
/// The new object is unparented. Pointer paths stay pending until
/// [`ObjectGraph::resolve_references`] runs against the final root; call
/// [`finish_read`] once the object is in place.
pub fn read_object(graph: &mut ObjectGraph, record: &ObjectRecord) -> PdmResult<ObjectId> {
    let id = graph.create(&record.class)?;
    for field_record in &record.fields {
        let Some(handle) = graph.field_by_any_keyword(id, &field_record.keyword) else {
            warn!(
                target: "pdm.io",
                class = %record.class,
                keyword = %field_record.keyword,
                "unknown field keyword skipped"
            );
            continue;
        };
        if !graph.field(handle).is_some_and(|f| f.is_readable()) {
            continue;
        }
        apply_content(graph, handle, &field_record.content)?;
    }
    Ok(id)
}

fn apply_content(graph: &mut ObjectGraph, field: FieldHandle, content: &FieldContent) -> PdmResult<()> {
    let kind = graph.field(field).ok_or(PdmError::StaleField(field))?.kind();
    match (kind, content) {
        (FieldKind::Value(value_kind), FieldContent::Value(token)) => {
            let parsed = parse_token(value_kind, token);
            if parsed.skipped > 0 {
                warn!(target: "pdm.io", %field, skipped = parsed.skipped, "unreadable tokens skipped");
            }
            if let Some(value) = parsed.value {
                if let Err(err) = graph.set_value(field, value) {
                    warn!(target: "pdm.io", %field, %err, "value kept");
                }
            }
        }
        (FieldKind::Pointer, FieldContent::Pointer(path)) => {
            if let Some(FieldData::Pointer { target, pending }) =
                graph.field_mut(field).map(|f| &mut f.data)
            {
                *target = None;
                pending.clone_from(path);
            }
        }
        (FieldKind::Child, FieldContent::Child(child)) => {
            let records: Vec<&ObjectRecord> = child.as_deref().into_iter().collect();
            replace_children(graph, field, &records)?;
        }
        (FieldKind::ChildArray, FieldContent::Children(children)) => {
            let records: Vec<&ObjectRecord> = children.iter().collect();
            replace_children(graph, field, &records)?;
        }
        (kind, _) => {
            warn!(target: "pdm.io", %field, kind = kind.name(), "content does not match field kind");
        }
    }
    Ok(())
}

fn replace_children(
    graph: &mut ObjectGraph,
    field: FieldHandle,
    records: &[&ObjectRecord],
) -> PdmResult<()> {
    graph.delete_all_children(field)?;
    for record in records {
        match read_object(graph, record) {
            Ok(child) => graph.insert_child(field, None, child)?,
            Err(PdmError::UnknownClass(class)) => {
                warn!(target: "pdm.io", %field, %class, "unknown class skipped");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

/// Replace the content of `field` with what `token` describes.
///
/// Objects created for child fields are finished in place: references are
/// resolved against the field's root and `init_after_read` hooks run.
pub fn read_value(graph: &mut ObjectGraph, field: FieldHandle, token: &str) -> PdmResult<()> {
    let kind = graph.field(field).ok_or(PdmError::StaleField(field))?.kind();
    let content = match kind {
        FieldKind::Value(_) => FieldContent::Value(token.to_string()),
        FieldKind::Pointer => FieldContent::Pointer(
            (token.trim() != NULL_POINTER_TOKEN).then(|| token.to_string()),
        ),
        FieldKind::Child => match serde_json::from_str::<Option<Box<ObjectRecord>>>(token) {
            Ok(child) => FieldContent::Child(child),
            Err(err) => {
                warn!(target: "pdm.io", %field, %err, "unreadable child token, value kept");
                return Ok(());
            }
        },
        FieldKind::ChildArray => match serde_json::from_str::<Vec<ObjectRecord>>(token) {
            Ok(children) => FieldContent::Children(children),
            Err(err) => {
                warn!(target: "pdm.io", %field, %err, "unreadable children token, value kept");
                return Ok(());
            }
        },
    };

    apply_content(graph, field, &content)?;

    let root = graph.root_of(field.object);
    match kind {
        FieldKind::Pointer => {
            graph.resolve_references(field.object, root);
        }
        FieldKind::Child | FieldKind::ChildArray => {
            for child in graph.child_objects(field) {
                finish_read(graph, child, root);
            }
        }
        FieldKind::Value(_) => {}
    }
    Ok(())
}

/// Resolve references below `object` against `root`, then run
/// `init_after_read` hooks children first.
pub fn finish_read(graph: &mut ObjectGraph, object: ObjectId, root: ObjectId) {
    let unresolved = graph.resolve_references(object, root);
    if unresolved > 0 {
        debug!(target: "pdm.io", %object, unresolved, "references left pending");
    }
    for id in graph.descendants(object).into_iter().rev() {
        if let Some(class) = graph.class_of(id) {
            class.init_after_read(graph, id);
        }
    }
}

/// Run `setup_before_save` hooks on `object` and its subtree, parents first.
pub fn setup_before_save(graph: &mut ObjectGraph, object: ObjectId) {
    for id in graph.descendants(object) {
        if let Some(class) = graph.class_of(id) {
            class.setup_before_save(graph, id);
        }
    }
}

/// Deep copy of `object`, unparented, with references resolved against the
/// source's root.
pub fn copy_object(graph: &mut ObjectGraph, object: ObjectId) -> PdmResult<ObjectId> {
    let record = write_object(graph, object)?;
    let root = graph.root_of(object);
    let copy = read_object(graph, &record)?;
    finish_read(graph, copy, root);
    Ok(copy)
}
