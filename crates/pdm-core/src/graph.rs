#![forbid(unsafe_code)]

//! Arena-backed object graph.
//!
//! # Design
//!
//! Objects live in slots addressed by [`ObjectId`]. Releasing a slot bumps
//! its generation, so every outstanding id for the old object stops
//! resolving instead of aliasing whatever reuses the slot.
//!
//! ```text
//!  root ──Items──▶ [A, B]          slots: 0 root  1 A  2 B  3 C
//!          │
//!          └─Settings─▶ C          parent links: A→(root,Items) ...
//! ```
//!
//! Ownership flows down through child and child-array fields; the parent
//! link stored on each object is lookup only.
//!
//! # Invariants
//!
//! 1. Every live object is owned by at most one field, and that field's
//!    owner is the object's recorded parent.
//! 2. Child fields only reference live objects. [`ObjectGraph::destroy`]
//!    detaches before releasing and releases the whole owned subtree.
//! 3. The graph is a forest: inserting an object below itself fails.
//! 4. Field keywords are unique per object.
//!
//! # Failure Modes
//!
//! - **Stale id**: lookups return `None`; mutations return
//!   [`PdmError::StaleObject`] / [`PdmError::StaleField`].
//! - **Dangling pointer field**: pointer targets are checked for liveness on
//!   read, so a deleted target reads as `None`.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::capability::{ScriptingCapability, UiCapability};
use crate::class::{FieldSpec, ObjectClass, ObjectDefinition};
use crate::error::{PdmError, PdmResult};
use crate::factory::ObjectFactory;
use crate::field::{Field, FieldData, FieldHandle, FieldKind};
use crate::keyword::is_valid_keyword;
use crate::object::{Object, ObjectId, ParentLink};
use crate::reference::{ObjectPath, object_from_reference};
use crate::value::FieldValue;

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    object: Option<Object>,
}

/// Owner of every object and field.
#[derive(Debug)]
pub struct ObjectGraph {
    factory: ObjectFactory,
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl ObjectGraph {
    #[must_use]
    pub fn new(factory: ObjectFactory) -> Self {
        Self {
            factory,
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    #[must_use]
    pub fn factory(&self) -> &ObjectFactory {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut ObjectFactory {
        &mut self.factory
    }

    /// Number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    // ========================================================================
    // Objects
    // ========================================================================

    #[must_use]
    pub fn is_alive(&self, id: ObjectId) -> bool {
        self.object(id).is_some()
    }

    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.object.as_ref()
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.object.as_mut()
    }

    fn try_object(&self, id: ObjectId) -> PdmResult<&Object> {
        self.object(id).ok_or(PdmError::StaleObject(id))
    }

    fn try_object_mut(&mut self, id: ObjectId) -> PdmResult<&mut Object> {
        self.object_mut(id).ok_or(PdmError::StaleObject(id))
    }

    /// The class implementation of a live object.
    #[must_use]
    pub fn class_of(&self, id: ObjectId) -> Option<Arc<dyn ObjectClass>> {
        self.object(id).map(|o| Arc::clone(&o.class))
    }

    /// Ids of all live objects in slot order.
    pub fn object_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.slots.iter().filter_map(|slot| slot.object.as_ref().map(Object::id))
    }

    /// Construct an object of class `class` with its declared fields.
    ///
    /// Fields declared with a default object are populated immediately.
    pub fn create(&mut self, class: &str) -> PdmResult<ObjectId> {
        let class_impl = self
            .factory
            .get(class)
            .ok_or_else(|| PdmError::UnknownClass(class.to_string()))?;

        let mut def = ObjectDefinition::default();
        class_impl.define(&mut def);
        let (chain, ui, specs) = def.finish(class_impl.keyword());
        let ui = ui.unwrap_or_else(|| UiCapability::new(class_impl.keyword()));

        let mut fields: Vec<Field> = Vec::with_capacity(specs.len());
        let mut default_objects = Vec::new();
        for spec in specs {
            check_new_keyword(class, &fields, spec.keyword())?;
            let (field, default_object) = spec.into_field();
            if let Some(child_class) = default_object {
                default_objects.push((fields.len(), child_class));
            }
            fields.push(field);
        }

        let id = self.allocate(|id| Object {
            id,
            class: class_impl,
            class_chain: chain.into_iter().collect(),
            fields,
            parent: None,
            capabilities: Default::default(),
        });
        if let Some(object) = self.object_mut(id) {
            object.capabilities.replace(ui.into());
        }

        for (index, child_class) in default_objects {
            if let Err(err) = self.populate(FieldHandle::new(id, index), &child_class) {
                let _ = self.destroy(id);
                return Err(err);
            }
        }

        trace!(target: "pdm.graph", %id, class, "object created");
        Ok(id)
    }

    fn allocate(&mut self, build: impl FnOnce(ObjectId) -> Object) -> ObjectId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        let id = ObjectId::new(index, slot.generation);
        slot.object = Some(build(id));
        self.live += 1;
        id
    }

    /// Declare an additional field on a live object.
    pub fn add_field(&mut self, object: ObjectId, spec: FieldSpec) -> PdmResult<FieldHandle> {
        let target = self.try_object_mut(object)?;
        let class = target.class_keyword().to_string();
        check_new_keyword(&class, &target.fields, spec.keyword())?;

        let (field, default_object) = spec.owned_by(&class).into_field();
        target.fields.push(field);
        let handle = FieldHandle::new(object, target.fields.len() - 1);

        if let Some(child_class) = default_object {
            self.populate(handle, &child_class)?;
        }
        debug!(target: "pdm.graph", %object, field = %handle, "field added");
        Ok(handle)
    }

    fn populate(&mut self, field: FieldHandle, class: &str) -> PdmResult<()> {
        let child = self.create(class)?;
        if let Err(err) = self.insert_child(field, None, child) {
            let _ = self.destroy(child);
            return Err(err);
        }
        Ok(())
    }

    /// Destroy an object and everything it owns.
    ///
    /// The object is detached from its parent field first.
    pub fn destroy(&mut self, id: ObjectId) -> PdmResult<()> {
        if !self.is_alive(id) {
            return Err(PdmError::StaleObject(id));
        }
        self.detach(id);

        let doomed = self.descendants(id);
        for &victim in &doomed {
            self.release(victim);
        }
        debug!(target: "pdm.graph", %id, released = doomed.len(), "object destroyed");
        Ok(())
    }

    fn release(&mut self, id: ObjectId) {
        if let Some(slot) = self.slots.get_mut(id.index() as usize) {
            if slot.generation == id.generation() && slot.object.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index());
                self.live -= 1;
            }
        }
    }

    // ========================================================================
    // Fields
    // ========================================================================

    #[must_use]
    pub fn field(&self, handle: FieldHandle) -> Option<&Field> {
        self.object(handle.object)?.fields.get(handle.index)
    }

    pub fn field_mut(&mut self, handle: FieldHandle) -> Option<&mut Field> {
        self.object_mut(handle.object)?.fields.get_mut(handle.index)
    }

    fn try_field(&self, handle: FieldHandle) -> PdmResult<&Field> {
        self.field(handle).ok_or(PdmError::StaleField(handle))
    }

    fn try_field_mut(&mut self, handle: FieldHandle) -> PdmResult<&mut Field> {
        self.field_mut(handle).ok_or(PdmError::StaleField(handle))
    }

    /// Handles of all fields of `object`, in declaration order.
    #[must_use]
    pub fn field_handles(&self, object: ObjectId) -> Vec<FieldHandle> {
        let count = self.object(object).map_or(0, |o| o.fields.len());
        (0..count).map(|index| FieldHandle::new(object, index)).collect()
    }

    #[must_use]
    pub fn field_by_keyword(&self, object: ObjectId, keyword: &str) -> Option<FieldHandle> {
        let index = self.object(object)?.field_index(keyword)?;
        Some(FieldHandle::new(object, index))
    }

    /// Lookup accepting deprecated aliases.
    #[must_use]
    pub fn field_by_any_keyword(&self, object: ObjectId, keyword: &str) -> Option<FieldHandle> {
        let index = self.object(object)?.field_index_any(keyword)?;
        Some(FieldHandle::new(object, index))
    }

    #[must_use]
    pub fn field_by_script_keyword(&self, object: ObjectId, keyword: &str) -> Option<FieldHandle> {
        let index = self.object(object)?.fields.iter().position(|f| {
            f.capability::<ScriptingCapability>()
                .is_some_and(|s| s.script_keyword() == keyword)
        })?;
        Some(FieldHandle::new(object, index))
    }

    #[must_use]
    pub fn value(&self, field: FieldHandle) -> Option<&FieldValue> {
        self.field(field)?.value()
    }

    /// Assign a value field. The value kind must match the declared kind and
    /// enum values must name an item of the field's enum.
    pub fn set_value(&mut self, field: FieldHandle, value: impl Into<FieldValue>) -> PdmResult<()> {
        let value = value.into();
        let target = self.try_field_mut(field)?;
        match &mut target.data {
            FieldData::Value {
                value: current,
                enum_def,
                ..
            } => {
                if current.kind() != value.kind() {
                    return Err(PdmError::TypeMismatch {
                        keyword: target.keyword.clone(),
                        expected: current.kind().name(),
                        actual: value.kind().name(),
                    });
                }
                if let (Some(def), FieldValue::Enum(text)) = (enum_def.as_deref(), &value) {
                    if !def.contains(text) {
                        return Err(PdmError::UnknownEnumItem {
                            enum_name: def.name().to_string(),
                            item: text.clone(),
                        });
                    }
                }
                *current = value;
                Ok(())
            }
            other => Err(PdmError::FieldKind {
                keyword: target.keyword.clone(),
                expected: "value field",
                actual: other.kind().name(),
            }),
        }
    }

    /// Restore a value field to its declared default.
    pub fn reset_to_default(&mut self, field: FieldHandle) -> PdmResult<()> {
        let default = self
            .try_field(field)?
            .default_value()
            .cloned()
            .ok_or_else(|| self.kind_error(field, "value field"))?;
        self.set_value(field, default)
    }

    /// Live target of a pointer field.
    #[must_use]
    pub fn pointer(&self, field: FieldHandle) -> Option<ObjectId> {
        match self.field(field)?.data {
            FieldData::Pointer {
                target: Some(target),
                ..
            } if self.is_alive(target) => Some(target),
            _ => None,
        }
    }

    pub fn set_pointer(&mut self, field: FieldHandle, target: Option<ObjectId>) -> PdmResult<()> {
        if let Some(target) = target {
            if !self.is_alive(target) {
                return Err(PdmError::StaleObject(target));
            }
        }
        let kind_error = self.kind_error(field, "pointer field");
        match &mut self.try_field_mut(field)?.data {
            FieldData::Pointer {
                target: current,
                pending,
            } => {
                *current = target;
                *pending = None;
                Ok(())
            }
            _ => Err(kind_error),
        }
    }

    fn kind_error(&self, field: FieldHandle, expected: &'static str) -> PdmError {
        match self.field(field) {
            Some(f) => PdmError::FieldKind {
                keyword: f.keyword.clone(),
                expected,
                actual: f.kind().name(),
            },
            None => PdmError::StaleField(field),
        }
    }

    // ========================================================================
    // Structure
    // ========================================================================

    #[must_use]
    pub fn parent(&self, id: ObjectId) -> Option<ParentLink> {
        self.object(id)?.parent
    }

    #[must_use]
    pub fn parent_field(&self, id: ObjectId) -> Option<FieldHandle> {
        self.parent(id).map(ParentLink::field_handle)
    }

    #[must_use]
    pub fn parent_object(&self, id: ObjectId) -> Option<ObjectId> {
        self.parent(id).map(|link| link.object)
    }

    /// Ancestors of `id`, nearest first.
    #[must_use]
    pub fn ancestors(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent_object(current) {
            out.push(parent);
            current = parent;
        }
        out
    }

    /// Topmost ancestor of `id` (itself when it has no parent).
    #[must_use]
    pub fn root_of(&self, id: ObjectId) -> ObjectId {
        self.ancestors(id).last().copied().unwrap_or(id)
    }

    /// Returns `true` if `ancestor` is `id` or one of its ancestors.
    #[must_use]
    pub fn is_same_or_ancestor(&self, ancestor: ObjectId, id: ObjectId) -> bool {
        ancestor == id || self.ancestors(id).contains(&ancestor)
    }

    #[must_use]
    pub fn child_count(&self, field: FieldHandle) -> usize {
        self.field(field).map_or(0, |f| f.children().len())
    }

    /// Ordered snapshot of the objects owned by `field`.
    #[must_use]
    pub fn child_objects(&self, field: FieldHandle) -> Vec<ObjectId> {
        self.field(field).map(|f| f.children().to_vec()).unwrap_or_default()
    }

    /// Objects owned by any field of `object`, in field order.
    #[must_use]
    pub fn children(&self, object: ObjectId) -> Vec<ObjectId> {
        self.object(object)
            .map(|o| o.fields.iter().flat_map(|f| f.children().iter().copied()).collect())
            .unwrap_or_default()
    }

    /// Position of `child` within its owning field.
    #[must_use]
    pub fn index_in_parent(&self, child: ObjectId) -> Option<usize> {
        let field = self.field(self.parent_field(child)?)?;
        field.children().iter().position(|&c| c == child)
    }

    /// Insert `child` into a child or child-array field.
    ///
    /// `index` of `None` appends. The child must be live and unparented.
    pub fn insert_child(
        &mut self,
        field: FieldHandle,
        index: Option<usize>,
        child: ObjectId,
    ) -> PdmResult<()> {
        if self.try_object(child)?.parent.is_some() {
            return Err(PdmError::AlreadyParented(child));
        }
        if self.is_same_or_ancestor(child, field.object) {
            return Err(PdmError::Cycle(child));
        }

        let target = self.try_field_mut(field)?;
        match &mut target.data {
            FieldData::ChildArray(children) => {
                let len = children.len();
                let at = index.unwrap_or(len);
                if at > len {
                    return Err(PdmError::IndexOutOfBounds {
                        keyword: target.keyword.clone(),
                        index: at,
                        len,
                    });
                }
                children.insert(at, child);
            }
            FieldData::Child(slot) => {
                if slot.is_some() || index.is_some_and(|i| i != 0) {
                    return Err(PdmError::IndexOutOfBounds {
                        keyword: target.keyword.clone(),
                        index: index.unwrap_or(1),
                        len: usize::from(slot.is_some()),
                    });
                }
                *slot = Some(child);
            }
            other => {
                return Err(PdmError::FieldKind {
                    keyword: target.keyword.clone(),
                    expected: "child field",
                    actual: other.kind().name(),
                });
            }
        }

        if let Some(object) = self.object_mut(child) {
            object.parent = Some(ParentLink {
                object: field.object,
                field: field.index,
            });
        }
        trace!(target: "pdm.graph", %child, %field, "child inserted");
        Ok(())
    }

    /// Append `child` to a child-array field.
    pub fn push_child(&mut self, field: FieldHandle, child: ObjectId) -> PdmResult<()> {
        self.insert_child(field, None, child)
    }

    /// Remove the child at `index` and hand it back.
    ///
    /// The removed object stays alive and unparented; destroying it is the
    /// caller's job.
    pub fn erase_child(&mut self, field: FieldHandle, index: usize) -> PdmResult<ObjectId> {
        let target = self.try_field_mut(field)?;
        let len = target.children().len();
        let removed = match &mut target.data {
            FieldData::ChildArray(children) if index < children.len() => children.remove(index),
            FieldData::Child(slot) if index == 0 && slot.is_some() => {
                slot.take().ok_or(PdmError::StaleField(field))?
            }
            FieldData::ChildArray(_) | FieldData::Child(_) => {
                return Err(PdmError::IndexOutOfBounds {
                    keyword: target.keyword.clone(),
                    index,
                    len,
                });
            }
            other => {
                return Err(PdmError::FieldKind {
                    keyword: target.keyword.clone(),
                    expected: "child field",
                    actual: other.kind().name(),
                });
            }
        };

        if let Some(object) = self.object_mut(removed) {
            object.parent = None;
        }
        trace!(target: "pdm.graph", child = %removed, %field, index, "child erased");
        Ok(removed)
    }

    /// Detach `child` from whatever field owns it.
    pub fn detach(&mut self, child: ObjectId) -> Option<ParentLink> {
        let link = self.parent(child)?;
        let index = self.index_in_parent(child)?;
        self.erase_child(link.field_handle(), index).ok()?;
        Some(link)
    }

    /// Replace the object of a single child field, returning the detached
    /// previous child.
    pub fn set_child(
        &mut self,
        field: FieldHandle,
        child: Option<ObjectId>,
    ) -> PdmResult<Option<ObjectId>> {
        if !matches!(self.try_field(field)?.kind(), FieldKind::Child) {
            return Err(self.kind_error(field, "child field"));
        }
        let previous = match self.child_count(field) {
            0 => None,
            _ => Some(self.erase_child(field, 0)?),
        };
        if let Some(child) = child {
            if let Err(err) = self.insert_child(field, None, child) {
                if let Some(previous) = previous {
                    let _ = self.insert_child(field, None, previous);
                }
                return Err(err);
            }
        }
        Ok(previous)
    }

    /// Destroy every object owned by `field`.
    pub fn delete_all_children(&mut self, field: FieldHandle) -> PdmResult<()> {
        let children = self.try_field(field)?.children().to_vec();
        for child in children {
            self.destroy(child)?;
        }
        Ok(())
    }

    /// `root` and everything below it, depth first, parents before children.
    #[must_use]
    pub fn descendants(&self, root: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        if !self.is_alive(root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(next) = stack.pop() {
            out.push(next);
            let mut children = self.children(next);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Objects under `root` (inclusive) that are of class `class` or derive
    /// from it.
    #[must_use]
    pub fn descendants_of_class(&self, root: ObjectId, class: &str) -> Vec<ObjectId> {
        self.descendants(root)
            .into_iter()
            .filter(|&id| self.object(id).is_some_and(|o| o.is_of_class(class)))
            .collect()
    }

    /// Pointer fields under `root` whose live target lies inside `subtree`,
    /// excluding fields that are themselves inside `subtree`.
    #[must_use]
    pub fn pointers_into(&self, root: ObjectId, subtree: ObjectId) -> Vec<FieldHandle> {
        let mut out = Vec::new();
        for id in self.descendants(root) {
            if self.is_same_or_ancestor(subtree, id) {
                continue;
            }
            for handle in self.field_handles(id) {
                if let Some(target) = self.pointer(handle) {
                    if self.is_same_or_ancestor(subtree, target) {
                        out.push(handle);
                    }
                }
            }
        }
        out
    }

    /// Resolve pending pointer paths under `subtree` against `root`.
    ///
    /// Returns the number of paths that did not resolve; those stay pending.
    pub fn resolve_references(&mut self, subtree: ObjectId, root: ObjectId) -> usize {
        let mut unresolved = 0;
        for id in self.descendants(subtree) {
            for handle in self.field_handles(id) {
                let Some(FieldData::Pointer {
                    pending: Some(path),
                    ..
                }) = self.field(handle).map(Field::data)
                else {
                    continue;
                };

                let path = path.clone();
                // The empty path is the root itself.
                let resolved = path
                    .parse::<ObjectPath>()
                    .ok()
                    .and_then(|p| object_from_reference(self, root, &p));

                match resolved {
                    Some(target) => {
                        if let Some(FieldData::Pointer {
                            target: current,
                            pending,
                        }) = self.field_mut(handle).map(|f| &mut f.data)
                        {
                            *current = Some(target);
                            *pending = None;
                        }
                    }
                    None => {
                        unresolved += 1;
                        warn!(target: "pdm.io", field = %handle, %path, "unresolved pointer reference");
                    }
                }
            }
        }
        unresolved
    }
}

fn check_new_keyword(class: &str, existing: &[Field], keyword: &str) -> PdmResult<()> {
    if !is_valid_keyword(keyword) {
        return Err(PdmError::InvalidKeyword(keyword.to_string()));
    }
    if existing.iter().any(|f| f.matches_keyword(keyword)) {
        return Err(PdmError::DuplicateKeyword {
            class: class.to_string(),
            keyword: keyword.to_string(),
        });
    }
    Ok(())
}
