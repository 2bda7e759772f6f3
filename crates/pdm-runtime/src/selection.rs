#![forbid(unsafe_code)]

//! Multi-level selection.
//!
//! Each level is an independent ordered selection keyed by an `i32`. Level
//! `0` is conventionally the main tree selection; applications pick their
//! own meaning for the others.
//!
//! # Invariants
//!
//! 1. Entries refer to objects by generational id, so a destroyed owner is
//!    simply skipped by every read. Reads never mutate.
//! 2. A `SelectionChanged` event fires exactly once for every level whose
//!    live content changed, and never for a level that did not change.
//!
//! ```text
//! level 0: [Object #3v0]
//! level 1: [Field #3v0[1], Field #3v0[2]]
//! ```

use std::collections::BTreeMap;

use pdm_core::{
    FieldHandle, FieldPath, ObjectGraph, ObjectId, ObjectPath, field_from_reference,
    object_from_reference, reference_from_root_to_field, reference_from_root_to_object,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::notification::{NotificationCenter, PdmEvent};

/// One selected thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionItem {
    Object(ObjectId),
    Field(FieldHandle),
}

impl SelectionItem {
    /// The object whose lifetime decides whether the entry is still valid.
    #[must_use]
    pub fn owner(self) -> ObjectId {
        match self {
            Self::Object(id) => id,
            Self::Field(handle) => handle.object,
        }
    }

    #[must_use]
    pub fn is_alive(self, graph: &ObjectGraph) -> bool {
        match self {
            Self::Object(id) => graph.is_alive(id),
            Self::Field(handle) => graph.field(handle).is_some(),
        }
    }
}

impl From<ObjectId> for SelectionItem {
    fn from(id: ObjectId) -> Self {
        Self::Object(id)
    }
}

impl From<FieldHandle> for SelectionItem {
    fn from(handle: FieldHandle) -> Self {
        Self::Field(handle)
    }
}

/// Persistent form of a selection entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReference {
    Object(String),
    Field(String),
}

/// Selection state for every level.
#[derive(Debug, Default)]
pub struct SelectionManager {
    levels: BTreeMap<i32, Vec<SelectionItem>>,
    notifications: NotificationCenter,
}

impl SelectionManager {
    /// A manager publishing `SelectionChanged` through `notifications`.
    #[must_use]
    pub fn new(notifications: NotificationCenter) -> Self {
        Self {
            levels: BTreeMap::new(),
            notifications,
        }
    }

    fn live(&self, graph: &ObjectGraph, level: i32) -> Vec<SelectionItem> {
        self.levels
            .get(&level)
            .map(|items| items.iter().copied().filter(|i| i.is_alive(graph)).collect())
            .unwrap_or_default()
    }

    fn changed(&self, level: i32) {
        debug!(target: "pdm.selection", level, "selection changed");
        self.notifications.notify(&PdmEvent::SelectionChanged { level });
    }

    // ========================================================================
    // Writing
    // ========================================================================

    /// Replace the selection at `level`.
    ///
    /// Dead items are dropped on the way in. Notifies only if the live
    /// selection actually changed.
    pub fn set_selected_items(
        &mut self,
        graph: &ObjectGraph,
        items: impl IntoIterator<Item = SelectionItem>,
        level: i32,
    ) {
        let mut next: Vec<SelectionItem> = Vec::new();
        for item in items {
            if item.is_alive(graph) && !next.contains(&item) {
                next.push(item);
            }
        }
        if self.live(graph, level) == next {
            return;
        }
        if next.is_empty() {
            self.levels.remove(&level);
        } else {
            self.levels.insert(level, next);
        }
        self.changed(level);
    }

    pub fn set_selected_item(&mut self, graph: &ObjectGraph, item: SelectionItem, level: i32) {
        self.set_selected_items(graph, [item], level);
    }

    /// Empty `level`. Notifies only if its live selection was non-empty.
    pub fn clear(&mut self, graph: &ObjectGraph, level: i32) {
        let had_live = !self.live(graph, level).is_empty();
        self.levels.remove(&level);
        if had_live {
            self.changed(level);
        }
    }

    /// Empty every level, one notification per level that held live items.
    pub fn clear_all(&mut self, graph: &ObjectGraph) {
        let levels: Vec<i32> = self.levels.keys().copied().collect();
        for level in levels {
            self.clear(graph, level);
        }
    }

    /// Drop every entry owned by `object` or anything below it.
    ///
    /// Call this before destroying `object`; afterwards its descendants can
    /// no longer be identified.
    pub fn remove_object_from_all_selections(&mut self, graph: &ObjectGraph, object: ObjectId) {
        let mut affected = Vec::new();
        for (&level, items) in &mut self.levels {
            let before = items.len();
            items.retain(|item| !graph.is_same_or_ancestor(object, item.owner()));
            if items.len() != before {
                affected.push(level);
            }
        }
        self.levels.retain(|_, items| !items.is_empty());
        for level in affected {
            self.changed(level);
        }
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// Live items at `level`, in selection order.
    #[must_use]
    pub fn selected_items(&self, graph: &ObjectGraph, level: i32) -> Vec<SelectionItem> {
        self.live(graph, level)
    }

    /// First live item at `level`.
    #[must_use]
    pub fn selected_item(&self, graph: &ObjectGraph, level: i32) -> Option<SelectionItem> {
        self.levels
            .get(&level)?
            .iter()
            .copied()
            .find(|i| i.is_alive(graph))
    }

    #[must_use]
    pub fn is_selected(&self, graph: &ObjectGraph, item: SelectionItem, level: i32) -> bool {
        item.is_alive(graph) && self.levels.get(&level).is_some_and(|items| items.contains(&item))
    }

    /// Selected objects at `level` that are of `class` or derive from it.
    #[must_use]
    pub fn selected_objects_of_class(
        &self,
        graph: &ObjectGraph,
        class: &str,
        level: i32,
    ) -> Vec<ObjectId> {
        self.live(graph, level)
            .into_iter()
            .filter_map(|item| match item {
                SelectionItem::Object(id) => Some(id),
                SelectionItem::Field(_) => None,
            })
            .filter(|&id| graph.object(id).is_some_and(|o| o.is_of_class(class)))
            .collect()
    }

    /// Levels currently holding at least one entry, live or not.
    #[must_use]
    pub fn levels(&self) -> Vec<i32> {
        self.levels.keys().copied().collect()
    }

    // ========================================================================
    // References
    // ========================================================================

    /// Root-relative paths of the live selection at `level`. Items outside
    /// `root` are left out.
    #[must_use]
    pub fn selection_as_references(
        &self,
        graph: &ObjectGraph,
        root: ObjectId,
        level: i32,
    ) -> Vec<SelectionReference> {
        self.live(graph, level)
            .into_iter()
            .filter_map(|item| match item {
                SelectionItem::Object(id) => reference_from_root_to_object(graph, root, id)
                    .map(|p| SelectionReference::Object(p.to_string())),
                SelectionItem::Field(handle) => reference_from_root_to_field(graph, root, handle)
                    .map(|p| SelectionReference::Field(p.to_string())),
            })
            .collect()
    }

    /// Select whatever `references` resolve to under `root`. Paths that no
    /// longer resolve are skipped.
    pub fn set_selection_from_references(
        &mut self,
        graph: &ObjectGraph,
        root: ObjectId,
        references: &[SelectionReference],
        level: i32,
    ) {
        let items: Vec<SelectionItem> = references
            .iter()
            .filter_map(|reference| match reference {
                SelectionReference::Object(text) => text
                    .parse::<ObjectPath>()
                    .ok()
                    .and_then(|p| object_from_reference(graph, root, &p))
                    .map(SelectionItem::Object),
                SelectionReference::Field(text) => text
                    .parse::<FieldPath>()
                    .ok()
                    .and_then(|p| field_from_reference(graph, root, &p))
                    .map(SelectionItem::Field),
            })
            .collect();
        self.set_selected_items(graph, items, level);
    }
}
