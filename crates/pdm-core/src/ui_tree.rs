#![forbid(unsafe_code)]

//! Projection of the object graph into a display-ordered tree.
//!
//! A [`UiTreeOrdering`] node stands for exactly one object, one field or a
//! display-only grouping placeholder. Nodes are rebuilt for every refresh
//! and never persisted.
//!
//! # Expansion
//!
//! [`expand_ui_tree`] works top-down:
//!
//! 1. A node that already has children only recurses into the children not
//!    marked `ignore_subtree`.
//! 2. A field node lists the field's objects, unless the field hides its
//!    tree children.
//! 3. An object node asks its class for a custom ordering, then appends the
//!    remaining child fields (unless the ordering opted out), then recurses.
//!
//! Fields without a UI facet never appear. A tree-hidden field whose
//! children are still wanted has those children spliced in at the object's
//! level; objects already placed by the class hook are not added twice.
//! A tree-hidden object is replaced by its own children the same way.
//!
//! ```text
//! Document                    Document
//! ├─ Items (field)            ├─ Items
//! │  ├─ Item #1       ──▶     │  ├─ Item #1
//! │  └─ Item #2               │  └─ Item #2
//! └─ Hidden (tree hidden)     ├─ Item #3      (spliced)
//!    └─ Item #3               └─ ...
//! ```

use tracing::trace;

use crate::capability::UiCapability;
use crate::field::FieldHandle;
use crate::graph::ObjectGraph;
use crate::object::ObjectId;

/// What a node stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeItem {
    Object(ObjectId),
    Field(FieldHandle),
    /// Grouping placeholder with no model item behind it.
    Display { title: String, icon: Option<String> },
}

/// One node of a tree projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiTreeOrdering {
    item: TreeItem,
    children: Vec<UiTreeOrdering>,
    ignore_subtree: bool,
    include_remaining: bool,
}

impl UiTreeOrdering {
    fn with_item(item: TreeItem) -> Self {
        Self {
            item,
            children: Vec::new(),
            ignore_subtree: false,
            include_remaining: true,
        }
    }

    #[must_use]
    pub fn for_object(object: ObjectId) -> Self {
        Self::with_item(TreeItem::Object(object))
    }

    #[must_use]
    pub fn for_field(field: FieldHandle) -> Self {
        Self::with_item(TreeItem::Field(field))
    }

    #[must_use]
    pub fn display(title: impl Into<String>) -> Self {
        Self::with_item(TreeItem::Display {
            title: title.into(),
            icon: None,
        })
    }

    #[must_use]
    pub fn item(&self) -> &TreeItem {
        &self.item
    }

    #[must_use]
    pub fn object(&self) -> Option<ObjectId> {
        match self.item {
            TreeItem::Object(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn field(&self) -> Option<FieldHandle> {
        match self.item {
            TreeItem::Field(handle) => Some(handle),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_display(&self) -> bool {
        matches!(self.item, TreeItem::Display { .. })
    }

    #[must_use]
    pub fn children(&self) -> &[UiTreeOrdering] {
        &self.children
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Append a prepared node and return it for further nesting.
    pub fn push(&mut self, node: UiTreeOrdering) -> &mut UiTreeOrdering {
        self.children.push(node);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn add_object(&mut self, object: ObjectId) -> &mut UiTreeOrdering {
        self.push(Self::for_object(object))
    }

    pub fn add_field(&mut self, field: FieldHandle) -> &mut UiTreeOrdering {
        self.push(Self::for_field(field))
    }

    pub fn add_display(&mut self, title: impl Into<String>) -> &mut UiTreeOrdering {
        self.push(Self::display(title))
    }

    #[must_use]
    pub fn ignore_subtree(&self) -> bool {
        self.ignore_subtree
    }

    /// Keep expansion out of this node's subtree.
    pub fn set_ignore_subtree(&mut self, ignore: bool) {
        self.ignore_subtree = ignore;
    }

    #[must_use]
    pub fn include_remaining(&self) -> bool {
        self.include_remaining
    }

    /// Stop the default pass from appending fields the hook left out.
    pub fn skip_remaining_children(&mut self, skip: bool) {
        self.include_remaining = !skip;
    }

    /// Returns `true` if `object` is represented anywhere below this node.
    #[must_use]
    pub fn contains_object(&self, object: ObjectId) -> bool {
        self.children
            .iter()
            .any(|c| c.object() == Some(object) || c.contains_object(object))
    }

    /// Returns `true` if `field` is represented anywhere below this node.
    #[must_use]
    pub fn contains_field(&self, field: FieldHandle) -> bool {
        self.children
            .iter()
            .any(|c| c.field() == Some(field) || c.contains_field(field))
    }

    /// Nodes in this subtree, including this one.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }

    /// Pre-order listing of `(depth, item)`.
    #[must_use]
    pub fn flatten(&self) -> Vec<(usize, TreeItem)> {
        let mut out = Vec::new();
        self.flatten_into(0, &mut out);
        out
    }

    fn flatten_into(&self, depth: usize, out: &mut Vec<(usize, TreeItem)>) {
        out.push((depth, self.item.clone()));
        for child in &self.children {
            child.flatten_into(depth + 1, out);
        }
    }

    /// Returns `true` if the object or field behind this node still exists.
    #[must_use]
    pub fn is_valid(&self, graph: &ObjectGraph) -> bool {
        match &self.item {
            TreeItem::Object(id) => graph.is_alive(*id),
            TreeItem::Field(handle) => graph.field(*handle).is_some(),
            TreeItem::Display { .. } => true,
        }
    }

    /// Drop nodes whose object or field no longer exists. Returns the number
    /// of subtrees removed.
    pub fn prune_stale(&mut self, graph: &ObjectGraph) -> usize {
        let before = self.children.len();
        self.children.retain(|c| c.is_valid(graph));
        let mut removed = before - self.children.len();
        for child in &mut self.children {
            removed += child.prune_stale(graph);
        }
        removed
    }

    /// Returns `true` if this field node lists a different set of objects
    /// than the field currently owns.
    #[must_use]
    pub fn needs_rebuild(&self, graph: &ObjectGraph) -> bool {
        let Some(field) = self.field() else {
            return false;
        };
        if self.children.is_empty() || self.ignore_subtree {
            return false;
        }
        let Some(f) = graph.field(field) else {
            return true;
        };
        let listed: Vec<ObjectId> = self.children.iter().filter_map(Self::object).collect();
        listed.len() != self.children.len() || listed != projected_children(graph, f.children())
    }
}

fn object_ui(graph: &ObjectGraph, object: ObjectId) -> Option<&UiCapability> {
    graph.object(object)?.ui()
}

fn is_hidden_object(graph: &ObjectGraph, node: &UiTreeOrdering) -> bool {
    node.object()
        .and_then(|id| object_ui(graph, id))
        .is_some_and(UiCapability::is_tree_hidden)
}

/// Objects a field node shows once hidden objects are spliced away.
fn projected_children(graph: &ObjectGraph, children: &[ObjectId]) -> Vec<ObjectId> {
    let mut out = Vec::new();
    for &child in children {
        let hidden = object_ui(graph, child).is_some_and(UiCapability::is_tree_hidden);
        if !hidden {
            out.push(child);
        }
    }
    out
}

/// Build a fresh, fully expanded tree rooted at `object`.
#[must_use]
pub fn ui_tree_ordering(graph: &ObjectGraph, object: ObjectId) -> UiTreeOrdering {
    let mut node = UiTreeOrdering::for_object(object);
    expand_ui_tree(graph, &mut node);
    node
}

/// Expand `node` in place. Calling it again on an unchanged graph leaves
/// the tree unchanged. A node marked `ignore_subtree` is left as it is.
pub fn expand_ui_tree(graph: &ObjectGraph, node: &mut UiTreeOrdering) {
    if node.children.is_empty() && !node.ignore_subtree {
        match node.item {
            TreeItem::Field(handle) => expand_field(graph, node, handle),
            TreeItem::Object(id) => expand_object(graph, node, id),
            TreeItem::Display { .. } => {}
        }
    }

    for child in node.children.iter_mut().filter(|c| !c.ignore_subtree) {
        expand_ui_tree(graph, child);
    }
    splice_hidden_objects(graph, node);
}

/// Prune stale nodes, reset field nodes whose objects changed, and expand.
pub fn refresh_ui_tree(graph: &ObjectGraph, node: &mut UiTreeOrdering) {
    let pruned = node.prune_stale(graph);
    reset_changed_fields(graph, node);
    expand_ui_tree(graph, node);
    trace!(target: "pdm.ui_tree", pruned, nodes = node.node_count(), "tree refreshed");
}

fn reset_changed_fields(graph: &ObjectGraph, node: &mut UiTreeOrdering) {
    if node.needs_rebuild(graph) {
        node.children.clear();
        return;
    }
    for child in &mut node.children {
        reset_changed_fields(graph, child);
    }
}

fn expand_field(graph: &ObjectGraph, node: &mut UiTreeOrdering, handle: FieldHandle) {
    let Some(field) = graph.field(handle) else {
        return;
    };
    if field.ui().is_some_and(UiCapability::is_tree_children_hidden) {
        return;
    }
    for &child in field.children() {
        node.add_object(child);
    }
}

fn expand_object(graph: &ObjectGraph, node: &mut UiTreeOrdering, id: ObjectId) {
    if object_ui(graph, id).is_some_and(UiCapability::is_tree_children_hidden) {
        return;
    }
    if let Some(class) = graph.class_of(id) {
        class.define_ui_tree_ordering(graph, id, node);
    }
    add_default_children(graph, node, id);
}

fn add_default_children(graph: &ObjectGraph, node: &mut UiTreeOrdering, id: ObjectId) {
    if !node.include_remaining {
        return;
    }
    for handle in graph.field_handles(id) {
        let Some(field) = graph.field(handle) else {
            continue;
        };
        if field.children().is_empty() || node.contains_field(handle) {
            continue;
        }
        let Some(ui) = field.ui() else {
            continue;
        };

        if !ui.is_tree_hidden() {
            node.add_field(handle);
        } else if !ui.is_tree_children_hidden() {
            for &child in field.children() {
                if !node.contains_object(child) {
                    node.add_object(child);
                }
            }
        }
    }
}

fn splice_hidden_objects(graph: &ObjectGraph, node: &mut UiTreeOrdering) {
    if !node.children.iter().any(|c| is_hidden_object(graph, c)) {
        return;
    }
    let children = std::mem::take(&mut node.children);
    for child in children {
        if is_hidden_object(graph, &child) {
            node.children.extend(child.children);
        } else {
            node.children.push(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_helpers_nest() {
        let mut root = UiTreeOrdering::display("Root");
        root.add_display("Group").add_display("Inner");
        assert_eq!(root.node_count(), 3);
        let flat = root.flatten();
        assert_eq!(flat[2].0, 2);
        assert!(root.children()[0].is_display());
    }

    #[test]
    fn flags_default_to_expand_everything() {
        let mut node = UiTreeOrdering::display("X");
        assert!(node.include_remaining());
        assert!(!node.ignore_subtree());
        node.skip_remaining_children(true);
        node.set_ignore_subtree(true);
        assert!(!node.include_remaining());
        assert!(node.ignore_subtree());
    }
}
