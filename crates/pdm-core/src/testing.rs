#![forbid(unsafe_code)]

//! Demo classes for tests (`test-helpers` feature).
//!
//! | class         | notable fields                                           |
//! |---------------|----------------------------------------------------------|
//! | `Container`   | `Name`, `Count`, `Preset`, `Items`, `Archive` (tree hidden), `Settings` (default object), `Internal` (no UI), `ItemCount` (bookkeeping) |
//! | `Item`        | `Label`, `Weight`, `Tags`, `Kind` (enum), `Link` (pointer), `Parts` |
//! | `SpecialItem` | derives from `Item`, adds `Bonus`                         |
//! | `Settings`    | `Enabled`, `Scale`                                        |
//! | `Group`       | tree-hidden object with `Members`                         |
//! | `Folder`      | custom ordering hook with a `Favorites` display group     |

use std::sync::{Arc, OnceLock};

use crate::app_enum::EnumDef;
use crate::capability::{EditorHint, OptionItem};
use crate::class::{FieldSpec, ObjectClass, ObjectDefinition};
use crate::factory::ObjectFactory;
use crate::field::FieldHandle;
use crate::graph::ObjectGraph;
use crate::object::ObjectId;
use crate::ui_tree::UiTreeOrdering;
use crate::value::FieldValue;

/// Enum used by `Item.Kind`.
pub fn kind_enum() -> Arc<EnumDef> {
    static KIND: OnceLock<Arc<EnumDef>> = OnceLock::new();
    Arc::clone(KIND.get_or_init(|| {
        Arc::new(
            EnumDef::new("ItemKind")
                .item("T1", "Type 1")
                .item("T2", "Type 2")
                .item("T3", "Type 3"),
        )
    }))
}

fn field(graph: &ObjectGraph, object: ObjectId, keyword: &str) -> Option<FieldHandle> {
    graph.field_by_keyword(object, keyword)
}

/// Root-style aggregate with bookkeeping hooks.
pub struct Container;

impl Container {
    fn recount(graph: &mut ObjectGraph, this: ObjectId) {
        let (Some(items), Some(count)) = (field(graph, this, "Items"), field(graph, this, "ItemCount"))
        else {
            return;
        };
        let n = graph.child_count(items) as i64;
        let _ = graph.set_value(count, n);
    }
}

impl ObjectClass for Container {
    fn keyword(&self) -> &str {
        "Container"
    }

    fn define(&self, def: &mut ObjectDefinition) {
        def.begin_class("Container");
        def.ui("Container").set_icon(":/container.png");
        def.field(FieldSpec::value("Name", "").ui_name("Name").scriptable());
        def.field(FieldSpec::value("Count", 0).ui_name("Count").scriptable());
        def.field(FieldSpec::value("Preset", "Medium").editor(EditorHint::ComboBox));
        def.field(FieldSpec::child_array("Items").ui_name("Items"));
        def.field(FieldSpec::child_array("Archive").tree_hidden());
        def.field(FieldSpec::child("Settings").default_object("Settings"));
        def.field(FieldSpec::child_array("Internal").without_ui());
        def.field(
            FieldSpec::value("ItemCount", 0)
                .without_ui()
                .without_serialization(),
        );
        def.field(
            FieldSpec::value("LastChanged", "")
                .without_ui()
                .without_serialization(),
        );
    }

    fn init_after_read(&self, graph: &mut ObjectGraph, this: ObjectId) {
        Self::recount(graph, this);
    }

    fn child_added(&self, graph: &mut ObjectGraph, this: ObjectId, _into_field: FieldHandle) {
        Self::recount(graph, this);
    }

    fn child_removed(&self, graph: &mut ObjectGraph, this: ObjectId, _from_field: FieldHandle) {
        Self::recount(graph, this);
    }

    fn field_changed_by_ui(
        &self,
        graph: &mut ObjectGraph,
        this: ObjectId,
        changed: FieldHandle,
        _old: &str,
        _new: &str,
    ) {
        let keyword = graph
            .field(changed)
            .map(|f| f.keyword().to_string())
            .unwrap_or_default();
        if let Some(last) = field(graph, this, "LastChanged") {
            let _ = graph.set_value(last, keyword);
        }
    }

    fn calculate_value_options(
        &self,
        graph: &ObjectGraph,
        this: ObjectId,
        changed: FieldHandle,
    ) -> Option<Vec<OptionItem>> {
        (field(graph, this, "Preset") == Some(changed)).then(|| {
            ["Low", "Medium", "High"]
                .into_iter()
                .map(|p| OptionItem::new(p, FieldValue::Text(p.to_string())))
                .collect()
        })
    }
}

fn define_item(def: &mut ObjectDefinition) {
    def.begin_class("Item");
    def.ui("Item");
    def.field(FieldSpec::value("Label", "").ui_name("Label"));
    def.field(FieldSpec::value("Weight", 1.0).tooltip("Relative weight"));
    def.field(FieldSpec::value("Tags", Vec::<String>::new()).deprecated_keyword("Keywords"));
    def.field(FieldSpec::enumeration("Kind", kind_enum()));
    def.field(FieldSpec::pointer("Link"));
    def.field(FieldSpec::child_array("Parts"));
}

pub struct Item;

impl ObjectClass for Item {
    fn keyword(&self) -> &str {
        "Item"
    }

    fn define(&self, def: &mut ObjectDefinition) {
        define_item(def);
    }
}

pub struct SpecialItem;

impl ObjectClass for SpecialItem {
    fn keyword(&self) -> &str {
        "SpecialItem"
    }

    fn define(&self, def: &mut ObjectDefinition) {
        define_item(def);
        def.begin_class("SpecialItem");
        def.field(FieldSpec::value("Bonus", 0).script_keyword("bonus_points"));
    }
}

pub struct Settings;

impl ObjectClass for Settings {
    fn keyword(&self) -> &str {
        "Settings"
    }

    fn define(&self, def: &mut ObjectDefinition) {
        def.begin_class("Settings");
        def.field(FieldSpec::value("Enabled", true));
        def.field(FieldSpec::value("Scale", 1.0));
    }
}

/// Object hidden from trees; its members show up at the parent's level.
pub struct Group;

impl ObjectClass for Group {
    fn keyword(&self) -> &str {
        "Group"
    }

    fn define(&self, def: &mut ObjectDefinition) {
        def.begin_class("Group");
        def.ui("Group").set_tree_hidden(true);
        def.field(FieldSpec::child_array("Members"));
    }
}

/// Places its first entry and first pinned object under a display group.
pub struct Folder;

impl ObjectClass for Folder {
    fn keyword(&self) -> &str {
        "Folder"
    }

    fn define(&self, def: &mut ObjectDefinition) {
        def.begin_class("Folder");
        def.field(FieldSpec::child_array("Entries"));
        def.field(FieldSpec::child_array("Pinned").tree_hidden());
    }

    fn define_ui_tree_ordering(
        &self,
        graph: &ObjectGraph,
        this: ObjectId,
        ordering: &mut UiTreeOrdering,
    ) {
        let favorites = ordering.add_display("Favorites");
        for keyword in ["Entries", "Pinned"] {
            if let Some(first) = field(graph, this, keyword)
                .and_then(|h| graph.child_objects(h).first().copied())
            {
                favorites.add_object(first);
            }
        }
    }
}

/// Factory with every demo class registered.
#[must_use]
pub fn demo_factory() -> ObjectFactory {
    let mut factory = ObjectFactory::new();
    let classes: [Arc<dyn ObjectClass>; 6] = [
        Arc::new(Container),
        Arc::new(Item),
        Arc::new(SpecialItem),
        Arc::new(Settings),
        Arc::new(Group),
        Arc::new(Folder),
    ];
    for class in classes {
        if let Err(err) = factory.register_shared(class) {
            panic!("demo class registration failed: {err}");
        }
    }
    factory
}

/// A `Container` root holding items labelled `X` and `Y`.
#[must_use]
pub fn demo_graph() -> (ObjectGraph, ObjectId) {
    let mut graph = ObjectGraph::new(demo_factory());
    let root = must(graph.create("Container"));
    for label in ["X", "Y"] {
        add_item(&mut graph, root, label);
    }
    (graph, root)
}

/// Append an `Item` labelled `label` to `parent.Items`.
pub fn add_item(graph: &mut ObjectGraph, parent: ObjectId, label: &str) -> ObjectId {
    let item = must(graph.create("Item"));
    let label_field = must_some(graph.field_by_keyword(item, "Label"));
    must(graph.set_value(label_field, label));
    let items = must_some(graph.field_by_keyword(parent, "Items"));
    must(graph.push_child(items, item));
    item
}

/// Handle of `keyword` on `object`, panicking when absent.
#[must_use]
pub fn field_of(graph: &ObjectGraph, object: ObjectId, keyword: &str) -> FieldHandle {
    must_some(graph.field_by_keyword(object, keyword))
}

/// Text of a `Text` or `Enum` field.
#[must_use]
pub fn text_of(graph: &ObjectGraph, object: ObjectId, keyword: &str) -> String {
    graph
        .value(field_of(graph, object, keyword))
        .and_then(FieldValue::as_text)
        .unwrap_or_default()
        .to_string()
}

fn must<T, E: std::fmt::Display>(result: Result<T, E>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("demo graph setup failed: {err}"),
    }
}

fn must_some<T>(value: Option<T>) -> T {
    match value {
        Some(value) => value,
        None => panic!("demo graph setup failed: missing field"),
    }
}
