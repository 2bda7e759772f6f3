#![forbid(unsafe_code)]

//! End-to-end flows through `PdmContext`.

use pdm_core::testing::{demo_graph, field_of, text_of};
use pdm_core::{FieldValue, ObjectId};
use pdm_runtime::{
    CommandError, CommandKind, EventLog, PdmContext, PdmEvent, RuntimeConfig, SelectionItem,
    SelectionReference, UiValue,
};

fn context() -> PdmContext {
    let (graph, root) = demo_graph();
    PdmContext::new(graph, root)
}

fn items(cx: &PdmContext) -> Vec<ObjectId> {
    cx.graph().child_objects(field_of(cx.graph(), cx.root(), "Items"))
}

fn labels(cx: &PdmContext) -> Vec<String> {
    items(cx)
        .into_iter()
        .map(|id| text_of(cx.graph(), id, "Label"))
        .collect()
}

fn count(cx: &PdmContext) -> FieldValue {
    cx.graph()
        .value(field_of(cx.graph(), cx.root(), "Count"))
        .cloned()
        .unwrap()
}

#[test]
fn field_change_undo_redo() {
    let mut cx = context();
    let field = field_of(cx.graph(), cx.root(), "Count");

    cx.change_field_from_ui(field, UiValue::value(5)).unwrap();
    assert_eq!(count(&cx), FieldValue::Int(5));
    assert_eq!(cx.undo().unwrap().as_deref(), Some("Change Count"));
    assert_eq!(count(&cx), FieldValue::Int(0));
    cx.redo().unwrap();
    assert_eq!(count(&cx), FieldValue::Int(5));
}

#[test]
fn delete_evicts_selection_and_undo_restores_fields() {
    let mut cx = context();
    let x = items(&cx)[0];
    let weight = field_of(cx.graph(), x, "Weight");
    let tags = field_of(cx.graph(), x, "Tags");
    cx.change_field_from_ui(weight, UiValue::value(3.5)).unwrap();
    cx.change_field_from_ui(tags, UiValue::token("\"a b\" c")).unwrap();
    cx.set_selected_items([SelectionItem::Object(x), SelectionItem::Field(weight)], 0);

    cx.delete_item(x).unwrap();
    assert_eq!(labels(&cx), ["Y"]);
    assert!(cx.selected_items(0).is_empty());
    assert!(!cx.graph().is_alive(x));

    cx.undo().unwrap();
    assert_eq!(labels(&cx), ["X", "Y"]);
    let restored = items(&cx)[0];
    assert_eq!(
        cx.graph().value(field_of(cx.graph(), restored, "Weight")),
        Some(&FieldValue::Double(3.5))
    );
    assert_eq!(
        cx.graph().value(field_of(cx.graph(), restored, "Tags")),
        Some(&FieldValue::TextList(vec!["a b".into(), "c".into()]))
    );
}

#[test]
fn owner_recounts_after_delete_and_its_undo() {
    let mut cx = context();
    let item_count = field_of(cx.graph(), cx.root(), "ItemCount");
    let x = items(&cx)[0];

    cx.delete_item(x).unwrap();
    assert_eq!(cx.graph().value(item_count), Some(&FieldValue::Int(1)));
    cx.undo().unwrap();
    assert_eq!(cx.graph().value(item_count), Some(&FieldValue::Int(2)));
    cx.redo().unwrap();
    assert_eq!(cx.graph().value(item_count), Some(&FieldValue::Int(1)));
}

#[test]
fn macro_is_one_undo_entry() {
    let mut cx = context();
    let name = field_of(cx.graph(), cx.root(), "Name");
    let count_field = field_of(cx.graph(), cx.root(), "Count");

    cx.begin_macro("Batch edit");
    cx.change_field_from_ui(name, UiValue::value("renamed")).unwrap();
    cx.change_field_from_ui(count_field, UiValue::value(9)).unwrap();
    cx.end_macro().unwrap();

    assert_eq!(cx.commands().top_name(), Some("Batch edit"));
    assert_eq!(cx.commands().history().undo_depth(), 1);
    cx.undo().unwrap();
    assert_eq!(text_of(cx.graph(), cx.root(), "Name"), "");
    assert_eq!(count(&cx), FieldValue::Int(0));

    cx.redo().unwrap();
    assert_eq!(text_of(cx.graph(), cx.root(), "Name"), "renamed");
    assert_eq!(count(&cx), FieldValue::Int(9));
}

#[test]
fn clearing_one_level_leaves_the_others() {
    let mut cx = context();
    let (log, _sub) = EventLog::attach(cx.notifications());
    let root = cx.root();
    let f1 = field_of(cx.graph(), root, "Name");
    let f2 = field_of(cx.graph(), root, "Count");
    cx.set_selected_items([SelectionItem::Object(root)], 0);
    cx.set_selected_items([f1.into(), f2.into()], 1);
    log.clear();

    cx.clear_selection(0);
    assert!(cx.selected_items(0).is_empty());
    assert_eq!(cx.selected_items(1), [SelectionItem::Field(f1), SelectionItem::Field(f2)]);
    assert_eq!(log.events(), [PdmEvent::SelectionChanged { level: 0 }]);
}

#[test]
fn multi_field_edit_and_multi_delete_are_single_entries() {
    let mut cx = context();
    let weights: Vec<_> = items(&cx)
        .into_iter()
        .map(|id| field_of(cx.graph(), id, "Weight"))
        .collect();
    cx.change_fields_from_ui(&weights, UiValue::value(0.5)).unwrap();
    assert_eq!(cx.commands().top_name(), Some("Change 2 fields"));

    let all = items(&cx);
    cx.delete_items(&all).unwrap();
    assert!(items(&cx).is_empty());
    assert_eq!(cx.commands().history().undo_depth(), 2);

    cx.undo().unwrap();
    assert_eq!(labels(&cx), ["X", "Y"]);
    for id in items(&cx) {
        assert_eq!(
            cx.graph().value(field_of(cx.graph(), id, "Weight")),
            Some(&FieldValue::Double(0.5))
        );
    }
}

#[test]
fn add_item_returns_the_live_object() {
    let mut cx = context();
    let field = field_of(cx.graph(), cx.root(), "Items");
    let added = cx.add_item(field, "SpecialItem", Some(0)).unwrap();
    assert_eq!(items(&cx)[0], added);
    assert_eq!(cx.commands().top_name(), Some("Add SpecialItem"));

    cx.undo().unwrap();
    assert!(!cx.graph().is_alive(added));
    assert_eq!(labels(&cx), ["X", "Y"]);
}

#[test]
fn selection_survives_as_references() {
    let mut cx = context();
    let y = items(&cx)[1];
    let label = field_of(cx.graph(), y, "Label");
    cx.set_selected_items([SelectionItem::Object(y), label.into()], 0);

    let refs = cx.selection().selection_as_references(cx.graph(), cx.root(), 0);
    assert_eq!(
        refs,
        [
            SelectionReference::Object("Items 1".into()),
            SelectionReference::Field("Items 1 Label".into()),
        ]
    );
    let json = serde_json::to_string(&refs).unwrap();
    let back: Vec<SelectionReference> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, refs);
}

#[test]
fn stale_paths_fail_first_then_skip() {
    let mut cx = context();
    let y = items(&cx)[1];
    let label = field_of(cx.graph(), y, "Label");
    cx.change_field_from_ui(label, UiValue::value("Why")).unwrap();

    // Edits outside the history make the recorded path dangle.
    let items_field = field_of(cx.graph(), cx.root(), "Items");
    cx.graph_mut().delete_all_children(items_field).unwrap();
    assert_eq!(cx.undo().unwrap().as_deref(), Some("Change Label"));
    assert!(cx.can_redo());

    assert!(matches!(
        cx.change_field_from_ui(label, UiValue::value("gone")),
        Err(CommandError::StaleReference(_))
    ));
}

#[test]
fn option_index_edits_go_through_the_cache() {
    let mut cx = context();
    let preset = field_of(cx.graph(), cx.root(), "Preset");
    cx.change_field_from_ui(preset, UiValue::OptionIndex(0)).unwrap();
    assert_eq!(text_of(cx.graph(), cx.root(), "Preset"), "Low");
    assert!(matches!(
        cx.change_field_from_ui(preset, UiValue::OptionIndex(3)),
        Err(CommandError::OptionOutOfRange { index: 3, len: 3 })
    ));
    assert_eq!(cx.commands().history().undo_depth(), 1);
}

#[test]
fn config_disables_recording_per_kind() {
    let (graph, root) = demo_graph();
    let config =
        RuntimeConfig::from_toml_str("[undo]\ndisabled_kinds = [\"delete_item\"]").unwrap();
    let mut cx = PdmContext::with_config(graph, root, &config);
    assert!(!cx.commands().is_undo_enabled_for(CommandKind::DeleteItem));

    let x = items(&cx)[0];
    cx.delete_item(x).unwrap();
    assert_eq!(labels(&cx), ["Y"]);
    assert!(!cx.can_undo());
}

#[test]
fn save_marks_clean_and_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.pdm.json");
    let mut cx = context();
    let name = field_of(cx.graph(), cx.root(), "Name");
    cx.change_field_from_ui(name, UiValue::value("saved")).unwrap();
    assert!(!cx.is_clean());

    cx.save_document(&path).unwrap();
    assert!(cx.is_clean());
    cx.change_field_from_ui(name, UiValue::value("edited")).unwrap();
    assert!(!cx.is_clean());
    cx.undo().unwrap();
    assert!(cx.is_clean());

    let loaded = PdmContext::load_document(
        pdm_core::ObjectGraph::new(pdm_core::testing::demo_factory()),
        &path,
        &RuntimeConfig::default(),
    )
    .unwrap();
    assert_eq!(text_of(loaded.graph(), loaded.root(), "Name"), "saved");
    assert_eq!(labels(&loaded), ["X", "Y"]);
    assert!(loaded.is_clean());
    assert!(!loaded.can_undo());
}
