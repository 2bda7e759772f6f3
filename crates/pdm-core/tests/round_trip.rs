#![forbid(unsafe_code)]

//! Field-value round trip, tolerant reading and document files.

use std::sync::{Arc, Mutex};

use pdm_core::testing::{add_item, demo_factory, demo_graph, field_of, text_of};
use pdm_core::{
    DocumentFile, FieldContent, FieldRecord, FieldValue, NULL_POINTER_TOKEN, ObjectGraph,
    ObjectId, ObjectRecord, PdmError, copy_object, document_from_str, document_to_string,
    read_document, read_object, read_value, write_document, write_object, write_value,
};
use proptest::prelude::*;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;

// ============================================================================
// Capture layer
// ============================================================================

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    target: String,
    message: String,
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct MessageVisitor(String);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: tracing::Subscriber> Layer<S> for EventCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.0,
        });
    }
}

fn with_captured_events<F: FnOnce()>(f: F) -> Vec<CapturedEvent> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(EventCapture {
        events: Arc::clone(&events),
    });
    tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().unwrap().clone();
    captured
}

// ============================================================================
// Helpers
// ============================================================================

/// Demo graph with every field kind holding a non-default value.
fn populated_graph() -> (ObjectGraph, ObjectId) {
    let (mut graph, root) = demo_graph();
    graph.set_value(field_of(&graph, root, "Name"), "Project \"one\"").unwrap();
    graph.set_value(field_of(&graph, root, "Count"), 12).unwrap();

    let items = graph.child_objects(field_of(&graph, root, "Items"));
    let (x, y) = (items[0], items[1]);
    graph.set_value(field_of(&graph, x, "Weight"), 0.25).unwrap();
    graph
        .set_value(
            field_of(&graph, x, "Tags"),
            vec!["red".to_string(), "big box".to_string()],
        )
        .unwrap();
    graph
        .set_value(field_of(&graph, x, "Kind"), FieldValue::Enum("T3".into()))
        .unwrap();
    graph.set_pointer(field_of(&graph, x, "Link"), Some(y)).unwrap();
    let part = graph.create("SpecialItem").unwrap();
    graph.set_value(field_of(&graph, part, "Bonus"), 4).unwrap();
    graph.push_child(field_of(&graph, y, "Parts"), part).unwrap();
    graph.set_pointer(field_of(&graph, part, "Link"), Some(x)).unwrap();

    let settings = graph.child_objects(field_of(&graph, root, "Settings"))[0];
    graph.set_value(field_of(&graph, settings, "Enabled"), false).unwrap();
    (graph, root)
}

fn labels(graph: &ObjectGraph, root: ObjectId) -> Vec<String> {
    graph
        .child_objects(field_of(graph, root, "Items"))
        .into_iter()
        .map(|id| text_of(graph, id, "Label"))
        .collect()
}

// ============================================================================
// Field tokens
// ============================================================================

#[test]
fn every_field_kind_round_trips_byte_for_byte() {
    let (mut graph, root) = populated_graph();
    let mut checked = 0;

    // Children first: reading a child field rebuilds the objects below it.
    for id in graph.descendants(root).into_iter().rev() {
        for handle in graph.field_handles(id) {
            if !graph.field(handle).unwrap().is_writable() {
                continue;
            }
            let token = write_value(&graph, handle).unwrap();
            read_value(&mut graph, handle, &token).unwrap();
            assert_eq!(write_value(&graph, handle).unwrap(), token, "field {handle}");
            checked += 1;
        }
    }
    assert!(checked > 20);
}

#[test]
fn value_tokens_use_portable_forms() {
    let (graph, root) = populated_graph();
    let x = graph.child_objects(field_of(&graph, root, "Items"))[0];

    assert_eq!(write_value(&graph, field_of(&graph, root, "Count")).unwrap(), "12");
    assert_eq!(write_value(&graph, field_of(&graph, x, "Weight")).unwrap(), "0.25");
    assert_eq!(
        write_value(&graph, field_of(&graph, x, "Tags")).unwrap(),
        r#""red" "big box""#
    );
    assert_eq!(write_value(&graph, field_of(&graph, x, "Kind")).unwrap(), "T3");
    assert_eq!(write_value(&graph, field_of(&graph, x, "Link")).unwrap(), "Items 1");
}

#[test]
fn pointer_token_resolves_against_root() {
    let (mut graph, root) = demo_graph();
    let items = graph.child_objects(field_of(&graph, root, "Items"));
    let link = field_of(&graph, items[1], "Link");

    read_value(&mut graph, link, "Items 0").unwrap();
    assert_eq!(graph.pointer(link), Some(items[0]));

    read_value(&mut graph, link, NULL_POINTER_TOKEN).unwrap();
    assert_eq!(graph.pointer(link), None);
    assert_eq!(write_value(&graph, link).unwrap(), NULL_POINTER_TOKEN);
}

#[test]
fn pointer_to_root_is_the_empty_path() {
    let (mut graph, root) = demo_graph();
    let x = graph.child_objects(field_of(&graph, root, "Items"))[0];
    let link = field_of(&graph, x, "Link");

    graph.set_pointer(link, Some(root)).unwrap();
    let token = write_value(&graph, link).unwrap();
    assert_eq!(token, "");

    graph.set_pointer(link, None).unwrap();
    read_value(&mut graph, link, &token).unwrap();
    assert_eq!(graph.pointer(link), Some(root));
    assert_eq!(write_value(&graph, link).unwrap(), token);
}

#[test]
fn null_and_root_pointers_survive_documents() {
    let (mut graph, root) = demo_graph();
    let items = graph.child_objects(field_of(&graph, root, "Items"));
    graph.set_pointer(field_of(&graph, items[0], "Link"), Some(root)).unwrap();

    let x_record = write_object(&graph, items[0]).unwrap();
    let y_record = write_object(&graph, items[1]).unwrap();
    assert_eq!(
        x_record.content("Link"),
        Some(&FieldContent::Pointer(Some(String::new())))
    );
    assert_eq!(y_record.content("Link"), Some(&FieldContent::Pointer(None)));

    let text = document_to_string(&mut graph, root).unwrap();
    let mut fresh = ObjectGraph::new(demo_factory());
    let loaded = document_from_str(&mut fresh, &text).unwrap();
    let loaded_items = fresh.child_objects(field_of(&fresh, loaded, "Items"));
    assert_eq!(fresh.pointer(field_of(&fresh, loaded_items[0], "Link")), Some(loaded));
    assert_eq!(fresh.pointer(field_of(&fresh, loaded_items[1], "Link")), None);
}

#[test]
fn child_array_token_replaces_children() {
    let (mut graph, root) = demo_graph();
    let items = field_of(&graph, root, "Items");
    let token = write_value(&graph, items).unwrap();

    let other = graph.create("Container").unwrap();
    add_item(&mut graph, other, "stale");
    let target = field_of(&graph, other, "Items");
    read_value(&mut graph, target, &token).unwrap();

    assert_eq!(labels(&graph, other), ["X", "Y"]);
    assert_eq!(write_value(&graph, target).unwrap(), token);
    assert_eq!(labels(&graph, root), ["X", "Y"]);
}

// ============================================================================
// Tolerant reading
// ============================================================================

#[test]
fn unreadable_scalars_keep_prior_value() {
    let (mut graph, root) = demo_graph();
    let count = field_of(&graph, root, "Count");
    graph.set_value(count, 3).unwrap();

    read_value(&mut graph, count, "three").unwrap();
    assert_eq!(graph.value(count), Some(&FieldValue::Int(3)));

    let x = graph.child_objects(field_of(&graph, root, "Items"))[0];
    let kind = field_of(&graph, x, "Kind");
    read_value(&mut graph, kind, "T9").unwrap();
    assert_eq!(graph.value(kind), Some(&FieldValue::Enum("T1".into())));
}

#[test]
fn unreadable_list_items_are_skipped() {
    let mut graph = ObjectGraph::new(demo_factory());
    let item = graph.create("Item").unwrap();
    let extra = graph
        .add_field(item, pdm_core::FieldSpec::value("Sizes", Vec::<i64>::new()))
        .unwrap();

    read_value(&mut graph, extra, "1 two 3").unwrap();
    assert_eq!(graph.value(extra), Some(&FieldValue::IntList(vec![1, 3])));

    let tags = field_of(&graph, item, "Tags");
    read_value(&mut graph, tags, r#"bare "quoted one" "unterminated"#).unwrap();
    assert_eq!(
        graph.value(tags),
        Some(&FieldValue::TextList(vec!["bare".into(), "quoted one".into()]))
    );
}

#[test]
fn malformed_child_token_keeps_children_and_warns() {
    let (mut graph, root) = demo_graph();
    let items = field_of(&graph, root, "Items");

    let events = with_captured_events(|| {
        read_value(&mut graph, items, "{not json").unwrap();
    });
    assert_eq!(labels(&graph, root), ["X", "Y"]);
    assert!(events.iter().any(|e| {
        e.level == tracing::Level::WARN
            && e.target == "pdm.io"
            && e.message.contains("value kept")
    }));
}

#[test]
fn records_skip_unknown_classes_and_keywords() {
    let mut graph = ObjectGraph::new(demo_factory());
    let record = ObjectRecord {
        class: "Container".into(),
        fields: vec![
            FieldRecord {
                keyword: "Retired".into(),
                content: FieldContent::Value("1".into()),
            },
            FieldRecord {
                keyword: "Items".into(),
                content: FieldContent::Children(vec![
                    ObjectRecord {
                        class: "Vanished".into(),
                        fields: Vec::new(),
                    },
                    ObjectRecord {
                        class: "Item".into(),
                        fields: vec![
                            FieldRecord {
                                keyword: "Label".into(),
                                content: FieldContent::Value("kept".into()),
                            },
                            FieldRecord {
                                keyword: "Keywords".into(),
                                content: FieldContent::Value(r#""a" "b""#.into()),
                            },
                        ],
                    },
                ]),
            },
        ],
    };

    let events = with_captured_events(|| {
        let root = read_object(&mut graph, &record).unwrap();
        assert_eq!(labels(&graph, root), ["kept"]);
        let item = graph.child_objects(field_of(&graph, root, "Items"))[0];
        assert_eq!(
            graph.value(field_of(&graph, item, "Tags")),
            Some(&FieldValue::TextList(vec!["a".into(), "b".into()]))
        );
    });

    let warnings: Vec<&str> = events
        .iter()
        .filter(|e| e.level == tracing::Level::WARN)
        .map(|e| e.message.as_str())
        .collect();
    assert!(warnings.contains(&"unknown field keyword skipped"));
    assert!(warnings.contains(&"unknown class skipped"));
}

#[test]
fn unknown_root_class_fails() {
    let mut graph = ObjectGraph::new(demo_factory());
    let record = ObjectRecord {
        class: "Vanished".into(),
        fields: Vec::new(),
    };
    assert!(matches!(
        read_object(&mut graph, &record),
        Err(PdmError::UnknownClass(_))
    ));
}

#[test]
fn bookkeeping_fields_are_not_written() {
    let (graph, root) = demo_graph();
    let record = write_object(&graph, root).unwrap();
    assert!(record.content("ItemCount").is_none());
    assert!(record.content("LastChanged").is_none());
    assert!(record.content("Internal").is_some());
}

// ============================================================================
// Copies and documents
// ============================================================================

#[test]
fn copy_object_is_deep_and_keeps_outward_pointers() {
    let (mut graph, root) = populated_graph();
    let items = graph.child_objects(field_of(&graph, root, "Items"));
    let (x, y) = (items[0], items[1]);

    let copy = copy_object(&mut graph, x).unwrap();
    assert_ne!(copy, x);
    assert!(graph.parent(copy).is_none());
    assert_eq!(text_of(&graph, copy, "Label"), "X");
    assert_eq!(graph.pointer(field_of(&graph, copy, "Link")), Some(y));

    graph.set_value(field_of(&graph, copy, "Label"), "changed").unwrap();
    assert_eq!(text_of(&graph, x, "Label"), "X");
}

#[test]
fn reading_a_document_runs_init_hooks() {
    let (mut graph, root) = demo_graph();
    add_item(&mut graph, root, "Z");
    let text = document_to_string(&mut graph, root).unwrap();

    let loaded = document_from_str(&mut graph, &text).unwrap();
    assert_ne!(loaded, root);
    assert_eq!(
        graph.value(field_of(&graph, loaded, "ItemCount")),
        Some(&FieldValue::Int(3))
    );
}

#[test]
fn document_write_read_write_is_identical() {
    let (mut graph, root) = populated_graph();
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.pdm.json");
    let second = dir.path().join("second.pdm.json");

    write_document(&mut graph, root, &first).unwrap();
    let mut fresh = ObjectGraph::new(demo_factory());
    let loaded = read_document(&mut fresh, &first).unwrap();
    write_document(&mut fresh, loaded, &second).unwrap();

    let a = std::fs::read_to_string(&first).unwrap();
    let b = std::fs::read_to_string(&second).unwrap();
    assert_eq!(a, b);
    assert!(a.ends_with('\n'));

    let x = fresh.child_objects(field_of(&fresh, loaded, "Items"))[0];
    let y = fresh.child_objects(field_of(&fresh, loaded, "Items"))[1];
    assert_eq!(fresh.pointer(field_of(&fresh, x, "Link")), Some(y));
}

#[test]
fn document_envelope_is_checked() {
    let (mut graph, root) = demo_graph();
    let text = document_to_string(&mut graph, root).unwrap();
    let mut file: DocumentFile = serde_json::from_str(&text).unwrap();
    assert_eq!(file.format, "pdm");

    file.version = 99;
    let future = serde_json::to_string(&file).unwrap();
    assert!(matches!(
        document_from_str(&mut graph, &future),
        Err(PdmError::UnsupportedDocument { version: 99, .. })
    ));
    assert!(matches!(
        document_from_str(&mut graph, "not json"),
        Err(PdmError::Json(_))
    ));
    assert!(matches!(
        read_document(&mut graph, "/nonexistent/pdm/file.json"),
        Err(PdmError::Io(_))
    ));
}

// ============================================================================
// Properties
// ============================================================================

fn text_item() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just('a'),
            Just('Z'),
            Just(' '),
            Just('"'),
            Just('\\'),
            Just('\t'),
            Just('é'),
        ],
        0..8,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    #[test]
    fn text_lists_round_trip(items in prop::collection::vec(text_item(), 0..6)) {
        let mut graph = ObjectGraph::new(demo_factory());
        let item = graph.create("Item").unwrap();
        let tags = field_of(&graph, item, "Tags");
        graph.set_value(tags, items.clone()).unwrap();

        let token = write_value(&graph, tags).unwrap();
        graph.set_value(tags, Vec::<String>::new()).unwrap();
        read_value(&mut graph, tags, &token).unwrap();
        prop_assert_eq!(graph.value(tags), Some(&FieldValue::TextList(items)));
        prop_assert_eq!(write_value(&graph, tags).unwrap(), token);
    }

    #[test]
    fn doubles_round_trip(value in prop::num::f64::NORMAL | prop::num::f64::ZERO) {
        let mut graph = ObjectGraph::new(demo_factory());
        let item = graph.create("Item").unwrap();
        let weight = field_of(&graph, item, "Weight");
        graph.set_value(weight, value).unwrap();

        let token = write_value(&graph, weight).unwrap();
        read_value(&mut graph, weight, &token).unwrap();
        prop_assert_eq!(graph.value(weight), Some(&FieldValue::Double(value)));
    }

    #[test]
    fn item_collections_round_trip(labels_in in prop::collection::vec("[A-Za-z ]{0,6}", 0..5)) {
        let mut graph = ObjectGraph::new(demo_factory());
        let root = graph.create("Container").unwrap();
        for label in &labels_in {
            add_item(&mut graph, root, label);
        }
        let items = field_of(&graph, root, "Items");
        let token = write_value(&graph, items).unwrap();
        read_value(&mut graph, items, &token).unwrap();
        prop_assert_eq!(labels(&graph, root), labels_in);
        prop_assert_eq!(write_value(&graph, items).unwrap(), token);
    }
}
