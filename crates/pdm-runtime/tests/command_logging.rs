#![forbid(unsafe_code)]

//! Log events emitted by the command layer.

use std::sync::{Arc, Mutex};

use pdm_core::testing::{demo_graph, field_of};
use pdm_runtime::{PdmContext, UiValue};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;

#[derive(Debug, Clone, PartialEq)]
struct Logged {
    level: tracing::Level,
    target: String,
    message: String,
}

#[derive(Clone, Default)]
struct Recorder {
    events: Arc<Mutex<Vec<Logged>>>,
}

struct Message(String);

impl tracing::field::Visit for Message {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: tracing::Subscriber> Layer<S> for Recorder {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut message = Message(String::new());
        event.record(&mut message);
        self.events.lock().unwrap().push(Logged {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: message.0,
        });
    }
}

fn record<F: FnOnce()>(f: F) -> Vec<Logged> {
    let recorder = Recorder::default();
    let subscriber = tracing_subscriber::registry().with(recorder.clone());
    tracing::subscriber::with_default(subscriber, f);
    let events = recorder.events.lock().unwrap().clone();
    events
}

fn warnings(events: &[Logged]) -> Vec<&Logged> {
    events
        .iter()
        .filter(|e| e.level == tracing::Level::WARN && e.target == "pdm.command")
        .collect()
}

#[test]
fn stale_undo_is_logged_not_raised() {
    let (graph, root) = demo_graph();
    let mut cx = PdmContext::new(graph, root);
    let y = cx.graph().child_objects(field_of(cx.graph(), root, "Items"))[1];
    let label = field_of(cx.graph(), y, "Label");
    cx.change_field_from_ui(label, UiValue::value("renamed")).unwrap();
    cx.graph_mut().destroy(y).unwrap();

    let events = record(|| {
        assert!(cx.undo().unwrap().is_some());
    });
    let warned = warnings(&events);
    assert_eq!(warned.len(), 1);
    assert_eq!(warned[0].message, "stale reference, step skipped");
}

#[test]
fn healthy_commands_do_not_warn() {
    let (graph, root) = demo_graph();
    let mut cx = PdmContext::new(graph, root);
    let name = field_of(cx.graph(), root, "Name");

    let events = record(|| {
        cx.change_field_from_ui(name, UiValue::value("ok")).unwrap();
        cx.undo().unwrap();
        cx.redo().unwrap();
    });
    assert!(warnings(&events).is_empty());
    assert!(
        events
            .iter()
            .any(|e| e.target == "pdm.command" && e.message == "command recorded")
    );
}

#[test]
fn macro_boundaries_are_logged() {
    let (graph, root) = demo_graph();
    let mut cx = PdmContext::new(graph, root);
    let count = field_of(cx.graph(), root, "Count");

    let events = record(|| {
        cx.begin_macro("Batch edit");
        cx.change_field_from_ui(count, UiValue::value(2)).unwrap();
        cx.end_macro().unwrap();
    });
    let infos: Vec<&str> = events
        .iter()
        .filter(|e| e.level == tracing::Level::INFO)
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(infos, ["macro started", "macro finished"]);
}
