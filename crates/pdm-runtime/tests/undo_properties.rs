#![forbid(unsafe_code)]

//! Property tests for the history: inverse law, macro atomicity and
//! selection pruning.

use std::cell::RefCell;
use std::rc::Rc;

use pdm_core::testing::{demo_graph, field_of};
use pdm_core::{FieldHandle, FieldValue, ObjectGraph, ObjectId, write_value};
use pdm_runtime::{
    CommandContext, CommandError, CommandKind, CommandMetadata, CommandResult, EventLog,
    FieldChangeCommand, PdmCommand, PdmContext, PdmEvent, SelectionItem, UiValue,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Edit {
    Name(String),
    Count(i64),
    Weight(usize, f64),
    Tags(usize, Vec<String>),
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        "[a-z ]{0,8}".prop_map(Edit::Name),
        any::<i64>().prop_map(Edit::Count),
        (0..2usize, -1.0e6..1.0e6f64).prop_map(|(i, w)| Edit::Weight(i, w)),
        (0..2usize, prop::collection::vec("[a-z]{1,4}( [a-z]{1,3})?", 0..4))
            .prop_map(|(i, t)| Edit::Tags(i, t)),
    ]
}

fn target(graph: &ObjectGraph, root: ObjectId, edit: &Edit) -> (FieldHandle, FieldValue) {
    let items = graph.child_objects(field_of(graph, root, "Items"));
    match edit {
        Edit::Name(s) => (field_of(graph, root, "Name"), FieldValue::Text(s.clone())),
        Edit::Count(c) => (field_of(graph, root, "Count"), FieldValue::Int(*c)),
        Edit::Weight(i, w) => (field_of(graph, items[*i], "Weight"), FieldValue::Double(*w)),
        Edit::Tags(i, t) => (field_of(graph, items[*i], "Tags"), FieldValue::TextList(t.clone())),
    }
}

/// Tokens of every field of interest, for whole-state comparison.
fn snapshot(cx: &PdmContext) -> Vec<String> {
    let graph = cx.graph();
    let root = cx.root();
    let mut fields = vec![field_of(graph, root, "Name"), field_of(graph, root, "Count")];
    for item in graph.child_objects(field_of(graph, root, "Items")) {
        fields.push(field_of(graph, item, "Weight"));
        fields.push(field_of(graph, item, "Tags"));
    }
    fields
        .into_iter()
        .map(|f| write_value(graph, f).unwrap())
        .collect()
}

proptest! {
    #[test]
    fn undo_all_then_redo_all_restores_state(edits in prop::collection::vec(edit(), 1..12)) {
        let (graph, root) = demo_graph();
        let mut cx = PdmContext::new(graph, root);
        let initial = snapshot(&cx);

        for e in &edits {
            let (field, value) = target(cx.graph(), cx.root(), e);
            cx.change_field_from_ui(field, UiValue::Value(value)).unwrap();
        }
        let applied = snapshot(&cx);

        for _ in &edits {
            prop_assert!(cx.undo().unwrap().is_some());
        }
        prop_assert_eq!(snapshot(&cx), initial);

        for _ in &edits {
            prop_assert!(cx.redo().unwrap().is_some());
        }
        prop_assert_eq!(snapshot(&cx), applied);
    }

    #[test]
    fn macro_undo_is_all_or_nothing(edits in prop::collection::vec(edit(), 1..8)) {
        let (graph, root) = demo_graph();
        let mut cx = PdmContext::new(graph, root);
        let initial = snapshot(&cx);

        let cmds: Vec<Box<dyn PdmCommand>> = edits
            .iter()
            .map(|e| {
                let (field, value) = target(cx.graph(), cx.root(), e);
                Box::new(
                    FieldChangeCommand::for_field(cx.graph(), cx.root(), field, UiValue::Value(value))
                        .unwrap(),
                ) as Box<dyn PdmCommand>
            })
            .collect();
        cx.execute_as_macro("Batch edit", cmds).unwrap();
        let applied = snapshot(&cx);

        prop_assert_eq!(cx.commands().history().undo_depth(), 1);
        cx.undo().unwrap();
        prop_assert_eq!(snapshot(&cx), initial);
        cx.redo().unwrap();
        prop_assert_eq!(snapshot(&cx), applied);
    }

    #[test]
    fn removal_notifies_once_per_level_that_held_the_object(
        levels in prop::collection::vec((0..4i32, 0..3usize), 0..10),
    ) {
        let (graph, root) = demo_graph();
        let mut cx = PdmContext::new(graph, root);
        let items = cx.graph().child_objects(field_of(cx.graph(), cx.root(), "Items"));
        let x = items[0];
        let x_weight = field_of(cx.graph(), x, "Weight");

        let mut holding = std::collections::BTreeSet::new();
        for (level, which) in &levels {
            let item = match which {
                0 => SelectionItem::Object(x),
                1 => SelectionItem::Field(x_weight),
                _ => SelectionItem::Object(items[1]),
            };
            cx.set_selected_items([item], *level);
            if *which < 2 {
                holding.insert(*level);
            } else {
                holding.remove(level);
            }
        }

        let (log, _sub) = EventLog::attach(cx.notifications());
        cx.delete_item(x).unwrap();
        for level in 0..4 {
            let expected = usize::from(holding.contains(&level));
            prop_assert_eq!(log.selection_changes(level), expected);
            prop_assert!(!cx.selected_items(level).iter().any(|i| i.owner() == x));
        }
    }
}

#[test]
fn undo_restores_a_pointer_to_the_root() {
    let (graph, root) = demo_graph();
    let mut cx = PdmContext::new(graph, root);
    let x = cx.graph().child_objects(field_of(cx.graph(), root, "Items"))[0];
    let link = field_of(cx.graph(), x, "Link");
    cx.graph_mut().set_pointer(link, Some(root)).unwrap();

    cx.change_field_from_ui(link, UiValue::token("Items 1")).unwrap();
    let y = cx.graph().child_objects(field_of(cx.graph(), root, "Items"))[1];
    assert_eq!(cx.graph().pointer(link), Some(y));

    cx.undo().unwrap();
    assert_eq!(cx.graph().pointer(link), Some(root));
    cx.redo().unwrap();
    assert_eq!(cx.graph().pointer(link), Some(y));
}

/// Records its calls; redo fails when `fail` is set, undo when
/// `fail_undo` is.
struct Recorded {
    calls: Rc<RefCell<Vec<String>>>,
    name: &'static str,
    fail: bool,
    fail_undo: bool,
    metadata: CommandMetadata,
}

impl Recorded {
    fn boxed(calls: &Rc<RefCell<Vec<String>>>, name: &'static str, fail: bool) -> Box<dyn PdmCommand> {
        Box::new(Self {
            calls: Rc::clone(calls),
            name,
            fail,
            fail_undo: false,
            metadata: CommandMetadata::new(name),
        })
    }

    fn stuck(calls: &Rc<RefCell<Vec<String>>>, name: &'static str) -> Box<dyn PdmCommand> {
        Box::new(Self {
            calls: Rc::clone(calls),
            name,
            fail: false,
            fail_undo: true,
            metadata: CommandMetadata::new(name),
        })
    }
}

impl PdmCommand for Recorded {
    fn redo(&mut self, _cx: &mut CommandContext<'_>) -> CommandResult {
        if self.fail {
            return Err(CommandError::InvalidState(format!("{} refused", self.name)));
        }
        self.calls.borrow_mut().push(format!("redo {}", self.name));
        Ok(())
    }

    fn undo(&mut self, _cx: &mut CommandContext<'_>) -> CommandResult {
        if self.fail_undo {
            return Err(CommandError::InvalidState(format!("{} cannot undo", self.name)));
        }
        self.calls.borrow_mut().push(format!("undo {}", self.name));
        Ok(())
    }

    fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Custom
    }

    fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
    }
}

#[test]
fn macro_runs_in_order_and_undoes_in_reverse() {
    let (graph, root) = demo_graph();
    let mut cx = PdmContext::new(graph, root);
    let calls = Rc::new(RefCell::new(Vec::new()));
    let cmds = vec![
        Recorded::boxed(&calls, "a", false),
        Recorded::boxed(&calls, "b", false),
        Recorded::boxed(&calls, "c", false),
    ];
    cx.execute_as_macro("Recorded", cmds).unwrap();
    cx.undo().unwrap();
    cx.redo().unwrap();
    assert_eq!(
        *calls.borrow(),
        [
            "redo a", "redo b", "redo c", "undo c", "undo b", "undo a", "redo a", "redo b",
            "redo c"
        ]
    );
}

#[test]
fn failing_macro_rolls_back_and_is_not_recorded() {
    let (graph, root) = demo_graph();
    let mut cx = PdmContext::new(graph, root);
    let (log, _sub) = EventLog::attach(cx.notifications());
    let calls = Rc::new(RefCell::new(Vec::new()));
    let cmds = vec![
        Recorded::boxed(&calls, "a", false),
        Recorded::boxed(&calls, "b", false),
        Recorded::boxed(&calls, "c", true),
    ];
    assert!(cx.execute_as_macro("Recorded", cmds).is_err());
    assert_eq!(*calls.borrow(), ["redo a", "redo b", "undo b", "undo a"]);
    assert!(!cx.can_undo());
    assert!(
        !log.events()
            .iter()
            .any(|e| matches!(e, PdmEvent::UndoStackChanged { .. }))
    );
}

#[test]
fn failing_macro_undo_leaves_the_macro_applied() {
    let (graph, root) = demo_graph();
    let mut cx = PdmContext::new(graph, root);
    let calls = Rc::new(RefCell::new(Vec::new()));
    let cmds = vec![
        Recorded::boxed(&calls, "a", false),
        Recorded::stuck(&calls, "b"),
        Recorded::boxed(&calls, "c", false),
    ];
    cx.execute_as_macro("Recorded", cmds).unwrap();

    assert!(matches!(cx.undo(), Err(CommandError::InvalidState(_))));
    assert_eq!(
        *calls.borrow(),
        ["redo a", "redo b", "redo c", "undo c", "redo c"]
    );
    assert!(cx.can_undo());
    assert!(!cx.can_redo());
    assert_eq!(cx.commands().top_name(), Some("Recorded"));
}
