mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::{caret, point, range, table_doc, table_editor};
use plate_core::{
    Editor, Op, PathError, PlatePlugin, PluginRegistry, Selection, SelectionHook, Transaction,
};
use pretty_assertions::assert_eq;

struct CountingHook(Arc<AtomicUsize>);

impl SelectionHook for CountingHook {
    fn id(&self) -> &'static str {
        "test.counting"
    }

    fn normalize_selection(
        &self,
        _editor: &Editor,
        _selection: &Selection,
    ) -> Result<Option<Selection>, PathError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}

struct CountingPlugin(Arc<AtomicUsize>);

impl PlatePlugin for CountingPlugin {
    fn id(&self) -> &'static str {
        "test.counting"
    }

    fn selection_hooks(&self) -> Vec<Box<dyn SelectionHook>> {
        vec![Box::new(CountingHook(self.0.clone()))]
    }
}

fn counting_editor() -> (Editor, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = PluginRegistry::tables();
    registry
        .register_plugin(Box::new(CountingPlugin(calls.clone())))
        .unwrap();
    let editor = Editor::new(table_doc(), Some(caret(&[0, 0], 0)), registry);
    (editor, calls)
}

#[test]
fn content_only_batches_keep_the_log() {
    let mut editor = table_editor(table_doc(), caret(&[2, 0], 0));

    editor
        .apply(Transaction::new(vec![Op::InsertText {
            path: vec![2, 0],
            offset: 5,
            text: "!".to_string(),
        }]))
        .unwrap();

    assert_eq!(
        editor.operations(),
        &[Op::InsertText {
            path: vec![2, 0],
            offset: 5,
            text: "!".to_string(),
        }]
    );
    assert!(!editor.dispatch_changes().unwrap());
    assert_eq!(editor.take_operations().len(), 1);
    assert!(editor.operations().is_empty());
}

#[test]
fn selection_batches_drain_the_log() {
    let mut editor = table_editor(table_doc(), caret(&[0, 0], 0));

    editor
        .apply(
            Transaction::new(vec![Op::InsertText {
                path: vec![0, 0],
                offset: 0,
                text: ">".to_string(),
            }])
            .selection_after(caret(&[0, 0], 3)),
        )
        .unwrap();

    assert!(editor.operations().is_empty());
    assert_eq!(editor.selection(), Some(&caret(&[0, 0], 3)));
    assert_eq!(leaf_or_panic(&editor, &[0, 0]), ">intro");
}

fn leaf_or_panic<'a>(editor: &'a Editor, path: &[usize]) -> &'a str {
    &editor.text(path).unwrap().text
}

#[test]
fn hooks_run_once_per_batch() {
    let (mut editor, calls) = counting_editor();

    editor
        .apply(Transaction::new(vec![
            Op::SetSelection {
                before: None,
                after: Some(caret(&[0, 0], 1)),
            },
            Op::SetSelection {
                before: None,
                after: Some(caret(&[0, 0], 2)),
            },
        ]))
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(editor.selection(), Some(&caret(&[0, 0], 2)));

    editor.select(caret(&[2, 0], 1)).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // Re-selecting the current selection logs nothing and dispatches nothing.
    editor.select(caret(&[2, 0], 1)).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn normalized_selection_is_committed_without_logging() {
    let (mut editor, calls) = counting_editor();

    editor
        .select(range(point(&[1, 0, 1, 0], 0), point(&[2, 0], 0)))
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(editor.operations().is_empty());
    assert_eq!(
        editor.selection(),
        Some(&range(point(&[0, 0], 5), point(&[2, 0], 0)))
    );
    assert!(!editor.dispatch_changes().unwrap());
}

#[test]
fn guarded_edits_that_do_nothing_do_not_dispatch() {
    let (mut editor, calls) = counting_editor();
    editor.select(caret(&[1, 0, 0, 0], 0)).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    editor.insert_break().unwrap();
    editor.delete_backward(Default::default()).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(editor.operations().is_empty());
}

#[test]
fn deselect_clears_the_selection() {
    let (mut editor, calls) = counting_editor();

    editor.deselect().unwrap();

    assert_eq!(editor.selection(), None);
    assert!(editor.operations().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // Nothing to normalize without a selection.
    editor.insert_text("x").unwrap();
    editor.insert_break().unwrap();
    assert_eq!(leaf_or_panic(&editor, &[0, 0]), "intro");
}

#[test]
fn operations_serialize_with_an_op_tag() {
    let op = Op::SetSelection {
        before: None,
        after: Some(caret(&[0, 0], 1)),
    };
    let value = serde_json::to_value(&op).unwrap();
    assert_eq!(value["op"], "set_selection");
    assert!(op.is_selection_change());

    let merge: Op = serde_json::from_value(serde_json::json!({
        "op": "merge_text",
        "path": [0, 1],
    }))
    .unwrap();
    assert_eq!(merge, Op::MergeText { path: vec![0, 1] });
    assert!(!merge.is_selection_change());
}
