mod common;

use common::{caret, core_editor, leaf_text, point, range, table, table_doc, table_editor};
use plate_core::{
    Document, EditGuard, EditIntent, ElementKind, Node, TableEditGuard, TextUnit, Verdict,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

#[test]
fn backward_delete_at_cell_start_is_a_no_op() {
    let mut editor = table_editor(table_doc(), caret(&[1, 0, 1, 0], 0));
    let before = editor.doc().clone();

    editor.delete_backward(TextUnit::Character).unwrap();

    assert_eq!(editor.doc(), &before);
    assert_eq!(editor.selection(), Some(&caret(&[1, 0, 1, 0], 0)));

    let mut unguarded = core_editor(table_doc(), caret(&[1, 0, 1, 0], 0));
    unguarded.delete_backward(TextUnit::Character).unwrap();
    assert_ne!(unguarded.doc(), &before);
}

#[rstest]
#[case::second_cell(vec![1, 0, 1, 0])]
#[case::second_row(vec![1, 1, 0, 0])]
#[case::last_cell(vec![1, 1, 1, 0])]
fn backward_delete_never_merges_cells(#[case] leaf: Vec<usize>) {
    let mut editor = table_editor(table_doc(), caret(&leaf, 0));
    let before = editor.doc().clone();

    for unit in [TextUnit::Character, TextUnit::Word, TextUnit::Block] {
        editor.delete_backward(unit).unwrap();
    }

    assert_eq!(editor.doc(), &before);
}

#[test]
fn backward_delete_inside_a_cell_delegates() {
    let doc = Document::new(vec![table(&[&["ab", "cd"]])]);
    let mut editor = table_editor(doc, caret(&[0, 0, 0, 0], 1));

    editor.delete_backward(TextUnit::Character).unwrap();

    assert_eq!(leaf_text(&editor, &[0, 0, 0, 0]), "b");
    assert_eq!(editor.selection(), Some(&caret(&[0, 0, 0, 0], 0)));
    assert_eq!(leaf_text(&editor, &[0, 0, 1, 0]), "cd");
}

#[test]
fn backward_delete_at_cell_end_removes_the_last_character() {
    let mut editor = table_editor(table_doc(), caret(&[1, 0, 0, 0], 1));

    editor.delete_backward(TextUnit::Character).unwrap();

    assert_eq!(leaf_text(&editor, &[1, 0, 0, 0]), "");
    assert_eq!(editor.selection(), Some(&caret(&[1, 0, 0, 0], 0)));

    // The now empty cell still guards its start.
    let before = editor.doc().clone();
    editor.delete_backward(TextUnit::Character).unwrap();
    assert_eq!(editor.doc(), &before);
}

#[test]
fn forward_delete_at_cell_end_is_a_no_op() {
    let mut editor = table_editor(table_doc(), caret(&[1, 0, 0, 0], 1));
    let before = editor.doc().clone();

    editor.delete_forward(TextUnit::Character).unwrap();

    assert_eq!(editor.doc(), &before);
}

#[test]
fn forward_delete_inside_a_cell_delegates() {
    let mut editor = table_editor(table_doc(), caret(&[1, 1, 0, 0], 0));

    editor.delete_forward(TextUnit::Character).unwrap();

    assert_eq!(leaf_text(&editor, &[1, 1, 0, 0]), "");
    assert_eq!(leaf_text(&editor, &[1, 1, 1, 0]), "d");
}

#[test]
fn expanded_selection_inside_a_cell_is_not_guarded() {
    let doc = Document::new(vec![table(&[&["abc"]]), Node::paragraph("")]);
    let mut editor = table_editor(doc, caret(&[1, 0], 0));
    editor
        .select(range(point(&[0, 0, 0, 0], 0), point(&[0, 0, 0, 0], 2)))
        .unwrap();

    editor.delete_backward(TextUnit::Character).unwrap();

    assert_eq!(leaf_text(&editor, &[0, 0, 0, 0]), "c");
    assert_eq!(editor.selection(), Some(&caret(&[0, 0, 0, 0], 0)));
}

#[rstest]
#[case::cell_start(vec![1, 0, 0, 0], 0)]
#[case::cell_end(vec![1, 0, 0, 0], 1)]
#[case::other_cell(vec![1, 1, 1, 0], 0)]
fn break_inside_a_table_is_a_no_op(#[case] leaf: Vec<usize>, #[case] offset: usize) {
    let mut editor = table_editor(table_doc(), caret(&leaf, offset));
    let before = editor.doc().clone();

    editor.insert_break().unwrap();

    assert_eq!(editor.doc().node_count(), before.node_count());
    assert_eq!(editor.doc(), &before);
}

#[test]
fn break_outside_a_table_creates_a_paragraph() {
    let mut editor = table_editor(table_doc(), caret(&[0, 0], 2));
    let blocks = editor.doc().children.len();

    editor.insert_break().unwrap();

    assert_eq!(editor.doc().children.len(), blocks + 1);
    assert_eq!(leaf_text(&editor, &[0, 0]), "in");
    assert_eq!(leaf_text(&editor, &[1, 0]), "tro");
    assert!(editor.doc().children[1].is_kind(&ElementKind::Paragraph));
    assert_eq!(editor.selection(), Some(&caret(&[1, 0], 0)));
}

#[test]
fn break_with_a_selection_spanning_a_table_is_a_no_op() {
    let mut editor = table_editor(table_doc(), caret(&[0, 0], 0));
    editor
        .select(range(point(&[0, 0], 1), point(&[1, 0, 0, 0], 1)))
        .unwrap();
    // The normalizer moved the focus past the table; the table is still
    // covered by the selection.
    assert_eq!(
        editor.selection(),
        Some(&range(point(&[0, 0], 1), point(&[2, 0], 0)))
    );
    let before = editor.doc().clone();

    editor.insert_break().unwrap();

    assert_eq!(editor.doc(), &before);
}

#[test]
fn word_deletes_outside_tables_are_untouched() {
    let doc = Document::new(vec![Node::paragraph("hello big world"), table(&[&["x"]])]);
    let mut editor = table_editor(doc, caret(&[0, 0], 15));

    editor.delete_backward(TextUnit::Word).unwrap();

    assert_eq!(leaf_text(&editor, &[0, 0]), "hello big ");
    assert_eq!(editor.selection(), Some(&caret(&[0, 0], 10)));
}

#[test]
fn paragraph_after_a_table_does_not_merge_into_it() {
    let mut editor = table_editor(table_doc(), caret(&[2, 0], 0));
    let before = editor.doc().clone();

    editor.delete_backward(TextUnit::Character).unwrap();

    assert_eq!(editor.doc(), &before);
}

fn row_texts(editor: &plate_core::Editor, table: usize, row: usize) -> Vec<String> {
    let Node::Element(table) = &editor.doc().children[table] else {
        panic!("expected table");
    };
    let Node::Element(row) = &table.children[row] else {
        panic!("expected row");
    };
    row.children
        .iter()
        .map(|cell| match cell {
            Node::Element(cell) => cell
                .children
                .iter()
                .filter_map(|leaf| match leaf {
                    Node::Text(t) => Some(t.text.as_str()),
                    Node::Element(_) => None,
                })
                .collect(),
            Node::Text(_) => panic!("expected cell"),
        })
        .collect()
}

#[rstest]
#[case::backward(TextUnit::Character, true)]
#[case::forward(TextUnit::Character, false)]
#[case::word(TextUnit::Word, true)]
fn deleting_across_cells_of_one_row_keeps_the_columns(
    #[case] unit: TextUnit,
    #[case] backward: bool,
) {
    let doc = Document::new(vec![
        Node::paragraph("intro"),
        table(&[&["a1", "b1", "c1"], &["a2", "b2", "c2"]]),
    ]);
    let mut editor = table_editor(doc, caret(&[0, 0], 0));
    editor
        .select(range(point(&[1, 0, 0, 0], 1), point(&[1, 0, 1, 0], 1)))
        .unwrap();
    assert_eq!(
        editor.selection(),
        Some(&range(point(&[1, 0, 0, 0], 1), point(&[1, 0, 1, 0], 1)))
    );

    if backward {
        editor.delete_backward(unit).unwrap();
    } else {
        editor.delete_forward(unit).unwrap();
    }

    assert_eq!(row_texts(&editor, 1, 0), vec!["a", "1", "c1"]);
    assert_eq!(row_texts(&editor, 1, 1), vec!["a2", "b2", "c2"]);
    assert_eq!(editor.selection(), Some(&caret(&[1, 0, 0, 0], 1)));
}

#[test]
fn without_the_guard_adjacent_cells_merge() {
    let mut editor = core_editor(table_doc(), caret(&[1, 0, 1, 0], 0));

    editor.delete_backward(TextUnit::Character).unwrap();

    let Node::Element(table) = &editor.doc().children[1] else {
        panic!("expected table");
    };
    let Node::Element(first_row) = &table.children[0] else {
        panic!("expected row");
    };
    assert_eq!(first_row.children.len(), 1);
    assert_eq!(leaf_text(&editor, &[1, 0, 0, 0]), "ab");
    assert_eq!(editor.selection(), Some(&caret(&[1, 0, 0, 0], 1)));
}

#[test]
fn guard_verdicts_by_intent() {
    let editor = table_editor(table_doc(), caret(&[1, 0, 1, 0], 0));
    let guard = TableEditGuard;

    let verdict = |intent| guard.check(&editor, &intent).unwrap();
    assert_eq!(verdict(EditIntent::DeleteBackward(TextUnit::Character)), Verdict::Suppress);
    assert_eq!(verdict(EditIntent::DeleteForward(TextUnit::Character)), Verdict::Proceed);
    assert_eq!(verdict(EditIntent::InsertBreak), Verdict::Suppress);

    let outside = table_editor(table_doc(), caret(&[2, 0], 0));
    for intent in [
        EditIntent::DeleteBackward(TextUnit::Word),
        EditIntent::DeleteForward(TextUnit::Line),
        EditIntent::InsertBreak,
    ] {
        assert_eq!(guard.check(&outside, &intent).unwrap(), Verdict::Proceed);
    }
}

#[test]
fn guarded_commands_report_success_when_suppressed() {
    let mut editor = table_editor(table_doc(), caret(&[1, 0, 0, 0], 0));
    let before = editor.doc().clone();

    editor
        .run_command("core.delete_backward", Some(json!({ "unit": "word" })))
        .unwrap();
    editor.run_command("core.insert_break", None).unwrap();

    assert_eq!(editor.doc(), &before);

    let err = editor
        .run_command("core.delete_forward", Some(json!({ "unit": "sentence" })))
        .unwrap_err();
    assert!(err.message().starts_with("Invalid unit"));
}
