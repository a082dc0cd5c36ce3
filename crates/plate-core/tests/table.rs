mod common;

use common::{caret, row, table, table_doc, table_editor};
use plate_core::{
    Document, Editor, ElementKind, ElementNode, Node, PluginRegistry, table_cell_node,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

fn element(node: &Node) -> &ElementNode {
    match node {
        Node::Element(el) => el,
        Node::Text(_) => panic!("expected element"),
    }
}

fn row_lengths(table: &Node) -> Vec<usize> {
    element(table)
        .children
        .iter()
        .map(|row| element(row).children.len())
        .collect()
}

#[test]
fn table_insert_creates_rectangular_table_and_moves_selection() {
    let mut editor = Editor::with_table_plugins();

    editor
        .run_command("table.insert", Some(json!({ "rows": 2, "cols": 3 })))
        .unwrap();

    assert_eq!(editor.doc().children.len(), 3);
    let table = &editor.doc().children[1];
    assert!(table.is_kind(&ElementKind::Table));
    assert_eq!(row_lengths(table), vec![3, 3]);
    for row in &element(table).children {
        assert!(row.is_kind(&ElementKind::TableRow));
        for cell in &element(row).children {
            assert!(cell.is_kind(&ElementKind::TableCell));
            assert_eq!(element(cell).children, vec![Node::text("")]);
        }
    }
    assert!(editor.doc().children[2].is_kind(&ElementKind::Paragraph));
    assert_eq!(editor.selection(), Some(&caret(&[1, 0, 0, 0], 0)));
    assert!(editor.operations().is_empty());
}

#[rstest]
#[case::defaults(None, vec![2, 2])]
#[case::too_small(Some(json!({ "rows": 0, "cols": 0 })), vec![1])]
#[case::too_large(Some(json!({ "rows": 1, "cols": 500 })), vec![32])]
fn table_insert_clamps_dimensions(#[case] args: Option<Value>, #[case] rows: Vec<usize>) {
    let mut editor = Editor::with_table_plugins();

    editor.run_command("table.insert", args).unwrap();

    assert_eq!(row_lengths(&editor.doc().children[1]), rows);
}

#[test]
fn table_insert_inside_a_table_goes_after_it() {
    let mut editor = table_editor(table_doc(), caret(&[1, 1, 1, 0], 1));

    editor
        .run_command("table.insert", Some(json!({ "rows": 1, "cols": 1 })))
        .unwrap();

    assert_eq!(editor.doc().children.len(), 5);
    assert!(editor.doc().children[2].is_kind(&ElementKind::Table));
    assert_eq!(row_lengths(&editor.doc().children[1]), vec![2, 2]);
    assert_eq!(editor.selection(), Some(&caret(&[2, 0, 0, 0], 0)));
}

#[test]
fn ragged_tables_are_padded() {
    let ragged = Node::element(
        ElementKind::Table,
        vec![
            row(&["a", "b", "c"]),
            row(&["d"]),
            Node::element(ElementKind::TableRow, vec![]),
        ],
    );
    let editor = table_editor(Document::new(vec![ragged]), caret(&[0, 0, 0, 0], 0));

    let table = &editor.doc().children[0];
    assert_eq!(row_lengths(table), vec![3, 3, 3]);
    assert_eq!(element(&element(table).children[1]).children[1], table_cell_node(""));
}

#[test]
fn empty_tables_and_cells_are_filled() {
    let mut doc = Document::new(vec![
        Node::element(ElementKind::Table, vec![]),
        table(&[&["x"]]),
    ]);
    if let Node::Element(table) = &mut doc.children[1] {
        if let Node::Element(row) = &mut table.children[0] {
            row.children[0] = Node::element(ElementKind::TableCell, vec![]);
        }
    }

    let editor = table_editor(doc, caret(&[0, 0, 0, 0], 0));

    assert_eq!(editor.doc().children[0], table(&[&[""]]));
    assert_eq!(editor.doc().children[1], table(&[&[""]]));
    assert_eq!(editor.selection(), Some(&caret(&[0, 0, 0, 0], 0)));
}

#[test]
fn table_queries_follow_the_focus() {
    let mut editor = table_editor(table_doc(), caret(&[1, 1, 0, 0], 0));

    assert_eq!(editor.run_query::<bool>("table.is_active", None).unwrap(), true);
    assert_eq!(
        editor.run_query_json("table.cell_position", None).unwrap(),
        json!({ "row": 1, "col": 0 })
    );

    editor.select(caret(&[2, 0], 1)).unwrap();
    assert_eq!(editor.run_query::<bool>("table.is_active", None).unwrap(), false);
    assert_eq!(
        editor.run_query_json("table.cell_position", None).unwrap(),
        Value::Null
    );

    let err = editor.run_query_json("table.nope", None).unwrap_err();
    assert_eq!(err.message(), "Unknown query: table.nope");
}

#[test]
fn table_commands_need_the_table_plugin() {
    let mut editor = Editor::new(table_doc(), Some(caret(&[0, 0], 0)), PluginRegistry::core());

    assert!(editor.run_command("table.insert", None).is_err());
    assert!(editor.run_query_json("table.is_active", None).is_err());
    assert!(!PluginRegistry::core().is_known_kind(&ElementKind::Table));
    assert!(PluginRegistry::tables().is_known_kind(&ElementKind::TableCell));
}
