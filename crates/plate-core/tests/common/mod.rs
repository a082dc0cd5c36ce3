#![allow(dead_code)]

use plate_core::{
    Document, Editor, ElementKind, Node, PluginRegistry, Point, Selection, table_cell_node,
};

pub fn row(cells: &[&str]) -> Node {
    Node::element(
        ElementKind::TableRow,
        cells.iter().map(|text| table_cell_node(*text)).collect(),
    )
}

pub fn table(rows: &[&[&str]]) -> Node {
    Node::element(ElementKind::Table, rows.iter().map(|cells| row(cells)).collect())
}

/// `[paragraph "intro", table [["a", "b"], ["c", "d"]], paragraph "outro"]`
///
/// Leaves: intro `[0, 0]`, a `[1, 0, 0, 0]`, b `[1, 0, 1, 0]`,
/// c `[1, 1, 0, 0]`, d `[1, 1, 1, 0]`, outro `[2, 0]`.
pub fn table_doc() -> Document {
    Document::new(vec![
        Node::paragraph("intro"),
        table(&[&["a", "b"], &["c", "d"]]),
        Node::paragraph("outro"),
    ])
}

pub fn point(path: &[usize], offset: usize) -> Point {
    Point::new(path.to_vec(), offset)
}

pub fn caret(path: &[usize], offset: usize) -> Selection {
    Selection::collapsed(point(path, offset))
}

pub fn range(anchor: Point, focus: Point) -> Selection {
    Selection::new(anchor, focus)
}

pub fn table_editor(doc: Document, selection: Selection) -> Editor {
    Editor::new(doc, Some(selection), PluginRegistry::tables())
}

pub fn core_editor(doc: Document, selection: Selection) -> Editor {
    Editor::new(doc, Some(selection), PluginRegistry::core())
}

pub fn leaf_text<'a>(editor: &'a Editor, path: &[usize]) -> &'a str {
    &editor.text(path).unwrap().text
}
