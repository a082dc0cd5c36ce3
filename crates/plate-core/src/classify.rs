use crate::core::{Document, ElementKind, PathError};
use crate::tree::{Ancestor, AncestorEntry, Direction, ancestors};

/// Walks the ancestors of `path` in `direction` and returns the first one
/// matching `predicate`.
///
/// `Direction::Reverse` yields the nearest match, so a cell inside a table
/// nested in another table's cell resolves to the inner table.
pub fn find_ancestor<'a>(
    doc: &'a Document,
    path: &[usize],
    predicate: impl Fn(&Ancestor<'a>) -> bool,
    direction: Direction,
) -> Result<Option<AncestorEntry<'a>>, PathError> {
    Ok(ancestors(doc, path, direction)?.find(|(node, _)| predicate(node)))
}

pub fn is_table(kind: &ElementKind) -> bool {
    match kind {
        ElementKind::Table => true,
        ElementKind::Document
        | ElementKind::Paragraph
        | ElementKind::TableRow
        | ElementKind::TableCell
        | ElementKind::Custom(_) => false,
    }
}

pub fn is_table_cell(kind: &ElementKind) -> bool {
    match kind {
        ElementKind::TableCell => true,
        ElementKind::Document
        | ElementKind::Paragraph
        | ElementKind::Table
        | ElementKind::TableRow
        | ElementKind::Custom(_) => false,
    }
}

pub fn enclosing_table<'a>(
    doc: &'a Document,
    path: &[usize],
) -> Result<Option<AncestorEntry<'a>>, PathError> {
    find_ancestor(doc, path, |node| is_table(node.kind()), Direction::Reverse)
}

pub fn enclosing_cell<'a>(
    doc: &'a Document,
    path: &[usize],
) -> Result<Option<AncestorEntry<'a>>, PathError> {
    find_ancestor(doc, path, |node| is_table_cell(node.kind()), Direction::Reverse)
}
