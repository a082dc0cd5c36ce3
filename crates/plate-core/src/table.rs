use serde_json::Value;

use crate::classify::{enclosing_cell, enclosing_table, is_table};
use crate::core::{Document, Editor, ElementKind, ElementNode, Node, PathError, Point, Selection};
use crate::ops::{Op, Transaction};
use crate::path::Path;
use crate::plugin::{
    ChildConstraint, CommandError, CommandSpec, EditGuard, EditIntent, NodeSpec, NormalizePass,
    PlatePlugin, PluginRegistry, QueryError, QuerySpec, SelectionHook, Verdict,
};

const MAX_TABLE_DIMENSION: u64 = 32;

pub struct TablePlugin;

impl PlatePlugin for TablePlugin {
    fn id(&self) -> &'static str {
        "table"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec {
                kind: ElementKind::Table,
                children: ChildConstraint::BlockOnly,
            },
            NodeSpec {
                kind: ElementKind::TableRow,
                children: ChildConstraint::BlockOnly,
            },
            NodeSpec {
                kind: ElementKind::TableCell,
                children: ChildConstraint::InlineOnly,
            },
        ]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(NormalizeTableStructure)]
    }

    fn edit_guards(&self) -> Vec<Box<dyn EditGuard>> {
        vec![Box::new(TableEditGuard)]
    }

    fn selection_hooks(&self) -> Vec<Box<dyn SelectionHook>> {
        vec![Box::new(TableSelectionNormalizer)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("table.insert", "Insert table", |editor, args| {
                let rows = dimension_arg(args.as_ref(), "rows");
                let cols = dimension_arg(args.as_ref(), "cols");

                let tx = insert_table(editor, rows, cols)
                    .map_err(|e| CommandError::new(format!("Failed to insert table: {e}")))?;
                editor
                    .apply(tx)
                    .map_err(|e| CommandError::new(format!("Failed to insert table: {e}")))
            })
            .description("Insert a table after the current block.")
            .keywords(["table", "grid"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("table.is_active", |editor, _args| {
                let Some(selection) = editor.selection() else {
                    return Ok(Value::Bool(false));
                };
                let active = enclosing_table(editor.doc(), &selection.focus.path)
                    .map_err(|e| QueryError::new(e.to_string()))?
                    .is_some();
                Ok(Value::Bool(active))
            }),
            QuerySpec::new("table.cell_position", |editor, _args| {
                let Some(selection) = editor.selection() else {
                    return Ok(Value::Null);
                };
                let cell = enclosing_cell(editor.doc(), &selection.focus.path)
                    .map_err(|e| QueryError::new(e.to_string()))?;
                Ok(match cell {
                    Some((_, path)) if path.len() >= 2 => serde_json::json!({
                        "row": path[path.len() - 2],
                        "col": path[path.len() - 1],
                    }),
                    _ => Value::Null,
                })
            }),
        ]
    }
}

fn dimension_arg(args: Option<&Value>, key: &str) -> usize {
    args.and_then(|v| v.get(key))
        .and_then(Value::as_u64)
        .unwrap_or(2)
        .clamp(1, MAX_TABLE_DIMENSION) as usize
}

/// Keeps every table rectangular: no empty tables or rows, and short rows are
/// padded with empty cells.
struct NormalizeTableStructure;

impl NormalizePass for NormalizeTableStructure {
    fn id(&self) -> &'static str {
        "table.normalize_structure"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();

        fn normalize_table(table: &ElementNode, path: &[usize], ops: &mut Vec<Op>) {
            if table.children.is_empty() {
                ops.push(Op::InsertNode {
                    path: crate::path::child(path, 0),
                    node: table_row_node(1),
                });
                return;
            }

            let rows = || {
                table.children.iter().enumerate().filter_map(|(ix, node)| match node {
                    Node::Element(row) if row.kind == ElementKind::TableRow => Some((ix, row)),
                    _ => None,
                })
            };

            let max_cols = rows()
                .map(|(_, row)| row.children.len())
                .max()
                .unwrap_or(0)
                .max(1);

            for (row_ix, row) in rows() {
                let row_path = crate::path::child(path, row_ix);
                for col_ix in row.children.len()..max_cols {
                    ops.push(Op::InsertNode {
                        path: crate::path::child(&row_path, col_ix),
                        node: table_cell_node(""),
                    });
                }
            }
        }

        fn walk(nodes: &[Node], path: &mut Vec<usize>, ops: &mut Vec<Op>) {
            for (ix, node) in nodes.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);

                if is_table(&el.kind) {
                    normalize_table(el, path, ops);
                }

                walk(&el.children, path, ops);
                path.pop();
            }
        }

        walk(&doc.children, &mut Vec::new(), &mut ops);
        ops
    }
}

/// Vetoes edits that would merge neighbouring cells or split a cell.
pub struct TableEditGuard;

impl EditGuard for TableEditGuard {
    fn id(&self) -> &'static str {
        "table.edit_guard"
    }

    fn check(&self, editor: &Editor, intent: &EditIntent) -> Result<Verdict, PathError> {
        let Some(selection) = editor.selection() else {
            return Ok(Verdict::Proceed);
        };

        match intent {
            EditIntent::DeleteBackward(_) | EditIntent::DeleteForward(_) => {
                if !selection.is_collapsed() {
                    return Ok(Verdict::Proceed);
                }
                let Some((_, cell_path)) = enclosing_cell(editor.doc(), &selection.anchor.path)?
                else {
                    return Ok(Verdict::Proceed);
                };
                let boundary = if matches!(intent, EditIntent::DeleteBackward(_)) {
                    editor.start(&cell_path)?
                } else {
                    editor.end(&cell_path)?
                };
                if selection.anchor == boundary {
                    return Ok(Verdict::Suppress);
                }
                Ok(Verdict::Proceed)
            }
            EditIntent::InsertBreak => {
                let table = editor.first_in_selection(|node| node.kind().is_some_and(is_table));
                if table.is_some() {
                    return Ok(Verdict::Suppress);
                }
                Ok(Verdict::Proceed)
            }
        }
    }
}

/// Pulls selection endpoints out of a table whenever the two endpoints do not
/// share the same table.
pub struct TableSelectionNormalizer;

impl SelectionHook for TableSelectionNormalizer {
    fn id(&self) -> &'static str {
        "table.selection_normalizer"
    }

    fn normalize_selection(
        &self,
        editor: &Editor,
        selection: &Selection,
    ) -> Result<Option<Selection>, PathError> {
        let doc = editor.doc();
        let anchor_table = enclosing_table(doc, &selection.anchor.path)?.map(|(_, path)| path);
        let focus_table = enclosing_table(doc, &selection.focus.path)?.map(|(_, path)| path);

        match (&anchor_table, &focus_table) {
            (None, None) => return Ok(None),
            (Some(a), Some(b)) if a == b => return Ok(None),
            _ => {}
        }

        let forward = selection.is_forward();
        let mut normalized = selection.clone();

        if let Some(table) = &anchor_table {
            let edge = if forward { Edge::Before } else { Edge::After };
            if let Some(point) = boundary(editor, table, edge, "anchor")? {
                normalized.anchor = point;
            }
        }

        if let Some(table) = &focus_table {
            let edge = if forward { Edge::After } else { Edge::Before };
            if let Some(point) = boundary(editor, table, edge, "focus")? {
                normalized.focus = point;
            }
        }

        if normalized == *selection {
            return Ok(None);
        }
        Ok(Some(normalized))
    }
}

#[derive(Debug, Clone, Copy)]
enum Edge {
    Before,
    After,
}

fn boundary(
    editor: &Editor,
    table: &[usize],
    edge: Edge,
    endpoint: &'static str,
) -> Result<Option<Point>, PathError> {
    let point = match edge {
        Edge::Before => editor.before(table)?,
        Edge::After => editor.after(table)?,
    };
    match &point {
        Some(point) => tracing::debug!(
            endpoint,
            ?edge,
            table = ?table,
            to = ?point,
            "moved selection endpoint out of table"
        ),
        None => tracing::warn!(
            endpoint,
            ?edge,
            table = ?table,
            "no point outside table at document edge; endpoint left in place"
        ),
    }
    Ok(point)
}

fn insert_table(editor: &Editor, rows: usize, cols: usize) -> Result<Transaction, PathError> {
    let insert_at = match editor.selection() {
        Some(selection) => {
            let top = *selection.focus.path.first().ok_or(PathError::Empty)?;
            top + 1
        }
        None => editor.doc().children.len(),
    };

    let table_path: Path = vec![insert_at];
    let mut caret = table_path.clone();
    caret.extend([0, 0, 0]);

    Ok(Transaction::new(vec![
        Op::InsertNode {
            path: table_path,
            node: table_node(rows, cols),
        },
        Op::InsertNode {
            path: vec![insert_at + 1],
            node: Node::paragraph(""),
        },
    ])
    .selection_after(Selection::collapsed(Point::new(caret, 0)))
    .source("command:table.insert"))
}

pub fn table_cell_node(text: impl Into<String>) -> Node {
    Node::element(ElementKind::TableCell, vec![Node::text(text)])
}

pub fn table_row_node(cols: usize) -> Node {
    Node::element(
        ElementKind::TableRow,
        (0..cols.max(1)).map(|_| table_cell_node("")).collect(),
    )
}

pub fn table_node(rows: usize, cols: usize) -> Node {
    Node::element(
        ElementKind::Table,
        (0..rows.max(1)).map(|_| table_row_node(cols)).collect(),
    )
}
