//! Base editing transforms. Each builds a [`Transaction`] against the current
//! state; [`Editor`] applies it and runs the change dispatcher afterwards.
//! Plugins veto edits through [`EditGuard`](crate::EditGuard) before any
//! transaction is built.

use serde::{Deserialize, Serialize};

use crate::classify::enclosing_cell;
use crate::core::{
    ApplyError, Editor, ElementNode, Node, PathError, Point, Selection, TextNode,
    clamp_to_char_boundary,
};
use crate::ops::{Op, Transaction};
use crate::path::{self, Path};
use crate::plugin::{EditIntent, Verdict};
use crate::tree::{children_at_path, text_after, text_before, texts};

/// Granularity of a delete. Opaque to guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextUnit {
    #[default]
    Character,
    Word,
    Line,
    Block,
}

impl Editor {
    pub fn insert_text(&mut self, text: &str) -> Result<(), ApplyError> {
        self.delete_expanded()?;
        if let Some(tx) = insert_text(self, text)? {
            self.apply_batch(tx)?;
        }
        self.dispatch_changes()?;
        Ok(())
    }

    pub fn delete_backward(&mut self, unit: TextUnit) -> Result<(), ApplyError> {
        self.run_edit(EditIntent::DeleteBackward(unit))
    }

    pub fn delete_forward(&mut self, unit: TextUnit) -> Result<(), ApplyError> {
        self.run_edit(EditIntent::DeleteForward(unit))
    }

    pub fn insert_break(&mut self) -> Result<(), ApplyError> {
        self.run_edit(EditIntent::InsertBreak)
    }

    fn run_edit(&mut self, intent: EditIntent) -> Result<(), ApplyError> {
        for guard in self.registry().edit_guards() {
            if guard.check(self, &intent)? == Verdict::Suppress {
                tracing::debug!(guard = guard.id(), ?intent, "edit suppressed");
                return Ok(());
            }
        }

        let tx = match intent {
            EditIntent::DeleteBackward(unit) => delete_backward(self, unit)?,
            EditIntent::DeleteForward(unit) => delete_forward(self, unit)?,
            EditIntent::InsertBreak => {
                self.delete_expanded()?;
                insert_break(self)?
            }
        };
        if let Some(tx) = tx {
            self.apply_batch(tx)?;
        }
        self.dispatch_changes()?;
        Ok(())
    }

    fn delete_expanded(&mut self) -> Result<(), ApplyError> {
        let Some(selection) = self.selection().filter(|s| !s.is_collapsed()).cloned() else {
            return Ok(());
        };
        let tx = delete_fragment(self, &selection)?;
        self.apply_batch(tx)
    }
}

pub fn insert_text(editor: &Editor, text: &str) -> Result<Option<Transaction>, PathError> {
    let Some(selection) = editor.selection() else {
        return Ok(None);
    };
    if text.is_empty() {
        return Ok(None);
    }
    let point = &selection.focus;
    let leaf = editor.text(&point.path)?;
    Ok(Some(
        Transaction::new(vec![Op::InsertText {
            path: point.path.clone(),
            offset: clamp_to_char_boundary(&leaf.text, point.offset),
            text: text.to_string(),
        }])
        .source("core.insert_text"),
    ))
}

pub fn delete_backward(editor: &Editor, unit: TextUnit) -> Result<Option<Transaction>, PathError> {
    let Some(selection) = editor.selection() else {
        return Ok(None);
    };
    if !selection.is_collapsed() {
        return delete_fragment(editor, selection).map(Some);
    }

    let point = &selection.focus;
    let leaf = editor.text(&point.path)?;
    let offset = clamp_to_char_boundary(&leaf.text, point.offset);
    if offset > 0 {
        let start = unit_start_before(&leaf.text, offset, unit);
        return Ok(Some(
            Transaction::new(vec![Op::RemoveText {
                path: point.path.clone(),
                range: start..offset,
            }])
            .selection_after(Selection::collapsed(Point::new(point.path.clone(), start)))
            .source("core.delete_backward"),
        ));
    }

    let Some((prev_path, prev)) = text_before(editor.doc(), &point.path) else {
        return Ok(None);
    };
    let block = path::parent(&point.path).unwrap_or(&[]);
    let prev_block = path::parent(&prev_path).unwrap_or(&[]);

    if block == prev_block {
        let end = prev.text.len();
        let start = unit_start_before(&prev.text, end, unit);
        if start == end {
            return Ok(None);
        }
        return Ok(Some(
            Transaction::new(vec![Op::RemoveText {
                path: prev_path.clone(),
                range: start..end,
            }])
            .selection_after(Selection::collapsed(Point::new(prev_path, start)))
            .source("core.delete_backward"),
        ));
    }

    merge_blocks(editor, prev_block, block, "core.delete_backward")
}

pub fn delete_forward(editor: &Editor, unit: TextUnit) -> Result<Option<Transaction>, PathError> {
    let Some(selection) = editor.selection() else {
        return Ok(None);
    };
    if !selection.is_collapsed() {
        return delete_fragment(editor, selection).map(Some);
    }

    let point = &selection.focus;
    let leaf = editor.text(&point.path)?;
    let offset = clamp_to_char_boundary(&leaf.text, point.offset);
    if offset < leaf.text.len() {
        let end = unit_end_after(&leaf.text, offset, unit);
        return Ok(Some(
            Transaction::new(vec![Op::RemoveText {
                path: point.path.clone(),
                range: offset..end,
            }])
            .source("core.delete_forward"),
        ));
    }

    let Some((next_path, next)) = text_after(editor.doc(), &point.path) else {
        return Ok(None);
    };
    let block = path::parent(&point.path).unwrap_or(&[]);
    let next_block = path::parent(&next_path).unwrap_or(&[]);

    if block == next_block {
        let end = unit_end_after(&next.text, 0, unit);
        if end == 0 {
            return Ok(None);
        }
        return Ok(Some(
            Transaction::new(vec![Op::RemoveText {
                path: next_path,
                range: 0..end,
            }])
            .source("core.delete_forward"),
        ));
    }

    merge_blocks(editor, block, next_block, "core.delete_forward")
}

/// Moves the children of `source` to the end of `target` and removes
/// `source`. Only adjacent sibling blocks merge; anything else is a no-op.
fn merge_blocks(
    editor: &Editor,
    target: &[usize],
    source: &[usize],
    origin: &str,
) -> Result<Option<Transaction>, PathError> {
    if path::previous(source).as_deref() != Some(target) {
        return Ok(None);
    }
    let target_children =
        children_at_path(editor.doc(), target).ok_or_else(|| PathError::NotElement(target.to_vec()))?;
    let source_children =
        children_at_path(editor.doc(), source).ok_or_else(|| PathError::NotElement(source.to_vec()))?;

    let join = target_children.len();
    let mut ops: Vec<Op> = source_children
        .iter()
        .cloned()
        .enumerate()
        .map(|(ix, node)| Op::InsertNode {
            path: path::child(target, join + ix),
            node,
        })
        .collect();
    ops.push(Op::RemoveNode {
        path: source.to_vec(),
    });

    let caret = match target_children.last() {
        Some(Node::Text(t)) => Point::new(path::child(target, join - 1), t.text.len()),
        _ => Point::new(path::child(target, join), 0),
    };

    Ok(Some(
        Transaction::new(ops)
            .selection_after(Selection::collapsed(caret))
            .source(origin.to_string()),
    ))
}

/// Removes the content covered by an expanded selection and collapses it to
/// its start.
pub fn delete_fragment(editor: &Editor, selection: &Selection) -> Result<Transaction, PathError> {
    let (start, end) = selection.edges();
    let start_leaf = editor.text(&start.path)?;
    let end_leaf = editor.text(&end.path)?;
    let start_offset = clamp_to_char_boundary(&start_leaf.text, start.offset);
    let end_offset = clamp_to_char_boundary(&end_leaf.text, end.offset);
    let caret = Selection::collapsed(Point::new(start.path.clone(), start_offset));

    let mut ops: Vec<Op> = Vec::new();

    if start.path == end.path {
        if start_offset < end_offset {
            ops.push(Op::RemoveText {
                path: start.path.clone(),
                range: start_offset..end_offset,
            });
        }
        return Ok(Transaction::new(ops)
            .selection_after(caret)
            .source("core.delete_fragment"));
    }

    let start_block: Path = path::parent(&start.path).unwrap_or(&[]).to_vec();
    let end_block: Path = path::parent(&end.path).unwrap_or(&[]).to_vec();
    let start_ix = start.path.last().copied().unwrap_or(0);
    let end_ix = end.path.last().copied().unwrap_or(0);
    // Cells are grid slots: joining two of them would shift the row's columns.
    let is_cell = |leaf: &[usize], block: &[usize]| -> Result<bool, PathError> {
        Ok(enclosing_cell(editor.doc(), leaf)?.is_some_and(|(_, cell)| cell == block))
    };
    let joins_cells = is_cell(&start.path, &start_block)? || is_cell(&end.path, &end_block)?;

    if start_block == end_block {
        ops.push(Op::RemoveText {
            path: end.path.clone(),
            range: 0..end_offset,
        });
        for ix in (start_ix + 1..end_ix).rev() {
            ops.push(Op::RemoveNode {
                path: path::child(&start_block, ix),
            });
        }
        ops.push(Op::RemoveText {
            path: start.path.clone(),
            range: start_offset..start_leaf.text.len(),
        });
    } else if path::is_sibling(&start_block, &end_block) && !joins_cells {
        let start_children = children_at_path(editor.doc(), &start_block)
            .ok_or_else(|| PathError::NotElement(start_block.clone()))?;
        let end_children = children_at_path(editor.doc(), &end_block)
            .ok_or_else(|| PathError::NotElement(end_block.clone()))?;

        ops.push(Op::RemoveText {
            path: start.path.clone(),
            range: start_offset..start_leaf.text.len(),
        });
        for ix in (start_ix + 1..start_children.len()).rev() {
            ops.push(Op::RemoveNode {
                path: path::child(&start_block, ix),
            });
        }

        let tail = Node::Text(TextNode {
            text: end_leaf.text[end_offset..].to_string(),
            marks: end_leaf.marks.clone(),
        });
        let moved = std::iter::once(tail).chain(end_children.iter().skip(end_ix + 1).cloned());
        for (n, node) in moved.enumerate() {
            ops.push(Op::InsertNode {
                path: path::child(&start_block, start_ix + 1 + n),
                node,
            });
        }

        let parent = path::parent(&start_block).unwrap_or(&[]);
        let first = start_block.last().copied().unwrap_or(0);
        let last = end_block.last().copied().unwrap_or(0);
        for ix in (first + 1..=last).rev() {
            ops.push(Op::RemoveNode {
                path: path::child(parent, ix),
            });
        }
    } else {
        // Blocks that are table cells or live under different parents keep
        // their structure; only the covered text is cleared.
        ops.push(Op::RemoveText {
            path: end.path.clone(),
            range: 0..end_offset,
        });
        let between: Vec<(Path, usize)> = texts(editor.doc())
            .filter(|(leaf, _)| path::is_after(leaf, &start.path) && path::is_before(leaf, &end.path))
            .map(|(leaf, t)| (leaf, t.text.len()))
            .collect();
        for (leaf, len) in between.into_iter().rev() {
            ops.push(Op::RemoveText {
                path: leaf,
                range: 0..len,
            });
        }
        ops.push(Op::RemoveText {
            path: start.path.clone(),
            range: start_offset..start_leaf.text.len(),
        });
    }

    Ok(Transaction::new(ops)
        .selection_after(caret)
        .source("core.delete_fragment"))
}

/// Splits the text block at the caret. The tail moves into a new block of
/// the same kind right after it.
pub fn insert_break(editor: &Editor) -> Result<Option<Transaction>, PathError> {
    let Some(selection) = editor.selection() else {
        return Ok(None);
    };
    let point = &selection.focus;
    let Some((&leaf_ix, block_path)) = point.path.split_last() else {
        return Ok(None);
    };
    if block_path.is_empty() {
        return Ok(None);
    }
    let Node::Element(block) = editor.node(block_path)? else {
        return Err(PathError::NotElement(block_path.to_vec()));
    };
    let leaf = editor.text(&point.path)?;
    let offset = clamp_to_char_boundary(&leaf.text, point.offset);

    let mut ops: Vec<Op> = Vec::new();
    if offset < leaf.text.len() {
        ops.push(Op::RemoveText {
            path: point.path.clone(),
            range: offset..leaf.text.len(),
        });
    }
    for ix in (leaf_ix + 1..block.children.len()).rev() {
        ops.push(Op::RemoveNode {
            path: path::child(block_path, ix),
        });
    }

    let mut children = vec![Node::Text(TextNode {
        text: leaf.text[offset..].to_string(),
        marks: leaf.marks.clone(),
    })];
    children.extend(block.children.iter().skip(leaf_ix + 1).cloned());

    let Some(new_block_path) = path::next(block_path) else {
        return Ok(None);
    };
    ops.push(Op::InsertNode {
        path: new_block_path.clone(),
        node: Node::Element(ElementNode {
            kind: block.kind.clone(),
            children,
        }),
    });

    Ok(Some(
        Transaction::new(ops)
            .selection_after(Selection::collapsed(Point::new(
                path::child(&new_block_path, 0),
                0,
            )))
            .source("core.insert_break"),
    ))
}

fn unit_start_before(text: &str, offset: usize, unit: TextUnit) -> usize {
    let head = &text[..offset];
    match unit {
        TextUnit::Character => head.char_indices().next_back().map_or(0, |(ix, _)| ix),
        TextUnit::Word => {
            let trimmed = head.trim_end();
            trimmed
                .char_indices()
                .rev()
                .find(|(_, c)| c.is_whitespace())
                .map_or(0, |(ix, c)| ix + c.len_utf8())
        }
        TextUnit::Line | TextUnit::Block => 0,
    }
}

fn unit_end_after(text: &str, offset: usize, unit: TextUnit) -> usize {
    let tail = &text[offset..];
    match unit {
        TextUnit::Character => offset + tail.chars().next().map_or(0, char::len_utf8),
        TextUnit::Word => {
            let lead = tail.len() - tail.trim_start().len();
            let rest = &tail[lead..];
            let word = rest.find(char::is_whitespace).unwrap_or(rest.len());
            offset + lead + word
        }
        TextUnit::Line | TextUnit::Block => text.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_boundaries_skip_whitespace_first() {
        assert_eq!(unit_start_before("hello big world", 15, TextUnit::Word), 10);
        assert_eq!(unit_start_before("hello big   ", 12, TextUnit::Word), 6);
        assert_eq!(unit_end_after("hello big world", 5, TextUnit::Word), 9);
        assert_eq!(unit_end_after("hello", 0, TextUnit::Block), 5);
    }

    #[test]
    fn character_boundaries_respect_utf8() {
        assert_eq!(unit_start_before("añ", 3, TextUnit::Character), 1);
        assert_eq!(unit_end_after("ñb", 0, TextUnit::Character), 2);
    }
}
