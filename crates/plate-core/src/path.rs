//! Index paths into the document tree.
//!
//! A path is valid only until the next structural mutation; callers recompute
//! paths from the current tree instead of holding on to them across edits.

use std::cmp::Ordering;

pub type Path = Vec<usize>;

/// Document-order comparison. A path compares `Equal` to its ancestors and
/// descendants, so "before" means "entirely before, not containing".
pub fn compare(a: &[usize], b: &[usize]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.cmp(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

pub fn is_before(a: &[usize], b: &[usize]) -> bool {
    compare(a, b) == Ordering::Less
}

pub fn is_after(a: &[usize], b: &[usize]) -> bool {
    compare(a, b) == Ordering::Greater
}

pub fn parent(path: &[usize]) -> Option<&[usize]> {
    path.split_last().map(|(_, parent)| parent)
}

pub fn is_sibling(a: &[usize], b: &[usize]) -> bool {
    match (a.split_last(), b.split_last()) {
        (Some((x, pa)), Some((y, pb))) => pa == pb && x != y,
        _ => false,
    }
}

pub fn next(path: &[usize]) -> Option<Path> {
    let (last, parent) = path.split_last()?;
    let mut next = parent.to_vec();
    next.push(last + 1);
    Some(next)
}

pub fn previous(path: &[usize]) -> Option<Path> {
    let (last, parent) = path.split_last()?;
    let mut previous = parent.to_vec();
    previous.push(last.checked_sub(1)?);
    Some(previous)
}

pub fn child(path: &[usize], ix: usize) -> Path {
    let mut child = path.to_vec();
    child.push(ix);
    child
}
