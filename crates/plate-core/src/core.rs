use std::cmp::Ordering;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ops::{Op, Transaction};
use crate::path::{self, Path};
use crate::plugin::{CommandError, PluginRegistry, QueryError};

/// Tag of an element node. Unknown tags survive a round trip as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementKind {
    Document,
    Paragraph,
    Table,
    TableRow,
    TableCell,
    Custom(String),
}

impl ElementKind {
    pub fn as_str(&self) -> &str {
        match self {
            ElementKind::Document => "document",
            ElementKind::Paragraph => "paragraph",
            ElementKind::Table => "table",
            ElementKind::TableRow => "table_row",
            ElementKind::TableCell => "table_cell",
            ElementKind::Custom(tag) => tag,
        }
    }
}

impl From<String> for ElementKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "document" => ElementKind::Document,
            "paragraph" => ElementKind::Paragraph,
            "table" => ElementKind::Table,
            "table_row" => ElementKind::TableRow,
            "table_cell" => ElementKind::TableCell,
            _ => ElementKind::Custom(tag),
        }
    }
}

impl From<&str> for ElementKind {
    fn from(tag: &str) -> Self {
        ElementKind::from(tag.to_string())
    }
}

impl From<ElementKind> for String {
    fn from(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Custom(tag) => tag,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) static DOCUMENT_KIND: ElementKind = ElementKind::Document;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
}

impl Node {
    pub fn element(kind: impl Into<ElementKind>, children: Vec<Node>) -> Self {
        Node::Element(ElementNode {
            kind: kind.into(),
            children,
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks: Marks::default(),
        })
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Node::element(ElementKind::Paragraph, vec![Node::text(text)])
    }

    pub fn kind(&self) -> Option<&ElementKind> {
        match self {
            Node::Element(el) => Some(&el.kind),
            Node::Text(_) => None,
        }
    }

    pub fn is_kind(&self, kind: &ElementKind) -> bool {
        self.kind() == Some(kind)
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        match self {
            Node::Element(el) => 1 + el.children.iter().map(Node::count).sum::<usize>(),
            Node::Text(_) => 1,
        }
    }
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn node_count(&self) -> usize {
        self.children.iter().map(Node::count).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub kind: ElementKind,
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(default)]
    pub marks: Marks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Marks {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub code: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> Ordering {
        path::compare(&self.path, &other.path)
            .then_with(|| self.path.len().cmp(&other.path.len()))
            .then_with(|| self.offset.cmp(&other.offset))
    }
}

/// Anchor/focus pair. The anchor is where the selection started; the focus
/// is the end that moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_backward(&self) -> bool {
        self.anchor > self.focus
    }

    pub fn is_forward(&self) -> bool {
        !self.is_backward()
    }

    /// Start and end in document order.
    pub fn edges(&self) -> (&Point, &Point) {
        if self.is_backward() {
            (&self.focus, &self.anchor)
        } else {
            (&self.anchor, &self.focus)
        }
    }

    pub(crate) fn points_mut(&mut self) -> [&mut Point; 2] {
        [&mut self.anchor, &mut self.focus]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub max_normalize_iterations: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_normalize_iterations: 100,
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(s).map(Self::with_defaults)
    }

    fn with_defaults(mut self) -> Self {
        if self.max_normalize_iterations == 0 {
            self.max_normalize_iterations = Self::default().max_normalize_iterations;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("empty path does not address a node")]
    Empty,
    #[error("path {path:?} is out of bounds at depth {depth} ({len} children)")]
    OutOfBounds {
        path: Path,
        depth: usize,
        len: usize,
    },
    #[error("path {path:?} descends through a text leaf at depth {depth}")]
    ThroughLeaf { path: Path, depth: usize },
    #[error("expected a text leaf at {0:?}")]
    NotText(Path),
    #[error("expected an element at {0:?}")]
    NotElement(Path),
    #[error("no text leaf inside {0:?}")]
    NoText(Path),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),
    #[error("normalization did not converge after {0} iterations")]
    NormalizeDidNotConverge(usize),
}

/// Owns the document, the selection and the operation log of one editing
/// session.
pub struct Editor {
    doc: Document,
    selection: Option<Selection>,
    registry: PluginRegistry,
    config: EditorConfig,
    operations: Vec<Op>,
}

impl Editor {
    pub fn new(doc: Document, selection: Option<Selection>, registry: PluginRegistry) -> Self {
        Self::with_config(doc, selection, registry, EditorConfig::default())
    }

    pub fn with_config(
        doc: Document,
        selection: Option<Selection>,
        registry: PluginRegistry,
        config: EditorConfig,
    ) -> Self {
        let mut editor = Self {
            doc,
            selection,
            registry,
            config: config.with_defaults(),
            operations: Vec::new(),
        };
        if let Err(err) = editor.normalize_in_place() {
            tracing::warn!(%err, "initial document did not normalize cleanly");
        }
        editor.operations.clear();
        editor
    }

    pub fn with_core_plugins() -> Self {
        Self::empty(PluginRegistry::core())
    }

    pub fn with_table_plugins() -> Self {
        Self::empty(PluginRegistry::tables())
    }

    fn empty(registry: PluginRegistry) -> Self {
        let doc = Document {
            children: vec![Node::paragraph("")],
        };
        let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
        Self::new(doc, Some(selection), registry)
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Operations applied since the log was last drained.
    pub fn operations(&self) -> &[Op] {
        &self.operations
    }

    pub fn take_operations(&mut self) -> Vec<Op> {
        std::mem::take(&mut self.operations)
    }

    pub fn select(&mut self, selection: Selection) -> Result<(), ApplyError> {
        self.apply(Transaction::new(Vec::new()).selection_after(selection))
    }

    pub fn deselect(&mut self) -> Result<(), ApplyError> {
        if self.selection.is_none() {
            return Ok(());
        }
        let before = self.selection.clone();
        self.apply_op(Op::SetSelection {
            before,
            after: None,
        })?;
        self.dispatch_changes()?;
        Ok(())
    }

    pub fn apply(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        self.apply_batch(tx)?;
        self.dispatch_changes()?;
        Ok(())
    }

    /// Applies ops, structural normalization and selection resolution without
    /// running the change dispatcher.
    pub(crate) fn apply_batch(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        for op in tx.ops {
            self.apply_op(op)?;
        }

        if let Some(after) = tx
            .selection_after
            .filter(|after| self.selection.as_ref() != Some(after))
        {
            let before = self.selection.clone();
            self.apply_op(Op::SetSelection {
                before,
                after: Some(after),
            })?;
        }

        self.normalize_in_place()
    }

    pub(crate) fn commit_selection(&mut self, selection: Selection) {
        self.selection = Some(selection);
    }

    pub fn run_command(&mut self, id: &str, args: Option<Value>) -> Result<(), CommandError> {
        let Some(command) = self.registry.command(id) else {
            return Err(CommandError::new(format!("Unknown command: {id}")));
        };
        (command.handler)(self, args)
    }

    pub fn run_query_json(&self, id: &str, args: Option<Value>) -> Result<Value, QueryError> {
        let Some(query) = self.registry.query(id) else {
            return Err(QueryError::new(format!("Unknown query: {id}")));
        };
        (query.handler)(self, args)
    }

    pub fn run_query<T>(&self, id: &str, args: Option<Value>) -> Result<T, QueryError>
    where
        T: DeserializeOwned,
    {
        let value = self.run_query_json(id, args)?;
        serde_json::from_value(value)
            .map_err(|err| QueryError::new(format!("Failed to decode query result: {err}")))
    }

    fn normalize_in_place(&mut self) -> Result<(), ApplyError> {
        self.normalize_structure()?;
        self.selection = self
            .selection
            .as_ref()
            .map(|selection| self.registry.resolve_selection(&self.doc, selection));
        Ok(())
    }

    fn normalize_structure(&mut self) -> Result<(), ApplyError> {
        for _ in 0..self.config.max_normalize_iterations {
            let ops = self.registry.normalize(&self.doc);
            if ops.is_empty() {
                return Ok(());
            }
            for op in ops {
                self.apply_op(op)?;
            }
        }
        Err(ApplyError::NormalizeDidNotConverge(
            self.config.max_normalize_iterations,
        ))
    }

    fn apply_op(&mut self, op: Op) -> Result<(), ApplyError> {
        apply_op_to(&mut self.doc, &mut self.selection, op.clone())?;
        self.operations.push(op);
        Ok(())
    }
}

fn apply_op_to(
    doc: &mut Document,
    selection: &mut Option<Selection>,
    op: Op,
) -> Result<(), ApplyError> {
    match op {
        Op::InsertText { path, offset, text } => {
            let text_node = node_text_mut(doc, &path)?;
            let offset = clamp_to_char_boundary(&text_node.text, offset);
            text_node.text.insert_str(offset, &text);
            transform_selection_insert_text(selection, &path, offset, text.len());
        }
        Op::RemoveText { path, range } => {
            let text_node = node_text_mut(doc, &path)?;
            let start = clamp_to_char_boundary(&text_node.text, range.start);
            let end = clamp_to_char_boundary(&text_node.text, range.end);
            if start < end {
                text_node.text.replace_range(start..end, "");
                transform_selection_remove_text(selection, &path, start..end);
            }
        }
        Op::InsertNode { path, node } => {
            insert_node(doc, &path, node)?;
            transform_selection_insert_node(selection, &path);
        }
        Op::RemoveNode { path } => {
            remove_node(doc, &path)?;
            transform_selection_remove_node(selection, &path);
        }
        Op::MergeText { path } => {
            let joined_at = merge_text(doc, &path)?;
            transform_selection_merge_text(selection, &path, joined_at);
        }
        Op::SetSelection { after, .. } => {
            *selection = after;
        }
    }
    Ok(())
}

pub(crate) fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

fn transform_selection_insert_text(
    selection: &mut Option<Selection>,
    path: &[usize],
    offset: usize,
    len: usize,
) {
    let Some(selection) = selection else {
        return;
    };
    for point in selection.points_mut() {
        if point.path == path && point.offset >= offset {
            point.offset = point.offset.saturating_add(len);
        }
    }
}

fn transform_selection_remove_text(
    selection: &mut Option<Selection>,
    path: &[usize],
    range: std::ops::Range<usize>,
) {
    let Some(selection) = selection else {
        return;
    };
    let removed_len = range.end.saturating_sub(range.start);
    for point in selection.points_mut() {
        if point.path != path || point.offset <= range.start {
            continue;
        }
        if point.offset >= range.end {
            point.offset = point.offset.saturating_sub(removed_len);
        } else {
            point.offset = range.start;
        }
    }
}

fn transform_selection_insert_node(selection: &mut Option<Selection>, path: &[usize]) {
    let Some(selection) = selection else {
        return;
    };
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };

    for point in selection.points_mut() {
        if point.path.len() <= parent_path.len() || !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        if point.path[depth] >= index {
            point.path[depth] += 1;
        }
    }
}

fn transform_selection_remove_node(selection: &mut Option<Selection>, path: &[usize]) {
    let Some(selection) = selection else {
        return;
    };
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };

    for point in selection.points_mut() {
        if point.path.len() <= parent_path.len() || !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        let ix = point.path[depth];
        if ix > index {
            point.path[depth] = ix - 1;
        } else if ix == index {
            // Falls back to the previous sibling; selection resolution moves
            // it onto a real text leaf afterwards.
            point.path.truncate(depth + 1);
            point.path[depth] = index.saturating_sub(1);
            point.offset = 0;
        }
    }
}

fn transform_selection_merge_text(
    selection: &mut Option<Selection>,
    path: &[usize],
    joined_at: usize,
) {
    let Some(selection) = selection else {
        return;
    };
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };

    for point in selection.points_mut() {
        if point.path.len() <= parent_path.len() || !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        let ix = point.path[depth];
        if ix > index {
            point.path[depth] = ix - 1;
        } else if ix == index {
            point.path[depth] = index - 1;
            point.offset += joined_at;
        }
    }
}

fn node_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut Node, PathError> {
    let (&first, rest) = path.split_first().ok_or(PathError::Empty)?;
    let len = doc.children.len();
    let mut node = doc
        .children
        .get_mut(first)
        .ok_or_else(|| PathError::OutOfBounds {
            path: path.to_vec(),
            depth: 0,
            len,
        })?;

    for (depth, &ix) in rest.iter().enumerate() {
        node = match node {
            Node::Element(el) => {
                let len = el.children.len();
                el.children
                    .get_mut(ix)
                    .ok_or_else(|| PathError::OutOfBounds {
                        path: path.to_vec(),
                        depth: depth + 1,
                        len,
                    })?
            }
            Node::Text(_) => {
                return Err(PathError::ThroughLeaf {
                    path: path.to_vec(),
                    depth: depth + 1,
                });
            }
        };
    }
    Ok(node)
}

fn node_text_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut TextNode, PathError> {
    match node_mut(doc, path)? {
        Node::Text(t) => Ok(t),
        Node::Element(_) => Err(PathError::NotText(path.to_vec())),
    }
}

fn children_mut<'a>(doc: &'a mut Document, parent_path: &[usize]) -> Result<&'a mut Vec<Node>, PathError> {
    if parent_path.is_empty() {
        return Ok(&mut doc.children);
    }
    match node_mut(doc, parent_path)? {
        Node::Element(el) => Ok(&mut el.children),
        Node::Text(_) => Err(PathError::NotElement(parent_path.to_vec())),
    }
}

fn insert_node(doc: &mut Document, path: &[usize], node: Node) -> Result<(), PathError> {
    let (&index, parent_path) = path.split_last().ok_or(PathError::Empty)?;
    let children = children_mut(doc, parent_path)?;
    if index > children.len() {
        return Err(PathError::OutOfBounds {
            path: path.to_vec(),
            depth: parent_path.len(),
            len: children.len(),
        });
    }
    children.insert(index, node);
    Ok(())
}

/// Returns the length of the left leaf before the merge.
fn merge_text(doc: &mut Document, path: &[usize]) -> Result<usize, PathError> {
    let (&index, parent_path) = path.split_last().ok_or(PathError::Empty)?;
    let left_ix = index.checked_sub(1).ok_or_else(|| PathError::OutOfBounds {
        path: path.to_vec(),
        depth: parent_path.len(),
        len: 0,
    })?;
    let children = children_mut(doc, parent_path)?;
    let len = children.len();
    match children.get(left_ix..=index) {
        Some([Node::Text(_), Node::Text(_)]) => {}
        Some(_) => return Err(PathError::NotText(path.to_vec())),
        None => {
            return Err(PathError::OutOfBounds {
                path: path.to_vec(),
                depth: parent_path.len(),
                len,
            });
        }
    }
    let Node::Text(right) = children.remove(index) else {
        return Err(PathError::NotText(path.to_vec()));
    };
    let Some(Node::Text(left)) = children.get_mut(left_ix) else {
        return Err(PathError::NotText(path.to_vec()));
    };
    let joined_at = left.text.len();
    left.text.push_str(&right.text);
    Ok(joined_at)
}

fn remove_node(doc: &mut Document, path: &[usize]) -> Result<Node, PathError> {
    let (&index, parent_path) = path.split_last().ok_or(PathError::Empty)?;
    let children = children_mut(doc, parent_path)?;
    if index >= children.len() {
        return Err(PathError::OutOfBounds {
            path: path.to_vec(),
            depth: parent_path.len(),
            len: children.len(),
        });
    }
    Ok(children.remove(index))
}
