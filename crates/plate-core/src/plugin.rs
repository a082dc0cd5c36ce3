use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Document, Editor, ElementKind, Marks, Node, PathError, Point, Selection, TextNode};
use crate::ops::Op;
use crate::table::TablePlugin;
use crate::transforms::TextUnit;
use crate::tree::node_at_path;

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct QueryError {
    message: String,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate node spec kind: {0}")]
    DuplicateKind(ElementKind),
    #[error("duplicate command id: {0}")]
    DuplicateCommand(String),
    #[error("duplicate query id: {0}")]
    DuplicateQuery(String),
}

type CommandHandler = dyn Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync;
type QueryHandler = dyn Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync;

#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub handler: Arc<CommandHandler>,
}

impl CommandSpec {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        handler: impl Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            keywords: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Clone)]
pub struct QuerySpec {
    pub id: String,
    pub handler: Arc<QueryHandler>,
}

impl QuerySpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildConstraint {
    BlockOnly,
    InlineOnly,
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: ElementKind,
    pub children: ChildConstraint,
}

pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op>;
}

/// A destructive edit a guard may veto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", content = "unit", rename_all = "snake_case")]
pub enum EditIntent {
    DeleteBackward(TextUnit),
    DeleteForward(TextUnit),
    InsertBreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Proceed,
    Suppress,
}

pub trait EditGuard: Send + Sync {
    fn id(&self) -> &'static str;
    fn check(&self, editor: &Editor, intent: &EditIntent) -> Result<Verdict, PathError>;
}

/// Runs once per change batch that contained a selection change. A returned
/// selection replaces the current one without being logged.
pub trait SelectionHook: Send + Sync {
    fn id(&self) -> &'static str;
    fn normalize_selection(
        &self,
        editor: &Editor,
        selection: &Selection,
    ) -> Result<Option<Selection>, PathError>;
}

pub trait PlatePlugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn node_specs(&self) -> Vec<NodeSpec> {
        Vec::new()
    }
    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        Vec::new()
    }
    fn edit_guards(&self) -> Vec<Box<dyn EditGuard>> {
        Vec::new()
    }
    fn selection_hooks(&self) -> Vec<Box<dyn SelectionHook>> {
        Vec::new()
    }
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }
    fn queries(&self) -> Vec<QuerySpec> {
        Vec::new()
    }
}

#[derive(Default)]
pub struct PluginRegistry {
    node_specs: HashMap<ElementKind, NodeSpec>,
    normalize_passes: Vec<Box<dyn NormalizePass>>,
    edit_guards: Vec<Box<dyn EditGuard>>,
    selection_hooks: Vec<Box<dyn SelectionHook>>,
    commands: HashMap<String, CommandSpec>,
    queries: HashMap<String, QuerySpec>,
}

impl PluginRegistry {
    pub fn new(
        plugins: impl IntoIterator<Item = Box<dyn PlatePlugin>>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register_plugin(plugin)?;
        }
        Ok(registry)
    }

    pub fn core() -> Self {
        let plugins: Vec<Box<dyn PlatePlugin>> = vec![
            Box::new(CoreParagraphPlugin),
            Box::new(CoreNormalizePlugin),
            Box::new(CoreCommandsPlugin),
        ];
        Self::new(plugins).expect("core registry must be valid")
    }

    pub fn tables() -> Self {
        let plugins: Vec<Box<dyn PlatePlugin>> = vec![
            Box::new(CoreParagraphPlugin),
            Box::new(CoreNormalizePlugin),
            Box::new(CoreCommandsPlugin),
            Box::new(TablePlugin),
        ];
        Self::new(plugins).expect("tables registry must be valid")
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn PlatePlugin>) -> Result<(), RegistryError> {
        for spec in plugin.node_specs() {
            if self.node_specs.contains_key(&spec.kind) {
                return Err(RegistryError::DuplicateKind(spec.kind));
            }
            self.node_specs.insert(spec.kind.clone(), spec);
        }

        self.normalize_passes.extend(plugin.normalize_passes());
        self.edit_guards.extend(plugin.edit_guards());
        self.selection_hooks.extend(plugin.selection_hooks());

        for cmd in plugin.commands() {
            if self.commands.contains_key(&cmd.id) {
                return Err(RegistryError::DuplicateCommand(cmd.id));
            }
            self.commands.insert(cmd.id.clone(), cmd);
        }

        for query in plugin.queries() {
            if self.queries.contains_key(&query.id) {
                return Err(RegistryError::DuplicateQuery(query.id));
            }
            self.queries.insert(query.id.clone(), query);
        }

        tracing::trace!(plugin = plugin.id(), "registered plugin");
        Ok(())
    }

    pub fn node_specs(&self) -> &HashMap<ElementKind, NodeSpec> {
        &self.node_specs
    }

    pub fn normalize_passes(&self) -> &[Box<dyn NormalizePass>] {
        &self.normalize_passes
    }

    pub fn edit_guards(&self) -> &[Box<dyn EditGuard>] {
        &self.edit_guards
    }

    pub fn selection_hooks(&self) -> &[Box<dyn SelectionHook>] {
        &self.selection_hooks
    }

    pub fn commands(&self) -> &HashMap<String, CommandSpec> {
        &self.commands
    }

    pub fn command(&self, id: &str) -> Option<CommandSpec> {
        self.commands.get(id).cloned()
    }

    pub fn query(&self, id: &str) -> Option<QuerySpec> {
        self.queries.get(id).cloned()
    }

    pub fn normalize(&self, doc: &Document) -> Vec<Op> {
        for pass in &self.normalize_passes {
            let ops = pass.run(doc, self);
            if !ops.is_empty() {
                tracing::trace!(pass = pass.id(), ops = ops.len(), "normalize pass produced ops");
                return ops;
            }
        }
        Vec::new()
    }

    /// Clamps both points onto existing text leaves.
    pub fn resolve_selection(&self, doc: &Document, selection: &Selection) -> Selection {
        let fallback = first_text_point(doc).unwrap_or(Point {
            path: vec![0],
            offset: 0,
        });

        let anchor = point_to_existing_text(doc, &selection.anchor).unwrap_or_else(|| {
            point_to_existing_text(doc, &selection.focus).unwrap_or_else(|| fallback.clone())
        });
        let focus = point_to_existing_text(doc, &selection.focus).unwrap_or_else(|| anchor.clone());

        Selection { anchor, focus }
    }

    pub fn is_known_kind(&self, kind: &ElementKind) -> bool {
        self.node_specs.contains_key(kind)
    }

    fn child_constraint(&self, el_kind: &ElementKind, children: &[Node]) -> ChildConstraint {
        self.node_specs
            .get(el_kind)
            .map(|s| s.children.clone())
            .unwrap_or_else(|| {
                if children.iter().any(|n| matches!(n, Node::Text(_))) {
                    ChildConstraint::InlineOnly
                } else {
                    ChildConstraint::Any
                }
            })
    }
}

fn first_text_descendant(children: &[Node], path: &mut Vec<usize>) -> Option<Point> {
    for (ix, node) in children.iter().enumerate() {
        path.push(ix);
        let found = match node {
            Node::Text(_) => Some(Point {
                path: path.clone(),
                offset: 0,
            }),
            Node::Element(el) => first_text_descendant(&el.children, path),
        };
        path.pop();
        if found.is_some() {
            return found;
        }
    }
    None
}

fn first_text_point(doc: &Document) -> Option<Point> {
    first_text_descendant(&doc.children, &mut Vec::new())
}

fn point_to_existing_text(doc: &Document, point: &Point) -> Option<Point> {
    if point.path.is_empty() || doc.children.is_empty() {
        return None;
    }

    let mut resolved_path: Vec<usize> = Vec::new();
    let mut children: &[Node] = &doc.children;

    for &wanted in &point.path {
        if children.is_empty() {
            break;
        }
        let ix = wanted.min(children.len() - 1);
        resolved_path.push(ix);
        match &children[ix] {
            Node::Text(t) => {
                return Some(Point {
                    path: resolved_path,
                    offset: crate::core::clamp_to_char_boundary(&t.text, point.offset),
                });
            }
            Node::Element(el) => {
                children = &el.children;
            }
        }
    }

    match node_at_path(doc, &resolved_path)? {
        Node::Text(t) => Some(Point {
            path: resolved_path,
            offset: crate::core::clamp_to_char_boundary(&t.text, point.offset),
        }),
        Node::Element(el) => first_text_descendant(&el.children, &mut resolved_path),
    }
}

struct CoreParagraphPlugin;

impl PlatePlugin for CoreParagraphPlugin {
    fn id(&self) -> &'static str {
        "core.paragraph"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec {
            kind: ElementKind::Paragraph,
            children: ChildConstraint::InlineOnly,
        }]
    }
}

struct CoreNormalizePlugin;

impl PlatePlugin for CoreNormalizePlugin {
    fn id(&self) -> &'static str {
        "core.normalize"
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![
            Box::new(EnsureNonEmptyDocument),
            Box::new(EnsureTextBlockHasTextLeaf),
            Box::new(MergeAdjacentTextLeaves),
        ]
    }
}

struct EnsureNonEmptyDocument;

impl NormalizePass for EnsureNonEmptyDocument {
    fn id(&self) -> &'static str {
        "core.ensure_non_empty_document"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        if doc.children.is_empty() {
            return vec![Op::InsertNode {
                path: vec![0],
                node: Node::paragraph(""),
            }];
        }
        Vec::new()
    }
}

struct EnsureTextBlockHasTextLeaf;

impl NormalizePass for EnsureTextBlockHasTextLeaf {
    fn id(&self) -> &'static str {
        "core.ensure_inline_only_blocks_have_text_leaf"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();

        fn walk(children: &[Node], path: &mut Vec<usize>, registry: &PluginRegistry, ops: &mut Vec<Op>) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };

                path.push(ix);

                if registry.child_constraint(&el.kind, &el.children) == ChildConstraint::InlineOnly {
                    if !el.children.iter().any(|n| matches!(n, Node::Text(_))) {
                        let mut insert_path = path.clone();
                        insert_path.push(0);
                        ops.push(Op::InsertNode {
                            path: insert_path,
                            node: Node::Text(TextNode {
                                text: String::new(),
                                marks: Marks::default(),
                            }),
                        });
                    }
                } else {
                    walk(&el.children, path, registry, ops);
                }

                path.pop();
            }
        }

        walk(&doc.children, &mut Vec::new(), registry, &mut ops);
        ops
    }
}

struct MergeAdjacentTextLeaves;

impl NormalizePass for MergeAdjacentTextLeaves {
    fn id(&self) -> &'static str {
        "core.merge_adjacent_text_leaves"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();

        fn walk(children: &[Node], path: &mut Vec<usize>, registry: &PluginRegistry, ops: &mut Vec<Op>) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };

                path.push(ix);

                if registry.child_constraint(&el.kind, &el.children) != ChildConstraint::InlineOnly {
                    walk(&el.children, path, registry, ops);
                    path.pop();
                    continue;
                }

                let mut ix = el.children.len();
                while ix > 0 {
                    ix -= 1;
                    let Node::Text(right) = &el.children[ix] else {
                        continue;
                    };

                    let mut start = ix;
                    while start > 0 {
                        let Some(Node::Text(left)) = el.children.get(start - 1) else {
                            break;
                        };
                        if left.marks != right.marks {
                            break;
                        }
                        start -= 1;
                    }

                    for merge_ix in (start + 1..=ix).rev() {
                        ops.push(Op::MergeText {
                            path: crate::path::child(path, merge_ix),
                        });
                    }

                    ix = start;
                }

                path.pop();
            }
        }

        walk(&doc.children, &mut Vec::new(), registry, &mut ops);
        ops
    }
}

struct CoreCommandsPlugin;

fn unit_arg(args: Option<&Value>) -> Result<TextUnit, CommandError> {
    match args.and_then(|v| v.get("unit")) {
        None | Some(Value::Null) => Ok(TextUnit::default()),
        Some(unit) => serde_json::from_value(unit.clone())
            .map_err(|err| CommandError::new(format!("Invalid unit: {err}"))),
    }
}

impl PlatePlugin for CoreCommandsPlugin {
    fn id(&self) -> &'static str {
        "core.commands"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("core.insert_text", "Insert text", |editor, args| {
                let text = args
                    .as_ref()
                    .and_then(|v| v.get("text"))
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| CommandError::new("Missing `text` argument"))?;
                editor
                    .insert_text(text)
                    .map_err(|e| CommandError::new(format!("Failed to insert text: {e}")))
            })
            .description("Insert text at the selection, replacing any selected content.")
            .keywords(["type", "text"]),
            CommandSpec::new("core.delete_backward", "Delete backward", |editor, args| {
                let unit = unit_arg(args.as_ref())?;
                editor
                    .delete_backward(unit)
                    .map_err(|e| CommandError::new(format!("Failed to delete backward: {e}")))
            })
            .description("Delete the unit before the caret, or the selected content.")
            .keywords(["backspace", "delete"]),
            CommandSpec::new("core.delete_forward", "Delete forward", |editor, args| {
                let unit = unit_arg(args.as_ref())?;
                editor
                    .delete_forward(unit)
                    .map_err(|e| CommandError::new(format!("Failed to delete forward: {e}")))
            })
            .description("Delete the unit after the caret, or the selected content.")
            .keywords(["delete"]),
            CommandSpec::new("core.insert_break", "Insert break", |editor, _args| {
                editor
                    .insert_break()
                    .map_err(|e| CommandError::new(format!("Failed to insert break: {e}")))
            })
            .description("Split the current block at the caret.")
            .keywords(["enter", "newline", "split"]),
        ]
    }
}
