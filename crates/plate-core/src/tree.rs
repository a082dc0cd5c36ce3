use crate::core::{
    DOCUMENT_KIND, Document, Editor, ElementKind, ElementNode, Node, PathError, Point, TextNode,
};
use crate::path::{self, Path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Root first.
    #[default]
    Forward,
    /// Nearest ancestor first.
    Reverse,
}

/// A node that can contain other nodes: the document root or an element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ancestor<'a> {
    Document(&'a Document),
    Element(&'a ElementNode),
}

impl<'a> Ancestor<'a> {
    pub fn kind(&self) -> &'a ElementKind {
        match self {
            Ancestor::Document(_) => &DOCUMENT_KIND,
            Ancestor::Element(el) => &el.kind,
        }
    }

    pub fn children(&self) -> &'a [Node] {
        match self {
            Ancestor::Document(doc) => &doc.children,
            Ancestor::Element(el) => &el.children,
        }
    }

    pub fn is_kind(&self, kind: &ElementKind) -> bool {
        self.kind() == kind
    }
}

pub type AncestorEntry<'a> = (Ancestor<'a>, Path);

/// Proper ancestors of a path, resolved lazily one level at a time.
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    doc: &'a Document,
    path: Path,
    front: usize,
    back: usize,
    direction: Direction,
}

impl<'a> Ancestors<'a> {
    fn entry(&self, len: usize) -> Option<AncestorEntry<'a>> {
        let prefix = &self.path[..len];
        let ancestor = if prefix.is_empty() {
            Ancestor::Document(self.doc)
        } else {
            match node_at_path(self.doc, prefix)? {
                Node::Element(el) => Ancestor::Element(el),
                Node::Text(_) => return None,
            }
        };
        Some((ancestor, prefix.to_vec()))
    }

    fn take_front(&mut self) -> Option<AncestorEntry<'a>> {
        if self.front >= self.back {
            return None;
        }
        let len = self.front;
        self.front += 1;
        self.entry(len)
    }

    fn take_back(&mut self) -> Option<AncestorEntry<'a>> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        self.entry(self.back)
    }
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = AncestorEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.direction {
            Direction::Forward => self.take_front(),
            Direction::Reverse => self.take_back(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }
}

impl DoubleEndedIterator for Ancestors<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        match self.direction {
            Direction::Forward => self.take_back(),
            Direction::Reverse => self.take_front(),
        }
    }
}

impl ExactSizeIterator for Ancestors<'_> {}

/// Every proper ancestor of `path`, from the document root down
/// (`Forward`) or from the parent up (`Reverse`).
///
/// Fails if `path` does not resolve in `doc`.
pub fn ancestors<'a>(
    doc: &'a Document,
    path: &[usize],
    direction: Direction,
) -> Result<Ancestors<'a>, PathError> {
    if !path.is_empty() {
        resolve(doc, path)?;
    }
    Ok(Ancestors {
        doc,
        path: path.to_vec(),
        front: 0,
        back: path.len(),
        direction,
    })
}

pub fn resolve<'a>(doc: &'a Document, path: &[usize]) -> Result<&'a Node, PathError> {
    let (&first, rest) = path.split_first().ok_or(PathError::Empty)?;
    let mut node = doc.children.get(first).ok_or_else(|| PathError::OutOfBounds {
        path: path.to_vec(),
        depth: 0,
        len: doc.children.len(),
    })?;
    for (depth, &ix) in rest.iter().enumerate() {
        node = match node {
            Node::Element(el) => el.children.get(ix).ok_or_else(|| PathError::OutOfBounds {
                path: path.to_vec(),
                depth: depth + 1,
                len: el.children.len(),
            })?,
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

pub fn node_at_path<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a Node> {
    resolve(doc, path).ok()
}

pub(crate) fn children_at_path<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a [Node]> {
    if path.is_empty() {
        return Some(&doc.children);
    }
    match node_at_path(doc, path)? {
        Node::Element(el) => Some(&el.children),
        Node::Text(_) => None,
    }
}

/// Text leaves in document order.
pub struct Texts<'a> {
    stack: Vec<(&'a [Node], usize)>,
    path: Path,
}

impl<'a> Iterator for Texts<'a> {
    type Item = (Path, &'a TextNode);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (children, next_ix) = self.stack.last_mut()?;
            let children: &'a [Node] = *children;
            let ix = *next_ix;
            if ix >= children.len() {
                self.stack.pop();
                self.path.pop();
                continue;
            }
            *next_ix += 1;

            match &children[ix] {
                Node::Text(text) => return Some((path::child(&self.path, ix), text)),
                Node::Element(el) => {
                    self.path.push(ix);
                    self.stack.push((&el.children, 0));
                }
            }
        }
    }
}

pub fn texts(doc: &Document) -> Texts<'_> {
    Texts {
        stack: vec![(&doc.children, 0)],
        path: Path::new(),
    }
}

pub(crate) fn text_before<'a>(doc: &'a Document, at: &[usize]) -> Option<(Path, &'a TextNode)> {
    texts(doc)
        .take_while(|(leaf, _)| path::is_before(leaf, at))
        .last()
}

pub(crate) fn text_after<'a>(doc: &'a Document, at: &[usize]) -> Option<(Path, &'a TextNode)> {
    texts(doc).find(|(leaf, _)| path::is_after(leaf, at))
}

fn edge_text(children: &[Node], path: &mut Path, last: bool) -> Option<Point> {
    for step in 0..children.len() {
        let ix = if last { children.len() - 1 - step } else { step };
        path.push(ix);
        let found = match &children[ix] {
            Node::Text(t) => Some(Point::new(path.clone(), if last { t.text.len() } else { 0 })),
            Node::Element(el) => edge_text(&el.children, path, last),
        };
        path.pop();
        if found.is_some() {
            return found;
        }
    }
    None
}

fn first_match<'a>(
    children: &'a [Node],
    path: &mut Path,
    start: &[usize],
    end: &[usize],
    predicate: &dyn Fn(&Node) -> bool,
) -> Option<(&'a Node, Path)> {
    for (ix, node) in children.iter().enumerate() {
        path.push(ix);
        if path::is_after(path, end) {
            path.pop();
            break;
        }
        if !path::is_before(path, start) {
            if predicate(node) {
                return Some((node, path.clone()));
            }
            if let Node::Element(el) = node {
                if let Some(found) = first_match(&el.children, path, start, end, predicate) {
                    return Some(found);
                }
            }
        }
        path.pop();
    }
    None
}

impl Editor {
    pub fn node(&self, path: &[usize]) -> Result<&Node, PathError> {
        resolve(self.doc(), path)
    }

    pub fn text(&self, path: &[usize]) -> Result<&TextNode, PathError> {
        match self.node(path)? {
            Node::Text(t) => Ok(t),
            Node::Element(_) => Err(PathError::NotText(path.to_vec())),
        }
    }

    pub fn ancestors(&self, path: &[usize], direction: Direction) -> Result<Ancestors<'_>, PathError> {
        ancestors(self.doc(), path, direction)
    }

    /// First point inside the subtree at `path`.
    pub fn start(&self, path: &[usize]) -> Result<Point, PathError> {
        self.edge(path, false)
    }

    /// Last point inside the subtree at `path`.
    pub fn end(&self, path: &[usize]) -> Result<Point, PathError> {
        self.edge(path, true)
    }

    fn edge(&self, path: &[usize], last: bool) -> Result<Point, PathError> {
        let children = if path.is_empty() {
            &self.doc().children
        } else {
            match self.node(path)? {
                Node::Text(t) => {
                    let offset = if last { t.text.len() } else { 0 };
                    return Ok(Point::new(path.to_vec(), offset));
                }
                Node::Element(el) => &el.children,
            }
        };
        edge_text(children, &mut path.to_vec(), last).ok_or_else(|| PathError::NoText(path.to_vec()))
    }

    /// The point right before the subtree at `path`: the end of the last text
    /// leaf preceding it. `None` at the start of the document.
    pub fn before(&self, path: &[usize]) -> Result<Option<Point>, PathError> {
        if !path.is_empty() {
            self.node(path)?;
        }
        Ok(text_before(self.doc(), path).map(|(path, t)| Point::new(path, t.text.len())))
    }

    /// The point right after the subtree at `path`: the start of the first
    /// text leaf following it. `None` at the end of the document.
    pub fn after(&self, path: &[usize]) -> Result<Option<Point>, PathError> {
        if !path.is_empty() {
            self.node(path)?;
        }
        Ok(text_after(self.doc(), path).map(|(path, _)| Point::new(path, 0)))
    }

    /// First node in pre-order whose path intersects the selection span.
    pub fn first_in_selection(&self, predicate: impl Fn(&Node) -> bool) -> Option<(&Node, Path)> {
        let selection = self.selection()?;
        let (start, end) = selection.edges();
        first_match(
            &self.doc().children,
            &mut Path::new(),
            &start.path,
            &end.path,
            &predicate,
        )
    }
}
