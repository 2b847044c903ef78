use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ops::{Op, Path, Transaction};
use crate::plugin::{CommandError, PluginRegistry, QueryError, TransactionPreview};
use crate::schema::kind;
use crate::tree;

pub type Attrs = BTreeMap<String, serde_json::Value>;
pub type ElementKind = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    /// Concatenated text of every leaf in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            node.collect_text(&mut out);
        }
        out
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        tree::node_at_path(self, path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
    Void(VoidNode),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode { text: text.into() })
    }

    pub fn element(kind: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Element(ElementNode::new(kind, children))
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Node::element(kind::PARAGRAPH, vec![Node::text(text)])
    }

    pub fn image(src: impl Into<String>, alt: Option<String>) -> Self {
        let mut attrs = Attrs::default();
        attrs.insert("src".to_string(), Value::String(src.into()));
        if let Some(alt) = alt {
            attrs.insert("alt".to_string(), Value::String(alt));
        }
        Node::Void(VoidNode {
            kind: kind::IMAGE.to_string(),
            attrs,
        })
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) | Node::Void(_) => None,
        }
    }

    pub fn is_element_of(&self, kind: &str) -> bool {
        self.as_element().is_some_and(|el| el.kind == kind)
    }

    pub fn text_len(&self) -> usize {
        match self {
            Node::Text(t) => t.text.len(),
            Node::Element(el) => el.children.iter().map(Node::text_len).sum(),
            Node::Void(_) => 0,
        }
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(t) => out.push_str(&t.text),
            Node::Element(el) => {
                for child in &el.children {
                    child.collect_text(out);
                }
            }
            Node::Void(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub kind: ElementKind,
    #[serde(default)]
    pub attrs: Attrs,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl ElementNode {
    pub fn new(kind: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            kind: kind.into(),
            attrs: Attrs::default(),
            children,
        }
    }

    pub fn with_attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoidNode {
    pub kind: ElementKind,
    #[serde(default)]
    pub attrs: Attrs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
}

/// A text-leaf position. Deriving `Ord` over (path, offset) gives document
/// order, since two text leaves never have paths that prefix one another.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
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

    /// `(start, end)` in document order, regardless of selection direction.
    pub fn ordered(&self) -> (&Point, &Point) {
        if self.focus < self.anchor {
            (&self.focus, &self.anchor)
        } else {
            (&self.anchor, &self.focus)
        }
    }
}

/// One applied transaction, in the shape a host history can record and
/// replay. The engine itself keeps no history.
#[derive(Debug, Clone, PartialEq)]
pub struct EditStep {
    pub source: Option<String>,
    pub ops: Vec<Op>,
    pub inverse_ops: Vec<Op>,
    pub selection_before: Option<Selection>,
    pub selection_after: Option<Selection>,
}

impl EditStep {
    /// The transaction that reverts this step when applied to the document
    /// the step produced.
    pub fn inverse(&self) -> Transaction {
        let mut tx = Transaction::new(self.inverse_ops.clone());
        if let Some(selection) = &self.selection_before {
            tx = tx.selection_after(selection.clone());
        }
        match &self.source {
            Some(source) => tx.source(format!("revert:{source}")),
            None => tx.source("revert"),
        }
    }
}

pub trait EditRecorder: Send {
    fn record(&mut self, step: &EditStep);
}

impl<F> EditRecorder for F
where
    F: FnMut(&EditStep) + Send,
{
    fn record(&mut self, step: &EditStep) {
        self(step)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default)]
    pub max_normalize_iterations: usize,
}

impl EditorConfig {
    pub fn with_defaults(mut self) -> Self {
        if self.max_normalize_iterations == 0 {
            self.max_normalize_iterations = 100;
        }
        self
    }
}

pub struct Editor {
    doc: Document,
    selection: Option<Selection>,
    root: Path,
    registry: PluginRegistry,
    config: EditorConfig,
    recorder: Option<Box<dyn EditRecorder>>,
}

impl Editor {
    pub fn new(doc: Document, selection: Selection, registry: PluginRegistry) -> Self {
        let mut editor = Self {
            doc,
            selection: Some(selection),
            root: Path::new(),
            registry,
            config: EditorConfig::default().with_defaults(),
            recorder: None,
        };
        editor.normalize_in_place();
        editor
    }

    pub fn with_engine_plugins() -> Self {
        let doc = Document::new(vec![Node::paragraph("")]);
        let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
        Self::new(doc, selection, PluginRegistry::engine())
    }

    /// Confines every ancestor walk, block search and selection to the
    /// subtree at `root`. The element at `root` itself is never classified.
    pub fn with_root(mut self, root: Path) -> Self {
        self.root = root;
        self
    }

    pub fn with_config(mut self, config: EditorConfig) -> Self {
        self.config = config.with_defaults();
        self
    }

    pub fn with_recorder(mut self, recorder: impl EditRecorder + 'static) -> Self {
        self.recorder = Some(Box::new(recorder));
        self
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn root(&self) -> &[usize] {
        &self.root
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// The raw selection as last written, whether or not it lies in the
    /// editable root.
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// The selection the engine operates on: `None` when the host has no
    /// selection or when either point lies outside the editable root.
    pub fn current_selection(&self) -> Option<Selection> {
        let selection = self.selection.as_ref()?;
        let root = self.root.as_slice();
        let inside = |point: &Point| point.path.len() > root.len() && point.path.starts_with(root);
        (inside(&selection.anchor) && inside(&selection.focus)).then(|| selection.clone())
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = Some(selection);
        self.normalize_selection_in_place();
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn apply(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        let outcome = self.run_transaction(&tx)?;
        let selection_before = self.selection.take();

        self.doc = outcome.doc;
        self.selection = outcome.selection;

        log::trace!(
            target: "plate_engine::apply",
            "applied {} ops ({} from normalization) source={:?}",
            outcome.ops.len(),
            outcome.ops.len().saturating_sub(tx.ops.len()),
            tx.meta.source
        );

        let step = EditStep {
            source: tx.meta.source,
            ops: outcome.ops,
            inverse_ops: outcome.inverse_ops,
            selection_before,
            selection_after: self.selection.clone(),
        };
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record(&step);
        }
        Ok(())
    }

    pub fn preview_transaction(&self, tx: &Transaction) -> Result<TransactionPreview, ApplyError> {
        let outcome = self.run_transaction(tx)?;
        Ok(TransactionPreview {
            doc: outcome.doc,
            selection: outcome.selection,
        })
    }

    pub fn run_command(
        &mut self,
        id: &str,
        args: Option<serde_json::Value>,
    ) -> Result<(), CommandError> {
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

    /// Applies `tx` to a copy of the document so a failing op leaves the live
    /// tree untouched.
    fn run_transaction(&self, tx: &Transaction) -> Result<TransactionOutcome, ApplyError> {
        let mut doc = self.doc.clone();
        let mut selection = self.selection.clone();
        let mut ops: Vec<Op> = Vec::new();
        let mut inverse_ops: Vec<Op> = Vec::new();

        for op in tx.ops.iter().cloned() {
            inverse_ops.push(apply_op_to(&mut doc, &mut selection, op.clone())?);
            ops.push(op);
        }

        if let Some(sel) = &tx.selection_after {
            selection = Some(sel.clone());
        }

        let mut converged = false;
        for round in 0..self.config.max_normalize_iterations {
            let pass_ops = self.registry.normalize(&doc);
            if pass_ops.is_empty() {
                converged = true;
                break;
            }
            log::trace!(
                target: "plate_engine::normalize",
                "round {round}: {} ops",
                pass_ops.len()
            );
            for op in pass_ops {
                inverse_ops.push(apply_op_to(&mut doc, &mut selection, op.clone())?);
                ops.push(op);
            }
        }
        if !converged {
            return Err(ApplyError::NormalizeDidNotConverge);
        }

        inverse_ops.reverse();
        let selection = selection.map(|sel| tree::normalize_selection(&doc, &sel));

        Ok(TransactionOutcome {
            doc,
            selection,
            ops,
            inverse_ops,
        })
    }

    fn normalize_in_place(&mut self) {
        match self.run_transaction(&Transaction::default()) {
            Ok(outcome) => {
                self.doc = outcome.doc;
                self.selection = outcome.selection;
            }
            Err(err) => {
                log::warn!(target: "plate_engine::normalize", "initial normalize failed: {err}");
                self.normalize_selection_in_place();
            }
        }
    }

    fn normalize_selection_in_place(&mut self) {
        if let Some(selection) = self.selection.as_ref() {
            self.selection = Some(tree::normalize_selection(&self.doc, selection));
        }
    }
}

struct TransactionOutcome {
    doc: Document,
    selection: Option<Selection>,
    ops: Vec<Op>,
    inverse_ops: Vec<Op>,
}

fn apply_op_to(
    doc: &mut Document,
    selection: &mut Option<Selection>,
    op: Op,
) -> Result<Op, ApplyError> {
    match op {
        Op::InsertText { path, offset, text } => {
            let text_node = node_text_mut(doc, &path)?;
            let offset = clamp_to_char_boundary(&text_node.text, offset);
            text_node.text.insert_str(offset, &text);
            transform_selection_insert_text(selection, &path, offset, text.len());
            Ok(Op::RemoveText {
                path,
                range: offset..offset + text.len(),
            })
        }
        Op::RemoveText { path, range } => {
            let text_node = node_text_mut(doc, &path)?;
            let start =
                clamp_to_char_boundary(&text_node.text, range.start.min(text_node.text.len()));
            let end = clamp_to_char_boundary(&text_node.text, range.end.min(text_node.text.len()));
            if start >= end {
                return Ok(Op::InsertText {
                    path,
                    offset: start,
                    text: String::new(),
                });
            }
            let removed = text_node.text[start..end].to_string();
            text_node.text.replace_range(start..end, "");
            transform_selection_remove_text(selection, &path, start..end);
            Ok(Op::InsertText {
                path,
                offset: start,
                text: removed,
            })
        }
        Op::InsertNode { path, node } => {
            insert_node(doc, &path, node)?;
            transform_selection_insert_node(selection, &path);
            Ok(Op::RemoveNode { path })
        }
        Op::RemoveNode { path } => {
            let removed = remove_node(doc, &path)?;
            transform_selection_remove_node(selection, &path, &removed, doc);
            Ok(Op::InsertNode {
                path,
                node: removed,
            })
        }
        Op::SetNodeAttrs { path, patch } => {
            let node = node_mut(doc, &path)?;
            let old = match node {
                Node::Element(el) => patch_apply(&mut el.attrs, &patch),
                Node::Void(v) => patch_apply(&mut v.attrs, &patch),
                Node::Text(_) => return Err(ApplyError::InvalidPath("Text has no attrs".into())),
            };
            Ok(Op::SetNodeAttrs { path, patch: old })
        }
        Op::SetNodeKind { path, kind } => {
            let Node::Element(el) = node_mut(doc, &path)? else {
                return Err(ApplyError::InvalidPath("Only elements have a kind".into()));
            };
            let old = std::mem::replace(&mut el.kind, kind);
            Ok(Op::SetNodeKind { path, kind: old })
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("normalization did not converge")]
    NormalizeDidNotConverge,
}

impl From<PathError> for ApplyError {
    fn from(value: PathError) -> Self {
        ApplyError::InvalidPath(value.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct PathError(pub String);

pub(crate) fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

fn selection_points(selection: &mut Option<Selection>) -> impl Iterator<Item = &mut Point> {
    selection
        .iter_mut()
        .flat_map(|sel| [&mut sel.anchor, &mut sel.focus])
}

fn transform_selection_insert_text(
    selection: &mut Option<Selection>,
    path: &[usize],
    offset: usize,
    len: usize,
) {
    for point in selection_points(selection) {
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
    let removed_len = range.end.saturating_sub(range.start);
    for point in selection_points(selection) {
        if point.path != path {
            continue;
        }
        if point.offset <= range.start {
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
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };

    for point in selection_points(selection) {
        if point.path.len() <= parent_path.len() {
            continue;
        }
        if !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        if point.path[depth] >= index {
            point.path[depth] += 1;
        }
    }
}

fn transform_selection_remove_node(
    selection: &mut Option<Selection>,
    path: &[usize],
    removed: &Node,
    doc_after_remove: &Document,
) {
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };

    // A text leaf removed right after its merge into the left sibling keeps
    // the point on the merged text.
    let merge_prefix_len = match (removed, index.checked_sub(1)) {
        (Node::Text(removed_text), Some(left_index)) => {
            let mut left_path = parent_path.to_vec();
            left_path.push(left_index);
            match tree::node_at_path(doc_after_remove, &left_path) {
                Some(Node::Text(left_text)) if left_text.text.ends_with(&removed_text.text) => {
                    Some(left_text.text.len().saturating_sub(removed_text.text.len()))
                }
                _ => None,
            }
        }
        _ => None,
    };

    for point in selection_points(selection) {
        if point.path.len() <= parent_path.len() {
            continue;
        }
        if !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        let ix = point.path[depth];
        if ix > index {
            point.path[depth] = ix - 1;
            continue;
        }
        if ix < index {
            continue;
        }

        if let (Some(prefix), Node::Text(removed_text), Some(left_index)) =
            (merge_prefix_len, removed, index.checked_sub(1))
        {
            point.path.truncate(depth + 1);
            point.path[depth] = left_index;
            point.offset = (prefix + point.offset).min(prefix + removed_text.text.len());
        } else {
            point.path.truncate(depth + 1);
            point.path[depth] = index.saturating_sub(1);
            point.offset = 0;
        }
    }
}

fn node_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut Node, PathError> {
    let Some((&first, rest)) = path.split_first() else {
        return Err(PathError("Empty path".into()));
    };

    let len = doc.children.len();
    let mut node = doc
        .children
        .get_mut(first)
        .ok_or_else(|| PathError(format!("Path out of bounds at depth 0: {first} >= {len}")))?;

    for (depth, &ix) in rest.iter().enumerate() {
        node = match node {
            Node::Element(el) => {
                let len = el.children.len();
                el.children.get_mut(ix).ok_or_else(|| {
                    PathError(format!(
                        "Path out of bounds at depth {}: {ix} >= {len}",
                        depth + 1
                    ))
                })?
            }
            Node::Void(_) | Node::Text(_) => {
                return Err(PathError(format!("Non-container node at depth {depth}")));
            }
        };
    }

    Ok(node)
}

fn node_text_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut TextNode, PathError> {
    match node_mut(doc, path)? {
        Node::Text(t) => Ok(t),
        _ => Err(PathError("Expected Text node".into())),
    }
}

fn children_mut<'a>(
    doc: &'a mut Document,
    parent_path: &[usize],
) -> Result<&'a mut Vec<Node>, PathError> {
    if parent_path.is_empty() {
        return Ok(&mut doc.children);
    }
    match node_mut(doc, parent_path)? {
        Node::Element(el) => Ok(&mut el.children),
        Node::Void(_) | Node::Text(_) => Err(PathError("Parent is not a container".into())),
    }
}

fn insert_node(doc: &mut Document, path: &[usize], node: Node) -> Result<(), PathError> {
    let Some((&index, parent_path)) = path.split_last() else {
        return Err(PathError("Empty insert path".into()));
    };

    let children = children_mut(doc, parent_path)?;
    if index > children.len() {
        return Err(PathError(format!(
            "Insert index out of bounds: {index} > {}",
            children.len()
        )));
    }
    children.insert(index, node);
    Ok(())
}

fn remove_node(doc: &mut Document, path: &[usize]) -> Result<Node, PathError> {
    let Some((&index, parent_path)) = path.split_last() else {
        return Err(PathError("Empty remove path".into()));
    };

    let children = children_mut(doc, parent_path)?;
    if index >= children.len() {
        return Err(PathError(format!(
            "Remove index out of bounds: {index} >= {}",
            children.len()
        )));
    }
    Ok(children.remove(index))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttrPatch {
    #[serde(default)]
    pub set: Attrs,
    #[serde(default)]
    pub remove: Vec<String>,
}

fn patch_apply(attrs: &mut Attrs, patch: &AttrPatch) -> AttrPatch {
    let mut old_set: Attrs = Attrs::new();
    let mut old_remove: Vec<String> = Vec::new();

    for (k, v) in &patch.set {
        if let Some(prev) = attrs.insert(k.clone(), v.clone()) {
            old_set.insert(k.clone(), prev);
        } else {
            old_remove.push(k.clone());
        }
    }

    for key in &patch.remove {
        if let Some(prev) = attrs.remove(key) {
            old_set.insert(key.clone(), prev);
        }
    }

    AttrPatch {
        set: old_set,
        remove: old_remove,
    }
}
