//! Ranges over inline content.
//!
//! A selection is turned into [`Segment`]s, one per inline container it
//! touches, each carrying container-local text offsets. Mutations are planned
//! as pure rewrites of a container's children (split, extract, strip, wrap)
//! and then emitted as remove/insert ops, so every edit is one recordable
//! transaction.

use crate::core::{Attrs, Document, ElementNode, Node, Point, Selection};
use crate::ops::{Op, Path, child_path};
use crate::tree;

/// The part of a selection that falls inside one inline container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub container: Path,
    pub start: usize,
    pub end: usize,
}

impl Segment {
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// At a leaf boundary, prefer the start of the following leaf.
    Forward,
    /// At a leaf boundary, prefer the end of the preceding leaf.
    Backward,
}

impl Point {
    /// Closed containment: a point on the first or last character boundary of
    /// the node at `path` is inside it.
    pub fn is_within(&self, path: &[usize]) -> bool {
        self.path.starts_with(path)
    }
}

/// Every inline container the selection overlaps, in document order, with the
/// selected local range of each.
pub fn blocks_intersecting(doc: &Document, root: &[usize], selection: &Selection) -> Vec<Segment> {
    let (start, end) = selection.ordered();
    let mut out = Vec::new();

    for container in tree::inline_containers_in_order(doc, root) {
        let holds_start = start.is_within(&container);
        let holds_end = end.is_within(&container);
        let after_start = holds_start || container.as_slice() > start.path.as_slice();
        let before_end = holds_end || container.as_slice() < end.path.as_slice();
        if !(after_start && before_end) {
            continue;
        }

        let len = tree::children_at(doc, &container).map_or(0, inline_len);
        let local_start = if holds_start {
            offset_in_container(doc, &container, start).unwrap_or(0)
        } else {
            0
        };
        let local_end = if holds_end {
            offset_in_container(doc, &container, end).unwrap_or(len)
        } else {
            len
        };
        out.push(Segment {
            container,
            start: local_start,
            end: local_end,
        });
    }
    out
}

/// Deepest element holding both selection points (the parents of their text
/// leaves), bounded below `root`.
pub fn common_container(root: &[usize], selection: &Selection) -> Option<Path> {
    let (start, end) = selection.ordered();
    let start_parent = start.path.split_last()?.1;
    let end_parent = end.path.split_last()?.1;
    let shared = start_parent
        .iter()
        .zip(end_parent)
        .take_while(|(a, b)| a == b)
        .count();
    let common = &start_parent[..shared];
    (common.len() > root.len() && common.starts_with(root)).then(|| common.to_vec())
}

/// Segment spanning the whole selection inside `container`.
pub fn segment_in(doc: &Document, container: &[usize], selection: &Selection) -> Option<Segment> {
    let (start, end) = selection.ordered();
    Some(Segment {
        container: container.to_vec(),
        start: offset_in_container(doc, container, start)?,
        end: offset_in_container(doc, container, end)?,
    })
}

pub fn inline_len(nodes: &[Node]) -> usize {
    nodes.iter().map(Node::text_len).sum()
}

fn text_leaves(nodes: &[Node], base: &[usize]) -> Vec<(Path, usize)> {
    fn walk(nodes: &[Node], path: &mut Vec<usize>, out: &mut Vec<(Path, usize)>) {
        for (ix, node) in nodes.iter().enumerate() {
            path.push(ix);
            match node {
                Node::Text(t) => out.push((path.clone(), t.text.len())),
                Node::Element(el) => walk(&el.children, path, out),
                Node::Void(_) => {}
            }
            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(nodes, &mut base.to_vec(), &mut out);
    out
}

/// Text offset of `point` counted from the start of `container`.
pub fn offset_in_container(doc: &Document, container: &[usize], point: &Point) -> Option<usize> {
    if !point.is_within(container) {
        return None;
    }
    let children = tree::children_at(doc, container)?;
    let mut offset = 0;
    for (path, len) in text_leaves(children, container) {
        if path == point.path {
            return Some(offset + point.offset.min(len));
        }
        offset += len;
    }
    None
}

pub fn point_at_offset(
    doc: &Document,
    container: &[usize],
    offset: usize,
    bias: Bias,
) -> Option<Point> {
    point_in_children(tree::children_at(doc, container)?, container, offset, bias)
}

/// Like [`point_at_offset`], for children that are about to replace those of
/// `container`.
pub fn point_in_children(
    children: &[Node],
    container: &[usize],
    offset: usize,
    bias: Bias,
) -> Option<Point> {
    let leaves = text_leaves(children, container);
    let mut remaining = offset;
    for (ix, (path, len)) in leaves.iter().enumerate() {
        let last = ix + 1 == leaves.len();
        let at_boundary = remaining == *len && (bias == Bias::Backward || last);
        if remaining < *len || at_boundary {
            return Some(Point::new(path.clone(), remaining));
        }
        remaining -= len;
    }
    leaves
        .last()
        .map(|(path, len)| Point::new(path.clone(), *len))
}

/// Splits inline content at a text offset. Elements straddling the offset
/// are duplicated so each side keeps its ancestry.
pub fn split_nodes(nodes: &[Node], at: usize) -> (Vec<Node>, Vec<Node>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut cursor = 0;

    for node in nodes {
        let len = node.text_len();
        let (start, end) = (cursor, cursor + len);
        cursor = end;

        if end <= at && start < at {
            left.push(node.clone());
            continue;
        }
        if start >= at {
            right.push(node.clone());
            continue;
        }

        let local = at - start;
        match node {
            Node::Text(t) => {
                let local = crate::core::clamp_to_char_boundary(&t.text, local);
                left.push(Node::text(&t.text[..local]));
                right.push(Node::text(&t.text[local..]));
            }
            Node::Element(el) => {
                let (l, r) = split_nodes(&el.children, local);
                left.push(Node::Element(ElementNode {
                    kind: el.kind.clone(),
                    attrs: el.attrs.clone(),
                    children: l,
                }));
                right.push(Node::Element(ElementNode {
                    kind: el.kind.clone(),
                    attrs: el.attrs.clone(),
                    children: r,
                }));
            }
            Node::Void(_) => right.push(node.clone()),
        }
    }

    (left, right)
}

/// `(before, selected, after)` around `[start, end)`.
pub fn extract(nodes: &[Node], start: usize, end: usize) -> (Vec<Node>, Vec<Node>, Vec<Node>) {
    let (before, rest) = split_nodes(nodes, start);
    let (middle, after) = split_nodes(&rest, end.saturating_sub(start));
    (before, middle, after)
}

/// Replaces every element of `kind` with its children, recursively.
pub fn strip_kind(nodes: Vec<Node>, kind: &str) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Element(el) if el.kind == kind => out.extend(strip_kind(el.children, kind)),
            Node::Element(mut el) => {
                el.children = strip_kind(el.children, kind);
                out.push(Node::Element(el));
            }
            other => out.push(other),
        }
    }
    out
}

fn is_prunable(node: &Node) -> bool {
    fn has_void(node: &Node) -> bool {
        match node {
            Node::Void(_) => true,
            Node::Element(el) => el.children.iter().any(has_void),
            Node::Text(_) => false,
        }
    }
    match node {
        Node::Text(t) => t.text.is_empty(),
        Node::Element(_) => node.text_len() == 0 && !has_void(node),
        Node::Void(_) => false,
    }
}

/// Drops empty text leaves and empty inline elements, and merges adjacent
/// text leaves.
pub fn tidy(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        let node = match node {
            Node::Element(mut el) => {
                el.children = tidy(el.children);
                Node::Element(el)
            }
            other => other,
        };
        if is_prunable(&node) {
            continue;
        }
        if let Node::Text(next) = &node {
            if let Some(Node::Text(prev)) = out.last_mut() {
                prev.text.push_str(&next.text);
                continue;
            }
        }
        out.push(node);
    }
    out
}

/// New children for a container plus the index of the wrapper among them.
#[derive(Debug, Clone)]
pub struct Rewrite {
    pub children: Vec<Node>,
    pub wrapper: usize,
}

/// Extracts `[start, end)`, strips same-kind elements from the fragment,
/// wraps it in a new element and puts it back in place.
pub fn wrap_nodes(nodes: &[Node], start: usize, end: usize, kind: &str, attrs: &Attrs) -> Rewrite {
    let (before, middle, after) = extract(nodes, start, end);
    let before = tidy(before);
    let middle = tidy(strip_kind(middle, kind));
    let after = tidy(after);

    let wrapper = before.len();
    let mut children = before;
    children.push(Node::Element(ElementNode {
        kind: kind.to_string(),
        attrs: attrs.clone(),
        children: middle,
    }));
    children.extend(after);

    Rewrite { children, wrapper }
}

/// Splices out every element of `kind` overlapping `[start, end)`, keeping
/// its children in place. The whole element goes, not only the overlapping
/// part.
pub fn unwrap_kind_in_range(nodes: &[Node], start: usize, end: usize, kind: &str) -> Vec<Node> {
    fn walk(nodes: &[Node], base: usize, start: usize, end: usize, kind: &str) -> Vec<Node> {
        let mut out = Vec::with_capacity(nodes.len());
        let mut cursor = base;
        for node in nodes {
            let len = node.text_len();
            let (node_start, node_end) = (cursor, cursor + len);
            cursor = node_end;
            let overlaps = node_start < end && node_end > start;

            match node {
                Node::Element(el) if overlaps && el.kind == kind => {
                    out.extend(walk(&el.children, node_start, start, end, kind));
                }
                Node::Element(el) if overlaps => {
                    out.push(Node::Element(ElementNode {
                        kind: el.kind.clone(),
                        attrs: el.attrs.clone(),
                        children: walk(&el.children, node_start, start, end, kind),
                    }));
                }
                other => out.push(other.clone()),
            }
        }
        out
    }

    tidy(walk(nodes, 0, start, end, kind))
}

/// Whether every character in `[start, end)` has an ancestor of `kind`,
/// counting `inside` as an ancestor already seen. Empty ranges are never
/// covered.
pub fn covered_by_kind(nodes: &[Node], start: usize, end: usize, kind: &str, inside: bool) -> bool {
    fn walk(
        nodes: &[Node],
        base: usize,
        start: usize,
        end: usize,
        kind: &str,
        inside: bool,
    ) -> bool {
        let mut cursor = base;
        for node in nodes {
            let len = node.text_len();
            let (node_start, node_end) = (cursor, cursor + len);
            cursor = node_end;
            if !(node_start < end && node_end > start) {
                continue;
            }
            let covered = match node {
                Node::Text(_) => inside,
                Node::Element(el) => {
                    let inside = inside || el.kind.eq_ignore_ascii_case(kind);
                    walk(&el.children, node_start, start, end, kind, inside)
                }
                Node::Void(_) => true,
            };
            if !covered {
                return false;
            }
        }
        true
    }

    start < end && walk(nodes, 0, start, end, kind, inside)
}

/// Ops replacing all children of `container` with `children`.
pub fn replace_children_ops(container: &[usize], old_len: usize, children: Vec<Node>) -> Vec<Op> {
    let mut ops: Vec<Op> = (0..old_len)
        .rev()
        .map(|ix| Op::RemoveNode {
            path: child_path(container, ix),
        })
        .collect();
    ops.extend(
        children
            .into_iter()
            .enumerate()
            .map(|(ix, node)| Op::InsertNode {
                path: child_path(container, ix),
                node,
            }),
    );
    ops
}

/// First and last text positions inside a freshly built node, relative to
/// the path it will be inserted at.
pub fn node_bounds(node: &Node, path: &[usize]) -> Option<(Point, Point)> {
    let scratch = Document::new(vec![node.clone()]);
    let first = tree::first_text_point(&scratch, &[0])?;
    let last = tree::last_text_point(&scratch, &[0])?;
    let rebase = |point: Point| {
        let mut full = path.to_vec();
        full.extend_from_slice(&point.path[1..]);
        Point::new(full, point.offset)
    };
    Some((rebase(first), rebase(last)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::kind;

    fn bold(children: Vec<Node>) -> Node {
        Node::element(kind::BOLD, children)
    }

    #[test]
    fn split_duplicates_straddling_elements() {
        let nodes = vec![bold(vec![Node::text("hello")]), Node::text(" world")];
        let (left, right) = split_nodes(&nodes, 2);
        assert_eq!(left, vec![bold(vec![Node::text("he")])]);
        assert_eq!(
            right,
            vec![bold(vec![Node::text("llo")]), Node::text(" world")]
        );
    }

    #[test]
    fn wrap_strips_same_kind_from_fragment() {
        let nodes = vec![bold(vec![Node::text("hello")]), Node::text(" world")];
        let rewrite = wrap_nodes(&nodes, 2, 8, kind::BOLD, &Attrs::default());
        assert_eq!(
            rewrite.children,
            vec![
                bold(vec![Node::text("he")]),
                bold(vec![Node::text("llo wo")]),
                Node::text("rld"),
            ]
        );
        assert_eq!(rewrite.wrapper, 1);
    }

    #[test]
    fn tidy_prunes_empty_inline_elements_and_merges_text() {
        let nodes = vec![
            Node::text("ab"),
            bold(vec![Node::text("")]),
            Node::text("cd"),
        ];
        assert_eq!(tidy(nodes), vec![Node::text("abcd")]);
    }

    #[test]
    fn coverage_fails_on_a_single_plain_character() {
        let nodes = vec![bold(vec![Node::text("hello")]), Node::text(" world")];
        assert!(covered_by_kind(&nodes, 0, 5, kind::BOLD, false));
        assert!(!covered_by_kind(&nodes, 0, 6, kind::BOLD, false));
        assert!(!covered_by_kind(&nodes, 3, 3, kind::BOLD, false));
    }

    #[test]
    fn unwrap_removes_whole_overlapping_element() {
        let nodes = vec![Node::text("a "), bold(vec![Node::text("bold text")])];
        let out = unwrap_kind_in_range(&nodes, 7, 11, kind::BOLD);
        assert_eq!(out, vec![Node::text("a bold text")]);
    }
}
