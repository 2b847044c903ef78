//! Read-only tree walks: path resolution, ancestor classification and text
//! leaf lookup. Every walk that climbs toward the document stops below the
//! editable `root` path and never reports the root itself.

use crate::core::{Document, ElementNode, Node, Point, Selection};
use crate::ops::{Path, child_path};
use crate::schema::{self, kind};

pub fn node_at_path<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a Node> {
    let (&first, rest) = path.split_first()?;
    let mut node = doc.children.get(first)?;
    for &ix in rest {
        node = match node {
            Node::Element(el) => el.children.get(ix)?,
            Node::Void(_) | Node::Text(_) => return None,
        };
    }
    Some(node)
}

pub fn element_at<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a ElementNode> {
    node_at_path(doc, path)?.as_element()
}

pub fn children_at<'a>(doc: &'a Document, parent_path: &[usize]) -> Option<&'a [Node]> {
    if parent_path.is_empty() {
        return Some(&doc.children);
    }
    element_at(doc, parent_path).map(|el| el.children.as_slice())
}

/// Nearest element at or above `path` whose kind matches `wanted`
/// (ASCII case-insensitive), without escaping `root`.
pub fn ancestor_of_kind(
    doc: &Document,
    root: &[usize],
    path: &[usize],
    wanted: &str,
) -> Option<Path> {
    ancestor_where(doc, root, path, |el| el.kind.eq_ignore_ascii_case(wanted))
}

pub fn nearest_block(doc: &Document, root: &[usize], path: &[usize]) -> Option<Path> {
    ancestor_where(doc, root, path, |el| schema::is_block_kind(&el.kind))
}

/// Nearest element that directly holds inline content (a text block or a
/// caption).
pub fn nearest_inline_container(doc: &Document, root: &[usize], path: &[usize]) -> Option<Path> {
    ancestor_where(doc, root, path, |el| schema::holds_inline_content(&el.kind))
}

fn ancestor_where(
    doc: &Document,
    root: &[usize],
    path: &[usize],
    matches: impl Fn(&ElementNode) -> bool,
) -> Option<Path> {
    if !path.starts_with(root) {
        return None;
    }
    for len in (root.len() + 1..=path.len()).rev() {
        let candidate = &path[..len];
        if let Some(Node::Element(el)) = node_at_path(doc, candidate) {
            if matches(el) {
                return Some(candidate.to_vec());
            }
        }
    }
    None
}

/// Every path from `path` up to (excluding) `root` naming an element of
/// `wanted`, innermost first.
pub fn ancestors_of_kind(
    doc: &Document,
    root: &[usize],
    path: &[usize],
    wanted: &str,
) -> Vec<Path> {
    if !path.starts_with(root) {
        return Vec::new();
    }
    (root.len() + 1..=path.len())
        .rev()
        .map(|len| &path[..len])
        .filter(|candidate| {
            element_at(doc, candidate).is_some_and(|el| el.kind.eq_ignore_ascii_case(wanted))
        })
        .map(<[usize]>::to_vec)
        .collect()
}

/// The list container holding the list item at `item_path`, if any.
pub fn list_container_of(doc: &Document, item_path: &[usize]) -> Option<(Path, &'static str)> {
    let (_, parent) = item_path.split_last()?;
    if parent.is_empty() {
        return None;
    }
    let el = element_at(doc, parent)?;
    let list_kind = *schema::LIST_KINDS.iter().find(|k| **k == el.kind)?;
    Some((parent.to_vec(), list_kind))
}

/// Inline-content holders under `root`, in document order.
pub fn inline_containers_in_order(doc: &Document, root: &[usize]) -> Vec<Path> {
    fn walk(nodes: &[Node], path: &mut Vec<usize>, out: &mut Vec<Path>) {
        for (ix, node) in nodes.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };
            path.push(ix);
            if schema::holds_inline_content(&el.kind) {
                out.push(path.clone());
            } else if !schema::is_inline_kind(&el.kind) {
                walk(&el.children, path, out);
            }
            path.pop();
        }
    }

    let mut out = Vec::new();
    if let Some(children) = children_at(doc, root) {
        walk(children, &mut root.to_vec(), &mut out);
    }
    out
}

/// The child of `root` on the way to `path`.
pub fn top_level_path(root: &[usize], path: &[usize]) -> Option<Path> {
    if path.len() <= root.len() || !path.starts_with(root) {
        return None;
    }
    Some(path[..=root.len()].to_vec())
}

pub fn first_text_point(doc: &Document, path: &[usize]) -> Option<Point> {
    let children = children_at(doc, path)?;
    first_text_descendant(children, &mut path.to_vec())
}

pub fn last_text_point(doc: &Document, path: &[usize]) -> Option<Point> {
    fn walk(children: &[Node], path: &mut Vec<usize>) -> Option<Point> {
        for (ix, node) in children.iter().enumerate().rev() {
            path.push(ix);
            let found = match node {
                Node::Text(t) => Some(Point::new(path.clone(), t.text.len())),
                Node::Element(el) => walk(&el.children, path),
                Node::Void(_) => None,
            };
            path.pop();
            if found.is_some() {
                return found;
            }
        }
        None
    }

    if let Some(Node::Text(t)) = node_at_path(doc, path) {
        return Some(Point::new(path.to_vec(), t.text.len()));
    }
    walk(children_at(doc, path)?, &mut path.to_vec())
}

fn first_text_descendant(children: &[Node], path: &mut Vec<usize>) -> Option<Point> {
    for (ix, node) in children.iter().enumerate() {
        path.push(ix);
        let found = match node {
            Node::Text(_) => Some(Point::new(path.clone(), 0)),
            Node::Element(el) => first_text_descendant(&el.children, path),
            Node::Void(_) => None,
        };
        path.pop();
        if found.is_some() {
            return found;
        }
    }
    None
}

pub fn normalize_selection(doc: &Document, selection: &Selection) -> Selection {
    let fallback =
        first_text_descendant(&doc.children, &mut Vec::new()).unwrap_or(Point::new(vec![0], 0));

    let anchor = normalize_point_to_existing_text(doc, &selection.anchor).unwrap_or_else(|| {
        normalize_point_to_existing_text(doc, &selection.focus).unwrap_or_else(|| fallback.clone())
    });
    let focus =
        normalize_point_to_existing_text(doc, &selection.focus).unwrap_or_else(|| anchor.clone());

    Selection { anchor, focus }
}

fn normalize_point_to_existing_text(doc: &Document, point: &Point) -> Option<Point> {
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
                let offset = crate::core::clamp_to_char_boundary(&t.text, point.offset);
                return Some(Point::new(resolved_path, offset));
            }
            Node::Element(el) => {
                children = &el.children;
            }
            Node::Void(_) => {
                break;
            }
        }
    }

    match node_at_path(doc, &resolved_path)? {
        Node::Text(t) => Some(Point::new(
            resolved_path,
            crate::core::clamp_to_char_boundary(&t.text, point.offset),
        )),
        Node::Element(el) => first_text_descendant(&el.children, &mut resolved_path),
        Node::Void(_) => None,
    }
}

/// Collapsed point at the end of the element at `path`, falling back to a
/// point on its (normalization-inserted) first text leaf.
pub fn end_of(doc: &Document, path: &[usize]) -> Point {
    last_text_point(doc, path).unwrap_or_else(|| Point::new(child_path(path, 0), 0))
}

pub fn is_list_item(el: &ElementNode) -> bool {
    el.kind == kind::LIST_ITEM
}
