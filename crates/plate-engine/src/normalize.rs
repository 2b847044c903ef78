//! Invariant upkeep run after every transaction. Each pass emits ops for a
//! single snapshot, deepest and last positions first, so applying them in
//! order never shifts a path that is still to come.

use crate::core::{Document, ElementNode, Node};
use crate::ops::{Op, child_path};
use crate::plugin::{ChildConstraint, NodeRole, NormalizePass, PluginRegistry};
use crate::schema::{self, kind};

fn role_of(el: &ElementNode, registry: &PluginRegistry) -> NodeRole {
    match registry.node_spec(&el.kind) {
        Some(spec) => spec.role.clone(),
        None if schema::is_inline_kind(&el.kind) => NodeRole::Inline,
        None if schema::is_list_kind(&el.kind) => NodeRole::Container,
        None => NodeRole::Block,
    }
}

fn holds_inline(el: &ElementNode, registry: &PluginRegistry) -> bool {
    match registry.node_spec(&el.kind) {
        Some(spec) => spec.children == ChildConstraint::InlineOnly,
        None => schema::holds_inline_content(&el.kind),
    }
}

fn has_void(node: &Node) -> bool {
    match node {
        Node::Void(_) => true,
        Node::Element(el) => el.children.iter().any(has_void),
        Node::Text(_) => false,
    }
}

fn has_text_leaf(nodes: &[Node]) -> bool {
    nodes.iter().any(|node| match node {
        Node::Text(_) => true,
        Node::Element(el) => has_text_leaf(&el.children),
        Node::Void(_) => false,
    })
}

pub(crate) struct EnsureNonEmptyDocument;

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

/// Removes inline elements with no text and no void content.
pub(crate) struct PruneEmptyInlineElements;

impl NormalizePass for PruneEmptyInlineElements {
    fn id(&self) -> &'static str {
        "core.prune_empty_inline_elements"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        fn walk(
            children: &[Node],
            path: &mut Vec<usize>,
            registry: &PluginRegistry,
            ops: &mut Vec<Op>,
        ) {
            for (ix, node) in children.iter().enumerate().rev() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                let empty = node.text_len() == 0 && !has_void(node);
                if empty && role_of(el, registry) == NodeRole::Inline {
                    ops.push(Op::RemoveNode { path: path.clone() });
                } else {
                    walk(&el.children, path, registry, ops);
                }
                path.pop();
            }
        }

        let mut ops = Vec::new();
        walk(&doc.children, &mut Vec::new(), registry, &mut ops);
        ops
    }
}

/// List containers hold list items only; anything else is wrapped in one,
/// and a container left with no items is removed.
pub(crate) struct EnsureListChildrenAreItems;

impl NormalizePass for EnsureListChildrenAreItems {
    fn id(&self) -> &'static str {
        "list.ensure_children_are_items"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        fn as_item(node: &Node) -> Node {
            match node {
                Node::Element(el) if schema::holds_inline_content(&el.kind) => {
                    let item = ElementNode::new(kind::LIST_ITEM, el.children.clone());
                    Node::Element(item.with_attrs(el.attrs.clone()))
                }
                other => Node::element(kind::LIST_ITEM, vec![other.clone()]),
            }
        }

        fn walk(
            children: &[Node],
            path: &mut Vec<usize>,
            registry: &PluginRegistry,
            ops: &mut Vec<Op>,
        ) {
            for (ix, node) in children.iter().enumerate().rev() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                if schema::is_list_kind(&el.kind) {
                    if el.children.is_empty() {
                        ops.push(Op::RemoveNode { path: path.clone() });
                    }
                    for (item_ix, item) in el.children.iter().enumerate().rev() {
                        if item.is_element_of(kind::LIST_ITEM) {
                            continue;
                        }
                        let item_path = child_path(path, item_ix);
                        ops.push(Op::RemoveNode {
                            path: item_path.clone(),
                        });
                        ops.push(Op::InsertNode {
                            path: item_path,
                            node: as_item(item),
                        });
                    }
                } else if !holds_inline(el, registry) {
                    walk(&el.children, path, registry, ops);
                }
                path.pop();
            }
        }

        let mut ops = Vec::new();
        walk(&doc.children, &mut Vec::new(), registry, &mut ops);
        ops
    }
}

/// Every block-level inline container keeps at least one text leaf so a
/// caret always has somewhere to land.
pub(crate) struct EnsureInlineContainersHaveTextLeaf;

impl NormalizePass for EnsureInlineContainersHaveTextLeaf {
    fn id(&self) -> &'static str {
        "core.ensure_inline_containers_have_text_leaf"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        fn walk(
            children: &[Node],
            path: &mut Vec<usize>,
            registry: &PluginRegistry,
            ops: &mut Vec<Op>,
        ) {
            for (ix, node) in children.iter().enumerate().rev() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                if holds_inline(el, registry) {
                    if role_of(el, registry) != NodeRole::Inline && !has_text_leaf(&el.children) {
                        ops.push(Op::InsertNode {
                            path: child_path(path, 0),
                            node: Node::text(""),
                        });
                    }
                } else {
                    walk(&el.children, path, registry, ops);
                }
                path.pop();
            }
        }

        let mut ops = Vec::new();
        walk(&doc.children, &mut Vec::new(), registry, &mut ops);
        ops
    }
}

pub(crate) struct MergeAdjacentTextLeaves;

impl NormalizePass for MergeAdjacentTextLeaves {
    fn id(&self) -> &'static str {
        "core.merge_adjacent_text_leaves"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        fn text_of(node: &Node) -> Option<&str> {
            match node {
                Node::Text(t) => Some(t.text.as_str()),
                _ => None,
            }
        }

        // Each run is folded right to left, one leaf into its left
        // neighbour at a time, so a caret in a removed leaf follows its text.
        fn merge_runs(children: &[Node], path: &[usize], ops: &mut Vec<Op>) {
            let mut ix = children.len();
            while ix > 0 {
                ix -= 1;
                let Some(last) = text_of(&children[ix]) else {
                    continue;
                };

                let mut suffix = last.to_string();
                let mut j = ix;
                while j > 0 {
                    let Some(left) = text_of(&children[j - 1]) else {
                        break;
                    };
                    if !suffix.is_empty() {
                        ops.push(Op::InsertText {
                            path: child_path(path, j - 1),
                            offset: left.len(),
                            text: suffix.clone(),
                        });
                    }
                    ops.push(Op::RemoveNode {
                        path: child_path(path, j),
                    });
                    suffix.insert_str(0, left);
                    j -= 1;
                }
                ix = j;
            }
        }

        fn walk(children: &[Node], path: &mut Vec<usize>, ops: &mut Vec<Op>) {
            for (ix, node) in children.iter().enumerate().rev() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                walk(&el.children, path, ops);
                merge_runs(&el.children, path, ops);
                path.pop();
            }
        }

        let mut ops = Vec::new();
        walk(&doc.children, &mut Vec::new(), &mut ops);
        ops
    }
}
