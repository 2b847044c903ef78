//! Block and list structure: block type conversion, list item extraction
//! (with list splitting), list promotion/demotion and alignment.

use serde_json::Value;

use crate::core::{AttrPatch, Attrs, Editor, ElementNode, Node, Point, Selection};
use crate::ops::{Op, Path, Transaction, child_path, parent_path, sibling_path};
use crate::plugin::{CommandError, Outcome, Skip, commit, skipped};
use crate::range;
use crate::schema::{self, ListKind, kind};
use crate::tree;

const TARGET: &str = "plate_engine::block";

/// Converts the block under the selection anchor into `tag`. A list item is
/// pulled out of its list; the list is split when the item sits between
/// other items.
pub fn set_block_type(editor: &mut Editor, tag: &str) -> Result<Outcome, CommandError> {
    let kind = schema::resolve_kind(tag)
        .filter(|k| schema::is_block_kind(k))
        .ok_or_else(|| CommandError::new(format!("Not a block type: {tag}")))?;
    let action = format!("set block type {kind}");

    let Some(selection) = editor.current_selection() else {
        return skipped(TARGET, &action, Skip::NoSelection);
    };
    let block = tree::nearest_block(editor.doc(), editor.root(), &selection.anchor.path);
    let Some(block_path) = block else {
        return skipped(TARGET, &action, Skip::NoBlock);
    };
    let Some(block) = tree::element_at(editor.doc(), &block_path) else {
        return skipped(TARGET, &action, Skip::NoBlock);
    };

    if block.kind == kind {
        return skipped(TARGET, &action, Skip::AlreadyApplied);
    }
    if !schema::TEXT_BLOCK_KINDS.contains(&kind) {
        return Err(CommandError::new(format!("Not a text block type: {tag}")));
    }
    if block.kind == kind::FIGURE {
        return skipped(TARGET, &action, Skip::Unsupported);
    }
    if tree::is_list_item(block) {
        return extract_list_item(editor, &block_path, kind, &action);
    }

    let replacement = Node::Element(replacement_block(kind, block));
    let caret = end_of_node(&replacement, &block_path);
    let tx = Transaction::new(vec![
        Op::RemoveNode {
            path: block_path.clone(),
        },
        Op::InsertNode {
            path: block_path,
            node: replacement,
        },
    ])
    .selection_after(Selection::collapsed(caret))
    .source(format!("command:block.set_type:{kind}"));
    commit(editor, tx, &action)
}

/// Toggles the list `list` around the block under the selection anchor:
/// demote when already in such a list, convert a list of the other kind in
/// place, otherwise promote the block into a new single-item list.
pub fn toggle_list(editor: &mut Editor, list: ListKind) -> Result<Outcome, CommandError> {
    let action = format!("toggle {} list", list.name());
    let Some(selection) = editor.current_selection() else {
        return skipped(TARGET, &action, Skip::NoSelection);
    };
    let block = tree::nearest_block(editor.doc(), editor.root(), &selection.anchor.path);
    let Some(block_path) = block else {
        return skipped(TARGET, &action, Skip::NoBlock);
    };
    let Some(block) = tree::element_at(editor.doc(), &block_path) else {
        return skipped(TARGET, &action, Skip::NoBlock);
    };

    if block.kind == kind::FIGURE {
        return skipped(TARGET, &action, Skip::Unsupported);
    }

    if tree::is_list_item(block) {
        if let Some((list_path, list_kind)) = tree::list_container_of(editor.doc(), &block_path) {
            if list_kind == list.kind() {
                return extract_list_item(editor, &block_path, kind::PARAGRAPH, &action);
            }

            log::trace!(target: TARGET, "{action}: converting {list_kind} at {list_path:?}");
            let tx = Transaction::new(vec![Op::SetNodeKind {
                path: list_path,
                kind: list.kind().to_string(),
            }])
            .selection_after(selection)
            .source(format!("command:list.toggle:{}", list.name()));
            return commit(editor, tx, &action);
        }
    }

    let mut item = ElementNode::new(kind::LIST_ITEM, block.children.clone());
    if let Some(align) = block.attrs.get("align") {
        item.attrs.insert("align".to_string(), align.clone());
    }
    let wrapped = Node::element(list.kind(), vec![Node::Element(item)]);

    // The block's content moves down two levels: block/i/.. -> list/0/i/..
    let promote = |point: &Point| {
        if !point.is_within(&block_path) || point.path.len() <= block_path.len() {
            return point.clone();
        }
        let mut path = child_path(&block_path, 0);
        path.extend_from_slice(&point.path[block_path.len()..]);
        Point::new(path, point.offset)
    };
    let selection_after = Selection::new(promote(&selection.anchor), promote(&selection.focus));

    let tx = Transaction::new(vec![
        Op::RemoveNode {
            path: block_path.clone(),
        },
        Op::InsertNode {
            path: block_path,
            node: wrapped,
        },
    ])
    .selection_after(selection_after)
    .source(format!("command:list.toggle:{}", list.name()));
    commit(editor, tx, &action)
}

/// Sets the `align` attribute on the block under the selection anchor.
pub fn set_alignment(editor: &mut Editor, value: &str) -> Result<Outcome, CommandError> {
    let value = value.trim().to_ascii_lowercase();
    if !schema::ALIGN_VALUES.contains(&value.as_str()) {
        return Err(CommandError::new(format!("Unknown alignment: {value}")));
    }
    let action = format!("align {value}");

    let Some(selection) = editor.current_selection() else {
        return skipped(TARGET, &action, Skip::NoSelection);
    };
    let block = tree::nearest_block(editor.doc(), editor.root(), &selection.anchor.path);
    let Some(block_path) = block else {
        return skipped(TARGET, &action, Skip::NoBlock);
    };
    let current = tree::element_at(editor.doc(), &block_path).and_then(|el| el.attr_str("align"));
    if current == Some(value.as_str()) {
        return skipped(TARGET, &action, Skip::AlreadyApplied);
    }

    let mut set = Attrs::default();
    set.insert("align".to_string(), Value::String(value.clone()));
    let tx = Transaction::new(vec![Op::SetNodeAttrs {
        path: block_path,
        patch: AttrPatch {
            set,
            remove: Vec::new(),
        },
    }])
    .selection_after(selection)
    .source(format!("command:block.set_align:{value}"));
    commit(editor, tx, &action)
}

/// New block of `kind` with the old block's content; only alignment carries
/// over.
fn replacement_block(kind: &str, old: &ElementNode) -> ElementNode {
    let mut el = ElementNode::new(kind, old.children.clone());
    if let Some(align) = old.attrs.get("align") {
        el.attrs.insert("align".to_string(), align.clone());
    }
    el
}

fn end_of_node(node: &Node, path: &[usize]) -> Point {
    range::node_bounds(node, path)
        .map(|(_, end)| end)
        .unwrap_or_else(|| Point::new(child_path(path, 0), 0))
}

/// Replaces the list item at `item_path` with a `kind` block placed outside
/// its list:
/// - only item: the block replaces the whole list;
/// - first item: the block goes before the list;
/// - last item: the block goes after the list;
/// - otherwise the items after it move into a new list of the same kind,
///   placed after the block.
fn extract_list_item(
    editor: &mut Editor,
    item_path: &[usize],
    kind: &str,
    action: &str,
) -> Result<Outcome, CommandError> {
    let doc = editor.doc();
    let Some(item) = tree::element_at(doc, item_path) else {
        return skipped(TARGET, action, Skip::NoBlock);
    };
    let Some((list_path, list_kind)) = tree::list_container_of(doc, item_path) else {
        return skipped(TARGET, action, Skip::Unsupported);
    };
    let Some(list) = tree::element_at(doc, &list_path) else {
        return skipped(TARGET, action, Skip::Unsupported);
    };
    let (Some(&ix), Some(&list_ix)) = (item_path.last(), list_path.last()) else {
        return skipped(TARGET, action, Skip::Unsupported);
    };

    let count = list.children.len();
    let replacement = Node::Element(replacement_block(kind, item));
    let after_list = sibling_path(&list_path, list_ix + 1);

    let (ops, block_path): (Vec<Op>, Path) = if count == 1 {
        (
            vec![
                Op::RemoveNode {
                    path: list_path.clone(),
                },
                Op::InsertNode {
                    path: list_path.clone(),
                    node: replacement.clone(),
                },
            ],
            list_path.clone(),
        )
    } else if ix == 0 {
        (
            vec![
                Op::RemoveNode {
                    path: item_path.to_vec(),
                },
                Op::InsertNode {
                    path: list_path.clone(),
                    node: replacement.clone(),
                },
            ],
            list_path.clone(),
        )
    } else if ix + 1 == count {
        (
            vec![
                Op::RemoveNode {
                    path: item_path.to_vec(),
                },
                Op::InsertNode {
                    path: after_list.clone(),
                    node: replacement.clone(),
                },
            ],
            after_list.clone(),
        )
    } else {
        let rest = list.children[ix + 1..].to_vec();
        let tail = ElementNode::new(list_kind, rest).with_attrs(list.attrs.clone());
        let mut ops: Vec<Op> = (ix..count)
            .rev()
            .map(|j| Op::RemoveNode {
                path: child_path(&list_path, j),
            })
            .collect();
        ops.push(Op::InsertNode {
            path: after_list.clone(),
            node: replacement.clone(),
        });
        ops.push(Op::InsertNode {
            path: sibling_path(&list_path, list_ix + 2),
            node: Node::Element(tail),
        });
        (ops, after_list.clone())
    };

    log::trace!(
        target: TARGET,
        "{action}: item {ix} of {count} in {list_kind} at {:?}",
        parent_path(item_path)
    );
    let caret = end_of_node(&replacement, &block_path);
    let tx = Transaction::new(ops)
        .selection_after(Selection::collapsed(caret))
        .source(format!("command:block.extract_list_item:{kind}"));
    commit(editor, tx, action)
}
