use crate::core::{Editor, Node, Point, Selection};
use crate::ops::{Op, Path, Transaction, child_path, sibling_path};
use crate::plugin::{CommandError, Outcome, Skip, commit, skipped};
use crate::schema::kind;
use crate::tree;

const TARGET: &str = "plate_engine::figure";

pub(crate) fn figure_node(src: &str, alt: Option<String>) -> Node {
    Node::element(
        kind::FIGURE,
        vec![
            Node::image(src, alt),
            Node::element(kind::CAPTION, vec![Node::text("")]),
        ],
    )
}

/// Inserts an image figure with an empty caption after the block under the
/// caret (after the whole list for a list item) and puts the caret at the
/// start of the caption. Outside any block the figure goes at the caret,
/// splitting the text leaf it sits in.
pub fn insert_figure(
    editor: &mut Editor,
    src: &str,
    alt: Option<String>,
) -> Result<Outcome, CommandError> {
    let src = src.trim();
    if src.is_empty() {
        return Err(CommandError::new("Figure source must not be empty"));
    }
    let action = "insert figure";
    let Some(selection) = editor.current_selection() else {
        return skipped(TARGET, action, Skip::NoSelection);
    };

    let doc = editor.doc();
    let anchor = &selection.anchor;
    let figure = figure_node(src, alt);
    let block = tree::nearest_block(doc, editor.root(), &anchor.path);

    let (ops, figure_path): (Vec<Op>, Path) = match block {
        Some(block_path) => {
            let host = match tree::list_container_of(doc, &block_path) {
                Some((list_path, _)) => list_path,
                None => block_path,
            };
            let Some(&ix) = host.last() else {
                return skipped(TARGET, action, Skip::NoBlock);
            };
            let at = sibling_path(&host, ix + 1);
            let ops = vec![Op::InsertNode {
                path: at.clone(),
                node: figure,
            }];
            (ops, at)
        }
        None => match tree::node_at_path(doc, &anchor.path) {
            Some(Node::Text(leaf)) if anchor.path.len() == editor.root().len() + 1 => {
                let Some(&ix) = anchor.path.last() else {
                    return skipped(TARGET, action, Skip::NoBlock);
                };
                let offset = crate::core::clamp_to_char_boundary(&leaf.text, anchor.offset);
                let (before, after) = leaf.text.split_at(offset);
                let mut ops = vec![Op::RemoveNode {
                    path: anchor.path.clone(),
                }];
                let mut at = ix;
                if !before.is_empty() {
                    ops.push(Op::InsertNode {
                        path: sibling_path(&anchor.path, at),
                        node: Node::text(before),
                    });
                    at += 1;
                }
                let figure_path = sibling_path(&anchor.path, at);
                ops.push(Op::InsertNode {
                    path: figure_path.clone(),
                    node: figure,
                });
                if !after.is_empty() {
                    ops.push(Op::InsertNode {
                        path: sibling_path(&anchor.path, at + 1),
                        node: Node::text(after),
                    });
                }
                (ops, figure_path)
            }
            _ => {
                let Some(top) = tree::top_level_path(editor.root(), &anchor.path) else {
                    return skipped(TARGET, action, Skip::NoBlock);
                };
                let Some(&ix) = top.last() else {
                    return skipped(TARGET, action, Skip::NoBlock);
                };
                let at = sibling_path(&top, ix + 1);
                let ops = vec![Op::InsertNode {
                    path: at.clone(),
                    node: figure,
                }];
                (ops, at)
            }
        },
    };

    let caption_text = child_path(&child_path(&figure_path, 1), 0);
    log::trace!(target: TARGET, "{action}: figure at {figure_path:?}");
    let tx = Transaction::new(ops)
        .selection_after(Selection::collapsed(Point::new(caption_text, 0)))
        .source("command:figure.insert");
    commit(editor, tx, action)
}
