//! Inline wrap/unwrap.
//!
//! Toggling is decided from the live tree: a fully covered selection is
//! unwrapped, anything else is wrapped. Multi-block selections are cut into
//! one segment per block so no wrapper ever crosses a block boundary.

use serde_json::Value;

use crate::core::{Attrs, Editor, Node, Point, Selection};
use crate::ops::{Op, Path, Transaction, child_path, parent_path};
use crate::plugin::{CommandError, Outcome, Skip, commit, skipped};
use crate::query;
use crate::range::{self, Bias, Segment};
use crate::schema::{self, kind};
use crate::tree;

const TARGET: &str = "plate_engine::inline";

pub(crate) fn inline_kind(tag: &str) -> Result<&'static str, CommandError> {
    schema::resolve_kind(tag)
        .filter(|k| schema::is_inline_kind(k))
        .ok_or_else(|| CommandError::new(format!("Not an inline tag: {tag}")))
}

/// Toggles `tag` over the current selection.
pub fn toggle_inline(
    editor: &mut Editor,
    tag: &str,
    attrs: Attrs,
) -> Result<Outcome, CommandError> {
    let kind = inline_kind(tag)?;
    let action = format!("toggle {kind}");
    let Some(selection) = editor.current_selection() else {
        return skipped(TARGET, &action, Skip::NoSelection);
    };

    if selection.is_collapsed() {
        if !query::is_in_element(editor, kind) {
            return skipped(TARGET, &action, Skip::CollapsedWrap);
        }
        return unwrap_enclosing(editor, &selection, kind, &action);
    }

    if query::is_fully_wrapped(editor, kind) {
        unwrap_selected(editor, &selection, kind, &action)
    } else {
        let segments = segments_for(editor, &selection);
        wrap_segments(
            editor,
            &selection,
            segments,
            Wrap::Strip,
            kind,
            &attrs,
            &action,
        )
    }
}

/// Wraps the selection in a link to `href`, replacing any links inside it.
/// With a collapsed selection inside a link, retargets that link.
pub fn set_link(editor: &mut Editor, href: &str) -> Result<Outcome, CommandError> {
    let action = "set link";
    let Some(selection) = editor.current_selection() else {
        return skipped(TARGET, action, Skip::NoSelection);
    };

    let mut attrs = Attrs::default();
    attrs.insert("href".to_string(), Value::String(href.to_string()));

    if !selection.is_collapsed() {
        let segments = segments_for(editor, &selection)
            .into_iter()
            .map(|segment| outside_of(editor, segment, &selection, kind::LINK))
            .collect();
        return wrap_segments(
            editor,
            &selection,
            segments,
            Wrap::Replace,
            kind::LINK,
            &attrs,
            action,
        );
    }

    let Some(link) = tree::ancestor_of_kind(
        editor.doc(),
        editor.root(),
        &selection.anchor.path,
        kind::LINK,
    ) else {
        return skipped(TARGET, action, Skip::CollapsedWrap);
    };
    let current = tree::element_at(editor.doc(), &link).and_then(|el| el.attr_str("href"));
    if current == Some(href) {
        return skipped(TARGET, action, Skip::AlreadyApplied);
    }

    let tx = Transaction::new(vec![Op::SetNodeAttrs {
        path: link,
        patch: crate::core::AttrPatch {
            set: attrs,
            remove: Vec::new(),
        },
    }])
    .selection_after(selection)
    .source("command:link.set");
    commit(editor, tx, action)
}

/// Removes every link touching the selection (or enclosing the caret).
pub fn unset_link(editor: &mut Editor) -> Result<Outcome, CommandError> {
    let action = "unset link";
    let Some(selection) = editor.current_selection() else {
        return skipped(TARGET, action, Skip::NoSelection);
    };
    if selection.is_collapsed() {
        unwrap_enclosing(editor, &selection, kind::LINK, action)
    } else {
        unwrap_selected(editor, &selection, kind::LINK, action)
    }
}

/// Splices the nearest `kind` element around the caret into its parent.
fn unwrap_enclosing(
    editor: &mut Editor,
    selection: &Selection,
    kind: &str,
    action: &str,
) -> Result<Outcome, CommandError> {
    let doc = editor.doc();
    let anchor = &selection.anchor.path;
    let Some(path) = tree::ancestor_of_kind(doc, editor.root(), anchor, kind) else {
        return skipped(TARGET, action, Skip::MissingAncestor);
    };
    let Some(el) = tree::element_at(doc, &path) else {
        return skipped(TARGET, action, Skip::MissingAncestor);
    };

    let parent = parent_path(&path).to_vec();
    let Some(&ix) = path.last() else {
        return skipped(TARGET, action, Skip::MissingAncestor);
    };

    let mut ops = vec![Op::RemoveNode { path: path.clone() }];
    for (offset, child) in el.children.iter().cloned().enumerate() {
        ops.push(Op::InsertNode {
            path: child_path(&parent, ix + offset),
            node: child,
        });
    }

    let lift = |point: &Point| -> Point {
        if !point.is_within(&path) || point.path.len() <= path.len() {
            return point.clone();
        }
        let mut lifted = parent.clone();
        lifted.push(ix + point.path[path.len()]);
        lifted.extend_from_slice(&point.path[path.len() + 1..]);
        Point::new(lifted, point.offset)
    };
    let selection_after = Selection::new(lift(&selection.anchor), lift(&selection.focus));

    log::trace!(target: TARGET, "{action}: unwrapping {kind} at {path:?}");
    let tx = Transaction::new(ops)
        .selection_after(selection_after)
        .source(format!("command:inline.unwrap:{kind}"));
    commit(editor, tx, action)
}

/// Unwraps every `kind` element overlapping the selection, one block at a
/// time, keeping the selection on the same characters. Outside any block
/// this degrades to unwrapping the element around the anchor.
fn unwrap_selected(
    editor: &mut Editor,
    selection: &Selection,
    kind: &str,
    action: &str,
) -> Result<Outcome, CommandError> {
    let segments = range::blocks_intersecting(editor.doc(), editor.root(), selection);
    if segments.is_empty() {
        return unwrap_enclosing(editor, selection, kind, action);
    }
    let (start, end) = selection.ordered();
    let mut new_start = start.clone();
    let mut new_end = end.clone();
    let mut ops: Vec<Op> = Vec::new();

    for segment in segments.iter().rev() {
        if segment.is_empty() {
            continue;
        }
        let Some(children) = tree::children_at(editor.doc(), &segment.container) else {
            continue;
        };
        let next = range::unwrap_kind_in_range(children, segment.start, segment.end, kind);
        if next.as_slice() == children {
            continue;
        }

        let remap = |point: &Point, bias: Bias| -> Option<Point> {
            let offset = range::offset_in_container(editor.doc(), &segment.container, point)?;
            range::point_in_children(&next, &segment.container, offset, bias)
        };
        if let Some(point) = remap(start, Bias::Forward) {
            new_start = point;
        }
        if let Some(point) = remap(end, Bias::Backward) {
            new_end = point;
        }

        let replaced = range::replace_children_ops(&segment.container, children.len(), next);
        ops.extend(replaced);
    }

    if ops.is_empty() {
        return skipped(TARGET, action, Skip::MissingAncestor);
    }

    let selection_after = if selection.focus < selection.anchor {
        Selection::new(new_end, new_start)
    } else {
        Selection::new(new_start, new_end)
    };
    log::trace!(target: TARGET, "{action}: unwrapped {kind} in {} blocks", segments.len());
    let tx = Transaction::new(ops)
        .selection_after(selection_after)
        .source(format!("command:inline.unwrap:{kind}"));
    commit(editor, tx, action)
}

/// What happens to elements of the wrapping kind already in a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wrap {
    /// Strip them from the selected fragment only.
    Strip,
    /// Unwrap every one overlapping the segment, selected or not.
    Replace,
}

/// Wraps each segment in a new `kind` element, one wrapper per block.
fn wrap_segments(
    editor: &mut Editor,
    selection: &Selection,
    segments: Vec<Segment>,
    mode: Wrap,
    kind: &str,
    attrs: &Attrs,
    action: &str,
) -> Result<Outcome, CommandError> {
    let mut ops: Vec<Op> = Vec::new();
    let mut wrappers: Vec<(Path, Node)> = Vec::new();

    // Reverse document order keeps earlier segments' paths valid.
    for segment in segments.iter().rev() {
        if segment.is_empty() {
            continue;
        }
        let Some(children) = tree::children_at(editor.doc(), &segment.container) else {
            continue;
        };
        let (start, end) = (segment.start, segment.end);
        let rewrite = match mode {
            Wrap::Strip => range::wrap_nodes(children, start, end, kind, attrs),
            Wrap::Replace => {
                let cleared = range::unwrap_kind_in_range(children, start, end, kind);
                range::wrap_nodes(&cleared, start, end, kind, attrs)
            }
        };
        let wrapper_path = child_path(&segment.container, rewrite.wrapper);
        if let Some(wrapper) = rewrite.children.get(rewrite.wrapper) {
            wrappers.push((wrapper_path, wrapper.clone()));
        }
        let replaced =
            range::replace_children_ops(&segment.container, children.len(), rewrite.children);
        ops.extend(replaced);
    }

    wrappers.reverse();
    let first = wrappers
        .first()
        .and_then(|(path, node)| range::node_bounds(node, path));
    let last = wrappers
        .last()
        .and_then(|(path, node)| range::node_bounds(node, path));
    let (Some((start, _)), Some((_, end))) = (first, last) else {
        return skipped(TARGET, action, Skip::Unsupported);
    };

    let selection_after = if selection.focus < selection.anchor {
        Selection::new(end, start)
    } else {
        Selection::new(start, end)
    };
    log::trace!(target: TARGET, "{action}: {} wrappers", wrappers.len());
    let tx = Transaction::new(ops)
        .selection_after(selection_after)
        .source(format!("command:inline.wrap:{kind}"));
    commit(editor, tx, action)
}

/// Moves a segment whose container sits inside an element of `kind` up to
/// the parent of the outermost such element, so a new wrapper of `kind`
/// never lands inside an old one.
fn outside_of(editor: &Editor, segment: Segment, selection: &Selection, kind: &str) -> Segment {
    let doc = editor.doc();
    let enclosing = tree::ancestors_of_kind(doc, editor.root(), &segment.container, kind);
    let Some(outermost) = enclosing.last() else {
        return segment;
    };
    range::segment_in(doc, parent_path(outermost), selection).unwrap_or(segment)
}

/// One segment per intersecting block. Zero or one block means the selection
/// is handled as a single range inside the deepest element holding both
/// ends, which must be inline content.
fn segments_for(editor: &Editor, selection: &Selection) -> Vec<Segment> {
    let doc = editor.doc();
    let segments = range::blocks_intersecting(doc, editor.root(), selection);
    if segments.len() > 1 {
        return segments;
    }

    let Some(container) = range::common_container(editor.root(), selection) else {
        return Vec::new();
    };
    let holds_inline = match tree::element_at(doc, &container) {
        Some(el) => schema::holds_inline_content(&el.kind) || schema::is_inline_kind(&el.kind),
        None => false,
    };
    if !holds_inline {
        return Vec::new();
    }
    range::segment_in(doc, &container, selection)
        .into_iter()
        .collect()
}
