//! State detection. Everything here is recomputed from the live tree on
//! each call; there is no tracked toggle state to fall out of sync.

use crate::core::{Editor, Selection};
use crate::range::{self, Segment};
use crate::schema::{self, ListKind, kind};
use crate::tree;

/// True when an element of `tag` encloses the selection anchor.
pub fn is_in_element(editor: &Editor, tag: &str) -> bool {
    let Some(selection) = editor.current_selection() else {
        return false;
    };
    let Some(kind) = schema::resolve_kind(tag) else {
        return false;
    };
    tree::ancestor_of_kind(editor.doc(), editor.root(), &selection.anchor.path, kind).is_some()
}

/// Kind of the block enclosing the selection anchor.
pub fn block_type(editor: &Editor) -> Option<String> {
    let selection = editor.current_selection()?;
    let block = tree::nearest_block(editor.doc(), editor.root(), &selection.anchor.path)?;
    tree::element_at(editor.doc(), &block).map(|el| el.kind.to_ascii_lowercase())
}

pub fn is_in_list_type(editor: &Editor, list: ListKind) -> bool {
    active_list_type(editor) == Some(list)
}

/// Kind of the innermost list container around the selection anchor.
pub fn active_list_type(editor: &Editor) -> Option<ListKind> {
    let selection = editor.current_selection()?;
    let item = tree::ancestor_of_kind(
        editor.doc(),
        editor.root(),
        &selection.anchor.path,
        kind::LIST_ITEM,
    )?;
    let (_, list_kind) = tree::list_container_of(editor.doc(), &item)?;
    ListKind::from_kind(list_kind)
}

/// The `align` attribute of the enclosing block, if set.
pub fn alignment(editor: &Editor) -> Option<String> {
    let selection = editor.current_selection()?;
    let block = tree::nearest_block(editor.doc(), editor.root(), &selection.anchor.path)?;
    tree::element_at(editor.doc(), &block)?
        .attr_str("align")
        .map(str::to_string)
}

/// True when every selected character has an ancestor of `tag`. A single
/// unstyled character makes it false. A collapsed selection falls back to
/// [`is_in_element`].
pub fn is_fully_wrapped(editor: &Editor, tag: &str) -> bool {
    let Some(selection) = editor.current_selection() else {
        return false;
    };
    let Some(kind) = schema::resolve_kind(tag) else {
        return false;
    };
    if selection.is_collapsed() {
        return is_in_element(editor, kind);
    }

    let segments = coverage_segments(editor, &selection, kind);
    let mut any_selected = false;
    for (segment, inside) in &segments {
        if segment.is_empty() {
            continue;
        }
        let Some(children) = tree::children_at(editor.doc(), &segment.container) else {
            continue;
        };
        any_selected = true;
        if !range::covered_by_kind(children, segment.start, segment.end, kind, *inside) {
            return false;
        }
    }
    any_selected
}

/// Segments to test for coverage, each paired with whether the container
/// itself already sits inside an element of `kind`.
fn coverage_segments(editor: &Editor, selection: &Selection, kind: &str) -> Vec<(Segment, bool)> {
    let segments = range::blocks_intersecting(editor.doc(), editor.root(), selection);
    if !segments.is_empty() {
        return segments.into_iter().map(|s| (s, false)).collect();
    }
    let Some(container) = range::common_container(editor.root(), selection) else {
        return Vec::new();
    };
    let doc = editor.doc();
    let inside = tree::ancestor_of_kind(doc, editor.root(), &container, kind).is_some();
    range::segment_in(doc, &container, selection)
        .map(|segment| vec![(segment, inside)])
        .unwrap_or_default()
}

/// `href` of the link enclosing the selection anchor.
pub fn link_href(editor: &Editor) -> Option<String> {
    let selection = editor.current_selection()?;
    let link = tree::ancestor_of_kind(
        editor.doc(),
        editor.root(),
        &selection.anchor.path,
        kind::LINK,
    )?;
    tree::element_at(editor.doc(), &link)?
        .attr_str("href")
        .map(str::to_string)
}
