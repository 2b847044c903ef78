use plate_engine::{
    Attrs, Document, Editor, Node, Outcome, PluginRegistry, Point, Selection, Skip, query,
    toggle_inline, tree,
};
use pretty_assertions::assert_eq;

/// A host page: chrome paragraph at [0], editable region at [1].
fn page() -> Vec<Node> {
    let inside = vec![Node::paragraph("inside one"), Node::paragraph("inside two")];
    let editable = Node::element("editable", inside);
    vec![Node::paragraph("toolbar"), editable]
}

fn editor_with(selection: Selection) -> Editor {
    Editor::new(Document::new(page()), selection, PluginRegistry::engine()).with_root(vec![1])
}

#[test]
fn selection_outside_the_root_counts_as_no_selection() {
    let selection = Selection::new(Point::new(vec![0, 0], 0), Point::new(vec![0, 0], 4));
    let mut editor = editor_with(selection);

    assert!(editor.selection().is_some());
    assert_eq!(editor.current_selection(), None);
    assert_eq!(
        toggle_inline(&mut editor, "bold", Attrs::default()).unwrap(),
        Outcome::Skipped(Skip::NoSelection)
    );
    assert_eq!(query::block_type(&editor), None);
    assert!(!query::is_fully_wrapped(&editor, "bold"));
}

#[test]
fn selection_straddling_the_root_is_refused() {
    let selection = Selection::new(Point::new(vec![0, 0], 2), Point::new(vec![1, 0, 0], 3));
    let mut editor = editor_with(selection);

    toggle_inline(&mut editor, "bold", Attrs::default()).unwrap();

    assert_eq!(editor.doc(), &Document::new(page()));
}

#[test]
fn edits_stay_inside_the_root() {
    let selection = Selection::new(Point::new(vec![1, 0, 0], 0), Point::new(vec![1, 1, 0], 6));
    let mut editor = editor_with(selection);

    toggle_inline(&mut editor, "bold", Attrs::default()).unwrap();

    assert_eq!(
        editor.doc().to_markup(),
        concat!(
            "<paragraph>toolbar</paragraph>",
            "<editable>",
            "<paragraph><bold>inside one</bold></paragraph>",
            "<paragraph><bold>inside</bold> two</paragraph>",
            "</editable>",
        )
    );
}

#[test]
fn ancestor_walks_never_classify_the_root() {
    // The root itself is a paragraph; walks from its text must not report it.
    let bold = Node::element("bold", vec![Node::text("x")]);
    let doc = Document::new(vec![Node::element("paragraph", vec![bold])]);
    let editor = Editor::new(
        doc,
        Selection::collapsed(Point::new(vec![0, 0, 0], 0)),
        PluginRegistry::engine(),
    )
    .with_root(vec![0]);

    assert_eq!(query::block_type(&editor), None);
    assert!(query::is_in_element(&editor, "bold"));
    assert_eq!(
        tree::ancestor_of_kind(editor.doc(), editor.root(), &[0, 0, 0], "PARAGRAPH"),
        None
    );
    assert_eq!(
        tree::ancestor_of_kind(editor.doc(), &[], &[0, 0, 0], "PARAGRAPH"),
        Some(vec![0])
    );
}
