use plate_engine::{
    Attrs, Document, Editor, Node, Outcome, PluginRegistry, Point, Selection, Skip, query,
    toggle_inline,
};
use pretty_assertions::assert_eq;

fn editor_with(children: Vec<Node>, anchor: Point, focus: Point) -> Editor {
    Editor::new(
        Document::new(children),
        Selection::new(anchor, focus),
        PluginRegistry::engine(),
    )
}

fn bold(text: &str) -> Node {
    Node::element("bold", vec![Node::text(text)])
}

#[test]
fn wraps_a_plain_range() {
    let mut editor = editor_with(
        vec![Node::paragraph("hello world")],
        Point::new(vec![0, 0], 6),
        Point::new(vec![0, 0], 11),
    );

    let outcome = toggle_inline(&mut editor, "bold", Attrs::default()).unwrap();

    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(
        editor.doc().to_markup(),
        "<paragraph>hello <bold>world</bold></paragraph>"
    );
    let expected = Selection::new(Point::new(vec![0, 1, 0], 0), Point::new(vec![0, 1, 0], 5));
    assert_eq!(editor.selection(), Some(&expected));
    assert!(query::is_fully_wrapped(&editor, "bold"));
}

#[test]
fn wrap_across_an_existing_run_strips_and_rewraps() {
    let mut editor = editor_with(
        vec![Node::element("paragraph", vec![bold("hello"), Node::text(" world")])],
        Point::new(vec![0, 0, 0], 2),
        Point::new(vec![0, 1], 3),
    );
    assert!(!query::is_fully_wrapped(&editor, "bold"));

    toggle_inline(&mut editor, "bold", Attrs::default()).unwrap();

    assert_eq!(
        editor.doc().to_markup(),
        "<paragraph><bold>he</bold><bold>llo wo</bold>rld</paragraph>"
    );
    assert_eq!(editor.doc().text_content(), "hello world");
    assert!(query::is_fully_wrapped(&editor, "bold"));
}

#[test]
fn toggling_twice_restores_state_and_text() {
    let mut editor = editor_with(
        vec![Node::paragraph("hello world")],
        Point::new(vec![0, 0], 0),
        Point::new(vec![0, 0], 5),
    );

    toggle_inline(&mut editor, "italic", Attrs::default()).unwrap();
    assert!(query::is_fully_wrapped(&editor, "italic"));

    toggle_inline(&mut editor, "italic", Attrs::default()).unwrap();
    assert!(!query::is_fully_wrapped(&editor, "italic"));
    assert_eq!(
        editor.doc().to_markup(),
        "<paragraph>hello world</paragraph>"
    );
    let expected = Selection::new(Point::new(vec![0, 0], 0), Point::new(vec![0, 0], 5));
    assert_eq!(editor.selection(), Some(&expected));
}

#[test]
fn multi_block_selection_wraps_each_block_separately() {
    let mut editor = editor_with(
        vec![
            Node::paragraph("hello"),
            Node::paragraph("middle"),
            Node::element("heading_1", vec![Node::text("world")]),
        ],
        Point::new(vec![0, 0], 2),
        Point::new(vec![2, 0], 3),
    );

    toggle_inline(&mut editor, "underline", Attrs::default()).unwrap();

    assert_eq!(
        editor.doc().to_markup(),
        concat!(
            "<paragraph>he<underline>llo</underline></paragraph>",
            "<paragraph><underline>middle</underline></paragraph>",
            "<heading_1><underline>wor</underline>ld</heading_1>",
        )
    );
    let expected = Selection::new(Point::new(vec![0, 1, 0], 0), Point::new(vec![2, 0, 0], 3));
    assert_eq!(editor.selection(), Some(&expected));
    assert!(query::is_fully_wrapped(&editor, "underline"));

    toggle_inline(&mut editor, "underline", Attrs::default()).unwrap();
    assert_eq!(
        editor.doc().to_markup(),
        concat!(
            "<paragraph>hello</paragraph>",
            "<paragraph>middle</paragraph>",
            "<heading_1>world</heading_1>",
        )
    );
}

#[test]
fn backward_selection_is_handled_like_forward() {
    let mut editor = editor_with(
        vec![Node::paragraph("hello world")],
        Point::new(vec![0, 0], 11),
        Point::new(vec![0, 0], 6),
    );

    toggle_inline(&mut editor, "bold", Attrs::default()).unwrap();

    assert_eq!(
        editor.doc().to_markup(),
        "<paragraph>hello <bold>world</bold></paragraph>"
    );
    let backward = Selection::new(Point::new(vec![0, 1, 0], 5), Point::new(vec![0, 1, 0], 0));
    assert_eq!(editor.selection(), Some(&backward));
}

#[test]
fn nested_styles_wrap_inside_existing_element() {
    let mut editor = editor_with(
        vec![Node::element(
            "paragraph",
            vec![Node::element("italic", vec![Node::text("styled text")])],
        )],
        Point::new(vec![0, 0, 0], 0),
        Point::new(vec![0, 0, 0], 6),
    );

    toggle_inline(&mut editor, "bold", Attrs::default()).unwrap();

    assert_eq!(
        editor.doc().to_markup(),
        "<paragraph><italic><bold>styled</bold> text</italic></paragraph>"
    );
    assert!(query::is_fully_wrapped(&editor, "bold"));
    assert!(query::is_fully_wrapped(&editor, "italic"));
}

#[test]
fn collapsed_caret_inside_element_unwraps_it() {
    let mut editor = editor_with(
        vec![Node::element(
            "paragraph",
            vec![Node::text("a "), bold("bold"), Node::text(" b")],
        )],
        Point::new(vec![0, 1, 0], 2),
        Point::new(vec![0, 1, 0], 2),
    );
    assert!(query::is_in_element(&editor, "bold"));

    toggle_inline(&mut editor, "bold", Attrs::default()).unwrap();

    assert_eq!(editor.doc().to_markup(), "<paragraph>a bold b</paragraph>");
    assert_eq!(
        editor.selection(),
        Some(&Selection::collapsed(Point::new(vec![0, 0], 4)))
    );
    assert!(!query::is_in_element(&editor, "bold"));
}

#[test]
fn collapsed_caret_outside_element_is_a_no_op() {
    let mut editor = editor_with(
        vec![Node::paragraph("plain")],
        Point::new(vec![0, 0], 2),
        Point::new(vec![0, 0], 2),
    );
    let before = editor.doc().clone();

    let outcome = toggle_inline(&mut editor, "bold", Attrs::default()).unwrap();

    assert_eq!(outcome, Outcome::Skipped(Skip::CollapsedWrap));
    assert_eq!(editor.doc(), &before);
}

#[test]
fn partial_coverage_is_not_fully_wrapped() {
    let editor = editor_with(
        vec![Node::element("paragraph", vec![bold("hello"), Node::text(" world")])],
        Point::new(vec![0, 0, 0], 0),
        Point::new(vec![0, 1], 1),
    );
    assert!(!query::is_fully_wrapped(&editor, "bold"));

    let inside = editor_with(
        vec![Node::element("paragraph", vec![bold("hello"), Node::text(" world")])],
        Point::new(vec![0, 0, 0], 0),
        Point::new(vec![0, 0, 0], 5),
    );
    assert!(query::is_fully_wrapped(&inside, "bold"));
}

#[test]
fn toggle_inside_a_run_removes_the_whole_run() {
    let mut editor = editor_with(
        vec![Node::element("paragraph", vec![Node::text("a "), bold("bold text")])],
        Point::new(vec![0, 1, 0], 5),
        Point::new(vec![0, 1, 0], 9),
    );

    toggle_inline(&mut editor, "strong", Attrs::default()).unwrap();

    assert_eq!(
        editor.doc().to_markup(),
        "<paragraph>a bold text</paragraph>"
    );
    let expected = Selection::new(Point::new(vec![0, 0], 7), Point::new(vec![0, 0], 11));
    assert_eq!(editor.selection(), Some(&expected));
}

#[test]
fn no_selection_and_unknown_tags() {
    let mut editor = editor_with(
        vec![Node::paragraph("hello")],
        Point::new(vec![0, 0], 0),
        Point::new(vec![0, 0], 5),
    );

    for tag in ["marquee", "paragraph"] {
        assert!(toggle_inline(&mut editor, tag, Attrs::default()).is_err());
    }

    editor.clear_selection();
    assert_eq!(
        toggle_inline(&mut editor, "bold", Attrs::default()).unwrap(),
        Outcome::Skipped(Skip::NoSelection)
    );
    assert_eq!(editor.doc().to_markup(), "<paragraph>hello</paragraph>");
}

#[test]
fn registry_command_drives_the_same_engine() {
    let mut editor = editor_with(
        vec![Node::paragraph("hello world")],
        Point::new(vec![0, 0], 0),
        Point::new(vec![0, 0], 5),
    );

    let args = serde_json::json!({ "tag": "SUP" });
    editor.run_command("inline.toggle", Some(args)).unwrap();

    assert_eq!(
        editor.doc().to_markup(),
        "<paragraph><superscript>hello</superscript> world</paragraph>"
    );
    let args = serde_json::json!({ "tag": "superscript" });
    let query = "inline.is_fully_wrapped";
    let wrapped: bool = editor.run_query(query, Some(args)).unwrap();
    assert!(wrapped);
    assert!(editor.run_command("inline.toggle", None).is_err());
}
