use plate_engine::{Document, Editor, Node, PluginRegistry, Point, Selection, insert_figure, query};
use pretty_assertions::assert_eq;

fn editor_at(children: Vec<Node>, caret: Point) -> Editor {
    Editor::new(
        Document::new(children),
        Selection::collapsed(caret),
        PluginRegistry::engine(),
    )
}

#[test]
fn figure_goes_after_the_block_with_caret_in_caption() {
    let mut editor = editor_at(
        vec![Node::paragraph("first"), Node::paragraph("second")],
        Point::new(vec![0, 0], 2),
    );

    let alt = Some("A cat".to_string());
    insert_figure(&mut editor, "https://example.com/cat.png", alt).unwrap();

    assert_eq!(
        editor.doc().to_markup(),
        concat!(
            "<paragraph>first</paragraph>",
            "<figure><image alt=\"A cat\" src=\"https://example.com/cat.png\"/>",
            "<caption></caption></figure>",
            "<paragraph>second</paragraph>",
        )
    );
    assert_eq!(
        editor.selection(),
        Some(&Selection::collapsed(Point::new(vec![1, 1, 0], 0)))
    );
    assert_eq!(query::block_type(&editor).as_deref(), Some("figure"));
}

#[test]
fn figure_from_a_list_item_lands_after_the_list() {
    let mut editor = editor_at(
        vec![Node::element(
            "unordered_list",
            vec![
                Node::element("list_item", vec![Node::text("a")]),
                Node::element("list_item", vec![Node::text("b")]),
            ],
        )],
        Point::new(vec![0, 0, 0], 1),
    );

    let args = serde_json::json!({ "src": "x.png" });
    editor.run_command("figure.insert", Some(args)).unwrap();

    assert_eq!(editor.doc().children.len(), 2);
    assert!(editor.doc().children[1].is_element_of("figure"));
    assert_eq!(
        editor.selection(),
        Some(&Selection::collapsed(Point::new(vec![1, 1, 0], 0)))
    );
}

#[test]
fn bare_text_under_the_root_is_split_at_the_caret() {
    let mut editor = editor_at(
        vec![Node::element("editable", vec![Node::text("beforeafter")])],
        Point::new(vec![0, 0], 6),
    )
    .with_root(vec![0]);

    insert_figure(&mut editor, "x.png", None).unwrap();

    let expected = concat!(
        "<editable>before",
        "<figure><image src=\"x.png\"/><caption></caption></figure>",
        "after</editable>",
    );
    assert_eq!(editor.doc().to_markup(), expected);
    assert_eq!(
        editor.selection(),
        Some(&Selection::collapsed(Point::new(vec![0, 1, 1, 0], 0)))
    );
}

#[test]
fn caption_accepts_inline_styling() {
    let mut editor = editor_at(vec![Node::paragraph("p")], Point::new(vec![0, 0], 0));
    insert_figure(&mut editor, "x.png", None).unwrap();

    // Type into the caption the way a host would, then style it.
    let typed = plate_engine::Transaction::new(vec![plate_engine::Op::InsertText {
        path: vec![1, 1, 0],
        offset: 0,
        text: "a caption".into(),
    }]);
    let caption = Selection::new(Point::new(vec![1, 1, 0], 2), Point::new(vec![1, 1, 0], 9));
    editor.apply(typed.selection_after(caption)).unwrap();
    plate_engine::toggle_inline(&mut editor, "i", Default::default()).unwrap();

    assert_eq!(
        editor.doc().children[1].to_markup(),
        "<figure><image src=\"x.png\"/><caption>a <italic>caption</italic></caption></figure>"
    );
}

#[test]
fn empty_source_is_rejected() {
    let mut editor = editor_at(vec![Node::paragraph("p")], Point::new(vec![0, 0], 0));
    assert!(insert_figure(&mut editor, "  ", None).is_err());
    assert!(editor.run_command("figure.insert", None).is_err());
    assert_eq!(editor.doc().children.len(), 1);
}
