use plate_engine::{CommandInfo, Document, Editor, Node, PluginRegistry, Point, Selection};

fn editor() -> Editor {
    let italic = Node::element("italic", vec![Node::text("b")]);
    let bold = Node::element("bold", vec![italic]);
    let heading = Node::element("heading_1", vec![Node::text("a "), bold]);
    let doc = Document::new(vec![heading, Node::paragraph("c")]);
    let caret = Selection::collapsed(Point::new(vec![0, 1, 0, 0], 1));
    Editor::new(doc, caret, PluginRegistry::engine())
}

fn text_query(editor: &Editor, id: &str) -> Option<String> {
    editor.run_query(id, None).unwrap()
}

fn is_active(editor: &Editor, tag: &str) -> bool {
    let args = serde_json::json!({ "tag": tag });
    editor.run_query("inline.is_active", Some(args)).unwrap()
}

#[test]
fn state_queries_reflect_the_anchor() {
    let editor = editor();

    let block_type = text_query(&editor, "block.type");
    assert_eq!(block_type.as_deref(), Some("heading_1"));
    for tag in ["bold", "B", "italic", "em"] {
        assert!(is_active(&editor, tag), "{tag} should be active");
    }
    assert!(!is_active(&editor, "underline"));
    assert_eq!(text_query(&editor, "block.align"), None);
    assert_eq!(text_query(&editor, "list.active_type"), None);
}

#[test]
fn queries_follow_selection_changes() {
    let mut editor = editor();
    editor.set_selection(Selection::collapsed(Point::new(vec![1, 0], 0)));

    let block_type = text_query(&editor, "block.type");
    assert_eq!(block_type.as_deref(), Some("paragraph"));
    assert!(!is_active(&editor, "bold"));

    editor.clear_selection();
    assert_eq!(text_query(&editor, "block.type"), None);
}

#[test]
fn unknown_ids_and_bad_args_are_errors() {
    let mut editor = editor();

    assert!(editor.run_query_json("nope", None).is_err());
    assert!(editor.run_command("nope", None).is_err());
    let args = serde_json::json!({ "tag": "table" });
    let result: Result<bool, _> = editor.run_query("inline.is_active", Some(args));
    assert!(result.is_err());
    let args = serde_json::json!({ "tag": "bold", "attrs": "nope" });
    assert!(editor.run_command("inline.toggle", Some(args)).is_err());
    let err = editor.run_command("link.set", None).unwrap_err();
    assert_eq!(err.message(), "Missing args.href");
}

#[test]
fn engine_registry_lists_every_command() {
    let registry = PluginRegistry::engine();
    let commands = registry.command_list();
    let ids: Vec<&str> = commands.iter().map(|info| info.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "block.set_align",
            "block.set_type",
            "figure.insert",
            "inline.toggle",
            "link.set",
            "link.unset",
            "list.toggle",
        ]
    );
    assert_eq!(commands.len(), registry.commands().len());
    assert!(registry.is_known_kind("caption"));
    assert!(registry.node_spec("image").is_some_and(|spec| spec.is_void));
    assert!(PluginRegistry::core().command_list().is_empty());
}

#[test]
fn every_command_example_runs_on_a_fresh_editor() {
    let registry = PluginRegistry::engine();

    for info in registry.command_list() {
        assert!(!info.label.is_empty(), "{} has no label", info.id);
        assert!(info.description.is_some(), "{} has no description", info.id);
        assert!(!info.keywords.is_empty(), "{} has no keywords", info.id);

        let mut editor = Editor::new(
            Document::new(vec![Node::paragraph("hello world")]),
            Selection::new(Point::new(vec![0, 0], 0), Point::new(vec![0, 0], 5)),
            PluginRegistry::engine(),
        );
        let result = editor.run_command(&info.id, info.args_example.clone());
        assert!(result.is_ok(), "{}: {result:?}", info.id);
    }
}

#[test]
fn commands_are_found_by_keyword() {
    let commands = PluginRegistry::engine().command_list();
    let mentions_h1 = |info: &&CommandInfo| info.keywords.iter().any(|k| k == "h1");

    let heading = commands.iter().find(mentions_h1).unwrap();

    assert_eq!(heading.id, "block.set_type");
    let json = serde_json::to_value(heading).unwrap();
    assert_eq!(json["args_example"]["tag"], "heading_1");
    assert_eq!(json["label"], "Set block type");
}
