use plate_engine::{
    Document, Editor, EditorConfig, Node, PLATE_SCHEMA, PlateValue, PlateValueError, PluginRegistry,
    Point, Selection,
};
use pretty_assertions::assert_eq;

fn sample() -> Document {
    Document::new(vec![
        Node::element(
            "paragraph",
            vec![
                Node::text("hello "),
                Node::element("bold", vec![Node::text("world")]),
            ],
        ),
        Node::element(
            "figure",
            vec![
                Node::image("a.png", Some("alt".into())),
                Node::element("caption", vec![Node::text("cap")]),
            ],
        ),
    ])
}

#[test]
fn plate_value_round_trips_through_json() -> anyhow::Result<()> {
    let value = PlateValue::from_document(sample());
    let json = value.to_json_pretty()?;
    let back = PlateValue::from_json_str(&json)?;

    assert_eq!(back.schema, PLATE_SCHEMA);
    assert_eq!(back.into_document(), sample());
    Ok(())
}

#[test]
fn envelope_defaults_and_checks() -> anyhow::Result<()> {
    let minimal = r#"{ "document": { "children": [
        { "node": "element", "kind": "paragraph", "children": [ { "node": "text", "text": "x" } ] }
    ] } }"#;
    let value = PlateValue::from_json_str(minimal)?;
    assert_eq!(value.version, 1);
    assert_eq!(value.document.to_markup(), "<paragraph>x</paragraph>");

    let foreign = r#"{ "schema": "other", "document": { "children": [] } }"#;
    assert!(matches!(
        PlateValue::from_json_str(foreign),
        Err(PlateValueError::UnsupportedSchema(_))
    ));

    let future = r#"{ "version": 99, "document": { "children": [] } }"#;
    assert!(matches!(
        PlateValue::from_json_str(future),
        Err(PlateValueError::UnsupportedVersion { found: 99 })
    ));
    assert!(matches!(
        PlateValue::from_json_str("not json"),
        Err(PlateValueError::Json(_))
    ));
    Ok(())
}

#[test]
fn editor_config_fills_defaults() -> anyhow::Result<()> {
    let config: EditorConfig = serde_json::from_str("{}")?;
    assert_eq!(config.with_defaults().max_normalize_iterations, 100);

    let config: EditorConfig = serde_json::from_str(r#"{ "max_normalize_iterations": 7 }"#)?;
    let editor = Editor::new(
        sample(),
        Selection::collapsed(Point::new(vec![0, 0], 0)),
        PluginRegistry::engine(),
    )
    .with_config(config);
    assert_eq!(editor.config().max_normalize_iterations, 7);
    Ok(())
}

#[test]
fn text_content_concatenates_in_document_order() {
    assert_eq!(sample().text_content(), "hello worldcap");
}
