use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Attrs, Document, Editor, Selection};
use crate::ops::{Op, Transaction};
use crate::schema::{self, ListKind, kind};
use crate::{block, figure, inline, normalize, query};

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct QueryError {
    message: String,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate node spec kind: {0}")]
    DuplicateNodeSpec(String),
    #[error("duplicate command id: {0}")]
    DuplicateCommand(String),
    #[error("duplicate query id: {0}")]
    DuplicateQuery(String),
}

/// Why a command left the document untouched. None of these are errors: the
/// host asked for something that does not apply to the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    NoSelection,
    /// Wrapping a collapsed selection; typing inherits the style instead.
    CollapsedWrap,
    /// The element to unwrap is no longer in the tree.
    MissingAncestor,
    NoBlock,
    AlreadyApplied,
    Unsupported,
}

impl Skip {
    pub fn reason(self) -> &'static str {
        match self {
            Skip::NoSelection => "no selection inside the editable root",
            Skip::CollapsedWrap => "cannot wrap a collapsed selection",
            Skip::MissingAncestor => "no matching ancestor to unwrap",
            Skip::NoBlock => "selection is not inside a block",
            Skip::AlreadyApplied => "already applied",
            Skip::Unsupported => "not supported for the current block",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Skipped(Skip),
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        self == Outcome::Applied
    }
}

pub(crate) fn skipped(target: &str, action: &str, skip: Skip) -> Result<Outcome, CommandError> {
    log::debug!(target: target, "{action} skipped: {}", skip.reason());
    Ok(Outcome::Skipped(skip))
}

pub(crate) fn commit(
    editor: &mut Editor,
    tx: Transaction,
    action: &str,
) -> Result<Outcome, CommandError> {
    editor
        .apply(tx)
        .map_err(|e| CommandError::new(format!("Failed to {action}: {e}")))?;
    Ok(Outcome::Applied)
}

type CommandHandler = dyn Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync;
type QueryHandler = dyn Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync;

#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub args_example: Option<Value>,
    pub handler: Arc<CommandHandler>,
}

impl CommandSpec {
    pub fn new<F>(id: impl Into<String>, label: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            keywords: Vec::new(),
            args_example: None,
            handler: Arc::new(handler),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn args_example(mut self, args_example: Value) -> Self {
        self.args_example = Some(args_example);
        self
    }
}

/// A command's metadata without its handler, for palettes and help text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandInfo {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub args_example: Option<Value>,
}

impl From<&CommandSpec> for CommandInfo {
    fn from(spec: &CommandSpec) -> Self {
        Self {
            id: spec.id.clone(),
            label: spec.label.clone(),
            description: spec.description.clone(),
            keywords: spec.keywords.clone(),
            args_example: spec.args_example.clone(),
        }
    }
}

#[derive(Clone)]
pub struct QuerySpec {
    pub id: String,
    pub handler: Arc<QueryHandler>,
}

impl QuerySpec {
    pub fn new<F>(id: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Block,
    Container,
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildConstraint {
    None,
    BlockOnly,
    InlineOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: String,
    pub role: NodeRole,
    pub is_void: bool,
    pub children: ChildConstraint,
}

impl NodeSpec {
    fn element(kind: &str, role: NodeRole, children: ChildConstraint) -> Self {
        Self {
            kind: kind.to_string(),
            role,
            is_void: false,
            children,
        }
    }
}

pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op>;
}

#[derive(Debug, Clone)]
pub struct TransactionPreview {
    pub doc: Document,
    pub selection: Option<Selection>,
}

pub trait PlatePlugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn node_specs(&self) -> Vec<NodeSpec> {
        Vec::new()
    }
    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        Vec::new()
    }
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }
    fn queries(&self) -> Vec<QuerySpec> {
        Vec::new()
    }
}

#[derive(Default)]
pub struct PluginRegistry {
    node_specs: HashMap<String, NodeSpec>,
    normalize_passes: Vec<Box<dyn NormalizePass>>,
    commands: HashMap<String, CommandSpec>,
    queries: HashMap<String, QuerySpec>,
}

impl PluginRegistry {
    pub fn new(
        plugins: impl IntoIterator<Item = Box<dyn PlatePlugin>>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register_plugin(plugin)?;
        }
        Ok(registry)
    }

    /// Schema and normalization only, no commands.
    pub fn core() -> Self {
        Self::from_static(vec![Box::new(CoreSchemaPlugin)])
    }

    /// Everything the engine ships: schema, normalization, and every command
    /// and query.
    pub fn engine() -> Self {
        Self::from_static(vec![
            Box::new(CoreSchemaPlugin),
            Box::new(InlinePlugin),
            Box::new(LinkPlugin),
            Box::new(BlockTypePlugin),
            Box::new(ListPlugin),
            Box::new(AlignPlugin),
            Box::new(FigurePlugin),
        ])
    }

    fn from_static(plugins: Vec<Box<dyn PlatePlugin>>) -> Self {
        let mut registry = Self::default();
        for plugin in plugins {
            let id = plugin.id();
            if let Err(err) = registry.register_plugin(plugin) {
                log::error!(target: "plate_engine::plugin", "plugin {id} rejected: {err}");
            }
        }
        registry
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn PlatePlugin>) -> Result<(), RegistryError> {
        for spec in plugin.node_specs() {
            if self.node_specs.contains_key(&spec.kind) {
                return Err(RegistryError::DuplicateNodeSpec(spec.kind));
            }
            self.node_specs.insert(spec.kind.clone(), spec);
        }

        self.normalize_passes.extend(plugin.normalize_passes());

        for cmd in plugin.commands() {
            if self.commands.contains_key(&cmd.id) {
                return Err(RegistryError::DuplicateCommand(cmd.id));
            }
            self.commands.insert(cmd.id.clone(), cmd);
        }

        for query in plugin.queries() {
            if self.queries.contains_key(&query.id) {
                return Err(RegistryError::DuplicateQuery(query.id));
            }
            self.queries.insert(query.id.clone(), query);
        }

        log::trace!(target: "plate_engine::plugin", "registered {}", plugin.id());
        Ok(())
    }

    pub fn node_specs(&self) -> &HashMap<String, NodeSpec> {
        &self.node_specs
    }

    pub fn node_spec(&self, kind: &str) -> Option<&NodeSpec> {
        self.node_specs.get(kind)
    }

    pub fn normalize_passes(&self) -> &[Box<dyn NormalizePass>] {
        &self.normalize_passes
    }

    pub fn commands(&self) -> &HashMap<String, CommandSpec> {
        &self.commands
    }

    pub fn command(&self, id: &str) -> Option<CommandSpec> {
        self.commands.get(id).cloned()
    }

    /// Metadata of every registered command, sorted by id.
    pub fn command_list(&self) -> Vec<CommandInfo> {
        let mut list: Vec<CommandInfo> = self.commands.values().map(CommandInfo::from).collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    pub fn queries(&self) -> &HashMap<String, QuerySpec> {
        &self.queries
    }

    pub fn query(&self, id: &str) -> Option<QuerySpec> {
        self.queries.get(id).cloned()
    }

    /// Ops from the first pass that has work to do. Passes see the same
    /// snapshot, so one pass per round keeps every emitted path valid.
    pub fn normalize(&self, doc: &Document) -> Vec<Op> {
        for pass in &self.normalize_passes {
            let ops = pass.run(doc, self);
            if !ops.is_empty() {
                log::trace!(target: "plate_engine::normalize", "{}: {} ops", pass.id(), ops.len());
                return ops;
            }
        }
        Vec::new()
    }

    pub fn is_known_kind(&self, kind: &str) -> bool {
        self.node_specs.contains_key(kind)
    }
}

fn str_arg<'a>(args: Option<&'a Value>, key: &str) -> Option<&'a str> {
    args.and_then(|v| v.get(key)).and_then(Value::as_str)
}

fn required_arg<'a>(args: Option<&'a Value>, key: &str) -> Result<&'a str, CommandError> {
    str_arg(args, key).ok_or_else(|| CommandError::new(format!("Missing args.{key}")))
}

fn required_query_arg<'a>(args: Option<&'a Value>, key: &str) -> Result<&'a str, QueryError> {
    str_arg(args, key).ok_or_else(|| QueryError::new(format!("Missing args.{key}")))
}

fn attrs_arg(args: Option<&Value>) -> Result<Attrs, CommandError> {
    match args.and_then(|v| v.get("attrs")) {
        None | Some(Value::Null) => Ok(Attrs::default()),
        Some(Value::Object(map)) => Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        Some(_) => Err(CommandError::new("args.attrs must be an object")),
    }
}

fn optional_string(value: Option<String>) -> Value {
    value.map(Value::String).unwrap_or(Value::Null)
}

struct CoreSchemaPlugin;

impl PlatePlugin for CoreSchemaPlugin {
    fn id(&self) -> &'static str {
        "core.schema"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        use ChildConstraint::{BlockOnly, InlineOnly};
        use NodeRole::{Block, Container, Inline};

        let mut specs: Vec<NodeSpec> = schema::TEXT_BLOCK_KINDS
            .iter()
            .map(|k| NodeSpec::element(k, Block, InlineOnly))
            .collect();
        specs.extend(
            schema::INLINE_KINDS
                .iter()
                .map(|k| NodeSpec::element(k, Inline, InlineOnly)),
        );
        specs.extend([
            NodeSpec::element(kind::LIST_ITEM, Block, InlineOnly),
            NodeSpec::element(kind::ORDERED_LIST, Container, BlockOnly),
            NodeSpec::element(kind::UNORDERED_LIST, Container, BlockOnly),
            NodeSpec::element(kind::FIGURE, Block, BlockOnly),
            NodeSpec::element(kind::CAPTION, Container, InlineOnly),
            NodeSpec {
                kind: kind::IMAGE.to_string(),
                role: Inline,
                is_void: true,
                children: ChildConstraint::None,
            },
        ]);
        specs
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![
            Box::new(normalize::EnsureNonEmptyDocument),
            Box::new(normalize::PruneEmptyInlineElements),
            Box::new(normalize::EnsureListChildrenAreItems),
            Box::new(normalize::EnsureInlineContainersHaveTextLeaf),
            Box::new(normalize::MergeAdjacentTextLeaves),
        ]
    }
}

struct InlinePlugin;

impl PlatePlugin for InlinePlugin {
    fn id(&self) -> &'static str {
        "inline"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("inline.toggle", "Toggle inline style", |editor, args| {
                let tag = required_arg(args.as_ref(), "tag")?;
                let attrs = attrs_arg(args.as_ref())?;
                inline::toggle_inline(editor, tag, attrs).map(|_| ())
            })
            .description("Wrap the selection in an inline element, or unwrap it.")
            .keywords(["bold", "italic", "underline", "strikethrough", "mark"])
            .args_example(serde_json::json!({ "tag": "bold" })),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("inline.is_active", |editor, args| {
                let tag = inline_query_tag(args.as_ref())?;
                Ok(Value::Bool(query::is_in_element(editor, tag)))
            }),
            QuerySpec::new("inline.is_fully_wrapped", |editor, args| {
                let tag = inline_query_tag(args.as_ref())?;
                Ok(Value::Bool(query::is_fully_wrapped(editor, tag)))
            }),
        ]
    }
}

fn inline_query_tag(args: Option<&Value>) -> Result<&'static str, QueryError> {
    let tag = required_query_arg(args, "tag")?;
    inline::inline_kind(tag).map_err(|e| QueryError::new(e.message()))
}

struct LinkPlugin;

impl PlatePlugin for LinkPlugin {
    fn id(&self) -> &'static str {
        "link"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("link.set", "Set link", |editor, args| {
                let href = required_arg(args.as_ref(), "href")?.trim();
                if href.is_empty() {
                    return Err(CommandError::new("args.href must not be empty"));
                }
                inline::set_link(editor, href).map(|_| ())
            })
            .description("Link the selection, or retarget the link under the caret.")
            .keywords(["link", "url", "href", "anchor"])
            .args_example(serde_json::json!({ "href": "https://example.com" })),
            CommandSpec::new("link.unset", "Remove link", |editor, _args| {
                inline::unset_link(editor).map(|_| ())
            })
            .description("Remove links touching the selection.")
            .keywords(["link", "unlink"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("link.href", |editor, _args| {
            Ok(optional_string(query::link_href(editor)))
        })]
    }
}

struct BlockTypePlugin;

impl PlatePlugin for BlockTypePlugin {
    fn id(&self) -> &'static str {
        "block.type"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("block.set_type", "Set block type", |editor, args| {
                let tag = required_arg(args.as_ref(), "tag")?;
                block::set_block_type(editor, tag).map(|_| ())
            })
            .description("Convert the block under the caret, lifting list items out.")
            .keywords(["paragraph", "heading", "h1", "h2", "quote", "code"])
            .args_example(serde_json::json!({ "tag": "heading_1" })),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("block.type", |editor, _args| {
            Ok(optional_string(query::block_type(editor)))
        })]
    }
}

struct ListPlugin;

impl PlatePlugin for ListPlugin {
    fn id(&self) -> &'static str {
        "list"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("list.toggle", "Toggle list", |editor, args| {
                let name = required_arg(args.as_ref(), "type")?;
                let list = ListKind::parse(name)
                    .ok_or_else(|| CommandError::new(format!("Unknown list type: {name}")))?;
                block::toggle_list(editor, list).map(|_| ())
            })
            .description("Turn the block into a list item, or take it out of the list.")
            .keywords(["list", "ordered", "unordered", "bulleted", "numbered"])
            .args_example(serde_json::json!({ "type": "unordered" })),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("list.is_active", |editor, args| {
                let name = required_query_arg(args.as_ref(), "type")?;
                let list = ListKind::parse(name)
                    .ok_or_else(|| QueryError::new(format!("Unknown list type: {name}")))?;
                Ok(Value::Bool(query::is_in_list_type(editor, list)))
            }),
            QuerySpec::new("list.active_type", |editor, _args| {
                let active = query::active_list_type(editor).map(|list| list.name().to_string());
                Ok(optional_string(active))
            }),
        ]
    }
}

struct AlignPlugin;

impl PlatePlugin for AlignPlugin {
    fn id(&self) -> &'static str {
        "align"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("block.set_align", "Set block alignment", |editor, args| {
                let align = required_arg(args.as_ref(), "align")?;
                block::set_alignment(editor, align).map(|_| ())
            })
            .description("Set text alignment on the block under the caret.")
            .keywords(["align", "alignment", "left", "center", "right", "justify"])
            .args_example(serde_json::json!({ "align": "center" })),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("block.align", |editor, _args| {
            Ok(optional_string(query::alignment(editor)))
        })]
    }
}

struct FigurePlugin;

impl PlatePlugin for FigurePlugin {
    fn id(&self) -> &'static str {
        "figure"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("figure.insert", "Insert figure", |editor, args| {
                let src = required_arg(args.as_ref(), "src")?;
                let alt = str_arg(args.as_ref(), "alt").map(str::to_string);
                figure::insert_figure(editor, src, alt).map(|_| ())
            })
            .description("Insert an image with an editable caption after the block.")
            .keywords(["image", "img", "figure", "caption", "media"])
            .args_example(serde_json::json!({ "src": "a.png", "alt": "Alt" })),
        ]
    }
}
