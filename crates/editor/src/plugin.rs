use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{kind, ApplyError, Document, ElementNode, Marks, Node, Point, Selection};
use crate::editor::Editor;
use crate::ops::Op;
use crate::schema::{ElementView, RenderedAttrs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandErrorKind {
    Unknown,
    InvalidArgs,
    /// The selection is not in a context the command works on.
    Inapplicable,
    /// The transaction would have produced an invalid document.
    Rejected,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct CommandError {
    kind: CommandErrorKind,
    message: String,
}

impl CommandError {
    pub fn new(kind: CommandErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unknown(id: &str) -> Self {
        Self::new(CommandErrorKind::Unknown, format!("Unknown command: {id}"))
    }

    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::new(CommandErrorKind::InvalidArgs, message)
    }

    pub fn inapplicable(message: impl Into<String>) -> Self {
        Self::new(CommandErrorKind::Inapplicable, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(CommandErrorKind::Rejected, message)
    }

    pub fn kind(&self) -> CommandErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ApplyError> for CommandError {
    fn from(err: ApplyError) -> Self {
        CommandError::rejected(err.to_string())
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

pub type CommandHandler =
    Arc<dyn Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync>;
pub type QueryHandler = Arc<dyn Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync>;

#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub args_example: Option<Value>,
    pub handler: CommandHandler,
}

impl CommandSpec {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        handler: impl Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            args_example: None,
            handler: Arc::new(handler),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn args_example(mut self, args_example: Value) -> Self {
        self.args_example = Some(args_example);
        self
    }
}

#[derive(Clone)]
pub struct QuerySpec {
    pub id: String,
    pub handler: QueryHandler,
}

impl QuerySpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Block,
    Inline,
    /// Only legal inside a specific parent (list items, table rows and cells).
    Structural,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildConstraint {
    None,
    BlockOnly,
    InlineOnly,
    Any,
    Only(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: String,
    pub role: NodeRole,
    pub is_void: bool,
    pub children: ChildConstraint,
}

impl NodeSpec {
    pub fn block(kind: &str, children: ChildConstraint) -> Self {
        Self {
            kind: kind.to_string(),
            role: NodeRole::Block,
            is_void: false,
            children,
        }
    }

    pub fn structural(kind: &str, children: ChildConstraint) -> Self {
        Self {
            kind: kind.to_string(),
            role: NodeRole::Structural,
            is_void: false,
            children,
        }
    }

    pub fn void(kind: &str, role: NodeRole) -> Self {
        Self {
            kind: kind.to_string(),
            role,
            is_void: true,
            children: ChildConstraint::None,
        }
    }
}

pub type AttrParser = Arc<dyn Fn(&ElementView) -> Option<Value> + Send + Sync>;
pub type AttrRenderer = Arc<dyn Fn(&Value, &mut RenderedAttrs) + Send + Sync>;

/// A custom attribute on one or more node kinds, or on the `text_style` mark,
/// with its HTML parse and render rules.
///
/// `parse` returns `None` for absent or malformed input, which leaves the
/// attribute unset. `render` is only called for set values.
#[derive(Clone)]
pub struct AttributeSpec {
    pub types: Vec<String>,
    pub key: String,
    pub parse: AttrParser,
    pub render: AttrRenderer,
}

impl AttributeSpec {
    pub fn new(
        types: &[&str],
        key: &str,
        parse: impl Fn(&ElementView) -> Option<Value> + Send + Sync + 'static,
        render: impl Fn(&Value, &mut RenderedAttrs) + Send + Sync + 'static,
    ) -> Self {
        Self {
            types: types.iter().map(|t| t.to_string()).collect(),
            key: key.to_string(),
            parse: Arc::new(parse),
            render: Arc::new(render),
        }
    }

    pub fn applies_to(&self, kind: &str) -> bool {
        self.types.iter().any(|t| t == kind)
    }
}

pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op>;
}

pub trait EditorPlugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn node_specs(&self) -> Vec<NodeSpec> {
        Vec::new()
    }
    fn attributes(&self) -> Vec<AttributeSpec> {
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
    attributes: Vec<AttributeSpec>,
    normalize_passes: Vec<Box<dyn NormalizePass>>,
    commands: HashMap<String, CommandSpec>,
    queries: HashMap<String, QuerySpec>,
}

impl PluginRegistry {
    pub fn new(plugins: impl IntoIterator<Item = Box<dyn EditorPlugin>>) -> Result<Self, String> {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register_plugin(plugin)?;
        }
        Ok(registry)
    }

    /// Paragraphs, hard breaks, normalization and typing.
    pub fn core() -> Self {
        Self::new(crate::plugins::core_plugins()).expect("core registry must be valid")
    }

    /// Every node, mark and command the rich text editor offers.
    pub fn richtext() -> Self {
        Self::new(crate::plugins::richtext_plugins()).expect("richtext registry must be valid")
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn EditorPlugin>) -> Result<(), String> {
        for spec in plugin.node_specs() {
            if self.node_specs.contains_key(&spec.kind) {
                return Err(format!("Duplicate node spec kind: {}", spec.kind));
            }
            self.node_specs.insert(spec.kind.clone(), spec);
        }

        for attr in plugin.attributes() {
            if let Some(kind) = attr
                .types
                .iter()
                .find(|t| self.attributes_for(t).any(|a| a.key == attr.key))
            {
                return Err(format!("Duplicate attribute {} on {kind}", attr.key));
            }
            self.attributes.push(attr);
        }

        self.normalize_passes.extend(plugin.normalize_passes());

        for cmd in plugin.commands() {
            if self.commands.contains_key(&cmd.id) {
                return Err(format!("Duplicate command id: {}", cmd.id));
            }
            self.commands.insert(cmd.id.clone(), cmd);
        }

        for query in plugin.queries() {
            if self.queries.contains_key(&query.id) {
                return Err(format!("Duplicate query id: {}", query.id));
            }
            self.queries.insert(query.id.clone(), query);
        }

        tracing::trace!(plugin = plugin.id(), "registered plugin");
        Ok(())
    }

    pub fn node_specs(&self) -> &HashMap<String, NodeSpec> {
        &self.node_specs
    }

    pub fn node_spec(&self, kind: &str) -> Option<&NodeSpec> {
        self.node_specs.get(kind)
    }

    /// Attribute specs for a node kind (or `text_style`), in registration order.
    pub fn attributes_for<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a AttributeSpec> {
        self.attributes.iter().filter(move |a| a.applies_to(kind))
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

    pub fn queries(&self) -> &HashMap<String, QuerySpec> {
        &self.queries
    }

    pub fn query(&self, id: &str) -> Option<QuerySpec> {
        self.queries.get(id).cloned()
    }

    pub fn is_known_kind(&self, kind: &str) -> bool {
        self.node_specs.contains_key(kind)
    }

    pub fn child_constraint(&self, el: &ElementNode) -> ChildConstraint {
        self.node_specs
            .get(&el.kind)
            .map(|s| s.children.clone())
            .unwrap_or(ChildConstraint::Any)
    }

    pub fn is_text_block(&self, el: &ElementNode) -> bool {
        self.child_constraint(el) == ChildConstraint::InlineOnly
    }

    fn role_of(&self, node: &Node) -> Option<NodeRole> {
        match node {
            Node::Text(_) => Some(NodeRole::Inline),
            Node::Element(el) => self.node_specs.get(&el.kind).map(|s| s.role.clone()),
            Node::Void(v) => self
                .node_specs
                .get(&v.kind)
                .filter(|s| s.is_void)
                .map(|s| s.role.clone()),
        }
    }

    pub fn normalize(&self, doc: &Document) -> Vec<Op> {
        // One pass at a time: each pass computes paths against the current tree.
        for pass in &self.normalize_passes {
            let ops = pass.run(doc, self);
            if !ops.is_empty() {
                tracing::trace!(pass = pass.id(), ops = ops.len(), "normalize pass");
                return ops;
            }
        }
        Vec::new()
    }

    /// Run every normalize pass to a fixed point on a detached document.
    pub fn normalize_document(
        &self,
        doc: &mut Document,
        max_iterations: usize,
    ) -> Result<(), ApplyError> {
        let mut selection = Selection::collapsed(Point::new(vec![0], 0));
        for _ in 0..max_iterations {
            let ops = self.normalize(doc);
            if ops.is_empty() {
                return Ok(());
            }
            for op in ops {
                crate::core::apply_op_to(doc, &mut selection, op)?;
            }
        }
        Err(ApplyError::NormalizeDidNotConverge)
    }

    /// Check every node against its spec. Returns the first violation found.
    pub fn validate(&self, doc: &Document) -> Result<(), String> {
        fn check_children(
            registry: &PluginRegistry,
            parent: &str,
            constraint: &ChildConstraint,
            children: &[Node],
            path: &mut Vec<usize>,
        ) -> Result<(), String> {
            for (ix, child) in children.iter().enumerate() {
                path.push(ix);
                let role = registry
                    .role_of(child)
                    .ok_or_else(|| format!("Unknown node kind {:?} at {path:?}", child.kind()))?;
                let allowed = match constraint {
                    ChildConstraint::None => false,
                    ChildConstraint::Any => true,
                    ChildConstraint::BlockOnly => role == NodeRole::Block,
                    ChildConstraint::InlineOnly => role == NodeRole::Inline,
                    ChildConstraint::Only(kinds) => child
                        .kind()
                        .is_some_and(|k| kinds.iter().any(|allowed| allowed == k)),
                };
                if !allowed {
                    return Err(format!(
                        "{} is not allowed inside {parent} at {path:?}",
                        child.kind().unwrap_or("text")
                    ));
                }
                if let Node::Element(el) = child {
                    let constraint = registry.child_constraint(el);
                    check_children(registry, &el.kind, &constraint, &el.children, path)?;
                }
                path.pop();
            }
            Ok(())
        }

        if doc.children.is_empty() {
            return Err("Document has no blocks".into());
        }
        check_children(
            self,
            "document",
            &ChildConstraint::BlockOnly,
            &doc.children,
            &mut Vec::new(),
        )
    }

    pub fn normalize_selection(&self, doc: &Document, selection: &Selection) -> Selection {
        let fallback = first_text_point(doc).unwrap_or(Point {
            path: vec![0],
            offset: 0,
        });

        let anchor = self
            .normalize_point(doc, &selection.anchor)
            .unwrap_or_else(|| {
                self.normalize_point(doc, &selection.focus)
                    .unwrap_or_else(|| fallback.clone())
            });
        let focus = self
            .normalize_point(doc, &selection.focus)
            .unwrap_or_else(|| anchor.clone());

        Selection { anchor, focus }
    }

    fn normalize_point(&self, doc: &Document, point: &Point) -> Option<Point> {
        if let Some(Node::Void(v)) = crate::core::node_ref(doc, &point.path) {
            let is_block_void = self
                .node_specs
                .get(&v.kind)
                .is_some_and(|s| s.is_void && s.role == NodeRole::Block);
            if is_block_void {
                return Some(Point::new(point.path.clone(), 0));
            }
        }
        normalize_point_to_existing_text(doc, point)
    }
}

pub(crate) fn first_text_point(doc: &Document) -> Option<Point> {
    first_text_descendant(&doc.children, &mut Vec::new())
}

fn first_text_descendant(children: &[Node], path: &mut Vec<usize>) -> Option<Point> {
    for (ix, node) in children.iter().enumerate() {
        path.push(ix);
        match node {
            Node::Text(_) => {
                let point = Point {
                    path: path.clone(),
                    offset: 0,
                };
                path.pop();
                return Some(point);
            }
            Node::Element(el) => {
                if let Some(point) = first_text_descendant(&el.children, path) {
                    path.pop();
                    return Some(point);
                }
            }
            Node::Void(_) => {}
        }
        path.pop();
    }
    None
}

fn normalize_point_to_existing_text(doc: &Document, point: &Point) -> Option<Point> {
    if point.path.is_empty() || doc.children.is_empty() {
        return None;
    }

    let mut resolved_path: Vec<usize> = Vec::new();
    let mut children: &[Node] = &doc.children;

    for &wanted in &point.path {
        if children.is_empty() {
            break;
        }
        let ix = wanted.min(children.len() - 1);
        resolved_path.push(ix);
        match &children[ix] {
            Node::Text(t) => {
                return Some(Point {
                    path: resolved_path,
                    offset: crate::core::clamp_to_char_boundary(&t.text, point.offset),
                });
            }
            Node::Element(el) => {
                children = &el.children;
            }
            Node::Void(_) => {
                break;
            }
        }
    }

    match crate::core::node_ref(doc, &resolved_path)? {
        Node::Text(t) => Some(Point {
            path: resolved_path,
            offset: crate::core::clamp_to_char_boundary(&t.text, point.offset),
        }),
        Node::Element(el) => first_text_descendant(&el.children, &mut resolved_path),
        Node::Void(_) => {
            // Step onto the closest text sibling of an inline void.
            let (&void_ix, parent) = resolved_path.split_last()?;
            let siblings = crate::core::children_ref(doc, parent)?;
            let (text_ix, offset) = siblings
                .iter()
                .enumerate()
                .skip(void_ix + 1)
                .find(|(_, n)| matches!(n, Node::Text(_)))
                .map(|(ix, _)| (ix, 0usize))
                .or_else(|| {
                    siblings
                        .iter()
                        .enumerate()
                        .take(void_ix)
                        .rev()
                        .find_map(|(ix, n)| match n {
                            Node::Text(t) => Some((ix, t.text.len())),
                            _ => None,
                        })
                })?;
            let mut path = parent.to_vec();
            path.push(text_ix);
            Some(Point::new(path, offset))
        }
    }
}

pub(crate) struct CoreSchemaPlugin;

impl EditorPlugin for CoreSchemaPlugin {
    fn id(&self) -> &'static str {
        "core.schema"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec::block(kind::PARAGRAPH, ChildConstraint::InlineOnly),
            NodeSpec::void(kind::HARD_BREAK, NodeRole::Inline),
        ]
    }
}

pub(crate) struct CoreNormalizePlugin;

impl EditorPlugin for CoreNormalizePlugin {
    fn id(&self) -> &'static str {
        "core.normalize"
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![
            Box::new(EnsureNonEmptyDocument),
            Box::new(EnsureContainersHaveBlock),
            Box::new(EnsureInlineTextLeaves),
            Box::new(RemoveEmptyTextLeaves),
            Box::new(MergeAdjacentTextLeaves),
        ]
    }
}

struct EnsureNonEmptyDocument;

impl NormalizePass for EnsureNonEmptyDocument {
    fn id(&self) -> &'static str {
        "core.ensure_non_empty_document"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        if doc.children.is_empty() {
            return vec![Op::InsertNode {
                path: vec![0],
                node: Node::paragraph(""),
            }];
        }
        Vec::new()
    }
}

/// Block containers (quotes, list items, cells) keep at least one paragraph.
/// An empty list is dropped instead.
struct EnsureContainersHaveBlock;

impl NormalizePass for EnsureContainersHaveBlock {
    fn id(&self) -> &'static str {
        "core.ensure_containers_have_block"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        fn walk(nodes: &[Node], path: &mut Vec<usize>, registry: &PluginRegistry, ops: &mut Vec<Op>) {
            for (ix, node) in nodes.iter().enumerate().rev() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                if el.children.is_empty() {
                    match registry.child_constraint(el) {
                        ChildConstraint::BlockOnly => {
                            let mut insert_path = path.clone();
                            insert_path.push(0);
                            ops.push(Op::InsertNode {
                                path: insert_path,
                                node: Node::paragraph(""),
                            });
                        }
                        ChildConstraint::Only(kinds)
                            if kinds.iter().any(|k| k == kind::LIST_ITEM) =>
                        {
                            ops.push(Op::RemoveNode { path: path.clone() });
                        }
                        _ => {}
                    }
                } else {
                    walk(&el.children, path, registry, ops);
                }
                path.pop();
            }
        }

        let mut ops = Vec::new();
        walk(&doc.children, &mut Vec::new(), registry, &mut ops);
        ops
    }
}

/// Inline containers start and end with a text leaf and never have two voids
/// side by side, so every inline position has a text point.
struct EnsureInlineTextLeaves;

impl NormalizePass for EnsureInlineTextLeaves {
    fn id(&self) -> &'static str {
        "core.ensure_inline_text_leaves"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        fn walk(nodes: &[Node], path: &mut Vec<usize>, registry: &PluginRegistry, ops: &mut Vec<Op>) {
            for (ix, node) in nodes.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);

                if registry.is_text_block(el) {
                    let is_text = |n: Option<&Node>| matches!(n, Some(Node::Text(_)));
                    let mut insert_at: Vec<usize> = Vec::new();
                    if !is_text(el.children.last()) {
                        insert_at.push(el.children.len());
                    }
                    for child_ix in (1..el.children.len()).rev() {
                        if !is_text(el.children.get(child_ix))
                            && !is_text(el.children.get(child_ix - 1))
                        {
                            insert_at.push(child_ix);
                        }
                    }
                    if !el.children.is_empty() && !is_text(el.children.first()) {
                        insert_at.push(0);
                    }
                    insert_at.dedup();
                    for at in insert_at {
                        let mut insert_path = path.clone();
                        insert_path.push(at);
                        ops.push(Op::InsertNode {
                            path: insert_path,
                            node: Node::text("", Marks::default()),
                        });
                    }
                } else {
                    walk(&el.children, path, registry, ops);
                }

                path.pop();
            }
        }

        let mut ops = Vec::new();
        walk(&doc.children, &mut Vec::new(), registry, &mut ops);
        ops
    }
}

/// Drop empty text leaves that sit next to another text leaf.
struct RemoveEmptyTextLeaves;

impl NormalizePass for RemoveEmptyTextLeaves {
    fn id(&self) -> &'static str {
        "core.remove_empty_text_leaves"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        fn walk(nodes: &[Node], path: &mut Vec<usize>, registry: &PluginRegistry, ops: &mut Vec<Op>) {
            for (ix, node) in nodes.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);

                if registry.is_text_block(el) {
                    // Simulate removals right to left so later checks see earlier removals.
                    let mut remaining: Vec<(usize, &Node)> = el.children.iter().enumerate().collect();
                    let mut pos = remaining.len();
                    while pos > 0 {
                        pos -= 1;
                        let (child_ix, child) = remaining[pos];
                        let Node::Text(t) = child else {
                            continue;
                        };
                        if !t.text.is_empty() {
                            continue;
                        }
                        let left_is_text = pos
                            .checked_sub(1)
                            .is_some_and(|p| matches!(remaining[p].1, Node::Text(_)));
                        let right_is_text =
                            matches!(remaining.get(pos + 1), Some((_, Node::Text(_))));
                        if left_is_text || right_is_text {
                            remaining.remove(pos);
                            let mut remove_path = path.clone();
                            remove_path.push(child_ix);
                            ops.push(Op::RemoveNode { path: remove_path });
                        }
                    }
                } else {
                    walk(&el.children, path, registry, ops);
                }

                path.pop();
            }
        }

        let mut ops = Vec::new();
        walk(&doc.children, &mut Vec::new(), registry, &mut ops);
        ops
    }
}

struct MergeAdjacentTextLeaves;

impl NormalizePass for MergeAdjacentTextLeaves {
    fn id(&self) -> &'static str {
        "core.merge_adjacent_text_leaves"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        fn walk(nodes: &[Node], path: &mut Vec<usize>, registry: &PluginRegistry, ops: &mut Vec<Op>) {
            for (ix, node) in nodes.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);

                if registry.is_text_block(el) {
                    merge_runs(el, path, ops);
                } else {
                    walk(&el.children, path, registry, ops);
                }

                path.pop();
            }
        }

        fn merge_runs(el: &ElementNode, path: &[usize], ops: &mut Vec<Op>) {
            let mut ix = el.children.len();
            while ix > 0 {
                ix -= 1;
                let Node::Text(right) = &el.children[ix] else {
                    continue;
                };

                let mut start = ix;
                while start > 0 {
                    let Some(Node::Text(left)) = el.children.get(start - 1) else {
                        break;
                    };
                    if left.marks != right.marks {
                        break;
                    }
                    start -= 1;
                }
                if start == ix {
                    continue;
                }

                let Some(Node::Text(first)) = el.children.get(start) else {
                    continue;
                };
                let appended: String = el.children[start + 1..=ix]
                    .iter()
                    .filter_map(|n| match n {
                        Node::Text(t) => Some(t.text.as_str()),
                        _ => None,
                    })
                    .collect();

                if !appended.is_empty() {
                    let mut insert_text_path = path.to_vec();
                    insert_text_path.push(start);
                    ops.push(Op::InsertText {
                        path: insert_text_path,
                        offset: first.text.len(),
                        text: appended,
                    });
                }
                for remove_ix in (start + 1..=ix).rev() {
                    let mut remove_path = path.to_vec();
                    remove_path.push(remove_ix);
                    ops.push(Op::RemoveNode { path: remove_path });
                }

                ix = start;
            }
        }

        let mut ops = Vec::new();
        walk(&doc.children, &mut Vec::new(), registry, &mut ops);
        ops
    }
}
