use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::EditorConfig;
use crate::core::{apply_op_to, ApplyError, Document, Marks, Point, Selection};
use crate::html::{self, HtmlOptions};
use crate::ops::{Op, Transaction};
use crate::plugin::{CommandError, PluginRegistry, QueryError};

#[derive(Debug, Clone)]
pub struct UndoRecord {
    pub inverse_ops: Vec<Op>,
    pub selection_before: Selection,
    pub selection_after: Selection,
}

/// Notifications delivered to subscribers after the editor state changes.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    SelectionUpdate,
    Transaction { doc_changed: bool },
    /// The document changed. Carries the freshly serialized HTML.
    Update { html: String },
    /// A user-facing message, e.g. a command that needs a different selection.
    Notice { message: String },
}

impl EditorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EditorEvent::SelectionUpdate => EventKind::SelectionUpdate,
            EditorEvent::Transaction { .. } => EventKind::Transaction,
            EditorEvent::Update { .. } => EventKind::Update,
            EditorEvent::Notice { .. } => EventKind::Notice,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SelectionUpdate,
    Transaction,
    Update,
    Notice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Listener = Box<dyn FnMut(&Editor, &EditorEvent)>;

struct Subscription {
    id: SubscriptionId,
    kind: EventKind,
    listener: Listener,
}

pub struct Editor {
    doc: Document,
    selection: Selection,
    stored_marks: Option<Marks>,
    registry: PluginRegistry,
    config: EditorConfig,
    undo_stack: Vec<UndoRecord>,
    redo_stack: Vec<UndoRecord>,
    revision: u64,
    subscriptions: Vec<Subscription>,
    next_subscription: u64,
}

impl Editor {
    pub fn new(doc: Document, selection: Selection, registry: PluginRegistry) -> Self {
        Self::with_config(doc, selection, registry, EditorConfig::default())
    }

    pub fn with_config(
        doc: Document,
        selection: Selection,
        registry: PluginRegistry,
        config: EditorConfig,
    ) -> Self {
        let mut editor = Self {
            doc,
            selection,
            stored_marks: None,
            registry,
            config: config.with_defaults(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            revision: 0,
            subscriptions: Vec::new(),
            next_subscription: 0,
        };
        editor.normalize_in_place();
        editor
    }

    pub fn with_core_plugins() -> Self {
        Self::new(Document::empty(), start_selection(), PluginRegistry::core())
    }

    pub fn with_richtext_plugins() -> Self {
        Self::new(Document::empty(), start_selection(), PluginRegistry::richtext())
    }

    /// Build an editor over the parsed `html`. Malformed input never fails; it
    /// degrades to whatever could be recovered, or an empty paragraph.
    pub fn from_html(html: &str, config: EditorConfig) -> Self {
        let registry = PluginRegistry::richtext();
        let doc = html::parse(html, &registry);
        Self::with_config(doc, start_selection(), registry, config)
    }

    /// Replace the whole document with freshly parsed `html`. History is
    /// dropped and no `Update` is emitted, since the host already has this HTML.
    pub fn reset_content(&mut self, html: &str) {
        self.doc = html::parse(html, &self.registry);
        self.selection = start_selection();
        self.stored_marks = None;
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.normalize_in_place();
        self.revision += 1;
        tracing::debug!(revision = self.revision, "content reset");
        self.emit(EditorEvent::Transaction { doc_changed: true });
        self.emit(EditorEvent::SelectionUpdate);
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        let before = self.selection.clone();
        self.selection = selection;
        self.normalize_selection_in_place();
        if self.selection != before {
            self.stored_marks = None;
            self.emit(EditorEvent::SelectionUpdate);
        }
    }

    /// Marks the next inserted text will carry, set by mark commands on a caret.
    pub fn stored_marks(&self) -> Option<&Marks> {
        self.stored_marks.as_ref()
    }

    pub fn set_stored_marks(&mut self, marks: Option<Marks>) {
        self.stored_marks = marks;
        self.emit(EditorEvent::Transaction { doc_changed: false });
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Bumped on every document change, including undo, redo and resets.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn html(&self) -> String {
        html::serialize(&self.doc, &self.registry, &HtmlOptions::from_config(&self.config))
    }

    pub fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.is_empty().then_some(self.config.placeholder.as_str())
    }

    pub fn character_count(&self) -> usize {
        self.doc.character_count()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo(&mut self) -> bool {
        let Some(record) = self.undo_stack.pop() else {
            return false;
        };

        let UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        } = record;

        let redo_ops = match self.replay(inverse_ops) {
            Ok(ops) => ops,
            Err(err) => {
                tracing::warn!(%err, "undo record could not be applied, dropping it");
                return false;
            }
        };

        self.selection = selection_before.clone();
        self.normalize_selection_in_place();

        self.redo_stack.push(UndoRecord {
            inverse_ops: redo_ops,
            selection_before,
            selection_after,
        });
        self.finish_history_step();
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(record) = self.redo_stack.pop() else {
            return false;
        };

        let UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        } = record;

        let undo_ops = match self.replay(inverse_ops) {
            Ok(ops) => ops,
            Err(err) => {
                tracing::warn!(%err, "redo record could not be applied, dropping it");
                return false;
            }
        };

        self.selection = selection_after.clone();
        self.normalize_selection_in_place();

        self.undo_stack.push(UndoRecord {
            inverse_ops: undo_ops,
            selection_before,
            selection_after,
        });
        self.finish_history_step();
        true
    }

    /// Apply a transaction atomically. On any error the document and the
    /// selection are left exactly as they were.
    pub fn apply(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        let doc_before = self.doc.clone();
        let selection_before = self.selection.clone();
        let source = tx.source.clone().unwrap_or_default();

        let inverse_ops = match self.apply_ops(tx) {
            Ok(ops) => ops,
            Err(err) => {
                self.doc = doc_before;
                self.selection = selection_before;
                tracing::debug!(%err, %source, "transaction rejected");
                return Err(err);
            }
        };

        let selection_changed = self.selection != selection_before;
        if self.doc == doc_before {
            if selection_changed {
                self.stored_marks = None;
            }
            self.emit(EditorEvent::Transaction { doc_changed: false });
            if selection_changed {
                self.emit(EditorEvent::SelectionUpdate);
            }
            return Ok(());
        }

        self.undo_stack.push(UndoRecord {
            inverse_ops,
            selection_before,
            selection_after: self.selection.clone(),
        });
        self.redo_stack.clear();
        if self.undo_stack.len() > self.config.max_undo {
            self.undo_stack.remove(0);
        }

        self.stored_marks = None;
        self.revision += 1;
        tracing::debug!(%source, revision = self.revision, "transaction applied");

        self.emit(EditorEvent::Transaction { doc_changed: true });
        self.emit_update();
        if selection_changed {
            self.emit(EditorEvent::SelectionUpdate);
        }
        Ok(())
    }

    pub fn run_command(&mut self, id: &str, args: Option<Value>) -> Result<(), CommandError> {
        let Some(command) = self.registry.command(id) else {
            return Err(CommandError::unknown(id));
        };
        tracing::debug!(command = id, "running command");
        (command.handler)(self, args)
    }

    pub fn run_query_json(&self, id: &str, args: Option<Value>) -> Result<Value, QueryError> {
        let Some(query) = self.registry.query(id) else {
            return Err(QueryError::new(format!("Unknown query: {id}")));
        };
        (query.handler)(self, args)
    }

    pub fn run_query<T>(&self, id: &str, args: Option<Value>) -> Result<T, QueryError>
    where
        T: DeserializeOwned,
    {
        let value = self.run_query_json(id, args)?;
        serde_json::from_value(value)
            .map_err(|err| QueryError::new(format!("Failed to decode query result: {err}")))
    }

    pub fn subscribe(
        &mut self,
        kind: EventKind,
        listener: impl FnMut(&Editor, &EditorEvent) + 'static,
    ) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscriptions.push(Subscription {
            id,
            kind,
            listener: Box::new(listener),
        });
        id
    }

    /// Returns false if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Surface a message to the author through `Notice` subscribers.
    pub fn notify(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(%message, "editor notice");
        self.emit(EditorEvent::Notice { message });
    }

    fn emit(&mut self, event: EditorEvent) {
        let kind = event.kind();
        if !self.subscriptions.iter().any(|s| s.kind == kind) {
            return;
        }
        let mut subscriptions = std::mem::take(&mut self.subscriptions);
        for sub in subscriptions.iter_mut().filter(|s| s.kind == kind) {
            (sub.listener)(self, &event);
        }
        self.subscriptions = subscriptions;
    }

    fn emit_update(&mut self) {
        if self
            .subscriptions
            .iter()
            .any(|s| s.kind == EventKind::Update)
        {
            let html = self.html();
            self.emit(EditorEvent::Update { html });
        }
    }

    fn finish_history_step(&mut self) {
        self.stored_marks = None;
        self.revision += 1;
        self.emit(EditorEvent::Transaction { doc_changed: true });
        self.emit_update();
        self.emit(EditorEvent::SelectionUpdate);
    }

    fn apply_ops(&mut self, tx: Transaction) -> Result<Vec<Op>, ApplyError> {
        let mut inverse_ops: Vec<Op> = Vec::new();
        for op in tx.ops {
            inverse_ops.push(self.apply_op(op)?);
        }

        if let Some(sel) = tx.selection_after {
            self.selection = sel;
        }

        let mut inverse_normalize = self.normalize_with_inverse_ops()?;
        inverse_ops.append(&mut inverse_normalize);
        self.registry
            .validate(&self.doc)
            .map_err(ApplyError::SchemaViolation)?;
        inverse_ops.reverse();

        self.normalize_selection_in_place();
        Ok(inverse_ops)
    }

    /// Apply a recorded op list all or nothing and return its inverse.
    fn replay(&mut self, ops: Vec<Op>) -> Result<Vec<Op>, ApplyError> {
        let doc_before = self.doc.clone();
        let selection_before = self.selection.clone();

        let mut inverse: Vec<Op> = Vec::new();
        for op in ops {
            match self.apply_op(op) {
                Ok(inv) => inverse.push(inv),
                Err(err) => {
                    self.doc = doc_before;
                    self.selection = selection_before;
                    return Err(err);
                }
            }
        }
        inverse.reverse();
        Ok(inverse)
    }

    fn normalize_in_place(&mut self) {
        if let Err(err) = self.normalize_with_inverse_ops() {
            tracing::warn!(%err, "document could not be normalized");
        }
        self.normalize_selection_in_place();
    }

    fn normalize_selection_in_place(&mut self) {
        self.selection = self
            .registry
            .normalize_selection(&self.doc, &self.selection);
    }

    fn normalize_with_inverse_ops(&mut self) -> Result<Vec<Op>, ApplyError> {
        let mut inverse_ops: Vec<Op> = Vec::new();
        for iteration in 0..self.config.max_normalize_iterations {
            let ops = self.registry.normalize(&self.doc);
            if ops.is_empty() {
                return Ok(inverse_ops);
            }
            tracing::trace!(iteration, ops = ops.len(), "normalizing");
            for op in ops {
                let inv = self.apply_op(op)?;
                inverse_ops.push(inv);
            }
        }
        Err(ApplyError::NormalizeDidNotConverge)
    }

    fn apply_op(&mut self, op: Op) -> Result<Op, ApplyError> {
        apply_op_to(&mut self.doc, &mut self.selection, op)
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("doc", &self.doc)
            .field("selection", &self.selection)
            .field("stored_marks", &self.stored_marks)
            .field("revision", &self.revision)
            .field("undo", &self.undo_stack.len())
            .field("redo", &self.redo_stack.len())
            .finish_non_exhaustive()
    }
}

fn start_selection() -> Selection {
    Selection::collapsed(Point::new(vec![0, 0], 0))
}

