//! Toolbar view model: a closed set of actions and the display state derived
//! from the document and the selection.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::kind;
use crate::editor::{Editor, EditorEvent, EventKind, SubscriptionId};
use crate::plugin::CommandErrorKind;
use crate::plugins::{active_marks, blocks, list, selected_void_path, table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkKind {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
    Subscript,
    Superscript,
    Link,
    Highlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Justify => "justify",
        }
    }
}

/// Everything the toolbar shows. Recomputed from scratch after every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolbarState {
    pub active_marks: BTreeSet<MarkKind>,
    /// Kind of the caret's block, or `image` for a selected image.
    pub active_node_type: Option<String>,
    pub heading_level: Option<u64>,
    pub list_type: Option<String>,
    pub in_blockquote: bool,
    pub font_size: Option<u64>,
    pub font_family: Option<String>,
    pub color: Option<String>,
    pub highlight_color: Option<String>,
    pub link_href: Option<String>,
    pub alignment: String,
    pub can_align: bool,
    pub can_sink_list_item: bool,
    pub can_insert_table: bool,
    pub can_undo: bool,
    pub can_redo: bool,
    pub is_image_selected: bool,
    pub is_table_cell_selected: bool,
    pub character_count: usize,
    pub placeholder: Option<String>,
}

impl ToolbarState {
    pub fn compute(editor: &Editor) -> Self {
        let marks = active_marks(editor);
        let mut active = BTreeSet::new();
        for (on, mark) in [
            (marks.bold, MarkKind::Bold),
            (marks.italic, MarkKind::Italic),
            (marks.underline, MarkKind::Underline),
            (marks.strike, MarkKind::Strike),
            (marks.code, MarkKind::Code),
            (marks.subscript, MarkKind::Subscript),
            (marks.superscript, MarkKind::Superscript),
            (marks.link.is_some(), MarkKind::Link),
            (marks.highlight.is_some(), MarkKind::Highlight),
        ] {
            if on {
                active.insert(mark);
            }
        }

        let list = list::active_list(editor);
        let can_sink_list_item = list.as_ref().is_some_and(|(path, _)| {
            editor
                .selection()
                .focus
                .path
                .get(path.len())
                .is_some_and(|ix| *ix > 0)
        });

        Self {
            active_node_type: blocks::active_block_type(editor).map(str::to_string),
            heading_level: blocks::heading_level(editor),
            list_type: list.map(|(_, list_kind)| list_kind.to_string()),
            in_blockquote: blocks::blockquote_path(editor).is_some(),
            font_size: marks.font_size(),
            font_family: marks.font_family().map(str::to_string),
            color: marks.color().map(str::to_string),
            highlight_color: marks.highlight.as_ref().and_then(|h| h.color.clone()),
            link_href: marks.link.as_ref().map(|l| l.href.clone()),
            alignment: blocks::active_align(editor).to_string(),
            can_align: blocks::can_align(editor),
            can_sink_list_item,
            can_insert_table: table::can_insert_table(editor),
            can_undo: editor.can_undo(),
            can_redo: editor.can_redo(),
            is_image_selected: selected_void_path(editor, kind::IMAGE).is_some(),
            is_table_cell_selected: table::focus_cell_path(editor).is_some(),
            character_count: editor.character_count(),
            placeholder: editor.placeholder().map(str::to_string),
            active_marks: active,
        }
    }
}

/// Every toolbar control. Each maps to exactly one registered command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolbarAction {
    Undo,
    Redo,
    Paragraph,
    Heading(u8),
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
    Subscript,
    Superscript,
    BulletList,
    OrderedList,
    Indent,
    Outdent,
    Blockquote,
    CodeBlock,
    HorizontalRule,
    Align(Alignment),
    SetLink,
    UnsetLink,
    InsertImage,
    InsertImages,
    SetImageDimensions,
    SetImageBorder,
    ClearImageBorder,
    InsertTable,
    AddRowBefore,
    AddRowAfter,
    DeleteRow,
    AddColumnBefore,
    AddColumnAfter,
    DeleteColumn,
    DeleteTable,
    SetCellBorder,
    ClearCellBorder,
    TextColor,
    UnsetTextColor,
    Highlight,
    UnsetHighlight,
    FontFamily,
    FontSize,
    IncreaseFontSize,
    DecreaseFontSize,
    ClearFormatting,
}

impl ToolbarAction {
    /// Toolbar order.
    pub fn all() -> Vec<ToolbarAction> {
        use ToolbarAction::*;
        let mut actions = vec![Undo, Redo, Paragraph];
        actions.extend((1..=6).map(Heading));
        actions.extend([
            Bold,
            Italic,
            Underline,
            Strike,
            Code,
            Subscript,
            Superscript,
            BulletList,
            OrderedList,
            Indent,
            Outdent,
            Blockquote,
            CodeBlock,
            HorizontalRule,
            Align(Alignment::Left),
            Align(Alignment::Center),
            Align(Alignment::Right),
            Align(Alignment::Justify),
            SetLink,
            UnsetLink,
            InsertImage,
            InsertImages,
            SetImageDimensions,
            SetImageBorder,
            ClearImageBorder,
            InsertTable,
            AddRowBefore,
            AddRowAfter,
            DeleteRow,
            AddColumnBefore,
            AddColumnAfter,
            DeleteColumn,
            DeleteTable,
            SetCellBorder,
            ClearCellBorder,
            TextColor,
            UnsetTextColor,
            Highlight,
            UnsetHighlight,
            FontFamily,
            FontSize,
            IncreaseFontSize,
            DecreaseFontSize,
            ClearFormatting,
        ]);
        actions
    }

    pub fn command(self) -> &'static str {
        match self {
            Self::Undo => "history.undo",
            Self::Redo => "history.redo",
            Self::Paragraph => "block.set_paragraph",
            Self::Heading(_) => "block.toggle_heading",
            Self::Bold => "marks.toggle_bold",
            Self::Italic => "marks.toggle_italic",
            Self::Underline => "marks.toggle_underline",
            Self::Strike => "marks.toggle_strike",
            Self::Code => "marks.toggle_code",
            Self::Subscript => "marks.toggle_subscript",
            Self::Superscript => "marks.toggle_superscript",
            Self::BulletList => "list.toggle_bullet",
            Self::OrderedList => "list.toggle_ordered",
            Self::Indent => "list.sink_item",
            Self::Outdent => "list.lift_item",
            Self::Blockquote => "block.toggle_blockquote",
            Self::CodeBlock => "block.toggle_code_block",
            Self::HorizontalRule => "block.insert_horizontal_rule",
            Self::Align(_) => "block.set_align",
            Self::SetLink => "marks.set_link",
            Self::UnsetLink => "marks.unset_link",
            Self::InsertImage => "image.insert",
            Self::InsertImages => "image.insert_many",
            Self::SetImageDimensions => "image.set_dimensions",
            Self::SetImageBorder => "image.set_border",
            Self::ClearImageBorder => "image.clear_border",
            Self::InsertTable => "table.insert",
            Self::AddRowBefore => "table.add_row_before",
            Self::AddRowAfter => "table.add_row_after",
            Self::DeleteRow => "table.delete_row",
            Self::AddColumnBefore => "table.add_column_before",
            Self::AddColumnAfter => "table.add_column_after",
            Self::DeleteColumn => "table.delete_column",
            Self::DeleteTable => "table.delete",
            Self::SetCellBorder => "table.set_cell_border",
            Self::ClearCellBorder => "table.clear_cell_border",
            Self::TextColor => "text_style.set_color",
            Self::UnsetTextColor => "text_style.unset_color",
            Self::Highlight => "marks.set_highlight",
            Self::UnsetHighlight => "marks.unset_highlight",
            Self::FontFamily => "text_style.set_font_family",
            Self::FontSize => "text_style.set_font_size",
            Self::IncreaseFontSize => "text_style.increase_font_size",
            Self::DecreaseFontSize => "text_style.decrease_font_size",
            Self::ClearFormatting => "format.clear",
        }
    }

    /// Arguments the action itself carries. Caller arguments are merged over them.
    fn preset_args(self) -> Option<Value> {
        match self {
            Self::Heading(level) => Some(json!({ "level": level })),
            Self::Align(align) => Some(json!({ "align": align.as_str() })),
            _ => None,
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Self::Undo => "↶",
            Self::Redo => "↷",
            Self::Paragraph => "¶",
            Self::Heading(1) => "H1",
            Self::Heading(2) => "H2",
            Self::Heading(3) => "H3",
            Self::Heading(4) => "H4",
            Self::Heading(5) => "H5",
            Self::Heading(_) => "H6",
            Self::Bold => "B",
            Self::Italic => "I",
            Self::Underline => "U",
            Self::Strike => "S",
            Self::Code => "</>",
            Self::Subscript => "x₂",
            Self::Superscript => "x²",
            Self::BulletList => "•",
            Self::OrderedList => "1.",
            Self::Indent => "⇥",
            Self::Outdent => "⇤",
            Self::Blockquote => "❝",
            Self::CodeBlock => "{ }",
            Self::HorizontalRule => "―",
            Self::Align(Alignment::Left) => "⯇",
            Self::Align(Alignment::Center) => "≡",
            Self::Align(Alignment::Right) => "⯈",
            Self::Align(Alignment::Justify) => "☰",
            Self::SetLink => "🔗",
            Self::UnsetLink => "⛓",
            Self::InsertImage | Self::InsertImages => "🖼",
            Self::SetImageDimensions => "⤢",
            Self::SetImageBorder | Self::SetCellBorder => "▢",
            Self::ClearImageBorder | Self::ClearCellBorder => "⬚",
            Self::InsertTable => "⊞",
            Self::AddRowBefore => "⤒",
            Self::AddRowAfter => "⤓",
            Self::DeleteRow => "⊟",
            Self::AddColumnBefore => "⇤|",
            Self::AddColumnAfter => "|⇥",
            Self::DeleteColumn => "⊠",
            Self::DeleteTable => "✕",
            Self::TextColor => "A",
            Self::UnsetTextColor => "A̶",
            Self::Highlight => "🖍",
            Self::UnsetHighlight => "⌫",
            Self::FontFamily => "Aa",
            Self::FontSize => "px",
            Self::IncreaseFontSize => "A+",
            Self::DecreaseFontSize => "A-",
            Self::ClearFormatting => "Tx",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Undo => "Geri Al",
            Self::Redo => "Yinele",
            Self::Paragraph => "Paragraf",
            Self::Heading(1) => "Başlık 1",
            Self::Heading(2) => "Başlık 2",
            Self::Heading(3) => "Başlık 3",
            Self::Heading(4) => "Başlık 4",
            Self::Heading(5) => "Başlık 5",
            Self::Heading(_) => "Başlık 6",
            Self::Bold => "Kalın",
            Self::Italic => "İtalik",
            Self::Underline => "Altı Çizili",
            Self::Strike => "Üstü Çizili",
            Self::Code => "Satır İçi Kod",
            Self::Subscript => "Alt Simge",
            Self::Superscript => "Üst Simge",
            Self::BulletList => "Madde İşaretli Liste",
            Self::OrderedList => "Numaralı Liste",
            Self::Indent => "Girintiyi Artır",
            Self::Outdent => "Girintiyi Azalt",
            Self::Blockquote => "Alıntı",
            Self::CodeBlock => "Kod Bloğu",
            Self::HorizontalRule => "Yatay Çizgi",
            Self::Align(Alignment::Left) => "Sola Hizala",
            Self::Align(Alignment::Center) => "Ortala",
            Self::Align(Alignment::Right) => "Sağa Hizala",
            Self::Align(Alignment::Justify) => "İki Yana Yasla",
            Self::SetLink => "Bağlantı Ekle",
            Self::UnsetLink => "Bağlantıyı Kaldır",
            Self::InsertImage => "Resim Ekle",
            Self::InsertImages => "Resimleri Ekle",
            Self::SetImageDimensions => "Resim Boyutu",
            Self::SetImageBorder => "Resim Kenarlığı",
            Self::ClearImageBorder => "Resim Kenarlığını Kaldır",
            Self::InsertTable => "Tablo Ekle",
            Self::AddRowBefore => "Üste Satır Ekle",
            Self::AddRowAfter => "Alta Satır Ekle",
            Self::DeleteRow => "Satırı Sil",
            Self::AddColumnBefore => "Sola Sütun Ekle",
            Self::AddColumnAfter => "Sağa Sütun Ekle",
            Self::DeleteColumn => "Sütunu Sil",
            Self::DeleteTable => "Tabloyu Sil",
            Self::SetCellBorder => "Hücre Kenarlığı",
            Self::ClearCellBorder => "Hücre Kenarlığını Kaldır",
            Self::TextColor => "Yazı Rengi",
            Self::UnsetTextColor => "Yazı Rengini Kaldır",
            Self::Highlight => "Vurgu Rengi",
            Self::UnsetHighlight => "Vurguyu Kaldır",
            Self::FontFamily => "Yazı Tipi",
            Self::FontSize => "Yazı Boyutu",
            Self::IncreaseFontSize => "Yazı Boyutunu Artır",
            Self::DecreaseFontSize => "Yazı Boyutunu Küçült",
            Self::ClearFormatting => "Biçimlendirmeyi Temizle",
        }
    }

    /// Whether the button shows as pressed.
    pub fn is_active(self, state: &ToolbarState) -> bool {
        let mark = |m: MarkKind| state.active_marks.contains(&m);
        let node = |k: &str| state.active_node_type.as_deref() == Some(k);
        match self {
            Self::Paragraph => node(kind::PARAGRAPH) && state.list_type.is_none(),
            Self::Heading(level) => state.heading_level == Some(u64::from(level)),
            Self::Bold => mark(MarkKind::Bold),
            Self::Italic => mark(MarkKind::Italic),
            Self::Underline => mark(MarkKind::Underline),
            Self::Strike => mark(MarkKind::Strike),
            Self::Code => mark(MarkKind::Code),
            Self::Subscript => mark(MarkKind::Subscript),
            Self::Superscript => mark(MarkKind::Superscript),
            Self::BulletList => state.list_type.as_deref() == Some(kind::BULLET_LIST),
            Self::OrderedList => state.list_type.as_deref() == Some(kind::ORDERED_LIST),
            Self::Blockquote => state.in_blockquote,
            Self::CodeBlock => node(kind::CODE_BLOCK),
            Self::Align(align) => state.can_align && state.alignment == align.as_str(),
            Self::SetLink => mark(MarkKind::Link),
            Self::Highlight => mark(MarkKind::Highlight),
            _ => false,
        }
    }

    /// Disabled buttons stay visible. Commands still check their own context.
    pub fn is_enabled(self, state: &ToolbarState) -> bool {
        match self {
            Self::Undo => state.can_undo,
            Self::Redo => state.can_redo,
            Self::Align(_) => state.can_align,
            Self::Indent => state.can_sink_list_item,
            Self::Outdent => state.list_type.is_some(),
            Self::UnsetLink => state.link_href.is_some(),
            Self::SetImageDimensions | Self::SetImageBorder | Self::ClearImageBorder => {
                state.is_image_selected
            }
            Self::InsertTable => state.can_insert_table,
            Self::AddRowBefore
            | Self::AddRowAfter
            | Self::DeleteRow
            | Self::AddColumnBefore
            | Self::AddColumnAfter
            | Self::DeleteColumn
            | Self::DeleteTable
            | Self::SetCellBorder
            | Self::ClearCellBorder => state.is_table_cell_selected,
            Self::InsertImage | Self::InsertImages | Self::HorizontalRule => true,
            _ => !state.is_image_selected,
        }
    }
}

impl Editor {
    /// Run a toolbar action. Failures are logged, never returned; the result
    /// says whether the document changed.
    pub fn execute(&mut self, action: ToolbarAction, args: Option<Value>) -> bool {
        let revision = self.revision();
        let args = match (action.preset_args(), args) {
            (Some(Value::Object(mut preset)), Some(Value::Object(extra))) => {
                preset.extend(extra);
                Some(Value::Object(preset))
            }
            (preset, None) => preset,
            (_, args) => args,
        };

        if let Err(err) = self.run_command(action.command(), args) {
            match err.kind() {
                CommandErrorKind::Inapplicable => {
                    tracing::debug!(?action, %err, "toolbar action not applicable here");
                }
                CommandErrorKind::InvalidArgs
                | CommandErrorKind::Rejected
                | CommandErrorKind::Unknown => {
                    tracing::warn!(?action, %err, "toolbar action failed");
                }
            }
        }
        self.revision() != revision
    }
}

#[derive(Debug, Default)]
struct ToolbarView {
    state: Option<ToolbarState>,
    renders: usize,
    last_notice: Option<String>,
}

/// Keeps a [`ToolbarState`] in sync with an editor through its event
/// subscriptions. Call [`ToolbarController::detach`] before dropping the
/// editor's host.
pub struct ToolbarController {
    view: Rc<RefCell<ToolbarView>>,
    subscriptions: Vec<SubscriptionId>,
}

impl ToolbarController {
    pub fn attach(editor: &mut Editor) -> Self {
        let view = Rc::new(RefCell::new(ToolbarView {
            state: Some(ToolbarState::compute(editor)),
            renders: 1,
            last_notice: None,
        }));

        let mut subscriptions = Vec::new();
        for event_kind in [
            EventKind::SelectionUpdate,
            EventKind::Transaction,
            EventKind::Update,
        ] {
            let view = Rc::clone(&view);
            subscriptions.push(editor.subscribe(event_kind, move |editor, _event| {
                let mut view = view.borrow_mut();
                view.state = Some(ToolbarState::compute(editor));
                view.renders += 1;
            }));
        }

        let notices = Rc::clone(&view);
        subscriptions.push(editor.subscribe(EventKind::Notice, move |_editor, event| {
            if let EditorEvent::Notice { message } = event {
                notices.borrow_mut().last_notice = Some(message.clone());
            }
        }));

        tracing::debug!(subscriptions = subscriptions.len(), "toolbar attached");
        Self {
            view,
            subscriptions,
        }
    }

    pub fn state(&self) -> Option<ToolbarState> {
        self.view.borrow().state.clone()
    }

    /// How many times the state has been recomputed, including on attach.
    pub fn render_count(&self) -> usize {
        self.view.borrow().renders
    }

    pub fn last_notice(&self) -> Option<String> {
        self.view.borrow().last_notice.clone()
    }

    pub fn detach(self, editor: &mut Editor) {
        for id in self.subscriptions {
            editor.unsubscribe(id);
        }
        tracing::debug!("toolbar detached");
    }
}
