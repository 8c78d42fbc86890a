use serde_json::Value;

use super::{
    active_marks, arg_str, commit, ordered_selection_points, rewrite_marks, update_marks,
};
use crate::core::{children_ref, HighlightMark, LinkMark, Marks, Node, Point, Selection};
use crate::editor::Editor;
use crate::ops::Transaction;
use crate::plugin::{CommandError, CommandSpec, EditorPlugin, QueryError, QuerySpec};
use crate::schema::is_safe_url;

type Field = fn(&mut Marks) -> &mut bool;

mod field {
    use crate::core::Marks;

    pub(super) fn bold(m: &mut Marks) -> &mut bool {
        &mut m.bold
    }
    pub(super) fn italic(m: &mut Marks) -> &mut bool {
        &mut m.italic
    }
    pub(super) fn underline(m: &mut Marks) -> &mut bool {
        &mut m.underline
    }
    pub(super) fn strike(m: &mut Marks) -> &mut bool {
        &mut m.strike
    }
    pub(super) fn code(m: &mut Marks) -> &mut bool {
        &mut m.code
    }
    pub(super) fn subscript(m: &mut Marks) -> &mut bool {
        &mut m.subscript
    }
    pub(super) fn superscript(m: &mut Marks) -> &mut bool {
        &mut m.superscript
    }
}

pub(crate) struct MarksPlugin;

impl EditorPlugin for MarksPlugin {
    fn id(&self) -> &'static str {
        "marks"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        let toggles: [(&'static str, &str, Field, Option<Field>); 7] = [
            ("marks.toggle_bold", "Toggle bold", field::bold, None),
            ("marks.toggle_italic", "Toggle italic", field::italic, None),
            ("marks.toggle_underline", "Toggle underline", field::underline, None),
            ("marks.toggle_strike", "Toggle strikethrough", field::strike, None),
            ("marks.toggle_code", "Toggle inline code", field::code, None),
            (
                "marks.toggle_subscript",
                "Toggle subscript",
                field::subscript,
                Some(field::superscript),
            ),
            (
                "marks.toggle_superscript",
                "Toggle superscript",
                field::superscript,
                Some(field::subscript),
            ),
        ];

        let mut commands: Vec<CommandSpec> = toggles
            .into_iter()
            .map(|(id, label, field, excludes)| {
                CommandSpec::new(id, label, move |editor, _args| {
                    toggle_bool_mark(editor, id, field, excludes)
                })
                .description("Toggle the mark on the selection, or on the next typed text at a caret.")
            })
            .collect();

        commands.extend([
            CommandSpec::new("marks.toggle_highlight", "Toggle highlight", |editor, _args| {
                let on = active_marks(editor).highlight.is_none();
                update_marks(editor, "marks.toggle_highlight", move |mut marks| {
                    marks.highlight = on.then(HighlightMark::default);
                    marks
                })
            }),
            CommandSpec::new("marks.set_highlight", "Set highlight color", |editor, args| {
                let color = arg_str(args.as_ref(), "color").unwrap_or("").trim().to_string();
                if color.is_empty() {
                    return unset_highlight(editor);
                }
                if !crate::schema::is_safe_style_value(&color) {
                    tracing::debug!(%color, "ignoring malformed highlight color");
                    return Ok(());
                }
                update_marks(editor, "marks.set_highlight", move |mut marks| {
                    marks.highlight = Some(HighlightMark {
                        color: Some(color.clone()),
                    });
                    marks
                })
            })
            .description("Highlight the selection. An empty color removes the highlight.")
            .args_example(serde_json::json!({ "color": "#fef08a" })),
            CommandSpec::new("marks.unset_highlight", "Remove highlight", |editor, _args| {
                unset_highlight(editor)
            }),
            CommandSpec::new("marks.set_link", "Set link", |editor, args| {
                let href = arg_str(args.as_ref(), "href")
                    .ok_or_else(|| CommandError::invalid_args("Missing args.href"))?
                    .trim()
                    .to_string();
                if href.is_empty() {
                    return unset_link(editor);
                }
                if !is_safe_url(&href) {
                    return Err(CommandError::invalid_args(format!("Refusing link {href:?}")));
                }
                set_link(editor, href)
            })
            .description("Link the selection. Links always open in a new tab; an empty href removes the link.")
            .args_example(serde_json::json!({ "href": "https://example.com" })),
            CommandSpec::new("marks.unset_link", "Remove link", |editor, _args| unset_link(editor)),
        ]);
        commands
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("marks.get_active", |editor, _args| {
                serde_json::to_value(active_marks(editor))
                    .map_err(|err| QueryError::new(format!("Failed to encode marks: {err}")))
            }),
            QuerySpec::new("marks.active_link", |editor, _args| {
                Ok(active_marks(editor)
                    .link
                    .map(|link| Value::String(link.href))
                    .unwrap_or(Value::Null))
            }),
        ]
    }
}

fn toggle_bool_mark(
    editor: &mut Editor,
    command: &str,
    field: Field,
    excludes: Option<Field>,
) -> Result<(), CommandError> {
    let mut current = active_marks(editor);
    let on = !*field(&mut current);
    update_marks(editor, command, move |mut marks| {
        *field(&mut marks) = on;
        if let Some(other) = excludes.filter(|_| on) {
            *other(&mut marks) = false;
        }
        marks
    })
}

fn unset_highlight(editor: &mut Editor) -> Result<(), CommandError> {
    update_marks(editor, "marks.unset_highlight", |mut marks| {
        marks.highlight = None;
        marks
    })
}

fn set_link(editor: &mut Editor, href: String) -> Result<(), CommandError> {
    let link = LinkMark {
        href,
        target: Some("_blank".to_string()),
    };
    if editor.selection().is_collapsed() {
        if let Some(range) = link_range_at_caret(editor) {
            return update_range(editor, range, "marks.set_link", move |mut marks| {
                marks.link = Some(link.clone());
                marks
            });
        }
    }
    update_marks(editor, "marks.set_link", move |mut marks| {
        marks.link = Some(link.clone());
        marks
    })
}

fn unset_link(editor: &mut Editor) -> Result<(), CommandError> {
    if editor.selection().is_collapsed() {
        if let Some(range) = link_range_at_caret(editor) {
            return update_range(editor, range, "marks.unset_link", |mut marks| {
                marks.link = None;
                marks
            });
        }
    }
    update_marks(editor, "marks.unset_link", |mut marks| {
        marks.link = None;
        marks
    })
}

/// Apply a mark change to `range` and keep the caret where it was.
fn update_range(
    editor: &mut Editor,
    range: Selection,
    command: &str,
    apply: impl Fn(Marks) -> Marks,
) -> Result<(), CommandError> {
    let caret = editor.selection().focus.clone();
    let (ops, mut points) = rewrite_marks(editor, &range, &apply, vec![caret.clone()])?;
    let caret = points.pop().unwrap_or(caret);
    commit(
        editor,
        Transaction::new(ops)
            .selection_after(Selection::collapsed(caret))
            .source(format!("command:{command}")),
    )
}

/// The run of adjacent text sharing the caret's link href.
fn link_range_at_caret(editor: &Editor) -> Option<Selection> {
    let focus = &editor.selection().focus;
    let (&child_ix, block_path) = focus.path.split_last()?;
    let siblings = children_ref(editor.doc(), block_path)?;
    let href = match siblings.get(child_ix)? {
        Node::Text(t) => t.marks.link.as_ref()?.href.clone(),
        _ => return None,
    };
    let same_link =
        |n: &Node| matches!(n, Node::Text(t) if t.marks.link.as_ref().is_some_and(|l| l.href == href));

    let mut first = child_ix;
    while first > 0 && same_link(&siblings[first - 1]) {
        first -= 1;
    }
    let mut last = child_ix;
    while siblings.get(last + 1).is_some_and(same_link) {
        last += 1;
    }
    let end_len = match &siblings[last] {
        Node::Text(t) => t.text.len(),
        _ => 0,
    };

    let at = |ix: usize, offset: usize| {
        let mut path = block_path.to_vec();
        path.push(ix);
        Point::new(path, offset)
    };
    let range = Selection {
        anchor: at(first, 0),
        focus: at(last, end_len),
    };
    let (start, end) = ordered_selection_points(&range);
    (start != end).then_some(range)
}
