//! Font size, font family and text color, carried by the `text_style` mark.
//!
//! Each attribute is independent: clearing one never touches the others, and
//! the mark disappears once all three are unset.

use serde_json::{json, Value};

use super::{active_marks, arg_value, update_marks};
use crate::core::kind;
use crate::editor::Editor;
use crate::plugin::{AttributeSpec, CommandError, CommandSpec, EditorPlugin, QuerySpec};
use crate::schema::{is_safe_style_value, parse_px, style_attribute, MAX_PX};

pub(crate) const FONT_SIZE: &str = "font_size";
pub(crate) const FONT_FAMILY: &str = "font_family";
pub(crate) const COLOR: &str = "color";

pub(crate) struct TextStylePlugin;

impl EditorPlugin for TextStylePlugin {
    fn id(&self) -> &'static str {
        "text_style"
    }

    fn attributes(&self) -> Vec<AttributeSpec> {
        vec![
            AttributeSpec::new(
                &[kind::TEXT_STYLE],
                FONT_SIZE,
                |el| {
                    let raw = el.style("font-size")?;
                    let size = parse_px(raw);
                    if size.is_none() {
                        tracing::warn!(value = raw, "ignoring malformed font-size");
                    }
                    size.map(Value::from)
                },
                |value, out| {
                    if let Some(size) = value.as_u64().filter(|s| *s > 0) {
                        out.style("font-size", format!("{size}px"));
                    }
                },
            ),
            AttributeSpec::new(
                &[kind::TEXT_STYLE],
                FONT_FAMILY,
                |el| {
                    el.style("font-family")
                        .map(unquote_family)
                        .filter(|v| is_safe_style_value(v))
                        .map(Value::String)
                },
                |value, out| {
                    if let Some(family) = value.as_str().filter(|v| is_safe_style_value(v)) {
                        out.style("font-family", quote_family(family));
                    }
                },
            ),
            style_attribute(&[kind::TEXT_STYLE], COLOR, "color"),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("text_style.set_font_size", "Set font size", |editor, args| {
                match arg_value(args.as_ref(), "size") {
                    None => Ok(()),
                    Some(Value::String(s)) if s.trim().is_empty() => unset(editor, FONT_SIZE),
                    Some(value) => match font_size_arg(value) {
                        Some(size) => set(editor, FONT_SIZE, Value::from(size)),
                        None => {
                            tracing::debug!(%value, "ignoring non-numeric font size");
                            Ok(())
                        }
                    },
                }
            })
            .description("Set the font size in pixels. Non-numeric sizes are ignored; an empty size unsets it.")
            .args_example(json!({ "size": 18 })),
            CommandSpec::new("text_style.unset_font_size", "Unset font size", |editor, _args| {
                unset(editor, FONT_SIZE)
            }),
            CommandSpec::new(
                "text_style.increase_font_size",
                "Increase font size",
                |editor, _args| step_font_size(editor, 1),
            ),
            CommandSpec::new(
                "text_style.decrease_font_size",
                "Decrease font size",
                |editor, _args| step_font_size(editor, -1),
            ),
            CommandSpec::new("text_style.set_font_family", "Set font family", |editor, args| {
                let family = unquote_family(super::arg_str(args.as_ref(), "family").unwrap_or(""));
                if family.is_empty() {
                    return unset(editor, FONT_FAMILY);
                }
                if !is_safe_style_value(&family) {
                    tracing::debug!(%family, "ignoring malformed font family");
                    return Ok(());
                }
                set(editor, FONT_FAMILY, Value::String(family))
            })
            .args_example(json!({ "family": "Arial" })),
            CommandSpec::new(
                "text_style.unset_font_family",
                "Unset font family",
                |editor, _args| unset(editor, FONT_FAMILY),
            ),
            CommandSpec::new("text_style.set_color", "Set text color", |editor, args| {
                let color = super::arg_str(args.as_ref(), "color").unwrap_or("").trim();
                if color.is_empty() {
                    return unset(editor, COLOR);
                }
                if !is_safe_style_value(color) {
                    tracing::debug!(color, "ignoring malformed color");
                    return Ok(());
                }
                set(editor, COLOR, Value::String(color.to_string()))
            })
            .args_example(json!({ "color": "#1f2937" })),
            CommandSpec::new("text_style.unset_color", "Unset text color", |editor, _args| {
                unset(editor, COLOR)
            }),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("text_style.get", |editor, _args| {
            let marks = active_marks(editor);
            Ok(json!({
                "font_size": marks.font_size(),
                "font_family": marks.font_family(),
                "color": marks.color(),
            }))
        })]
    }
}

fn font_size_arg(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().filter(|n| (1..=MAX_PX).contains(n)),
        Value::String(s) => parse_px(s),
        _ => None,
    }
}

fn set(editor: &mut Editor, key: &'static str, value: Value) -> Result<(), CommandError> {
    update_marks(editor, &format!("text_style.set_{key}"), move |mut marks| {
        marks.set_text_style_attr(key, Some(value.clone()));
        marks
    })
}

fn unset(editor: &mut Editor, key: &'static str) -> Result<(), CommandError> {
    update_marks(editor, &format!("text_style.unset_{key}"), move |mut marks| {
        marks.set_text_style_attr(key, None);
        marks
    })
}

fn step_font_size(editor: &mut Editor, delta: i64) -> Result<(), CommandError> {
    let config = editor.config();
    let base = active_marks(editor)
        .font_size()
        .unwrap_or(config.default_font_size);
    let next = base
        .saturating_add_signed(delta)
        .max(config.min_font_size)
        .min(MAX_PX);
    set(editor, FONT_SIZE, Value::from(next))
}

/// `'Times New Roman'` → `Times New Roman`. Family lists stay as written.
fn unquote_family(value: &str) -> String {
    let value = value.trim();
    for quote in ['\'', '"'] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
            .filter(|inner| !inner.contains(['\'', '"']))
        {
            return inner.trim().to_string();
        }
    }
    value.to_string()
}

fn quote_family(family: &str) -> String {
    if family.contains(char::is_whitespace) && !family.contains([',', '\'', '"']) {
        format!("'{family}'")
    } else {
        family.to_string()
    }
}
