use serde_json::{json, Value};

use super::{arg_str, arg_value, commit, insert_blocks, selected_void_path};
use crate::core::{kind, node_ref, AttrPatch, Node, Selection};
use crate::editor::Editor;
use crate::ops::{Op, Path, Transaction};
use crate::plugin::{
    AttributeSpec, CommandError, CommandSpec, EditorPlugin, NodeRole, NodeSpec, QuerySpec,
};
use crate::schema::{
    html_attribute, is_safe_style_value, is_safe_url, style_attribute, url_attribute,
};

pub(crate) const SELECT_IMAGE_FIRST: &str = "Lütfen önce bir resim seçin";

const DIMENSIONS: [(&str, &str); 2] = [("width", "width"), ("height", "height")];
const BORDER: [(&str, &str); 4] = [
    ("color", "border_color"),
    ("width", "border_width"),
    ("style", "border_style"),
    ("radius", "border_radius"),
];

pub(crate) struct ImagePlugin;

impl EditorPlugin for ImagePlugin {
    fn id(&self) -> &'static str {
        "image"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::void(kind::IMAGE, NodeRole::Block)]
    }

    fn attributes(&self) -> Vec<AttributeSpec> {
        let on = &[kind::IMAGE];
        vec![
            url_attribute(on, "src", "src"),
            html_attribute(on, "alt", "alt"),
            html_attribute(on, "title", "title"),
            html_attribute(on, "width", "width"),
            html_attribute(on, "height", "height"),
            style_attribute(on, "border_color", "border-color"),
            style_attribute(on, "border_width", "border-width"),
            style_attribute(on, "border_style", "border-style"),
            style_attribute(on, "border_radius", "border-radius"),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("image.insert", "Insert image", |editor, args| {
                let image = image_node(args.as_ref())?;
                insert_images(editor, vec![image], "command:image.insert")
            })
            .description("Insert an image by URL or data URL after the caret's block.")
            .args_example(json!({ "src": "https://example.com/a.png", "alt": "" })),
            CommandSpec::new("image.insert_many", "Insert images", |editor, args| {
                let Some(Value::Array(items)) = arg_value(args.as_ref(), "images") else {
                    return Err(CommandError::invalid_args("Missing args.images"));
                };
                let images = items
                    .iter()
                    .map(|item| match item {
                        Value::String(src) => image_node(Some(&json!({ "src": src }))),
                        other => image_node(Some(other)),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if images.is_empty() {
                    return Ok(());
                }
                insert_images(editor, images, "command:image.insert_many")
            })
            .description("Insert several images in order, e.g. files dropped together.")
            .args_example(json!({ "images": [{ "src": "data:image/png;base64,..." }] })),
            CommandSpec::new("image.set_dimensions", "Set image size", |editor, args| {
                let patch = patch_from_args(args.as_ref(), &DIMENSIONS, is_safe_dimension)?;
                patch_selected_image(editor, patch, "command:image.set_dimensions")
            })
            .description("Width and height are free-form, e.g. 320px or 50%. An empty value unsets it.")
            .args_example(json!({ "width": "50%", "height": "" })),
            CommandSpec::new("image.set_border", "Set image border", |editor, args| {
                let patch = patch_from_args(args.as_ref(), &BORDER, is_safe_style_value)?;
                patch_selected_image(editor, patch, "command:image.set_border")
            })
            .args_example(json!({ "color": "#000000", "width": "2px", "style": "solid", "radius": "8px" })),
            CommandSpec::new("image.clear_border", "Clear image border", |editor, _args| {
                let patch = AttrPatch::remove(BORDER.map(|(_, key)| key));
                patch_selected_image(editor, patch, "command:image.clear_border")
            }),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("image.selected", |editor, _args| {
                Ok(Value::Bool(selected_void_path(editor, kind::IMAGE).is_some()))
            }),
            QuerySpec::new("image.attrs", |editor, _args| {
                let attrs = selected_void_path(editor, kind::IMAGE)
                    .and_then(|path| node_ref(editor.doc(), &path))
                    .and_then(Node::attrs)
                    .map(|attrs| Value::Object(attrs.clone().into_iter().collect()));
                Ok(attrs.unwrap_or(Value::Null))
            }),
        ]
    }
}

fn is_safe_dimension(value: &str) -> bool {
    !value.contains(['"', '<', '>'])
}

fn image_node(args: Option<&Value>) -> Result<Node, CommandError> {
    let src = arg_str(args, "src").unwrap_or("").trim();
    if src.is_empty() {
        return Err(CommandError::invalid_args("Missing args.src"));
    }
    if !is_safe_url(src) {
        return Err(CommandError::invalid_args(format!("Refusing image source {src:?}")));
    }
    let alt = arg_str(args, "alt").map(|alt| alt.trim().to_string());
    let mut node = Node::image(src, alt);
    if let (Node::Void(image), Some(title)) = (&mut node, arg_str(args, "title")) {
        if !title.trim().is_empty() {
            image
                .attrs
                .insert("title".to_string(), Value::String(title.trim().to_string()));
        }
    }
    Ok(node)
}

fn insert_images(
    editor: &mut Editor,
    images: Vec<Node>,
    source: &'static str,
) -> Result<(), CommandError> {
    let count = images.len();
    let (ops, first): (Vec<Op>, Path) = insert_blocks(editor, images)?;
    let mut last = first;
    if let Some(ix) = last.last_mut() {
        *ix += count - 1;
    }
    commit(
        editor,
        Transaction::new(ops)
            .selection_after(Selection::node(last))
            .source(source),
    )
}

/// Build a patch from `(arg, attr)` pairs: absent args are left alone, empty
/// ones remove the attribute.
fn patch_from_args(
    args: Option<&Value>,
    fields: &[(&str, &str)],
    is_valid: fn(&str) -> bool,
) -> Result<AttrPatch, CommandError> {
    let mut patch = AttrPatch::default();
    for (arg, key) in fields {
        let value = match arg_value(args, arg) {
            None => continue,
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => {
                return Err(CommandError::invalid_args(format!(
                    "args.{arg} must be a string, got {other}"
                )));
            }
        };
        if value.is_empty() {
            patch.remove.push(key.to_string());
        } else if is_valid(&value) {
            patch.set.insert(key.to_string(), Value::String(value));
        } else {
            return Err(CommandError::invalid_args(format!("Invalid {arg}: {value:?}")));
        }
    }
    Ok(patch)
}

fn patch_selected_image(
    editor: &mut Editor,
    patch: AttrPatch,
    source: &'static str,
) -> Result<(), CommandError> {
    let Some(path) = selected_void_path(editor, kind::IMAGE) else {
        editor.notify(SELECT_IMAGE_FIRST);
        return Err(CommandError::inapplicable("No image is selected"));
    };
    if patch.is_empty() {
        return Ok(());
    }
    commit(
        editor,
        Transaction::new(vec![Op::SetNodeAttrs { path, patch }]).source(source),
    )
}
