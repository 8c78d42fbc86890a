//! Block formatting: headings, quotes, code blocks, rules, alignment and
//! clearing.

use serde_json::{json, Value};

use super::text_style::FONT_SIZE;
use super::{
    ancestor_element_path, arg_str, arg_u64, child_path, commit, focus_block, insert_blocks,
    is_point_in_block, point_for_global_offset, point_global_offset, remap_point, rewrite_marks,
    selected_text_blocks, selected_void_path, sibling_block_range, unwrap_element, wrap_siblings,
};
use crate::config::EditorConfig;
use crate::core::{
    apply_op_to, children_ref, element_ref, kind, AttrPatch, Attrs, Document, ElementNode, Marks,
    Node, Point, Selection,
};
use crate::editor::Editor;
use crate::ops::{Op, Path, Transaction};
use crate::plugin::{
    AttributeSpec, ChildConstraint, CommandError, CommandSpec, EditorPlugin, NodeRole, NodeSpec,
    NormalizePass, PluginRegistry, QuerySpec,
};

pub(crate) const TEXT_ALIGN: &str = "text_align";
const ALIGNMENTS: [&str; 4] = ["left", "center", "right", "justify"];

pub(crate) struct HeadingPlugin;

impl EditorPlugin for HeadingPlugin {
    fn id(&self) -> &'static str {
        "heading"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::block(kind::HEADING, ChildConstraint::InlineOnly)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("block.set_paragraph", "Paragraph", |editor, _args| {
                let config = editor.config().clone();
                retype_text_blocks(editor, "block.set_paragraph", |el| to_paragraph(el, &config))
            }),
            CommandSpec::new("block.toggle_heading", "Toggle heading", |editor, args| {
                let level = arg_u64(args.as_ref(), "level")
                    .ok_or_else(|| CommandError::invalid_args("Missing args.level"))?;
                toggle_heading(editor, level)
            })
            .description(
                "Turn the current blocks into headings of the given level, applying the level's \
                 preset font size. Toggling the same level again restores paragraphs; level 0 \
                 always does.",
            )
            .args_example(json!({ "level": 2 })),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("block.heading_level", |editor, _args| {
                Ok(heading_level(editor).map(Value::from).unwrap_or(Value::Null))
            }),
            QuerySpec::new("block.active_type", |editor, _args| {
                Ok(active_block_type(editor)
                    .map(|k| Value::String(k.to_string()))
                    .unwrap_or(Value::Null))
            }),
        ]
    }
}

pub(crate) fn heading_level(editor: &Editor) -> Option<u64> {
    let (_, el) = focus_block(editor)?;
    (el.kind == kind::HEADING)
        .then(|| el.attr_u64("level"))
        .flatten()
}

/// Kind of the block holding the caret, or of the selected block void.
pub(crate) fn active_block_type(editor: &Editor) -> Option<&str> {
    if let Some((_, el)) = focus_block(editor) {
        return Some(el.kind.as_str());
    }
    selected_void_path(editor, kind::IMAGE).map(|_| kind::IMAGE)
}

fn toggle_heading(editor: &mut Editor, level: u64) -> Result<(), CommandError> {
    let config = editor.config().clone();
    if level == 0 || heading_level(editor) == Some(level) {
        return retype_text_blocks(editor, "block.toggle_heading", |el| to_paragraph(el, &config));
    }
    if level > 6 {
        return Err(CommandError::invalid_args(format!(
            "Heading level must be 1..=6, got {level}"
        )));
    }
    retype_text_blocks(editor, "block.toggle_heading", |el| to_heading(el, level, &config))
}

/// Replace each selected text block with `retype(block)`, keeping the
/// selection on the same characters.
fn retype_text_blocks(
    editor: &mut Editor,
    command: &str,
    retype: impl Fn(&ElementNode) -> Option<ElementNode>,
) -> Result<(), CommandError> {
    let sel = editor.selection().clone();
    let blocks = selected_text_blocks(editor, &sel)?;

    let mut ops: Vec<Op> = Vec::new();
    let mut anchor = sel.anchor.clone();
    let mut focus = sel.focus.clone();
    for block in &blocks {
        let Some(new_el) = retype(block.el).filter(|el| el != block.el) else {
            continue;
        };
        for point in [&mut anchor, &mut focus] {
            if is_point_in_block(point, &block.path) {
                let global = point_global_offset(
                    &block.el.children,
                    point.path.last().copied().unwrap_or(0),
                    point.offset,
                );
                *point = point_for_global_offset(&block.path, &new_el.children, global);
            }
        }
        ops.extend(Op::replace_node(&block.path, Node::Element(new_el)));
    }

    commit(
        editor,
        Transaction::new(ops)
            .selection_after(Selection { anchor, focus })
            .source(format!("command:{command}")),
    )
}

fn map_text_marks(children: &[Node], f: impl Fn(&mut Marks)) -> Vec<Node> {
    children
        .iter()
        .map(|node| match node {
            Node::Text(t) => {
                let mut marks = t.marks.clone();
                f(&mut marks);
                Node::text(t.text.clone(), marks)
            }
            other => other.clone(),
        })
        .collect()
}

/// Code text as inline content: newlines become hard breaks.
fn code_text_to_inline(text: &str) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::new();
    for (ix, line) in text.split('\n').enumerate() {
        if ix > 0 {
            out.push(Node::hard_break());
        }
        out.push(Node::text(line, Marks::default()));
    }
    out
}

fn to_paragraph(el: &ElementNode, config: &EditorConfig) -> Option<ElementNode> {
    match el.kind.as_str() {
        kind::HEADING => {
            let preset = el
                .attr_u64("level")
                .and_then(|level| config.heading_font_size(level));
            let mut attrs = el.attrs.clone();
            attrs.remove("level");
            let children = map_text_marks(&el.children, |marks| {
                if preset.is_some() && marks.font_size() == preset {
                    marks.set_text_style_attr(FONT_SIZE, None);
                }
            });
            Some(ElementNode {
                kind: kind::PARAGRAPH.to_string(),
                attrs,
                children,
            })
        }
        kind::CODE_BLOCK => Some(ElementNode {
            kind: kind::PARAGRAPH.to_string(),
            attrs: Attrs::default(),
            children: code_text_to_inline(&el.inline_text()),
        }),
        _ => None,
    }
}

/// Runs with no size, or with the old level's preset, get the new preset.
/// Any other size was chosen by the author and stays.
fn to_heading(el: &ElementNode, level: u64, config: &EditorConfig) -> Option<ElementNode> {
    let (children, mut attrs, old_preset) = match el.kind.as_str() {
        kind::PARAGRAPH => (el.children.clone(), el.attrs.clone(), None),
        kind::HEADING => (
            el.children.clone(),
            el.attrs.clone(),
            el.attr_u64("level")
                .and_then(|level| config.heading_font_size(level)),
        ),
        kind::CODE_BLOCK => (code_text_to_inline(&el.inline_text()), Attrs::default(), None),
        _ => return None,
    };
    attrs.insert("level".to_string(), Value::from(level));

    let preset = config.heading_font_size(level);
    let children = map_text_marks(&children, |marks| {
        let size = marks.font_size();
        if size.is_none() || (old_preset.is_some() && size == old_preset) {
            marks.set_text_style_attr(FONT_SIZE, preset.map(Value::from));
        }
    });
    Some(ElementNode {
        kind: kind::HEADING.to_string(),
        attrs,
        children,
    })
}

fn to_code_block(el: &ElementNode) -> Option<ElementNode> {
    matches!(el.kind.as_str(), kind::PARAGRAPH | kind::HEADING).then(|| ElementNode {
        kind: kind::CODE_BLOCK.to_string(),
        attrs: Attrs::default(),
        children: vec![Node::text(el.inline_text(), Marks::default())],
    })
}

pub(crate) struct CodeBlockPlugin;

impl EditorPlugin for CodeBlockPlugin {
    fn id(&self) -> &'static str {
        "code_block"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::block(kind::CODE_BLOCK, ChildConstraint::InlineOnly)]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(PlainCodeBlocks)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![CommandSpec::new(
            "block.toggle_code_block",
            "Toggle code block",
            |editor, _args| {
                let in_code = active_block_type(editor) == Some(kind::CODE_BLOCK);
                let config = editor.config().clone();
                retype_text_blocks(editor, "block.toggle_code_block", |el| {
                    if in_code {
                        (el.kind == kind::CODE_BLOCK)
                            .then(|| to_paragraph(el, &config))
                            .flatten()
                    } else {
                        to_code_block(el)
                    }
                })
            },
        )]
    }
}

/// Code blocks hold unmarked text; hard breaks inside them become newlines.
struct PlainCodeBlocks;

impl NormalizePass for PlainCodeBlocks {
    fn id(&self) -> &'static str {
        "code_block.plain_text"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        fn walk(nodes: &[Node], path: &mut Vec<usize>, ops: &mut Vec<Op>) {
            for (ix, node) in nodes.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                if el.kind == kind::CODE_BLOCK {
                    for (child_ix, child) in el.children.iter().enumerate().rev() {
                        let child_path = {
                            let mut p = path.clone();
                            p.push(child_ix);
                            p
                        };
                        match child {
                            Node::Text(t) if !t.marks.is_empty() => ops.push(Op::SetTextMarks {
                                path: child_path,
                                marks: Marks::default(),
                            }),
                            Node::Void(_) => ops.extend(Op::replace_node(
                                &child_path,
                                Node::text("\n", Marks::default()),
                            )),
                            _ => {}
                        }
                    }
                } else {
                    walk(&el.children, path, ops);
                }
                path.pop();
            }
        }

        let mut ops = Vec::new();
        walk(&doc.children, &mut Vec::new(), &mut ops);
        ops
    }
}

pub(crate) struct BlockquotePlugin;

impl EditorPlugin for BlockquotePlugin {
    fn id(&self) -> &'static str {
        "blockquote"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::block(kind::BLOCKQUOTE, ChildConstraint::BlockOnly)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![CommandSpec::new(
            "block.toggle_blockquote",
            "Toggle blockquote",
            |editor, _args| {
                let (ops, selection) = match blockquote_path(editor) {
                    Some(path) => unwrap_element(editor, &path),
                    None => {
                        let sel = editor.selection().clone();
                        let (parent, first, last) = sibling_block_range(editor, &sel)
                            .ok_or_else(|| CommandError::inapplicable("Nothing to quote"))?;
                        wrap_siblings(
                            editor,
                            &parent,
                            (first, last),
                            kind::BLOCKQUOTE,
                            Attrs::default(),
                            None,
                        )
                    }
                }
                .ok_or_else(|| CommandError::inapplicable("Selection cannot be quoted"))?;

                commit(
                    editor,
                    Transaction::new(ops)
                        .selection_after(selection)
                        .source("command:block.toggle_blockquote"),
                )
            },
        )]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("block.in_blockquote", |editor, _args| {
            Ok(Value::Bool(blockquote_path(editor).is_some()))
        })]
    }
}

pub(crate) fn blockquote_path(editor: &Editor) -> Option<Path> {
    ancestor_element_path(
        editor.doc(),
        &editor.selection().focus.path,
        &[kind::BLOCKQUOTE],
    )
}

pub(crate) struct HorizontalRulePlugin;

impl EditorPlugin for HorizontalRulePlugin {
    fn id(&self) -> &'static str {
        "horizontal_rule"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::void(kind::HORIZONTAL_RULE, NodeRole::Block)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![CommandSpec::new(
            "block.insert_horizontal_rule",
            "Insert horizontal rule",
            |editor, _args| {
                let (ops, rule_path) = insert_blocks(editor, vec![Node::horizontal_rule()])?;
                let mut caret = rule_path.clone();
                if let Some(last) = caret.last_mut() {
                    *last += 1;
                }
                caret.push(0);
                commit(
                    editor,
                    Transaction::new(ops)
                        .selection_after(Selection::collapsed(Point::new(caret, 0)))
                        .source("command:block.insert_horizontal_rule"),
                )
            },
        )]
    }
}

pub(crate) struct AlignPlugin;

impl EditorPlugin for AlignPlugin {
    fn id(&self) -> &'static str {
        "align"
    }

    fn attributes(&self) -> Vec<AttributeSpec> {
        vec![AttributeSpec::new(
            &[kind::PARAGRAPH, kind::HEADING],
            TEXT_ALIGN,
            |el| {
                let align = el.style("text-align")?.trim().to_ascii_lowercase();
                (ALIGNMENTS.contains(&align.as_str()) && align != "left")
                    .then_some(Value::String(align))
            },
            |value, out| {
                if let Some(align) = value.as_str().filter(|a| ALIGNMENTS.contains(a)) {
                    out.style("text-align", align);
                }
            },
        )]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("block.set_align", "Align text", |editor, args| {
                let align = arg_str(args.as_ref(), "align")
                    .ok_or_else(|| CommandError::invalid_args("Missing args.align"))?;
                if !ALIGNMENTS.contains(&align) {
                    return Err(CommandError::invalid_args(format!("Unknown alignment: {align}")));
                }
                set_align(editor, align)
            })
            .args_example(json!({ "align": "center" })),
            CommandSpec::new("block.unset_align", "Reset alignment", |editor, _args| {
                set_align(editor, "left")
            }),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("block.align", |editor, _args| {
                Ok(Value::String(active_align(editor).to_string()))
            }),
            QuerySpec::new("block.can_align", |editor, _args| {
                Ok(Value::Bool(can_align(editor)))
            }),
        ]
    }
}

/// Alignment applies to paragraphs and headings outside table cells.
pub(crate) fn can_align(editor: &Editor) -> bool {
    let Some((path, el)) = focus_block(editor) else {
        return false;
    };
    matches!(el.kind.as_str(), kind::PARAGRAPH | kind::HEADING)
        && ancestor_element_path(editor.doc(), &path, &[kind::TABLE_CELL, kind::TABLE_HEADER])
            .is_none()
}

pub(crate) fn active_align(editor: &Editor) -> &str {
    focus_block(editor)
        .and_then(|(_, el)| el.attr_str(TEXT_ALIGN))
        .unwrap_or("left")
}

fn set_align(editor: &mut Editor, align: &str) -> Result<(), CommandError> {
    if !can_align(editor) {
        return Err(CommandError::inapplicable(
            "Alignment applies to paragraphs and headings only",
        ));
    }
    let sel = editor.selection().clone();
    let ops: Vec<Op> = selected_text_blocks(editor, &sel)?
        .into_iter()
        .filter(|block| matches!(block.el.kind.as_str(), kind::PARAGRAPH | kind::HEADING))
        .filter(|block| block.el.attr_str(TEXT_ALIGN).unwrap_or("left") != align)
        .map(|block| Op::SetNodeAttrs {
            path: block.path,
            patch: if align == "left" {
                AttrPatch::remove([TEXT_ALIGN])
            } else {
                AttrPatch::set(TEXT_ALIGN, Value::String(align.to_string()))
            },
        })
        .collect();
    commit(
        editor,
        Transaction::new(ops).source("command:block.set_align"),
    )
}

pub(crate) struct ClearFormattingPlugin;

impl EditorPlugin for ClearFormattingPlugin {
    fn id(&self) -> &'static str {
        "format.clear"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![CommandSpec::new("format.clear", "Clear formatting", |editor, _args| {
            clear_formatting(editor)
        })
        .description(
            "Remove every mark in the selection and turn the selected blocks into plain \
             paragraphs, lifting them out of lists and quotes.",
        )]
    }
}

/// Where a block ended up after flattening.
struct Moved {
    old_path: Path,
    new_ix: usize,
    text_block: bool,
}

fn clear_formatting(editor: &mut Editor) -> Result<(), CommandError> {
    let sel = editor.selection().clone();
    let tracked = vec![sel.anchor.clone(), sel.focus.clone()];
    let (mark_ops, tracked) = if sel.is_collapsed() {
        (Vec::new(), tracked)
    } else {
        rewrite_marks(editor, &sel, &|_| Marks::default(), tracked)?
    };

    let mut scratch = editor.doc().clone();
    let mut probe = sel.clone();
    for op in mark_ops.clone() {
        apply_op_to(&mut scratch, &mut probe, op)?;
    }

    let (anchor, focus) = (&tracked[0], &tracked[1]);
    let scope = ancestor_element_path(&scratch, &focus.path, &[kind::TABLE_CELL, kind::TABLE_HEADER])
        .unwrap_or_default();
    let depth = scope.len();
    let focus_ix = focus.path.get(depth).copied();
    let anchor_ix = anchor
        .path
        .strip_prefix(scope.as_slice())
        .and_then(|rest| rest.first().copied())
        .or(focus_ix);
    let (Some(a), Some(f)) = (anchor_ix, focus_ix) else {
        return commit(editor, Transaction::new(mark_ops).source("command:format.clear"));
    };
    let (first, last) = (a.min(f), a.max(f));

    let siblings = match children_ref(&scratch, &scope) {
        Some(children) => children,
        None => return Err(CommandError::inapplicable("Selection is not in a container")),
    };
    let mut flat: Vec<Node> = Vec::new();
    let mut moved: Vec<Moved> = Vec::new();
    for ix in first..=last.min(siblings.len().saturating_sub(1)) {
        flatten(
            &siblings[ix],
            child_path(&scope, ix),
            editor.registry(),
            &mut flat,
            &mut moved,
        );
    }

    let mut ops = mark_ops;
    let unchanged = siblings.get(first..=last).is_some_and(|old| old == flat.as_slice());
    let mut points = tracked.clone();
    if !unchanged {
        for ix in (first..=last).rev() {
            ops.push(Op::RemoveNode {
                path: child_path(&scope, ix),
            });
        }
        for (k, node) in flat.iter().cloned().enumerate() {
            ops.push(Op::InsertNode {
                path: child_path(&scope, first + k),
                node,
            });
        }
        for point in points.iter_mut() {
            if let Some(mapped) = map_flattened(&scratch, point, &moved, &flat, &scope, first) {
                *point = mapped;
            }
        }
    }

    if ops.is_empty() {
        // Nothing structural to clear at a caret: the next typed text is plain.
        editor.set_stored_marks(Some(Marks::default()));
        return Ok(());
    }
    let focus = points.pop().unwrap_or_else(|| sel.focus.clone());
    let anchor = points.pop().unwrap_or_else(|| sel.anchor.clone());
    commit(
        editor,
        Transaction::new(ops)
            .selection_after(Selection { anchor, focus })
            .source("command:format.clear"),
    )
}

fn flatten(
    node: &Node,
    path: Path,
    registry: &PluginRegistry,
    out: &mut Vec<Node>,
    moved: &mut Vec<Moved>,
) {
    match node {
        Node::Element(el) if registry.is_text_block(el) => {
            let children = if el.kind == kind::CODE_BLOCK {
                code_text_to_inline(&el.inline_text())
            } else {
                el.children.clone()
            };
            moved.push(Moved {
                old_path: path,
                new_ix: out.len(),
                text_block: true,
            });
            out.push(Node::element(kind::PARAGRAPH, Attrs::default(), children));
        }
        Node::Element(el)
            if matches!(
                el.kind.as_str(),
                kind::BLOCKQUOTE | kind::BULLET_LIST | kind::ORDERED_LIST | kind::LIST_ITEM
            ) =>
        {
            for (ix, child) in el.children.iter().enumerate() {
                flatten(child, child_path(&path, ix), registry, out, moved);
            }
        }
        other => {
            moved.push(Moved {
                old_path: path,
                new_ix: out.len(),
                text_block: false,
            });
            out.push(other.clone());
        }
    }
}

fn map_flattened(
    scratch: &Document,
    point: &Point,
    moved: &[Moved],
    flat: &[Node],
    scope: &[usize],
    first: usize,
) -> Option<Point> {
    let entry = moved.iter().find(|m| point.path.starts_with(&m.old_path))?;
    let new_path = child_path(scope, first + entry.new_ix);
    if !entry.text_block {
        return remap_point(point, &entry.old_path, &new_path);
    }
    let old_children = &element_ref(scratch, &entry.old_path)?.children;
    let Some(Node::Element(new_el)) = flat.get(entry.new_ix) else {
        return None;
    };
    let global = point_global_offset(
        old_children,
        point.path.last().copied().unwrap_or(0),
        point.offset,
    );
    Some(point_for_global_offset(&new_path, &new_el.children, global))
}
