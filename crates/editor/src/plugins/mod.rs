//! Built-in plugins and the selection helpers they share.

pub(crate) mod blocks;
pub(crate) mod image;
pub(crate) mod list;
pub(crate) mod marks;
pub(crate) mod table;
pub(crate) mod text_style;
pub(crate) mod typing;

use serde_json::Value;

use crate::core::{
    children_ref, clamp_to_char_boundary, element_ref, kind, node_ref, Attrs, Document,
    ElementNode, Marks, Node, Point, Selection, TextNode,
};
use crate::editor::Editor;
use crate::ops::{Op, Path, Transaction};
use crate::plugin::{
    CommandError, CommandSpec, CoreNormalizePlugin, CoreSchemaPlugin, EditorPlugin,
    PluginRegistry, QuerySpec,
};

pub(crate) fn core_plugins() -> Vec<Box<dyn EditorPlugin>> {
    vec![
        Box::new(CoreSchemaPlugin),
        Box::new(CoreNormalizePlugin),
        Box::new(DocumentPlugin),
        Box::new(HistoryPlugin),
        Box::new(typing::TypingPlugin),
    ]
}

pub(crate) fn richtext_plugins() -> Vec<Box<dyn EditorPlugin>> {
    let mut plugins = core_plugins();
    plugins.extend([
        Box::new(marks::MarksPlugin) as Box<dyn EditorPlugin>,
        Box::new(text_style::TextStylePlugin),
        Box::new(blocks::HeadingPlugin),
        Box::new(blocks::BlockquotePlugin),
        Box::new(blocks::CodeBlockPlugin),
        Box::new(blocks::HorizontalRulePlugin),
        Box::new(blocks::AlignPlugin),
        Box::new(blocks::ClearFormattingPlugin),
        Box::new(list::ListPlugin),
        Box::new(table::TablePlugin),
        Box::new(image::ImagePlugin),
    ]);
    plugins
}

struct DocumentPlugin;

impl EditorPlugin for DocumentPlugin {
    fn id(&self) -> &'static str {
        "core.document"
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("doc.character_count", |editor, _args| {
                Ok(Value::from(editor.character_count()))
            }),
            QuerySpec::new("doc.is_empty", |editor, _args| {
                Ok(Value::Bool(editor.is_empty()))
            }),
        ]
    }
}

struct HistoryPlugin;

impl EditorPlugin for HistoryPlugin {
    fn id(&self) -> &'static str {
        "core.history"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("history.undo", "Undo", |editor, _args| {
                if editor.undo() {
                    Ok(())
                } else {
                    Err(CommandError::inapplicable("Nothing to undo"))
                }
            }),
            CommandSpec::new("history.redo", "Redo", |editor, _args| {
                if editor.redo() {
                    Ok(())
                } else {
                    Err(CommandError::inapplicable("Nothing to redo"))
                }
            }),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("history.can_undo", |editor, _args| Ok(Value::Bool(editor.can_undo()))),
            QuerySpec::new("history.can_redo", |editor, _args| Ok(Value::Bool(editor.can_redo()))),
        ]
    }
}

pub(crate) fn arg_value<'a>(args: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    args.and_then(|v| v.get(key)).filter(|v| !v.is_null())
}

pub(crate) fn arg_str<'a>(args: Option<&'a Value>, key: &str) -> Option<&'a str> {
    arg_value(args, key).and_then(|v| v.as_str())
}

/// Integer argument given either as a JSON number or a numeric string.
pub(crate) fn arg_u64(args: Option<&Value>, key: &str) -> Option<u64> {
    match arg_value(args, key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn arg_bool(args: Option<&Value>, key: &str) -> Option<bool> {
    arg_value(args, key).and_then(|v| v.as_bool())
}

pub(crate) fn commit(editor: &mut Editor, tx: Transaction) -> Result<(), CommandError> {
    if tx.is_empty() && tx.selection_after.is_none() {
        return Ok(());
    }
    editor.apply(tx).map_err(CommandError::from)
}

pub(crate) fn ancestor_element_path(doc: &Document, path: &[usize], kinds: &[&str]) -> Option<Path> {
    (1..=path.len()).rev().find_map(|len| {
        let candidate = &path[..len];
        match node_ref(doc, candidate) {
            Some(Node::Element(el)) if kinds.contains(&el.kind.as_str()) => Some(candidate.to_vec()),
            _ => None,
        }
    })
}

/// Path of the text block holding `point`, if any.
pub(crate) fn text_block_path(editor: &Editor, point: &Point) -> Option<Path> {
    let (_, block_path) = point.path.split_last()?;
    let el = element_ref(editor.doc(), block_path)?;
    editor
        .registry()
        .is_text_block(el)
        .then(|| block_path.to_vec())
}

pub(crate) fn focus_block(editor: &Editor) -> Option<(Path, &ElementNode)> {
    let path = text_block_path(editor, &editor.selection().focus)?;
    let el = element_ref(editor.doc(), &path)?;
    Some((path, el))
}

/// Path of a selected block void (an image), when the selection is a node selection.
pub(crate) fn selected_void_path(editor: &Editor, void_kind: &str) -> Option<Path> {
    let sel = editor.selection();
    if !sel.is_collapsed() {
        return None;
    }
    match node_ref(editor.doc(), &sel.focus.path) {
        Some(Node::Void(v)) if v.kind == void_kind => Some(sel.focus.path.clone()),
        _ => None,
    }
}

/// A node selection on a block void such as an image or a rule.
pub(crate) fn block_void_selected(editor: &Editor) -> bool {
    let sel = editor.selection();
    sel.is_collapsed()
        && matches!(node_ref(editor.doc(), &sel.focus.path), Some(Node::Void(_)))
        && text_block_path(editor, &sel.focus).is_none()
}

pub(crate) fn ordered_selection_points(sel: &Selection) -> (Point, Point) {
    let mut start = sel.anchor.clone();
    let mut end = sel.focus.clone();

    if start.path == end.path {
        if end.offset < start.offset {
            std::mem::swap(&mut start, &mut end);
        }
        return (start, end);
    }
    if end.path < start.path {
        std::mem::swap(&mut start, &mut end);
    }
    (start, end)
}

pub(crate) fn is_point_in_block(point: &Point, block_path: &[usize]) -> bool {
    point.path.len() == block_path.len() + 1 && point.path.starts_with(block_path)
}

pub(crate) struct TextBlock<'a> {
    pub path: Path,
    pub el: &'a ElementNode,
}

pub(crate) fn text_blocks_in_order<'a>(
    doc: &'a Document,
    registry: &PluginRegistry,
) -> Vec<TextBlock<'a>> {
    fn walk<'a>(
        nodes: &'a [Node],
        path: &mut Vec<usize>,
        registry: &PluginRegistry,
        out: &mut Vec<TextBlock<'a>>,
    ) {
        for (ix, node) in nodes.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };

            path.push(ix);
            if registry.is_text_block(el) {
                out.push(TextBlock {
                    path: path.clone(),
                    el,
                });
            } else {
                walk(&el.children, path, registry, out);
            }
            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(&doc.children, &mut Vec::new(), registry, &mut out);
    out
}

/// Text blocks between the selection ends, inclusive, in document order.
pub(crate) fn selected_text_blocks<'a>(
    editor: &'a Editor,
    sel: &Selection,
) -> Result<Vec<TextBlock<'a>>, CommandError> {
    let (start, end) = ordered_selection_points(sel);
    let start_block_path = start.path.split_last().map(|(_, p)| p.to_vec());
    let end_block_path = end.path.split_last().map(|(_, p)| p.to_vec());

    let mut blocks = text_blocks_in_order(editor.doc(), editor.registry());
    let start_index = blocks
        .iter()
        .position(|b| Some(&b.path) == start_block_path.as_ref())
        .ok_or_else(|| CommandError::inapplicable("Selection start is not in a text block"))?;
    let end_index = blocks
        .iter()
        .position(|b| Some(&b.path) == end_block_path.as_ref())
        .ok_or_else(|| CommandError::inapplicable("Selection end is not in a text block"))?;
    let (start_index, end_index) = if start_index <= end_index {
        (start_index, end_index)
    } else {
        (end_index, start_index)
    };

    blocks.truncate(end_index + 1);
    Ok(blocks.split_off(start_index))
}

pub(crate) fn total_inline_text_len(children: &[Node]) -> usize {
    children
        .iter()
        .map(|n| match n {
            Node::Text(t) => t.text.len(),
            Node::Void(v) => v.inline_text_len(),
            Node::Element(_) => 0,
        })
        .sum()
}

pub(crate) fn point_global_offset(children: &[Node], child_ix: usize, offset: usize) -> usize {
    let mut global = 0usize;
    for (ix, node) in children.iter().enumerate() {
        let len = match node {
            Node::Text(t) => t.text.len(),
            Node::Void(v) => v.inline_text_len(),
            Node::Element(_) => continue,
        };
        if ix < child_ix {
            global += len;
            continue;
        }
        if ix == child_ix {
            global += match node {
                Node::Text(t) => clamp_to_char_boundary(&t.text, offset),
                _ => offset.min(len),
            };
        }
        break;
    }
    global
}

pub(crate) fn point_for_global_offset(
    block_path: &[usize],
    children: &[Node],
    global_offset: usize,
) -> Point {
    let at = |child_ix: usize, offset: usize| {
        let mut path = block_path.to_vec();
        path.push(child_ix);
        Point::new(path, offset)
    };

    let mut remaining = global_offset;
    for (child_ix, node) in children.iter().enumerate() {
        match node {
            Node::Text(t) => {
                if remaining < t.text.len() {
                    return at(child_ix, clamp_to_char_boundary(&t.text, remaining));
                }
                if remaining == t.text.len() {
                    if matches!(children.get(child_ix + 1), Some(Node::Text(_))) {
                        return at(child_ix + 1, 0);
                    }
                    return at(child_ix, t.text.len());
                }
                remaining -= t.text.len();
            }
            Node::Void(v) => {
                let len = v.inline_text_len();
                if remaining < len {
                    // Inside a void: land right after it.
                    if let Some(ix) = (child_ix + 1..children.len())
                        .find(|ix| matches!(children[*ix], Node::Text(_)))
                    {
                        return at(ix, 0);
                    }
                    break;
                }
                remaining -= len;
            }
            Node::Element(_) => {}
        }
    }

    // Fallback to end of last text node.
    for (child_ix, node) in children.iter().enumerate().rev() {
        if let Node::Text(t) = node {
            return at(child_ix, t.text.len());
        }
    }
    at(0, 0)
}

pub(crate) fn apply_marks_in_block(
    children: &[Node],
    start_global: usize,
    end_global: usize,
    apply: &dyn Fn(Marks) -> Marks,
) -> Vec<Node> {
    if start_global >= end_global {
        return children.to_vec();
    }

    let mut out: Vec<Node> = Vec::new();
    let mut cursor = 0usize;

    for node in children {
        let Node::Text(t) = node else {
            if let Node::Void(v) = node {
                cursor += v.inline_text_len();
            }
            out.push(node.clone());
            continue;
        };

        let node_start = cursor;
        let node_end = cursor + t.text.len();
        cursor = node_end;

        if end_global <= node_start || start_global >= node_end {
            out.push(node.clone());
            continue;
        }

        let sel_start = clamp_to_char_boundary(&t.text, start_global.saturating_sub(node_start));
        let sel_end = clamp_to_char_boundary(&t.text, end_global.saturating_sub(node_start));

        if sel_start == 0 && sel_end == t.text.len() {
            out.push(Node::Text(TextNode {
                text: t.text.clone(),
                marks: apply(t.marks.clone()),
            }));
            continue;
        }

        let pieces = [
            (&t.text[..sel_start], t.marks.clone()),
            (&t.text[sel_start..sel_end], apply(t.marks.clone())),
            (&t.text[sel_end..], t.marks.clone()),
        ];
        for (text, marks) in pieces {
            if !text.is_empty() {
                out.push(Node::text(text, marks));
            }
        }
    }

    if out.is_empty() {
        out.push(Node::text("", Marks::default()));
    }
    out
}

/// Rewrite the marks of every run in a range selection, splitting runs at the
/// selection edges.
pub(crate) fn apply_mark_range(
    editor: &Editor,
    sel: &Selection,
    apply: &dyn Fn(Marks) -> Marks,
) -> Result<(Vec<Op>, Selection), CommandError> {
    let (ops, mut points) =
        rewrite_marks(editor, sel, apply, vec![sel.anchor.clone(), sel.focus.clone()])?;
    let focus = points.pop().unwrap_or_else(|| sel.focus.clone());
    let anchor = points.pop().unwrap_or_else(|| sel.anchor.clone());
    Ok((ops, Selection { anchor, focus }))
}

/// Like [`apply_mark_range`], mapping arbitrary `tracked` points through the
/// split runs.
pub(crate) fn rewrite_marks(
    editor: &Editor,
    sel: &Selection,
    apply: &dyn Fn(Marks) -> Marks,
    mut tracked: Vec<Point>,
) -> Result<(Vec<Op>, Vec<Point>), CommandError> {
    let (start, end) = ordered_selection_points(sel);
    let blocks = selected_text_blocks(editor, sel)?;
    let last = blocks.len().saturating_sub(1);

    let start_inline_ix = start.path.last().copied().unwrap_or(0);
    let end_inline_ix = end.path.last().copied().unwrap_or(0);

    let mut ops: Vec<Op> = Vec::new();

    for (block_index, block) in blocks.iter().enumerate() {
        let children = block.el.children.as_slice();
        let total_len = total_inline_text_len(children);
        if total_len == 0 {
            continue;
        }

        let start_global = if block_index == 0 {
            point_global_offset(children, start_inline_ix, start.offset)
        } else {
            0
        };
        let end_global = if block_index == last {
            point_global_offset(children, end_inline_ix, end.offset)
        } else {
            total_len
        };
        if start_global >= end_global {
            continue;
        }

        let new_children = apply_marks_in_block(children, start_global, end_global, apply);
        if new_children == children {
            continue;
        }

        for child_ix in (0..children.len()).rev() {
            let mut remove_path = block.path.clone();
            remove_path.push(child_ix);
            ops.push(Op::RemoveNode { path: remove_path });
        }
        for (child_ix, node) in new_children.iter().cloned().enumerate() {
            let mut insert_path = block.path.clone();
            insert_path.push(child_ix);
            ops.push(Op::InsertNode {
                path: insert_path,
                node,
            });
        }

        for point in tracked.iter_mut() {
            if is_point_in_block(point, &block.path) {
                let global = point_global_offset(
                    children,
                    point.path.last().copied().unwrap_or(0),
                    point.offset,
                );
                *point = point_for_global_offset(&block.path, &new_children, global);
            }
        }
    }

    Ok((ops, tracked))
}

/// Non-empty text runs covered by a range selection.
pub(crate) fn selected_text_runs<'a>(
    editor: &'a Editor,
    sel: &Selection,
) -> Result<Vec<&'a TextNode>, CommandError> {
    let (start, end) = ordered_selection_points(sel);
    let blocks = selected_text_blocks(editor, sel)?;
    let last = blocks.len().saturating_sub(1);
    let start_inline_ix = start.path.last().copied().unwrap_or(0);
    let end_inline_ix = end.path.last().copied().unwrap_or(0);

    let mut runs: Vec<&'a TextNode> = Vec::new();
    for (block_index, block) in blocks.iter().enumerate() {
        let children = block.el.children.as_slice();
        let start_global = if block_index == 0 {
            point_global_offset(children, start_inline_ix, start.offset)
        } else {
            0
        };
        let end_global = if block_index == last {
            point_global_offset(children, end_inline_ix, end.offset)
        } else {
            total_inline_text_len(children)
        };

        let mut cursor = 0usize;
        for node in children {
            let (node_start, node_end) = match node {
                Node::Text(t) => (cursor, cursor + t.text.len()),
                Node::Void(v) => (cursor, cursor + v.inline_text_len()),
                Node::Element(_) => continue,
            };
            cursor = node_end;
            if end_global <= node_start || start_global >= node_end {
                continue;
            }
            if let Node::Text(t) = node {
                if !t.text.is_empty() {
                    runs.push(t);
                }
            }
        }
    }
    Ok(runs)
}

/// Marks of the text right before the caret, or after it at a run start.
pub(crate) fn caret_marks(editor: &Editor) -> Marks {
    let focus = &editor.selection().focus;
    let Some((&child_ix, block_path)) = focus.path.split_last() else {
        return Marks::default();
    };
    let Some(siblings) = children_ref(editor.doc(), block_path) else {
        return Marks::default();
    };
    if focus.offset == 0 {
        if let Some(Node::Text(prev)) = child_ix.checked_sub(1).and_then(|ix| siblings.get(ix)) {
            return prev.marks.clone();
        }
    }
    match siblings.get(child_ix) {
        Some(Node::Text(t)) => t.marks.clone(),
        _ => Marks::default(),
    }
}

/// Keep only what `a` and `b` agree on.
fn intersect_marks(a: &mut Marks, b: &Marks) {
    a.bold &= b.bold;
    a.italic &= b.italic;
    a.underline &= b.underline;
    a.strike &= b.strike;
    a.code &= b.code;
    a.subscript &= b.subscript;
    a.superscript &= b.superscript;
    if a.link != b.link {
        a.link = None;
    }
    if a.highlight != b.highlight {
        a.highlight = None;
    }
    a.text_style.retain(|key, value| b.text_style.get(key) == Some(value));
}

/// Marks in effect for the current selection: stored marks, the caret's
/// marks, or what every selected run has in common.
pub(crate) fn active_marks(editor: &Editor) -> Marks {
    if let Some(stored) = editor.stored_marks() {
        return stored.clone();
    }
    let sel = editor.selection();
    if !sel.is_collapsed() {
        if let Ok(runs) = selected_text_runs(editor, sel) {
            if let Some((first, rest)) = runs.split_first() {
                let mut marks = first.marks.clone();
                for run in rest {
                    intersect_marks(&mut marks, &run.marks);
                }
                return marks;
            }
        }
    }
    caret_marks(editor)
}

/// Change marks on the selection. A caret only changes the stored marks for
/// the next typed text.
pub(crate) fn update_marks(
    editor: &mut Editor,
    command: &str,
    apply: impl Fn(Marks) -> Marks,
) -> Result<(), CommandError> {
    let sel = editor.selection().clone();
    if sel.is_collapsed() {
        if text_block_path(editor, &sel.focus).is_none() {
            return Err(CommandError::inapplicable("Selection is not in text"));
        }
        let marks = apply(active_marks(editor));
        editor.set_stored_marks(Some(marks));
        return Ok(());
    }

    let (ops, selection_after) = apply_mark_range(editor, &sel, &apply)?;
    commit(
        editor,
        Transaction::new(ops)
            .selection_after(selection_after)
            .source(format!("command:{command}")),
    )
}

/// Insert block nodes at the caret: in place of an empty paragraph, or right
/// after the caret's block. A trailing paragraph keeps the caret reachable
/// when the new blocks end their container. Returns the path of the first
/// inserted block.
pub(crate) fn insert_blocks(
    editor: &Editor,
    nodes: Vec<Node>,
) -> Result<(Vec<Op>, Path), CommandError> {
    let focus = &editor.selection().focus;
    let anchor_block = match node_ref(editor.doc(), &focus.path) {
        Some(Node::Void(_)) => focus.path.clone(),
        _ => text_block_path(editor, focus)
            .ok_or_else(|| CommandError::inapplicable("Selection is not in a block"))?,
    };
    let (&block_ix, parent_path) = anchor_block
        .split_last()
        .ok_or_else(|| CommandError::inapplicable("Selection is not in a block"))?;
    let siblings = children_ref(editor.doc(), parent_path)
        .ok_or_else(|| CommandError::inapplicable("Selection parent is not a container"))?;

    let replaces_empty = matches!(
        siblings.get(block_ix),
        Some(Node::Element(el)) if el.kind == kind::PARAGRAPH && el.inline_text().is_empty()
    );

    let mut ops: Vec<Op> = Vec::new();
    let insert_at = if replaces_empty {
        ops.push(Op::RemoveNode {
            path: anchor_block.clone(),
        });
        block_ix
    } else {
        block_ix + 1
    };

    let count = nodes.len();
    for (i, node) in nodes.into_iter().enumerate() {
        let mut path = parent_path.to_vec();
        path.push(insert_at + i);
        ops.push(Op::InsertNode { path, node });
    }

    let remaining_after = siblings.len() - (block_ix + 1);
    if remaining_after == 0 {
        let mut path = parent_path.to_vec();
        path.push(insert_at + count);
        ops.push(Op::InsertNode {
            path,
            node: Node::paragraph(""),
        });
    }

    let mut first = parent_path.to_vec();
    first.push(insert_at);
    Ok((ops, first))
}

/// Move a point whose path starts with `from` under `to` instead.
pub(crate) fn remap_point(point: &Point, from: &[usize], to: &[usize]) -> Option<Point> {
    let rest = point.path.strip_prefix(from)?;
    let mut path = to.to_vec();
    path.extend_from_slice(rest);
    Some(Point::new(path, point.offset))
}

/// Path of the block a point sits in: its text block, or a selected block void.
fn point_block_path(editor: &Editor, point: &Point) -> Option<Path> {
    match node_ref(editor.doc(), &point.path)? {
        Node::Void(_) if text_block_path(editor, point).is_none() => Some(point.path.clone()),
        _ => point.path.split_last().map(|(_, block)| block.to_vec()),
    }
}

/// The sibling blocks covered by a selection, as `(parent, first, last)`,
/// under the deepest container that accepts arbitrary blocks.
pub(crate) fn sibling_block_range(editor: &Editor, sel: &Selection) -> Option<(Path, usize, usize)> {
    let doc = editor.doc();
    let (start, end) = ordered_selection_points(sel);
    let s = point_block_path(editor, &start)?;
    let e = point_block_path(editor, &end)?;
    if s.is_empty() || e.is_empty() {
        return None;
    }

    let common = s.iter().zip(&e).take_while(|(a, b)| a == b).count();
    let mut depth = common.min(s.len().min(e.len()).saturating_sub(1));
    loop {
        let parent = &s[..depth];
        let accepts_blocks = parent.is_empty()
            || element_ref(doc, parent).is_some_and(|el| {
                editor.registry().child_constraint(el) == crate::plugin::ChildConstraint::BlockOnly
            });
        if accepts_blocks {
            return Some((parent.to_vec(), s[depth], e[depth]));
        }
        depth = depth.checked_sub(1)?;
    }
}

pub(crate) fn child_path(parent: &[usize], ix: usize) -> Path {
    let mut path = parent.to_vec();
    path.push(ix);
    path
}

/// Wrap `parent`'s children `first..=last` in a new `wrapper` element. With
/// `item` set, each child is first wrapped in an element of that kind.
pub(crate) fn wrap_siblings(
    editor: &Editor,
    parent: &[usize],
    (first, last): (usize, usize),
    wrapper: &str,
    attrs: Attrs,
    item: Option<&str>,
) -> Option<(Vec<Op>, Selection)> {
    let siblings = children_ref(editor.doc(), parent)?;
    let children: Vec<Node> = siblings
        .get(first..=last)?
        .iter()
        .cloned()
        .map(|node| match item {
            Some(item) => Node::element(item, Attrs::default(), vec![node]),
            None => node,
        })
        .collect();

    let mut ops: Vec<Op> = (first..=last)
        .rev()
        .map(|ix| Op::RemoveNode {
            path: child_path(parent, ix),
        })
        .collect();
    let wrapper_path = child_path(parent, first);
    ops.push(Op::InsertNode {
        path: wrapper_path.clone(),
        node: Node::element(wrapper, attrs, children),
    });

    let remap = |point: &Point| {
        (first..=last)
            .find_map(|ix| {
                let mut to = child_path(&wrapper_path, ix - first);
                if item.is_some() {
                    to.push(0);
                }
                remap_point(point, &child_path(parent, ix), &to)
            })
            .unwrap_or_else(|| point.clone())
    };
    let sel = editor.selection();
    Some((
        ops,
        Selection {
            anchor: remap(&sel.anchor),
            focus: remap(&sel.focus),
        },
    ))
}

/// Replace the element at `path` with its children.
pub(crate) fn unwrap_element(editor: &Editor, path: &[usize]) -> Option<(Vec<Op>, Selection)> {
    let el = element_ref(editor.doc(), path)?;
    let (&ix, parent) = path.split_last()?;

    let mut ops = vec![Op::RemoveNode {
        path: path.to_vec(),
    }];
    for (j, child) in el.children.iter().cloned().enumerate() {
        ops.push(Op::InsertNode {
            path: child_path(parent, ix + j),
            node: child,
        });
    }

    let remap = |point: &Point| {
        (0..el.children.len())
            .find_map(|j| remap_point(point, &child_path(path, j), &child_path(parent, ix + j)))
            .unwrap_or_else(|| point.clone())
    };
    let sel = editor.selection();
    Some((
        ops,
        Selection {
            anchor: remap(&sel.anchor),
            focus: remap(&sel.focus),
        },
    ))
}
