//! Keyboard input: typed text, Backspace, Enter and Shift+Enter.
//!
//! Every edit collapses a range selection first, then rewrites the caret's
//! text block in one transaction. Plain typing into a run that already has
//! the right marks is a single `InsertText`.

use serde_json::json;

use super::{
    arg_str, block_void_selected, caret_marks, child_path, commit, insert_blocks, list,
    ordered_selection_points, point_global_offset, selected_text_blocks, selected_text_runs,
    text_block_path, total_inline_text_len, unwrap_element,
};
use crate::core::{
    clamp_to_char_boundary, element_ref, kind, node_ref, Attrs, ElementNode, Marks, Node, Point,
    Selection,
};
use crate::editor::Editor;
use crate::ops::{Op, Path, Transaction};
use crate::plugin::{CommandError, CommandSpec, EditorPlugin};

pub(crate) struct TypingPlugin;

impl EditorPlugin for TypingPlugin {
    fn id(&self) -> &'static str {
        "typing"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("text.insert", "Type text", |editor, args| {
                let text = arg_str(args.as_ref(), "text")
                    .ok_or_else(|| CommandError::invalid_args("Missing args.text"))?;
                insert_text(editor, text)
            })
            .description("Insert text at the caret, replacing a range selection. Stored marks apply.")
            .args_example(json!({ "text": "Merhaba" })),
            CommandSpec::new("text.delete_backward", "Backspace", |editor, _args| {
                delete_backward(editor)
            }),
            CommandSpec::new("text.split_block", "Enter", |editor, _args| split_block(editor))
                .description("Split the caret's block. In a list, split the item; an empty item leaves the list."),
            CommandSpec::new("text.insert_hard_break", "Line break", |editor, _args| {
                insert_hard_break(editor)
            }),
        ]
    }
}

/// The caret's text block once a range selection has been deleted.
struct CaretEdit {
    /// Removes the blocks after the first one that the range touched.
    ops: Vec<Op>,
    path: Path,
    block: ElementNode,
    global: usize,
}

fn collapse_selection(editor: &Editor) -> Result<CaretEdit, CommandError> {
    let sel = editor.selection();
    if sel.is_collapsed() {
        let path = text_block_path(editor, &sel.focus)
            .ok_or_else(|| CommandError::inapplicable("Caret is not in text"))?;
        let block = element_ref(editor.doc(), &path)
            .ok_or_else(|| CommandError::inapplicable("Caret block vanished"))?
            .clone();
        let child_ix = sel.focus.path.last().copied().unwrap_or(0);
        let global = point_global_offset(&block.children, child_ix, sel.focus.offset);
        return Ok(CaretEdit {
            ops: Vec::new(),
            path,
            block,
            global,
        });
    }

    let (start, end) = ordered_selection_points(sel);
    let blocks = selected_text_blocks(editor, sel)?;
    let (Some(first), Some(last)) = (blocks.first(), blocks.last()) else {
        return Err(CommandError::inapplicable("Selection is not in text"));
    };
    let start_global = point_global_offset(
        &first.el.children,
        start.path.last().copied().unwrap_or(0),
        start.offset,
    );
    let end_global = point_global_offset(
        &last.el.children,
        end.path.last().copied().unwrap_or(0),
        end.offset,
    );

    let mut children = slice_inline(&first.el.children, 0, start_global);
    children.extend(slice_inline(&last.el.children, end_global, usize::MAX));
    let mut block = first.el.clone();
    block.children = tidy_inline(children);

    // Later blocks go first so earlier paths stay valid.
    let ops = blocks[1..]
        .iter()
        .rev()
        .map(|b| Op::RemoveNode {
            path: b.path.clone(),
        })
        .collect();
    Ok(CaretEdit {
        ops,
        path: first.path.clone(),
        block,
        global: start_global,
    })
}

/// Replace the edited block with `children` and put the caret at `caret`.
fn finish(
    editor: &mut Editor,
    edit: CaretEdit,
    children: Vec<Node>,
    caret: usize,
    source: &'static str,
) -> Result<(), CommandError> {
    let CaretEdit {
        mut ops,
        path,
        mut block,
        ..
    } = edit;
    block.children = tidy_inline(children);
    let selection = caret_at(&path, &block.children, caret);
    ops.extend(Op::replace_node(&path, Node::Element(block)));
    commit(
        editor,
        Transaction::new(ops).selection_after(selection).source(source),
    )
}

/// The part of an inline sequence between two global offsets.
fn slice_inline(children: &[Node], from: usize, to: usize) -> Vec<Node> {
    let mut out = Vec::new();
    let mut cursor = 0usize;
    for node in children {
        match node {
            Node::Text(t) => {
                let start = cursor;
                cursor += t.text.len();
                let a = clamp_to_char_boundary(&t.text, from.saturating_sub(start));
                let b = clamp_to_char_boundary(&t.text, to.saturating_sub(start));
                if a < b {
                    out.push(Node::text(&t.text[a..b], t.marks.clone()));
                }
            }
            Node::Void(v) => {
                let start = cursor;
                cursor += v.inline_text_len();
                if from <= start && cursor <= to {
                    out.push(node.clone());
                }
            }
            Node::Element(_) => {}
        }
    }
    out
}

/// Merge equal runs, drop empty runs that sit next to text, and keep a text
/// leaf on both sides of every void.
fn tidy_inline(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len() + 1);
    for node in nodes {
        match node {
            Node::Text(t) => match out.last_mut() {
                Some(Node::Text(_)) if t.text.is_empty() => {}
                Some(Node::Text(prev)) if prev.text.is_empty() => *prev = t,
                Some(Node::Text(prev)) if prev.marks == t.marks => prev.text.push_str(&t.text),
                _ => out.push(Node::Text(t)),
            },
            other => {
                if !matches!(out.last(), Some(Node::Text(_))) {
                    out.push(Node::text("", Marks::default()));
                }
                out.push(other);
            }
        }
    }
    if !matches!(out.last(), Some(Node::Text(_))) {
        out.push(Node::text("", Marks::default()));
    }
    out
}

/// Caret at a global offset. At a run boundary the caret goes to the later
/// run, so text typed after a line break lands after it.
fn caret_at(block_path: &[usize], children: &[Node], global: usize) -> Selection {
    let mut found = (0usize, 0usize);
    let mut cursor = 0usize;
    for (ix, node) in children.iter().enumerate() {
        match node {
            Node::Text(t) => {
                if cursor <= global && global <= cursor + t.text.len() {
                    found = (ix, clamp_to_char_boundary(&t.text, global - cursor));
                }
                cursor += t.text.len();
            }
            Node::Void(v) => cursor += v.inline_text_len(),
            Node::Element(_) => {}
        }
    }
    Selection::collapsed(Point::new(child_path(block_path, found.0), found.1))
}

fn previous_unit_len(children: &[Node], global: usize) -> usize {
    let mut cursor = 0usize;
    for node in children {
        let len = match node {
            Node::Text(t) => t.text.len(),
            Node::Void(v) => v.inline_text_len(),
            Node::Element(_) => continue,
        };
        if cursor < global && global <= cursor + len {
            return match node {
                Node::Text(t) => {
                    let end = clamp_to_char_boundary(&t.text, global - cursor);
                    t.text[..end].chars().next_back().map_or(1, char::len_utf8)
                }
                _ => len,
            };
        }
        cursor += len;
    }
    0
}

/// Marks for typed text: none in code, else stored marks, else the marks at
/// the start of the selection.
fn typing_marks(editor: &Editor, block: &ElementNode) -> Marks {
    if block.kind == kind::CODE_BLOCK {
        return Marks::default();
    }
    if let Some(stored) = editor.stored_marks() {
        return stored.clone();
    }
    let sel = editor.selection();
    if !sel.is_collapsed() {
        if let Some(run) = selected_text_runs(editor, sel)
            .ok()
            .and_then(|runs| runs.first().copied())
        {
            return run.marks.clone();
        }
    }
    caret_marks(editor)
}

/// Text as inline nodes. Outside code blocks a newline is a hard break.
fn inline_pieces(text: &str, marks: &Marks, in_code: bool) -> Vec<Node> {
    if in_code {
        return vec![Node::text(text, marks.clone())];
    }
    let mut pieces = Vec::new();
    for (ix, line) in text.split('\n').enumerate() {
        if ix > 0 {
            pieces.push(Node::hard_break());
        }
        if !line.is_empty() {
            pieces.push(Node::text(line, marks.clone()));
        }
    }
    pieces
}

/// Put inline content into a new paragraph after a selected image or rule.
fn paragraph_after_void(
    editor: &mut Editor,
    pieces: Vec<Node>,
    source: &'static str,
) -> Result<(), CommandError> {
    let caret = total_inline_text_len(&pieces);
    let children = tidy_inline(pieces);
    let selection_children = children.clone();
    let (ops, path) = insert_blocks(
        editor,
        vec![Node::element(kind::PARAGRAPH, Attrs::default(), children)],
    )?;
    commit(
        editor,
        Transaction::new(ops)
            .selection_after(caret_at(&path, &selection_children, caret))
            .source(source),
    )
}

/// Text as the document stores it. Line endings become `\n`, and outside code
/// tabs and form feeds become spaces, matching what the markup reads back.
fn normalize_typed(text: &str, in_code: bool) -> String {
    text.replace("\r\n", "\n")
        .chars()
        .filter(|c| *c != '\0')
        .map(|c| match c {
            '\r' => '\n',
            '\t' | '\x0c' if !in_code => ' ',
            c => c,
        })
        .collect()
}

fn insert_text(editor: &mut Editor, text: &str) -> Result<(), CommandError> {
    if text.is_empty() {
        return Ok(());
    }
    if block_void_selected(editor) {
        let text = normalize_typed(text, false);
        if text.is_empty() {
            return Ok(());
        }
        let marks = editor.stored_marks().cloned().unwrap_or_default();
        return paragraph_after_void(
            editor,
            inline_pieces(&text, &marks, false),
            "command:text.insert",
        );
    }

    let edit = collapse_selection(editor)?;
    let in_code = edit.block.kind == kind::CODE_BLOCK;
    let text = normalize_typed(text, in_code);
    if text.is_empty() {
        return Ok(());
    }
    let text = text.as_str();
    let marks = typing_marks(editor, &edit.block);

    let sel = editor.selection();
    if sel.is_collapsed() && (in_code || !text.contains('\n')) {
        if let Some(Node::Text(run)) = node_ref(editor.doc(), &sel.focus.path) {
            if run.marks == marks {
                let op = Op::InsertText {
                    path: sel.focus.path.clone(),
                    offset: sel.focus.offset,
                    text: text.to_string(),
                };
                return commit(
                    editor,
                    Transaction::new(vec![op]).source("command:text.insert"),
                );
            }
        }
    }

    let pieces = inline_pieces(text, &marks, in_code);
    let caret = edit.global + total_inline_text_len(&pieces);
    let mut children = slice_inline(&edit.block.children, 0, edit.global);
    children.extend(pieces);
    children.extend(slice_inline(&edit.block.children, edit.global, usize::MAX));
    finish(editor, edit, children, caret, "command:text.insert")
}

fn insert_hard_break(editor: &mut Editor) -> Result<(), CommandError> {
    if block_void_selected(editor) {
        return paragraph_after_void(
            editor,
            vec![Node::hard_break()],
            "command:text.insert_hard_break",
        );
    }
    let edit = collapse_selection(editor)?;
    let piece = if edit.block.kind == kind::CODE_BLOCK {
        Node::text("\n", Marks::default())
    } else {
        Node::hard_break()
    };
    let caret = edit.global + total_inline_text_len(std::slice::from_ref(&piece));
    let mut children = slice_inline(&edit.block.children, 0, edit.global);
    children.push(piece);
    children.extend(slice_inline(&edit.block.children, edit.global, usize::MAX));
    finish(editor, edit, children, caret, "command:text.insert_hard_break")
}

fn delete_backward(editor: &mut Editor) -> Result<(), CommandError> {
    const SOURCE: &str = "command:text.delete_backward";

    if block_void_selected(editor) {
        let path = editor.selection().focus.path.clone();
        return commit(
            editor,
            Transaction::new(vec![Op::RemoveNode { path }]).source(SOURCE),
        );
    }

    let sel = editor.selection();
    if !sel.is_collapsed() {
        let edit = collapse_selection(editor)?;
        let children = edit.block.children.clone();
        let caret = edit.global;
        return finish(editor, edit, children, caret, SOURCE);
    }

    if let Some(Node::Text(run)) = node_ref(editor.doc(), &sel.focus.path) {
        let offset = clamp_to_char_boundary(&run.text, sel.focus.offset);
        if let Some(c) = run.text[..offset].chars().next_back() {
            let op = Op::RemoveText {
                path: sel.focus.path.clone(),
                range: offset - c.len_utf8()..offset,
            };
            return commit(editor, Transaction::new(vec![op]).source(SOURCE));
        }
    }

    let edit = collapse_selection(editor)?;
    if edit.global > 0 {
        let unit = previous_unit_len(&edit.block.children, edit.global);
        let caret = edit.global - unit;
        let mut children = slice_inline(&edit.block.children, 0, caret);
        children.extend(slice_inline(&edit.block.children, edit.global, usize::MAX));
        return finish(editor, edit, children, caret, SOURCE);
    }
    join_backward(editor, edit.path, edit.block)
}

/// Backspace at the start of a block.
fn join_backward(
    editor: &mut Editor,
    path: Path,
    block: ElementNode,
) -> Result<(), CommandError> {
    const SOURCE: &str = "command:text.delete_backward";

    let (&ix, parent) = path
        .split_last()
        .ok_or_else(|| CommandError::inapplicable("Invalid block path"))?;
    let parent_kind = element_ref(editor.doc(), parent).map(|el| el.kind.clone());

    if ix == 0 {
        return match parent_kind.as_deref() {
            Some(kind::LIST_ITEM) => list::lift_item(editor),
            Some(kind::BLOCKQUOTE) => lift_out_of_blockquote(editor, &path, block),
            _ => Err(CommandError::inapplicable("Nothing before this block")),
        };
    }

    let prev_path = child_path(parent, ix - 1);
    match node_ref(editor.doc(), &prev_path) {
        Some(Node::Void(_)) => {
            let caret = Selection::collapsed(Point::new(child_path(&prev_path, 0), 0));
            commit(
                editor,
                Transaction::new(vec![Op::RemoveNode { path: prev_path }])
                    .selection_after(caret)
                    .source(SOURCE),
            )
        }
        Some(Node::Element(_)) => {
            let target = last_text_block(editor, prev_path)
                .ok_or_else(|| CommandError::inapplicable("Nothing to join with"))?;
            let mut merged = element_ref(editor.doc(), &target)
                .ok_or_else(|| CommandError::inapplicable("Join target vanished"))?
                .clone();
            let caret = total_inline_text_len(&merged.children);
            let mut children = std::mem::take(&mut merged.children);
            children.extend(block.children);
            merged.children = tidy_inline(children);
            let selection = caret_at(&target, &merged.children, caret);

            let mut ops = vec![Op::RemoveNode { path }];
            ops.extend(Op::replace_node(&target, Node::Element(merged)));
            commit(
                editor,
                Transaction::new(ops).selection_after(selection).source(SOURCE),
            )
        }
        _ => Err(CommandError::inapplicable("Nothing to join with")),
    }
}

/// The last text block at or inside `path`. Tables are never entered.
fn last_text_block(editor: &Editor, mut path: Path) -> Option<Path> {
    loop {
        match node_ref(editor.doc(), &path)? {
            Node::Element(el) if editor.registry().is_text_block(el) => return Some(path),
            Node::Element(el) if el.kind != kind::TABLE && !el.children.is_empty() => {
                path.push(el.children.len() - 1);
            }
            _ => return None,
        }
    }
}

fn lift_out_of_blockquote(
    editor: &mut Editor,
    path: &[usize],
    block: ElementNode,
) -> Result<(), CommandError> {
    const SOURCE: &str = "command:text.delete_backward";

    let quote_path = &path[..path.len() - 1];
    let only_child = element_ref(editor.doc(), quote_path).is_some_and(|q| q.children.len() == 1);
    if only_child {
        let (ops, selection) = unwrap_element(editor, quote_path)
            .ok_or_else(|| CommandError::inapplicable("Blockquote vanished"))?;
        return commit(
            editor,
            Transaction::new(ops).selection_after(selection).source(SOURCE),
        );
    }

    let selection = caret_at(quote_path, &block.children, 0);
    commit(
        editor,
        Transaction::new(vec![
            Op::RemoveNode {
                path: path.to_vec(),
            },
            Op::InsertNode {
                path: quote_path.to_vec(),
                node: Node::Element(block),
            },
        ])
        .selection_after(selection)
        .source(SOURCE),
    )
}

fn split_block(editor: &mut Editor) -> Result<(), CommandError> {
    const SOURCE: &str = "command:text.split_block";

    if block_void_selected(editor) {
        return paragraph_after_void(editor, Vec::new(), SOURCE);
    }
    if !editor.selection().is_collapsed() {
        let edit = collapse_selection(editor)?;
        let children = edit.block.children.clone();
        let caret = edit.global;
        finish(editor, edit, children, caret, SOURCE)?;
    }

    let edit = collapse_selection(editor)?;
    if edit.block.kind == kind::CODE_BLOCK {
        let caret = edit.global + 1;
        let mut children = slice_inline(&edit.block.children, 0, edit.global);
        children.push(Node::text("\n", Marks::default()));
        children.extend(slice_inline(&edit.block.children, edit.global, usize::MAX));
        return finish(editor, edit, children, caret, SOURCE);
    }

    let CaretEdit {
        path, block, global, ..
    } = edit;
    let len = total_inline_text_len(&block.children);
    let (&ix, parent) = path
        .split_last()
        .ok_or_else(|| CommandError::inapplicable("Invalid block path"))?;

    let mut left = block.clone();
    left.children = tidy_inline(slice_inline(&block.children, 0, global));
    let right_children = tidy_inline(slice_inline(&block.children, global, usize::MAX));
    let right = if global == len && block.kind == kind::HEADING {
        ElementNode {
            kind: kind::PARAGRAPH.to_string(),
            attrs: Attrs::default(),
            children: right_children,
        }
    } else {
        ElementNode {
            kind: block.kind.clone(),
            attrs: block.attrs.clone(),
            children: right_children,
        }
    };

    let item = element_ref(editor.doc(), parent)
        .filter(|el| el.kind == kind::LIST_ITEM)
        .cloned();
    let mut ops = Op::replace_node(&path, Node::Element(left)).to_vec();

    let selection = match item {
        Some(item) => {
            if len == 0 && item.children.len() == 1 {
                return list::lift_item(editor);
            }
            let (&item_ix, list_path) = parent
                .split_last()
                .ok_or_else(|| CommandError::inapplicable("Invalid list item path"))?;
            for m in (ix + 1..item.children.len()).rev() {
                ops.push(Op::RemoveNode {
                    path: child_path(parent, m),
                });
            }
            let new_item = child_path(list_path, item_ix + 1);
            let selection = caret_at(&child_path(&new_item, 0), &right.children, 0);
            let mut children = vec![Node::Element(right)];
            children.extend(item.children[ix + 1..].iter().cloned());
            ops.push(Op::InsertNode {
                path: new_item,
                node: Node::element(kind::LIST_ITEM, item.attrs.clone(), children),
            });
            selection
        }
        None => {
            let new_block = child_path(parent, ix + 1);
            let selection = caret_at(&new_block, &right.children, 0);
            ops.push(Op::InsertNode {
                path: new_block,
                node: Node::Element(right),
            });
            selection
        }
    };

    commit(
        editor,
        Transaction::new(ops).selection_after(selection).source(SOURCE),
    )
}
