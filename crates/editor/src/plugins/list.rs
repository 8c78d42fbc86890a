use serde_json::Value;

use super::{
    ancestor_element_path, child_path, commit, remap_point, sibling_block_range, wrap_siblings,
};
use crate::core::{element_ref, kind, Attrs, Node, Point, Selection};
use crate::editor::Editor;
use crate::ops::{Op, Path, Transaction};
use crate::plugin::{
    ChildConstraint, CommandError, CommandSpec, EditorPlugin, NodeSpec, QuerySpec,
};

pub(crate) struct ListPlugin;

impl EditorPlugin for ListPlugin {
    fn id(&self) -> &'static str {
        "list"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        let items = ChildConstraint::Only(vec![kind::LIST_ITEM.to_string()]);
        vec![
            NodeSpec::block(kind::BULLET_LIST, items.clone()),
            NodeSpec::block(kind::ORDERED_LIST, items),
            NodeSpec::structural(kind::LIST_ITEM, ChildConstraint::BlockOnly),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("list.toggle_bullet", "Bullet list", |editor, _args| {
                toggle_list(editor, kind::BULLET_LIST)
            }),
            CommandSpec::new("list.toggle_ordered", "Numbered list", |editor, _args| {
                toggle_list(editor, kind::ORDERED_LIST)
            }),
            CommandSpec::new("list.sink_item", "Indent list item", |editor, _args| {
                sink_item(editor)
            })
            .description("Nest the current list item under the item before it."),
            CommandSpec::new("list.lift_item", "Outdent list item", |editor, _args| {
                lift_item(editor)
            })
            .description("Move the current list item one level up, or out of the list."),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("list.active_type", |editor, _args| {
                Ok(active_list(editor)
                    .map(|(_, list_kind)| Value::String(list_kind.to_string()))
                    .unwrap_or(Value::Null))
            }),
            QuerySpec::new("list.can_sink", |editor, _args| {
                Ok(Value::Bool(current_item(editor).is_some_and(|(_, _, ix)| ix > 0)))
            }),
        ]
    }
}

/// Path and kind of the innermost list around the caret.
pub(crate) fn active_list(editor: &Editor) -> Option<(Path, &'static str)> {
    let path = ancestor_element_path(
        editor.doc(),
        &editor.selection().focus.path,
        &[kind::BULLET_LIST, kind::ORDERED_LIST],
    )?;
    let list_kind = match element_ref(editor.doc(), &path)?.kind.as_str() {
        kind::BULLET_LIST => kind::BULLET_LIST,
        _ => kind::ORDERED_LIST,
    };
    Some((path, list_kind))
}

/// `(list path, list kind, item index)` of the item holding the caret.
fn current_item(editor: &Editor) -> Option<(Path, &'static str, usize)> {
    let (path, list_kind) = active_list(editor)?;
    let ix = *editor.selection().focus.path.get(path.len())?;
    Some((path, list_kind, ix))
}

fn item_index(point: &Point, list_path: &[usize]) -> Option<usize> {
    point
        .path
        .strip_prefix(list_path)
        .and_then(|rest| rest.first().copied())
}

fn toggle_list(editor: &mut Editor, list_kind: &str) -> Result<(), CommandError> {
    let sel = editor.selection().clone();
    let source = format!("command:list.toggle_{}", list_kind.trim_end_matches("_list"));

    let (ops, selection) = match active_list(editor) {
        Some((path, current)) if current == list_kind => {
            let focus_ix = item_index(&sel.focus, &path)
                .ok_or_else(|| CommandError::inapplicable("Caret is not in a list item"))?;
            let anchor_ix = item_index(&sel.anchor, &path).unwrap_or(focus_ix);
            lift_out(editor, &path, anchor_ix.min(focus_ix), anchor_ix.max(focus_ix))
        }
        Some((path, _)) => {
            let list = element_ref(editor.doc(), &path)
                .ok_or_else(|| CommandError::inapplicable("List vanished"))?;
            let retyped = Node::element(list_kind, Attrs::default(), list.children.clone());
            Some((Op::replace_node(&path, retyped).to_vec(), sel.clone()))
        }
        None => {
            let (parent, first, last) = sibling_block_range(editor, &sel)
                .ok_or_else(|| CommandError::inapplicable("Selection cannot become a list"))?;
            wrap_siblings(
                editor,
                &parent,
                (first, last),
                list_kind,
                Attrs::default(),
                Some(kind::LIST_ITEM),
            )
        }
    }
    .ok_or_else(|| CommandError::inapplicable("Selection cannot become a list"))?;

    commit(
        editor,
        Transaction::new(ops).selection_after(selection).source(source),
    )
}

/// Take items `first..=last` out of the list at `list_path`, splitting the
/// list around them. Their blocks land between the two halves.
fn lift_out(
    editor: &Editor,
    list_path: &[usize],
    first: usize,
    last: usize,
) -> Option<(Vec<Op>, Selection)> {
    let list = element_ref(editor.doc(), list_path)?;
    let (&list_ix, parent) = list_path.split_last()?;
    let items = list.children.get(first..=last)?;

    let mut nodes: Vec<Node> = Vec::new();
    let mut moves: Vec<(Path, Path)> = Vec::new();

    if first > 0 {
        nodes.push(Node::element(
            &list.kind,
            list.attrs.clone(),
            list.children[..first].to_vec(),
        ));
        for ix in 0..first {
            moves.push((child_path(list_path, ix), vec![list_ix, ix]));
        }
    }
    for (offset, item) in items.iter().enumerate() {
        let Node::Element(item) = item else {
            continue;
        };
        for (j, block) in item.children.iter().enumerate() {
            moves.push((
                child_path(&child_path(list_path, first + offset), j),
                vec![list_ix + nodes.len()],
            ));
            nodes.push(block.clone());
        }
    }
    let after = &list.children[last + 1..];
    if !after.is_empty() {
        let after_ix = list_ix + nodes.len();
        for (k, _) in after.iter().enumerate() {
            moves.push((child_path(list_path, last + 1 + k), vec![after_ix, k]));
        }
        nodes.push(Node::element(&list.kind, list.attrs.clone(), after.to_vec()));
    }

    let mut ops = vec![Op::RemoveNode {
        path: list_path.to_vec(),
    }];
    for (k, node) in nodes.into_iter().enumerate() {
        ops.push(Op::InsertNode {
            path: child_path(parent, list_ix + k),
            node,
        });
    }

    let remap = |point: &Point| {
        moves
            .iter()
            .find_map(|(from, to)| {
                let mut target = parent.to_vec();
                target.extend_from_slice(to);
                remap_point(point, from, &target)
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

fn sink_item(editor: &mut Editor) -> Result<(), CommandError> {
    let (list_path, list_kind, ix) = current_item(editor)
        .ok_or_else(|| CommandError::inapplicable("Caret is not in a list"))?;
    if ix == 0 {
        return Err(CommandError::inapplicable("The first item cannot be indented"));
    }
    let doc = editor.doc();
    let list = element_ref(doc, &list_path)
        .ok_or_else(|| CommandError::inapplicable("List vanished"))?;
    let item = list.children[ix].clone();
    let prev_path = child_path(&list_path, ix - 1);
    let prev = element_ref(doc, &prev_path)
        .ok_or_else(|| CommandError::inapplicable("Previous item is not an element"))?;

    let item_path = child_path(&list_path, ix);
    let (insert, new_item_path) = match prev.children.last() {
        Some(Node::Element(nested)) if nested.kind == list_kind => {
            let nested_path = child_path(&prev_path, prev.children.len() - 1);
            let at = child_path(&nested_path, nested.children.len());
            (
                Op::InsertNode {
                    path: at.clone(),
                    node: item,
                },
                at,
            )
        }
        _ => {
            let nested_path = child_path(&prev_path, prev.children.len());
            (
                Op::InsertNode {
                    path: nested_path.clone(),
                    node: Node::element(list_kind, Attrs::default(), vec![item]),
                },
                child_path(&nested_path, 0),
            )
        }
    };

    let sel = editor.selection();
    let remap = |point: &Point| {
        remap_point(point, &item_path, &new_item_path).unwrap_or_else(|| point.clone())
    };
    let selection = Selection {
        anchor: remap(&sel.anchor),
        focus: remap(&sel.focus),
    };
    commit(
        editor,
        Transaction::new(vec![Op::RemoveNode { path: item_path.clone() }, insert])
            .selection_after(selection)
            .source("command:list.sink_item"),
    )
}

pub(crate) fn lift_item(editor: &mut Editor) -> Result<(), CommandError> {
    let (list_path, list_kind, ix) = current_item(editor)
        .ok_or_else(|| CommandError::inapplicable("Caret is not in a list"))?;

    let outer_item = list_path
        .split_last()
        .map(|(_, parent)| parent.to_vec())
        .filter(|parent| {
            element_ref(editor.doc(), parent).is_some_and(|el| el.kind == kind::LIST_ITEM)
        });

    let (ops, selection) = match outer_item {
        Some(outer_item) => lift_nested(editor, &list_path, list_kind, ix, &outer_item),
        None => lift_out(editor, &list_path, ix, ix),
    }
    .ok_or_else(|| CommandError::inapplicable("List item cannot be lifted"))?;

    commit(
        editor,
        Transaction::new(ops)
            .selection_after(selection)
            .source("command:list.lift_item"),
    )
}

/// Move item `ix` of a nested list right after the item that holds the list.
/// Items that followed it become its own nested list.
fn lift_nested(
    editor: &Editor,
    list_path: &[usize],
    list_kind: &str,
    ix: usize,
    outer_item: &[usize],
) -> Option<(Vec<Op>, Selection)> {
    let list = element_ref(editor.doc(), list_path)?;
    let Node::Element(item) = list.children.get(ix)? else {
        return None;
    };
    let (&outer_ix, outer_list) = outer_item.split_last()?;
    let after = &list.children[ix + 1..];

    let mut lifted = item.clone();
    let own_children = lifted.children.len();
    if !after.is_empty() {
        lifted.children.push(Node::element(
            list_kind,
            list.attrs.clone(),
            after.to_vec(),
        ));
    }

    let mut ops: Vec<Op> = (ix..list.children.len())
        .rev()
        .map(|j| Op::RemoveNode {
            path: child_path(list_path, j),
        })
        .collect();
    if ix == 0 {
        ops.push(Op::RemoveNode {
            path: list_path.to_vec(),
        });
    }
    let target = child_path(outer_list, outer_ix + 1);
    ops.push(Op::InsertNode {
        path: target.clone(),
        node: Node::Element(lifted),
    });

    let remap = |point: &Point| {
        if let Some(moved) = remap_point(point, &child_path(list_path, ix), &target) {
            return moved;
        }
        (ix + 1..list.children.len())
            .find_map(|j| {
                let to = child_path(&child_path(&target, own_children), j - ix - 1);
                remap_point(point, &child_path(list_path, j), &to)
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
