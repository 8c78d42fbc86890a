//! Tables: structure commands and per-side cell borders.
//!
//! Every side of a cell carries its own width, style and color. Setting one
//! side never writes another.

use serde_json::{json, Map, Value};

use super::{
    ancestor_element_path, arg_bool, arg_str, arg_u64, child_path, commit, insert_blocks,
    ordered_selection_points, text_block_path,
};
use crate::core::{element_ref, kind, AttrPatch, Attrs, Document, Node, Point, Selection};
use crate::editor::Editor;
use crate::ops::{Op, Path, Transaction};
use crate::plugin::{
    AttributeSpec, ChildConstraint, CommandError, CommandSpec, EditorPlugin, NodeSpec,
    NormalizePass, PluginRegistry, QueryError, QuerySpec,
};
use crate::schema::{is_safe_style_value, non_empty, ElementView};

pub(crate) const SIDES: [&str; 4] = ["top", "bottom", "left", "right"];
const PROPS: [&str; 3] = ["width", "style", "color"];
const BORDER_STYLES: [&str; 10] = [
    "none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset", "outset",
];
const CELL_KINDS: [&str; 2] = [kind::TABLE_CELL, kind::TABLE_HEADER];

pub(crate) struct TablePlugin;

impl EditorPlugin for TablePlugin {
    fn id(&self) -> &'static str {
        "table"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec::block(
                kind::TABLE,
                ChildConstraint::Only(vec![kind::TABLE_ROW.to_string()]),
            ),
            NodeSpec::structural(
                kind::TABLE_ROW,
                ChildConstraint::Only(CELL_KINDS.iter().map(|k| k.to_string()).collect()),
            ),
            NodeSpec::structural(kind::TABLE_CELL, ChildConstraint::BlockOnly),
            NodeSpec::structural(kind::TABLE_HEADER, ChildConstraint::BlockOnly),
        ]
    }

    fn attributes(&self) -> Vec<AttributeSpec> {
        let mut specs = Vec::new();
        for side in SIDES {
            for prop in PROPS {
                specs.push(cell_border_attribute(side, prop));
            }
        }
        specs
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(DropEmptyTableParts)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("table.insert", "Insert table", |editor, args| {
                let max = editor.config().max_table_size as u64;
                let rows = arg_u64(args.as_ref(), "rows").unwrap_or(3).clamp(1, max) as usize;
                let cols = arg_u64(args.as_ref(), "cols").unwrap_or(3).clamp(1, max) as usize;
                let header = arg_bool(args.as_ref(), "with_header_row").unwrap_or(true);
                insert_table(editor, rows, cols, header)
            })
            .description("Insert a rows x cols table at the caret and move into its first cell.")
            .args_example(json!({ "rows": 3, "cols": 3, "with_header_row": true })),
            CommandSpec::new("table.add_row_before", "Add row before", |editor, _args| {
                add_row(editor, false)
            }),
            CommandSpec::new("table.add_row_after", "Add row after", |editor, _args| {
                add_row(editor, true)
            }),
            CommandSpec::new("table.delete_row", "Delete row", |editor, _args| {
                delete_row(editor)
            }),
            CommandSpec::new("table.add_column_before", "Add column before", |editor, _args| {
                add_column(editor, false)
            }),
            CommandSpec::new("table.add_column_after", "Add column after", |editor, _args| {
                add_column(editor, true)
            }),
            CommandSpec::new("table.delete_column", "Delete column", |editor, _args| {
                delete_column(editor)
            }),
            CommandSpec::new("table.delete", "Delete table", |editor, _args| {
                let ctx = TableContext::at_focus(editor)?;
                replace_table_with_paragraph(editor, &ctx.table_path, "command:table.delete")
            }),
            CommandSpec::new("table.set_cell_border", "Set cell border", |editor, args| {
                let side = arg_str(args.as_ref(), "side").unwrap_or("all");
                let width = arg_str(args.as_ref(), "width").unwrap_or("1px").trim().to_string();
                let style = arg_str(args.as_ref(), "style").unwrap_or("solid").trim().to_string();
                let color = arg_str(args.as_ref(), "color").unwrap_or("#000000").trim().to_string();
                for value in [&width, &style, &color] {
                    if !is_safe_style_value(value) {
                        return Err(CommandError::invalid_args(format!(
                            "Invalid border value: {value:?}"
                        )));
                    }
                }
                let sides = border_sides(side)?;
                let mut set = Attrs::default();
                for side in sides {
                    set.insert(border_key(side, "width"), Value::String(width.clone()));
                    set.insert(border_key(side, "style"), Value::String(style.clone()));
                    set.insert(border_key(side, "color"), Value::String(color.clone()));
                }
                patch_selected_cells(
                    editor,
                    AttrPatch {
                        set,
                        remove: Vec::new(),
                    },
                    "command:table.set_cell_border",
                )
            })
            .description(
                "Border the selected cells. side is top, bottom, left, right, all, outer or inner; \
                 inner is a no-op for single cells.",
            )
            .args_example(json!({ "side": "top", "width": "2px", "style": "solid", "color": "#111827" })),
            CommandSpec::new("table.clear_cell_border", "Clear cell border", |editor, args| {
                let side = arg_str(args.as_ref(), "side").unwrap_or("all");
                let remove: Vec<String> = border_sides(side)?
                    .into_iter()
                    .flat_map(|side| PROPS.map(|prop| border_key(side, prop)))
                    .collect();
                patch_selected_cells(
                    editor,
                    AttrPatch {
                        set: Attrs::default(),
                        remove,
                    },
                    "command:table.clear_cell_border",
                )
            })
            .args_example(json!({ "side": "all" })),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("table.in_cell", |editor, _args| {
                Ok(Value::Bool(focus_cell_path(editor).is_some()))
            }),
            QuerySpec::new("table.cell_border", |editor, _args| {
                let path = focus_cell_path(editor)
                    .ok_or_else(|| QueryError::new("Caret is not in a table cell"))?;
                let cell = element_ref(editor.doc(), &path)
                    .ok_or_else(|| QueryError::new("Table cell vanished"))?;
                let borders: Map<String, Value> = cell
                    .attrs
                    .iter()
                    .filter(|(key, _)| key.starts_with("border_"))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                Ok(Value::Object(borders))
            }),
        ]
    }
}

pub(crate) fn border_key(side: &str, prop: &str) -> String {
    format!("border_{side}_{prop}")
}

/// Sides addressed by a border command. `inner` has no single-cell meaning
/// and addresses nothing.
fn border_sides(side: &str) -> Result<Vec<&'static str>, CommandError> {
    match side {
        "all" | "outer" => Ok(SIDES.to_vec()),
        "inner" => Ok(Vec::new()),
        other => SIDES
            .iter()
            .find(|s| **s == other)
            .map(|s| vec![*s])
            .ok_or_else(|| CommandError::invalid_args(format!("Unknown border side: {other}"))),
    }
}

fn cell_border_attribute(side: &'static str, prop: &'static str) -> AttributeSpec {
    let property: &'static str = match (side, prop) {
        ("top", "width") => "border-top-width",
        ("top", "style") => "border-top-style",
        ("top", _) => "border-top-color",
        ("bottom", "width") => "border-bottom-width",
        ("bottom", "style") => "border-bottom-style",
        ("bottom", _) => "border-bottom-color",
        ("left", "width") => "border-left-width",
        ("left", "style") => "border-left-style",
        ("left", _) => "border-left-color",
        (_, "width") => "border-right-width",
        (_, "style") => "border-right-style",
        _ => "border-right-color",
    };
    AttributeSpec::new(
        &CELL_KINDS,
        &border_key(side, prop),
        move |el| {
            el.style(property)
                .filter(|v| is_safe_style_value(v))
                .and_then(non_empty)
                .or_else(|| shorthand_part(el, side, prop))
        },
        move |value, out| {
            if let Some(v) = value.as_str().filter(|v| is_safe_style_value(v)) {
                out.style(property, v);
            }
        },
    )
}

/// One component of a `border-<side>: 1px solid red` shorthand.
fn shorthand_part(el: &ElementView, side: &str, prop: &str) -> Option<Value> {
    let shorthand = el.style(&format!("border-{side}"))?;
    if !is_safe_style_value(shorthand) {
        return None;
    }
    let mut width = None;
    let mut style = None;
    let mut color: Vec<&str> = Vec::new();
    for token in shorthand.split_whitespace() {
        let lower = token.to_ascii_lowercase();
        if BORDER_STYLES.contains(&lower.as_str()) {
            style = Some(lower);
        } else if is_length(&lower) {
            width = Some(token.to_string());
        } else {
            color.push(token);
        }
    }
    let part = match prop {
        "width" => width,
        "style" => style,
        _ => (!color.is_empty()).then(|| color.join(" ")),
    };
    part.map(Value::String)
}

fn is_length(token: &str) -> bool {
    if matches!(token, "0" | "thin" | "medium" | "thick") {
        return true;
    }
    ["px", "em", "rem", "pt"].iter().any(|unit| {
        token
            .strip_suffix(unit)
            .is_some_and(|n| !n.is_empty() && n.parse::<f64>().is_ok())
    })
}

pub(crate) fn focus_cell_path(editor: &Editor) -> Option<Path> {
    ancestor_element_path(editor.doc(), &editor.selection().focus.path, &CELL_KINDS)
}

struct TableContext {
    table_path: Path,
    row_ix: usize,
    col_ix: usize,
}

impl TableContext {
    fn at_focus(editor: &Editor) -> Result<Self, CommandError> {
        let cell_path = focus_cell_path(editor)
            .ok_or_else(|| CommandError::inapplicable("Caret is not in a table"))?;
        let (&col_ix, row_path) = cell_path
            .split_last()
            .ok_or_else(|| CommandError::inapplicable("Invalid table cell path"))?;
        let (&row_ix, table_path) = row_path
            .split_last()
            .ok_or_else(|| CommandError::inapplicable("Invalid table row path"))?;
        Ok(Self {
            table_path: table_path.to_vec(),
            row_ix,
            col_ix,
        })
    }

    fn rows<'a>(&self, doc: &'a Document) -> Result<&'a [Node], CommandError> {
        element_ref(doc, &self.table_path)
            .filter(|el| el.kind == kind::TABLE)
            .map(|el| el.children.as_slice())
            .ok_or_else(|| CommandError::inapplicable("Invalid table"))
    }
}

fn cell_node(cell_kind: &str) -> Node {
    Node::element(cell_kind, Attrs::default(), vec![Node::paragraph("")])
}

fn row_node(cell_kinds: impl IntoIterator<Item = &'static str>) -> Node {
    Node::element(
        kind::TABLE_ROW,
        Attrs::default(),
        cell_kinds.into_iter().map(cell_node).collect(),
    )
}

pub(crate) fn table_node(rows: usize, cols: usize, with_header_row: bool) -> Node {
    let rows = (0..rows)
        .map(|r| {
            let cell_kind = if r == 0 && with_header_row {
                kind::TABLE_HEADER
            } else {
                kind::TABLE_CELL
            };
            row_node(vec![cell_kind; cols])
        })
        .collect();
    Node::element(kind::TABLE, Attrs::default(), rows)
}

fn caret_in_cell(table_path: &[usize], row: usize, col: usize) -> Selection {
    let mut path = table_path.to_vec();
    path.extend([row, col, 0, 0]);
    Selection::collapsed(Point::new(path, 0))
}

/// A table can go where the caret is in a text block or on a block void,
/// anywhere but inside another table.
pub(crate) fn can_insert_table(editor: &Editor) -> bool {
    if editor.is_empty() {
        return true;
    }
    let focus = &editor.selection().focus;
    let in_block = text_block_path(editor, focus).is_some()
        || super::selected_void_path(editor, kind::IMAGE).is_some()
        || super::selected_void_path(editor, kind::HORIZONTAL_RULE).is_some();
    in_block && ancestor_element_path(editor.doc(), &focus.path, &[kind::TABLE]).is_none()
}

fn insert_table(
    editor: &mut Editor,
    rows: usize,
    cols: usize,
    with_header_row: bool,
) -> Result<(), CommandError> {
    if !can_insert_table(editor) {
        return Err(CommandError::inapplicable("A table cannot be inserted here"));
    }
    let (ops, table_path) = insert_blocks(editor, vec![table_node(rows, cols, with_header_row)])?;
    commit(
        editor,
        Transaction::new(ops)
            .selection_after(caret_in_cell(&table_path, 0, 0))
            .source("command:table.insert"),
    )
}

fn add_row(editor: &mut Editor, after: bool) -> Result<(), CommandError> {
    let ctx = TableContext::at_focus(editor)?;
    let rows = ctx.rows(editor.doc())?;
    let Some(Node::Element(row)) = rows.get(ctx.row_ix) else {
        return Err(CommandError::inapplicable("Invalid table row"));
    };

    // A row added above keeps the current row's cell kinds; below is body.
    let kinds: Vec<&'static str> = row
        .children
        .iter()
        .map(|cell| {
            if !after && cell.is_element(kind::TABLE_HEADER) {
                kind::TABLE_HEADER
            } else {
                kind::TABLE_CELL
            }
        })
        .collect();
    let new_ix = if after { ctx.row_ix + 1 } else { ctx.row_ix };
    let col = ctx.col_ix.min(kinds.len().saturating_sub(1));

    commit(
        editor,
        Transaction::new(vec![Op::InsertNode {
            path: child_path(&ctx.table_path, new_ix),
            node: row_node(kinds),
        }])
        .selection_after(caret_in_cell(&ctx.table_path, new_ix, col))
        .source(if after {
            "command:table.add_row_after"
        } else {
            "command:table.add_row_before"
        }),
    )
}

fn delete_row(editor: &mut Editor) -> Result<(), CommandError> {
    let ctx = TableContext::at_focus(editor)?;
    let rows = ctx.rows(editor.doc())?;
    if rows.len() <= 1 {
        return replace_table_with_paragraph(editor, &ctx.table_path, "command:table.delete_row");
    }

    let target_row = if ctx.row_ix + 1 < rows.len() {
        ctx.row_ix
    } else {
        ctx.row_ix - 1
    };
    let target_cols = match rows.get(if ctx.row_ix + 1 < rows.len() {
        ctx.row_ix + 1
    } else {
        target_row
    }) {
        Some(Node::Element(row)) => row.children.len().max(1),
        _ => 1,
    };
    let col = ctx.col_ix.min(target_cols - 1);

    commit(
        editor,
        Transaction::new(vec![Op::RemoveNode {
            path: child_path(&ctx.table_path, ctx.row_ix),
        }])
        .selection_after(caret_in_cell(&ctx.table_path, target_row, col))
        .source("command:table.delete_row"),
    )
}

fn add_column(editor: &mut Editor, after: bool) -> Result<(), CommandError> {
    let ctx = TableContext::at_focus(editor)?;
    let rows = ctx.rows(editor.doc())?;
    let insert_ix = if after { ctx.col_ix + 1 } else { ctx.col_ix };

    let mut ops: Vec<Op> = Vec::new();
    for (row_ix, row) in rows.iter().enumerate() {
        let Node::Element(row) = row else {
            continue;
        };
        // Header rows stay header rows.
        let reference = row
            .children
            .get(ctx.col_ix.min(row.children.len().saturating_sub(1)));
        let cell_kind = match reference {
            Some(cell) if cell.is_element(kind::TABLE_HEADER) => kind::TABLE_HEADER,
            _ => kind::TABLE_CELL,
        };
        let mut path = child_path(&ctx.table_path, row_ix);
        path.push(insert_ix.min(row.children.len()));
        ops.push(Op::InsertNode {
            path,
            node: cell_node(cell_kind),
        });
    }

    let caret_col = if after { ctx.col_ix } else { ctx.col_ix + 1 };
    let mut selection = editor.selection().clone();
    for point in [&mut selection.anchor, &mut selection.focus] {
        let depth = ctx.table_path.len() + 1;
        if point.path.starts_with(&ctx.table_path) && point.path.len() > depth {
            point.path[depth] = caret_col;
        }
    }

    commit(
        editor,
        Transaction::new(ops)
            .selection_after(selection)
            .source(if after {
                "command:table.add_column_after"
            } else {
                "command:table.add_column_before"
            }),
    )
}

fn delete_column(editor: &mut Editor) -> Result<(), CommandError> {
    let ctx = TableContext::at_focus(editor)?;
    let rows = ctx.rows(editor.doc())?;
    let cols = rows
        .iter()
        .find_map(|row| match row {
            Node::Element(el) => Some(el.children.len()),
            _ => None,
        })
        .unwrap_or(1);
    if cols <= 1 {
        return replace_table_with_paragraph(
            editor,
            &ctx.table_path,
            "command:table.delete_column",
        );
    }

    let mut ops: Vec<Op> = Vec::new();
    for (row_ix, row) in rows.iter().enumerate() {
        let Node::Element(row) = row else {
            continue;
        };
        if ctx.col_ix < row.children.len() {
            let mut path = child_path(&ctx.table_path, row_ix);
            path.push(ctx.col_ix);
            ops.push(Op::RemoveNode { path });
        }
    }
    let col = if ctx.col_ix + 1 < cols {
        ctx.col_ix
    } else {
        ctx.col_ix - 1
    };

    commit(
        editor,
        Transaction::new(ops)
            .selection_after(caret_in_cell(&ctx.table_path, ctx.row_ix, col))
            .source("command:table.delete_column"),
    )
}

fn replace_table_with_paragraph(
    editor: &mut Editor,
    table_path: &[usize],
    source: &'static str,
) -> Result<(), CommandError> {
    let caret = child_path(table_path, 0);
    commit(
        editor,
        Transaction::new(Op::replace_node(table_path, Node::paragraph("")).to_vec())
            .selection_after(Selection::collapsed(Point::new(caret, 0)))
            .source(source),
    )
}

/// Cells between the anchor's cell and the focus's cell in reading order,
/// within one table.
fn selected_cells(editor: &Editor) -> Result<Vec<Path>, CommandError> {
    let focus_cell = focus_cell_path(editor)
        .ok_or_else(|| CommandError::inapplicable("Caret is not in a table cell"))?;
    let (start, end) = ordered_selection_points(editor.selection());
    let start_cell = ancestor_element_path(editor.doc(), &start.path, &CELL_KINDS);
    let end_cell = ancestor_element_path(editor.doc(), &end.path, &CELL_KINDS);

    let (Some(start_cell), Some(end_cell)) = (start_cell, end_cell) else {
        return Ok(vec![focus_cell]);
    };
    let table_of = |cell: &Path| cell[..cell.len().saturating_sub(2)].to_vec();
    if table_of(&start_cell) != table_of(&end_cell) {
        return Ok(vec![focus_cell]);
    }

    let table_path = table_of(&start_cell);
    let rows = element_ref(editor.doc(), &table_path)
        .map(|t| t.children.as_slice())
        .unwrap_or_default();
    let mut cells = Vec::new();
    for (row_ix, row) in rows.iter().enumerate() {
        let Node::Element(row) = row else {
            continue;
        };
        for col_ix in 0..row.children.len() {
            let mut path = child_path(&table_path, row_ix);
            path.push(col_ix);
            if path >= start_cell && path <= end_cell {
                cells.push(path);
            }
        }
    }
    Ok(cells)
}

fn patch_selected_cells(
    editor: &mut Editor,
    patch: AttrPatch,
    source: &'static str,
) -> Result<(), CommandError> {
    let cells = selected_cells(editor)?;
    if patch.is_empty() {
        tracing::debug!(source, "border command addresses no sides");
        return Ok(());
    }
    let ops = cells
        .into_iter()
        .map(|path| Op::SetNodeAttrs {
            path,
            patch: patch.clone(),
        })
        .collect();
    commit(editor, Transaction::new(ops).source(source))
}

/// Tables without rows and rows without cells are removed.
struct DropEmptyTableParts;

impl NormalizePass for DropEmptyTableParts {
    fn id(&self) -> &'static str {
        "table.drop_empty_parts"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        fn walk(nodes: &[Node], path: &mut Vec<usize>, ops: &mut Vec<Op>) {
            for (ix, node) in nodes.iter().enumerate().rev() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                let empty_part = el.children.is_empty()
                    && (el.kind == kind::TABLE || el.kind == kind::TABLE_ROW);
                if empty_part {
                    ops.push(Op::RemoveNode { path: path.clone() });
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
