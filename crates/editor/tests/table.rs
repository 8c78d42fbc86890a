use lawsite_editor::{CommandErrorKind, Editor, EditorConfig, Point, Selection, ToolbarAction};

const DEFAULT_BORDER: &str = "style=\"border: 1px solid #d1d5db\"";

fn editor_with_table(rows: u64, cols: u64, header: bool) -> Editor {
    let mut editor = Editor::from_html("", EditorConfig::default());
    editor
        .run_command(
            "table.insert",
            Some(serde_json::json!({ "rows": rows, "cols": cols, "with_header_row": header })),
        )
        .unwrap();
    editor
}

fn caret_in_cell(editor: &mut Editor, row: usize, col: usize) {
    editor.set_selection(Selection::collapsed(Point::new(vec![0, row, col, 0, 0], 0)));
}

#[test]
fn insert_table_with_header_row_on_empty_document() {
    let editor = editor_with_table(2, 2, true);
    let th = format!("<th {DEFAULT_BORDER}><p></p></th>");
    let td = format!("<td {DEFAULT_BORDER}><p></p></td>");
    assert_eq!(
        editor.html(),
        format!(
            "<table style=\"border-collapse: collapse\"><tbody><tr>{th}{th}</tr><tr>{td}{td}</tr></tbody></table><p></p>"
        )
    );
    assert_eq!(
        editor.selection(),
        &Selection::collapsed(Point::new(vec![0, 0, 0, 0, 0], 0))
    );
    assert!(editor.run_query::<bool>("table.in_cell", None).unwrap());
}

#[test]
fn insert_table_defaults_and_clamps_sizes() {
    let mut editor = Editor::from_html("", EditorConfig::default());
    editor.execute(ToolbarAction::InsertTable, None);
    assert_eq!(editor.html().matches("<tr>").count(), 3);
    assert_eq!(editor.html().matches("<th ").count(), 3);
    assert_eq!(editor.html().matches("<td ").count(), 6);

    let mut editor = Editor::from_html("", EditorConfig::default());
    editor
        .run_command("table.insert", Some(serde_json::json!({ "rows": 0, "cols": 500 })))
        .unwrap();
    assert_eq!(editor.html().matches("<tr>").count(), 1);
    assert_eq!(editor.html().matches("<th ").count(), 32);
}

#[test]
fn tables_cannot_nest() {
    let mut editor = editor_with_table(2, 2, true);
    let before = editor.html();
    let err = editor.run_command("table.insert", None).unwrap_err();
    assert_eq!(err.kind(), CommandErrorKind::Inapplicable);
    assert_eq!(editor.html(), before);
}

#[test]
fn typing_goes_into_the_first_cell() {
    let mut editor = editor_with_table(2, 2, true);
    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "Ad" })))
        .unwrap();
    assert!(editor.html().contains(&format!("<th {DEFAULT_BORDER}><p>Ad</p></th>")));
}

#[test]
fn border_on_top_only_writes_top_declarations() {
    let mut editor = editor_with_table(2, 2, true);
    editor
        .run_command(
            "table.set_cell_border",
            Some(serde_json::json!({
                "side": "top",
                "width": "2px",
                "style": "dashed",
                "color": "#ff0000",
            })),
        )
        .unwrap();

    let html = editor.html();
    assert!(html.contains(
        "<th style=\"border-top-width: 2px; border-top-style: dashed; border-top-color: #ff0000\"><p></p></th>"
    ));
    assert!(!html.contains("border-bottom"));
    assert!(!html.contains("border-left"));
    assert!(!html.contains("border-right"));
    // The other cells keep the default border.
    assert_eq!(html.matches(DEFAULT_BORDER).count(), 3);

    let borders: serde_json::Value = editor.run_query("table.cell_border", None).unwrap();
    assert_eq!(
        borders,
        serde_json::json!({
            "border_top_color": "#ff0000",
            "border_top_style": "dashed",
            "border_top_width": "2px",
        })
    );
}

#[test]
fn sides_are_set_and_cleared_independently() {
    let mut editor = editor_with_table(1, 1, false);
    editor
        .run_command("table.set_cell_border", Some(serde_json::json!({ "side": "all" })))
        .unwrap();
    let html = editor.html();
    for side in ["top", "bottom", "left", "right"] {
        assert!(html.contains(&format!("border-{side}-width: 1px")));
        assert!(html.contains(&format!("border-{side}-style: solid")));
        assert!(html.contains(&format!("border-{side}-color: #000000")));
    }

    editor
        .run_command("table.clear_cell_border", Some(serde_json::json!({ "side": "left" })))
        .unwrap();
    let html = editor.html();
    assert!(!html.contains("border-left"));
    assert!(html.contains("border-top-width: 1px"));
    assert!(html.contains("border-right-color: #000000"));

    editor.execute(ToolbarAction::ClearCellBorder, None);
    assert!(editor.html().contains(&format!("<td {DEFAULT_BORDER}>")));
}

#[test]
fn cell_borders_survive_a_round_trip() {
    let mut editor = editor_with_table(1, 2, false);
    editor
        .run_command(
            "table.set_cell_border",
            Some(serde_json::json!({ "side": "bottom", "width": "3px", "color": "rgb(0, 0, 255)" })),
        )
        .unwrap();
    let html = editor.html();
    let reparsed = Editor::from_html(&html, EditorConfig::default());
    assert_eq!(reparsed.html(), html);
}

#[test]
fn border_shorthand_in_html_is_split_per_side() {
    let editor = Editor::from_html(
        "<table><tr><td style=\"border-left: 2px dotted #333\">a</td></tr></table>",
        EditorConfig::default(),
    );
    assert!(editor.html().contains(
        "<td style=\"border-left-width: 2px; border-left-style: dotted; border-left-color: #333\">"
    ));
}

#[test]
fn inner_side_is_a_no_op_and_unknown_sides_are_rejected() {
    let mut editor = editor_with_table(2, 2, true);
    let before = editor.html();
    let revision = editor.revision();

    editor
        .run_command("table.set_cell_border", Some(serde_json::json!({ "side": "inner" })))
        .unwrap();
    assert_eq!(editor.html(), before);
    assert_eq!(editor.revision(), revision);

    let err = editor
        .run_command("table.set_cell_border", Some(serde_json::json!({ "side": "diagonal" })))
        .unwrap_err();
    assert_eq!(err.kind(), CommandErrorKind::InvalidArgs);

    let err = editor
        .run_command(
            "table.set_cell_border",
            Some(serde_json::json!({ "color": "red\" onmouseover=\"x" })),
        )
        .unwrap_err();
    assert_eq!(err.kind(), CommandErrorKind::InvalidArgs);
    assert_eq!(editor.html(), before);
}

#[test]
fn border_applies_to_every_cell_in_a_range() {
    let mut editor = editor_with_table(2, 2, false);
    editor.set_selection(Selection {
        anchor: Point::new(vec![0, 0, 0, 0, 0], 0),
        focus: Point::new(vec![0, 1, 1, 0, 0], 0),
    });
    editor
        .run_command(
            "table.set_cell_border",
            Some(serde_json::json!({ "side": "left", "width": "3px" })),
        )
        .unwrap();
    assert_eq!(editor.html().matches("border-left-width: 3px").count(), 4);
}

#[test]
fn rows_are_added_and_deleted_around_the_caret() {
    let mut editor = editor_with_table(2, 2, true);

    editor.execute(ToolbarAction::AddRowAfter, None);
    assert_eq!(editor.html().matches("<tr>").count(), 3);
    assert_eq!(editor.html().matches("<th ").count(), 2);
    assert_eq!(editor.selection().focus.path, vec![0, 1, 0, 0, 0]);

    caret_in_cell(&mut editor, 0, 1);
    editor.execute(ToolbarAction::AddRowBefore, None);
    assert_eq!(editor.html().matches("<th ").count(), 4);
    assert_eq!(editor.selection().focus.path, vec![0, 0, 1, 0, 0]);

    editor.execute(ToolbarAction::DeleteRow, None);
    assert_eq!(editor.html().matches("<tr>").count(), 3);
    assert_eq!(editor.html().matches("<th ").count(), 2);
}

#[test]
fn columns_are_added_and_deleted_in_every_row() {
    let mut editor = editor_with_table(2, 2, true);
    caret_in_cell(&mut editor, 1, 0);

    editor.execute(ToolbarAction::AddColumnBefore, None);
    assert_eq!(editor.html().matches("<th ").count(), 3);
    assert_eq!(editor.html().matches("<td ").count(), 3);
    assert_eq!(editor.selection().focus.path, vec![0, 1, 1, 0, 0]);

    editor.execute(ToolbarAction::AddColumnAfter, None);
    assert_eq!(editor.html().matches("<td ").count(), 4);
    assert_eq!(editor.selection().focus.path, vec![0, 1, 1, 0, 0]);

    editor.execute(ToolbarAction::DeleteColumn, None);
    assert_eq!(editor.html().matches("<th ").count(), 3);
    assert_eq!(editor.html().matches("<td ").count(), 3);
}

#[test]
fn deleting_the_last_row_or_column_removes_the_table() {
    let mut editor = editor_with_table(1, 2, false);
    editor.execute(ToolbarAction::DeleteRow, None);
    assert_eq!(editor.html(), "<p></p><p></p>");

    let mut editor = editor_with_table(2, 1, false);
    editor.execute(ToolbarAction::DeleteColumn, None);
    assert_eq!(editor.html(), "<p></p><p></p>");
}

#[test]
fn delete_table_and_undo_it() {
    let mut editor = editor_with_table(2, 2, true);
    let with_table = editor.html();

    assert!(editor.execute(ToolbarAction::DeleteTable, None));
    assert_eq!(editor.html(), "<p></p><p></p>");
    assert!(!editor.run_query::<bool>("table.in_cell", None).unwrap());

    editor.undo();
    assert_eq!(editor.html(), with_table);
}

#[test]
fn table_commands_outside_a_table_are_inapplicable() {
    let mut editor = Editor::from_html("<p>metin</p>", EditorConfig::default());
    for command in [
        "table.add_row_after",
        "table.delete_row",
        "table.add_column_before",
        "table.delete",
        "table.set_cell_border",
    ] {
        let err = editor.run_command(command, None).unwrap_err();
        assert_eq!(err.kind(), CommandErrorKind::Inapplicable, "{command}");
    }
    assert_eq!(editor.html(), "<p>metin</p>");
}
