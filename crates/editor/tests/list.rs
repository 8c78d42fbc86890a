use lawsite_editor::{CommandErrorKind, Editor, EditorConfig, Point, Selection, ToolbarAction};

const TWO_ITEMS: &str = "<ul><li><p>a</p></li><li><p>b</p></li></ul>";

fn editor_at(html: &str, path: Vec<usize>, offset: usize) -> Editor {
    let mut editor = Editor::from_html(html, EditorConfig::default());
    editor.set_selection(Selection::collapsed(Point::new(path, offset)));
    editor
}

#[test]
fn bullet_list_wraps_selected_paragraphs_and_unwraps_again() {
    let mut editor = Editor::from_html("<p>a</p><p>b</p>", EditorConfig::default());
    editor.set_selection(Selection {
        anchor: Point::new(vec![0, 0], 0),
        focus: Point::new(vec![1, 0], 1),
    });

    assert!(editor.execute(ToolbarAction::BulletList, None));
    assert_eq!(editor.html(), TWO_ITEMS);
    assert_eq!(
        editor.run_query::<String>("list.active_type", None).unwrap(),
        "bullet_list"
    );

    assert!(editor.execute(ToolbarAction::BulletList, None));
    assert_eq!(editor.html(), "<p>a</p><p>b</p>");
    assert_eq!(
        editor.run_query_json("list.active_type", None).unwrap(),
        serde_json::Value::Null
    );
}

#[test]
fn toggling_the_other_list_type_retypes_the_list() {
    let mut editor = editor_at(TWO_ITEMS, vec![0, 1, 0, 0], 0);
    editor.run_command("list.toggle_ordered", None).unwrap();
    assert_eq!(editor.html(), "<ol><li><p>a</p></li><li><p>b</p></li></ol>");
    assert_eq!(editor.selection().focus.path, vec![0, 1, 0, 0]);
}

#[test]
fn sink_nests_under_the_previous_item_and_lift_undoes_it() {
    let mut editor = editor_at(TWO_ITEMS, vec![0, 1, 0, 0], 1);
    assert!(editor.run_query::<bool>("list.can_sink", None).unwrap());

    assert!(editor.execute(ToolbarAction::Indent, None));
    assert_eq!(
        editor.html(),
        "<ul><li><p>a</p><ul><li><p>b</p></li></ul></li></ul>"
    );
    assert_eq!(
        editor.selection(),
        &Selection::collapsed(Point::new(vec![0, 0, 1, 0, 0, 0], 1))
    );

    assert!(editor.execute(ToolbarAction::Outdent, None));
    assert_eq!(editor.html(), TWO_ITEMS);
    assert_eq!(
        editor.selection(),
        &Selection::collapsed(Point::new(vec![0, 1, 0, 0], 1))
    );
}

#[test]
fn first_item_cannot_be_indented() {
    let mut editor = editor_at(TWO_ITEMS, vec![0, 0, 0, 0], 0);
    assert!(!editor.run_query::<bool>("list.can_sink", None).unwrap());
    let err = editor.run_command("list.sink_item", None).unwrap_err();
    assert_eq!(err.kind(), CommandErrorKind::Inapplicable);
    assert_eq!(editor.html(), TWO_ITEMS);
}

#[test]
fn lifting_a_top_level_item_moves_it_out_of_the_list() {
    let mut editor = editor_at(TWO_ITEMS, vec![0, 1, 0, 0], 0);
    editor.run_command("list.lift_item", None).unwrap();
    assert_eq!(editor.html(), "<ul><li><p>a</p></li></ul><p>b</p>");
    assert_eq!(editor.selection().focus.path, vec![1, 0]);
}

#[test]
fn lifting_a_middle_item_splits_the_list() {
    let mut editor = editor_at(
        "<ol><li><p>1</p></li><li><p>2</p></li><li><p>3</p></li></ol>",
        vec![0, 1, 0, 0],
        0,
    );
    editor.run_command("list.lift_item", None).unwrap();
    assert_eq!(
        editor.html(),
        "<ol><li><p>1</p></li></ol><p>2</p><ol><li><p>3</p></li></ol>"
    );
}

#[test]
fn enter_in_a_list_item_starts_a_new_item() {
    let mut editor = editor_at("<ul><li><p>ab</p></li></ul>", vec![0, 0, 0, 0], 1);
    editor.run_command("text.split_block", None).unwrap();
    assert_eq!(editor.html(), "<ul><li><p>a</p></li><li><p>b</p></li></ul>");
    assert_eq!(
        editor.selection(),
        &Selection::collapsed(Point::new(vec![0, 1, 0, 0], 0))
    );
}

#[test]
fn enter_in_an_empty_item_leaves_the_list() {
    let mut editor = editor_at(
        "<ul><li><p>a</p></li><li><p></p></li></ul>",
        vec![0, 1, 0, 0],
        0,
    );
    editor.run_command("text.split_block", None).unwrap();
    assert_eq!(editor.html(), "<ul><li><p>a</p></li></ul><p></p>");
}

#[test]
fn backspace_at_item_start_lifts_the_item() {
    let mut editor = editor_at(TWO_ITEMS, vec![0, 1, 0, 0], 0);
    editor.run_command("text.delete_backward", None).unwrap();
    assert_eq!(editor.html(), "<ul><li><p>a</p></li></ul><p>b</p>");
}
