use lawsite_editor::{Editor, EditorConfig, Point, Selection, ToolbarAction};

fn select(editor: &mut Editor, from: usize, to: usize) {
    editor.set_selection(Selection {
        anchor: Point::new(vec![0, 0], from),
        focus: Point::new(vec![0, 0], to),
    });
}

#[test]
fn toggle_bold_then_type_produces_bold_text() {
    let mut editor = Editor::from_html("", EditorConfig::default());

    assert!(!editor.execute(ToolbarAction::Bold, None));
    assert!(editor.stored_marks().is_some_and(|marks| marks.bold));

    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "Hi" })))
        .unwrap();
    assert_eq!(editor.html(), "<p><strong>Hi</strong></p>");
}

#[test]
fn stored_marks_are_dropped_when_the_caret_moves() {
    let mut editor = Editor::from_html("<p>abc</p>", EditorConfig::default());
    editor.execute(ToolbarAction::Italic, None);
    assert!(editor.stored_marks().is_some());

    editor.set_selection(Selection::collapsed(Point::new(vec![0, 0], 2)));
    assert!(editor.stored_marks().is_none());

    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "x" })))
        .unwrap();
    assert_eq!(editor.html(), "<p>abxc</p>");
}

#[test]
fn toggling_a_range_twice_restores_plain_text() {
    let mut editor = Editor::from_html("<p>merhaba dünya</p>", EditorConfig::default());
    select(&mut editor, 0, 7);

    editor.execute(ToolbarAction::Bold, None);
    assert_eq!(editor.html(), "<p><strong>merhaba</strong> dünya</p>");

    editor.execute(ToolbarAction::Bold, None);
    assert_eq!(editor.html(), "<p>merhaba dünya</p>");
}

#[test]
fn typing_continues_the_mark_of_the_preceding_run() {
    let mut editor = Editor::from_html("<p><em>ab</em>cd</p>", EditorConfig::default());
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 0], 2)));
    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "X" })))
        .unwrap();
    assert_eq!(editor.html(), "<p><em>abX</em>cd</p>");
}

#[test]
fn subscript_and_superscript_exclude_each_other() {
    let mut editor = Editor::from_html("<p>x2</p>", EditorConfig::default());
    select(&mut editor, 1, 2);

    editor.execute(ToolbarAction::Superscript, None);
    assert_eq!(editor.html(), "<p>x<sup>2</sup></p>");

    editor.execute(ToolbarAction::Subscript, None);
    assert_eq!(editor.html(), "<p>x<sub>2</sub></p>");
}

#[test]
fn link_set_and_unset_at_the_caret() {
    let mut editor = Editor::from_html("<p>site</p>", EditorConfig::default());
    select(&mut editor, 0, 4);
    editor.execute(
        ToolbarAction::SetLink,
        Some(serde_json::json!({ "href": "https://example.com" })),
    );
    assert_eq!(
        editor.html(),
        "<p><a href=\"https://example.com\" target=\"_blank\" rel=\"noopener noreferrer\">site</a></p>"
    );
    assert_eq!(
        editor.run_query::<Option<String>>("marks.active_link", None).unwrap(),
        Some("https://example.com".to_string())
    );

    editor.set_selection(Selection::collapsed(Point::new(vec![0, 0], 2)));
    editor.execute(ToolbarAction::UnsetLink, None);
    assert_eq!(editor.html(), "<p>site</p>");
}

#[test]
fn javascript_links_are_refused() {
    let mut editor = Editor::from_html("<p>site</p>", EditorConfig::default());
    select(&mut editor, 0, 4);
    let err = editor
        .run_command(
            "marks.set_link",
            Some(serde_json::json!({ "href": "JavaScript:alert(1)" })),
        )
        .unwrap_err();
    assert_eq!(err.kind(), lawsite_editor::CommandErrorKind::InvalidArgs);
    assert_eq!(editor.html(), "<p>site</p>");
}

#[test]
fn highlight_with_color_renders_a_mark() {
    let mut editor = Editor::from_html("<p>önemli</p>", EditorConfig::default());
    select(&mut editor, 0, "önemli".len());
    editor.execute(
        ToolbarAction::Highlight,
        Some(serde_json::json!({ "color": "#fde68a" })),
    );
    assert_eq!(
        editor.html(),
        "<p><mark data-color=\"#fde68a\" style=\"background-color: #fde68a; color: inherit\">önemli</mark></p>"
    );

    editor.execute(ToolbarAction::UnsetHighlight, None);
    assert_eq!(editor.html(), "<p>önemli</p>");
}

#[test]
fn clear_formatting_removes_marks_and_block_types() {
    let mut editor = Editor::from_html(
        "<blockquote><h2><strong>Not</strong></h2></blockquote>",
        EditorConfig::default(),
    );
    editor.set_selection(Selection {
        anchor: Point::new(vec![0, 0, 0], 0),
        focus: Point::new(vec![0, 0, 0], 3),
    });
    editor.execute(ToolbarAction::ClearFormatting, None);
    assert_eq!(editor.html(), "<p>Not</p>");
}
