use lawsite_editor::{Editor, EditorConfig, Point, Selection, ToolbarAction};

fn editor(html: &str) -> Editor {
    Editor::from_html(html, EditorConfig::default())
}

#[test]
fn heading_applies_preset_font_size_and_paragraph_removes_it() {
    let mut editor = editor("<p>Başlık</p>");

    assert!(editor.execute(ToolbarAction::Heading(1), None));
    assert_eq!(
        editor.html(),
        "<h1><span style=\"font-size: 32px\">Başlık</span></h1>"
    );
    assert_eq!(
        editor.run_query::<Option<u64>>("block.heading_level", None).unwrap(),
        Some(1)
    );

    assert!(editor.execute(ToolbarAction::Heading(1), None));
    assert_eq!(editor.html(), "<p>Başlık</p>");
    assert_eq!(
        editor.run_query::<Option<u64>>("block.heading_level", None).unwrap(),
        None
    );
}

#[test]
fn switching_levels_replaces_the_preset() {
    let mut editor = editor("<p>Başlık</p>");
    editor.execute(ToolbarAction::Heading(1), None);
    editor.execute(ToolbarAction::Heading(3), None);
    assert_eq!(
        editor.html(),
        "<h3><span style=\"font-size: 24px\">Başlık</span></h3>"
    );
}

#[test]
fn explicit_font_size_survives_heading_toggles() {
    let mut editor = editor("<p><span style=\"font-size: 40px\">Büyük</span></p>");

    editor.execute(ToolbarAction::Heading(2), None);
    assert_eq!(
        editor.html(),
        "<h2><span style=\"font-size: 40px\">Büyük</span></h2>"
    );

    editor.execute(ToolbarAction::Paragraph, None);
    assert_eq!(
        editor.html(),
        "<p><span style=\"font-size: 40px\">Büyük</span></p>"
    );
}

#[test]
fn heading_level_zero_means_paragraph() {
    let mut editor = editor("<h2>Başlık</h2>");
    editor
        .run_command("block.toggle_heading", Some(serde_json::json!({ "level": 0 })))
        .unwrap();
    assert_eq!(editor.html(), "<p>Başlık</p>");
}

#[test]
fn heading_level_out_of_range_is_rejected() {
    let mut editor = editor("<p>x</p>");
    let err = editor
        .run_command("block.toggle_heading", Some(serde_json::json!({ "level": 7 })))
        .unwrap_err();
    assert_eq!(err.kind(), lawsite_editor::CommandErrorKind::InvalidArgs);
    assert_eq!(editor.html(), "<p>x</p>");
}

#[test]
fn heading_applies_to_every_selected_block() {
    let mut editor = editor("<p>a</p><p>b</p>");
    editor.set_selection(Selection {
        anchor: Point::new(vec![0, 0], 0),
        focus: Point::new(vec![1, 0], 1),
    });
    editor.execute(ToolbarAction::Heading(4), None);
    assert_eq!(
        editor.html(),
        concat!(
            "<h4><span style=\"font-size: 20px\">a</span></h4>",
            "<h4><span style=\"font-size: 20px\">b</span></h4>"
        )
    );
}

#[test]
fn enter_at_end_of_heading_starts_a_paragraph() {
    let mut editor = editor("<h2>Başlık</h2>");
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 0], "Başlık".len())));
    editor.run_command("text.split_block", None).unwrap();
    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "gövde" })))
        .unwrap();
    assert_eq!(editor.html(), "<h2>Başlık</h2><p>gövde</p>");
}
