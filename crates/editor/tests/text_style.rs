use lawsite_editor::{Editor, EditorConfig, Point, Selection};

fn editor_with_selection(html: &str, from: usize, to: usize) -> Editor {
    let mut editor = Editor::from_html(html, EditorConfig::default());
    editor.set_selection(Selection {
        anchor: Point::new(vec![0, 0], from),
        focus: Point::new(vec![0, 0], to),
    });
    editor
}

#[test]
fn font_size_and_family_are_independent() {
    let mut editor = editor_with_selection("<p>Merhaba</p>", 0, 7);

    editor
        .run_command("text_style.set_font_size", Some(serde_json::json!({ "size": 18 })))
        .unwrap();
    editor
        .run_command(
            "text_style.set_font_family",
            Some(serde_json::json!({ "family": "Arial" })),
        )
        .unwrap();
    assert_eq!(
        editor.html(),
        "<p><span style=\"font-size: 18px; font-family: Arial\">Merhaba</span></p>"
    );

    editor.run_command("text_style.unset_font_size", None).unwrap();
    assert_eq!(
        editor.html(),
        "<p><span style=\"font-family: Arial\">Merhaba</span></p>"
    );

    let style: serde_json::Value = editor.run_query("text_style.get", None).unwrap();
    assert_eq!(style["font_family"], "Arial");
    assert!(style["font_size"].is_null());
}

#[test]
fn non_numeric_font_size_is_a_no_op() {
    let mut editor = editor_with_selection("<p>Merhaba</p>", 0, 7);
    let before = editor.html();
    let revision = editor.revision();

    editor
        .run_command("text_style.set_font_size", Some(serde_json::json!({ "size": "abc" })))
        .unwrap();

    assert_eq!(editor.html(), before);
    assert_eq!(editor.revision(), revision);
    assert!(!editor.can_undo());
}

#[test]
fn font_size_accepts_pixel_strings_and_empty_unsets() {
    let mut editor = editor_with_selection("<p>abc</p>", 0, 3);
    editor
        .run_command("text_style.set_font_size", Some(serde_json::json!({ "size": "20px" })))
        .unwrap();
    assert_eq!(editor.html(), "<p><span style=\"font-size: 20px\">abc</span></p>");

    editor
        .run_command("text_style.set_font_size", Some(serde_json::json!({ "size": "" })))
        .unwrap();
    assert_eq!(editor.html(), "<p>abc</p>");
}

#[test]
fn font_size_steps_from_default_and_never_below_minimum() {
    let mut editor = editor_with_selection("<p>abc</p>", 0, 3);
    editor.run_command("text_style.increase_font_size", None).unwrap();
    assert_eq!(editor.html(), "<p><span style=\"font-size: 17px\">abc</span></p>");

    editor
        .run_command("text_style.set_font_size", Some(serde_json::json!({ "size": 1 })))
        .unwrap();
    editor.run_command("text_style.decrease_font_size", None).unwrap();
    assert_eq!(editor.html(), "<p><span style=\"font-size: 1px\">abc</span></p>");
}

#[test]
fn font_size_applies_to_part_of_a_run() {
    let mut editor = editor_with_selection("<p>abcdef</p>", 2, 4);
    editor
        .run_command("text_style.set_font_size", Some(serde_json::json!({ "size": 24 })))
        .unwrap();
    assert_eq!(
        editor.html(),
        "<p>ab<span style=\"font-size: 24px\">cd</span>ef</p>"
    );
}

#[test]
fn multi_word_families_are_quoted() {
    let mut editor = editor_with_selection("<p>abc</p>", 0, 3);
    editor
        .run_command(
            "text_style.set_font_family",
            Some(serde_json::json!({ "family": "Times New Roman" })),
        )
        .unwrap();
    assert_eq!(
        editor.html(),
        "<p><span style=\"font-family: 'Times New Roman'\">abc</span></p>"
    );

    let reparsed = Editor::from_html(&editor.html(), EditorConfig::default());
    assert_eq!(reparsed.html(), editor.html());
}

#[test]
fn text_color_sets_and_unsets_without_touching_size() {
    let mut editor = editor_with_selection(
        "<p><span style=\"font-size: 18px\">abc</span></p>",
        0,
        3,
    );
    editor
        .run_command("text_style.set_color", Some(serde_json::json!({ "color": "#dc2626" })))
        .unwrap();
    assert_eq!(
        editor.html(),
        "<p><span style=\"font-size: 18px; color: #dc2626\">abc</span></p>"
    );

    editor.run_command("text_style.unset_color", None).unwrap();
    assert_eq!(editor.html(), "<p><span style=\"font-size: 18px\">abc</span></p>");
}

#[test]
fn unsafe_color_is_ignored() {
    let mut editor = editor_with_selection("<p>abc</p>", 0, 3);
    editor
        .run_command(
            "text_style.set_color",
            Some(serde_json::json!({ "color": "red; background: url(x)" })),
        )
        .unwrap();
    assert_eq!(editor.html(), "<p>abc</p>");
}
