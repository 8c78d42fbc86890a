use std::cell::RefCell;
use std::rc::Rc;

use lawsite_editor::{
    insert_image_file, read_image_data_url, CommandErrorKind, Editor, EditorConfig, EditorEvent,
    EventKind, ImageLoadError, PendingImage, Point, Selection, ToolbarAction,
};

fn editor_with_image() -> Editor {
    let mut editor = Editor::from_html("<p>metin</p>", EditorConfig::default());
    editor
        .run_command(
            "image.insert",
            Some(serde_json::json!({ "src": "https://example.com/a.png", "alt": "Logo" })),
        )
        .unwrap();
    editor
}

fn collect_notices(editor: &mut Editor) -> Rc<RefCell<Vec<String>>> {
    let notices = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&notices);
    editor.subscribe(EventKind::Notice, move |_editor, event| {
        if let EditorEvent::Notice { message } = event {
            sink.borrow_mut().push(message.clone());
        }
    });
    notices
}

#[test]
fn insert_image_by_url_selects_it() {
    let editor = editor_with_image();
    assert_eq!(
        editor.html(),
        "<p>metin</p><img src=\"https://example.com/a.png\" alt=\"Logo\"><p></p>"
    );
    assert_eq!(editor.selection(), &Selection::node(vec![1]));
    assert!(editor.run_query::<bool>("image.selected", None).unwrap());

    let attrs: serde_json::Value = editor.run_query("image.attrs", None).unwrap();
    assert_eq!(attrs["src"], "https://example.com/a.png");
}

#[test]
fn image_dimensions_are_set_and_unset() {
    let mut editor = editor_with_image();
    editor
        .run_command(
            "image.set_dimensions",
            Some(serde_json::json!({ "width": "50%", "height": 200 })),
        )
        .unwrap();
    assert!(editor.html().contains(
        "<img src=\"https://example.com/a.png\" alt=\"Logo\" width=\"50%\" height=\"200\">"
    ));

    editor
        .run_command("image.set_dimensions", Some(serde_json::json!({ "height": "" })))
        .unwrap();
    assert!(editor.html().contains(
        "<img src=\"https://example.com/a.png\" alt=\"Logo\" width=\"50%\">"
    ));
}

#[test]
fn image_border_is_set_and_cleared() {
    let mut editor = editor_with_image();
    editor.execute(
        ToolbarAction::SetImageBorder,
        Some(serde_json::json!({ "color": "#111827", "width": "2px", "style": "solid", "radius": "8px" })),
    );
    assert!(editor.html().contains(
        "style=\"border-color: #111827; border-width: 2px; border-style: solid; border-radius: 8px\""
    ));

    let reparsed = Editor::from_html(&editor.html(), EditorConfig::default());
    assert_eq!(reparsed.html(), editor.html());

    editor.execute(ToolbarAction::ClearImageBorder, None);
    assert!(editor.html().contains("<img src=\"https://example.com/a.png\" alt=\"Logo\">"));
}

#[test]
fn image_commands_without_a_selected_image_notify_the_author() {
    let mut editor = Editor::from_html("<p>metin</p>", EditorConfig::default());
    let notices = collect_notices(&mut editor);

    let err = editor
        .run_command("image.set_border", Some(serde_json::json!({ "color": "red" })))
        .unwrap_err();
    assert_eq!(err.kind(), CommandErrorKind::Inapplicable);
    assert!(!editor.execute(ToolbarAction::ClearImageBorder, None));

    assert_eq!(
        notices.borrow().as_slice(),
        ["Lütfen önce bir resim seçin", "Lütfen önce bir resim seçin"]
    );
    assert_eq!(editor.html(), "<p>metin</p>");
}

#[test]
fn unsafe_sources_are_rejected() {
    let mut editor = Editor::from_html("<p>metin</p>", EditorConfig::default());
    for src in ["", "  ", "javascript:alert(1)", "x.png\" onerror=\"alert(1)"] {
        let err = editor
            .run_command("image.insert", Some(serde_json::json!({ "src": src })))
            .unwrap_err();
        assert_eq!(err.kind(), CommandErrorKind::InvalidArgs, "{src:?}");
    }
    assert_eq!(editor.html(), "<p>metin</p>");
}

#[test]
fn dropped_images_are_inserted_in_order() {
    let mut editor = Editor::from_html("", EditorConfig::default());
    editor.execute(
        ToolbarAction::InsertImages,
        Some(serde_json::json!({
            "images": ["a.png", { "src": "b.png", "alt": "B" }],
        })),
    );
    assert_eq!(
        editor.html(),
        "<img src=\"a.png\"><img src=\"b.png\" alt=\"B\"><p></p>"
    );
    assert_eq!(editor.selection(), &Selection::node(vec![1]));
}

#[test]
fn typing_on_a_selected_image_starts_a_paragraph_after_it() {
    let mut editor = editor_with_image();
    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "altyazı" })))
        .unwrap();
    assert_eq!(
        editor.html(),
        "<p>metin</p><img src=\"https://example.com/a.png\" alt=\"Logo\"><p>altyazı</p><p></p>"
    );
}

#[test]
fn backspace_removes_a_selected_image() {
    let mut editor = editor_with_image();
    editor.run_command("text.delete_backward", None).unwrap();
    assert_eq!(editor.html(), "<p>metin</p><p></p>");
}

fn temp_image(name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("lawsite-editor-{}-{name}", std::process::id()));
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn image_files_are_read_as_data_urls() {
    let path = temp_image("pixel.png", &[0x89, b'P', b'N', b'G']);
    let url = smol::block_on(read_image_data_url(&path)).unwrap();
    assert_eq!(url, "data:image/png;base64,iVBORw==");
    std::fs::remove_file(path).unwrap();

    let err = smol::block_on(read_image_data_url("notes.txt")).unwrap_err();
    assert!(matches!(err, ImageLoadError::NotAnImage { .. }));

    let err = smol::block_on(read_image_data_url("/definitely/not/here.png")).unwrap_err();
    assert!(matches!(err, ImageLoadError::NotFound(_)));
}

#[test]
fn image_file_is_inserted_at_the_caret() {
    let path = temp_image("logo.png", &[0x89, b'P', b'N', b'G']);
    let mut editor = Editor::from_html("<p>metin</p>", EditorConfig::default());
    smol::block_on(insert_image_file(&mut editor, &path)).unwrap();
    std::fs::remove_file(&path).unwrap();

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap().to_string();
    assert_eq!(
        editor.html(),
        format!("<p>metin</p><img src=\"data:image/png;base64,iVBORw==\" alt=\"{stem}\"><p></p>")
    );
}

#[test]
fn missing_image_file_leaves_the_document_alone() {
    let mut editor = Editor::from_html("<p>metin</p>", EditorConfig::default());
    let notices = collect_notices(&mut editor);
    let result = smol::block_on(insert_image_file(&mut editor, "/definitely/not/here.png"));
    assert!(result.is_err());
    assert_eq!(editor.html(), "<p>metin</p>");
    assert_eq!(notices.borrow().len(), 1);
}

#[test]
fn pending_image_restores_the_captured_selection_when_nothing_changed() {
    let mut editor = Editor::from_html("<p>bir</p><p>iki</p>", EditorConfig::default());
    let pending = PendingImage::new(&editor);

    editor.set_selection(Selection::collapsed(Point::new(vec![1, 0], 0)));
    pending.finish(&mut editor, "x.png".to_string(), None).unwrap();

    assert_eq!(editor.html(), "<p>bir</p><img src=\"x.png\"><p>iki</p>");
}

#[test]
fn pending_image_uses_the_current_selection_after_an_edit() {
    let mut editor = Editor::from_html("<p>bir</p><p>iki</p>", EditorConfig::default());
    let pending = PendingImage::new(&editor);

    editor.set_selection(Selection::collapsed(Point::new(vec![1, 0], 3)));
    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "!" })))
        .unwrap();
    pending.finish(&mut editor, "x.png".to_string(), None).unwrap();

    assert_eq!(
        editor.html(),
        "<p>bir</p><p>iki!</p><img src=\"x.png\"><p></p>"
    );
}
