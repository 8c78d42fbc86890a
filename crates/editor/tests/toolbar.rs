use std::collections::HashSet;

use lawsite_editor::{
    Alignment, Editor, EditorConfig, MarkKind, Point, Selection, ToolbarAction,
    ToolbarController, ToolbarState,
};

#[test]
fn every_action_maps_to_a_registered_command() {
    let editor = Editor::from_html("", EditorConfig::default());
    let mut glyphs = HashSet::new();
    for action in ToolbarAction::all() {
        assert!(
            editor.registry().command(action.command()).is_some(),
            "{action:?} -> {}",
            action.command()
        );
        assert!(!action.title().is_empty());
        assert!(!action.glyph().is_empty());
        glyphs.insert((action.glyph(), action.title()));
    }
    assert_eq!(glyphs.len(), ToolbarAction::all().len());
}

#[test]
fn actions_serialize_as_snake_case() {
    assert_eq!(
        serde_json::to_value(ToolbarAction::Heading(2)).unwrap(),
        serde_json::json!({ "heading": 2 })
    );
    assert_eq!(
        serde_json::to_value(ToolbarAction::Align(Alignment::Justify)).unwrap(),
        serde_json::json!({ "align": "justify" })
    );
    let action: ToolbarAction = serde_json::from_str("\"add_row_after\"").unwrap();
    assert_eq!(action, ToolbarAction::AddRowAfter);
}

#[test]
fn state_reflects_marks_and_text_style_at_the_caret() {
    let mut editor = Editor::from_html(
        "<p><strong><span style=\"font-size: 18px; font-family: Arial; color: #ff0000\">kalın</span></strong> düz</p>",
        EditorConfig::default(),
    );
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 0], 2)));

    let state = ToolbarState::compute(&editor);
    assert!(state.active_marks.contains(&MarkKind::Bold));
    assert_eq!(state.font_size, Some(18));
    assert_eq!(state.font_family.as_deref(), Some("Arial"));
    assert_eq!(state.color.as_deref(), Some("#ff0000"));
    assert_eq!(state.active_node_type.as_deref(), Some("paragraph"));
    assert!(ToolbarAction::Bold.is_active(&state));
    assert!(!ToolbarAction::Italic.is_active(&state));
    assert!(ToolbarAction::Paragraph.is_active(&state));

    editor.set_selection(Selection::collapsed(Point::new(vec![0, 1], 2)));
    let state = ToolbarState::compute(&editor);
    assert!(state.active_marks.is_empty());
    assert_eq!(state.font_size, None);
}

#[test]
fn range_state_shows_only_marks_shared_by_every_run() {
    let mut editor = Editor::from_html(
        "<p><strong><em>ab</em></strong><strong>cd</strong></p>",
        EditorConfig::default(),
    );
    editor.set_selection(Selection {
        anchor: Point::new(vec![0, 0], 0),
        focus: Point::new(vec![0, 1], 2),
    });
    let state = ToolbarState::compute(&editor);
    assert_eq!(state.active_marks.iter().copied().collect::<Vec<_>>(), vec![MarkKind::Bold]);
}

#[test]
fn heading_and_alignment_state() {
    let mut editor = Editor::from_html(
        "<h2 style=\"text-align: center\">Başlık</h2>",
        EditorConfig::default(),
    );
    let state = ToolbarState::compute(&editor);
    assert_eq!(state.heading_level, Some(2));
    assert_eq!(state.alignment, "center");
    assert!(state.can_align);
    assert!(ToolbarAction::Heading(2).is_active(&state));
    assert!(!ToolbarAction::Heading(1).is_active(&state));
    assert!(ToolbarAction::Align(Alignment::Center).is_active(&state));

    assert!(editor.execute(ToolbarAction::Align(Alignment::Right), None));
    assert_eq!(
        editor.html(),
        "<h2 style=\"text-align: right\">Başlık</h2>"
    );
}

#[test]
fn alignment_is_disabled_inside_table_cells() {
    let mut editor = Editor::from_html("", EditorConfig::default());
    editor.execute(ToolbarAction::InsertTable, None);

    let state = ToolbarState::compute(&editor);
    assert!(state.is_table_cell_selected);
    assert!(!state.can_align);
    assert!(!state.can_insert_table);
    assert!(!ToolbarAction::Align(Alignment::Center).is_enabled(&state));
    assert!(!ToolbarAction::InsertTable.is_enabled(&state));
    assert!(ToolbarAction::DeleteTable.is_enabled(&state));

    let before = editor.html();
    assert!(!editor.execute(ToolbarAction::Align(Alignment::Center), None));
    assert_eq!(editor.html(), before);
}

#[test]
fn image_selection_state() {
    let mut editor = Editor::from_html("<p>metin</p>", EditorConfig::default());
    let state = ToolbarState::compute(&editor);
    assert!(!state.is_image_selected);
    assert!(!ToolbarAction::SetImageBorder.is_enabled(&state));

    editor.execute(
        ToolbarAction::InsertImage,
        Some(serde_json::json!({ "src": "a.png" })),
    );
    let state = ToolbarState::compute(&editor);
    assert!(state.is_image_selected);
    assert_eq!(state.active_node_type.as_deref(), Some("image"));
    assert!(ToolbarAction::SetImageBorder.is_enabled(&state));
    assert!(!ToolbarAction::Bold.is_enabled(&state));
}

#[test]
fn undo_redo_enabled_state_follows_history() {
    let mut editor = Editor::from_html("<p>x</p>", EditorConfig::default());
    let state = ToolbarState::compute(&editor);
    assert!(!ToolbarAction::Undo.is_enabled(&state));
    assert!(!ToolbarAction::Redo.is_enabled(&state));

    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "y" })))
        .unwrap();
    let state = ToolbarState::compute(&editor);
    assert!(ToolbarAction::Undo.is_enabled(&state));
    assert!(!ToolbarAction::Redo.is_enabled(&state));
}

#[test]
fn placeholder_and_character_count() {
    let mut editor = Editor::from_html("", EditorConfig::default());
    let state = ToolbarState::compute(&editor);
    assert_eq!(state.placeholder.as_deref(), Some("Buraya yazmaya başlayın…"));
    assert_eq!(state.character_count, 0);

    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "Şirket" })))
        .unwrap();
    let state = ToolbarState::compute(&editor);
    assert_eq!(state.placeholder, None);
    assert_eq!(state.character_count, 6);
    assert_eq!(
        editor.run_query::<usize>("doc.character_count", None).unwrap(),
        6
    );
}

#[test]
fn controller_recomputes_on_every_change_and_detaches_cleanly() {
    let mut editor = Editor::from_html("<p>abc</p>", EditorConfig::default());
    let subscriptions = editor.subscription_count();

    let toolbar = ToolbarController::attach(&mut editor);
    assert_eq!(toolbar.render_count(), 1);
    assert!(editor.subscription_count() > subscriptions);

    editor.set_selection(Selection {
        anchor: Point::new(vec![0, 0], 0),
        focus: Point::new(vec![0, 0], 3),
    });
    let after_select = toolbar.render_count();
    assert!(after_select > 1);
    assert!(!toolbar.state().unwrap().active_marks.contains(&MarkKind::Bold));

    editor.execute(ToolbarAction::Bold, None);
    assert!(toolbar.render_count() > after_select);
    let state = toolbar.state().unwrap();
    assert!(state.active_marks.contains(&MarkKind::Bold));
    assert!(state.can_undo);
    assert_eq!(state, ToolbarState::compute(&editor));

    editor.execute(ToolbarAction::Undo, None);
    assert_eq!(toolbar.state().unwrap(), ToolbarState::compute(&editor));
    assert!(!toolbar.state().unwrap().active_marks.contains(&MarkKind::Bold));

    toolbar.detach(&mut editor);
    assert_eq!(editor.subscription_count(), subscriptions);
}

#[test]
fn controller_tracks_stored_marks_at_a_caret() {
    let mut editor = Editor::from_html("", EditorConfig::default());
    let toolbar = ToolbarController::attach(&mut editor);

    editor.execute(ToolbarAction::Italic, None);
    assert!(toolbar.state().unwrap().active_marks.contains(&MarkKind::Italic));

    toolbar.detach(&mut editor);
}

#[test]
fn controller_keeps_the_last_notice() {
    let mut editor = Editor::from_html("<p>metin</p>", EditorConfig::default());
    let toolbar = ToolbarController::attach(&mut editor);
    assert_eq!(toolbar.last_notice(), None);

    editor.execute(ToolbarAction::SetImageDimensions, Some(serde_json::json!({ "width": "10px" })));
    assert_eq!(
        toolbar.last_notice().as_deref(),
        Some("Lütfen önce bir resim seçin")
    );
    toolbar.detach(&mut editor);
}

#[test]
fn execute_merges_caller_arguments_over_presets() {
    let mut editor = Editor::from_html("<p>x</p>", EditorConfig::default());
    assert!(editor.execute(
        ToolbarAction::Heading(1),
        Some(serde_json::json!({ "level": 3 }))
    ));
    assert!(editor.html().starts_with("<h3>"));
}

#[test]
fn list_state_and_indent_availability() {
    let mut editor = Editor::from_html(
        "<ul><li><p>bir</p></li><li><p>iki</p></li></ul>",
        EditorConfig::default(),
    );
    let state = ToolbarState::compute(&editor);
    assert_eq!(state.list_type.as_deref(), Some("bullet_list"));
    assert!(ToolbarAction::BulletList.is_active(&state));
    assert!(!ToolbarAction::OrderedList.is_active(&state));
    assert!(!state.can_sink_list_item);
    assert!(ToolbarAction::Outdent.is_enabled(&state));

    editor.set_selection(Selection::collapsed(Point::new(vec![0, 1, 0, 0], 0)));
    let state = ToolbarState::compute(&editor);
    assert!(state.can_sink_list_item);
    assert!(ToolbarAction::Indent.is_enabled(&state));
}
