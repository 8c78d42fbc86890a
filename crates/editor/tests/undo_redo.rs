use lawsite_editor::{
    CommandErrorKind, Document, Editor, EditorConfig, Node, Op, PluginRegistry, Point, Selection,
    ToolbarAction, Transaction,
};

fn editor_with_text(text: &str) -> Editor {
    let doc = Document {
        children: vec![Node::paragraph(text)],
    };
    let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
    Editor::new(doc, selection, PluginRegistry::core())
}

#[test]
fn undo_on_empty_history_is_a_no_op() {
    let mut editor = Editor::from_html("", EditorConfig::default());
    assert!(!editor.can_undo());
    assert!(!editor.undo());
    assert!(!editor.can_undo());
    assert_eq!(editor.html(), "<p></p>");

    let err = editor.run_command("history.undo", None).unwrap_err();
    assert_eq!(err.kind(), CommandErrorKind::Inapplicable);
    assert!(!editor.execute(ToolbarAction::Undo, None));
}

#[test]
fn one_transaction_undoes_to_the_exact_previous_html() {
    let mut editor = Editor::from_html("<p>Merhaba</p>", EditorConfig::default());
    let before = editor.html();
    editor.set_selection(Selection {
        anchor: Point::new(vec![0, 0], 0),
        focus: Point::new(vec![0, 0], 7),
    });

    editor.execute(ToolbarAction::Underline, None);
    assert!(editor.can_undo());
    assert_eq!(editor.html(), "<p><u>Merhaba</u></p>");

    assert!(editor.execute(ToolbarAction::Undo, None));
    assert_eq!(editor.html(), before);
    assert!(!editor.can_undo());
    assert!(editor.can_redo());

    assert!(editor.execute(ToolbarAction::Redo, None));
    assert_eq!(editor.html(), "<p><u>Merhaba</u></p>");
    assert!(!editor.can_redo());
}

#[test]
fn undo_restores_the_selection_before_the_change() {
    let mut editor = editor_with_text("");

    let tx = Transaction::new(vec![
        Op::InsertText {
            path: vec![0, 0],
            offset: 0,
            text: "a".to_string(),
        },
        Op::InsertText {
            path: vec![0, 0],
            offset: 1,
            text: "b".to_string(),
        },
    ])
    .selection_after(Selection::collapsed(Point::new(vec![0, 0], 2)))
    .source("test:multi_insert");

    editor.apply(tx).unwrap();
    assert_eq!(editor.doc().children, vec![Node::paragraph("ab")]);
    assert_eq!(editor.selection().focus.offset, 2);

    assert!(editor.undo());
    assert_eq!(editor.doc().children, vec![Node::paragraph("")]);
    assert_eq!(editor.selection().focus.offset, 0);

    assert!(editor.redo());
    assert_eq!(editor.doc().children, vec![Node::paragraph("ab")]);
    assert_eq!(editor.selection().focus.offset, 2);
}

#[test]
fn a_new_change_clears_redo() {
    let mut editor = editor_with_text("");
    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "a" })))
        .unwrap();
    editor.undo();
    assert!(editor.can_redo());

    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "b" })))
        .unwrap();
    assert!(!editor.can_redo());
    assert_eq!(editor.doc().children, vec![Node::paragraph("b")]);
}

#[test]
fn rejected_transactions_leave_no_trace() {
    let mut editor = editor_with_text("abc");
    let revision = editor.revision();

    let tx = Transaction::new(vec![
        Op::InsertText {
            path: vec![0, 0],
            offset: 3,
            text: "d".to_string(),
        },
        Op::RemoveNode { path: vec![5] },
    ]);
    assert!(editor.apply(tx).is_err());

    assert_eq!(editor.doc().children, vec![Node::paragraph("abc")]);
    assert_eq!(editor.revision(), revision);
    assert!(!editor.can_undo());
}

#[test]
fn structural_violations_are_rejected_in_full() {
    let mut editor = editor_with_text("abc");
    let block_in_text = Transaction::new(vec![Op::InsertNode {
        path: vec![0, 1],
        node: Node::paragraph("nested"),
    }]);
    assert!(editor.apply(block_in_text).is_err());
    assert_eq!(editor.doc().children, vec![Node::paragraph("abc")]);
}

#[test]
fn history_is_capped_by_config() {
    let config = EditorConfig {
        max_undo: 2,
        ..EditorConfig::default()
    };
    let mut editor = Editor::from_html("<p></p>", config);
    for text in ["a", "b", "c"] {
        editor
            .run_command("text.insert", Some(serde_json::json!({ "text": text })))
            .unwrap();
    }
    assert!(editor.undo());
    assert!(editor.undo());
    assert!(!editor.undo());
    assert_eq!(editor.html(), "<p>a</p>");
}

#[test]
fn core_registry_only_knows_core_commands() {
    let mut core = Editor::with_core_plugins();
    let err = core.run_command("marks.toggle_bold", None).unwrap_err();
    assert_eq!(err.kind(), CommandErrorKind::Unknown);
    core.run_command("text.insert", Some(serde_json::json!({ "text": "a" })))
        .unwrap();
    assert_eq!(core.html(), "<p>a</p>");

    let mut rich = Editor::with_richtext_plugins();
    rich.run_command("marks.toggle_bold", None).unwrap();
    rich.run_command("text.insert", Some(serde_json::json!({ "text": "a" })))
        .unwrap();
    assert_eq!(rich.html(), "<p><strong>a</strong></p>");
}
