use std::path::PathBuf;

use lawsite_editor::{insert_image_file, Editor, Point, Selection, ToolbarAction};
use serde::Deserialize;
use serde_json::{json, Value};

/// One user interaction replayed against the editor.
#[derive(Debug, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Put a collapsed caret at a text position.
    Caret { path: Vec<usize>, offset: usize },
    Select { anchor: Point, focus: Point },
    /// Select a block image or rule.
    SelectNode { path: Vec<usize> },
    Type { text: String },
    Backspace,
    Enter,
    /// A toolbar button, with the value a picker or prompt would supply.
    Action {
        action: ToolbarAction,
        #[serde(default)]
        args: Option<Value>,
    },
    /// Any registered command, bypassing the toolbar.
    Command {
        id: String,
        #[serde(default)]
        args: Option<Value>,
    },
    /// Pick an image from disk.
    ImageFile { path: PathBuf },
    /// The host switched to a different record.
    Reset { html: String },
}

impl Step {
    pub fn run(self, editor: &mut Editor) {
        match self {
            Step::Caret { path, offset } => {
                editor.set_selection(Selection::collapsed(Point::new(path, offset)));
            }
            Step::Select { anchor, focus } => editor.set_selection(Selection { anchor, focus }),
            Step::SelectNode { path } => editor.set_selection(Selection::node(path)),
            Step::Type { text } => command(editor, "text.insert", Some(json!({ "text": text }))),
            Step::Backspace => command(editor, "text.delete_backward", None),
            Step::Enter => command(editor, "text.split_block", None),
            Step::Action { action, args } => {
                let changed = editor.execute(action, args);
                tracing::info!(?action, changed, "toolbar action");
            }
            Step::Command { id, args } => command(editor, &id, args),
            Step::ImageFile { path } => {
                if let Err(err) = smol::block_on(insert_image_file(editor, &path)) {
                    tracing::warn!(path = %path.display(), %err, "image was not inserted");
                }
            }
            Step::Reset { html } => editor.reset_content(&html),
        }
    }
}

fn command(editor: &mut Editor, id: &str, args: Option<Value>) {
    if let Err(err) = editor.run_command(id, args) {
        tracing::warn!(id, kind = ?err.kind(), %err, "command failed");
    }
}

#[cfg(test)]
mod tests {
    use lawsite_editor::EditorConfig;

    use super::*;

    #[test]
    fn demo_script_replays() {
        let steps: Vec<Step> = serde_json::from_str(include_str!("../demo/script.json")).unwrap();
        assert!(matches!(
            steps[5],
            Step::Action {
                action: ToolbarAction::Align(_),
                args: None
            }
        ));

        let mut editor =
            Editor::from_html(include_str!("../demo/record.html"), EditorConfig::default());
        for step in steps {
            step.run(&mut editor);
        }
        let html = editor.html();
        assert!(html.starts_with("<h2 style=\"text-align: center\">Hizmetlerimiz</h2>"));
        assert!(html.contains("<strong>"));
        assert!(html.contains("<h3>"));
        assert!(html.contains(
            "border-bottom-width: 2px; border-bottom-style: solid; border-bottom-color: #1f2937"
        ));
    }

    #[test]
    fn steps_parse_from_their_json_form() {
        let step: Step = serde_json::from_value(serde_json::json!({
            "step": "action",
            "action": { "heading": 2 }
        }))
        .unwrap();
        assert!(matches!(
            step,
            Step::Action {
                action: ToolbarAction::Heading(2),
                ..
            }
        ));

        let step: Step = serde_json::from_value(serde_json::json!({ "step": "backspace" })).unwrap();
        assert!(matches!(step, Step::Backspace));
    }
}
