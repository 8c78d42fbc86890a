use lawsite_editor::{Editor, EditorConfig, Node, Point, Selection};

fn editor(html: &str) -> Editor {
    Editor::from_html(html, EditorConfig::default())
}

#[test]
fn empty_content_serializes_to_empty_paragraph() {
    let editor = editor("");
    assert_eq!(editor.html(), "<p></p>");
    assert!(editor.is_empty());

    let reparsed = self::editor(&editor.html());
    assert_eq!(reparsed.doc(), editor.doc());
    assert_eq!(reparsed.html(), "<p></p>");
}

#[test]
fn serialized_html_is_a_fixed_point() {
    let source = concat!(
        "<h2>Hizmetlerimiz</h2>",
        "<p style=\"text-align: center\">Ceza <strong>hukuku</strong> ve ",
        "<a href=\"https://example.com\" target=\"_blank\">iş hukuku</a></p>",
        "<p><span style=\"font-size: 18px; font-family: Arial; color: #1f2937\">Büyük</span>",
        "<mark data-color=\"#fde68a\" style=\"background-color: #fde68a\">vurgu</mark>",
        "H<sub>2</sub>O<br>ikinci satır</p>",
        "<ul><li><p>bir</p></li><li><p>iki</p><ol><li><p>iç</p></li></ol></li></ul>",
        "<blockquote><p>alıntı</p></blockquote>",
        "<pre><code>fn main() {}\nlet x = 1;</code></pre>",
        "<hr>",
        "<img src=\"https://example.com/a.png\" alt=\"logo\" width=\"320\" ",
        "style=\"border-color: #000; border-width: 2px; border-style: solid\">",
        "<table><tr><th>Ad</th><th style=\"border-top: 2px dashed red\">Ücret</th></tr>",
        "<tr><td>Danışma</td><td>1000</td></tr></table>",
        "<p></p>",
    );

    let first = editor(source);
    let html = first.html();
    let second = editor(&html);

    assert_eq!(second.html(), html);
    assert_eq!(second.doc().canonical(), first.doc().canonical());
}

#[test]
fn typed_content_survives_a_reload() {
    let mut first = editor("<p></p><pre><code>x</code></pre>");
    first.set_selection(Selection::collapsed(Point::new(vec![0, 0], 0)));
    first
        .run_command(
            "text.insert",
            Some(serde_json::json!({ "text": "  önde\tsekme\r\nçift  boşluk \nşğü\rson " })),
        )
        .unwrap();
    first.set_selection(Selection::collapsed(Point::new(vec![1, 0], 1)));
    first
        .run_command("text.insert", Some(serde_json::json!({ "text": "\ty\r\nz" })))
        .unwrap();

    let html = first.html();
    assert!(!html.contains('\r'));
    assert!(html.contains("<code>x\ty\nz</code>"));

    let second = editor(&html);
    assert_eq!(second.html(), html);
    assert_eq!(second.doc().canonical(), first.doc().canonical());
}

#[test]
fn malformed_html_degrades_without_failing() {
    let editor = editor("<p>Merhaba <b>dünya");
    assert_eq!(editor.doc().text_content(), "Merhaba dünya");
    assert!(editor.html().contains("<strong>dünya</strong>"));

    let editor = self::editor("<div><unknown-tag foo=\"bar\">metin</unknown-tag></div>");
    assert_eq!(editor.doc().text_content(), "metin");
    assert!(!editor.html().contains("unknown-tag"));
}

#[test]
fn foreign_attributes_and_unsafe_styles_are_dropped() {
    let editor = editor(
        "<p onclick=\"alert(1)\" class=\"lead\"><span style=\"color: red; x: expression(1)\">Hi</span></p>",
    );
    let html = editor.html();
    assert!(!html.contains("onclick"));
    assert!(!html.contains("class="));
    assert!(!html.contains("expression"));
    assert!(html.contains("Hi"));
}

#[test]
fn script_urls_are_dropped_on_load() {
    let editor = editor(concat!(
        "<p><a href=\"javascript:alert(1)\">bir</a> ",
        "<a href=\" JAVA\tSCRIPT:alert(1)\">iki</a> ",
        "<a href=\"vbscript:msgbox\">üç</a></p>",
        "<img src=\"javascript:alert(1)\" alt=\"x\">",
    ));
    assert_eq!(editor.html(), "<p>bir iki üç</p>");

    let editor = self::editor(
        "<p><a href=\"mailto:ofis@example.com\">yaz</a></p><img src=\"/uploads/a.png\">",
    );
    let html = editor.html();
    assert!(html.contains("<a href=\"mailto:ofis@example.com\">yaz</a>"));
    assert!(html.contains("<img src=\"/uploads/a.png\""));
}

#[test]
fn tables_render_collapsed_borders_and_default_cell_border() {
    let editor = editor("<table><tr><td>a</td></tr></table>");
    let html = editor.html();
    assert!(html.contains("<table style=\"border-collapse: collapse\">"));
    assert!(html.contains("<td style=\"border: 1px solid #d1d5db\">"));
}

#[test]
fn default_cell_border_follows_config() {
    let config = EditorConfig {
        default_cell_border: "2px solid #000000".to_string(),
        ..EditorConfig::default()
    };
    let editor = Editor::from_html("<table><tr><td>a</td></tr></table>", config);
    assert!(editor.html().contains("<td style=\"border: 2px solid #000000\">"));
}

#[test]
fn malformed_font_size_in_html_is_ignored() {
    let editor = editor("<p><span style=\"font-size: huge\">metin</span></p>");
    assert_eq!(editor.html(), "<p>metin</p>");
}

#[test]
fn out_of_range_font_size_in_html_is_ignored() {
    let editor = editor(concat!(
        "<p><span style=\"font-size: 1e30px\">bir</span>",
        "<span style=\"font-size: 5000px\">iki</span>",
        "<span style=\"font-size: 4096px\">üç</span></p>",
    ));
    assert_eq!(
        editor.html(),
        "<p>biriki<span style=\"font-size: 4096px\">üç</span></p>"
    );
}

#[test]
fn reset_content_replaces_the_whole_document() {
    let mut editor = editor("<h1>Eski</h1><p>içerik</p>");
    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "x" })))
        .unwrap();
    assert!(editor.can_undo());

    editor.reset_content("<p>Yeni kayıt</p>");
    assert_eq!(editor.html(), "<p>Yeni kayıt</p>");
    assert!(!editor.can_undo());
    assert!(!editor.can_redo());
    assert!(matches!(&editor.doc().children[..], [Node::Element(_)]));
}

#[test]
fn config_loads_from_json_with_defaults() {
    let config = EditorConfig::from_json_str(r#"{ "default_font_size": 14, "max_undo": 0 }"#)
        .unwrap();
    assert_eq!(config.default_font_size, 14);
    assert_eq!(config.max_undo, EditorConfig::default().max_undo);
    assert_eq!(config.heading_font_size(1), Some(32));
    assert_eq!(config.heading_font_size(7), None);
}
