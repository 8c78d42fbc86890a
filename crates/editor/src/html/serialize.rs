use super::{escape_attr, escape_text};
use crate::config::EditorConfig;
use crate::core::{kind, Attrs, Document, ElementNode, Marks, Node};
use crate::plugin::PluginRegistry;
use crate::schema::{is_safe_style_value, is_safe_url, render_style, RenderedAttrs};

#[derive(Debug, Clone, PartialEq)]
pub struct HtmlOptions {
    /// Border declaration for table cells without explicit border attributes.
    pub default_cell_border: String,
}

impl HtmlOptions {
    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            default_cell_border: config.default_cell_border.clone(),
        }
    }
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

/// Deterministic HTML for a document. Parsing the output and serializing it
/// again gives the same bytes.
pub fn serialize(doc: &Document, registry: &PluginRegistry, options: &HtmlOptions) -> String {
    let mut writer = Writer {
        registry,
        options,
        out: String::new(),
    };
    for node in &doc.children {
        writer.block(node);
    }
    writer.out
}

struct Writer<'a> {
    registry: &'a PluginRegistry,
    options: &'a HtmlOptions,
    out: String,
}

impl Writer<'_> {
    fn block(&mut self, node: &Node) {
        match node {
            Node::Element(el) => self.element(el),
            Node::Void(v) => match v.kind.as_str() {
                kind::HORIZONTAL_RULE => self.out.push_str("<hr>"),
                kind::IMAGE => {
                    let rendered = self.rendered(kind::IMAGE, &v.attrs);
                    self.open("img", &rendered);
                }
                kind::HARD_BREAK => self.out.push_str("<br>"),
                _ => {}
            },
            Node::Text(t) => {
                // Stray text outside a block; keep it readable.
                self.out.push_str("<p>");
                escape_text(&t.text, &mut self.out);
                self.out.push_str("</p>");
            }
        }
    }

    fn element(&mut self, el: &ElementNode) {
        match el.kind.as_str() {
            kind::PARAGRAPH => {
                let rendered = self.rendered(kind::PARAGRAPH, &el.attrs);
                self.open("p", &rendered);
                self.inline(&el.children);
                self.out.push_str("</p>");
            }
            kind::HEADING => {
                let level = el.attr_u64("level").unwrap_or(1).clamp(1, 6);
                let tag = format!("h{level}");
                let rendered = self.rendered(kind::HEADING, &el.attrs);
                self.open(&tag, &rendered);
                self.inline(&el.children);
                self.out.push_str(&format!("</{tag}>"));
            }
            kind::BLOCKQUOTE => self.wrap_blocks("blockquote", &RenderedAttrs::default(), &el.children),
            kind::BULLET_LIST => self.wrap_blocks("ul", &RenderedAttrs::default(), &el.children),
            kind::ORDERED_LIST => {
                let mut rendered = RenderedAttrs::default();
                if let Some(start) = el.attr_u64("start").filter(|s| *s != 1) {
                    rendered.attr("start", start.to_string());
                }
                self.wrap_blocks("ol", &rendered, &el.children);
            }
            kind::LIST_ITEM => self.wrap_blocks("li", &RenderedAttrs::default(), &el.children),
            kind::CODE_BLOCK => {
                self.out.push_str("<pre>");
                let mut rendered = RenderedAttrs::default();
                if let Some(language) = el.attr_str("language").filter(|l| !l.is_empty()) {
                    rendered.attr("class", format!("language-{language}"));
                }
                self.open("code", &rendered);
                escape_text(&el.inline_text(), &mut self.out);
                self.out.push_str("</code></pre>");
            }
            kind::TABLE => {
                let mut rendered = RenderedAttrs::default();
                rendered.style("border-collapse", "collapse");
                self.open("table", &rendered);
                self.out.push_str("<tbody>");
                for row in &el.children {
                    self.block(row);
                }
                self.out.push_str("</tbody></table>");
            }
            kind::TABLE_ROW => self.wrap_blocks("tr", &RenderedAttrs::default(), &el.children),
            kind::TABLE_CELL | kind::TABLE_HEADER => {
                let tag = if el.kind == kind::TABLE_HEADER { "th" } else { "td" };
                let mut rendered = self.rendered(&el.kind, &el.attrs);
                if !rendered.has_style_prefix("border") {
                    rendered.style("border", self.options.default_cell_border.clone());
                }
                self.wrap_blocks(tag, &rendered, &el.children);
            }
            _ => {
                for child in &el.children {
                    self.block(child);
                }
            }
        }
    }

    fn wrap_blocks(&mut self, tag: &str, rendered: &RenderedAttrs, children: &[Node]) {
        self.open(tag, rendered);
        for child in children {
            self.block(child);
        }
        self.out.push_str(&format!("</{tag}>"));
    }

    fn rendered(&self, kind: &str, attrs: &Attrs) -> RenderedAttrs {
        let mut rendered = RenderedAttrs::default();
        for spec in self.registry.attributes_for(kind) {
            if let Some(value) = attrs.get(&spec.key).filter(|v| !v.is_null()) {
                (spec.render)(value, &mut rendered);
            }
        }
        rendered
    }

    fn open(&mut self, tag: &str, rendered: &RenderedAttrs) {
        self.out.push('<');
        self.out.push_str(tag);
        for (name, value) in &rendered.attrs {
            self.out.push(' ');
            self.out.push_str(name);
            self.out.push_str("=\"");
            escape_attr(value, &mut self.out);
            self.out.push('"');
        }
        if !rendered.style.is_empty() {
            self.out.push_str(" style=\"");
            escape_attr(&render_style(&rendered.style), &mut self.out);
            self.out.push('"');
        }
        self.out.push('>');
    }

    fn inline(&mut self, children: &[Node]) {
        for child in children {
            match child {
                Node::Text(t) if t.text.is_empty() => {}
                Node::Text(t) => {
                    let tags = self.mark_tags(&t.marks);
                    for (open, _) in &tags {
                        self.out.push_str(open);
                    }
                    escape_text(&t.text, &mut self.out);
                    for (_, close) in tags.iter().rev() {
                        self.out.push_str(close);
                    }
                }
                Node::Void(v) if v.kind == kind::HARD_BREAK => self.out.push_str("<br>"),
                Node::Void(_) | Node::Element(_) => {}
            }
        }
    }

    /// Opening and closing tags for a run, outermost first.
    fn mark_tags(&self, marks: &Marks) -> Vec<(String, &'static str)> {
        let mut tags: Vec<(String, &'static str)> = Vec::new();

        if let Some(link) = marks.link.as_ref().filter(|l| is_safe_url(&l.href)) {
            let mut rendered = RenderedAttrs::default();
            rendered.attr("href", link.href.as_str());
            if let Some(target) = &link.target {
                rendered.attr("target", target.as_str());
                if target == "_blank" {
                    rendered.attr("rel", "noopener noreferrer");
                }
            }
            tags.push((self.open_tag("a", &rendered), "</a>"));
        }

        if !marks.text_style.is_empty() {
            let rendered = self.rendered(kind::TEXT_STYLE, &marks.text_style);
            if !rendered.is_empty() {
                tags.push((self.open_tag("span", &rendered), "</span>"));
            }
        }

        if let Some(highlight) = &marks.highlight {
            let mut rendered = RenderedAttrs::default();
            if let Some(color) = highlight.color.as_deref().filter(|c| is_safe_style_value(c)) {
                rendered.attr("data-color", color);
                rendered.style("background-color", color);
                rendered.style("color", "inherit");
            }
            tags.push((self.open_tag("mark", &rendered), "</mark>"));
        }

        let simple: [(bool, &str, &'static str); 7] = [
            (marks.bold, "<strong>", "</strong>"),
            (marks.italic, "<em>", "</em>"),
            (marks.underline, "<u>", "</u>"),
            (marks.strike, "<s>", "</s>"),
            (marks.code, "<code>", "</code>"),
            (marks.subscript, "<sub>", "</sub>"),
            (marks.superscript && !marks.subscript, "<sup>", "</sup>"),
        ];
        for (active, open, close) in simple {
            if active {
                tags.push((open.to_string(), close));
            }
        }
        tags
    }

    fn open_tag(&self, tag: &str, rendered: &RenderedAttrs) -> String {
        let mut writer = Writer {
            registry: self.registry,
            options: self.options,
            out: String::new(),
        };
        writer.open(tag, rendered);
        writer.out
    }
}

