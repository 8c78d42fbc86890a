use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use serde_json::Value;

use crate::core::{kind, Attrs, Document, HighlightMark, LinkMark, Marks, Node, VoidNode};
use crate::plugin::PluginRegistry;
use crate::schema::{is_safe_style_value, is_safe_url, ElementView};

const NORMALIZE_LIMIT: usize = 100;

/// Marker for source-formatting whitespace (newlines, tabs) inside inline text.
const LAYOUT: char = '\n';

const SKIPPED: &[&str] = &[
    "script", "style", "head", "template", "noscript", "title", "meta", "link", "iframe",
    "object", "svg", "canvas", "video", "audio",
];

/// Elements that only separate paragraphs. Their children are read as if they
/// were written in place.
const BLOCK_TRANSPARENT: &[&str] = &[
    "html", "body", "div", "section", "article", "header", "footer", "main", "nav", "aside",
    "figure", "figcaption", "center", "form", "fieldset", "address", "details", "summary", "dl",
    "dt", "dd", "li", "tr", "td", "th", "thead", "tbody", "tfoot", "caption", "hgroup",
];

/// Tolerant HTML parsing. Unknown tags are unwrapped, unknown attributes are
/// dropped, and input that cannot be read at all yields an empty paragraph.
pub fn parse(html: &str, registry: &PluginRegistry) -> Document {
    if html.trim().is_empty() {
        return Document::empty();
    }

    let dom = match parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
    {
        Ok(dom) => dom,
        Err(err) => {
            tracing::warn!(%err, "unreadable HTML, starting from an empty document");
            return Document::empty();
        }
    };

    let reader = Reader { registry };
    let mut flow = Flow::container();
    let root = find_element(&dom.document, "body").unwrap_or_else(|| dom.document.clone());
    reader.walk_children(&root, &Marks::default(), &mut flow);

    let mut doc = Document {
        children: flow.finish(),
    };
    if doc.children.is_empty() {
        return Document::empty();
    }

    let checked = registry
        .normalize_document(&mut doc, NORMALIZE_LIMIT)
        .map_err(|err| err.to_string())
        .and_then(|()| registry.validate(&doc));
    if let Err(err) = checked {
        tracing::warn!(%err, "parsed HTML does not fit the schema, keeping plain text");
        return plain_text_document(&doc);
    }

    tracing::debug!(blocks = doc.children.len(), "parsed HTML");
    doc
}

fn plain_text_document(doc: &Document) -> Document {
    let children: Vec<Node> = doc
        .text_content()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(Node::paragraph)
        .collect();
    if children.is_empty() {
        Document::empty()
    } else {
        Document { children }
    }
}

/// Collects inline content and finished blocks for one container.
struct Flow {
    blocks: Vec<Node>,
    inline: Vec<Node>,
    kind: String,
    attrs: Attrs,
    /// Inline segments belong to the element itself (a paragraph or heading)
    /// rather than to an anonymous paragraph inside a container.
    text_block: bool,
}

impl Flow {
    fn container() -> Self {
        Self {
            blocks: Vec::new(),
            inline: Vec::new(),
            kind: kind::PARAGRAPH.to_string(),
            attrs: Attrs::default(),
            text_block: false,
        }
    }

    fn text_block(kind: &str, attrs: Attrs) -> Self {
        Self {
            blocks: Vec::new(),
            inline: Vec::new(),
            kind: kind.to_string(),
            attrs,
            text_block: true,
        }
    }

    fn push_block(&mut self, node: Node) {
        self.flush();
        self.blocks.push(node);
    }

    fn push_blocks(&mut self, nodes: Vec<Node>) {
        self.flush();
        self.blocks.extend(nodes);
    }

    fn flush(&mut self) {
        let inline = tidy_inline(std::mem::take(&mut self.inline));
        let text_block = self.text_block;
        let blank = inline.iter().all(|n| match n {
            Node::Text(t) if text_block => t.text.is_empty(),
            Node::Text(t) => t.text.trim().is_empty(),
            _ => false,
        });
        if blank {
            return;
        }
        self.blocks
            .push(Node::element(&self.kind, self.attrs.clone(), inline));
    }

    fn finish(mut self) -> Vec<Node> {
        self.flush();
        if self.text_block && self.blocks.is_empty() {
            self.blocks.push(Node::element(
                &self.kind,
                self.attrs,
                vec![Node::text("", Marks::default())],
            ));
        }
        self.blocks
    }
}

struct Reader<'a> {
    registry: &'a PluginRegistry,
}

impl Reader<'_> {
    fn known(&self, kind: &str) -> bool {
        self.registry.is_known_kind(kind)
    }

    fn walk_children(&self, handle: &Handle, marks: &Marks, flow: &mut Flow) {
        for child in handle.children.borrow().iter() {
            self.walk(child, marks, flow);
        }
    }

    fn walk(&self, handle: &Handle, marks: &Marks, flow: &mut Flow) {
        match &handle.data {
            NodeData::Text { contents } => {
                let raw = contents.borrow().to_string();
                let text = mark_layout_whitespace(&raw);
                if !text.is_empty() {
                    flow.inline.push(Node::text(text, marks.clone()));
                }
            }
            NodeData::Element { name, attrs, .. } => {
                let attrs = attrs
                    .borrow()
                    .iter()
                    .map(|a| (a.name.local.to_ascii_lowercase().to_string(), a.value.to_string()))
                    .collect();
                let view = ElementView::new(name.local.to_string(), attrs);
                self.walk_element(handle, &view, marks, flow);
            }
            NodeData::Document => self.walk_children(handle, marks, flow),
            _ => {}
        }
    }

    fn walk_element(&self, handle: &Handle, view: &ElementView, marks: &Marks, flow: &mut Flow) {
        let tag = view.tag();
        if SKIPPED.contains(&tag) {
            return;
        }

        match tag {
            "br" => flow.inline.push(Node::hard_break()),
            "img" => {
                if let Some(image) = self.image(view) {
                    flow.push_block(image);
                }
            }
            "hr" if self.known(kind::HORIZONTAL_RULE) => flow.push_block(Node::horizontal_rule()),
            "p" => {
                let attrs = self.node_attrs(kind::PARAGRAPH, view);
                flow.push_blocks(self.text_block(handle, kind::PARAGRAPH, attrs, marks));
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" if self.known(kind::HEADING) => {
                let level = tag[1..].parse::<u64>().unwrap_or(1);
                let mut attrs = self.node_attrs(kind::HEADING, view);
                attrs.insert("level".to_string(), Value::from(level));
                flow.push_blocks(self.text_block(handle, kind::HEADING, attrs, marks));
            }
            "blockquote" if self.known(kind::BLOCKQUOTE) => {
                let children = self.container(handle);
                flow.push_block(Node::element(kind::BLOCKQUOTE, Attrs::default(), children));
            }
            "ul" | "ol" if self.known(kind::BULLET_LIST) && self.known(kind::ORDERED_LIST) => {
                match self.list(handle, view) {
                    Some(list) => flow.push_block(list),
                    None => flow.flush(),
                }
            }
            "pre" if self.known(kind::CODE_BLOCK) => flow.push_block(self.code_block(handle)),
            "table" if self.known(kind::TABLE) => match self.table(handle) {
                Some(table) => flow.push_block(table),
                None => flow.flush(),
            },
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "blockquote" | "ul" | "ol" | "pre"
            | "table" | "hr" => {
                flow.flush();
                self.walk_children(handle, marks, flow);
                flow.flush();
            }
            tag if BLOCK_TRANSPARENT.contains(&tag) => {
                flow.flush();
                self.walk_children(handle, marks, flow);
                flow.flush();
            }
            _ => {
                let marks = self.marks_for(view, marks);
                self.walk_children(handle, &marks, flow);
            }
        }
    }

    fn marks_for(&self, view: &ElementView, base: &Marks) -> Marks {
        let mut marks = base.clone();
        match view.tag() {
            "strong" | "b" => marks.bold = true,
            "em" | "i" => marks.italic = true,
            "u" | "ins" => marks.underline = true,
            "s" | "strike" | "del" => marks.strike = true,
            "code" | "kbd" | "samp" | "tt" => marks.code = true,
            "sub" => {
                marks.subscript = true;
                marks.superscript = false;
            }
            "sup" => {
                marks.superscript = true;
                marks.subscript = false;
            }
            "a" => {
                match view.attr("href").map(str::trim).filter(|h| !h.is_empty()) {
                    Some(href) if !is_safe_url(href) => {
                        tracing::warn!(href, "dropping unsafe link");
                    }
                    Some(href) => {
                        marks.link = Some(LinkMark {
                            href: href.to_string(),
                            target: view
                                .attr("target")
                                .map(str::trim)
                                .filter(|t| !t.is_empty())
                                .map(String::from),
                        });
                    }
                    None => {}
                }
            }
            "mark" => {
                let color = view
                    .attr("data-color")
                    .or_else(|| view.style("background-color"))
                    .map(str::trim)
                    .filter(|c| is_safe_style_value(c))
                    .map(String::from);
                marks.highlight = Some(HighlightMark { color });
            }
            "span" => {
                for spec in self.registry.attributes_for(kind::TEXT_STYLE) {
                    if let Some(value) = (spec.parse)(view) {
                        marks.text_style.insert(spec.key.clone(), value);
                    }
                }
            }
            _ => {}
        }
        marks
    }

    fn node_attrs(&self, kind: &str, view: &ElementView) -> Attrs {
        let mut attrs = Attrs::default();
        for spec in self.registry.attributes_for(kind) {
            match (spec.parse)(view) {
                Some(value) => {
                    attrs.insert(spec.key.clone(), value);
                }
                None => {
                    if view.attr(&spec.key).is_some() {
                        tracing::trace!(key = %spec.key, kind, "ignoring malformed attribute");
                    }
                }
            }
        }
        attrs
    }

    fn text_block(&self, handle: &Handle, kind: &str, attrs: Attrs, marks: &Marks) -> Vec<Node> {
        let mut flow = Flow::text_block(kind, attrs);
        self.walk_children(handle, marks, &mut flow);
        flow.finish()
    }

    /// Block content of a container element; never empty.
    fn container(&self, handle: &Handle) -> Vec<Node> {
        let mut flow = Flow::container();
        self.walk_children(handle, &Marks::default(), &mut flow);
        let blocks = flow.finish();
        if blocks.is_empty() {
            vec![Node::paragraph("")]
        } else {
            blocks
        }
    }

    fn list(&self, handle: &Handle, view: &ElementView) -> Option<Node> {
        let ordered = view.tag() == "ol";
        let mut attrs = Attrs::default();
        if ordered {
            let start = view
                .attr("start")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|s| *s != 1);
            if let Some(start) = start {
                attrs.insert("start".to_string(), Value::from(start));
            }
        }

        let mut items: Vec<Node> = Vec::new();
        for child in handle.children.borrow().iter() {
            match &child.data {
                NodeData::Element { name, .. } if name.local.as_ref() == "li" => {
                    items.push(list_item(self.container(child)));
                }
                NodeData::Text { contents } if contents.borrow().trim().is_empty() => {}
                _ => {
                    let mut flow = Flow::container();
                    self.walk(child, &Marks::default(), &mut flow);
                    let blocks = flow.finish();
                    if !blocks.is_empty() {
                        items.push(list_item(blocks));
                    }
                }
            }
        }

        if items.is_empty() {
            return None;
        }
        let kind = if ordered {
            kind::ORDERED_LIST
        } else {
            kind::BULLET_LIST
        };
        Some(Node::element(kind, attrs, items))
    }

    fn code_block(&self, handle: &Handle) -> Node {
        let mut text = String::new();
        collect_raw_text(handle, &mut text);

        let mut attrs = Attrs::default();
        if let Some(language) = code_language(handle) {
            attrs.insert("language".to_string(), Value::String(language));
        }
        Node::element(
            kind::CODE_BLOCK,
            attrs,
            vec![Node::text(text, Marks::default())],
        )
    }

    fn table(&self, handle: &Handle) -> Option<Node> {
        let mut rows: Vec<Node> = Vec::new();
        self.collect_rows(handle, &mut rows);
        (!rows.is_empty()).then(|| Node::element(kind::TABLE, Attrs::default(), rows))
    }

    fn collect_rows(&self, handle: &Handle, rows: &mut Vec<Node>) {
        for child in handle.children.borrow().iter() {
            let NodeData::Element { name, .. } = &child.data else {
                continue;
            };
            match name.local.as_ref() {
                "tr" => {
                    if let Some(row) = self.row(child) {
                        rows.push(row);
                    }
                }
                "thead" | "tbody" | "tfoot" => self.collect_rows(child, rows),
                _ => {}
            }
        }
    }

    fn row(&self, handle: &Handle) -> Option<Node> {
        let mut cells: Vec<Node> = Vec::new();
        for child in handle.children.borrow().iter() {
            let NodeData::Element { name, attrs, .. } = &child.data else {
                continue;
            };
            let cell_kind = match name.local.as_ref() {
                "td" => kind::TABLE_CELL,
                "th" => kind::TABLE_HEADER,
                _ => continue,
            };
            let view = ElementView::new(
                name.local.to_string(),
                attrs
                    .borrow()
                    .iter()
                    .map(|a| (a.name.local.to_ascii_lowercase().to_string(), a.value.to_string()))
                    .collect(),
            );
            let cell_attrs = self.node_attrs(cell_kind, &view);
            cells.push(Node::element(cell_kind, cell_attrs, self.container(child)));
        }
        (!cells.is_empty()).then(|| Node::element(kind::TABLE_ROW, Attrs::default(), cells))
    }

    fn image(&self, view: &ElementView) -> Option<Node> {
        if !self.known(kind::IMAGE) {
            return None;
        }
        let attrs = self.node_attrs(kind::IMAGE, view);
        if !attrs.contains_key("src") {
            tracing::warn!("dropping image without src");
            return None;
        }
        Some(Node::Void(VoidNode {
            kind: kind::IMAGE.to_string(),
            attrs,
        }))
    }
}

fn list_item(children: Vec<Node>) -> Node {
    Node::element(kind::LIST_ITEM, Attrs::default(), children)
}

fn find_element(handle: &Handle, tag: &str) -> Option<Handle> {
    if let NodeData::Element { name, .. } = &handle.data {
        if name.local.as_ref() == tag {
            return Some(handle.clone());
        }
    }
    handle
        .children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, tag))
}

fn collect_raw_text(handle: &Handle, out: &mut String) {
    for child in handle.children.borrow().iter() {
        match &child.data {
            NodeData::Text { contents } => out.push_str(&contents.borrow()),
            NodeData::Element { name, .. } if name.local.as_ref() == "br" => out.push('\n'),
            NodeData::Element { .. } => collect_raw_text(child, out),
            _ => {}
        }
    }
}

fn code_language(handle: &Handle) -> Option<String> {
    for child in handle.children.borrow().iter() {
        let NodeData::Element { name, attrs, .. } = &child.data else {
            continue;
        };
        if name.local.as_ref() != "code" {
            continue;
        }
        let attrs = attrs.borrow();
        let class = attrs.iter().find(|a| a.name.local.as_ref() == "class")?;
        return class
            .value
            .split_whitespace()
            .find_map(|c| c.strip_prefix("language-"))
            .filter(|l| !l.is_empty())
            .map(String::from);
    }
    None
}

/// Replace whitespace runs that contain a line break or tab with [`LAYOUT`].
/// Runs of plain spaces are content and stay as written.
fn mark_layout_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut run = String::new();
    let flush_run = |run: &mut String, out: &mut String| {
        if run.is_empty() {
            return;
        }
        if run.contains(['\n', '\r', '\t', '\x0c']) {
            out.push(LAYOUT);
        } else {
            out.push_str(run);
        }
        run.clear();
    };
    for c in raw.chars() {
        if c.is_ascii_whitespace() {
            run.push(c);
        } else {
            flush_run(&mut run, &mut out);
            out.push(c);
        }
    }
    flush_run(&mut run, &mut out);
    out
}

/// Drop layout whitespace at segment edges and around line breaks, turn the
/// rest into single spaces, then merge runs with equal marks.
fn tidy_inline(nodes: Vec<Node>) -> Vec<Node> {
    let is_break = |n: Option<&Node>| matches!(n, Some(Node::Void(v)) if v.kind == kind::HARD_BREAK);

    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for (ix, node) in nodes.iter().enumerate() {
        let Node::Text(t) = node else {
            out.push(node.clone());
            continue;
        };

        let mut text = t.text.as_str();
        let prev = ix.checked_sub(1).and_then(|p| nodes.get(p));
        if ix == 0 || is_break(prev) {
            text = text.trim_start_matches(LAYOUT);
        }
        if ix + 1 == nodes.len() || is_break(nodes.get(ix + 1)) {
            text = text.trim_end_matches(LAYOUT);
        }
        let text = text.replace(LAYOUT, " ");
        if text.is_empty() {
            continue;
        }

        if let Some(Node::Text(prev)) = out.last_mut() {
            if prev.marks == t.marks {
                prev.text.push_str(&text);
                continue;
            }
        }
        out.push(Node::text(text, t.marks.clone()));
    }
    out
}
