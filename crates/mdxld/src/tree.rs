//! Syntax tree for MDX bodies.
//!
//! Markdown is parsed with pulldown-cmark. On top of it two MDX constructs are
//! recognized: top-level `import`/`export` statements and component tags
//! (`<Video src="..." />`, `<Callout>...</Callout>`). A component opened in one
//! HTML block and closed in a later one encloses the markdown in between.

use std::ops::Range;
use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd};
use regex::Regex;
use serde::Serialize;

use crate::codeblock::FenceInfo;
use crate::jsx::{self, Attribute, Token};

/// Markdown extensions enabled for MDX bodies.
pub(crate) fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
}

static ESM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:import|export)(?:\s|\{)").expect("Invalid ESM regex"));

/// Whether a top-level paragraph is an ESM `import`/`export` block.
pub(crate) fn is_esm(raw: &str) -> bool {
    ESM_RE.is_match(raw)
}

/// HTML elements that never have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// 1-based line and column (in characters) within the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const START: Position = Position { line: 1, column: 1 };
}

/// How a link or image was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LinkStyle {
    /// `[text](url)`
    Inline,
    /// `[text][label]`, `[label][]` or `[label]`
    Reference { label: String },
    /// `<https://...>`
    Autolink,
    /// `<someone@example.com>`
    Email,
}

impl LinkStyle {
    fn from_pulldown(link_type: LinkType, id: &str) -> Self {
        match link_type {
            LinkType::Reference
            | LinkType::ReferenceUnknown
            | LinkType::Collapsed
            | LinkType::CollapsedUnknown
            | LinkType::Shortcut
            | LinkType::ShortcutUnknown => Self::Reference {
                label: id.to_string(),
            },
            LinkType::Autolink => Self::Autolink,
            LinkType::Email => Self::Email,
            _ => Self::Inline,
        }
    }
}

/// Node type with its type-specific fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeKind {
    Root,
    Heading {
        depth: u8,
    },
    Paragraph,
    Text {
        value: String,
    },
    Emphasis,
    Strong,
    Delete,
    InlineCode {
        value: String,
    },
    Code {
        lang: Option<String>,
        meta: Option<String>,
        filename: Option<String>,
        value: String,
    },
    Blockquote,
    List {
        ordered: bool,
        start: Option<u64>,
    },
    ListItem {
        checked: Option<bool>,
    },
    Table,
    TableRow,
    TableCell,
    ThematicBreak,
    Break,
    /// Raw markup that is not a component (comments, doctypes)
    Html {
        value: String,
    },
    Link {
        url: String,
        title: Option<String>,
        style: LinkStyle,
    },
    Image {
        url: String,
        title: Option<String>,
        alt: String,
        style: LinkStyle,
    },
    FootnoteDefinition {
        label: String,
    },
    FootnoteReference {
        label: String,
    },
    /// ESM `import`/`export` statements
    MdxImportExport {
        value: String,
    },
    /// Component or HTML element tag
    MdxComponent {
        name: String,
        attributes: Vec<Attribute>,
        #[serde(rename = "selfClosing")]
        self_closing: bool,
    },
    /// Any other block construct
    Container,
}

/// A node in the syntax tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    #[serde(flatten)]
    pub kind: NodeKind,

    pub position: Position,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    fn leaf(kind: NodeKind, position: Position) -> Self {
        Self {
            kind,
            position,
            children: Vec::new(),
        }
    }

    /// Visit this node and all descendants in document order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Concatenated text of all descendant text and inline code nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(std::slice::from_ref(self), &mut out);
        out
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match &node.kind {
            NodeKind::Text { value } | NodeKind::InlineCode { value } => out.push_str(value),
            _ => collect_text(&node.children, out),
        }
    }
}

/// Build the syntax tree of a document body.
pub fn build_tree(body: &str) -> Node {
    TreeBuilder::new(body).build()
}

/// Byte offset to line/column mapping.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts }
    }

    fn position(&self, source: &str, offset: usize) -> Position {
        let line = self.starts.partition_point(|&start| start <= offset).max(1);
        let start = self.starts[line - 1];
        let column = source
            .get(start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(0)
            + 1;
        Position { line, column }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Origin {
    /// Opened by a pulldown-cmark `Start` event at this byte offset
    Markdown { start: usize },
    /// Opened by a component tag
    Component,
}

struct Frame {
    kind: NodeKind,
    position: Position,
    children: Vec<Node>,
    origin: Origin,
}

impl Frame {
    fn into_node(self) -> Node {
        Node {
            kind: self.kind,
            position: self.position,
            children: self.children,
        }
    }
}

/// Lines of one HTML block, joined so that a tag may span several of them.
#[derive(Default)]
struct HtmlBuffer {
    text: String,
    /// `(offset in text, offset in source)` at the start of each line
    segments: Vec<(usize, usize)>,
}

impl HtmlBuffer {
    fn push(&mut self, html: &str, offset: usize) {
        self.segments.push((self.text.len(), offset));
        self.text.push_str(html);
    }

    /// Map an offset in the joined text back into the source. Container
    /// prefixes such as `> ` are not part of the text, hence the segments.
    fn source_offset(&self, at: usize) -> usize {
        let i = self.segments.partition_point(|&(start, _)| start <= at);
        match i.checked_sub(1).map(|i| self.segments[i]) {
            Some((start, source)) => source + (at - start),
            None => at,
        }
    }
}

struct TreeBuilder<'a> {
    source: &'a str,
    lines: LineIndex,
    stack: Vec<Frame>,
    html_block: Option<HtmlBuffer>,
}

impl<'a> TreeBuilder<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            lines: LineIndex::new(source),
            stack: vec![Frame {
                kind: NodeKind::Root,
                position: Position::START,
                children: Vec::new(),
                origin: Origin::Markdown { start: 0 },
            }],
            html_block: None,
        }
    }

    fn build(mut self) -> Node {
        let source = self.source;
        for (event, range) in Parser::new_ext(source, markdown_options()).into_offset_iter() {
            self.event(event, range);
        }

        while self.stack.len() > 1 {
            self.pop_frame(source.len());
        }

        match self.stack.pop() {
            Some(root) => root.into_node(),
            None => Node::leaf(NodeKind::Root, Position::START),
        }
    }

    fn position(&self, offset: usize) -> Position {
        self.lines.position(self.source, offset)
    }

    fn event(&mut self, event: Event<'_>, range: Range<usize>) {
        match event {
            Event::Start(Tag::HtmlBlock) => self.html_block = Some(HtmlBuffer::default()),
            Event::Start(tag) => self.start(tag, range.start),
            Event::End(TagEnd::HtmlBlock) => self.flush_html_block(),
            Event::End(_) => self.end(range.end),
            Event::Text(text) => self.text(&text, range.start),
            Event::Code(code) => self.attach(Node::leaf(
                NodeKind::InlineCode {
                    value: code.to_string(),
                },
                self.position(range.start),
            )),
            Event::Html(html) => {
                if let Some(buffer) = self.html_block.as_mut() {
                    buffer.push(&html, range.start);
                } else {
                    self.html(&html, range.start);
                }
            }
            Event::InlineHtml(html) => self.html(&html, range.start),
            Event::SoftBreak => self.text("\n", range.start),
            Event::HardBreak => {
                self.attach(Node::leaf(NodeKind::Break, self.position(range.start)))
            }
            Event::Rule => self.attach(Node::leaf(
                NodeKind::ThematicBreak,
                self.position(range.start),
            )),
            Event::FootnoteReference(label) => self.attach(Node::leaf(
                NodeKind::FootnoteReference {
                    label: label.to_string(),
                },
                self.position(range.start),
            )),
            Event::TaskListMarker(checked) => self.mark_task(checked),
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>, offset: usize) {
        let kind = match tag {
            // Handled in `event`; block HTML opens no frame itself.
            Tag::HtmlBlock => return,
            Tag::Paragraph => NodeKind::Paragraph,
            Tag::Heading { level, .. } => NodeKind::Heading { depth: level as u8 },
            Tag::BlockQuote(_) => NodeKind::Blockquote,
            Tag::CodeBlock(kind) => {
                let info = match kind {
                    CodeBlockKind::Fenced(info) => FenceInfo::parse(&info),
                    CodeBlockKind::Indented => FenceInfo::default(),
                };
                NodeKind::Code {
                    lang: info.lang,
                    meta: info.meta,
                    filename: info.filename,
                    value: String::new(),
                }
            }
            Tag::List(start) => NodeKind::List {
                ordered: start.is_some(),
                start,
            },
            Tag::Item => NodeKind::ListItem { checked: None },
            Tag::FootnoteDefinition(label) => NodeKind::FootnoteDefinition {
                label: label.to_string(),
            },
            Tag::Table(_) => NodeKind::Table,
            Tag::TableHead | Tag::TableRow => NodeKind::TableRow,
            Tag::TableCell => NodeKind::TableCell,
            Tag::Emphasis => NodeKind::Emphasis,
            Tag::Strong => NodeKind::Strong,
            Tag::Strikethrough => NodeKind::Delete,
            Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            } => NodeKind::Link {
                url: link_url(link_type, dest_url),
                title: non_empty(title),
                style: LinkStyle::from_pulldown(link_type, &id),
            },
            Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            } => NodeKind::Image {
                url: dest_url.to_string(),
                title: non_empty(title),
                alt: String::new(),
                style: LinkStyle::from_pulldown(link_type, &id),
            },
            _ => NodeKind::Container,
        };

        self.stack.push(Frame {
            kind,
            position: self.position(offset),
            children: Vec::new(),
            origin: Origin::Markdown { start: offset },
        });
    }

    fn end(&mut self, end: usize) {
        // Components left open inside this block close with it.
        while self.stack.len() > 1
            && self.stack.last().map(|f| f.origin) == Some(Origin::Component)
        {
            self.pop_frame(end);
        }
        if self.stack.len() > 1 {
            self.pop_frame(end);
        }
    }

    /// Pop the top frame and attach the finished node to its parent.
    fn pop_frame(&mut self, end: usize) {
        let Some(mut frame) = self.stack.pop() else {
            return;
        };

        let Origin::Markdown { start } = frame.origin else {
            self.attach(frame.into_node());
            return;
        };

        match &mut frame.kind {
            NodeKind::Paragraph => {
                let source = self.source;
                let raw = source.get(start..end).unwrap_or_default();
                if self.stack.len() == 1 && is_esm(raw) {
                    self.attach(Node::leaf(
                        NodeKind::MdxImportExport {
                            value: raw.trim_end().to_string(),
                        },
                        frame.position,
                    ));
                    return;
                }
                if looks_like_jsx(raw) && frame.children.iter().all(is_text) {
                    for token in jsx::scan(raw) {
                        self.token(token, &|at| start + at);
                    }
                    return;
                }
            }
            NodeKind::Image { alt, .. } => {
                collect_text(&frame.children, alt);
                frame.children.clear();
            }
            _ => {}
        }

        self.attach(frame.into_node());
    }

    fn attach(&mut self, node: Node) {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(node);
        }
    }

    fn text(&mut self, value: &str, offset: usize) {
        let position = self.position(offset);
        if let Some(frame) = self.stack.last_mut() {
            if let NodeKind::Code { value: code, .. } = &mut frame.kind {
                code.push_str(value);
                return;
            }
            if let Some(Node {
                kind: NodeKind::Text { value: last },
                ..
            }) = frame.children.last_mut()
            {
                last.push_str(value);
                return;
            }
        }
        self.attach(Node::leaf(
            NodeKind::Text {
                value: value.to_string(),
            },
            position,
        ));
    }

    fn html(&mut self, html: &str, offset: usize) {
        for token in jsx::scan(html) {
            self.token(token, &|at| offset + at);
        }
    }

    /// Tokenize a finished HTML block in one pass.
    fn flush_html_block(&mut self) {
        let Some(buffer) = self.html_block.take() else {
            return;
        };
        for token in jsx::scan(&buffer.text) {
            self.token(token, &|at| buffer.source_offset(at));
        }
    }

    /// Apply a JSX token; `locate` maps its offsets into the source.
    fn token(&mut self, token: Token, locate: &dyn Fn(usize) -> usize) {
        match token {
            Token::Open {
                name,
                attributes,
                self_closing,
                offset,
            } => {
                let self_closing = self_closing || VOID_ELEMENTS.contains(&name.as_str());
                let position = self.position(locate(offset));
                let kind = NodeKind::MdxComponent {
                    name,
                    attributes,
                    self_closing,
                };
                if self_closing {
                    self.attach(Node::leaf(kind, position));
                } else {
                    self.stack.push(Frame {
                        kind,
                        position,
                        children: Vec::new(),
                        origin: Origin::Component,
                    });
                }
            }
            Token::Close { name, .. } => self.close_component(&name),
            Token::Raw { value, offset } => {
                let position = self.position(locate(offset));
                self.attach(Node::leaf(NodeKind::Html { value }, position));
            }
            Token::Text { value, offset } => {
                if !value.trim().is_empty() {
                    self.text(&value, locate(offset));
                }
            }
        }
    }

    /// Close the innermost open component named `name`, if it was opened
    /// within the current markdown block.
    fn close_component(&mut self, name: &str) {
        let mut depth = None;
        for (i, frame) in self.stack.iter().enumerate().rev() {
            if frame.origin != Origin::Component {
                break;
            }
            if matches!(&frame.kind, NodeKind::MdxComponent { name: open, .. } if open == name) {
                depth = Some(i);
                break;
            }
        }

        match depth {
            Some(i) => {
                while self.stack.len() > i {
                    self.pop_frame(self.source.len());
                }
            }
            None => tracing::trace!("Ignoring unmatched closing tag </{}>", name),
        }
    }

    fn mark_task(&mut self, checked: bool) {
        for frame in self.stack.iter_mut().rev() {
            if let NodeKind::ListItem { checked: slot } = &mut frame.kind {
                *slot = Some(checked);
                return;
            }
        }
    }
}

fn is_text(node: &Node) -> bool {
    matches!(node.kind, NodeKind::Text { .. })
}

/// Whether a paragraph's source starts with a component tag.
fn looks_like_jsx(raw: &str) -> bool {
    let mut chars = raw.trim_start().chars();
    chars.next() == Some('<') && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
}

fn link_url(link_type: LinkType, dest: CowStr<'_>) -> String {
    if link_type == LinkType::Email && !dest.starts_with("mailto:") {
        format!("mailto:{dest}")
    } else {
        dest.to_string()
    }
}

fn non_empty(s: CowStr<'_>) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// A table of contents entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    /// Heading text
    pub title: String,
    /// Anchor ID
    pub id: String,
    /// Heading level (1-6)
    pub level: u8,
}

/// Collect the headings of a tree as a table of contents.
pub fn outline(root: &Node) -> Vec<TocEntry> {
    let mut toc = Vec::new();
    root.walk(&mut |node| {
        if let NodeKind::Heading { depth } = node.kind {
            let title = node.text_content().trim().to_string();
            toc.push(TocEntry {
                id: slugify(&title),
                title,
                level: depth,
            });
        }
    });
    toc
}

/// Convert a heading to a URL-safe slug.
fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else if c.is_whitespace() || c == '-' || c == '_' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|c| *c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
