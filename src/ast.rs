//! Document tree for the parsed article.

use crate::error::Warning;
use crate::resolve::Registry;
use indexmap::IndexMap;

/// A complete parsed document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Front matter metadata
    pub metadata: Metadata,
    /// Children of the document root
    pub blocks: Vec<Block>,
    /// Identifiers registered while parsing, with their numbers and categories
    pub registry: Registry,
    /// Non-fatal problems found while parsing
    pub warnings: Vec<Warning>,
}

/// Document metadata from TOML front matter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub date: Option<String>,
}

/// An inline attribute list attached to a block, e.g. `{: #lemma12 .important}`.
///
/// Keys keep the order in which they were first set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(IndexMap<String, String>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.get("id")
    }

    /// Set an attribute, replacing any previous value. `class` is merged instead.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if key == "class" {
            for class in value.split_whitespace() {
                self.add_class(class);
            }
        } else {
            self.0.insert(key.to_string(), value);
        }
    }

    /// Add a class to the space-separated `class` set unless already present.
    pub fn add_class(&mut self, class: &str) {
        let classes = self.0.entry("class".to_string()).or_default();
        if classes.split_whitespace().any(|c| c == class) {
            return;
        }
        if !classes.is_empty() {
            classes.push(' ');
        }
        classes.push_str(class);
    }

    /// Merge another attribute set into this one; classes are united.
    pub fn merge(&mut self, other: &Attributes) {
        for (key, value) in other.iter() {
            self.set(key, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A block-level node with its attributes and the line it started on.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub attrs: Attributes,
    /// 1-based source line. Approximate for generated content.
    pub line: usize,
}

/// Block-level elements.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    /// A paragraph of inline content
    Paragraph(Vec<Inline>),

    /// A heading with level (1-6)
    Heading { level: u8, content: Vec<Inline> },

    /// A fenced code block
    CodeBlock {
        language: Option<String>,
        content: String,
    },

    /// A `$$ ... $$` math block
    DisplayMath(String),

    /// A block quote
    BlockQuote(Vec<Block>),

    /// An ordered or unordered list
    List {
        ordered: bool,
        start: Option<u32>,
        items: Vec<ListItem>,
    },

    /// A horizontal rule
    ThematicBreak,

    /// A generic HTML element wrapping other blocks (`section`, `div`)
    Container { tag: String, children: Vec<Block> },
}

/// A list item.
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub content: Vec<Block>,
}

/// Inline elements.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    /// Plain text. Non-breaking spaces are kept as U+00A0.
    Text(String),

    /// Emphasized text (*text*)
    Emphasis(Vec<Inline>),

    /// Strong text (**text**)
    Strong(Vec<Inline>),

    /// Inline code (`code`)
    Code(String),

    /// Inline math, rendered as `\(...\)`
    Math(String),

    /// A hyperlink
    Link {
        url: String,
        title: Option<String>,
        content: Vec<Inline>,
    },

    /// An image
    Image {
        url: String,
        alt: String,
        title: Option<String>,
    },

    /// Raw HTML passthrough
    RawHtml(String),

    SoftBreak,
    HardBreak,
}

/// How an author-year citation is phrased.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitationStyle {
    /// `(Author, Year)` from `[citep: ...]`
    Parenthetical,
    /// `Author (Year)` from `[citet: ...]`
    Textual,
}

impl Block {
    pub fn new(kind: BlockKind, line: usize) -> Self {
        Self {
            kind,
            attrs: Attributes::new(),
            line,
        }
    }

    pub fn with_attrs(mut self, attrs: Attributes) -> Self {
        self.attrs = attrs;
        self
    }

    /// A paragraph whose content is still one unparsed text run.
    pub fn raw_paragraph(text: impl Into<String>, line: usize) -> Self {
        Self::new(BlockKind::Paragraph(vec![Inline::Text(text.into())]), line)
    }

    pub fn heading(level: u8, text: impl Into<String>, line: usize) -> Self {
        Self::new(
            BlockKind::Heading {
                level,
                content: vec![Inline::Text(text.into())],
            },
            line,
        )
    }

    pub fn container(tag: &str, children: Vec<Block>, line: usize) -> Self {
        Self::new(
            BlockKind::Container {
                tag: tag.to_string(),
                children,
            },
            line,
        )
    }

    /// The sole text of a paragraph, if it consists of exactly one text node.
    pub fn paragraph_text(&self) -> Option<&str> {
        match &self.kind {
            BlockKind::Paragraph(content) => match content.as_slice() {
                [Inline::Text(text)] => Some(text),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Replace the half-open range `start..end` of `children` with a single node.
///
/// Returns the removed nodes in order.
pub fn replace_range(children: &mut Vec<Block>, start: usize, end: usize, node: Block) -> Vec<Block> {
    let end = end.min(children.len());
    let start = start.min(end);
    children.splice(start..end, std::iter::once(node)).collect()
}
