//! HTML renderer for parsed documents.
//!
//! The layout follows kramdown: top-level blocks are separated by a blank
//! line, the children of sections, lists and quotes are indented by two
//! spaces, and math is left flush for the client-side typesetter.

use crate::ast::{Attributes, Block, BlockKind, Document, Inline, ListItem, Metadata};
use crate::parser::inline::entity_len;
use crate::render::math::{render_display, render_inline, MathBackend};

/// Configuration for HTML rendering.
#[derive(Debug, Clone)]
pub struct HtmlConfig {
    /// Math typesetting library for standalone documents.
    pub math_backend: MathBackend,
    /// Whether to generate a complete HTML document or just the body content.
    pub standalone: bool,
    /// Document title (for standalone mode), overriding the front matter.
    pub title: Option<String>,
    /// Value of the `lang` attribute of the standalone document.
    pub lang: String,
    /// Additional CSS to include.
    pub custom_css: Option<String>,
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            math_backend: MathBackend::default(),
            standalone: false,
            title: None,
            lang: "en".to_string(),
            custom_css: None,
        }
    }
}

/// Render a parsed document to HTML.
pub fn render_html(doc: &Document, config: &HtmlConfig) -> String {
    let mut renderer = HtmlRenderer {
        config,
        output: String::new(),
    };
    if config.standalone {
        renderer.render_standalone(doc);
    } else {
        renderer.render_blocks(&doc.blocks, 0);
    }
    renderer.output
}

struct HtmlRenderer<'a> {
    config: &'a HtmlConfig,
    output: String,
}

impl HtmlRenderer<'_> {
    fn render_standalone(&mut self, doc: &Document) {
        let title = self
            .config
            .title
            .clone()
            .or_else(|| doc.metadata.title.clone())
            .unwrap_or_else(|| "Document".to_string());

        self.output.push_str("<!DOCTYPE html>\n");
        self.output
            .push_str(&format!("<html lang=\"{}\">\n<head>\n", escape_attr(&self.config.lang)));
        self.output.push_str("<meta charset=\"UTF-8\">\n");
        self.output.push_str(
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
        );
        self.output
            .push_str(&format!("<title>{}</title>\n", escape_text(&title)));
        self.output.push_str(self.config.math_backend.head_content());
        self.output.push('\n');
        self.output.push_str(DEFAULT_STYLES);

        if let Some(css) = &self.config.custom_css {
            self.output.push_str("<style>\n");
            self.output.push_str(css);
            self.output.push_str("\n</style>\n");
        }

        self.output.push_str("</head>\n<body>\n");
        self.output.push_str("<article class=\"latexish-document\">\n");
        self.render_metadata(&doc.metadata);
        self.render_blocks(&doc.blocks, 0);
        self.output.push_str("</article>\n</body>\n</html>\n");
    }

    fn render_metadata(&mut self, metadata: &Metadata) {
        if metadata.title.is_none() && metadata.authors.is_empty() && metadata.date.is_none() {
            return;
        }
        self.output.push_str("<header>\n");
        if let Some(title) = &metadata.title {
            self.output
                .push_str(&format!("  <h1 class=\"title\">{}</h1>\n", escape_text(title)));
        }
        if !metadata.authors.is_empty() {
            self.output.push_str(&format!(
                "  <p class=\"authors\">{}</p>\n",
                escape_text(&metadata.authors.join(", "))
            ));
        }
        if let Some(date) = &metadata.date {
            self.output
                .push_str(&format!("  <p class=\"date\">{}</p>\n", escape_text(date)));
        }
        self.output.push_str("</header>\n");
    }

    /// Top-level blocks, one blank line apart.
    fn render_blocks(&mut self, blocks: &[Block], indent: usize) {
        for (i, block) in blocks.iter().enumerate() {
            if i > 0 {
                // The macro preamble is glued to what follows
                let separator = if is_math_only(&blocks[i - 1]) { "\n" } else { "\n\n" };
                self.output.push_str(separator);
            }
            self.render_block(block, indent);
        }
        if !blocks.is_empty() {
            self.output.push('\n');
        }
    }

    fn render_block(&mut self, block: &Block, indent: usize) {
        let pad = " ".repeat(indent);
        let attrs = render_attributes(&block.attrs);

        match &block.kind {
            BlockKind::Paragraph(inlines) => {
                self.output.push_str(&format!("{pad}<p{attrs}>"));
                self.render_inlines(inlines);
                self.output.push_str("</p>");
            }
            BlockKind::Heading { level, content } => {
                self.output.push_str(&format!("{pad}<h{level}{attrs}>"));
                self.render_inlines(content);
                self.output.push_str(&format!("</h{level}>"));
            }
            BlockKind::CodeBlock { language, content } => {
                self.output.push_str(&format!("{pad}<pre{attrs}><code"));
                if let Some(lang) = language {
                    self.output
                        .push_str(&format!(r#" class="language-{}""#, escape_attr(lang)));
                }
                self.output.push('>');
                self.output.push_str(&escape_text(content));
                if !content.is_empty() && !content.ends_with('\n') {
                    self.output.push('\n');
                }
                self.output.push_str("</code></pre>");
            }
            BlockKind::DisplayMath(latex) => {
                self.output.push_str(&render_display(latex));
            }
            BlockKind::ThematicBreak => {
                self.output.push_str(&format!("{pad}<hr{attrs} />"));
            }
            BlockKind::BlockQuote(children) => {
                self.output.push_str(&format!("{pad}<blockquote{attrs}>\n"));
                self.render_children(children, indent + 2);
                self.output.push_str(&format!("\n{pad}</blockquote>"));
            }
            BlockKind::List {
                ordered,
                start,
                items,
            } => {
                let tag = if *ordered { "ol" } else { "ul" };
                self.output.push_str(&format!("{pad}<{tag}{attrs}"));
                if let Some(start) = start.filter(|&n| *ordered && n != 1) {
                    self.output.push_str(&format!(r#" start="{start}""#));
                }
                self.output.push_str(">\n");
                for item in items {
                    self.render_list_item(item, indent + 2);
                }
                self.output.push_str(&format!("{pad}</{tag}>"));
            }
            BlockKind::Container { tag, children } => {
                self.output.push_str(&format!("{pad}<{tag}{attrs}>\n"));
                if is_math_only(block) {
                    for child in children {
                        self.render_block(child, 0);
                        self.output.push('\n');
                    }
                } else {
                    if !matches!(
                        children.first().map(|c| &c.kind),
                        Some(BlockKind::Heading { .. })
                    ) {
                        self.output.push('\n');
                    }
                    for child in children {
                        self.render_block(child, indent + 2);
                        self.output.push_str("\n\n");
                    }
                }
                self.output.push_str(&format!("{pad}</{tag}>"));
            }
        }
    }

    fn render_children(&mut self, children: &[Block], indent: usize) {
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                self.output.push_str("\n\n");
            }
            self.render_block(child, indent);
        }
    }

    fn render_list_item(&mut self, item: &ListItem, indent: usize) {
        let pad = " ".repeat(indent);
        self.output.push_str(&format!("{pad}<li>"));
        match item.content.as_slice() {
            // Inline single paragraphs in list items
            [Block {
                kind: BlockKind::Paragraph(inlines),
                ..
            }] => self.render_inlines(inlines),
            content => {
                self.output.push('\n');
                self.render_children(content, indent + 2);
                self.output.push_str(&format!("\n{pad}"));
            }
        }
        self.output.push_str("</li>\n");
    }

    fn render_inlines(&mut self, inlines: &[Inline]) {
        for inline in inlines {
            self.render_inline(inline);
        }
    }

    fn render_inline(&mut self, inline: &Inline) {
        match inline {
            Inline::Text(text) => {
                self.output.push_str(&escape_text(text));
            }
            Inline::Emphasis(inlines) => {
                self.output.push_str("<em>");
                self.render_inlines(inlines);
                self.output.push_str("</em>");
            }
            Inline::Strong(inlines) => {
                self.output.push_str("<strong>");
                self.render_inlines(inlines);
                self.output.push_str("</strong>");
            }
            Inline::Code(code) => {
                self.output.push_str("<code>");
                self.output.push_str(&escape_text(code));
                self.output.push_str("</code>");
            }
            Inline::Math(latex) => {
                self.output.push_str(&render_inline(latex));
            }
            Inline::Link {
                url,
                title,
                content,
            } => {
                self.output
                    .push_str(&format!(r#"<a href="{}""#, escape_attr(url)));
                if let Some(title) = title {
                    self.output
                        .push_str(&format!(r#" title="{}""#, escape_attr(title)));
                }
                self.output.push('>');
                self.render_inlines(content);
                self.output.push_str("</a>");
            }
            Inline::Image { url, alt, title } => {
                self.output.push_str(&format!(
                    r#"<img src="{}" alt="{}""#,
                    escape_attr(url),
                    escape_attr(alt)
                ));
                if let Some(title) = title {
                    self.output
                        .push_str(&format!(r#" title="{}""#, escape_attr(title)));
                }
                self.output.push_str(" />");
            }
            Inline::RawHtml(html) => {
                self.output.push_str(html);
            }
            Inline::SoftBreak => {
                self.output.push('\n');
            }
            Inline::HardBreak => {
                self.output.push_str("<br />\n");
            }
        }
    }
}

/// A container holding nothing but display math, like the macro preamble.
fn is_math_only(block: &Block) -> bool {
    match &block.kind {
        BlockKind::Container { children, .. } => {
            !children.is_empty()
                && children
                    .iter()
                    .all(|child| matches!(child.kind, BlockKind::DisplayMath(_)))
        }
        _ => false,
    }
}

fn render_attributes(attrs: &Attributes) -> String {
    attrs
        .iter()
        .map(|(key, value)| format!(r#" {key}="{}""#, escape_attr(value)))
        .collect()
}

/// Escape text content. Entities already present are kept and non-breaking
/// spaces are spelled `&nbsp;`.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        match c {
            '&' => match entity_len(rest) {
                Some(len) => {
                    out.push_str(&rest[..len]);
                    rest = &rest[len..];
                    continue;
                }
                None => out.push_str("&amp;"),
            },
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
        rest = &rest[c.len_utf8()..];
    }
    out
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const DEFAULT_STYLES: &str = r##"<style>
.latexish-document { max-width: 800px; margin: 0 auto; padding: 2em; font-family: Georgia, serif; line-height: 1.6; }
.latexish-document header { text-align: center; margin-bottom: 2em; }
.abstract { margin: 1.5em 3em; font-size: 0.95em; }
.theorem-like { margin: 1.5em 0; }
.theorem-like > h5 { display: inline; font-size: 1em; margin-right: 0.5em; }
.theorem-like > p:first-of-type { display: inline; font-style: italic; }
.bibliography-item { padding-left: 2em; text-indent: -2em; }
a[href^="#"] { color: #0066cc; text-decoration: none; }
a[href^="#"]:hover { text-decoration: underline; }
</style>
"##;
