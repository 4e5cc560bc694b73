//! Parser for Markdown with academic extensions.
//!
//! The generic block and span parsers know nothing about numbering or
//! references; [`Latexish`] plugs into them through [`BlockHooks`] and
//! [`SpanHooks`] and finishes the document once the tree is complete.

pub mod block;
pub mod inline;
pub mod lexer;

pub use block::{parse_blocks, BlockHooks, ContainerId};
pub use inline::{parse_inlines, parse_spans, SpanHooks};

use crate::ast::{Block, BlockKind, Document, Inline, Metadata};
use crate::bibliography::{style_engine, StyleEngine};
use crate::error::{Diagnostics, ParseError, Result};
use crate::lexical::{Category, Lexical};
use crate::options::{Options, OptionsFile};
use crate::resolve::finalize::{prepend_latex_macros, reference_section_source};
use crate::resolve::numbering::strip_leading_number;
use crate::resolve::{
    resolve_cross_reference, Citations, EnvironmentTracker, HeaderNumberer, Registry,
};
use lexer::{citation, cross_reference, equation_labels, inline_math, Token};
use serde::Deserialize;
use std::collections::HashMap;

/// Parse a complete document, front matter included.
///
/// Front matter keys override `options` for this document only.
pub fn parse(input: &str, options: &Options) -> Result<Document> {
    let (front, body, first_line) = split_front_matter(input)?;

    let (metadata, options) = match front {
        Some(front) => {
            let metadata = front.metadata();
            let mut options = options.clone();
            options.merge(front.options)?;
            (metadata, options)
        }
        None => (Metadata::default(), options.clone()),
    };

    let mut driver = Latexish::new(&options)?;
    let blocks = driver.parse_body(body, first_line);
    let last_line = first_line + body.lines().count().saturating_sub(1);
    Ok(driver.finish(blocks, metadata, last_line))
}

/// Split `+++` delimited TOML front matter from the body.
///
/// Returns the front matter, the body and the source line the body starts on.
fn split_front_matter(input: &str) -> Result<(Option<RawFrontMatter>, &str, usize)> {
    let trimmed = input.trim_start();
    let Some(after_open) = trimmed.strip_prefix("+++") else {
        return Ok((None, input, 1));
    };

    let close_pos = after_open.find("\n+++").ok_or_else(|| {
        ParseError::FrontMatter("Unclosed front matter (missing closing +++)".into())
    })?;

    let front_matter_str = &after_open[..close_pos];
    let body = after_open[close_pos + 4..]
        .split_once('\n')
        .map_or("", |(_, rest)| rest);
    let first_line = input[..input.len() - body.len()].matches('\n').count() + 1;

    let raw: RawFrontMatter = toml::from_str(front_matter_str)
        .map_err(|e| ParseError::FrontMatter(format!("Invalid TOML: {}", e)))?;

    Ok((Some(raw), body, first_line))
}

/// Raw front matter structure for deserialization.
#[derive(Debug, Deserialize, Default)]
struct RawFrontMatter {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    author: Option<String>,
    date: Option<String>,
    #[serde(flatten)]
    options: OptionsFile,
}

impl RawFrontMatter {
    fn metadata(&self) -> Metadata {
        let mut authors = self.authors.clone();
        if let Some(author) = &self.author {
            if authors.is_empty() {
                authors.push(author.clone());
            }
        }
        Metadata {
            title: self.title.clone(),
            authors,
            date: self.date.clone(),
        }
    }
}

/// Per-document state of the academic extensions.
#[derive(Debug)]
pub struct Latexish<'o> {
    options: &'o Options,
    lex: Lexical,
    no_number: Vec<String>,
    engine: Box<dyn StyleEngine>,
    numberer: HeaderNumberer,
    environments: EnvironmentTracker,
    registry: Registry,
    citations: Citations,
    diagnostics: Diagnostics,
    /// Numbers of headers still waiting for an id from an attribute list,
    /// keyed by source line.
    pending_sections: HashMap<usize, String>,
}

impl<'o> Latexish<'o> {
    /// Fails on options that cannot work, such as an unknown citation style.
    pub fn new(options: &'o Options) -> Result<Self> {
        options.validate()?;
        let engine = style_engine(&options.bibliography_style)?;
        let lex = Lexical::new(options.language);
        Ok(Self {
            options,
            no_number: options.no_number_for(&lex),
            environments: EnvironmentTracker::new(&lex, options.theorem_header_level),
            lex,
            engine,
            numberer: HeaderNumberer::new(),
            registry: Registry::new(),
            citations: Citations::new(),
            diagnostics: Diagnostics::new(),
            pending_sections: HashMap::new(),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Run the block and span phases over `input`.
    pub fn parse_body(&mut self, input: &str, first_line: usize) -> Vec<Block> {
        let parsed = parse_blocks(input, first_line, self);
        let mut blocks = parsed.blocks;

        if let Some(open) = self.environments.open() {
            let message = format!("{} on line {} is never closed", open.name, open.line);
            self.diagnostics.warn(open.line, message);
        }

        parse_spans(&mut blocks, &parsed.link_definitions, self);
        blocks
    }

    /// Add the macro preamble and the reference section, then build the document.
    ///
    /// `last_line` is the last source line; the reference section is numbered
    /// from there on.
    pub fn finish(mut self, mut blocks: Vec<Block>, metadata: Metadata, last_line: usize) -> Document {
        prepend_latex_macros(
            &mut blocks,
            &self.options.latex_macros,
            self.options.hide_latex_macros,
        );

        if let Some(bibliography) = &self.options.bibliography {
            let source = reference_section_source(
                self.citations.cited_keys(),
                bibliography,
                self.engine.as_ref(),
                &self.lex,
            );
            if let Some(source) = source {
                tracing::debug!(entries = self.citations.cited_keys().count(), "Generating reference section");
                match Latexish::new(self.options) {
                    Ok(mut nested) => {
                        blocks.extend(nested.parse_body(&source, last_line + 1));
                        self.diagnostics.extend(nested.diagnostics.into_warnings());
                    }
                    // Options were already accepted by `new`
                    Err(err) => self.diagnostics.warn(last_line, err.to_string()),
                }
            }
        }

        Document {
            metadata,
            blocks,
            registry: self.registry,
            warnings: self.diagnostics.into_warnings(),
        }
    }

    fn register(&mut self, id: &str, category: Category, number: Option<String>, line: usize) {
        if !self.registry.register(id, category, number) {
            self.diagnostics
                .warn(line, format!("Duplicate id '{id}' on line {line}"));
        }
    }
}

impl BlockHooks for Latexish<'_> {
    fn header(&mut self, level: u8, text: &str, id: Option<&str>, line: usize) -> String {
        if level <= 1
            || !self.options.auto_number_headers
            || self.no_number.iter().any(|skip| skip == text)
        {
            return text.to_string();
        }

        let number = self.numberer.next_number(usize::from(level - 1));
        let text = format!("{number} {}", strip_leading_number(text));
        match id {
            Some(id) => self.register(id, Category::Section, Some(number), line),
            None => {
                self.pending_sections.insert(line, number);
            }
        }
        text
    }

    fn paragraph(&mut self, siblings: &mut Vec<Block>, container: ContainerId) {
        self.environments
            .on_paragraph(siblings, container, &mut self.registry, &mut self.diagnostics);
    }

    fn display_math(&mut self, source: &str, line: usize) {
        for label in equation_labels(source) {
            self.register(label, Category::Eqn, None, line);
        }
    }

    fn attributes(&mut self, block: &Block) {
        // A header numbered without an id picks it up from its attribute list
        if !matches!(block.kind, BlockKind::Heading { .. }) {
            return;
        }
        if let (Some(id), Some(number)) = (block.attrs.id(), self.pending_sections.remove(&block.line)) {
            self.register(id, Category::Section, Some(number), block.line);
        }
    }
}

impl SpanHooks for Latexish<'_> {
    fn span(&mut self, input: &str, _line: usize) -> Option<(Vec<Inline>, usize)> {
        match inline_math(input) {
            Ok((rest, Token::InlineMath(math))) => Some((
                vec![Inline::Math(math.to_string())],
                input.len() - rest.len(),
            )),
            _ => None,
        }
    }

    fn link(&mut self, input: &str, line: usize) -> Option<(Vec<Inline>, usize)> {
        if let Ok((rest, Token::CrossReference { capital, ids })) = cross_reference(input) {
            let nodes = resolve_cross_reference(
                capital,
                ids,
                &self.registry,
                &self.lex,
                &mut self.diagnostics,
                line,
            )?;
            return Some((nodes, input.len() - rest.len()));
        }

        let bibliography = self.options.bibliography.as_ref()?;
        if let Ok((rest, Token::Citation(style, keys))) = citation(input) {
            let nodes = self.citations.resolve(
                style,
                keys,
                bibliography,
                &self.lex,
                &mut self.diagnostics,
                line,
            )?;
            return Some((nodes, input.len() - rest.len()));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bibliography::Bibliography;
    use crate::error::{ConfigError, Error};
    use crate::lexical::Language;
    use pretty_assertions::assert_eq;

    fn plain_text(inlines: &[Inline]) -> String {
        inlines
            .iter()
            .map(|inline| match inline {
                Inline::Text(text) => text.clone(),
                Inline::Strong(children) | Inline::Emphasis(children) => plain_text(children),
                _ => String::new(),
            })
            .collect()
    }

    fn heading_text(block: &Block) -> String {
        match &block.kind {
            BlockKind::Heading { content, .. } => plain_text(content),
            other => panic!("Expected heading, got {other:?}"),
        }
    }

    #[test]
    fn test_no_front_matter() {
        let input = "# Hello\n\nSome text.";
        let (front, body, line) = split_front_matter(input).unwrap();
        assert!(front.is_none());
        assert_eq!(body, input);
        assert_eq!(line, 1);
    }

    #[test]
    fn test_with_front_matter() {
        let input = r#"+++
title = "My Document"
author = "Jane Doe"
language = "french"
latex_macros = ['\newcommand{\R}{\mathbb{R}}']
+++

# Hello

Some text."#;

        let (front, body, line) = split_front_matter(input).unwrap();
        let front = front.unwrap();
        let metadata = front.metadata();
        assert_eq!(metadata.title, Some("My Document".to_string()));
        assert_eq!(metadata.authors, vec!["Jane Doe".to_string()]);
        assert_eq!(front.options.language.as_deref(), Some("french"));
        assert_eq!(body, "\n# Hello\n\nSome text.");
        assert_eq!(line, 7);
    }

    #[test]
    fn test_unclosed_front_matter() {
        let result = parse("+++\ntitle = \"x\"\n", &Options::default());
        assert!(matches!(result, Err(Error::Parse(ParseError::FrontMatter(_)))));
    }

    #[test]
    fn test_front_matter_overrides_options() {
        let doc = parse(
            "+++\nlanguage = \"french\"\n+++\n\nThéorème\n\n\\Théorème",
            &Options::default(),
        )
        .unwrap();
        match &doc.blocks[0].kind {
            BlockKind::Container { children, .. } => {
                assert_eq!(heading_text(&children[0]), "Théorème 1");
            }
            other => panic!("Expected container, got {other:?}"),
        }
    }

    #[test]
    fn test_front_matter_metadata_and_options_together() {
        let doc = parse(
            "+++\ntitle = \"Relativité\"\nauthor = \"A. Einstein\"\nlanguage = \"french\"\n+++\n\nLemme\n\n\\Lemme",
            &Options::default(),
        )
        .unwrap();
        assert_eq!(doc.metadata.title.as_deref(), Some("Relativité"));
        assert_eq!(doc.metadata.authors, vec!["A. Einstein".to_string()]);
        match &doc.blocks[0].kind {
            BlockKind::Container { children, .. } => {
                assert_eq!(heading_text(&children[0]), "Lemme 1");
            }
            other => panic!("Expected container, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_style_fails_fast() {
        let options = Options {
            bibliography_style: "mla".into(),
            ..Options::default()
        };
        assert!(matches!(
            parse("Text", &options),
            Err(Error::Config(ConfigError::UnknownStyle(_)))
        ));
    }

    #[test]
    fn test_headers_numbered_and_registered() {
        let doc = parse(
            "# Title\n\n## Intro {#intro}\n\n## Method\n{: #method}\n\n### Setup\n\n## References",
            &Options::default(),
        )
        .unwrap();
        let headings: Vec<String> = doc.blocks.iter().map(heading_text).collect();
        assert_eq!(headings, vec!["Title", "1 Intro", "2 Method", "2.1 Setup", "References"]);
        assert_eq!(doc.registry.number("intro"), Some("1"));
        assert_eq!(doc.registry.number("method"), Some("2"));
        assert!(doc.warnings.is_empty());
    }

    #[test]
    fn test_header_id_from_attribute_list_registered_first() {
        let doc = parse("## Intro\n{: #x}\n\nLemma\n{: #x}\n\n\\Lemma\n", &Options::default()).unwrap();
        assert_eq!(doc.registry.category("x"), Some(Category::Section));
        assert_eq!(doc.registry.number("x"), Some("1"));
        assert_eq!(doc.warnings.len(), 1);
        assert_eq!(doc.warnings[0].line, 4);

        let doc = parse("{: #y}\n## Intro\n\nTheorem\n{: #y}\n\n\\Theorem\n", &Options::default()).unwrap();
        assert_eq!(doc.registry.category("y"), Some(Category::Section));
        assert_eq!(doc.warnings.len(), 1);
    }

    #[test]
    fn test_existing_numbers_replaced() {
        let doc = parse("## 3.4 Results", &Options::default()).unwrap();
        assert_eq!(heading_text(&doc.blocks[0]), "1 Results");
    }

    #[test]
    fn test_numbering_disabled() {
        let options = Options {
            auto_number_headers: false,
            ..Options::default()
        };
        let doc = parse("## Intro {#intro}", &options).unwrap();
        assert_eq!(heading_text(&doc.blocks[0]), "Intro");
        assert!(doc.registry.get("intro").is_none());
    }

    #[test]
    fn test_equation_labels_registered() {
        let doc = parse(
            "$$\n\\begin{align}\na &= b \\label{eq1} \\\\\nc &= d \\label{ eq2 }\n\\end{align}\n$$",
            &Options::default(),
        )
        .unwrap();
        assert_eq!(doc.registry.category("eq1"), Some(Category::Eqn));
        assert_eq!(doc.registry.category("eq2"), Some(Category::Eqn));
    }

    #[test]
    fn test_inline_math_span() {
        let doc = parse("Let $x_1$ be $$y$$.", &Options::default()).unwrap();
        assert_eq!(
            doc.blocks[0].kind,
            BlockKind::Paragraph(vec![
                Inline::Text("Let ".into()),
                Inline::Math("x_1".into()),
                Inline::Text(" be ".into()),
                Inline::Math("y".into()),
                Inline::Text(".".into()),
            ])
        );
    }

    #[test]
    fn test_citation_ignored_without_bibliography() {
        let doc = parse("See [citep: Weinberg1989].", &Options::default()).unwrap();
        assert_eq!(
            doc.blocks[0].kind,
            BlockKind::Paragraph(vec![Inline::Text("See [citep: Weinberg1989].".into())])
        );
        assert!(doc.warnings.is_empty());
    }

    #[test]
    fn test_reference_section_appended() {
        let bibliography =
            Bibliography::parse("@book{W, author = {Weinberg, Steven}, title = {Cosmology}, publisher = {OUP}, year = {2008}}")
                .unwrap();
        let options = Options::default().with_bibliography(bibliography);
        let doc = parse("As [citet: W, nobody] shows.", &options).unwrap();

        assert_eq!(doc.blocks.len(), 3);
        assert_eq!(heading_text(&doc.blocks[1]), "References");
        assert_eq!(doc.blocks[1].line, 2);
        assert_eq!(doc.blocks[2].attrs.get("class"), Some("bibliography-item"));
        assert_eq!(doc.blocks[2].attrs.id(), Some("W"));
        assert_eq!(doc.warnings.len(), 1);
    }

    #[test]
    fn test_unclosed_environment_warns() {
        let doc = parse("Lemma\n\nBody.", &Options::default()).unwrap();
        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(doc.warnings.len(), 1);
        assert_eq!(doc.warnings[0].line, 1);
    }

    #[test]
    fn test_driver_state_is_per_document() {
        let options = Options {
            language: Language::English,
            ..Options::default()
        };
        for _ in 0..2 {
            let doc = parse("Theorem\n\n\\Theorem", &options).unwrap();
            match &doc.blocks[0].kind {
                BlockKind::Container { children, .. } => {
                    assert_eq!(heading_text(&children[0]), "Theorem 1");
                }
                other => panic!("Expected container, got {other:?}"),
            }
        }
    }
}
