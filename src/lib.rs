//! # markdown-latexish
//!
//! Markdown for academic articles: numbered section headers, theorem-like
//! environments, abstracts, cross-references, author-year citations with a
//! generated reference list, and a preamble of LaTeX macros for the math
//! typesetter.
//!
//! ## Quick Start
//!
//! ```rust
//! use markdown_latexish::{render, HtmlConfig, Options};
//!
//! let input = r#"
//! Introduction {#intro}
//! ---------------------
//!
//! Theorem (Pythagoras)
//! {: #pythagoras}
//!
//! $a^2 + b^2 = c^2$
//!
//! \Theorem
//!
//! [Cref: pythagoras] is proven in [cref: intro].
//! "#;
//!
//! let html = render(input, &Options::default(), &HtmlConfig::default()).unwrap();
//! assert!(html.contains("<h2 id=\"intro\">1 Introduction</h2>"));
//! assert!(html.contains("Theorem&nbsp;<a href=\"#pythagoras\" title=\"Theorem 1\">1</a>"));
//! ```
//!
//! ## Syntax Reference
//!
//! ### Front Matter (TOML)
//!
//! ```text
//! +++
//! title = "My Document"
//! author = "Jane Doe"
//! language = "french"
//! bibliography = "refs.bib"
//! latex_macros = ['\newcommand{\R}{\mathbb{R}}']
//! +++
//! ```
//!
//! Any option key may appear in the front matter and overrides the options
//! passed by the caller for that document.
//!
//! ### Headers
//!
//! Headers below the top level are numbered hierarchically (`1`, `1.1`, ...).
//! A number typed by the author is replaced. Give a header an id with
//! `## Title {#id}` or an attribute list `{: #id}` to refer to it.
//!
//! ### Environments
//!
//! ```text
//! Lemma (optional label)
//! {: #lemma-id}
//!
//! Statement of the lemma.
//!
//! \Lemma
//! ```
//!
//! Definition, postulate, property, lemma, theorem and corollary are numbered
//! per kind. `Abstract` ... `\Abstract` wraps the abstract. Names follow the
//! document language (`Théorème` in French).
//!
//! ### Math
//!
//! - Inline: `$E = mc^2$` or `$$E = mc^2$$` inside a paragraph
//! - Display: `$$ ... $$` on its own lines, with `\label{id}` for references
//!
//! ### Cross-References
//!
//! - `[cref: id]`, `[cref: id1, id2]`, capitalized with `[Cref: id]`
//! - Sections and environments become links; equations become `\eqref{id}`
//!
//! ### Citations
//!
//! - Parenthetical `[citep: key]` gives `(Author, Year)`
//! - Textual `[citet: key1, key2]` gives `Author (Year)`
//! - `*key` abbreviates many authors to `First et al`
//!
//! Cited entries are listed in a generated references section at the end of
//! the document, formatted in the APA or Chicago author-date style.
//!
//! ## FFI
//!
//! The library provides a C-compatible FFI; see the `ffi` module.

pub mod ast;
pub mod bibliography;
pub mod error;
pub mod lexical;
pub mod options;
pub mod parser;
pub mod render;
pub mod resolve;

// FFI module (always compiled for cdylib)
pub mod ffi;

// Convenience re-exports
pub use ast::{Attributes, Block, BlockKind, Document, Inline};
pub use bibliography::{BibEntry, Bibliography};
pub use error::{ConfigError, Error, ParseError, Result, Warning};
pub use lexical::{Category, Language};
pub use options::Options;
pub use parser::parse;
pub use render::{render_html, HtmlConfig, MathBackend};

/// Parse and render Markdown to HTML in one step.
///
/// Warnings are logged through `tracing`; use [`parse`] and [`render_html`]
/// to inspect them.
///
/// # Example
///
/// ```rust
/// use markdown_latexish::{render, HtmlConfig, Options};
///
/// let html = render("## Hello *world*", &Options::default(), &HtmlConfig::default()).unwrap();
/// assert_eq!(html, "<h2>1 Hello <em>world</em></h2>\n");
/// ```
pub fn render(input: &str, options: &Options, config: &HtmlConfig) -> Result<String> {
    let doc = parse(input, options)?;
    Ok(render_document(&doc, options, config))
}

/// Render a parsed document, taking the page language from `options`.
pub fn render_document(doc: &Document, options: &Options, config: &HtmlConfig) -> String {
    if config.standalone {
        let config = HtmlConfig {
            lang: options.language.code().to_string(),
            ..config.clone()
        };
        render_html(doc, &config)
    } else {
        render_html(doc, config)
    }
}
