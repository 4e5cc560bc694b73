//! Theorem-like environments and abstracts.
//!
//! An environment is a paragraph holding only its name (`Theorem`, optionally
//! followed by a parenthesized label), the blocks that follow, and a paragraph
//! holding only `\Theorem`. When the end paragraph arrives the whole span is
//! folded into one container in the parent's child list.

use crate::ast::{replace_range, Block, BlockKind};
use crate::error::Diagnostics;
use crate::lexical::{capitalize, Category, Form, Lexical};
use crate::parser::block::ContainerId;
use crate::parser::lexer::{environment_end, environment_start};
use crate::resolve::{Registry, TheoremCounters};

/// What a paragraph's text says about environments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentMatch<'a> {
    Start {
        category: Category,
        name: &'a str,
        label: Option<&'a str>,
    },
    End {
        category: Category,
        name: &'a str,
    },
}

/// The capitalized environment names of one language.
#[derive(Debug, Clone)]
pub struct EnvironmentMatcher {
    names: Vec<(String, Category)>,
}

impl EnvironmentMatcher {
    pub fn new(lex: &Lexical) -> Self {
        let names = Category::THEOREM_LIKE
            .iter()
            .chain(std::iter::once(&Category::Abstract))
            .map(|&category| (capitalize(&lex.localise(category, Form::Singular)), category))
            .collect();
        Self { names }
    }

    /// Match a paragraph's whole text against every environment name.
    pub fn matches<'a>(&'a self, text: &'a str) -> Option<EnvironmentMatch<'a>> {
        self.names.iter().find_map(|(name, category)| {
            if let Ok((_, label)) = environment_start(text, name) {
                return Some(EnvironmentMatch::Start {
                    category: *category,
                    name,
                    label,
                });
            }
            environment_end(text, name).ok().map(|_| EnvironmentMatch::End {
                category: *category,
                name,
            })
        })
    }
}

/// The currently open environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentMarker {
    pub category: Category,
    pub name: String,
    /// Label with its parentheses, e.g. `(Hölder inequality)`.
    pub label: Option<String>,
    /// Index of the start paragraph in its parent's children.
    pub index: usize,
    pub container: ContainerId,
    pub line: usize,
}

/// An end paragraph, as seen when it is appended.
#[derive(Debug)]
struct ClosingMarker {
    category: Category,
    name: String,
    line: usize,
    container: ContainerId,
}

/// Folds environments into containers as paragraphs are produced.
#[derive(Debug, Clone)]
pub struct EnvironmentTracker {
    matcher: EnvironmentMatcher,
    open: Option<EnvironmentMarker>,
    counters: TheoremCounters,
    header_level: u8,
}

impl EnvironmentTracker {
    pub fn new(lex: &Lexical, header_level: u8) -> Self {
        Self {
            matcher: EnvironmentMatcher::new(lex),
            open: None,
            counters: TheoremCounters::new(),
            header_level,
        }
    }

    pub fn open(&self) -> Option<&EnvironmentMarker> {
        self.open.as_ref()
    }

    /// Inspect the paragraph just appended to `siblings`.
    pub fn on_paragraph(
        &mut self,
        siblings: &mut Vec<Block>,
        container: ContainerId,
        registry: &mut Registry,
        diagnostics: &mut Diagnostics,
    ) {
        let Some(last) = siblings.last() else {
            return;
        };
        let line = last.line;
        let Some(text) = last.paragraph_text() else {
            return;
        };

        match self.matcher.matches(text) {
            Some(EnvironmentMatch::Start {
                category,
                name,
                label,
            }) => {
                let marker = EnvironmentMarker {
                    category,
                    name: name.to_string(),
                    label: label.map(String::from),
                    index: siblings.len() - 1,
                    container,
                    line,
                };
                if let Some(abandoned) = self.open.replace(marker) {
                    diagnostics.warn(
                        line,
                        format!(
                            "{} on line {} is never closed before {name} on line {line}",
                            abandoned.name, abandoned.line
                        ),
                    );
                }
            }
            Some(EnvironmentMatch::End { category, name }) => {
                let end = ClosingMarker {
                    category,
                    name: name.to_string(),
                    line,
                    container,
                };
                self.close(end, siblings, registry, diagnostics);
            }
            None => {}
        }
    }

    fn close(
        &mut self,
        end: ClosingMarker,
        siblings: &mut Vec<Block>,
        registry: &mut Registry,
        diagnostics: &mut Diagnostics,
    ) {
        let ClosingMarker {
            category,
            name,
            line,
            container,
        } = end;
        let Some(marker) = self.open.take() else {
            diagnostics.warn(
                line,
                format!("`\\{name}` on line {line} without any `{name}` earlier on"),
            );
            return;
        };

        if marker.category != category {
            diagnostics.warn(
                line,
                format!(
                    "\\{name} on line {line} does not match {} on line {}",
                    marker.name, marker.line
                ),
            );
            return;
        }

        // Start and end must share a parent for the index range to mean anything
        let end = siblings.len() - 1;
        if marker.container != container || marker.index >= end {
            diagnostics.warn(
                line,
                format!(
                    "\\{name} on line {line} is not at the same level as {} on line {}",
                    marker.name, marker.line
                ),
            );
            self.open = Some(marker);
            return;
        }

        let mut attrs = siblings[marker.index].attrs.clone();
        let (tag, header) = if category.is_theorem_like() {
            attrs.add_class("theorem-like");
            let number = self.counters.next(category);
            if let Some(id) = attrs.id() {
                if !registry.register(id, category, Some(number.to_string())) {
                    diagnostics.warn(
                        marker.line,
                        format!("Duplicate id '{id}' on line {}", marker.line),
                    );
                }
            }
            let label = marker.label.as_deref().unwrap_or("");
            let text = format!("**{} {number}** {label}", marker.name);
            (
                "section",
                Some(Block::heading(self.header_level, text.trim_end(), marker.line)),
            )
        } else {
            attrs.add_class("abstract");
            ("div", None)
        };

        let node = Block::container(tag, Vec::new(), marker.line).with_attrs(attrs);
        let mut removed = replace_range(siblings, marker.index, end + 1, node).into_iter();
        // Drop the start and end paragraphs
        removed.next();
        removed.next_back();

        let mut children: Vec<Block> = header.into_iter().collect();
        children.extend(removed);
        if let BlockKind::Container { children: slot, .. } = &mut siblings[marker.index].kind {
            *slot = children;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Attributes, Inline};
    use crate::lexical::Language;
    use pretty_assertions::assert_eq;

    struct Fixture {
        tracker: EnvironmentTracker,
        registry: Registry,
        diagnostics: Diagnostics,
        blocks: Vec<Block>,
    }

    impl Fixture {
        fn new(language: Language) -> Self {
            Self {
                tracker: EnvironmentTracker::new(&Lexical::new(language), 5),
                registry: Registry::new(),
                diagnostics: Diagnostics::new(),
                blocks: Vec::new(),
            }
        }

        fn push(&mut self, text: &str) {
            self.push_in(text, ContainerId(0));
        }

        fn push_in(&mut self, text: &str, container: ContainerId) {
            let line = self.blocks.len() + 1;
            self.blocks.push(Block::raw_paragraph(text, line));
            self.tracker.on_paragraph(
                &mut self.blocks,
                container,
                &mut self.registry,
                &mut self.diagnostics,
            );
        }

        fn children(&self, index: usize) -> &[Block] {
            match &self.blocks[index].kind {
                BlockKind::Container { children, .. } => children,
                other => panic!("Expected container, got {other:?}"),
            }
        }
    }

    fn heading_text(block: &Block) -> &str {
        match &block.kind {
            BlockKind::Heading { content, .. } => match content.as_slice() {
                [Inline::Text(text)] => text,
                _ => panic!("Expected raw heading"),
            },
            _ => panic!("Expected heading"),
        }
    }

    #[test]
    fn test_matcher() {
        let lex = Lexical::new(Language::English);
        let matcher = EnvironmentMatcher::new(&lex);
        assert_eq!(
            matcher.matches("Theorem (Hölder inequality)"),
            Some(EnvironmentMatch::Start {
                category: Category::Theorem,
                name: "Theorem",
                label: Some("(Hölder inequality)"),
            })
        );
        assert_eq!(
            matcher.matches("\\Abstract"),
            Some(EnvironmentMatch::End { category: Category::Abstract, name: "Abstract" })
        );
        assert_eq!(matcher.matches("theorem"), None);
        assert_eq!(matcher.matches("Lemma (a) and more"), None);
        assert_eq!(matcher.matches("Section"), None);
    }

    #[test]
    fn test_french_matcher() {
        let matcher = EnvironmentMatcher::new(&Lexical::new(Language::French));
        assert!(matches!(
            matcher.matches("Théorème"),
            Some(EnvironmentMatch::Start { category: Category::Theorem, .. })
        ));
        assert_eq!(matcher.matches("Theorem"), None);
    }

    #[test]
    fn test_theorem_folds_into_section() {
        let mut f = Fixture::new(Language::English);
        f.push("Some text before.");
        f.push("Theorem (Hölder inequality)");
        f.blocks[1].attrs.set("id", "holder");
        f.push("Body.");
        f.push("\\Theorem");
        f.push("Some text after.");

        assert_eq!(f.blocks.len(), 3);
        let section = &f.blocks[1];
        assert!(matches!(&section.kind, BlockKind::Container { tag, .. } if tag == "section"));
        assert_eq!(section.attrs.get("class"), Some("theorem-like"));
        assert_eq!(section.attrs.id(), Some("holder"));

        let children = f.children(1);
        assert_eq!(children.len(), 2);
        assert_eq!(heading_text(&children[0]), "**Theorem 1** (Hölder inequality)");
        assert!(matches!(children[0].kind, BlockKind::Heading { level: 5, .. }));
        assert_eq!(children[1].paragraph_text(), Some("Body."));

        assert_eq!(f.registry.number("holder"), Some("1"));
        assert_eq!(f.registry.category("holder"), Some(Category::Theorem));
        assert!(f.diagnostics.is_empty());
        assert!(f.tracker.open().is_none());
    }

    #[test]
    fn test_counters_per_category() {
        let mut f = Fixture::new(Language::English);
        for name in ["Theorem", "Lemma", "Theorem", "Lemma", "Theorem"] {
            f.push(name);
            f.push(&format!("\\{name}"));
        }
        let headers: Vec<&str> = (0..5).map(|i| heading_text(&f.children(i)[0])).collect();
        assert_eq!(
            headers,
            vec!["**Theorem 1**", "**Lemma 1**", "**Theorem 2**", "**Lemma 2**", "**Theorem 3**"]
        );
    }

    #[test]
    fn test_abstract_has_no_header() {
        let mut f = Fixture::new(Language::English);
        f.push("Abstract");
        f.blocks[0].attrs.set("class", "lead");
        f.push("The text of the abstract would go here.");
        f.push("\\Abstract");

        assert_eq!(f.blocks.len(), 1);
        assert!(matches!(&f.blocks[0].kind, BlockKind::Container { tag, .. } if tag == "div"));
        assert_eq!(f.blocks[0].attrs.get("class"), Some("lead abstract"));
        assert_eq!(f.children(0).len(), 1);
    }

    #[test]
    fn test_end_without_start() {
        let mut f = Fixture::new(Language::English);
        f.push("Text.");
        f.push("\\Lemma");
        assert_eq!(f.blocks.len(), 2);
        assert_eq!(f.blocks[1].paragraph_text(), Some("\\Lemma"));
        assert_eq!(f.diagnostics.warnings().len(), 1);
    }

    #[test]
    fn test_mismatched_end_discards_start() {
        let mut f = Fixture::new(Language::English);
        f.push("Lemma");
        f.push("Body.");
        f.push("\\Theorem");
        assert_eq!(f.blocks.len(), 3);
        assert!(f.tracker.open().is_none());
        assert_eq!(f.diagnostics.warnings().len(), 1);

        // The abandoned start is not revived by a later end
        f.push("\\Lemma");
        assert_eq!(f.blocks.len(), 4);
        assert_eq!(f.diagnostics.warnings().len(), 2);
    }

    #[test]
    fn test_second_start_wins() {
        let mut f = Fixture::new(Language::English);
        f.push("Lemma");
        f.push("Theorem");
        f.push("Body.");
        f.push("\\Theorem");
        assert_eq!(f.blocks.len(), 2);
        assert_eq!(f.blocks[0].paragraph_text(), Some("Lemma"));
        assert_eq!(heading_text(&f.children(1)[0]), "**Theorem 1**");
        assert_eq!(f.diagnostics.warnings().len(), 1);
    }

    #[test]
    fn test_end_in_other_container_is_ignored() {
        let mut f = Fixture::new(Language::English);
        f.push("Lemma");
        f.push_in("\\Lemma", ContainerId(1));
        assert!(f.tracker.open().is_some());
        assert_eq!(f.diagnostics.warnings().len(), 1);

        f.push("\\Lemma");
        assert_eq!(f.blocks.len(), 1);
        assert_eq!(f.children(0).len(), 2);
    }

    #[test]
    fn test_duplicate_id_keeps_first() {
        let mut f = Fixture::new(Language::English);
        let mut attrs = Attributes::new();
        attrs.set("id", "dup");
        for name in ["Lemma", "Lemma"] {
            f.push(name);
            let start = f.blocks.len() - 1;
            f.blocks[start].attrs = attrs.clone();
            f.push(&format!("\\{name}"));
        }
        assert_eq!(f.registry.number("dup"), Some("1"));
        assert_eq!(f.diagnostics.warnings().len(), 1);
    }
}
