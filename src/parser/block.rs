//! Block-level parsing for Markdown.
//!
//! Paragraph and header text is kept raw (one text node) so that span parsing
//! can run once the whole tree, and every identifier in it, is known.

use crate::ast::{Attributes, Block, BlockKind, ListItem};
use crate::parser::lexer::{
    attribute_list, block_attributes, block_quote_marker, fenced_code_start, heading,
    link_definition, list_item_marker, setext_underline, thematic_break, AttributeToken,
    ListMarker, Token,
};
use std::collections::HashMap;

/// Identity of one child list (the document root, a list item, a block quote).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerId(pub(crate) usize);

/// Callbacks fired while blocks are produced.
pub trait BlockHooks {
    /// Called for every header before it is added; returns the text to keep.
    fn header(&mut self, _level: u8, text: &str, _id: Option<&str>, _line: usize) -> String {
        text.to_string()
    }

    /// Called after a paragraph has been appended to `siblings`.
    fn paragraph(&mut self, _siblings: &mut Vec<Block>, _container: ContainerId) {}

    /// Called with the raw source of every `$$` math block.
    fn display_math(&mut self, _source: &str, _line: usize) {}

    /// Called when an attribute list has been merged into `block`.
    fn attributes(&mut self, _block: &Block) {}
}

/// Hooks that leave everything untouched.
#[derive(Debug, Default)]
pub struct Plain;

impl BlockHooks for Plain {}

/// Target of a reference-style link.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkDefinition {
    pub url: String,
    pub title: Option<String>,
}

/// Link definitions keyed by lowercased id.
pub type LinkDefinitions = HashMap<String, LinkDefinition>;

/// Output of the block phase.
#[derive(Debug, Default)]
pub struct ParsedBlocks {
    pub blocks: Vec<Block>,
    pub link_definitions: LinkDefinitions,
}

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    number: usize,
    text: &'a str,
}

/// Parse all blocks from content. `first_line` is the number of the first line.
pub fn parse_blocks<H: BlockHooks>(input: &str, first_line: usize, hooks: &mut H) -> ParsedBlocks {
    let lines: Vec<Line> = input
        .lines()
        .enumerate()
        .map(|(i, text)| Line {
            number: first_line + i,
            text,
        })
        .collect();

    let mut parser = BlockParser {
        hooks,
        link_definitions: LinkDefinitions::new(),
        containers: 0,
    };
    let blocks = parser.parse_lines(&lines);

    ParsedBlocks {
        blocks,
        link_definitions: parser.link_definitions,
    }
}

struct BlockParser<'h, H> {
    hooks: &'h mut H,
    link_definitions: LinkDefinitions,
    containers: usize,
}

impl<H: BlockHooks> BlockParser<'_, H> {
    fn parse_lines(&mut self, lines: &[Line]) -> Vec<Block> {
        let container = ContainerId(self.containers);
        self.containers += 1;

        let mut blocks: Vec<Block> = Vec::new();
        let mut pending = Attributes::new();
        let mut after_blank = true;
        let mut i = 0;

        while i < lines.len() {
            let trimmed = lines[i].text.trim();

            if trimmed.is_empty() {
                after_blank = true;
                i += 1;
                continue;
            }

            // An attribute list right below a block belongs to it, otherwise to the next one
            if let Ok((_, Token::BlockAttributes(content))) = block_attributes(trimmed) {
                let attrs = parse_attributes(content);
                match blocks.last_mut() {
                    Some(last) if !after_blank => {
                        last.attrs.merge(&attrs);
                        self.hooks.attributes(last);
                    }
                    _ => pending.merge(&attrs),
                }
                after_blank = false;
                i += 1;
                continue;
            }

            if let Ok((_, Token::LinkDefinition { id, url, title })) = link_definition(trimmed) {
                self.link_definitions.insert(
                    id.to_lowercase(),
                    LinkDefinition {
                        url: url.to_string(),
                        title: title.map(String::from),
                    },
                );
                after_blank = false;
                i += 1;
                continue;
            }

            let (mut block, consumed) = self.parse_block(&lines[i..]);
            if !pending.is_empty() {
                block.attrs.merge(&std::mem::take(&mut pending));
                self.hooks.attributes(&block);
            }
            let is_paragraph = matches!(block.kind, BlockKind::Paragraph(_));
            blocks.push(block);
            if is_paragraph {
                self.hooks.paragraph(&mut blocks, container);
            }

            after_blank = false;
            i += consumed.max(1);
        }

        blocks
    }

    fn parse_block(&mut self, lines: &[Line]) -> (Block, usize) {
        if let Some(block) = self.try_parse_heading(lines[0]) {
            (block, 1)
        } else if let Some(parsed) = try_parse_fenced_code(lines) {
            parsed
        } else if let Some(parsed) = self.try_parse_display_math(lines) {
            parsed
        } else if let Some(parsed) = self.try_parse_block_quote(lines) {
            parsed
        } else if let Some(parsed) = self.try_parse_list(lines) {
            parsed
        } else if thematic_break(lines[0].text.trim()).is_ok() {
            (Block::new(BlockKind::ThematicBreak, lines[0].number), 1)
        } else if let Some(block) = self.try_parse_setext_heading(lines) {
            (block, 2)
        } else {
            parse_paragraph(lines)
        }
    }

    fn try_parse_heading(&mut self, line: Line) -> Option<Block> {
        let trimmed = line.text.trim_start();
        if !trimmed.starts_with('#') {
            return None;
        }

        match heading(trimmed) {
            Ok((_, Token::Heading(level, content))) => {
                Some(self.make_heading(level, content, line.number))
            }
            _ => None,
        }
    }

    fn try_parse_setext_heading(&mut self, lines: &[Line]) -> Option<Block> {
        let underline = lines.get(1)?;
        match setext_underline(underline.text.trim()) {
            Ok((_, Token::SetextUnderline(level))) => {
                Some(self.make_heading(level, lines[0].text.trim(), lines[0].number))
            }
            _ => None,
        }
    }

    fn make_heading(&mut self, level: u8, content: &str, line: usize) -> Block {
        let (text, id) = extract_label(content);
        let text = self.hooks.header(level, text.trim(), id.as_deref(), line);
        let mut block = Block::heading(level, text, line);
        if let Some(id) = id {
            block.attrs.set("id", id);
        }
        block
    }

    fn try_parse_display_math(&mut self, lines: &[Line]) -> Option<(Block, usize)> {
        let first = lines[0].text.trim_start();
        let after_open = first.strip_prefix("$$")?;

        // Single-line display math; anything after the closing $$ makes it inline
        if let Some(end_pos) = after_open.find("$$") {
            if !after_open[end_pos + 2..].trim().is_empty() {
                return None;
            }
            let content = after_open[..end_pos].trim();
            self.hooks.display_math(content, lines[0].number);
            return Some((
                Block::new(BlockKind::DisplayMath(content.to_string()), lines[0].number),
                1,
            ));
        }

        // Multi-line display math
        let mut content = String::from(after_open);
        let mut i = 1;

        while i < lines.len() {
            let line = lines[i].text;
            if let Some(end_pos) = line.find("$$") {
                content.push('\n');
                content.push_str(&line[..end_pos]);
                i += 1;
                break;
            }
            content.push('\n');
            content.push_str(line);
            i += 1;
        }

        let content = content.trim();
        self.hooks.display_math(content, lines[0].number);
        Some((
            Block::new(BlockKind::DisplayMath(content.to_string()), lines[0].number),
            i,
        ))
    }

    fn try_parse_block_quote(&mut self, lines: &[Line]) -> Option<(Block, usize)> {
        if !lines[0].text.trim_start().starts_with('>') {
            return None;
        }

        let mut quote_lines = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];
            let trimmed = line.text.trim_start();

            if let Ok((content, Token::BlockQuoteMarker)) = block_quote_marker(trimmed) {
                quote_lines.push(Line {
                    number: line.number,
                    text: content,
                });
                i += 1;
            } else if trimmed.is_empty()
                && i + 1 < lines.len()
                && lines[i + 1].text.trim_start().starts_with('>')
            {
                // Blank line within quote
                quote_lines.push(Line {
                    number: line.number,
                    text: "",
                });
                i += 1;
            } else {
                break;
            }
        }

        let inner_blocks = self.parse_lines(&quote_lines);
        Some((
            Block::new(BlockKind::BlockQuote(inner_blocks), lines[0].number),
            i,
        ))
    }

    fn try_parse_list(&mut self, lines: &[Line]) -> Option<(Block, usize)> {
        let first = lines[0].text;
        let trimmed = first.trim_start();
        let indent = first.len() - trimmed.len();

        let Ok((_, Token::ListItemMarker(marker_type))) = list_item_marker(trimmed) else {
            return None;
        };

        let ordered = matches!(marker_type, ListMarker::Ordered(_));
        let start = match marker_type {
            ListMarker::Ordered(n) => Some(n),
            ListMarker::Unordered => None,
        };

        let mut items = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];
            let trimmed = line.text.trim_start();
            let current_indent = line.text.len() - trimmed.len();

            if let Ok((rest, Token::ListItemMarker(m))) = list_item_marker(trimmed) {
                let same_type = matches!(
                    (&marker_type, &m),
                    (ListMarker::Ordered(_), ListMarker::Ordered(_))
                        | (ListMarker::Unordered, ListMarker::Unordered)
                );
                if current_indent > indent || !same_type {
                    break;
                }

                let mut item_lines = vec![Line {
                    number: line.number,
                    text: rest,
                }];
                i += 1;

                while i < lines.len() {
                    let next_line = lines[i];
                    let next_trimmed = next_line.text.trim_start();
                    let next_indent = next_line.text.len() - next_trimmed.len();

                    // A sibling item ends this one
                    if list_item_marker(next_trimmed).is_ok() && next_indent <= indent {
                        break;
                    }

                    if next_trimmed.is_empty() {
                        // Check if next non-blank line continues the item
                        let mut j = i + 1;
                        while j < lines.len() && lines[j].text.trim().is_empty() {
                            j += 1;
                        }
                        if j < lines.len() {
                            let future_indent =
                                lines[j].text.len() - lines[j].text.trim_start().len();
                            if future_indent <= indent {
                                break;
                            }
                        }
                    }

                    // Indented or lazy continuation
                    item_lines.push(Line {
                        number: next_line.number,
                        text: next_trimmed,
                    });
                    i += 1;
                }

                items.push(ListItem {
                    content: self.parse_lines(&item_lines),
                });
            } else if current_indent > indent || trimmed.is_empty() {
                i += 1;
            } else {
                break;
            }
        }

        if items.is_empty() {
            return None;
        }

        Some((
            Block::new(
                BlockKind::List {
                    ordered,
                    start,
                    items,
                },
                lines[0].number,
            ),
            i,
        ))
    }
}

fn try_parse_fenced_code(lines: &[Line]) -> Option<(Block, usize)> {
    let first = lines[0].text.trim_start();
    let fence = if first.starts_with("```") {
        "```"
    } else if first.starts_with("~~~") {
        "~~~"
    } else {
        return None;
    };

    let Ok((_, Token::FencedCodeStart(lang))) = fenced_code_start(first) else {
        return None;
    };
    let language = if lang.is_empty() {
        None
    } else {
        Some(lang.to_string())
    };

    let mut content = String::new();
    let mut i = 1;

    while i < lines.len() {
        let line = lines[i].text;
        if line.trim_start().starts_with(fence) {
            i += 1;
            break;
        }
        if i > 1 {
            content.push('\n');
        }
        content.push_str(line);
        i += 1;
    }

    // An unclosed fence runs to the end of the input
    Some((
        Block::new(BlockKind::CodeBlock { language, content }, lines[0].number),
        i,
    ))
}

fn parse_paragraph(lines: &[Line]) -> (Block, usize) {
    let mut para_lines = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].text;
        let trimmed = line.trim();

        // End paragraph on blank line
        if trimmed.is_empty() {
            break;
        }

        // End paragraph on block-level element
        if i > 0
            && (heading(trimmed).is_ok()
                || trimmed.starts_with("```")
                || trimmed.starts_with("~~~")
                || trimmed.starts_with("$$")
                || trimmed.starts_with('>')
                || thematic_break(trimmed).is_ok()
                || block_attributes(trimmed).is_ok()
                || list_item_marker(trimmed).is_ok())
        {
            break;
        }

        para_lines.push(line.trim_start());
        i += 1;
    }

    let text = para_lines.join("\n");
    (
        Block::raw_paragraph(text.trim_end(), lines[0].number),
        i.max(1),
    )
}

fn parse_attributes(content: &str) -> Attributes {
    let mut attrs = Attributes::new();
    if let Ok((_, tokens)) = attribute_list(content) {
        for token in tokens {
            match token {
                AttributeToken::Id(id) => attrs.set("id", id),
                AttributeToken::Class(class) => attrs.add_class(class),
                AttributeToken::Pair(key, value) => attrs.set(key, value),
            }
        }
    }
    attrs
}

/// Extract a label from the end of a string ({#label}).
fn extract_label(s: &str) -> (&str, Option<String>) {
    let trimmed = s.trim_end();
    if let Some(start) = trimmed.rfind("{#") {
        if let Some(end) = trimmed[start..].find('}') {
            let label = &trimmed[start + 2..start + end];
            let content = trimmed[..start].trim_end();
            return (content, Some(label.to_string()));
        }
    }
    (s, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Vec<Block> {
        parse_blocks(input, 1, &mut Plain).blocks
    }

    #[derive(Default)]
    struct Recorder {
        headers: Vec<(u8, String, Option<String>, usize)>,
        paragraphs: Vec<(usize, ContainerId)>,
        math: Vec<String>,
        attributes: Vec<(usize, Option<String>)>,
    }

    impl BlockHooks for Recorder {
        fn header(&mut self, level: u8, text: &str, id: Option<&str>, line: usize) -> String {
            self.headers
                .push((level, text.to_string(), id.map(String::from), line));
            format!("N {text}")
        }

        fn paragraph(&mut self, siblings: &mut Vec<Block>, container: ContainerId) {
            self.paragraphs.push((siblings.len() - 1, container));
        }

        fn display_math(&mut self, source: &str, _line: usize) {
            self.math.push(source.to_string());
        }

        fn attributes(&mut self, block: &Block) {
            self.attributes
                .push((block.line, block.attrs.id().map(String::from)));
        }
    }

    #[test]
    fn test_parse_heading_with_label() {
        let blocks = parse("## Introduction {#sec:intro}");
        assert_eq!(blocks.len(), 1);
        if let BlockKind::Heading { level, content } = &blocks[0].kind {
            assert_eq!(*level, 2);
            assert_eq!(content, &vec![crate::ast::Inline::Text("Introduction".into())]);
        } else {
            panic!("Expected heading");
        }
        assert_eq!(blocks[0].attrs.id(), Some("sec:intro"));
    }

    #[test]
    fn test_header_hook_rewrites_text() {
        let mut recorder = Recorder::default();
        let parsed = parse_blocks("# Title\n\n## Bravo {#mark}\n\nHotel\n-----", 1, &mut recorder);
        assert_eq!(
            recorder.headers,
            vec![
                (1, "Title".to_string(), None, 1),
                (2, "Bravo".to_string(), Some("mark".to_string()), 3),
                (2, "Hotel".to_string(), None, 5),
            ]
        );
        assert_eq!(parsed.blocks.len(), 3);
        assert_eq!(
            parsed.blocks[2].kind,
            BlockKind::Heading {
                level: 2,
                content: vec![crate::ast::Inline::Text("N Hotel".into())],
            }
        );
    }

    #[test]
    fn test_paragraph_keeps_raw_text() {
        let blocks = parse("Some text before.\nLemma\n\nAfter");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].paragraph_text(), Some("Some text before.\nLemma"));
        assert_eq!(blocks[1].line, 4);
    }

    #[test]
    fn test_attribute_list_before_and_after() {
        let blocks = parse("{: #lemma12 .important}\nLemma\n\nTheorem\n{: #ref1}\n\\Theorem");
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].attrs.id(), Some("lemma12"));
        assert_eq!(blocks[0].attrs.get("class"), Some("important"));
        assert_eq!(blocks[1].paragraph_text(), Some("Theorem"));
        assert_eq!(blocks[1].attrs.id(), Some("ref1"));
        assert_eq!(blocks[2].paragraph_text(), Some("\\Theorem"));
        assert!(blocks[2].attrs.is_empty());
    }

    #[test]
    fn test_paragraph_hook_sees_siblings() {
        let mut recorder = Recorder::default();
        parse_blocks("One\n\n- item\n\nTwo", 1, &mut recorder);
        assert_eq!(recorder.paragraphs.len(), 3);
        let (root_first, root) = recorder.paragraphs[0];
        let (item_index, item) = recorder.paragraphs[1];
        let (root_second, root_again) = recorder.paragraphs[2];
        assert_eq!((root_first, item_index, root_second), (0, 0, 2));
        assert_eq!(root, root_again);
        assert_ne!(root, item);
    }

    #[test]
    fn test_list_lazy_continuation() {
        let blocks = parse("- item one\n- item two\n\\Lemma");
        assert_eq!(blocks.len(), 1);
        if let BlockKind::List { ordered, items, .. } = &blocks[0].kind {
            assert!(!ordered);
            assert_eq!(items.len(), 2);
            assert_eq!(items[1].content[0].paragraph_text(), Some("item two\n\\Lemma"));
        } else {
            panic!("Expected list");
        }
    }

    #[test]
    fn test_parse_code_block() {
        let blocks = parse("```rust\nfn main() {}\n```");
        if let BlockKind::CodeBlock { language, content } = &blocks[0].kind {
            assert_eq!(language.as_deref(), Some("rust"));
            assert_eq!(content, "fn main() {}");
        } else {
            panic!("Expected code block");
        }
    }

    #[test]
    fn test_display_math_hook() {
        let mut recorder = Recorder::default();
        let parsed = parse_blocks(
            "$$\n\\begin{aligned}\na &= b \\label{eq1}\n\\end{aligned}\n$$\n\n$$ x $$",
            1,
            &mut recorder,
        );
        assert_eq!(parsed.blocks.len(), 2);
        assert_eq!(
            recorder.math,
            vec![
                "\\begin{aligned}\na &= b \\label{eq1}\n\\end{aligned}".to_string(),
                "x".to_string(),
            ]
        );
    }

    #[test]
    fn test_inline_double_dollar_is_paragraph() {
        let blocks = parse("$$x^2$$ is still fine");
        assert!(matches!(blocks[0].kind, BlockKind::Paragraph(_)));
    }

    #[test]
    fn test_link_definitions_collected() {
        let parsed = parse_blocks(
            "See [CERN].\n\n[CERN]: https://home.cern \"The Home of LHC\"",
            1,
            &mut Plain,
        );
        assert_eq!(parsed.blocks.len(), 1);
        let def = parsed.link_definitions.get("cern").unwrap();
        assert_eq!(def.url, "https://home.cern");
        assert_eq!(def.title.as_deref(), Some("The Home of LHC"));
    }

    #[test]
    fn test_block_quote_and_break() {
        let blocks = parse("> quoted\n> text\n\n---");
        assert_eq!(blocks.len(), 2);
        if let BlockKind::BlockQuote(inner) = &blocks[0].kind {
            assert_eq!(inner[0].paragraph_text(), Some("quoted\ntext"));
        } else {
            panic!("Expected block quote");
        }
        assert_eq!(blocks[1].kind, BlockKind::ThematicBreak);
    }

    #[test]
    fn test_first_line_offset() {
        let blocks = parse_blocks("a\n\nb", 40, &mut Plain).blocks;
        assert_eq!(blocks[0].line, 40);
        assert_eq!(blocks[1].line, 42);
    }

    #[test]
    fn test_attributes_hook_fires_in_document_order() {
        let mut recorder = Recorder::default();
        let blocks = parse_blocks(
            "## One\n{: #one}\n\n{: #two}\n## Two\n\nText\n{: .note}",
            1,
            &mut recorder,
        )
        .blocks;
        assert_eq!(blocks.len(), 3);
        assert_eq!(
            recorder.attributes,
            vec![
                (1, Some("one".to_string())),
                (5, Some("two".to_string())),
                (7, None),
            ]
        );
    }
}
