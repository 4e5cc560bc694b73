//! Inline-level parsing for Markdown.

use crate::ast::{Block, BlockKind, Inline};
use crate::parser::block::{LinkDefinitions, Plain};
use crate::parser::lexer::{
    display_math, emphasis, entity, escaped_char, inline_code, strong, typographic, Token,
};

/// Callbacks consulted while scanning inline content.
///
/// Each returns the produced nodes and the number of bytes consumed, or `None`
/// to let the built-in recognizers handle the position.
pub trait SpanHooks {
    /// Tried before the built-in spans wherever a span may start.
    fn span(&mut self, _input: &str, _line: usize) -> Option<(Vec<Inline>, usize)> {
        None
    }

    /// Tried where `[` may open a link (never directly after `!`).
    fn link(&mut self, _input: &str, _line: usize) -> Option<(Vec<Inline>, usize)> {
        None
    }
}

impl SpanHooks for Plain {}

/// Characters at which something other than plain text may start.
const SPECIAL: &[char] = &['*', '_', '`', '$', '[', '!', '<', '\\', '.', '-', '\n'];

/// Parse the raw text of every paragraph and header in `blocks`.
pub fn parse_spans<H: SpanHooks>(blocks: &mut [Block], links: &LinkDefinitions, hooks: &mut H) {
    InlineParser::new(hooks, links).parse_blocks(blocks);
}

/// Parse inline content from a string without any extensions.
pub fn parse_inlines(input: &str) -> Vec<Inline> {
    let links = LinkDefinitions::new();
    InlineParser::new(&mut Plain, &links).parse(input, 1)
}

/// Scanner turning raw text into inline nodes.
pub struct InlineParser<'a, H> {
    hooks: &'a mut H,
    links: &'a LinkDefinitions,
}

impl<'a, H: SpanHooks> InlineParser<'a, H> {
    pub fn new(hooks: &'a mut H, links: &'a LinkDefinitions) -> Self {
        Self { hooks, links }
    }

    fn parse_blocks(&mut self, blocks: &mut [Block]) {
        for block in blocks {
            let line = block.line;
            match &mut block.kind {
                BlockKind::Paragraph(content) | BlockKind::Heading { content, .. } => {
                    self.parse_raw(content, line);
                }
                BlockKind::BlockQuote(children) | BlockKind::Container { children, .. } => {
                    self.parse_blocks(children);
                }
                BlockKind::List { items, .. } => {
                    for item in items {
                        self.parse_blocks(&mut item.content);
                    }
                }
                _ => {}
            }
        }
    }

    fn parse_raw(&mut self, content: &mut Vec<Inline>, line: usize) {
        let raw = match content.as_mut_slice() {
            [Inline::Text(raw)] => std::mem::take(raw),
            _ => return,
        };
        *content = self.parse(&raw, line);
    }

    /// Parse inline content starting on source line `line`.
    pub fn parse(&mut self, input: &str, line: usize) -> Vec<Inline> {
        let mut inlines = Vec::new();
        let mut pos = 0;
        let mut line = line;

        while pos < input.len() {
            let rest = &input[pos..];
            let prev = input[..pos].chars().next_back();

            let consumed = if let Some((nodes, consumed)) = self.try_parse_inline(rest, prev, line) {
                for node in nodes {
                    match node {
                        Inline::Text(text) => push_text(&mut inlines, &text),
                        other => inlines.push(other),
                    }
                }
                consumed
            } else if rest.starts_with('\n') {
                push_break(&mut inlines);
                1
            } else {
                // Plain text up to the next special character; a special
                // character that started nothing is text too.
                let end = rest
                    .char_indices()
                    .skip(1)
                    .find(|(_, c)| SPECIAL.contains(c))
                    .map_or(rest.len(), |(i, _)| i);
                push_text(&mut inlines, &rest[..end]);
                end
            };

            line += input[pos..pos + consumed].matches('\n').count();
            pos += consumed;
        }

        inlines
    }

    fn try_parse_inline(
        &mut self,
        input: &str,
        prev: Option<char>,
        line: usize,
    ) -> Option<(Vec<Inline>, usize)> {
        let first = input.chars().next()?;
        if !SPECIAL.contains(&first) {
            return None;
        }

        if let Some(found) = self.hooks.span(input, line) {
            return Some(found);
        }

        match first {
            '\\' => {
                let (rest, c) = escaped_char(input).ok()?;
                Some((vec![Inline::Text(c.to_string())], input.len() - rest.len()))
            }
            '$' => match display_math(input) {
                Ok((rest, Token::DisplayMath(content))) => Some((
                    vec![Inline::Math(content.trim().to_string())],
                    input.len() - rest.len(),
                )),
                _ => None,
            },
            '*' | '_' => {
                // No intraword underscores
                if first == '_' && prev.is_some_and(char::is_alphanumeric) {
                    return None;
                }
                if let Ok((rest, Token::Strong(content))) = strong(input) {
                    let inner = self.parse(content, line);
                    return Some((vec![Inline::Strong(inner)], input.len() - rest.len()));
                }
                if let Ok((rest, Token::Emphasis(content))) = emphasis(input) {
                    let inner = self.parse(content, line);
                    return Some((vec![Inline::Emphasis(inner)], input.len() - rest.len()));
                }
                None
            }
            '`' => match inline_code(input) {
                Ok((rest, Token::InlineCode(content))) => Some((
                    vec![Inline::Code(content.to_string())],
                    input.len() - rest.len(),
                )),
                _ => None,
            },
            '!' => try_parse_image(input).map(|(image, consumed)| (vec![image], consumed)),
            '[' => {
                if prev != Some('!') {
                    if let Some(found) = self.hooks.link(input, line) {
                        return Some(found);
                    }
                }
                self.try_parse_link(input, line)
                    .map(|(link, consumed)| (vec![link], consumed))
            }
            '<' => try_parse_raw_html(input).map(|(html, consumed)| (vec![html], consumed)),
            '.' | '-' => {
                let (rest, symbol) = typographic(input).ok()?;
                Some((vec![Inline::Text(symbol.to_string())], input.len() - rest.len()))
            }
            _ => None,
        }
    }

    fn try_parse_link(&mut self, input: &str, line: usize) -> Option<(Inline, usize)> {
        // [text](url "title"), [text][id] or [id]
        let text_end = matching_bracket(input)?;
        let text = &input[1..text_end];
        let after_text = &input[text_end + 1..];

        if after_text.starts_with('(') {
            let url_end = matching_paren(after_text)?;
            let (url, title) = parse_url_and_title(&after_text[1..url_end]);
            let consumed = text_end + 1 + url_end + 1;
            let content = self.parse(text, line);
            return Some((
                Inline::Link {
                    url: url.to_string(),
                    title: title.map(String::from),
                    content,
                },
                consumed,
            ));
        }

        // Reference style: an explicit [id] or the text itself
        let (id, consumed) = match after_text.strip_prefix('[') {
            Some(after) => {
                let close = after.find(']')?;
                let id = if close == 0 { text } else { &after[..close] };
                (id, text_end + 1 + close + 2)
            }
            None => (text, text_end + 1),
        };

        let definition = self.links.get(&id.trim().to_lowercase())?;
        let content = self.parse(text, line);
        Some((
            Inline::Link {
                url: definition.url.clone(),
                title: definition.title.clone(),
                content,
            },
            consumed,
        ))
    }
}

fn push_text(inlines: &mut Vec<Inline>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Inline::Text(last)) = inlines.last_mut() {
        last.push_str(text);
    } else {
        inlines.push(Inline::Text(text.to_string()));
    }
}

fn push_break(inlines: &mut Vec<Inline>) {
    // Two trailing spaces make a hard break
    if let Some(Inline::Text(last)) = inlines.last_mut() {
        if last.ends_with("  ") {
            let trimmed = last.trim_end_matches(' ').len();
            last.truncate(trimmed);
            if last.is_empty() {
                inlines.pop();
            }
            inlines.push(Inline::HardBreak);
            return;
        }
    }
    inlines.push(Inline::SoftBreak);
}

fn matching_bracket(input: &str) -> Option<usize> {
    let mut depth = 0;
    for (i, c) in input.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn matching_paren(input: &str) -> Option<usize> {
    let mut depth = 0;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn try_parse_image(input: &str) -> Option<(Inline, usize)> {
    // ![alt](url "title")
    let after_bang = input.strip_prefix('!')?;
    if !after_bang.starts_with('[') {
        return None;
    }

    let close_bracket = after_bang.find(']')?;
    let alt = &after_bang[1..close_bracket];
    let after_alt = &after_bang[close_bracket + 1..];

    if !after_alt.starts_with('(') {
        return None;
    }
    let close_paren = after_alt.find(')')?;
    let (url, title) = parse_url_and_title(&after_alt[1..close_paren]);

    Some((
        Inline::Image {
            url: url.to_string(),
            alt: alt.to_string(),
            title: title.map(String::from),
        },
        1 + close_bracket + 1 + close_paren + 1,
    ))
}

fn parse_url_and_title(input: &str) -> (&str, Option<&str>) {
    let input = input.trim();

    for quote in ['"', '\''] {
        if let Some(quote_start) = input.find(quote) {
            if let Some(quote_end) = input[quote_start + 1..].find(quote) {
                let url = input[..quote_start].trim();
                let title = &input[quote_start + 1..quote_start + 1 + quote_end];
                return (url, Some(title));
            }
        }
    }

    (input, None)
}

fn try_parse_raw_html(input: &str) -> Option<(Inline, usize)> {
    let close = input.find('>')?;

    // Check if it looks like a tag
    let tag_content = &input[1..close];
    let starts_tag = tag_content
        .trim_start_matches('/')
        .chars()
        .next()
        .is_some_and(char::is_alphabetic);
    if !starts_tag || tag_content.contains('<') {
        return None;
    }

    Some((Inline::RawHtml(input[..=close].to_string()), close + 1))
}

/// Length of a leading HTML entity, if `input` starts with one.
pub fn entity_len(input: &str) -> Option<usize> {
    entity(input).ok().map(|(_, matched)| matched.len())
}
