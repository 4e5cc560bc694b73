//! Token recognizers for the block and inline grammars.

use crate::ast::CitationStyle;
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_until, take_while1},
    character::complete::{char, multispace0, not_line_ending, one_of, space0, space1},
    combinator::{eof, map, not, opt, peek, recognize, value},
    error::{Error, ErrorKind},
    multi::{many0, many1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

/// A token from the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    // Block-level tokens
    Heading(u8, &'a str), // Level, content
    SetextUnderline(u8),
    FencedCodeStart(&'a str), // Language
    ThematicBreak,
    BlockQuoteMarker,
    ListItemMarker(ListMarker),
    BlockAttributes(&'a str), // Inside of {: ...}
    LinkDefinition {
        id: &'a str,
        url: &'a str,
        title: Option<&'a str>,
    },

    // Inline tokens
    Emphasis(&'a str),
    Strong(&'a str),
    InlineCode(&'a str),
    InlineMath(&'a str),
    DisplayMath(&'a str),
    CrossReference { capital: bool, ids: &'a str },
    Citation(CitationStyle, &'a str),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListMarker {
    Unordered,
    Ordered(u32),
}

/// One entry of an attribute list.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeToken<'a> {
    Id(&'a str),
    Class(&'a str),
    Pair(&'a str, &'a str),
}

fn fail<T>(input: &str, kind: ErrorKind) -> IResult<&str, T> {
    Err(nom::Err::Error(Error::new(input, kind)))
}

/// Parse a heading (ATX style: # Heading).
pub fn heading(input: &str) -> IResult<&str, Token<'_>> {
    let (input, hashes) = take_while1(|c| c == '#')(input)?;
    let level = hashes.len().min(6) as u8;
    let (input, _) = space1(input)?;
    let (input, content) = not_line_ending(input)?;
    // Trim trailing # and spaces
    let content = content.trim_end_matches(|c| c == '#' || c == ' ');
    Ok((input, Token::Heading(level, content)))
}

/// Parse a setext underline (`===` for level 1, `---` for level 2).
pub fn setext_underline(input: &str) -> IResult<&str, Token<'_>> {
    let (input, level) = alt((
        value(1, take_while1(|c| c == '=')),
        value(2, take_while1(|c| c == '-')),
    ))(input)?;
    let (input, _) = terminated(space0, eof)(input)?;
    Ok((input, Token::SetextUnderline(level)))
}

/// Parse a thematic break (---, ***, ___).
pub fn thematic_break(input: &str) -> IResult<&str, Token<'_>> {
    let (input, _) = alt((
        recognize(tuple((tag("-"), tag("-"), tag("-"), many0(char('-'))))),
        recognize(tuple((tag("*"), tag("*"), tag("*"), many0(char('*'))))),
        recognize(tuple((tag("_"), tag("_"), tag("_"), many0(char('_'))))),
    ))(input)?;
    let (input, _) = terminated(space0, eof)(input)?;
    Ok((input, Token::ThematicBreak))
}

/// Parse a fenced code block start.
pub fn fenced_code_start(input: &str) -> IResult<&str, Token<'_>> {
    let (input, _) = alt((tag("```"), tag("~~~")))(input)?;
    let (input, lang) =
        opt(take_while1(|c: char| c.is_alphanumeric() || c == '-' || c == '_'))(input)?;
    let (input, _) = not_line_ending(input)?;
    Ok((input, Token::FencedCodeStart(lang.unwrap_or(""))))
}

/// Parse a block quote marker.
pub fn block_quote_marker(input: &str) -> IResult<&str, Token<'_>> {
    let (input, _) = char('>')(input)?;
    let (input, _) = opt(char(' '))(input)?;
    Ok((input, Token::BlockQuoteMarker))
}

/// Parse a list item marker.
pub fn list_item_marker(input: &str) -> IResult<&str, Token<'_>> {
    alt((
        // Unordered
        map(tuple((one_of("-*+"), space1)), |_| {
            Token::ListItemMarker(ListMarker::Unordered)
        }),
        // Ordered
        map(
            tuple((
                take_while1(|c: char| c.is_ascii_digit()),
                one_of(".)"),
                space1,
            )),
            |(num, _, _): (&str, _, _)| {
                Token::ListItemMarker(ListMarker::Ordered(num.parse().unwrap_or(1)))
            },
        ),
    ))(input)
}

/// Parse a block attribute list line (`{: #id .class key="value"}`).
pub fn block_attributes(input: &str) -> IResult<&str, Token<'_>> {
    let (input, content) = delimited(tag("{:"), take_until("}"), char('}'))(input)?;
    let (input, _) = terminated(space0, eof)(input)?;
    Ok((input, Token::BlockAttributes(content)))
}

fn attribute_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace() && c != '}' && c != '"' && c != '=')(input)
}

fn attribute_value(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_until("\""), char('"')),
        delimited(char('\''), take_until("'"), char('\'')),
        take_while1(|c: char| !c.is_whitespace()),
    ))(input)
}

fn attribute_token(input: &str) -> IResult<&str, AttributeToken<'_>> {
    alt((
        map(preceded(char('#'), attribute_name), AttributeToken::Id),
        map(preceded(char('.'), attribute_name), AttributeToken::Class),
        map(
            tuple((attribute_name, char('='), attribute_value)),
            |(key, _, val)| AttributeToken::Pair(key, val),
        ),
    ))(input)
}

/// Parse the entries of an attribute list, e.g. `#lemma12 .important`.
pub fn attribute_list(input: &str) -> IResult<&str, Vec<AttributeToken<'_>>> {
    terminated(
        many0(preceded(multispace0, attribute_token)),
        multispace0,
    )(input)
}

/// Parse a reference-style link definition (`[id]: url "title"`).
pub fn link_definition(input: &str) -> IResult<&str, Token<'_>> {
    let (input, id) = delimited(char('['), is_not("]"), char(']'))(input)?;
    let (input, _) = char(':')(input)?;
    let (input, _) = space0(input)?;
    let (input, url) = take_while1(|c: char| !c.is_whitespace())(input)?;
    let (input, _) = space0(input)?;
    let (input, title) = opt(alt((
        delimited(char('"'), take_until("\""), char('"')),
        delimited(char('\''), take_until("'"), char('\'')),
        delimited(char('('), take_until(")"), char(')')),
    )))(input)?;
    let (input, _) = terminated(space0, eof)(input)?;
    Ok((input, Token::LinkDefinition { id, url, title }))
}

/// Parse inline math (`$...$`) that is not part of a `$$` pair.
pub fn inline_math(input: &str) -> IResult<&str, Token<'_>> {
    let (body, _) = char('$')(input)?;
    let (body, _) = peek(not(char('$')))(body)?;

    let mut prev = '$';
    for (i, c) in body.char_indices() {
        if c == '$' && i > 0 && prev != '$' && !body[i + 1..].starts_with('$') {
            return Ok((&body[i + 1..], Token::InlineMath(&body[..i])));
        }
        prev = c;
    }

    fail(input, ErrorKind::TakeUntil)
}

/// Parse display math ($$...$$).
pub fn display_math(input: &str) -> IResult<&str, Token<'_>> {
    let (input, _) = tag("$$")(input)?;
    let (input, content) = take_until("$$")(input)?;
    let (input, _) = tag("$$")(input)?;
    Ok((input, Token::DisplayMath(content)))
}

/// Parse a cross-reference marker (`[cref: a, b]` or `[Cref: a]`).
pub fn cross_reference(input: &str) -> IResult<&str, Token<'_>> {
    let (input, _) = char('[')(input)?;
    let (input, _) = multispace0(input)?;
    let (input, capital) = alt((value(true, char('C')), value(false, char('c'))))(input)?;
    let (input, _) = tag("ref:")(input)?;
    let (input, _) = multispace0(input)?;
    let (input, ids) = is_not("]")(input)?;
    let (input, _) = char(']')(input)?;
    Ok((input, Token::CrossReference { capital, ids }))
}

/// Parse a citation marker (`[citep: key]` or `[citet: *key1, key2]`).
pub fn citation(input: &str) -> IResult<&str, Token<'_>> {
    let (input, _) = char('[')(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = tag("cite")(input)?;
    let (input, style) = alt((
        value(CitationStyle::Parenthetical, char('p')),
        value(CitationStyle::Textual, char('t')),
    ))(input)?;
    let (input, _) = char(':')(input)?;
    let (input, _) = multispace0(input)?;
    let (input, keys) = is_not("]")(input)?;
    let (input, _) = char(']')(input)?;
    Ok((input, Token::Citation(style, keys)))
}

/// Parse an equation label (`\label{id}`).
pub fn equation_label(input: &str) -> IResult<&str, &str> {
    preceded(
        pair(tag("\\label"), multispace0),
        delimited(char('{'), take_until("}"), char('}')),
    )(input)
}

/// Find every `\label{id}` in a math block.
pub fn equation_labels(source: &str) -> Vec<&str> {
    let mut labels = Vec::new();
    let mut remaining = source;

    while let Some(pos) = remaining.find("\\label") {
        match equation_label(&remaining[pos..]) {
            Ok((rest, id)) => {
                if !id.trim().is_empty() {
                    labels.push(id.trim());
                }
                remaining = rest;
            }
            Err(_) => remaining = &remaining[pos + "\\label".len()..],
        }
    }

    labels
}

fn parenthesized_label(input: &str) -> IResult<&str, &str> {
    let label = input.trim_end();
    if label.len() >= 3 && label.starts_with('(') && label.ends_with(')') {
        Ok((&input[label.len()..], label))
    } else {
        fail(input, ErrorKind::Verify)
    }
}

/// Parse an environment start paragraph: `Name` or `Name (label)`.
pub fn environment_start<'a>(input: &'a str, name: &str) -> IResult<&'a str, Option<&'a str>> {
    let (input, _) = tag(name)(input)?;
    let (input, label) = opt(preceded(one_of(" \t"), parenthesized_label))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = eof(input)?;
    Ok((input, label))
}

/// Parse an environment end paragraph: `\Name`.
pub fn environment_end<'a>(input: &'a str, name: &str) -> IResult<&'a str, ()> {
    let (input, _) = char('\\')(input)?;
    let (input, _) = tag(name)(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = eof(input)?;
    Ok((input, ()))
}

/// Parse inline code (`code`).
pub fn inline_code(input: &str) -> IResult<&str, Token<'_>> {
    let (input, _) = char('`')(input)?;
    let (input, _) = peek(not(char('`')))(input)?; // Not fenced code
    let (input, content) = take_until("`")(input)?;
    let (input, _) = char('`')(input)?;
    Ok((input, Token::InlineCode(content)))
}

/// Parse emphasis (*text* or _text_).
pub fn emphasis(input: &str) -> IResult<&str, Token<'_>> {
    alt((
        delimited(
            pair(char('*'), peek(not(one_of("* \t\n")))),
            map(take_until("*"), Token::Emphasis),
            char('*'),
        ),
        delimited(
            pair(char('_'), peek(not(one_of("_ \t\n")))),
            map(take_until("_"), Token::Emphasis),
            char('_'),
        ),
    ))(input)
}

/// Parse strong (**text** or __text__).
pub fn strong(input: &str) -> IResult<&str, Token<'_>> {
    alt((
        delimited(tag("**"), map(take_until("**"), Token::Strong), tag("**")),
        delimited(tag("__"), map(take_until("__"), Token::Strong), tag("__")),
    ))(input)
}

/// Recognize an escaped punctuation character (`\*`, `\[`, ...).
pub fn escaped_char(input: &str) -> IResult<&str, char> {
    preceded(char('\\'), one_of("\\`*_{}[]()#+-.!$|<>"))(input)
}

/// Recognize a run of typographic dashes or an ellipsis.
pub fn typographic(input: &str) -> IResult<&str, &'static str> {
    alt((
        value("…", tag("...")),
        value("—", tag("---")),
        value("–", terminated(tag("--"), not(char('-')))),
    ))(input)
}

/// Recognize an HTML entity such as `&amp;` or `&#8217;`.
pub fn entity(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        char('&'),
        alt((
            take_while1(|c: char| c.is_ascii_alphanumeric()),
            recognize(pair(char('#'), many1(one_of("0123456789")))),
        )),
        char(';'),
    )))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading() {
        assert_eq!(
            heading("# Hello World"),
            Ok(("", Token::Heading(1, "Hello World")))
        );
        assert_eq!(
            heading("### Level 3 ###"),
            Ok(("", Token::Heading(3, "Level 3")))
        );
    }

    #[test]
    fn test_setext_underline() {
        assert_eq!(setext_underline("====="), Ok(("", Token::SetextUnderline(1))));
        assert_eq!(setext_underline("-----  "), Ok(("", Token::SetextUnderline(2))));
        assert!(setext_underline("--- x").is_err());
    }

    #[test]
    fn test_block_attributes() {
        assert_eq!(
            block_attributes("{: #lemma12 .important}"),
            Ok(("", Token::BlockAttributes(" #lemma12 .important")))
        );
        assert!(block_attributes("{#id}").is_err());
    }

    #[test]
    fn test_attribute_list() {
        let (_, tokens) = attribute_list(r#" .bibliography-item #Einstein:SR lang="fr""#).unwrap();
        assert_eq!(
            tokens,
            vec![
                AttributeToken::Class("bibliography-item"),
                AttributeToken::Id("Einstein:SR"),
                AttributeToken::Pair("lang", "fr"),
            ]
        );
    }

    #[test]
    fn test_link_definition() {
        assert_eq!(
            link_definition(r#"[CERN]: https://home.cern "The Home of LHC""#),
            Ok((
                "",
                Token::LinkDefinition {
                    id: "CERN",
                    url: "https://home.cern",
                    title: Some("The Home of LHC"),
                }
            ))
        );
    }

    #[test]
    fn test_inline_math() {
        assert_eq!(
            inline_math("$E = mc^2$ rest"),
            Ok((" rest", Token::InlineMath("E = mc^2")))
        );
        assert!(inline_math("$$x^2$$").is_err());
        assert!(inline_math("$ unclosed").is_err());
    }

    #[test]
    fn test_inline_math_skips_adjacent_dollars() {
        assert_eq!(
            inline_math("$a$$b$ c"),
            Ok((" c", Token::InlineMath("a$$b")))
        );
    }

    #[test]
    fn test_display_math() {
        assert_eq!(
            display_math("$$\\int_0^1 x dx$$"),
            Ok(("", Token::DisplayMath("\\int_0^1 x dx")))
        );
    }

    #[test]
    fn test_cross_reference() {
        assert_eq!(
            cross_reference("[cref: ref1, ref2] and more"),
            Ok((" and more", Token::CrossReference { capital: false, ids: "ref1, ref2" }))
        );
        assert_eq!(
            cross_reference("[ Cref:thm]"),
            Ok(("", Token::CrossReference { capital: true, ids: "thm" }))
        );
        assert!(cross_reference("[xref: a]").is_err());
    }

    #[test]
    fn test_citation() {
        assert_eq!(
            citation("[citet: *lammerzahl:2002]"),
            Ok(("", Token::Citation(CitationStyle::Textual, "*lammerzahl:2002")))
        );
        assert_eq!(
            citation("[citep:Einstein:SR, Lee]"),
            Ok(("", Token::Citation(CitationStyle::Parenthetical, "Einstein:SR, Lee")))
        );
        assert!(citation("[citex: a]").is_err());
    }

    #[test]
    fn test_equation_labels() {
        let source = "a = b \\label{eq1} \\\\\nc = d \\label {eq2}\n\\labelled";
        assert_eq!(equation_labels(source), vec!["eq1", "eq2"]);
    }

    #[test]
    fn test_environment_start() {
        assert_eq!(environment_start("Theorem", "Theorem"), Ok(("", None)));
        assert_eq!(
            environment_start("Theorem (Hölder inequality)", "Theorem"),
            Ok(("", Some("(Hölder inequality)")))
        );
        assert!(environment_start("Theorem of mine", "Theorem").is_err());
        assert!(environment_start("Theorems", "Theorem").is_err());
    }

    #[test]
    fn test_environment_end() {
        assert!(environment_end("\\Lemma", "Lemma").is_ok());
        assert!(environment_end("\\Lemma  ", "Lemma").is_ok());
        assert!(environment_end("Lemma", "Lemma").is_err());
    }

    #[test]
    fn test_escaped_and_typographic() {
        assert_eq!(escaped_char("\\[x"), Ok(("x", '[')));
        assert!(escaped_char("\\Lemma").is_err());
        assert_eq!(typographic("... x"), Ok((" x", "…")));
        assert_eq!(typographic("--- x"), Ok((" x", "—")));
        assert_eq!(typographic("--x"), Ok(("x", "–")));
    }

    #[test]
    fn test_entity() {
        assert_eq!(entity("&amp; x"), Ok((" x", "&amp;")));
        assert_eq!(entity("&#8217;"), Ok(("", "&#8217;")));
        assert!(entity("& x").is_err());
    }
}
