//! BibTeX reader.
//!
//! Field values are kept verbatim apart from whitespace normalization: braces,
//! accents and inline math are left for the cleaning step at render time.

use super::{BibEntry, Name};
use crate::error::{ParseError, Result};
use indexmap::IndexMap;
use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, multispace0},
    combinator::map,
    IResult,
};

/// Parse BibTeX source into entries keyed by citation key, in file order.
pub fn parse_bibtex(input: &str) -> Result<IndexMap<String, BibEntry>> {
    let mut entries = IndexMap::new();
    let mut strings: IndexMap<String, String> = IndexMap::new();
    let mut remaining = input;

    loop {
        remaining = skip_whitespace_and_comments(remaining);
        if remaining.is_empty() {
            break;
        }

        if !remaining.starts_with('@') {
            // Text between entries is a comment in BibTeX
            match remaining.find('@') {
                Some(pos) => remaining = &remaining[pos..],
                None => break,
            }
            continue;
        }

        match parse_item(remaining, &strings) {
            Ok((rest, Item::Entry(entry))) => {
                if entries.contains_key(&entry.key) {
                    tracing::warn!(key = %entry.key, "duplicate BibTeX key, keeping the last entry");
                }
                entries.insert(entry.key.clone(), entry);
                remaining = rest;
            }
            Ok((rest, Item::String(name, value))) => {
                strings.insert(name, value);
                remaining = rest;
            }
            Ok((rest, Item::Skipped)) => remaining = rest,
            Err(_) => {
                let offset = input.len() - remaining.len();
                let line = input[..offset].matches('\n').count() + 1;
                if !remaining.contains('}') {
                    return Err(ParseError::BibTeX(format!("unterminated entry on line {line}")).into());
                }
                tracing::warn!(line, "skipping malformed BibTeX entry");
                // Resume at the next entry
                match remaining[1..].find('@') {
                    Some(pos) => remaining = &remaining[pos + 1..],
                    None => break,
                }
            }
        }
    }

    Ok(entries)
}

enum Item {
    Entry(BibEntry),
    String(String, String),
    Skipped,
}

fn skip_whitespace_and_comments(input: &str) -> &str {
    let mut s = input;

    loop {
        s = s.trim_start();

        if s.starts_with('%') {
            // Skip line comment
            match s.find('\n') {
                Some(end) => s = &s[end + 1..],
                None => return "",
            }
        } else {
            break;
        }
    }

    s
}

fn parse_item<'a>(input: &'a str, strings: &IndexMap<String, String>) -> IResult<&'a str, Item> {
    let (input, _) = char('@')(input)?;
    let (input, entry_type) = take_while1(|c: char| c.is_alphanumeric())(input)?;
    let (input, _) = multispace0(input)?;

    let entry_type = entry_type.to_lowercase();
    let (input, close) = alt((
        map(char('{'), |_| '}'),
        map(char('('), |_| ')'),
    ))(input)?;

    match entry_type.as_str() {
        "comment" | "preamble" => {
            let (input, _) = skip_group(input, close)?;
            Ok((input, Item::Skipped))
        }
        "string" => {
            let (input, fields) = parse_fields(input, strings)?;
            let (input, _) = multispace0(input)?;
            let (input, _) = char(close)(input)?;
            let item = fields
                .into_iter()
                .next()
                .map_or(Item::Skipped, |(name, value)| Item::String(name, value));
            Ok((input, item))
        }
        _ => {
            let (input, _) = multispace0(input)?;
            let (input, key) = take_while1(|c: char| !c.is_whitespace() && c != ',' && c != close)(input)?;
            let (input, _) = multispace0(input)?;
            let (input, _) = char(',')(input)?;
            let (input, mut fields) = parse_fields(input, strings)?;
            let (input, _) = multispace0(input)?;
            let (input, _) = char(close)(input)?;

            let authors = fields
                .shift_remove("author")
                .map(|value| parse_names(&value))
                .unwrap_or_default();

            Ok((
                input,
                Item::Entry(BibEntry {
                    key: key.to_string(),
                    entry_type,
                    authors,
                    fields,
                }),
            ))
        }
    }
}

fn skip_group(input: &str, close: char) -> IResult<&str, ()> {
    let mut depth = 1;

    for (idx, c) in input.char_indices() {
        if c == '{' || (c == '(' && close == ')') {
            depth += 1;
        } else if c == '}' || (c == ')' && close == ')') {
            depth -= 1;
            if depth == 0 {
                return Ok((&input[idx + 1..], ()));
            }
        }
    }

    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::TakeUntil,
    )))
}

fn parse_fields<'a>(
    input: &'a str,
    strings: &IndexMap<String, String>,
) -> IResult<&'a str, IndexMap<String, String>> {
    let mut fields = IndexMap::new();
    let mut remaining = input;

    loop {
        remaining = remaining.trim_start();

        if remaining.starts_with('}') || remaining.starts_with(')') || remaining.is_empty() {
            break;
        }

        let (rest, (name, value)) = parse_field(remaining, strings)?;
        fields.insert(name.to_lowercase(), value);
        remaining = rest.trim_start();

        // Optional comma
        if let Some(rest) = remaining.strip_prefix(',') {
            remaining = rest;
        }
    }

    Ok((remaining, fields))
}

fn parse_field<'a>(
    input: &'a str,
    strings: &IndexMap<String, String>,
) -> IResult<&'a str, (String, String)> {
    let (input, _) = multispace0(input)?;
    let (input, name) = take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-')(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = char('=')(input)?;

    // Values may be concatenated with `#`
    let mut value = String::new();
    let mut input = input;
    loop {
        let (rest, _) = multispace0(input)?;
        let (rest, part) = parse_value(rest, strings)?;
        value.push_str(&part);
        let (rest, _) = multispace0(rest)?;
        match rest.strip_prefix('#') {
            Some(rest) => input = rest,
            None => {
                input = rest;
                break;
            }
        }
    }

    Ok((input, (name.to_string(), normalize_whitespace(&value))))
}

fn parse_value<'a>(input: &'a str, strings: &IndexMap<String, String>) -> IResult<&'a str, String> {
    alt((
        parse_braced_value,
        parse_quoted_value,
        map(take_while1(|c: char| c.is_ascii_digit()), String::from),
        // Bare identifiers: @string macros and month abbreviations
        map(
            take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-' || c == ':'),
            |name: &str| {
                strings
                    .get(&name.to_lowercase())
                    .cloned()
                    .unwrap_or_else(|| name.to_string())
            },
        ),
    ))(input)
}

fn parse_braced_value(input: &str) -> IResult<&str, String> {
    let (input, _) = char('{')(input)?;
    let mut depth = 1;

    for (i, c) in input.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&input[i + 1..], input[..i].to_string()));
                }
            }
            _ => {}
        }
    }

    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

fn parse_quoted_value(input: &str) -> IResult<&str, String> {
    let (input, _) = char('"')(input)?;
    let mut depth = 0;

    for (i, c) in input.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            '"' if depth == 0 => return Ok((&input[i + 1..], input[..i].to_string())),
            _ => {}
        }
    }

    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split an `author` field on top-level ` and `.
pub fn parse_names(value: &str) -> Vec<Name> {
    let mut names = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let bytes = value.as_bytes();

    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => depth -= 1,
            b' ' if depth == 0 && value[i..].starts_with(" and ") => {
                names.push(&value[start..i]);
                i += " and ".len();
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    names.push(&value[start..]);

    names
        .into_iter()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(Name::parse)
        .collect()
}
