//! Bibliography data: entries read from BibTeX, author names, and the
//! citation style engines that format reference-list entries.

pub mod bibtex;
pub mod decode;
pub mod style;

pub use style::{style_engine, StyleEngine};

use crate::error::{ConfigError, Result};
use indexmap::IndexMap;
use std::path::Path;

/// An author or editor name split into family and given parts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Name {
    pub family: String,
    pub given: String,
}

impl Name {
    /// Parse `Family, Given` or `Given Family`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(comma) = top_level_find(raw, ',') {
            return Self {
                family: raw[..comma].trim().to_string(),
                given: raw[comma + 1..].trim().to_string(),
            };
        }
        match top_level_rfind(raw, ' ') {
            Some(space) => Self {
                family: raw[space + 1..].to_string(),
                given: raw[..space].trim().to_string(),
            },
            None => Self {
                family: raw.to_string(),
                given: String::new(),
            },
        }
    }

    /// Given names reduced to initials: `Tobias P.` gives `T. P.`,
    /// `Jean-Paul` gives `J.-P.`.
    pub fn initials(&self) -> String {
        self.given
            .split_whitespace()
            .map(|word| {
                word.split('-')
                    .filter_map(|part| {
                        part.chars()
                            .find(|c| c.is_alphabetic())
                            .map(|c| format!("{c}."))
                    })
                    .collect::<Vec<_>>()
                    .join("-")
            })
            .filter(|initial| !initial.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn top_level_find(s: &str, needle: char) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            c if c == needle && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

fn top_level_rfind(s: &str, needle: char) -> Option<usize> {
    let mut depth = 0i32;
    let mut found = None;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            c if c == needle && depth == 0 => found = Some(i),
            _ => {}
        }
    }
    found
}

/// A bibliography entry. Field values keep their BibTeX braces and escapes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BibEntry {
    pub key: String,
    pub entry_type: String,
    pub authors: Vec<Name>,
    pub fields: IndexMap<String, String>,
}

impl BibEntry {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn year(&self) -> Option<&str> {
        self.field("year")
    }

    pub fn title(&self) -> Option<&str> {
        self.field("title")
    }
}

/// Entries keyed by citation key, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bibliography {
    entries: IndexMap<String, BibEntry>,
}

impl Bibliography {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse BibTeX source.
    pub fn parse(input: &str) -> Result<Self> {
        let entries = bibtex::parse_bibtex(input)?;
        Ok(Self { entries })
    }

    /// Read and parse a `.bib` file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::BibliographyRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&source)
    }

    pub fn insert(&mut self, entry: BibEntry) {
        self.entries.insert(entry.key.clone(), entry);
    }

    pub fn get(&self, key: &str) -> Option<&BibEntry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BibEntry> {
        self.entries.values()
    }
}
