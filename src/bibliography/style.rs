//! Citation style engines producing reference-list entries.
//!
//! Output is inline markup for the reference section: HTML `<i>` tags and
//! entities, with BibTeX braces and escapes still in place for the cleaning
//! step.

use super::decode::map_outside_math;
use super::{BibEntry, Name};
use crate::error::ConfigError;
use std::fmt;

/// Formats bibliography entries in one citation style.
pub trait StyleEngine: fmt::Debug {
    /// Identifier the style is selected by.
    fn id(&self) -> &'static str;

    /// Format one reference-list entry.
    fn render(&self, entry: &BibEntry) -> String;
}

/// Identifiers of the built-in styles.
pub const STYLES: [&str; 2] = ["apa", "chicago-author-date"];

/// Look up a style engine by identifier.
pub fn style_engine(id: &str) -> Result<Box<dyn StyleEngine>, ConfigError> {
    match id.to_lowercase().as_str() {
        "apa" => Ok(Box::new(Apa)),
        "chicago-author-date" | "chicago" => Ok(Box::new(ChicagoAuthorDate)),
        _ => Err(ConfigError::UnknownStyle(id.to_string())),
    }
}

/// American Psychological Association, 7th edition.
#[derive(Debug, Clone, Copy)]
pub struct Apa;

impl StyleEngine for Apa {
    fn id(&self) -> &'static str {
        "apa"
    }

    fn render(&self, entry: &BibEntry) -> String {
        let year = entry.year().unwrap_or("n.d.");
        let title = entry.title().map(typeset_quotes);
        let authors = apa_authors(&entry.authors);

        let mut out = match (&authors, &title) {
            (Some(authors), _) => format!("{authors} ({year})."),
            (None, Some(title)) => format!("{}. ({year}).", strip_period(title)),
            (None, None) => format!("({year})."),
        };
        let title = if authors.is_some() { title } else { None };

        match entry.entry_type.as_str() {
            "book" | "phdthesis" | "mastersthesis" => {
                if let Some(title) = title {
                    push_sentence(&mut out, &format!("<i>{}</i>", strip_period(&title)));
                }
                if let Some(publisher) = entry.field("publisher").or(entry.field("school")) {
                    push_sentence(&mut out, publisher);
                }
            }
            "inproceedings" | "incollection" => {
                if let Some(title) = title {
                    push_sentence(&mut out, &title);
                }
                if let Some(booktitle) = entry.field("booktitle") {
                    let mut container = format!("In <i>{}</i>", typeset_quotes(booktitle));
                    if let Some(pages) = entry.field("pages") {
                        container.push_str(&format!(" (pp. {})", page_range(pages)));
                    }
                    push_sentence(&mut out, &container);
                }
                if let Some(publisher) = entry.field("publisher") {
                    push_sentence(&mut out, publisher);
                }
            }
            _ => {
                if let Some(title) = title {
                    push_sentence(&mut out, &title);
                }
                if let Some(journal) = entry.field("journal") {
                    let mut container = format!("<i>{}</i>", title_case(&typeset_quotes(journal)));
                    if let Some(volume) = entry.field("volume") {
                        container.push_str(&format!(", <i>{volume}</i>"));
                        if let Some(number) = entry.field("number") {
                            container.push_str(&format!("({number})"));
                        }
                    }
                    if let Some(pages) = entry.field("pages") {
                        container.push_str(&format!(", {}", page_range(pages)));
                    }
                    push_sentence(&mut out, &container);
                } else if let Some(publisher) = entry.field("publisher").or(entry.field("howpublished")) {
                    push_sentence(&mut out, publisher);
                }
            }
        }

        if let Some(doi) = entry.field("doi") {
            out.push_str(&format!(" https://doi.org/{doi}"));
        } else if let Some(url) = entry.field("url") {
            out.push_str(&format!(" {url}"));
        }

        out
    }
}

fn apa_name(name: &Name) -> String {
    let initials = name.initials();
    if initials.is_empty() {
        name.family.clone()
    } else {
        format!("{}, {initials}", name.family)
    }
}

fn apa_authors(names: &[Name]) -> Option<String> {
    let names: Vec<String> = names.iter().map(apa_name).collect();
    match names.as_slice() {
        [] => None,
        [only] => Some(only.clone()),
        [init @ .., last] => Some(format!("{}, &amp; {last}", init.join(", "))),
    }
}

/// Chicago Manual of Style, author-date variant.
#[derive(Debug, Clone, Copy)]
pub struct ChicagoAuthorDate;

impl StyleEngine for ChicagoAuthorDate {
    fn id(&self) -> &'static str {
        "chicago-author-date"
    }

    fn render(&self, entry: &BibEntry) -> String {
        let year = entry.year().unwrap_or("n.d.");
        let mut out = String::new();

        if let Some(authors) = chicago_authors(&entry.authors) {
            out.push_str(&with_period(&authors));
            push_sentence(&mut out, year);
        } else {
            out.push_str(year);
            out.push('.');
        }

        let title = entry.title().map(typeset_quotes);
        match entry.entry_type.as_str() {
            "book" | "phdthesis" | "mastersthesis" => {
                if let Some(title) = title {
                    push_sentence(&mut out, &format!("<i>{}</i>", strip_period(&title)));
                }
                let publisher = match (entry.field("address"), entry.field("publisher")) {
                    (Some(address), Some(publisher)) => Some(format!("{address}: {publisher}")),
                    (None, Some(publisher)) => Some(publisher.to_string()),
                    _ => entry.field("school").map(String::from),
                };
                if let Some(publisher) = publisher {
                    push_sentence(&mut out, &publisher);
                }
            }
            _ => {
                if let Some(title) = title {
                    out.push_str(&format!(" “{}”", with_period(&title)));
                }
                let container = entry.field("journal").or(entry.field("booktitle"));
                if let Some(container) = container {
                    let mut text = format!("<i>{}</i>", typeset_quotes(container));
                    if let Some(volume) = entry.field("volume") {
                        text.push_str(&format!(" {volume}"));
                    }
                    if let Some(number) = entry.field("number") {
                        text.push_str(&format!(" ({number})"));
                    }
                    if let Some(pages) = entry.field("pages") {
                        text.push_str(&format!(": {}", page_range(pages)));
                    }
                    text.push('.');
                    out.push(' ');
                    out.push_str(&text);
                }
            }
        }

        if let Some(doi) = entry.field("doi") {
            out.push_str(&format!(" https://doi.org/{doi}."));
        } else if let Some(url) = entry.field("url") {
            out.push_str(&format!(" {url}."));
        }

        out
    }
}

fn chicago_authors(names: &[Name]) -> Option<String> {
    let names: Vec<String> = names
        .iter()
        .enumerate()
        .map(|(i, name)| match (i, name.given.is_empty()) {
            (_, true) => name.family.clone(),
            (0, false) => format!("{}, {}", name.family, name.given),
            (_, false) => format!("{} {}", name.given, name.family),
        })
        .collect();
    match names.as_slice() {
        [] => None,
        [only] => Some(only.clone()),
        [first, second] => Some(format!("{first}, and {second}")),
        [init @ .., last] => Some(format!("{}, and {last}", init.join(", "))),
    }
}

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "by", "for", "from", "in", "into", "nor", "of", "on",
    "or", "the", "to", "with",
];

/// Capitalize every word but the stop words, except the first one.
pub fn title_case(text: &str) -> String {
    text.split(' ')
        .enumerate()
        .map(|(i, word)| {
            if i > 0 && STOP_WORDS.contains(&word) {
                return word.to_string();
            }
            let mut chars = word.chars();
            match chars.next() {
                Some(first) if first.is_lowercase() => first.to_uppercase().chain(chars).collect(),
                _ => word.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Typographic quotes outside math: `'` becomes `’`, ``` `` ``` and `''`
/// become double quotes.
pub fn typeset_quotes(text: &str) -> String {
    map_outside_math(text, |chunk| {
        let mut out = String::with_capacity(chunk.len());
        let mut chars = chunk.chars().peekable();
        let mut escaped = false;
        while let Some(c) = chars.next() {
            match c {
                // `\'` and `\`` are accents
                '\'' | '`' if escaped => out.push(c),
                '\'' | '`' if chars.peek() == Some(&c) => {
                    chars.next();
                    out.push(if c == '`' { '“' } else { '”' });
                }
                '\'' => out.push('’'),
                '`' => out.push('‘'),
                _ => out.push(c),
            }
            escaped = c == '\\' && !escaped;
        }
        out
    })
}

/// Page ranges use an en dash.
fn page_range(pages: &str) -> String {
    pages.replace("--", "–").replace('-', "–")
}

fn strip_period(text: &str) -> &str {
    text.strip_suffix('.').unwrap_or(text)
}

fn with_period(text: &str) -> String {
    if text.ends_with(['.', '?', '!']) {
        text.to_string()
    } else {
        format!("{text}.")
    }
}

/// Append ` text.`, without doubling a final punctuation mark.
fn push_sentence(out: &mut String, text: &str) {
    if !out.is_empty() {
        out.push(' ');
    }
    out.push_str(&with_period(text));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bibliography::Bibliography;
    use pretty_assertions::assert_eq;

    const BIB: &str = r#"
@article{Einstein:SR,
  author = {Einstein, Albert},
  journal = {Annalen der Physik},
  pages = {891},
  title = {Zur {E}lektrodynamik bewegter {K}örper},
  volume = {17},
  year = {1905}}
@article{Lee:SR:derivation,
  author = {Lee, A. R. and Kalotas, T. M.},
  journal = {American Journal of Physics},
  pages = {434--437},
  title = {Lorentz transformations from the first postulate},
  volume = {43},
  year = {1975}}
@article{Ohanian:2012,
  author = {Ohanian, Hans C.},
  journal = {American Journal of Physics},
  number = {12},
  pages = {1067-1072},
  title = {Klein's theorem and the proof of {$E_0=mc^2$}},
  volume = {80},
  year = {2012}}
@book{Weinberg:1972,
  author = {Weinberg, Steven},
  title = {Gravitation and Cosmology},
  publisher = {Wiley},
  address = {New York},
  year = {1972}}
"#;

    fn entry(key: &str) -> BibEntry {
        Bibliography::parse(BIB).unwrap().get(key).unwrap().clone()
    }

    #[test]
    fn test_unknown_style() {
        assert!(matches!(style_engine("mla"), Err(ConfigError::UnknownStyle(s)) if s == "mla"));
        for id in STYLES {
            assert_eq!(style_engine(id).unwrap().id(), id);
        }
    }

    #[test]
    fn test_apa_article() {
        assert_eq!(
            Apa.render(&entry("Einstein:SR")),
            "Einstein, A. (1905). Zur {E}lektrodynamik bewegter {K}örper. <i>Annalen Der Physik</i>, <i>17</i>, 891."
        );
        assert_eq!(
            Apa.render(&entry("Lee:SR:derivation")),
            "Lee, A. R., &amp; Kalotas, T. M. (1975). Lorentz transformations from the first postulate. <i>American Journal of Physics</i>, <i>43</i>, 434–437."
        );
    }

    #[test]
    fn test_apa_number_quotes_and_math() {
        assert_eq!(
            Apa.render(&entry("Ohanian:2012")),
            "Ohanian, H. C. (2012). Klein’s theorem and the proof of {$E_0=mc^2$}. <i>American Journal of Physics</i>, <i>80</i>(12), 1067–1072."
        );
    }

    #[test]
    fn test_apa_book_and_missing_year() {
        assert_eq!(
            Apa.render(&entry("Weinberg:1972")),
            "Weinberg, S. (1972). <i>Gravitation and Cosmology</i>. Wiley."
        );
        let mut undated = entry("Einstein:SR");
        undated.fields.shift_remove("year");
        assert!(Apa.render(&undated).starts_with("Einstein, A. (n.d.)."));
    }

    #[test]
    fn test_chicago() {
        assert_eq!(
            ChicagoAuthorDate.render(&entry("Lee:SR:derivation")),
            "Lee, A. R., and T. M. Kalotas. 1975. “Lorentz transformations from the first postulate.” <i>American Journal of Physics</i> 43: 434–437."
        );
        assert_eq!(
            ChicagoAuthorDate.render(&entry("Weinberg:1972")),
            "Weinberg, Steven. 1972. <i>Gravitation and Cosmology</i>. New York: Wiley."
        );
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("annalen der physik"), "Annalen Der Physik");
        assert_eq!(
            title_case("International Journal of Modern Physics D"),
            "International Journal of Modern Physics D"
        );
        assert_eq!(title_case("the journal of {x}"), "The Journal of {x}");
    }

    #[test]
    fn test_typeset_quotes_keeps_accents() {
        assert_eq!(typeset_quotes("Klein's ``proof''"), "Klein’s “proof”");
        assert_eq!(typeset_quotes("Poincar\\'{e}"), "Poincar\\'{e}");
        assert_eq!(typeset_quotes("$f'(x)$ isn't"), "$f'(x)$ isn’t");
    }
}
