//! Bibliographic citations and the cleaning of bibliography text.

use crate::ast::{CitationStyle, Inline};
use crate::bibliography::{decode, Bibliography};
use crate::error::Diagnostics;
use crate::lexical::Lexical;
use indexmap::IndexSet;

/// Keys cited so far, in order of first citation.
#[derive(Debug, Clone, Default)]
pub struct Citations {
    cited: IndexSet<String>,
}

impl Citations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the keys of a `[citep: ...]` or `[citet: ...]` marker into
    /// links joined with the conjunction.
    ///
    /// Returns `None` if the marker holds no key, leaving it as plain text.
    pub fn resolve(
        &mut self,
        style: CitationStyle,
        keys: &str,
        bibliography: &Bibliography,
        lex: &Lexical,
        diagnostics: &mut Diagnostics,
        line: usize,
    ) -> Option<Vec<Inline>> {
        let keys: Vec<&str> = keys
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .collect();

        if keys.is_empty() {
            diagnostics.warn(line, format!("Empty bibliographic citation at line {line}"));
            return None;
        }

        let links: Vec<Inline> = keys
            .into_iter()
            .map(|key| {
                let (key, et_al) = match key.strip_prefix('*') {
                    Some(key) => (key.trim_start(), true),
                    None => (key, false),
                };
                if bibliography.contains_key(key) {
                    self.cited.insert(key.to_string());
                }
                Inline::Link {
                    url: format!("#{key}"),
                    title: None,
                    content: vec![Inline::Text(citation_for(
                        key,
                        style,
                        et_al,
                        bibliography,
                        lex,
                        diagnostics,
                        line,
                    ))],
                }
            })
            .collect();

        Some(lex.conjunction(links, false, |sep| Inline::Text(sep.to_string())))
    }

    pub fn cited_keys(&self) -> impl Iterator<Item = &str> {
        self.cited.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.cited.is_empty()
    }
}

/// Author-year text for `key`: `(Author, Year)` or `Author (Year)`.
pub fn citation_for(
    key: &str,
    style: CitationStyle,
    et_al: bool,
    bibliography: &Bibliography,
    lex: &Lexical,
    diagnostics: &mut Diagnostics,
    line: usize,
) -> String {
    let Some(entry) = bibliography.get(key) else {
        diagnostics.warn(line, format!("Unknown bibliographic citation '{key}' at line {line}"));
        return format!("??{key}??");
    };

    let surnames: Vec<String> = entry
        .authors
        .iter()
        .map(|name| clean_field(&name.family))
        .collect();
    let authors = match surnames.as_slice() {
        [only] => only.clone(),
        [first, _, ..] if et_al => format!("{first} et al"),
        _ => lex.and(surnames.as_slice()),
    };
    let year = entry.year().unwrap_or("n.d.");

    match style {
        CitationStyle::Parenthetical => format!("({authors}, {year})"),
        CitationStyle::Textual => format!("{authors} ({year})"),
    }
}

/// Clean a bibliography field for display.
///
/// Decodes LaTeX escapes, wraps `\ce{...}` in inline math, then drops the
/// braces that are not inside math.
pub fn clean_field(text: &str) -> String {
    let decoded = decode::decode(text);
    let protected = decode::map_outside_math(&decoded, protect_chemistry);
    strip_braces(&protected)
}

fn protect_chemistry(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find("\\ce{") {
        out.push_str(&rest[..pos]);
        let macro_text = &rest[pos..];
        match matching_brace(macro_text, "\\ce".len()) {
            Some(end) => {
                out.push('$');
                out.push_str(&macro_text[..=end]);
                out.push('$');
                rest = &macro_text[end + 1..];
            }
            None => {
                out.push_str(macro_text);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

/// Byte index of the brace closing the one at `open`.
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0;
    for (i, c) in text[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn strip_braces(text: &str) -> String {
    let mut in_math = false;
    text.chars()
        .filter(|&c| {
            if c == '$' {
                in_math = !in_math;
            }
            in_math || (c != '{' && c != '}')
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::Language;
    use pretty_assertions::assert_eq;

    const BIB: &str = r#"
@article{Einstein:SR, author = {Einstein, Albert}, year = {1905}}
@article{Lee:SR:derivation, author = {Lee, A. R. and Kalotas, T. M.}, year = {1975}}
@article{lammerzahl, author = {L{\"a}mmerzahl, Claus and Braxmaier, Claus and Dittus, Hansjörg}, year = {2002}}
@misc{undated, author = {Anonymous}}
"#;

    fn cite(citations: &mut Citations, style: CitationStyle, keys: &str) -> (Option<Vec<Inline>>, Diagnostics) {
        let bibliography = Bibliography::parse(BIB).unwrap();
        let lex = Lexical::new(Language::English);
        let mut diagnostics = Diagnostics::new();
        let out = citations.resolve(style, keys, &bibliography, &lex, &mut diagnostics, 3);
        (out, diagnostics)
    }

    fn link(key: &str, text: &str) -> Inline {
        Inline::Link {
            url: format!("#{key}"),
            title: None,
            content: vec![Inline::Text(text.to_string())],
        }
    }

    #[test]
    fn test_parenthetical_and_textual() {
        let mut citations = Citations::new();
        let (out, _) = cite(&mut citations, CitationStyle::Parenthetical, "Einstein:SR");
        assert_eq!(out.unwrap(), vec![link("Einstein:SR", "(Einstein, 1905)")]);
        let (out, _) = cite(&mut citations, CitationStyle::Textual, "Lee:SR:derivation");
        assert_eq!(out.unwrap(), vec![link("Lee:SR:derivation", "Lee and Kalotas (1975)")]);
    }

    #[test]
    fn test_several_keys_and_et_al() {
        let mut citations = Citations::new();
        let (out, _) = cite(
            &mut citations,
            CitationStyle::Textual,
            "Lee:SR:derivation, Einstein:SR, *lammerzahl",
        );
        assert_eq!(
            out.unwrap(),
            vec![
                link("Lee:SR:derivation", "Lee and Kalotas (1975)"),
                Inline::Text(", ".into()),
                link("Einstein:SR", "Einstein (1905)"),
                Inline::Text(", and ".into()),
                link("lammerzahl", "Lämmerzahl et al (2002)"),
            ]
        );
        let keys: Vec<&str> = citations.cited_keys().collect();
        assert_eq!(keys, vec!["Lee:SR:derivation", "Einstein:SR", "lammerzahl"]);
    }

    #[test]
    fn test_full_author_list_without_et_al() {
        let mut citations = Citations::new();
        let (out, _) = cite(&mut citations, CitationStyle::Parenthetical, "lammerzahl");
        assert_eq!(
            out.unwrap(),
            vec![link("lammerzahl", "(Lämmerzahl, Braxmaier, and Dittus, 2002)")]
        );
    }

    #[test]
    fn test_unknown_key_and_missing_year() {
        let mut citations = Citations::new();
        let (out, diagnostics) = cite(&mut citations, CitationStyle::Parenthetical, "nobody, undated");
        assert_eq!(
            out.unwrap(),
            vec![
                link("nobody", "??nobody??"),
                Inline::Text(" and ".into()),
                link("undated", "(Anonymous, n.d.)"),
            ]
        );
        assert_eq!(diagnostics.warnings().len(), 1);
        let keys: Vec<&str> = citations.cited_keys().collect();
        assert_eq!(keys, vec!["undated"]);
    }

    #[test]
    fn test_empty_citation() {
        let mut citations = Citations::new();
        let (out, diagnostics) = cite(&mut citations, CitationStyle::Textual, " , ");
        assert!(out.is_none());
        assert_eq!(diagnostics.warnings().len(), 1);
        assert!(citations.is_empty());
    }

    #[test]
    fn test_clean_field_braces_outside_math() {
        assert_eq!(
            clean_field(r"{A} proof of $G_{\mu\nu} = 8\pi T_{\mu\nu}$ by {E}instein"),
            r"A proof of $G_{\mu\nu} = 8\pi T_{\mu\nu}$ by Einstein"
        );
    }

    #[test]
    fn test_clean_field_chemistry_and_accents() {
        assert_eq!(
            clean_field(r#"The emissions of \ce{CO_2} from K{\"o}rper"#),
            r"The emissions of $\ce{CO_2}$ from Körper"
        );
        assert_eq!(clean_field(r"$\ce{H_2O}$"), r"$\ce{H_2O}$");
    }
}
