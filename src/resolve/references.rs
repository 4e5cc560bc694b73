//! Cross-reference resolution.

use crate::ast::Inline;
use crate::error::Diagnostics;
use crate::lexical::{capitalize, Category, Form, Lexical};
use crate::resolve::Registry;
use indexmap::IndexMap;

/// Resolve the comma-separated `ids` of a `[cref: ...]` marker.
///
/// Ids are grouped by category in order of first appearance; each group gets
/// its localized label and the groups are joined with the conjunction.
/// Returns `None` when the marker names no id at all.
pub fn resolve_cross_reference(
    capital: bool,
    ids: &str,
    registry: &Registry,
    lex: &Lexical,
    diagnostics: &mut Diagnostics,
    line: usize,
) -> Option<Vec<Inline>> {
    let mut groups: IndexMap<Option<Category>, Vec<&str>> = IndexMap::new();
    for id in ids.split(',').map(str::trim).filter(|id| !id.is_empty()) {
        groups.entry(registry.category(id)).or_default().push(id);
    }

    if groups.is_empty() {
        diagnostics.warn(line, format!("No reference specified at line {line}"));
        return None;
    }

    let chunks: Vec<Vec<Inline>> = groups
        .iter()
        .enumerate()
        .map(|(i, (category, ids))| {
            let refs: Vec<Inline> = ids
                .iter()
                .map(|id| reference_to(id, *category, registry, lex, diagnostics, line))
                .collect();

            // Keep the conjunction word attached to the next link
            let mut chunk = lex.conjunction(refs, true, |sep| Inline::Text(sep.to_string()));

            if let Some(category) = category {
                let form = if ids.len() == 1 {
                    Form::Singular
                } else {
                    Form::Plural
                };
                let mut label = lex.localise(*category, form);
                if capital && i == 0 {
                    label = capitalize(&label);
                }
                chunk.insert(0, Inline::Text(format!("{label}\u{a0}")));
            }
            chunk
        })
        .collect();

    let joined = lex.conjunction(chunks, false, |sep| vec![Inline::Text(sep.to_string())]);
    Some(joined.into_iter().flatten().collect())
}

fn reference_to(
    id: &str,
    category: Option<Category>,
    registry: &Registry,
    lex: &Lexical,
    diagnostics: &mut Diagnostics,
    line: usize,
) -> Inline {
    match category {
        None => {
            diagnostics.warn(line, format!("No element with id '{id}' at line {line}"));
            Inline::Text(format!("¿{id}?"))
        }
        // Equation numbers belong to the math renderer
        Some(Category::Eqn) => Inline::Text(format!("\\eqref{{{id}}}")),
        Some(category) => {
            let number = registry.number(id).unwrap_or_default();
            Inline::Link {
                url: format!("#{id}"),
                title: Some(format!(
                    "{} {number}",
                    capitalize(&lex.localise(category, Form::Singular))
                )),
                content: vec![Inline::Text(number.to_string())],
            }
        }
    }
}
