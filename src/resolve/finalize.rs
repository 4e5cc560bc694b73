//! Content generated once the document tree is complete.

use crate::ast::{Block, BlockKind};
use crate::bibliography::{Bibliography, StyleEngine};
use crate::lexical::Lexical;
use crate::resolve::clean_field;

/// First line of the macro preamble.
pub const MACROS_BANNER: &str = "\\text{\\LaTeX Macros:}";

/// The macro preamble: a display-math block of every macro inside a `div`
/// shown or hidden by inline style. `None` when there are no macros.
pub fn latex_macros_block(macros: &[String], hide: bool) -> Option<Block> {
    if macros.is_empty() {
        return None;
    }

    let mut source = String::from(MACROS_BANNER);
    for definition in macros {
        source.push('\n');
        source.push_str(definition);
    }

    let mut block = Block::container(
        "div",
        vec![Block::new(BlockKind::DisplayMath(source), 0)],
        0,
    );
    let display = if hide { "none" } else { "block" };
    block.attrs.set("style", format!("display:{display}"));
    Some(block)
}

/// Put the macro preamble in front of the document.
pub fn prepend_latex_macros(blocks: &mut Vec<Block>, macros: &[String], hide: bool) {
    if let Some(block) = latex_macros_block(macros, hide) {
        blocks.insert(0, block);
    }
}

/// Markdown source of the reference section for the cited `keys`.
///
/// Each entry is formatted by `engine`, cleaned, and tagged with an attribute
/// list giving it the `bibliography-item` class and the key as id. Keys absent
/// from the bibliography are skipped. `None` if nothing remains.
pub fn reference_section_source<'a>(
    keys: impl IntoIterator<Item = &'a str>,
    bibliography: &Bibliography,
    engine: &dyn StyleEngine,
    lex: &Lexical,
) -> Option<String> {
    let entries: Vec<String> = keys
        .into_iter()
        .filter_map(|key| bibliography.get(key))
        .map(|entry| {
            format!(
                "{}\n{{: .bibliography-item #{}}}",
                clean_field(&engine.render(entry)),
                entry.key
            )
        })
        .collect();

    if entries.is_empty() {
        return None;
    }

    Some(format!(
        "## {}\n\n{}",
        lex.reference_section_name(),
        entries.join("\n\n")
    ))
}
