//! Hierarchical header numbers and per-category theorem counters.

use crate::lexical::Category;
use std::collections::HashMap;

/// Dotted section numbers computed from a stack of counters.
///
/// Depth is the header level minus one; the title level is never numbered.
#[derive(Debug, Clone, Default)]
pub struct HeaderNumberer {
    counters: Vec<u32>,
    depth: usize,
}

impl HeaderNumberer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number the next header at `depth` (1 for `##`).
    pub fn next_number(&mut self, depth: usize) -> String {
        if depth > self.depth {
            self.counters
                .extend(std::iter::repeat(1).take(depth - self.depth));
        } else {
            // Sibling or shallower: drop deeper counters, then step the last one.
            self.counters.truncate(depth);
            match self.counters.last_mut() {
                Some(last) => *last += 1,
                None => self.counters.push(1),
            }
        }
        self.depth = depth;

        self.counters
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Remove a leading `1.2.3 ` style prefix typed by the author.
pub fn strip_leading_number(text: &str) -> &str {
    text.trim_start()
        .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.')
        .trim_start()
}

/// Independent sequence numbers per theorem-like category.
#[derive(Debug, Clone, Default)]
pub struct TheoremCounters {
    counts: HashMap<Category, u32>,
}

impl TheoremCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the counter for `category` and return its new value.
    pub fn next(&mut self, category: Category) -> u32 {
        let count = self.counts.entry(category).or_insert(0);
        *count += 1;
        *count
    }
}
