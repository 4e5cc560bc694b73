//! Localised category names, pluralisation and natural-language conjunction.

use crate::error::ConfigError;
use std::collections::HashMap;
use std::str::FromStr;

/// Languages with a localisation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    English,
    French,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::English, Language::French];

    /// ISO 639-1 code, for the `lang` attribute of HTML output.
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::French => "fr",
        }
    }

    /// Word pattern for a category: `singular` or `singular(ending)`, where each
    /// leading `<` in the ending drops one more trailing character of the singular.
    fn pattern(self, category: Category) -> &'static str {
        use Category::*;
        match self {
            Language::English => match category {
                Abstract => "abstract(s)",
                Definition => "definition(s)",
                Postulate => "postulate(s)",
                Property => "property(<ies)",
                Lemma => "lemma(s)",
                Theorem => "theorem(s)",
                Corollary => "corollary(<ies)",
                Section => "section(s)",
                Reference => "reference(s)",
                Eqn => "eqn(s)",
            },
            Language::French => match category {
                Abstract => "abstract(s)",
                Definition => "définition(s)",
                Postulate => "postulat(s)",
                Property => "propriété(s)",
                Lemma => "lemme(s)",
                Theorem => "théorème(s)",
                Corollary => "corollaire(s)",
                Section => "section(s)",
                Reference => "référence(s)",
                Eqn => "éqn(s)",
            },
        }
    }

    fn and_word(self) -> &'static str {
        match self {
            Language::English => "and",
            Language::French => "et",
        }
    }

    /// Whether a comma precedes the conjunction word in lists of three or more.
    fn serial_comma(self) -> bool {
        matches!(self, Language::English)
    }
}

impl FromStr for Language {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "english" | "en" => Ok(Language::English),
            "french" | "fr" => Ok(Language::French),
            _ => Err(ConfigError::UnknownLanguage(s.to_string())),
        }
    }
}

/// Kinds of numbered or referenced things.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Abstract,
    Definition,
    Postulate,
    Property,
    Lemma,
    Theorem,
    Corollary,
    Section,
    Reference,
    Eqn,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Abstract,
        Category::Definition,
        Category::Postulate,
        Category::Property,
        Category::Lemma,
        Category::Theorem,
        Category::Corollary,
        Category::Section,
        Category::Reference,
        Category::Eqn,
    ];

    pub const THEOREM_LIKE: [Category; 6] = [
        Category::Definition,
        Category::Postulate,
        Category::Property,
        Category::Lemma,
        Category::Theorem,
        Category::Corollary,
    ];

    pub fn is_theorem_like(self) -> bool {
        Self::THEOREM_LIKE.contains(&self)
    }
}

/// Grammatical number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Form {
    #[default]
    Singular,
    Plural,
}

/// Lookup of category words in one language.
#[derive(Debug, Clone)]
pub struct Lexical {
    language: Language,
    categories: HashMap<String, Category>,
}

impl Lexical {
    pub fn new(language: Language) -> Self {
        let mut lexical = Self {
            language,
            categories: HashMap::new(),
        };
        for category in Category::ALL {
            for form in [Form::Singular, Form::Plural] {
                let word = lexical.localise(category, form).to_lowercase();
                lexical.categories.insert(word, category);
            }
        }
        lexical
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// The word for `category` in the active language.
    pub fn localise(&self, category: Category, form: Form) -> String {
        let pattern = self.language.pattern(category);
        let Some((singular, ending)) = pattern
            .strip_suffix(')')
            .and_then(|p| p.split_once('('))
        else {
            return pattern.to_string();
        };
        match form {
            Form::Singular => singular.to_string(),
            Form::Plural => {
                let backtrack = ending.chars().take_while(|&c| c == '<').count();
                let ending = &ending[backtrack..];
                let keep = singular.chars().count().saturating_sub(backtrack);
                let mut word: String = singular.chars().take(keep).collect();
                word.push_str(ending);
                word
            }
        }
    }

    /// The category a word names, ignoring case. Accepts singular and plural forms.
    pub fn symbolise(&self, word: &str) -> Option<Category> {
        self.categories.get(&word.to_lowercase()).copied()
    }

    /// Localised heading of the generated bibliography, e.g. `References`.
    pub fn reference_section_name(&self) -> String {
        capitalize(&self.localise(Category::Reference, Form::Plural))
    }

    /// Join words into one string: `A`, `A and B`, `A, B, and C`.
    pub fn and<S: AsRef<str>>(&self, words: &[S]) -> String {
        let items: Vec<String> = words.iter().map(|w| w.as_ref().to_string()).collect();
        self.conjunction(items, false, |sep| sep.to_string()).concat()
    }

    /// Interleave `items` with the separators of a natural-language list.
    ///
    /// Each separator string is passed through `separator` so that items of any
    /// type can be joined. With `nbsp` the space after the conjunction word is
    /// a non-breaking space.
    pub fn conjunction<T>(
        &self,
        items: Vec<T>,
        nbsp: bool,
        mut separator: impl FnMut(&str) -> T,
    ) -> Vec<T> {
        let count = items.len();
        if count < 2 {
            return items;
        }

        let space = if nbsp { '\u{a0}' } else { ' ' };
        let and = self.language.and_word();
        let last_separator = if count > 2 && self.language.serial_comma() {
            format!(", {and}{space}")
        } else {
            format!(" {and}{space}")
        };

        let mut joined = Vec::with_capacity(2 * count - 1);
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                if i == count - 1 {
                    joined.push(separator(&last_separator));
                } else {
                    joined.push(separator(", "));
                }
            }
            joined.push(item);
        }
        joined
    }
}

/// Uppercase the first character and lowercase the rest.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
