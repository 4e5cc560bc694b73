//! Parser options and their TOML form.

use crate::bibliography::Bibliography;
use crate::error::{ConfigError, ParseError, Result};
use crate::lexical::{Language, Lexical};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Options controlling the academic extensions.
#[derive(Debug, Clone)]
pub struct Options {
    /// Localization table for category names and conjunctions.
    pub language: Language,
    /// Heading level of the sub-header synthesized for theorem-like blocks.
    pub theorem_header_level: u8,
    pub auto_number_headers: bool,
    /// Header texts that are never numbered. `None` means the localized
    /// reference section name.
    pub no_number: Option<Vec<String>>,
    pub bibliography: Option<Bibliography>,
    /// Citation style engine identifier.
    pub bibliography_style: String,
    /// Macro definitions made available to every equation.
    pub latex_macros: Vec<String>,
    pub hide_latex_macros: bool,
    /// Directory relative bibliography paths are resolved against.
    pub base_path: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            language: Language::English,
            theorem_header_level: 5,
            auto_number_headers: true,
            no_number: None,
            bibliography: None,
            bibliography_style: "apa".to_string(),
            latex_macros: Vec::new(),
            hide_latex_macros: true,
            base_path: None,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a TOML string on top of the defaults.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let mut options = Self::default();
        options.merge_toml_str(input)?;
        Ok(options)
    }

    /// Override fields with the keys present in a TOML string.
    pub fn merge_toml_str(&mut self, input: &str) -> Result<()> {
        let file: OptionsFile =
            toml::from_str(input).map_err(|e| ParseError::Options(e.to_string()))?;
        self.merge(file)
    }

    /// Override fields with the keys present in `file`.
    pub fn merge(&mut self, file: OptionsFile) -> Result<()> {
        if let Some(language) = file.language {
            self.language = language.parse()?;
        }
        if let Some(level) = file.theorem_header_level {
            self.theorem_header_level = level;
        }
        if let Some(auto) = file.auto_number_headers {
            self.auto_number_headers = auto;
        }
        if let Some(no_number) = file.no_number {
            self.no_number = Some(no_number);
        }
        if let Some(path) = file.bibliography {
            let path = self.resolve_path(&path);
            self.bibliography = Some(Bibliography::from_path(&path)?);
        }
        if let Some(style) = file.bibliography_style {
            self.bibliography_style = style;
        }
        if let Some(macros) = file.latex_macros {
            self.latex_macros = macros;
        }
        if let Some(hide) = file.hide_latex_macros {
            self.hide_latex_macros = hide;
        }
        self.validate()
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_path {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Check the values that cannot be caught by their types.
    pub fn validate(&self) -> Result<()> {
        if !(1..=6).contains(&self.theorem_header_level) {
            return Err(ConfigError::HeaderLevel(self.theorem_header_level).into());
        }
        Ok(())
    }

    /// Header texts excluded from numbering, with the default applied.
    pub fn no_number_for(&self, lex: &Lexical) -> Vec<String> {
        self.no_number
            .clone()
            .unwrap_or_else(|| vec![lex.reference_section_name()])
    }

    pub fn with_bibliography(mut self, bibliography: Bibliography) -> Self {
        self.bibliography = Some(bibliography);
        self
    }

    pub fn with_latex_macros<S: Into<String>>(mut self, macros: impl IntoIterator<Item = S>) -> Self {
        self.latex_macros = macros.into_iter().map(Into::into).collect();
        self
    }
}

/// Option keys as written in TOML; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OptionsFile {
    pub language: Option<String>,
    pub theorem_header_level: Option<u8>,
    pub auto_number_headers: Option<bool>,
    pub no_number: Option<Vec<String>>,
    /// Path to a `.bib` file.
    pub bibliography: Option<PathBuf>,
    pub bibliography_style: Option<String>,
    pub latex_macros: Option<Vec<String>>,
    pub hide_latex_macros: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.language, Language::English);
        assert_eq!(options.theorem_header_level, 5);
        assert!(options.auto_number_headers);
        assert_eq!(options.bibliography_style, "apa");
        assert!(options.hide_latex_macros);
        assert_eq!(
            options.no_number_for(&Lexical::new(Language::French)),
            vec!["Références".to_string()]
        );
    }

    #[test]
    fn test_from_toml() {
        let options = Options::from_toml_str(
            r#"
language = "french"
theorem_header_level = 4
no_number = ["Annexe"]
latex_macros = ['\newcommand{\R}{\mathbb{R}}']
hide_latex_macros = false
"#,
        )
        .unwrap();
        assert_eq!(options.language, Language::French);
        assert_eq!(options.theorem_header_level, 4);
        assert_eq!(options.no_number, Some(vec!["Annexe".to_string()]));
        assert_eq!(options.latex_macros, vec!["\\newcommand{\\R}{\\mathbb{R}}".to_string()]);
        assert!(!options.hide_latex_macros);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Options::from_toml_str("theorem_header_level = 9"),
            Err(Error::Config(ConfigError::HeaderLevel(9)))
        ));
        assert!(matches!(
            Options::from_toml_str("language = \"klingon\""),
            Err(Error::Config(ConfigError::UnknownLanguage(_)))
        ));
        assert!(matches!(
            Options::from_toml_str("language = 3"),
            Err(Error::Parse(ParseError::Options(_)))
        ));
    }

    #[test]
    fn test_bibliography_path_resolved_against_base() {
        let dir = std::env::temp_dir().join("markdown-latexish-options-test");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("refs.bib"), "@misc{k, title = {T}}").unwrap();

        let mut options = Options {
            base_path: Some(dir),
            ..Options::default()
        };
        options.merge_toml_str("bibliography = \"refs.bib\"").unwrap();
        assert!(options.bibliography.unwrap().contains_key("k"));
    }
}
