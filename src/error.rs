//! Error types and the warning channel.

use std::fmt;
use thiserror::Error;

/// Result type alias for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the library.
///
/// Problems in document content never surface here; they become [`Warning`]s.
/// An `Error` means the caller handed over something unusable.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that occur while reading inputs other than the document body.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid front matter: {0}")]
    FrontMatter(String),

    #[error("Invalid BibTeX: {0}")]
    BibTeX(String),

    #[error("Invalid options: {0}")]
    Options(String),
}

/// Misconfiguration of the parser.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown bibliography style: {0}")]
    UnknownStyle(String),

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Theorem header level must be between 1 and 6, got {0}")]
    HeaderLevel(u8),

    #[error("Failed to read bibliography {path}: {message}")]
    BibliographyRead { path: String, message: String },
}

/// A non-fatal problem found in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Source line the problem was detected on (1-based).
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Collects warnings for one parse and forwards them to `tracing`.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning.
    pub fn warn(&mut self, line: usize, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(line, "{}", message);
        self.warnings.push(Warning { line, message });
    }

    /// Take over warnings recorded elsewhere, e.g. by a nested parse.
    pub fn extend(&mut self, warnings: impl IntoIterator<Item = Warning>) {
        self.warnings.extend(warnings);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}
