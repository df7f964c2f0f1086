//! SQL identifier normalization
//!
//! Every schema, table, column and sequence name that reaches generated SQL
//! goes through [`Ident`]. An `Ident` only ever holds `[a-z0-9_]+`, either
//! because it was produced by [`sanitize`] or because it passed the allow-list
//! check in [`Ident::parse`].

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("static regex"));
static UNDERSCORE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").expect("static regex"));
static ALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9_]+$").expect("static regex"));

/// Name used when a raw name sanitizes to nothing
pub const FALLBACK_IDENT: &str = "col";

/// Normalize a raw sheet or column name into a lowercase SQL identifier
///
/// Steps: trim, whitespace runs -> `_`, anything outside `[A-Za-z0-9_]` -> `_`,
/// collapse `_` runs, strip leading/trailing `_`, lowercase. Empty results
/// become [`FALLBACK_IDENT`].
///
/// Two different raw names can map to the same identifier ("Value%" and
/// "Value#" both become "value"); callers that care must check for that.
pub fn sanitize(raw: &str) -> String {
    let name = WHITESPACE_RUN.replace_all(raw.trim(), "_");
    let name = DISALLOWED.replace_all(&name, "_");
    let name = UNDERSCORE_RUN.replace_all(&name, "_");
    let name = name.trim_matches('_');

    if name.is_empty() {
        FALLBACK_IDENT.to_string()
    } else {
        name.to_ascii_lowercase()
    }
}

/// Error when a configured name is not a safe identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// Name is empty
    Empty,
    /// Name contains a character outside `[a-z0-9_]`
    InvalidCharacter { name: String, ch: char },
}

impl std::fmt::Display for NameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NameError::Empty => write!(f, "identifier cannot be empty"),
            NameError::InvalidCharacter { name, ch } => write!(
                f,
                "identifier '{}' contains '{}', only lowercase letters, digits and '_' are allowed",
                name, ch
            ),
        }
    }
}

impl std::error::Error for NameError {}

/// A validated SQL identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident(String);

impl Ident {
    /// Build an identifier from an arbitrary raw name
    pub fn sanitize(raw: &str) -> Self {
        Ident(sanitize(raw))
    }

    /// Accept a name as-is if it already satisfies the allow-list
    pub fn parse(name: &str) -> Result<Self, NameError> {
        if name.is_empty() {
            return Err(NameError::Empty);
        }
        if !ALLOWED.is_match(name) {
            let ch = name
                .chars()
                .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_'))
                .unwrap_or('?');
            return Err(NameError::InvalidCharacter {
                name: name.to_string(),
                ch,
            });
        }
        Ok(Ident(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive a new identifier by appending a fixed suffix such as `_id_seq`
    pub fn with_suffix(&self, suffix: &str) -> Result<Self, NameError> {
        Ident::parse(&format!("{}{}", self.0, suffix))
    }

    /// Double-quoted form for embedding in SQL text
    pub fn quoted(&self) -> String {
        // The allow-list rules out '"', so no escaping is needed
        format!("\"{}\"", self.0)
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Ident {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Ident {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Schema-qualified, quoted object name: `"schema"."object"`
pub fn qualified(schema: &Ident, object: &Ident) -> String {
    format!("{}.{}", schema.quoted(), object.quoted())
}
