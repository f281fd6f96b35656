//! Identifier and literal sanitization for generated SQL
//!
//! Identifiers (catalog, schema) and literals (paths, credentials) take
//! separate paths: identifiers are validated against a strict charset and
//! then quoted, literals are escaped but never charset-checked.

use crate::error::ConfigurationError;
use std::fmt;

/// An identifier known to match `^[A-Za-z0-9_]+$`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafeIdentifier(String);

impl SafeIdentifier {
    /// Validate `value`, naming `field` in the error when it is rejected
    pub fn validate(field: &'static str, value: &str) -> Result<Self, ConfigurationError> {
        let valid = !value.is_empty()
            && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

        if valid {
            Ok(Self(value.to_string()))
        } else {
            Err(ConfigurationError::InvalidIdentifier {
                field,
                value: value.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap in double quotes for use in statement text
    pub fn quote(&self) -> QuotedIdentifier {
        quote_identifier(&self.0)
    }
}

impl fmt::Display for SafeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SafeIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A double-quoted identifier ready to be spliced into SQL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotedIdentifier(String);

impl QuotedIdentifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuotedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Quote an identifier, doubling embedded double quotes
///
/// Only for trusted names; caller-controlled names go through
/// [`SafeIdentifier::validate`] first.
pub fn quote_identifier(name: &str) -> QuotedIdentifier {
    QuotedIdentifier(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Quote a string literal, doubling embedded single quotes
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
