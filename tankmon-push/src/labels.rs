//! Extra label parsing and validation.
//!
//! Extra labels are supplied as a single string of comma-separated
//! `key="value"` pairs, e.g. `sensor="tank1",site="barn"`. The string is
//! spliced verbatim into every exposition line, so it must be checked against
//! the label grammar before use. [`ExtraLabels`] can only be built through
//! that check.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::LabelError;

/// Check whether `s` is a valid label identifier.
///
/// Identifiers must match `[a-zA-Z_:.][a-zA-Z0-9_:.]*`.
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || matches!(c, '_' | ':' | '.') => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '.'))
}

/// Validate a comma-separated `key="value"` label string.
///
/// An empty string is valid and means "no labels".
pub fn validate(labels: &str) -> Result<(), LabelError> {
    if labels.is_empty() {
        return Ok(());
    }

    let mut s = labels;
    loop {
        let Some(eq) = s.find('=') else {
            return Err(LabelError::MissingEquals {
                tail: s.to_string(),
            });
        };
        let ident = &s[..eq];
        s = &s[eq + 1..];

        if !is_valid_identifier(ident) {
            return Err(LabelError::InvalidIdentifier(ident.to_string()));
        }

        let Some(value) = s.strip_prefix('"') else {
            return Err(LabelError::MissingOpeningQuote {
                ident: ident.to_string(),
                tail: s.to_string(),
            });
        };

        let Some(end) = find_closing_quote(value) else {
            return Err(LabelError::UnterminatedValue {
                ident: ident.to_string(),
                tail: value.to_string(),
            });
        };

        s = &value[end + 1..];
        if s.is_empty() {
            return Ok(());
        }

        let Some(rest) = s.strip_prefix(',') else {
            return Err(LabelError::MissingSeparator {
                ident: ident.to_string(),
                tail: s.to_string(),
            });
        };
        s = rest.trim_start_matches(' ');
    }
}

/// Position of the first `"` preceded by an even number of backslashes.
fn find_closing_quote(s: &str) -> Option<usize> {
    let mut backslashes = 0usize;
    for (i, b) in s.bytes().enumerate() {
        if b == b'\\' {
            backslashes += 1;
            continue;
        }
        if b == b'"' && backslashes % 2 == 0 {
            return Some(i);
        }
        backslashes = 0;
    }
    None
}

/// Escape special characters in label values.
pub fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// A validated set of extra labels, in `key="value",...` form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ExtraLabels(String);

impl ExtraLabels {
    /// No extra labels.
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Validate and wrap a raw label string.
    pub fn parse(labels: impl Into<String>) -> Result<Self, LabelError> {
        let labels = labels.into();
        validate(&labels)?;
        Ok(Self(labels))
    }

    /// Build labels from key/value pairs, escaping the values.
    ///
    /// Pair order is preserved. A label name may appear only once.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, LabelError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut seen = BTreeSet::new();
        let mut parts = Vec::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            if !is_valid_identifier(key) {
                return Err(LabelError::InvalidIdentifier(key.to_string()));
            }
            if !seen.insert(key.to_string()) {
                return Err(LabelError::DuplicateLabel(key.to_string()));
            }
            parts.push(format!("{}=\"{}\"", key, escape_label_value(value.as_ref())));
        }
        Ok(Self(parts.join(",")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ExtraLabels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ExtraLabels {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
