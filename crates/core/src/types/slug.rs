//! URL-safe identifiers derived from category and product names.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a stored [`Slug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// Nothing URL-safe was left.
    #[error("slug cannot be empty")]
    Empty,
    /// The input contains a character outside the slug alphabet.
    #[error("slug contains invalid character {0:?}")]
    InvalidChar(char),
}

/// A human-readable, URL-safe lookup key.
///
/// Slugs keep the case of the name they were derived from. Names are unique
/// case-sensitively, so folding case here would let two distinct names
/// collide on the same slug.
///
/// ```
/// use bazaar_core::Slug;
///
/// assert_eq!(Slug::from_name("Summer  Hats & Caps").unwrap().as_str(), "Summer-Hats-Caps");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

const fn is_slug_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~')
}

impl Slug {
    /// Derive a slug from a display name.
    ///
    /// Whitespace runs become a single `-`, characters outside
    /// `[A-Za-z0-9-_.~]` are dropped, repeated dashes collapse and
    /// leading/trailing dashes are trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`SlugError::Empty`] if nothing URL-safe remains.
    pub fn from_name(name: &str) -> Result<Self, SlugError> {
        let mut out = String::with_capacity(name.len());
        for c in name.trim().chars() {
            if c.is_whitespace() || c == '-' {
                if !out.is_empty() && !out.ends_with('-') {
                    out.push('-');
                }
            } else if is_slug_char(c) {
                out.push(c);
            }
        }
        while out.ends_with('-') {
            out.pop();
        }

        if out.is_empty() {
            return Err(SlugError::Empty);
        }
        Ok(Self(out))
    }

    /// Parse an already-derived slug, such as a path segment or a stored value.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or has characters outside the
    /// slug alphabet.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.is_empty() {
            return Err(SlugError::Empty);
        }
        if let Some(bad) = s.chars().find(|c| !is_slug_char(*c)) {
            return Err(SlugError::InvalidChar(bad));
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_replaces_whitespace() {
        assert_eq!(Slug::from_name("Electronics").unwrap().as_str(), "Electronics");
        assert_eq!(
            Slug::from_name("  Smart   Phones\tand Tablets ").unwrap().as_str(),
            "Smart-Phones-and-Tablets"
        );
    }

    #[test]
    fn test_from_name_drops_unsafe_characters() {
        assert_eq!(Slug::from_name("Rock & Roll!").unwrap().as_str(), "Rock-Roll");
        assert_eq!(Slug::from_name("v1.2_beta~x").unwrap().as_str(), "v1.2_beta~x");
        assert_eq!(Slug::from_name("--edge--case--").unwrap().as_str(), "edge-case");
    }

    #[test]
    fn test_from_name_preserves_case() {
        assert_ne!(Slug::from_name("Books").unwrap(), Slug::from_name("books").unwrap());
    }

    #[test]
    fn test_from_name_rejects_nothing_left() {
        assert_eq!(Slug::from_name("   "), Err(SlugError::Empty));
        assert_eq!(Slug::from_name("!!!"), Err(SlugError::Empty));
    }

    #[test]
    fn test_parse() {
        assert!(Slug::parse("Summer-Hats").is_ok());
        assert_eq!(Slug::parse("a b"), Err(SlugError::InvalidChar(' ')));
        assert_eq!(Slug::parse(""), Err(SlugError::Empty));
    }
}
