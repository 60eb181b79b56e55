//! Correspondence patterns and conformability

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// Wildcard token: the variety tells us nothing at this column
pub const IGNORE: &str = ".";

/// Separator used when a pattern is persisted as one string
pub const SEPARATOR: char = ',';

/// Whether `ch` would break a pattern if it appeared in an outcome token
pub fn is_reserved(ch: char) -> bool {
    ch == SEPARATOR || ch.is_whitespace() || IGNORE.contains(ch)
}

/// One outcome per member variety, in view order
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct Pattern {
    tokens: SmallVec<[String; 8]>,
}

impl Pattern {
    /// Build a pattern from its tokens
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Tokens in variety order
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Number of columns (member varieties)
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the pattern has no columns
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of columns that are not the wildcard
    pub fn attested(&self) -> usize {
        self.tokens.iter().filter(|t| t.as_str() != IGNORE).count()
    }

    /// Compatible for merging: no column disagrees unless one side is `.`
    pub fn conformable(&self, other: &Pattern) -> bool {
        conformable(self, other)
    }

    /// Exactly the same tokens, wildcards included
    pub fn identical(&self, other: &Pattern) -> bool {
        identical(self, other)
    }

    /// Column-wise union of two conformable patterns
    ///
    /// Returns `None` when the patterns are not conformable.
    pub fn unify(&self, other: &Pattern) -> Option<Pattern> {
        if !self.conformable(other) {
            return None;
        }
        let tokens = self
            .tokens
            .iter()
            .zip(other.tokens.iter())
            .map(|(a, b)| if a == IGNORE { b.clone() } else { a.clone() })
            .collect();
        Some(Pattern { tokens })
    }
}

/// True iff every column either holds `.` on one side or the same token
pub fn conformable(a: &Pattern, b: &Pattern) -> bool {
    a.len() == b.len()
        && a
            .tokens
            .iter()
            .zip(b.tokens.iter())
            .all(|(x, y)| x == IGNORE || y == IGNORE || x == y)
}

/// True iff both patterns hold the same token at every column
pub fn identical(a: &Pattern, b: &Pattern) -> bool {
    a.tokens == b.tokens
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            f.write_str(token)?;
        }
        Ok(())
    }
}

impl FromStr for Pattern {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Pattern::new(Vec::<String>::new()));
        }
        Ok(Pattern::new(s.split(SEPARATOR)))
    }
}

impl From<String> for Pattern {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(pattern) => pattern,
            Err(never) => match never {},
        }
    }
}

impl From<Pattern> for String {
    fn from(value: Pattern) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Pattern {
        s.parse().unwrap()
    }

    #[test]
    fn test_conformable_with_wildcards() {
        assert!(conformable(&p("a,a,."), &p("a,.,a")));
        assert!(!conformable(&p("a,a,."), &p("a,e,.")));
        assert!(!identical(&p("a,a,."), &p("a,.,a")));
    }

    #[test]
    fn test_length_disagreement_is_not_conformable() {
        assert!(!conformable(&p("a,a"), &p("a,a,a")));
    }

    #[test]
    fn test_unify() {
        assert_eq!(p("a,a,.").unify(&p("a,.,a")), Some(p("a,a,a")));
        assert_eq!(p("a,a,.").unify(&p("e,.,a")), None);
    }

    #[test]
    fn test_reserved_characters() {
        assert!(is_reserved('.'));
        assert!(is_reserved(','));
        assert!(is_reserved(' '));
        assert!(is_reserved('\t'));
        assert!(!is_reserved('ʷ'));
        assert!(!is_reserved('a'));
    }

    #[test]
    fn test_multichar_tokens_roundtrip() {
        let pattern = Pattern::new(["kʷ", "k", "."]);
        assert_eq!(pattern.to_string(), "kʷ,k,.");
        assert_eq!(p("kʷ,k,."), pattern);
        assert_eq!(pattern.attested(), 2);
    }
}
