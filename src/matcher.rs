//! Predicates and the closed set of strategies used to test them.
//!
//! A [`Matcher`] never looks at a key by itself; the caller resolves the
//! (canonical) value of the predicate's keyword and hands it over, or `None`
//! when the key does not carry the keyword at all.

use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Accepts anything, including an absent keyword.
    Always,
    /// Accepts exactly one literal.
    Value(String),
    /// Accepts any member of the set.
    AnySet(BTreeSet<String>),
    /// Accepts any value; supplies the default when the keyword is absent.
    Optional(String),
    /// Like `Optional`, but the keyword never shows up in expanded output.
    Hidden(String),
}

impl Matcher {
    /// Picks the matcher for a `k=a/b/...` literal list: none gives `Always`,
    /// one gives `Value` and more give `AnySet`.
    pub fn from_literals(mut literals: BTreeSet<String>) -> Self {
        match literals.len() {
            0 => Matcher::Always,
            1 => match literals.pop_first() {
                Some(literal) => Matcher::Value(literal),
                None => Matcher::Always,
            },
            _ => Matcher::AnySet(literals),
        }
    }
    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            Matcher::Always | Matcher::Optional(_) | Matcher::Hidden(_) => true,
            Matcher::Value(literal) => value == Some(literal.as_str()),
            Matcher::AnySet(literals) => value.is_some_and(|v| literals.contains(v)),
        }
    }
    pub fn default_value(&self) -> Option<&str> {
        match self {
            Matcher::Optional(default) | Matcher::Hidden(default) => Some(default),
            _ => None,
        }
    }
    pub fn visible(&self) -> bool {
        !matches!(self, Matcher::Hidden(_))
    }
    pub fn optional(&self) -> bool {
        self.default_value().is_some()
    }
}

// ------------- Predicate -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    keyword: String,
    matcher: Matcher,
}

impl Predicate {
    pub fn new(keyword: String, matcher: Matcher) -> Self {
        Self { keyword, matcher }
    }
    pub fn keyword(&self) -> &str {
        &self.keyword
    }
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }
    pub fn matches(&self, value: Option<&str>) -> bool {
        self.matcher.matches(value)
    }
    pub fn visible(&self) -> bool {
        self.matcher.visible()
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.matcher {
            Matcher::Always => write!(f, "{}", self.keyword),
            Matcher::Value(literal) => write!(f, "{}={}", self.keyword, literal),
            Matcher::AnySet(literals) => {
                let joined: Vec<&str> = literals.iter().map(String::as_str).collect();
                write!(f, "{}={}", self.keyword, joined.join("/"))
            }
            Matcher::Optional(default) => write!(f, "{}?{}", self.keyword, default),
            Matcher::Hidden(default) => write!(f, "{}-{}", self.keyword, default),
        }
    }
}
