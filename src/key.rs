//! Keys: ordered keyword/value sets naming a record or asking for one.
//!
//! A key stores raw values exactly as the caller gave them. Canonical values
//! are derived on demand through a [`Schema`], using the types bound by the
//! rule the key was last matched against. Values written by expansion (and
//! values read back from a persisted index) are flagged canonical: they
//! already are the storage coordinates. Overwriting one with [`Key::set`]
//! makes it raw again.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{FieldRulesError, Result};
use crate::rule::RuleId;
use crate::schema::Schema;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    keyword: String,
    value: String,
    // Set when the value came out of expansion or an index, cleared by `set`.
    canonical: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Key {
    entries: Vec<Entry>,
    // Only meaningful for the schema that produced it.
    rule: Option<RuleId>,
}

impl Key {
    pub fn new() -> Self {
        Self::default()
    }
    fn store(&mut self, keyword: &str, value: &str, canonical: bool) {
        match self.entries.iter_mut().find(|e| e.keyword == keyword) {
            Some(entry) => {
                entry.value = value.to_string();
                entry.canonical = canonical;
            }
            None => self.entries.push(Entry {
                keyword: keyword.to_string(),
                value: value.to_string(),
                canonical,
            }),
        }
    }
    /// Inserts or overwrites a raw value; a new keyword goes to the end, an
    /// existing one keeps its position.
    pub fn set(&mut self, keyword: &str, value: &str) {
        self.store(keyword, value, false);
    }
    pub(crate) fn set_canonical(&mut self, keyword: &str, value: &str) {
        self.store(keyword, value, true);
    }
    pub fn unset(&mut self, keyword: &str) -> Option<String> {
        let position = self.entries.iter().position(|e| e.keyword == keyword)?;
        Some(self.entries.remove(position).value)
    }
    pub fn get(&self, keyword: &str) -> Result<&str> {
        self.find(keyword)
            .ok_or_else(|| FieldRulesError::MissingKeyword(keyword.to_string()))
    }
    pub fn find(&self, keyword: &str) -> Option<&str> {
        self.entry(keyword).map(|e| e.value.as_str())
    }
    fn entry(&self, keyword: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.keyword == keyword)
    }
    pub fn contains(&self, keyword: &str) -> bool {
        self.entry(keyword).is_some()
    }
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.keyword.as_str())
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|e| (e.keyword.as_str(), e.value.as_str()))
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn rule(&self) -> Option<RuleId> {
        self.rule
    }
    pub fn set_rule(&mut self, rule: RuleId) {
        self.rule = Some(rule);
    }
    /// Whether every stored value is already canonical.
    pub fn is_canonical(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(|e| e.canonical)
    }
    pub fn canonical_value(&self, schema: &Schema, keyword: &str) -> Result<String> {
        let entry = self
            .entry(keyword)
            .ok_or_else(|| FieldRulesError::MissingKeyword(keyword.to_string()))?;
        if entry.canonical {
            return Ok(entry.value.clone());
        }
        schema.canonicalize(self.rule, keyword, &entry.value, self)
    }
    /// Whether the canonical value of `keyword` is one of `values`.
    pub fn matches(&self, schema: &Schema, keyword: &str, values: &BTreeSet<String>) -> Result<bool> {
        Ok(values.contains(&self.canonical_value(schema, keyword)?))
    }
    /// The canonical values joined with `:`. With a matched rule the order is
    /// the rule path's declaration order (hidden keywords left out), otherwise
    /// the key's own order.
    pub fn values_to_string(&self, schema: &Schema) -> Result<String> {
        let keywords: Vec<&str> = match self.rule {
            Some(rule) => schema
                .rule_keywords(rule)
                .into_iter()
                .filter(|k| self.contains(k))
                .collect(),
            None => self.keywords().collect(),
        };
        let mut values = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            values.push(self.canonical_value(schema, keyword)?);
        }
        Ok(values.join(":"))
    }
}

// Keys are equal when they carry the same values in the same order.
impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}
impl Eq for Key {}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let pairs: Vec<String> = self.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{{{}}}", pairs.join(","))
    }
}

fn split_pair(pair: &str) -> Result<(&str, &str)> {
    pair.split_once('=')
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| FieldRulesError::Syntax {
            message: format!("expected keyword=value, found '{pair}'"),
            line: 1,
        })
}

/// Parses `class=od,expver=1,...`.
impl FromStr for Key {
    type Err = FieldRulesError;
    fn from_str(s: &str) -> Result<Self> {
        let mut key = Key::new();
        for pair in s.split(',').filter(|p| !p.trim().is_empty()) {
            let (keyword, value) = split_pair(pair)?;
            key.set(keyword, value);
        }
        Ok(key)
    }
}

// ------------- Request -------------
/// A multi-valued key: each keyword maps to an ordered list of candidate
/// values. Expanding a request enumerates every combination the schema
/// accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    entries: Vec<(String, Vec<String>)>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set(&mut self, keyword: &str, values: Vec<String>) {
        match self.entries.iter_mut().find(|(k, _)| k == keyword) {
            Some(entry) => entry.1 = values,
            None => self.entries.push((keyword.to_string(), values)),
        }
    }
    pub fn values(&self, keyword: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == keyword)
            .map(|(_, v)| v.as_slice())
    }
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<&Key> for Request {
    fn from(key: &Key) -> Self {
        Self {
            entries: key.iter().map(|(k, v)| (k.to_string(), vec![v.to_string()])).collect(),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let pairs: Vec<String> = self
            .entries
            .iter()
            .map(|(k, v)| format!("{k}={}", v.join("/")))
            .collect();
        write!(f, "{{{}}}", pairs.join(","))
    }
}

/// Parses `class=od,date=20210101/20210102,...`.
impl FromStr for Request {
    type Err = FieldRulesError;
    fn from_str(s: &str) -> Result<Self> {
        let mut request = Request::new();
        for pair in s.split(',').filter(|p| !p.trim().is_empty()) {
            let (keyword, values) = split_pair(pair)?;
            request.set(keyword, values.split('/').map(|v| v.trim().to_string()).collect());
        }
        Ok(request)
    }
}
