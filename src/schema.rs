//! The schema: a parsed rule forest, its keyword types and the registry of
//! canonicalizers, plus the expansion algorithm walking the forest.
//!
//! A schema is immutable once loaded and can be shared between threads;
//! every caller brings its own keys and visitors.
//!
//! Expansion is a depth-first search in declaration order. Each rule level
//! works on its own copy of the key, so defaults injected along a branch
//! that is later abandoned never leak into its siblings.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{FieldRulesError, Result};
use crate::key::{Key, Request};
use crate::matcher::Matcher;
use crate::parser::{self, ParsedSchema};
use crate::registry::{TypeRegistry, DEFAULT_TYPE};
use crate::rule::{Forest, Rule, RuleId, TypeMap};

/// Receives the keys reaching a leaf rule.
///
/// `expanded` holds the canonical values of the visible keywords along the
/// rule path and is attached to the leaf; `full` is the key as matched,
/// including any defaults that were filled in.
pub trait ExpansionVisitor {
    fn select_datum(&mut self, expanded: &Key, full: &Key) -> bool;
}

impl<F> ExpansionVisitor for F
where
    F: FnMut(&Key, &Key) -> bool,
{
    fn select_datum(&mut self, expanded: &Key, full: &Key) -> bool {
        self(expanded, full)
    }
}

#[derive(Debug, Default)]
pub struct Schema {
    types: TypeMap,
    forest: Forest,
    registry: TypeRegistry,
    path: Option<PathBuf>,
}

impl Schema {
    pub fn parse(text: &str, registry: TypeRegistry) -> Result<Self> {
        let ParsedSchema { types, forest } = parser::parse(text)?;
        let schema = Self {
            types,
            forest,
            registry,
            path: None,
        };
        schema.check_types()?;
        info!(rules = schema.forest.len(), types = schema.types.len(), "schema parsed");
        Ok(schema)
    }
    pub fn load<P: AsRef<Path>>(path: P, registry: TypeRegistry) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let mut schema = Self::parse(&text, registry)?;
        schema.path = Some(path.as_ref().to_path_buf());
        info!(path = %path.as_ref().display(), "schema loaded");
        Ok(schema)
    }
    pub fn from_settings(settings: &Settings, registry: TypeRegistry) -> Result<Self> {
        Self::load(&settings.schema_path, registry)
    }
    // Every declared type has to be known before any key is looked at.
    fn check_types(&self) -> Result<()> {
        let inline = self.forest.iter().flat_map(|(_, rule)| rule.types().iter());
        for (keyword, type_name) in self.types.iter().chain(inline) {
            if !self.registry.contains(type_name) {
                return Err(FieldRulesError::UnknownType {
                    keyword: keyword.clone(),
                    type_name: type_name.clone(),
                });
            }
        }
        Ok(())
    }
    pub fn forest(&self) -> &Forest {
        &self.forest
    }
    pub fn roots(&self) -> &[RuleId] {
        self.forest.roots()
    }
    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.forest.get(id)
    }
    pub fn leaves(&self) -> impl Iterator<Item = RuleId> + '_ {
        self.forest.leaves()
    }
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
    /// The type bound to `keyword` at `rule`: the innermost inline declaration
    /// on the way to the root, then the leading type block, then `Default`.
    pub fn type_name(&self, rule: Option<RuleId>, keyword: &str) -> &str {
        if let Some(rule) = rule {
            for id in self.forest.ancestry(rule) {
                if let Some(type_name) = self.forest.get(id).and_then(|r| r.types().get(keyword)) {
                    return type_name;
                }
            }
        }
        self.types.get(keyword).map(String::as_str).unwrap_or(DEFAULT_TYPE)
    }
    /// Applies the canonicalizer bound to `keyword` at `rule`. An empty value
    /// (what an optional keyword without a default is filled with) stays empty.
    pub fn canonicalize(&self, rule: Option<RuleId>, keyword: &str, raw: &str, context: &Key) -> Result<String> {
        if raw.is_empty() {
            return Ok(String::new());
        }
        let type_name = self.type_name(rule, keyword);
        let canonicalizer = self.registry.get(type_name).ok_or_else(|| FieldRulesError::UnknownType {
            keyword: keyword.to_string(),
            type_name: type_name.to_string(),
        })?;
        canonicalizer
            .canonicalize(raw, context)
            .map_err(|reason| FieldRulesError::Canonicalization {
                keyword: keyword.to_string(),
                value: raw.to_string(),
                reason,
            })
    }
    /// Visible keywords from the root down to `rule`, in declaration order.
    pub fn rule_keywords(&self, rule: RuleId) -> Vec<&str> {
        let mut keywords: Vec<&str> = Vec::new();
        for predicate in self.forest.path_predicates(rule) {
            if predicate.visible() && !keywords.contains(&predicate.keyword()) {
                keywords.push(predicate.keyword());
            }
        }
        keywords
    }

    fn expanded_key(&self, leaf: RuleId, full: &Key) -> Result<Key> {
        let mut expanded = Key::new();
        expanded.set_rule(leaf);
        for predicate in self.forest.path_predicates(leaf) {
            if !predicate.visible() {
                continue;
            }
            if let Some(raw) = full.find(predicate.keyword()) {
                let value = self.canonicalize(Some(leaf), predicate.keyword(), raw, full)?;
                expanded.set_canonical(predicate.keyword(), &value);
            }
        }
        Ok(expanded)
    }

    // Literal matchers compare against the canonical value; the others accept
    // anything and are not worth a canonicalization.
    fn accepts(&self, rule: RuleId, matcher: &Matcher, keyword: &str, raw: &str, context: &Key) -> Result<bool> {
        match matcher {
            Matcher::Value(_) | Matcher::AnySet(_) => {
                let value = self.canonicalize(Some(rule), keyword, raw, context)?;
                Ok(matcher.matches(Some(&value)))
            }
            _ => Ok(true),
        }
    }

    /// Matches a fully specified key: the first leaf, in declaration order,
    /// whose path accepts the key and whose visitor call returns `true` wins.
    pub fn expand<V: ExpansionVisitor + ?Sized>(&self, key: &Key, visitor: &mut V) -> Result<RuleId> {
        for root in self.forest.roots() {
            if let Some(leaf) = self.expand_rule(*root, key, visitor)? {
                return Ok(leaf);
            }
        }
        Err(FieldRulesError::NoMatchingRule { key: key.to_string() })
    }

    fn expand_rule<V: ExpansionVisitor + ?Sized>(&self, id: RuleId, full: &Key, visitor: &mut V) -> Result<Option<RuleId>> {
        let Some(rule) = self.forest.get(id) else { return Ok(None) };
        let mut full = full.clone();

        for predicate in rule.predicates() {
            let keyword = predicate.keyword();
            match full.find(keyword) {
                Some(raw) => {
                    if !self.accepts(id, predicate.matcher(), keyword, raw, &full)? {
                        return Ok(None);
                    }
                }
                None => match predicate.matcher().default_value() {
                    Some(default) => full.set(keyword, default),
                    None if predicate.matches(None) => (),
                    None => return Ok(None),
                },
            }
        }

        if rule.is_leaf() {
            let expanded = self.expanded_key(id, &full)?;
            full.set_rule(id);
            debug!(rule = id.index(), line = rule.line(), key = %expanded, "leaf reached");
            return Ok(visitor.select_datum(&expanded, &full).then_some(id));
        }

        for child in rule.children() {
            if let Some(leaf) = self.expand_rule(*child, &full, visitor)? {
                return Ok(Some(leaf));
            }
        }
        Ok(None)
    }

    /// Enumerates every value combination of `request` the schema accepts,
    /// visiting all matching rules in declaration order. The visitor returns
    /// `false` to stop the enumeration. Returns the number of visits.
    pub fn expand_request<V: ExpansionVisitor + ?Sized>(&self, request: &Request, visitor: &mut V) -> Result<usize> {
        let mut visits = 0;
        for root in self.forest.roots() {
            if !self.enumerate(*root, 0, request, &Key::new(), visitor, &mut visits)? {
                break;
            }
        }
        if visits == 0 {
            return Err(FieldRulesError::NoMatchingRule { key: request.to_string() });
        }
        Ok(visits)
    }

    // Ok(false) means the visitor asked to stop.
    fn enumerate<V: ExpansionVisitor + ?Sized>(
        &self,
        id: RuleId,
        index: usize,
        request: &Request,
        full: &Key,
        visitor: &mut V,
        visits: &mut usize,
    ) -> Result<bool> {
        let Some(rule) = self.forest.get(id) else { return Ok(true) };

        if let Some(predicate) = rule.predicates().get(index) {
            let keyword = predicate.keyword();
            let candidates: Vec<&str> = match request.values(keyword) {
                Some(values) => values.iter().map(String::as_str).collect(),
                None => match predicate.matcher().default_value() {
                    Some(default) => vec![default],
                    None if predicate.matches(None) => {
                        return self.enumerate(id, index + 1, request, full, visitor, visits);
                    }
                    None => return Ok(true),
                },
            };
            for value in candidates {
                let mut next = full.clone();
                next.set(keyword, value);
                if !self.accepts(id, predicate.matcher(), keyword, value, &next)? {
                    continue;
                }
                if !self.enumerate(id, index + 1, request, &next, visitor, visits)? {
                    return Ok(false);
                }
            }
            return Ok(true);
        }

        if rule.is_leaf() {
            let expanded = self.expanded_key(id, full)?;
            let mut full = full.clone();
            full.set_rule(id);
            *visits += 1;
            debug!(rule = id.index(), line = rule.line(), key = %expanded, "leaf enumerated");
            return Ok(visitor.select_datum(&expanded, &full));
        }

        for child in rule.children() {
            if !self.enumerate(*child, 0, request, full, visitor, visits)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// The leaf a key would be archived under, if any.
    pub fn rule_for(&self, key: &Key) -> Result<Option<RuleId>> {
        match self.expand(key, &mut |_: &Key, _: &Key| true) {
            Ok(leaf) => Ok(Some(leaf)),
            Err(FieldRulesError::NoMatchingRule { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut types: Vec<(&String, &String)> = self.types.iter().collect();
        types.sort();
        for (keyword, type_name) in types {
            writeln!(f, "{keyword}:{type_name};")?;
        }
        write!(f, "{}", self.forest)
    }
}
