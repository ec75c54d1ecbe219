//! The rule forest.
//!
//! Rules are kept in an arena owned by the [`Forest`] (and therefore by the
//! schema); everything else refers to them through a [`RuleId`]. A `RuleId`
//! is only meaningful for the forest that handed it out, which means a key's
//! matched rule is valid exactly as long as the schema it was expanded
//! against.

use std::collections::HashMap;
use std::fmt;

use crate::matcher::Predicate;
use crate::registry::SeaBuildHasher;

pub type TypeMap = HashMap<String, String, SeaBuildHasher>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(usize);

impl RuleId {
    pub fn index(&self) -> usize {
        self.0
    }
}

// ------------- Rule -------------
#[derive(Debug)]
pub struct Rule {
    line: usize,
    predicates: Vec<Predicate>,
    children: Vec<RuleId>,
    types: TypeMap,
    parent: Option<RuleId>,
}

impl Rule {
    // Only the parser builds rules, and nothing mutates them afterwards.
    pub(crate) fn new(line: usize, parent: Option<RuleId>) -> Self {
        Self {
            line,
            predicates: Vec::new(),
            children: Vec::new(),
            types: TypeMap::default(),
            parent,
        }
    }
    /// Line of the closing `]`, counted from 1.
    pub fn line(&self) -> usize {
        self.line
    }
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }
    pub fn children(&self) -> &[RuleId] {
        &self.children
    }
    /// Keyword types declared inline in this rule (`keyword:Type`).
    pub fn types(&self) -> &TypeMap {
        &self.types
    }
    pub fn parent(&self) -> Option<RuleId> {
        self.parent
    }
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

// ------------- Forest -------------
#[derive(Debug, Default)]
pub struct Forest {
    rules: Vec<Rule>,
    roots: Vec<RuleId>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }
    pub(crate) fn reserve(&mut self, line: usize, parent: Option<RuleId>) -> RuleId {
        let id = RuleId(self.rules.len());
        self.rules.push(Rule::new(line, parent));
        match parent {
            Some(p) => self.rules[p.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }
    pub(crate) fn fill(&mut self, id: RuleId, predicates: Vec<Predicate>, types: TypeMap) {
        let rule = &mut self.rules[id.0];
        rule.predicates = predicates;
        rule.types = types;
    }
    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.0)
    }
    pub fn roots(&self) -> &[RuleId] {
        &self.roots
    }
    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules.iter().enumerate().map(|(i, rule)| (RuleId(i), rule))
    }
    pub fn len(&self) -> usize {
        self.rules.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
    pub fn leaves(&self) -> impl Iterator<Item = RuleId> + '_ {
        self.iter().filter(|(_, rule)| rule.is_leaf()).map(|(id, _)| id)
    }
    /// The chain from the given rule up to its root, innermost first.
    pub fn ancestry(&self, id: RuleId) -> Vec<RuleId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            chain.push(c);
            current = self.get(c).and_then(Rule::parent);
        }
        chain
    }
    /// Predicates from the root down to the given rule, in declaration order.
    pub fn path_predicates(&self, id: RuleId) -> Vec<&Predicate> {
        let mut chain = self.ancestry(id);
        chain.reverse();
        chain
            .into_iter()
            .filter_map(|c| self.get(c))
            .flat_map(|rule| rule.predicates.iter())
            .collect()
    }
    fn write_rule(&self, f: &mut fmt::Formatter, id: RuleId, depth: usize) -> fmt::Result {
        let Some(rule) = self.get(id) else { return Ok(()) };
        let predicates: Vec<String> = rule
            .predicates
            .iter()
            .map(|p| match rule.types.get(p.keyword()) {
                Some(type_name) => {
                    let text = p.to_string();
                    format!("{}:{}{}", p.keyword(), type_name, &text[p.keyword().len()..])
                }
                None => p.to_string(),
            })
            .collect();
        write!(f, "{}[ {}", "    ".repeat(depth), predicates.join(", "))?;
        if rule.is_leaf() {
            return writeln!(f, " ]");
        }
        writeln!(f)?;
        for child in &rule.children {
            self.write_rule(f, *child, depth + 1)?;
        }
        writeln!(f, "{}]", "    ".repeat(depth))
    }
}

impl fmt::Display for Forest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for root in &self.roots {
            self.write_rule(f, *root, 0)?;
        }
        Ok(())
    }
}
