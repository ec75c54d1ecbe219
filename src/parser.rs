//! Parser for the rule language.
//!
//! The grammar lives in `rules.pest`:
//!
//! ```text
//! schema         := type-decl* rule*
//! type-decl      := ident ':' ident ';'
//! rule           := '[' segment* ']'
//! segment        := predicate (',' predicate)* | rule+
//! predicate      := ident [':' ident] predicate-tail
//! predicate-tail := '?' ident? | '-' ident? | ('=' ident ('/' ident)*)?
//! ```
//!
//! Whitespace is insignificant everywhere, including inside identifiers, and
//! `#` starts a comment running to the end of the line. The parse tree is
//! walked depth first to lay the rules out in the [`Forest`]; keyword type
//! clashes are checked during that walk.

use pest::Parser;
use pest::error::{Error, ErrorVariant, InputLocation, LineColLocation};
use pest::iterators::Pair;

use crate::error::{FieldRulesError, Result};
use crate::matcher::{Matcher, Predicate};
use crate::rule::{Forest, RuleId, TypeMap};

mod grammar {
    use pest_derive::Parser;

    #[derive(Parser)]
    #[grammar = "rules.pest"]
    pub struct RulesGrammar;
}

use grammar::{Rule as Token, RulesGrammar};

/// What a schema text declares: the leading keyword types and the rules.
#[derive(Debug, Default)]
pub struct ParsedSchema {
    pub types: TypeMap,
    pub forest: Forest,
}

pub struct RulesParser<'a> {
    text: &'a str,
    forest: Forest,
}

// Identifiers may be broken up by whitespace and comments; only the
// characters themselves count.
fn ident(pair: Pair<Token>) -> String {
    pair.into_inner().map(|c| c.as_str()).collect()
}

fn first_ident(pair: Pair<Token>) -> String {
    pair.into_inner().next().map(ident).unwrap_or_default()
}

// Line where a construct ends, counted from 1.
fn end_line(pair: &Pair<Token>) -> usize {
    pair.as_span().end_pos().line_col().0
}

fn duplicate(name: &str, line: usize) -> FieldRulesError {
    FieldRulesError::DuplicateDeclaration {
        name: name.to_string(),
        line,
    }
}

fn syntax_error(text: &str, error: Error<Token>) -> FieldRulesError {
    let line = match error.line_col {
        LineColLocation::Pos((line, _)) | LineColLocation::Span((line, _), _) => line,
    };
    let position = match error.location {
        InputLocation::Pos(position) | InputLocation::Span((position, _)) => position,
    };
    let message = match &error.variant {
        ErrorVariant::ParsingError { positives, .. }
            if positives
                .iter()
                .any(|t| matches!(t, Token::ident | Token::ident_char | Token::predicate)) =>
        {
            "Syntax error (possible trailing comma)".to_string()
        }
        ErrorVariant::ParsingError { positives, .. } if positives.contains(&Token::EOI) => {
            match text.get(position..).and_then(|rest| rest.chars().next()) {
                Some(c) => format!("Error parsing rules: remaining char: '{c}'"),
                None => error.variant.message().into_owned(),
            }
        }
        variant => variant.message().into_owned(),
    };
    FieldRulesError::Syntax { message, line }
}

impl<'a> RulesParser<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            forest: Forest::new(),
        }
    }

    pub fn parse(mut self) -> Result<ParsedSchema> {
        let pairs = RulesGrammar::parse(Token::schema, self.text).map_err(|e| syntax_error(self.text, e))?;
        let mut types = TypeMap::default();
        for pair in pairs.flat_map(|schema| schema.into_inner()) {
            match pair.as_rule() {
                Token::type_decl => Self::parse_type(pair, &mut types)?,
                Token::rule => {
                    self.parse_rule(pair, None)?;
                }
                _ => (),
            }
        }
        Ok(ParsedSchema {
            types,
            forest: self.forest,
        })
    }

    fn parse_type(pair: Pair<Token>, types: &mut TypeMap) -> Result<()> {
        let line = end_line(&pair);
        let mut inner = pair.into_inner();
        let name = inner.next().map(ident).unwrap_or_default();
        let type_name = inner.next().map(ident).unwrap_or_default();
        if types.contains_key(&name) {
            return Err(duplicate(&name, line));
        }
        types.insert(name, type_name);
        Ok(())
    }

    fn parse_predicate(pair: Pair<Token>, types: &mut TypeMap) -> Result<Predicate> {
        let mut inner = pair.into_inner();
        let keyword = inner.next().map(ident).unwrap_or_default();
        let mut matcher = Matcher::Always;
        for part in inner {
            match part.as_rule() {
                Token::type_ref => {
                    if types.contains_key(&keyword) {
                        return Err(duplicate(&keyword, end_line(&part)));
                    }
                    types.insert(keyword.clone(), first_ident(part));
                }
                Token::optional => matcher = Matcher::Optional(first_ident(part)),
                Token::hidden => matcher = Matcher::Hidden(first_ident(part)),
                Token::literals => matcher = Matcher::from_literals(part.into_inner().map(ident).collect()),
                _ => (),
            }
        }
        Ok(Predicate::new(keyword, matcher))
    }

    // Rules are reserved before their children so the forest stays in
    // declaration order.
    fn parse_rule(&mut self, pair: Pair<Token>, parent: Option<RuleId>) -> Result<RuleId> {
        let id = self.forest.reserve(end_line(&pair), parent);
        let mut predicates = Vec::new();
        let mut types = TypeMap::default();
        for part in pair.into_inner() {
            match part.as_rule() {
                Token::predicate => predicates.push(Self::parse_predicate(part, &mut types)?),
                Token::rule => {
                    self.parse_rule(part, Some(id))?;
                }
                _ => (),
            }
        }
        self.forest.fill(id, predicates, types);
        Ok(id)
    }
}

pub fn parse(text: &str) -> Result<ParsedSchema> {
    RulesParser::new(text).parse()
}
