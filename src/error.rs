//! The one error type of the crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FieldRulesError {
    #[error("Syntax error on line {line}: {message}")]
    Syntax { message: String, line: usize },
    #[error("Duplicate declaration of '{name}' on line {line}")]
    DuplicateDeclaration { name: String, line: usize },
    #[error("Unknown type '{type_name}' declared for keyword '{keyword}'")]
    UnknownType { keyword: String, type_name: String },
    #[error("Missing keyword: {0}")]
    MissingKeyword(String),
    #[error("No rule matches key {key}")]
    NoMatchingRule { key: String },
    #[error("Cannot canonicalize {keyword}={value}: {reason}")]
    Canonicalization { keyword: String, value: String, reason: String },
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FieldRulesError>;

impl From<config::ConfigError> for FieldRulesError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
