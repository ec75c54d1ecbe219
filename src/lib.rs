//! Fieldrules – a schema rule language for addressing archived fields.
//!
//! A schema is a forest of bracketed rules. Each rule lists predicates on
//! keywords of a key (`class=od`, `levelist?`, `number-0`, ...), and every
//! path from a root to a leaf describes one family of keys the archive can
//! hold. Matching a key against the schema ("expansion") picks the first leaf
//! whose path accepts it, fills in defaults and produces the canonical key
//! that storage is addressed by.
//!
//! ## Modules
//! * [`parser`] – The rule grammar, turned into a [`rule::Forest`].
//! * [`matcher`] – [`matcher::Matcher`] variants and [`matcher::Predicate`].
//! * [`schema`] – The loaded [`schema::Schema`] and both expansion modes.
//! * [`key`] – [`key::Key`] and the multi-valued [`key::Request`].
//! * [`registry`] / [`types`] – Type names bound to canonicalizers.
//! * [`axis`] / [`index`] – Per-index value summaries and their persisted layout.
//! * [`config`] – [`config::Settings`] from a file and `FIELDRULES_*` variables.
//!
//! ## Quick Start
//! ```
//! use fieldrules::{Key, Schema, TypeRegistry};
//! let schema = Schema::parse(
//!     "step:Step;\n[ class=od, stream [ step, param ] ]",
//!     TypeRegistry::with_builtins(),
//! ).unwrap();
//! let key: Key = "class=od,stream=oper,step=06,param=130".parse().unwrap();
//! let mut canonical = Vec::new();
//! schema.expand(&key, &mut |expanded: &Key, _: &Key| {
//!     canonical.push(expanded.values_to_string(&schema).unwrap());
//!     true
//! }).unwrap();
//! assert_eq!(canonical, vec!["od:oper:6:130"]);
//! ```

pub mod axis;
pub mod config;
pub mod error;
pub mod index;
pub mod key;
pub mod matcher;
pub mod parser;
pub mod registry;
pub mod rule;
pub mod schema;
pub mod stream;
pub mod types;

pub use axis::IndexAxis;
pub use config::Settings;
pub use error::{FieldRulesError, Result};
pub use index::{FieldLocation, Index, IndexBackend, MemoryBackend, CURRENT_FORMAT_VERSION};
pub use key::{Key, Request};
pub use matcher::{Matcher, Predicate};
pub use rule::{Forest, Rule, RuleId};
pub use schema::{ExpansionVisitor, Schema};
pub use registry::{Canonicalize, TypeRegistry};
