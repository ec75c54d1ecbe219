//! The registry binding type names to canonicalization functions.
//!
//! A registry is an ordinary value: it is built before the schema is loaded,
//! moved into the [`Schema`](crate::schema::Schema) and consulted from there on
//! every canonicalization. There is no process-wide registry.

use core::hash::BuildHasherDefault;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use seahash::SeaHasher;

use crate::key::Key;
use crate::types;

pub type SeaBuildHasher = BuildHasherDefault<SeaHasher>;

/// The type every keyword falls back to when nothing declares otherwise.
pub const DEFAULT_TYPE: &str = "Default";

/// Turns a raw value into its storage-significant form. The error string is a
/// human readable reason; the caller wraps it with the keyword and the value.
pub trait Canonicalize: Send + Sync {
    fn canonicalize(&self, raw: &str, context: &Key) -> Result<String, String>;
}

impl<F> Canonicalize for F
where
    F: Fn(&str, &Key) -> Result<String, String> + Send + Sync,
{
    fn canonicalize(&self, raw: &str, context: &Key) -> Result<String, String> {
        self(raw, context)
    }
}

#[derive(Clone)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<dyn Canonicalize>, SeaBuildHasher>,
}

impl TypeRegistry {
    /// A registry that only knows the identity type.
    pub fn new() -> Self {
        let mut registry = Self {
            types: HashMap::default(),
        };
        registry.register(DEFAULT_TYPE, types::identity);
        registry
    }
    /// A registry with the reference canonicalizers from [`crate::types`].
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register("Date", types::date)
            .register("ClimateDaily", types::climate_daily)
            .register("ClimateMonthly", types::climate_monthly)
            .register("Step", types::step)
            .register("Expver", types::expver)
            .register("Time", types::time)
            .register("Integer", types::integer);
        registry
    }
    /// Binds a type name, replacing any previous binding of the same name.
    pub fn register<C: Canonicalize + 'static>(&mut self, type_name: &str, canonicalizer: C) -> &mut Self {
        self.types.insert(type_name.to_string(), Arc::new(canonicalizer));
        self
    }
    pub fn get(&self, type_name: &str) -> Option<&dyn Canonicalize> {
        self.types.get(type_name).map(|c| c.as_ref())
    }
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }
    pub fn len(&self) -> usize {
        self.types.len()
    }
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut names: Vec<&String> = self.types.keys().collect();
        names.sort();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}
