//! Per-keyword summary of what an index holds.
//!
//! An axis records, for every keyword seen, the set of canonical values
//! inserted under it. It answers "might this index contain the key?" without
//! touching storage: never a false negative, sometimes a false positive.
//! Keywords the axis has never seen do not constrain the answer.
//!
//! Layout inside the tagged stream:
//!
//! ```text
//! Unsigned keyword-count, (String keyword, Unsigned value-count, String value*)*
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};

use crate::error::{FieldRulesError, Result};
use crate::key::Key;
use crate::schema::Schema;
use crate::stream::{Decoder, Encoder};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexAxis {
    axis: BTreeMap<String, BTreeSet<String>>,
}

impl IndexAxis {
    pub fn new() -> Self {
        Self::default()
    }
    /// Adds the canonical values of `key`. Nothing is added when any of them
    /// fails to canonicalize.
    pub fn insert(&mut self, key: &Key, schema: &Schema) -> Result<()> {
        let values = key
            .keywords()
            .map(|keyword| Ok((keyword, key.canonical_value(schema, keyword)?)))
            .collect::<Result<Vec<_>>>()?;
        for (keyword, value) in values {
            self.axis.entry(keyword.to_string()).or_default().insert(value);
        }
        Ok(())
    }
    pub fn contains(&self, key: &Key, schema: &Schema) -> Result<bool> {
        for keyword in key.keywords() {
            let Some(values) = self.axis.get(keyword) else { continue };
            if !values.contains(&key.canonical_value(schema, keyword)?) {
                return Ok(false);
            }
        }
        Ok(true)
    }
    pub fn values(&self, keyword: &str) -> Option<&BTreeSet<String>> {
        self.axis.get(keyword)
    }
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.axis.keys().map(String::as_str)
    }
    /// Folds another axis into this one, as when indexes are combined.
    pub fn merge(&mut self, other: &IndexAxis) {
        for (keyword, values) in &other.axis {
            self.axis
                .entry(keyword.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
    }
    pub fn is_empty(&self) -> bool {
        self.axis.is_empty()
    }

    pub fn encode<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        encoder.write_unsigned(self.axis.len() as u64)?;
        for (keyword, values) in &self.axis {
            encoder.write_string(keyword)?;
            encoder.write_unsigned(values.len() as u64)?;
            for value in values {
                encoder.write_string(value)?;
            }
        }
        Ok(())
    }
    pub fn decode<R: Read>(decoder: &mut Decoder<R>) -> Result<Self> {
        let mut axis = BTreeMap::new();
        let keywords = decoder.read_unsigned()?;
        for _ in 0..keywords {
            let keyword = decoder.read_string()?;
            let count = decoder.read_unsigned()?;
            let mut values = BTreeSet::new();
            for _ in 0..count {
                values.insert(decoder.read_string()?);
            }
            if axis.insert(keyword.clone(), values).is_some() {
                return Err(FieldRulesError::Decode(format!("keyword '{keyword}' appears twice in axis")));
            }
        }
        Ok(Self { axis })
    }
}
