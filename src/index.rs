//! An index: the axis summary of the keys it holds, plus the storage backend
//! mapping each key to where its field lives.
//!
//! Persisted layout (tagged stream, see [`crate::stream`]):
//!
//! ```text
//! version >= 3:  Unsigned version, axis, { "key": key, "type": String, "time": Signed }
//! version <  3:  Unsigned version, axis, key, String (unused), String type
//! ```
//!
//! Indexes written before version 3 carry no timestamp; they decode with a
//! timestamp of 0.

use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::axis::IndexAxis;
use crate::config::Settings;
use crate::error::{FieldRulesError, Result};
use crate::key::Key;
use crate::registry::SeaBuildHasher;
use crate::schema::Schema;
use crate::stream::{Decoder, Encoder};

pub const CURRENT_FORMAT_VERSION: u32 = 3;
const FIRST_TIMESTAMPED_VERSION: u32 = 3;

// ------------- FieldLocation -------------
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldLocation {
    uri: String,
    offset: u64,
    length: u64,
}

impl FieldLocation {
    pub fn new(uri: &str, offset: u64, length: u64) -> Self {
        Self {
            uri: uri.to_string(),
            offset,
            length,
        }
    }
    pub fn uri(&self) -> &str {
        &self.uri
    }
    pub fn offset(&self) -> u64 {
        self.offset
    }
    pub fn length(&self) -> u64 {
        self.length
    }
}

impl fmt::Display for FieldLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}+{}", self.uri, self.offset, self.length)
    }
}

// ------------- Backend -------------
/// Physical storage behind an index. Entries are addressed by the key's
/// fingerprint, its canonical values in rule order.
pub trait IndexBackend {
    fn add(&mut self, fingerprint: &str, location: FieldLocation) -> Result<()>;
    fn get(&self, fingerprint: &str) -> Result<Option<FieldLocation>>;
    fn flush(&mut self) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, FieldLocation, SeaBuildHasher>,
    dirty: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn dirty(&self) -> bool {
        self.dirty
    }
}

impl IndexBackend for MemoryBackend {
    fn add(&mut self, fingerprint: &str, location: FieldLocation) -> Result<()> {
        self.entries.insert(fingerprint.to_string(), location);
        self.dirty = true;
        Ok(())
    }
    fn get(&self, fingerprint: &str) -> Result<Option<FieldLocation>> {
        Ok(self.entries.get(fingerprint).cloned())
    }
    fn flush(&mut self) -> Result<()> {
        self.dirty = false;
        Ok(())
    }
}

// ------------- Index -------------
#[derive(Debug)]
pub struct Index<B: IndexBackend> {
    key: Key,
    index_type: String,
    timestamp: i64,
    axis: IndexAxis,
    backend: B,
}

fn check_version(version: u32) -> Result<()> {
    if version == 0 || version > CURRENT_FORMAT_VERSION {
        return Err(FieldRulesError::Decode(format!(
            "unsupported index format version {version} (supported 1..={CURRENT_FORMAT_VERSION})"
        )));
    }
    Ok(())
}

impl<B: IndexBackend> Index<B> {
    pub fn new(key: Key, index_type: &str, backend: B) -> Self {
        Self {
            key,
            index_type: index_type.to_string(),
            timestamp: Utc::now().timestamp(),
            axis: IndexAxis::new(),
            backend,
        }
    }
    pub fn key(&self) -> &Key {
        &self.key
    }
    pub fn index_type(&self) -> &str {
        &self.index_type
    }
    /// Seconds since the epoch; 0 for indexes read from a legacy layout.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
    pub fn created(&self) -> Option<DateTime<Utc>> {
        match self.timestamp {
            0 => None,
            ts => DateTime::from_timestamp(ts, 0),
        }
    }
    pub fn axis(&self) -> &IndexAxis {
        &self.axis
    }
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn put(&mut self, key: &Key, location: FieldLocation, schema: &Schema) -> Result<()> {
        debug!(index = %self.key, key = %key, location = %location, "index put");
        self.axis.insert(key, schema)?;
        let fingerprint = key.values_to_string(schema)?;
        self.backend.add(&fingerprint, location)
    }
    /// Axis test only; never reaches the backend.
    pub fn may_contain(&self, key: &Key, schema: &Schema) -> Result<bool> {
        self.axis.contains(key, schema)
    }
    pub fn get(&self, key: &Key, schema: &Schema) -> Result<Option<FieldLocation>> {
        if !self.may_contain(key, schema)? {
            return Ok(None);
        }
        self.backend.get(&key.values_to_string(schema)?)
    }
    pub fn flush(&mut self) -> Result<()> {
        self.backend.flush()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        self.encode_as(CURRENT_FORMAT_VERSION)
    }
    /// Encodes in the format version the settings select.
    pub fn encode_with(&self, settings: &Settings) -> Result<Vec<u8>> {
        self.encode_as(settings.format_version)
    }
    pub fn encode_as(&self, version: u32) -> Result<Vec<u8>> {
        check_version(version)?;
        let mut encoder = Encoder::new(Vec::new());
        encoder.write_unsigned(u64::from(version))?;
        self.encode_versioned(&mut encoder, version)?;
        Ok(encoder.into_inner())
    }
    pub fn encode_versioned<W: Write>(&self, encoder: &mut Encoder<W>, version: u32) -> Result<()> {
        self.axis.encode(encoder)?;
        if version >= FIRST_TIMESTAMPED_VERSION {
            encoder.start_object()?;
            encoder.write_string("key")?;
            encoder.write_key(&self.key)?;
            encoder.write_string("type")?;
            encoder.write_string(&self.index_type)?;
            encoder.write_string("time")?;
            encoder.write_signed(self.timestamp)?;
            encoder.end_object()
        } else {
            encoder.write_key(&self.key)?;
            encoder.write_string("")?;
            encoder.write_string(&self.index_type)
        }
    }

    pub fn decode(bytes: &[u8], backend: B) -> Result<Self> {
        let mut decoder = Decoder::new(bytes);
        let version = decoder.read_unsigned()?;
        let version = u32::try_from(version)
            .map_err(|_| FieldRulesError::Decode(format!("unsupported index format version {version}")))?;
        let index = Self::decode_versioned(&mut decoder, version, backend)?;
        decoder.finish()?;
        Ok(index)
    }
    /// Reads an index body written with the given format version.
    pub fn decode_versioned<R: Read>(decoder: &mut Decoder<R>, version: u32, backend: B) -> Result<Self> {
        check_version(version)?;
        let axis = IndexAxis::decode(decoder)?;
        if version < FIRST_TIMESTAMPED_VERSION {
            let key = decoder.read_key()?;
            decoder.read_string()?;
            let index_type = decoder.read_string()?;
            return Ok(Self {
                key,
                index_type,
                timestamp: 0,
                axis,
                backend,
            });
        }

        let mut key = None;
        let mut index_type = None;
        let mut timestamp = 0;
        decoder.start_object()?;
        while let Some(field) = decoder.next_field()? {
            match field.as_str() {
                "key" => key = Some(decoder.read_key()?),
                "type" => index_type = Some(decoder.read_string()?),
                "time" => timestamp = decoder.read_signed()?,
                other => {
                    warn!(field = other, version, "skipping unrecognised index field");
                    decoder.skip_value()?;
                }
            }
        }
        let key = key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| FieldRulesError::Decode("index has no key".to_string()))?;
        let index_type = index_type
            .filter(|t| !t.is_empty())
            .ok_or_else(|| FieldRulesError::Decode("index has no type".to_string()))?;
        if timestamp == 0 {
            return Err(FieldRulesError::Decode("index has no timestamp".to_string()));
        }
        Ok(Self {
            key,
            index_type,
            timestamp,
            axis,
            backend,
        })
    }
}
