//! Tagged binary stream used for persisted indexes.
//!
//! ```text
//! value  := tag payload
//! tag    := u8 (1 start object, 2 end object, 3 string, 4 unsigned, 5 signed)
//! string := u64 length, UTF-8 bytes
//! object := StartObject (String name, value)* EndObject
//! ```
//!
//! Integers are big-endian. Objects are self-delimiting, so a reader can skip
//! fields it does not know.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{FieldRulesError, Result};
use crate::key::Key;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    StartObject = 1,
    EndObject = 2,
    String = 3,
    Unsigned = 4,
    Signed = 5,
}

impl Tag {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Tag::StartObject),
            2 => Some(Tag::EndObject),
            3 => Some(Tag::String),
            4 => Some(Tag::Unsigned),
            5 => Some(Tag::Signed),
            _ => None,
        }
    }
}

fn truncated(e: io::Error) -> FieldRulesError {
    FieldRulesError::Decode(format!("unreadable stream: {e}"))
}

// ------------- Encoder -------------
pub struct Encoder<W: Write> {
    writer: W,
}

impl<W: Write> Encoder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
    pub fn into_inner(self) -> W {
        self.writer
    }
    fn tag(&mut self, tag: Tag) -> Result<()> {
        self.writer.write_u8(tag as u8)?;
        Ok(())
    }
    pub fn start_object(&mut self) -> Result<()> {
        self.tag(Tag::StartObject)
    }
    pub fn end_object(&mut self) -> Result<()> {
        self.tag(Tag::EndObject)
    }
    pub fn write_string(&mut self, s: &str) -> Result<()> {
        self.tag(Tag::String)?;
        self.writer.write_u64::<BigEndian>(s.len() as u64)?;
        self.writer.write_all(s.as_bytes())?;
        Ok(())
    }
    pub fn write_unsigned(&mut self, n: u64) -> Result<()> {
        self.tag(Tag::Unsigned)?;
        self.writer.write_u64::<BigEndian>(n)?;
        Ok(())
    }
    pub fn write_signed(&mut self, n: i64) -> Result<()> {
        self.tag(Tag::Signed)?;
        self.writer.write_i64::<BigEndian>(n)?;
        Ok(())
    }
    /// A key is an object whose fields are its keywords, in key order.
    pub fn write_key(&mut self, key: &Key) -> Result<()> {
        self.start_object()?;
        for (keyword, value) in key.iter() {
            self.write_string(keyword)?;
            self.write_string(value)?;
        }
        self.end_object()
    }
}

// ------------- Decoder -------------
pub struct Decoder<R: Read> {
    reader: R,
}

impl<R: Read> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
    fn tag(&mut self) -> Result<Tag> {
        let b = self.reader.read_u8().map_err(truncated)?;
        Tag::from_byte(b).ok_or_else(|| FieldRulesError::Decode(format!("unknown tag {b}")))
    }
    fn expect(&mut self, expected: Tag) -> Result<()> {
        match self.tag()? {
            tag if tag == expected => Ok(()),
            tag => Err(FieldRulesError::Decode(format!("expected {expected:?}, found {tag:?}"))),
        }
    }
    fn string_payload(&mut self) -> Result<String> {
        let length = self.reader.read_u64::<BigEndian>().map_err(truncated)?;
        let mut bytes = Vec::new();
        (&mut self.reader).take(length).read_to_end(&mut bytes).map_err(truncated)?;
        if bytes.len() as u64 != length {
            return Err(FieldRulesError::Decode(format!(
                "string of {length} bytes cut short at {}",
                bytes.len()
            )));
        }
        String::from_utf8(bytes).map_err(|e| FieldRulesError::Decode(e.to_string()))
    }
    pub fn start_object(&mut self) -> Result<()> {
        self.expect(Tag::StartObject)
    }
    /// The next field name of the current object, or `None` at its end.
    pub fn next_field(&mut self) -> Result<Option<String>> {
        match self.tag()? {
            Tag::EndObject => Ok(None),
            Tag::String => self.string_payload().map(Some),
            tag => Err(FieldRulesError::Decode(format!("expected a field name, found {tag:?}"))),
        }
    }
    pub fn read_string(&mut self) -> Result<String> {
        self.expect(Tag::String)?;
        self.string_payload()
    }
    pub fn read_unsigned(&mut self) -> Result<u64> {
        self.expect(Tag::Unsigned)?;
        self.reader.read_u64::<BigEndian>().map_err(truncated)
    }
    pub fn read_signed(&mut self) -> Result<i64> {
        self.expect(Tag::Signed)?;
        self.reader.read_i64::<BigEndian>().map_err(truncated)
    }
    pub fn read_key(&mut self) -> Result<Key> {
        self.start_object()?;
        let mut key = Key::new();
        while let Some(keyword) = self.next_field()? {
            let value = self.read_string()?;
            key.set_canonical(&keyword, &value);
        }
        Ok(key)
    }
    /// Reads and discards one value of any shape.
    pub fn skip_value(&mut self) -> Result<()> {
        match self.tag()? {
            Tag::StartObject => {
                while self.next_field()?.is_some() {
                    self.skip_value()?;
                }
                Ok(())
            }
            Tag::EndObject => Err(FieldRulesError::Decode("unexpected end of object".to_string())),
            Tag::String => self.string_payload().map(|_| ()),
            Tag::Unsigned => self.reader.read_u64::<BigEndian>().map(|_| ()).map_err(truncated),
            Tag::Signed => self.reader.read_i64::<BigEndian>().map(|_| ()).map_err(truncated),
        }
    }
    /// Fails unless every byte has been consumed.
    pub fn finish(mut self) -> Result<()> {
        let mut rest = [0u8; 1];
        match self.reader.read(&mut rest).map_err(truncated)? {
            0 => Ok(()),
            _ => Err(FieldRulesError::Decode("trailing bytes after index".to_string())),
        }
    }
}
