//! Symbol and string codec
//!
//! Engine strings are sequences of Unicode scalar values. Native code moves
//! them in and out as UTF-8, UTF-16 or Latin-1:
//!
//! - creation transcodes the input (ill-formed UTF-16 and characters outside
//!   the target repertoire are replaced, never rejected);
//! - copying out writes as many whole characters as fit, followed by a NUL,
//!   and never emits a partial UTF-8 sequence or half a surrogate pair.
//!
//! Symbols are identities: two symbols are equal only if they are the same
//! symbol, whatever their descriptions.

use crate::error::{Error, ExpectedType, Result};
use crate::runtime::{Env, JsValue, Symbol};
use crate::scope::Value;
use std::rc::Rc;
use tracing::trace;

/// Replacement for characters Latin-1 cannot represent
const LATIN1_REPLACEMENT: u8 = b'?';

/// Outcome of copying a string into a native buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringCopy {
    /// Code units written, not counting the terminating NUL
    pub written: usize,
    /// Whether characters were left out for lack of room
    pub truncated: bool,
}

impl Env {
    // === Creating strings ===

    pub fn string_utf8(&mut self, s: &str) -> Result<Value> {
        self.new_string(Rc::from(s))
    }

    /// A string from UTF-16 code units; unpaired surrogates become U+FFFD
    pub fn string_utf16(&mut self, units: &[u16]) -> Result<Value> {
        let s = String::from_utf16_lossy(units);
        self.new_string(Rc::from(s))
    }

    /// A string from Latin-1 bytes; every byte maps to the code point of the
    /// same value
    pub fn string_latin1(&mut self, bytes: &[u8]) -> Result<Value> {
        let s: String = bytes.iter().map(|&b| char::from(b)).collect();
        self.new_string(Rc::from(s))
    }

    fn new_string(&mut self, s: Rc<str>) -> Result<Value> {
        let limit = self.config.max_string_length;
        // UTF-16 length is at most the UTF-8 length, so only long inputs need counting
        if s.len() > limit && s.encode_utf16().count() > limit {
            return Err(Error::EngineLimitExceeded {
                what: "string length",
                limit: limit as u64,
            });
        }
        Ok(self.handle(JsValue::String(s)))
    }

    // === Copying out ===

    /// Copy a string into `buf` as UTF-8 followed by a NUL. An empty buffer
    /// receives nothing.
    pub fn get_value_string_utf8(&self, value: Value, buf: &mut [u8]) -> Result<StringCopy> {
        let s = self.string_datum(value)?;
        let Some(budget) = buf.len().checked_sub(1) else {
            return Ok(StringCopy { written: 0, truncated: !s.is_empty() });
        };
        let mut written = 0;
        for c in s.chars() {
            let width = c.len_utf8();
            if written + width > budget {
                break;
            }
            c.encode_utf8(&mut buf[written..written + width]);
            written += width;
        }
        buf[written] = 0;
        Ok(copied(written, s.len()))
    }

    /// Copy a string into `buf` as UTF-16 followed by a NUL unit
    pub fn get_value_string_utf16(&self, value: Value, buf: &mut [u16]) -> Result<StringCopy> {
        let s = self.string_datum(value)?;
        let Some(budget) = buf.len().checked_sub(1) else {
            return Ok(StringCopy { written: 0, truncated: !s.is_empty() });
        };
        let mut written = 0;
        for c in s.chars() {
            let width = c.len_utf16();
            if written + width > budget {
                break;
            }
            c.encode_utf16(&mut buf[written..written + width]);
            written += width;
        }
        buf[written] = 0;
        Ok(copied(written, s.encode_utf16().count()))
    }

    /// Copy a string into `buf` as Latin-1 followed by a NUL. Characters
    /// above U+00FF are written as `?`.
    pub fn get_value_string_latin1(&self, value: Value, buf: &mut [u8]) -> Result<StringCopy> {
        let s = self.string_datum(value)?;
        let Some(budget) = buf.len().checked_sub(1) else {
            return Ok(StringCopy { written: 0, truncated: !s.is_empty() });
        };
        let mut written = 0;
        for c in s.chars().take(budget) {
            buf[written] = u8::try_from(u32::from(c)).unwrap_or(LATIN1_REPLACEMENT);
            written += 1;
        }
        buf[written] = 0;
        Ok(copied(written, s.chars().count()))
    }

    /// Length in bytes of the string's UTF-8 encoding
    pub fn utf8_length(&self, value: Value) -> Result<usize> {
        Ok(self.string_datum(value)?.len())
    }

    /// Length in code units of the string's UTF-16 encoding
    pub fn utf16_length(&self, value: Value) -> Result<usize> {
        Ok(self.string_datum(value)?.encode_utf16().count())
    }

    /// Length in bytes of the string's Latin-1 encoding, one per character
    pub fn latin1_length(&self, value: Value) -> Result<usize> {
        Ok(self.string_datum(value)?.chars().count())
    }

    fn string_datum(&self, value: Value) -> Result<Rc<str>> {
        match self.datum(value)? {
            JsValue::String(s) => Ok(s),
            _ => Err(Error::wrong_type(ExpectedType::String)),
        }
    }

    // === Symbols ===

    /// A new symbol, distinct from every other symbol
    pub fn symbol(&mut self, description: Option<&str>) -> Value {
        self.new_symbol(description.map(Rc::from))
    }

    /// A new symbol whose description is a string handle, or none
    pub fn create_symbol(&mut self, description: Option<Value>) -> Result<Value> {
        let description = match description {
            Some(description) => Some(self.string_datum(description)?),
            None => None,
        };
        Ok(self.new_symbol(description))
    }

    /// The description a symbol was created with
    pub fn symbol_description(&self, value: Value) -> Result<Option<String>> {
        match self.datum(value)? {
            JsValue::Symbol(sym) => Ok(sym.description().map(str::to_string)),
            _ => Err(Error::wrong_type(ExpectedType::Symbol)),
        }
    }

    pub(crate) fn new_symbol(&mut self, description: Option<Rc<str>>) -> Value {
        let id = self.next_symbol_id;
        self.next_symbol_id += 1;
        trace!(symbol = id, ?description, "new symbol");
        self.handle(JsValue::Symbol(Rc::new(Symbol { id, description })))
    }
}

fn copied(written: usize, total: usize) -> StringCopy {
    StringCopy {
        written,
        truncated: written < total,
    }
}
