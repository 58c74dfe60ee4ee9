//! Revision identifiers and their compact text form.
//!
//! A revision is a 64-bit value written on the wire as a base-64 number using
//! a URL- and filename-safe alphabet. The most significant digit comes first
//! and there is no padding, so the encoded form is always the shortest one.
//! Zero is reserved for "no revision" and encodes to the empty string.
//!
//! Decoding is permissive: a byte outside the alphabet counts as a zero
//! digit and arithmetic wraps at 64 bits. Servers rely on this leniency, so
//! it is the default. [`decode_revision_strict`] (and [`str::parse`]) reject
//! such input instead.

use crate::error::{CodecError, CodecResult};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Revision alphabet, indexed by digit value. Part of the wire format.
pub const REVISION_ALPHABET: &[u8; 64] =
    b"-_ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Maximum length of an encoded revision (64 bits in 6-bit digits).
pub const MAX_ENCODED_LEN: usize = 11;

const INVALID: u8 = 0xFF;
const QUOTE: &[u8] = b"\"";

const DECODING_TABLE: [u8; 256] = build_decoding_table();

const fn build_decoding_table() -> [u8; 256] {
    let mut table = [INVALID; 256];
    let mut digit = 0;
    while digit < REVISION_ALPHABET.len() {
        table[REVISION_ALPHABET[digit] as usize] = digit as u8;
        digit += 1;
    }
    table
}

/// A document revision identifier.
///
/// Ordered numerically. [`RevisionId::ZERO`] means "absent".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RevisionId(u64);

impl RevisionId {
    /// The reserved "no revision" value.
    pub const ZERO: Self = Self(0);

    /// The largest representable revision.
    pub const MAX: Self = Self(u64::MAX);

    /// Creates a revision from its numeric value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Reinterprets a signed 64-bit container as a revision, keeping the sign bit.
    pub const fn from_i64(value: i64) -> Self {
        Self(value as u64)
    }

    /// Returns the numeric value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the value in a signed 64-bit container.
    pub const fn as_i64(self) -> i64 {
        self.0 as i64
    }

    /// Returns true for the reserved zero revision.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `None` for the zero revision.
    pub fn non_zero(self) -> Option<Self> {
        if self.is_zero() {
            None
        } else {
            Some(self)
        }
    }

    /// Returns the encoded form.
    pub fn encode(self) -> String {
        encode_revision(self)
    }

    /// Decodes permissively. See [`decode_revision`].
    pub fn decode(input: impl AsRef<[u8]>) -> Self {
        decode_revision(input.as_ref())
    }
}

impl From<u64> for RevisionId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<RevisionId> for u64 {
    fn from(revision: RevisionId) -> Self {
        revision.0
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = [0u8; MAX_ENCODED_LEN];
        for &symbol in encode_revision_into(*self, &mut buf) {
            fmt::Write::write_char(f, char::from(symbol))?;
        }
        Ok(())
    }
}

impl FromStr for RevisionId {
    type Err = CodecError;

    fn from_str(s: &str) -> CodecResult<Self> {
        decode_revision_strict(s.as_bytes())
    }
}

/// Encodes a revision into `buf`, returning the used tail of the buffer.
///
/// The zero revision yields an empty slice.
pub fn encode_revision_into(revision: RevisionId, buf: &mut [u8; MAX_ENCODED_LEN]) -> &[u8] {
    let mut value = revision.get();
    let mut index = buf.len();
    while value > 0 {
        index -= 1;
        buf[index] = REVISION_ALPHABET[(value & 0x3f) as usize];
        value >>= 6;
    }
    &buf[index..]
}

/// Encodes a revision into its opaque string form.
pub fn encode_revision(revision: RevisionId) -> String {
    let mut buf = [0u8; MAX_ENCODED_LEN];
    encode_revision_into(revision, &mut buf)
        .iter()
        .map(|&symbol| char::from(symbol))
        .collect()
}

/// Decodes a revision, accepting both raw and quoted forms.
///
/// Unknown bytes contribute a zero digit and never produce an error.
pub fn decode_revision(input: &[u8]) -> RevisionId {
    let total = strip_quotes(input).iter().fold(0u64, |total, &symbol| {
        let digit = match DECODING_TABLE[usize::from(symbol)] {
            INVALID => 0,
            digit => digit,
        };
        total.wrapping_mul(64).wrapping_add(u64::from(digit))
    });
    RevisionId(total)
}

/// Decodes a revision, rejecting anything [`encode_revision`] cannot produce.
pub fn decode_revision_strict(input: &[u8]) -> CodecResult<RevisionId> {
    let digits = strip_quotes(input);
    if digits.first() == Some(&REVISION_ALPHABET[0]) {
        return Err(CodecError::LeadingZero);
    }

    let mut total: u64 = 0;
    for (position, &symbol) in digits.iter().enumerate() {
        let digit = DECODING_TABLE[usize::from(symbol)];
        if digit == INVALID {
            return Err(CodecError::InvalidSymbol { symbol, position });
        }
        total = total
            .checked_mul(64)
            .and_then(|t| t.checked_add(u64::from(digit)))
            .ok_or(CodecError::RevisionOverflow)?;
    }
    Ok(RevisionId(total))
}

fn strip_quotes(input: &[u8]) -> &[u8] {
    let input = input.strip_prefix(QUOTE).unwrap_or(input);
    input.strip_suffix(QUOTE).unwrap_or(input)
}

impl Serialize for RevisionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut buf = [0u8; MAX_ENCODED_LEN];
        let encoded = encode_revision_into(*self, &mut buf);
        // Alphabet is ASCII.
        let text = std::str::from_utf8(encoded).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(text)
    }
}

struct RevisionVisitor;

impl<'de> Visitor<'de> for RevisionVisitor {
    type Value = RevisionId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an encoded revision string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<RevisionId, E> {
        Ok(decode_revision(v.as_bytes()))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<RevisionId, E> {
        Ok(decode_revision(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<RevisionId, E> {
        Ok(RevisionId::ZERO)
    }

    fn visit_none<E: de::Error>(self) -> Result<RevisionId, E> {
        Ok(RevisionId::ZERO)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<RevisionId, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Deserialize<'de> for RevisionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RevisionVisitor)
    }
}
