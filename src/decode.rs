// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoding of the appliance's tagged hex values.
//!
//! Every number the appliance reports is a string of the form
//! `<tag>_<hex-digits>`:
//!
//! - `fl_43DE0000` - IEEE-754 binary32, big-endian, always 8 hex digits
//! - `u8_1A` - unsigned integer, any number of hex digits
//!
//! Float values are rounded to the nearest integer, which is how the
//! appliance's own display presents watts and percentages. Halves round
//! up, toward positive infinity.
//!
//! # Examples
//!
//! ```
//! use senec_exporter::decode::{decode, decode_as, Encoding};
//!
//! assert_eq!(decode("fl_43DE0000").unwrap(), 444.0);
//! assert_eq!(decode("u8_1A").unwrap(), 26.0);
//! assert_eq!(decode_as("u8_1A", Encoding::Unsigned).unwrap(), 26.0);
//! assert!(decode("xx_1234").is_err());
//! ```

use std::fmt;

use crate::error::FormatError;

/// Number of hex digits in a `fl` payload.
const FLOAT_DIGITS: usize = 8;

/// Widest `u8` payload that still fits into a `u64`.
const MAX_UNSIGNED_DIGITS: usize = 16;

/// Combined exponent offset: bias 127 plus the 23-bit mantissa shift.
const EXPONENT_OFFSET: i32 = 150;

/// Implicit leading bit of a normalized binary32 significand.
const IMPLICIT_BIT: u32 = 0x0080_0000;

/// The encodings a tagged value can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// `fl`: 32-bit float, big-endian.
    Float,
    /// `u8`: unsigned integer of variable width.
    Unsigned,
}

impl Encoding {
    /// Returns the wire tag for this encoding.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Float => "fl",
            Self::Unsigned => "u8",
        }
    }

    /// Looks up the encoding for a wire tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "fl" => Some(Self::Float),
            "u8" => Some(Self::Unsigned),
            _ => None,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Splits a tagged value into its encoding and hex payload.
///
/// # Errors
///
/// Returns `FormatError` if the value is empty, has no `_` separator, or
/// carries an unknown tag.
pub fn split(tagged: &str) -> Result<(Encoding, &str), FormatError> {
    if tagged.is_empty() {
        return Err(FormatError::Empty);
    }

    let (tag, payload) = tagged
        .split_once('_')
        .ok_or_else(|| FormatError::MissingTag(tagged.to_string()))?;

    let encoding = Encoding::from_tag(tag).ok_or_else(|| FormatError::UnknownTag {
        tag: tag.to_string(),
        value: tagged.to_string(),
    })?;

    Ok((encoding, payload))
}

/// Decodes a tagged value using the encoding named by its own tag.
///
/// # Errors
///
/// Returns `FormatError` if the tag is unknown or the payload is malformed.
pub fn decode(tagged: &str) -> Result<f64, FormatError> {
    let (encoding, payload) = split(tagged)?;
    decode_payload(tagged, payload, encoding)
}

/// Decodes the payload of a tagged value under an explicit encoding.
///
/// The tag must still be one the appliance emits, but it does not have to
/// match `encoding`. The wallbox state code is read this way: the appliance
/// reports it in the same `fl_` element as the charging power, and the
/// state is the raw payload taken as an unsigned integer.
///
/// # Errors
///
/// Returns `FormatError` if the tag is unknown or the payload is malformed
/// for `encoding`.
pub fn decode_as(tagged: &str, encoding: Encoding) -> Result<f64, FormatError> {
    let (_, payload) = split(tagged)?;
    decode_payload(tagged, payload, encoding)
}

fn decode_payload(tagged: &str, payload: &str, encoding: Encoding) -> Result<f64, FormatError> {
    match encoding {
        Encoding::Float => decode_float(tagged, payload),
        Encoding::Unsigned => decode_unsigned(tagged, payload),
    }
}

fn decode_float(tagged: &str, payload: &str) -> Result<f64, FormatError> {
    if payload.len() != FLOAT_DIGITS {
        return Err(FormatError::InvalidWidth {
            expected: FLOAT_DIGITS,
            actual: payload.len(),
            value: tagged.to_string(),
        });
    }
    ensure_hex(tagged, payload)?;

    let mut bytes = [0u8; 4];
    for (byte, pair) in bytes.iter_mut().zip(payload.as_bytes().chunks(2)) {
        let pair =
            std::str::from_utf8(pair).map_err(|_| FormatError::InvalidHex(tagged.to_string()))?;
        *byte =
            u8::from_str_radix(pair, 16).map_err(|_| FormatError::InvalidHex(tagged.to_string()))?;
    }

    Ok(round_half_up(float_from_bits(u32::from_be_bytes(bytes))))
}

// Ties go toward positive infinity: -1234.5 becomes -1234.
fn round_half_up(value: f64) -> f64 {
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

#[allow(clippy::cast_precision_loss)]
fn decode_unsigned(tagged: &str, payload: &str) -> Result<f64, FormatError> {
    if payload.is_empty() {
        return Err(FormatError::InvalidWidth {
            expected: 1,
            actual: 0,
            value: tagged.to_string(),
        });
    }
    ensure_hex(tagged, payload)?;
    if payload.len() > MAX_UNSIGNED_DIGITS {
        return Err(FormatError::Overflow(tagged.to_string()));
    }

    let value =
        u64::from_str_radix(payload, 16).map_err(|_| FormatError::InvalidHex(tagged.to_string()))?;
    Ok(value as f64)
}

// `from_str_radix` tolerates a leading sign, the wire format does not.
fn ensure_hex(tagged: &str, payload: &str) -> Result<(), FormatError> {
    if payload.bytes().all(|b| b.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(FormatError::InvalidHex(tagged.to_string()))
    }
}

/// Interprets `bits` as IEEE-754 binary32 without rounding.
///
/// The implicit bit is folded into the significand and the exponent is
/// offset by a flat 150, so an all-ones exponent yields a large finite
/// number rather than infinity or NaN.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn float_from_bits(bits: u32) -> f64 {
    let negative = bits >> 31 == 1;
    let exponent = ((bits >> 23) & 0xFF) as i32;
    let mantissa = bits & 0x007F_FFFF;

    let significand = if exponent == 0 {
        mantissa << 1
    } else {
        mantissa | IMPLICIT_BIT
    };

    let magnitude = f64::from(significand) * 2f64.powi(exponent - EXPONENT_OFFSET);
    if negative { -magnitude } else { magnitude }
}
