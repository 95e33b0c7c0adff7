//! Endianness-aware integer decoding and the ASCII number encodings used by archive headers.

use std::fmt::{Display, Formatter};

/// Byte order of a multi-byte integer.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Endianness {
    Big,
    Little,
}

impl Endianness {
    pub fn name(self) -> &'static str {
        match self {
            Self::Big => "big endian",
            Self::Little => "little endian",
        }
    }
}

/// Decodes an unsigned integer of 1 to 8 bytes, returning `None` for any other length.
pub fn decode_unsigned(bytes: &[u8], endianness: Endianness) -> Option<u64> {
    if bytes.is_empty() || bytes.len() > 8 {
        return None;
    }

    let mut buffer = [0u8; 8];
    Some(match endianness {
        Endianness::Big => {
            buffer[8 - bytes.len()..].copy_from_slice(bytes);
            u64::from_be_bytes(buffer)
        }
        Endianness::Little => {
            buffer[..bytes.len()].copy_from_slice(bytes);
            u64::from_le_bytes(buffer)
        }
    })
}

/// Decodes a two's complement signed integer of 1 to 8 bytes.
pub fn decode_signed(bytes: &[u8], endianness: Endianness) -> Option<i64> {
    let unsigned = decode_unsigned(bytes, endianness)?;
    let shift = 64 - 8 * bytes.len() as u32;
    Some(((unsigned << shift) as i64) >> shift)
}

/// Base of an ASCII-encoded number.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Radix {
    Octal = 8,
    Hexadecimal = 16,
}

impl Radix {
    #[inline]
    pub fn base(self) -> u32 {
        self as u32
    }
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum InvalidNumber {
    #[error("{byte:#04X} is not a valid {radix:?} digit")]
    InvalidDigit { byte: u8, radix: Radix },
    #[error("expected at least one digit")]
    Empty,
    #[error("the number does not fit in 64 bits")]
    Overflow,
}

/// Parses an ASCII number as found in tar and cpio headers.
///
/// Leading spaces are skipped, and the number ends at the first NUL or space byte (or at the end of the field).
pub fn parse_ascii(field: &[u8], radix: Radix) -> Result<u64, InvalidNumber> {
    let digits = {
        let start = field.iter().position(|&byte| byte != b' ').unwrap_or(field.len());
        let field = &field[start..];
        let end = field.iter().position(|&byte| byte == 0 || byte == b' ').unwrap_or(field.len());
        &field[..end]
    };

    if digits.is_empty() {
        return Err(InvalidNumber::Empty);
    }

    digits.iter().try_fold(0u64, |value, &byte| {
        let digit = char::from(byte)
            .to_digit(radix.base())
            .ok_or(InvalidNumber::InvalidDigit { byte, radix })?;
        value
            .checked_mul(u64::from(radix.base()))
            .and_then(|value| value.checked_add(u64::from(digit)))
            .ok_or(InvalidNumber::Overflow)
    })
}

/// Encodes `value` as a zero-padded ASCII number exactly `width` bytes long, or `None` if it does not fit.
pub fn encode_ascii(value: u64, width: usize, radix: Radix) -> Option<Vec<u8>> {
    let text = match radix {
        Radix::Octal => format!("{:0width$o}", value, width = width),
        Radix::Hexadecimal => format!("{:0width$X}", value, width = width),
    };

    if text.len() == width {
        Some(text.into_bytes())
    } else {
        None
    }
}

/// Represents an unsigned rational number, as stored in TIFF directories.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

impl Display for Rational {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Represents a signed rational number.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SignedRational {
    pub numerator: i32,
    pub denominator: i32,
}

impl Display for SignedRational {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}
