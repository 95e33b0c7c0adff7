//! Module for manipulating the values held by variables during a walk.

use bytescope::number::{self, Endianness, Rational};
use std::fmt::{Display, Formatter};

/// A scalar read from the buffer or computed by an exec step.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Rational(Rational),
    Double(f64),
}

bytescope::enum_case_from_impl!(Value, U8, u8);
bytescope::enum_case_from_impl!(Value, U16, u16);
bytescope::enum_case_from_impl!(Value, U32, u32);
bytescope::enum_case_from_impl!(Value, U64, u64);
bytescope::enum_case_from_impl!(Value, I8, i8);
bytescope::enum_case_from_impl!(Value, I16, i16);
bytescope::enum_case_from_impl!(Value, I32, i32);
bytescope::enum_case_from_impl!(Value, I64, i64);
bytescope::enum_case_from_impl!(Value, Rational, Rational);
bytescope::enum_case_from_impl!(Value, Double, f64);

impl Value {
    /// Decodes an unsigned integer, returning `None` unless the slice is 1, 2, 4, or 8 bytes long.
    pub fn from_unsigned(bytes: &[u8], endianness: Endianness) -> Option<Self> {
        let value = number::decode_unsigned(bytes, endianness)?;
        Some(match bytes.len() {
            1 => Self::U8(value as u8),
            2 => Self::U16(value as u16),
            4 => Self::U32(value as u32),
            8 => Self::U64(value),
            _ => return None,
        })
    }

    pub fn from_signed(bytes: &[u8], endianness: Endianness) -> Option<Self> {
        let value = number::decode_signed(bytes, endianness)?;
        Some(match bytes.len() {
            1 => Self::I8(value as i8),
            2 => Self::I16(value as i16),
            4 => Self::I32(value as i32),
            8 => Self::I64(value),
            _ => return None,
        })
    }

    /// Decodes a numerator followed by a denominator, each 4 bytes long.
    pub fn from_rational(bytes: &[u8], endianness: Endianness) -> Option<Self> {
        if bytes.len() != 8 {
            return None;
        }

        Some(Self::Rational(Rational {
            numerator: number::decode_unsigned(&bytes[..4], endianness)? as u32,
            denominator: number::decode_unsigned(&bytes[4..], endianness)? as u32,
        }))
    }

    pub fn from_float(bytes: &[u8], endianness: Endianness) -> Option<Self> {
        let bits = number::decode_unsigned(bytes, endianness)?;
        match bytes.len() {
            4 => Some(Self::Double(f64::from(f32::from_bits(bits as u32)))),
            8 => Some(Self::Double(f64::from_bits(bits))),
            _ => None,
        }
    }

    /// Gets the value as an integer, or `None` for rational and floating point values.
    pub fn as_integer(&self) -> Option<i128> {
        Some(match *self {
            Self::U8(value) => value.into(),
            Self::U16(value) => value.into(),
            Self::U32(value) => value.into(),
            Self::U64(value) => value.into(),
            Self::I8(value) => value.into(),
            Self::I16(value) => value.into(),
            Self::I32(value) => value.into(),
            Self::I64(value) => value.into(),
            Self::Rational(_) | Self::Double(_) => return None,
        })
    }

    /// Gets the value as an unsigned integer, used for sizes and bit tests.
    pub fn as_unsigned(&self) -> Option<u64> {
        self.as_integer().and_then(|value| u64::try_from(value).ok())
    }

    /// Gets the two's complement bit pattern of an integer value.
    pub fn to_bits(&self) -> Option<u64> {
        self.as_integer().map(|value| value as u64)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::U8(value) => Display::fmt(value, f),
            Self::U16(value) => Display::fmt(value, f),
            Self::U32(value) => Display::fmt(value, f),
            Self::U64(value) => Display::fmt(value, f),
            Self::I8(value) => Display::fmt(value, f),
            Self::I16(value) => Display::fmt(value, f),
            Self::I32(value) => Display::fmt(value, f),
            Self::I64(value) => Display::fmt(value, f),
            Self::Rational(value) => Display::fmt(value, f),
            Self::Double(value) => Display::fmt(value, f),
        }
    }
}

/// The binding of a variable.
///
/// A variable fails when its value could not be used, for example when it was used as a size larger than the data that
/// remained or when an exec step divided by zero. Failed variables make the steps that depend on them fail closed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Variable {
    Bound(Value),
    Failed,
}

impl Variable {
    #[inline]
    pub fn value(&self) -> Option<Value> {
        match self {
            Self::Bound(value) => Some(*value),
            Self::Failed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_select_value_kind() {
        assert_eq!(Value::from_unsigned(&[0x12, 0x34], Endianness::Big), Some(Value::U16(0x1234)));
        assert_eq!(Value::from_signed(&[0xFF; 4], Endianness::Little), Some(Value::I32(-1)));
        assert_eq!(Value::from_unsigned(&[0; 3], Endianness::Big), None);
    }

    #[test]
    fn integers_compare_across_signedness() {
        assert_eq!(Value::I8(-1).as_integer(), Some(-1));
        assert_eq!(Value::I8(-1).as_unsigned(), None);
        assert_eq!(Value::I8(-1).to_bits(), Some(u64::MAX));
        assert_eq!(Value::U64(u64::MAX).as_unsigned(), Some(u64::MAX));
        assert_eq!(Value::Double(1.5).as_integer(), None);
    }

    #[test]
    fn rationals_are_decoded() {
        let value = Value::from_rational(&[0, 0, 0, 28, 0, 0, 0, 10], Endianness::Big).unwrap();
        assert_eq!(value.to_string(), "28/10");
    }
}
