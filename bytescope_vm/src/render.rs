//! Formatting of field values for description lines.

use crate::value::Value;
use bytescope::annotation::INVALID;
use bytescope::binary::ByteDebug;
use bytescope::definition::{FieldDefinition, PrintPolicy, TextEncoding};
use bytescope::number::{self, Endianness};

/// Decodes text, returning `None` if the bytes are not valid in the encoding.
///
/// Trailing NUL bytes are removed, since fixed-size text fields are usually padded with them.
pub fn text(bytes: &[u8], encoding: TextEncoding) -> Option<String> {
    let end = bytes.iter().rposition(|&byte| byte != 0).map_or(0, |index| index + 1);
    let bytes = &bytes[..end];
    match encoding {
        TextEncoding::Ascii if bytes.is_ascii() => Some(bytes.iter().copied().map(char::from).collect()),
        TextEncoding::Ascii => None,
        TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
        TextEncoding::Latin1 => Some(bytes.iter().copied().map(char::from).collect()),
    }
}

/// Lists the meanings of the flags set in `value`.
pub fn flags(field: &FieldDefinition, value: u64) -> String {
    let meanings: Vec<&str> = field
        .flags
        .iter()
        .filter(|flag| value & flag.mask != 0)
        .map(|flag| flag.meaning.as_str())
        .collect();

    if meanings.is_empty() {
        "(none)".to_string()
    } else {
        meanings.join(", ")
    }
}

/// Formats the bytes of a field according to its print policy, or returns `None` if the field has no printed value.
///
/// Values outside of their expected domain are rendered as `INVALID`.
pub fn field(field: &FieldDefinition, bytes: &[u8], endianness: Endianness) -> Option<String> {
    let invalid = || INVALID.to_string();
    Some(match &field.print {
        PrintPolicy::None => return None,
        PrintPolicy::Literal(text) => text.clone(),
        PrintPolicy::Unsigned => match number::decode_unsigned(bytes, endianness) {
            Some(value) => value.to_string(),
            None => ByteDebug::from(bytes).to_string(),
        },
        PrintPolicy::Signed => number::decode_signed(bytes, endianness).map_or_else(invalid, |value| value.to_string()),
        PrintPolicy::Hex => ByteDebug::from(bytes).to_string(),
        PrintPolicy::Text => text(bytes, field.encoding).unwrap_or_else(invalid),
        PrintPolicy::Options => number::decode_unsigned(bytes, endianness)
            .and_then(|value| field.option_meaning(value))
            .map_or_else(invalid, str::to_string),
        PrintPolicy::Flags => number::decode_unsigned(bytes, endianness).map_or_else(invalid, |value| flags(field, value)),
        PrintPolicy::Rational => Value::from_rational(bytes, endianness).map_or_else(invalid, |value| value.to_string()),
        PrintPolicy::Float => Value::from_float(bytes, endianness).map_or_else(invalid, |value| value.to_string()),
    })
}

/// Decodes the value stored into a variable by a field step.
pub fn stored_value(field: &FieldDefinition, bytes: &[u8], endianness: Endianness) -> Option<Value> {
    match field.print {
        PrintPolicy::Signed => Value::from_signed(bytes, endianness),
        PrintPolicy::Rational => Value::from_rational(bytes, endianness),
        PrintPolicy::Float => Value::from_float(bytes, endianness),
        _ => Value::from_unsigned(bytes, endianness),
    }
}
