//! Data model of declarative format definitions.
//!
//! A [`FormatDefinition`] is the unvalidated form of a definition, as produced by deserializing its external
//! representation. Definitions are validated and compiled before they are used to walk a buffer.

use crate::identifier::Identifier;
use crate::number::Endianness;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct FormatDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub endianness: DefinitionEndianness,
    /// Alternative magic numbers, any of which identifies the format.
    #[serde(default)]
    pub magic: Vec<Magic>,
    #[serde(default)]
    pub colors: Vec<NamedColor>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub blocks: Vec<BlockDefinition>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Byte order used for fields that request endianness conversion.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionEndianness {
    Big,
    Little,
    /// Determined while walking: big endian when `variable` holds `big_endian_value`, little endian otherwise.
    Variable {
        variable: Identifier,
        big_endian_value: u64,
    },
}

impl From<Endianness> for DefinitionEndianness {
    fn from(endianness: Endianness) -> Self {
        match endianness {
            Endianness::Big => Self::Big,
            Endianness::Little => Self::Little,
        }
    }
}

/// Bytes expected at a fixed offset, written as hexadecimal digits.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct Magic {
    #[serde(default)]
    pub offset: usize,
    pub size: usize,
    pub value: String,
}

impl Magic {
    /// Decodes the expected bytes, returning `None` if the value is not made of pairs of hexadecimal digits.
    pub fn bytes(&self) -> Option<Vec<u8>> {
        decode_hex(&self.value)
    }
}

/// Decodes hexadecimal digits, ignoring whitespace between pairs.
pub fn decode_hex(text: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = text.bytes().filter(|byte| !byte.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return None;
    }

    digits
        .chunks(2)
        .map(|pair| {
            let high = char::from(pair[0]).to_digit(16)?;
            let low = char::from(pair[1]).to_digit(16)?;
            u8::try_from(high * 16 + low).ok()
        })
        .collect()
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct NamedColor {
    pub name: Identifier,
    /// Color in `#RRGGBB` form.
    pub value: String,
    #[serde(default)]
    pub background: bool,
}

/// How many bytes a field occupies.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SizePolicy {
    Fixed(usize),
    /// All bytes up to the end of the buffer.
    Remaining,
    /// The value of a previously read variable.
    Variable(Identifier),
    /// Everything up to and including the first occurrence of a terminator byte.
    Terminated(u8),
}

/// How the value of a field is rendered in its description line.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintPolicy {
    None,
    Unsigned,
    Signed,
    Hex,
    Text,
    /// Looks up the value in the field's option table.
    Options,
    /// Lists the meaning of every flag of the field's flag table that is set.
    Flags,
    Rational,
    Float,
    Literal(String),
}

impl Default for PrintPolicy {
    fn default() -> Self {
        Self::None
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    Ascii,
    Utf8,
    Latin1,
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self::Ascii
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct OptionEntry {
    pub value: u64,
    pub meaning: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct FlagEntry {
    pub mask: u64,
    pub meaning: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct FieldDefinition {
    pub name: Identifier,
    pub label: String,
    #[serde(default)]
    pub tooltip: Option<String>,
    pub color: Identifier,
    pub size: SizePolicy,
    #[serde(default)]
    pub print: PrintPolicy,
    #[serde(default)]
    pub encoding: TextEncoding,
    #[serde(default)]
    pub options: Vec<OptionEntry>,
    #[serde(default)]
    pub flags: Vec<FlagEntry>,
    /// Whether multi-byte values are read in the definition's byte order instead of as stored (big endian).
    #[serde(default)]
    pub convert_endianness: bool,
}

impl FieldDefinition {
    /// Gets the explicit tooltip, or generates one from the label and size.
    pub fn tooltip(&self) -> Cow<'_, str> {
        match (&self.tooltip, &self.size) {
            (Some(tooltip), _) => Cow::Borrowed(tooltip),
            (None, SizePolicy::Fixed(1)) => Cow::Owned(format!("{} (1 byte)", self.label)),
            (None, SizePolicy::Fixed(size)) => Cow::Owned(format!("{} ({} bytes)", self.label, size)),
            (None, _) => Cow::Borrowed(&self.label),
        }
    }

    pub fn option_meaning(&self, value: u64) -> Option<&str> {
        self.options
            .iter()
            .find(|entry| entry.value == value)
            .map(|entry| entry.meaning.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct BlockDefinition {
    pub name: Identifier,
    pub steps: Vec<Step>,
}

/// Either a literal integer or the name of a variable.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Operand {
    Literal(u64),
    Variable(Identifier),
}

crate::enum_case_from_impl!(Operand, Literal, u64);
crate::enum_case_from_impl!(Operand, Variable, Identifier);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// The variable is bound and has not failed.
    Defined,
    Equals,
    GreaterThan,
    /// Any of the bits of the operand are set in the variable.
    BitTest,
}

impl Condition {
    pub fn requires_operand(self) -> bool {
        !matches!(self, Self::Defined)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct FieldStep {
    pub field: Identifier,
    #[serde(default = "default_true")]
    pub print: bool,
    /// Variable that receives the value of the field.
    #[serde(default)]
    pub store: Option<Identifier>,
    #[serde(default)]
    pub tab: Option<String>,
    #[serde(default)]
    pub new_section: bool,
    /// Registers the bytes of the field as an embedded file.
    #[serde(default)]
    pub embed: bool,
    /// Uses the printed value as the navigation label of the range.
    #[serde(default)]
    pub navigation: bool,
}

impl FieldStep {
    pub fn new(field: Identifier) -> Self {
        Self {
            field,
            print: true,
            store: None,
            tab: None,
            new_section: false,
            embed: false,
            navigation: false,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct MatchStep {
    pub variable: Identifier,
    pub condition: Condition,
    #[serde(default)]
    pub operand: Option<Operand>,
    #[serde(default)]
    pub negate: bool,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct LoopUntil {
    pub variable: Identifier,
    pub equals: Operand,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct LoopStep {
    /// Stops the loop once the variable equals the operand, checked after each iteration.
    #[serde(default)]
    pub until: Option<LoopUntil>,
    /// Variable holding the number of bytes the loop may consume.
    #[serde(default)]
    pub limit: Option<Identifier>,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintValue {
    Literal(String),
    Variable(Identifier),
    Hex(Identifier),
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct PrintStep {
    pub label: String,
    pub value: PrintValue,
    #[serde(default)]
    pub tooltip: Option<String>,
    #[serde(default)]
    pub omit_if_undefined: bool,
    #[serde(default)]
    pub margin: u8,
    #[serde(default)]
    pub tab: Option<String>,
    #[serde(default)]
    pub new_section: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Set,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct ExecStep {
    pub variable: Identifier,
    pub operation: Operation,
    pub operand: Operand,
    #[serde(default)]
    pub signed: bool,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct BlockStep {
    pub block: Identifier,
}

/// A single step of a definition's program.
///
/// Loop and selection steps come in start/end pairs, which must be balanced within each step list.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    Field(FieldStep),
    Match(MatchStep),
    LoopStart(LoopStep),
    LoopEnd,
    SelectionStart,
    SelectionEnd,
    Print(PrintStep),
    Exec(ExecStep),
    Block(BlockStep),
}

crate::enum_case_from_impl!(Step, Field, FieldStep);
crate::enum_case_from_impl!(Step, Match, MatchStep);
crate::enum_case_from_impl!(Step, Print, PrintStep);
crate::enum_case_from_impl!(Step, Exec, ExecStep);

impl Step {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Field(_) => "field",
            Self::Match(_) => "match",
            Self::LoopStart(_) => "loop_start",
            Self::LoopEnd => "loop_end",
            Self::SelectionStart => "selection_start",
            Self::SelectionEnd => "selection_end",
            Self::Print(_) => "print",
            Self::Exec(_) => "exec",
            Self::Block(_) => "block",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(size: SizePolicy, tooltip: Option<&str>) -> FieldDefinition {
        FieldDefinition {
            name: Identifier::try_from("length").unwrap(),
            label: "Length".to_string(),
            tooltip: tooltip.map(str::to_string),
            color: Identifier::try_from("chunk").unwrap(),
            size,
            print: PrintPolicy::Unsigned,
            encoding: TextEncoding::Ascii,
            options: Vec::new(),
            flags: Vec::new(),
            convert_endianness: false,
        }
    }

    #[test]
    fn tooltips_are_generated_from_size() {
        assert_eq!(field(SizePolicy::Fixed(4), None).tooltip(), "Length (4 bytes)");
        assert_eq!(field(SizePolicy::Fixed(1), None).tooltip(), "Length (1 byte)");
        assert_eq!(field(SizePolicy::Remaining, None).tooltip(), "Length");
        assert_eq!(field(SizePolicy::Remaining, Some("Chunk length")).tooltip(), "Chunk length");
    }

    #[test]
    fn hex_values_decode() {
        assert_eq!(decode_hex("89 50 4e 47"), Some(vec![0x89, 0x50, 0x4E, 0x47]));
        assert_eq!(decode_hex("895"), None);
        assert_eq!(decode_hex("zz"), None);
    }
}
