//! Output of a walk: colored byte ranges, description lines, and embedded files.
//!
//! Both the hard-coded format walkers and the declarative interpreter write into an [`Annotations`] value, which is then
//! handed to whatever renders it.

use std::fmt::{Display, Formatter};

/// An RGB display color.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{0:?} is not a color, expected #RRGGBB")]
pub struct InvalidColor(String);

impl std::str::FromStr for Color {
    type Err = InvalidColor;

    fn from_str(text: &str) -> Result<Self, InvalidColor> {
        let invalid = || InvalidColor(text.to_string());
        let digits = text.strip_prefix('#').ok_or_else(invalid)?;
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(invalid());
        }

        let component = |index: usize| u8::from_str_radix(&digits[index..index + 2], 16).map_err(|_| invalid());
        Ok(Self::new(component(0)?, component(2)?, component(4)?))
    }
}

/// Colors shared by the built-in format walkers.
pub mod palette {
    use super::Color;

    pub const MAGIC: Color = Color::new(0xE0, 0x6C, 0x75);
    pub const FIELD_1: Color = Color::new(0x61, 0xAF, 0xEF);
    pub const FIELD_2: Color = Color::new(0x98, 0xC3, 0x79);
    pub const NAME: Color = Color::new(0xD1, 0x9A, 0x66);
    pub const CONTENT: Color = Color::new(0xC6, 0x78, 0xDD);
    pub const CHECKSUM: Color = Color::new(0xE5, 0xC0, 0x7B);
    pub const LABEL: Color = Color::new(0x56, 0xB6, 0xC2);
    pub const PADDING: Color = Color::new(0x5C, 0x63, 0x70);
    pub const ERROR: Color = Color::new(0xFF, 0x00, 0x00);

    /// Returns one of the two alternating field colors, used to tell adjacent fields (or table entries) apart.
    #[inline]
    pub fn alternating(index: usize) -> Color {
        if index % 2 == 0 {
            FIELD_1
        } else {
            FIELD_2
        }
    }
}

/// Text used for values outside of their expected domain.
pub const INVALID: &str = "INVALID";

/// A colored range of bytes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TaggedRange {
    pub offset: usize,
    pub length: usize,
    pub color: Color,
    /// Whether the color is applied to the background instead of the text.
    pub background: bool,
    pub label: String,
    /// Name under which the range is listed when navigating through the file.
    pub navigation_label: Option<String>,
    pub additional_color: Option<Color>,
}

impl TaggedRange {
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// A field/value pair shown in a description panel.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Line {
    pub field: String,
    pub value: String,
    pub tooltip: Option<String>,
    /// Indentation level.
    pub margin: u8,
    /// Whether the line starts a new section of the panel.
    pub new_section: bool,
}

impl Line {
    pub fn new<F: Into<String>, V: Into<String>>(field: F, value: V) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn with_tooltip<T: Into<String>>(mut self, tooltip: T) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub fn with_margin(mut self, margin: u8) -> Self {
        self.margin = margin;
        self
    }

    pub fn starting_section(mut self) -> Self {
        self.new_section = true;
        self
    }
}

/// A named description panel other than the main one.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Tab {
    pub name: String,
    pub lines: Vec<Line>,
}

/// A region of the input that contains a file of its own, which can be inspected separately.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EmbeddedFile {
    pub name: String,
    pub offset: usize,
    pub size: usize,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MarkerKind {
    /// The named structure was cut short by the end of the input.
    Incomplete(String),
    /// The bytes do not follow the expected structure.
    Unrecognized,
}

/// Explicit note that a walk could not account for the bytes starting at `offset`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Marker {
    pub offset: usize,
    pub length: usize,
    pub kind: MarkerKind,
}

impl Display for Marker {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match &self.kind {
            MarkerKind::Incomplete(what) => write!(f, "incomplete {} at offset {:#X}", what, self.offset),
            MarkerKind::Unrecognized => write!(f, "{} bytes of unrecognized data at offset {:#X}", self.length, self.offset),
        }
    }
}

/// Everything produced by a single walk over a buffer.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Annotations {
    ranges: Vec<TaggedRange>,
    lines: Vec<Line>,
    tabs: Vec<Tab>,
    embedded: Vec<EmbeddedFile>,
    markers: Vec<Marker>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn ranges(&self) -> &[TaggedRange] {
        &self.ranges
    }

    /// Lines of the main description panel.
    #[inline]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    #[inline]
    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn tab(&self, name: &str) -> Option<&Tab> {
        self.tabs.iter().find(|tab| tab.name == name)
    }

    #[inline]
    pub fn embedded_files(&self) -> &[EmbeddedFile] {
        &self.embedded
    }

    #[inline]
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Returns `true` if the walk accounted for all of the bytes it looked at.
    pub fn is_complete(&self) -> bool {
        self.markers.is_empty()
    }

    /// Tags a range of bytes, returning the new range so optional properties can be set.
    pub fn tag<L: Into<String>>(&mut self, offset: usize, length: usize, color: Color, label: L) -> &mut TaggedRange {
        self.ranges.push(TaggedRange {
            offset,
            length,
            color,
            background: false,
            label: label.into(),
            navigation_label: None,
            additional_color: None,
        });

        let index = self.ranges.len() - 1;
        &mut self.ranges[index]
    }

    /// Appends a line to the main description panel.
    pub fn describe(&mut self, line: Line) {
        self.lines.push(line);
    }

    /// Appends a line to the tab with the specified name, creating the tab if it does not yet exist.
    pub fn describe_in(&mut self, tab: &str, line: Line) {
        self.tab_lines(tab).push(line);
    }

    /// Appends a line either to the named tab, or to the main panel when no tab is given.
    pub fn describe_to(&mut self, tab: Option<&str>, line: Line) {
        match tab {
            Some(name) => self.describe_in(name, line),
            None => self.describe(line),
        }
    }

    fn tab_lines(&mut self, name: &str) -> &mut Vec<Line> {
        let index = match self.tabs.iter().position(|tab| tab.name == name) {
            Some(index) => index,
            None => {
                self.tabs.push(Tab {
                    name: name.to_string(),
                    lines: Vec::new(),
                });
                self.tabs.len() - 1
            }
        };

        &mut self.tabs[index].lines
    }

    pub fn embed<N: Into<String>>(&mut self, name: N, offset: usize, size: usize) {
        self.embedded.push(EmbeddedFile {
            name: name.into(),
            offset,
            size,
        });
    }

    /// Marks the bytes from `offset` up to `end` (usually the length of the buffer) as belonging to a structure that was
    /// cut short.
    pub fn mark_incomplete<W: Into<String>>(&mut self, what: W, offset: usize, end: usize) {
        let what = what.into();
        self.mark(offset, end, MarkerKind::Incomplete(what.clone()), format!("Incomplete {}", what));
    }

    /// Marks the bytes from `offset` up to `end` as unrecognized.
    pub fn mark_unrecognized(&mut self, offset: usize, end: usize) {
        self.mark(offset, end, MarkerKind::Unrecognized, "Unrecognized data".to_string());
    }

    fn mark(&mut self, offset: usize, end: usize, kind: MarkerKind, label: String) {
        let length = end.saturating_sub(offset);
        log::debug!("{} ({} bytes) at offset {:#X}", label, length, offset);
        if length > 0 {
            self.tag(offset, length, palette::ERROR, label.clone());
        }

        self.lines.push(Line::new(label, INVALID).starting_section());
        self.markers.push(Marker { offset, length, kind });
    }

    /// Sum of the lengths of every tagged range.
    pub fn tagged_length(&self) -> usize {
        self.ranges.iter().map(|range| range.length).sum()
    }
}
