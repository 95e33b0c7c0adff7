//! Hard-coded walkers for formats whose structure is easier to express as code than as a definition.
//!
//! Walkers never fail. A read that runs past the end of the buffer marks the structure being read as incomplete and
//! stops the walk, keeping everything annotated so far.

pub mod cpio;
pub mod gif;
pub mod mode;
pub mod tar;
pub mod tiff;

use bytescope::annotation::{palette, Color, Line, INVALID};
use bytescope::binary::Reader;
use bytescope::Annotations;

/// Indicates that a walker could not continue, the reason having already been recorded as a marker.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Stopped;

pub(crate) type Result<T> = std::result::Result<T, Stopped>;

pub(crate) struct Walker<'b> {
    pub(crate) reader: Reader<'b>,
    pub(crate) annotations: Annotations,
}

impl<'b> Walker<'b> {
    pub(crate) fn new(bytes: &'b [u8], format: &str) -> Self {
        log::debug!("walking {} bytes as {}", bytes.len(), format);
        let mut annotations = Annotations::new();
        annotations.describe(Line::new("Format", format));
        Self {
            reader: Reader::new(bytes),
            annotations,
        }
    }

    #[inline]
    pub(crate) fn offset(&self) -> usize {
        self.reader.offset()
    }

    /// Reads the next `length` bytes without tagging them, returning their offset alongside them.
    ///
    /// When not enough bytes remain, everything from the cursor onwards is marked as an incomplete `what`.
    pub(crate) fn take(&mut self, length: usize, what: &str) -> Result<(usize, &'b [u8])> {
        let offset = self.reader.offset();
        match self.reader.read(length) {
            Ok(bytes) => Ok((offset, bytes)),
            Err(error) => {
                log::debug!("{}: {}", what, error);
                self.annotations.mark_incomplete(what, offset, self.reader.len());
                Err(Stopped)
            }
        }
    }

    /// Reads and tags the next `length` bytes.
    pub(crate) fn field(&mut self, length: usize, color: Color, label: &str, what: &str) -> Result<&'b [u8]> {
        let (offset, bytes) = self.take(length, what)?;
        if length > 0 {
            self.annotations.tag(offset, length, color, label);
        }
        Ok(bytes)
    }

    /// Tags padding bytes, which are expected to be present.
    pub(crate) fn padding(&mut self, length: usize, what: &str) -> Result<()> {
        self.field(length, palette::PADDING, "Padding", what).map(|_| ())
    }

    /// Tags everything left in the buffer as padding.
    pub(crate) fn trailing_padding(&mut self) {
        let offset = self.reader.offset();
        let length = self.reader.read_remaining().len();
        if length > 0 {
            self.annotations.tag(offset, length, palette::PADDING, "Trailing padding");
        }
    }

    /// Marks everything left in the buffer as unrecognized.
    pub(crate) fn unrecognized(&mut self) {
        let offset = self.reader.offset();
        self.reader.read_remaining();
        self.annotations.mark_unrecognized(offset, self.reader.len());
    }

    pub(crate) fn describe(&mut self, tab: Option<&str>, line: Line) {
        self.annotations.describe_to(tab, line);
    }

    pub(crate) fn finish(self) -> Annotations {
        log::debug!(
            "walk stopped at offset {:#X} with {} markers",
            self.reader.offset(),
            self.annotations.markers().len()
        );
        self.annotations
    }
}

/// Renders seconds since the Unix epoch as a UTC date.
pub(crate) fn timestamp(seconds: u64) -> String {
    i64::try_from(seconds)
        .ok()
        .and_then(|seconds| chrono::DateTime::from_timestamp(seconds, 0))
        .map_or_else(|| INVALID.to_string(), |time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

/// Renders text stored in a fixed-size field, which ends at the first NUL byte.
pub(crate) fn text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&byte| byte == 0).unwrap_or(bytes.len());
    std::str::from_utf8(&bytes[..end]).map_or_else(|_| INVALID.to_string(), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_rendered_in_utc() {
        assert_eq!(timestamp(0), "1970-01-01 00:00:00 UTC");
        assert_eq!(timestamp(1_600_000_000), "2020-09-13 12:26:40 UTC");
        assert_eq!(timestamp(u64::MAX), INVALID);
    }

    #[test]
    fn text_stops_at_nul() {
        assert_eq!(text(b"abc\0def"), "abc");
        assert_eq!(text(b"abc"), "abc");
        assert_eq!(text(&[0xFF, 0]), INVALID);
    }

    #[test]
    fn short_reads_are_marked() {
        let mut walker = Walker::new(&[1, 2, 3], "Test");
        assert!(walker.field(2, palette::FIELD_1, "A", "header").is_ok());
        assert_eq!(walker.field(2, palette::FIELD_1, "B", "header"), Err(Stopped));
        let annotations = walker.finish();
        assert_eq!(annotations.markers().len(), 1);
        assert_eq!(annotations.markers()[0].offset, 2);
        assert_eq!(annotations.tagged_length(), 3);
    }
}
