//! Bounds-checked access to the bytes being inspected.

mod debug;

pub use debug::{hex_dump, ByteDebug};

/// Error used when a read would go past the end of the buffer.
///
/// Reads that fail with this error never move the cursor of a [`Reader`].
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("expected {requested} bytes at offset {offset:#X}, but only {available} remain")]
pub struct InsufficientData {
    offset: usize,
    requested: usize,
    available: usize,
}

impl InsufficientData {
    pub(crate) fn new(offset: usize, requested: usize, buffer_length: usize) -> Self {
        Self {
            offset,
            requested,
            available: buffer_length.saturating_sub(offset),
        }
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn requested(&self) -> usize {
        self.requested
    }

    #[inline]
    pub fn available(&self) -> usize {
        self.available
    }
}

pub type Result<T> = std::result::Result<T, InsufficientData>;

/// Reads `length` bytes starting at an absolute `offset`.
pub fn read(bytes: &[u8], offset: usize, length: usize) -> Result<&[u8]> {
    match offset.checked_add(length) {
        Some(end) if end <= bytes.len() => Ok(&bytes[offset..end]),
        _ => Err(InsufficientData::new(offset, length, bytes.len())),
    }
}

/// A cursor over an immutable byte buffer.
///
/// The cursor only moves forward during a walk. Values stored elsewhere in the buffer (such as TIFF values referenced by
/// an offset) are read with [`Reader::read_at`], which leaves the cursor untouched.
#[derive(Clone, Copy)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    #[inline]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Creates a reader whose cursor starts at `offset`, clamped to the end of the buffer.
    pub fn with_offset(bytes: &'a [u8], offset: usize) -> Self {
        Self {
            bytes,
            offset: offset.min(bytes.len()),
        }
    }

    #[inline]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.offset >= self.bytes.len()
    }

    /// Returns the next `length` bytes without advancing.
    pub fn peek(&self, length: usize) -> Result<&'a [u8]> {
        read(self.bytes, self.offset, length)
    }

    /// Reads the next `length` bytes, advancing the cursor past them.
    pub fn read(&mut self, length: usize) -> Result<&'a [u8]> {
        let bytes = self.peek(length)?;
        self.offset += length;
        Ok(bytes)
    }

    /// Reads bytes at an absolute offset, without moving the cursor.
    #[inline]
    pub fn read_at(&self, offset: usize, length: usize) -> Result<&'a [u8]> {
        read(self.bytes, offset, length)
    }

    /// Reads everything up to the end of the buffer.
    pub fn read_remaining(&mut self) -> &'a [u8] {
        let bytes = &self.bytes[self.offset..];
        self.offset = self.bytes.len();
        bytes
    }

    /// Scans forward from the cursor for the first byte equal to `target`, returning its distance from the cursor.
    ///
    /// Returns `None` when no such byte exists before the end of the buffer. The cursor is not moved.
    pub fn advance_to(&self, target: u8) -> Option<usize> {
        self.bytes[self.offset..].iter().position(|&byte| byte == target)
    }
}

impl std::fmt::Debug for Reader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("offset", &self.offset)
            .field("length", &self.bytes.len())
            .finish()
    }
}
