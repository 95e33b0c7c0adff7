//! Helpers for printing raw bytes.

use std::fmt::Write;

/// Formats a byte slice as a list of hexadecimal values.
#[repr(transparent)]
pub struct ByteDebug<'a>(&'a [u8]);

impl<'a> From<&'a [u8]> for ByteDebug<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self(bytes)
    }
}

impl<'a, const L: usize> From<&'a [u8; L]> for ByteDebug<'a> {
    fn from(bytes: &'a [u8; L]) -> Self {
        Self(bytes.as_slice())
    }
}

impl<'a> From<&'a Vec<u8>> for ByteDebug<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Self(bytes.as_slice())
    }
}

impl std::fmt::Debug for ByteDebug<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_char('[')?;
        for (index, value) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_char(',')?;
            }

            write!(f, "{:#04X}", value)?;
        }
        f.write_char(']')
    }
}

impl std::fmt::Display for ByteDebug<'_> {
    /// Writes the bytes as space separated pairs of hexadecimal digits.
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (index, value) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_char(' ')?;
            }

            write!(f, "{:02X}", value)?;
        }
        Ok(())
    }
}

/// Writes a classic hex dump of `bytes`, with offsets starting at `base_offset`.
pub fn hex_dump<W: std::fmt::Write>(bytes: &[u8], base_offset: usize, out: &mut W) -> std::fmt::Result {
    //00 00 00 00 00 00 00 00  00 00 00 00 00 00 00 00  ........ ........
    const HEX_LENGTH: usize = 48;
    const ASCII_LENGTH: usize = 17;

    let mut offset = base_offset;
    let mut hex_buffer = String::with_capacity(HEX_LENGTH);
    let mut ascii_buffer = String::with_capacity(ASCII_LENGTH);

    for line in bytes.chunks(16) {
        hex_buffer.clear();
        ascii_buffer.clear();

        for (index, value) in line.iter().copied().enumerate() {
            if index > 0 {
                hex_buffer.push(' ');
            }

            if index == 8 {
                hex_buffer.push(' ');
                ascii_buffer.push(' ');
            }

            write!(&mut hex_buffer, "{:02X}", value)?;

            ascii_buffer.push(if value.is_ascii_graphic() { value as char } else { '.' });
        }

        for _ in hex_buffer.len()..HEX_LENGTH {
            hex_buffer.push(' ');
        }

        write!(out, "{:08X} ", offset)?;
        out.write_str(&hex_buffer)?;
        out.write_str("  ")?;
        out.write_str(&ascii_buffer)?;
        out.write_char('\n')?;

        offset += line.len();
    }

    Ok(())
}
