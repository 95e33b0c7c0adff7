//! Sample UStar archives.

use crate::Entry;
use bytescope::number::{self, Radix};

pub const BLOCK_SIZE: usize = 512;

/// Offset of the checksum field within a header.
pub const CHECKSUM_OFFSET: usize = 148;

fn octal(header: &mut [u8], offset: usize, width: usize, value: u64) {
    // Numbers end with a NUL byte.
    let digits = number::encode_ascii(value, width - 1, Radix::Octal).unwrap_or_else(|| vec![b'0'; width - 1]);
    header[offset..offset + width - 1].copy_from_slice(&digits);
}

fn text(header: &mut [u8], offset: usize, width: usize, value: &str) {
    let length = value.len().min(width);
    header[offset..offset + length].copy_from_slice(&value.as_bytes()[..length]);
}

/// Computes the checksum of a header, treating the checksum field itself as spaces.
pub fn checksum(header: &[u8]) -> u32 {
    header
        .iter()
        .enumerate()
        .map(|(index, &byte)| {
            if (CHECKSUM_OFFSET..CHECKSUM_OFFSET + 8).contains(&index) {
                u32::from(b' ')
            } else {
                u32::from(byte)
            }
        })
        .sum()
}

/// Builds the header block of an entry.
pub fn header(entry: &Entry) -> [u8; BLOCK_SIZE] {
    let mut header = [0u8; BLOCK_SIZE];
    let is_directory = entry.mode & 0o170000 == 0o040000;

    text(&mut header, 0, 100, &entry.name);
    octal(&mut header, 100, 8, u64::from(entry.mode & 0o7777));
    octal(&mut header, 108, 8, u64::from(entry.uid));
    octal(&mut header, 116, 8, u64::from(entry.gid));
    octal(&mut header, 124, 12, entry.contents.len() as u64);
    octal(&mut header, 136, 12, entry.mtime);
    header[156] = if is_directory { b'5' } else { b'0' };
    header[257..263].copy_from_slice(b"ustar\0");
    header[263..265].copy_from_slice(b"00");
    text(&mut header, 265, 32, "user");
    text(&mut header, 297, 32, "group");

    let checksum = checksum(&header);
    octal(&mut header, CHECKSUM_OFFSET, 7, u64::from(checksum));
    header[CHECKSUM_OFFSET + 7] = b' ';
    header
}

/// Builds an archive containing the entries, ending with two zero blocks.
///
/// # Examples
///
/// ```
/// use bytescope_samples::{tar, Entry};
///
/// let archive = tar::archive(&[Entry::file("a.txt", vec![7; 600])]);
/// assert_eq!(archive.len(), 512 + 1024 + 1024);
/// assert_eq!(&archive[257..262], b"ustar");
/// ```
pub fn archive(entries: &[Entry]) -> Vec<u8> {
    let mut buffer = Vec::new();
    for entry in entries {
        buffer.extend_from_slice(&header(entry));
        buffer.extend_from_slice(&entry.contents);
        let padding = (BLOCK_SIZE - entry.contents.len() % BLOCK_SIZE) % BLOCK_SIZE;
        buffer.resize(buffer.len() + padding, 0);
    }

    buffer.resize(buffer.len() + 2 * BLOCK_SIZE, 0);
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_checksum_is_consistent() {
        let header = header(&Entry::file("hello.txt", "hi"));
        let stored = number::parse_ascii(&header[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 8], Radix::Octal).unwrap();
        assert_eq!(stored, u64::from(checksum(&header)));
    }
}
