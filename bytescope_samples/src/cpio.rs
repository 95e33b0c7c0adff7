//! Sample cpio archives.

use crate::Entry;
use bytescope::number::{self, Endianness, Radix};

/// The on-disk header formats of cpio archives.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Variant {
    BinaryLittleEndian,
    BinaryBigEndian,
    /// The portable format, with octal ASCII numbers.
    OldAscii,
    /// The SVR4 format, with hexadecimal ASCII numbers.
    NewAscii,
    /// The SVR4 format with a checksum of the contents of each file.
    NewAsciiCrc,
}

impl Variant {
    pub const ALL: [Variant; 5] = [
        Self::BinaryLittleEndian,
        Self::BinaryBigEndian,
        Self::OldAscii,
        Self::NewAscii,
        Self::NewAsciiCrc,
    ];

    pub fn header_length(self) -> usize {
        match self {
            Self::BinaryLittleEndian | Self::BinaryBigEndian => 26,
            Self::OldAscii => 76,
            Self::NewAscii | Self::NewAsciiCrc => 110,
        }
    }
}

/// Name of the entry that ends every archive.
pub const TRAILER: &str = "TRAILER!!!";

/// Builds an archive containing the entries, followed by the trailer entry.
///
/// # Examples
///
/// ```
/// use bytescope_samples::{cpio, Entry};
///
/// let archive = cpio::archive(cpio::Variant::OldAscii, &[Entry::file("a.txt", "abc")]);
/// assert!(archive.starts_with(b"070707"));
/// ```
pub fn archive(variant: Variant, entries: &[Entry]) -> Vec<u8> {
    let mut buffer = Vec::new();
    for entry in entries {
        write_entry(&mut buffer, variant, entry);
    }

    let trailer = Entry {
        mode: 0,
        uid: 0,
        gid: 0,
        inode: 0,
        nlink: 1,
        mtime: 0,
        ..Entry::file(TRAILER, Vec::new())
    };

    write_entry(&mut buffer, variant, &trailer);
    buffer
}

fn ascii(buffer: &mut Vec<u8>, value: u64, width: usize, radix: Radix) {
    let digits = number::encode_ascii(value, width, radix).unwrap_or_else(|| vec![b'0'; width]);
    buffer.extend_from_slice(&digits);
}

fn write_entry(buffer: &mut Vec<u8>, variant: Variant, entry: &Entry) {
    let name_size = entry.name.len() + 1;
    let file_size = entry.contents.len();

    match variant {
        Variant::BinaryLittleEndian | Variant::BinaryBigEndian => {
            let endianness = if variant == Variant::BinaryLittleEndian {
                Endianness::Little
            } else {
                Endianness::Big
            };

            let mut half = |value: u32| {
                let value = value as u16;
                buffer.extend_from_slice(&match endianness {
                    Endianness::Little => value.to_le_bytes(),
                    Endianness::Big => value.to_be_bytes(),
                });
            };

            half(0o070707);
            half(0);
            half(entry.inode);
            half(entry.mode);
            half(entry.uid);
            half(entry.gid);
            half(entry.nlink);
            half(0);
            // Four byte values are stored as two halves, most significant first.
            half((entry.mtime >> 16) as u32);
            half(entry.mtime as u32);
            half(name_size as u32);
            half((file_size >> 16) as u32);
            half(file_size as u32);

            buffer.extend_from_slice(entry.name.as_bytes());
            buffer.push(0);
            if name_size % 2 != 0 {
                buffer.push(0);
            }

            buffer.extend_from_slice(&entry.contents);
            if file_size % 2 != 0 {
                buffer.push(0);
            }
        }
        Variant::OldAscii => {
            buffer.extend_from_slice(b"070707");
            for value in [0, entry.inode, entry.mode, entry.uid, entry.gid, entry.nlink, 0] {
                ascii(buffer, u64::from(value), 6, Radix::Octal);
            }
            ascii(buffer, entry.mtime, 11, Radix::Octal);
            ascii(buffer, name_size as u64, 6, Radix::Octal);
            ascii(buffer, file_size as u64, 11, Radix::Octal);
            buffer.extend_from_slice(entry.name.as_bytes());
            buffer.push(0);
            buffer.extend_from_slice(&entry.contents);
        }
        Variant::NewAscii | Variant::NewAsciiCrc => {
            let (magic, check) = if variant == Variant::NewAscii {
                (b"070701", 0)
            } else {
                (b"070702", checksum(&entry.contents))
            };

            buffer.extend_from_slice(magic);
            for value in [
                u64::from(entry.inode),
                u64::from(entry.mode),
                u64::from(entry.uid),
                u64::from(entry.gid),
                u64::from(entry.nlink),
                entry.mtime,
                file_size as u64,
                0,
                0,
                0,
                0,
                name_size as u64,
                u64::from(check),
            ] {
                ascii(buffer, value, 8, Radix::Hexadecimal);
            }

            buffer.extend_from_slice(entry.name.as_bytes());
            buffer.push(0);
            let remainder = (name_size + 110) % 4;
            if remainder != 0 {
                buffer.resize(buffer.len() + 4 - remainder, 0);
            }

            buffer.extend_from_slice(&entry.contents);
            buffer.resize(buffer.len() + (4 - file_size % 4) % 4, 0);
        }
    }
}

/// The checksum used by the SVR4 CRC format, a plain sum of the bytes of the file.
pub fn checksum(contents: &[u8]) -> u32 {
    contents.iter().fold(0u32, |sum, &byte| sum.wrapping_add(u32::from(byte)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_aligned() {
        let entries = [Entry::file("abc", "hello")];
        for variant in [Variant::NewAscii, Variant::NewAsciiCrc] {
            let archive = archive(variant, &entries);
            assert_eq!(archive.len() % 4, 0);
        }

        let archive = archive(Variant::BinaryBigEndian, &entries);
        assert_eq!(archive.len() % 2, 0);
        assert_eq!(&archive[..2], &[0x71, 0xC7]);
    }
}
