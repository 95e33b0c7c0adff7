//! Walker for tar archives, including the UStar header extensions.

use crate::walker::{self, mode, Result, Stopped, Walker};
use bytescope::annotation::{palette, Line, INVALID};
use bytescope::number::{self, Radix};
use bytescope::Annotations;

pub const BLOCK_SIZE: usize = 512;

const MAGIC_OFFSET: usize = 257;
const CHECKSUM_OFFSET: usize = 148;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Kind {
    Text,
    Octal,
    Mode,
    Size,
    Time,
    Checksum,
    TypeFlag,
    Magic,
    Padding,
}

struct HeaderField {
    label: &'static str,
    width: usize,
    kind: Kind,
    /// Whether the field is only meaningful in UStar headers.
    ustar: bool,
}

const fn field(label: &'static str, width: usize, kind: Kind, ustar: bool) -> HeaderField {
    HeaderField {
        label,
        width,
        kind,
        ustar,
    }
}

const HEADER: &[HeaderField] = &[
    field("File name", 100, Kind::Text, false),
    field("Mode", 8, Kind::Mode, false),
    field("User ID", 8, Kind::Octal, false),
    field("Group ID", 8, Kind::Octal, false),
    field("File size", 12, Kind::Size, false),
    field("Modification time", 12, Kind::Time, false),
    field("Checksum", 8, Kind::Checksum, false),
    field("Type", 1, Kind::TypeFlag, false),
    field("Link name", 100, Kind::Text, false),
    field("UStar identifier", 6, Kind::Magic, true),
    field("UStar version", 2, Kind::Text, true),
    field("Owner name", 32, Kind::Text, true),
    field("Group name", 32, Kind::Text, true),
    field("Device major", 8, Kind::Octal, true),
    field("Device minor", 8, Kind::Octal, true),
    field("File name prefix", 155, Kind::Text, true),
    field("Header padding", 12, Kind::Padding, false),
];

/// Returns `true` if the buffer starts with a UStar header.
pub fn identify(bytes: &[u8]) -> bool {
    bytes.get(MAGIC_OFFSET..MAGIC_OFFSET + 5) == Some(b"ustar")
}

fn type_name(flag: u8) -> &'static str {
    match flag {
        b'0' | 0 => "Regular file",
        b'1' => "Hard link",
        b'2' => "Symbolic link",
        b'3' => "Character device",
        b'4' => "Block device",
        b'5' => "Directory",
        b'6' => "FIFO",
        b'7' => "Contiguous file",
        b'L' => "GNU long name",
        b'K' => "GNU long link name",
        b'x' => "pax extended header",
        b'g' => "pax global header",
        _ => INVALID,
    }
}

/// Decodes a size, which GNU tar stores in base-256 when the high bit of its first byte is set.
fn size(field: &[u8]) -> Option<u64> {
    match field.first() {
        Some(first) if first & 0x80 != 0 => field[1..]
            .iter()
            .try_fold(u64::from(first & 0x7F), |size, &byte| size.checked_mul(256).map(|size| size | u64::from(byte))),
        _ => number::parse_ascii(field, Radix::Octal).ok(),
    }
}

/// Sums the bytes of a header, with the checksum field counted as spaces.
fn checksum(header: &[u8]) -> u64 {
    header
        .iter()
        .enumerate()
        .map(|(index, &byte)| {
            if (CHECKSUM_OFFSET..CHECKSUM_OFFSET + 8).contains(&index) {
                u64::from(b' ')
            } else {
                u64::from(byte)
            }
        })
        .sum()
}

enum Block {
    Entry,
    End,
}

/// Walks header blocks and their contents until the zero block marking the end of the archive.
pub fn walk(bytes: &[u8]) -> Annotations {
    let mut walker = Walker::new(bytes, "tar");
    let mut count = 0usize;

    loop {
        match block(&mut walker) {
            Ok(Block::Entry) => count += 1,
            Ok(Block::End) => {
                walker.trailing_padding();
                break;
            }
            Err(Stopped) => break,
        }
    }

    walker.describe(None, Line::new("Entries", count.to_string()).starting_section());
    walker.finish()
}

fn block(walker: &mut Walker) -> Result<Block> {
    let start = walker.offset();
    let header = match walker.reader.peek(BLOCK_SIZE) {
        Ok(header) => header,
        Err(_) => {
            walker.take(BLOCK_SIZE, "tar header")?;
            return Err(Stopped);
        }
    };

    if header.iter().all(|&byte| byte == 0) {
        walker.field(BLOCK_SIZE, palette::PADDING, "End of archive", "tar header")?;
        walker.describe(None, Line::new("End of archive", format!("{:#X}", start)).starting_section());
        return Ok(Block::End);
    }

    let is_ustar = identify(header);
    let mut lines = Vec::new();
    let mut name = String::new();
    let mut prefix = String::new();
    let mut type_flag = 0u8;
    let mut file_size = None;

    for (index, field) in HEADER.iter().enumerate() {
        let color = match field.kind {
            Kind::Magic => palette::MAGIC,
            Kind::Checksum => palette::CHECKSUM,
            Kind::Padding => palette::PADDING,
            _ => palette::alternating(index),
        };

        let bytes = walker.field(field.width, color, field.label, "tar header")?;
        if field.ustar && !is_ustar {
            continue;
        }

        let rendered = match field.kind {
            Kind::Text | Kind::Magic => walker::text(bytes),
            Kind::Octal => number::parse_ascii(bytes, Radix::Octal).map_or_else(|_| INVALID.to_string(), |value| value.to_string()),
            Kind::Mode => number::parse_ascii(bytes, Radix::Octal).map_or_else(
                |_| INVALID.to_string(),
                |value| format!("{:04o} ({})", value & 0o7777, mode::Permissions::from_mode(value as u32)),
            ),
            Kind::Size => {
                file_size = size(bytes);
                file_size.map_or_else(|| INVALID.to_string(), |size| size.to_string())
            }
            Kind::Time => number::parse_ascii(bytes, Radix::Octal).map_or_else(|_| INVALID.to_string(), walker::timestamp),
            Kind::Checksum => {
                let computed = checksum(header);
                match number::parse_ascii(bytes, Radix::Octal) {
                    Ok(stored) if stored == computed => format!("{:o} (valid)", stored),
                    Ok(stored) => format!("{:o} (expected {:o})", stored, computed),
                    Err(_) => INVALID.to_string(),
                }
            }
            Kind::TypeFlag => {
                type_flag = bytes[0];
                type_name(type_flag).to_string()
            }
            Kind::Padding => continue,
        };

        match field.label {
            "File name" => name = rendered.clone(),
            "File name prefix" => prefix = rendered.clone(),
            _ => (),
        }

        if !rendered.is_empty() {
            lines.push(Line::new(field.label, rendered).with_margin(1));
        }
    }

    let full_name = if prefix.is_empty() {
        name
    } else {
        format!("{}/{}", prefix, name)
    };

    walker.describe(None, Line::new("Entry", full_name.as_str()).starting_section());
    for line in lines {
        walker.describe(None, line);
    }

    let file_size = match file_size.and_then(|size| usize::try_from(size).ok()) {
        Some(file_size) => file_size,
        None => {
            log::debug!("tar entry at offset {:#X} has an invalid size", start);
            walker.unrecognized();
            return Err(Stopped);
        }
    };

    let (offset, _) = walker.take(file_size, "file contents")?;
    if file_size > 0 {
        walker.annotations.tag(offset, file_size, palette::CONTENT, "File contents").navigation_label = Some(full_name.clone());
        if matches!(type_flag, b'0' | 0 | b'7') {
            walker.annotations.embed(full_name, offset, file_size);
        }
    }

    walker.padding((BLOCK_SIZE - file_size % BLOCK_SIZE) % BLOCK_SIZE, "file contents padding")?;
    Ok(Block::Entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_fields_fill_a_block() {
        assert_eq!(HEADER.iter().map(|field| field.width).sum::<usize>(), BLOCK_SIZE);
    }

    #[test]
    fn sizes_may_be_base_256() {
        assert_eq!(size(b"00000001750\0"), Some(1000));
        assert_eq!(size(&[0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x10, 0x00]), Some(4096));
        assert_eq!(size(&[0xFF; 12]), None);
        assert_eq!(size(b"           \0"), None);
    }

    #[test]
    fn zero_block_ends_archive() {
        let mut archive = vec![0u8; 2 * BLOCK_SIZE];
        archive.extend_from_slice(&[0xAB; 3]);
        let annotations = walk(&archive);
        assert!(annotations.is_complete());
        assert_eq!(annotations.ranges().len(), 2);
        assert_eq!(annotations.tagged_length(), archive.len());
    }
}
