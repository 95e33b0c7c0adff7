//! Walker for cpio archives, in any of their five header formats.

use crate::walker::{self, mode, Result, Stopped, Walker};
use bytescope::annotation::{palette, Line, INVALID};
use bytescope::number::{self, Endianness, Radix};
use bytescope::Annotations;

/// The on-disk header formats of cpio archives.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
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

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum HeaderField {
    Magic,
    Device,
    Inode,
    Mode,
    UserId,
    GroupId,
    LinkCount,
    SpecialDevice,
    ModificationTime,
    NameSize,
    FileSize,
    DeviceMajor,
    DeviceMinor,
    SpecialDeviceMajor,
    SpecialDeviceMinor,
    Check,
}

impl HeaderField {
    fn label(self) -> &'static str {
        match self {
            Self::Magic => "Magic",
            Self::Device => "Device",
            Self::Inode => "Inode",
            Self::Mode => "Mode",
            Self::UserId => "User ID",
            Self::GroupId => "Group ID",
            Self::LinkCount => "Link count",
            Self::SpecialDevice => "Special device",
            Self::ModificationTime => "Modification time",
            Self::NameSize => "Name size",
            Self::FileSize => "File size",
            Self::DeviceMajor => "Device major",
            Self::DeviceMinor => "Device minor",
            Self::SpecialDeviceMajor => "Special device major",
            Self::SpecialDeviceMinor => "Special device minor",
            Self::Check => "Checksum",
        }
    }
}

const BINARY_HEADER: &[(HeaderField, usize)] = &[
    (HeaderField::Magic, 2),
    (HeaderField::Device, 2),
    (HeaderField::Inode, 2),
    (HeaderField::Mode, 2),
    (HeaderField::UserId, 2),
    (HeaderField::GroupId, 2),
    (HeaderField::LinkCount, 2),
    (HeaderField::SpecialDevice, 2),
    (HeaderField::ModificationTime, 4),
    (HeaderField::NameSize, 2),
    (HeaderField::FileSize, 4),
];

const OLD_ASCII_HEADER: &[(HeaderField, usize)] = &[
    (HeaderField::Magic, 6),
    (HeaderField::Device, 6),
    (HeaderField::Inode, 6),
    (HeaderField::Mode, 6),
    (HeaderField::UserId, 6),
    (HeaderField::GroupId, 6),
    (HeaderField::LinkCount, 6),
    (HeaderField::SpecialDevice, 6),
    (HeaderField::ModificationTime, 11),
    (HeaderField::NameSize, 6),
    (HeaderField::FileSize, 11),
];

const NEW_ASCII_HEADER: &[(HeaderField, usize)] = &[
    (HeaderField::Magic, 6),
    (HeaderField::Inode, 8),
    (HeaderField::Mode, 8),
    (HeaderField::UserId, 8),
    (HeaderField::GroupId, 8),
    (HeaderField::LinkCount, 8),
    (HeaderField::ModificationTime, 8),
    (HeaderField::FileSize, 8),
    (HeaderField::DeviceMajor, 8),
    (HeaderField::DeviceMinor, 8),
    (HeaderField::SpecialDeviceMajor, 8),
    (HeaderField::SpecialDeviceMinor, 8),
    (HeaderField::NameSize, 8),
    (HeaderField::Check, 8),
];

/// Name of the entry that ends every archive.
pub const TRAILER: &[u8] = b"TRAILER!!!";

impl Variant {
    pub const ALL: [Variant; 5] = [
        Self::BinaryLittleEndian,
        Self::BinaryBigEndian,
        Self::OldAscii,
        Self::NewAscii,
        Self::NewAsciiCrc,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::BinaryLittleEndian => "cpio (binary, little endian)",
            Self::BinaryBigEndian => "cpio (binary, big endian)",
            Self::OldAscii => "cpio (old ASCII)",
            Self::NewAscii => "cpio (new ASCII)",
            Self::NewAsciiCrc => "cpio (new ASCII with checksum)",
        }
    }

    pub fn magic(self) -> &'static [u8] {
        match self {
            Self::BinaryLittleEndian => &[0xC7, 0x71],
            Self::BinaryBigEndian => &[0x71, 0xC7],
            Self::OldAscii => b"070707",
            Self::NewAscii => b"070701",
            Self::NewAsciiCrc => b"070702",
        }
    }

    /// Finds the variant whose magic number starts the buffer.
    pub fn identify(bytes: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|variant| bytes.starts_with(variant.magic()))
    }

    fn header(self) -> &'static [(HeaderField, usize)] {
        match self {
            Self::BinaryLittleEndian | Self::BinaryBigEndian => BINARY_HEADER,
            Self::OldAscii => OLD_ASCII_HEADER,
            Self::NewAscii | Self::NewAsciiCrc => NEW_ASCII_HEADER,
        }
    }

    /// Length of the fixed part of an entry header.
    pub fn header_length(self) -> usize {
        self.header().iter().map(|(_, width)| width).sum()
    }

    fn decode(self, bytes: &[u8]) -> Option<u64> {
        let endianness = match self {
            Self::BinaryLittleEndian => Endianness::Little,
            Self::BinaryBigEndian => Endianness::Big,
            Self::OldAscii => return number::parse_ascii(bytes, Radix::Octal).ok(),
            Self::NewAscii | Self::NewAsciiCrc => return number::parse_ascii(bytes, Radix::Hexadecimal).ok(),
        };

        // Four byte values are stored as two halves, the most significant half first.
        match bytes.len() {
            4 => {
                let high = number::decode_unsigned(&bytes[..2], endianness)?;
                let low = number::decode_unsigned(&bytes[2..], endianness)?;
                Some(high << 16 | low)
            }
            _ => number::decode_unsigned(bytes, endianness),
        }
    }

    fn name_padding(self, name_size: usize) -> usize {
        match self {
            Self::BinaryLittleEndian | Self::BinaryBigEndian => name_size % 2,
            Self::OldAscii => 0,
            Self::NewAscii | Self::NewAsciiCrc => {
                let remainder = (name_size + 110) % 4;
                if remainder != 0 {
                    4 - remainder
                } else {
                    0
                }
            }
        }
    }

    fn data_padding(self, file_size: usize) -> usize {
        match self {
            Self::BinaryLittleEndian | Self::BinaryBigEndian => file_size % 2,
            Self::OldAscii => 0,
            Self::NewAscii | Self::NewAsciiCrc => (4 - file_size % 4) % 4,
        }
    }
}

enum Entry {
    File,
    Trailer,
}

/// Walks every entry of an archive up to and including the trailer entry, tagging anything after it as padding.
pub fn walk(bytes: &[u8], variant: Variant) -> Annotations {
    let mut walker = Walker::new(bytes, variant.name());
    let mut count = 0usize;

    loop {
        match entry(&mut walker, variant) {
            Ok(Entry::File) => count += 1,
            Ok(Entry::Trailer) => {
                walker.trailing_padding();
                break;
            }
            Err(Stopped) => break,
        }
    }

    walker.describe(None, Line::new("Entries", count.to_string()).starting_section());
    walker.finish()
}

fn entry(walker: &mut Walker, variant: Variant) -> Result<Entry> {
    let start = walker.offset();
    match walker.reader.peek(variant.magic().len()) {
        Ok(magic) if magic == variant.magic() => (),
        Ok(_) => {
            log::debug!("expected cpio header at offset {:#X}", start);
            walker.unrecognized();
            return Err(Stopped);
        }
        Err(_) => {
            walker.take(variant.magic().len(), "cpio header")?;
        }
    }

    let mut lines = Vec::new();
    let mut name_size = None;
    let mut file_size = None;
    let mut check = None;

    for (index, &(field, width)) in variant.header().iter().enumerate() {
        let color = if field == HeaderField::Magic {
            palette::MAGIC
        } else {
            palette::alternating(index)
        };

        let bytes = walker.field(width, color, field.label(), "cpio header")?;
        if field == HeaderField::Magic {
            continue;
        }

        let value = variant.decode(bytes);
        let rendered = match (field, value) {
            (_, None) => INVALID.to_string(),
            (HeaderField::Mode, Some(value)) => mode::describe(value as u32),
            (HeaderField::ModificationTime, Some(value)) => walker::timestamp(value),
            (HeaderField::Check, Some(value)) if variant == Variant::NewAsciiCrc => format!("{:#010X}", value),
            (_, Some(value)) => value.to_string(),
        };

        match field {
            HeaderField::NameSize => name_size = value,
            HeaderField::FileSize => file_size = value,
            HeaderField::Check => check = value,
            _ => (),
        }

        lines.push(Line::new(field.label(), rendered).with_margin(1));
    }

    let (name_size, file_size) = match (name_size, file_size) {
        (Some(name_size), Some(file_size)) => (name_size as usize, file_size as usize),
        _ => {
            log::debug!("cpio entry at offset {:#X} has an invalid size", start);
            walker.describe(None, Line::new("Entry", INVALID).starting_section());
            walker.unrecognized();
            return Err(Stopped);
        }
    };

    let (name_offset, name) = walker.take(name_size, "file name")?;
    // The trailer is the empty entry named TRAILER!!!.
    let is_trailer = name.strip_suffix(&[0]).unwrap_or(name) == TRAILER;
    let name = walker::text(name);
    if name_size > 0 {
        walker.annotations.tag(name_offset, name_size, palette::NAME, "File name").navigation_label = Some(name.clone());
    }

    walker.describe(None, Line::new("Entry", name.as_str()).starting_section());
    for line in lines {
        walker.describe(None, line);
    }

    walker.padding(variant.name_padding(name_size), "file name padding")?;
    if is_trailer {
        if file_size == 0 {
            return Ok(Entry::Trailer);
        }
        log::debug!("entry at offset {:#X} is named like the trailer but has contents", start);
    }

    let (data_offset, contents) = walker.take(file_size, "file contents")?;
    if file_size > 0 {
        walker.annotations.tag(data_offset, file_size, palette::CONTENT, "File contents");
        walker.annotations.embed(name, data_offset, file_size);
    }

    if variant == Variant::NewAsciiCrc {
        let sum = contents.iter().fold(0u32, |sum, &byte| sum.wrapping_add(u32::from(byte)));
        let verdict = match check {
            Some(check) if check == u64::from(sum) => "matches contents".to_string(),
            _ => format!("expected {:#010X}", sum),
        };

        walker.describe(None, Line::new("Checksum verification", verdict).with_margin(1));
    }

    walker.padding(variant.data_padding(file_size), "file contents padding")?;
    Ok(Entry::File)
}
