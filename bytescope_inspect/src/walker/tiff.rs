//! Walker for TIFF structures, including the EXIF and GPS directories found in camera metadata.

use crate::walker::{self, Result, Stopped, Walker};
use bytescope::annotation::{palette, Line, INVALID};
use bytescope::binary::{ByteDebug, Reader};
use bytescope::number::{self, Endianness, Rational, SignedRational};
use bytescope::Annotations;
use std::collections::VecDeque;

/// Number of unrecognized tags after which the rest of a directory is skipped.
pub const UNKNOWN_TAG_LIMIT: usize = 100;

const ENTRY_LENGTH: usize = 12;
const EXIF_POINTER: u16 = 0x8769;
const GPS_POINTER: u16 = 0x8825;

/// Maximum number of values shown for a single tag.
const SHOWN_VALUES: usize = 8;

pub fn identify(bytes: &[u8]) -> bool {
    bytes.starts_with(b"II\x2A\x00") || bytes.starts_with(b"MM\x00\x2A")
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Directory {
    Image(usize),
    Exif,
    Gps,
}

impl Directory {
    fn name(self) -> String {
        match self {
            Self::Image(index) => format!("IFD{}", index),
            Self::Exif => "EXIF".to_string(),
            Self::Gps => "GPSInfo".to_string(),
        }
    }

    /// The tab that entries of the directory are described in, or `None` for the main panel.
    fn tab(self) -> Option<&'static str> {
        match self {
            Self::Image(_) => None,
            Self::Exif => Some("EXIF"),
            Self::Gps => Some("GPSInfo"),
        }
    }

    fn tag_name(self, tag: u16) -> Option<&'static str> {
        match self {
            Self::Image(_) => image_tag_name(tag),
            Self::Exif => exif_tag_name(tag),
            Self::Gps => gps_tag_name(tag),
        }
    }
}

fn image_tag_name(tag: u16) -> Option<&'static str> {
    Some(match tag {
        0x00FE => "NewSubfileType",
        0x0100 => "ImageWidth",
        0x0101 => "ImageLength",
        0x0102 => "BitsPerSample",
        0x0103 => "Compression",
        0x0106 => "PhotometricInterpretation",
        0x010E => "ImageDescription",
        0x010F => "Make",
        0x0110 => "Model",
        0x0111 => "StripOffsets",
        0x0112 => "Orientation",
        0x0115 => "SamplesPerPixel",
        0x0116 => "RowsPerStrip",
        0x0117 => "StripByteCounts",
        0x011A => "XResolution",
        0x011B => "YResolution",
        0x011C => "PlanarConfiguration",
        0x0128 => "ResolutionUnit",
        0x0131 => "Software",
        0x0132 => "DateTime",
        0x013B => "Artist",
        0x013E => "WhitePoint",
        0x013F => "PrimaryChromaticities",
        0x0201 => "JPEGInterchangeFormat",
        0x0202 => "JPEGInterchangeFormatLength",
        0x0211 => "YCbCrCoefficients",
        0x0213 => "YCbCrPositioning",
        0x0214 => "ReferenceBlackWhite",
        0x8298 => "Copyright",
        EXIF_POINTER => "ExifIFDPointer",
        GPS_POINTER => "GPSInfoIFDPointer",
        _ => return None,
    })
}

fn exif_tag_name(tag: u16) -> Option<&'static str> {
    Some(match tag {
        0x829A => "ExposureTime",
        0x829D => "FNumber",
        0x8822 => "ExposureProgram",
        0x8827 => "ISOSpeedRatings",
        0x9000 => "ExifVersion",
        0x9003 => "DateTimeOriginal",
        0x9004 => "DateTimeDigitized",
        0x9101 => "ComponentsConfiguration",
        0x9102 => "CompressedBitsPerPixel",
        0x9201 => "ShutterSpeedValue",
        0x9202 => "ApertureValue",
        0x9203 => "BrightnessValue",
        0x9204 => "ExposureBiasValue",
        0x9205 => "MaxApertureValue",
        0x9206 => "SubjectDistance",
        0x9207 => "MeteringMode",
        0x9208 => "LightSource",
        0x9209 => "Flash",
        0x920A => "FocalLength",
        0x927C => "MakerNote",
        0x9286 => "UserComment",
        0x9290 => "SubSecTime",
        0xA000 => "FlashpixVersion",
        0xA001 => "ColorSpace",
        0xA002 => "PixelXDimension",
        0xA003 => "PixelYDimension",
        0xA005 => "InteroperabilityIFDPointer",
        0xA402 => "ExposureMode",
        0xA403 => "WhiteBalance",
        0xA405 => "FocalLengthIn35mmFilm",
        0xA406 => "SceneCaptureType",
        0xA420 => "ImageUniqueID",
        0xA434 => "LensModel",
        _ => return None,
    })
}

fn gps_tag_name(tag: u16) -> Option<&'static str> {
    Some(match tag {
        0x0000 => "GPSVersionID",
        0x0001 => "GPSLatitudeRef",
        0x0002 => "GPSLatitude",
        0x0003 => "GPSLongitudeRef",
        0x0004 => "GPSLongitude",
        0x0005 => "GPSAltitudeRef",
        0x0006 => "GPSAltitude",
        0x0007 => "GPSTimeStamp",
        0x0008 => "GPSSatellites",
        0x0009 => "GPSStatus",
        0x000A => "GPSMeasureMode",
        0x000B => "GPSDOP",
        0x000C => "GPSSpeedRef",
        0x000D => "GPSSpeed",
        0x0010 => "GPSImgDirectionRef",
        0x0011 => "GPSImgDirection",
        0x0012 => "GPSMapDatum",
        0x001D => "GPSDateStamp",
        _ => return None,
    })
}

fn type_size(field_type: u16) -> Option<usize> {
    match field_type {
        1 | 2 | 6 | 7 => Some(1),
        3 | 8 => Some(2),
        4 | 9 | 11 => Some(4),
        5 | 10 | 12 => Some(8),
        _ => None,
    }
}

fn type_name(field_type: u16) -> &'static str {
    match field_type {
        1 => "BYTE",
        2 => "ASCII",
        3 => "SHORT",
        4 => "LONG",
        5 => "RATIONAL",
        6 => "SBYTE",
        7 => "UNDEFINED",
        8 => "SSHORT",
        9 => "SLONG",
        10 => "SRATIONAL",
        11 => "FLOAT",
        12 => "DOUBLE",
        _ => INVALID,
    }
}

fn element(field_type: u16, bytes: &[u8], endianness: Endianness) -> Option<String> {
    let unsigned = |bytes: &[u8]| number::decode_unsigned(bytes, endianness);
    let signed = |bytes: &[u8]| number::decode_signed(bytes, endianness);
    Some(match field_type {
        1 | 3 | 4 => unsigned(bytes)?.to_string(),
        6 | 8 | 9 => signed(bytes)?.to_string(),
        5 => Rational {
            numerator: unsigned(&bytes[..4])? as u32,
            denominator: unsigned(&bytes[4..])? as u32,
        }
        .to_string(),
        10 => SignedRational {
            numerator: signed(&bytes[..4])? as i32,
            denominator: signed(&bytes[4..])? as i32,
        }
        .to_string(),
        11 => f32::from_bits(unsigned(bytes)? as u32).to_string(),
        12 => f64::from_bits(unsigned(bytes)?).to_string(),
        _ => return None,
    })
}

/// Renders the values of a tag according to its field type.
fn render(field_type: u16, data: &[u8], endianness: Endianness) -> String {
    match field_type {
        2 => walker::text(data),
        7 if data.len() > 16 => format!("{} ...", ByteDebug::from(&data[..16])),
        7 => ByteDebug::from(data).to_string(),
        _ => {
            let size = match type_size(field_type) {
                Some(size) => size,
                None => return INVALID.to_string(),
            };

            let mut values = Vec::new();
            for chunk in data.chunks_exact(size).take(SHOWN_VALUES) {
                values.push(element(field_type, chunk, endianness).unwrap_or_else(|| INVALID.to_string()));
            }

            if data.len() / size > SHOWN_VALUES {
                values.push("...".to_string());
            }

            values.join(", ")
        }
    }
}

struct Tiff<'b> {
    walker: Walker<'b>,
    endianness: Endianness,
    visited: rustc_hash::FxHashSet<usize>,
    pending: VecDeque<(usize, Directory)>,
}

/// Walks the header and every directory reachable from it: the chain of image directories, and the EXIF and GPS
/// directories they point to.
pub fn walk(bytes: &[u8]) -> Annotations {
    let mut walker = Walker::new(bytes, "TIFF");
    let (endianness, first) = match header(&mut walker) {
        Ok(header) => header,
        Err(Stopped) => return walker.finish(),
    };

    let mut tiff = Tiff {
        walker,
        endianness,
        visited: rustc_hash::FxHashSet::default(),
        pending: VecDeque::from([(first, Directory::Image(0))]),
    };

    while let Some((offset, directory)) = tiff.pending.pop_front() {
        if !tiff.visited.insert(offset) {
            log::warn!("{} at offset {:#X} was already visited", directory.name(), offset);
            continue;
        }

        if tiff.directory(offset, directory).is_err() {
            log::debug!("{} at offset {:#X} is incomplete", directory.name(), offset);
        }
    }

    tiff.walker.finish()
}

fn header(walker: &mut Walker) -> Result<(Endianness, usize)> {
    let endianness = match walker.reader.peek(2) {
        Ok(b"II") => Endianness::Little,
        Ok(b"MM") => Endianness::Big,
        Ok(_) => {
            walker.unrecognized();
            return Err(Stopped);
        }
        Err(_) => {
            walker.take(2, "TIFF header")?;
            return Err(Stopped);
        }
    };

    walker.field(2, palette::MAGIC, "Byte order", "TIFF header")?;
    let identifier = walker.field(2, palette::MAGIC, "TIFF identifier", "TIFF header")?;
    let first = walker.field(4, palette::LABEL, "First IFD offset", "TIFF header")?;

    let identifier = number::decode_unsigned(identifier, endianness).unwrap_or_default();
    let first = number::decode_unsigned(first, endianness).unwrap_or_default() as usize;

    walker.describe(None, Line::new("Byte order", endianness.name()));
    walker.describe(
        None,
        Line::new("TIFF identifier", if identifier == 42 { "42".to_string() } else { INVALID.to_string() }),
    );
    walker.describe(None, Line::new("First IFD offset", format!("{:#X}", first)));
    Ok((endianness, first))
}

impl<'b> Tiff<'b> {
    fn decode(&self, bytes: &[u8]) -> usize {
        number::decode_unsigned(bytes, self.endianness).unwrap_or_default() as usize
    }

    fn directory(&mut self, offset: usize, directory: Directory) -> Result<()> {
        let name = directory.name();
        let tab = directory.tab();
        let bytes = self.walker.reader.bytes();

        let what = format!("{} directory", name);
        if offset >= bytes.len() {
            log::warn!("{} offset {:#X} is past the end of the buffer", name, offset);
            self.walker.describe(tab, Line::new(name, INVALID).starting_section());
            self.walker.annotations.mark_incomplete(what, bytes.len(), bytes.len());
            return Err(Stopped);
        }

        self.walker.reader = Reader::with_offset(bytes, offset);
        let count = self.walker.field(2, palette::LABEL, "Entry count", &what)?;
        let count = self.decode(count);
        self.walker
            .describe(tab, Line::new(name.as_str(), format!("{} entries", count)).starting_section());

        let end = offset + 2 + count * ENTRY_LENGTH + 4;
        let mut unknown = 0usize;

        for index in 0..count {
            let (entry_offset, entry) = self.walker.take(ENTRY_LENGTH, "IFD entry")?;
            let tag = self.decode(&entry[..2]) as u16;
            let tag_name = directory.tag_name(tag);

            if tag_name.is_none() {
                unknown += 1;
                if unknown > UNKNOWN_TAG_LIMIT {
                    log::warn!("{} has more than {} unknown tags, skipping the rest", name, UNKNOWN_TAG_LIMIT);
                    self.walker.annotations.mark_unrecognized(entry_offset, end.min(bytes.len()));
                    return Ok(());
                }
            }

            let field_type = self.decode(&entry[2..4]) as u16;
            let value_count = self.decode(&entry[4..8]);
            let label = tag_name.map_or_else(|| format!("Tag {:#06X}", tag), str::to_string);
            let color = palette::alternating(index);

            self.walker.annotations.tag(entry_offset, 2, color, "Tag");
            self.walker.annotations.tag(entry_offset + 2, 2, color, "Field type");
            self.walker.annotations.tag(entry_offset + 4, 4, color, "Count");
            self.walker.annotations.tag(entry_offset + 8, 4, color, label.as_str());

            let rendered = self.value(field_type, value_count, &entry[8..], &label);
            let tooltip = format!("{:#06X}, {} x{}", tag, type_name(field_type), value_count);
            self.walker
                .describe(tab, Line::new(label, rendered).with_tooltip(tooltip).with_margin(1));

            let pointer = self.decode(&entry[8..]);
            match (directory, tag) {
                (Directory::Image(_), EXIF_POINTER) => self.pending.push_back((pointer, Directory::Exif)),
                (Directory::Image(_), GPS_POINTER) => self.pending.push_back((pointer, Directory::Gps)),
                _ => (),
            }
        }

        let next = self.walker.field(4, palette::LABEL, "Next IFD offset", &what)?;
        let next = self.decode(next);
        if let Directory::Image(index) = directory {
            if next != 0 {
                self.pending.push_back((next, Directory::Image(index + 1)));
            }
        }

        Ok(())
    }

    /// Renders the value of an entry, which is stored inline when it fits in four bytes and at an offset otherwise.
    fn value(&mut self, field_type: u16, count: usize, field: &'b [u8], label: &str) -> String {
        let length = match type_size(field_type).and_then(|size| size.checked_mul(count)) {
            Some(length) => length,
            None => return INVALID.to_string(),
        };

        let data = if length <= 4 {
            &field[..length]
        } else {
            let offset = self.decode(field);
            match self.walker.reader.read_at(offset, length) {
                Ok(data) => {
                    self.walker.annotations.tag(offset, length, palette::CONTENT, label);
                    data
                }
                Err(error) => {
                    log::debug!("value of {}: {}", label, error);
                    return INVALID.to_string();
                }
            }
        };

        render(field_type, data, self.endianness)
    }
}
