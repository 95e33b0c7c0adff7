//! Sample TIFF structures, as found in EXIF metadata.

use bytescope::number::Endianness;

pub const TYPE_BYTE: u16 = 1;
pub const TYPE_ASCII: u16 = 2;
pub const TYPE_SHORT: u16 = 3;
pub const TYPE_LONG: u16 = 4;
pub const TYPE_RATIONAL: u16 = 5;

pub const MAKE: &str = "bytescope";

struct Writer {
    buffer: Vec<u8>,
    endianness: Endianness,
}

impl Writer {
    fn new(endianness: Endianness) -> Self {
        let mut writer = Self {
            buffer: Vec::new(),
            endianness,
        };

        writer.buffer.extend_from_slice(match endianness {
            Endianness::Little => b"II",
            Endianness::Big => b"MM",
        });
        writer.u16(42);
        writer.u32(8);
        writer
    }

    fn u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&match self.endianness {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        });
    }

    fn u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&match self.endianness {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        });
    }

    fn entry(&mut self, tag: u16, field_type: u16, count: u32) {
        self.u16(tag);
        self.u16(field_type);
        self.u32(count);
    }

    /// Writes a SHORT value, which is left justified within the 4 byte value field.
    fn short_entry(&mut self, tag: u16, value: u16) {
        self.entry(tag, TYPE_SHORT, 1);
        self.u16(value);
        self.u16(0);
    }
}

/// Builds a TIFF structure with an EXIF and a GPS directory.
///
/// The first directory holds the image width inline, and the make and horizontal resolution at offsets elsewhere in the
/// buffer. The EXIF directory holds an exposure time, an f-number, and an ISO speed, while the GPS directory holds a
/// version and a latitude reference.
///
/// # Examples
///
/// ```
/// use bytescope::number::Endianness;
///
/// let tiff = bytescope_samples::tiff::exif(Endianness::Big);
/// assert!(tiff.starts_with(b"MM\x00\x2A"));
/// ```
pub fn exif(endianness: Endianness) -> Vec<u8> {
    const IFD0: u32 = 8;
    const MAKE_OFFSET: u32 = IFD0 + 2 + 5 * 12 + 4;
    const RESOLUTION_OFFSET: u32 = MAKE_OFFSET + 10;
    const EXIF_IFD: u32 = RESOLUTION_OFFSET + 8;
    const EXPOSURE_OFFSET: u32 = EXIF_IFD + 2 + 3 * 12 + 4;
    const F_NUMBER_OFFSET: u32 = EXPOSURE_OFFSET + 8;
    const GPS_IFD: u32 = F_NUMBER_OFFSET + 8;

    let mut writer = Writer::new(endianness);

    writer.u16(5);
    writer.short_entry(0x0100, 64);
    writer.entry(0x010F, TYPE_ASCII, MAKE.len() as u32 + 1);
    writer.u32(MAKE_OFFSET);
    writer.entry(0x011A, TYPE_RATIONAL, 1);
    writer.u32(RESOLUTION_OFFSET);
    writer.entry(0x8769, TYPE_LONG, 1);
    writer.u32(EXIF_IFD);
    writer.entry(0x8825, TYPE_LONG, 1);
    writer.u32(GPS_IFD);
    writer.u32(0);

    writer.buffer.extend_from_slice(MAKE.as_bytes());
    writer.buffer.push(0);
    writer.u32(72);
    writer.u32(1);

    writer.u16(3);
    writer.entry(0x829A, TYPE_RATIONAL, 1);
    writer.u32(EXPOSURE_OFFSET);
    writer.entry(0x829D, TYPE_RATIONAL, 1);
    writer.u32(F_NUMBER_OFFSET);
    writer.short_entry(0x8827, 100);
    writer.u32(0);

    writer.u32(1);
    writer.u32(250);
    writer.u32(28);
    writer.u32(10);

    writer.u16(2);
    writer.entry(0x0000, TYPE_BYTE, 4);
    writer.buffer.extend_from_slice(&[2, 3, 0, 0]);
    writer.entry(0x0001, TYPE_ASCII, 2);
    writer.buffer.extend_from_slice(b"N\0\0\0");
    writer.u32(0);

    debug_assert_eq!(writer.buffer.len(), GPS_IFD as usize + 2 + 2 * 12 + 4);
    writer.buffer
}

/// Builds a TIFF structure whose only directory declares `claimed` entries but contains only `present` of them, each an
/// unknown tag.
pub fn unknown_tags(endianness: Endianness, claimed: u16, present: u16) -> Vec<u8> {
    let mut writer = Writer::new(endianness);
    writer.u16(claimed);
    for index in 0..present {
        writer.short_entry(0xC000 + index, index);
    }

    if present >= claimed {
        writer.u32(0);
    }

    writer.buffer
}
