//! Walker for GIF images.

use crate::walker::{Result, Stopped, Walker};
use bytescope::annotation::{palette, Color, Line, INVALID};
use bytescope::binary::ByteDebug;
use bytescope::Annotations;

const EXTENSION: u8 = 0x21;
const IMAGE_DESCRIPTOR: u8 = 0x2C;
const TRAILER: u8 = 0x3B;

const GRAPHIC_CONTROL: u8 = 0xF9;
const COMMENT: u8 = 0xFE;
const APPLICATION: u8 = 0xFF;
const PLAIN_TEXT: u8 = 0x01;

pub fn identify(bytes: &[u8]) -> bool {
    bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a")
}

fn flag(packed: u8, mask: u8) -> &'static str {
    if packed & mask != 0 {
        "yes"
    } else {
        "no"
    }
}

fn disposal_method(packed: u8) -> &'static str {
    match (packed >> 2) & 7 {
        0 => "Unspecified",
        1 => "Do not dispose",
        2 => "Restore to background color",
        3 => "Restore to previous",
        _ => INVALID,
    }
}

fn u16_le(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

/// Walks the header, logical screen descriptor, and every block up to the trailer.
pub fn walk(bytes: &[u8]) -> Annotations {
    let mut walker = Walker::new(bytes, "GIF");
    let mut frames = 0usize;
    let result = header(&mut walker).and_then(|()| {
        while block(&mut walker, &mut frames)? {}
        Ok(())
    });

    if result.is_ok() && !walker.reader.is_at_end() {
        walker.unrecognized();
    }

    walker.describe(None, Line::new("Frames", frames.to_string()).starting_section());
    walker.finish()
}

fn header(walker: &mut Walker) -> Result<()> {
    walker.field(3, palette::MAGIC, "Signature", "GIF header")?;
    let version = walker.field(3, palette::FIELD_1, "Version", "GIF header")?;
    walker.describe(None, Line::new("Version", String::from_utf8_lossy(version)));

    let width = walker.field(2, palette::FIELD_2, "Logical screen width", "logical screen descriptor")?;
    let height = walker.field(2, palette::FIELD_1, "Logical screen height", "logical screen descriptor")?;
    let packed = walker.field(1, palette::FIELD_2, "Screen flags", "logical screen descriptor")?[0];
    let background = walker.field(1, palette::FIELD_1, "Background color index", "logical screen descriptor")?[0];
    let aspect = walker.field(1, palette::FIELD_2, "Pixel aspect ratio", "logical screen descriptor")?[0];

    walker.describe(None, Line::new("Logical screen", "").starting_section());
    let lines = [
        Line::new("Width", u16_le(width).to_string()),
        Line::new("Height", u16_le(height).to_string()),
        Line::new("Global color table", flag(packed, 0x80)),
        Line::new("Color resolution", format!("{} bits", ((packed >> 4) & 7) + 1)),
        Line::new("Sorted", flag(packed, 0x08)),
        Line::new("Background color index", background.to_string()),
        Line::new(
            "Pixel aspect ratio",
            match aspect {
                0 => "none".to_string(),
                aspect => format!("{}/64", u16::from(aspect) + 15),
            },
        ),
    ];

    for line in lines {
        walker.describe(None, line.with_margin(1));
    }

    if packed & 0x80 != 0 {
        color_table(walker, packed & 7, "Global color")?;
    }

    Ok(())
}

/// Tags the `2^(size + 1)` colors of a color table, alternating between two colors.
fn color_table(walker: &mut Walker, size: u8, label: &str) -> Result<()> {
    let count = 1usize << (usize::from(size & 7) + 1);
    walker.describe(None, Line::new(format!("{} table", label), format!("{} colors", count)).with_margin(1));

    for index in 0..count {
        let (offset, rgb) = walker.take(3, "color table")?;
        let range = walker
            .annotations
            .tag(offset, 3, palette::alternating(index), format!("{} {}", label, index));
        range.additional_color = Some(Color::new(rgb[0], rgb[1], rgb[2]));
    }

    Ok(())
}

/// Walks a single block, returning `false` once the trailer is reached.
fn block(walker: &mut Walker, frames: &mut usize) -> Result<bool> {
    let offset = walker.offset();
    let label = match walker.reader.peek(1) {
        Ok(label) => label[0],
        Err(_) => {
            walker.take(1, "GIF trailer")?;
            return Err(Stopped);
        }
    };

    match label {
        EXTENSION => {
            walker.field(1, palette::LABEL, "Extension introducer", "extension")?;
            extension(walker)?;
        }
        IMAGE_DESCRIPTOR => {
            walker.field(1, palette::LABEL, "Image separator", "image descriptor")?;
            *frames += 1;
            image(walker, *frames)?;
        }
        TRAILER => {
            walker.field(1, palette::MAGIC, "Trailer", "GIF trailer")?;
            return Ok(false);
        }
        _ => {
            log::debug!("unknown GIF block {:#04X} at offset {:#X}", label, offset);
            walker.describe(None, Line::new("Unknown block", format!("{:#04X}", label)).starting_section());
            walker.unrecognized();
            return Err(Stopped);
        }
    }

    Ok(true)
}

/// Reads a chain of data sub-blocks, up to and including the zero-length terminator.
fn sub_blocks(walker: &mut Walker, label: &str) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    let mut index = 0usize;
    loop {
        let (offset, size) = walker.take(1, "data sub-block")?;
        let size = usize::from(size[0]);
        if size == 0 {
            walker.annotations.tag(offset, 1, palette::LABEL, "Block terminator");
            return Ok(data);
        }

        walker.annotations.tag(offset, 1, palette::LABEL, "Sub-block size");
        data.extend_from_slice(walker.field(size, palette::alternating(index), label, "data sub-block")?);
        index += 1;
    }
}

fn extension(walker: &mut Walker) -> Result<()> {
    let kind = walker.field(1, palette::LABEL, "Extension label", "extension")?[0];
    match kind {
        GRAPHIC_CONTROL => {
            walker.field(1, palette::LABEL, "Block size", "graphic control extension")?;
            let packed = walker.field(1, palette::FIELD_1, "Graphic control flags", "graphic control extension")?[0];
            let delay = walker.field(2, palette::FIELD_2, "Delay time", "graphic control extension")?;
            let transparent = walker.field(1, palette::FIELD_1, "Transparent color index", "graphic control extension")?[0];
            sub_blocks(walker, "Extension data")?;

            walker.describe(None, Line::new("Graphic control extension", "").starting_section());
            let lines = [
                Line::new("Disposal method", disposal_method(packed)),
                Line::new("User input", flag(packed, 0x02)),
                Line::new(
                    "Transparent color",
                    if packed & 0x01 != 0 {
                        transparent.to_string()
                    } else {
                        "none".to_string()
                    },
                ),
                Line::new("Delay", format!("{} ms", u32::from(u16_le(delay)) * 10)),
            ];

            for line in lines {
                walker.describe(None, line.with_margin(1));
            }
        }
        COMMENT => {
            let text = sub_blocks(walker, "Comment")?;
            let text = String::from_utf8(text).unwrap_or_else(|_| INVALID.to_string());
            walker.describe(None, Line::new("Comment", text).starting_section());
        }
        APPLICATION => {
            walker.field(1, palette::LABEL, "Block size", "application extension")?;
            let identifier = walker.field(8, palette::NAME, "Application identifier", "application extension")?;
            let code = walker.field(3, palette::FIELD_1, "Authentication code", "application extension")?;
            let data = sub_blocks(walker, "Application data")?;

            let identifier = format!("{}{}", String::from_utf8_lossy(identifier), String::from_utf8_lossy(code));
            walker.describe(None, Line::new("Application extension", identifier).starting_section());
            walker.describe(None, Line::new("Data", ByteDebug::from(data.as_slice()).to_string()).with_margin(1));
        }
        PLAIN_TEXT => {
            walker.field(1, palette::LABEL, "Block size", "plain text extension")?;
            walker.field(12, palette::FIELD_1, "Text grid", "plain text extension")?;
            let text = sub_blocks(walker, "Plain text")?;
            let text = String::from_utf8(text).unwrap_or_else(|_| INVALID.to_string());
            walker.describe(None, Line::new("Plain text extension", text).starting_section());
        }
        _ => {
            let data = sub_blocks(walker, "Extension data")?;
            walker.describe(
                None,
                Line::new(format!("Unknown extension {:#04X}", kind), format!("{} bytes", data.len())).starting_section(),
            );
        }
    }

    Ok(())
}

fn image(walker: &mut Walker, number: usize) -> Result<()> {
    let left = walker.field(2, palette::FIELD_1, "Image left", "image descriptor")?;
    let top = walker.field(2, palette::FIELD_2, "Image top", "image descriptor")?;
    let width = walker.field(2, palette::FIELD_1, "Image width", "image descriptor")?;
    let height = walker.field(2, palette::FIELD_2, "Image height", "image descriptor")?;
    let packed = walker.field(1, palette::FIELD_1, "Image flags", "image descriptor")?[0];

    walker.describe(None, Line::new("Image", number.to_string()).starting_section());
    let lines = [
        Line::new("Position", format!("{}, {}", u16_le(left), u16_le(top))),
        Line::new("Size", format!("{}x{}", u16_le(width), u16_le(height))),
        Line::new("Local color table", flag(packed, 0x80)),
        Line::new("Interlaced", flag(packed, 0x40)),
        Line::new("Sorted", flag(packed, 0x20)),
    ];

    for line in lines {
        walker.describe(None, line.with_margin(1));
    }

    if packed & 0x80 != 0 {
        color_table(walker, packed & 7, "Local color")?;
    }

    let code_size = walker.field(1, palette::FIELD_2, "LZW minimum code size", "image data")?[0];
    walker.describe(None, Line::new("LZW minimum code size", code_size.to_string()).with_margin(1));
    let data = sub_blocks(walker, "Image data")?;
    walker.describe(None, Line::new("Image data", format!("{} bytes", data.len())).with_margin(1));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposal_methods_are_named() {
        assert_eq!(disposal_method(2 << 2), "Restore to background color");
        assert_eq!(disposal_method(7 << 2), INVALID);
    }

    #[test]
    fn unknown_block_is_unrecognized() {
        let mut image = b"GIF89a".to_vec();
        image.extend_from_slice(&[1, 0, 1, 0, 0, 0, 0]);
        image.extend_from_slice(&[0x99, 1, 2]);

        let annotations = walk(&image);
        assert_eq!(annotations.markers().len(), 1);
        assert_eq!(annotations.markers()[0].offset, 13);
        assert_eq!(annotations.tagged_length(), image.len());
    }

    #[test]
    fn missing_terminator_is_incomplete() {
        let mut image = b"GIF89a".to_vec();
        image.extend_from_slice(&[1, 0, 1, 0, 0, 0, 0]);
        image.extend_from_slice(&[0x21, 0xFE, 5, b'a', b'b']);

        let annotations = walk(&image);
        assert_eq!(annotations.markers().len(), 1);
        assert!(annotations.ranges().iter().all(|range| range.end() <= image.len()));
    }
}
