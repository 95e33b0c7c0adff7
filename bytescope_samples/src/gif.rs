//! Sample GIF images.

/// A single image of a GIF file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    pub width: u16,
    pub height: u16,
    /// Delay before the next frame, in hundredths of a second.
    pub delay: u16,
    /// Size field of the local color table, which then holds `2^(size + 1)` colors.
    pub local_color_table: Option<u8>,
}

impl Frame {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            delay: 10,
            local_color_table: None,
        }
    }
}

pub const COMMENT: &str = "made by bytescope";

fn color_table(buffer: &mut Vec<u8>, size: u8) {
    let count = 1usize << (usize::from(size & 7) + 1);
    for index in 0..count {
        let level = (index * 255 / count) as u8;
        buffer.extend_from_slice(&[level, level, 255 - level]);
    }
}

/// Builds a GIF89a image containing a looping application extension, a comment, and the frames.
///
/// # Examples
///
/// ```
/// use bytescope_samples::gif;
///
/// let image = gif::image(Some(1), &[gif::Frame::new(4, 4)]);
/// assert!(image.starts_with(b"GIF89a"));
/// assert_eq!(image.last(), Some(&0x3B));
/// ```
pub fn image(global_color_table: Option<u8>, frames: &[Frame]) -> Vec<u8> {
    let (width, height) = frames.first().map_or((1, 1), |frame| (frame.width, frame.height));
    let mut buffer = b"GIF89a".to_vec();
    buffer.extend_from_slice(&width.to_le_bytes());
    buffer.extend_from_slice(&height.to_le_bytes());
    buffer.push(match global_color_table {
        Some(size) => 0x80 | 0x70 | (size & 7),
        None => 0x70,
    });
    buffer.extend_from_slice(&[0, 0]);
    if let Some(size) = global_color_table {
        color_table(&mut buffer, size);
    }

    buffer.extend_from_slice(&[0x21, 0xFF, 11]);
    buffer.extend_from_slice(b"NETSCAPE2.0");
    buffer.extend_from_slice(&[3, 1, 0, 0, 0]);

    buffer.extend_from_slice(&[0x21, 0xFE, COMMENT.len() as u8]);
    buffer.extend_from_slice(COMMENT.as_bytes());
    buffer.push(0);

    for frame in frames {
        // Graphic control extension, disposing of the frame by restoring the background.
        buffer.extend_from_slice(&[0x21, 0xF9, 4, 2 << 2]);
        buffer.extend_from_slice(&frame.delay.to_le_bytes());
        buffer.extend_from_slice(&[0, 0]);

        buffer.push(0x2C);
        buffer.extend_from_slice(&[0, 0, 0, 0]);
        buffer.extend_from_slice(&frame.width.to_le_bytes());
        buffer.extend_from_slice(&frame.height.to_le_bytes());
        buffer.push(match frame.local_color_table {
            Some(size) => 0x80 | (size & 7),
            None => 0,
        });
        if let Some(size) = frame.local_color_table {
            color_table(&mut buffer, size);
        }

        // LZW minimum code size, one data sub-block, and the terminator.
        buffer.extend_from_slice(&[2, 4, 0x84, 0x8F, 0xA9, 0x0B, 0]);
    }

    buffer.push(0x3B);
    buffer
}
