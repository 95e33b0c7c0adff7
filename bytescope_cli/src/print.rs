//! Plain text rendering of inspections.

use bytescope::annotation::Line;
use bytescope::binary;
use bytescope_inspect::Inspection;
use std::io::Write;

#[derive(Debug, Default)]
pub struct Options {
    /// When set, only the lines of the tab with this name are printed.
    pub tab: Option<String>,
    pub ranges: bool,
    /// Whether the bytes of each range are dumped below it.
    pub dump: bool,
}

fn lines(out: &mut impl Write, indent: &str, lines: &[Line]) -> std::io::Result<()> {
    for line in lines {
        if line.new_section {
            writeln!(out)?;
        }

        let margin = "  ".repeat(usize::from(line.margin));
        if line.value.is_empty() {
            writeln!(out, "{}{}{}", indent, margin, line.field)?;
        } else {
            writeln!(out, "{}{}{}: {}", indent, margin, line.field, line.value)?;
        }
    }

    Ok(())
}

/// Prints an inspection, followed by the inspections of its embedded files, each nested one level deeper.
pub fn inspection(
    out: &mut impl Write,
    name: &str,
    bytes: &[u8],
    inspection: &Inspection,
    options: &Options,
    depth: usize,
) -> std::io::Result<()> {
    let indent = "    ".repeat(depth);
    let annotations = &inspection.annotations;
    writeln!(
        out,
        "{}== {} ({}) ==",
        indent,
        name,
        inspection.format_name().unwrap_or("unknown format")
    )?;

    match &options.tab {
        Some(tab) => match annotations.tab(tab) {
            Some(tab) => lines(out, &indent, &tab.lines)?,
            None => writeln!(out, "{}(no {} tab)", indent, tab)?,
        },
        None => {
            lines(out, &indent, annotations.lines())?;
            for tab in annotations.tabs() {
                writeln!(out, "\n{}[{}]", indent, tab.name)?;
                lines(out, &indent, &tab.lines)?;
            }
        }
    }

    if options.ranges {
        writeln!(out, "\n{}[ranges]", indent)?;
        for range in annotations.ranges() {
            write!(
                out,
                "{}{:#010X}..{:#010X} {} {}",
                indent,
                range.offset,
                range.end(),
                range.color,
                range.label
            )?;

            match &range.navigation_label {
                Some(navigation) => writeln!(out, " <{}>", navigation)?,
                None => writeln!(out)?,
            }

            if options.dump {
                let mut dump = String::new();
                if let Ok(contents) = binary::read(bytes, range.offset, range.length) {
                    binary::hex_dump(contents, range.offset, &mut dump)
                        .map_err(|error| std::io::Error::new(std::io::ErrorKind::Other, error))?;
                }

                for line in dump.lines() {
                    writeln!(out, "{}    {}", indent, line)?;
                }
            }
        }
    }

    for marker in annotations.markers() {
        writeln!(out, "{}! {}", indent, marker)?;
    }

    if let Some(reason) = &inspection.stop_reason {
        writeln!(out, "{}! walk stopped: {}", indent, reason)?;
    }

    for (file, embedded) in &inspection.embedded {
        writeln!(out)?;
        let name = format!("{} at {:#X}", file.name, file.offset);
        let contents = binary::read(bytes, file.offset, file.size).unwrap_or_default();
        self::inspection(out, &name, contents, embedded, options, depth + 1)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_files_are_printed_with_markers() {
        let catalog = bytescope_load::Catalog::empty();
        let inspection = bytescope_inspect::inspect(&catalog, b"???");
        let options = Options {
            tab: None,
            ranges: true,
            dump: true,
        };

        let mut out = Vec::new();
        super::inspection(&mut out, "input", b"???", &inspection, &options, 0).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("== input (unknown format) =="));
        assert!(text.contains("0x00000000..0x00000003 #FF0000 Unrecognized data"));
        assert!(text.contains("3F 3F 3F"));
        assert!(text.contains("! 3 bytes of unrecognized data at offset 0x0"));
    }
}
