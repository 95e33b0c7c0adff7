//! The identify-and-walk pipeline.

use crate::format::Format;
use bytescope::annotation::EmbeddedFile;
use bytescope::Annotations;
use bytescope_load::Catalog;
use bytescope_vm::RunError;

/// The result of identifying and walking a buffer.
#[derive(Debug)]
pub struct Inspection {
    /// The format the buffer was identified as, or `None` if no format matched.
    pub format: Option<Format>,
    pub annotations: Annotations,
    /// Why a walk using a declarative definition stopped early.
    pub stop_reason: Option<RunError>,
    /// Inspections of the files embedded in the buffer, filled in by [`inspect_recursive`].
    pub embedded: Vec<(EmbeddedFile, Inspection)>,
}

impl Inspection {
    pub fn format_name(&self) -> Option<&str> {
        self.format.as_ref().map(Format::name)
    }
}

/// Identifies the format of a buffer and walks it.
///
/// A buffer that matches no format is marked as unrecognized in its entirety.
pub fn inspect(catalog: &Catalog, bytes: &[u8]) -> Inspection {
    let format = Format::identify(catalog, bytes);
    let (annotations, stop_reason) = match &format {
        Some(format) => format.walk(bytes),
        None => {
            log::debug!("no format matches the {} byte buffer", bytes.len());
            let mut annotations = Annotations::new();
            annotations.mark_unrecognized(0, bytes.len());
            (annotations, None)
        }
    };

    Inspection {
        format,
        annotations,
        stop_reason,
        embedded: Vec::new(),
    }
}

/// Inspects a buffer, then inspects each embedded file it contains, down to `max_depth` levels of nesting.
///
/// A depth of zero behaves like [`inspect`].
pub fn inspect_recursive(catalog: &Catalog, bytes: &[u8], max_depth: usize) -> Inspection {
    let mut inspection = inspect(catalog, bytes);
    if max_depth == 0 {
        return inspection;
    }

    for file in inspection.annotations.embedded_files() {
        match bytescope::binary::read(bytes, file.offset, file.size) {
            Ok(contents) => {
                log::debug!("inspecting embedded file {:?} at offset {:#X}", file.name, file.offset);
                inspection
                    .embedded
                    .push((file.clone(), inspect_recursive(catalog, contents, max_depth - 1)));
            }
            Err(error) => log::warn!("embedded file {:?} is out of bounds: {}", file.name, error),
        }
    }

    inspection
}
