//! Identification of the format of a buffer.

use crate::walker::{cpio, gif, tar, tiff};
use bytescope::Annotations;
use bytescope_load::{Catalog, Definition};
use bytescope_vm::RunError;
use std::sync::Arc;

/// A format that a buffer can be walked as.
#[derive(Clone, Debug)]
pub enum Format {
    Cpio(cpio::Variant),
    Tar,
    Gif,
    Tiff,
    /// A format described by a declarative definition.
    Definition(Arc<Definition>),
}

impl Format {
    pub fn name(&self) -> &str {
        match self {
            Self::Cpio(variant) => variant.name(),
            Self::Tar => "tar",
            Self::Gif => "GIF",
            Self::Tiff => "TIFF",
            Self::Definition(definition) => definition.name(),
        }
    }

    /// Identifies the format of a buffer by its magic numbers.
    ///
    /// The formats with built-in walkers are tried first, followed by the definitions in the catalog.
    pub fn identify(catalog: &Catalog, bytes: &[u8]) -> Option<Self> {
        let format = if let Some(variant) = cpio::Variant::identify(bytes) {
            Self::Cpio(variant)
        } else if tar::identify(bytes) {
            Self::Tar
        } else if gif::identify(bytes) {
            Self::Gif
        } else if tiff::identify(bytes) {
            Self::Tiff
        } else {
            Self::Definition(catalog.identify(bytes)?)
        };

        log::debug!("identified {} bytes as {}", bytes.len(), format.name());
        Some(format)
    }

    /// Walks a buffer as this format, returning the annotations and, for declarative definitions, the reason the walk
    /// stopped early.
    pub fn walk(&self, bytes: &[u8]) -> (Annotations, Option<RunError>) {
        match self {
            Self::Cpio(variant) => (cpio::walk(bytes, *variant), None),
            Self::Tar => (tar::walk(bytes), None),
            Self::Gif => (gif::walk(bytes), None),
            Self::Tiff => (tiff::walk(bytes), None),
            Self::Definition(definition) => {
                let walk = bytescope_vm::run(definition, bytes);
                (walk.annotations, walk.result.err())
            }
        }
    }
}
