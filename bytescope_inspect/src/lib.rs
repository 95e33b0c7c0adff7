//! Identifies the format of a buffer and walks it, either with a hard-coded walker (cpio, tar, GIF, TIFF) or with a
//! declarative definition from a [`Catalog`](bytescope_load::Catalog).
//!
//! # Example
//!
//! ```
//! use bytescope_samples::{tar, Entry};
//!
//! let catalog = bytescope_load::Catalog::new();
//! let archive = tar::archive(&[Entry::file("hello.txt", "Hello!")]);
//! let inspection = bytescope_inspect::inspect(&catalog, &archive);
//! assert_eq!(inspection.format_name(), Some("tar"));
//! assert!(inspection.annotations.is_complete());
//! ```

pub mod format;
pub mod inspect;
pub mod walker;

pub use format::Format;
pub use inspect::{inspect, inspect_recursive, Inspection};
