//! The interpreter that walks a buffer using a declarative format definition.
//!
//! # Example
//!
//! ```
//! let catalog = bytescope_load::Catalog::new();
//! let png = catalog.get("PNG").unwrap();
//! let walk = bytescope_vm::run(&png, &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
//! assert!(walk.result.is_ok());
//! assert_eq!(walk.annotations.ranges()[0].label, "PNG signature");
//! ```

pub mod error;
pub mod interpreter;
pub mod render;
pub mod state;
pub mod value;

pub use error::RunError;
pub use interpreter::{run, Walk};
pub use value::{Value, Variable};
