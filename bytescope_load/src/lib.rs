//! Library for validating format definitions and keeping track of the definitions available for identifying files.
//!
//! Validated definitions are immutable and shared through [`Arc`](std::sync::Arc), so many walks can use the same
//! definition at once.

mod builtin;
mod catalog;

pub mod code;
pub mod definition;
pub mod error;
pub mod index;
pub mod source;

pub use catalog::{Catalog, Origin};
pub use definition::Definition;
pub use source::Source;
