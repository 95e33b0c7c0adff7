//! Contains types for reading untrusted bytes and describing the annotations produced while inspecting them.

pub mod annotation;
pub mod binary;
pub mod definition;
pub mod identifier;
pub mod number;

pub use annotation::{Annotations, Color, TaggedRange};
pub use identifier::{Id, Identifier};

#[macro_export]
#[doc(hidden)]
macro_rules! enum_case_from_impl {
    ($implementor: ty, $case_name: ident, $case_type: ty) => {
        impl std::convert::From<$case_type> for $implementor {
            #[inline]
            fn from(value: $case_type) -> Self {
                Self::$case_name(value)
            }
        }
    };
}
