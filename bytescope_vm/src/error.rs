//! Contains the reasons a walk can stop before reaching the end of its program.

use bytescope::binary::InsufficientData;
use bytescope::Identifier;

/// The union of all errors that can stop a walk early.
///
/// A walk that stops early still produces the annotations gathered up to that point.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum RunError {
    #[error(transparent)]
    InsufficientData(#[from] InsufficientData),
    #[error("the size variable {0} is not defined")]
    UnboundSizeVariable(Identifier),
    #[error("the size variable {variable} holds {size}, but only {available} bytes remain")]
    UnreasonableSize {
        variable: Identifier,
        size: String,
        available: usize,
    },
    #[error("no terminator {terminator:#04X} follows offset {offset:#X}")]
    MissingTerminator { terminator: u8, offset: usize },
    #[error("the {kind} stack exceeded its limit of {limit} frames")]
    StackOverflow { kind: &'static str, limit: usize },
}
