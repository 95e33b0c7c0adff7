//! Contains types representing errors encountered while loading and validating definitions.

use bytescope::Identifier;
use std::fmt::{Display, Formatter};

/// Identifies a step within a definition, either in its main program or in one of its blocks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StepLocation {
    pub block: Option<Identifier>,
    pub index: usize,
}

impl Display for StepLocation {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match &self.block {
            Some(block) => write!(f, "step {} of block {}", self.index, block),
            None => write!(f, "step {}", self.index),
        }
    }
}

/// A list specifying the kinds of invalid content that can be encountered when validating a definition.
///
/// Usually used with the [`InvalidDefinitionError`] type.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum InvalidDefinitionKind {
    #[error("definitions must have a name")]
    MissingName,
    #[error("the {kind} {name} is defined more than once")]
    DuplicateName { kind: &'static str, name: Identifier },
    #[error("the color {name} is invalid: {source}")]
    InvalidColor {
        name: Identifier,
        source: bytescope::annotation::InvalidColor,
    },
    #[error("the color {0} is not defined")]
    UnknownColor(Identifier),
    #[error("the field {0} is not defined")]
    UnknownField(Identifier),
    #[error("the block {0} is not defined")]
    UnknownBlock(Identifier),
    #[error("the field {0} cannot have a size of zero")]
    EmptyField(Identifier),
    #[error("the value of magic number {index} is not a sequence of hexadecimal byte pairs")]
    InvalidMagicValue { index: usize },
    #[error("magic number {index} is declared as {expected} bytes long, but its value is {actual} bytes long")]
    MagicSizeMismatch { index: usize, expected: usize, actual: usize },
    #[error("the {0} step has no matching start step")]
    UnexpectedEnd(&'static str),
    #[error("expected a loop_end step to close the loop")]
    UnbalancedLoop,
    #[error("expected a selection_end step to close the selection")]
    UnbalancedSelection,
    #[error("the {0:?} condition requires an operand")]
    MissingOperand(bytescope::definition::Condition),
    #[error("the field {field} is {width} bytes wide, which cannot be stored in a variable")]
    UnstorableWidth { field: Identifier, width: usize },
    #[error("the block {0} calls itself")]
    RecursiveBlock(Identifier),
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct InvalidDefinitionErrorInner {
    definition: String,
    location: Option<StepLocation>,
    kind: InvalidDefinitionKind,
}

/// The error type used when validation to check that a definition's contents are valid fails.
#[derive(Clone, Eq, PartialEq, thiserror::Error)]
pub struct InvalidDefinitionError(Box<InvalidDefinitionErrorInner>);

impl InvalidDefinitionError {
    pub(crate) fn new<E: Into<InvalidDefinitionKind>>(kind: E, definition: &str, location: Option<StepLocation>) -> Self {
        Self(Box::new(InvalidDefinitionErrorInner {
            definition: definition.to_string(),
            location,
            kind: kind.into(),
        }))
    }

    /// Gets the name of the invalid definition.
    pub fn definition(&self) -> &str {
        &self.0.definition
    }

    pub fn location(&self) -> Option<&StepLocation> {
        self.0.location.as_ref()
    }

    pub fn kind(&self) -> &InvalidDefinitionKind {
        &self.0.kind
    }
}

impl std::fmt::Debug for InvalidDefinitionError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.debug_struct("InvalidDefinitionError")
            .field("definition", &self.0.definition)
            .field("location", &self.0.location)
            .field("kind", &self.0.kind)
            .finish()
    }
}

impl Display for InvalidDefinitionError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "in definition {:?}", self.0.definition)?;
        if let Some(location) = &self.0.location {
            write!(f, " at {}", location)?;
        }
        write!(f, ", {}", self.0.kind)
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LoadErrorKind {
    #[error(transparent)]
    Invalid(#[from] InvalidDefinitionError),
    #[error(transparent)]
    Syntax(#[from] toml::de::Error),
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("a definition named {0:?} is already loaded")]
    AlreadyLoaded(String),
}

/// The error type used when loading a definition into a catalog fails.
///
/// A failed load never changes the definitions that were already loaded.
#[derive(Debug, thiserror::Error)]
pub struct LoadError {
    kind: Box<LoadErrorKind>,
    path: Option<std::path::PathBuf>,
}

impl LoadError {
    pub fn new<E: Into<LoadErrorKind>>(error: E) -> Self {
        Self {
            kind: Box::new(error.into()),
            path: None,
        }
    }

    pub(crate) fn with_path<P: Into<std::path::PathBuf>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn kind(&self) -> &LoadErrorKind {
        &self.kind
    }

    /// The file the definition was loaded from, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        self.path.as_deref()
    }
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{}: ", path.display())?;
        }
        Display::fmt(&self.kind, f)
    }
}

impl<E: Into<LoadErrorKind>> From<E> for LoadError {
    fn from(error: E) -> Self {
        Self::new(error)
    }
}
