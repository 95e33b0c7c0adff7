//! Contains the trait used to obtain the contents of a definition during loading.

use crate::error::{LoadError, LoadErrorKind};
use bytescope::definition::FormatDefinition;
use std::path::{Path, PathBuf};

pub trait Source {
    type Error: Into<LoadError>;

    fn definition(self) -> Result<FormatDefinition, Self::Error>;
}

impl Source for FormatDefinition {
    type Error = LoadError;

    #[inline]
    fn definition(self) -> Result<FormatDefinition, LoadError> {
        Ok(self)
    }
}

/// A definition written in TOML.
#[derive(Clone, Copy, Debug)]
#[repr(transparent)]
pub struct TomlSource<'a>(&'a str);

impl<'a> From<&'a str> for TomlSource<'a> {
    #[inline]
    fn from(text: &'a str) -> Self {
        Self(text)
    }
}

impl Source for TomlSource<'_> {
    type Error = toml::de::Error;

    fn definition(self) -> Result<FormatDefinition, toml::de::Error> {
        toml::from_str(self.0)
    }
}

/// A file containing a definition written in TOML.
#[derive(Clone, Debug)]
pub struct FileSource(PathBuf);

impl FileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self(path.into())
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Source for FileSource {
    type Error = LoadError;

    fn definition(self) -> Result<FormatDefinition, LoadError> {
        let text = std::fs::read_to_string(&self.0).map_err(|error| LoadError::new(error).with_path(&self.0))?;
        TomlSource::from(text.as_str())
            .definition()
            .map_err(|error| LoadError::new(LoadErrorKind::Syntax(error)).with_path(&self.0))
    }
}
