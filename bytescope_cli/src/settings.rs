//! Settings read from an optional TOML file, which command line arguments take precedence over.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("could not read settings file {path:?}: {source}")]
    IO { path: PathBuf, source: std::io::Error },
    #[error("invalid settings file {path:?}: {source}")]
    Syntax { path: PathBuf, source: toml::de::Error },
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Files larger than this many bytes are not inspected.
    pub max_input_size: u64,
    /// Directories containing user-supplied format definitions.
    pub definition_directories: Vec<PathBuf>,
    /// Whether embedded files are inspected too.
    pub recursive: bool,
    pub max_embedding_depth: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_input_size: 10 * 1024 * 1024,
            definition_directories: Vec::new(),
            recursive: false,
            max_embedding_depth: 4,
        }
    }
}

impl Settings {
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::IO {
            path: path.to_path_buf(),
            source,
        })?;

        let settings = Self::parse(&text).map_err(|source| Error::Syntax {
            path: path.to_path_buf(),
            source,
        })?;

        log::debug!("loaded settings from {:?}: {:?}", path, settings);
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_settings_use_defaults() {
        let settings = Settings::parse("recursive = true\ndefinition_directories = [\"defs\"]").unwrap();
        assert!(settings.recursive);
        assert_eq!(settings.definition_directories, vec![PathBuf::from("defs")]);
        assert_eq!(settings.max_input_size, 10 * 1024 * 1024);
        assert_eq!(settings.max_embedding_depth, 4);
        assert_eq!(Settings::parse("").unwrap(), Settings::default());
    }

    #[test]
    fn unknown_settings_are_rejected() {
        assert!(Settings::parse("colour = \"red\"").is_err());
        assert!(Settings::parse("max_input_size = -1").is_err());
    }
}
