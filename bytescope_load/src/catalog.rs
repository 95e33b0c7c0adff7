//! The registry of definitions used to identify and walk files.

use crate::definition::Definition;
use crate::error::{LoadError, LoadErrorKind};
use crate::source::{FileSource, Source, TomlSource};
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

/// Indicates where a definition came from.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Origin {
    /// Definitions shipped with the library, tried first during identification.
    System,
    /// Definitions supplied at runtime.
    User,
}

#[derive(Default)]
struct Definitions {
    system: Vec<Arc<Definition>>,
    user: Vec<Arc<Definition>>,
    lookup: rustc_hash::FxHashMap<String, (Origin, usize)>,
}

impl Definitions {
    fn insert(&mut self, origin: Origin, definition: Definition) -> Result<Arc<Definition>, LoadError> {
        if self.lookup.contains_key(definition.name()) {
            return Err(LoadError::new(LoadErrorKind::AlreadyLoaded(definition.name().to_string())));
        }

        let list = match origin {
            Origin::System => &mut self.system,
            Origin::User => &mut self.user,
        };

        let definition = Arc::new(definition);
        self.lookup.insert(definition.name().to_string(), (origin, list.len()));
        list.push(definition.clone());
        Ok(definition)
    }

    fn iter(&self) -> impl Iterator<Item = (Origin, &Arc<Definition>)> {
        let system = self.system.iter().map(|definition| (Origin::System, definition));
        let user = self.user.iter().map(|definition| (Origin::User, definition));
        system.chain(user)
    }
}

/// Keeps track of loaded definitions.
///
/// Loading a definition takes exclusive access to the catalog, while lookups only need shared access, so definitions can be
/// loaded while other threads walk files using definitions that were already loaded.
pub struct Catalog {
    definitions: RwLock<Definitions>,
}

impl Catalog {
    /// Creates a catalog with no definitions.
    pub fn empty() -> Self {
        Self {
            definitions: RwLock::default(),
        }
    }

    /// Creates a catalog containing the system definitions.
    pub fn new() -> Self {
        let catalog = Self::empty();
        for (file_name, text) in crate::builtin::DEFINITIONS {
            if let Err(error) = catalog.load(Origin::System, TomlSource::from(*text)) {
                log::error!("could not load system definition {}: {}", file_name, error);
            }
        }
        catalog
    }

    fn load<S: Source>(&self, origin: Origin, source: S) -> Result<Arc<Definition>, LoadError> {
        let definition = Definition::validate(source.definition().map_err(|error| -> LoadError { error.into() })?)?;
        let mut definitions = self.definitions.write().unwrap_or_else(PoisonError::into_inner);
        let definition = definitions.insert(origin, definition)?;
        log::info!("loaded {:?} definition {:?}", origin, definition.name());
        Ok(definition)
    }

    /// Validates and adds a user definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the source could not be read, if the definition is invalid, or if a definition with the same name
    /// is already loaded. The catalog is left unchanged.
    pub fn load_user<S: Source>(&self, source: S) -> Result<Arc<Definition>, LoadError> {
        self.load(Origin::User, source)
    }

    pub fn load_user_str(&self, text: &str) -> Result<Arc<Definition>, LoadError> {
        self.load_user(TomlSource::from(text))
    }

    pub fn load_user_file<P: AsRef<Path>>(&self, path: P) -> Result<Arc<Definition>, LoadError> {
        let path = path.as_ref();
        self.load_user(FileSource::new(path)).map_err(|error| match error.path() {
            Some(_) => error,
            None => error.with_path(path),
        })
    }

    /// Loads every `.toml` file in a directory as a user definition, in file name order.
    ///
    /// Each file is loaded independently, so one invalid definition does not prevent the others from being loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory itself could not be read.
    pub fn load_user_directory<P: AsRef<Path>>(&self, directory: P) -> Result<Vec<Result<Arc<Definition>, LoadError>>, LoadError> {
        let directory = directory.as_ref();
        let entries = std::fs::read_dir(directory).map_err(|error| LoadError::new(error).with_path(directory))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|error| LoadError::new(error).with_path(directory))?.path();
            if path.is_file() && path.extension().map_or(false, |extension| extension == "toml") {
                paths.push(path);
            }
        }

        paths.sort();
        Ok(paths.iter().map(|path| self.load_user_file(path)).collect())
    }

    /// Gets the definition with the specified name.
    pub fn get(&self, name: &str) -> Option<Arc<Definition>> {
        let definitions = self.definitions.read().unwrap_or_else(PoisonError::into_inner);
        let (origin, index) = *definitions.lookup.get(name)?;
        Some(match origin {
            Origin::System => definitions.system[index].clone(),
            Origin::User => definitions.user[index].clone(),
        })
    }

    /// Lists the loaded definitions, system definitions first, each group in the order it was loaded.
    pub fn list(&self) -> Vec<(Origin, Arc<Definition>)> {
        let definitions = self.definitions.read().unwrap_or_else(PoisonError::into_inner);
        definitions
            .iter()
            .map(|(origin, definition)| (origin, definition.clone()))
            .collect()
    }

    /// Finds the first definition whose magic numbers match the buffer, trying system definitions before user definitions.
    pub fn identify(&self, buffer: &[u8]) -> Option<Arc<Definition>> {
        let definitions = self.definitions.read().unwrap_or_else(PoisonError::into_inner);
        let (origin, definition) = definitions.iter().find(|(_, definition)| definition.matches(buffer))?;
        log::debug!("identified {:?} definition {:?}", origin, definition.name());
        Some(definition.clone())
    }

    pub fn len(&self) -> usize {
        let definitions = self.definitions.read().unwrap_or_else(PoisonError::into_inner);
        definitions.system.len() + definitions.user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Catalog {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.debug_list().entries(self.list().iter().map(|(_, definition)| definition.name())).finish()
    }
}
