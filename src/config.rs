use crate::catalog::{Catalog, CatalogError};
use crate::store::{FileStore, StorageKeys};
use std::path::PathBuf;

pub const DATA_DIR_ENV: &str = "DRONE_BUILDER_DATA_DIR";
pub const CATALOG_ENV: &str = "DRONE_BUILDER_CATALOG";
pub const PROGRESS_KEY_ENV: &str = "DRONE_BUILDER_PROGRESS_KEY";
pub const CUSTOM_PARTS_KEY_ENV: &str = "DRONE_BUILDER_CUSTOM_PARTS_KEY";
pub const SAVED_BUILDS_KEY_ENV: &str = "DRONE_BUILDER_SAVED_BUILDS_KEY";

const DEFAULT_DATA_DIR: &str = ".drone-builder";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub catalog_path: Option<PathBuf>,
    pub keys: StorageKeys,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            catalog_path: None,
            keys: StorageKeys::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        if let Err(e) = dotenv::dotenv() {
            tracing::trace!("no .env loaded: {e}");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();
        Self {
            data_dir: var(DATA_DIR_ENV).map(PathBuf::from).unwrap_or(defaults.data_dir),
            catalog_path: var(CATALOG_ENV).map(PathBuf::from),
            keys: StorageKeys {
                progress: var(PROGRESS_KEY_ENV).unwrap_or(defaults.keys.progress),
                custom_parts: var(CUSTOM_PARTS_KEY_ENV).unwrap_or(defaults.keys.custom_parts),
                saved_builds: var(SAVED_BUILDS_KEY_ENV).unwrap_or(defaults.keys.saved_builds),
            },
        }
    }

    pub fn load_catalog(&self) -> Result<Catalog, CatalogError> {
        match &self.catalog_path {
            Some(path) => Catalog::from_path(path),
            None => Catalog::bundled(),
        }
    }

    pub fn open_store(&self) -> FileStore {
        FileStore::new(&self.data_dir)
    }
}
