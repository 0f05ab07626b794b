/**
 * Where the application keeps its state and which backend stores it.
 *
 * Settings are read from the environment (`BILBAKALIM_DIR`, `BILBAKALIM_STORE`) and can
 * be overridden from the command line.
 *
 * Version: October 2026
 */
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use super::common::{ExamError, Result};
use super::persistence::{JsonFileStore, KeyValueStore, SqliteStore};

pub const DIR_VAR: &str = "BILBAKALIM_DIR";
pub const STORE_VAR: &str = "BILBAKALIM_STORE";
const APP_DIR_NAME: &str = "bilbakalim";
const SQLITE_FILE_NAME: &str = "bilbakalim.sqlite3";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Json,
    Sqlite,
}

impl FromStr for StoreKind {
    type Err = ExamError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(StoreKind::Json),
            "sqlite" => Ok(StoreKind::Sqlite),
            _ => Err(ExamError::InvalidStore(String::from(s))),
        }
    }
}

impl Default for StoreKind {
    fn default() -> Self {
        StoreKind::Json
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub store: StoreKind,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(env::var(DIR_VAR).ok(), env::var(STORE_VAR).ok())
    }

    /// Build a configuration from raw setting values. Unset or empty values fall back
    /// to the defaults.
    pub fn from_vars(dir: Option<String>, store: Option<String>) -> Result<Self> {
        let data_dir = match dir {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => default_data_dir(),
        };
        let store = match store {
            Some(store) if !store.is_empty() => store.parse()?,
            _ => StoreKind::default(),
        };
        Ok(Self { data_dir, store })
    }

    /// Apply the command-line flags on top of this configuration.
    pub fn with_overrides(mut self, dir: Option<&Path>, store: Option<&str>) -> Result<Self> {
        if let Some(dir) = dir {
            self.data_dir = dir.to_path_buf();
        }
        if let Some(store) = store {
            self.store = store.parse()?;
        }
        Ok(self)
    }

    /// Return the data directory, creating it if it doesn't exist.
    pub fn require_data_dir(&self) -> Result<&Path> {
        if !self.data_dir.exists() {
            fs::create_dir_all(&self.data_dir)
                .or(Err(ExamError::CannotMakeAppDir(self.data_dir.clone())))?;
        }
        Ok(&self.data_dir)
    }

    pub fn open_store(&self) -> Result<Box<dyn KeyValueStore>> {
        let dir = self.require_data_dir()?;
        debug!(dir = %dir.display(), store = ?self.store, "opening store");
        match self.store {
            StoreKind::Json => Ok(Box::new(JsonFileStore::new(dir))),
            StoreKind::Sqlite => {
                let mut path = dir.to_path_buf();
                path.push(SQLITE_FILE_NAME);
                Ok(Box::new(SqliteStore::open(&path)?))
            }
        }
    }
}

fn default_data_dir() -> PathBuf {
    let mut dirpath = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    dirpath.push(APP_DIR_NAME);
    dirpath
}
