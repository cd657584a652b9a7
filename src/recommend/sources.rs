use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use super::entities::{CatalogItem, HistoryEntry};

/// Provides the applications recommendations are picked from. On a phone this is the installed
/// application inventory.
#[cfg_attr(test, mockall::automock)]
pub trait CatalogSource {
    fn catalog(&self) -> Result<Vec<CatalogItem>>;
}

/// Provides past quest choices.
#[cfg_attr(test, mockall::automock)]
pub trait HistorySource {
    fn history(&self) -> Result<Vec<HistoryEntry>>;
}

/// Reads a json array from a file. Serves as both sources, depending on what the file contains.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {path:?}"))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {path:?}"))
    }
}

impl CatalogSource for JsonFileSource {
    fn catalog(&self) -> Result<Vec<CatalogItem>> {
        Self::read(&self.path)
    }
}

impl HistorySource for JsonFileSource {
    fn history(&self) -> Result<Vec<HistoryEntry>> {
        Self::read(&self.path)
    }
}

impl CatalogSource for Vec<CatalogItem> {
    fn catalog(&self) -> Result<Vec<CatalogItem>> {
        Ok(self.clone())
    }
}

impl HistorySource for Vec<HistoryEntry> {
    fn history(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.clone())
    }
}
