use std::path::PathBuf;

use anyhow::{anyhow, Result};
use directories::ProjectDirs;

pub const DEFAULT_CACHE_KEY_PREFIX: &str = "grid-count:";
pub const DEFAULT_MASS_ACTION_SEPARATOR: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridConfig {
    /// Initial page size of a new source; `None` starts unbounded.
    pub page_size: Option<u64>,
    pub cache_key_prefix: String,
    pub mass_action_separator: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            page_size: None,
            cache_key_prefix: DEFAULT_CACHE_KEY_PREFIX.to_string(),
            mass_action_separator: DEFAULT_MASS_ACTION_SEPARATOR.to_string(),
        }
    }
}

impl GridConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_cache_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_key_prefix = prefix.into();
        self
    }

    pub fn with_mass_action_separator(mut self, separator: impl Into<String>) -> Self {
        self.mass_action_separator = separator.into();
        self
    }
}

/// Location of the persistent count cache in the user's local data directory.
pub fn default_cache_path() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("com", "gridsource", "grid-source")
        .ok_or_else(|| anyhow!("unable to resolve data directory"))?;
    Ok(project_dirs.data_local_dir().join("counts.sqlite"))
}
