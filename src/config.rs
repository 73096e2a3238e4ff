use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::{Error, Result};

/// Store file used when neither flag nor config names one
pub const DEFAULT_STORE_FILE: &str = "knowledgebase.db";

/// Environment variable holding the remote credential
pub const DEFAULT_CREDENTIAL_VAR: &str = "SCICRUNCH_API_KEY";

/// Environment override for the remote base URL
pub const REMOTE_URL_VAR: &str = "KBSYNC_REMOTE_URL";

/// Remote knowledge service used when nothing else is configured
pub const DEFAULT_REMOTE_URL: &str = "http://localhost:8000/sckan";

pub const CONFIG_FILE_NAME: &str = "kbsync.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SyncConfig {
    pub store_file: Option<String>,
    pub remote_url: Option<String>,
    pub credential_var: Option<String>,
}

impl SyncConfig {
    /// Store file name: explicit flag, then config, then the default
    pub fn store_file(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.store_file.clone())
            .unwrap_or_else(|| DEFAULT_STORE_FILE.to_string())
    }

    /// Remote base URL: explicit flag, then environment, then config, then the default
    pub fn remote_url(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| std::env::var(REMOTE_URL_VAR).ok().filter(|v| !v.is_empty()))
            .or_else(|| self.remote_url.clone())
            .unwrap_or_else(|| DEFAULT_REMOTE_URL.to_string())
    }

    pub fn credential_var(&self) -> &str {
        self.credential_var.as_deref().unwrap_or(DEFAULT_CREDENTIAL_VAR)
    }

    /// The remote credential, if its variable is set and non-empty
    pub fn credential(&self) -> Option<String> {
        self.credential_from(|var| std::env::var(var).ok())
    }

    fn credential_from(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        lookup(self.credential_var()).filter(|v| !v.is_empty())
    }
}

pub fn default_config_path(store_dir: &Path) -> PathBuf {
    store_dir.join(CONFIG_FILE_NAME)
}

/// Load the config file. A missing default file is not an error; a missing
/// explicitly named one is.
pub fn load_config(store_dir: &Path, explicit: Option<&Path>) -> Result<SyncConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = default_config_path(store_dir);
            if !path.exists() {
                return Ok(SyncConfig::default());
            }
            path
        }
    };

    let contents = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    let config: SyncConfig = toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Path of the knowledge store inside the store directory
pub fn store_path(store_dir: &Path, store_file: &str) -> PathBuf {
    store_dir.join(store_file)
}

pub fn ensure_store_dir(store_dir: &Path) -> Result<()> {
    if !store_dir.as_os_str().is_empty() && !store_dir.exists() {
        std::fs::create_dir_all(store_dir)?;
    }
    Ok(())
}
