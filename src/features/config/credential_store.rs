use crate::tools::errors::StoreError;
use crate::tools::types::{CredentialRecord, CredentialsConfig};
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::pacli_dir;

/// Per-host login keys, persisted as one JSON document
///
/// The whole file is rewritten on every change. There is no locking: a single
/// operator drives a single process.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    config: CredentialsConfig,
}

impl CredentialStore {
    pub fn default_path() -> Result<PathBuf> {
        Ok(pacli_dir()?.join("configs.json"))
    }

    /// Read the store, creating an empty one when absent
    ///
    /// Never fails: an unreadable or corrupt file is treated as empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if !path.exists() {
            let store = Self {
                path,
                config: CredentialsConfig::default(),
            };
            if let Err(e) = store.save() {
                warn!("{}", e);
            }
            return store;
        }

        let config = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring corrupt credential store {}: {}", path.display(), e);
                CredentialsConfig::default()
            }),
            Err(e) => {
                warn!("Could not read credential store {}: {}", path.display(), e);
                CredentialsConfig::default()
            }
        };
        debug!("Loaded {} credential(s) from {}", config.servers.len(), path.display());
        Self { path, config }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lookup(&self, address: &str) -> Option<CredentialRecord> {
        self.config.servers.get(address).cloned()
    }

    pub fn upsert(&mut self, address: &str, record: CredentialRecord) -> Result<(), StoreError> {
        self.config.servers.insert(address.to_string(), record);
        self.save()
    }

    /// Forget a host; returns whether it was known
    pub fn remove(&mut self, address: &str) -> Result<bool, StoreError> {
        if self.config.servers.remove(address).is_none() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.config.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.config.servers.is_empty()
    }

    fn save(&self) -> Result<(), StoreError> {
        let write_error = |source| StoreError::Write {
            path: self.path.display().to_string(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let content = serde_json::to_string_pretty(&self.config)?;
        fs::write(&self.path, content).map_err(write_error)
    }
}
