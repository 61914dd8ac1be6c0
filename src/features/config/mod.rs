pub mod credential_store;
pub mod settings;

use anyhow::{anyhow, Result};
use directories::BaseDirs;
use std::path::PathBuf;

/// `~/.pacli`, home of every file the CLI keeps
pub fn pacli_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("Could not determine home directory"))?;
    Ok(base_dirs.home_dir().join(".pacli"))
}
