use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use super::pacli_dir;
use crate::tools::ssh::SshOptions;

/// Tunables read from `~/.pacli/settings.json`; every field is optional
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub connect_timeout_secs: u64,
    /// A remote command showing no output for this long is abandoned
    pub command_idle_timeout_secs: u64,
    pub keepalive_secs: u64,
    pub reconnect_attempts: u32,
    pub reconnect_delay_secs: u64,
    /// Pause between issuing a reboot and the first reconnect attempt
    pub reboot_grace_secs: u64,
    pub key_bits: usize,
    pub ssh_dir: String,
    pub known_hosts_file: String,
    pub scan_timeout_millis: u64,
    pub scan_concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            command_idle_timeout_secs: 900,
            keepalive_secs: 15,
            reconnect_attempts: 5,
            reconnect_delay_secs: 5,
            reboot_grace_secs: 5,
            key_bits: 4096,
            ssh_dir: "~/.ssh".into(),
            known_hosts_file: "~/.pacli/known_hosts".into(),
            scan_timeout_millis: 400,
            scan_concurrency: 64,
        }
    }
}

impl Settings {
    pub fn default_path() -> Result<PathBuf> {
        Ok(pacli_dir()?.join("settings.json"))
    }

    /// Read settings, falling back to defaults when the file is missing or
    /// malformed
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => {
                debug!("No settings at {}, using defaults", path.display());
                return Self::default();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("Ignoring malformed settings {}: {}", path.display(), e);
            Self::default()
        })
    }

    pub fn ssh_dir(&self) -> PathBuf {
        expand(&self.ssh_dir)
    }

    pub fn known_hosts_file(&self) -> PathBuf {
        expand(&self.known_hosts_file)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn reboot_grace(&self) -> Duration {
        Duration::from_secs(self.reboot_grace_secs)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_millis)
    }

    pub fn ssh_options(&self) -> SshOptions {
        SshOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            idle_timeout: Duration::from_secs(self.command_idle_timeout_secs),
            keepalive_interval: Duration::from_secs(self.keepalive_secs),
            known_hosts: self.known_hosts_file(),
        }
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}
