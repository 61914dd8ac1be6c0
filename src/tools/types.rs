use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Credentials remembered for one device after the first password login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    /// File name of the private key inside the SSH key directory
    pub key_file: String,
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<String>,
}

/// On-disk layout of the credential store
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub servers: BTreeMap<String, CredentialRecord>,
}

/// Where to connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub address: String,
    pub port: u16,
    pub user: String,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.address, self.port)
    }
}

/// How to authenticate
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    Password(String),
    Key(PathBuf),
}

impl Auth {
    pub fn method(&self) -> &'static str {
        match self {
            Auth::Password(_) => "password",
            Auth::Key(_) => "publickey",
        }
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Password(_) => write!(f, "Password([hidden])"),
            Auth::Key(path) => write!(f, "Key({})", path.display()),
        }
    }
}

/// Everything a remote command left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    /// Exit status, when the server reported one
    pub exit_status: Option<u32>,
}

impl CommandOutput {
    pub fn first_stdout(&self) -> Option<&str> {
        self.stdout.first().map(String::as_str)
    }

    pub fn first_stderr(&self) -> Option<&str> {
        self.stderr.first().map(String::as_str)
    }

    /// Case-insensitive search of stdout and stderr
    pub fn mentions(&self, pattern: &str) -> bool {
        let pattern = pattern.to_lowercase();
        self.stdout
            .iter()
            .chain(self.stderr.iter())
            .any(|line| line.to_lowercase().contains(&pattern))
    }

    /// True when the server reported a non-zero exit status
    pub fn failed(&self) -> bool {
        matches!(self.exit_status, Some(code) if code != 0)
    }
}
