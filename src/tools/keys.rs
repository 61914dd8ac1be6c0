//! Per-device login keys.
//!
//! After the first password login a fresh RSA keypair is generated, the
//! private half is written to the local SSH directory and the public half is
//! appended to the device's `authorized_keys`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ssh_key::private::{KeypairData, RsaKeypair};
use ssh_key::{LineEnding, PrivateKey};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::tools::errors::KeyError;
use crate::tools::shell_escape::single_quoted;

pub const KEY_COMMENT: &str = "Project Alice RSA key";

/// A keypair freshly written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgedKey {
    /// File name of the private key, stored in the credential record
    pub file_name: String,
    pub private_path: PathBuf,
    pub public_path: PathBuf,
    /// Base64 encoded public key blob
    pub public_blob: String,
}

impl ForgedKey {
    /// The line appended to the remote `authorized_keys`
    pub fn authorized_line(&self) -> String {
        format!("ssh-rsa {} {}", self.public_blob, KEY_COMMENT)
    }

    /// Remote command appending the public key to `~/.ssh/authorized_keys`
    pub fn install_command(&self) -> String {
        format!(
            "echo {} | exec sh -c 'cd ; umask 077 ; mkdir -p .ssh && cat >> ~/.ssh/authorized_keys || exit 1 ; \
             if type restorecon >/dev/null 2>&1 ; then restorecon -F .ssh ~/.ssh/authorized_keys ; fi'",
            single_quoted(&self.authorized_line())
        )
    }

    /// Delete both key files
    pub fn discard(&self) {
        for path in [&self.private_path, &self.public_path] {
            if let Err(e) = fs::remove_file(path) {
                warn!("Could not remove {}: {}", path.display(), e);
            }
        }
    }
}

/// Generates login keys into a directory
pub trait KeyForge {
    fn forge(&self, dir: &Path) -> Result<ForgedKey, KeyError>;
}

pub struct RsaKeyForge {
    bits: usize,
}

impl RsaKeyForge {
    pub fn new(bits: usize) -> Self {
        Self { bits }
    }
}

impl KeyForge for RsaKeyForge {
    fn forge(&self, dir: &Path) -> Result<ForgedKey, KeyError> {
        let generate = |e: ssh_key::Error| KeyError::Generate(e.to_string());

        debug!("Generating {} bit RSA key", self.bits);
        let keypair = RsaKeypair::random(&mut rand::rngs::OsRng, self.bits).map_err(generate)?;
        let private_key = PrivateKey::new(KeypairData::from(keypair), KEY_COMMENT).map_err(generate)?;
        let pem = private_key.to_openssh(LineEnding::LF).map_err(generate)?;
        let public_blob = STANDARD.encode(private_key.public_key().to_bytes().map_err(generate)?);

        let file_name = format!("id_rsa_{}", Uuid::new_v4());
        let private_path = dir.join(&file_name);
        let public_path = dir.join(format!("{}.pub", file_name));

        fs::create_dir_all(dir).map_err(|source| KeyError::Write {
            path: dir.display().to_string(),
            source,
        })?;
        write_private(&private_path, pem.as_bytes())?;
        fs::write(&public_path, &public_blob).map_err(|source| KeyError::Write {
            path: public_path.display().to_string(),
            source,
        })?;

        Ok(ForgedKey {
            file_name,
            private_path,
            public_path,
            public_blob,
        })
    }
}

/// Write a private key readable by the owner only
pub fn write_private(path: &Path, contents: &[u8]) -> Result<(), KeyError> {
    let write_error = |source| KeyError::Write {
        path: path.display().to_string(),
        source,
    };

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path).map_err(write_error)?;
    file.write_all(contents).map_err(write_error)?;
    Ok(())
}
