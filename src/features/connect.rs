use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::features::context::App;
use crate::tools::errors::ConnectError;
use crate::tools::prompt::non_empty;
use crate::tools::session::Session;
use crate::tools::types::{Auth, CredentialRecord, Target};
use crate::tools::validation::{for_prompt, validate_ipv4_address, validate_port};

pub const DEFAULT_PORT: u16 = 22;

/// What the operator already told us; anything missing is prompted for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub address: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Default for ConnectRequest {
    fn default() -> Self {
        Self {
            address: None,
            port: DEFAULT_PORT,
            user: None,
            password: None,
        }
    }
}

impl ConnectRequest {
    pub fn to(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            ..Self::default()
        }
    }

    /// Reach the same device again, as the same user
    pub fn again(target: &Target) -> Self {
        Self {
            address: Some(target.address.clone()),
            port: target.port,
            user: Some(target.user.clone()),
            password: None,
        }
    }
}

/// How failures are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Failures are reported; a rejected stored key is purged and the
    /// password flow is tried once
    Interactive,
    /// Failures are returned silently to the caller, which retries
    Supervised,
}

/// `alice connect`
pub fn execute(app: &mut App, request: ConnectRequest) -> Result<()> {
    connect(app, request, Mode::Interactive)?;
    Ok(())
}

/// `alice disconnect`
pub fn disconnect(app: &mut App) -> Result<()> {
    if !app.session.is_connected() {
        app.console.info("Not connected to any device");
        return Ok(());
    }
    app.disconnect();
    Ok(())
}

/// Establish the session, replacing any active one
pub fn connect(app: &mut App, request: ConnectRequest, mode: Mode) -> Result<Target, ConnectError> {
    let address = resolve_address(app, request.address.as_deref(), mode)?;
    validate_port(request.port).map_err(|e| ConnectError::Validation(e.to_string()))?;
    let mut user = request.user.filter(|u| !u.trim().is_empty());
    let password = request.password.filter(|p| !p.is_empty());

    if let Some((key_path, stored_user)) = usable_record(app, &address) {
        let target = Target {
            address: address.clone(),
            port: request.port,
            user: stored_user,
        };
        match open_session(app, &target, Auth::Key(key_path.clone()), true) {
            Ok(()) => {
                app.console.success("Successfully connected to device");
                return Ok(target);
            }
            Err(err) if mode == Mode::Interactive && err.is_stale_credential() => {
                app.console.error(&format!("Failed connecting to device: {}", err));
                app.console
                    .warning("Stored key was refused, removing it and asking for password");
                forget_credential(app, &address);
                remove_key_files(&key_path);
                user = Some(target.user);
            }
            Err(err) => return Err(report(app, mode, err)),
        }
    }

    let user = match user {
        Some(user) => user,
        None => app.ask().text("Please enter username", None, &non_empty)?,
    };
    let password = match password {
        Some(password) => password,
        None => app.ask().secret("Please enter the connection password")?,
    };
    let target = Target {
        address,
        port: request.port,
        user,
    };
    if let Err(err) = open_session(app, &target, Auth::Password(password), false) {
        return Err(report(app, mode, err));
    }
    app.console.success("Successfully connected to device");

    if let Err(e) = install_key(app, &target) {
        warn!("Key installation on {} failed: {:#}", target.address, e);
        app.console.warning(&format!(
            "Could not install a login key on the device, the password will be asked again next time: {:#}",
            e
        ));
    }
    Ok(target)
}

fn resolve_address(app: &mut App, given: Option<&str>, mode: Mode) -> Result<String, ConnectError> {
    if let Some(address) = given.map(str::trim).filter(|a| !a.is_empty()) {
        match validate_ipv4_address(address) {
            Ok(ip) => return Ok(ip.to_string()),
            Err(e) if mode == Mode::Supervised => return Err(ConnectError::Validation(e.to_string())),
            Err(e) => app.console.error(&e.to_string()),
        }
    } else if mode == Mode::Supervised {
        return Err(ConnectError::Validation("no device address".into()));
    }

    let check = for_prompt(validate_ipv4_address);
    Ok(app.ask().text("Please enter the device IP address", None, &check)?)
}

/// The stored key for `address`, purging the record when its key file is gone
fn usable_record(app: &mut App, address: &str) -> Option<(PathBuf, String)> {
    let record = app.store.lookup(address)?;
    let key_path = app.settings.ssh_dir().join(&record.key_file);
    if key_path.is_file() {
        debug!("Using stored key {} for {}", key_path.display(), address);
        return Some((key_path, record.user));
    }

    app.console.error(
        "Declared server is using a non existing RSA key file, removing entry and asking for password",
    );
    forget_credential(app, address);
    None
}

fn forget_credential(app: &mut App, address: &str) {
    match app.store.remove(address) {
        Ok(_) => info!("Removed stored credential for {}", address),
        Err(e) => warn!("Could not remove stored credential for {}: {}", address, e),
    }
}

/// Delete a refused private key and its `.pub` sibling
fn remove_key_files(key_path: &Path) {
    let mut public = key_path.as_os_str().to_owned();
    public.push(".pub");
    for path in [key_path.to_path_buf(), PathBuf::from(public)] {
        match fs::remove_file(&path) {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {}", path.display(), e),
        }
    }
}

fn open_session(app: &mut App, target: &Target, auth: Auth, from_store: bool) -> Result<(), ConnectError> {
    app.session.disconnect();

    info!("Connecting to {} with {}", target, auth.method());
    app.console.start_progress(&format!("Connecting to {}", target.address));
    let opened = app.transport.open(target, &auth);
    app.console.stop_progress();

    match opened {
        Ok(shell) => {
            app.session.replace(Session::new(target.clone(), shell));
            Ok(())
        }
        Err(ConnectError::Authentication { reason, .. }) => Err(ConnectError::Authentication {
            reason,
            stored_credential: from_store,
        }),
        Err(e) => Err(e),
    }
}

fn report(app: &mut App, mode: Mode, err: ConnectError) -> ConnectError {
    match mode {
        Mode::Interactive => app
            .console
            .error(&format!("Failed connecting to device: {}", err)),
        Mode::Supervised => debug!("Connection attempt failed: {}", err),
    }
    err
}

/// Generate a login key, authorize it on the device and remember it
fn install_key(app: &mut App, target: &Target) -> Result<()> {
    let key = app
        .keys
        .forge(&app.settings.ssh_dir())
        .context("Failed generating key")?;

    let installed = app
        .run_quiet(&key.install_command())
        .map_err(anyhow::Error::from)
        .and_then(|output| {
            if output.failed() {
                return Err(anyhow!(
                    "authorized_keys update failed: {}",
                    output.first_stderr().unwrap_or("no details")
                ));
            }
            Ok(())
        });
    if let Err(e) = installed {
        key.discard();
        return Err(e);
    }

    let record = CredentialRecord {
        key_file: key.file_name.clone(),
        user: target.user.clone(),
        added_at: Some(chrono::Utc::now().to_rfc3339()),
    };
    app.store
        .upsert(&target.address, record)
        .context("Failed saving credential")?;
    info!("Installed key {} for {}", key.file_name, target);
    Ok(())
}
