use russh::client::{self, Handle};
use russh::keys::known_hosts::{check_known_hosts_path, learn_known_hosts_path};
use russh::keys::ssh_key;
use russh::keys::PrivateKeyWithHashAlg;
use russh::{ChannelMsg, Disconnect};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::tools::errors::{ConnectError, SessionError};
use crate::tools::session::{LineBuffer, RemoteShell, Transport};
use crate::tools::types::{Auth, CommandOutput, Target};

/// Connection parameters for the SSH transport
#[derive(Debug, Clone)]
pub struct SshOptions {
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub keepalive_interval: Duration,
    pub known_hosts: PathBuf,
}

pub struct SshClient {
    host: String,
    port: u16,
    known_hosts: PathBuf,
}

impl client::Handler for SshClient {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(trust_on_first_use(
            &self.host,
            self.port,
            server_public_key,
            &self.known_hosts,
        ))
    }
}

/// Accept the host key, remembering it the first time the host is seen
///
/// A changed key is still accepted: reflashing an SD card regenerates the
/// device's host keys.
fn trust_on_first_use(host: &str, port: u16, key: &ssh_key::PublicKey, known_hosts: &Path) -> bool {
    match check_known_hosts_path(host, port, key, known_hosts) {
        Ok(true) => debug!("Host key for {}:{} already known", host, port),
        Ok(false) => {
            if let Some(parent) = known_hosts.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            match learn_known_hosts_path(host, port, key, known_hosts) {
                Ok(()) => info!("Learned host key for {}:{}", host, port),
                Err(e) => warn!("Could not record host key for {}:{}: {}", host, port, e),
            }
        }
        Err(e) => warn!(
            "Host key for {}:{} differs from the recorded one ({}), accepting it",
            host, port, e
        ),
    }
    true
}

/// Drive an async russh call from the synchronous command flow
fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// `Transport` opening russh client sessions
pub struct SshTransport {
    options: SshOptions,
}

impl SshTransport {
    pub fn new(options: SshOptions) -> Self {
        Self { options }
    }

    async fn _connect(
        options: &SshOptions,
        target: &Target,
        auth: &Auth,
    ) -> Result<Handle<SshClient>, ConnectError> {
        let config = client::Config {
            keepalive_interval: Some(options.keepalive_interval),
            ..<_>::default()
        };
        let config = Arc::new(config);
        let handler = SshClient {
            host: target.address.clone(),
            port: target.port,
            known_hosts: options.known_hosts.clone(),
        };

        let connecting = client::connect(config, (target.address.as_str(), target.port), handler);
        let mut session = match tokio::time::timeout(options.connect_timeout, connecting).await {
            Ok(Ok(session)) => session,
            Ok(Err(err)) => return Err(ConnectError::Unreachable(err.to_string())),
            Err(_) => {
                return Err(ConnectError::Unreachable(format!(
                    "no answer from {}:{} within {}s",
                    target.address,
                    target.port,
                    options.connect_timeout.as_secs()
                )))
            }
        };

        let unreachable = |err: russh::Error| ConnectError::Unreachable(err.to_string());
        let result = match auth {
            Auth::Password(password) => session
                .authenticate_password(target.user.clone(), password.clone())
                .await
                .map_err(unreachable)?,
            Auth::Key(key_path) => {
                let secret_key = russh::keys::load_secret_key(key_path, None).map_err(|e| {
                    ConnectError::Authentication {
                        reason: format!("cannot load key {}: {}", key_path.display(), e),
                        stored_credential: false,
                    }
                })?;
                let hash = session
                    .best_supported_rsa_hash()
                    .await
                    .map_err(unreachable)?
                    .flatten();
                let key_pair = PrivateKeyWithHashAlg::new(Arc::new(secret_key), hash);
                session
                    .authenticate_publickey(target.user.clone(), key_pair)
                    .await
                    .map_err(unreachable)?
            }
        };

        if !result.success() {
            return Err(ConnectError::Authentication {
                reason: format!("{} authentication rejected for {}", auth.method(), target.user),
                stored_credential: false,
            });
        }
        Ok(session)
    }
}

impl Transport for SshTransport {
    fn open(&self, target: &Target, auth: &Auth) -> Result<Box<dyn RemoteShell>, ConnectError> {
        debug!("Opening SSH session to {} using {}", target, auth.method());
        let handle = block_on(Self::_connect(&self.options, target, auth))?;
        Ok(Box::new(SshShell {
            handle: Some(handle),
            idle_timeout: self.options.idle_timeout,
        }))
    }
}

/// `RemoteShell` running commands on exec channels of one russh session
pub struct SshShell {
    handle: Option<Handle<SshClient>>,
    idle_timeout: Duration,
}

impl SshShell {
    async fn _exec(
        handle: &mut Handle<SshClient>,
        command: &str,
        idle_timeout: Duration,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<CommandOutput, SessionError> {
        let lost = |err: russh::Error| SessionError::ConnectionLost(err.to_string());
        let mut channel = handle.channel_open_session().await.map_err(lost)?;
        channel.exec(true, command).await.map_err(lost)?;

        let mut output = CommandOutput::default();
        let mut stdout = LineBuffer::new();
        let mut stderr = LineBuffer::new();
        loop {
            let msg = match tokio::time::timeout(idle_timeout, channel.wait()).await {
                Ok(Some(msg)) => msg,
                Ok(None) => break,
                Err(_) => {
                    let _ = channel.close().await;
                    return Err(SessionError::IdleTimeout(idle_timeout));
                }
            };
            match msg {
                ChannelMsg::Data { ref data } => {
                    for line in stdout.push(data.as_ref()) {
                        on_line(&line);
                        output.stdout.push(line);
                    }
                }
                // ext == 1 means stderr
                ChannelMsg::ExtendedData { ref data, ext } if ext == 1 => {
                    output.stderr.extend(stderr.push(data.as_ref()));
                }
                ChannelMsg::ExitStatus { exit_status } => {
                    output.exit_status = Some(exit_status);
                }
                _ => {}
            }
        }

        if let Some(line) = stdout.finish() {
            on_line(&line);
            output.stdout.push(line);
        }
        output.stderr.extend(stderr.finish());
        Ok(output)
    }
}

impl RemoteShell for SshShell {
    fn exec(
        &mut self,
        command: &str,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<CommandOutput, SessionError> {
        let idle_timeout = self.idle_timeout;
        let handle = self
            .handle
            .as_mut()
            .ok_or_else(|| SessionError::ConnectionLost("session already closed".into()))?;
        if handle.is_closed() {
            return Err(SessionError::ConnectionLost("remote end closed the session".into()));
        }
        block_on(Self::_exec(handle, command, idle_timeout, on_line))
    }

    fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            let result = block_on(async {
                handle
                    .disconnect(Disconnect::ByApplication, "", "en")
                    .await
            });
            if let Err(e) = result {
                debug!("Disconnect was not clean: {}", e);
            }
        }
    }
}
