//! Application context shared by every feature.
//!
//! `App` owns the single session, the credential store and the settings,
//! together with the collaborators that touch the outside world (SSH
//! transport, key generation, network scanning, terminal I/O). Features take
//! `&mut App`; nothing lives in globals.

use std::time::Duration;
use tracing::{debug, warn};

use crate::features::config::credential_store::CredentialStore;
use crate::features::config::settings::Settings;
use crate::tools::console::{Console, Terminal};
use crate::tools::errors::SessionError;
use crate::tools::keys::{KeyForge, RsaKeyForge};
use crate::tools::network::{Scanner, TcpScanner};
use crate::tools::prompt::{DialoguerPrompter, Prompter};
use crate::tools::session::{SessionHolder, Transport};
use crate::tools::ssh::SshTransport;
use crate::tools::types::CommandOutput;

pub struct App {
    pub session: SessionHolder,
    pub store: CredentialStore,
    pub settings: Settings,
    pub transport: Box<dyn Transport>,
    pub keys: Box<dyn KeyForge>,
    pub scanner: Box<dyn Scanner>,
    pub console: Box<dyn Console>,
    pub prompter: Box<dyn Prompter>,
    /// Blocking pause between reconnect attempts
    pub sleep: Box<dyn FnMut(Duration)>,
}

impl App {
    /// Context wired to the real terminal, network and SSH stack
    pub fn terminal(settings: Settings, store: CredentialStore) -> Self {
        Self {
            session: SessionHolder::new(),
            transport: Box::new(SshTransport::new(settings.ssh_options())),
            keys: Box::new(RsaKeyForge::new(settings.key_bits)),
            scanner: Box::new(TcpScanner::new(
                settings.scan_timeout(),
                settings.scan_concurrency,
            )),
            console: Box::new(Terminal::new()),
            prompter: Box::new(DialoguerPrompter),
            sleep: Box::new(std::thread::sleep),
            store,
            settings,
        }
    }

    /// The prompter, with the progress indicator stopped
    pub fn ask(&mut self) -> &mut dyn Prompter {
        self.console.stop_progress();
        self.prompter.as_mut()
    }

    pub fn pause(&mut self, duration: Duration) {
        if !duration.is_zero() {
            (self.sleep)(duration);
        }
    }

    /// Run a command on the connected device, echoing its output
    pub fn run(&mut self, command: &str) -> Result<CommandOutput, SessionError> {
        self.execute(command, true, false)
    }

    /// Run a command on the connected device without echoing its output
    pub fn run_quiet(&mut self, command: &str) -> Result<CommandOutput, SessionError> {
        self.execute(command, false, false)
    }

    /// Like `run_quiet`, for commands carrying secrets; the command text is
    /// never logged
    pub fn run_secret(&mut self, command: &str) -> Result<CommandOutput, SessionError> {
        self.execute(command, false, true)
    }

    fn execute(
        &mut self,
        command: &str,
        stream: bool,
        secret: bool,
    ) -> Result<CommandOutput, SessionError> {
        let session = self
            .session
            .current_mut()
            .ok_or(SessionError::NoActiveSession)?;
        let shown = if secret { "<redacted>" } else { command };
        debug!("Running on {}: {}", session.address(), shown);

        let console = &mut self.console;
        let result = session.shell().exec(command, &mut |line| {
            if stream {
                console.remote_line(line);
            }
        });

        match &result {
            Ok(output) => debug!(
                "Command finished with status {:?} ({} stdout, {} stderr lines)",
                output.exit_status,
                output.stdout.len(),
                output.stderr.len()
            ),
            Err(SessionError::ConnectionLost(reason)) => {
                warn!("Session lost while running a command: {}", reason);
                self.session.forget();
            }
            Err(e) => warn!("Remote command failed: {}", e),
        }
        result
    }

    /// Close the active session, if any
    pub fn disconnect(&mut self) {
        if self.session.disconnect() {
            self.console.success("Disconnected");
        }
    }
}
