/// Session abstraction for the single connected device
///
/// `Transport` opens authenticated connections, `RemoteShell` runs commands on
/// one of them, and `SessionHolder` owns at most one live `Session` at a time.
/// The SSH implementation lives in `tools::ssh`; tests plug in fakes.
use tracing::debug;

use crate::tools::errors::{ConnectError, SessionError};
use crate::tools::types::{Auth, CommandOutput, Target};

/// An authenticated connection able to run shell commands
pub trait RemoteShell {
    /// Run `command`, handing every complete stdout line to `on_line` as it
    /// arrives
    fn exec(
        &mut self,
        command: &str,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<CommandOutput, SessionError>;

    /// Release the connection
    fn close(&mut self);
}

/// Factory of authenticated connections
pub trait Transport {
    fn open(&self, target: &Target, auth: &Auth) -> Result<Box<dyn RemoteShell>, ConnectError>;
}

/// The live connection to a device
pub struct Session {
    target: Target,
    shell: Box<dyn RemoteShell>,
}

impl Session {
    pub fn new(target: Target, shell: Box<dyn RemoteShell>) -> Self {
        Self { target, shell }
    }

    pub fn address(&self) -> &str {
        &self.target.address
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn shell(&mut self) -> &mut dyn RemoteShell {
        self.shell.as_mut()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("target", &self.target).finish()
    }
}

/// Owner of the one active session
#[derive(Debug, Default)]
pub struct SessionHolder {
    current: Option<Session>,
}

impl SessionHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.current.is_some()
    }

    /// Address of the connected device, if any
    pub fn address(&self) -> Option<&str> {
        self.current.as_ref().map(Session::address)
    }

    pub fn target(&self) -> Option<&Target> {
        self.current.as_ref().map(Session::target)
    }

    pub fn current_mut(&mut self) -> Option<&mut Session> {
        self.current.as_mut()
    }

    /// Install a new session, closing any previous one
    pub fn replace(&mut self, session: Session) {
        self.disconnect();
        debug!("Session established with {}", session.target());
        self.current = Some(session);
    }

    /// Close and drop the active session; returns whether one existed
    pub fn disconnect(&mut self) -> bool {
        match self.current.take() {
            Some(mut session) => {
                debug!("Closing session with {}", session.target());
                session.shell.close();
                true
            }
            None => false,
        }
    }

    /// Drop the session without a clean close (transport already gone)
    pub fn forget(&mut self) {
        self.current = None;
    }
}

/// Splits a byte stream into lines as chunks arrive
///
/// Chunks from the transport are cut at arbitrary positions; complete lines
/// are released in order and the trailing partial line waits for more data.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk, returning the lines it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(Self::decode(&raw[..raw.len() - 1]));
        }
        lines
    }

    /// Flush the trailing partial line at end of stream
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.pending);
        Some(Self::decode(&raw))
    }

    fn decode(raw: &[u8]) -> String {
        let decoded = String::from_utf8_lossy(raw);
        let text: &str = &decoded;
        text.strip_suffix('\r').unwrap_or(text).to_string()
    }
}
