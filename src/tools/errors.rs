/// Error types for alice operations
///
/// The connection core reports failures through these enums so callers can
/// react to the kind of failure (re-prompt, purge a credential, retry after a
/// reboot) instead of matching on message text. Feature code wraps them in
/// `anyhow` with context.
use std::time::Duration;
use thiserror::Error;

/// Errors raised while establishing a session
#[derive(Error, Debug)]
pub enum ConnectError {
    /// Operator input failed validation
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The device refused the credentials
    ///
    /// `stored_credential` is set when the rejected credential came from the
    /// credential store rather than from the operator.
    #[error("Authentication failed: {reason}")]
    Authentication {
        reason: String,
        stored_credential: bool,
    },

    /// The device could not be reached (refused, timed out, handshake failed)
    #[error("Device unreachable: {0}")]
    Unreachable(String),

    /// The operator aborted a prompt
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

impl ConnectError {
    /// True when the failure is attributable to a stored credential record
    pub fn is_stale_credential(&self) -> bool {
        matches!(
            self,
            ConnectError::Authentication {
                stored_credential: true,
                ..
            }
        )
    }
}

/// Errors raised by the command runner
#[derive(Error, Debug)]
pub enum SessionError {
    /// A command was issued while no device is connected
    #[error("No active session, please connect to a device first")]
    NoActiveSession,

    /// The transport failed while running a command; the session is gone
    #[error("Connection to device lost: {0}")]
    ConnectionLost(String),

    /// The command produced no output for longer than the idle timeout
    #[error("Command produced no output for {}s", .0.as_secs())]
    IdleTimeout(Duration),
}

/// Errors related to the credential store file
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to write the store file
    #[error("Failed to write credential store {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize the store
    #[error("Failed to serialize credential store: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors related to key generation and key files
#[derive(Error, Debug)]
pub enum KeyError {
    /// Key generation or encoding failed
    #[error("Key generation failed: {0}")]
    Generate(String),

    /// Writing a key file failed
    #[error("Failed to write key file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by interactive prompts
#[derive(Error, Debug)]
pub enum PromptError {
    /// The operator cancelled the prompt or the terminal went away
    #[error("Prompt aborted: {0}")]
    Aborted(String),
}

impl From<dialoguer::Error> for PromptError {
    fn from(err: dialoguer::Error) -> Self {
        PromptError::Aborted(err.to_string())
    }
}
