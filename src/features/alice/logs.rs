use anyhow::{bail, Result};
use tracing::warn;

use crate::features::context::App;
use crate::features::gate;
use crate::features::reconnect::try_reconnect;
use crate::tools::errors::SessionError;

pub const DEFAULT_LINES: usize = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    Alice,
    System,
}

impl LogSource {
    pub fn path(&self) -> &'static str {
        match self {
            LogSource::Alice => "~/ProjectAlice/var/logs/logs.log",
            LogSource::System => "/var/log/syslog",
        }
    }
}

/// `alice logs <alice|system>`
///
/// A session lost while reading gets one reconnect round and one more read.
pub fn execute(app: &mut App, source: LogSource, lines: usize) -> Result<()> {
    gate::ensure_connected(app)?;
    let target = app
        .session
        .target()
        .cloned()
        .ok_or(SessionError::NoActiveSession)?;
    let command = format!("tail -n {} {}", lines, source.path());

    match app.run(&command) {
        Ok(_) => Ok(()),
        Err(SessionError::ConnectionLost(reason)) => {
            warn!("Lost {} while reading logs: {}", target, reason);
            app.disconnect();
            if !try_reconnect(app, &target) {
                bail!("Connection to Alice lost");
            }
            app.run(&command)?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
