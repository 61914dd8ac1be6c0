use tracing::warn;

use crate::features::context::App;
use crate::features::discover::{self, DiscoverOptions};
use crate::tools::errors::SessionError;

/// Precondition of every device-mutating feature
///
/// Without a session the operator is routed through discovery and connect.
/// The caller's body must only run when this returns `Ok`.
pub fn ensure_connected(app: &mut App) -> Result<(), SessionError> {
    if app.session.is_connected() {
        return Ok(());
    }

    app.console.error("Please connect to a device first");
    if let Err(e) = discover::discover_and_connect(app, &DiscoverOptions::default()) {
        warn!("Connecting from the gate failed: {:#}", e);
    }

    if app.session.is_connected() {
        Ok(())
    } else {
        Err(SessionError::NoActiveSession)
    }
}
