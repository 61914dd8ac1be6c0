use anyhow::{bail, Result};
use tracing::debug;

use crate::features::context::App;
use crate::features::gate;
use crate::features::reconnect::try_reconnect;
use crate::tools::errors::SessionError;

/// `alice reboot`
pub fn execute(app: &mut App) -> Result<()> {
    gate::ensure_connected(app)?;
    app.console.headline("Rebooting device, please wait");
    reboot_and_reconnect(app)
}

/// Reboot the connected device and wait until it accepts a session again
pub fn reboot_and_reconnect(app: &mut App) -> Result<()> {
    let target = app
        .session
        .target()
        .cloned()
        .ok_or(SessionError::NoActiveSession)?;

    app.console.start_progress("Rebooting");
    match app.run("sudo reboot") {
        Ok(_) => {}
        // the device usually drops us before answering
        Err(e @ (SessionError::ConnectionLost(_) | SessionError::IdleTimeout(_))) => {
            debug!("Reboot cut the session: {}", e)
        }
        Err(e) => return Err(e.into()),
    }
    app.disconnect();
    app.pause(app.settings.reboot_grace());

    if !try_reconnect(app, &target) {
        bail!("Failed rebooting device");
    }
    app.console.success("Device rebooted!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, Script, TestBed};
    use std::time::Duration;

    const PI: &str = "192.168.1.50";

    #[test]
    fn test_reboot_reconnects_on_third_attempt() {
        let bed = TestBed::new();
        bed.remember(PI, "pi");
        bed.network
            .then(PI, vec![Reply::Accept, Reply::Unreachable, Reply::Unreachable, Reply::Accept]);
        bed.network.respond("sudo reboot", Script::Drop);
        let mut app = bed.connected_app(PI);

        execute(&mut app).unwrap();
        assert_eq!(bed.network.attempts().len(), 4);
        assert_eq!(app.session.address(), Some(PI));
        assert!(bed.console.contains("attempt 3 of 5"));
        assert!(!bed.console.contains("attempt 4 of 5"));
        assert!(bed.console.contains("✔ Device rebooted!"));
        assert_eq!(
            bed.sleeps(),
            vec![Duration::from_secs(5), Duration::from_secs(5), Duration::from_secs(5)]
        );
    }

    #[test]
    fn test_reboot_fails_after_exhausting_attempts() {
        let bed = TestBed::new();
        bed.remember(PI, "pi");
        bed.network.then(PI, vec![Reply::Accept]);
        bed.network.reply(PI, Reply::Unreachable);
        let mut app = bed.connected_app(PI);

        let err = execute(&mut app).unwrap_err();
        assert_eq!(err.to_string(), "Failed rebooting device");
        assert!(!app.session.is_connected());
        assert_eq!(bed.network.attempts().len(), 6);
    }

    #[test]
    fn test_reboot_without_session_is_gated() {
        let bed = TestBed::new();
        let mut app = bed.app();

        assert!(execute(&mut app).is_err());
        assert!(!bed.network.ran("sudo reboot"));
    }
}
