use tracing::{debug, info, warn};

use crate::features::connect::{connect, ConnectRequest, Mode};
use crate::features::context::App;
use crate::tools::errors::ConnectError;
use crate::tools::types::Target;

/// Poll a device that is coming back (typically from a reboot) until a
/// session is established again
///
/// Makes at most `reconnect_attempts` attempts, pausing `reconnect_delay`
/// between two of them. Returns false once they are exhausted, or right away
/// when the operator aborts a prompt.
pub fn try_reconnect(app: &mut App, target: &Target) -> bool {
    let attempts = app.settings.reconnect_attempts;
    let delay = app.settings.reconnect_delay();

    for attempt in 1..=attempts {
        app.console.info(&format!(
            "Trying to contact device, attempt {} of {}...",
            attempt, attempts
        ));
        match connect(app, ConnectRequest::again(target), Mode::Supervised) {
            Ok(_) => {
                info!("Reconnected to {} on attempt {}", target, attempt);
                return true;
            }
            Err(ConnectError::Prompt(e)) => {
                warn!("Reconnect to {} aborted: {}", target, e);
                return false;
            }
            Err(e) => debug!("Attempt {} on {} failed: {}", attempt, target, e),
        }
        if attempt < attempts {
            app.pause(delay);
        }
    }

    warn!("Gave up reconnecting to {} after {} attempts", target, attempts);
    false
}
