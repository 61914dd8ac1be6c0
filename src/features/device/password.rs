use anyhow::{bail, Result};

use crate::features::context::App;
use crate::features::gate;
use crate::tools::errors::PromptError;
use crate::tools::shell_escape::single_quoted;
use crate::tools::validation::validate_new_password;

/// `alice change-password`
pub fn execute(app: &mut App, current: Option<String>, new: Option<String>) -> Result<()> {
    gate::ensure_connected(app)?;
    app.console.headline("Changing password");

    let (current, new) = match (current, new) {
        (Some(current), Some(new)) => {
            validate_new_password(&new)?;
            (current, new)
        }
        _ => match ask_passwords(app)? {
            Some(passwords) => passwords,
            None => return Ok(()),
        },
    };

    app.console.start_progress("Changing password");
    let output = app.run_secret(&passwd_command(&current, &new))?;
    if !output.mentions("successfully") || output.failed() {
        bail!(
            "Something went wrong: {}",
            output.first_stderr().unwrap_or("passwd gave no answer")
        );
    }
    app.console.success("Password changed!");
    Ok(())
}

/// Current and new password; `None` when the operator gives up on a mismatch
fn ask_passwords(app: &mut App) -> Result<Option<(String, String)>, PromptError> {
    let current = app.ask().secret("Enter current password")?;
    loop {
        let new = app.ask().secret("Enter new password")?;
        if let Err(e) = validate_new_password(&new) {
            app.console.error(&e.to_string());
            continue;
        }
        let confirmation = app.ask().secret("Confirm new password")?;
        if new == confirmation {
            return Ok(Some((current, new)));
        }
        app.console.error("New passwords do not match");
        if !app.ask().confirm("Try again?", true)? {
            return Ok(None);
        }
    }
}

/// `passwd` reads current, new and repeated new password from stdin
fn passwd_command(current: &str, new: &str) -> String {
    format!(
        "printf '%s\\n%s\\n%s\\n' {} {} {} | passwd",
        single_quoted(current),
        single_quoted(new),
        single_quoted(new)
    )
}
