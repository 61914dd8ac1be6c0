use anyhow::{bail, Result};

use crate::features::context::App;
use crate::features::device::reboot::reboot_and_reconnect;
use crate::features::gate;
use crate::tools::shell_escape::single_quoted;
use crate::tools::validation::{for_prompt, validate_hostname};

const DEFAULT_HOSTNAME: &str = "ProjectAlice";

/// `alice change-hostname`
pub fn execute(app: &mut App, hostname: Option<String>) -> Result<()> {
    if let Some(name) = &hostname {
        validate_hostname(name)?;
    }
    gate::ensure_connected(app)?;
    app.console.headline("Changing device's hostname");

    let hostname = match hostname {
        Some(name) => name,
        None => {
            let check = for_prompt(validate_hostname);
            app.ask()
                .text("Enter new device name", Some(DEFAULT_HOSTNAME), &check)?
        }
    };

    app.console.start_progress("Renaming");
    app.run(&format!(
        "sudo hostnamectl set-hostname {}",
        single_quoted(&hostname)
    ))?;
    reboot_and_reconnect(app)?;

    let output = app.run_quiet("hostname")?;
    let current = output.first_stdout().unwrap_or_default().trim();
    if !current.eq_ignore_ascii_case(hostname.trim()) {
        bail!("Failed changing device name...");
    }
    app.console.success("Device name changed!");
    Ok(())
}
