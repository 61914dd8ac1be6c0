use anyhow::Result;
use std::fmt;

use crate::features::context::App;
use crate::features::gate;

pub const SERVICE: &str = "ProjectAlice";
pub const INSTALL_DIR: &str = "~/ProjectAlice";

/// Actions accepted by `systemctl` for the Alice unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
    Enable,
    Disable,
    Status,
}

impl ServiceAction {
    pub fn name(&self) -> &'static str {
        match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
            ServiceAction::Enable => "enable",
            ServiceAction::Disable => "disable",
            ServiceAction::Status => "status",
        }
    }

    pub fn command(&self) -> String {
        format!("sudo systemctl {} {}", self.name(), SERVICE)
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `alice systemctl <action>`
pub fn systemctl(app: &mut App, action: ServiceAction) -> Result<()> {
    gate::ensure_connected(app)?;
    app.console
        .headline(&format!("Service \"{}\", please wait", action));
    app.console.start_progress("Waiting for systemd");
    app.run(&action.command())?;
    app.console.success("Done!");
    Ok(())
}

/// `alice update-alice`: pull Alice and her submodules with the service stopped
pub fn update_alice(app: &mut App) -> Result<()> {
    gate::ensure_connected(app)?;
    app.console.headline("Updating Alice, please wait");
    app.console.start_progress("Updating");

    app.run_quiet(&ServiceAction::Stop.command())?;
    app.run(&format!(
        "cd {} && git pull && git submodule foreach git pull",
        INSTALL_DIR
    ))?;
    app.run_quiet(&ServiceAction::Start.command())?;

    app.console.success("Alice updated!");
    Ok(())
}

/// `alice report-bug`: arm Alice's built-in bug reporter for the next session
pub fn report_bug(app: &mut App) -> Result<()> {
    gate::ensure_connected(app)?;
    app.console.headline("Enabling inbuilt bug reporter");
    app.console.start_progress("Enabling");
    app.run_quiet(&format!("touch {}/alice.bugreport", INSTALL_DIR))?;

    app.console.headline("Restarting Alice");
    app.run_quiet(&ServiceAction::Restart.command())?;

    app.console.success(
        "Bug reporter enabled and Alice restarted. As soon as a fatal error occurs and/or she is stopped, the session report will be posted to Github!",
    );
    Ok(())
}
