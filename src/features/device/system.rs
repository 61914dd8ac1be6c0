use anyhow::Result;

use crate::features::context::App;
use crate::features::device::reboot::reboot_and_reconnect;
use crate::features::gate;

/// `alice update-system`
pub fn update(app: &mut App) -> Result<()> {
    gate::ensure_connected(app)?;
    app.console.headline("Updating device's system, please wait");
    app.console.start_progress("Updating");
    app.run("sudo apt-get update && sudo apt-get upgrade -y")?;
    app.console.success("Device updated!");
    Ok(())
}

/// `alice upgrade-system`, followed by a reboot
pub fn upgrade(app: &mut App) -> Result<()> {
    gate::ensure_connected(app)?;
    app.console.headline("Upgrading device's system, please wait");
    app.console.start_progress("Upgrading");
    app.run("sudo apt-get update && sudo apt-get dist-upgrade -y")?;
    app.console.success("Device upgraded!");

    app.console.headline("Rebooting device, please wait");
    reboot_and_reconnect(app)
}
