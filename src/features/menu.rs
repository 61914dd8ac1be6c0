//! The interactive main menu, also the landing screen after one-shot
//! subcommands.

use anyhow::Result;
use tracing::debug;

use crate::features::alice::logs::{self, LogSource, DEFAULT_LINES};
use crate::features::alice::service::{self, ServiceAction};
use crate::features::alice::install;
use crate::features::connect::{self, ConnectRequest};
use crate::features::context::App;
use crate::features::device::{hostname, password, reboot, sound_device, sound_test, system};
use crate::features::discover::{self, DiscoverOptions};
use crate::features::sd_card::{self, SdCardOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Discover,
    Connect,
    Disconnect,
    PrepareSdCard,
    ChangePassword,
    ChangeHostname,
    InstallSoundDevice,
    SoundTest,
    InstallAlice,
    Service(ServiceAction),
    UpdateAlice,
    AliceLogs,
    SystemLogs,
    ReportBug,
    UpdateSystem,
    UpgradeSystem,
    Reboot,
    UninstallSoundDevice,
    Exit,
}

impl MenuItem {
    pub const ALL: [MenuItem; 24] = [
        MenuItem::Discover,
        MenuItem::Connect,
        MenuItem::Disconnect,
        MenuItem::PrepareSdCard,
        MenuItem::ChangePassword,
        MenuItem::ChangeHostname,
        MenuItem::InstallSoundDevice,
        MenuItem::SoundTest,
        MenuItem::InstallAlice,
        MenuItem::Service(ServiceAction::Start),
        MenuItem::Service(ServiceAction::Restart),
        MenuItem::Service(ServiceAction::Stop),
        MenuItem::Service(ServiceAction::Enable),
        MenuItem::Service(ServiceAction::Disable),
        MenuItem::Service(ServiceAction::Status),
        MenuItem::UpdateAlice,
        MenuItem::AliceLogs,
        MenuItem::SystemLogs,
        MenuItem::ReportBug,
        MenuItem::UpdateSystem,
        MenuItem::UpgradeSystem,
        MenuItem::Reboot,
        MenuItem::UninstallSoundDevice,
        MenuItem::Exit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MenuItem::Discover => "Discover devices on network",
            MenuItem::Connect => "Connect to a device",
            MenuItem::Disconnect => "Disconnect from the device",
            MenuItem::PrepareSdCard => "Prepare your SD card",
            MenuItem::ChangePassword => "Change device's password",
            MenuItem::ChangeHostname => "Set device's name",
            MenuItem::InstallSoundDevice => "Install your sound device",
            MenuItem::SoundTest => "Sound test",
            MenuItem::InstallAlice => "Install Alice",
            MenuItem::Service(ServiceAction::Start) => "Start Alice",
            MenuItem::Service(ServiceAction::Restart) => "Restart Alice",
            MenuItem::Service(ServiceAction::Stop) => "Stop Alice",
            MenuItem::Service(ServiceAction::Enable) => "Enable Alice service",
            MenuItem::Service(ServiceAction::Disable) => "Disable Alice service",
            MenuItem::Service(ServiceAction::Status) => "Alice service status",
            MenuItem::UpdateAlice => "Update Alice",
            MenuItem::AliceLogs => "Display Alice logs",
            MenuItem::SystemLogs => "Display system logs",
            MenuItem::ReportBug => "Enable bug report for next session",
            MenuItem::UpdateSystem => "Update system",
            MenuItem::UpgradeSystem => "Upgrade system",
            MenuItem::Reboot => "Reboot device",
            MenuItem::UninstallSoundDevice => "Uninstall your sound device",
            MenuItem::Exit => "Exit",
        }
    }

    fn run(&self, app: &mut App) -> Result<()> {
        match *self {
            MenuItem::Discover => discover::execute(app, &DiscoverOptions::default()),
            MenuItem::Connect => connect::execute(app, ConnectRequest::default()),
            MenuItem::Disconnect => connect::disconnect(app),
            MenuItem::PrepareSdCard => sd_card::execute(app, SdCardOptions::default()),
            MenuItem::ChangePassword => password::execute(app, None, None),
            MenuItem::ChangeHostname => hostname::execute(app, None),
            MenuItem::InstallSoundDevice => sound_device::install(app, None),
            MenuItem::SoundTest => sound_test::execute(app),
            MenuItem::InstallAlice => install::execute(app, false),
            MenuItem::Service(action) => service::systemctl(app, action),
            MenuItem::UpdateAlice => service::update_alice(app),
            MenuItem::AliceLogs => logs::execute(app, LogSource::Alice, DEFAULT_LINES),
            MenuItem::SystemLogs => logs::execute(app, LogSource::System, DEFAULT_LINES),
            MenuItem::ReportBug => service::report_bug(app),
            MenuItem::UpdateSystem => system::update(app),
            MenuItem::UpgradeSystem => system::upgrade(app),
            MenuItem::Reboot => reboot::execute(app),
            MenuItem::UninstallSoundDevice => sound_device::uninstall(app, None),
            MenuItem::Exit => Ok(()),
        }
    }
}

/// Loop over the main menu until the operator exits
///
/// Errors of an action are printed and the menu comes back; leaving the
/// menu closes the session.
pub fn run(app: &mut App) -> Result<()> {
    let labels: Vec<String> = MenuItem::ALL
        .iter()
        .map(|item| item.label().to_string())
        .collect();

    loop {
        let selected = match app.ask().select("Please select an option", &labels) {
            Ok(selected) => selected,
            Err(e) => {
                debug!("Leaving the menu: {}", e);
                None
            }
        };
        let item = selected
            .and_then(|index| MenuItem::ALL.get(index).copied())
            .unwrap_or(MenuItem::Exit);
        if item == MenuItem::Exit {
            break;
        }

        debug!("Menu action: {:?}", item);
        if let Err(e) = item.run(app) {
            app.console.error(&format!("{:#}", e));
        }
        if app.ask().pause("Press enter to return to the main menu").is_err() {
            break;
        }
    }

    app.disconnect();
    Ok(())
}
