use anyhow::Result;
use std::fmt;

use crate::features::context::App;
use crate::features::device::reboot::reboot_and_reconnect;
use crate::features::gate;

const VOICECARD_REPO: &str = "https://github.com/HinTak/seeed-voicecard.git";
const VOICECARD_DIR: &str = "~/seeed-voicecard/";
const VOICECARD_RELEASE: &str = "v5.9";

/// Supported audio hats; every one of them uses the seeed voicecard driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundDevice {
    Respeaker2,
    Respeaker4,
    Respeaker4MicLinearArray,
    Respeaker6MicArray,
}

impl SoundDevice {
    pub const ALL: [SoundDevice; 4] = [
        SoundDevice::Respeaker2,
        SoundDevice::Respeaker4,
        SoundDevice::Respeaker4MicLinearArray,
        SoundDevice::Respeaker6MicArray,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SoundDevice::Respeaker2 => "respeaker2",
            SoundDevice::Respeaker4 => "respeaker4",
            SoundDevice::Respeaker4MicLinearArray => "respeaker4MicLinearArray",
            SoundDevice::Respeaker6MicArray => "respeaker6MicArray",
        }
    }
}

impl fmt::Display for SoundDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `alice install-sound-device`
pub fn install(app: &mut App, device: Option<SoundDevice>) -> Result<()> {
    gate::ensure_connected(app)?;
    app.console.headline("Installing audio hardware");
    let Some(device) = choose_device(app, device)? else {
        return Ok(());
    };

    app.console.start_progress(&format!("Installing {}", device));
    if has_checkout(app)? {
        remove_checkout(app)?;
    }
    app.run(&format!("git clone {} {}", VOICECARD_REPO, VOICECARD_DIR))?;
    app.run(&format!(
        "git -C {dir} checkout {release} && git -C {dir} pull",
        dir = VOICECARD_DIR,
        release = VOICECARD_RELEASE
    ))?;
    app.run(&format!("cd {} && sudo ./install.sh", VOICECARD_DIR))?;

    reboot_and_reconnect(app)?;
    app.console.success("Device installed!");
    Ok(())
}

/// `alice uninstall-sound-device`
pub fn uninstall(app: &mut App, device: Option<SoundDevice>) -> Result<()> {
    gate::ensure_connected(app)?;
    app.console.headline("Uninstalling audio hardware");
    let Some(device) = choose_device(app, device)? else {
        return Ok(());
    };

    app.console.start_progress(&format!("Uninstalling {}", device));
    if !has_checkout(app)? {
        app.console
            .info("No sound device driver installed, nothing to do");
        return Ok(());
    }
    remove_checkout(app)?;

    reboot_and_reconnect(app)?;
    app.console.success("Device uninstalled!");
    Ok(())
}

fn choose_device(app: &mut App, device: Option<SoundDevice>) -> Result<Option<SoundDevice>> {
    if device.is_some() {
        return Ok(device);
    }
    let items: Vec<String> = SoundDevice::ALL.iter().map(ToString::to_string).collect();
    let selected = app.ask().select("Select your device", &items)?;
    let device = selected.and_then(|index| SoundDevice::ALL.get(index).copied());
    if device.is_none() {
        app.console
            .error("Cannot continue without device information");
    }
    Ok(device)
}

fn has_checkout(app: &mut App) -> Result<bool> {
    let output = app.run_quiet(&format!("test -d {} && echo \"1\"", VOICECARD_DIR))?;
    Ok(output.first_stdout().map(str::trim) == Some("1"))
}

fn remove_checkout(app: &mut App) -> Result<()> {
    app.run(&format!("cd {} && sudo ./uninstall.sh", VOICECARD_DIR))?;
    app.run(&format!("sudo rm -rf {}", VOICECARD_DIR))?;
    Ok(())
}
