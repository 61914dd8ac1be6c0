use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::features::context::App;
use crate::tools::prompt::non_empty;
use crate::tools::validation::{for_prompt, validate_country_code, validate_directory_exists};

#[derive(Debug, Clone, Default)]
pub struct SdCardOptions {
    /// Mount point of the card's boot partition
    pub boot_path: Option<String>,
    pub ssid: Option<String>,
    pub country: Option<String>,
}

/// Headless Wi-Fi and SSH setup written to a Raspberry Pi OS boot partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiSetup {
    pub ssid: String,
    pub country: String,
    pub key: String,
}

impl WifiSetup {
    pub fn wpa_supplicant_conf(&self) -> String {
        format!(
            "country={}\n\
             ctrl_interface=DIR=/var/run/wpa_supplicant GROUP=netdev\n\
             update_config=1\n\
             network={{\n\
             \tssid=\"{}\"\n\
             \tscan_ssid=1\n\
             \tpsk=\"{}\"\n\
             \tkey_mgmt=WPA-PSK\n\
             }}",
            self.country, self.ssid, self.key
        )
    }

    /// Write the empty `ssh` marker and `wpa_supplicant.conf` into `boot`
    pub fn write_to(&self, boot: &Path) -> Result<()> {
        let marker = boot.join("ssh");
        fs::write(&marker, "").with_context(|| format!("Failed writing {}", marker.display()))?;
        let conf = boot.join("wpa_supplicant.conf");
        fs::write(&conf, self.wpa_supplicant_conf())
            .with_context(|| format!("Failed writing {}", conf.display()))?;
        info!("Wrote headless setup to {}", boot.display());
        Ok(())
    }
}

/// `alice prepare-sd-card`; works on the local card, no device needed
pub fn execute(app: &mut App, options: SdCardOptions) -> Result<()> {
    app.console.headline("Preparing SD card");

    let boot = match options.boot_path {
        Some(path) => expand(&path),
        None => {
            let check = for_prompt(|answer| validate_directory_exists(&expand(answer)));
            let answer = app.ask().text(
                "Enter the path of your SD card's boot partition",
                None,
                &check,
            )?;
            expand(&answer)
        }
    };
    validate_directory_exists(&boot)?;

    let ssid = match options.ssid {
        Some(ssid) => ssid,
        None => app
            .ask()
            .text("Please enter the name of your Wifi network", None, &non_empty)?,
    };
    let country = match options.country {
        Some(country) => country,
        None => {
            let check = for_prompt(validate_country_code);
            app.ask().text(
                "Please enter your country code (example: CH, US, DE, FR etc)",
                None,
                &check,
            )?
        }
    };
    validate_country_code(&country)?;
    let key = app.ask().secret("Please enter your Wifi network's key")?;

    let setup = WifiSetup {
        ssid,
        country: country.to_uppercase(),
        key,
    };
    setup.write_to(&boot)?;
    app.console
        .success("SD card ready, please plug it in your device and boot it!");
    Ok(())
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path.trim()).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestBed;

    fn setup() -> WifiSetup {
        WifiSetup {
            ssid: "HomeNet".into(),
            country: "CH".into(),
            key: "hunter22".into(),
        }
    }

    #[test]
    fn test_wpa_supplicant_conf() {
        assert_eq!(
            setup().wpa_supplicant_conf(),
            "country=CH\n\
             ctrl_interface=DIR=/var/run/wpa_supplicant GROUP=netdev\n\
             update_config=1\n\
             network={\n\
             \tssid=\"HomeNet\"\n\
             \tscan_ssid=1\n\
             \tpsk=\"hunter22\"\n\
             \tkey_mgmt=WPA-PSK\n\
             }"
        );
    }

    #[test]
    fn test_prompts_and_writes_boot_files() {
        let bed = TestBed::new();
        let boot = bed.dir.path().join("boot");
        fs::create_dir_all(&boot).unwrap();
        bed.prompts.text(bed.dir.path().join("missing").to_str().unwrap());
        bed.prompts.text(boot.to_str().unwrap());
        bed.prompts.text("HomeNet");
        bed.prompts.text("ch");
        bed.prompts.secret("hunter22");
        let mut app = bed.app();

        execute(&mut app, SdCardOptions::default()).unwrap();
        assert_eq!(bed.prompts.rejected().len(), 1);
        assert_eq!(fs::read_to_string(boot.join("ssh")).unwrap(), "");
        assert_eq!(
            fs::read_to_string(boot.join("wpa_supplicant.conf")).unwrap(),
            setup().wpa_supplicant_conf()
        );
        // no device involved
        assert!(bed.network.attempts().is_empty());
        assert!(bed.scanner.scanned().is_empty());
    }

    #[test]
    fn test_given_values_skip_prompts() {
        let bed = TestBed::new();
        let options = SdCardOptions {
            boot_path: Some(bed.dir.path().display().to_string()),
            ssid: Some("HomeNet".into()),
            country: Some("CH".into()),
        };
        bed.prompts.secret("hunter22");
        let mut app = bed.app();

        execute(&mut app, options).unwrap();
        assert_eq!(bed.prompts.asked().len(), 1);
        assert!(bed.dir.path().join("wpa_supplicant.conf").exists());
    }

    #[test]
    fn test_bad_country_writes_nothing() {
        let bed = TestBed::new();
        let options = SdCardOptions {
            boot_path: Some(bed.dir.path().display().to_string()),
            ssid: Some("HomeNet".into()),
            country: Some("Switzerland".into()),
        };
        let mut app = bed.app();

        assert!(execute(&mut app, options).is_err());
        assert!(!bed.dir.path().join("ssh").exists());
    }
}
