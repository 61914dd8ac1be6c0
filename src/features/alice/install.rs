//! First installation of Project Alice on the connected device.
//!
//! The operator's answers are rendered into `ProjectAlice.yaml`, which is
//! written into the fresh checkout and copied to `/boot` where Alice reads it
//! on first start.

use anyhow::Result;
use tracing::info;

use crate::features::alice::service::{ServiceAction, INSTALL_DIR};
use crate::features::context::App;
use crate::features::gate;
use crate::tools::errors::PromptError;
use crate::tools::prompt::non_empty;
use crate::tools::shell_escape::single_quoted;
use crate::tools::validation::{for_prompt, parse_port, validate_admin_pin, validate_country_code};

const REPOSITORY: &str = "https://github.com/project-alice-assistant/ProjectAlice.git";
const LANGUAGES: [&str; 4] = ["en", "de", "fr", "it"];

/// Answers written to `ProjectAlice.yaml`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallAnswers {
    pub admin_pin_code: String,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub active_language: String,
    pub active_country_code: String,
}

impl InstallAnswers {
    pub fn to_yaml(&self) -> String {
        format!(
            "adminPinCode: {}\nmqttHost: {}\nmqttPort: {}\nactiveLanguage: {}\nactiveCountryCode: {}\nuseHLC: false\n",
            self.admin_pin_code,
            self.mqtt_host,
            self.mqtt_port,
            self.active_language,
            self.active_country_code
        )
    }
}

/// `alice install-alice`
pub fn execute(app: &mut App, force: bool) -> Result<()> {
    gate::ensure_connected(app)?;
    app.console.headline("Installing Alice, yayyyy!");

    let existing = app.run_quiet(&format!("test -d {}/ && echo \"1\"", INSTALL_DIR))?;
    if existing.first_stdout().map(str::trim) == Some("1") {
        if !force {
            app.console
                .error("Alice seems to already exist on that host");
            if !app.ask().confirm("Erase and reinstall", false)? {
                return Ok(());
            }
        }
        info!("Removing the previous installation");
        app.run_quiet(&ServiceAction::Stop.command())?;
        app.run(&format!("sudo rm -rf {}", INSTALL_DIR))?;
    }

    let Some(answers) = ask_answers(app)? else {
        return Ok(());
    };
    app.console.success("Generated ProjectAlice.yaml");

    app.console.info("Updating system");
    app.console.start_progress("Installing git");
    app.run("sudo apt-get update")?;
    app.run("sudo apt-get install git -y")?;

    app.console.info("Cloning Alice");
    app.console.start_progress("Cloning");
    app.run(&format!("git clone {} {}", REPOSITORY, INSTALL_DIR))?;
    app.run_quiet(&format!(
        "echo {} > {}/ProjectAlice.yaml",
        single_quoted(&answers.to_yaml()),
        INSTALL_DIR
    ))?;
    app.run_quiet(&format!(
        "sudo cp {}/ProjectAlice.yaml /boot/ProjectAlice.yaml",
        INSTALL_DIR
    ))?;

    app.console.info("Start install process");
    app.console.start_progress("Installing");
    app.run(&format!("cd {}/ && python3 main.py", INSTALL_DIR))?;

    app.console.success(
        "Alice has completed the basic installation! She's now working further to complete the installation.",
    );
    Ok(())
}

/// `None` when the operator leaves the language list without a choice
fn ask_answers(app: &mut App) -> Result<Option<InstallAnswers>, PromptError> {
    let pin_check = for_prompt(validate_admin_pin);
    let admin_pin_code = app.ask().text(
        "Enter an admin pin code. It must be made of 4 characters, all digits only.",
        Some("1234"),
        &pin_check,
    )?;
    let mqtt_host = app.ask().text("Mqtt host", Some("localhost"), &non_empty)?;
    let port_check = for_prompt(parse_port);
    let mqtt_port = app.ask().text("Mqtt port", Some("1883"), &port_check)?;

    let languages: Vec<String> = LANGUAGES.iter().map(ToString::to_string).collect();
    let Some(language) = app
        .ask()
        .select("What language should Alice be using?", &languages)?
        .and_then(|index| languages.get(index).cloned())
    else {
        return Ok(None);
    };

    let country_check = for_prompt(validate_country_code);
    let country = app.ask().text(
        "What country code should Alice be using?",
        Some("US"),
        &country_check,
    )?;

    Ok(Some(InstallAnswers {
        admin_pin_code,
        mqtt_host,
        // already checked by the prompt
        mqtt_port: mqtt_port.trim().parse().unwrap_or(1883),
        active_language: language,
        active_country_code: country.to_uppercase(),
    }))
}
