use alice_cli::features::alice::logs::{LogSource, DEFAULT_LINES};
use alice_cli::features::alice::service::ServiceAction;
use alice_cli::features::config::credential_store::CredentialStore;
use alice_cli::features::config::settings::Settings;
use alice_cli::features::connect::{ConnectRequest, DEFAULT_PORT};
use alice_cli::features::context::App;
use alice_cli::features::device::sound_device::SoundDevice;
use alice_cli::features::discover::DiscoverOptions;
use alice_cli::features::sd_card::SdCardOptions;
use alice_cli::features::{self, menu};
use alice_cli::{exit_error, print_error, print_warning};
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "alice")]
#[command(about = "Project Alice CLI - set up and manage Project Alice on a Raspberry Pi", long_about = None)]
#[command(version)]
struct Cli {
    /// More diagnostics on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Exit after the command instead of opening the main menu
    #[arg(long, global = true)]
    once: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to a device over SSH
    Connect {
        /// Device IPv4 address
        #[arg(short = 'i', long)]
        address: Option<String>,
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
        #[arg(short, long)]
        user: Option<String>,
        /// Password for the first login; a key is installed afterwards
        #[arg(long)]
        password: Option<String>,
    },
    /// Look for devices on the local network
    Discover {
        /// Network to scan in CIDR notation, defaults to the local /24
        #[arg(short, long)]
        network: Option<String>,
        /// List every SSH host, not only likely devices
        #[arg(short, long)]
        all: bool,
    },
    /// Close the current session
    Disconnect,
    /// Reboot the device and wait for it to come back
    Reboot,
    /// apt-get upgrade
    UpdateSystem,
    /// apt-get dist-upgrade, then reboot
    UpgradeSystem,
    /// Record and play back through the device's audio hardware
    SoundTest,
    /// Rename the device
    ChangeHostname {
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Change the password of the connected user
    ChangePassword {
        #[arg(short, long)]
        current: Option<String>,
        #[arg(short = 'p', long)]
        new: Option<String>,
    },
    /// Pull the latest Alice
    UpdateAlice,
    /// Control the ProjectAlice service
    Systemctl {
        #[clap(value_enum)]
        action: ServiceActionArg,
    },
    /// Install Project Alice on the device
    InstallAlice {
        /// Erase an existing installation without asking
        #[arg(short, long)]
        force: bool,
    },
    /// Install the driver of a sound hat
    InstallSoundDevice {
        #[arg(short, long, value_enum)]
        device: Option<SoundDeviceArg>,
    },
    /// Remove the driver of a sound hat
    UninstallSoundDevice {
        #[arg(short, long, value_enum)]
        device: Option<SoundDeviceArg>,
    },
    /// Show the last lines of a log
    Logs {
        #[clap(value_enum)]
        source: LogSourceArg,
        #[arg(short, long, default_value_t = DEFAULT_LINES)]
        lines: usize,
    },
    /// Send a session report to Github on the next fatal error
    ReportBug,
    /// Write Wi-Fi and SSH setup to a freshly flashed SD card
    PrepareSdCard {
        #[arg(long)]
        boot_path: Option<String>,
        #[arg(long)]
        ssid: Option<String>,
        #[arg(long)]
        country: Option<String>,
    },
}

#[derive(clap::ValueEnum, Clone, Debug)]
#[clap(rename_all = "lowercase")]
enum ServiceActionArg {
    Start,
    Stop,
    Restart,
    Enable,
    Disable,
    Status,
}

impl From<ServiceActionArg> for ServiceAction {
    fn from(arg: ServiceActionArg) -> Self {
        match arg {
            ServiceActionArg::Start => Self::Start,
            ServiceActionArg::Stop => Self::Stop,
            ServiceActionArg::Restart => Self::Restart,
            ServiceActionArg::Enable => Self::Enable,
            ServiceActionArg::Disable => Self::Disable,
            ServiceActionArg::Status => Self::Status,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum SoundDeviceArg {
    #[value(name = "respeaker2")]
    Respeaker2,
    #[value(name = "respeaker4")]
    Respeaker4,
    #[value(name = "respeaker4MicLinearArray", alias = "respeaker4miclineararray")]
    Respeaker4MicLinearArray,
    #[value(name = "respeaker6MicArray", alias = "respeaker6micarray")]
    Respeaker6MicArray,
}

impl From<SoundDeviceArg> for SoundDevice {
    fn from(arg: SoundDeviceArg) -> Self {
        match arg {
            SoundDeviceArg::Respeaker2 => Self::Respeaker2,
            SoundDeviceArg::Respeaker4 => Self::Respeaker4,
            SoundDeviceArg::Respeaker4MicLinearArray => Self::Respeaker4MicLinearArray,
            SoundDeviceArg::Respeaker6MicArray => Self::Respeaker6MicArray,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
#[clap(rename_all = "lowercase")]
enum LogSourceArg {
    Alice,
    System,
}

impl From<LogSourceArg> for LogSource {
    fn from(arg: LogSourceArg) -> Self {
        match arg {
            LogSourceArg::Alice => Self::Alice,
            LogSourceArg::System => Self::System,
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env("ALICE_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_app() -> Result<App> {
    let settings = match Settings::default_path() {
        Ok(path) => Settings::load(&path),
        Err(e) => {
            print_warning!("{:#}, using default settings", e);
            Settings::default()
        }
    };
    let store = CredentialStore::load(CredentialStore::default_path()?);
    Ok(App::terminal(settings, store))
}

fn run(app: &mut App, command: Commands) -> Result<()> {
    match command {
        Commands::Connect {
            address,
            port,
            user,
            password,
        } => features::connect::execute(
            app,
            ConnectRequest {
                address,
                port,
                user,
                password,
            },
        ),
        Commands::Discover { network, all } => {
            features::discover::execute(app, &DiscoverOptions { network, all })
        }
        Commands::Disconnect => features::connect::disconnect(app),
        Commands::Reboot => features::device::reboot::execute(app),
        Commands::UpdateSystem => features::device::system::update(app),
        Commands::UpgradeSystem => features::device::system::upgrade(app),
        Commands::SoundTest => features::device::sound_test::execute(app),
        Commands::ChangeHostname { name } => features::device::hostname::execute(app, name),
        Commands::ChangePassword { current, new } => {
            features::device::password::execute(app, current, new)
        }
        Commands::UpdateAlice => features::alice::service::update_alice(app),
        Commands::Systemctl { action } => {
            features::alice::service::systemctl(app, action.into())
        }
        Commands::InstallAlice { force } => features::alice::install::execute(app, force),
        Commands::InstallSoundDevice { device } => {
            features::device::sound_device::install(app, device.map(Into::into))
        }
        Commands::UninstallSoundDevice { device } => {
            features::device::sound_device::uninstall(app, device.map(Into::into))
        }
        Commands::Logs { source, lines } => {
            features::alice::logs::execute(app, source.into(), lines)
        }
        Commands::ReportBug => features::alice::service::report_bug(app),
        Commands::PrepareSdCard {
            boot_path,
            ssid,
            country,
        } => features::sd_card::execute(
            app,
            SdCardOptions {
                boot_path,
                ssid,
                country,
            },
        ),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut app = match build_app() {
        Ok(app) => app,
        Err(e) => exit_error!("{:#}", e),
    };

    if let Some(command) = cli.command {
        let result = run(&mut app, command);
        if cli.once {
            app.disconnect();
            if let Err(e) = result {
                exit_error!("{:#}", e);
            }
            return;
        }
        if let Err(e) = result {
            print_error!("{:#}", e);
        }
    }

    if let Err(e) = menu::run(&mut app) {
        exit_error!("{:#}", e);
    }
}
