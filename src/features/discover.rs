use anyhow::{anyhow, Result};

use crate::features::connect::{connect, ConnectRequest, Mode};
use crate::features::context::App;
use crate::tools::network::Ipv4Network;
use crate::tools::types::Target;

const RETURN_TO_MENU: &str = "Return to main menu";

#[derive(Debug, Clone, Default)]
pub struct DiscoverOptions {
    /// CIDR to scan instead of the local /24
    pub network: Option<String>,
    /// List every SSH host, not only likely devices
    pub all: bool,
}

/// `alice discover`
pub fn execute(app: &mut App, options: &DiscoverOptions) -> Result<()> {
    discover_and_connect(app, options)?;
    Ok(())
}

/// Scan, let the operator pick a device and connect to it
///
/// Returns `None` when nothing was found or the operator went back.
pub fn discover_and_connect(app: &mut App, options: &DiscoverOptions) -> Result<Option<Target>> {
    app.console
        .headline("Discovering devices on your network, please wait");

    let network = match &options.network {
        Some(network) => network.parse::<Ipv4Network>()?,
        None => app
            .scanner
            .local_network()
            .ok_or_else(|| anyhow!("Couldn't retrieve local ip address"))?,
    };

    app.console.headline(&format!("Scanning network: {}", network));
    app.console.start_progress("Scanning");
    let found = app.scanner.scan(&network);
    app.console.stop_progress();

    let devices: Vec<_> = found
        .into_iter()
        .filter(|host| options.all || host.looks_like_device())
        .collect();
    if devices.is_empty() {
        app.console.warning("No device found on the network");
        return Ok(None);
    }

    app.console.headline(if options.all {
        "Discovered devices:"
    } else {
        "Discovered potential devices:"
    });
    let mut items: Vec<String> = devices.iter().map(ToString::to_string).collect();
    items.push(RETURN_TO_MENU.to_string());

    let selected = app
        .ask()
        .select("Select the device you want to connect to", &items)?;
    let Some(device) = selected.and_then(|index| devices.get(index)) else {
        return Ok(None);
    };

    let target = connect(
        app,
        ConnectRequest::to(device.address.to_string()),
        Mode::Interactive,
    )?;
    Ok(Some(target))
}
