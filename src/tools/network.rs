//! Local network scanning for devices answering SSH.

use anyhow::{anyhow, Result};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

const SSH_PORT: u16 = 22;
const MIN_PREFIX: u8 = 16;

/// Banner fragments of the images Alice devices run on
const DEVICE_MARKERS: [&str; 4] = ["raspbian", "raspberrypi", "projectalice", "debian"];

/// An IPv4 network in CIDR notation, no larger than a /16
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Network {
    base: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Network {
    pub fn new(address: Ipv4Addr, prefix: u8) -> Result<Self> {
        if !(MIN_PREFIX..=32).contains(&prefix) {
            return Err(anyhow!(
                "Network prefix must be between /{} and /32, got /{}",
                MIN_PREFIX,
                prefix
            ));
        }
        let mask = u32::MAX << (32 - u32::from(prefix));
        Ok(Self {
            base: Ipv4Addr::from(u32::from(address) & mask),
            prefix,
        })
    }

    /// The /24 an address belongs to
    pub fn around(address: Ipv4Addr) -> Self {
        let octets = address.octets();
        Self {
            base: Ipv4Addr::new(octets[0], octets[1], octets[2], 0),
            prefix: 24,
        }
    }

    /// Usable host addresses; network and broadcast are skipped below /31
    pub fn hosts(&self) -> Vec<Ipv4Addr> {
        let first = u32::from(self.base);
        let size = 1u32 << (32 - u32::from(self.prefix));
        let last = first + (size - 1);
        let range = if size <= 2 {
            first..=last
        } else {
            first + 1..=last - 1
        };
        range.map(Ipv4Addr::from).collect()
    }
}

impl fmt::Display for Ipv4Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix)
    }
}

impl FromStr for Ipv4Network {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (address, prefix) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| anyhow!("Network must be in CIDR notation, e.g. 192.168.1.0/24"))?;
        let address = address
            .parse::<Ipv4Addr>()
            .map_err(|_| anyhow!("Invalid network address: {}", address))?;
        let prefix = prefix
            .parse::<u8>()
            .map_err(|_| anyhow!("Invalid network prefix: {}", prefix))?;
        Self::new(address, prefix)
    }
}

/// A host that accepted a connection on the SSH port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredHost {
    pub address: Ipv4Addr,
    /// First line the SSH server sent, if any
    pub banner: Option<String>,
}

impl DiscoveredHost {
    pub fn looks_like_device(&self) -> bool {
        self.banner.as_deref().is_some_and(|banner| {
            let banner = banner.to_lowercase();
            DEVICE_MARKERS.iter().any(|marker| banner.contains(marker))
        })
    }
}

impl fmt::Display for DiscoveredHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.banner {
            Some(banner) => write!(f, "{}: {}", self.address, banner),
            None => write!(f, "{}", self.address),
        }
    }
}

pub trait Scanner {
    /// The network this machine sits on
    fn local_network(&self) -> Option<Ipv4Network>;

    /// Hosts of `network` answering on the SSH port, sorted by address
    fn scan(&self, network: &Ipv4Network) -> Vec<DiscoveredHost>;
}

/// Scanner probing TCP 22 concurrently
pub struct TcpScanner {
    timeout: Duration,
    concurrency: usize,
}

impl TcpScanner {
    pub fn new(timeout: Duration, concurrency: usize) -> Self {
        Self {
            timeout,
            concurrency: concurrency.max(1),
        }
    }

    async fn _scan(&self, hosts: Vec<Ipv4Addr>) -> Vec<DiscoveredHost> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();

        for address in hosts {
            let semaphore = semaphore.clone();
            let timeout = self.timeout;
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                probe(address, SSH_PORT, timeout).await
            });
        }

        let mut found = Vec::new();
        while let Some(result) = join_set.join_next().await {
            if let Ok(Some(host)) = result {
                found.push(host);
            }
        }
        found.sort_by_key(|host| host.address);
        found
    }
}

impl Scanner for TcpScanner {
    fn local_network(&self) -> Option<Ipv4Network> {
        local_ipv4().map(Ipv4Network::around)
    }

    fn scan(&self, network: &Ipv4Network) -> Vec<DiscoveredHost> {
        let hosts = network.hosts();
        info!("Probing {} hosts of {}", hosts.len(), network);
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(self._scan(hosts)))
    }
}

async fn probe(address: Ipv4Addr, port: u16, timeout: Duration) -> Option<DiscoveredHost> {
    let socket = SocketAddr::from((address, port));
    let mut stream = tokio::time::timeout(timeout, TcpStream::connect(socket))
        .await
        .ok()?
        .ok()?;

    let mut buf = [0u8; 256];
    let banner = match tokio::time::timeout(timeout, stream.read(&mut buf)).await {
        Ok(Ok(n)) if n > 0 => String::from_utf8_lossy(&buf[..n])
            .lines()
            .next()
            .map(|line| line.trim().to_string()),
        _ => None,
    };
    debug!("{} answered on port {}: {:?}", address, port, banner);
    Some(DiscoveredHost { address, banner })
}

/// Address of the interface holding the default route
///
/// Connecting a UDP socket sends nothing; it only selects the interface.
pub fn local_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    match socket.local_addr().ok()? {
        SocketAddr::V4(addr) if !addr.ip().is_unspecified() => Some(*addr.ip()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_parsing_masks_host_bits() {
        let network: Ipv4Network = "192.168.1.77/24".parse().unwrap();
        assert_eq!(network.to_string(), "192.168.1.0/24");
        assert!("192.168.1.0".parse::<Ipv4Network>().is_err());
        assert!("10.0.0.0/8".parse::<Ipv4Network>().is_err());
        assert!("10.0.0.0/33".parse::<Ipv4Network>().is_err());
        assert!("10.0.0/24".parse::<Ipv4Network>().is_err());
    }

    #[test]
    fn test_hosts_skip_network_and_broadcast() {
        let hosts = Ipv4Network::around(Ipv4Addr::new(10, 0, 0, 42)).hosts();
        assert_eq!(hosts.len(), 254);
        assert_eq!(hosts[0], Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(hosts[253], Ipv4Addr::new(10, 0, 0, 254));

        let single: Ipv4Network = "10.0.0.9/32".parse().unwrap();
        assert_eq!(single.hosts(), vec![Ipv4Addr::new(10, 0, 0, 9)]);
        let pair: Ipv4Network = "10.0.0.8/31".parse().unwrap();
        assert_eq!(pair.hosts().len(), 2);
    }

    #[test]
    fn test_device_banner_detection() {
        let pi = DiscoveredHost {
            address: Ipv4Addr::new(192, 168, 1, 20),
            banner: Some("SSH-2.0-OpenSSH_8.4p1 Raspbian-5+deb11u1".into()),
        };
        let router = DiscoveredHost {
            address: Ipv4Addr::new(192, 168, 1, 1),
            banner: Some("SSH-2.0-dropbear_2020.81".into()),
        };
        let silent = DiscoveredHost {
            address: Ipv4Addr::new(192, 168, 1, 2),
            banner: None,
        };
        assert!(pi.looks_like_device());
        assert!(!router.looks_like_device());
        assert!(!silent.looks_like_device());
        assert_eq!(silent.to_string(), "192.168.1.2");
    }

    #[tokio::test]
    async fn test_probe_reads_banner_from_listener() {
        use tokio::io::AsyncWriteExt;
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"SSH-2.0-OpenSSH_9.2p1 Debian-2\r\n").await.unwrap();
        });

        let host = probe(Ipv4Addr::LOCALHOST, port, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(host.address, Ipv4Addr::LOCALHOST);
        assert_eq!(host.banner.as_deref(), Some("SSH-2.0-OpenSSH_9.2p1 Debian-2"));
        assert!(host.looks_like_device());
    }
}
