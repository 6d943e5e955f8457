use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};

use sysinfo::System;
use tracing::warn;

const AGENT_PORT: &str = "AGENT_PORT";

const DEFAULT_PORT: u16 = 9101;

pub fn get_port() -> u16 {
    let port_from_env = std::env::var(AGENT_PORT);
    port_from_env.map_or(DEFAULT_PORT, |res| res.parse().unwrap_or(DEFAULT_PORT))
}

const AGENT_ADDR: &str = "AGENT_ADDR";

const DEFAULT_ADDR: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 0);

pub fn get_addr() -> Ipv4Addr {
    let addr_from_env = std::env::var(AGENT_ADDR);
    addr_from_env.map_or(DEFAULT_ADDR, |res| res.parse().unwrap_or(DEFAULT_ADDR))
}

/// Hostname and primary address of this machine, as shown in alert messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    pub hostname: String,
    pub ip: IpAddr,
}

impl HostIdentity {
    pub fn new(hostname: impl Into<String>, ip: IpAddr) -> Self {
        Self {
            hostname: hostname.into(),
            ip,
        }
    }

    /// Resolve the hostname and look it up, preferring an IPv4 address.
    ///
    /// Falls back to loopback when the name does not resolve, so a misconfigured
    /// resolver never keeps the agent from starting.
    pub fn resolve() -> Self {
        let hostname = System::host_name().unwrap_or_else(|| "localhost".to_string());

        let ip = match (hostname.as_str(), 0).to_socket_addrs() {
            Ok(addrs) => {
                let addrs = addrs.map(|addr| addr.ip()).collect::<Vec<_>>();
                addrs
                    .iter()
                    .find(|ip| ip.is_ipv4())
                    .or_else(|| addrs.first())
                    .copied()
            }
            Err(e) => {
                warn!("could not resolve {hostname}: {e}");
                None
            }
        };

        Self {
            hostname,
            ip: ip.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        }
    }
}
