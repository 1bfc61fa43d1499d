use async_trait::async_trait;
use nix::ifaddrs::getifaddrs;
use std::collections::BTreeMap;

use super::{Handler, StepContext, Verb};
use crate::error::ProbeError;

const PROC_NET_DEV: &str = "/proc/net/dev";

/// `INFO HOSTNAME` / `INFO NETWORK` / `INFO [ENV] [name]`.
pub struct InfoHandler;

pub fn host_name() -> Result<String, ProbeError> {
    let name = nix::unistd::gethostname().map_err(|e| ProbeError::Io(e.into()))?;
    Ok(name.to_string_lossy().into_owned())
}

fn environment(name: Option<&str>) -> String {
    match name {
        Some(name) => format!("ENV: {name}: {}", std::env::var(name).unwrap_or_default()),
        None => {
            let vars: BTreeMap<String, String> = std::env::vars_os()
                .map(|(k, v)| (k.to_string_lossy().into_owned(), v.to_string_lossy().into_owned()))
                .collect();
            vars.iter()
                .map(|(k, v)| format!("ENV: {k}: {v}"))
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}

/// Per-interface counters from `/proc/net/dev`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Counters {
    rx_bytes: u64,
    rx_packets: u64,
    rx_errors: u64,
    rx_dropped: u64,
    tx_bytes: u64,
    tx_packets: u64,
    tx_errors: u64,
    tx_dropped: u64,
}

fn parse_net_dev(text: &str) -> BTreeMap<String, Counters> {
    let mut out = BTreeMap::new();
    // Two header lines, then `iface: rx(8 fields) tx(8 fields)`.
    for line in text.lines().skip(2) {
        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };
        let fields: Vec<u64> = rest
            .split_whitespace()
            .filter_map(|f| f.parse().ok())
            .collect();
        if fields.len() < 16 {
            continue;
        }
        out.insert(
            name.trim().to_string(),
            Counters {
                rx_bytes: fields[0],
                rx_packets: fields[1],
                rx_errors: fields[2],
                rx_dropped: fields[3],
                tx_bytes: fields[8],
                tx_packets: fields[9],
                tx_errors: fields[10],
                tx_dropped: fields[11],
            },
        );
    }
    out
}

fn network() -> Result<String, ProbeError> {
    let mut interfaces: BTreeMap<String, (String, Vec<String>)> = BTreeMap::new();
    for ifa in getifaddrs().map_err(|e| ProbeError::Io(e.into()))? {
        let entry = interfaces
            .entry(ifa.interface_name.clone())
            .or_insert_with(|| (format!("{:?}", ifa.flags), Vec::new()));
        let Some(address) = ifa.address else {
            continue;
        };
        if let Some(v4) = address.as_sockaddr_in() {
            entry.1.push(v4.ip().to_string());
        } else if let Some(v6) = address.as_sockaddr_in6() {
            entry.1.push(v6.ip().to_string());
        }
    }

    // Counters are Linux-only; elsewhere only addresses are shown.
    let counters = std::fs::read_to_string(PROC_NET_DEV)
        .map(|text| parse_net_dev(&text))
        .unwrap_or_default();

    let mut lines = Vec::new();
    for (name, (flags, addrs)) in &interfaces {
        lines.push(format!("INTERFACE: {name}"));
        lines.push(format!("  FLAGS: {flags}"));
        for addr in addrs {
            lines.push(format!("  ADDRESS: {addr}"));
        }
        if let Some(c) = counters.get(name) {
            lines.push(format!(
                "  RX: {} bytes, {} packets, {} errors, {} dropped",
                c.rx_bytes, c.rx_packets, c.rx_errors, c.rx_dropped
            ));
            lines.push(format!(
                "  TX: {} bytes, {} packets, {} errors, {} dropped",
                c.tx_bytes, c.tx_packets, c.tx_errors, c.tx_dropped
            ));
        }
    }
    Ok(lines.join("\n"))
}

#[async_trait]
impl Handler for InfoHandler {
    fn verb(&self) -> Verb {
        Verb::Info
    }

    fn usage(&self) -> &str {
        "HOSTNAME | NETWORK | [ENV] [name]"
    }

    async fn execute(&self, args: &[String], _ctx: &StepContext<'_>) -> Result<String, ProbeError> {
        match args.first().map(String::as_str) {
            Some("HOSTNAME") => Ok(format!("HOSTNAME: {}", host_name()?)),
            Some("NETWORK") => network(),
            _ => Ok(environment(args.get(1).map(String::as_str))),
        }
    }
}
