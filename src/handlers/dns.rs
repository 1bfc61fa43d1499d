use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::proto::rr::RecordType;
use std::net::IpAddr;
use std::time::Instant;

use super::{Handler, StepContext, Verb, required};
use crate::error::ProbeError;

const DNS_PORT: u16 = 53;

/// `IPLOOKUP <hostname>` through the system resolver.
pub struct IpLookupHandler;

#[async_trait]
impl Handler for IpLookupHandler {
    fn verb(&self) -> Verb {
        Verb::Iplookup
    }

    fn usage(&self) -> &str {
        "<hostname>"
    }

    async fn execute(&self, args: &[String], _ctx: &StepContext<'_>) -> Result<String, ProbeError> {
        let host = required(Verb::Iplookup, args, 0, "hostname")?;
        let addrs = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| ProbeError::Dns(format!("{host}: {e}")))?;

        let mut seen: Vec<IpAddr> = Vec::new();
        for addr in addrs {
            if !seen.contains(&addr.ip()) {
                seen.push(addr.ip());
            }
        }
        Ok(seen
            .iter()
            .map(|ip| format!("IP: {ip}"))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// `NSLOOKUP <name> [serverIp]`: an ANY query, uncached, against the given
/// server or the first system name server.
pub struct NsLookupHandler;

fn resolver_for(server: Option<IpAddr>) -> Result<(ResolverConfig, ResolverOpts), ProbeError> {
    let (config, mut opts) = match server {
        Some(ip) => (
            ResolverConfig::from_parts(
                None,
                vec![],
                NameServerConfigGroup::from_ips_clear(&[ip], DNS_PORT, true),
            ),
            ResolverOpts::default(),
        ),
        None => hickory_resolver::system_conf::read_system_conf()?,
    };
    opts.cache_size = 0;
    opts.use_hosts_file = false;
    Ok((config, opts))
}

#[async_trait]
impl Handler for NsLookupHandler {
    fn verb(&self) -> Verb {
        Verb::Nslookup
    }

    fn usage(&self) -> &str {
        "<name> [server ip]"
    }

    async fn execute(&self, args: &[String], _ctx: &StepContext<'_>) -> Result<String, ProbeError> {
        let name = required(Verb::Nslookup, args, 0, "name")?;
        let server = args
            .get(1)
            .map(|s| {
                s.parse::<IpAddr>()
                    .map_err(|e| ProbeError::invalid(Verb::Nslookup, format!("server {s:?}: {e}")))
            })
            .transpose()?;

        let (config, opts) = resolver_for(server)?;
        let name_server = config
            .name_servers()
            .first()
            .map(|ns| format!("{} ({:?})", ns.socket_addr, ns.protocol))
            .unwrap_or_else(|| "unknown".to_string());

        let resolver = TokioAsyncResolver::tokio(config, opts);
        let started = Instant::now();
        let lookup = resolver.lookup(name, RecordType::ANY).await?;
        let elapsed = started.elapsed();

        let mut out = vec![
            format!("NS: {name_server}"),
            format!(
                "AUDIT: query {} ANY, recursion desired, {} answer(s) in {:.2}ms",
                lookup.query().name(),
                lookup.records().len(),
                elapsed.as_secs_f64() * 1000.0
            ),
        ];
        out.extend(lookup.record_iter().map(|r| format!("RECORD: {r}")));
        Ok(out.join("\n"))
    }
}
