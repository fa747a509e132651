use std::net::IpAddr;

use tokio::net::lookup_host;
use tracing::debug;

use crate::error::{EdgeprintError, Result};

/// Resolves `host` to its distinct addresses, in resolver order.
pub async fn resolve(host: &str, port: u16) -> Result<Vec<IpAddr>> {
    let dns_err = |reason: String| EdgeprintError::Dns { host: host.to_string(), reason };

    let addrs = lookup_host((host, port)).await.map_err(|e| dns_err(e.to_string()))?;

    let mut ips: Vec<IpAddr> = Vec::new();
    for addr in addrs {
        if !ips.contains(&addr.ip()) {
            ips.push(addr.ip());
        }
    }

    if ips.is_empty() {
        return Err(dns_err("no addresses found".to_string()));
    }

    debug!(host, count = ips.len(), "resolved");
    Ok(ips)
}
