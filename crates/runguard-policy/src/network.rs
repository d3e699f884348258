//! Source-address allowlist as a set of CIDR ranges.

use std::net::IpAddr;

use ipnet::IpNet;
use serde::Serialize;

use crate::error::{PolicyError, PolicyResult};

/// Compiled set of allowed network ranges.
///
/// An empty set contains no address at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NetworkPolicy {
    networks: Vec<IpNet>,
}

impl NetworkPolicy {
    /// Parse CIDR strings such as `"10.0.0.0/8"` or `"::1/128"`.
    ///
    /// A bare address without a prefix length is rejected; the operator has
    /// to state the range explicitly.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> PolicyResult<Self> {
        let mut networks = Vec::with_capacity(entries.len());
        for entry in entries {
            let raw = entry.as_ref().trim();
            let net = raw
                .parse::<IpNet>()
                .map_err(|e| PolicyError::InvalidCidr {
                    entry: raw.to_string(),
                    reason: e.to_string(),
                })?;
            networks.push(net);
        }
        Ok(Self::from_networks(networks))
    }

    /// Ranges are truncated to their network address and deduplicated,
    /// keeping the first occurrence of each.
    #[must_use]
    pub fn from_networks(networks: impl IntoIterator<Item = IpNet>) -> Self {
        let mut unique: Vec<IpNet> = Vec::new();
        for net in networks.into_iter().map(|n| n.trunc()) {
            if !unique.contains(&net) {
                unique.push(net);
            }
        }
        Self { networks: unique }
    }

    /// Whether `addr` falls inside at least one configured range.
    ///
    /// IPv4-mapped IPv6 addresses are matched as their IPv4 form.
    #[must_use]
    pub fn contains(&self, addr: IpAddr) -> bool {
        let addr = addr.to_canonical();
        self.networks.iter().any(|net| net.contains(&addr))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    #[must_use]
    pub fn networks(&self) -> &[IpNet] {
        &self.networks
    }
}
