//! Trusted proxy allowlist.
//!
//! The forwarded-for chain is client-controlled unless a proxy in front of
//! this service overwrites it. When `TRUSTED_PROXIES` is configured, the chain
//! is only honored for connections whose peer address falls inside one of
//! the listed networks; every other request is resolved from its transport
//! address alone.
//!
//! With no ranges configured every peer is trusted, which is the historical
//! behavior and leaves the chain open to spoofing.

use std::net::IpAddr;

use tracing::{debug, warn};

/// Parsed CIDR network range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CidrRange {
    network: IpAddr,
    prefix_len: u8,
}

impl CidrRange {
    /// Parse a CIDR notation string (e.g., "10.0.0.0/8" or "::1/128").
    ///
    /// A bare address is accepted as a single-host range (/32 or /128).
    /// IPv4-mapped networks (`::ffff:10.0.0.0/104`) are stored in IPv4 form
    /// with the prefix reduced by 96, since peers are compared that way.
    /// Returns `None` if the format is invalid, or for a mapped network whose
    /// prefix is shorter than the 96-bit mapping prefix.
    pub fn parse(cidr: &str) -> Option<Self> {
        let cidr = cidr.trim();
        let (addr, prefix) = match cidr.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (cidr, None),
        };

        let network: IpAddr = addr.parse().ok()?;
        let max_prefix = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        let prefix_len = match prefix {
            Some(p) => p.parse::<u8>().ok().filter(|len| *len <= max_prefix)?,
            None => max_prefix,
        };

        if let IpAddr::V6(v6) = network
            && let Some(v4) = v6.to_ipv4_mapped()
        {
            return Some(Self {
                network: IpAddr::V4(v4),
                prefix_len: prefix_len.checked_sub(96)?,
            });
        }

        Some(Self {
            network,
            prefix_len,
        })
    }

    /// Check if an IP address is contained within this CIDR range.
    ///
    /// IPv4-mapped IPv6 peers are compared in their IPv4 form.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (&self.network, ip.to_canonical()) {
            (IpAddr::V4(net), IpAddr::V4(addr)) => {
                let mask = if self.prefix_len == 0 {
                    0
                } else {
                    u32::MAX << (32 - self.prefix_len)
                };
                (u32::from(*net) & mask) == (u32::from(addr) & mask)
            }
            (IpAddr::V6(net), IpAddr::V6(addr)) => {
                let mask = if self.prefix_len == 0 {
                    0
                } else {
                    u128::MAX << (128 - self.prefix_len)
                };
                (u128::from(*net) & mask) == (u128::from(addr) & mask)
            }
            _ => false,
        }
    }
}

/// Set of networks allowed to supply a forwarded-for chain.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxyConfig {
    ranges: Vec<CidrRange>,
}

impl TrustedProxyConfig {
    /// Build from CIDR strings. Invalid entries are logged and skipped.
    pub fn new(cidrs: &[String]) -> Self {
        let ranges: Vec<CidrRange> = cidrs
            .iter()
            .filter_map(|cidr| {
                let parsed = CidrRange::parse(cidr);
                if parsed.is_none() {
                    warn!(cidr = %cidr, "Invalid CIDR range in TRUSTED_PROXIES, skipping");
                }
                parsed
            })
            .collect();

        if !ranges.is_empty() {
            debug!(
                count = ranges.len(),
                "Trusted proxy validation enabled"
            );
        }

        Self { ranges }
    }

    /// Whether any ranges are configured.
    pub fn is_enabled(&self) -> bool {
        !self.ranges.is_empty()
    }

    /// Whether a connection from `peer` may supply a forwarded-for chain.
    ///
    /// Always `true` when no ranges are configured. An unknown peer is only
    /// trusted in that mode.
    pub fn is_trusted(&self, peer: Option<IpAddr>) -> bool {
        if self.ranges.is_empty() {
            return true;
        }
        peer.is_some_and(|ip| self.ranges.iter().any(|range| range.contains(&ip)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_cidr_parse() {
        assert_eq!(CidrRange::parse("10.0.0.0/8").unwrap().prefix_len, 8);
        assert_eq!(CidrRange::parse("::1/128").unwrap().prefix_len, 128);
        assert_eq!(CidrRange::parse(" 192.168.1.1 ").unwrap().prefix_len, 32);
        assert_eq!(CidrRange::parse("2001:db8::1").unwrap().prefix_len, 128);
    }

    #[test]
    fn test_cidr_parse_invalid() {
        assert!(CidrRange::parse("not-an-ip").is_none());
        assert!(CidrRange::parse("10.0.0.0/33").is_none());
        assert!(CidrRange::parse("::/129").is_none());
        assert!(CidrRange::parse("10.0.0.0/abc").is_none());
        assert!(CidrRange::parse("10.0.0.0/8/9").is_none());
    }

    #[test]
    fn test_cidr_contains() {
        let cidr = CidrRange::parse("10.0.0.0/8").unwrap();
        assert!(cidr.contains(&ip("10.0.0.1")));
        assert!(cidr.contains(&ip("10.255.255.255")));
        assert!(!cidr.contains(&ip("11.0.0.1")));
        assert!(!cidr.contains(&ip("2001:db8::1")));

        let all = CidrRange::parse("0.0.0.0/0").unwrap();
        assert!(all.contains(&ip("203.0.113.9")));
    }

    #[test]
    fn test_cidr_contains_mapped_ipv4() {
        let cidr = CidrRange::parse("172.16.0.0/12").unwrap();
        assert!(cidr.contains(&ip("::ffff:172.20.1.1")));
    }

    #[test]
    fn test_cidr_mapped_network_matches_ipv4_peers() {
        let cidr = CidrRange::parse("::ffff:10.0.0.0/104").unwrap();
        assert_eq!(cidr, CidrRange::parse("10.0.0.0/8").unwrap());
        assert!(cidr.contains(&ip("10.1.2.3")));
        assert!(cidr.contains(&ip("::ffff:10.1.2.3")));
        assert!(!cidr.contains(&ip("11.0.0.1")));

        let host = CidrRange::parse("::ffff:127.0.0.1").unwrap();
        assert!(host.contains(&ip("127.0.0.1")));
        assert!(!host.contains(&ip("127.0.0.2")));
    }

    #[test]
    fn test_cidr_mapped_network_shorter_than_mapping_is_rejected() {
        assert!(CidrRange::parse("::ffff:0:0/95").is_none());
        assert!(CidrRange::parse("::ffff:0:0/96").is_some());
    }

    #[test]
    fn test_cidr_contains_ipv6() {
        let cidr = CidrRange::parse("fd00::/8").unwrap();
        assert!(cidr.contains(&ip("fd12:3456::1")));
        assert!(!cidr.contains(&ip("fe80::1")));
    }

    #[test]
    fn test_empty_config_trusts_everyone() {
        let config = TrustedProxyConfig::new(&[]);
        assert!(!config.is_enabled());
        assert!(config.is_trusted(Some(ip("8.8.8.8"))));
        assert!(config.is_trusted(None));
    }

    #[test]
    fn test_configured_ranges() {
        let config = TrustedProxyConfig::new(&[
            "10.0.0.0/8".to_string(),
            "bogus".to_string(),
            "::1".to_string(),
        ]);
        assert!(config.is_enabled());
        assert!(config.is_trusted(Some(ip("10.1.2.3"))));
        assert!(config.is_trusted(Some(ip("::1"))));
        assert!(!config.is_trusted(Some(ip("8.8.8.8"))));
        assert!(!config.is_trusted(None));
    }
}
