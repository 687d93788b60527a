//! Client address resolution.
//!
//! Picks the single address that represents the originating client of a
//! request, in strict priority order:
//!
//! 1. The first entry of the forwarded-for chain, when the chain is non-empty.
//! 2. Otherwise the host part of the transport peer address. A peer address
//!    without a port is accepted as a bare host.
//! 3. The chosen string must parse as an IPv4 or IPv6 literal.
//!
//! No trust validation of intermediate proxies happens here; deciding whether
//! the forwarded-for chain may be used at all is the caller's job (see
//! [`TrustedProxyConfig`](crate::middleware::TrustedProxyConfig)).

use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::str::FromStr;

use thiserror::Error;

use super::error::{GeoIpError, GeoIpResult};

/// Per-request view of the inputs the resolver needs.
///
/// Owned by the caller and only read here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    /// Forwarded-for chain, client first. Empty when the header is absent.
    pub forwarded_for: Vec<String>,
    /// Transport peer address, `host:port` or a bare host.
    pub remote_address: String,
}

impl RequestMetadata {
    pub fn new(remote_address: impl Into<String>) -> Self {
        Self {
            forwarded_for: Vec::new(),
            remote_address: remote_address.into(),
        }
    }

    pub fn with_forwarded_for<I, S>(mut self, chain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forwarded_for = chain.into_iter().map(Into::into).collect();
        self
    }
}

/// A syntactically valid client address.
///
/// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) are stored in their IPv4
/// form so that lookups, loopback detection, and the rendered string all
/// agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedIp(IpAddr);

impl ResolvedIp {
    pub fn addr(&self) -> IpAddr {
        self.0
    }

    pub fn is_loopback(&self) -> bool {
        self.0.is_loopback()
    }
}

impl From<IpAddr> for ResolvedIp {
    fn from(ip: IpAddr) -> Self {
        Self(ip.to_canonical())
    }
}

impl FromStr for ResolvedIp {
    type Err = GeoIpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<IpAddr>()
            .map(Self::from)
            .map_err(|_| GeoIpError::AddressParse {
                input: s.to_string(),
            })
    }
}

impl fmt::Display for ResolvedIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Reasons a `host:port` string cannot be decomposed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitError {
    #[error("missing port in address")]
    MissingPort,
    #[error("too many colons in address")]
    TooManyColons,
    #[error("missing ']' in address")]
    MissingBracket,
    #[error("unexpected bracket in address")]
    UnexpectedBracket,
}

/// Split `host:port` or `[host]:port` into its parts.
///
/// The port is not validated and may be empty. An unbracketed IPv6 literal
/// such as `::1` is reported as [`SplitError::MissingPort`]: it carries no
/// port, and is otherwise a perfectly valid bare host.
pub fn split_host_port(input: &str) -> Result<(&str, &str), SplitError> {
    let Some(last_colon) = input.rfind(':') else {
        return Err(SplitError::MissingPort);
    };
    let port = input.get(last_colon + 1..).unwrap_or_default();

    let host = if let Some(bracketed) = input.strip_prefix('[') {
        let Some(close) = bracketed.find(']') else {
            return Err(SplitError::MissingBracket);
        };
        let (host, rest) = bracketed.split_at(close);
        let after = rest.get(1..).unwrap_or_default();

        if after.is_empty() {
            return Err(SplitError::MissingPort);
        }
        // The last colon has to sit right behind the closing bracket.
        if after.rfind(':') != Some(0) {
            return Err(if after.starts_with(':') {
                SplitError::TooManyColons
            } else {
                SplitError::MissingPort
            });
        }
        if host.contains('[') || after.contains('[') || after.contains(']') {
            return Err(SplitError::UnexpectedBracket);
        }
        host
    } else {
        let host = input.get(..last_colon).unwrap_or_default();
        if host.contains(':') {
            return Err(if input.parse::<Ipv6Addr>().is_ok() {
                SplitError::MissingPort
            } else {
                SplitError::TooManyColons
            });
        }
        if input.contains('[') || input.contains(']') {
            return Err(SplitError::UnexpectedBracket);
        }
        host
    };

    Ok((host, port))
}

/// Determine the originating client address for a request.
///
/// # Errors
///
/// - [`GeoIpError::AddressFormat`] when the remote address cannot be split
///   and the failure is anything other than a missing port.
/// - [`GeoIpError::AddressParse`] when the chosen host is not an IP literal.
pub fn resolve(metadata: &RequestMetadata) -> GeoIpResult<ResolvedIp> {
    let candidate = match metadata.forwarded_for.first() {
        Some(first) => first.as_str(),
        None => host_of(&metadata.remote_address)?,
    };

    candidate.parse()
}

fn host_of(remote_address: &str) -> GeoIpResult<&str> {
    match split_host_port(remote_address) {
        Ok((host, _port)) => Ok(host),
        Err(SplitError::MissingPort) => Ok(remote_address
            .strip_prefix('[')
            .and_then(|inner| inner.strip_suffix(']'))
            .unwrap_or(remote_address)),
        Err(e) => Err(GeoIpError::AddressFormat {
            input: remote_address.to_string(),
            reason: e.to_string(),
        }),
    }
}
