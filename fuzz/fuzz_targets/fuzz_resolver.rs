//! Fuzz testing for client address resolution.
//!
//! Both inputs of the resolver come straight off the wire, so it must hold up
//! against arbitrary strings:
//!
//! - Never panic on any input
//! - A successful resolution renders back to the same, canonical address
//! - `split_host_port` only ever returns substrings of its input
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! # Install cargo-fuzz (requires nightly)
//! cargo +nightly install cargo-fuzz
//!
//! # Run the resolver fuzz target
//! cargo +nightly fuzz run fuzz_resolver
//!
//! # Run with a time limit (e.g., 60 seconds)
//! cargo +nightly fuzz run fuzz_resolver -- -max_total_time=60
//! ```

#![no_main]

use std::net::IpAddr;

use arbitrary::Arbitrary;
use geoip_enrich::geoip::{RequestMetadata, resolve, split_host_port};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    remote_address: &'a str,
    forwarded_for: Vec<&'a str>,
}

fuzz_target!(|input: Input<'_>| {
    if let Ok((host, port)) = split_host_port(input.remote_address) {
        assert!(input.remote_address.contains(host));
        assert!(input.remote_address.ends_with(port));
    }

    let metadata =
        RequestMetadata::new(input.remote_address).with_forwarded_for(input.forwarded_for);

    if let Ok(ip) = resolve(&metadata) {
        assert_eq!(ip.to_string().parse::<IpAddr>().ok(), Some(ip.addr()));
        assert_eq!(ip.addr(), ip.addr().to_canonical());
    }
});
