// Copyright 2025 Anapaya Systems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! SCION addressing types.
//!
//! Addresses are written in the SCION text format, e.g.
//! `1-ff00:0:110,[192.168.1.1]:8080`: the ISD-AS of the destination domain,
//! the host address in brackets and the port.

use std::{fmt, net::IpAddr, str::FromStr};

use thiserror::Error;

/// Errors when parsing SCION addresses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    /// The ISD-AS part is malformed.
    #[error("invalid ISD-AS: {0:?}")]
    InvalidIsdAsn(String),
    /// The host part is malformed.
    #[error("invalid host address: {0:?}")]
    InvalidHost(String),
    /// The address has no `:port` suffix or the port is not a decimal number.
    #[error("missing or invalid port in address: {0:?}")]
    InvalidPort(String),
}

/// A SCION ISD-AS identifier.
///
/// The upper 16 bits hold the isolation domain, the lower 48 bits the AS
/// number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IsdAsn(u64);

const AS_BITS: u32 = 48;
const AS_MASK: u64 = (1 << AS_BITS) - 1;
const MAX_BGP_AS: u64 = u32::MAX as u64;

impl IsdAsn {
    /// Creates an ISD-AS identifier from its parts.
    pub const fn new(isd: u16, asn: u64) -> Self {
        Self(((isd as u64) << AS_BITS) | (asn & AS_MASK))
    }

    /// The isolation domain.
    pub const fn isd(&self) -> u16 {
        (self.0 >> AS_BITS) as u16
    }

    /// The AS number within the isolation domain.
    pub const fn asn(&self) -> u64 {
        self.0 & AS_MASK
    }

    /// The wildcard ISD-AS, matching any domain.
    pub const WILDCARD: IsdAsn = IsdAsn(0);
}

impl fmt::Display for IsdAsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let asn = self.asn();
        // BGP-compatible AS numbers are written in decimal, larger ones as
        // three 16-bit groups in hex.
        if asn <= MAX_BGP_AS {
            write!(f, "{}-{}", self.isd(), asn)
        } else {
            write!(
                f,
                "{}-{:x}:{:x}:{:x}",
                self.isd(),
                (asn >> 32) & 0xffff,
                (asn >> 16) & 0xffff,
                asn & 0xffff
            )
        }
    }
}

impl FromStr for IsdAsn {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || AddressParseError::InvalidIsdAsn(s.to_string());
        let (isd, asn) = s.split_once('-').ok_or_else(err)?;
        let isd: u16 = isd.parse().map_err(|_| err())?;
        let asn = if asn.contains(':') {
            let mut groups = asn.splitn(3, ':');
            let mut value: u64 = 0;
            for _ in 0..3 {
                let group = groups.next().ok_or_else(err)?;
                let group = u64::from_str_radix(group, 16).map_err(|_| err())?;
                if group > 0xffff {
                    return Err(err());
                }
                value = (value << 16) | group;
            }
            value
        } else {
            let value: u64 = asn.parse().map_err(|_| err())?;
            if value > MAX_BGP_AS {
                return Err(err());
            }
            value
        };
        Ok(IsdAsn::new(isd, asn))
    }
}

/// A SCION socket address: destination domain, host and port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketAddr {
    isd_asn: IsdAsn,
    host: IpAddr,
    port: u16,
}

impl SocketAddr {
    /// Creates a new socket address.
    pub const fn new(isd_asn: IsdAsn, host: IpAddr, port: u16) -> Self {
        Self {
            isd_asn,
            host,
            port,
        }
    }

    /// The ISD-AS the address belongs to.
    pub const fn isd_asn(&self) -> IsdAsn {
        self.isd_asn
    }

    /// The host address.
    pub const fn host(&self) -> IpAddr {
        self.host
    }

    /// The port.
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for SocketAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},[{}]:{}", self.isd_asn, self.host, self.port)
    }
}

impl FromStr for SocketAddr {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = split_host_port(s)?;
        let port: u16 = port
            .parse()
            .map_err(|_| AddressParseError::InvalidPort(s.to_string()))?;

        let err = || AddressParseError::InvalidHost(s.to_string());
        let (ia, host) = host.split_once(',').ok_or_else(err)?;
        let isd_asn: IsdAsn = ia.parse()?;
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .ok_or_else(err)?;
        let host: IpAddr = host.parse().map_err(|_| err())?;

        Ok(SocketAddr::new(isd_asn, host, port))
    }
}

/// Splits a `host:port` string into its host and port parts.
///
/// The split happens at the last colon; everything after it must be a
/// non-empty decimal port. The host part is returned verbatim, so both
/// SCION addresses (`"1-ff00:0:0,[1.1.1.1]:80"`) and plain names
/// (`"foo:80"`) work. Inputs without a trailing port fail.
pub fn split_host_port(hostport: &str) -> Result<(&str, &str), AddressParseError> {
    let err = || AddressParseError::InvalidPort(hostport.to_string());
    let (host, port) = hostport.rsplit_once(':').ok_or_else(err)?;
    if host.is_empty() || port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err());
    }
    Ok((host, port))
}
