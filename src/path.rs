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

//! Resolver-supplied path material.
//!
//! Forwarding paths are opaque to this crate: they are produced by the path
//! resolver, prepared once for use and then attached to outgoing packets
//! unmodified. The only structure this layer assumes is the 4-byte dataplane
//! line size.

use std::{collections::BTreeMap, fmt, net::IpAddr, sync::Arc};

use bytes::Bytes;
use thiserror::Error;

/// Dataplane paths consist of 4-byte lines.
const LINE_SIZE: usize = 4;

/// Errors when preparing a raw forwarding path for use.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathInitError {
    /// The encoded path is empty.
    #[error("forwarding path is empty")]
    Empty,
    /// The encoded path is not a whole number of dataplane lines.
    #[error("forwarding path length {0} is not a multiple of the line size")]
    Misaligned(usize),
}

/// The next hop could not be derived from a candidate's host information.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unable to derive next hop underlay address from host info")]
pub struct BadOverlay;

/// An opaque forwarding path, prepared for use on the dataplane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPath {
    raw: Bytes,
}

impl RawPath {
    /// Prepares an encoded forwarding path for use.
    ///
    /// Fails if the encoding cannot possibly be a valid dataplane path;
    /// the internal structure is otherwise left to the protocol stack.
    pub fn prepare(raw: Bytes) -> Result<Self, PathInitError> {
        if raw.is_empty() {
            return Err(PathInitError::Empty);
        }
        if raw.len() % LINE_SIZE != 0 {
            return Err(PathInitError::Misaligned(raw.len()));
        }
        Ok(Self { raw })
    }

    /// The encoded path bytes.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }
}

/// The underlay address of a path's first hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnderlayAddr(std::net::SocketAddr);

impl UnderlayAddr {
    /// Creates an underlay address.
    pub const fn new(addr: std::net::SocketAddr) -> Self {
        Self(addr)
    }

    /// The wrapped UDP underlay address.
    pub const fn addr(&self) -> std::net::SocketAddr {
        self.0
    }
}

impl fmt::Display for UnderlayAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<std::net::SocketAddr> for UnderlayAddr {
    fn from(addr: std::net::SocketAddr) -> Self {
        Self(addr)
    }
}

/// Next-hop host information attached to a candidate path by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    /// The next-hop host address, if the resolver knows one.
    pub addr: Option<IpAddr>,
    /// The next-hop port.
    pub port: u16,
}

impl HostInfo {
    /// Derives the underlay address used to physically deliver packets.
    pub fn underlay(&self) -> Result<UnderlayAddr, BadOverlay> {
        let addr = self.addr.ok_or(BadOverlay)?;
        Ok(UnderlayAddr::new(std::net::SocketAddr::new(addr, self.port)))
    }
}

/// A stable identifier for a candidate path.
///
/// Keys only fix iteration order over a candidate set; they carry no path
/// semantics.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathKey(Arc<str>);

impl PathKey {
    /// Creates a path key.
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PathKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// One resolver-returned route option between two ISD-ASes.
///
/// Immutable once returned by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePath {
    /// The encoded forwarding path.
    pub fwd_path: Bytes,
    /// Host information the next hop is derived from.
    pub next_hop: HostInfo,
}

/// A set of candidate paths keyed by their stable path key.
///
/// Iteration order is key order, which makes every selection that walks the
/// set reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    paths: BTreeMap<PathKey, CandidatePath>,
}

impl CandidateSet {
    /// Creates an empty candidate set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The resolver's unkeyed default pick: the candidate with the smallest
    /// key, or `None` if the set is empty.
    pub fn pick_default(&self) -> Option<&CandidatePath> {
        self.paths.values().next()
    }

    /// Iterates over `(key, candidate)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&PathKey, &CandidatePath)> {
        self.paths.iter()
    }

    /// The number of candidates in the set.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the set holds no candidates.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FromIterator<(PathKey, CandidatePath)> for CandidateSet {
    fn from_iter<T: IntoIterator<Item = (PathKey, CandidatePath)>>(iter: T) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for CandidateSet {
    type Item = (PathKey, CandidatePath);
    type IntoIter = std::collections::btree_map::IntoIter<PathKey, CandidatePath>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(tag: u8) -> CandidatePath {
        CandidatePath {
            fwd_path: Bytes::from(vec![tag; 8]),
            next_hop: HostInfo {
                addr: Some(IpAddr::from([10, 0, 0, tag])),
                port: 30041,
            },
        }
    }

    #[test]
    fn prepare_rejects_invalid_encodings() {
        assert_eq!(RawPath::prepare(Bytes::new()), Err(PathInitError::Empty));
        assert_eq!(
            RawPath::prepare(Bytes::from_static(&[1, 2, 3])),
            Err(PathInitError::Misaligned(3))
        );

        let path = RawPath::prepare(Bytes::from_static(&[0; 12])).unwrap();
        assert_eq!(path.raw().len(), 12);
    }

    #[test]
    fn underlay_requires_host_address() {
        let info = HostInfo {
            addr: None,
            port: 30041,
        };
        assert_eq!(info.underlay(), Err(BadOverlay));

        let info = HostInfo {
            addr: Some(IpAddr::from([10, 0, 0, 1])),
            port: 30041,
        };
        assert_eq!(
            info.underlay().unwrap().addr(),
            "10.0.0.1:30041".parse().unwrap()
        );
    }

    #[test]
    fn default_pick_is_smallest_key() {
        let set: CandidateSet = [
            (PathKey::from("b"), candidate(2)),
            (PathKey::from("a"), candidate(1)),
            (PathKey::from("c"), candidate(3)),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.pick_default(), Some(&candidate(1)));

        let keys: Vec<_> = set.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(
            keys,
            vec![PathKey::from("a"), PathKey::from("b"), PathKey::from("c")]
        );

        assert!(CandidateSet::new().pick_default().is_none());
    }
}
