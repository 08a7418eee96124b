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

//! The path-selecting connection wrapper.
//!
//! [PolicyConn] wraps a path-aware connection and decides, for every
//! outgoing send, which previously discovered path the packet takes. The
//! caller only supplies the logical destination; the wrapper attaches a next
//! hop and forwarding path according to the configured [PathSelection]
//! policy and delegates the byte transfer to the underlying connection.
//! Everything except the addressed send is a plain delegation.

pub mod rotation;

use std::{io, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::{
    address::SocketAddr,
    appconf::{AppConf, HalfSetSlot},
    path::{BadOverlay, CandidatePath, PathInitError, RawPath, UnderlayAddr},
    policy::PathSelection,
    resolver::{PathResolver, QueryFlags, ResolveError},
};

use self::rotation::{RotationError, RoundRobinCache};

/// Errors when sending through a [PolicyConn].
///
/// Every failure aborts the send with zero bytes transferred; nothing is
/// retried internally and no cached state is committed on failure.
#[derive(Debug, Error)]
pub enum SendError {
    /// The active selection policy has no implemented selection branch.
    #[error("path selection policy {0} is not supported")]
    UnsupportedPolicy(PathSelection),
    /// The resolver returned no candidate path to the destination.
    #[error("no path found to destination")]
    NoPath,
    /// The candidate's forwarding path could not be prepared for use.
    #[error("forwarding path could not be prepared")]
    PathInit(#[from] PathInitError),
    /// No next-hop underlay address could be derived from the candidate.
    #[error(transparent)]
    BadOverlay(#[from] BadOverlay),
    /// The static path slot holds exactly one of next hop and path.
    #[error(transparent)]
    InconsistentStaticState(#[from] HalfSetSlot),
    /// The round-robin cache cursor or key sequence is corrupted.
    #[error("inconsistent path state: {0}")]
    InconsistentPathState(RotationError),
    /// The destination address does not belong to the SCION address family.
    #[error("cannot send to non-SCION destination {0}")]
    NonNativeDestination(std::net::SocketAddr),
    /// The path resolver reported an error.
    #[error("path resolution failed: {0}")]
    Resolver(#[from] ResolveError),
    /// The underlying connection returned an I/O error.
    #[error("underlying connection returned an I/O error: {0:?}")]
    Io(#[from] io::Error),
}

impl From<RotationError> for SendError {
    fn from(err: RotationError) -> Self {
        match err {
            RotationError::Empty => SendError::NoPath,
            inconsistent => SendError::InconsistentPathState(inconsistent),
        }
    }
}

/// The narrow capability interface of the underlying path-aware connection.
///
/// Implementations accept a destination annotated with a chosen forwarding
/// path and next hop and perform the actual transfer. Cancellation and
/// timeouts are the implementation's contract; callers wrap these futures in
/// `tokio::time::timeout` where needed.
#[async_trait]
pub trait PathAwareConn: Send + Sync {
    /// Sends a payload to the destination via the given next hop and path.
    async fn send_to_via(
        &self,
        payload: &[u8],
        dst: SocketAddr,
        next_hop: &UnderlayAddr,
        path: &RawPath,
    ) -> io::Result<usize>;

    /// Sends a payload to the connected remote address.
    async fn send(&self, payload: &[u8]) -> io::Result<usize>;

    /// Receives a payload from the connected remote address.
    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Receives a payload from any address.
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// The local address the connection is bound to.
    fn local_addr(&self) -> SocketAddr;

    /// The connected remote address, if any.
    fn remote_addr(&self) -> Option<SocketAddr>;

    /// Closes the connection.
    async fn close(&self) -> io::Result<()>;
}

/// A destination address handed to [PolicyConn::send_to].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAddr {
    /// A native SCION destination.
    Scion(SocketAddr),
    /// A plain IP destination. Rejected by the wrapper.
    Ip(std::net::SocketAddr),
}

impl From<SocketAddr> for RemoteAddr {
    fn from(addr: SocketAddr) -> Self {
        RemoteAddr::Scion(addr)
    }
}

impl From<std::net::SocketAddr> for RemoteAddr {
    fn from(addr: std::net::SocketAddr) -> Self {
        RemoteAddr::Ip(addr)
    }
}

/// A connection wrapper that selects paths by policy.
///
/// The wrapper holds a shared reference to the [AppConf] (one configuration
/// may back several wrappers) and exclusively owns its round-robin rotation
/// state. It is created once per logical connection and destroyed with the
/// underlying connection.
pub struct PolicyConn<C> {
    conn: C,
    conf: Arc<AppConf>,
    resolver: Arc<dyn PathResolver>,
    rotation: Mutex<RoundRobinCache>,
}

impl<C> std::fmt::Debug for PolicyConn<C>
where
    C: PathAwareConn,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyConn")
            .field("local_addr", &self.conn.local_addr())
            .field("selection", &self.conf.selection())
            .finish()
    }
}

impl<C> PolicyConn<C>
where
    C: PathAwareConn,
{
    /// Wraps a path-aware connection.
    pub fn new(conn: C, conf: Arc<AppConf>, resolver: Arc<dyn PathResolver>) -> Self {
        Self {
            conn,
            conf,
            resolver,
            rotation: Mutex::new(RoundRobinCache::default()),
        }
    }

    /// Sends a payload to a destination that carries no routing decision.
    ///
    /// Non-SCION destinations fail with [SendError::NonNativeDestination].
    pub async fn send_to(
        &self,
        payload: &[u8],
        dst: impl Into<RemoteAddr>,
    ) -> Result<usize, SendError> {
        match dst.into() {
            RemoteAddr::Scion(addr) => self.send_to_scion(payload, addr).await,
            RemoteAddr::Ip(addr) => Err(SendError::NonNativeDestination(addr)),
        }
    }

    /// Sends a payload to a SCION destination, selecting the path according
    /// to the configured policy.
    pub async fn send_to_scion(
        &self,
        payload: &[u8],
        dst: SocketAddr,
    ) -> Result<usize, SendError> {
        let src = self.conn.local_addr().isd_asn();
        let (next_hop, path) = match self.conf.selection() {
            PathSelection::Static => self.static_path(dst).await?,
            PathSelection::Arbitrary => self.arbitrary_path(dst).await?,
            PathSelection::RoundRobin => self.round_robin_path(dst).await?,
            unsupported @ PathSelection::Random => {
                return Err(SendError::UnsupportedPolicy(unsupported));
            }
        };

        tracing::trace!(%src, %dst, %next_hop, "sending via selected path");
        Ok(self
            .conn
            .send_to_via(payload, dst, &next_hop, &path)
            .await?)
    }

    /// Static selection: resolve on the first send, reuse the cached pair on
    /// every send after that.
    ///
    /// The slot guard is held across the whole check-resolve-set sequence,
    /// so a configuration shared by concurrent writers still queries the
    /// resolver at most once in its lifetime.
    async fn static_path(&self, dst: SocketAddr) -> Result<(UnderlayAddr, RawPath), SendError> {
        let mut slot = self.conf.static_slot().await;

        if let Some((next_hop, path)) = slot.pair()? {
            tracing::debug!(%next_hop, "reusing cached static path");
            return Ok((next_hop, path));
        }

        tracing::debug!(%dst, "static selection, querying resolver for the first time");
        let set = self
            .resolver
            .query_filtered(
                self.conn.local_addr().isd_asn(),
                dst.isd_asn(),
                self.conf.filter(),
            )
            .await?;
        let (next_hop, path) = decode_candidate(set.pick_default())?;

        // The slot is only written after a fully successful decode.
        slot.set(next_hop, path.clone());
        Ok((next_hop, path))
    }

    /// Arbitrary selection: a fresh unfiltered resolution on every send.
    async fn arbitrary_path(&self, dst: SocketAddr) -> Result<(UnderlayAddr, RawPath), SendError> {
        tracing::debug!(%dst, "arbitrary selection, querying resolver");
        let set = self
            .resolver
            .query(
                self.conn.local_addr().isd_asn(),
                dst.isd_asn(),
                QueryFlags::default(),
            )
            .await?;
        decode_candidate(set.pick_default())
    }

    /// Round-robin selection: resolve once, then rotate through the frozen
    /// candidate order, one path per send.
    async fn round_robin_path(
        &self,
        dst: SocketAddr,
    ) -> Result<(UnderlayAddr, RawPath), SendError> {
        let mut rotation = self.rotation.lock().await;

        let (candidate, fresh) = if rotation.is_populated() {
            (rotation.select()?, None)
        } else {
            tracing::debug!(%dst, "round-robin cache empty, querying resolver");
            let set = self
                .resolver
                .query_filtered(
                    self.conn.local_addr().isd_asn(),
                    dst.isd_asn(),
                    self.conf.filter(),
                )
                .await?;
            let fresh = RoundRobinCache::from_set(set);
            (fresh.select()?, Some(fresh))
        };

        let decoded = decode_candidate(Some(&candidate))?;

        // The cache is only committed and advanced after a successful
        // decode; a failed resolution or decode leaves it untouched, so the
        // next send retries resolution.
        if let Some(fresh) = fresh {
            *rotation = fresh;
        }
        tracing::debug!(cursor = rotation.cursor(), "selected round-robin path");
        rotation.advance();

        Ok(decoded)
    }

    /// Sends a payload to the connected remote address. Plain delegation.
    pub async fn send(&self, payload: &[u8]) -> io::Result<usize> {
        self.conn.send(payload).await
    }

    /// Receives a payload from the connected remote address. Plain
    /// delegation.
    pub async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.conn.recv(buf).await
    }

    /// Receives a payload from any address. Plain delegation.
    pub async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.conn.recv_from(buf).await
    }

    /// The local address of the underlying connection.
    pub fn local_addr(&self) -> SocketAddr {
        self.conn.local_addr()
    }

    /// The connected remote address of the underlying connection, if any.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.conn.remote_addr()
    }

    /// Closes the underlying connection.
    pub async fn close(&self) -> io::Result<()> {
        self.conn.close().await
    }

    /// The application configuration this wrapper selects paths with.
    pub fn conf(&self) -> &Arc<AppConf> {
        &self.conf
    }
}

/// Decodes a candidate path into the next hop and prepared forwarding path.
///
/// Shared by all selection branches.
fn decode_candidate(
    candidate: Option<&CandidatePath>,
) -> Result<(UnderlayAddr, RawPath), SendError> {
    let candidate = candidate.ok_or(SendError::NoPath)?;
    let path = RawPath::prepare(candidate.fwd_path.clone())?;
    let next_hop = candidate.next_hop.underlay()?;
    Ok((next_hop, path))
}
