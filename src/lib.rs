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

//! # Policy-driven path selection for path-aware connections.
//!
//! In a path-aware network the sender, not the network, decides which
//! forwarding path and next hop every packet takes. [conn::PolicyConn] hides
//! that decision behind an ordinary connection interface: the application
//! sends to a logical destination, and the wrapper picks a previously
//! discovered path according to the configured [policy::PathSelection],
//! attaches it to the outgoing address and delegates the transfer to the
//! underlying connection.
//!
//! Path discovery, path liveness and the wire encoding of forwarding paths
//! are the collaborators' business: the [resolver::PathResolver] returns
//! candidate paths, the [conn::PathAwareConn] performs the actual send.
//!
//! ## Selection policies
//!
//! * `arbitrary` — a fresh unfiltered resolution on every send; simple, but
//!   every send pays a resolver round-trip.
//! * `static` — resolve once per [appconf::AppConf] lifetime and reuse the
//!   same next-hop/path pair everywhere the configuration is shared.
//! * `round-robin` — resolve once per wrapper, then rotate through the
//!   candidate set in stable key order, one path per send.
//! * `random` — declared but not supported; sends fail with
//!   [conn::SendError::UnsupportedPolicy].
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use scion_policy_conn::{
//!     appconf::AppConf,
//!     conn::{PathAwareConn, PolicyConn},
//!     resolver::PathResolver,
//! };
//!
//! # async fn example(
//! #     conn: impl PathAwareConn,
//! #     resolver: Arc<dyn PathResolver>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let conf = Arc::new(AppConf::new(None, "round-robin")?);
//! let conn = PolicyConn::new(conn, conf, resolver);
//!
//! let destination: scion_policy_conn::SocketAddr = "1-ff00:0:111,[192.168.1.1]:8080".parse()?;
//! conn.send_to(b"hello", destination).await?;
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod appconf;
pub mod conn;
pub mod path;
pub mod policy;
pub mod resolver;

pub use crate::{
    address::{IsdAsn, SocketAddr, split_host_port},
    appconf::AppConf,
    conn::{PathAwareConn, PolicyConn, RemoteAddr, SendError},
    path::{CandidatePath, CandidateSet, PathKey, RawPath, UnderlayAddr},
    policy::{PathFilter, PathSelection},
    resolver::{PathResolver, QueryFlags, ResolveError},
};
