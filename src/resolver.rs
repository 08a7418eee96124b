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

//! The path resolver collaborator interface.
//!
//! Path discovery, path metrics and path validity are entirely the
//! resolver's responsibility; this crate only consumes the candidate sets it
//! returns.

use std::borrow::Cow;

use async_trait::async_trait;

use crate::{address::IsdAsn, path::CandidateSet, policy::PathFilter};

/// Flags for unfiltered path queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryFlags {
    /// Bypass the resolver's own cache and fetch fresh paths.
    pub refresh: bool,
}

/// Errors reported by the path resolver.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    /// The path lookup itself failed.
    #[error("path lookup failed: {0}")]
    Lookup(Cow<'static, str>),
    /// The resolver could not be reached.
    #[error("path resolver unavailable: {0}")]
    Unavailable(Cow<'static, str>),
}

/// Resolves candidate paths between two ISD-ASes.
///
/// Both queries involve a network round-trip to the resolver; cancellation
/// and timeouts are the resolver implementation's contract.
#[async_trait]
pub trait PathResolver: Send + Sync + 'static {
    /// Queries candidate paths with the given routing filter applied by the
    /// resolver.
    async fn query_filtered(
        &self,
        src: IsdAsn,
        dst: IsdAsn,
        filter: Option<&dyn PathFilter>,
    ) -> Result<CandidateSet, ResolveError>;

    /// Queries candidate paths raw, without any filtering.
    async fn query(
        &self,
        src: IsdAsn,
        dst: IsdAsn,
        flags: QueryFlags,
    ) -> Result<CandidateSet, ResolveError>;
}
