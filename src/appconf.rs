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

//! Per-application configuration for path-aware connections.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

use crate::{
    path::{RawPath, UnderlayAddr},
    policy::{PathFilter, PathSelection, UnknownPolicy},
};

/// The static slot holds a next hop without a path or vice versa.
///
/// Both fields must be set or both unset; anything else means the slot was
/// corrupted and routing with it would be inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("static next hop and path must both be set or both be unset")]
pub struct HalfSetSlot;

/// The static next-hop/path pair cached under [PathSelection::Static].
///
/// Written exactly once, by the first successful static-mode send; read-only
/// afterwards.
#[derive(Debug, Clone, Default)]
pub struct StaticSlot {
    /// The cached next hop.
    pub next_hop: Option<UnderlayAddr>,
    /// The cached forwarding path.
    pub path: Option<RawPath>,
}

impl StaticSlot {
    /// Returns the cached pair, `None` if the slot is still unset, or
    /// [HalfSetSlot] if exactly one of the two fields is set.
    pub fn pair(&self) -> Result<Option<(UnderlayAddr, RawPath)>, HalfSetSlot> {
        match (&self.next_hop, &self.path) {
            (Some(next_hop), Some(path)) => Ok(Some((*next_hop, path.clone()))),
            (None, None) => Ok(None),
            _ => Err(HalfSetSlot),
        }
    }

    /// Stores a fully decoded pair.
    pub fn set(&mut self, next_hop: UnderlayAddr, path: RawPath) {
        self.next_hop = Some(next_hop);
        self.path = Some(path);
    }
}

/// Configuration for path-aware applications.
///
/// Created once per application session and shared by all connection
/// wrappers of that session. Holds the active selection policy, an optional
/// routing filter passed through to the resolver, and the static path slot.
pub struct AppConf {
    selection: PathSelection,
    filter: Option<Arc<dyn PathFilter>>,
    static_slot: Mutex<StaticSlot>,
}

impl std::fmt::Debug for AppConf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConf")
            .field("selection", &self.selection)
            .field("filter", &self.filter.as_ref().map(|_| "dyn PathFilter"))
            .finish()
    }
}

impl AppConf {
    /// Creates a configuration from a routing filter and a policy name.
    ///
    /// Fails with [UnknownPolicy] if the name is not one of the four
    /// recognized policy strings.
    pub fn new(
        filter: Option<Arc<dyn PathFilter>>,
        selection: &str,
    ) -> Result<Self, UnknownPolicy> {
        Ok(Self::with_selection(filter, selection.parse()?))
    }

    /// Creates a configuration from an already parsed selection policy.
    pub fn with_selection(
        filter: Option<Arc<dyn PathFilter>>,
        selection: PathSelection,
    ) -> Self {
        Self {
            selection,
            filter,
            static_slot: Mutex::new(StaticSlot::default()),
        }
    }

    /// The active path selection policy.
    pub fn selection(&self) -> PathSelection {
        self.selection
    }

    /// The routing filter, if one is configured.
    pub fn filter(&self) -> Option<&dyn PathFilter> {
        self.filter.as_deref()
    }

    /// Locks the static path slot.
    ///
    /// Only valid under the static selection policy; any other policy is a
    /// contract violation and aborts. Holding the guard across the
    /// check-resolve-set sequence is what guarantees at most one resolver
    /// query per configuration lifetime, even with concurrent writers.
    pub async fn static_slot(&self) -> MutexGuard<'_, StaticSlot> {
        assert!(
            self.selection.is_static(),
            "static path slot accessed while path selection is not static"
        );
        self.static_slot.lock().await
    }

    /// Stores the static next-hop/path pair.
    ///
    /// Only valid under the static selection policy.
    pub async fn set_static_path(&self, next_hop: UnderlayAddr, path: RawPath) {
        self.static_slot().await.set(next_hop, path);
    }

    /// Returns a copy of the static slot.
    ///
    /// Only valid under the static selection policy.
    pub async fn static_path(&self) -> StaticSlot {
        self.static_slot().await.clone()
    }
}
