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

//! Path selection policies.

use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::path::CandidatePath;

/// The policy name is not one of the recognized selection policies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown path selection policy: {0:?}")]
pub struct UnknownPolicy(pub String);

/// How the connection wrapper picks a path for outgoing packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathSelection {
    /// Query the resolver on every send and take its default pick.
    Arbitrary,
    /// Resolve once per application configuration and reuse that path.
    Static,
    /// Rotate through the filtered candidate set, one path per send.
    RoundRobin,
    /// Uniformly random selection. Declared but not implemented.
    Random,
}

impl PathSelection {
    /// Returns true for the static selection policy.
    pub fn is_static(&self) -> bool {
        *self == PathSelection::Static
    }

    /// Returns true for the arbitrary selection policy.
    pub fn is_arbitrary(&self) -> bool {
        *self == PathSelection::Arbitrary
    }

    /// Returns true for the round-robin selection policy.
    pub fn is_round_robin(&self) -> bool {
        *self == PathSelection::RoundRobin
    }

    /// Returns true for the random selection policy.
    pub fn is_random(&self) -> bool {
        *self == PathSelection::Random
    }
}

impl fmt::Display for PathSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PathSelection::Arbitrary => "arbitrary",
            PathSelection::Static => "static",
            PathSelection::RoundRobin => "round-robin",
            PathSelection::Random => "random",
        };
        f.write_str(name)
    }
}

impl FromStr for PathSelection {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "arbitrary" => Ok(PathSelection::Arbitrary),
            "static" => Ok(PathSelection::Static),
            "round-robin" => Ok(PathSelection::RoundRobin),
            "random" => Ok(PathSelection::Random),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

/// An opaque routing filter restricting the candidate set.
///
/// The connection wrapper never evaluates the filter itself; it is handed to
/// the path resolver, which applies it when building the candidate set.
pub trait PathFilter: Send + Sync + 'static {
    /// Returns true if the path should be considered for selection.
    fn allows(&self, path: &CandidatePath) -> bool;
}
