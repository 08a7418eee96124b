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

//! The round-robin rotation cache.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::path::{CandidatePath, CandidateSet, PathKey};

/// Rotation cache errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RotationError {
    /// The candidate set is empty.
    #[error("no candidate paths in rotation")]
    Empty,
    /// The cursor or key sequence no longer matches the candidate map.
    #[error("inconsistent rotation state: cursor {cursor}, {keys} keys, {paths} paths")]
    Inconsistent {
        /// Current cursor position.
        cursor: usize,
        /// Length of the frozen key sequence.
        keys: usize,
        /// Size of the candidate map.
        paths: usize,
    },
}

/// Candidate paths with a frozen key order and a rotation cursor.
///
/// Owned exclusively by one connection wrapper. Populated at most once, from
/// the first round-robin resolution that yields candidates; the key order is
/// frozen at population time (key order of the candidate set, which is
/// sorted) and never re-sorted.
#[derive(Debug, Default)]
pub struct RoundRobinCache {
    paths: BTreeMap<PathKey, CandidatePath>,
    keys: Vec<PathKey>,
    cursor: usize,
}

impl RoundRobinCache {
    /// Builds a populated cache from a resolved candidate set.
    pub fn from_set(set: CandidateSet) -> Self {
        let paths: BTreeMap<PathKey, CandidatePath> = set.into_iter().collect();
        let keys: Vec<PathKey> = paths.keys().cloned().collect();
        Self {
            paths,
            keys,
            cursor: 0,
        }
    }

    /// Whether the cache has been populated with at least one candidate.
    ///
    /// An empty resolution never counts as populated, so the next send
    /// retries resolution instead of failing forever.
    pub fn is_populated(&self) -> bool {
        !self.keys.is_empty()
    }

    /// Returns the candidate at the current cursor.
    ///
    /// Verifies the cache invariants before selecting; a violation means the
    /// cache was corrupted and using it would route inconsistently.
    pub fn select(&self) -> Result<CandidatePath, RotationError> {
        if self.keys.is_empty() {
            return Err(RotationError::Empty);
        }
        if self.cursor >= self.keys.len() || self.keys.len() != self.paths.len() {
            return Err(RotationError::Inconsistent {
                cursor: self.cursor,
                keys: self.keys.len(),
                paths: self.paths.len(),
            });
        }
        self.paths
            .get(&self.keys[self.cursor])
            .cloned()
            .ok_or(RotationError::Inconsistent {
                cursor: self.cursor,
                keys: self.keys.len(),
                paths: self.paths.len(),
            })
    }

    /// Advances the cursor to the next candidate, wrapping around.
    pub fn advance(&mut self) {
        if !self.keys.is_empty() {
            self.cursor = (self.cursor + 1) % self.keys.len();
        }
    }

    /// The current cursor position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::path::HostInfo;

    fn set(tags: &[&str]) -> CandidateSet {
        tags.iter()
            .map(|tag| {
                (
                    PathKey::from(*tag),
                    CandidatePath {
                        fwd_path: Bytes::from(tag.as_bytes().repeat(8)),
                        next_hop: HostInfo {
                            addr: Some([10, 0, 0, 1].into()),
                            port: 30041,
                        },
                    },
                )
            })
            .collect()
    }

    #[test]
    fn rotates_in_key_order() {
        let mut cache = RoundRobinCache::from_set(set(&["b", "a", "c"]));
        assert!(cache.is_populated());

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(cache.select().unwrap().fwd_path.clone());
            cache.advance();
        }

        // Key order a, b, c, then wraps back to a.
        assert_eq!(seen[0], Bytes::from("aaaaaaaa".as_bytes()));
        assert_eq!(seen[1], Bytes::from("bbbbbbbb".as_bytes()));
        assert_eq!(seen[2], Bytes::from("cccccccc".as_bytes()));
        assert_eq!(seen[3], seen[0]);
    }

    #[test]
    fn empty_set_does_not_populate() {
        let cache = RoundRobinCache::from_set(CandidateSet::new());
        assert!(!cache.is_populated());
        assert_eq!(cache.select(), Err(RotationError::Empty));
    }

    #[test]
    fn detects_corrupted_state() {
        let mut cache = RoundRobinCache::from_set(set(&["a", "b"]));

        // A cursor beyond the key sequence must be caught, not wrapped.
        cache.cursor = 7;
        assert!(matches!(
            cache.select(),
            Err(RotationError::Inconsistent {
                cursor: 7,
                keys: 2,
                paths: 2
            })
        ));

        // A key sequence that diverged from the map must be caught too.
        cache.cursor = 0;
        cache.keys.push(PathKey::from("ghost"));
        assert!(matches!(
            cache.select(),
            Err(RotationError::Inconsistent { .. })
        ));
    }
}
