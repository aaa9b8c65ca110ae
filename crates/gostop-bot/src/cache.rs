//! Caller-owned memo of finished decisions keyed by a state digest.

use crate::dispatch::DecisionRecord;
use gostop_core::model::action::DecisionKind;
use gostop_core::model::player::Seat;
use gostop_core::model::state::GameState;
use std::collections::{HashMap, VecDeque};
use std::hash::{DefaultHasher, Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecisionCacheKey {
    seat: Seat,
    kind: DecisionKind,
    policy: &'static str,
    digest: u64,
}

impl DecisionCacheKey {
    pub fn new(seat: Seat, kind: DecisionKind, policy: &'static str, digest: u64) -> Self {
        Self {
            seat,
            kind,
            policy,
            digest,
        }
    }

    /// `None` when the state cannot be serialized for hashing.
    pub fn for_state(
        state: &GameState,
        seat: Seat,
        kind: DecisionKind,
        policy: &'static str,
    ) -> Option<Self> {
        let bytes = serde_json::to_vec(state).ok()?;
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        Some(Self::new(seat, kind, policy, hasher.finish()))
    }
}

/// Stores decision records with least-recently-used eviction.
#[derive(Debug)]
pub struct DecisionCache {
    entries: HashMap<DecisionCacheKey, DecisionRecord>,
    order: VecDeque<DecisionCacheKey>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl DecisionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
            hits: 0,
            misses: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn get(&mut self, key: &DecisionCacheKey) -> Option<&DecisionRecord> {
        if self.entries.contains_key(key) {
            self.hits += 1;
            self.touch(key);
            self.entries.get(key)
        } else {
            self.misses += 1;
            None
        }
    }

    pub fn insert(&mut self, key: DecisionCacheKey, record: DecisionRecord) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(key, record).is_some() {
            self.touch(&key);
        } else {
            self.order.push_back(key);
        }
        self.evict_if_needed();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn touch(&mut self, key: &DecisionCacheKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(*key);
    }

    fn evict_if_needed(&mut self) {
        while self.capacity > 0 && self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{DecisionOutcome, NoDecisionReason};

    fn record(seat: Seat) -> DecisionRecord {
        DecisionRecord {
            kind: DecisionKind::GoStop,
            seat,
            policy: "phase_profile",
            outcome: DecisionOutcome::NoDecision {
                reason: NoDecisionReason::NoLegalCandidates,
            },
        }
    }

    fn key(digest: u64) -> DecisionCacheKey {
        DecisionCacheKey::new(Seat::North, DecisionKind::GoStop, "phase_profile", digest)
    }

    #[test]
    fn cache_respects_capacity() {
        let mut cache = DecisionCache::new(1);
        cache.insert(key(1), record(Seat::North));
        cache.insert(key(2), record(Seat::North));
        assert!(cache.get(&key(1)).is_none());
        assert!(cache.get(&key(2)).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn recent_hits_survive_eviction() {
        let mut cache = DecisionCache::new(2);
        cache.insert(key(1), record(Seat::North));
        cache.insert(key(2), record(Seat::North));
        assert!(cache.get(&key(1)).is_some());
        cache.insert(key(3), record(Seat::North));
        assert!(cache.get(&key(1)).is_some());
        assert!(cache.get(&key(2)).is_none());
        assert_eq!(cache.hits(), 2);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let mut cache = DecisionCache::new(0);
        cache.insert(key(1), record(Seat::South));
        assert!(cache.is_empty());
    }

    #[test]
    fn digest_tracks_state_changes() {
        let state = GameState::empty(Seat::North);
        let a = DecisionCacheKey::for_state(&state, Seat::North, DecisionKind::PlayCard, "v")
            .unwrap();
        let b = DecisionCacheKey::for_state(&state, Seat::North, DecisionKind::PlayCard, "v")
            .unwrap();
        assert_eq!(a, b);
        let mut moved = state.clone();
        moved.turn_seq += 1;
        let c = DecisionCacheKey::for_state(&moved, Seat::North, DecisionKind::PlayCard, "v")
            .unwrap();
        assert_ne!(a, c);
    }
}
