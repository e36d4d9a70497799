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
//! Process-local lease store.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};

use crate::{
    error::LeaseError,
    identity::LeaseKey,
    record::{DEFAULT_LEASE_TTL, LeaseRecord, expiry_after},
};

/// Concurrent in-memory map from [LeaseKey] to [LeaseRecord].
///
/// Entries are only reclaimed when a read finds them expired, there is no background sweep and
/// no capacity bound. Every successful read pushes the expiration `ttl` into the future, so an
/// entry that keeps being read never expires.
///
/// Operations on one key are atomic with respect to each other. Nothing is ordered across keys.
#[derive(Debug)]
pub struct EphemeralStore {
    entries: DashMap<LeaseKey, LeaseRecord>,
    ttl: Duration,
}

impl Default for EphemeralStore {
    fn default() -> Self {
        Self::new(DEFAULT_LEASE_TTL)
    }
}

impl EphemeralStore {
    /// Creates an empty store renewing entries by `ttl` on every read.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Inserts or replaces the record for `key`.
    pub fn put(&self, key: LeaseKey, record: LeaseRecord) {
        self.entries.insert(key, record);
    }

    /// Returns the record for `key` if it is still valid, renewing it.
    pub fn get(&self, key: &LeaseKey) -> Option<LeaseRecord> {
        self.get_at(key, Utc::now())
    }

    /// Like [Self::get] with an explicit current time.
    pub fn get_at(&self, key: &LeaseKey, now: DateTime<Utc>) -> Option<LeaseRecord> {
        self.lookup_at(key, now).ok()
    }

    /// Returns the record for `key` if it is still valid at `now`.
    ///
    /// * No entry: [LeaseError::NotFound].
    /// * Entry expired at or before `now`: the entry is removed and [LeaseError::Expired] is
    ///   returned.
    /// * Otherwise the expiration is set to `now + ttl` and the renewed record is returned. The
    ///   check and the renewal happen under the same per-key lock.
    pub fn lookup_at(&self, key: &LeaseKey, now: DateTime<Utc>) -> Result<LeaseRecord, LeaseError> {
        // Avoid cloning the key and taking the shard write lock for absent keys.
        if !self.entries.contains_key(key) {
            return Err(LeaseError::NotFound);
        }

        match self.entries.entry(key.clone()) {
            Entry::Vacant(_) => Err(LeaseError::NotFound),
            Entry::Occupied(entry) if entry.get().is_expired_at(now) => {
                let (_, expired) = entry.remove_entry();
                tracing::debug!(
                    key = %key,
                    address = %expired.address,
                    expired_at = %expired.expires_at,
                    "Removed expired ephemeral lease"
                );
                Err(LeaseError::Expired)
            }
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                record.expires_at = expiry_after(now, self.ttl);
                Ok(*record)
            }
        }
    }

    /// Removes the record for `key`, returning it if present.
    pub fn remove(&self, key: &LeaseKey) -> Option<LeaseRecord> {
        self.entries.remove(key).map(|(_, record)| record)
    }

    /// Number of entries, including expired entries not read since they expired.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The renewal period.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
