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
//! Lease cache configuration.

use std::time::Duration;

use anyhow::ensure;
use serde::{Deserialize, Serialize};

use crate::{identity::KeyEncoding, record::DEFAULT_LEASE_TTL};

/// Deadline for durable reads, conflict checks and purges.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);
/// Deadline for durable inserts.
pub const DEFAULT_INSERT_TIMEOUT: Duration = Duration::from_secs(10);

/// Lease cache configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaseCacheConfig {
    /// Lifetime of a lease after creation or its last successful read.
    pub lease_ttl: Duration,
    /// Deadline for durable lookups, conflict checks, purges and the startup probe.
    pub read_timeout: Duration,
    /// Deadline for durable inserts.
    pub insert_timeout: Duration,
    /// Encoding of identities into ephemeral store keys.
    pub key_encoding: KeyEncoding,
}

impl Default for LeaseCacheConfig {
    fn default() -> Self {
        Self {
            lease_ttl: DEFAULT_LEASE_TTL,
            read_timeout: DEFAULT_READ_TIMEOUT,
            insert_timeout: DEFAULT_INSERT_TIMEOUT,
            key_encoding: KeyEncoding::default(),
        }
    }
}

impl LeaseCacheConfig {
    /// Set the lease lifetime.
    pub fn with_lease_ttl(mut self, lease_ttl: Duration) -> Self {
        self.lease_ttl = lease_ttl;
        self
    }

    /// Set the deadline for durable reads.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Set the deadline for durable inserts.
    pub fn with_insert_timeout(mut self, insert_timeout: Duration) -> Self {
        self.insert_timeout = insert_timeout;
        self
    }

    /// Set the key encoding.
    pub fn with_key_encoding(mut self, key_encoding: KeyEncoding) -> Self {
        self.key_encoding = key_encoding;
        self
    }

    /// Checks that all durations are non-zero.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.lease_ttl.is_zero(), "lease TTL must not be zero");
        ensure!(!self.read_timeout.is_zero(), "read timeout must not be zero");
        ensure!(
            !self.insert_timeout.is_zero(),
            "insert timeout must not be zero"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_lease_policy() {
        let config = LeaseCacheConfig::default();
        assert_eq!(config.lease_ttl, Duration::from_secs(86_400));
        assert_eq!(config.read_timeout, Duration::from_secs(5));
        assert_eq!(config.insert_timeout, Duration::from_secs(10));
        assert_eq!(config.key_encoding, KeyEncoding::LengthPrefixed);
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn should_fill_missing_fields_with_defaults() {
        let config: LeaseCacheConfig =
            serde_json::from_str(r#"{ "key_encoding": "legacy" }"#).unwrap();
        assert_eq!(
            config,
            LeaseCacheConfig::default().with_key_encoding(KeyEncoding::Legacy)
        );
    }

    #[test]
    fn should_reject_zero_durations() {
        let config = LeaseCacheConfig::default().with_read_timeout(Duration::ZERO);
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "read timeout must not be zero");

        assert!(
            LeaseCacheConfig::default()
                .with_lease_ttl(Duration::ZERO)
                .validate()
                .is_err()
        );
    }
}
