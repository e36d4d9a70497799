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
//! Lease cache combining the ephemeral and the durable path.

use std::{net::Ipv4Addr, time::Duration};

use chrono::{DateTime, Utc};
use smf_lease_observability::metrics::registry::MetricsRegistry;

use crate::{
    config::LeaseCacheConfig,
    durable::{DurableLeaseStore, InsertOutcome, LeaseDocumentStore},
    ephemeral::EphemeralStore,
    error::LeaseError,
    identity::{KeyEncoding, LeaseIdentity},
    metrics::{LeaseCacheMetrics, LookupPath},
    record::LeaseRecord,
};

/// Remembers which address was leased to which identity.
///
/// Lookups probe the ephemeral store first and fall back to the durable store, copying a durable
/// hit into the ephemeral store. Records are written through to both, durable first.
///
/// The two stores keep independent expiration clocks and are not updated atomically together:
/// a lease can be present in one and absent in the other.
pub struct LeaseCache<S> {
    ephemeral: EphemeralStore,
    durable: DurableLeaseStore<S>,
    key_encoding: KeyEncoding,
    lease_ttl: Duration,
    metrics: LeaseCacheMetrics,
}

impl<S: LeaseDocumentStore> LeaseCache<S> {
    /// Creates a lease cache after checking that the durable store is reachable.
    ///
    /// Fails with [LeaseError::FatalConfiguration] if it is not.
    pub async fn connect(
        store: S,
        config: LeaseCacheConfig,
        metrics_registry: &MetricsRegistry,
    ) -> Result<Self, LeaseError> {
        let durable = DurableLeaseStore::connect(store, config).await?;
        Ok(Self::new(durable, config, metrics_registry))
    }

    /// Creates a lease cache on top of an existing durable adapter.
    pub fn new(
        durable: DurableLeaseStore<S>,
        config: LeaseCacheConfig,
        metrics_registry: &MetricsRegistry,
    ) -> Self {
        let metrics = LeaseCacheMetrics::new(metrics_registry);
        Self {
            ephemeral: EphemeralStore::new(config.lease_ttl),
            durable: durable.with_metrics(metrics.clone()),
            key_encoding: config.key_encoding,
            lease_ttl: config.lease_ttl,
            metrics,
        }
    }

    /// Returns the address leased to `identity`, or `None` if neither store knows one.
    ///
    /// An error means the durable store could not answer. It does NOT confirm the identity holds
    /// no lease.
    pub async fn lookup(&self, identity: &LeaseIdentity) -> Result<Option<Ipv4Addr>, LeaseError> {
        self.lookup_at(identity, Utc::now()).await
    }

    /// Like [Self::lookup] with an explicit current time.
    pub async fn lookup_at(
        &self,
        identity: &LeaseIdentity,
        now: DateTime<Utc>,
    ) -> Result<Option<Ipv4Addr>, LeaseError> {
        let key = self.key_encoding.encode(identity);

        match self.ephemeral.lookup_at(&key, now) {
            Ok(record) => {
                self.metrics.lookup(LookupPath::Ephemeral, true);
                return Ok(Some(record.address));
            }
            Err(LeaseError::Expired) => {
                self.metrics.ephemeral_expired_total.inc();
                self.update_entries_gauge();
            }
            Err(_) => {}
        }
        self.metrics.lookup(LookupPath::Ephemeral, false);

        match self.durable.find_lease_at(identity, now).await {
            Ok(record) => {
                self.metrics.lookup(LookupPath::Durable, true);
                tracing::debug!(
                    supi = %identity.supi,
                    address = %record.address,
                    "Restoring durable lease into ephemeral store"
                );
                self.ephemeral
                    .put(key, LeaseRecord::new(record.address, now, self.lease_ttl));
                self.update_entries_gauge();
                Ok(Some(record.address))
            }
            Err(LeaseError::NotFound) => {
                self.metrics.lookup(LookupPath::Durable, false);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Records that `address` was leased to `identity`.
    ///
    /// The durable store is written first. If that fails the ephemeral store is left untouched
    /// and the error is returned.
    pub async fn record(
        &self,
        identity: &LeaseIdentity,
        address: Ipv4Addr,
    ) -> Result<(), LeaseError> {
        self.record_at(identity, address, Utc::now()).await
    }

    /// Like [Self::record] with an explicit current time.
    pub async fn record_at(
        &self,
        identity: &LeaseIdentity,
        address: Ipv4Addr,
        now: DateTime<Utc>,
    ) -> Result<(), LeaseError> {
        let outcome = self.durable.insert_lease_at(identity, address, now).await?;

        self.ephemeral.put(
            self.key_encoding.encode(identity),
            LeaseRecord::new(address, now, self.lease_ttl),
        );
        self.update_entries_gauge();
        self.metrics.records_total.inc();

        tracing::info!(
            supi = %identity.supi,
            %address,
            already_present = outcome == InsertOutcome::AlreadyPresent,
            "Recorded lease"
        );
        Ok(())
    }

    /// Returns true if any identity holds a durable lease of `address`.
    pub async fn is_address_leased(&self, address: Ipv4Addr) -> Result<bool, LeaseError> {
        let leased = self.durable.conflict_check(address).await?;
        if leased {
            self.metrics.conflicts_total.inc();
            tracing::debug!(%address, "Address already leased");
        }
        Ok(leased)
    }

    /// Deletes expired durable leases. Returns the number of deleted leases.
    pub async fn purge_expired(&self) -> Result<u64, LeaseError> {
        self.durable.purge_expired().await
    }

    /// The ephemeral store.
    pub fn ephemeral(&self) -> &EphemeralStore {
        &self.ephemeral
    }

    /// The durable store adapter.
    pub fn durable(&self) -> &DurableLeaseStore<S> {
        &self.durable
    }

    fn update_entries_gauge(&self) {
        self.metrics.ephemeral_entries.set(self.ephemeral.len() as i64);
    }
}
