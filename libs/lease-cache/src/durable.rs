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
//! Durable lease store.
//!
//! Leases are mirrored in a networked document store so they survive restarts and are visible
//! to other instances. The store itself is abstracted by [LeaseDocumentStore]; the
//! [DurableLeaseStore] adapter implements the lease semantics on top of it and bounds every call
//! by a deadline.

use std::{future::Future, net::Ipv4Addr, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::timeout;

use crate::{
    config::LeaseCacheConfig,
    error::{DocumentStoreError, DurableOperation, LeaseError, StoreFailure},
    identity::LeaseIdentity,
    metrics::LeaseCacheMetrics,
    record::{LeaseRecord, expiry_after},
};

mod document;
pub mod memory;

pub use document::{LeaseDocument, LeaseFilter};

/// Document store holding lease documents.
///
/// Implementations talk to the actual database. They don't need to enforce deadlines, the
/// [DurableLeaseStore] does.
#[async_trait]
pub trait LeaseDocumentStore: Send + Sync {
    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<(), DocumentStoreError>;

    /// Returns the document matching `filter` with the latest expiration, if any.
    async fn find_one(
        &self,
        filter: &LeaseFilter,
    ) -> Result<Option<LeaseDocument>, DocumentStoreError>;

    /// Stores `document` unless the same identity already holds the same address.
    ///
    /// Check and write are one atomic step. Documents of the same identity for other addresses
    /// are replaced by `document` in that step, so an identity never holds more than one
    /// document. An existing document for the same address is left untouched.
    async fn insert_if_absent(
        &self,
        document: LeaseDocument,
    ) -> Result<InsertOutcome, DocumentStoreError>;

    /// Sets the expiration of all documents matching `filter`. Returns the number of matched
    /// documents.
    async fn update_expiration(
        &self,
        filter: &LeaseFilter,
        expires_at: DateTime<Utc>,
    ) -> Result<u64, DocumentStoreError>;

    /// Counts the documents matching `filter`.
    async fn count(&self, filter: &LeaseFilter) -> Result<u64, DocumentStoreError>;

    /// Deletes all documents matching `filter`. Returns the number of deleted documents.
    async fn delete_many(&self, filter: &LeaseFilter) -> Result<u64, DocumentStoreError>;
}

#[async_trait]
impl<T: LeaseDocumentStore + ?Sized> LeaseDocumentStore for Arc<T> {
    async fn ping(&self) -> Result<(), DocumentStoreError> {
        (**self).ping().await
    }

    async fn find_one(
        &self,
        filter: &LeaseFilter,
    ) -> Result<Option<LeaseDocument>, DocumentStoreError> {
        (**self).find_one(filter).await
    }

    async fn insert_if_absent(
        &self,
        document: LeaseDocument,
    ) -> Result<InsertOutcome, DocumentStoreError> {
        (**self).insert_if_absent(document).await
    }

    async fn update_expiration(
        &self,
        filter: &LeaseFilter,
        expires_at: DateTime<Utc>,
    ) -> Result<u64, DocumentStoreError> {
        (**self).update_expiration(filter, expires_at).await
    }

    async fn count(&self, filter: &LeaseFilter) -> Result<u64, DocumentStoreError> {
        (**self).count(filter).await
    }

    async fn delete_many(&self, filter: &LeaseFilter) -> Result<u64, DocumentStoreError> {
        (**self).delete_many(filter).await
    }
}

/// Result of [DurableLeaseStore::insert_lease].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new document was stored.
    Inserted,
    /// A new document was stored in place of the identity's lease of another address.
    Replaced,
    /// A document for the identity and address already existed and was left untouched.
    AlreadyPresent,
}

/// Lease semantics on top of a [LeaseDocumentStore].
pub struct DurableLeaseStore<S> {
    store: S,
    config: LeaseCacheConfig,
    metrics: Option<LeaseCacheMetrics>,
}

impl<S: LeaseDocumentStore> DurableLeaseStore<S> {
    /// Creates the adapter without probing the store.
    pub fn new(store: S, config: LeaseCacheConfig) -> Self {
        Self {
            store,
            config,
            metrics: None,
        }
    }

    /// Creates the adapter after checking that the store is reachable within the read deadline.
    ///
    /// Fails with [LeaseError::FatalConfiguration] otherwise.
    pub async fn connect(store: S, config: LeaseCacheConfig) -> Result<Self, LeaseError> {
        let durable = Self::new(store, config);
        let probe = durable
            .run(
                DurableOperation::Ping,
                durable.config.read_timeout,
                durable.store.ping(),
            )
            .await;
        match probe {
            Ok(()) => Ok(durable),
            Err(LeaseError::StoreUnavailable { source, .. }) => {
                tracing::error!(error = %source, "Durable lease store unreachable at startup");
                Err(LeaseError::FatalConfiguration(source))
            }
            Err(e) => Err(e),
        }
    }

    /// Record failures in `metrics`.
    pub fn with_metrics(mut self, metrics: LeaseCacheMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The underlying document store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Looks up the lease of `identity` and renews it.
    pub async fn find_lease(&self, identity: &LeaseIdentity) -> Result<LeaseRecord, LeaseError> {
        self.find_lease_at(identity, Utc::now()).await
    }

    /// Like [Self::find_lease] with an explicit current time.
    ///
    /// The stored expiration is not checked, a document is a lease until it is purged. On success
    /// the document's expiration is pushed to `now + ttl`. If that refresh fails the lease is
    /// still returned, carrying its previous expiration.
    pub async fn find_lease_at(
        &self,
        identity: &LeaseIdentity,
        now: DateTime<Utc>,
    ) -> Result<LeaseRecord, LeaseError> {
        let filter = LeaseFilter::identity(identity);
        let document = self
            .run(
                DurableOperation::FindLease,
                self.config.read_timeout,
                self.store.find_one(&filter),
            )
            .await?
            .ok_or(LeaseError::NotFound)?;

        let record = document.to_record().inspect_err(|_| {
            tracing::error!(
                supi = %identity.supi,
                address = %document.address,
                "Stored lease has a malformed address"
            );
        })?;

        let expires_at = expiry_after(now, self.config.lease_ttl);
        let refresh_filter = filter.with_address(record.address);
        match self
            .run(
                DurableOperation::RefreshLease,
                self.config.read_timeout,
                self.store.update_expiration(&refresh_filter, expires_at),
            )
            .await
        {
            Ok(_) => Ok(LeaseRecord { expires_at, ..record }),
            Err(e) => {
                tracing::warn!(
                    supi = %identity.supi,
                    address = %record.address,
                    error = %e,
                    "Returning durable lease without renewing it"
                );
                Ok(record)
            }
        }
    }

    /// Stores a lease of `address` for `identity` unless one exists already.
    ///
    /// A lease the identity holds for another address is replaced.
    pub async fn insert_lease(
        &self,
        identity: &LeaseIdentity,
        address: Ipv4Addr,
    ) -> Result<InsertOutcome, LeaseError> {
        self.insert_lease_at(identity, address, Utc::now()).await
    }

    /// Like [Self::insert_lease] with an explicit current time.
    ///
    /// An existing document for the same identity and address is not renewed.
    pub async fn insert_lease_at(
        &self,
        identity: &LeaseIdentity,
        address: Ipv4Addr,
        now: DateTime<Utc>,
    ) -> Result<InsertOutcome, LeaseError> {
        let document = LeaseDocument::new(
            identity,
            address,
            expiry_after(now, self.config.lease_ttl),
        );

        let outcome = self
            .run(
                DurableOperation::InsertLease,
                self.config.insert_timeout,
                self.store.insert_if_absent(document),
            )
            .await?;

        match outcome {
            InsertOutcome::Inserted => {
                tracing::debug!(supi = %identity.supi, %address, "Stored durable lease");
            }
            InsertOutcome::Replaced => {
                tracing::info!(
                    supi = %identity.supi,
                    %address,
                    "Replaced durable lease of another address"
                );
            }
            InsertOutcome::AlreadyPresent => {
                tracing::debug!(supi = %identity.supi, %address, "Durable lease already present");
            }
        }
        Ok(outcome)
    }

    /// Returns true if any identity holds a lease of `address`.
    pub async fn conflict_check(&self, address: Ipv4Addr) -> Result<bool, LeaseError> {
        let count = self
            .run(
                DurableOperation::ConflictCheck,
                self.config.read_timeout,
                self.store.count(&LeaseFilter::address(address)),
            )
            .await?;
        Ok(count > 0)
    }

    /// Deletes every lease that expired at or before now.
    pub async fn purge_expired(&self) -> Result<u64, LeaseError> {
        self.purge_expired_at(Utc::now()).await
    }

    /// Like [Self::purge_expired] with an explicit current time.
    pub async fn purge_expired_at(&self, now: DateTime<Utc>) -> Result<u64, LeaseError> {
        let deleted = self
            .run(
                DurableOperation::PurgeExpired,
                self.config.read_timeout,
                self.store.delete_many(&LeaseFilter::expired(now)),
            )
            .await?;
        if deleted > 0 {
            tracing::info!(deleted, "Purged expired durable leases");
        }
        Ok(deleted)
    }

    /// Runs `fut` under `deadline`, turning every failure into [LeaseError::StoreUnavailable].
    async fn run<T, F>(
        &self,
        operation: DurableOperation,
        deadline: Duration,
        fut: F,
    ) -> Result<T, LeaseError>
    where
        F: Future<Output = Result<T, DocumentStoreError>>,
    {
        let failure = match timeout(deadline, fut).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => StoreFailure::Backend(e),
            Err(_) => StoreFailure::Timeout(deadline),
        };

        tracing::warn!(%operation, error = %failure, "Durable lease store operation failed");
        if let Some(metrics) = &self.metrics {
            metrics.durable_failure(operation);
        }
        Err(LeaseError::unavailable(operation, failure))
    }
}
