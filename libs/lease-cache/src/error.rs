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
//! Lease cache errors.

use std::{fmt, time::Duration};

use thiserror::Error;

/// Error raised by a [crate::durable::LeaseDocumentStore] implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentStoreError {
    /// The store could not be reached.
    #[error("connection to document store failed: {0}")]
    Connection(String),
    /// The store rejected or failed the request.
    #[error("document store query failed: {0}")]
    Query(String),
}

/// Why a durable store operation did not complete.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreFailure {
    /// The operation exceeded its deadline.
    #[error("deadline of {0:?} exceeded")]
    Timeout(Duration),
    /// The store returned an error.
    #[error(transparent)]
    Backend(#[from] DocumentStoreError),
}

/// The durable store operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurableOperation {
    /// Reachability probe at startup.
    Ping,
    /// Lookup of a lease by identity.
    FindLease,
    /// Expiration refresh after a successful lookup.
    RefreshLease,
    /// Insert-if-absent of a lease.
    InsertLease,
    /// Count of leases holding an address.
    ConflictCheck,
    /// Removal of expired leases.
    PurgeExpired,
}

impl DurableOperation {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            DurableOperation::Ping => "ping",
            DurableOperation::FindLease => "find_lease",
            DurableOperation::RefreshLease => "refresh_lease",
            DurableOperation::InsertLease => "insert_lease",
            DurableOperation::ConflictCheck => "conflict_check",
            DurableOperation::PurgeExpired => "purge_expired",
        }
    }
}

impl fmt::Display for DurableOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lease cache errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LeaseError {
    /// No lease exists for the identity.
    #[error("no lease found")]
    NotFound,
    /// A lease existed but aged out.
    #[error("lease expired")]
    Expired,
    /// The durable store could not serve the request. This does NOT mean the lease is absent.
    #[error("durable store unavailable during {operation}: {source}")]
    StoreUnavailable {
        /// The failed operation.
        operation: DurableOperation,
        /// The underlying failure.
        source: StoreFailure,
    },
    /// A stored address is not a dotted-decimal IPv4 address.
    #[error("stored address {0:?} is not a dotted-decimal IPv4 address")]
    MalformedAddress(String),
    /// The durable store is not reachable at startup.
    #[error("durable store unreachable at startup: {0}")]
    FatalConfiguration(StoreFailure),
}

impl LeaseError {
    /// Returns true if the error confirms that no valid lease exists.
    ///
    /// Callers may fall back to a fresh allocation in every error case, but only these cases
    /// guarantee the durable store holds no lease for the identity.
    pub fn is_absent(&self) -> bool {
        matches!(self, LeaseError::NotFound | LeaseError::Expired)
    }

    pub(crate) fn unavailable(operation: DurableOperation, source: StoreFailure) -> Self {
        LeaseError::StoreUnavailable { operation, source }
    }
}
