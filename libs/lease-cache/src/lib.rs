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
//! # SMF Lease Cache
//!
//! Remembers which IPv4 address an external address-assignment service handed out to a
//! subscriber session, keyed by the subscriber (SUPI) and the data network and slice selection
//! of the session.
//!
//! Two paths hold the same leases:
//! - [ephemeral::EphemeralStore], a process-local concurrent map for fast repeat lookups.
//! - [durable::DurableLeaseStore], an adapter over a networked document store
//!   ([durable::LeaseDocumentStore]) that survives restarts and is shared between instances.
//!
//! [cache::LeaseCache] combines both: read-through on lookup, write-through on record, and a
//! conflict check telling whether an address is leased to anyone.
//!
//! Leases expire [record::DEFAULT_LEASE_TTL] after creation or their last successful read.

pub mod cache;
pub mod config;
pub mod durable;
pub mod ephemeral;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod record;

pub use cache::LeaseCache;
pub use config::LeaseCacheConfig;
pub use error::LeaseError;
pub use identity::{KeyEncoding, LeaseIdentity, SelectionDescriptor, Snssai};
pub use record::LeaseRecord;
