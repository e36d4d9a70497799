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
//! Integration tests for the SMF lease cache
//!
//! Helpers to set up lease caches that share one durable document store, the way several
//! control plane instances share one database.

use std::sync::Arc;

use smf_lease_cache::{
    LeaseCache, LeaseCacheConfig, LeaseIdentity, SelectionDescriptor, Snssai,
    durable::{DurableLeaseStore, memory::MemoryDocumentStore},
};
use smf_lease_observability::metrics::registry::MetricsRegistry;

/// Lease cache backed by a shared in-memory document store.
pub type SharedLeaseCache = LeaseCache<Arc<MemoryDocumentStore>>;

/// Test environment with one durable store and any number of instances on top of it.
pub struct LeaseCacheTestEnv {
    /// The shared durable document store.
    pub store: Arc<MemoryDocumentStore>,
    /// Configuration used for every instance.
    pub config: LeaseCacheConfig,
}

impl LeaseCacheTestEnv {
    /// Creates an environment with the default configuration.
    pub fn new() -> Self {
        Self::with_config(LeaseCacheConfig::default())
    }

    /// Creates an environment with the given configuration.
    pub fn with_config(config: LeaseCacheConfig) -> Self {
        Self {
            store: Arc::new(MemoryDocumentStore::new()),
            config,
        }
    }

    /// Starts a new instance with its own, empty ephemeral store.
    pub fn instance(&self) -> SharedLeaseCache {
        LeaseCache::new(
            DurableLeaseStore::new(self.store.clone(), self.config),
            self.config,
            &MetricsRegistry::new(),
        )
    }
}

impl Default for LeaseCacheTestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Selection for the `internet` data network on the eMBB slice.
pub fn internet_selection() -> SelectionDescriptor {
    selection("internet")
}

/// Selection for `dnn` on the eMBB slice.
pub fn selection(dnn: &str) -> SelectionDescriptor {
    SelectionDescriptor {
        dnn: dnn.to_string(),
        dnai: "mec-1".to_string(),
        snssai: Snssai {
            sst: 1,
            sd: "010203".to_string(),
        },
    }
}

/// Identity of subscriber number `n` on the `internet` data network.
pub fn subscriber(n: u32) -> LeaseIdentity {
    LeaseIdentity::new(format!("imsi-20893{n:010}"), internet_selection())
}
