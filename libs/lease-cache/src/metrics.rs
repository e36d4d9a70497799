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
//! Lease cache metrics.

use prometheus::{IntCounter, IntCounterVec, IntGauge};
use smf_lease_observability::metrics::registry::MetricsRegistry;

use crate::error::DurableOperation;

/// Path that served a lookup.
#[derive(Debug, Clone, Copy)]
pub(crate) enum LookupPath {
    Ephemeral,
    Durable,
}

/// Lease cache metrics.
#[derive(Debug, Clone)]
pub struct LeaseCacheMetrics {
    /// Lookups by path and outcome.
    pub lookups_total: IntCounterVec,
    /// Ephemeral entries removed because a read found them expired.
    pub ephemeral_expired_total: IntCounter,
    /// Current number of ephemeral entries.
    pub ephemeral_entries: IntGauge,
    /// Failed durable operations.
    pub durable_failures_total: IntCounterVec,
    /// Leases recorded through the cache.
    pub records_total: IntCounter,
    /// Conflict checks that found the address already leased.
    pub conflicts_total: IntCounter,
}

impl LeaseCacheMetrics {
    /// Create new metrics instance with the given registry.
    pub fn new(metrics_registry: &MetricsRegistry) -> Self {
        LeaseCacheMetrics {
            lookups_total: metrics_registry.int_counter_vec(
                "lease_cache_lookups_total",
                "Total number of lease lookups by path and result.",
                &["path", "result"],
            ),
            ephemeral_expired_total: metrics_registry.int_counter(
                "lease_cache_ephemeral_expired_total",
                "Total number of expired ephemeral leases removed on read.",
            ),
            ephemeral_entries: metrics_registry.int_gauge(
                "lease_cache_ephemeral_entries",
                "Current number of entries in the ephemeral lease store.",
            ),
            durable_failures_total: metrics_registry.int_counter_vec(
                "lease_cache_durable_failures_total",
                "Total number of failed durable store operations.",
                &["operation"],
            ),
            records_total: metrics_registry.int_counter(
                "lease_cache_records_total",
                "Total number of leases recorded.",
            ),
            conflicts_total: metrics_registry.int_counter(
                "lease_cache_conflicts_total",
                "Total number of conflict checks that found the address leased.",
            ),
        }
    }

    pub(crate) fn lookup(&self, path: LookupPath, hit: bool) {
        let path = match path {
            LookupPath::Ephemeral => "ephemeral",
            LookupPath::Durable => "durable",
        };
        let result = if hit { "hit" } else { "miss" };
        self.lookups_total.with_label_values(&[path, result]).inc();
    }

    pub(crate) fn durable_failure(&self, operation: DurableOperation) {
        self.durable_failures_total
            .with_label_values(&[operation.as_str()])
            .inc();
    }
}
