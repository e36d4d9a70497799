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
//! Prometheus metric registry.

use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, Opts, TextEncoder, core::Collector,
};

/// Register and collect metrics of one or more components.
///
/// When initializing a component, the caller builds the component's metrics from the desired
/// `MetricsRegistry`. This lets the caller decide whether metrics land in the process-wide
/// registry or in an isolated one (as tests do).
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    registry: prometheus::Registry,
}

impl MetricsRegistry {
    /// Use prometheus' default registry and register process metrics. As a
    /// result, this registry will 'point' to the global registry.
    pub fn new_global() -> Self {
        let registry = prometheus::default_registry().clone();

        #[cfg(target_os = "linux")]
        registry
            .register(Box::new(
                prometheus::process_collector::ProcessCollector::for_self(),
            ))
            // Another `MetricsRegistry` might already have registered the process
            // collector on the global registry.
            .ok();

        Self { registry }
    }

    /// Create a new metrics registry with no collectors pre-registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register an `IntGauge`.
    pub fn int_gauge<S: Into<String>>(&self, name: S, help: S) -> IntGauge {
        self.register_collector(IntGauge::new(name, help).expect("valid gauge definition"))
    }

    /// Create and register an `IntCounter`.
    pub fn int_counter<S: Into<String>>(&self, name: S, help: S) -> IntCounter {
        self.register_collector(IntCounter::new(name, help).expect("valid counter definition"))
    }

    /// Create and register an `IntCounterVec`.
    pub fn int_counter_vec<S: Into<String>>(
        &self,
        name: S,
        help: S,
        label_names: &[&str],
    ) -> IntCounterVec {
        self.register_collector(
            IntCounterVec::new(Opts::new(name, help), label_names)
                .expect("valid counter vec definition"),
        )
    }

    /// Render all registered metrics in the prometheus text exposition format.
    pub fn encode_text(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::error!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }

    // Metric names are static per component, a clash is a programming error.
    fn register_collector<C: 'static + Collector + Clone>(&self, c: C) -> C {
        self.registry
            .register(Box::new(C::clone(&c)))
            .expect("metric registered twice");
        c
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self {
            registry: prometheus::Registry::new(),
        }
    }
}
