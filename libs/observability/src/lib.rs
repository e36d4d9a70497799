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
//! Logging and prometheus metrics for the lease cache.

use std::{io::IsTerminal, path::Path};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Registry, fmt::time::UtcTime, prelude::*};

pub mod metrics;

/// Environment variable to define the log level.
pub const LOG_LEVEL_ENV: &str = "RUST_LOG";

/// Setup logging using the tracing library.
///
/// # Arguments
///
/// * `log_dir`: If provided, logs are written to a file that carries the name of the current
///   executable in this directory.
/// * `log_to_stderr`: If true, logs will additionally printed to stderr.
///
/// The returned guards flush buffered log lines when dropped and must be kept alive for as long
/// as logging is needed.
pub fn setup_tracing<P: AsRef<Path>>(
    log_dir: Option<P>,
    log_to_stderr: bool,
) -> Result<Vec<WorkerGuard>, TracingSetupError> {
    let log_level =
        EnvFilter::try_from_env(LOG_LEVEL_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let mut guards = vec![];
    let mut layers = vec![];

    if let Some(log_dir) = log_dir {
        let log_file = tracing_appender::rolling::never(
            log_dir.as_ref(),
            format!("{}.log", extract_exec_name()),
        );
        let (non_blocking_writer, file_guard) = tracing_appender::non_blocking(log_file);
        let file_logger = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(non_blocking_writer)
            .with_filter(tracing::level_filters::LevelFilter::DEBUG);
        layers.push(file_logger.boxed());
        guards.push(file_guard);
    }

    if log_to_stderr {
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(std::io::stderr());
        let stderr_logger = tracing_subscriber::fmt::layer()
            // Enable colors if the stderr is a terminal.
            .with_ansi(std::io::stderr().is_terminal())
            .with_timer(UtcTime::rfc_3339())
            .with_writer(non_blocking_writer)
            .with_filter(log_level);
        layers.push(stderr_logger.boxed());
        guards.push(guard);
    }

    let subscriber = Registry::default().with(layers);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|_| TracingSetupError::AlreadyInitialized)?;

    tracing::debug!("Logging initialized!");
    Ok(guards)
}

/// Error returned by [setup_tracing].
#[derive(Debug, Error)]
pub enum TracingSetupError {
    /// A global subscriber was installed before.
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Extract the name of the executable that is currently running.
fn extract_exec_name() -> String {
    std::env::current_exe()
        .ok()
        .as_deref()
        .and_then(|path| path.file_stem())
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_install_subscriber_only_once() {
        let log_dir = std::env::temp_dir().join(format!("lease-cache-logs-{}", std::process::id()));
        std::fs::create_dir_all(&log_dir).unwrap();

        let guards = setup_tracing(Some(&log_dir), true).expect("first setup succeeds");
        assert_eq!(guards.len(), 2);
        tracing::info!("written to the log file");

        let again = setup_tracing(None::<&Path>, false);
        assert!(matches!(again, Err(TracingSetupError::AlreadyInitialized)));

        drop(guards);
        std::fs::remove_dir_all(&log_dir).ok();
    }
}
