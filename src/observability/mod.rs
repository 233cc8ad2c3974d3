// src/observability/mod.rs
//! Tracing setup and metric names
//!
//! Counters are emitted through the `metrics` facade; nothing is recorded
//! until the embedding application installs a recorder.

use crate::utils::config::LoggingConfig;
use crate::utils::errors::{ProxyError, Result};
use metrics::describe_counter;
use tracing_subscriber::EnvFilter;

pub const CACHE_HITS: &str = "dynaproxy_cache_hits_total";
pub const CACHE_MISSES: &str = "dynaproxy_cache_misses_total";
pub const SYNTHESES: &str = "dynaproxy_syntheses_total";
pub const SYNTHESIS_FAILURES: &str = "dynaproxy_synthesis_failures_total";

/// Install the global fmt subscriber
///
/// `RUST_LOG` takes precedence over `config.level`. Fails if a global
/// subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ProxyError::Logging(e.to_string()))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| ProxyError::Logging(e.to_string()))
}

/// Register descriptions with the installed recorder
pub fn describe_metrics() {
    describe_counter!(CACHE_HITS, "Proxy type requests served from the generation cache");
    describe_counter!(CACHE_MISSES, "Proxy type requests that triggered synthesis");
    describe_counter!(SYNTHESES, "Proxy types synthesized");
    describe_counter!(SYNTHESIS_FAILURES, "Proxy type syntheses that failed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let config = LoggingConfig::default();
        let _ = init_tracing(&config);
        assert!(matches!(init_tracing(&config), Err(ProxyError::Logging(_))));
    }

    #[test]
    fn test_describe_without_recorder() {
        describe_metrics();
    }
}
