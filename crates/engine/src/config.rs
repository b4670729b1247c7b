//! `EngineConfig` — the tunable knobs for a running engine instance:
//! resource caps, loop/cache defaults, the HTTP SSRF policy, and the
//! middleware chain's own settings. Three presets cover the common
//! deployments; `with_*` builders and `validate()` let callers adjust
//! from there.

use std::time::Duration;

use nodes::HttpPolicy;

use crate::error::EngineError;
use crate::middleware::rate_limit::RateLimitConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPreset {
    /// Sane defaults for running workflows in a long-lived service.
    Default,
    /// Tight caps and private-network HTTP allowed — for CI/unit-test
    /// workflows where determinism and speed matter more than realism.
    Validation,
    /// Generous caps, verbose logging expectations, private networks
    /// allowed — for local iteration against a developer's own services.
    Development,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub preset: ConfigPreset,
    pub max_node_executions_per_execution: usize,
    pub max_http_calls_per_execution: usize,
    pub default_max_iterations: usize,
    pub default_cache_ttl: Duration,
    pub cache_capacity: usize,
    pub node_deadline: Duration,
    pub execution_deadline: Duration,
    pub http_policy: HttpPolicy,
    pub rate_limit: RateLimitConfig,
    pub max_concurrency_per_level: usize,
    pub max_input_bytes: usize,
    pub max_result_bytes: usize,
    pub max_nodes: usize,
    pub max_edges: usize,
    pub max_workflow_bytes: usize,
    pub max_string_length: usize,
    pub max_array_length: usize,
    pub max_variables: usize,
    pub max_context_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig::from_preset(ConfigPreset::Default)
    }
}

impl EngineConfig {
    pub fn from_preset(preset: ConfigPreset) -> Self {
        let mut cfg = match preset {
            ConfigPreset::Default => EngineConfig {
                preset,
                max_node_executions_per_execution: 10_000,
                max_http_calls_per_execution: 100,
                default_max_iterations: 1_000,
                default_cache_ttl: Duration::from_secs(300),
                cache_capacity: 10_000,
                node_deadline: Duration::from_secs(30),
                execution_deadline: Duration::from_secs(300),
                http_policy: HttpPolicy::default(),
                rate_limit: RateLimitConfig::default(),
                max_concurrency_per_level: 32,
                max_input_bytes: 1_000_000,
                max_result_bytes: 1_000_000,
                max_nodes: 1_000,
                max_edges: 5_000,
                max_workflow_bytes: 5_000_000,
                max_string_length: 100_000,
                max_array_length: 10_000,
                max_variables: 1_000,
                max_context_depth: 32,
            },
            ConfigPreset::Validation => EngineConfig {
                preset,
                max_node_executions_per_execution: 500,
                max_http_calls_per_execution: 10,
                default_max_iterations: 50,
                default_cache_ttl: Duration::from_secs(5),
                cache_capacity: 256,
                node_deadline: Duration::from_secs(2),
                execution_deadline: Duration::from_secs(10),
                http_policy: HttpPolicy { allow_http: true, ..HttpPolicy::default() },
                rate_limit: RateLimitConfig::disabled(),
                max_concurrency_per_level: 8,
                max_input_bytes: 100_000,
                max_result_bytes: 100_000,
                max_nodes: 200,
                max_edges: 1_000,
                max_workflow_bytes: 500_000,
                max_string_length: 10_000,
                max_array_length: 1_000,
                max_variables: 200,
                max_context_depth: 16,
            },
            ConfigPreset::Development => EngineConfig {
                preset,
                max_node_executions_per_execution: 100_000,
                max_http_calls_per_execution: 1_000,
                default_max_iterations: 10_000,
                default_cache_ttl: Duration::from_secs(60),
                cache_capacity: 50_000,
                node_deadline: Duration::from_secs(120),
                execution_deadline: Duration::from_secs(1_800),
                http_policy: HttpPolicy {
                    allow_http: true,
                    block_private_ips: false,
                    block_localhost: false,
                    // link-local and cloud-metadata stay blocked even in
                    // Development — a dev box has no business reaching
                    // 169.254.169.254, and unblocking private IPs above
                    // must not reopen it (see nodes::http tests).
                    ..HttpPolicy::default()
                },
                rate_limit: RateLimitConfig::default(),
                max_concurrency_per_level: 64,
                max_input_bytes: 10_000_000,
                max_result_bytes: 10_000_000,
                max_nodes: 10_000,
                max_edges: 50_000,
                max_workflow_bytes: 50_000_000,
                max_string_length: 1_000_000,
                max_array_length: 100_000,
                max_variables: 10_000,
                max_context_depth: 64,
            },
        };
        cfg.apply_env_overrides();
        cfg
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("ENGINE_MAX_NODE_EXECUTIONS") {
            if let Ok(n) = v.parse() {
                self.max_node_executions_per_execution = n;
            }
        }
        if let Ok(v) = std::env::var("ENGINE_MAX_HTTP_CALLS") {
            if let Ok(n) = v.parse() {
                self.max_http_calls_per_execution = n;
            }
        }
        if let Ok(v) = std::env::var("ENGINE_EXECUTION_DEADLINE_SECS") {
            if let Ok(n) = v.parse() {
                self.execution_deadline = Duration::from_secs(n);
            }
        }
        if std::env::var("ENGINE_ALLOW_PRIVATE_NETWORKS").as_deref() == Ok("1") {
            self.http_policy.block_private_ips = false;
            self.http_policy.block_localhost = false;
        }
    }

    pub fn with_max_node_executions(mut self, n: usize) -> Self {
        self.max_node_executions_per_execution = n;
        self
    }

    pub fn with_execution_deadline(mut self, d: Duration) -> Self {
        self.execution_deadline = d;
        self
    }

    pub fn with_http_policy(mut self, policy: HttpPolicy) -> Self {
        self.http_policy = policy;
        self
    }

    pub fn with_max_concurrency_per_level(mut self, n: usize) -> Self {
        self.max_concurrency_per_level = n;
        self
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_node_executions_per_execution == 0 {
            return Err(EngineError::BadConfig("max_node_executions_per_execution must be > 0".into()));
        }
        if self.max_concurrency_per_level == 0 {
            return Err(EngineError::BadConfig("max_concurrency_per_level must be > 0".into()));
        }
        if self.execution_deadline < self.node_deadline {
            return Err(EngineError::BadConfig("execution_deadline must be >= node_deadline".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_all_validate() {
        for preset in [ConfigPreset::Default, ConfigPreset::Validation, ConfigPreset::Development] {
            EngineConfig::from_preset(preset).validate().unwrap();
        }
    }

    #[test]
    fn builder_overrides_take_effect() {
        let cfg = EngineConfig::default().with_max_node_executions(7);
        assert_eq!(cfg.max_node_executions_per_execution, 7);
    }
}
