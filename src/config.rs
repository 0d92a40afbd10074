// File: src/config.rs
//
// Engine configuration and the per-invocation resource budget.
//
// EngineConfig is plain data loaded from TOML (every field optional); a
// Budget is created fresh for each convert call and charged by the lexer
// and parser as they allocate tokens and syntax nodes.

use crate::errors::ResourceError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

/// Environment variable overriding `max_nodes`
pub const MAX_NODES_ENV: &str = "POLYGLOT_MAX_NODES";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of tokens a single source may produce
    pub max_tokens: usize,
    /// Maximum number of syntax tree nodes a single parse may allocate
    pub max_nodes: usize,
    /// Deepest nesting of statements and expressions a parse accepts
    pub max_depth: usize,
    /// Wall-clock ceiling for parse + lower + validate + generate
    pub time_budget_ms: u64,
    /// Syntax errors collected before the parser gives up
    pub max_syntax_errors: usize,
    /// Spaces per indentation level in generated code
    pub indent_width: usize,
    /// Emit an iterative variant next to recursive solutions
    pub iterative_variants: bool,
    /// Statement budget for the reference interpreter
    pub max_steps: u64,
    /// Call depth budget for the reference interpreter
    pub max_call_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_tokens: 200_000,
            max_nodes: 500_000,
            max_depth: 100,
            time_budget_ms: 5_000,
            max_syntax_errors: 25,
            indent_width: 4,
            iterative_variants: true,
            max_steps: 10_000_000,
            max_call_depth: 2_000,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {var}: '{value}'")]
    Env { var: &'static str, value: String },
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Apply environment overrides on top of file/default values
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(value) = std::env::var(MAX_NODES_ENV) {
            self.max_nodes = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Env { var: MAX_NODES_ENV, value })?;
        }
        Ok(self)
    }

    pub fn budget(&self) -> Budget {
        Budget::new(self)
    }
}

/// Resource counters for a single pipeline run
#[derive(Debug, Clone)]
pub struct Budget {
    max_tokens: usize,
    max_nodes: usize,
    max_depth: usize,
    nodes: usize,
    started: Instant,
    limit: Duration,
}

impl Budget {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            max_nodes: config.max_nodes,
            max_depth: config.max_depth,
            nodes: 0,
            started: Instant::now(),
            limit: Duration::from_millis(config.time_budget_ms),
        }
    }

    /// A budget that never trips, for tests and internal re-parses
    pub fn unlimited() -> Self {
        Self {
            max_tokens: usize::MAX,
            max_nodes: usize::MAX,
            max_depth: usize::MAX,
            nodes: 0,
            started: Instant::now(),
            limit: Duration::MAX,
        }
    }

    pub fn check_tokens(&self, count: usize) -> Result<(), ResourceError> {
        if count > self.max_tokens {
            return Err(ResourceError::Tokens { limit: self.max_tokens });
        }
        Ok(())
    }

    /// Charge one syntax node and check the deadline
    pub fn charge_node(&mut self) -> Result<(), ResourceError> {
        self.nodes += 1;
        if self.nodes > self.max_nodes {
            return Err(ResourceError::Nodes { limit: self.max_nodes });
        }
        // Instant::now is cheap but not free; sample the clock every 64 nodes
        if self.nodes % 64 == 0 {
            self.check_time()?;
        }
        Ok(())
    }

    pub fn check_depth(&self, depth: usize) -> Result<(), ResourceError> {
        if depth > self.max_depth {
            return Err(ResourceError::Depth { limit: self.max_depth });
        }
        Ok(())
    }

    pub fn check_time(&self) -> Result<(), ResourceError> {
        if self.started.elapsed() > self.limit {
            return Err(ResourceError::Time {
                limit_ms: self.limit.as_millis().min(u64::MAX as u128) as u64,
            });
        }
        Ok(())
    }

    pub fn nodes_used(&self) -> usize {
        self.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("max_nodes = 10\nindent_width = 2\n").unwrap();
        assert_eq!(config.max_nodes, 10);
        assert_eq!(config.indent_width, 2);
        assert_eq!(config.max_tokens, EngineConfig::default().max_tokens);
        assert!(config.iterative_variants);
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        assert!(matches!(
            EngineConfig::from_toml_str("max_nodes = \"lots\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_node_budget_trips() {
        let config = EngineConfig { max_nodes: 3, ..EngineConfig::default() };
        let mut budget = config.budget();
        for _ in 0..3 {
            assert!(budget.charge_node().is_ok());
        }
        assert_eq!(budget.charge_node(), Err(ResourceError::Nodes { limit: 3 }));
    }

    #[test]
    fn test_depth_budget() {
        let config = EngineConfig::from_toml_str("max_depth = 8\n").unwrap();
        let budget = config.budget();
        assert!(budget.check_depth(8).is_ok());
        assert_eq!(budget.check_depth(9), Err(ResourceError::Depth { limit: 8 }));
        assert_eq!(EngineConfig::default().max_depth, 100);
    }

    #[test]
    fn test_token_budget() {
        let config = EngineConfig { max_tokens: 5, ..EngineConfig::default() };
        let budget = config.budget();
        assert!(budget.check_tokens(5).is_ok());
        assert!(budget.check_tokens(6).is_err());
    }
}
