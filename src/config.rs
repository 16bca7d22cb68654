//! Engine configuration
//!
//! Loaded from YAML; every field has a default so an empty document is a
//! valid configuration. `FRAUDGRAPH_DATA` overrides the data path.

use crate::evidence::RiskLevel;
use crate::graph::node_types;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding [`EngineConfig::data_path`]
pub const DATA_PATH_ENV: &str = "FRAUDGRAPH_DATA";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Bounds of subgraph retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubgraphLimits {
    pub default_depth: usize,
    pub max_depth: usize,
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for SubgraphLimits {
    fn default() -> Self {
        SubgraphLimits {
            default_depth: 1,
            max_depth: 3,
            default_limit: 100,
            max_limit: 300,
        }
    }
}

/// Bounds of node search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchLimits {
    pub default_per_chain: usize,
    pub max_per_chain: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            default_per_chain: 10,
            max_per_chain: 100,
        }
    }
}

/// Auto-linker thresholds and layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoLinkConfig {
    /// Pairs sharing a symbol needed to form a chain
    pub min_symbol_pairs: usize,
    /// Minimum score of a high-risk pair
    pub high_risk_min_score: f64,
    /// Level of a high-risk pair
    pub high_risk_level: RiskLevel,
    /// High-risk pairs needed to form a chain
    pub min_high_risk_pairs: usize,
    /// Assessments attached when a tip is upserted
    pub tip_fanout: usize,
    /// Grid layout: pairs per row
    pub grid_columns: usize,
    /// Grid layout: cell width
    pub grid_spacing_x: f64,
    /// Grid layout: row height
    pub grid_spacing_y: f64,
}

impl Default for AutoLinkConfig {
    fn default() -> Self {
        AutoLinkConfig {
            min_symbol_pairs: 2,
            high_risk_min_score: 80.0,
            high_risk_level: RiskLevel::High,
            min_high_risk_pairs: 3,
            tip_fanout: 3,
            grid_columns: 3,
            grid_spacing_x: 250.0,
            grid_spacing_y: 200.0,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// RocksDB directory; `None` keeps the graph in memory only
    pub data_path: Option<PathBuf>,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Node types accepted by upsert; empty accepts any
    pub node_types: Vec<String>,
    pub subgraph: SubgraphLimits,
    pub search: SearchLimits,
    pub auto_link: AutoLinkConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            data_path: None,
            log_level: "info".to_string(),
            node_types: vec![
                node_types::TIP.to_string(),
                node_types::ASSESSMENT.to_string(),
                node_types::DOCUMENT.to_string(),
                node_types::ADVISOR.to_string(),
            ],
            subgraph: SubgraphLimits::default(),
            search: SearchLimits::default(),
            auto_link: AutoLinkConfig::default(),
        }
    }
}

impl EngineConfig {
    /// In-memory configuration with defaults
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Persistent configuration rooted at `path`
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        EngineConfig {
            data_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let config: EngineConfig = if yaml.trim().is_empty() {
            EngineConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Load from an optional file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply `FRAUDGRAPH_DATA` if set and non-empty
    pub fn apply_env(&mut self) {
        if let Ok(value) = std::env::var(DATA_PATH_ENV) {
            if !value.trim().is_empty() {
                self.data_path = Some(PathBuf::from(value));
            }
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let sub = &self.subgraph;
        if sub.max_depth == 0 || sub.default_depth == 0 || sub.default_depth > sub.max_depth {
            return Err(ConfigError::Invalid(format!(
                "subgraph depth default {} must be within 1..={}",
                sub.default_depth, sub.max_depth
            )));
        }
        if sub.max_limit == 0 || sub.default_limit == 0 || sub.default_limit > sub.max_limit {
            return Err(ConfigError::Invalid(format!(
                "subgraph limit default {} must be within 1..={}",
                sub.default_limit, sub.max_limit
            )));
        }
        let search = &self.search;
        if search.max_per_chain == 0
            || search.default_per_chain == 0
            || search.default_per_chain > search.max_per_chain
        {
            return Err(ConfigError::Invalid(format!(
                "search default {} must be within 1..={}",
                search.default_per_chain, search.max_per_chain
            )));
        }
        let link = &self.auto_link;
        if link.min_symbol_pairs < 2 {
            return Err(ConfigError::Invalid("auto_link.min_symbol_pairs must be at least 2".to_string()));
        }
        if link.min_high_risk_pairs < 2 {
            return Err(ConfigError::Invalid("auto_link.min_high_risk_pairs must be at least 2".to_string()));
        }
        if link.grid_columns == 0 {
            return Err(ConfigError::Invalid("auto_link.grid_columns must be positive".to_string()));
        }
        if self.node_types.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::Invalid("node_types must not contain empty entries".to_string()));
        }
        Ok(())
    }

    /// Whether upsert accepts this node type
    pub fn accepts_node_type(&self, node_type: &str) -> bool {
        self.node_types.is_empty() || self.node_types.iter().any(|t| t == node_type)
    }
}
