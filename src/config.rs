//! Configuration management for the fraud network pipeline

use crate::types::verdict::RiskLevelThresholds;
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub records: RecordsConfig,
    pub graph: GraphConfig,
    pub detection: DetectionConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming cases
    pub case_subject: String,
    /// Subject for outgoing verdicts
    pub verdict_subject: String,
}

/// Beneficiary record store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RecordsConfig {
    /// Path to the beneficiary records CSV
    pub path: String,
}

/// Relationship graph configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    /// Path of the persisted graph snapshot
    pub cache_path: String,
    /// Minimum component size classified as a fraud ring
    #[serde(default = "default_ring_threshold")]
    pub ring_threshold: usize,
    /// Centrality percentile above which a node counts as a hub
    #[serde(default = "default_hub_percentile")]
    pub hub_percentile: f64,
    /// Attribute groups larger than this connect as a star, not a clique
    #[serde(default = "default_max_group_size")]
    pub max_group_size: usize,
}

fn default_ring_threshold() -> usize {
    5
}

fn default_hub_percentile() -> f64 {
    0.95
}

fn default_max_group_size() -> usize {
    200
}

/// Detection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    /// Risk score threshold above which a stage flags a case
    pub threshold: f64,
    /// Risk level classification thresholds
    pub risk_levels: RiskLevelThresholds,
    /// Stage weights for verdict aggregation
    pub weights: HashMap<String, f64>,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum cases scored concurrently
    pub workers: usize,
    /// Per-stage timeout in milliseconds
    pub stage_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut weights = HashMap::new();
        weights.insert("anomaly".to_string(), 0.35);
        weights.insert("duplicate".to_string(), 0.30);
        weights.insert("network".to_string(), 0.35);

        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                case_subject: "fraud.cases".to_string(),
                verdict_subject: "fraud.verdicts".to_string(),
            },
            records: RecordsConfig {
                path: "data/beneficiaries.csv".to_string(),
            },
            graph: GraphConfig {
                cache_path: "data/graph_cache.json".to_string(),
                ring_threshold: default_ring_threshold(),
                hub_percentile: default_hub_percentile(),
                max_group_size: default_max_group_size(),
            },
            detection: DetectionConfig {
                threshold: 0.5,
                risk_levels: RiskLevelThresholds::default(),
                weights,
            },
            pipeline: PipelineConfig {
                workers: 4,
                stage_timeout_ms: 1000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.detection.threshold, 0.5);
        assert_eq!(config.detection.weights.len(), 3);
        assert_eq!(config.graph.ring_threshold, 5);
        assert_eq!(config.graph.hub_percentile, 0.95);
    }

    #[test]
    fn test_load_from_file_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[nats]
url = "nats://example:4222"
case_subject = "fraud.cases"
verdict_subject = "fraud.verdicts"

[records]
path = "data/beneficiaries.csv"

[graph]
cache_path = "data/graph_cache.json"

[detection]
threshold = 0.6
risk_levels = {{ low = 0.3, medium = 0.5, high = 0.7, critical = 0.9 }}
weights = {{ anomaly = 0.4, duplicate = 0.2, network = 0.4 }}

[pipeline]
workers = 8
stage_timeout_ms = 500

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();
        drop(file);

        let config = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(config.nats.url, "nats://example:4222");
        assert_eq!(config.pipeline.workers, 8);
        // unspecified graph tuning falls back to defaults
        assert_eq!(config.graph.ring_threshold, 5);
        assert_eq!(config.graph.max_group_size, 200);
        assert_eq!(config.detection.weights["anomaly"], 0.4);
    }
}
