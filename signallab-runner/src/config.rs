//! Serializable pipeline configuration.
//!
//! One explicit value carries every knob of a run. It loads from TOML, is
//! overridden field by field from the CLI, and hashes to a content-addressed
//! run id.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use signallab_core::data::{BarFrequency, Period};
use signallab_core::engine::{CostModel, SignalConflict, SimulationConfig};

/// Unique identifier for a pipeline run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(String),

    #[error("invalid config: {field} {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Every parameter needed to reproduce a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub symbol: String,
    /// History to keep, counted back from the last bar.
    pub period: Period,
    /// Bar interval requested from the data source.
    pub interval: BarFrequency,
    /// Entry threshold on the predicted up-probability.
    pub proba_th: f64,
    /// Fraction of dataset rows used for training.
    pub train_ratio: f64,
    pub init_cash: f64,
    /// Bar frequency used for annualizing stats.
    pub freq: BarFrequency,
    pub fees: f64,
    pub slippage: f64,
    pub conflict: SignalConflict,
    pub seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            symbol: "0700.HK".into(),
            period: Period::days(730),
            interval: BarFrequency::minutes(60),
            proba_th: 0.55,
            train_ratio: 0.70,
            init_cash: 100_000.0,
            freq: BarFrequency::hourly(),
            fees: 0.0,
            slippage: 0.0,
            conflict: SignalConflict::StateFirst,
            seed: 42,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(invalid("symbol", "must not be empty"));
        }
        if !(self.proba_th.is_finite() && (0.0..=1.0).contains(&self.proba_th)) {
            return Err(invalid(
                "proba_th",
                format!("must be in [0, 1], got {}", self.proba_th),
            ));
        }
        if !(self.train_ratio > 0.0 && self.train_ratio < 1.0) {
            return Err(invalid(
                "train_ratio",
                format!("must be strictly between 0 and 1, got {}", self.train_ratio),
            ));
        }
        if !(self.init_cash.is_finite() && self.init_cash > 0.0) {
            return Err(invalid(
                "init_cash",
                format!("must be positive, got {}", self.init_cash),
            ));
        }
        for (field, value) in [("fees", self.fees), ("slippage", self.slippage)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(field, format!("must be non-negative, got {value}")));
            }
        }
        if self.freq.duration().num_seconds() <= 0 {
            return Err(invalid("freq", "must be a positive duration"));
        }
        Ok(())
    }

    /// Simulator settings derived from this config.
    pub fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig::new(self.init_cash, self.freq.clone())
            .with_costs(CostModel {
                fees: self.fees,
                slippage: self.slippage,
            })
            .with_conflict(self.conflict)
    }

    /// blake3 of the canonical JSON form. Identical configs share a run id.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json =
            serde_json::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_run() {
        let config = PipelineConfig::default();
        assert_eq!(config.symbol, "0700.HK");
        assert_eq!(config.period.label(), "730d");
        assert_eq!(config.interval.label(), "60m");
        assert_eq!(config.proba_th, 0.55);
        assert_eq!(config.train_ratio, 0.70);
        assert_eq!(config.init_cash, 100_000.0);
        assert_eq!(config.freq.label(), "H");
        assert_eq!(config.seed, 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_run_id_deterministic() {
        let config = PipelineConfig::default();
        let id1 = config.run_id().unwrap();
        let id2 = config.run_id().unwrap();
        assert_eq!(id1, id2, "RunId should be deterministic");
        assert_eq!(id1.len(), 64);
    }

    #[test]
    fn test_run_id_changes_with_params() {
        let config1 = PipelineConfig::default();
        let config2 = PipelineConfig {
            proba_th: 0.6,
            ..config1.clone()
        };
        assert_ne!(config1.run_id().unwrap(), config2.run_id().unwrap());
    }

    #[test]
    fn test_conflict_mode_from_toml() {
        assert_eq!(PipelineConfig::default().conflict, SignalConflict::StateFirst);
        let config = PipelineConfig::from_toml(r#"conflict = "ignore_both""#).unwrap();
        assert_eq!(config.conflict, SignalConflict::IgnoreBoth);
        assert_eq!(config.simulation_config().conflict, SignalConflict::IgnoreBoth);
        assert!(PipelineConfig::from_toml(r#"conflict = "both""#).is_err());
    }

    #[test]
    fn test_oversized_labels_fail_to_parse() {
        assert!(PipelineConfig::from_toml(r#"period = "200000000000000d""#).is_err());
        assert!(PipelineConfig::from_toml(r#"freq = "1000000000000000000m""#).is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = PipelineConfig {
            symbol: "AAPL".into(),
            fees: 0.001,
            conflict: SignalConflict::IgnoreBoth,
            ..PipelineConfig::default()
        };
        let text = config.to_toml().unwrap();
        assert_eq!(PipelineConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
            symbol = "SPY"
            interval = "1d"
            freq = "D"
            proba_th = 0.6
            "#,
        )
        .unwrap();
        assert_eq!(config.symbol, "SPY");
        assert_eq!(config.freq, BarFrequency::daily());
        assert_eq!(config.train_ratio, 0.70);
        assert_eq!(config.conflict, SignalConflict::StateFirst);
    }

    #[test]
    fn test_unknown_frequency_is_a_parse_error() {
        let err = PipelineConfig::from_toml(r#"freq = "fortnightly""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_rejects_out_of_range_values() {
        let bad = [
            PipelineConfig {
                train_ratio: 1.0,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                proba_th: 1.5,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                init_cash: -1.0,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                fees: f64::NAN,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                symbol: " ".into(),
                ..PipelineConfig::default()
            },
        ];
        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(ConfigError::Invalid { .. })
            ));
        }
    }

    #[test]
    fn test_simulation_config_carries_costs() {
        let config = PipelineConfig {
            fees: 0.002,
            slippage: 0.001,
            ..PipelineConfig::default()
        };
        let sim = config.simulation_config();
        assert_eq!(sim.initial_cash, 100_000.0);
        assert_eq!(sim.costs.fees, 0.002);
        assert_eq!(sim.costs.slippage, 0.001);
    }
}
