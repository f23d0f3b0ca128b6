use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::RiskError;
use crate::load_metrics::{
    DEFAULT_ACUTE_WINDOW, DEFAULT_CHRONIC_WINDOW, DEFAULT_MONOTONY_WINDOW, DEFAULT_SPIKE_LOOKBACK,
    DEFAULT_ZSCORE_LOOKBACK,
};
use crate::logging::LogConfig;
use crate::models::{DateRange, RiskLevel};
use crate::modifiers::{DEFAULT_INJURY_RECENCY_WINDOW, DEFAULT_MODIFIER_WINDOW};
use crate::wellness::{
    DEFAULT_INJURY_HISTORY_LOOKBACK, DEFAULT_LIFESTYLE_LOOKBACK, DEFAULT_RECOVERY_LOOKBACK,
};

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Scoring engine settings
    pub engine: EngineConfig,

    /// Logging output
    pub logging: LogConfig,

    /// Default data source when none is given on the command line
    pub data: DataSettings,
}

/// Default data source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// JSON dataset file
    pub dataset: Option<PathBuf>,

    /// SQLite database file
    pub database: Option<PathBuf>,
}

/// Window lengths in days for every metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricWindows {
    pub acute: u32,
    pub chronic: u32,
    pub load_spike: u32,
    pub monotony: u32,
    pub zscore: u32,
    pub recovery: u32,
    pub lifestyle: u32,
    pub injury_history: u32,
    /// Sleep and stress averaging
    pub modifier: u32,
    pub injury_recency: u32,
}

impl Default for MetricWindows {
    fn default() -> Self {
        MetricWindows {
            acute: DEFAULT_ACUTE_WINDOW,
            chronic: DEFAULT_CHRONIC_WINDOW,
            load_spike: DEFAULT_SPIKE_LOOKBACK,
            monotony: DEFAULT_MONOTONY_WINDOW,
            zscore: DEFAULT_ZSCORE_LOOKBACK,
            recovery: DEFAULT_RECOVERY_LOOKBACK,
            lifestyle: DEFAULT_LIFESTYLE_LOOKBACK,
            injury_history: DEFAULT_INJURY_HISTORY_LOOKBACK,
            modifier: DEFAULT_MODIFIER_WINDOW,
            injury_recency: DEFAULT_INJURY_RECENCY_WINDOW,
        }
    }
}

impl MetricWindows {
    fn named(&self) -> [(&'static str, u32); 10] {
        [
            ("acute", self.acute),
            ("chronic", self.chronic),
            ("load_spike", self.load_spike),
            ("monotony", self.monotony),
            ("zscore", self.zscore),
            ("recovery", self.recovery),
            ("lifestyle", self.lifestyle),
            ("injury_history", self.injury_history),
            ("modifier", self.modifier),
            ("injury_recency", self.injury_recency),
        ]
    }

    /// Longest window, in days back from the target date
    pub fn max_days(&self) -> u32 {
        self.named().iter().map(|(_, days)| *days).max().unwrap_or(0)
    }
}

/// Weights of the base risk score
///
/// Hand-tuned, not fitted. They need not sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    pub acwr: f64,
    pub monotony: f64,
    pub zscore: f64,
    pub load_spike: f64,
    pub recovery: f64,
    pub lifestyle: f64,
    pub injury_history: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        RiskWeights {
            acwr: 0.25,
            monotony: 0.15,
            zscore: 0.15,
            load_spike: 0.15,
            recovery: 0.15,
            lifestyle: 0.10,
            injury_history: 0.05,
        }
    }
}

impl RiskWeights {
    fn named(&self) -> [(&'static str, f64); 7] {
        [
            ("acwr", self.acwr),
            ("monotony", self.monotony),
            ("zscore", self.zscore),
            ("load_spike", self.load_spike),
            ("recovery", self.recovery),
            ("lifestyle", self.lifestyle),
            ("injury_history", self.injury_history),
        ]
    }
}

/// ACWR band edges; outside `high_*` is high risk, outside `medium_*` medium
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcwrBands {
    pub high_upper: f64,
    pub high_lower: f64,
    pub medium_upper: f64,
    pub medium_lower: f64,
}

impl Default for AcwrBands {
    fn default() -> Self {
        AcwrBands {
            high_upper: 1.5,
            high_lower: 0.8,
            medium_upper: 1.3,
            medium_lower: 0.9,
        }
    }
}

impl AcwrBands {
    pub fn classify(&self, acwr: f64) -> RiskLevel {
        if acwr > self.high_upper || acwr < self.high_lower {
            RiskLevel::High
        } else if acwr > self.medium_upper || acwr < self.medium_lower {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Classification cut-offs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    /// Overall score at or above which risk is high
    pub high: f64,
    /// Overall score at or above which risk is medium
    pub medium: f64,
    /// Compound multiplier above which the compound alert fires
    pub compound_alert: f64,
    pub acwr: AcwrBands,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        RiskThresholds {
            high: 70.0,
            medium: 40.0,
            compound_alert: 2.0,
            acwr: AcwrBands::default(),
        }
    }
}

impl RiskThresholds {
    pub fn classify(&self, score: f64) -> RiskLevel {
        if score >= self.high {
            RiskLevel::High
        } else if score >= self.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Scoring engine configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub windows: MetricWindows,
    pub weights: RiskWeights,
    pub thresholds: RiskThresholds,
}

impl EngineConfig {
    /// Reject settings the engine cannot score with
    pub fn validate(&self) -> crate::error::Result<()> {
        if let Some((name, _)) = self.windows.named().iter().find(|(_, days)| *days == 0) {
            return Err(RiskError::Configuration(format!(
                "window '{}' must be at least one day",
                name
            )));
        }

        if let Some((name, weight)) = self
            .weights
            .named()
            .iter()
            .find(|(_, w)| !w.is_finite() || *w < 0.0)
        {
            return Err(RiskError::Configuration(format!(
                "weight '{}' must be a non-negative number, got {}",
                name, weight
            )));
        }

        let t = &self.thresholds;
        if !(t.medium < t.high) {
            return Err(RiskError::Configuration(format!(
                "medium threshold ({}) must be below high threshold ({})",
                t.medium, t.high
            )));
        }

        let acwr = &t.acwr;
        if !(acwr.high_lower <= acwr.medium_lower
            && acwr.medium_lower <= acwr.medium_upper
            && acwr.medium_upper <= acwr.high_upper)
        {
            return Err(RiskError::Configuration(
                "ACWR bands must satisfy high_lower <= medium_lower <= medium_upper <= high_upper"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Date range covering every window ending at `target`
    pub fn data_range(&self, target: NaiveDate) -> DateRange {
        DateRange::lookback(target, self.windows.max_days())
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config
            .engine
            .validate()
            .with_context(|| format!("Invalid engine settings in {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".riskrs")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();
        if !config_path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!(
                    "Ignoring config file {}: {:#}",
                    config_path.display(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Save configuration to default location
    pub fn save_default(&self) -> Result<PathBuf> {
        let config_path = Self::default_config_path();
        self.save_to_file(&config_path)?;
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.windows.max_days(), 180);
        assert_eq!(config.weights.acwr, 0.25);
        assert_eq!(config.thresholds.compound_alert, 2.0);
    }

    #[test]
    fn test_validation_rejects_bad_settings() {
        let mut config = EngineConfig::default();
        config.windows.acute = 0;
        assert!(matches!(config.validate(), Err(RiskError::Configuration(_))));

        let mut config = EngineConfig::default();
        config.weights.lifestyle = -0.1;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.thresholds.medium = 70.0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.thresholds.acwr.medium_upper = 1.6;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_classification_thresholds() {
        let thresholds = RiskThresholds::default();
        assert_eq!(thresholds.classify(70.0), RiskLevel::High);
        assert_eq!(thresholds.classify(69.99), RiskLevel::Medium);
        assert_eq!(thresholds.classify(40.0), RiskLevel::Medium);
        assert_eq!(thresholds.classify(39.9), RiskLevel::Low);

        let bands = AcwrBands::default();
        assert_eq!(bands.classify(1.6), RiskLevel::High);
        assert_eq!(bands.classify(0.75), RiskLevel::High);
        assert_eq!(bands.classify(1.4), RiskLevel::Medium);
        assert_eq!(bands.classify(0.85), RiskLevel::Medium);
        assert_eq!(bands.classify(1.0), RiskLevel::Low);
        assert_eq!(bands.classify(1.3), RiskLevel::Low);
    }

    #[test]
    fn test_data_range_covers_longest_window() {
        let target = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let range = EngineConfig::default().data_range(target);
        assert_eq!(range.end, target);
        assert_eq!((target - range.start).num_days(), 180);
    }

    #[test]
    fn test_config_file_io() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.engine.weights.acwr = 0.3;
        config.data.dataset = Some(PathBuf::from("athletes.json"));
        config.save_to_file(&path).unwrap();

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [engine.thresholds]
            high = 80.0

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.thresholds.high, 80.0);
        assert_eq!(config.engine.thresholds.medium, 40.0);
        assert_eq!(config.engine.windows.chronic, 28);
        assert_eq!(config.logging.level, crate::logging::LogLevel::Debug);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[engine.windows]\nacute = 0\n").unwrap();

        assert!(AppConfig::load_from_file(&path).is_err());
    }
}
