// Library interface for riskrs modules
// This allows integration tests and benches to access the core functionality

pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod load_metrics;
pub mod loader;
pub mod logging;
pub mod models;
pub mod modifiers;
pub mod recommendations;
pub mod recovery;
pub mod risk;
pub mod scenarios;
pub mod wellness;

// Re-export commonly used types for convenience
pub use models::*;
pub use config::{AppConfig, EngineConfig, RiskThresholds, RiskWeights};
pub use database::SqliteLoader;
pub use error::{DatabaseError, LoaderError, Result, RiskError};
pub use load_metrics::{
    calculate_training_load_from_kinexon, KinexonSession, LoadMetrics, TrainingSummary,
};
pub use loader::{AthleteHistory, AthleteWindow, Dataset, MemoryLoader, TimeSeriesLoader};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use modifiers::{RiskModifierSet, RiskModifiers};
pub use recommendations::RecommendationGenerator;
pub use recovery::RecoveryPredictor;
pub use risk::{AcwrPoint, RiskEngine, TeamOverview};
pub use scenarios::{Scenario, ScenarioGenerator};
pub use wellness::WellnessMetrics;
