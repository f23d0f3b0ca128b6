//! Risk result export
//!
//! CSV rows carry one column per metric with recommendations joined by
//! `" | "`; JSON keeps the full result shape. Scores are rounded to two
//! decimals in both.

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, RiskError};
use crate::models::{RiskLevel, RiskResult};

/// Export format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(RiskError::Validation(format!("Unsupported export format: {}", s))),
        }
    }
}

impl ExportFormat {
    /// Guess the format from a file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

fn round2(value: f64) -> f64 {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(2))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

/// Flat CSV row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRow {
    pub athlete_id: i64,
    pub date: String,
    pub overall_risk_score: f64,
    pub risk_level: RiskLevel,
    pub base_risk_score: f64,
    pub acute_load: Option<f64>,
    pub chronic_load: Option<f64>,
    pub acwr: Option<f64>,
    pub load_spike_score: f64,
    pub recovery_score: f64,
    pub lifestyle_score: f64,
    pub injury_history_score: f64,
    pub training_monotony: Option<f64>,
    pub training_strain: Option<f64>,
    pub current_z_score: f64,
    pub max_z_score_7d: f64,
    pub sleep_modifier: f64,
    pub stress_modifier: f64,
    pub injury_recency_modifier: f64,
    pub age_modifier: f64,
    pub compound_multiplier: f64,
    pub recommendations: String,
}

impl From<&RiskResult> for RiskRow {
    fn from(r: &RiskResult) -> Self {
        let rounded = rounded(r);
        RiskRow {
            athlete_id: rounded.athlete_id,
            date: rounded.date.format("%Y-%m-%d").to_string(),
            overall_risk_score: rounded.overall_risk_score,
            risk_level: rounded.risk_level,
            base_risk_score: rounded.base_risk_score,
            acute_load: rounded.acute_load,
            chronic_load: rounded.chronic_load,
            acwr: rounded.acwr,
            load_spike_score: rounded.load_spike_score,
            recovery_score: rounded.recovery_score,
            lifestyle_score: rounded.lifestyle_score,
            injury_history_score: rounded.injury_history_score,
            training_monotony: rounded.training_monotony,
            training_strain: rounded.training_strain,
            current_z_score: rounded.current_z_score,
            max_z_score_7d: rounded.max_z_score_7d,
            sleep_modifier: rounded.sleep_modifier,
            stress_modifier: rounded.stress_modifier,
            injury_recency_modifier: rounded.injury_recency_modifier,
            age_modifier: rounded.age_modifier,
            compound_multiplier: rounded.compound_multiplier,
            recommendations: rounded.recommendation_lines().join(" | "),
        }
    }
}

/// Copy of `result` with every numeric field rounded to two decimals
pub fn rounded(result: &RiskResult) -> RiskResult {
    RiskResult {
        overall_risk_score: round2(result.overall_risk_score),
        base_risk_score: round2(result.base_risk_score),
        acute_load: result.acute_load.map(round2),
        chronic_load: result.chronic_load.map(round2),
        acwr: result.acwr.map(round2),
        load_spike_score: round2(result.load_spike_score),
        recovery_score: round2(result.recovery_score),
        lifestyle_score: round2(result.lifestyle_score),
        injury_history_score: round2(result.injury_history_score),
        training_monotony: result.training_monotony.map(round2),
        training_strain: result.training_strain.map(round2),
        current_z_score: round2(result.current_z_score),
        max_z_score_7d: round2(result.max_z_score_7d),
        sleep_modifier: round2(result.sleep_modifier),
        stress_modifier: round2(result.stress_modifier),
        injury_recency_modifier: round2(result.injury_recency_modifier),
        age_modifier: round2(result.age_modifier),
        compound_multiplier: round2(result.compound_multiplier),
        ..result.clone()
    }
}

pub fn write_csv<W: Write>(results: &[RiskResult], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for result in results {
        csv_writer.serialize(RiskRow::from(result))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(results: &[RiskResult], writer: W) -> Result<()> {
    let rounded: Vec<RiskResult> = results.iter().map(rounded).collect();
    serde_json::to_writer_pretty(writer, &rounded)?;
    Ok(())
}

/// Write results to `path` in the given format
pub fn export_results<P: AsRef<Path>>(
    results: &[RiskResult],
    format: ExportFormat,
    path: P,
) -> Result<()> {
    let file = File::create(path.as_ref())?;
    match format {
        ExportFormat::Csv => write_csv(results, file)?,
        ExportFormat::Json => write_json(results, file)?,
    }

    tracing::info!(
        path = %path.as_ref().display(),
        format = ?format,
        count = results.len(),
        "Risk results exported"
    );
    Ok(())
}
