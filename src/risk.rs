//! Injury risk composition
//!
//! [`RiskEngine`] turns one athlete's data window into a [`RiskResult`]:
//!
//! 1. bucket ACWR, monotony and baseline z-score into fixed risk points
//! 2. weight them with load-spike, recovery, lifestyle and injury-history
//!    scores into a base risk
//! 3. multiply by the compound modifier and cap at 100
//! 4. classify and attach recommendations
//!
//! Metrics without enough data contribute nothing; an assessment always
//! produces a result.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::{AcwrBands, EngineConfig};
use crate::error::Result;
use crate::load_metrics::LoadMetrics;
use crate::loader::{AthleteWindow, TimeSeriesLoader};
use crate::models::{AthleteId, DateRange, RiskLevel, RiskResult};
use crate::modifiers::{RiskModifierSet, RiskModifiers};
use crate::recommendations::{RecommendationGenerator, RecommendationInput};
use crate::wellness::WellnessMetrics;

/// ACWR on one day of a trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcwrPoint {
    pub date: NaiveDate,
    pub acute_load: f64,
    pub chronic_load: f64,
    pub acwr: f64,
    pub zone: RiskLevel,
}

/// Athlete whose assessment could not be computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamAssessmentError {
    pub athlete_id: AthleteId,
    pub message: String,
}

/// Assessments of a whole roster on one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamOverview {
    pub date: NaiveDate,
    pub high_risk_count: usize,
    pub medium_risk_count: usize,
    pub low_risk_count: usize,

    /// Highest risk first
    pub athletes: Vec<RiskResult>,

    pub errors: Vec<TeamAssessmentError>,
}

impl TeamOverview {
    pub fn total_athletes(&self) -> usize {
        self.athletes.len()
    }

    pub fn at_level(&self, level: RiskLevel) -> impl Iterator<Item = &RiskResult> {
        self.athletes.iter().filter(move |r| r.risk_level == level)
    }
}

/// Risk scoring engine
#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
    config: EngineConfig,
}

impl RiskEngine {
    /// Engine with default windows, weights and thresholds
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(RiskEngine { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 80 outside the high band, 50 outside the medium band, else 20
    ///
    /// An unavailable ratio, or one of exactly zero (no chronic load), scores 0.
    pub fn acwr_risk(acwr: Option<f64>, bands: &AcwrBands) -> f64 {
        match acwr.filter(|&a| a > 0.0) {
            None => 0.0,
            Some(a) => match bands.classify(a) {
                RiskLevel::High => 80.0,
                RiskLevel::Medium => 50.0,
                RiskLevel::Low => 20.0,
            },
        }
    }

    /// >2.0 60, >1.5 30, else 10; undefined monotony scores 0
    pub fn monotony_risk(monotony: Option<f64>) -> f64 {
        match monotony {
            None => 0.0,
            Some(m) if m > 2.0 => 60.0,
            Some(m) if m > 1.5 => 30.0,
            Some(_) => 10.0,
        }
    }

    /// >2.5 70, >2.0 50, >1.5 25, else 10
    pub fn zscore_risk(max_z_7d: f64) -> f64 {
        if max_z_7d > 2.5 {
            70.0
        } else if max_z_7d > 2.0 {
            50.0
        } else if max_z_7d > 1.5 {
            25.0
        } else {
            10.0
        }
    }

    /// Score an already loaded window
    pub fn assess_window(&self, window: &AthleteWindow, target: NaiveDate) -> RiskResult {
        let windows = &self.config.windows;
        let weights = &self.config.weights;
        let thresholds = &self.config.thresholds;
        let athlete_id = window.athlete_id;

        let acwr = LoadMetrics::acwr(&window.loads, target, windows.acute, windows.chronic);
        if acwr.is_none() {
            warn!(athlete_id, %target, "Not enough load samples for ACWR");
        }
        let load_spike_score =
            LoadMetrics::load_spike_score(&window.loads, target, windows.load_spike);
        let training_monotony =
            LoadMetrics::training_monotony(&window.loads, target, windows.monotony);
        let training_strain = LoadMetrics::training_strain(&window.loads, target, windows.monotony);
        if training_monotony.is_none() {
            warn!(athlete_id, %target, "Not enough load samples for monotony");
        }
        let zscore = LoadMetrics::baseline_zscore(&window.loads, target, windows.zscore);

        let recovery_score =
            WellnessMetrics::recovery_score(&window.treatments, target, windows.recovery);
        let lifestyle_score =
            WellnessMetrics::lifestyle_score(&window.lifestyle, target, windows.lifestyle);
        let injury_history_score =
            WellnessMetrics::injury_history_score(&window.injuries, target, windows.injury_history);

        debug!(
            athlete_id,
            acwr = ?acwr.map(|a| a.acwr),
            load_spike_score,
            monotony = ?training_monotony,
            max_z = zscore.max_z_7d,
            recovery_score,
            lifestyle_score,
            injury_history_score,
            "Metrics computed"
        );

        let avg_sleep_hours =
            RiskModifiers::average_sleep_hours(&window.lifestyle, target, windows.modifier);
        let avg_stress = RiskModifiers::average_stress(&window.lifestyle, target, windows.modifier);
        let days_since_injury =
            RiskModifiers::days_since_last_injury(&window.injuries, target, windows.injury_recency);

        let modifiers = RiskModifierSet {
            sleep: RiskModifiers::sleep_modifier(avg_sleep_hours),
            stress: RiskModifiers::stress_modifier(avg_stress),
            injury_recency: RiskModifiers::injury_recency_modifier(days_since_injury),
            age: RiskModifiers::age_modifier(window.age),
        };
        let compound_multiplier = modifiers.compound();

        let base_risk_score = weights.acwr * Self::acwr_risk(acwr.map(|a| a.acwr), &thresholds.acwr)
            + weights.monotony * Self::monotony_risk(training_monotony)
            + weights.zscore * Self::zscore_risk(zscore.max_z_7d)
            + weights.load_spike * load_spike_score
            + weights.recovery * (100.0 - recovery_score)
            + weights.lifestyle * (100.0 - lifestyle_score)
            + weights.injury_history * injury_history_score;

        let overall_risk_score = (base_risk_score * compound_multiplier).clamp(0.0, 100.0);
        let risk_level = thresholds.classify(overall_risk_score);

        debug!(
            athlete_id,
            base_risk_score,
            compound_multiplier,
            active_modifiers = modifiers.active_count(),
            "Risk composed"
        );

        let recommendations = RecommendationGenerator::render(&RecommendationInput {
            risk_level,
            compound_multiplier,
            compound_alert_threshold: thresholds.compound_alert,
            acwr: acwr.map(|a| a.acwr),
            load_spike_score,
            training_monotony,
            training_strain,
            max_z_score_7d: zscore.max_z_7d,
            avg_sleep_hours,
            sleep_modifier: modifiers.sleep,
            avg_stress,
            stress_modifier: modifiers.stress,
            days_since_injury,
            injury_recency_modifier: modifiers.injury_recency,
            age: window.age,
            age_modifier: modifiers.age,
            recovery_score,
            lifestyle_score,
            injury_history_score,
        });

        RiskResult {
            athlete_id,
            date: target,
            overall_risk_score,
            risk_level,
            base_risk_score,
            acute_load: acwr.map(|a| a.acute_load),
            chronic_load: acwr.map(|a| a.chronic_load),
            acwr: acwr.map(|a| a.acwr),
            load_spike_score,
            recovery_score,
            lifestyle_score,
            injury_history_score,
            training_monotony,
            training_strain,
            current_z_score: zscore.current_z,
            max_z_score_7d: zscore.max_z_7d,
            sleep_modifier: modifiers.sleep,
            stress_modifier: modifiers.stress,
            injury_recency_modifier: modifiers.injury_recency,
            age_modifier: modifiers.age,
            compound_multiplier,
            recommendations,
        }
    }

    /// Assess one athlete on `date`
    ///
    /// Missing data degrades the score; only a failing loader is an error.
    #[instrument(skip(self, loader))]
    pub fn assess<L>(
        &self,
        loader: &L,
        athlete_id: AthleteId,
        date: NaiveDate,
    ) -> Result<RiskResult>
    where
        L: TimeSeriesLoader + ?Sized,
    {
        let window = loader.snapshot(athlete_id, self.config.data_range(date))?;
        let result = self.assess_window(&window, date);

        info!(
            athlete_id,
            %date,
            score = result.overall_risk_score,
            level = %result.risk_level,
            "Risk assessed"
        );

        Ok(result)
    }

    /// Daily ACWR from `start` to `end`, skipping days without a usable ratio
    pub fn acwr_trend<L>(
        &self,
        loader: &L,
        athlete_id: AthleteId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AcwrPoint>>
    where
        L: TimeSeriesLoader + ?Sized,
    {
        let windows = &self.config.windows;
        let range = DateRange::new(DateRange::trailing(start, windows.chronic).start, end);
        let samples = loader.load_samples(athlete_id, range)?;

        let points = start
            .iter_days()
            .take_while(|day| *day <= end)
            .filter_map(|day| {
                LoadMetrics::acwr(&samples, day, windows.acute, windows.chronic)
                    .filter(|a| a.acwr > 0.0)
                    .map(|a| AcwrPoint {
                        date: day,
                        acute_load: a.acute_load,
                        chronic_load: a.chronic_load,
                        acwr: a.acwr,
                        zone: self.config.thresholds.acwr.classify(a.acwr),
                    })
            })
            .collect();

        Ok(points)
    }

    /// Assess every athlete in parallel
    ///
    /// A failing athlete lands in `errors` and does not stop the others.
    #[instrument(skip(self, loader, athlete_ids), fields(athletes = athlete_ids.len()))]
    pub fn assess_team<L>(
        &self,
        loader: &L,
        athlete_ids: &[AthleteId],
        date: NaiveDate,
    ) -> TeamOverview
    where
        L: TimeSeriesLoader + Sync + ?Sized,
    {
        let outcomes: Vec<(AthleteId, Result<RiskResult>)> = athlete_ids
            .par_iter()
            .map(|&athlete_id| (athlete_id, self.assess(loader, athlete_id, date)))
            .collect();

        let mut athletes = Vec::with_capacity(outcomes.len());
        let mut errors = Vec::new();
        for (athlete_id, outcome) in outcomes {
            match outcome {
                Ok(result) => athletes.push(result),
                Err(err) => {
                    warn!(athlete_id, error = %err, "Team assessment failed for athlete");
                    errors.push(TeamAssessmentError {
                        athlete_id,
                        message: err.to_string(),
                    });
                }
            }
        }

        athletes.sort_by(|a, b| {
            b.overall_risk_score
                .total_cmp(&a.overall_risk_score)
                .then(a.athlete_id.cmp(&b.athlete_id))
        });

        let count = |level: RiskLevel| athletes.iter().filter(|r| r.risk_level == level).count();

        TeamOverview {
            date,
            high_risk_count: count(RiskLevel::High),
            medium_risk_count: count(RiskLevel::Medium),
            low_risk_count: count(RiskLevel::Low),
            athletes,
            errors,
        }
    }
}
