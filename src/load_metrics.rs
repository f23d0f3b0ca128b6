//! Training-load statistics
//!
//! Pure functions over a date-ordered sequence of [`DailyLoadSample`]s. Every
//! windowed metric is right-closed at the target date. Metrics with too few
//! samples report `None` (or the documented neutral value) instead of failing.
//!
//! - **ACWR**: mean of the acute window over mean of the chronic window
//! - **Load spike**: magnitude and frequency of day-over-day load jumps
//! - **Monotony** (Foster): mean / population standard deviation
//! - **Strain**: weekly total load times monotony
//! - **Baseline z-score**: recent days measured against the athlete's own history

use chrono::NaiveDate;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::models::{DailyLoadSample, DateRange};

pub const DEFAULT_ACUTE_WINDOW: u32 = 7;
pub const DEFAULT_CHRONIC_WINDOW: u32 = 28;
pub const DEFAULT_SPIKE_LOOKBACK: u32 = 14;
pub const DEFAULT_MONOTONY_WINDOW: u32 = 7;
pub const DEFAULT_ZSCORE_LOOKBACK: u32 = 28;

/// Monotony reported when the window has zero variation
pub const MAX_MONOTONY: f64 = 10.0;

const MIN_SPIKE_SAMPLES: usize = 3;
const MIN_MONOTONY_SAMPLES: usize = 3;
const MIN_ZSCORE_SAMPLES: usize = 7;
const ZSCORE_RECENT_DAYS: usize = 7;
const MIN_BASELINE_SAMPLES: usize = 3;

/// Day-over-day change (percent) counted as a spike
const SPIKE_CHANGE_PCT: f64 = 30.0;

/// Acute:Chronic Workload Ratio with its two averages
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Acwr {
    pub acute_load: f64,
    pub chronic_load: f64,
    /// 0 when the chronic load is 0
    pub acwr: f64,
}

/// Recent loads measured in baseline standard deviations
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ZScoreSpike {
    /// z of the most recent sample
    pub current_z: f64,
    /// largest z over the last seven samples
    pub max_z_7d: f64,
}

/// Descriptive statistics for a load window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub period_days: u32,
    pub session_count: usize,
    pub total_load: f64,
    pub average_load: f64,
    pub max_load: f64,
    pub min_load: f64,
}

/// Wearable telemetry for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinexonSession {
    pub distance_miles: f64,
    pub accumulated_accel_load: f64,
    #[serde(default)]
    pub average_speed_mph: Option<f64>,
    #[serde(default)]
    pub max_speed_mph: Option<f64>,
}

impl KinexonSession {
    pub fn training_load(&self) -> f64 {
        calculate_training_load_from_kinexon(
            self.distance_miles,
            self.accumulated_accel_load,
            self.average_speed_mph,
            self.max_speed_mph,
        )
    }
}

/// Daily training load from telemetry, rounded to two decimals
///
/// `load = 160*distance + 1.5*accel_load + 5*avg_speed + 2*max_speed`; absent
/// speeds contribute nothing.
pub fn calculate_training_load_from_kinexon(
    distance_miles: f64,
    accumulated_accel_load: f64,
    average_speed_mph: Option<f64>,
    max_speed_mph: Option<f64>,
) -> f64 {
    let raw = distance_miles * 160.0
        + accumulated_accel_load * 1.5
        + average_speed_mph.unwrap_or(0.0) * 5.0
        + max_speed_mph.unwrap_or(0.0) * 2.0;

    Decimal::from_f64(raw)
        .map(|d| d.round_dp(2))
        .and_then(|d| d.to_f64())
        .unwrap_or(raw)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().mean()
}

// Summation error can leave a tiny positive deviation for identical values
fn is_flat(values: &[f64]) -> bool {
    values.windows(2).all(|pair| pair[0] == pair[1])
}

fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().population_std_dev()
}

/// Load-based metrics calculator
pub struct LoadMetrics;

impl LoadMetrics {
    /// Load values whose date falls inside `range`, in input order
    pub fn window_values(samples: &[DailyLoadSample], range: DateRange) -> Vec<f64> {
        samples
            .iter()
            .filter(|s| range.contains(s.date))
            .map(|s| s.training_load)
            .collect()
    }

    /// Acute:Chronic Workload Ratio at `target`
    ///
    /// Returns `None` when the chronic window holds fewer samples than the
    /// acute window length.
    pub fn acwr(
        samples: &[DailyLoadSample],
        target: NaiveDate,
        acute_window: u32,
        chronic_window: u32,
    ) -> Option<Acwr> {
        let values = Self::window_values(samples, DateRange::trailing(target, chronic_window));
        let acute_len = acute_window as usize;

        if acute_len == 0 || values.len() < acute_len {
            return None;
        }

        let acute_load = mean(&values[values.len() - acute_len..]);
        let chronic_load = mean(&values);
        let acwr = if chronic_load > 0.0 {
            acute_load / chronic_load
        } else {
            0.0
        };

        Some(Acwr {
            acute_load,
            chronic_load,
            acwr,
        })
    }

    /// Load spike score (0-100) over `[target - lookback_days, target]`
    pub fn load_spike_score(
        samples: &[DailyLoadSample],
        target: NaiveDate,
        lookback_days: u32,
    ) -> f64 {
        let values = Self::window_values(samples, DateRange::lookback(target, lookback_days));
        Self::spike_score_from_values(&values)
    }

    /// Spike score over an already windowed sequence
    pub fn spike_score_from_values(values: &[f64]) -> f64 {
        if values.len() < MIN_SPIKE_SAMPLES {
            return 0.0;
        }

        // Transitions out of a zero-load day have no defined percentage
        let changes: Vec<f64> = values
            .windows(2)
            .filter(|pair| pair[0] > 0.0)
            .map(|pair| ((pair[1] - pair[0]) / pair[0] * 100.0).abs())
            .collect();

        if changes.is_empty() {
            return 0.0;
        }

        let avg_change = mean(&changes);
        let max_change = changes.iter().cloned().fold(f64::MIN, f64::max);
        let spike_count = changes.iter().filter(|&&c| c > SPIKE_CHANGE_PCT).count();

        (avg_change * 2.0 + max_change * 0.5 + spike_count as f64 * 10.0).min(100.0)
    }

    /// Foster monotony over the whole slice
    ///
    /// `None` below three samples; [`MAX_MONOTONY`] when every value is
    /// identical and the standard deviation is zero.
    pub fn monotony(values: &[f64]) -> Option<f64> {
        if values.len() < MIN_MONOTONY_SAMPLES {
            return None;
        }

        let std_dev = population_std_dev(values);
        if is_flat(values) || std_dev == 0.0 {
            return Some(MAX_MONOTONY);
        }

        Some(mean(values) / std_dev)
    }

    /// Foster strain over the whole slice: total load times monotony
    pub fn strain(values: &[f64]) -> Option<f64> {
        Self::monotony(values).map(|monotony| values.iter().sum::<f64>() * monotony)
    }

    /// Monotony over the `window` days ending at `target`
    pub fn training_monotony(
        samples: &[DailyLoadSample],
        target: NaiveDate,
        window: u32,
    ) -> Option<f64> {
        Self::monotony(&Self::window_values(samples, DateRange::trailing(target, window)))
    }

    /// Strain over the `window` days ending at `target`
    pub fn training_strain(
        samples: &[DailyLoadSample],
        target: NaiveDate,
        window: u32,
    ) -> Option<f64> {
        Self::strain(&Self::window_values(samples, DateRange::trailing(target, window)))
    }

    /// Baseline z-score spike over the `lookback_days` ending at `target`
    pub fn baseline_zscore(
        samples: &[DailyLoadSample],
        target: NaiveDate,
        lookback_days: u32,
    ) -> ZScoreSpike {
        let values = Self::window_values(samples, DateRange::trailing(target, lookback_days));
        Self::zscore_from_values(&values)
    }

    /// Z-score spike over an already windowed sequence
    ///
    /// The baseline is everything but the last seven samples once 21 or more
    /// exist, otherwise the earliest 75%, falling back to the full set if that
    /// leaves fewer than three samples.
    pub fn zscore_from_values(values: &[f64]) -> ZScoreSpike {
        let n = values.len();
        if n < MIN_ZSCORE_SAMPLES {
            return ZScoreSpike::default();
        }

        let mut baseline = if n >= 3 * ZSCORE_RECENT_DAYS {
            &values[..n - ZSCORE_RECENT_DAYS]
        } else {
            &values[..n * 3 / 4]
        };
        if baseline.len() < MIN_BASELINE_SAMPLES {
            baseline = values;
        }

        let baseline_mean = mean(baseline);
        let baseline_std = population_std_dev(baseline);
        if is_flat(baseline) || baseline_std == 0.0 {
            return ZScoreSpike::default();
        }

        let recent = &values[n - ZSCORE_RECENT_DAYS.min(n)..];
        let z_scores: Vec<f64> = recent
            .iter()
            .map(|v| (v - baseline_mean) / baseline_std)
            .collect();

        ZScoreSpike {
            current_z: z_scores.last().copied().unwrap_or(0.0),
            max_z_7d: z_scores.iter().cloned().fold(f64::MIN, f64::max),
        }
    }

    /// Session statistics over `[target - days, target]`
    pub fn summary(
        samples: &[DailyLoadSample],
        target: NaiveDate,
        days: u32,
    ) -> Option<TrainingSummary> {
        let values = Self::window_values(samples, DateRange::lookback(target, days));
        if values.is_empty() {
            return None;
        }

        let total_load: f64 = values.iter().sum();
        Some(TrainingSummary {
            period_days: days,
            session_count: values.len(),
            total_load,
            average_load: total_load / values.len() as f64,
            max_load: values.iter().cloned().fold(f64::MIN, f64::max),
            min_load: values.iter().cloned().fold(f64::MAX, f64::min),
        })
    }
}
