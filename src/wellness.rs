//! Treatment, lifestyle and injury-history scoring
//!
//! Recovery and lifestyle scores are "higher is better"; the injury-history
//! score is "higher is riskier". All three are clamped to 0-100.

use chrono::NaiveDate;
use statrs::statistics::Statistics;

use crate::models::{DateRange, InjuryRecord, LifestyleSample, Severity, TreatmentRecord};

pub const DEFAULT_RECOVERY_LOOKBACK: u32 = 14;
pub const DEFAULT_LIFESTYLE_LOOKBACK: u32 = 7;
pub const DEFAULT_INJURY_HISTORY_LOOKBACK: u32 = 180;

/// Lifestyle score when nothing was logged
pub const NEUTRAL_LIFESTYLE_SCORE: f64 = 50.0;

const OPTIMAL_TREATMENTS_PER_WEEK: (f64, f64) = (2.0, 4.0);
const MAX_SEVERITY_PENALTY: f64 = 40.0;
const INJURY_BASE_POINTS: f64 = 20.0;
const MIN_RECENCY_FACTOR: f64 = 0.3;

/// Injury-history weight per severity label
fn history_severity_multiplier(severity: Option<&Severity>) -> f64 {
    match severity {
        Some(Severity::Minor) => 1.0,
        Some(Severity::Moderate) => 2.0,
        Some(Severity::Severe) => 3.0,
        Some(Severity::Catastrophic) => 4.0,
        _ => 1.0,
    }
}

/// Wellness metrics calculator
pub struct WellnessMetrics;

impl WellnessMetrics {
    /// Recovery score from treatment frequency over `[target - lookback_days, target]`
    ///
    /// Two to four treatments a week scores 100. Moderate and severe treatments
    /// indicate an underlying problem and cost 10 points each, at most 40.
    pub fn recovery_score(
        treatments: &[TreatmentRecord],
        target: NaiveDate,
        lookback_days: u32,
    ) -> f64 {
        if lookback_days == 0 {
            return 0.0;
        }

        let range = DateRange::lookback(target, lookback_days);
        let in_window: Vec<&TreatmentRecord> =
            treatments.iter().filter(|t| range.contains(t.date)).collect();

        let weeks = lookback_days as f64 / 7.0;
        let per_week = in_window.len() as f64 / weeks;

        let (low, high) = OPTIMAL_TREATMENTS_PER_WEEK;
        let frequency_score = if (low..=high).contains(&per_week) {
            100.0
        } else if per_week < low {
            (per_week * 50.0).min(100.0)
        } else {
            (100.0 - (per_week - high) * 10.0).max(0.0)
        };

        let serious = in_window
            .iter()
            .filter(|t| matches!(t.severity, Some(Severity::Severe) | Some(Severity::Moderate)))
            .count();
        let penalty = (serious as f64 * 10.0).min(MAX_SEVERITY_PENALTY);

        (frequency_score - penalty).max(0.0)
    }

    /// Points for a single lifestyle log, or `None` if it carries no fields
    ///
    /// A zero reading counts as not logged.
    pub fn lifestyle_sample_score(sample: &LifestyleSample) -> Option<f64> {
        let logged = |value: Option<u8>| value.filter(|&v| v != 0);
        let mut score = 0.0;
        let mut factors = 0;

        if let Some(hours) = sample.sleep_hours.filter(|&h| h != 0.0) {
            score += if (7.0..=9.0).contains(&hours) {
                25.0
            } else if (6.0..=10.0).contains(&hours) {
                15.0
            } else {
                5.0
            };
            factors += 1;
        }

        if let Some(quality) = logged(sample.sleep_quality) {
            score += quality as f64 * 2.5;
            factors += 1;
        }

        if let Some(nutrition) = logged(sample.nutrition_score) {
            score += nutrition as f64 * 2.5;
            factors += 1;
        }

        if let Some(stress) = logged(sample.stress_level) {
            score += (10.0 - stress as f64 + 1.0) * 2.5;
            factors += 1;
        }

        (factors > 0).then_some(score)
    }

    /// Average lifestyle score over `[target - lookback_days, target]`
    pub fn lifestyle_score(
        samples: &[LifestyleSample],
        target: NaiveDate,
        lookback_days: u32,
    ) -> f64 {
        let range = DateRange::lookback(target, lookback_days);
        let scores: Vec<f64> = samples
            .iter()
            .filter(|s| range.contains(s.date))
            .filter_map(Self::lifestyle_sample_score)
            .collect();

        if scores.is_empty() {
            return NEUTRAL_LIFESTYLE_SCORE;
        }

        scores.iter().mean().clamp(0.0, 100.0)
    }

    /// Injury-history risk over `[target - lookback_days, target]`
    ///
    /// Each injury contributes `20 * recency * severity`, recency decaying
    /// linearly to a floor of 0.3 across the lookback.
    pub fn injury_history_score(
        injuries: &[InjuryRecord],
        target: NaiveDate,
        lookback_days: u32,
    ) -> f64 {
        if lookback_days == 0 {
            return 0.0;
        }

        let range = DateRange::lookback(target, lookback_days);
        let score: f64 = injuries
            .iter()
            .filter(|injury| range.contains(injury.injury_date))
            .map(|injury| {
                let days_ago = (target - injury.injury_date).num_days() as f64;
                let recency = (1.0 - days_ago / lookback_days as f64).max(MIN_RECENCY_FACTOR);
                INJURY_BASE_POINTS * recency * history_severity_multiplier(injury.severity.as_ref())
            })
            .sum();

        score.min(100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    const EPS: f64 = 1e-9;

    fn target() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn days_ago(n: u64) -> NaiveDate {
        target().checked_sub_days(Days::new(n)).unwrap()
    }

    fn treatment(n: u64, severity: Option<Severity>) -> TreatmentRecord {
        TreatmentRecord {
            date: days_ago(n),
            modality: Some("massage".to_string()),
            severity,
        }
    }

    fn injury(n: u64, severity: Option<Severity>) -> InjuryRecord {
        InjuryRecord {
            id: n as i64,
            athlete_id: 1,
            injury_date: days_ago(n),
            injury_type: "Hamstring Strain".to_string(),
            body_part: "hamstring".to_string(),
            severity,
            recovery_date: None,
        }
    }

    #[test]
    fn test_recovery_score_frequency_bands() {
        // 6 treatments / 2 weeks = 3 per week
        let optimal: Vec<_> = (0..6).map(|i| treatment(i * 2, None)).collect();
        assert_eq!(WellnessMetrics::recovery_score(&optimal, target(), 14), 100.0);

        // 2 / 2 weeks = 1 per week -> 50
        let sparse = vec![treatment(1, None), treatment(5, None)];
        assert_eq!(WellnessMetrics::recovery_score(&sparse, target(), 14), 50.0);

        // 12 / 2 weeks = 6 per week -> 80
        let frequent: Vec<_> = (0..12).map(|i| treatment(i, None)).collect();
        assert!((WellnessMetrics::recovery_score(&frequent, target(), 14) - 80.0).abs() < EPS);

        assert_eq!(WellnessMetrics::recovery_score(&[], target(), 14), 0.0);
    }

    #[test]
    fn test_recovery_score_severity_penalty() {
        let treatments = vec![
            treatment(0, Some(Severity::Severe)),
            treatment(2, Some(Severity::Moderate)),
            treatment(4, Some(Severity::Minor)),
            treatment(6, None),
        ];
        // 2 per week -> 100, minus 2 serious treatments
        assert_eq!(WellnessMetrics::recovery_score(&treatments, target(), 14), 80.0);

        let all_severe: Vec<_> = (0..6).map(|i| treatment(i, Some(Severity::Severe))).collect();
        assert_eq!(WellnessMetrics::recovery_score(&all_severe, target(), 14), 60.0);
    }

    #[test]
    fn test_recovery_score_ignores_out_of_window() {
        let treatments = vec![treatment(20, Some(Severity::Severe)), treatment(30, None)];
        assert_eq!(WellnessMetrics::recovery_score(&treatments, target(), 14), 0.0);
    }

    #[test]
    fn test_lifestyle_sample_score() {
        let sample = LifestyleSample {
            date: target(),
            sleep_hours: Some(8.0),
            sleep_quality: Some(8),
            nutrition_score: Some(6),
            stress_level: Some(3),
        };
        // 25 + 20 + 15 + 20
        assert_eq!(WellnessMetrics::lifestyle_sample_score(&sample), Some(80.0));

        let short_sleep = LifestyleSample {
            date: target(),
            sleep_hours: Some(6.5),
            ..LifestyleSample::default()
        };
        assert_eq!(WellnessMetrics::lifestyle_sample_score(&short_sleep), Some(15.0));

        let very_short = LifestyleSample {
            date: target(),
            sleep_hours: Some(4.0),
            ..LifestyleSample::default()
        };
        assert_eq!(WellnessMetrics::lifestyle_sample_score(&very_short), Some(5.0));

        let empty = LifestyleSample {
            date: target(),
            ..LifestyleSample::default()
        };
        assert_eq!(WellnessMetrics::lifestyle_sample_score(&empty), None);
    }

    #[test]
    fn test_zero_readings_count_as_not_logged() {
        let blank = LifestyleSample {
            date: target(),
            sleep_hours: Some(0.0),
            sleep_quality: Some(0),
            nutrition_score: Some(0),
            stress_level: Some(0),
        };
        assert_eq!(WellnessMetrics::lifestyle_sample_score(&blank), None);

        let partial = LifestyleSample {
            sleep_quality: Some(8),
            ..blank.clone()
        };
        assert_eq!(WellnessMetrics::lifestyle_sample_score(&partial), Some(20.0));

        // The blank log is skipped rather than averaged in as zero
        let samples = vec![partial, LifestyleSample { date: days_ago(1), ..blank }];
        assert_eq!(WellnessMetrics::lifestyle_score(&samples, target(), 7), 20.0);
    }

    #[test]
    fn test_lifestyle_score_average_skips_empty_logs() {
        let samples = vec![
            LifestyleSample {
                date: days_ago(1),
                sleep_hours: Some(8.0),
                ..LifestyleSample::default()
            },
            LifestyleSample {
                date: days_ago(2),
                stress_level: Some(10),
                ..LifestyleSample::default()
            },
            LifestyleSample {
                date: days_ago(3),
                ..LifestyleSample::default()
            },
        ];
        // (25 + 2.5) / 2
        assert_eq!(WellnessMetrics::lifestyle_score(&samples, target(), 7), 13.75);
    }

    #[test]
    fn test_lifestyle_score_defaults_to_neutral() {
        assert_eq!(
            WellnessMetrics::lifestyle_score(&[], target(), 7),
            NEUTRAL_LIFESTYLE_SCORE
        );

        let stale = vec![LifestyleSample {
            date: days_ago(30),
            sleep_hours: Some(8.0),
            ..LifestyleSample::default()
        }];
        assert_eq!(
            WellnessMetrics::lifestyle_score(&stale, target(), 7),
            NEUTRAL_LIFESTYLE_SCORE
        );
    }

    #[test]
    fn test_injury_history_recency_and_severity() {
        // Today, moderate: 20 * 1.0 * 2
        let recent = vec![injury(0, Some(Severity::Moderate))];
        assert!((WellnessMetrics::injury_history_score(&recent, target(), 180) - 40.0).abs() < EPS);

        // 90 days ago, minor: 20 * 0.5 * 1
        let older = vec![injury(90, Some(Severity::Minor))];
        assert!((WellnessMetrics::injury_history_score(&older, target(), 180) - 10.0).abs() < EPS);

        // 170 days ago hits the recency floor, unknown severity weighs 1
        let faded = vec![injury(170, Some(Severity::Other("grade x".to_string())))];
        assert!((WellnessMetrics::injury_history_score(&faded, target(), 180) - 6.0).abs() < EPS);
    }

    #[test]
    fn test_injury_history_is_capped() {
        let injuries: Vec<_> = (0..3).map(|i| injury(i, Some(Severity::Catastrophic))).collect();
        assert_eq!(WellnessMetrics::injury_history_score(&injuries, target(), 180), 100.0);

        let outside = vec![injury(200, Some(Severity::Severe))];
        assert_eq!(WellnessMetrics::injury_history_score(&outside, target(), 180), 0.0);
    }
}
