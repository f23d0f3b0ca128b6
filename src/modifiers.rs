//! Multiplicative risk amplifiers
//!
//! Each modifier is an independent pure function returning a factor of at
//! least 1.0. Missing data yields exactly 1.0. The compound multiplier is
//! the plain product of the individual factors.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{DateRange, InjuryRecord, LifestyleSample};

pub const DEFAULT_MODIFIER_WINDOW: u32 = 7;
pub const DEFAULT_INJURY_RECENCY_WINDOW: u32 = 90;

/// The four factors that make up the compound multiplier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskModifierSet {
    pub sleep: f64,
    pub stress: f64,
    pub injury_recency: f64,
    pub age: f64,
}

impl Default for RiskModifierSet {
    fn default() -> Self {
        RiskModifierSet {
            sleep: 1.0,
            stress: 1.0,
            injury_recency: 1.0,
            age: 1.0,
        }
    }
}

impl RiskModifierSet {
    pub fn compound(&self) -> f64 {
        self.sleep * self.stress * self.injury_recency * self.age
    }

    /// Number of factors actually amplifying risk
    pub fn active_count(&self) -> usize {
        [self.sleep, self.stress, self.injury_recency, self.age]
            .iter()
            .filter(|&&m| m > 1.0)
            .count()
    }
}

/// Risk modifier functions
pub struct RiskModifiers;

impl RiskModifiers {
    /// Mean sleep hours over the window, ignoring logs without sleep data
    pub fn average_sleep_hours(
        samples: &[LifestyleSample],
        target: NaiveDate,
        window: u32,
    ) -> Option<f64> {
        let range = DateRange::trailing(target, window);
        average(
            samples
                .iter()
                .filter(|s| range.contains(s.date))
                .filter_map(|s| s.sleep_hours),
        )
    }

    /// Mean stress level over the window, ignoring logs without stress data
    pub fn average_stress(
        samples: &[LifestyleSample],
        target: NaiveDate,
        window: u32,
    ) -> Option<f64> {
        let range = DateRange::trailing(target, window);
        average(
            samples
                .iter()
                .filter(|s| range.contains(s.date))
                .filter_map(|s| s.stress_level.map(f64::from)),
        )
    }

    /// Sleep deprivation factor: <6h 1.4, <7h 1.2, 7-9h 1.0, >9h 1.1
    pub fn sleep_modifier(avg_sleep_hours: Option<f64>) -> f64 {
        match avg_sleep_hours {
            None => 1.0,
            Some(h) if h < 6.0 => 1.4,
            Some(h) if h < 7.0 => 1.2,
            Some(h) if h <= 9.0 => 1.0,
            Some(_) => 1.1,
        }
    }

    /// Psychological stress factor: >=8 1.3, >=6 1.15
    pub fn stress_modifier(avg_stress: Option<f64>) -> f64 {
        match avg_stress {
            Some(s) if s >= 8.0 => 1.3,
            Some(s) if s >= 6.0 => 1.15,
            _ => 1.0,
        }
    }

    /// Days since the latest injury on or before `target` within `window` days
    pub fn days_since_last_injury(
        injuries: &[InjuryRecord],
        target: NaiveDate,
        window: u32,
    ) -> Option<i64> {
        let range = DateRange::lookback(target, window);
        injuries
            .iter()
            .filter(|injury| range.contains(injury.injury_date))
            .map(|injury| injury.injury_date)
            .max()
            .map(|latest| (target - latest).num_days())
    }

    /// Re-injury factor: <14d 1.8, <30d 1.5, <60d 1.25, otherwise 1.1
    pub fn injury_recency_modifier(days_since_injury: Option<i64>) -> f64 {
        match days_since_injury {
            None => 1.0,
            Some(d) if d < 14 => 1.8,
            Some(d) if d < 30 => 1.5,
            Some(d) if d < 60 => 1.25,
            Some(_) => 1.1,
        }
    }

    /// Age factor: <25 1.0, <30 1.1, <35 1.2, 35+ 1.3
    pub fn age_modifier(age: Option<u32>) -> f64 {
        match age {
            None => 1.0,
            Some(a) if a < 25 => 1.0,
            Some(a) if a < 30 => 1.1,
            Some(a) if a < 35 => 1.2,
            Some(_) => 1.3,
        }
    }
}

fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    use statrs::statistics::Statistics;

    let values: Vec<f64> = values.collect();
    (!values.is_empty()).then(|| values.iter().mean())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn target() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn days_ago(n: u64) -> NaiveDate {
        target().checked_sub_days(Days::new(n)).unwrap()
    }

    fn log(n: u64, sleep: Option<f64>, stress: Option<u8>) -> LifestyleSample {
        LifestyleSample {
            date: days_ago(n),
            sleep_hours: sleep,
            stress_level: stress,
            ..LifestyleSample::default()
        }
    }

    fn injury_on(n: u64) -> InjuryRecord {
        InjuryRecord {
            id: n as i64,
            athlete_id: 1,
            injury_date: days_ago(n),
            injury_type: "Ankle Sprain".to_string(),
            body_part: "ankle".to_string(),
            severity: None,
            recovery_date: None,
        }
    }

    #[test]
    fn test_sleep_modifier_bands() {
        assert_eq!(RiskModifiers::sleep_modifier(Some(5.5)), 1.4);
        assert_eq!(RiskModifiers::sleep_modifier(Some(6.0)), 1.2);
        assert_eq!(RiskModifiers::sleep_modifier(Some(7.0)), 1.0);
        assert_eq!(RiskModifiers::sleep_modifier(Some(9.0)), 1.0);
        assert_eq!(RiskModifiers::sleep_modifier(Some(9.5)), 1.1);
        assert_eq!(RiskModifiers::sleep_modifier(None), 1.0);
    }

    #[test]
    fn test_stress_modifier_bands() {
        assert_eq!(RiskModifiers::stress_modifier(Some(8.0)), 1.3);
        assert_eq!(RiskModifiers::stress_modifier(Some(6.0)), 1.15);
        assert_eq!(RiskModifiers::stress_modifier(Some(5.9)), 1.0);
        assert_eq!(RiskModifiers::stress_modifier(None), 1.0);
    }

    #[test]
    fn test_injury_recency_bands() {
        assert_eq!(RiskModifiers::injury_recency_modifier(Some(0)), 1.8);
        assert_eq!(RiskModifiers::injury_recency_modifier(Some(14)), 1.5);
        assert_eq!(RiskModifiers::injury_recency_modifier(Some(30)), 1.25);
        assert_eq!(RiskModifiers::injury_recency_modifier(Some(60)), 1.1);
        assert_eq!(RiskModifiers::injury_recency_modifier(None), 1.0);
    }

    #[test]
    fn test_age_bands() {
        assert_eq!(RiskModifiers::age_modifier(Some(22)), 1.0);
        assert_eq!(RiskModifiers::age_modifier(Some(25)), 1.1);
        assert_eq!(RiskModifiers::age_modifier(Some(32)), 1.2);
        assert_eq!(RiskModifiers::age_modifier(Some(35)), 1.3);
        assert_eq!(RiskModifiers::age_modifier(None), 1.0);
    }

    #[test]
    fn test_weekly_averages_skip_missing_fields() {
        let samples = vec![
            log(0, Some(5.0), None),
            log(1, None, Some(9)),
            log(2, Some(6.0), Some(7)),
            log(10, Some(12.0), Some(1)),
        ];

        assert_eq!(RiskModifiers::average_sleep_hours(&samples, target(), 7), Some(5.5));
        assert_eq!(RiskModifiers::average_stress(&samples, target(), 7), Some(8.0));
        assert_eq!(RiskModifiers::average_sleep_hours(&[], target(), 7), None);
    }

    #[test]
    fn test_days_since_last_injury() {
        let injuries = vec![injury_on(45), injury_on(10), injury_on(120)];
        assert_eq!(RiskModifiers::days_since_last_injury(&injuries, target(), 90), Some(10));

        let old = vec![injury_on(91)];
        assert_eq!(RiskModifiers::days_since_last_injury(&old, target(), 90), None);

        // Injuries after the target date are not history yet
        let future = vec![InjuryRecord {
            injury_date: target().checked_add_days(Days::new(3)).unwrap(),
            ..injury_on(0)
        }];
        assert_eq!(RiskModifiers::days_since_last_injury(&future, target(), 90), None);
    }

    #[test]
    fn test_compound_multiplier() {
        let set = RiskModifierSet {
            sleep: 1.4,
            stress: 1.3,
            injury_recency: 1.8,
            age: 1.3,
        };
        assert!((set.compound() - 4.2588).abs() < 1e-9);
        assert_eq!(set.active_count(), 4);
        assert_eq!(RiskModifierSet::default().compound(), 1.0);
    }
}
