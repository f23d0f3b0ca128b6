//! Demo athletes covering the main risk patterns
//!
//! Every scenario draws its noise from a ChaCha8 generator seeded with a
//! fixed per-scenario seed, so the same end date always yields the same
//! dataset.

use chrono::{Days, NaiveDate};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::load_metrics::KinexonSession;
use crate::loader::{AthleteHistory, Dataset, TelemetryDay};
use crate::models::{
    AthleteId, AthleteProfile, InjuryRecord, LifestyleSample, Severity, TreatmentRecord,
};

pub const DEFAULT_LOAD_DAYS: u32 = 56;
pub const DEFAULT_LIFESTYLE_DAYS: u32 = 14;
pub const DEFAULT_TREATMENT_DAYS: u32 = 21;

/// Named demo scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Gradual 5%/week progression with healthy variation
    LowRiskOptimal,
    /// Nearly identical load every day
    MediumRiskMonotony,
    /// Load doubles in the last week on top of poor sleep and high stress
    HighRiskCompound,
    /// Return to play after a hamstring strain
    RecentInjury,
    /// Elevated final week with a single extreme session
    LoadSpike,
}

impl Scenario {
    pub const ALL: [Scenario; 5] = [
        Scenario::LowRiskOptimal,
        Scenario::MediumRiskMonotony,
        Scenario::HighRiskCompound,
        Scenario::RecentInjury,
        Scenario::LoadSpike,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Scenario::LowRiskOptimal => "low_risk_optimal",
            Scenario::MediumRiskMonotony => "medium_risk_monotony",
            Scenario::HighRiskCompound => "high_risk_compound",
            Scenario::RecentInjury => "recent_injury",
            Scenario::LoadSpike => "load_spike",
        }
    }

    fn seed(&self) -> u64 {
        match self {
            Scenario::LowRiskOptimal => 11,
            Scenario::MediumRiskMonotony => 23,
            Scenario::HighRiskCompound => 37,
            Scenario::RecentInjury => 41,
            Scenario::LoadSpike => 53,
        }
    }

    fn profile(&self, id: AthleteId) -> AthleteProfile {
        let (name, age, position, team) = match self {
            Scenario::LowRiskOptimal => ("Alex Thompson", 23, "Forward", "Team A"),
            Scenario::MediumRiskMonotony => ("Jordan Martinez", 28, "Midfielder", "Team A"),
            Scenario::HighRiskCompound => ("Sam Chen", 32, "Defender", "Team B"),
            Scenario::RecentInjury => ("Morgan Davis", 35, "Goalkeeper", "Team B"),
            Scenario::LoadSpike => ("Casey Rodriguez", 26, "Forward", "Team C"),
        };

        AthleteProfile {
            id,
            name: name.to_string(),
            age: Some(age),
            position: Some(position.to_string()),
            team: Some(team.to_string()),
        }
    }

    /// Intended load for day `i` of `days`
    fn target_load(&self, i: u32, days: u32, rng: &mut impl Rng) -> f64 {
        let mut spread = |half_width: f64| rng.gen_range(-half_width..=half_width);
        match self {
            Scenario::LowRiskOptimal => {
                let progression = 1.0 + (i / 7) as f64 * 0.05;
                300.0 * progression * (1.0 + spread(0.15))
            }
            Scenario::MediumRiskMonotony => 350.0 + spread(10.0),
            Scenario::HighRiskCompound => {
                if i + 7 < days {
                    250.0 + spread(30.0)
                } else {
                    550.0 + spread(50.0)
                }
            }
            Scenario::RecentInjury => {
                if i < 28 {
                    100.0 + spread(20.0)
                } else {
                    150.0 + ((i - 28) / 7) as f64 * 50.0 + spread(25.0)
                }
            }
            Scenario::LoadSpike => {
                if i + 3 == days {
                    700.0
                } else if i + 7 >= days {
                    320.0 * 1.4 + spread(40.0)
                } else {
                    320.0 + spread(50.0)
                }
            }
        }
    }

    /// (sleep hours, sleep quality, stress, nutrition) ranges
    fn lifestyle_ranges(&self) -> [(f64, f64); 4] {
        match self {
            Scenario::LowRiskOptimal => [(7.5, 8.5), (7.0, 9.0), (2.0, 4.0), (7.0, 9.0)],
            Scenario::MediumRiskMonotony => [(6.5, 7.5), (6.0, 8.0), (4.0, 6.0), (6.0, 8.0)],
            Scenario::HighRiskCompound => [(5.0, 5.9), (3.0, 5.0), (8.0, 9.0), (4.0, 6.0)],
            Scenario::RecentInjury => [(7.0, 8.0), (6.0, 8.0), (5.0, 7.0), (7.0, 9.0)],
            Scenario::LoadSpike => [(6.0, 7.0), (5.0, 7.0), (5.0, 7.0), (6.0, 8.0)],
        }
    }

    /// (days ago, type, body part, severity, days to recover)
    fn injuries(&self) -> &'static [(u64, &'static str, &'static str, &'static str, Option<u64>)] {
        match self {
            Scenario::LowRiskOptimal => &[(200, "Contusion", "Thigh", "minor", Some(7))],
            Scenario::MediumRiskMonotony => &[],
            Scenario::HighRiskCompound => &[
                (180, "Ligament Sprain Grade 2", "Ankle", "moderate", Some(35)),
                (12, "Muscle Strain Grade 1", "Calf", "mild", None),
            ],
            Scenario::RecentInjury => {
                &[(35, "Muscle Strain Grade 2", "Hamstring", "moderate", Some(21))]
            }
            Scenario::LoadSpike => &[(90, "Tendinopathy", "Achilles", "moderate", Some(60))],
        }
    }

    fn treatment_modalities(&self) -> (&'static [&'static str], u32) {
        match self {
            // Two of every five days
            Scenario::RecentInjury | Scenario::HighRiskCompound => (
                &["Physiotherapy", "Massage", "Ice Bath", "Compression", "Stretching"],
                2,
            ),
            _ => (&["Massage", "Ice Bath", "Foam Rolling"], 1),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .iter()
            .find(|scenario| scenario.key() == s.trim().to_lowercase())
            .copied()
            .ok_or_else(|| format!("Unknown scenario: {}", s))
    }
}

/// Telemetry whose derived load equals `target` up to rounding
fn session_for(target: f64, rng: &mut impl Rng) -> KinexonSession {
    let mut average_speed: f64 = rng.gen_range(3.0..5.5);
    let mut max_speed: f64 = rng.gen_range(12.0..18.5);
    let mut accel = (100.0 * target / 350.0 + rng.gen_range(-20.0..20.0)).clamp(30.0, 250.0);

    // Light sessions: keep distance the dominant term
    let fixed = accel * 1.5 + average_speed * 5.0 + max_speed * 2.0;
    if fixed > target * 0.6 {
        let scale = target * 0.6 / fixed;
        accel *= scale;
        average_speed *= scale;
        max_speed *= scale;
    }

    let fixed = accel * 1.5 + average_speed * 5.0 + max_speed * 2.0;
    KinexonSession {
        distance_miles: (target - fixed).max(0.0) / 160.0,
        accumulated_accel_load: accel,
        average_speed_mph: Some(average_speed),
        max_speed_mph: Some(max_speed),
    }
}

/// Builds demo histories ending at a fixed date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioGenerator {
    pub end_date: NaiveDate,
    pub load_days: u32,
    pub lifestyle_days: u32,
    pub treatment_days: u32,
}

impl ScenarioGenerator {
    pub fn new(end_date: NaiveDate) -> Self {
        ScenarioGenerator {
            end_date,
            load_days: DEFAULT_LOAD_DAYS,
            lifestyle_days: DEFAULT_LIFESTYLE_DAYS,
            treatment_days: DEFAULT_TREATMENT_DAYS,
        }
    }

    fn days_ago(&self, n: u64) -> NaiveDate {
        self.end_date
            .checked_sub_days(Days::new(n))
            .unwrap_or(NaiveDate::MIN)
    }

    /// Day `i` of a `days`-long series ending at `end_date`
    fn series_day(&self, i: u32, days: u32) -> NaiveDate {
        self.days_ago((days - 1 - i) as u64)
    }

    pub fn athlete(&self, scenario: Scenario, id: AthleteId) -> AthleteHistory {
        let mut rng = ChaCha8Rng::seed_from_u64(scenario.seed());
        let mut history = AthleteHistory::new(scenario.profile(id));

        history.telemetry = (0..self.load_days)
            .map(|i| {
                let target = scenario.target_load(i, self.load_days, &mut rng);
                TelemetryDay {
                    date: self.series_day(i, self.load_days),
                    session: session_for(target, &mut rng),
                }
            })
            .collect();

        let [sleep, quality, stress, nutrition] = scenario.lifestyle_ranges();
        history.lifestyle_logs = (0..self.lifestyle_days)
            .map(|i| LifestyleSample {
                date: self.series_day(i, self.lifestyle_days),
                sleep_hours: Some((rng.gen_range(sleep.0..=sleep.1) * 10.0).round() / 10.0),
                sleep_quality: Some(rng.gen_range(quality.0..=quality.1).round() as u8),
                nutrition_score: Some(rng.gen_range(nutrition.0..=nutrition.1).round() as u8),
                stress_level: Some(rng.gen_range(stress.0..=stress.1).round() as u8),
            })
            .collect();

        history.injuries = scenario
            .injuries()
            .iter()
            .enumerate()
            .map(|(k, (days_ago, injury_type, body_part, severity, recovery))| InjuryRecord {
                id: id * 100 + k as i64 + 1,
                athlete_id: id,
                injury_date: self.days_ago(*days_ago),
                injury_type: injury_type.to_string(),
                body_part: body_part.to_string(),
                severity: Some(Severity::from(*severity)),
                recovery_date: recovery.map(|r| self.days_ago(days_ago.saturating_sub(r))),
            })
            .collect();

        let (modalities, per_five_days) = scenario.treatment_modalities();
        history.treatments = (0..self.treatment_days)
            .filter(|i| i % 5 < per_five_days)
            .map(|i| TreatmentRecord {
                date: self.series_day(i, self.treatment_days),
                modality: modalities.choose(&mut rng).map(|m| m.to_string()),
                severity: None,
            })
            .collect();

        history
    }

    /// All five scenarios with ids 1 to 5
    pub fn dataset(&self) -> Dataset {
        Dataset {
            athletes: Scenario::ALL
                .iter()
                .enumerate()
                .map(|(k, scenario)| self.athlete(*scenario, k as AthleteId + 1))
                .collect(),
        }
    }
}
