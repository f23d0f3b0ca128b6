//! Injury recovery-time prediction
//!
//! Maps a free-text injury type to a category of the baseline table, then
//! scales the category's min/typical/max days by age, severity and
//! re-injury factors. Return dates count from the day the prediction is
//! issued, not from the injury date.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{RiskError, Result};
use crate::loader::TimeSeriesLoader;
use crate::models::{
    InjuryCategory, InjuryId, InjuryRecord, ModifierBreakdown, RecoveryPrediction, Severity,
};
use crate::modifiers::RiskModifiers;

/// A re-injury within this many days of the previous one weighs heavier
pub const RECENT_REINJURY_DAYS: i64 = 180;

const RECENT_REINJURY_FACTOR: f64 = 1.5;
const OLD_REINJURY_FACTOR: f64 = 1.3;

/// Expected recovery before any modifier is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryBaseline {
    pub min_days: u32,
    pub typical_days: u32,
    pub max_days: u32,
}

const fn baseline(min_days: u32, typical_days: u32, max_days: u32) -> RecoveryBaseline {
    RecoveryBaseline {
        min_days,
        typical_days,
        max_days,
    }
}

/// Published return-to-play ranges per category
pub static RECOVERY_BASELINES: &[(InjuryCategory, RecoveryBaseline)] = &[
    (InjuryCategory::MuscleStrainGrade1, baseline(7, 10, 14)),
    (InjuryCategory::MuscleStrainGrade2, baseline(14, 21, 28)),
    (InjuryCategory::MuscleStrainGrade3, baseline(42, 70, 90)),
    (InjuryCategory::LigamentSprainGrade1, baseline(7, 14, 21)),
    (InjuryCategory::LigamentSprainGrade2, baseline(21, 35, 42)),
    (InjuryCategory::LigamentSprainGrade3, baseline(84, 180, 270)),
    (InjuryCategory::Tendinopathy, baseline(28, 56, 90)),
    (InjuryCategory::TendonRupture, baseline(120, 180, 270)),
    (InjuryCategory::StressFracture, baseline(42, 70, 120)),
    (InjuryCategory::BoneFracture, baseline(42, 56, 84)),
    (InjuryCategory::Contusion, baseline(3, 7, 14)),
    (InjuryCategory::Concussion, baseline(7, 12, 21)),
    (InjuryCategory::Other, baseline(7, 14, 28)),
];

/// One step of the classification cascade
///
/// A rule applies when the normalized injury type contains any trigger. The
/// first refinement with a matching keyword picks the category, otherwise
/// `fallback` does.
#[derive(Debug)]
pub struct ClassificationRule {
    pub triggers: &'static [&'static str],
    pub refinements: &'static [(&'static [&'static str], InjuryCategory)],
    pub fallback: InjuryCategory,
}

const GRADE_3: &[&str] = &["grade_3", "grade3", "severe"];
const GRADE_2: &[&str] = &["grade_2", "grade2", "moderate"];

/// Evaluated top to bottom; unmatched text is [`InjuryCategory::Other`]
pub static CLASSIFICATION_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        triggers: &["strain"],
        refinements: &[
            (GRADE_3, InjuryCategory::MuscleStrainGrade3),
            (GRADE_2, InjuryCategory::MuscleStrainGrade2),
        ],
        fallback: InjuryCategory::MuscleStrainGrade1,
    },
    ClassificationRule {
        triggers: &["sprain"],
        refinements: &[
            (GRADE_3, InjuryCategory::LigamentSprainGrade3),
            (GRADE_2, InjuryCategory::LigamentSprainGrade2),
        ],
        fallback: InjuryCategory::LigamentSprainGrade1,
    },
    ClassificationRule {
        triggers: &["tendon", "tendin"],
        refinements: &[(&["rupture", "tear"], InjuryCategory::TendonRupture)],
        fallback: InjuryCategory::Tendinopathy,
    },
    ClassificationRule {
        triggers: &["fracture"],
        refinements: &[(&["stress"], InjuryCategory::StressFracture)],
        fallback: InjuryCategory::BoneFracture,
    },
    ClassificationRule {
        triggers: &["contusion", "bruise"],
        refinements: &[],
        fallback: InjuryCategory::Contusion,
    },
    ClassificationRule {
        triggers: &["concussion"],
        refinements: &[],
        fallback: InjuryCategory::Concussion,
    },
];

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// Recovery predictor
pub struct RecoveryPredictor;

impl RecoveryPredictor {
    /// Lower-case, collapse whitespace and hyphens into single underscores
    pub fn normalize(text: &str) -> String {
        text.to_lowercase()
            .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_")
    }

    pub fn classify(injury_type: &str) -> InjuryCategory {
        let normalized = Self::normalize(injury_type);

        CLASSIFICATION_RULES
            .iter()
            .find(|rule| contains_any(&normalized, rule.triggers))
            .map(|rule| {
                rule.refinements
                    .iter()
                    .find(|(keywords, _)| contains_any(&normalized, keywords))
                    .map(|(_, category)| *category)
                    .unwrap_or(rule.fallback)
            })
            .unwrap_or(InjuryCategory::Other)
    }

    pub fn baseline(category: InjuryCategory) -> RecoveryBaseline {
        RECOVERY_BASELINES
            .iter()
            .find(|(c, _)| *c == category)
            .or_else(|| RECOVERY_BASELINES.iter().find(|(c, _)| *c == InjuryCategory::Other))
            .map(|(_, b)| *b)
            .unwrap_or(baseline(7, 14, 28))
    }

    /// minor 0.8, mild 0.9, moderate 1.0, severe 1.5, catastrophic 2.0
    pub fn severity_multiplier(severity: Option<&Severity>) -> f64 {
        match severity {
            Some(Severity::Minor) => 0.8,
            Some(Severity::Mild) => 0.9,
            Some(Severity::Moderate) => 1.0,
            Some(Severity::Severe) => 1.5,
            Some(Severity::Catastrophic) => 2.0,
            _ => 1.0,
        }
    }

    /// Factor from the latest earlier injury to the same body part
    pub fn previous_injury_factor(injury: &InjuryRecord, history: &[InjuryRecord]) -> f64 {
        let body_part = Self::normalize(&injury.body_part);

        let latest_prior = history
            .iter()
            .filter(|prior| prior.id != injury.id)
            .filter(|prior| prior.injury_date < injury.injury_date)
            .filter(|prior| Self::normalize(&prior.body_part) == body_part)
            .map(|prior| prior.injury_date)
            .max();

        match latest_prior {
            None => 1.0,
            Some(date) if (injury.injury_date - date).num_days() < RECENT_REINJURY_DAYS => {
                RECENT_REINJURY_FACTOR
            }
            Some(_) => OLD_REINJURY_FACTOR,
        }
    }

    /// Prediction from already loaded inputs
    pub fn predict_for(
        injury: &InjuryRecord,
        age: Option<u32>,
        history: &[InjuryRecord],
        today: NaiveDate,
    ) -> RecoveryPrediction {
        let category = Self::classify(&injury.injury_type);
        let base = Self::baseline(category);

        let age_factor = RiskModifiers::age_modifier(age);
        let severity_factor = Self::severity_multiplier(injury.severity.as_ref());
        let previous_injury_factor = Self::previous_injury_factor(injury, history);
        let total = age_factor * severity_factor * previous_injury_factor;

        let scale = |days: u32| (days as f64 * total).trunc() as u32;
        let min_days = scale(base.min_days);
        let typical_days = scale(base.typical_days);
        let max_days = scale(base.max_days);

        debug!(
            injury_id = injury.id,
            category = category.key(),
            age_factor,
            severity_factor,
            previous_injury_factor,
            "Recovery modifiers computed"
        );

        let return_date =
            |days: u32| today.checked_add_days(Days::new(days as u64)).unwrap_or(NaiveDate::MAX);

        RecoveryPrediction {
            injury_id: injury.id,
            athlete_id: injury.athlete_id,
            injury_type: injury.injury_type.clone(),
            body_part: injury.body_part.clone(),
            category,
            min_days,
            typical_days,
            max_days,
            issued_on: today,
            expected_return_earliest: return_date(min_days),
            expected_return_typical: return_date(typical_days),
            expected_return_latest: return_date(max_days),
            modifiers: ModifierBreakdown {
                age_factor,
                severity_factor,
                previous_injury_factor,
                total,
            },
        }
    }

    /// Look up an injury and predict its recovery window
    ///
    /// Fails with `NotFound` when the injury, or the athlete it belongs to,
    /// does not exist.
    #[instrument(skip(loader))]
    pub fn predict<L>(
        loader: &L,
        injury_id: InjuryId,
        today: NaiveDate,
    ) -> Result<RecoveryPrediction>
    where
        L: TimeSeriesLoader + ?Sized,
    {
        let injury = loader
            .injury(injury_id)?
            .ok_or_else(|| RiskError::not_found("Injury", injury_id))?;

        let athlete = loader
            .athlete(injury.athlete_id)?
            .ok_or_else(|| RiskError::not_found("Athlete", injury.athlete_id))?;

        let history = loader.injury_records(athlete.id, None)?;
        let prediction = Self::predict_for(&injury, athlete.age, &history, today);

        info!(
            injury_id,
            athlete_id = injury.athlete_id,
            category = prediction.category.key(),
            typical_days = prediction.typical_days,
            "Recovery predicted"
        );

        Ok(prediction)
    }
}
