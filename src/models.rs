use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Athlete identifier as stored by the data source
pub type AthleteId = i64;

/// Injury record identifier
pub type InjuryId = i64;

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    /// `[end - days_back, end]`, i.e. `days_back + 1` calendar days
    pub fn lookback(end: NaiveDate, days_back: u32) -> Self {
        let start = end
            .checked_sub_days(Days::new(days_back as u64))
            .unwrap_or(NaiveDate::MIN);
        DateRange { start, end }
    }

    /// Right-closed window of exactly `days` calendar days ending at `end`
    pub fn trailing(end: NaiveDate, days: u32) -> Self {
        Self::lookback(end, days.saturating_sub(1))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Severity label attached to treatments and injuries
///
/// Parsing is case-insensitive; unrecognised labels are kept verbatim in
/// `Other` so they round-trip through datasets unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Minor,
    Mild,
    Moderate,
    Severe,
    Catastrophic,
    Other(String),
}

impl Severity {
    pub fn as_str(&self) -> &str {
        match self {
            Severity::Minor => "minor",
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
            Severity::Catastrophic => "catastrophic",
            Severity::Other(label) => label,
        }
    }
}

impl From<&str> for Severity {
    fn from(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "minor" => Severity::Minor,
            "mild" => Severity::Mild,
            "moderate" => Severity::Moderate,
            "severe" => Severity::Severe,
            "catastrophic" => Severity::Catastrophic,
            _ => Severity::Other(label.trim().to_string()),
        }
    }
}

impl From<String> for Severity {
    fn from(label: String) -> Self {
        Severity::from(label.as_str())
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        severity.as_str().to_string()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One day's scalar training load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLoadSample {
    pub date: NaiveDate,
    pub training_load: f64,
}

impl DailyLoadSample {
    pub fn new(date: NaiveDate, training_load: f64) -> Self {
        DailyLoadSample { date, training_load }
    }
}

/// Recovery treatment (massage, ice bath, physiotherapy, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentRecord {
    pub date: NaiveDate,

    /// Treatment modality, informational only
    #[serde(default)]
    pub modality: Option<String>,

    #[serde(default)]
    pub severity: Option<Severity>,
}

/// Daily lifestyle log; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifestyleSample {
    pub date: NaiveDate,

    #[serde(default)]
    pub sleep_hours: Option<f64>,

    /// 1-10 scale
    #[serde(default)]
    pub sleep_quality: Option<u8>,

    /// 1-10 scale
    #[serde(default)]
    pub nutrition_score: Option<u8>,

    /// 1-10 scale, higher is more stressed
    #[serde(default)]
    pub stress_level: Option<u8>,
}

/// Recorded injury
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjuryRecord {
    pub id: InjuryId,

    /// Filled in from the owning athlete when loaded from a dataset file
    #[serde(default)]
    pub athlete_id: AthleteId,
    pub injury_date: NaiveDate,

    /// Free text, e.g. "Grade 2 Hamstring Strain"
    pub injury_type: String,
    pub body_part: String,

    #[serde(default)]
    pub severity: Option<Severity>,

    #[serde(default)]
    pub recovery_date: Option<NaiveDate>,
}

/// Athlete identity as known to the data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteProfile {
    pub id: AthleteId,
    pub name: String,

    #[serde(default)]
    pub age: Option<u32>,

    #[serde(default)]
    pub position: Option<String>,

    #[serde(default)]
    pub team: Option<String>,
}

/// Overall risk classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" | "moderate" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            _ => Err(format!("Invalid risk level: {}", s)),
        }
    }
}

/// Complete output of one risk assessment
///
/// Every intermediate metric is kept so callers can persist or display the
/// breakdown. Optional fields are `None` when the underlying metric had too
/// few samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    pub athlete_id: AthleteId,
    pub date: NaiveDate,

    pub overall_risk_score: f64,
    pub risk_level: RiskLevel,

    /// Weighted score before modifiers are applied
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

    /// Newline-separated intervention statements
    pub recommendations: String,
}

impl RiskResult {
    /// Recommendation statements one per entry
    pub fn recommendation_lines(&self) -> Vec<&str> {
        self.recommendations.lines().collect()
    }
}

/// Recovery category keys of the evidence table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjuryCategory {
    MuscleStrainGrade1,
    MuscleStrainGrade2,
    MuscleStrainGrade3,
    LigamentSprainGrade1,
    LigamentSprainGrade2,
    LigamentSprainGrade3,
    Tendinopathy,
    TendonRupture,
    StressFracture,
    BoneFracture,
    Contusion,
    Concussion,
    Other,
}

impl InjuryCategory {
    pub fn key(&self) -> &'static str {
        match self {
            InjuryCategory::MuscleStrainGrade1 => "muscle_strain_grade1",
            InjuryCategory::MuscleStrainGrade2 => "muscle_strain_grade2",
            InjuryCategory::MuscleStrainGrade3 => "muscle_strain_grade3",
            InjuryCategory::LigamentSprainGrade1 => "ligament_sprain_grade1",
            InjuryCategory::LigamentSprainGrade2 => "ligament_sprain_grade2",
            InjuryCategory::LigamentSprainGrade3 => "ligament_sprain_grade3",
            InjuryCategory::Tendinopathy => "tendinopathy",
            InjuryCategory::TendonRupture => "tendon_rupture",
            InjuryCategory::StressFracture => "stress_fracture",
            InjuryCategory::BoneFracture => "bone_fracture",
            InjuryCategory::Contusion => "contusion",
            InjuryCategory::Concussion => "concussion",
            InjuryCategory::Other => "other",
        }
    }
}

impl fmt::Display for InjuryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Factors applied to the recovery baseline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModifierBreakdown {
    pub age_factor: f64,
    pub severity_factor: f64,
    pub previous_injury_factor: f64,
    pub total: f64,
}

/// Predicted recovery window for one injury
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryPrediction {
    pub injury_id: InjuryId,
    pub athlete_id: AthleteId,
    pub injury_type: String,
    pub body_part: String,
    pub category: InjuryCategory,

    pub min_days: u32,
    pub typical_days: u32,
    pub max_days: u32,

    /// Date the prediction was issued; return dates count from here
    pub issued_on: NaiveDate,
    pub expected_return_earliest: NaiveDate,
    pub expected_return_typical: NaiveDate,
    pub expected_return_latest: NaiveDate,

    pub modifiers: ModifierBreakdown,
}
