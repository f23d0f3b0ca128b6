//! Time-series data access
//!
//! The engine never talks to storage directly. It asks a [`TimeSeriesLoader`]
//! for date-bounded, date-ordered record sequences and computes everything
//! from those. [`MemoryLoader`] serves a JSON [`Dataset`];
//! [`SqliteLoader`](crate::database::SqliteLoader) serves a SQLite file.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{LoaderError, Result};
use crate::load_metrics::KinexonSession;
use crate::models::{
    AthleteId, AthleteProfile, DailyLoadSample, DateRange, InjuryId, InjuryRecord,
    LifestyleSample, TreatmentRecord,
};

/// Read-only query contract consumed by the engine
///
/// Implementations return records ordered by date. All queries that belong to
/// one assessment go through [`snapshot`](TimeSeriesLoader::snapshot);
/// backends that can observe concurrent writes should override it to read
/// from one consistent snapshot.
pub trait TimeSeriesLoader {
    fn load_samples(
        &self,
        athlete_id: AthleteId,
        range: DateRange,
    ) -> std::result::Result<Vec<DailyLoadSample>, LoaderError>;

    fn treatments(
        &self,
        athlete_id: AthleteId,
        range: DateRange,
    ) -> std::result::Result<Vec<TreatmentRecord>, LoaderError>;

    fn lifestyle_samples(
        &self,
        athlete_id: AthleteId,
        range: DateRange,
    ) -> std::result::Result<Vec<LifestyleSample>, LoaderError>;

    /// Injuries by injury date; `None` returns the full history
    fn injury_records(
        &self,
        athlete_id: AthleteId,
        range: Option<DateRange>,
    ) -> std::result::Result<Vec<InjuryRecord>, LoaderError>;

    fn athlete(&self, athlete_id: AthleteId)
        -> std::result::Result<Option<AthleteProfile>, LoaderError>;

    fn injury(&self, injury_id: InjuryId)
        -> std::result::Result<Option<InjuryRecord>, LoaderError>;

    fn athlete_ids(&self) -> std::result::Result<Vec<AthleteId>, LoaderError>;

    fn athlete_age(&self, athlete_id: AthleteId) -> std::result::Result<Option<u32>, LoaderError> {
        Ok(self.athlete(athlete_id)?.and_then(|a| a.age))
    }

    /// Everything one assessment needs, read together
    fn snapshot(
        &self,
        athlete_id: AthleteId,
        range: DateRange,
    ) -> std::result::Result<AthleteWindow, LoaderError> {
        Ok(AthleteWindow {
            athlete_id,
            range,
            age: self.athlete_age(athlete_id)?,
            loads: self.load_samples(athlete_id, range)?,
            treatments: self.treatments(athlete_id, range)?,
            lifestyle: self.lifestyle_samples(athlete_id, range)?,
            injuries: self.injury_records(athlete_id, Some(range))?,
        })
    }
}

/// Records for one athlete over one date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteWindow {
    pub athlete_id: AthleteId,
    pub range: DateRange,
    pub age: Option<u32>,
    pub loads: Vec<DailyLoadSample>,
    pub treatments: Vec<TreatmentRecord>,
    pub lifestyle: Vec<LifestyleSample>,
    pub injuries: Vec<InjuryRecord>,
}

/// Telemetry for one day, converted into a load sample on indexing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryDay {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub session: KinexonSession,
}

/// Full history of one athlete as stored in a dataset file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteHistory {
    #[serde(flatten)]
    pub profile: AthleteProfile,

    #[serde(default)]
    pub training_loads: Vec<DailyLoadSample>,

    #[serde(default)]
    pub telemetry: Vec<TelemetryDay>,

    #[serde(default)]
    pub treatments: Vec<TreatmentRecord>,

    #[serde(default)]
    pub lifestyle_logs: Vec<LifestyleSample>,

    #[serde(default)]
    pub injuries: Vec<InjuryRecord>,
}

impl AthleteHistory {
    pub fn new(profile: AthleteProfile) -> Self {
        AthleteHistory {
            profile,
            training_loads: Vec::new(),
            telemetry: Vec::new(),
            treatments: Vec::new(),
            lifestyle_logs: Vec::new(),
            injuries: Vec::new(),
        }
    }
}

/// Serialized collection of athlete histories
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub athletes: Vec<AthleteHistory>,
}

impl Dataset {
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let dataset: Dataset = serde_json::from_str(&content)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            athletes = dataset.athletes.len(),
            "Dataset loaded"
        );
        Ok(dataset)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path.as_ref(), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// In-memory loader over a [`Dataset`]
///
/// Immutable once built, so it can be shared across threads for parallel
/// team assessments.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    athletes: BTreeMap<AthleteId, AthleteHistory>,
}

impl MemoryLoader {
    /// Index a dataset: telemetry days become load samples, injury records
    /// take their owner's id, and every sequence is sorted by date.
    pub fn new(dataset: Dataset) -> Self {
        let mut athletes = BTreeMap::new();

        for mut history in dataset.athletes {
            let derived: Vec<DailyLoadSample> = history
                .telemetry
                .drain(..)
                .map(|day| DailyLoadSample::new(day.date, day.session.training_load()))
                .collect();
            history.training_loads.extend(derived);

            let owner = history.profile.id;
            history.injuries.iter_mut().for_each(|i| i.athlete_id = owner);

            history.training_loads.sort_by_key(|s| s.date);
            history.treatments.sort_by_key(|t| t.date);
            history.lifestyle_logs.sort_by_key(|l| l.date);
            history.injuries.sort_by_key(|i| i.injury_date);

            athletes.insert(owner, history);
        }

        MemoryLoader { athletes }
    }

    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(Dataset::load_json(path)?))
    }

    pub fn len(&self) -> usize {
        self.athletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.athletes.is_empty()
    }

    fn history(&self, athlete_id: AthleteId) -> Option<&AthleteHistory> {
        self.athletes.get(&athlete_id)
    }
}

impl From<Dataset> for MemoryLoader {
    fn from(dataset: Dataset) -> Self {
        MemoryLoader::new(dataset)
    }
}

fn in_range<T: Clone>(
    records: Option<&Vec<T>>,
    range: DateRange,
    date: impl Fn(&T) -> NaiveDate,
) -> Vec<T> {
    records
        .map(|records| {
            records
                .iter()
                .filter(|r| range.contains(date(r)))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

impl TimeSeriesLoader for MemoryLoader {
    fn load_samples(
        &self,
        athlete_id: AthleteId,
        range: DateRange,
    ) -> std::result::Result<Vec<DailyLoadSample>, LoaderError> {
        Ok(in_range(
            self.history(athlete_id).map(|h| &h.training_loads),
            range,
            |s| s.date,
        ))
    }

    fn treatments(
        &self,
        athlete_id: AthleteId,
        range: DateRange,
    ) -> std::result::Result<Vec<TreatmentRecord>, LoaderError> {
        Ok(in_range(
            self.history(athlete_id).map(|h| &h.treatments),
            range,
            |t| t.date,
        ))
    }

    fn lifestyle_samples(
        &self,
        athlete_id: AthleteId,
        range: DateRange,
    ) -> std::result::Result<Vec<LifestyleSample>, LoaderError> {
        Ok(in_range(
            self.history(athlete_id).map(|h| &h.lifestyle_logs),
            range,
            |l| l.date,
        ))
    }

    fn injury_records(
        &self,
        athlete_id: AthleteId,
        range: Option<DateRange>,
    ) -> std::result::Result<Vec<InjuryRecord>, LoaderError> {
        let injuries = self.history(athlete_id).map(|h| &h.injuries);
        Ok(match range {
            Some(range) => in_range(injuries, range, |i| i.injury_date),
            None => injuries.cloned().unwrap_or_default(),
        })
    }

    fn athlete(
        &self,
        athlete_id: AthleteId,
    ) -> std::result::Result<Option<AthleteProfile>, LoaderError> {
        Ok(self.history(athlete_id).map(|h| h.profile.clone()))
    }

    fn injury(
        &self,
        injury_id: InjuryId,
    ) -> std::result::Result<Option<InjuryRecord>, LoaderError> {
        Ok(self
            .athletes
            .values()
            .flat_map(|h| h.injuries.iter())
            .find(|i| i.id == injury_id)
            .cloned())
    }

    fn athlete_ids(&self) -> std::result::Result<Vec<AthleteId>, LoaderError> {
        Ok(self.athletes.keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_dataset() -> Dataset {
        let mut history = AthleteHistory::new(AthleteProfile {
            id: 7,
            name: "Test Athlete".to_string(),
            age: Some(27),
            position: None,
            team: None,
        });
        history.training_loads = vec![
            DailyLoadSample::new(date(2024, 3, 3), 300.0),
            DailyLoadSample::new(date(2024, 3, 1), 250.0),
        ];
        history.telemetry = vec![TelemetryDay {
            date: date(2024, 3, 2),
            session: KinexonSession {
                distance_miles: 5.0,
                accumulated_accel_load: 100.0,
                average_speed_mph: Some(4.0),
                max_speed_mph: Some(15.0),
            },
        }];
        history.injuries = vec![InjuryRecord {
            id: 11,
            athlete_id: 0,
            injury_date: date(2024, 1, 15),
            injury_type: "Ankle Sprain".to_string(),
            body_part: "ankle".to_string(),
            severity: None,
            recovery_date: None,
        }];

        Dataset {
            athletes: vec![history],
        }
    }

    #[test]
    fn test_memory_loader_orders_and_derives_loads() {
        let loader = MemoryLoader::new(sample_dataset());
        let range = DateRange::new(date(2024, 3, 1), date(2024, 3, 31));

        let loads = loader.load_samples(7, range).unwrap();
        let values: Vec<f64> = loads.iter().map(|s| s.training_load).collect();
        assert_eq!(values, vec![250.0, 1000.0, 300.0]);

        let narrow = DateRange::new(date(2024, 3, 2), date(2024, 3, 2));
        assert_eq!(loader.load_samples(7, narrow).unwrap().len(), 1);
    }

    #[test]
    fn test_memory_loader_lookups() {
        let loader = MemoryLoader::new(sample_dataset());

        let injury = loader.injury(11).unwrap().unwrap();
        assert_eq!(injury.athlete_id, 7);
        assert!(loader.injury(99).unwrap().is_none());

        assert_eq!(loader.athlete_age(7).unwrap(), Some(27));
        assert_eq!(loader.athlete_age(8).unwrap(), None);
        assert_eq!(loader.athlete_ids().unwrap(), vec![7]);

        // Unknown athletes have empty histories rather than errors
        let range = DateRange::new(date(2024, 1, 1), date(2024, 12, 31));
        assert!(loader.load_samples(8, range).unwrap().is_empty());
        assert_eq!(loader.injury_records(7, None).unwrap().len(), 1);
        assert!(loader
            .injury_records(7, Some(DateRange::new(date(2024, 2, 1), date(2024, 2, 28))))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_snapshot_collects_window() {
        let loader = MemoryLoader::new(sample_dataset());
        let range = DateRange::new(date(2024, 1, 1), date(2024, 3, 2));

        let window = loader.snapshot(7, range).unwrap();
        assert_eq!(window.age, Some(27));
        assert_eq!(window.loads.len(), 2);
        assert_eq!(window.injuries.len(), 1);
        assert!(window.lifestyle.is_empty());
    }

    #[test]
    fn test_dataset_json_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dataset.json");

        sample_dataset().save_json(&path).unwrap();
        let loader = MemoryLoader::from_json(&path).unwrap();
        assert_eq!(loader.len(), 1);
        assert!(loader.athlete(7).unwrap().is_some());
    }
}
