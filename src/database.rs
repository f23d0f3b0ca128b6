//! SQLite-backed time-series loader
//!
//! Tables mirror the monitoring database: `athletes`, `training_loads`,
//! `treatments`, `lifestyle_logs` and `injury_history`, keyed by athlete and
//! date. One assessment's reads run inside a single transaction so they see
//! one consistent snapshot.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::{DatabaseError, LoaderError};
use crate::load_metrics::KinexonSession;
use crate::loader::{AthleteWindow, Dataset, TimeSeriesLoader};
use crate::models::{
    AthleteId, AthleteProfile, DailyLoadSample, DateRange, InjuryId, InjuryRecord,
    LifestyleSample, Severity, TreatmentRecord,
};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS athletes (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        age INTEGER,
        position TEXT,
        team TEXT
    );

    CREATE TABLE IF NOT EXISTS training_loads (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        athlete_id INTEGER NOT NULL REFERENCES athletes(id),
        date DATE NOT NULL,
        training_load REAL NOT NULL,

        -- Telemetry the load was derived from, if any
        distance_miles REAL,
        accumulated_accel_load REAL,
        average_speed_mph REAL,
        max_speed_mph REAL
    );

    CREATE TABLE IF NOT EXISTS treatments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        athlete_id INTEGER NOT NULL REFERENCES athletes(id),
        date DATE NOT NULL,
        modality TEXT,
        severity TEXT
    );

    CREATE TABLE IF NOT EXISTS lifestyle_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        athlete_id INTEGER NOT NULL REFERENCES athletes(id),
        date DATE NOT NULL,
        sleep_hours REAL,
        sleep_quality INTEGER,
        nutrition_score INTEGER,
        stress_level INTEGER
    );

    CREATE TABLE IF NOT EXISTS injury_history (
        id INTEGER PRIMARY KEY,
        athlete_id INTEGER NOT NULL REFERENCES athletes(id),
        injury_date DATE NOT NULL,
        injury_type TEXT NOT NULL,
        body_part TEXT NOT NULL,
        severity TEXT,
        recovery_date DATE
    );

    CREATE INDEX IF NOT EXISTS idx_training_loads_athlete_date ON training_loads(athlete_id, date);
    CREATE INDEX IF NOT EXISTS idx_treatments_athlete_date ON treatments(athlete_id, date);
    CREATE INDEX IF NOT EXISTS idx_lifestyle_logs_athlete_date ON lifestyle_logs(athlete_id, date);
    CREATE INDEX IF NOT EXISTS idx_injury_history_athlete_date ON injury_history(athlete_id, injury_date);
"#;

/// Row counts written by [`SqliteLoader::import_dataset`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub athletes: usize,
    pub training_loads: usize,
    pub treatments: usize,
    pub lifestyle_logs: usize,
    pub injuries: usize,
}

/// Loader over a SQLite database
///
/// The connection sits behind a mutex so the loader can be shared across
/// threads for team assessments.
pub struct SqliteLoader {
    conn: Mutex<Connection>,
}

impl SqliteLoader {
    /// Create or open a database at the specified path
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, DatabaseError> {
        Self::from_connection(Connection::open(db_path)?)
    }

    /// Private in-memory database
    pub fn in_memory() -> Result<Self, DatabaseError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        Self::init_schema(&conn)?;
        Ok(SqliteLoader {
            conn: Mutex::new(conn),
        })
    }

    /// Initialize database schema with tables and indexes
    fn init_schema(conn: &Connection) -> Result<(), DatabaseError> {
        // WAL lets readers see a stable snapshot while a writer appends
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        conn.execute_batch(SCHEMA).map_err(|e| DatabaseError::Schema {
            reason: e.to_string(),
        })?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    fn read(&self) -> Result<MutexGuard<'_, Connection>, LoaderError> {
        self.conn.lock().map_err(|_| LoaderError::Unavailable {
            reason: "database connection lock poisoned".to_string(),
        })
    }

    pub fn insert_athlete(&self, athlete: &AthleteProfile) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        insert_athlete(&conn, athlete)?;
        Ok(())
    }

    pub fn insert_load(
        &self,
        athlete_id: AthleteId,
        sample: &DailyLoadSample,
    ) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        insert_load(&conn, athlete_id, sample.date, sample.training_load, None)?;
        Ok(())
    }

    pub fn insert_treatment(
        &self,
        athlete_id: AthleteId,
        treatment: &TreatmentRecord,
    ) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        insert_treatment(&conn, athlete_id, treatment)?;
        Ok(())
    }

    pub fn insert_lifestyle(
        &self,
        athlete_id: AthleteId,
        sample: &LifestyleSample,
    ) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        insert_lifestyle(&conn, athlete_id, sample)?;
        Ok(())
    }

    pub fn insert_injury(&self, injury: &InjuryRecord) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        insert_injury(&conn, injury)?;
        Ok(())
    }

    /// Write a whole dataset in one transaction
    pub fn import_dataset(&self, dataset: &Dataset) -> Result<ImportStats, DatabaseError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut stats = ImportStats::default();

        for history in &dataset.athletes {
            let athlete_id = history.profile.id;
            insert_athlete(&tx, &history.profile)?;
            stats.athletes += 1;

            for sample in &history.training_loads {
                insert_load(&tx, athlete_id, sample.date, sample.training_load, None)?;
                stats.training_loads += 1;
            }
            for day in &history.telemetry {
                insert_load(
                    &tx,
                    athlete_id,
                    day.date,
                    day.session.training_load(),
                    Some(&day.session),
                )?;
                stats.training_loads += 1;
            }
            for treatment in &history.treatments {
                insert_treatment(&tx, athlete_id, treatment)?;
                stats.treatments += 1;
            }
            for sample in &history.lifestyle_logs {
                insert_lifestyle(&tx, athlete_id, sample)?;
                stats.lifestyle_logs += 1;
            }
            for injury in &history.injuries {
                insert_injury(
                    &tx,
                    &InjuryRecord {
                        athlete_id,
                        ..injury.clone()
                    },
                )?;
                stats.injuries += 1;
            }
        }

        tx.commit()?;
        tracing::info!(
            athletes = stats.athletes,
            training_loads = stats.training_loads,
            "Dataset imported into SQLite"
        );
        Ok(stats)
    }
}

fn insert_athlete(conn: &Connection, athlete: &AthleteProfile) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT OR REPLACE INTO athletes (id, name, age, position, team) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![athlete.id, athlete.name, athlete.age, athlete.position, athlete.team],
    )
}

fn insert_load(
    conn: &Connection,
    athlete_id: AthleteId,
    date: NaiveDate,
    training_load: f64,
    session: Option<&KinexonSession>,
) -> rusqlite::Result<usize> {
    conn.execute(
        r#"
        INSERT INTO training_loads (
            athlete_id, date, training_load,
            distance_miles, accumulated_accel_load, average_speed_mph, max_speed_mph
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            athlete_id,
            date,
            training_load,
            session.map(|s| s.distance_miles),
            session.map(|s| s.accumulated_accel_load),
            session.and_then(|s| s.average_speed_mph),
            session.and_then(|s| s.max_speed_mph),
        ],
    )
}

fn insert_treatment(
    conn: &Connection,
    athlete_id: AthleteId,
    treatment: &TreatmentRecord,
) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO treatments (athlete_id, date, modality, severity) VALUES (?1, ?2, ?3, ?4)",
        params![
            athlete_id,
            treatment.date,
            treatment.modality,
            treatment.severity.as_ref().map(Severity::as_str),
        ],
    )
}

fn insert_lifestyle(
    conn: &Connection,
    athlete_id: AthleteId,
    sample: &LifestyleSample,
) -> rusqlite::Result<usize> {
    conn.execute(
        r#"
        INSERT INTO lifestyle_logs (
            athlete_id, date, sleep_hours, sleep_quality, nutrition_score, stress_level
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            athlete_id,
            sample.date,
            sample.sleep_hours,
            sample.sleep_quality,
            sample.nutrition_score,
            sample.stress_level,
        ],
    )
}

fn insert_injury(conn: &Connection, injury: &InjuryRecord) -> rusqlite::Result<usize> {
    conn.execute(
        r#"
        INSERT OR REPLACE INTO injury_history (
            id, athlete_id, injury_date, injury_type, body_part, severity, recovery_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            injury.id,
            injury.athlete_id,
            injury.injury_date,
            injury.injury_type,
            injury.body_part,
            injury.severity.as_ref().map(Severity::as_str),
            injury.recovery_date,
        ],
    )
}

fn query_failed(query: &'static str) -> impl Fn(rusqlite::Error) -> LoaderError {
    move |e| match e {
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::IntegralValueOutOfRange(..)
        | rusqlite::Error::InvalidColumnType(..) => LoaderError::Malformed {
            table: query.to_string(),
            reason: e.to_string(),
        },
        _ => LoaderError::QueryFailed {
            query: query.to_string(),
            reason: e.to_string(),
        },
    }
}

fn load_samples(
    conn: &Connection,
    athlete_id: AthleteId,
    range: DateRange,
) -> Result<Vec<DailyLoadSample>, LoaderError> {
    let on_err = query_failed("training_loads");
    let mut stmt = conn
        .prepare_cached(
            "SELECT date, training_load FROM training_loads
             WHERE athlete_id = ?1 AND date BETWEEN ?2 AND ?3
             ORDER BY date, id",
        )
        .map_err(&on_err)?;

    let rows = stmt
        .query_map(params![athlete_id, range.start, range.end], |row| {
            Ok(DailyLoadSample::new(row.get(0)?, row.get(1)?))
        })
        .map_err(&on_err)?;

    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(&on_err)
}

fn treatments(
    conn: &Connection,
    athlete_id: AthleteId,
    range: DateRange,
) -> Result<Vec<TreatmentRecord>, LoaderError> {
    let on_err = query_failed("treatments");
    let mut stmt = conn
        .prepare_cached(
            "SELECT date, modality, severity FROM treatments
             WHERE athlete_id = ?1 AND date BETWEEN ?2 AND ?3
             ORDER BY date, id",
        )
        .map_err(&on_err)?;

    let rows = stmt
        .query_map(params![athlete_id, range.start, range.end], |row| {
            Ok(TreatmentRecord {
                date: row.get(0)?,
                modality: row.get(1)?,
                severity: row.get::<_, Option<String>>(2)?.map(Severity::from),
            })
        })
        .map_err(&on_err)?;

    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(&on_err)
}

fn lifestyle_samples(
    conn: &Connection,
    athlete_id: AthleteId,
    range: DateRange,
) -> Result<Vec<LifestyleSample>, LoaderError> {
    let on_err = query_failed("lifestyle_logs");
    let mut stmt = conn
        .prepare_cached(
            "SELECT date, sleep_hours, sleep_quality, nutrition_score, stress_level
             FROM lifestyle_logs
             WHERE athlete_id = ?1 AND date BETWEEN ?2 AND ?3
             ORDER BY date, id",
        )
        .map_err(&on_err)?;

    let rows = stmt
        .query_map(params![athlete_id, range.start, range.end], |row| {
            Ok(LifestyleSample {
                date: row.get(0)?,
                sleep_hours: row.get(1)?,
                sleep_quality: row.get(2)?,
                nutrition_score: row.get(3)?,
                stress_level: row.get(4)?,
            })
        })
        .map_err(&on_err)?;

    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(&on_err)
}

fn injury_from_row(row: &Row) -> rusqlite::Result<InjuryRecord> {
    Ok(InjuryRecord {
        id: row.get(0)?,
        athlete_id: row.get(1)?,
        injury_date: row.get(2)?,
        injury_type: row.get(3)?,
        body_part: row.get(4)?,
        severity: row.get::<_, Option<String>>(5)?.map(Severity::from),
        recovery_date: row.get(6)?,
    })
}

const INJURY_COLUMNS: &str =
    "id, athlete_id, injury_date, injury_type, body_part, severity, recovery_date";

fn injury_records(
    conn: &Connection,
    athlete_id: AthleteId,
    range: Option<DateRange>,
) -> Result<Vec<InjuryRecord>, LoaderError> {
    let on_err = query_failed("injury_history");

    let rows = match range {
        Some(range) => {
            let sql = format!(
                "SELECT {} FROM injury_history
                 WHERE athlete_id = ?1 AND injury_date BETWEEN ?2 AND ?3
                 ORDER BY injury_date, id",
                INJURY_COLUMNS
            );
            let mut stmt = conn.prepare_cached(&sql).map_err(&on_err)?;
            let rows = stmt
                .query_map(params![athlete_id, range.start, range.end], injury_from_row)
                .map_err(&on_err)?
                .collect::<rusqlite::Result<Vec<_>>>();
            rows
        }
        None => {
            let sql = format!(
                "SELECT {} FROM injury_history WHERE athlete_id = ?1 ORDER BY injury_date, id",
                INJURY_COLUMNS
            );
            let mut stmt = conn.prepare_cached(&sql).map_err(&on_err)?;
            let rows = stmt
                .query_map(params![athlete_id], injury_from_row)
                .map_err(&on_err)?
                .collect::<rusqlite::Result<Vec<_>>>();
            rows
        }
    };

    rows.map_err(&on_err)
}

fn athlete(
    conn: &Connection,
    athlete_id: AthleteId,
) -> Result<Option<AthleteProfile>, LoaderError> {
    conn.query_row(
        "SELECT id, name, age, position, team FROM athletes WHERE id = ?1",
        params![athlete_id],
        |row| {
            Ok(AthleteProfile {
                id: row.get(0)?,
                name: row.get(1)?,
                age: row.get(2)?,
                position: row.get(3)?,
                team: row.get(4)?,
            })
        },
    )
    .optional()
    .map_err(query_failed("athletes"))
}

impl TimeSeriesLoader for SqliteLoader {
    fn load_samples(
        &self,
        athlete_id: AthleteId,
        range: DateRange,
    ) -> Result<Vec<DailyLoadSample>, LoaderError> {
        load_samples(&*self.read()?, athlete_id, range)
    }

    fn treatments(
        &self,
        athlete_id: AthleteId,
        range: DateRange,
    ) -> Result<Vec<TreatmentRecord>, LoaderError> {
        treatments(&*self.read()?, athlete_id, range)
    }

    fn lifestyle_samples(
        &self,
        athlete_id: AthleteId,
        range: DateRange,
    ) -> Result<Vec<LifestyleSample>, LoaderError> {
        lifestyle_samples(&*self.read()?, athlete_id, range)
    }

    fn injury_records(
        &self,
        athlete_id: AthleteId,
        range: Option<DateRange>,
    ) -> Result<Vec<InjuryRecord>, LoaderError> {
        injury_records(&*self.read()?, athlete_id, range)
    }

    fn athlete(&self, athlete_id: AthleteId) -> Result<Option<AthleteProfile>, LoaderError> {
        athlete(&*self.read()?, athlete_id)
    }

    fn injury(&self, injury_id: InjuryId) -> Result<Option<InjuryRecord>, LoaderError> {
        let conn = self.read()?;
        let sql = format!("SELECT {} FROM injury_history WHERE id = ?1", INJURY_COLUMNS);
        conn.query_row(&sql, params![injury_id], injury_from_row)
            .optional()
            .map_err(query_failed("injury_history"))
    }

    fn athlete_ids(&self) -> Result<Vec<AthleteId>, LoaderError> {
        let on_err = query_failed("athletes");
        let conn = self.read()?;
        let mut stmt = conn
            .prepare_cached("SELECT id FROM athletes ORDER BY id")
            .map_err(&on_err)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(&on_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(&on_err)
    }

    fn snapshot(
        &self,
        athlete_id: AthleteId,
        range: DateRange,
    ) -> Result<AthleteWindow, LoaderError> {
        let mut conn = self.read()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Deferred)
            .map_err(query_failed("snapshot"))?;

        let window = AthleteWindow {
            athlete_id,
            range,
            age: athlete(&tx, athlete_id)?.and_then(|a| a.age),
            loads: load_samples(&tx, athlete_id, range)?,
            treatments: treatments(&tx, athlete_id, range)?,
            lifestyle: lifestyle_samples(&tx, athlete_id, range)?,
            injuries: injury_records(&tx, athlete_id, Some(range))?,
        };

        tx.commit().map_err(query_failed("snapshot"))?;
        Ok(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{AthleteHistory, MemoryLoader, TelemetryDay};
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn profile(id: AthleteId) -> AthleteProfile {
        AthleteProfile {
            id,
            name: format!("Athlete {}", id),
            age: Some(30),
            position: Some("Guard".to_string()),
            team: None,
        }
    }

    fn dataset() -> Dataset {
        let mut history = AthleteHistory::new(profile(1));
        history.training_loads = vec![
            DailyLoadSample::new(date(2024, 3, 2), 320.0),
            DailyLoadSample::new(date(2024, 3, 1), 300.0),
        ];
        history.telemetry = vec![TelemetryDay {
            date: date(2024, 3, 3),
            session: KinexonSession {
                distance_miles: 5.0,
                accumulated_accel_load: 100.0,
                average_speed_mph: Some(4.0),
                max_speed_mph: Some(15.0),
            },
        }];
        history.treatments = vec![TreatmentRecord {
            date: date(2024, 3, 2),
            modality: Some("ice bath".to_string()),
            severity: Some(Severity::Moderate),
        }];
        history.lifestyle_logs = vec![LifestyleSample {
            date: date(2024, 3, 2),
            sleep_hours: Some(7.5),
            stress_level: Some(4),
            ..LifestyleSample::default()
        }];
        history.injuries = vec![InjuryRecord {
            id: 10,
            athlete_id: 1,
            injury_date: date(2024, 2, 20),
            injury_type: "Grade 1 Calf Strain".to_string(),
            body_part: "calf".to_string(),
            severity: Some(Severity::Minor),
            recovery_date: Some(date(2024, 3, 1)),
        }];

        Dataset {
            athletes: vec![history, AthleteHistory::new(profile(2))],
        }
    }

    #[test]
    fn test_import_and_query() {
        let loader = SqliteLoader::in_memory().unwrap();
        let stats = loader.import_dataset(&dataset()).unwrap();
        assert_eq!(stats.athletes, 2);
        assert_eq!(stats.training_loads, 3);
        assert_eq!(stats.injuries, 1);

        let range = DateRange::new(date(2024, 3, 1), date(2024, 3, 31));
        let loads: Vec<f64> = loader
            .load_samples(1, range)
            .unwrap()
            .iter()
            .map(|s| s.training_load)
            .collect();
        assert_eq!(loads, vec![300.0, 320.0, 1000.0]);

        let treatments = loader.treatments(1, range).unwrap();
        assert_eq!(treatments[0].severity, Some(Severity::Moderate));

        let injury = loader.injury(10).unwrap().unwrap();
        assert_eq!(injury.body_part, "calf");
        assert_eq!(injury.recovery_date, Some(date(2024, 3, 1)));
        assert!(loader.injury(11).unwrap().is_none());

        assert_eq!(loader.athlete_ids().unwrap(), vec![1, 2]);
        assert_eq!(loader.athlete_age(1).unwrap(), Some(30));
    }

    #[test]
    fn test_snapshot_matches_memory_loader() {
        let sqlite = SqliteLoader::in_memory().unwrap();
        sqlite.import_dataset(&dataset()).unwrap();
        let memory = MemoryLoader::new(dataset());

        let range = DateRange::new(date(2024, 1, 1), date(2024, 3, 31));
        assert_eq!(sqlite.snapshot(1, range).unwrap(), memory.snapshot(1, range).unwrap());
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("monitoring.db");

        {
            let loader = SqliteLoader::open(&path).unwrap();
            loader.insert_athlete(&profile(5)).unwrap();
            loader
                .insert_load(5, &DailyLoadSample::new(date(2024, 4, 1), 410.0))
                .unwrap();
        }

        let reopened = SqliteLoader::open(&path).unwrap();
        let range = DateRange::new(date(2024, 4, 1), date(2024, 4, 1));
        assert_eq!(reopened.load_samples(5, range).unwrap().len(), 1);
        assert!(reopened.athlete(5).unwrap().is_some());
    }

    #[test]
    fn test_unknown_severity_round_trips() {
        let loader = SqliteLoader::in_memory().unwrap();
        loader.insert_athlete(&profile(1)).unwrap();
        loader
            .insert_injury(&InjuryRecord {
                id: 1,
                athlete_id: 1,
                injury_date: date(2024, 1, 1),
                injury_type: "Shoulder dislocation".to_string(),
                body_part: "shoulder".to_string(),
                severity: Some(Severity::Other("Grade IV".to_string())),
                recovery_date: None,
            })
            .unwrap();

        let injuries = loader.injury_records(1, None).unwrap();
        assert_eq!(
            injuries[0].severity,
            Some(Severity::Other("Grade IV".to_string()))
        );
    }
}
