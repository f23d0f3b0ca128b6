use chrono::NaiveDate;
use riskrs::config::AppConfig;
use riskrs::export::{export_results, ExportFormat};
use riskrs::{
    Dataset, InjuryCategory, MemoryLoader, RecoveryPredictor, RiskEngine, RiskError, RiskLevel,
    ScenarioGenerator, SqliteLoader, TimeSeriesLoader,
};
use tempfile::tempdir;

/// Integration tests that run the demo scenarios through both loaders

#[cfg(test)]
mod integration_tests {
    use super::*;

    const LOW_RISK_OPTIMAL: i64 = 1;
    const MEDIUM_RISK_MONOTONY: i64 = 2;
    const HIGH_RISK_COMPOUND: i64 = 3;
    const RECENT_INJURY: i64 = 4;

    fn end_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn dataset() -> Dataset {
        ScenarioGenerator::new(end_date()).dataset()
    }

    fn sqlite_loader(dataset: &Dataset) -> SqliteLoader {
        let loader = SqliteLoader::in_memory().unwrap();
        loader.import_dataset(dataset).unwrap();
        loader
    }

    #[test]
    fn test_loaders_agree_on_every_scenario() {
        let dataset = dataset();
        let memory = MemoryLoader::new(dataset.clone());
        let sqlite = sqlite_loader(&dataset);
        let engine = RiskEngine::new();

        assert_eq!(memory.athlete_ids().unwrap(), sqlite.athlete_ids().unwrap());
        for id in memory.athlete_ids().unwrap() {
            let from_memory = engine.assess(&memory, id, end_date()).unwrap();
            let from_sqlite = engine.assess(&sqlite, id, end_date()).unwrap();
            assert_eq!(from_memory, from_sqlite, "athlete {}", id);
        }
    }

    #[test]
    fn test_compound_scenario_is_high_risk() {
        let loader = MemoryLoader::new(dataset());
        let engine = RiskEngine::new();

        let compound = engine.assess(&loader, HIGH_RISK_COMPOUND, end_date()).unwrap();
        let optimal = engine.assess(&loader, LOW_RISK_OPTIMAL, end_date()).unwrap();

        assert_eq!(compound.risk_level, RiskLevel::High);
        assert!(compound.acwr.unwrap() > 1.5);
        assert_eq!(compound.sleep_modifier, 1.4);
        assert_eq!(compound.stress_modifier, 1.3);
        assert_eq!(compound.injury_recency_modifier, 1.8);
        assert_eq!(compound.age_modifier, 1.2);
        assert!(compound.compound_multiplier > 2.0);
        assert!(compound.recommendation_lines()[0].starts_with("🚨"));

        assert!(compound.overall_risk_score > optimal.overall_risk_score);
        assert_eq!(optimal.compound_multiplier, 1.0);
        assert_ne!(optimal.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_monotony_scenario_has_flat_load() {
        let loader = MemoryLoader::new(dataset());
        let result = RiskEngine::new()
            .assess(&loader, MEDIUM_RISK_MONOTONY, end_date())
            .unwrap();

        // 350 ± 10 every day
        assert!(result.training_monotony.unwrap() > 2.0);
        assert!(result.training_strain.is_some());
        assert!(result.injury_history_score == 0.0);
    }

    #[test]
    fn test_team_overview_over_sqlite_file() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("team.db");
        {
            let loader = SqliteLoader::open(&db_path).unwrap();
            let stats = loader.import_dataset(&dataset()).unwrap();
            assert_eq!(stats.athletes, 5);
            assert_eq!(stats.training_loads, 5 * 56);
        }

        let loader = SqliteLoader::open(&db_path).unwrap();
        let ids = loader.athlete_ids().unwrap();
        let overview = RiskEngine::new().assess_team(&loader, &ids, end_date());

        assert_eq!(overview.total_athletes(), 5);
        assert!(overview.errors.is_empty());
        assert_eq!(
            overview.high_risk_count + overview.medium_risk_count + overview.low_risk_count,
            5
        );
        assert!(overview
            .athletes
            .windows(2)
            .all(|pair| pair[0].overall_risk_score >= pair[1].overall_risk_score));
        assert!(overview.at_level(RiskLevel::High).any(|r| r.athlete_id == HIGH_RISK_COMPOUND));
    }

    #[test]
    fn test_recovery_prediction_for_recent_injury() {
        let loader = MemoryLoader::new(dataset());
        let injury_id = RECENT_INJURY * 100 + 1;

        let prediction = RecoveryPredictor::predict(&loader, injury_id, end_date()).unwrap();

        assert_eq!(prediction.athlete_id, RECENT_INJURY);
        assert_eq!(prediction.category, InjuryCategory::MuscleStrainGrade2);
        assert_eq!(prediction.modifiers.age_factor, 1.3);
        assert_eq!(prediction.modifiers.severity_factor, 1.0);
        assert_eq!(prediction.modifiers.previous_injury_factor, 1.0);
        assert!(prediction.min_days <= prediction.typical_days);
        assert!(prediction.typical_days <= prediction.max_days);
        assert_eq!(prediction.issued_on, end_date());
        assert_eq!(
            (prediction.expected_return_typical - end_date()).num_days(),
            prediction.typical_days as i64
        );
    }

    #[test]
    fn test_recovery_for_unknown_injury() {
        let loader = sqlite_loader(&dataset());

        let err = RecoveryPredictor::predict(&loader, 9999, end_date()).unwrap_err();
        assert!(matches!(err, RiskError::NotFound { .. }));
        assert!(err.user_message().contains("9999"));
    }

    #[test]
    fn test_dataset_json_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("demo.json");
        let original = dataset();
        original.save_json(&path).unwrap();

        let reloaded = MemoryLoader::from_json(&path).unwrap();
        let direct = MemoryLoader::new(original);
        let engine = RiskEngine::new();

        assert_eq!(reloaded.len(), 5);
        for id in 1..=5 {
            assert_eq!(
                engine.assess(&reloaded, id, end_date()).unwrap(),
                engine.assess(&direct, id, end_date()).unwrap()
            );
        }
    }

    #[test]
    fn test_team_export_to_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("team.csv");
        let loader = MemoryLoader::new(dataset());
        let ids = loader.athlete_ids().unwrap();
        let overview = RiskEngine::new().assess_team(&loader, &ids, end_date());

        let format = ExportFormat::from_path(&path).unwrap();
        export_results(&overview.athletes, format, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 6);
    }

    #[test]
    fn test_engine_settings_from_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[engine.thresholds]
high = 95.0
medium = 90.0
"#,
        )
        .unwrap();

        let config = AppConfig::load_from_file(&path).unwrap();
        let engine = RiskEngine::with_config(config.engine).unwrap();
        let loader = MemoryLoader::new(dataset());

        let result = engine.assess(&loader, LOW_RISK_OPTIMAL, end_date()).unwrap();
        assert_eq!(result.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_trend_covers_requested_days() {
        let loader = MemoryLoader::new(dataset());
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let points = RiskEngine::new()
            .acwr_trend(&loader, HIGH_RISK_COMPOUND, start, end_date())
            .unwrap();

        assert_eq!(points.len(), 30);
        assert_eq!(points.last().unwrap().date, end_date());
        assert_eq!(points.last().unwrap().zone, RiskLevel::High);
    }
}
