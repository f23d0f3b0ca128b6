use anyhow::{anyhow, bail, Context, Result};
use chrono::{Days, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use riskrs::config::{AppConfig, DataSettings};
use riskrs::export::{export_results, ExportFormat};
use riskrs::logging::init_logging;
use riskrs::{
    AthleteId, Dataset, DateRange, InjuryId, LoadMetrics, MemoryLoader, RecoveryPredictor,
    RiskEngine, RiskError, RiskLevel, RiskResult, ScenarioGenerator, SqliteLoader,
    TimeSeriesLoader, TrainingSummary,
};

/// RiskRS - Athlete Injury Risk CLI
///
/// Scores injury risk from training load, recovery, lifestyle and injury
/// history, and predicts recovery windows for recorded injuries.
#[derive(Parser)]
#[command(name = "riskrs")]
#[command(author = "RiskRS Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Athlete Injury Risk CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Where athlete records are read from
#[derive(Args)]
struct SourceArgs {
    /// JSON dataset file
    #[arg(long, value_name = "FILE", conflicts_with = "db")]
    data: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess injury risk for one athlete
    Assess {
        #[command(flatten)]
        source: SourceArgs,

        /// Athlete ID
        #[arg(short, long)]
        athlete: AthleteId,

        /// Assessment date (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Assess every athlete in the data source
    Team {
        #[command(flatten)]
        source: SourceArgs,

        /// Assessment date (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Only list athletes at this level (high, medium, low)
        #[arg(short, long)]
        level: Option<RiskLevel>,

        /// Write the results to a CSV or JSON file
        #[arg(short, long, value_name = "FILE")]
        export: Option<PathBuf>,
    },

    /// Predict the recovery window of an injury
    Recovery {
        #[command(flatten)]
        source: SourceArgs,

        /// Injury ID
        #[arg(short, long)]
        injury: InjuryId,

        /// Date return dates count from (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        today: Option<NaiveDate>,
    },

    /// Show the daily ACWR trend of an athlete
    Trend {
        #[command(flatten)]
        source: SourceArgs,

        /// Athlete ID
        #[arg(short, long)]
        athlete: AthleteId,

        /// Trend length in days (default: 28)
        #[arg(long, default_value = "28", value_parser = window_days())]
        days: u32,

        /// Last day of the trend (YYYY-MM-DD, default: today)
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Summarise recent training load of an athlete
    Summary {
        #[command(flatten)]
        source: SourceArgs,

        /// Athlete ID
        #[arg(short, long)]
        athlete: AthleteId,

        /// Days to look back from the date (default: 7)
        #[arg(long, default_value = "7", value_parser = window_days())]
        days: u32,

        /// Last day of the summary (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Write the demo scenario dataset
    Demo {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Write a SQLite database instead of JSON
        #[arg(long)]
        sqlite: bool,

        /// Last day of generated data (YYYY-MM-DD, default: today)
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Manage configuration
    Config {
        /// Print the active configuration
        #[arg(long, conflicts_with = "init")]
        show: bool,

        /// Write the default configuration file
        #[arg(long)]
        init: bool,
    },
}

/// Either loader, chosen at runtime
enum Source {
    Memory(MemoryLoader),
    Sqlite(SqliteLoader),
}

impl Source {
    fn open(args: &SourceArgs, defaults: &DataSettings) -> Result<Self> {
        let (data, db) = match (&args.data, &args.db) {
            (None, None) => (defaults.dataset.as_ref(), defaults.database.as_ref()),
            (data, db) => (data.as_ref(), db.as_ref()),
        };

        if let Some(path) = data {
            let loader = MemoryLoader::from_json(path).map_err(report)?;
            tracing::debug!(path = %path.display(), athletes = loader.len(), "Dataset loaded");
            return Ok(Source::Memory(loader));
        }
        if let Some(path) = db {
            if !path.exists() {
                bail!("Database file not found: {}", path.display());
            }
            let loader = SqliteLoader::open(path).map_err(|e| report(e.into()))?;
            return Ok(Source::Sqlite(loader));
        }

        bail!("No data source given. Use --data FILE or --db FILE, or set [data] in the config file")
    }

    fn loader(&self) -> &(dyn TimeSeriesLoader + Sync) {
        match self {
            Source::Memory(loader) => loader,
            Source::Sqlite(loader) => loader,
        }
    }
}

/// Log a library error and turn it into the message shown to the user
fn report(err: RiskError) -> anyhow::Error {
    let retryable = err.is_retryable();
    if err.severity().to_tracing_level() == tracing::Level::WARN {
        tracing::warn!(error = %err, retryable, "Command failed");
    } else {
        tracing::error!(error = %err, retryable, "Command failed");
    }
    anyhow!(err.user_message())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Day counts accepted by `trend` and `summary`: one day to ten years
fn window_days() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(1..=3650)
}

/// First day of a `days`-long window ending at `end`
fn trend_start(end: NaiveDate, days: u32) -> Result<NaiveDate> {
    end.checked_sub_days(Days::new(u64::from(days).saturating_sub(1)))
        .context("trend window out of range")
}

fn colored_level(level: RiskLevel) -> ColoredString {
    let label = level.as_str().to_uppercase();
    match level {
        RiskLevel::High => label.red().bold(),
        RiskLevel::Medium => label.yellow().bold(),
        RiskLevel::Low => label.green().bold(),
    }
}

fn opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.*}", precision, v))
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

impl MetricRow {
    fn new(metric: &'static str, value: String) -> Self {
        MetricRow { metric, value }
    }
}

#[derive(Tabled)]
struct TeamRow {
    #[tabled(rename = "Athlete")]
    athlete: AthleteId,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "ACWR")]
    acwr: String,
    #[tabled(rename = "Compound")]
    compound: String,
}

#[derive(Tabled)]
struct TrendRow {
    #[tabled(rename = "Date")]
    date: NaiveDate,
    #[tabled(rename = "Acute")]
    acute: String,
    #[tabled(rename = "Chronic")]
    chronic: String,
    #[tabled(rename = "ACWR")]
    acwr: String,
    #[tabled(rename = "Zone")]
    zone: RiskLevel,
}

fn print_assessment(result: &RiskResult) {
    println!(
        "Athlete {} on {}: {} ({:.1})",
        result.athlete_id,
        result.date,
        colored_level(result.risk_level),
        result.overall_risk_score
    );

    let rows = vec![
        MetricRow::new("Base risk", format!("{:.1}", result.base_risk_score)),
        MetricRow::new("Acute load", opt(result.acute_load, 1)),
        MetricRow::new("Chronic load", opt(result.chronic_load, 1)),
        MetricRow::new("ACWR", opt(result.acwr, 2)),
        MetricRow::new("Load spike", format!("{:.1}", result.load_spike_score)),
        MetricRow::new("Recovery", format!("{:.1}", result.recovery_score)),
        MetricRow::new("Lifestyle", format!("{:.1}", result.lifestyle_score)),
        MetricRow::new(
            "Injury history",
            format!("{:.1}", result.injury_history_score),
        ),
        MetricRow::new("Monotony", opt(result.training_monotony, 2)),
        MetricRow::new("Strain", opt(result.training_strain, 0)),
        MetricRow::new("Max z-score (7d)", format!("{:.2}", result.max_z_score_7d)),
        MetricRow::new(
            "Compound multiplier",
            format!(
                "{:.2} (sleep {:.1}, stress {:.1}, injury {:.1}, age {:.1})",
                result.compound_multiplier,
                result.sleep_modifier,
                result.stress_modifier,
                result.injury_recency_modifier,
                result.age_modifier
            ),
        ),
    ];
    println!("{}", Table::new(rows).with(Style::rounded()));

    println!("{}", "Recommendations:".bold());
    for line in result.recommendation_lines() {
        println!("  {}", line);
    }
}

fn summary_rows(summary: &TrainingSummary) -> Vec<MetricRow> {
    vec![
        MetricRow::new("Sessions", summary.session_count.to_string()),
        MetricRow::new("Total load", format!("{:.1}", summary.total_load)),
        MetricRow::new("Average load", format!("{:.1}", summary.average_load)),
        MetricRow::new("Max load", format!("{:.1}", summary.max_load)),
        MetricRow::new("Min load", format!("{:.1}", summary.min_load)),
    ]
}

fn write_demo(output: &Path, sqlite: bool, end: NaiveDate) -> Result<()> {
    let dataset: Dataset = ScenarioGenerator::new(end).dataset();

    if sqlite {
        if output.exists() {
            bail!("Refusing to import into existing database: {}", output.display());
        }
        let loader = SqliteLoader::open(output).map_err(|e| report(e.into()))?;
        let stats = loader.import_dataset(&dataset).map_err(|e| report(e.into()))?;
        println!(
            "  {} athletes, {} load days, {} treatments, {} lifestyle logs, {} injuries",
            stats.athletes,
            stats.training_loads,
            stats.treatments,
            stats.lifestyle_logs,
            stats.injuries
        );
    } else {
        dataset.save_json(output).map_err(report)?;
        println!("  {} athletes", dataset.athletes.len());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load_or_default(),
    };

    let log_config = config.logging.clone().with_verbosity(cli.verbose);
    init_logging(&log_config)?;
    if cli.verbose > 0 {
        eprintln!("{}", format!("Log filter: {}", log_config.filter_directive()).dimmed());
    }

    let engine = RiskEngine::with_config(config.engine).map_err(report)?;

    // Handle commands
    match cli.command {
        Commands::Assess { source, athlete, date, json } => {
            let source = Source::open(&source, &config.data)?;
            let date = date.unwrap_or_else(today);

            let loader = source.loader();
            if loader.athlete(athlete).map_err(|e| report(e.into()))?.is_none() {
                return Err(report(RiskError::not_found("Athlete", athlete)));
            }
            let result = engine.assess(loader, athlete, date).map_err(report)?;

            if json {
                let rounded = riskrs::export::rounded(&result);
                println!("{}", serde_json::to_string_pretty(&rounded)?);
            } else {
                println!("{}", "Assessing injury risk...".green().bold());
                print_assessment(&result);
            }
        }

        Commands::Team { source, date, level, export } => {
            println!("{}", "Assessing team...".blue().bold());
            let source = Source::open(&source, &config.data)?;
            let date = date.unwrap_or_else(today);

            let loader = source.loader();
            let ids = loader.athlete_ids().map_err(|e| report(e.into()))?;
            let overview = engine.assess_team(loader, &ids, date);

            println!(
                "  {} athletes on {}: {} high, {} medium, {} low",
                overview.total_athletes(),
                overview.date,
                overview.high_risk_count.to_string().red(),
                overview.medium_risk_count.to_string().yellow(),
                overview.low_risk_count.to_string().green()
            );

            let rows: Vec<TeamRow> = overview
                .athletes
                .iter()
                .filter(|r| level.map_or(true, |l| r.risk_level == l))
                .map(|r| TeamRow {
                    athlete: r.athlete_id,
                    score: format!("{:.1}", r.overall_risk_score),
                    level: colored_level(r.risk_level).to_string(),
                    acwr: opt(r.acwr, 2),
                    compound: format!("{:.2}", r.compound_multiplier),
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::rounded()));

            for failure in &overview.errors {
                eprintln!(
                    "{}",
                    format!("  ✗ athlete {}: {}", failure.athlete_id, failure.message).red()
                );
            }

            if let Some(path) = export {
                let format = ExportFormat::from_path(&path).unwrap_or(ExportFormat::Csv);
                export_results(&overview.athletes, format, &path).map_err(report)?;
                println!("{}", format!("✓ Results written to {}", path.display()).blue());
            }
        }

        Commands::Recovery { source, injury, today: issued } => {
            println!("{}", "Predicting recovery...".cyan().bold());
            let source = Source::open(&source, &config.data)?;
            let issued = issued.unwrap_or_else(today);

            let prediction =
                RecoveryPredictor::predict(source.loader(), injury, issued).map_err(report)?;

            println!(
                "  Injury {} ({} / {}) for athlete {}: {}",
                prediction.injury_id,
                prediction.injury_type,
                prediction.body_part,
                prediction.athlete_id,
                prediction.category.to_string().bold()
            );
            println!(
                "  Recovery: {} / {} / {} days (min / typical / max)",
                prediction.min_days, prediction.typical_days, prediction.max_days
            );
            println!(
                "  Expected return: {} (earliest {}, latest {})",
                prediction.expected_return_typical.to_string().green(),
                prediction.expected_return_earliest,
                prediction.expected_return_latest
            );
            println!(
                "  Factors: age {:.1}, severity {:.1}, previous injury {:.1}, total {:.2}",
                prediction.modifiers.age_factor,
                prediction.modifiers.severity_factor,
                prediction.modifiers.previous_injury_factor,
                prediction.modifiers.total
            );
        }

        Commands::Trend { source, athlete, days, end } => {
            println!("{}", "Computing ACWR trend...".magenta().bold());
            let source = Source::open(&source, &config.data)?;
            let end = end.unwrap_or_else(today);
            let start = trend_start(end, days)?;

            let points = engine
                .acwr_trend(source.loader(), athlete, start, end)
                .map_err(report)?;
            if points.is_empty() {
                println!("  No days with enough load history between {} and {}", start, end);
            } else {
                let rows: Vec<TrendRow> = points
                    .iter()
                    .map(|p| TrendRow {
                        date: p.date,
                        acute: format!("{:.1}", p.acute_load),
                        chronic: format!("{:.1}", p.chronic_load),
                        acwr: format!("{:.2}", p.acwr),
                        zone: p.zone,
                    })
                    .collect();
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
        }

        Commands::Summary { source, athlete, days, date } => {
            println!("{}", "Summarising training load...".cyan().bold());
            let source = Source::open(&source, &config.data)?;
            let loader = source.loader();
            if loader.athlete(athlete).map_err(|e| report(e.into()))?.is_none() {
                return Err(report(RiskError::not_found("Athlete", athlete)));
            }

            let date = date.unwrap_or_else(today);
            let samples = loader
                .load_samples(athlete, DateRange::lookback(date, days))
                .map_err(|e| report(e.into()))?;
            match LoadMetrics::summary(&samples, date, days) {
                Some(summary) => {
                    println!("Athlete {}, {} days up to {}", athlete, days, date);
                    println!("{}", Table::new(summary_rows(&summary)).with(Style::rounded()));
                }
                None => println!(
                    "  No training load recorded in the {} days up to {}",
                    days, date
                ),
            }
        }

        Commands::Demo { output, sqlite, end } => {
            println!("{}", "Generating demo scenarios...".yellow().bold());
            write_demo(&output, sqlite, end.unwrap_or_else(today))?;
            println!(
                "{}",
                format!("✓ Demo data written to {}", output.display()).yellow()
            );
        }

        Commands::Config { show, init } => {
            println!("{}", "Managing configuration...".white().bold());
            if init {
                let path = match &cli.config {
                    Some(path) => {
                        AppConfig::default().save_to_file(path)?;
                        path.clone()
                    }
                    None => AppConfig::default().save_default()?,
                };
                println!(
                    "{}",
                    format!("✓ Default configuration written to {}", path.display()).white()
                );
            } else if show {
                let content = toml::to_string_pretty(&config)
                    .context("Failed to serialize configuration to TOML")?;
                println!("{}", content);
            } else {
                println!("  Config file: {}", AppConfig::default_config_path().display());
                println!("  Use --show to print it or --init to create it");
            }
        }
    }

    Ok(())
}
