use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use sqlx::PgPool;

use examiner_indicators::config::{Baseline, DbConfig, ScoringConfig, DEFAULT_MIN_TASK_COUNT};
use examiner_indicators::logging::{self, LogFormat};
use examiner_indicators::models::{GroupBy, Ranking, TaskRecord};
use examiner_indicators::source::{self, Period};
use examiner_indicators::{compute_ranking, db, report};

#[derive(Parser)]
#[command(name = "examiner-indicators")]
#[command(about = "Performance indicators and rankings for medical-report examiners", long_about = None)]
struct Cli {
    /// Postgres connection string for the task store
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import task records from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Rank examiners or org units by composite score
    Rank {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        /// Also write every ranking row as CSV
        #[arg(long)]
        csv_out: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ScopeArgs {
    /// First day of the reporting period (inclusive)
    #[arg(long)]
    since: Option<NaiveDate>,
    /// Last day of the reporting period (inclusive)
    #[arg(long)]
    until: Option<NaiveDate>,
    /// Read task records from a CSV export instead of the database
    #[arg(long)]
    csv: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = GroupBy::Examiner)]
    group_by: GroupBy,
    #[arg(long, default_value_t = DEFAULT_MIN_TASK_COUNT)]
    min_tasks: usize,
    /// JSON file with scoring thresholds; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    short_seconds: Option<f64>,
    #[arg(long)]
    productivity_threshold: Option<f64>,
    #[arg(long)]
    min_short_tasks: Option<usize>,
    #[arg(long)]
    non_conformance_multiplier: Option<f64>,
    /// Use a trimmed mean for the non-conformance baseline
    #[arg(long)]
    trim_fraction: Option<f64>,
}

impl ScopeArgs {
    fn scoring_config(&self) -> anyhow::Result<ScoringConfig> {
        let mut config = match &self.config {
            Some(path) => ScoringConfig::from_json_file(path)?,
            None => ScoringConfig::default(),
        };
        if let Some(value) = self.short_seconds {
            config.short_duration_threshold_seconds = value;
        }
        if let Some(value) = self.productivity_threshold {
            config.productivity_threshold = value;
        }
        if let Some(value) = self.min_short_tasks {
            config.min_short_task_count = value;
        }
        if let Some(value) = self.non_conformance_multiplier {
            config.non_conformance_multiplier = value;
        }
        if let Some(fraction) = self.trim_fraction {
            config.baseline = Baseline::TrimmedMean { fraction };
        }
        Ok(config)
    }

    fn period(&self) -> anyhow::Result<Period> {
        Period::new(self.since, self.until)
    }
}

async fn pool(database_url: Option<&str>) -> anyhow::Result<PgPool> {
    let url = database_url
        .context("DATABASE_URL must be set to a production Postgres instance")?;
    db::connect(&DbConfig::new(url)).await
}

async fn load_records(
    database_url: Option<&str>,
    scope: &ScopeArgs,
) -> anyhow::Result<Vec<TaskRecord>> {
    let period = scope.period()?;
    match &scope.csv {
        Some(path) => source::load_csv_records(path, &period),
        None => {
            let pool = pool(database_url).await?;
            db::fetch_task_records(&pool, period.start, period.end).await
        }
    }
}

async fn rank(database_url: Option<&str>, scope: &ScopeArgs) -> anyhow::Result<Ranking> {
    let config = scope.scoring_config()?;
    let records = load_records(database_url, scope).await?;
    let ranking = compute_ranking(&records, &config, scope.group_by, scope.min_tasks)?;
    Ok(ranking)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_format)?;
    let database_url = cli.database_url.as_deref();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool(database_url).await?).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool(database_url).await?).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool(database_url).await?, &csv).await?;
            println!("Inserted {inserted} task records from {}.", csv.display());
        }
        Commands::Rank { scope, limit } => match rank(database_url, &scope).await? {
            Ranking::Empty(reason) => {
                println!("No ranking for this window: {reason}.");
            }
            Ranking::Ranked(rows) => {
                println!("Top {} by composite score:", scope_label(scope.group_by));
                for (index, row) in rows.iter().take(limit).enumerate() {
                    println!("{}", report::format_row(index + 1, row));
                }
            }
        },
        Commands::Report {
            scope,
            out,
            csv_out,
        } => {
            let ranking = rank(database_url, &scope).await?;
            let config = scope.scoring_config()?;
            let body = report::build_report(
                &ranking,
                scope.group_by,
                &scope.period()?,
                &config,
                scope.min_tasks,
            );
            std::fs::write(&out, body)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());

            if let Some(path) = csv_out {
                let file = std::fs::File::create(&path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                report::write_csv(file, &ranking, scope.group_by)?;
                println!("Ranking rows written to {}.", path.display());
            }
        }
    }

    Ok(())
}

fn scope_label(group_by: GroupBy) -> &'static str {
    match group_by {
        GroupBy::Examiner => "examiners",
        GroupBy::OrgUnit => "org units",
    }
}
