use anyhow::Context;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::config::DbConfig;
use crate::models::{OrgUnit, TaskRecord};
use crate::source::{Period, TaskCsvRow};

pub async fn connect(config: &DbConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let examiners = vec![
        ("PM-0412", "Helena Duarte", "South", "Porto Alegre"),
        ("PM-0977", "Rafael Menezes", "South", "Curitiba"),
        ("PM-1530", "Carla Nogueira", "Northeast", "Recife"),
    ];

    for (id, name, region, sub_region) in &examiners {
        upsert_examiner(pool, id, name, region, sub_region).await?;
    }

    let day = NaiveDate::from_ymd_opt(2026, 2, 2).context("invalid date")?;
    let shift_start = day.and_hms_opt(8, 0, 0).context("invalid time")?;

    // Each examiner gets a morning of back-to-back analyses with their own pace.
    let profiles: [(&str, i64, usize, usize); 3] = [
        ("PM-0412", 12, 60, 4),
        ("PM-0977", 95, 55, 18),
        ("PM-1530", 240, 52, 3),
    ];

    for (examiner_id, seconds_per_task, count, nc_every) in profiles {
        let mut started_at = shift_start;
        for i in 0..count {
            let finished_at = started_at + Duration::seconds(seconds_per_task);
            insert_task(
                pool,
                examiner_id,
                &format!("{examiner_id}-{:04}", i + 1),
                Some(started_at),
                Some(finished_at),
                i % nc_every == 0,
                &format!("seed-{examiner_id}-{i}"),
            )
            .await?;
            started_at = finished_at;
        }
    }

    Ok(())
}

/// Task records whose start falls inside `[period_start, period_end]`.
/// `None` bounds mean the entire available history.
pub async fn fetch_task_records(
    pool: &PgPool,
    period_start: Option<NaiveDate>,
    period_end: Option<NaiveDate>,
) -> anyhow::Result<Vec<TaskRecord>> {
    let period = Period::new(period_start, period_end)?;
    let mut query = String::from(
        "SELECT t.examiner_id, t.protocol_id, t.started_at, t.finished_at, \
         t.non_conformant, e.region, e.sub_region \
         FROM examiner_indicators.tasks t \
         JOIN examiner_indicators.examiners e ON e.id = t.examiner_id \
         WHERE TRUE",
    );

    let lower = period.lower();
    let upper = period.upper();
    let mut param = 0;
    if lower.is_some() {
        param += 1;
        query.push_str(&format!(" AND t.started_at >= ${param}"));
    }
    if upper.is_some() {
        param += 1;
        query.push_str(&format!(" AND t.started_at < ${param}"));
    }
    query.push_str(" ORDER BY t.examiner_id, t.started_at");

    let mut rows = sqlx::query(&query);
    if let Some(value) = lower {
        rows = rows.bind(value);
    }
    if let Some(value) = upper {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut tasks = Vec::with_capacity(records.len());

    for row in records {
        tasks.push(TaskRecord {
            examiner_id: row.get("examiner_id"),
            protocol_id: row.get("protocol_id"),
            start_time: row.get("started_at"),
            end_time: row.get("finished_at"),
            non_conformant: row.get("non_conformant"),
            org_unit: OrgUnit::new(
                row.get::<String, _>("region"),
                row.get::<String, _>("sub_region"),
            ),
        });
    }

    tracing::info!(
        period = %period.label(),
        records = tasks.len(),
        "fetched task records"
    );
    Ok(tasks)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let rows = crate::source::read_csv_rows(file)?;
    let mut inserted = 0usize;

    for row in &rows {
        if import_row(pool, row).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

async fn import_row(pool: &PgPool, row: &TaskCsvRow) -> anyhow::Result<bool> {
    let name = row.examiner_name.as_deref().unwrap_or(&row.examiner_id);
    upsert_examiner(pool, &row.examiner_id, name, &row.region, &row.sub_region).await?;

    let source_key = row
        .source_key
        .clone()
        .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

    let affected = insert_task(
        pool,
        &row.examiner_id,
        &row.protocol_id,
        row.started_at,
        row.finished_at,
        row.non_conformant,
        &source_key,
    )
    .await?;

    Ok(affected > 0)
}

async fn upsert_examiner(
    pool: &PgPool,
    id: &str,
    name: &str,
    region: &str,
    sub_region: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO examiner_indicators.examiners (id, full_name, region, sub_region)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (id) DO UPDATE
        SET full_name = EXCLUDED.full_name,
            region = EXCLUDED.region,
            sub_region = EXCLUDED.sub_region
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(region)
    .bind(sub_region)
    .execute(pool)
    .await?;
    Ok(())
}

async fn insert_task(
    pool: &PgPool,
    examiner_id: &str,
    protocol_id: &str,
    started_at: Option<NaiveDateTime>,
    finished_at: Option<NaiveDateTime>,
    non_conformant: bool,
    source_key: &str,
) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO examiner_indicators.tasks
        (id, examiner_id, protocol_id, started_at, finished_at, non_conformant, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(examiner_id)
    .bind(protocol_id)
    .bind(started_at)
    .bind(finished_at)
    .bind(non_conformant)
    .bind(source_key)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
