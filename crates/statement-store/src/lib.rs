use async_trait::async_trait;
use chrono::{DateTime, Utc};
use equity_core::{
    AnalystError, CachedStatements, CompanyProfile, DataQuality, FinancialRecord, RankedResult,
    ScoreBreakdown, ScoreSnapshot, Store, TrendDirection,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// SQLite-backed store for fetched statements, company profiles and score
/// history.
#[derive(Clone)]
pub struct StatementStore {
    pool: SqlitePool,
}

fn store_err(e: sqlx::Error) -> AnalystError {
    AnalystError::StoreError(e.to_string())
}

impl StatementStore {
    /// Open (or create) the database at `database_url`, e.g.
    /// `sqlite:equirank.db` or `sqlite::memory:`.
    pub async fn new(database_url: &str) -> Result<Self, AnalystError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(store_err)?
            .create_if_missing(true);

        // Each new connection to ":memory:" opens its own database; keep the
        // pool at one connection there so every query sees the same data.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(store_err)?;

        // Enable WAL mode for concurrent writes from parallel fetch tasks
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await
            .map_err(store_err)?;

        let store = Self { pool };
        store.init_schema().await?;

        Ok(store)
    }

    /// Initialize database schema
    async fn init_schema(&self) -> Result<(), AnalystError> {
        let schema = include_str!("../../../schema.sql");

        // Execute schema (split by statement since sqlx doesn't support multiple statements)
        for statement in schema.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt)
                    .execute(&self.pool)
                    .await
                    .map_err(store_err)?;
            }
        }

        Ok(())
    }

    /// Get the database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct StatementRow {
    fiscal_year: i64,
    revenue: Option<f64>,
    operating_income: Option<f64>,
    fetched_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ScoreRow {
    symbol: String,
    rank: i64,
    total: i64,
    growth_points: i64,
    margin_level_points: i64,
    margin_trend_points: i64,
    data_quality: String,
    cagr: Option<f64>,
    avg_margin: Option<f64>,
    margin_trend: String,
    usable_periods: i64,
    recorded_at: DateTime<Utc>,
}

impl ScoreRow {
    fn into_snapshot(self) -> ScoreSnapshot {
        ScoreSnapshot {
            recorded_at: self.recorded_at,
            rank: self.rank as u32,
            breakdown: ScoreBreakdown {
                symbol: self.symbol,
                growth_points: self.growth_points as u8,
                margin_level_points: self.margin_level_points as u8,
                margin_trend_points: self.margin_trend_points as u8,
                total: self.total as u8,
                data_quality: DataQuality::from_label(&self.data_quality),
                cagr: self.cagr,
                avg_margin: self.avg_margin,
                margin_trend: TrendDirection::from_label(&self.margin_trend),
                usable_periods: self.usable_periods as usize,
            },
        }
    }
}

#[async_trait]
impl Store for StatementStore {
    async fn get_statements(
        &self,
        symbol: &str,
    ) -> Result<Option<CachedStatements>, AnalystError> {
        let rows = sqlx::query_as::<_, StatementRow>(
            r#"
            SELECT fiscal_year, revenue, operating_income, fetched_at
            FROM statements
            WHERE symbol = ?
            ORDER BY fiscal_year ASC
            "#,
        )
        .bind(symbol)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        // All rows of a symbol share a fetch time; take the earliest so the
        // freshness check stays conservative if they ever diverge.
        let fetched_at = match rows.iter().map(|r| r.fetched_at).min() {
            Some(ts) => ts,
            None => return Ok(None),
        };

        let records = rows
            .into_iter()
            .map(|r| FinancialRecord::new(r.fiscal_year as i32, r.revenue, r.operating_income))
            .collect();

        Ok(Some(CachedStatements {
            records,
            fetched_at,
        }))
    }

    async fn put_statements(
        &self,
        symbol: &str,
        records: &[FinancialRecord],
    ) -> Result<(), AnalystError> {
        let fetched_at = Utc::now();

        // Replace the symbol's rows wholesale so years dropped upstream do
        // not linger in the cache
        sqlx::query("DELETE FROM statements WHERE symbol = ?")
            .bind(symbol)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;

        for record in records {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO statements
                    (symbol, fiscal_year, revenue, operating_income, fetched_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(symbol)
            .bind(record.fiscal_year as i64)
            .bind(record.revenue)
            .bind(record.operating_income)
            .bind(fetched_at)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        }

        tracing::debug!("{}: cached {} annual statements", symbol, records.len());
        Ok(())
    }

    async fn put_profile(&self, profile: &CompanyProfile) -> Result<(), AnalystError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO companies (symbol, name, sector, updated_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&profile.symbol)
        .bind(&profile.name)
        .bind(&profile.sector)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn save_scores(&self, result: &RankedResult) -> Result<(), AnalystError> {
        let recorded_at = Utc::now();

        for entry in &result.entries {
            let b = &entry.breakdown;
            sqlx::query(
                r#"
                INSERT INTO score_history
                    (symbol, rank, total, growth_points, margin_level_points,
                     margin_trend_points, data_quality, cagr, avg_margin,
                     margin_trend, usable_periods, recorded_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&b.symbol)
            .bind(entry.rank as i64)
            .bind(b.total as i64)
            .bind(b.growth_points as i64)
            .bind(b.margin_level_points as i64)
            .bind(b.margin_trend_points as i64)
            .bind(b.data_quality.label())
            .bind(b.cagr)
            .bind(b.avg_margin)
            .bind(b.margin_trend.label())
            .bind(b.usable_periods as i64)
            .bind(recorded_at)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        }

        tracing::info!("Saved scores for {} symbols", result.entries.len());
        Ok(())
    }

    async fn latest_scores(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<ScoreSnapshot>, AnalystError> {
        let rows = sqlx::query_as::<_, ScoreRow>(
            r#"
            SELECT symbol, rank, total, growth_points, margin_level_points,
                   margin_trend_points, data_quality, cagr, avg_margin,
                   margin_trend, usable_periods, recorded_at
            FROM score_history
            WHERE symbol = ?
            ORDER BY recorded_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(symbol)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(rows.into_iter().map(ScoreRow::into_snapshot).collect())
    }

    async fn clear(&self) -> Result<(), AnalystError> {
        for table in ["statements", "companies", "score_history"] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&self.pool)
                .await
                .map_err(store_err)?;
        }

        tracing::info!("Cleared cached statements, profiles and score history");
        Ok(())
    }
}
