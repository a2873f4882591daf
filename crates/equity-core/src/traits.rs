use crate::{
    AnalystError, CachedStatements, CompanyProfile, FinancialRecord, RankedResult, ScoreSnapshot,
};
use async_trait::async_trait;

/// Source of annual financial statements
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch up to `years` annual records for a symbol, oldest first.
    async fn fetch_statements(
        &self,
        symbol: &str,
        years: usize,
    ) -> Result<Vec<FinancialRecord>, AnalystError>;

    async fn fetch_profile(&self, symbol: &str) -> Result<CompanyProfile, AnalystError>;
}

/// Keyed storage for fetched statements and past scores.
///
/// Injected alongside the scoring engine so the engine itself stays
/// stateless; all caching goes through an explicit store instance.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_statements(&self, symbol: &str)
        -> Result<Option<CachedStatements>, AnalystError>;

    async fn put_statements(
        &self,
        symbol: &str,
        records: &[FinancialRecord],
    ) -> Result<(), AnalystError>;

    async fn put_profile(&self, profile: &CompanyProfile) -> Result<(), AnalystError>;

    async fn save_scores(&self, result: &RankedResult) -> Result<(), AnalystError>;

    async fn latest_scores(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<ScoreSnapshot>, AnalystError>;

    async fn clear(&self) -> Result<(), AnalystError>;
}

/// Turns a ranked result into narrative text. Callers relay the returned
/// text verbatim and never branch on its contents.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn recommend(&self, result: &RankedResult) -> Result<String, AnalystError>;

    async fn strategy(
        &self,
        result: &RankedResult,
        investment_amount: f64,
    ) -> Result<String, AnalystError>;
}
