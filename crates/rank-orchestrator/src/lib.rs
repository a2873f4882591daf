use chrono::{Duration, Utc};
use equity_core::{
    AnalystError, DataSource, FinancialRecord, NarrativeGenerator, RankedResult, ScoreSnapshot,
    Store,
};
use fundamental_scoring::{CompositeRanker, GrowthScorer, MarginScorer};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Annual statements requested per symbol by default
pub const DEFAULT_YEARS: usize = 3;

const DEFAULT_TTL_HOURS: i64 = 24;

/// Wires the data source, store and scoring engine together.
///
/// Every collaborator is injected; the orchestrator owns no global state,
/// so two orchestrators with different stores never observe each other.
pub struct RankOrchestrator {
    source: Arc<dyn DataSource>,
    store: Arc<dyn Store>,
    ranker: CompositeRanker,
    narrator: Option<Arc<dyn NarrativeGenerator>>,
    ttl: Duration,
    years: usize,
}

impl RankOrchestrator {
    pub fn new(source: Arc<dyn DataSource>, store: Arc<dyn Store>) -> Self {
        let ttl_hours: i64 = std::env::var("STATEMENT_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TTL_HOURS);

        Self {
            source,
            store,
            ranker: CompositeRanker::new(),
            narrator: None,
            ttl: Duration::hours(ttl_hours),
            years: DEFAULT_YEARS,
        }
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn NarrativeGenerator>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    /// Change how many annual periods are requested and required for a
    /// full-quality score.
    pub fn with_years(mut self, years: usize) -> Self {
        self.years = years;
        self.ranker = CompositeRanker::with_config(GrowthScorer::new(), MarginScorer::new(), years);
        self
    }

    /// Gather statements for every symbol concurrently, store-first.
    ///
    /// A symbol that cannot be fetched falls back to whatever the store
    /// holds, stale included, and otherwise to an empty history. Collection
    /// never fails a run; symbols with nothing usable simply score as
    /// insufficient.
    pub async fn collect(
        &self,
        symbols: &[String],
        refresh: bool,
    ) -> HashMap<String, Vec<FinancialRecord>> {
        let mut tasks = JoinSet::new();

        for symbol in symbols {
            let source = Arc::clone(&self.source);
            let store = Arc::clone(&self.store);
            let symbol = symbol.clone();
            let years = self.years;
            let ttl = self.ttl;

            tasks.spawn(async move {
                let records = fetch_symbol(source, store, &symbol, years, ttl, refresh).await;
                (symbol, records)
            });
        }

        let mut universe = HashMap::with_capacity(symbols.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((symbol, records)) => {
                    universe.insert(symbol, records);
                }
                Err(e) => tracing::error!("Fetch task error: {}", e),
            }
        }

        universe
    }

    /// Collect, score and rank the universe, then persist the result.
    ///
    /// A failed persist is logged and swallowed: the computed ranking is
    /// still worth returning even when history cannot be written.
    pub async fn analyze(
        &self,
        symbols: &[String],
        refresh: bool,
    ) -> Result<RankedResult, AnalystError> {
        tracing::info!("Analyzing {} symbols", symbols.len());

        let universe = self.collect(symbols, refresh).await;
        let result = self.ranker.rank(&universe);

        if let Err(e) = self.store.save_scores(&result).await {
            tracing::warn!("Failed to save score history: {}", e);
        }

        Ok(result)
    }

    pub async fn recommend(&self, result: &RankedResult) -> Result<String, AnalystError> {
        match &self.narrator {
            Some(narrator) => narrator.recommend(result).await,
            None => Err(AnalystError::NarrativeError(
                "No narrative generator configured".to_string(),
            )),
        }
    }

    pub async fn strategy(
        &self,
        result: &RankedResult,
        investment_amount: f64,
    ) -> Result<String, AnalystError> {
        match &self.narrator {
            Some(narrator) => narrator.strategy(result, investment_amount).await,
            None => Err(AnalystError::NarrativeError(
                "No narrative generator configured".to_string(),
            )),
        }
    }

    pub async fn history(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<ScoreSnapshot>, AnalystError> {
        self.store.latest_scores(symbol, limit).await
    }

    pub async fn clear_store(&self) -> Result<(), AnalystError> {
        self.store.clear().await
    }
}

/// Statements for one symbol: fresh cache, then the network, then stale
/// cache, then nothing.
async fn fetch_symbol(
    source: Arc<dyn DataSource>,
    store: Arc<dyn Store>,
    symbol: &str,
    years: usize,
    ttl: Duration,
    refresh: bool,
) -> Vec<FinancialRecord> {
    if !refresh {
        match store.get_statements(symbol).await {
            Ok(Some(cached)) if Utc::now() - cached.fetched_at < ttl => {
                tracing::debug!("{}: statements served from store", symbol);
                return cached.records;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("{}: store read failed: {}", symbol, e),
        }
    }

    match source.fetch_statements(symbol, years).await {
        Ok(records) => {
            if let Err(e) = store.put_statements(symbol, &records).await {
                tracing::warn!("{}: failed to cache statements: {}", symbol, e);
            }

            // Profile is display metadata; losing it never affects scoring
            match source.fetch_profile(symbol).await {
                Ok(profile) => {
                    if let Err(e) = store.put_profile(&profile).await {
                        tracing::warn!("{}: failed to cache profile: {}", symbol, e);
                    }
                }
                Err(e) => tracing::debug!("{}: profile fetch failed: {}", symbol, e),
            }

            records
        }
        Err(e) => {
            tracing::warn!("{}: fetch failed: {}", symbol, e);
            match store.get_statements(symbol).await {
                Ok(Some(cached)) => {
                    tracing::info!("{}: falling back to stale cached statements", symbol);
                    cached.records
                }
                _ => Vec::new(),
            }
        }
    }
}
