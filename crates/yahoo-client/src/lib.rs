use async_trait::async_trait;
use chrono::{Duration, Utc};
use equity_core::{AnalystError, CompanyProfile, DataSource, FinancialRecord};
use reqwest::Client;
use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const TIMESERIES_URL: &str =
    "https://query2.finance.yahoo.com/ws/fundamentals-timeseries/v1/finance/timeseries";
const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";

const REVENUE_SERIES: &str = "annualTotalRevenue";
const OPERATING_INCOME_SERIES: &str = "annualOperatingIncome";

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: StdDuration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: StdDuration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests,
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Remove timestamps outside the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait for the oldest slot to fall out of the window.
            let sleep_dur = match ts.front() {
                Some(&oldest) => {
                    self.window.saturating_sub(now.duration_since(oldest))
                        + StdDuration::from_millis(50)
                }
                None => return, // limit of 0 disables rate limiting
            };
            drop(ts);
            tracing::debug!(
                "Rate limiter: waiting {:.1}s for Yahoo Finance slot",
                sleep_dur.as_secs_f64()
            );
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Yahoo Finance client for annual income-statement fundamentals.
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    rate_limiter: RateLimiter,
}

impl YahooClient {
    pub fn new() -> Self {
        // Unauthenticated endpoint; stay well under Yahoo's informal limits.
        let rate_limit: usize = std::env::var("YAHOO_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .timeout(StdDuration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            rate_limiter: RateLimiter::new(rate_limit, StdDuration::from_secs(60)),
        }
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, AnalystError> {
        let request = builder
            .build()
            .map_err(|e| AnalystError::ApiError(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| AnalystError::ApiError("Cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| AnalystError::ApiError(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            let wait_secs = 15u64;
            tracing::warn!(
                "Yahoo 429 rate limited, waiting {}s before retry {}/3",
                wait_secs,
                attempt + 1
            );
            tokio::time::sleep(StdDuration::from_secs(wait_secs)).await;
        }

        Err(AnalystError::ApiError(
            "Rate limited by Yahoo after 3 retries".to_string(),
        ))
    }

    /// Get annual revenue and operating income, oldest first, at most
    /// `years` records.
    pub async fn get_income_statements(
        &self,
        symbol: &str,
        years: usize,
    ) -> Result<Vec<FinancialRecord>, AnalystError> {
        let now = Utc::now();
        // One extra year of window so a fiscal year ending early in the
        // range is not cut off
        let start = now - Duration::days(366 * (years as i64 + 1));
        let url = format!(
            "{}/{}?symbol={}&type={},{}&period1={}&period2={}",
            TIMESERIES_URL,
            symbol,
            symbol,
            REVENUE_SERIES,
            OPERATING_INCOME_SERIES,
            start.timestamp(),
            now.timestamp()
        );

        let response = self.send_request(self.client.get(&url)).await?;
        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AnalystError::ApiError(e.to_string()))?;

        let mut records = parse_timeseries(&json, symbol)?;
        if records.len() > years {
            records = records.split_off(records.len() - years);
        }

        tracing::debug!("{}: {} annual statements from Yahoo", symbol, records.len());
        Ok(records)
    }

    /// Get company name and sector
    pub async fn get_company_profile(&self, symbol: &str) -> Result<CompanyProfile, AnalystError> {
        let url = format!(
            "{}/{}?modules=assetProfile,price",
            QUOTE_SUMMARY_URL, symbol
        );

        let response = self.send_request(self.client.get(&url)).await?;
        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AnalystError::ApiError(e.to_string()))?;

        parse_profile(&json, symbol)
    }
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataSource for YahooClient {
    async fn fetch_statements(
        &self,
        symbol: &str,
        years: usize,
    ) -> Result<Vec<FinancialRecord>, AnalystError> {
        self.get_income_statements(symbol, years).await
    }

    async fn fetch_profile(&self, symbol: &str) -> Result<CompanyProfile, AnalystError> {
        self.get_company_profile(symbol).await
    }
}

fn fiscal_year_of(as_of_date: &str) -> Option<i32> {
    as_of_date.get(..4).and_then(|y| y.parse().ok())
}

/// Merge the revenue and operating-income series by fiscal year. Rows may
/// be null and either series may be missing years; anything absent stays
/// `None` rather than becoming zero.
fn parse_timeseries(
    json: &serde_json::Value,
    symbol: &str,
) -> Result<Vec<FinancialRecord>, AnalystError> {
    if let Some(error) = json
        .get("timeseries")
        .and_then(|v| v.get("error"))
        .filter(|v| !v.is_null())
    {
        let description = error
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error");
        return Err(AnalystError::ApiError(format!(
            "Yahoo timeseries error for {}: {}",
            symbol, description
        )));
    }

    let results = json
        .get("timeseries")
        .and_then(|v| v.get("result"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| {
            AnalystError::ApiError(format!("No timeseries data for {}", symbol))
        })?;

    let mut by_year: BTreeMap<i32, FinancialRecord> = BTreeMap::new();

    for series in results {
        let kind = series
            .get("meta")
            .and_then(|m| m.get("type"))
            .and_then(|t| t.as_array())
            .and_then(|arr| arr.first())
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        let rows = match series.get(kind).and_then(|v| v.as_array()) {
            Some(rows) => rows,
            None => continue,
        };

        for row in rows {
            let year = match row
                .get("asOfDate")
                .and_then(|v| v.as_str())
                .and_then(fiscal_year_of)
            {
                Some(year) => year,
                None => continue,
            };

            let value = row
                .get("reportedValue")
                .and_then(|v| v.get("raw"))
                .and_then(|v| v.as_f64());

            let record = by_year
                .entry(year)
                .or_insert_with(|| FinancialRecord::new(year, None, None));
            match kind {
                REVENUE_SERIES => record.revenue = value,
                OPERATING_INCOME_SERIES => record.operating_income = value,
                _ => {}
            }
        }
    }

    // BTreeMap iteration is ascending by year: oldest first
    Ok(by_year.into_values().collect())
}

fn parse_profile(json: &serde_json::Value, symbol: &str) -> Result<CompanyProfile, AnalystError> {
    let result = json
        .get("quoteSummary")
        .and_then(|v| v.get("result"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| AnalystError::InvalidSymbol(symbol.to_string()))?;

    let name = result
        .get("price")
        .and_then(|v| v.get("longName"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let sector = result
        .get("assetProfile")
        .and_then(|v| v.get("sector"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    Ok(CompanyProfile {
        symbol: symbol.to_string(),
        name,
        sector,
    })
}
