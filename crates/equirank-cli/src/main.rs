//! equirank: rank stock symbols by revenue growth and operating-margin quality.
//!
//! Usage:
//!   equirank rank --symbols AAPL,MSFT,GOOGL
//!   equirank rank --symbols AAPL,MSFT --refresh --years 5
//!   equirank rank --symbols AAPL,MSFT,GOOGL --narrative --strategy 100000
//!   equirank history AAPL --limit 10
//!   equirank clear
//!
//! Fetched statements are cached in SQLite (--db, default equirank.db) and
//! refetched once they are older than STATEMENT_TTL_HOURS (default 24).

use claude_client::ClaudeClient;
use equity_core::{RankedResult, ScoreSnapshot, Store};
use rank_orchestrator::RankOrchestrator;
use statement_store::StatementStore;
use std::sync::Arc;
use yahoo_client::YahooClient;

const DEFAULT_DB: &str = "equirank.db";
const DEFAULT_HISTORY_LIMIT: usize = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "equirank=info,rank_orchestrator=info,yahoo_client=warn".into()
            }),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    let db_path = args
        .iter()
        .position(|a| a == "--db")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
        .unwrap_or(DEFAULT_DB);

    match args.get(1).map(|s| s.as_str()) {
        Some("rank") => run_rank(&args, db_path).await,
        Some("history") => run_history(&args, db_path).await,
        Some("clear") => run_clear(db_path).await,
        _ => {
            print_usage();
            std::process::exit(1);
        }
    }
}

async fn run_rank(args: &[String], db_path: &str) -> anyhow::Result<()> {
    let raw: Vec<String> = match args.iter().position(|a| a == "--symbols") {
        Some(idx) => args[idx + 1..]
            .iter()
            .take_while(|a| !a.starts_with("--"))
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    let symbols = clean_symbols(&raw);
    if symbols.is_empty() {
        eprintln!("No valid symbols given");
        print_usage();
        std::process::exit(1);
    }

    let refresh = args.iter().any(|a| a == "--refresh");
    let narrative = args.iter().any(|a| a == "--narrative");

    let years: usize = args
        .iter()
        .position(|a| a == "--years")
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
        .unwrap_or(rank_orchestrator::DEFAULT_YEARS);

    let strategy_amount: Option<f64> = args
        .iter()
        .position(|a| a == "--strategy")
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok());

    tracing::info!(
        "Ranking {} symbols (years={}, refresh={}, db={})",
        symbols.len(),
        years,
        refresh,
        db_path
    );

    let store = Arc::new(StatementStore::new(&format!("sqlite:{}", db_path)).await?);
    let source = Arc::new(YahooClient::new());

    let mut orchestrator = RankOrchestrator::new(source, store).with_years(years);

    if narrative || strategy_amount.is_some() {
        let claude = ClaudeClient::from_env()?;
        orchestrator = orchestrator.with_narrator(Arc::new(claude));
    }

    let result = orchestrator.analyze(&symbols, refresh).await?;
    print!("{}", render_ranking(&result));

    if narrative {
        println!();
        println!("=== INVESTMENT RECOMMENDATION ===");
        println!();
        println!("{}", orchestrator.recommend(&result).await?);
    }

    if let Some(amount) = strategy_amount {
        println!();
        println!("=== PORTFOLIO STRATEGY ===");
        println!();
        println!("{}", orchestrator.strategy(&result, amount).await?);
    }

    Ok(())
}

async fn run_history(args: &[String], db_path: &str) -> anyhow::Result<()> {
    let raw: Vec<String> = args.get(2).cloned().into_iter().collect();
    let symbol = match clean_symbols(&raw).into_iter().next() {
        Some(symbol) => symbol,
        None => {
            eprintln!("history needs a symbol");
            print_usage();
            std::process::exit(1);
        }
    };

    let limit: usize = args
        .iter()
        .position(|a| a == "--limit")
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_HISTORY_LIMIT);

    let store = StatementStore::new(&format!("sqlite:{}", db_path)).await?;
    let snapshots = store.latest_scores(&symbol, limit).await?;

    if snapshots.is_empty() {
        println!("No score history for {}", symbol);
    } else {
        print!("{}", render_history(&symbol, &snapshots));
    }

    Ok(())
}

async fn run_clear(db_path: &str) -> anyhow::Result<()> {
    let store = StatementStore::new(&format!("sqlite:{}", db_path)).await?;
    store.clear().await?;
    println!("Cleared cached statements and score history in {}", db_path);
    Ok(())
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  equirank rank --symbols AAPL,MSFT,GOOGL  Rank symbols by fundamentals");
    eprintln!("  equirank history AAPL                    Show past scores for a symbol");
    eprintln!("  equirank clear                           Drop cached statements and history");
    eprintln!("");
    eprintln!("Options for rank:");
    eprintln!("  --refresh          Refetch statements even when freshly cached");
    eprintln!("  --years N          Annual periods to request (default 3)");
    eprintln!("  --narrative        Ask Claude for an investment recommendation");
    eprintln!("  --strategy AMOUNT  Ask Claude for a portfolio strategy for $AMOUNT");
    eprintln!("  --db PATH          SQLite database path (default: {})", DEFAULT_DB);
    eprintln!("");
    eprintln!("Options for history:");
    eprintln!("  --limit N          Number of past runs to show (default {})", DEFAULT_HISTORY_LIMIT);
}

/// Split comma-separated symbol arguments, normalize and dedup them.
/// Anything that is not 1-5 ASCII letters is dropped with a warning.
fn clean_symbols(raw: &[String]) -> Vec<String> {
    let mut symbols = Vec::new();
    for chunk in raw {
        for part in chunk.split(',') {
            let symbol = part.trim().to_uppercase();
            if symbol.is_empty() {
                continue;
            }
            if symbol.len() > 5 || !symbol.chars().all(|c| c.is_ascii_alphabetic()) {
                tracing::warn!("Skipping invalid symbol {:?}", part.trim());
                continue;
            }
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
    }
    symbols
}

fn fmt_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v * 100.0),
        None => "N/A".to_string(),
    }
}

fn render_ranking(result: &RankedResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<5} {:<7} {:>5}  {:<10} {:>7} {:>7}  {:<10} {:<13} {}\n",
        "Rank", "Symbol", "Total", "G/L/T", "CAGR", "AvgMgn", "Trend", "Quality", "Call"
    ));
    out.push_str(&format!("{}\n", "-".repeat(86)));

    for entry in &result.entries {
        let b = &entry.breakdown;
        out.push_str(&format!(
            "{:<5} {:<7} {:>5}  {:<10} {:>7} {:>7}  {:<10} {:<13} {}\n",
            entry.rank,
            b.symbol,
            b.total,
            format!(
                "{}/{}/{}",
                b.growth_points, b.margin_level_points, b.margin_trend_points
            ),
            fmt_pct(b.cagr),
            fmt_pct(b.avg_margin),
            b.margin_trend.label(),
            b.data_quality.label(),
            b.recommendation().label(),
        ));
    }

    out
}

fn render_history(symbol: &str, snapshots: &[ScoreSnapshot]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Score history for {}\n", symbol));
    out.push_str(&format!(
        "{:<17} {:>5} {:>6}  {:<10} {:>7} {:>7}  {:<10} {}\n",
        "Recorded (UTC)", "Rank", "Total", "G/L/T", "CAGR", "AvgMgn", "Trend", "Quality"
    ));
    out.push_str(&format!("{}\n", "-".repeat(80)));

    for snapshot in snapshots {
        let b = &snapshot.breakdown;
        out.push_str(&format!(
            "{:<17} {:>5} {:>6}  {:<10} {:>7} {:>7}  {:<10} {}\n",
            snapshot.recorded_at.format("%Y-%m-%d %H:%M"),
            snapshot.rank,
            b.total,
            format!(
                "{}/{}/{}",
                b.growth_points, b.margin_level_points, b.margin_trend_points
            ),
            fmt_pct(b.cagr),
            fmt_pct(b.avg_margin),
            b.margin_trend.label(),
            b.data_quality.label(),
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use equity_core::{DataQuality, RankedEntry, ScoreBreakdown, TrendDirection};

    #[test]
    fn test_clean_symbols_splits_trims_and_uppercases() {
        let raw = vec!["aapl, msft".to_string(), "GOOGL".to_string()];
        assert_eq!(clean_symbols(&raw), vec!["AAPL", "MSFT", "GOOGL"]);
    }

    #[test]
    fn test_clean_symbols_drops_invalid_entries() {
        let raw = vec!["AAPL,BRK.B,TOOLONG,42,,  ,MSFT".to_string()];
        assert_eq!(clean_symbols(&raw), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_clean_symbols_dedups_preserving_first_occurrence() {
        let raw = vec!["msft,AAPL,aapl,MSFT,nvda".to_string()];
        assert_eq!(clean_symbols(&raw), vec!["MSFT", "AAPL", "NVDA"]);
    }

    fn entry(symbol: &str, rank: u32, total: u8) -> RankedEntry {
        RankedEntry {
            rank,
            breakdown: ScoreBreakdown {
                symbol: symbol.to_string(),
                growth_points: total.min(50),
                margin_level_points: total.saturating_sub(50).min(30),
                margin_trend_points: total.saturating_sub(80),
                total,
                data_quality: DataQuality::Full,
                cagr: Some(0.225),
                avg_margin: Some(0.25),
                margin_trend: TrendDirection::Improving,
                usable_periods: 3,
            },
        }
    }

    #[test]
    fn test_render_ranking_rows_follow_entry_order() {
        let result = RankedResult {
            entries: vec![entry("AAPL", 1, 95), entry("MSFT", 2, 55)],
        };

        let table = render_ranking(&result);
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[0].starts_with("Rank"));
        assert!(lines[2].starts_with("1"));
        assert!(lines[2].contains("AAPL"));
        assert!(lines[2].contains("95"));
        assert!(lines[2].contains("STRONG BUY"));
        assert!(lines[3].contains("MSFT"));
        assert!(lines[3].contains("HOLD"));
    }

    #[test]
    fn test_render_ranking_shows_na_for_missing_metrics() {
        let mut e = entry("GHST", 1, 0);
        e.breakdown.cagr = None;
        e.breakdown.avg_margin = None;
        e.breakdown.data_quality = DataQuality::Insufficient;

        let table = render_ranking(&RankedResult { entries: vec![e] });
        assert!(table.contains("N/A"));
        assert!(table.contains("Insufficient"));
        assert!(table.contains("SELL"));
    }
}
