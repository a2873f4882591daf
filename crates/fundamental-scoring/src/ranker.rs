use crate::growth::GrowthScorer;
use crate::margin::MarginScorer;
use equity_core::{DataQuality, FinancialRecord, RankedEntry, RankedResult, ScoreBreakdown};
use rayon::prelude::*;
use std::collections::HashMap;

/// Target number of annual periods for a full-quality score
pub const DEFAULT_TARGET_PERIODS: usize = 3;

/// Widest fiscal-year spread a record sequence may cover before the year
/// slots fall back to sequence positions
const MAX_YEAR_SPAN: usize = 100;

/// Scores every symbol independently and produces a strict total ordering
/// with dense, unique, 1-based ranks.
#[derive(Debug, Clone)]
pub struct CompositeRanker {
    growth: GrowthScorer,
    margin: MarginScorer,
    target_periods: usize,
}

impl CompositeRanker {
    pub fn new() -> Self {
        Self {
            growth: GrowthScorer::new(),
            margin: MarginScorer::new(),
            target_periods: DEFAULT_TARGET_PERIODS,
        }
    }

    pub fn with_config(growth: GrowthScorer, margin: MarginScorer, target_periods: usize) -> Self {
        Self {
            growth,
            margin,
            target_periods,
        }
    }

    /// Scores and ranks the whole universe. Records are expected oldest
    /// first. Pure and deterministic: equal input maps produce identical
    /// results regardless of iteration order, and one symbol's bad data can
    /// only ever affect that symbol's own score.
    ///
    /// Ties on total break by growth points, then margin level points, then
    /// symbol, so two symbols never share a rank.
    pub fn rank(&self, universe: &HashMap<String, Vec<FinancialRecord>>) -> RankedResult {
        let mut breakdowns: Vec<ScoreBreakdown> = universe
            .par_iter()
            .map(|(symbol, records)| self.score_symbol(symbol, records))
            .collect();

        breakdowns.sort_by(|a, b| {
            b.total
                .cmp(&a.total)
                .then(b.growth_points.cmp(&a.growth_points))
                .then(b.margin_level_points.cmp(&a.margin_level_points))
                .then(a.symbol.cmp(&b.symbol))
        });

        let entries = breakdowns
            .into_iter()
            .enumerate()
            .map(|(i, breakdown)| RankedEntry {
                rank: i as u32 + 1,
                breakdown,
            })
            .collect();

        RankedResult { entries }
    }

    /// Scores one symbol. A usable period is a record with a defined margin
    /// (positive revenue, reported operating income); zero usable periods
    /// reads as insufficient data and forces the whole breakdown to zero.
    pub fn score_symbol(&self, symbol: &str, records: &[FinancialRecord]) -> ScoreBreakdown {
        let usable_periods = records
            .iter()
            .filter(|r| r.operating_margin().is_some())
            .count();

        if usable_periods == 0 {
            return ScoreBreakdown::insufficient(symbol);
        }

        let data_quality = if usable_periods >= self.target_periods {
            DataQuality::Full
        } else {
            DataQuality::Partial
        };

        let growth = self.growth.score(&year_slots(records));
        let margin = self.margin.score(records);
        let total = growth.points + margin.level_points + margin.trend_points;

        ScoreBreakdown {
            symbol: symbol.to_string(),
            growth_points: growth.points,
            margin_level_points: margin.level_points,
            margin_trend_points: margin.trend_points,
            total,
            data_quality,
            cagr: growth.cagr,
            avg_margin: margin.avg_margin,
            margin_trend: margin.trend.direction,
            usable_periods,
        }
    }
}

impl Default for CompositeRanker {
    fn default() -> Self {
        Self::new()
    }
}

/// Expands records into one revenue slot per consecutive fiscal year so the
/// growth span reflects calendar distance even when interior years are
/// absent. A later duplicate of a year overwrites an earlier one.
fn year_slots(records: &[FinancialRecord]) -> Vec<Option<f64>> {
    let min_year = records.iter().map(|r| r.fiscal_year).min();
    let max_year = records.iter().map(|r| r.fiscal_year).max();
    let (min_year, max_year) = match (min_year, max_year) {
        (Some(min), Some(max)) => (min, max),
        _ => return Vec::new(),
    };

    let span = max_year.abs_diff(min_year) as usize;
    if span > MAX_YEAR_SPAN {
        // Years this far apart are garbage labels; fall back to positions
        return records.iter().map(|r| r.revenue).collect();
    }

    let mut slots = vec![None; span + 1];
    for record in records {
        slots[(record.fiscal_year - min_year) as usize] = record.revenue;
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fiscal_year: i32, revenue: f64, operating_income: f64) -> FinancialRecord {
        FinancialRecord::new(fiscal_year, Some(revenue), Some(operating_income))
    }

    /// Three clean years: 22.5% CAGR, 12.33% average margin, improving
    fn strong_records() -> Vec<FinancialRecord> {
        vec![
            record(2021, 100.0, 10.0),
            record(2022, 120.0, 14.4),
            record(2023, 150.0, 22.5),
        ]
    }

    #[test]
    fn test_total_is_sum_of_components() {
        let ranker = CompositeRanker::new();
        let breakdown = ranker.score_symbol("AAPL", &strong_records());

        assert_eq!(
            breakdown.total,
            breakdown.growth_points + breakdown.margin_level_points + breakdown.margin_trend_points
        );
        assert_eq!(breakdown.data_quality, DataQuality::Full);
        assert_eq!(breakdown.usable_periods, 3);
        assert!(breakdown.growth_points <= 50);
        assert!(breakdown.margin_level_points <= 30);
        assert!(breakdown.margin_trend_points <= 20);
    }

    #[test]
    fn test_rank_is_deterministic() {
        let ranker = CompositeRanker::new();
        let mut universe = HashMap::new();
        universe.insert("AAA".to_string(), strong_records());
        universe.insert("BBB".to_string(), vec![record(2023, 100.0, 5.0)]);
        universe.insert("CCC".to_string(), Vec::new());

        assert_eq!(ranker.rank(&universe), ranker.rank(&universe));
    }

    #[test]
    fn test_rank_ignores_insertion_order() {
        let ranker = CompositeRanker::new();

        let mut forward = HashMap::new();
        forward.insert("AAA".to_string(), strong_records());
        forward.insert("BBB".to_string(), vec![record(2023, 100.0, 5.0)]);
        forward.insert("CCC".to_string(), vec![record(2022, 50.0, -10.0)]);

        let mut backward = HashMap::new();
        backward.insert("CCC".to_string(), vec![record(2022, 50.0, -10.0)]);
        backward.insert("BBB".to_string(), vec![record(2023, 100.0, 5.0)]);
        backward.insert("AAA".to_string(), strong_records());

        assert_eq!(ranker.rank(&forward), ranker.rank(&backward));
    }

    #[test]
    fn test_equal_totals_break_on_growth_points() {
        let ranker = CompositeRanker::new();
        let mut universe = HashMap::new();

        // 50 growth + 20 level + 0 trend = 70
        universe.insert(
            "HIGROW".to_string(),
            vec![
                record(2021, 100.0, 12.0),
                record(2022, 120.0, 12.0),
                record(2023, 150.0, 12.0),
            ],
        );
        // 20 growth + 30 level + 20 trend = 70
        universe.insert(
            "HIMARG".to_string(),
            vec![record(2022, 100.0, 30.0), record(2023, 105.0, 42.0)],
        );

        let result = ranker.rank(&universe);
        let first = &result.entries[0].breakdown;
        let second = &result.entries[1].breakdown;

        assert_eq!(first.total, 70);
        assert_eq!(second.total, 70);
        assert_eq!(first.symbol, "HIGROW");
        assert!(first.growth_points > second.growth_points);
    }

    #[test]
    fn test_equal_growth_breaks_on_margin_level() {
        let ranker = CompositeRanker::new();
        let mut universe = HashMap::new();

        // 50 growth + 30 level + 10 trend = 90, flat fat margins
        universe.insert(
            "FAT".to_string(),
            vec![
                record(2021, 100.0, 25.0),
                record(2022, 120.0, 30.0),
                record(2023, 150.0, 37.5),
            ],
        );
        // 50 growth + 20 level + 20 trend = 90, thin improving margins
        universe.insert(
            "THIN".to_string(),
            vec![
                record(2021, 100.0, 8.0),
                record(2022, 120.0, 12.0),
                record(2023, 150.0, 18.0),
            ],
        );

        let result = ranker.rank(&universe);
        let first = &result.entries[0].breakdown;
        let second = &result.entries[1].breakdown;

        assert_eq!(first.total, second.total);
        assert_eq!(first.growth_points, second.growth_points);
        assert_eq!(first.symbol, "FAT");
        assert!(first.margin_level_points > second.margin_level_points);
    }

    #[test]
    fn test_identical_scores_break_on_symbol() {
        let ranker = CompositeRanker::new();
        let mut universe = HashMap::new();
        universe.insert("ZZZ".to_string(), strong_records());
        universe.insert("AAA".to_string(), strong_records());
        universe.insert("MMM".to_string(), strong_records());

        let result = ranker.rank(&universe);
        let symbols: Vec<&str> = result
            .entries
            .iter()
            .map(|e| e.breakdown.symbol.as_str())
            .collect();

        assert_eq!(symbols, vec!["AAA", "MMM", "ZZZ"]);
    }

    #[test]
    fn test_ranks_are_dense_and_unique() {
        let ranker = CompositeRanker::new();
        let mut universe = HashMap::new();
        universe.insert("AAA".to_string(), strong_records());
        universe.insert("BBB".to_string(), strong_records());
        universe.insert("CCC".to_string(), Vec::new());
        universe.insert("DDD".to_string(), vec![record(2023, 100.0, 5.0)]);

        let result = ranker.rank(&universe);
        let ranks: Vec<u32> = result.entries.iter().map(|e| e.rank).collect();

        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_empty_records_rank_last_as_insufficient() {
        let ranker = CompositeRanker::new();
        let mut universe = HashMap::new();
        universe.insert("GOOD".to_string(), strong_records());
        universe.insert("NODATA".to_string(), Vec::new());

        let result = ranker.rank(&universe);
        let last = result.entries.last().unwrap();

        assert_eq!(last.breakdown.symbol, "NODATA");
        assert_eq!(last.breakdown.total, 0);
        assert_eq!(last.breakdown.data_quality, DataQuality::Insufficient);
        assert_eq!(result.entries.len(), 2);
    }

    #[test]
    fn test_revenue_without_income_is_insufficient() {
        let ranker = CompositeRanker::new();
        let records = vec![
            FinancialRecord::new(2022, Some(100.0), None),
            FinancialRecord::new(2023, Some(150.0), None),
        ];

        let breakdown = ranker.score_symbol("NOOI", &records);

        // A growth figure was computable, but with no usable period the
        // whole breakdown is forced to zero
        assert_eq!(breakdown.data_quality, DataQuality::Insufficient);
        assert_eq!(breakdown.total, 0);
        assert_eq!(breakdown.growth_points, 0);
        assert_eq!(breakdown.cagr, None);
    }

    #[test]
    fn test_single_year_with_margin_is_partial() {
        let ranker = CompositeRanker::new();
        let breakdown = ranker.score_symbol("ONE", &[record(2023, 100.0, 10.0)]);

        assert_eq!(breakdown.data_quality, DataQuality::Partial);
        assert_eq!(breakdown.cagr, None);
        assert_eq!(breakdown.growth_points, 0);
        assert_eq!(breakdown.margin_level_points, 20);
        assert_eq!(breakdown.margin_trend_points, 0);
        assert_eq!(breakdown.total, 20);
    }

    #[test]
    fn test_two_usable_years_is_partial() {
        let ranker = CompositeRanker::new();
        let records = vec![record(2022, 100.0, 10.0), record(2023, 110.0, 12.0)];

        let breakdown = ranker.score_symbol("TWO", &records);

        assert_eq!(breakdown.data_quality, DataQuality::Partial);
        assert_eq!(breakdown.usable_periods, 2);
        assert!(breakdown.total > 0);
    }

    #[test]
    fn test_longer_clean_history_is_still_full() {
        let ranker = CompositeRanker::new();
        let records = vec![
            record(2019, 80.0, 8.0),
            record(2020, 90.0, 9.0),
            record(2021, 100.0, 10.0),
            record(2022, 120.0, 14.4),
            record(2023, 150.0, 22.5),
        ];

        let breakdown = ranker.score_symbol("LONG", &records);

        assert_eq!(breakdown.data_quality, DataQuality::Full);
        assert_eq!(breakdown.usable_periods, 5);
    }

    #[test]
    fn test_bad_symbol_never_corrupts_good_one() {
        let ranker = CompositeRanker::new();
        let alone = ranker.score_symbol("GOOD", &strong_records());

        let mut universe = HashMap::new();
        universe.insert("GOOD".to_string(), strong_records());
        universe.insert(
            "BAD".to_string(),
            vec![
                FinancialRecord::new(i32::MIN, Some(-1e18), Some(f64::NAN)),
                FinancialRecord::new(2023, Some(-5.0), None),
            ],
        );

        let result = ranker.rank(&universe);
        let good = result
            .entries
            .iter()
            .find(|e| e.breakdown.symbol == "GOOD")
            .unwrap();

        assert_eq!(good.breakdown, alone);
    }

    #[test]
    fn test_duplicate_fiscal_year_last_record_wins() {
        let ranker = CompositeRanker::new();
        let records = vec![record(2023, 100.0, 10.0), record(2023, 200.0, 20.0)];

        let breakdown = ranker.score_symbol("DUP", &records);

        // Both records have defined margins, but they cover a single year,
        // so growth stays undefined
        assert_eq!(breakdown.usable_periods, 2);
        assert_eq!(breakdown.cagr, None);
        assert_eq!(breakdown.growth_points, 0);
    }

    #[test]
    fn test_gap_years_widen_the_growth_span() {
        let ranker = CompositeRanker::new();
        let records = vec![record(2020, 100.0, 10.0), record(2023, 133.1, 13.31)];

        let breakdown = ranker.score_symbol("GAP", &records);

        // (133.1/100)^(1/3) - 1 = 10%, not 33% over one step
        assert!((breakdown.cagr.unwrap() - 0.10).abs() < 1e-9);
        assert_eq!(breakdown.growth_points, 35);
    }
}
