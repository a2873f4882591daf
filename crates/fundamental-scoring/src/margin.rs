use crate::bands::BandTable;
use crate::trend::{TrendFit, TrendFitter};
use equity_core::{FinancialRecord, TrendDirection};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Operating-margin score: level plus trajectory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginScore {
    pub avg_margin: Option<f64>,
    pub level_points: u8,
    pub trend_points: u8,
    pub trend: TrendFit,
}

/// Scores operating-margin level and trajectory.
#[derive(Debug, Clone)]
pub struct MarginScorer {
    level_bands: BandTable,
    fitter: TrendFitter,
}

impl MarginScorer {
    pub fn new() -> Self {
        Self {
            level_bands: BandTable::default_margin_level(),
            fitter: TrendFitter::new(),
        }
    }

    pub fn with_config(level_bands: BandTable, fitter: TrendFitter) -> Self {
        Self {
            level_bands,
            fitter,
        }
    }

    /// Scores the records' margins. A margin is defined only where revenue
    /// is positive and operating income is reported; other records are
    /// skipped while keeping their index, so gaps still count as elapsed
    /// periods in the trend. Zero defined margins score zero with no
    /// average.
    pub fn score(&self, records: &[FinancialRecord]) -> MarginScore {
        let margin_points: Vec<(f64, f64)> = records
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.operating_margin().map(|m| (i as f64, m)))
            .collect();

        if margin_points.is_empty() {
            return MarginScore {
                avg_margin: None,
                level_points: 0,
                trend_points: 0,
                trend: TrendFit::flat(),
            };
        }

        let margins: Vec<f64> = margin_points.iter().map(|p| p.1).collect();
        let avg = margins.iter().mean();
        let level_points = self.level_bands.score(avg);

        let trend = self.fitter.fit(&margin_points);
        let trend_points = if margin_points.len() < 2 {
            0
        } else {
            Self::trend_points(&trend)
        };

        MarginScore {
            avg_margin: Some(avg),
            level_points,
            trend_points,
            trend,
        }
    }

    /// Improving trends earn 10..=20 scaled by confidence, stable reads a
    /// neutral 10, and declining trends fall from 10 toward 0 as confidence
    /// rises.
    fn trend_points(fit: &TrendFit) -> u8 {
        match fit.direction {
            TrendDirection::Improving => 10 + (10.0 * fit.confidence).round() as u8,
            TrendDirection::Stable => 10,
            TrendDirection::Declining => (10.0 * (1.0 - fit.confidence)).round() as u8,
        }
    }
}

impl Default for MarginScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fiscal_year: i32, revenue: f64, operating_income: f64) -> FinancialRecord {
        FinancialRecord::new(fiscal_year, Some(revenue), Some(operating_income))
    }

    #[test]
    fn test_improving_margins_concrete() {
        let scorer = MarginScorer::new();
        let records = vec![
            record(2021, 1000.0, 100.0),
            record(2022, 1000.0, 120.0),
            record(2023, 1000.0, 150.0),
        ];

        let score = scorer.score(&records);

        // Margins 10%, 12%, 15% average to 12.33%
        assert!((score.avg_margin.unwrap() - 0.123333).abs() < 1e-6);
        assert_eq!(score.level_points, 22);
        assert!(score.level_points > 20 && score.level_points < 30);

        assert_eq!(score.trend.direction, TrendDirection::Improving);
        assert!(score.trend_points >= 10 && score.trend_points <= 20);
        assert_eq!(score.trend_points, 20);
    }

    #[test]
    fn test_no_defined_margins() {
        let scorer = MarginScorer::new();
        let records = vec![
            FinancialRecord::new(2022, Some(100.0), None),
            FinancialRecord::new(2023, None, Some(10.0)),
        ];

        let score = scorer.score(&records);

        assert_eq!(score.avg_margin, None);
        assert_eq!(score.level_points, 0);
        assert_eq!(score.trend_points, 0);
        assert_eq!(score.trend.direction, TrendDirection::Stable);
    }

    #[test]
    fn test_single_margin_scores_level_but_no_trend() {
        let scorer = MarginScorer::new();
        let score = scorer.score(&[record(2023, 100.0, 10.0)]);

        assert!((score.avg_margin.unwrap() - 0.10).abs() < 1e-9);
        assert_eq!(score.level_points, 20);
        assert_eq!(score.trend_points, 0);
    }

    #[test]
    fn test_declining_margins_lose_trend_points() {
        let scorer = MarginScorer::new();
        let records = vec![
            record(2021, 1000.0, 200.0),
            record(2022, 1000.0, 150.0),
            record(2023, 1000.0, 100.0),
        ];

        let score = scorer.score(&records);

        assert_eq!(score.trend.direction, TrendDirection::Declining);
        assert_eq!(score.trend_points, 0);
        assert_eq!(score.level_points, 25);
    }

    #[test]
    fn test_stable_margins_score_neutral_trend() {
        let scorer = MarginScorer::new();
        let records = vec![
            record(2021, 500.0, 50.0),
            record(2022, 800.0, 80.0),
            record(2023, 1000.0, 100.0),
        ];

        let score = scorer.score(&records);

        assert_eq!(score.trend.direction, TrendDirection::Stable);
        assert_eq!(score.trend_points, 10);
        assert_eq!(score.level_points, 20);
    }

    #[test]
    fn test_undefined_margins_keep_their_index() {
        let scorer = MarginScorer::new();
        let records = vec![
            record(2021, 100.0, 10.0),
            FinancialRecord::new(2022, Some(100.0), None),
            record(2023, 100.0, 15.0),
        ];

        let score = scorer.score(&records);

        // Slope is 0.05 over two periods, not one
        assert!((score.trend.slope - 0.025).abs() < 1e-9);
        assert_eq!(score.trend.direction, TrendDirection::Improving);
        assert!(score.trend_points >= 10);
    }

    #[test]
    fn test_loss_making_margins_floor_at_zero() {
        let scorer = MarginScorer::new();
        let records = vec![record(2022, 100.0, -30.0), record(2023, 100.0, -25.0)];

        let score = scorer.score(&records);

        assert!((score.avg_margin.unwrap() + 0.275).abs() < 1e-9);
        assert_eq!(score.level_points, 0);
    }
}
