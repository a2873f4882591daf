use crate::bands::BandTable;
use serde::{Deserialize, Serialize};

/// Revenue growth score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthScore {
    pub cagr: Option<f64>,
    pub points: u8,
}

impl GrowthScore {
    fn undefined() -> Self {
        Self {
            cagr: None,
            points: 0,
        }
    }
}

/// Scores annualized revenue growth against a band table.
#[derive(Debug, Clone)]
pub struct GrowthScorer {
    bands: BandTable,
}

impl GrowthScorer {
    pub fn new() -> Self {
        Self {
            bands: BandTable::default_growth(),
        }
    }

    pub fn with_bands(bands: BandTable) -> Self {
        Self { bands }
    }

    /// Scores a per-year revenue sequence, oldest first, one slot per
    /// consecutive fiscal year with `None` marking a year without a usable
    /// figure. Negative values are malformed upstream data and count as
    /// missing, never as zero.
    ///
    /// The CAGR uses the first and last usable slots and the actual number
    /// of years between them, so missing edge years shrink the span instead
    /// of distorting the rate. Fewer than two usable values, or a first
    /// value of zero, leave the growth undefined at zero points.
    pub fn score(&self, revenues: &[Option<f64>]) -> GrowthScore {
        let usable: Vec<(usize, f64)> = revenues
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.filter(|v| *v >= 0.0).map(|v| (i, v)))
            .collect();

        let (first, last) = match (usable.first(), usable.last()) {
            (Some(&first), Some(&last)) if last.0 > first.0 => (first, last),
            _ => return GrowthScore::undefined(),
        };

        if first.1 == 0.0 {
            return GrowthScore::undefined();
        }

        let span = (last.0 - first.0) as f64;
        let cagr = (last.1 / first.1).powf(1.0 / span) - 1.0;

        GrowthScore {
            cagr: Some(cagr),
            points: self.bands.score(cagr),
        }
    }
}

impl Default for GrowthScorer {
    fn default() -> Self {
        Self::new()
    }
}
