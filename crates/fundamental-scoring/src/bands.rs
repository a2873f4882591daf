use serde::{Deserialize, Serialize};

/// One scoring band: inputs in `[lower, upper)` map linearly onto
/// `[points_lo, points_hi]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointBand {
    pub lower: f64,
    pub upper: f64,
    pub points_lo: f64,
    pub points_hi: f64,
}

/// Ordered band table mapping a metric onto integer points.
///
/// Bands are half-open `[lower, upper)`; the top band carries an infinite
/// upper edge so the mapping saturates at its maximum. Inputs below the
/// lowest band floor to that band's low points. Inside a band the value is
/// interpolated linearly and rounded half away from zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandTable {
    bands: Vec<PointBand>,
}

impl BandTable {
    /// Bands must be sorted, contiguous, and non-decreasing in points.
    pub fn new(bands: Vec<PointBand>) -> Self {
        debug_assert!(!bands.is_empty());
        debug_assert!(bands
            .windows(2)
            .all(|w| (w[0].upper - w[1].lower).abs() < f64::EPSILON));
        debug_assert!(bands.windows(2).all(|w| w[0].points_hi <= w[1].points_lo));
        Self { bands }
    }

    /// Default annual-CAGR table, 0..=50 points. 20%+ growth earns the
    /// full 50; shrinking revenue decays to 0 below -5%.
    pub fn default_growth() -> Self {
        Self::new(vec![
            PointBand { lower: -0.05, upper: 0.00, points_lo: 0.0, points_hi: 5.0 },
            PointBand { lower: 0.00, upper: 0.05, points_lo: 5.0, points_hi: 20.0 },
            PointBand { lower: 0.05, upper: 0.10, points_lo: 20.0, points_hi: 35.0 },
            PointBand { lower: 0.10, upper: 0.20, points_lo: 35.0, points_hi: 50.0 },
            PointBand { lower: 0.20, upper: f64::INFINITY, points_lo: 50.0, points_hi: 50.0 },
        ])
    }

    /// Default average operating-margin table, 0..=30 points. Margins are
    /// fractions (0.20 = 20%).
    pub fn default_margin_level() -> Self {
        Self::new(vec![
            PointBand { lower: -0.10, upper: 0.00, points_lo: 0.0, points_hi: 5.0 },
            PointBand { lower: 0.00, upper: 0.10, points_lo: 5.0, points_hi: 20.0 },
            PointBand { lower: 0.10, upper: 0.20, points_lo: 20.0, points_hi: 30.0 },
            PointBand { lower: 0.20, upper: f64::INFINITY, points_lo: 30.0, points_hi: 30.0 },
        ])
    }

    pub fn score(&self, value: f64) -> u8 {
        let first = self.bands[0];
        if value.is_nan() || value < first.lower {
            return first.points_lo.round() as u8;
        }

        for band in &self.bands {
            if value < band.upper {
                let span = band.upper - band.lower;
                if !span.is_finite() || span <= 0.0 {
                    return band.points_lo.round() as u8;
                }
                let t = (value - band.lower) / span;
                return (band.points_lo + t * (band.points_hi - band.points_lo)).round() as u8;
            }
        }

        let last = self.bands[self.bands.len() - 1];
        last.points_hi.round() as u8
    }
}
