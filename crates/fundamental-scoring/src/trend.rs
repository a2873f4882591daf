use equity_core::TrendDirection;
use serde::{Deserialize, Serialize};

/// Default slope threshold for calling a trend: 0.5 percentage points of
/// margin per period, in fraction units.
pub const DEFAULT_TREND_EPSILON: f64 = 0.005;

/// Least-squares line fit over a short metric series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendFit {
    pub slope: f64,
    pub direction: TrendDirection,
    pub confidence: f64,
}

impl TrendFit {
    /// Fit of an empty, single-point, or degenerate series
    pub fn flat() -> Self {
        Self {
            slope: 0.0,
            direction: TrendDirection::Stable,
            confidence: 0.0,
        }
    }
}

/// Fits a straight line through (index, value) points and classifies the
/// slope against a threshold.
#[derive(Debug, Clone)]
pub struct TrendFitter {
    epsilon: f64,
}

impl TrendFitter {
    pub fn new() -> Self {
        Self {
            epsilon: DEFAULT_TREND_EPSILON,
        }
    }

    pub fn with_epsilon(epsilon: f64) -> Self {
        Self { epsilon }
    }

    /// Ordinary least squares over the points. Fewer than two points read
    /// as a flat line with zero confidence; confidence is r-squared clamped
    /// to [0, 1], and degenerate variance on either axis also reads as zero.
    pub fn fit(&self, points: &[(f64, f64)]) -> TrendFit {
        if points.len() < 2 {
            return TrendFit::flat();
        }

        let n = points.len() as f64;
        let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
        let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

        let mut ss_xx = 0.0;
        let mut ss_yy = 0.0;
        let mut ss_xy = 0.0;
        for (x, y) in points {
            ss_xx += (x - mean_x) * (x - mean_x);
            ss_yy += (y - mean_y) * (y - mean_y);
            ss_xy += (x - mean_x) * (y - mean_y);
        }

        if ss_xx == 0.0 {
            return TrendFit::flat();
        }

        let slope = ss_xy / ss_xx;
        let direction = if slope >= self.epsilon {
            TrendDirection::Improving
        } else if slope <= -self.epsilon {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        };

        let confidence = if ss_yy == 0.0 {
            0.0
        } else {
            ((ss_xy * ss_xy) / (ss_xx * ss_yy)).clamp(0.0, 1.0)
        };

        TrendFit {
            slope,
            direction,
            confidence,
        }
    }
}

impl Default for TrendFitter {
    fn default() -> Self {
        Self::new()
    }
}
