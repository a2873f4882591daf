use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One annual income-statement line for a company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub fiscal_year: i32,
    pub revenue: Option<f64>,
    pub operating_income: Option<f64>,
}

impl FinancialRecord {
    pub fn new(fiscal_year: i32, revenue: Option<f64>, operating_income: Option<f64>) -> Self {
        Self {
            fiscal_year,
            revenue,
            operating_income,
        }
    }

    /// Operating margin as a fraction. Defined only when both fields are
    /// reported and revenue is positive; a missing or non-positive revenue
    /// leaves the margin undefined rather than producing a garbage ratio.
    pub fn operating_margin(&self) -> Option<f64> {
        match (self.revenue, self.operating_income) {
            (Some(revenue), Some(income)) if revenue > 0.0 => Some(income / revenue),
            _ => None,
        }
    }
}

/// Company profile data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub symbol: String,
    pub name: Option<String>,
    pub sector: Option<String>,
}

/// Statements pulled back out of the store, with the time they were fetched
/// so callers can decide whether they are still fresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedStatements {
    pub records: Vec<FinancialRecord>,
    pub fetched_at: DateTime<Utc>,
}

/// How complete a symbol's fundamentals were for scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataQuality {
    Full,
    Partial,
    Insufficient,
}

impl DataQuality {
    pub fn label(&self) -> &'static str {
        match self {
            DataQuality::Full => "Full",
            DataQuality::Partial => "Partial",
            DataQuality::Insufficient => "Insufficient",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label {
            "Full" => DataQuality::Full,
            "Partial" => DataQuality::Partial,
            _ => DataQuality::Insufficient,
        }
    }
}

/// Direction of the operating-margin trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
}

impl TrendDirection {
    pub fn label(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "Improving",
            TrendDirection::Stable => "Stable",
            TrendDirection::Declining => "Declining",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label {
            "Improving" => TrendDirection::Improving,
            "Declining" => TrendDirection::Declining,
            _ => TrendDirection::Stable,
        }
    }
}

/// Recommendation bucket derived from the composite total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    StrongBuy,
    Buy,
    Hold,
    Sell,
}

impl Recommendation {
    pub fn from_total(total: u8) -> Self {
        match total {
            t if t >= 80 => Recommendation::StrongBuy,
            t if t >= 60 => Recommendation::Buy,
            t if t >= 40 => Recommendation::Hold,
            _ => Recommendation::Sell,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Recommendation::StrongBuy => "STRONG BUY",
            Recommendation::Buy => "BUY",
            Recommendation::Hold => "HOLD",
            Recommendation::Sell => "SELL",
        }
    }
}

/// Scored fundamentals for one symbol.
///
/// `total` is always the exact sum of the three point components. The
/// metric fields (`cagr`, `avg_margin`) are carried for display and
/// narrative prompts; ranking never looks at them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub symbol: String,
    /// Revenue growth points, 0..=50
    pub growth_points: u8,
    /// Margin level points, 0..=30
    pub margin_level_points: u8,
    /// Margin trend points, 0..=20
    pub margin_trend_points: u8,
    /// Composite total, 0..=100
    pub total: u8,
    pub data_quality: DataQuality,
    pub cagr: Option<f64>,
    pub avg_margin: Option<f64>,
    pub margin_trend: TrendDirection,
    pub usable_periods: usize,
}

impl ScoreBreakdown {
    /// Zero score for a symbol with no usable fundamentals. Still a defined
    /// value, never an error: the symbol ranks last instead of vanishing.
    pub fn insufficient(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            growth_points: 0,
            margin_level_points: 0,
            margin_trend_points: 0,
            total: 0,
            data_quality: DataQuality::Insufficient,
            cagr: None,
            avg_margin: None,
            margin_trend: TrendDirection::Stable,
            usable_periods: 0,
        }
    }

    pub fn recommendation(&self) -> Recommendation {
        Recommendation::from_total(self.total)
    }
}

/// One position in the ranking, 1-based
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub rank: u32,
    pub breakdown: ScoreBreakdown,
}

/// Ranked universe, best score first. Deterministic for a given input:
/// carries no timestamps or run metadata, the store applies those when a
/// result is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub entries: Vec<RankedEntry>,
}

/// A persisted score row from the store's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub recorded_at: DateTime<Utc>,
    pub rank: u32,
    pub breakdown: ScoreBreakdown,
}
