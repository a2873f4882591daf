use equity_core::{RankedEntry, RankedResult};

/// How many symbols the portfolio strategy prompt covers
const STRATEGY_TOP_N: usize = 5;

fn pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v * 100.0),
        None => "N/A".to_string(),
    }
}

fn format_usd(amount: f64) -> String {
    let whole = amount.round() as i64;
    let digits = whole.abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if whole < 0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

/// Plain-text block summarizing ranked symbols for a prompt
pub fn analysis_summary(entries: &[RankedEntry]) -> String {
    let mut lines = vec![
        "STOCK ANALYSIS SUMMARY".to_string(),
        "=".repeat(50),
        String::new(),
    ];

    for entry in entries {
        let b = &entry.breakdown;
        lines.push(format!("Stock: {} (Rank #{})", b.symbol, entry.rank));
        lines.push(format!("  Revenue Growth (CAGR): {}", pct(b.cagr)));
        lines.push(format!("  Average Operating Margin: {}", pct(b.avg_margin)));
        lines.push(format!("  Margin Trend: {}", b.margin_trend.label()));
        lines.push(format!("  Overall Score: {}/100", b.total));
        lines.push(format!("  Data Quality: {}", b.data_quality.label()));
        lines.push(String::new());
    }

    lines.join("\n")
}

pub fn recommendation_prompt(result: &RankedResult) -> String {
    format!(
        "As a financial analyst, please provide an investment recommendation based on the \
         following stock analysis data:\n\n\
         {}\n\
         Please provide:\n\
         1. An overall investment recommendation (Buy, Hold, or Avoid) for each stock\n\
         2. A portfolio allocation suggestion if investing in multiple stocks\n\
         3. Key risks and opportunities identified\n\
         4. Summary rationale for your recommendations\n\n\
         Please format your response as a professional investment report suitable for \
         presentation to an investment committee.",
        analysis_summary(&result.entries)
    )
}

pub fn strategy_prompt(result: &RankedResult, investment_amount: f64) -> String {
    let top: Vec<RankedEntry> = result
        .entries
        .iter()
        .take(STRATEGY_TOP_N)
        .cloned()
        .collect();

    format!(
        "As a portfolio manager, create an investment strategy for a {} portfolio based on \
         these top-ranked stocks:\n\n\
         {}\n\
         Provide:\n\
         1. Recommended portfolio allocation (% for each stock)\n\
         2. Rationale for allocation weights\n\
         3. Risk management considerations\n\
         4. Rebalancing timeline recommendations\n\
         5. Expected portfolio characteristics (growth vs value, risk level)\n\n\
         Format as a professional portfolio strategy document.",
        format_usd(investment_amount),
        analysis_summary(&top)
    )
}
