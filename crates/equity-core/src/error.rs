use thiserror::Error;

/// Errors from the collaborator crates (data source, store, narrative).
///
/// Data problems are deliberately not represented here: missing fields,
/// short histories, and malformed values degrade a symbol's `DataQuality`
/// inside the scoring engine instead of surfacing as errors.
#[derive(Error, Debug)]
pub enum AnalystError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Narrative error: {0}")]
    NarrativeError(String),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}
