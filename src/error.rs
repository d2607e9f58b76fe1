use thiserror::Error;

/// Feature pipeline error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("OHLC data is empty")]
    EmptyOhlc,

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Not enough candles for {indicator}: need {needed}, got {available}")]
    InsufficientHistory {
        indicator: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FeatureError {
    /// Whether this error only reports a window that is too short.
    pub fn is_insufficient_history(&self) -> bool {
        matches!(self, FeatureError::InsufficientHistory { .. })
    }
}

pub type Result<T> = std::result::Result<T, FeatureError>;
