//! candle-features - causal feature rows from one-minute OHLCV candles

pub mod config;
pub mod error;
pub mod services;
pub mod types;

pub use config::{ComputeMode, InsufficientHistoryPolicy, PipelineConfig};
pub use error::{FeatureError, Result};
pub use services::FeaturePipeline;
