use std::env;
use std::path::PathBuf;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{FeatureError, Result};

/// IST (UTC+05:30), the reporting timezone of the exchange feed.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;

/// What the assembler does with a candle whose causal window is shorter
/// than an indicator's period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsufficientHistoryPolicy {
    /// Emit the row with the affected indicator fields set to `None`.
    #[default]
    Null,
    /// Drop the row entirely.
    Skip,
    /// Fail the whole day with the first insufficient-history error.
    Fail,
}

impl InsufficientHistoryPolicy {
    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "null" | "none" => Some(Self::Null),
            "skip" => Some(Self::Skip),
            "fail" | "error" => Some(Self::Fail),
            _ => None,
        }
    }
}

/// How indicator windows are evaluated per candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeMode {
    /// Incremental deques and running sums, O(1) amortized per candle.
    #[default]
    Rolling,
    /// Re-run every indicator over the whole growing window.
    Recompute,
}

impl ComputeMode {
    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "rolling" | "incremental" => Some(Self::Rolling),
            "recompute" | "naive" => Some(Self::Recompute),
            _ => None,
        }
    }
}

/// Feature pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Candles averaged for range and volume (default: 5).
    pub atr_period: usize,
    /// Donchian channel window (default: 20).
    pub donchian_period: usize,
    /// Closes used for velocity/acceleration (default: 10).
    pub velocity_lookback: usize,
    /// Prior-day candles prepended to the selected day (default: 20).
    pub seed_length: usize,
    /// SMA period applied by the timed velocity variant (default: 2).
    pub smoothing_period: usize,
    /// Raw close samples behind the row tails: K-1 velocities, K-2 accelerations (default: 10).
    pub tail_samples: usize,
    /// Reporting timezone as minutes east of UTC (default: 330).
    pub utc_offset_minutes: i32,
    pub insufficient_history: InsufficientHistoryPolicy,
    pub compute_mode: ComputeMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            atr_period: 5,
            donchian_period: 20,
            velocity_lookback: 10,
            seed_length: 20,
            smoothing_period: 2,
            tail_samples: 10,
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            insufficient_history: InsufficientHistoryPolicy::default(),
            compute_mode: ComputeMode::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            atr_period: parse_env("FEATURE_ATR_PERIOD").unwrap_or(defaults.atr_period),
            donchian_period: parse_env("FEATURE_DONCHIAN_PERIOD")
                .unwrap_or(defaults.donchian_period),
            velocity_lookback: parse_env("FEATURE_VELOCITY_LOOKBACK")
                .unwrap_or(defaults.velocity_lookback),
            seed_length: parse_env("FEATURE_SEED_LENGTH").unwrap_or(defaults.seed_length),
            smoothing_period: parse_env("FEATURE_SMOOTHING_PERIOD")
                .unwrap_or(defaults.smoothing_period),
            tail_samples: parse_env("FEATURE_TAIL_SAMPLES").unwrap_or(defaults.tail_samples),
            utc_offset_minutes: parse_env("FEATURE_UTC_OFFSET_MINUTES")
                .unwrap_or(defaults.utc_offset_minutes),
            insufficient_history: env::var("FEATURE_INSUFFICIENT_POLICY")
                .ok()
                .and_then(|v| InsufficientHistoryPolicy::from_str(&v))
                .unwrap_or(defaults.insufficient_history),
            compute_mode: env::var("FEATURE_COMPUTE_MODE")
                .ok()
                .and_then(|v| ComputeMode::from_str(&v))
                .unwrap_or(defaults.compute_mode),
        }
    }

    /// Reject configurations no indicator can run with.
    pub fn validate(&self) -> Result<()> {
        if self.atr_period == 0 {
            return Err(FeatureError::InvalidConfig("atr_period must be at least 1".into()));
        }
        if self.donchian_period == 0 {
            return Err(FeatureError::InvalidConfig(
                "donchian_period must be at least 1".into(),
            ));
        }
        if self.velocity_lookback < 2 {
            return Err(FeatureError::InvalidConfig(
                "velocity_lookback must be at least 2".into(),
            ));
        }
        if self.smoothing_period == 0 {
            return Err(FeatureError::InvalidConfig(
                "smoothing_period must be at least 1".into(),
            ));
        }
        if self.tail_samples < 2 {
            return Err(FeatureError::InvalidConfig(
                "tail_samples must be at least 2".into(),
            ));
        }
        self.reporting_offset()?;
        Ok(())
    }

    /// The reporting timezone as a chrono offset.
    pub fn reporting_offset(&self) -> Result<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                FeatureError::InvalidConfig(format!(
                    "utc_offset_minutes out of range: {}",
                    self.utc_offset_minutes
                ))
            })
    }

    /// Width of the velocity tail in a feature row.
    pub fn velocity_tail_width(&self) -> usize {
        self.tail_samples.saturating_sub(1)
    }

    /// Width of the acceleration tail in a feature row.
    pub fn acceleration_tail_width(&self) -> usize {
        self.tail_samples.saturating_sub(2)
    }
}

/// Driver configuration for the command-line binary.
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON file holding the raw candle array.
    pub input_path: PathBuf,
    /// Where to write the feature rows (stdout when unset).
    pub output_path: Option<PathBuf>,
    /// Calendar day to featurize, `YYYY-MM-DD`.
    pub target_day: String,
    /// Instrument symbol stamped on every row.
    pub instrument: String,
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            input_path: env::var("INPUT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("candles.json")),
            output_path: env::var("OUTPUT_PATH").ok().map(PathBuf::from),
            target_day: env::var("TARGET_DAY").unwrap_or_default(),
            instrument: env::var("INSTRUMENT").unwrap_or_else(|_| "UNKNOWN".to_string()),
            pipeline: PipelineConfig::from_env(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
