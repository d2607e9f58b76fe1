//! Window indicator implementations.
//!
//! Every indicator is a pure function of a trailing window of candles and
//! refuses to run on fewer candles than its period.

pub mod atr;
pub mod donchian;
pub mod dynamics;

pub use atr::AvgTrueRange;
pub use donchian::DonchianChannel;
pub use dynamics::{smoothed_dynamics, PriceDynamics};

use crate::config::PipelineConfig;
use crate::error::{FeatureError, Result};
use crate::types::{AvgRangeVolume, Candle, DonchianScore, MeanVelAcc};

/// Trait for indicators evaluated over a trailing candle window.
pub trait WindowIndicator {
    type Output;

    /// Identifier used in insufficient-history errors.
    fn id(&self) -> &'static str;

    /// Minimum number of candles required for calculation.
    fn min_periods(&self) -> usize;

    /// Calculate over the last `min_periods()` candles of `window`.
    fn calculate(&self, window: &[Candle]) -> Result<Self::Output>;
}

/// Last `period` candles of `window`, or an insufficient-history error.
pub fn trailing<'a>(
    window: &'a [Candle],
    period: usize,
    indicator: &'static str,
) -> Result<&'a [Candle]> {
    if period == 0 {
        return Err(FeatureError::InvalidInput(format!(
            "{indicator} period must be at least 1"
        )));
    }
    if window.len() < period {
        return Err(FeatureError::InsufficientHistory {
            indicator,
            needed: period,
            available: window.len(),
        });
    }
    Ok(&window[window.len() - period..])
}

/// Rank of the last candle in a non-empty slice.
pub(crate) fn last_sequence(slice: &[Candle]) -> i32 {
    slice.last().map(|c| c.sequence_in_day).unwrap_or_default()
}

/// The three indicators the feature rows are built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorSet {
    pub atr: AvgTrueRange,
    pub donchian: DonchianChannel,
    pub dynamics: PriceDynamics,
}

impl Default for IndicatorSet {
    fn default() -> Self {
        Self {
            atr: AvgTrueRange::default(),
            donchian: DonchianChannel::default(),
            dynamics: PriceDynamics::default(),
        }
    }
}

impl IndicatorSet {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            atr: AvgTrueRange::new(config.atr_period),
            donchian: DonchianChannel::new(config.donchian_period),
            dynamics: PriceDynamics::new(config.velocity_lookback),
        }
    }

    /// Evaluate every indicator over the whole window.
    pub fn snapshot(&self, window: &[Candle]) -> WindowSnapshot {
        WindowSnapshot {
            range_volume: self.atr.calculate(window),
            donchian: self.donchian.calculate(window),
            dynamics: self.dynamics.calculate(window),
        }
    }
}

/// Indicator outputs for one causal window; each may be short on history.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSnapshot {
    pub range_volume: Result<AvgRangeVolume>,
    pub donchian: Result<DonchianScore>,
    pub dynamics: Result<MeanVelAcc>,
}

impl WindowSnapshot {
    /// First insufficient-history (or other) error, in field order.
    pub fn first_error(&self) -> Option<&FeatureError> {
        self.range_volume
            .as_ref()
            .err()
            .or_else(|| self.donchian.as_ref().err())
            .or_else(|| self.dynamics.as_ref().err())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CandleColor;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    fn create_uptrend_candles(count: usize) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2026, 1, 15, 3, 45, 0).unwrap();
        (0..count)
            .map(|i| {
                let base = 100.0 + i as f64;
                Candle {
                    timestamp: start + Duration::minutes(i as i64),
                    trading_day: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
                    open: base,
                    high: base + 1.5,
                    low: base - 0.5,
                    close: base + 1.0,
                    volume: 1000,
                    sequence_in_day: i as i32 + 1,
                    color: CandleColor::Green,
                }
            })
            .collect()
    }

    #[test]
    fn test_trailing_slice() {
        let candles = create_uptrend_candles(8);
        let slice = trailing(&candles, 3, "test").unwrap();
        assert_eq!(slice.len(), 3);
        assert_eq!(slice[0].sequence_in_day, 6);
    }

    #[test]
    fn test_trailing_rejects_zero_period() {
        let candles = create_uptrend_candles(2);
        assert!(matches!(
            trailing(&candles, 0, "test"),
            Err(FeatureError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_trailing_insufficient() {
        let candles = create_uptrend_candles(2);
        assert_eq!(
            trailing(&candles, 3, "test").unwrap_err(),
            FeatureError::InsufficientHistory {
                indicator: "test",
                needed: 3,
                available: 2,
            }
        );
    }

    #[test]
    fn test_snapshot_partial_history() {
        let set = IndicatorSet::default();
        let snapshot = set.snapshot(&create_uptrend_candles(12));
        assert!(snapshot.range_volume.is_ok());
        assert!(snapshot.dynamics.is_ok());
        assert!(snapshot.donchian.as_ref().unwrap_err().is_insufficient_history());
        assert!(snapshot.first_error().is_some());
    }

    #[test]
    fn test_snapshot_full_history() {
        let set = IndicatorSet::default();
        let snapshot = set.snapshot(&create_uptrend_candles(25));
        assert!(snapshot.first_error().is_none());
        let atr = snapshot.range_volume.unwrap();
        assert!((atr.avg_range - 2.0).abs() < 1e-12);
        assert_eq!(atr.sequence_in_day, 25);
    }

    #[test]
    fn test_from_config_periods() {
        let config = PipelineConfig {
            atr_period: 3,
            donchian_period: 7,
            velocity_lookback: 4,
            ..Default::default()
        };
        let set = IndicatorSet::from_config(&config);
        assert_eq!(set.atr.min_periods(), 3);
        assert_eq!(set.donchian.min_periods(), 7);
        assert_eq!(set.dynamics.min_periods(), 4);
    }
}
