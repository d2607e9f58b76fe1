//! Average range and volume indicator.

use super::{last_sequence, trailing, WindowIndicator};
use crate::error::Result;
use crate::types::{AvgRangeVolume, Candle};

/// Simplified ATR: the plain mean of `high - low` over the window, with the
/// mean volume alongside.
///
/// No Wilder smoothing and no previous-close gap term; the feature rows
/// normalize the current candle's range and volume against these means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvgTrueRange {
    period: usize,
}

impl Default for AvgTrueRange {
    fn default() -> Self {
        Self { period: 5 }
    }
}

impl AvgTrueRange {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl WindowIndicator for AvgTrueRange {
    type Output = AvgRangeVolume;

    fn id(&self) -> &'static str {
        "avg_true_range"
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn calculate(&self, window: &[Candle]) -> Result<AvgRangeVolume> {
        let slice = trailing(window, self.period, self.id())?;

        let range_sum: f64 = slice.iter().map(Candle::range).sum();
        let volume_sum: u128 = slice.iter().map(|c| u128::from(c.volume)).sum();

        Ok(AvgRangeVolume {
            avg_range: range_sum / self.period as f64,
            avg_volume: volume_sum as f64 / self.period as f64,
            sequence_in_day: last_sequence(slice),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeatureError;
    use crate::types::CandleColor;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    fn create_candles(ranges: &[f64], volumes: &[u64]) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2026, 1, 15, 3, 45, 0).unwrap();
        ranges
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (range, volume))| Candle {
                timestamp: start + Duration::minutes(i as i64),
                trading_day: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
                open: 100.0,
                high: 100.0 + range,
                low: 100.0,
                close: 100.0,
                volume: *volume,
                sequence_in_day: i as i32 + 1,
                color: CandleColor::Doji,
            })
            .collect()
    }

    #[test]
    fn test_atr_id_and_min_periods() {
        let atr = AvgTrueRange::default();
        assert_eq!(atr.id(), "avg_true_range");
        assert_eq!(atr.min_periods(), 5);
        assert_eq!(AvgTrueRange::new(3).min_periods(), 3);
    }

    #[test]
    fn test_atr_insufficient_data() {
        let atr = AvgTrueRange::default();
        let candles = create_candles(&[1.0; 4], &[100; 4]);
        let err = atr.calculate(&candles).unwrap_err();
        assert_eq!(
            err,
            FeatureError::InsufficientHistory {
                indicator: "avg_true_range",
                needed: 5,
                available: 4,
            }
        );
    }

    #[test]
    fn test_atr_empty_window() {
        let atr = AvgTrueRange::default();
        assert!(atr.calculate(&[]).unwrap_err().is_insufficient_history());
    }

    #[test]
    fn test_atr_uses_only_trailing_period() {
        let atr = AvgTrueRange::new(3);
        let candles = create_candles(&[10.0, 10.0, 1.0, 2.0, 3.0], &[9, 9, 1, 2, 3]);
        let result = atr.calculate(&candles).unwrap();
        assert!((result.avg_range - 2.0).abs() < 1e-12);
        assert_eq!(result.avg_volume, 2.0);
        assert_eq!(result.sequence_in_day, 5);
    }

    #[test]
    fn test_atr_flat_window_is_zero() {
        let atr = AvgTrueRange::default();
        let candles = create_candles(&[0.0; 6], &[0; 6]);
        let result = atr.calculate(&candles).unwrap();
        assert_eq!(result.avg_range, 0.0);
        assert_eq!(result.avg_volume, 0.0);
    }

    #[test]
    fn test_atr_volume_sum_does_not_overflow() {
        let atr = AvgTrueRange::default();
        let candles = create_candles(&[1.0; 5], &[5_000_000_000_000_000_000; 5]);
        let result = atr.calculate(&candles).unwrap();
        assert_eq!(result.avg_volume, 5e18);
    }
}
