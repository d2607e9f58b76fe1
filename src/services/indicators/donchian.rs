//! Donchian channel indicator.

use super::{last_sequence, trailing, WindowIndicator};
use crate::error::Result;
use crate::types::{Candle, ChannelBands, DonchianScore};

/// Donchian channel over a trailing window.
///
/// - Upper band: highest high
/// - Lower band: lowest low
/// - Middle band: midpoint of the two
///
/// The score places a price inside the channel: +100 at the upper band,
/// -100 at the lower band, 0 at the middle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DonchianChannel {
    period: usize,
}

impl Default for DonchianChannel {
    fn default() -> Self {
        Self { period: 20 }
    }
}

impl DonchianChannel {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    /// Upper, middle and lower bands over the last `period` candles.
    pub fn bands(&self, window: &[Candle]) -> Result<ChannelBands> {
        let slice = trailing(window, self.period, self.id())?;

        let mut upper = f64::NEG_INFINITY;
        let mut lower = f64::INFINITY;
        for candle in slice {
            upper = upper.max(candle.high);
            lower = lower.min(candle.low);
        }

        Ok(ChannelBands::from_extremes(upper, lower, last_sequence(slice)))
    }

    /// Score an arbitrary price against precomputed bands.
    ///
    /// Bounded by ±100 only while the price lies inside the bands.
    pub fn score_price(bands: &ChannelBands, price: f64) -> f64 {
        let upper_range = bands.upper_band - bands.middle_band;
        let lower_range = bands.middle_band - bands.lower_band;

        if price > bands.middle_band {
            (price - bands.middle_band) / upper_range * 100.0
        } else if price < bands.middle_band {
            (price - bands.middle_band) / lower_range * 100.0
        } else {
            0.0
        }
    }
}

impl WindowIndicator for DonchianChannel {
    type Output = DonchianScore;

    fn id(&self) -> &'static str {
        "donchian_channel"
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    /// Score of the window's last close.
    fn calculate(&self, window: &[Candle]) -> Result<DonchianScore> {
        let bands = self.bands(window)?;
        let last_close = window.last().map(|c| c.close).unwrap_or(bands.middle_band);

        Ok(DonchianScore {
            score: Self::score_price(&bands, last_close),
            sequence_in_day: bands.sequence_in_day,
            bands,
        })
    }
}
