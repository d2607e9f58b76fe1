//! Incremental indicator windows.
//!
//! Candles are pushed one at a time and each push is O(1) amortized:
//! bounded range/volume buffers, monotonic deques for the Donchian
//! extremes and a ring of pair velocities. Snapshots match what
//! [`IndicatorSet::snapshot`] returns for the same causal window.

use std::collections::VecDeque;

use super::indicators::dynamics::{accelerations, pair_velocity};
use super::indicators::{DonchianChannel, IndicatorSet, WindowIndicator, WindowSnapshot};
use crate::error::{FeatureError, Result};
use crate::types::{AvgRangeVolume, Candle, ChannelBands, DonchianScore, MeanVelAcc, PriceDerivatives};

/// The last `period` ranges and a running volume sum.
///
/// The range mean is re-summed oldest to newest on every snapshot so it is
/// bit-identical to the recomputing indicator; volume sums are exact integers.
#[derive(Debug, Clone)]
struct RangeVolumeWindow {
    period: usize,
    ranges: VecDeque<f64>,
    volumes: VecDeque<u64>,
    volume_sum: u128,
}

impl RangeVolumeWindow {
    fn new(period: usize) -> Self {
        Self {
            period,
            ranges: VecDeque::with_capacity(period + 1),
            volumes: VecDeque::with_capacity(period + 1),
            volume_sum: 0,
        }
    }

    fn push(&mut self, candle: &Candle) {
        self.ranges.push_back(candle.range());
        self.volumes.push_back(candle.volume);
        self.volume_sum += u128::from(candle.volume);

        if self.ranges.len() > self.period {
            self.ranges.pop_front();
            if let Some(old) = self.volumes.pop_front() {
                self.volume_sum -= u128::from(old);
            }
        }
    }

    fn range_sum(&self) -> f64 {
        self.ranges.iter().sum()
    }

    fn is_full(&self) -> bool {
        self.ranges.len() == self.period
    }
}

/// Highest high and lowest low over the last `period` candles.
#[derive(Debug, Clone)]
struct ExtremeWindow {
    period: usize,
    next_index: usize,
    /// (index, high), highs strictly decreasing front to back
    highs: VecDeque<(usize, f64)>,
    /// (index, low), lows strictly increasing front to back
    lows: VecDeque<(usize, f64)>,
}

impl ExtremeWindow {
    fn new(period: usize) -> Self {
        Self {
            period,
            next_index: 0,
            highs: VecDeque::new(),
            lows: VecDeque::new(),
        }
    }

    fn push(&mut self, candle: &Candle) {
        let index = self.next_index;
        self.next_index += 1;

        while self.highs.back().is_some_and(|&(_, high)| high <= candle.high) {
            self.highs.pop_back();
        }
        self.highs.push_back((index, candle.high));

        while self.lows.back().is_some_and(|&(_, low)| low >= candle.low) {
            self.lows.pop_back();
        }
        self.lows.push_back((index, candle.low));

        // Evict entries older than the window start
        while self.highs.front().is_some_and(|&(i, _)| i + self.period <= index) {
            self.highs.pop_front();
        }
        while self.lows.front().is_some_and(|&(i, _)| i + self.period <= index) {
            self.lows.pop_front();
        }
    }

    fn extremes(&self) -> Option<(f64, f64)> {
        let (_, upper) = self.highs.front()?;
        let (_, lower) = self.lows.front()?;
        Some((*upper, *lower))
    }
}

/// Velocities of the last `lookback - 1` close pairs; `None` marks a zero base.
#[derive(Debug, Clone)]
struct VelocityRing {
    capacity: usize,
    prev_close: Option<f64>,
    pairs: VecDeque<Option<f64>>,
}

impl VelocityRing {
    fn new(lookback: usize) -> Self {
        let capacity = lookback.saturating_sub(1);
        Self {
            capacity,
            prev_close: None,
            pairs: VecDeque::with_capacity(capacity + 1),
        }
    }

    fn push(&mut self, candle: &Candle) {
        if let Some(prev) = self.prev_close {
            self.pairs.push_back(pair_velocity(prev, candle.close));
            if self.pairs.len() > self.capacity {
                self.pairs.pop_front();
            }
        }
        self.prev_close = Some(candle.close);
    }

    fn velocity(&self) -> Vec<f64> {
        self.pairs.iter().flatten().copied().collect()
    }
}

/// Incremental counterpart of [`IndicatorSet`] over a growing causal window.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    indicators: IndicatorSet,
    pushed: usize,
    last_close: f64,
    last_sequence: i32,
    range_volume: RangeVolumeWindow,
    extremes: ExtremeWindow,
    velocity: VelocityRing,
}

impl RollingWindow {
    pub fn new(indicators: IndicatorSet) -> Self {
        Self {
            pushed: 0,
            last_close: 0.0,
            last_sequence: 0,
            range_volume: RangeVolumeWindow::new(indicators.atr.min_periods()),
            extremes: ExtremeWindow::new(indicators.donchian.min_periods()),
            velocity: VelocityRing::new(indicators.dynamics.min_periods()),
            indicators,
        }
    }

    /// Candles pushed so far, i.e. the causal window length.
    pub fn len(&self) -> usize {
        self.pushed
    }

    pub fn is_empty(&self) -> bool {
        self.pushed == 0
    }

    /// Extend the window by one candle.
    pub fn push(&mut self, candle: &Candle) {
        self.pushed += 1;
        self.last_close = candle.close;
        self.last_sequence = candle.sequence_in_day;
        self.range_volume.push(candle);
        self.extremes.push(candle);
        self.velocity.push(candle);
    }

    /// Indicator outputs for the window pushed so far.
    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            range_volume: self.range_volume_result(),
            donchian: self.donchian_result(),
            dynamics: self.dynamics_result(),
        }
    }

    fn require(&self, indicator: &'static str, needed: usize) -> Result<()> {
        if needed == 0 {
            return Err(FeatureError::InvalidInput(format!(
                "{indicator} period must be at least 1"
            )));
        }
        if self.pushed < needed {
            return Err(FeatureError::InsufficientHistory {
                indicator,
                needed,
                available: self.pushed,
            });
        }
        Ok(())
    }

    fn range_volume_result(&self) -> Result<AvgRangeVolume> {
        let atr = &self.indicators.atr;
        self.require(atr.id(), atr.min_periods())?;
        debug_assert!(self.range_volume.is_full());

        let period = self.range_volume.period as f64;
        Ok(AvgRangeVolume {
            avg_range: self.range_volume.range_sum() / period,
            avg_volume: self.range_volume.volume_sum as f64 / period,
            sequence_in_day: self.last_sequence,
        })
    }

    fn donchian_result(&self) -> Result<DonchianScore> {
        let donchian = &self.indicators.donchian;
        self.require(donchian.id(), donchian.min_periods())?;

        let (upper, lower) = self.extremes.extremes().ok_or(FeatureError::InsufficientHistory {
            indicator: donchian.id(),
            needed: donchian.min_periods(),
            available: self.pushed,
        })?;
        let bands = ChannelBands::from_extremes(upper, lower, self.last_sequence);

        Ok(DonchianScore {
            score: DonchianChannel::score_price(&bands, self.last_close),
            sequence_in_day: self.last_sequence,
            bands,
        })
    }

    fn dynamics_result(&self) -> Result<MeanVelAcc> {
        let dynamics = &self.indicators.dynamics;
        self.require(dynamics.id(), dynamics.min_periods())?;

        let velocity = self.velocity.velocity();
        let acceleration = accelerations(&velocity);
        Ok(MeanVelAcc::from_derivatives(PriceDerivatives {
            velocity,
            acceleration,
            sequence_in_day: self.last_sequence,
        }))
    }
}
