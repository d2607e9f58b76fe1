//! Price velocity and acceleration.

use super::{last_sequence, trailing, WindowIndicator};
use crate::error::{FeatureError, Result};
use crate::types::{Candle, MeanVelAcc, PriceDerivatives, TimedDynamics, TimedValue};

/// Percentage change between two closes, `None` when the base price is zero.
pub fn pair_velocity(prev: f64, next: f64) -> Option<f64> {
    if prev == 0.0 {
        return None;
    }
    Some((next - prev) / prev * 100.0)
}

/// First differences of a velocity sequence, oldest first.
pub fn accelerations(velocity: &[f64]) -> Vec<f64> {
    velocity.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Close-based velocity and acceleration over a trailing window.
///
/// A window of `lookback` closes yields `lookback - 1` velocities and
/// `lookback - 2` accelerations, minus one velocity for every pair whose
/// base close is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceDynamics {
    lookback: usize,
}

impl Default for PriceDynamics {
    fn default() -> Self {
        Self { lookback: 10 }
    }
}

impl PriceDynamics {
    pub fn new(lookback: usize) -> Self {
        Self { lookback }
    }

    /// Raw velocity and acceleration sequences.
    pub fn derivatives(&self, window: &[Candle]) -> Result<PriceDerivatives> {
        let slice = trailing(window, self.lookback, self.id())?;

        let velocity: Vec<f64> = slice
            .windows(2)
            .filter_map(|pair| pair_velocity(pair[0].close, pair[1].close))
            .collect();
        let acceleration = accelerations(&velocity);

        Ok(PriceDerivatives {
            velocity,
            acceleration,
            sequence_in_day: last_sequence(slice),
        })
    }
}

impl WindowIndicator for PriceDynamics {
    type Output = MeanVelAcc;

    fn id(&self) -> &'static str {
        "price_dynamics"
    }

    fn min_periods(&self) -> usize {
        self.lookback
    }

    fn calculate(&self, window: &[Candle]) -> Result<MeanVelAcc> {
        Ok(MeanVelAcc::from_derivatives(self.derivatives(window)?))
    }
}

/// Smoothed velocity/acceleration over generic timestamped samples.
///
/// Raw velocity is `(Δvalue / prev) * 10000`; it is smoothed with a trailing
/// SMA of `smoothing_period` before being differenced into acceleration.
/// Every output sample carries the timestamp of its trailing input sample.
pub fn smoothed_dynamics(samples: &[TimedValue], smoothing_period: usize) -> Result<TimedDynamics> {
    if smoothing_period == 0 {
        return Err(FeatureError::InvalidInput(
            "smoothing period must be at least 1".into(),
        ));
    }
    let needed = smoothing_period + 1;
    if samples.len() < needed {
        return Err(FeatureError::InsufficientHistory {
            indicator: "smoothed_dynamics",
            needed,
            available: samples.len(),
        });
    }

    // Step 1: raw normalized velocity, skipping zero bases
    let raw: Vec<TimedValue> = samples
        .windows(2)
        .filter(|pair| pair[0].value != 0.0)
        .map(|pair| {
            let change = (pair[1].value - pair[0].value) / pair[0].value;
            TimedValue::new(change * 10000.0, pair[1].timestamp)
        })
        .collect();

    // Step 2: trailing SMA
    let velocity: Vec<TimedValue> = raw
        .windows(smoothing_period)
        .map(|w| {
            let avg = w.iter().map(|s| s.value).sum::<f64>() / smoothing_period as f64;
            TimedValue::new(avg, w[w.len() - 1].timestamp)
        })
        .collect();

    // Step 3: acceleration of the smoothed series
    let acceleration = velocity
        .windows(2)
        .map(|w| TimedValue::new(w[1].value - w[0].value, w[1].timestamp))
        .collect();

    Ok(TimedDynamics {
        velocity,
        acceleration,
    })
}
