use serde::{Deserialize, Serialize};

use super::TimedValue;

/// Mean candle range and mean volume over a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvgRangeVolume {
    pub avg_range: f64,
    pub avg_volume: f64,
    /// Rank of the window's last candle, for tracing only.
    pub sequence_in_day: i32,
}

/// Donchian price envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelBands {
    pub upper_band: f64,
    pub middle_band: f64,
    pub lower_band: f64,
    pub sequence_in_day: i32,
}

impl ChannelBands {
    /// Build bands from the extremes; the middle is always their midpoint.
    pub fn from_extremes(upper_band: f64, lower_band: f64, sequence_in_day: i32) -> Self {
        Self {
            upper_band,
            middle_band: (upper_band + lower_band) / 2.0,
            lower_band,
            sequence_in_day,
        }
    }
}

/// Position of the last close inside the Donchian channel, in percent of the half-width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonchianScore {
    pub bands: ChannelBands,
    pub score: f64,
    pub sequence_in_day: i32,
}

/// Close-to-close percentage velocity and its first difference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceDerivatives {
    /// Oldest first.
    pub velocity: Vec<f64>,
    /// Oldest first.
    pub acceleration: Vec<f64>,
    pub sequence_in_day: i32,
}

/// Velocity/acceleration together with their arithmetic means.
///
/// A mean is `None` when its sequence is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeanVelAcc {
    pub velocity: Vec<f64>,
    pub acceleration: Vec<f64>,
    pub avg_velocity: Option<f64>,
    pub avg_acceleration: Option<f64>,
    pub sequence_in_day: i32,
}

impl MeanVelAcc {
    pub fn from_derivatives(derivatives: PriceDerivatives) -> Self {
        Self {
            avg_velocity: mean(&derivatives.velocity),
            avg_acceleration: mean(&derivatives.acceleration),
            velocity: derivatives.velocity,
            acceleration: derivatives.acceleration,
            sequence_in_day: derivatives.sequence_in_day,
        }
    }
}

/// Smoothed velocity and acceleration series of the timed variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedDynamics {
    /// Smoothed velocity, each stamped with its trailing sample's timestamp.
    pub velocity: Vec<TimedValue>,
    pub acceleration: Vec<TimedValue>,
}

/// Arithmetic mean, summed oldest to newest; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
