use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::CandleColor;

/// Supervised-learning target assigned to a row after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Label {
    Buy,
    #[default]
    Hold,
    Sell,
}

impl Label {
    /// Numeric encoding stored in the row: BUY=1, HOLD=0, SELL=-1.
    pub fn as_i8(&self) -> i8 {
        match self {
            Label::Buy => 1,
            Label::Hold => 0,
            Label::Sell => -1,
        }
    }

    pub fn from_i8(value: i8) -> Option<Self> {
        match value {
            1 => Some(Label::Buy),
            0 => Some(Label::Hold),
            -1 => Some(Label::Sell),
            _ => None,
        }
    }
}

/// One flattened feature record for a selected-day candle.
///
/// Indicator-derived fields are `None` when the candle's causal window was
/// shorter than the indicator period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    // Metadata
    pub instrument: String,
    pub timestamp: DateTime<Utc>,
    pub sequence_in_day: i32,
    pub color: CandleColor,

    // Raw OHLCV
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,

    // Geometry
    pub range_hl: f64,
    pub body_oc: f64,
    pub upper_wick: f64,
    pub lower_wick: f64,

    // Normalization; may be inf or NaN on degenerate windows
    #[serde(serialize_with = "serialize_non_finite")]
    pub range_ratio: Option<f64>,
    #[serde(serialize_with = "serialize_non_finite")]
    pub volume_ratio: Option<f64>,

    // Indicator summaries
    pub mean_velocity: Option<f64>,
    pub mean_acceleration: Option<f64>,
    pub avg_range: Option<f64>,
    pub avg_volume: Option<f64>,
    #[serde(serialize_with = "serialize_non_finite")]
    pub donchian_score: Option<f64>,

    /// Most recent first: `velocity_tail[0]` is t vs t-1.
    pub velocity_tail: Option<Vec<f64>>,
    /// Most recent first: `acceleration_tail[0]` is vel_t - vel_t1.
    pub acceleration_tail: Option<Vec<f64>>,

    pub label: i8,
}

impl FeatureRow {
    /// Copy of this row carrying the given label.
    pub fn with_label(&self, label: Label) -> Self {
        Self {
            label: label.as_i8(),
            ..self.clone()
        }
    }

    /// Whether every indicator field was computed.
    pub fn is_complete(&self) -> bool {
        self.avg_range.is_some()
            && self.donchian_score.is_some()
            && self.mean_velocity.is_some()
            && self.velocity_tail.is_some()
    }
}

/// JSON has no inf/NaN; write them as strings so they never read back as null.
fn serialize_non_finite<S: Serializer>(
    value: &Option<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) if v.is_nan() => serializer.serialize_str("NaN"),
        Some(v) if v.is_infinite() && *v > 0.0 => serializer.serialize_str("inf"),
        Some(v) if v.is_infinite() => serializer.serialize_str("-inf"),
        Some(v) => serializer.serialize_f64(*v),
        None => serializer.serialize_none(),
    }
}
