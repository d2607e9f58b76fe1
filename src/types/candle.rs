use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Qualitative body color of a candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CandleColor {
    Green,
    Red,
    Doji,
}

impl CandleColor {
    /// Classify by comparing close with open.
    pub fn from_open_close(open: f64, close: f64) -> Self {
        if close > open {
            CandleColor::Green
        } else if close < open {
            CandleColor::Red
        } else {
            CandleColor::Doji
        }
    }
}

impl fmt::Display for CandleColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandleColor::Green => write!(f, "GREEN"),
            CandleColor::Red => write!(f, "RED"),
            CandleColor::Doji => write!(f, "DOJI"),
        }
    }
}

/// One normalized one-minute OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    /// Calendar date of `timestamp` in the reporting timezone.
    pub trading_day: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    /// 1-based rank within the trading day; negative for stitched prior-day candles.
    pub sequence_in_day: i32,
    pub color: CandleColor,
}

impl Candle {
    /// High minus low.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Close minus open (signed).
    pub fn body(&self) -> f64 {
        self.close - self.open
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// Copy of this candle carrying a different rank.
    pub fn with_sequence(&self, sequence_in_day: i32) -> Self {
        Self {
            sequence_in_day,
            ..self.clone()
        }
    }
}

/// A price field that may arrive as a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberLike {
    Number(f64),
    Text(String),
}

impl NumberLike {
    /// Numeric value, if the text form parses.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NumberLike::Number(n) => Some(*n),
            NumberLike::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// A timestamp given as epoch milliseconds or as text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Millis(i64),
    Text(String),
}

/// Named-field candle record, as returned by broker APIs or read from CSV.
///
/// Brokers disagree on field names: `date` wins over `timestamp` and
/// `volume` over `volume_traded` when a record carries both.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NamedCandle {
    pub date: Option<RawTimestamp>,
    pub timestamp: Option<RawTimestamp>,
    pub open: Option<NumberLike>,
    pub high: Option<NumberLike>,
    pub low: Option<NumberLike>,
    pub close: Option<NumberLike>,
    pub volume: Option<NumberLike>,
    pub volume_traded: Option<NumberLike>,
}

impl NamedCandle {
    pub fn resolved_timestamp(&self) -> Option<&RawTimestamp> {
        self.date.as_ref().or(self.timestamp.as_ref())
    }

    pub fn resolved_volume(&self) -> Option<&NumberLike> {
        self.volume.as_ref().or(self.volume_traded.as_ref())
    }
}

/// `[timestamp, open, high, low, close, volume, ...]`; trailing columns
/// such as open interest are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionalCandle {
    pub timestamp: RawTimestamp,
    pub open: NumberLike,
    pub high: NumberLike,
    pub low: NumberLike,
    pub close: NumberLike,
    pub volume: NumberLike,
}

// Broker rows arrive as arrays, sometimes with extra trailing columns
impl<'de> Deserialize<'de> for PositionalCandle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        let arr: Vec<Value> = Vec::deserialize(deserializer)?;

        if arr.len() < 6 {
            return Err(D::Error::invalid_length(arr.len(), &"at least six candle fields"));
        }

        let number = |v: &Value| -> Result<NumberLike, D::Error> {
            NumberLike::deserialize(v).map_err(D::Error::custom)
        };

        Ok(PositionalCandle {
            timestamp: RawTimestamp::deserialize(&arr[0]).map_err(D::Error::custom)?,
            open: number(&arr[1])?,
            high: number(&arr[2])?,
            low: number(&arr[3])?,
            close: number(&arr[4])?,
            volume: number(&arr[5])?,
        })
    }
}

/// A candle record before validation, in either accepted shape.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawCandle {
    Positional(PositionalCandle),
    Named(NamedCandle),
}

/// A generic `{value, timestamp}` sample for the timed velocity variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedValue {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl TimedValue {
    pub fn new(value: f64, timestamp: DateTime<Utc>) -> Self {
        Self { value, timestamp }
    }
}

impl From<&Candle> for TimedValue {
    fn from(candle: &Candle) -> Self {
        Self::new(candle.close, candle.timestamp)
    }
}
