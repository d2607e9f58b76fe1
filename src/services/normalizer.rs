//! Raw candle validation and tagging.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{FeatureError, Result};
use crate::types::{Candle, CandleColor, NumberLike, RawCandle, RawTimestamp};

/// Naive formats interpreted in the reporting timezone.
const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Normalize a JSON value that must be an array of raw candle records.
pub fn normalize_value(value: &Value, offset: FixedOffset, allow_empty: bool) -> Result<Vec<Candle>> {
    let items = value
        .as_array()
        .ok_or_else(|| FeatureError::InvalidInput("OHLC data is not an array".into()))?;

    let records = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value::<RawCandle>(item.clone()).map_err(|e| {
                FeatureError::InvalidInput(format!("candle {}: unrecognized record shape: {}", i, e))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    normalize(&records, offset, allow_empty)
}

/// Validate raw records, order them by time and tag day, rank and color.
pub fn normalize(records: &[RawCandle], offset: FixedOffset, allow_empty: bool) -> Result<Vec<Candle>> {
    if records.is_empty() {
        if allow_empty {
            return Ok(Vec::new());
        }
        return Err(FeatureError::EmptyOhlc);
    }

    let mut candles = records
        .iter()
        .enumerate()
        .map(|(i, record)| validate_record(i, record, offset))
        .collect::<Result<Vec<_>>>()?;

    if candles.windows(2).any(|w| w[0].timestamp > w[1].timestamp) {
        warn!("Candle input was not in time order, sorting {} records", candles.len());
        candles.sort_by_key(|c| c.timestamp);
    }

    // Per-day 1-based rank
    let mut per_day: HashMap<NaiveDate, i32> = HashMap::new();
    for candle in candles.iter_mut() {
        let rank = per_day.entry(candle.trading_day).or_insert(0);
        *rank += 1;
        candle.sequence_in_day = *rank;
    }

    debug!(
        "Normalized {} candles across {} trading days",
        candles.len(),
        per_day.len()
    );
    Ok(candles)
}

fn validate_record(index: usize, record: &RawCandle, offset: FixedOffset) -> Result<Candle> {
    let (timestamp, open, high, low, close, volume) = match record {
        RawCandle::Positional(p) => (
            Some(&p.timestamp),
            Some(&p.open),
            Some(&p.high),
            Some(&p.low),
            Some(&p.close),
            Some(&p.volume),
        ),
        RawCandle::Named(named) => (
            named.resolved_timestamp(),
            named.open.as_ref(),
            named.high.as_ref(),
            named.low.as_ref(),
            named.close.as_ref(),
            named.resolved_volume(),
        ),
    };

    let timestamp = timestamp
        .ok_or_else(|| missing(index, "timestamp"))
        .and_then(|ts| parse_timestamp(ts, offset).map_err(|e| invalid(index, &e)))?;
    let open = price_field(index, "open", open)?;
    let high = price_field(index, "high", high)?;
    let low = price_field(index, "low", low)?;
    let close = price_field(index, "close", close)?;
    let volume = volume_field(index, volume)?;

    Ok(Candle {
        timestamp,
        trading_day: timestamp.with_timezone(&offset).date_naive(),
        open,
        high,
        low,
        close,
        volume,
        sequence_in_day: 0,
        color: CandleColor::from_open_close(open, close),
    })
}

fn price_field(index: usize, name: &str, value: Option<&NumberLike>) -> Result<f64> {
    let value = value.ok_or_else(|| missing(index, name))?;
    let number = value
        .as_f64()
        .ok_or_else(|| invalid(index, &format!("{} is not numeric: {:?}", name, value)))?;
    if !number.is_finite() || number < 0.0 {
        return Err(invalid(index, &format!("{} must be a non-negative number, got {}", name, number)));
    }
    Ok(number)
}

/// Volumes are whole shares; fractions and values past `u64` are rejected.
fn volume_field(index: usize, value: Option<&NumberLike>) -> Result<u64> {
    let value = value.ok_or_else(|| missing(index, "volume"))?;
    if let NumberLike::Text(text) = value {
        if let Ok(volume) = text.trim().parse::<u64>() {
            return Ok(volume);
        }
    }
    let number = price_field(index, "volume", Some(value))?;
    // u64::MAX as f64 rounds up to 2^64
    if number.fract() != 0.0 || number >= u64::MAX as f64 {
        return Err(invalid(index, &format!("volume must be a whole number of shares, got {}", number)));
    }
    Ok(number as u64)
}

/// Parse a raw timestamp into UTC. Naive text is read in `offset`.
pub fn parse_timestamp(raw: &RawTimestamp, offset: FixedOffset) -> std::result::Result<DateTime<Utc>, String> {
    match raw {
        RawTimestamp::Millis(ms) => Utc
            .timestamp_millis_opt(*ms)
            .single()
            .ok_or_else(|| format!("epoch millis out of range: {}", ms)),
        RawTimestamp::Text(text) => parse_timestamp_text(text.trim(), offset),
    }
}

fn parse_timestamp_text(text: &str, offset: FixedOffset) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    // Broker style offsets without a colon, e.g. +0530
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%z") {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%z") {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc))
                .ok_or_else(|| format!("ambiguous local time: {}", text));
        }
    }
    Err(format!("unparseable timestamp: {}", text))
}

fn missing(index: usize, field: &str) -> FeatureError {
    FeatureError::InvalidInput(format!("candle {}: missing {}", index, field))
}

fn invalid(index: usize, reason: &str) -> FeatureError {
    FeatureError::InvalidInput(format!("candle {}: {}", index, reason))
}
