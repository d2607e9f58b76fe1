//! Day partitioning and prior-day seeding.

use chrono::{DateTime, FixedOffset, NaiveDate};
use tracing::{debug, warn};

use crate::error::{FeatureError, Result};
use crate::types::Candle;

/// A selected trading day together with its prior-day seed buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct StitchedDay {
    pub day: NaiveDate,
    /// Last prior-day candles, ranked `-len..=-1`.
    pub seed: Vec<Candle>,
    /// Candles of `day`, ranked `1..=len`.
    pub selected_day: Vec<Candle>,
    /// Number of candles available before `day`, seeded or not.
    pub prior_count: usize,
}

impl StitchedDay {
    /// `seed ++ selected_day`, the sequence indicator windows grow over.
    pub fn fused(&self) -> Vec<Candle> {
        let mut fused = Vec::with_capacity(self.seed.len() + self.selected_day.len());
        fused.extend_from_slice(&self.seed);
        fused.extend_from_slice(&self.selected_day);
        fused
    }
}

/// Parse a target day as `YYYY-MM-DD`, or as an RFC 3339 instant whose
/// calendar date is taken in `offset`.
pub fn parse_target_day(input: &str, offset: FixedOffset) -> Result<NaiveDate> {
    let trimmed = input.trim();
    if let Ok(day) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(day);
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(instant.with_timezone(&offset).date_naive());
    }
    Err(FeatureError::InvalidDate(format!("Date provided is invalid: {:?}", input)))
}

/// Split `history` around `day` and take the last `seed_length` prior candles.
///
/// Prior candles are ranked backward across the whole prior block, so the
/// candle immediately before `day` is `-1`. Candles after `day` are ignored.
pub fn stitch_day(history: &[Candle], day: NaiveDate, seed_length: usize) -> Result<StitchedDay> {
    if history.is_empty() {
        return Err(FeatureError::EmptyOhlc);
    }

    let selected_day: Vec<Candle> = history
        .iter()
        .filter(|c| c.trading_day == day)
        .enumerate()
        .map(|(i, c)| c.with_sequence(i as i32 + 1))
        .collect();

    let mut prior = rank_prior_days(history, day);
    let prior_count = prior.len();
    let seed = prior.split_off(prior_count.saturating_sub(seed_length));

    if selected_day.is_empty() {
        warn!("No candles found for {}", day);
    }
    if seed.len() < seed_length {
        warn!(
            "Only {} prior candles available to seed {} (wanted {})",
            seed.len(),
            day,
            seed_length
        );
    }
    debug!(
        "Stitched {}: {} seed + {} selected candles ({} prior total)",
        day,
        seed.len(),
        selected_day.len(),
        prior_count
    );

    Ok(StitchedDay {
        day,
        seed,
        selected_day,
        prior_count,
    })
}

/// Every prior candle ranked backward from `-1` at the day boundary.
pub fn rank_prior_days(history: &[Candle], day: NaiveDate) -> Vec<Candle> {
    let prior: Vec<&Candle> = history.iter().filter(|c| c.trading_day < day).collect();
    let count = prior.len();
    prior
        .iter()
        .enumerate()
        .map(|(i, c)| c.with_sequence(-((count - i) as i32)))
        .collect()
}
