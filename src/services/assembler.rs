//! Per-candle feature row assembly.

use tracing::debug;

use super::indicators::{IndicatorSet, WindowSnapshot};
use super::rolling::RollingWindow;
use super::stitcher::StitchedDay;
use crate::config::{ComputeMode, InsufficientHistoryPolicy, PipelineConfig};
use crate::error::Result;
use crate::types::{Candle, FeatureRow, Label};

/// Builds one feature row per selected-day candle from its causal window.
#[derive(Debug, Clone)]
pub struct FeatureAssembler {
    indicators: IndicatorSet,
    policy: InsufficientHistoryPolicy,
    mode: ComputeMode,
    velocity_width: usize,
    acceleration_width: usize,
}

impl FeatureAssembler {
    /// Build an assembler for `config`, rejecting periods no indicator can run with.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            indicators: IndicatorSet::from_config(config),
            policy: config.insufficient_history,
            mode: config.compute_mode,
            velocity_width: config.velocity_tail_width(),
            acceleration_width: config.acceleration_tail_width(),
        })
    }

    /// Rows for every candle of the stitched day, in day order.
    ///
    /// Window `i` is `seed ++ selected_day[..=i]`; seed candles count toward
    /// every indicator's minimum period.
    pub fn assemble(&self, instrument: &str, stitched: &StitchedDay) -> Result<Vec<FeatureRow>> {
        let fused = stitched.fused();
        let seed_len = stitched.seed.len();
        let mut rows = Vec::with_capacity(stitched.selected_day.len());
        let mut skipped = 0usize;

        let mut rolling = RollingWindow::new(self.indicators);
        for candle in &stitched.seed {
            rolling.push(candle);
        }

        for (i, candle) in stitched.selected_day.iter().enumerate() {
            let snapshot = match self.mode {
                ComputeMode::Rolling => {
                    rolling.push(candle);
                    rolling.snapshot()
                }
                ComputeMode::Recompute => self.indicators.snapshot(&fused[..=seed_len + i]),
            };

            if let Some(err) = snapshot.first_error() {
                // Only a short window is subject to the policy
                if !err.is_insufficient_history() {
                    return Err(err.clone());
                }
                match self.policy {
                    InsufficientHistoryPolicy::Fail => return Err(err.clone()),
                    InsufficientHistoryPolicy::Skip => {
                        skipped += 1;
                        continue;
                    }
                    InsufficientHistoryPolicy::Null => {}
                }
            }

            rows.push(self.build_row(instrument, candle, snapshot));
        }

        debug!(
            "Assembled {} rows for {} ({} skipped, {:?} mode)",
            rows.len(),
            stitched.day,
            skipped,
            self.mode
        );
        Ok(rows)
    }

    fn build_row(&self, instrument: &str, candle: &Candle, snapshot: WindowSnapshot) -> FeatureRow {
        let range_hl = candle.range();
        let range_volume = snapshot.range_volume.ok();
        let donchian = snapshot.donchian.ok();
        let dynamics = snapshot.dynamics.ok();

        let velocity_tail = dynamics
            .as_ref()
            .map(|d| recent_first(&d.velocity, self.velocity_width));
        let acceleration_tail = dynamics
            .as_ref()
            .map(|d| recent_first(&d.acceleration, self.acceleration_width));

        FeatureRow {
            instrument: instrument.to_string(),
            timestamp: candle.timestamp,
            sequence_in_day: candle.sequence_in_day,
            color: candle.color,
            open: candle.open,
            high: candle.high,
            low: candle.low,
            close: candle.close,
            volume: candle.volume,
            range_hl,
            body_oc: candle.body(),
            upper_wick: candle.upper_wick(),
            lower_wick: candle.lower_wick(),
            // Zero denominators stay inf/NaN on purpose
            range_ratio: range_volume.map(|rv| range_hl / rv.avg_range),
            volume_ratio: range_volume.map(|rv| candle.volume as f64 / rv.avg_volume),
            mean_velocity: dynamics.as_ref().and_then(|d| d.avg_velocity),
            mean_acceleration: dynamics.as_ref().and_then(|d| d.avg_acceleration),
            avg_range: range_volume.map(|rv| rv.avg_range),
            avg_volume: range_volume.map(|rv| rv.avg_volume),
            donchian_score: donchian.map(|d| d.score),
            velocity_tail,
            acceleration_tail,
            label: Label::Hold.as_i8(),
        }
    }
}

/// The last `width` values, newest first, zero-padded at the old end.
fn recent_first(values: &[f64], width: usize) -> Vec<f64> {
    let mut tail: Vec<f64> = values.iter().rev().take(width).copied().collect();
    tail.resize(width, 0.0);
    tail
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeatureError;
    use crate::services::indicators::AvgTrueRange;
    use crate::services::stitcher::stitch_day;
    use crate::types::CandleColor;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn create_history(days: &[(u32, usize)]) -> Vec<Candle> {
        let mut candles = Vec::new();
        for &(d, count) in days {
            let open = Utc.with_ymd_and_hms(2026, 1, d, 3, 45, 0).unwrap();
            for i in 0..count {
                let base = 100.0 + i as f64;
                candles.push(Candle {
                    timestamp: open + Duration::minutes(i as i64),
                    trading_day: day(d),
                    open: base,
                    high: base + 1.5,
                    low: base - 0.5,
                    close: base + 1.0,
                    volume: 1000 + i as u64,
                    sequence_in_day: i as i32 + 1,
                    color: CandleColor::Green,
                });
            }
        }
        candles
    }

    fn config_with(policy: InsufficientHistoryPolicy) -> PipelineConfig {
        PipelineConfig {
            insufficient_history: policy,
            ..Default::default()
        }
    }

    #[test]
    fn test_recent_first_pads_and_truncates() {
        assert_eq!(recent_first(&[1.0, 2.0, 3.0], 5), vec![3.0, 2.0, 1.0, 0.0, 0.0]);
        assert_eq!(recent_first(&[1.0, 2.0, 3.0], 2), vec![3.0, 2.0]);
        assert_eq!(recent_first(&[], 2), vec![0.0, 0.0]);
    }

    #[test]
    fn test_assemble_full_seed() {
        let history = create_history(&[(14, 30), (15, 12)]);
        let stitched = stitch_day(&history, day(15), 20).unwrap();
        let assembler = FeatureAssembler::new(&PipelineConfig::default()).unwrap();
        let rows = assembler.assemble("ONGC", &stitched).unwrap();

        assert_eq!(rows.len(), 12);
        assert!(rows.iter().all(FeatureRow::is_complete));
        let ranks: Vec<i32> = rows.iter().map(|r| r.sequence_in_day).collect();
        assert_eq!(ranks, (1..=12).collect::<Vec<_>>());

        let first = &rows[0];
        assert_eq!(first.instrument, "ONGC");
        assert_eq!(first.label, 0);
        assert_eq!(first.range_hl, 2.0);
        assert_eq!(first.body_oc, 1.0);
        assert_eq!(first.upper_wick, 0.5);
        assert_eq!(first.lower_wick, 0.5);
        assert_eq!(first.avg_range, Some(2.0));
        assert_eq!(first.range_ratio, Some(1.0));
        assert_eq!(first.velocity_tail.as_ref().unwrap().len(), 9);
        assert_eq!(first.acceleration_tail.as_ref().unwrap().len(), 8);
    }

    #[test]
    fn test_first_row_window_includes_seed() {
        let history = create_history(&[(14, 30), (15, 1)]);
        let stitched = stitch_day(&history, day(15), 20).unwrap();
        let assembler = FeatureAssembler::new(&PipelineConfig::default()).unwrap();
        let rows = assembler.assemble("ONGC", &stitched).unwrap();

        // Prior-day volumes 1026..=1029 plus today's 1000
        let expected = (1026 + 1027 + 1028 + 1029 + 1000) as f64 / 5.0;
        assert_eq!(rows[0].avg_volume, Some(expected));
        assert_eq!(rows[0].volume_ratio, Some(1000.0 / expected));
    }

    #[test]
    fn test_velocity_tail_most_recent_first() {
        let history = create_history(&[(14, 30), (15, 3)]);
        let stitched = stitch_day(&history, day(15), 20).unwrap();
        let assembler = FeatureAssembler::new(&PipelineConfig::default()).unwrap();
        let rows = assembler.assemble("ONGC", &stitched).unwrap();

        // Last selected close 103, the one before 102
        let tail = rows[2].velocity_tail.as_ref().unwrap();
        assert!((tail[0] - (103.0 - 102.0) / 102.0 * 100.0).abs() < 1e-12);
        let acc = rows[2].acceleration_tail.as_ref().unwrap();
        assert!((acc[0] - (tail[0] - tail[1])).abs() < 1e-12);
    }

    #[test]
    fn test_null_policy_short_seed() {
        let history = create_history(&[(14, 5), (15, 20)]);
        let stitched = stitch_day(&history, day(15), 20).unwrap();
        let assembler = FeatureAssembler::new(&config_with(InsufficientHistoryPolicy::Null)).unwrap();
        let rows = assembler.assemble("ONGC", &stitched).unwrap();

        assert_eq!(rows.len(), 20);
        // Window of 6 candles: ATR ready, velocity and Donchian not
        assert!(rows[0].avg_range.is_some());
        assert!(rows[0].mean_velocity.is_none());
        assert!(rows[0].velocity_tail.is_none());
        assert!(rows[0].donchian_score.is_none());
        // Window of 10 candles: velocity ready
        assert!(rows[4].velocity_tail.is_some());
        assert!(rows[4].donchian_score.is_none());
        // Window of 20 candles: everything ready
        assert!(rows[14].donchian_score.is_some());
        assert!(rows[14].is_complete());
    }

    #[test]
    fn test_skip_policy_drops_short_rows() {
        let history = create_history(&[(14, 5), (15, 20)]);
        let stitched = stitch_day(&history, day(15), 20).unwrap();
        let assembler = FeatureAssembler::new(&config_with(InsufficientHistoryPolicy::Skip)).unwrap();
        let rows = assembler.assemble("ONGC", &stitched).unwrap();

        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].sequence_in_day, 15);
        assert!(rows.iter().all(FeatureRow::is_complete));
    }

    #[test]
    fn test_fail_policy_errors() {
        let history = create_history(&[(14, 5), (15, 20)]);
        let stitched = stitch_day(&history, day(15), 20).unwrap();
        let assembler = FeatureAssembler::new(&config_with(InsufficientHistoryPolicy::Fail)).unwrap();
        let err = assembler.assemble("ONGC", &stitched).unwrap_err();
        assert_eq!(
            err,
            FeatureError::InsufficientHistory {
                indicator: "donchian_channel",
                needed: 20,
                available: 6,
            }
        );
    }

    #[test]
    fn test_fail_policy_passes_with_full_seed() {
        let history = create_history(&[(14, 25), (15, 5)]);
        let stitched = stitch_day(&history, day(15), 20).unwrap();
        let assembler = FeatureAssembler::new(&config_with(InsufficientHistoryPolicy::Fail)).unwrap();
        assert_eq!(assembler.assemble("ONGC", &stitched).unwrap().len(), 5);
    }

    #[test]
    fn test_empty_selected_day() {
        let history = create_history(&[(14, 25)]);
        let stitched = stitch_day(&history, day(15), 20).unwrap();
        let assembler = FeatureAssembler::new(&PipelineConfig::default()).unwrap();
        assert!(assembler.assemble("ONGC", &stitched).unwrap().is_empty());
    }

    #[test]
    fn test_new_rejects_invalid_periods() {
        for policy in [
            InsufficientHistoryPolicy::Null,
            InsufficientHistoryPolicy::Skip,
            InsufficientHistoryPolicy::Fail,
        ] {
            let config = PipelineConfig {
                atr_period: 0,
                insufficient_history: policy,
                ..Default::default()
            };
            assert!(matches!(
                FeatureAssembler::new(&config),
                Err(FeatureError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_new_rejects_short_tail_without_panicking() {
        let config = PipelineConfig {
            tail_samples: 0,
            ..Default::default()
        };
        assert!(matches!(
            FeatureAssembler::new(&config),
            Err(FeatureError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_non_history_errors_bypass_policy() {
        let history = create_history(&[(14, 30), (15, 5)]);
        let stitched = stitch_day(&history, day(15), 20).unwrap();

        // A zero period slipped past validation surfaces as an error under every policy
        for policy in [InsufficientHistoryPolicy::Null, InsufficientHistoryPolicy::Skip] {
            let mut assembler = FeatureAssembler::new(&config_with(policy)).unwrap();
            assembler.indicators.atr = AvgTrueRange::new(0);
            assert!(matches!(
                assembler.assemble("ONGC", &stitched),
                Err(FeatureError::InvalidInput(_))
            ));
        }
    }
}
