//! End-to-end feature pipeline: normalize, stitch, assemble.

use chrono::{FixedOffset, NaiveDate};
use serde_json::Value;
use tracing::{debug, info, info_span};

use super::assembler::FeatureAssembler;
use super::indicators::smoothed_dynamics;
use super::normalizer::normalize_value;
use super::stitcher::{parse_target_day, stitch_day};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::types::{Candle, FeatureRow, TimedDynamics, TimedValue};

/// Converts one instrument's candle history into feature rows for a day.
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    config: PipelineConfig,
    offset: FixedOffset,
    assembler: FeatureAssembler,
}

impl FeaturePipeline {
    /// Create a pipeline, rejecting configurations no indicator can run with.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let offset = config.reporting_offset()?;
        let assembler = FeatureAssembler::new(&config)?;
        Ok(Self {
            config,
            offset,
            assembler,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Normalize raw JSON candle records using this pipeline's timezone.
    pub fn normalize(&self, raw: &Value) -> Result<Vec<Candle>> {
        normalize_value(raw, self.offset, false)
    }

    /// Run on raw JSON records and a textual target day.
    pub fn run(&self, instrument: &str, raw: &Value, target_day: &str) -> Result<Vec<FeatureRow>> {
        let day = parse_target_day(target_day, self.offset)?;
        let candles = self.normalize(raw)?;
        self.run_candles(instrument, &candles, day)
    }

    /// Run on already normalized candles.
    pub fn run_candles(
        &self,
        instrument: &str,
        candles: &[Candle],
        day: NaiveDate,
    ) -> Result<Vec<FeatureRow>> {
        let span = info_span!("featurize", instrument, %day);
        let _guard = span.enter();

        let stitched = stitch_day(candles, day, self.config.seed_length)?;
        let rows = self.assembler.assemble(instrument, &stitched)?;

        info!(
            "Built {} feature rows from {} candles ({} seed)",
            rows.len(),
            candles.len(),
            stitched.seed.len()
        );
        Ok(rows)
    }

    /// Smoothed close velocity and acceleration over the stitched day.
    ///
    /// Samples are the seed and selected-day closes in order; the SMA period
    /// comes from `smoothing_period`.
    pub fn timed_dynamics(&self, candles: &[Candle], day: NaiveDate) -> Result<TimedDynamics> {
        let stitched = stitch_day(candles, day, self.config.seed_length)?;
        let samples: Vec<TimedValue> = stitched.fused().iter().map(TimedValue::from).collect();
        let dynamics = smoothed_dynamics(&samples, self.config.smoothing_period)?;

        debug!(
            "Smoothed {} close samples for {} into {} velocities",
            samples.len(),
            day,
            dynamics.velocity.len()
        );
        Ok(dynamics)
    }
}
