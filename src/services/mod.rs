//! Feature pipeline services.
//!
//! Normalizer → stitcher → assembler, with the indicator library and its
//! incremental counterpart underneath.

pub mod assembler;
pub mod indicators;
pub mod normalizer;
pub mod pipeline;
pub mod rolling;
pub mod stitcher;

pub use assembler::FeatureAssembler;
pub use indicators::{IndicatorSet, WindowIndicator, WindowSnapshot};
pub use normalizer::{normalize, normalize_value};
pub use pipeline::FeaturePipeline;
pub use rolling::RollingWindow;
pub use stitcher::{parse_target_day, stitch_day, StitchedDay};
