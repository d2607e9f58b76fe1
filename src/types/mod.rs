pub mod candle;
pub mod feature;
pub mod indicator;

pub use candle::*;
pub use feature::*;
pub use indicator::*;
