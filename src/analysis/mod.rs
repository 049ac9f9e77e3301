//! Analysis modules.
//!
//! Pure computations over case records: grouping and summing, derived
//! ratios, and the seasonal monthly estimate.

pub mod aggregator;
pub mod metrics;
pub mod seasonal;

pub use aggregator::*;
