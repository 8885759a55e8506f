//! Model configuration
//!
//! Loaded from JSON, with every field optional:
//!
//! ```json
//! {
//!   "discount_rate": 0.10,
//!   "horizon": 10,
//!   "zero_row_policy": "identity",
//!   "absent_policy": "absorbing_segment",
//!   "conservation_tolerance": 1e-6
//! }
//! ```

use crate::error::{ClvError, ClvResult};
use crate::projection::{
    AbsentPolicy, ProjectionConfig, TransitionBuilder, ZeroRowPolicy, DEFAULT_CONSERVATION_TOLERANCE,
    DEFAULT_HORIZON,
};
use crate::segments::SegmentationRules;
use crate::valuation::{DiscountSeries, DEFAULT_DISCOUNT_RATE};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Discount rate per projected period
    pub discount_rate: f64,

    /// Number of projected periods
    pub horizon: usize,

    pub zero_row_policy: ZeroRowPolicy,

    pub absent_policy: AbsentPolicy,

    /// Allowed population drift, relative to the starting total
    pub conservation_tolerance: f64,

    /// Thresholds used when segmenting raw purchases
    pub segmentation: SegmentationRules,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            discount_rate: DEFAULT_DISCOUNT_RATE,
            horizon: DEFAULT_HORIZON,
            zero_row_policy: ZeroRowPolicy::default(),
            absent_policy: AbsentPolicy::default(),
            conservation_tolerance: DEFAULT_CONSERVATION_TOLERANCE,
            segmentation: SegmentationRules::default(),
        }
    }
}

impl ModelConfig {
    /// Load configuration from a JSON file
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> ClvResult<Self> {
        let file = std::fs::File::open(path)?;
        let config: Self = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    /// Check numeric inputs before any computation runs
    pub fn validate(&self) -> ClvResult<()> {
        if !self.discount_rate.is_finite() || self.discount_rate < 0.0 {
            return Err(ClvError::InvalidInput(format!(
                "discount rate must be a non-negative number, got {}",
                self.discount_rate
            )));
        }
        self.projection_config().validate()?;

        let rules = &self.segmentation;
        if !(rules.warm_after_days < rules.cold_after_days && rules.cold_after_days < rules.inactive_after_days) {
            return Err(ClvError::InvalidInput(
                "segmentation thresholds must increase from warm to cold to inactive".into(),
            ));
        }
        Ok(())
    }

    pub fn projection_config(&self) -> ProjectionConfig {
        ProjectionConfig {
            horizon: self.horizon,
            conservation_tolerance: self.conservation_tolerance,
        }
    }

    pub fn transition_builder(&self) -> TransitionBuilder {
        TransitionBuilder::new(self.zero_row_policy, self.absent_policy)
    }

    pub fn discount_series(&self) -> ClvResult<DiscountSeries> {
        DiscountSeries::new(self.discount_rate, self.horizon)
    }
}
