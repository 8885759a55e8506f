//! Multi-period population projection

use super::population::PopulationVector;
use super::transition::TransitionMatrix;
use super::{DEFAULT_CONSERVATION_TOLERANCE, DEFAULT_HORIZON};
use crate::error::{ClvError, ClvResult, ModelWarning};
use crate::segments::SegmentCatalog;

/// Configuration for a projection run
#[derive(Debug, Clone)]
pub struct ProjectionConfig {
    /// Number of future periods to project
    pub horizon: usize,

    /// Allowed drift of the projected total, relative to the starting total
    pub conservation_tolerance: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            horizon: DEFAULT_HORIZON,
            conservation_tolerance: DEFAULT_CONSERVATION_TOLERANCE,
        }
    }
}

impl ProjectionConfig {
    pub fn validate(&self) -> ClvResult<()> {
        if self.horizon == 0 {
            return Err(ClvError::InvalidInput("horizon must be at least one period".into()));
        }
        if !self.conservation_tolerance.is_finite() || self.conservation_tolerance < 0.0 {
            return Err(ClvError::InvalidInput(format!(
                "conservation tolerance must be a non-negative number, got {}",
                self.conservation_tolerance
            )));
        }
        Ok(())
    }
}

/// Observed population followed by projected periods
#[derive(Debug, Clone)]
pub struct PopulationProjection {
    /// Period 0 is the observed population
    periods: Vec<PopulationVector>,

    /// Whether every period kept the starting total within tolerance
    conserved: bool,

    warnings: Vec<ModelWarning>,
}

impl PopulationProjection {
    pub fn periods(&self) -> &[PopulationVector] {
        &self.periods
    }

    pub fn period(&self, i: usize) -> Option<&PopulationVector> {
        self.periods.get(i)
    }

    pub fn catalog(&self) -> &SegmentCatalog {
        self.periods[0].catalog()
    }

    /// Number of projected periods (excluding period 0)
    pub fn horizon(&self) -> usize {
        self.periods.len() - 1
    }

    pub fn is_conserved(&self) -> bool {
        self.conserved
    }

    pub fn warnings(&self) -> &[ModelWarning] {
        &self.warnings
    }

    /// Total population per period
    pub fn totals(&self) -> Vec<f64> {
        self.periods.iter().map(|p| p.total()).collect()
    }
}

/// Applies a transition matrix repeatedly to a starting population
pub struct PopulationProjector {
    config: ProjectionConfig,
}

impl PopulationProjector {
    pub fn new(config: ProjectionConfig) -> Self {
        Self { config }
    }

    /// Project `initial` forward for the configured horizon
    ///
    /// Each period is a new vector computed from the previous one. Periods
    /// whose total moves away from the starting total are reported as
    /// warnings; the projection still completes.
    pub fn project(
        &self,
        initial: &PopulationVector,
        transition: &TransitionMatrix,
    ) -> ClvResult<PopulationProjection> {
        self.config.validate()?;
        initial.catalog().ensure_same(transition.catalog())?;

        let expected = initial.total();
        let allowed = self.config.conservation_tolerance * expected.max(1.0);

        let mut periods = Vec::with_capacity(self.config.horizon + 1);
        let mut warnings = Vec::new();
        periods.push(initial.clone());

        for period in 1..=self.config.horizon {
            let next = periods[period - 1].step(transition)?;
            let actual = next.total();
            log::debug!("Period {}: projected population {:.4}", period, actual);

            if (actual - expected).abs() > allowed {
                log::warn!(
                    "Period {} population {:.4} drifted from starting total {:.4}",
                    period,
                    actual,
                    expected
                );
                warnings.push(ModelWarning::PopulationConservation { period, expected, actual });
            }
            periods.push(next);
        }

        Ok(PopulationProjection {
            periods,
            conserved: warnings.is_empty(),
            warnings,
        })
    }
}
