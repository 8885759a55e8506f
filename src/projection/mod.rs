//! Segment transition model and population projection

mod population;
mod transition;
mod engine;

pub use population::PopulationVector;
pub use transition::{
    AbsentPolicy, TransitionBuilder, TransitionCounts, TransitionMatrix, ZeroRowPolicy,
    ROW_SUM_TOLERANCE,
};
pub use engine::{PopulationProjection, PopulationProjector, ProjectionConfig};

/// Default number of projected periods (years)
pub const DEFAULT_HORIZON: usize = 10;

/// Default allowed population drift, relative to the starting total
pub const DEFAULT_CONSERVATION_TOLERANCE: f64 = 1e-6;
