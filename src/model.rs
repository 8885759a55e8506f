//! End-to-end customer lifetime value model
//!
//! Ties the chain together: two periods of segment assignments give a
//! transition matrix, the later period gives the starting population, and
//! the projected populations are valued with per-segment revenue.
//!
//! # Example
//! ```ignore
//! let purchases = load_purchases("purchases.txt")?;
//! let inputs = PeriodInputs::from_purchases(&purchases, reference_date, &config.segmentation)?;
//! let model = ClvModel::new(config)?;
//! let report = model.run(&inputs)?;
//! println!("Customer base value: {:.0}", report.customer_base_value());
//! ```

use crate::config::ModelConfig;
use crate::error::{ClvResult, ModelWarning};
use crate::projection::{
    AbsentPolicy, PopulationProjection, PopulationProjector, PopulationVector, TransitionMatrix,
};
use crate::purchases::{Purchase, PurchaseAggregator, PERIOD_DAYS};
use crate::segments::{SegmentAssignments, SegmentationRules};
use crate::valuation::{DiscountSeries, RevenuePerSegment, RevenueSeries, RevenueValuator};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;

/// Assignments for two consecutive periods plus the revenue each segment earns
#[derive(Debug, Clone)]
pub struct PeriodInputs {
    /// Period t
    pub previous: SegmentAssignments,
    /// Period t+1, also the starting population
    pub current: SegmentAssignments,
    pub revenue: RevenuePerSegment,
}

impl PeriodInputs {
    /// Segment customers one year before and at `reference_date`
    ///
    /// Revenue per segment is the mean revenue earned in the year ending at
    /// the reference date by the customers currently in each segment, so
    /// period 0 of the projection values the population that produced it.
    pub fn from_purchases(
        purchases: &[Purchase],
        reference_date: NaiveDate,
        rules: &SegmentationRules,
    ) -> ClvResult<Self> {
        let aggregator = PurchaseAggregator::new(purchases, reference_date);

        let previous = rules.assign(&aggregator.customer_summaries(PERIOD_DAYS))?;
        let current = rules.assign(&aggregator.customer_summaries(0))?;
        let revenue = RevenuePerSegment::observed(&current, &aggregator.period_revenue(0))?;

        log::info!(
            "Prepared {} prior-period and {} current customers as of {}",
            previous.len(),
            current.len(),
            reference_date
        );

        Ok(Self { previous, current, revenue })
    }
}

/// Transition matrix together with the population it projects
#[derive(Debug, Clone)]
pub struct ModelProjection {
    pub transition: TransitionMatrix,
    pub projection: PopulationProjection,
    pub revenue: RevenuePerSegment,
}

impl ModelProjection {
    /// Warnings from building the matrix and projecting, in that order
    pub fn warnings(&self) -> Vec<ModelWarning> {
        self.transition
            .warnings()
            .iter()
            .chain(self.projection.warnings())
            .cloned()
            .collect()
    }
}

/// Customer base value under one discount rate
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioValue {
    pub discount_rate: f64,
    pub revenue: RevenueSeries,
}

/// Complete model output
#[derive(Debug, Clone, Serialize)]
pub struct ClvReport {
    /// Segment labels in matrix and vector order
    pub segments: Vec<String>,
    pub discount_rate: f64,
    pub horizon: usize,
    /// Rows = from segment, columns = to segment
    pub transition: Vec<Vec<f64>>,
    /// Index = period, inner index = segment
    pub populations: Vec<Vec<f64>>,
    pub revenue_per_segment: Vec<f64>,
    pub revenue: RevenueSeries,
    pub population_conserved: bool,
    pub warnings: Vec<ModelWarning>,
    /// Same projection valued at alternative discount rates
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scenarios: Vec<ScenarioValue>,
}

impl ClvReport {
    pub fn customer_base_value(&self) -> f64 {
        self.revenue.customer_base_value
    }

    /// Projected population of a segment in a period
    pub fn population(&self, period: usize, segment: &str) -> Option<f64> {
        let idx = self.segments.iter().position(|s| s == segment)?;
        self.populations.get(period).map(|p| p[idx])
    }
}

/// Runs the transition, projection and valuation steps
#[derive(Debug, Clone)]
pub struct ClvModel {
    config: ModelConfig,
}

impl ClvModel {
    pub fn new(config: ModelConfig) -> ClvResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Build the transition matrix and project the current population
    pub fn project(&self, inputs: &PeriodInputs) -> ClvResult<ModelProjection> {
        let catalog = inputs.previous.catalog();
        catalog.ensure_same(inputs.current.catalog())?;
        catalog.ensure_same(inputs.revenue.catalog())?;

        // Absent customers need a slot of their own in every matrix and vector
        let catalog = match self.config.absent_policy {
            AbsentPolicy::AbsorbingSegment => catalog.with_absent_outcome(),
            AbsentPolicy::ExcludeFromRow => catalog.clone(),
        };
        let previous = inputs.previous.reindexed(&catalog)?;
        let current = inputs.current.reindexed(&catalog)?;
        let revenue = inputs.revenue.reindexed(&catalog)?;

        let transition = self.config.transition_builder().build(&previous, &current)?;
        let initial = PopulationVector::from_assignments(&current);
        let projection =
            PopulationProjector::new(self.config.projection_config()).project(&initial, &transition)?;

        Ok(ModelProjection { transition, projection, revenue })
    }

    /// Run the full model with the configured discount rate
    pub fn run(&self, inputs: &PeriodInputs) -> ClvResult<ClvReport> {
        self.run_with_scenarios(inputs, &[])
    }

    /// Run the full model and value the same projection at each of `rates`
    ///
    /// All rates are validated before anything is projected.
    pub fn run_with_scenarios(&self, inputs: &PeriodInputs, rates: &[f64]) -> ClvResult<ClvReport> {
        log::info!(
            "Running CLV model: horizon {}, discount rate {}",
            self.config.horizon,
            self.config.discount_rate
        );

        let discount = self.config.discount_series()?;
        let scenario_discounts = self.scenario_discounts(rates)?;

        let model = self.project(inputs)?;
        let revenue = RevenueValuator::new(&model.revenue).value(&model.projection, &discount)?;
        let scenarios = value_scenarios(&model, &scenario_discounts)?;

        log::info!("Customer base value: {:.2}", revenue.customer_base_value);

        Ok(ClvReport {
            segments: model.projection.catalog().labels().to_vec(),
            discount_rate: self.config.discount_rate,
            horizon: self.config.horizon,
            transition: model.transition.rows().to_vec(),
            populations: model
                .projection
                .periods()
                .iter()
                .map(|p| p.values().to_vec())
                .collect(),
            revenue_per_segment: model.revenue.values().to_vec(),
            revenue,
            population_conserved: model.projection.is_conserved(),
            warnings: model.warnings(),
            scenarios,
        })
    }

    /// Value one projection under several discount rates
    ///
    /// Every rate is validated before anything is projected. The projection
    /// is computed once; each rate is valued in parallel.
    pub fn run_scenarios(&self, inputs: &PeriodInputs, rates: &[f64]) -> ClvResult<Vec<ScenarioValue>> {
        let discounts = self.scenario_discounts(rates)?;
        let model = self.project(inputs)?;
        value_scenarios(&model, &discounts)
    }

    fn scenario_discounts(&self, rates: &[f64]) -> ClvResult<Vec<DiscountSeries>> {
        rates
            .iter()
            .map(|&rate| DiscountSeries::new(rate, self.config.horizon))
            .collect()
    }
}

fn value_scenarios(model: &ModelProjection, discounts: &[DiscountSeries]) -> ClvResult<Vec<ScenarioValue>> {
    let valuator = RevenueValuator::new(&model.revenue);
    discounts
        .par_iter()
        .map(|discount| -> ClvResult<ScenarioValue> {
            Ok(ScenarioValue {
                discount_rate: discount.rate(),
                revenue: valuator.value(&model.projection, discount)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClvError;
    use crate::projection::ZeroRowPolicy;
    use crate::purchases::load_purchases_from_reader;
    use crate::segments::{SegmentCatalog, ABSENT_LABEL};
    use approx::assert_relative_eq;

    const PURCHASES: &str = "\
1\t150\t2010-03-01
1\t120\t2014-05-10
1\t200\t2015-07-01
2\t40\t2014-11-20
2\t35\t2015-02-14
3\t60\t2012-08-08
4\t500\t2013-01-15
4\t450\t2015-11-30
5\t25\t2015-06-06
6\t80\t2011-04-04
7\t300\t2014-02-02
";

    fn reference_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2016, 1, 1).unwrap()
    }

    fn purchase_inputs() -> PeriodInputs {
        let purchases = load_purchases_from_reader(PURCHASES.as_bytes()).unwrap();
        PeriodInputs::from_purchases(&purchases, reference_date(), &SegmentationRules::default()).unwrap()
    }

    fn ab_inputs(revenue: [f64; 2]) -> PeriodInputs {
        let catalog = SegmentCatalog::new(&["A", "B"]).unwrap();
        PeriodInputs {
            previous: SegmentAssignments::from_labels(catalog.clone(), [(1, "A"), (2, "B")]).unwrap(),
            current: SegmentAssignments::from_labels(catalog.clone(), [(1, "A"), (2, "B")]).unwrap(),
            revenue: RevenuePerSegment::from_values(catalog, revenue.to_vec()).unwrap(),
        }
    }

    #[test]
    fn test_static_two_segment_value() {
        let config = ModelConfig { discount_rate: 0.0, horizon: 1, ..Default::default() };
        let report = ClvModel::new(config).unwrap().run(&ab_inputs([100.0, 0.0])).unwrap();

        assert_eq!(report.segments, vec!["A", "B", ABSENT_LABEL]);
        assert_eq!(report.revenue.yearly, vec![100.0, 100.0]);
        assert_eq!(report.revenue.cumulative, vec![100.0, 200.0]);
        assert_eq!(report.revenue.discounted, report.revenue.yearly);
        assert_relative_eq!(report.customer_base_value(), 100.0);
        assert!(report.population_conserved);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_pipeline_from_purchases() {
        let inputs = purchase_inputs();
        assert_eq!(inputs.previous.len(), 6);
        assert_eq!(inputs.current.len(), 7);

        let report = ClvModel::new(ModelConfig::default()).unwrap().run(&inputs).unwrap();

        assert_eq!(report.segments.len(), 9);
        assert_eq!(report.populations.len(), 11);
        for population in &report.populations {
            assert_relative_eq!(population.iter().sum::<f64>(), 7.0, max_relative = 1e-9);
        }
        assert!(report.population_conserved);
        for row in &report.transition {
            assert_relative_eq!(row.iter().sum::<f64>(), 1.0, max_relative = 1e-9);
        }
        assert!(report.customer_base_value().is_finite());
        // Segments without prior-period customers surface as warnings
        assert!(report
            .warnings
            .iter()
            .all(|w| matches!(w, ModelWarning::UndefinedTransitionRow { .. })));
    }

    #[test]
    fn test_pipeline_revenue_matches_realized_period() {
        let purchases = load_purchases_from_reader(PURCHASES.as_bytes()).unwrap();
        let inputs = purchase_inputs();
        let revenue = &inputs.revenue;
        let per_segment = |label: &str| revenue.get(revenue.catalog().id(label).unwrap()).unwrap();

        // Customers 1 and 4 spent 200 and 450 in the year to the reference date
        assert_relative_eq!(per_segment("active high value"), 325.0);
        assert_relative_eq!(per_segment("active low value"), 35.0);
        assert_relative_eq!(per_segment("new active"), 25.0);
        for label in ["inactive", "cold", "warm high value", "warm low value", "new warm"] {
            assert_eq!(per_segment(label), 0.0);
        }

        let realized: f64 = PurchaseAggregator::new(&purchases, reference_date())
            .period_revenue(0)
            .values()
            .sum();
        assert_relative_eq!(realized, 710.0);

        let report = ClvModel::new(ModelConfig::default()).unwrap().run(&inputs).unwrap();
        assert_relative_eq!(report.revenue.yearly[0], realized, max_relative = 1e-12);
    }

    #[test]
    fn test_pipeline_segments() {
        let inputs = purchase_inputs();
        let catalog = inputs.current.catalog();

        // Customer 4 bought 450 a month ago and first bought three years ago
        assert_eq!(inputs.current.get(4), Some(catalog.id("active high value").unwrap()));
        // Customer 5 only bought this year
        assert_eq!(inputs.current.get(5), Some(catalog.id("new active").unwrap()));
        assert_eq!(inputs.previous.get(5), None);
        // Customer 6 last bought in 2011
        assert_eq!(inputs.current.get(6), Some(catalog.id("inactive").unwrap()));
    }

    #[test]
    fn test_absent_customers_absorbed() {
        let catalog = SegmentCatalog::new(&["A", "B"]).unwrap();
        let inputs = PeriodInputs {
            previous: SegmentAssignments::from_labels(catalog.clone(), [(1, "A"), (2, "A"), (3, "B")]).unwrap(),
            current: SegmentAssignments::from_labels(catalog.clone(), [(1, "A"), (3, "B"), (4, "B")]).unwrap(),
            revenue: RevenuePerSegment::from_values(catalog, vec![10.0, 5.0]).unwrap(),
        };

        let model = ClvModel::new(ModelConfig { horizon: 2, ..Default::default() }).unwrap();
        let projected = model.project(&inputs).unwrap();

        assert_relative_eq!(projected.transition.probability_of("A", ABSENT_LABEL).unwrap(), 0.5);
        let p1 = projected.projection.period(1).unwrap();
        assert_relative_eq!(p1.count("A").unwrap(), 0.5);
        assert_relative_eq!(p1.count(ABSENT_LABEL).unwrap(), 0.5);
        assert!(projected.projection.is_conserved());
    }

    #[test]
    fn test_excluded_absent_customers() {
        let catalog = SegmentCatalog::new(&["A", "B"]).unwrap();
        let inputs = PeriodInputs {
            previous: SegmentAssignments::from_labels(catalog.clone(), [(1, "A"), (2, "A")]).unwrap(),
            current: SegmentAssignments::from_labels(catalog.clone(), [(1, "B"), (3, "A")]).unwrap(),
            revenue: RevenuePerSegment::from_values(catalog, vec![10.0, 5.0]).unwrap(),
        };
        let config = ModelConfig {
            absent_policy: AbsentPolicy::ExcludeFromRow,
            horizon: 1,
            ..Default::default()
        };

        let report = ClvModel::new(config).unwrap().run(&inputs).unwrap();
        assert_eq!(report.segments, vec!["A", "B"]);
        assert_relative_eq!(report.transition[0][1], 1.0);
        // B had no prior customers and stays put under the identity policy
        assert_eq!(report.transition[1], vec![0.0, 1.0]);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_reject_policy_propagates() {
        let config = ModelConfig { zero_row_policy: ZeroRowPolicy::Reject, ..Default::default() };
        let result = ClvModel::new(config).unwrap().run(&purchase_inputs());
        assert!(result.is_err());
    }

    #[test]
    fn test_scenarios_value_falls_with_rate() {
        let inputs = purchase_inputs();
        let model = ClvModel::new(ModelConfig::default()).unwrap();
        let scenarios = model.run_scenarios(&inputs, &[0.0, 0.05, 0.10, 0.20]).unwrap();

        assert_eq!(scenarios.len(), 4);
        for pair in scenarios.windows(2) {
            assert!(pair[1].discount_rate > pair[0].discount_rate);
            assert!(pair[1].revenue.customer_base_value <= pair[0].revenue.customer_base_value);
        }

        let single = model.run(&inputs).unwrap();
        assert_relative_eq!(
            scenarios[2].revenue.customer_base_value,
            single.customer_base_value(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_report_carries_scenarios() {
        let inputs = purchase_inputs();
        let model = ClvModel::new(ModelConfig::default()).unwrap();

        let plain = serde_json::to_value(model.run(&inputs).unwrap()).unwrap();
        assert!(plain.get("scenarios").is_none());

        let report = model.run_with_scenarios(&inputs, &[0.05, 0.20]).unwrap();
        assert_eq!(report.scenarios.len(), 2);
        assert_relative_eq!(
            report.scenarios[1].revenue.customer_base_value,
            model.run_scenarios(&inputs, &[0.20]).unwrap()[0].revenue.customer_base_value,
            max_relative = 1e-12
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["scenarios"].as_array().unwrap().len(), 2);
        assert_eq!(json["scenarios"][0]["discount_rate"], 0.05);
    }

    #[test]
    fn test_negative_scenario_rate_rejected() {
        let model = ClvModel::new(ModelConfig::default()).unwrap();
        assert!(matches!(
            model.run_scenarios(&purchase_inputs(), &[0.1, -0.1]),
            Err(ClvError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_scenario_rates_checked_before_projection() {
        // Inputs that cannot be projected: the rate error must win
        let mut inputs = ab_inputs([1.0, 1.0]);
        inputs.revenue = RevenuePerSegment::from_values(SegmentCatalog::standard(), vec![0.0; 8]).unwrap();
        let model = ClvModel::new(ModelConfig::default()).unwrap();

        assert!(matches!(model.project(&inputs), Err(ClvError::CatalogMismatch)));
        assert!(matches!(
            model.run_scenarios(&inputs, &[0.05, f64::NAN]),
            Err(ClvError::InvalidInput(_))
        ));
        assert!(matches!(
            model.run_with_scenarios(&inputs, &[-1.0]),
            Err(ClvError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_mismatched_catalogs_rejected() {
        let mut inputs = ab_inputs([1.0, 1.0]);
        inputs.revenue = RevenuePerSegment::from_values(SegmentCatalog::standard(), vec![0.0; 8]).unwrap();
        assert!(ClvModel::new(ModelConfig::default()).unwrap().run(&inputs).is_err());
    }
}
