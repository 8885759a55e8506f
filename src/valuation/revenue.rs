//! Revenue per segment and projected revenue series

use super::discount::DiscountSeries;
use crate::error::{ClvError, ClvResult};
use crate::projection::PopulationProjection;
use crate::segments::{SegmentAssignments, SegmentCatalog, SegmentId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Expected yearly revenue from one customer in each segment
#[derive(Debug, Clone, PartialEq)]
pub struct RevenuePerSegment {
    catalog: SegmentCatalog,
    values: Vec<f64>,
}

impl RevenuePerSegment {
    /// Build from values in catalog order
    pub fn from_values(catalog: SegmentCatalog, values: Vec<f64>) -> ClvResult<Self> {
        if values.len() != catalog.len() {
            return Err(ClvError::InvalidInput(format!(
                "revenue has {} entries but catalog has {} segments",
                values.len(),
                catalog.len()
            )));
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(ClvError::InvalidInput(format!(
                "revenue for '{}' is not a number",
                catalog.labels()[i]
            )));
        }
        Ok(Self { catalog, values })
    }

    /// Build from (label, revenue) pairs
    ///
    /// Every segment except the absent outcome must be listed; the absent
    /// outcome earns nothing unless given explicitly.
    pub fn from_labels<'a, I>(catalog: SegmentCatalog, pairs: I) -> ClvResult<Self>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut values: Vec<Option<f64>> = vec![None; catalog.len()];
        for (label, revenue) in pairs {
            values[catalog.id(label)?.index()] = Some(revenue);
        }

        let absent = catalog.absent();
        let values = catalog
            .ids()
            .map(|id| match values[id.index()] {
                Some(v) => Ok(v),
                None if Some(id) == absent => Ok(0.0),
                None => Err(ClvError::MissingRevenue {
                    segment: catalog.label_of(id).to_string(),
                }),
            })
            .collect::<ClvResult<Vec<f64>>>()?;

        Self::from_values(catalog, values)
    }

    /// Mean revenue per customer of each segment
    ///
    /// `period_revenue` holds per-customer revenue for one period; assigned
    /// customers missing from it count as zero and customers outside the
    /// assignments are ignored. Segments with no customers earn zero.
    pub fn observed(assignments: &SegmentAssignments, period_revenue: &HashMap<u64, f64>) -> ClvResult<Self> {
        let catalog = assignments.catalog().clone();
        let mut totals = vec![0.0; catalog.len()];
        let counts = assignments.counts();

        for (customer_id, segment) in assignments.iter() {
            totals[segment.index()] += period_revenue.get(&customer_id).copied().unwrap_or(0.0);
        }

        let values = catalog
            .ids()
            .map(|id| {
                let n = counts[id.index()];
                if n == 0 {
                    log::debug!("No customers in '{}'; revenue set to zero", catalog.label_of(id));
                    0.0
                } else {
                    totals[id.index()] / n as f64
                }
            })
            .collect();

        Self::from_values(catalog, values)
    }

    pub fn catalog(&self) -> &SegmentCatalog {
        &self.catalog
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, segment: SegmentId) -> ClvResult<f64> {
        self.catalog.check(segment)?;
        Ok(self.values[segment.index()])
    }

    /// Re-index onto a catalog that extends this one; new segments earn zero
    pub fn reindexed(&self, target: &SegmentCatalog) -> ClvResult<Self> {
        if *target == self.catalog {
            return Ok(self.clone());
        }

        let mut values = vec![0.0; target.len()];
        for id in self.catalog.ids() {
            values[target.id(self.catalog.label_of(id))?.index()] = self.values[id.index()];
        }
        Self::from_values(target.clone(), values)
    }
}

/// Per-period revenue series for a projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueSeries {
    pub yearly: Vec<f64>,
    pub cumulative: Vec<f64>,
    pub discount_factors: Vec<f64>,
    pub discounted: Vec<f64>,
    pub discounted_cumulative: Vec<f64>,
    /// Discounted cumulative revenue at the horizon less period-0 revenue
    pub customer_base_value: f64,
}

impl RevenueSeries {
    pub fn horizon(&self) -> usize {
        self.yearly.len() - 1
    }
}

fn running_sum(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(0.0, |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

/// Turns projected populations into revenue
pub struct RevenueValuator<'a> {
    revenue: &'a RevenuePerSegment,
}

impl<'a> RevenueValuator<'a> {
    pub fn new(revenue: &'a RevenuePerSegment) -> Self {
        Self { revenue }
    }

    /// Revenue for every period of the projection, discounted by `discount`
    pub fn value(
        &self,
        projection: &PopulationProjection,
        discount: &DiscountSeries,
    ) -> ClvResult<RevenueSeries> {
        self.revenue.catalog.ensure_same(projection.catalog())?;
        if discount.horizon() != projection.horizon() {
            return Err(ClvError::InvalidInput(format!(
                "discount series covers {} periods but projection covers {}",
                discount.horizon(),
                projection.horizon()
            )));
        }

        let yearly: Vec<f64> = projection
            .periods()
            .iter()
            .map(|p| {
                p.values()
                    .iter()
                    .zip(&self.revenue.values)
                    .map(|(n, r)| n * r)
                    .sum()
            })
            .collect();

        let discount_factors = discount.factors().to_vec();
        let discounted: Vec<f64> = yearly.iter().zip(&discount_factors).map(|(r, v)| r * v).collect();
        let cumulative = running_sum(&yearly);
        let discounted_cumulative = running_sum(&discounted);

        let customer_base_value = discounted_cumulative[discounted_cumulative.len() - 1] - yearly[0];

        Ok(RevenueSeries {
            yearly,
            cumulative,
            discount_factors,
            discounted,
            discounted_cumulative,
            customer_base_value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{PopulationProjector, PopulationVector, ProjectionConfig, TransitionMatrix};
    use approx::assert_relative_eq;

    fn ab() -> SegmentCatalog {
        SegmentCatalog::new(&["A", "B"]).unwrap()
    }

    fn project(p0: &PopulationVector, t: &TransitionMatrix, horizon: usize) -> PopulationProjection {
        PopulationProjector::new(ProjectionConfig { horizon, ..Default::default() })
            .project(p0, t)
            .unwrap()
    }

    #[test]
    fn test_static_single_period_value() {
        let revenue = RevenuePerSegment::from_labels(ab(), [("A", 100.0), ("B", 0.0)]).unwrap();
        let p0 = PopulationVector::from_labels(ab(), [("A", 1.0), ("B", 1.0)]).unwrap();
        let projection = project(&p0, &TransitionMatrix::identity(ab()), 1);
        let discount = DiscountSeries::new(0.0, 1).unwrap();

        let series = RevenueValuator::new(&revenue).value(&projection, &discount).unwrap();

        assert_eq!(series.yearly, vec![100.0, 100.0]);
        assert_eq!(series.cumulative, vec![100.0, 200.0]);
        assert_eq!(series.discounted, series.yearly);
        assert_eq!(series.discounted_cumulative, series.cumulative);
        assert_relative_eq!(series.customer_base_value, 100.0);
    }

    #[test]
    fn test_discounting_applied_per_period() {
        let revenue = RevenuePerSegment::from_values(ab(), vec![110.0, 0.0]).unwrap();
        let p0 = PopulationVector::from_values(ab(), vec![1.0, 0.0]).unwrap();
        let projection = project(&p0, &TransitionMatrix::identity(ab()), 2);
        let discount = DiscountSeries::new(0.10, 2).unwrap();

        let series = RevenueValuator::new(&revenue).value(&projection, &discount).unwrap();

        assert_relative_eq!(series.discounted[1], 100.0, max_relative = 1e-12);
        assert_relative_eq!(series.discounted[2], 110.0 / 1.21, max_relative = 1e-12);
        assert_relative_eq!(
            series.customer_base_value,
            series.discounted_cumulative[2] - 110.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_cumulative_non_decreasing() {
        let catalog = SegmentCatalog::new(&["A", "B", "C"]).unwrap();
        let revenue = RevenuePerSegment::from_values(catalog.clone(), vec![0.0, 52.31, 323.57]).unwrap();
        let t = TransitionMatrix::from_rows(
            catalog.clone(),
            vec![vec![0.9, 0.05, 0.05], vec![0.4, 0.4, 0.2], vec![0.3, 0.1, 0.6]],
        )
        .unwrap();
        let p0 = PopulationVector::from_values(catalog, vec![500.0, 300.0, 200.0]).unwrap();
        let projection = project(&p0, &t, 10);
        let series = RevenueValuator::new(&revenue)
            .value(&projection, &DiscountSeries::new(0.1, 10).unwrap())
            .unwrap();

        for pair in series.cumulative.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        for pair in series.discounted_cumulative.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
    }

    #[test]
    fn test_missing_and_unknown_revenue() {
        assert!(matches!(
            RevenuePerSegment::from_labels(ab(), [("A", 1.0)]),
            Err(ClvError::MissingRevenue { segment }) if segment == "B"
        ));
        assert!(matches!(
            RevenuePerSegment::from_labels(ab(), [("A", 1.0), ("B", 1.0), ("C", 1.0)]),
            Err(ClvError::UnknownSegment { .. })
        ));

        // The absent outcome defaults to zero
        let extended = ab().with_absent_outcome();
        let revenue = RevenuePerSegment::from_labels(extended, [("A", 1.0), ("B", 2.0)]).unwrap();
        assert_eq!(revenue.values(), &[1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_observed_revenue_left_joins() {
        let assignments =
            SegmentAssignments::from_labels(ab(), [(1, "A"), (2, "A"), (3, "B")]).unwrap();
        let next: HashMap<u64, f64> = [(1, 300.0), (9, 1000.0)].into_iter().collect();

        let revenue = RevenuePerSegment::observed(&assignments, &next).unwrap();
        assert_relative_eq!(revenue.values()[0], 150.0);
        assert_relative_eq!(revenue.values()[1], 0.0);

        let a = ab().id("A").unwrap();
        assert_relative_eq!(revenue.get(a).unwrap(), 150.0);
        let reordered = SegmentCatalog::new(&["B", "A"]).unwrap();
        assert!(matches!(
            revenue.get(reordered.id("A").unwrap()),
            Err(ClvError::CatalogMismatch)
        ));
    }

    #[test]
    fn test_horizon_mismatch_rejected() {
        let revenue = RevenuePerSegment::from_values(ab(), vec![1.0, 1.0]).unwrap();
        let p0 = PopulationVector::from_values(ab(), vec![1.0, 1.0]).unwrap();
        let projection = project(&p0, &TransitionMatrix::identity(ab()), 3);
        let discount = DiscountSeries::new(0.1, 5).unwrap();
        assert!(matches!(
            RevenueValuator::new(&revenue).value(&projection, &discount),
            Err(ClvError::InvalidInput(_))
        ));
    }
}
