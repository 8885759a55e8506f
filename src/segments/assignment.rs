//! Per-period customer segment assignments

use super::catalog::{SegmentCatalog, SegmentId};
use crate::error::{ClvError, ClvResult};
use std::collections::BTreeMap;

/// One segment per customer for a single period
///
/// A customer with no entry was not observed in the period. Lookups return
/// `None` for such customers rather than falling back to any segment.
#[derive(Debug, Clone)]
pub struct SegmentAssignments {
    catalog: SegmentCatalog,
    by_customer: BTreeMap<u64, SegmentId>,
}

impl SegmentAssignments {
    pub fn new(catalog: SegmentCatalog) -> Self {
        Self {
            catalog,
            by_customer: BTreeMap::new(),
        }
    }

    /// Build from (customer, label) pairs, validating every label
    pub fn from_labels<'a, I>(catalog: SegmentCatalog, pairs: I) -> ClvResult<Self>
    where
        I: IntoIterator<Item = (u64, &'a str)>,
    {
        let mut assignments = Self::new(catalog);
        for (customer_id, label) in pairs {
            let segment = assignments.catalog.id(label)?;
            assignments.insert(customer_id, segment)?;
        }
        Ok(assignments)
    }

    /// Record one customer's segment; a second assignment for the same customer fails
    pub fn insert(&mut self, customer_id: u64, segment: SegmentId) -> ClvResult<()> {
        self.catalog.check(segment)?;
        if self.by_customer.insert(customer_id, segment).is_some() {
            return Err(ClvError::DuplicateAssignment { customer_id });
        }
        Ok(())
    }

    pub fn catalog(&self) -> &SegmentCatalog {
        &self.catalog
    }

    pub fn get(&self, customer_id: u64) -> Option<SegmentId> {
        self.by_customer.get(&customer_id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_customer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_customer.is_empty()
    }

    /// Assignments ordered by customer id
    pub fn iter(&self) -> impl Iterator<Item = (u64, SegmentId)> + '_ {
        self.by_customer.iter().map(|(&c, &s)| (c, s))
    }

    /// Number of customers per segment, in catalog order
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.catalog.len()];
        for segment in self.by_customer.values() {
            counts[segment.index()] += 1;
        }
        counts
    }

    /// Re-index these assignments onto a catalog that extends this one
    ///
    /// Every label must exist in `target`; used when the absent outcome is
    /// appended to the catalog after assignments were made.
    pub fn reindexed(&self, target: &SegmentCatalog) -> ClvResult<Self> {
        if *target == self.catalog {
            return Ok(self.clone());
        }

        let mapping: Vec<SegmentId> = self
            .catalog
            .ids()
            .map(|id| target.id(self.catalog.label_of(id)))
            .collect::<ClvResult<_>>()?;

        Ok(Self {
            catalog: target.clone(),
            by_customer: self
                .by_customer
                .iter()
                .map(|(&c, s)| (c, mapping[s.index()]))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> SegmentCatalog {
        SegmentCatalog::new(&["A", "B"]).unwrap()
    }

    #[test]
    fn test_from_labels_and_counts() {
        let a = SegmentAssignments::from_labels(catalog(), [(1, "A"), (2, "B"), (3, "A")]).unwrap();
        assert_eq!(a.len(), 3);
        assert_eq!(a.counts(), vec![2, 1]);
        assert_eq!(a.get(2), Some(catalog().id("B").unwrap()));
    }

    #[test]
    fn test_absent_customer_has_no_segment() {
        let a = SegmentAssignments::from_labels(catalog(), [(1, "A")]).unwrap();
        assert_eq!(a.get(99), None);
    }

    #[test]
    fn test_unknown_label_fails() {
        let result = SegmentAssignments::from_labels(catalog(), [(1, "A"), (2, "C")]);
        assert!(matches!(result, Err(ClvError::UnknownSegment { label }) if label == "C"));
    }

    #[test]
    fn test_duplicate_customer_fails() {
        let result = SegmentAssignments::from_labels(catalog(), [(1, "A"), (1, "B")]);
        assert!(matches!(result, Err(ClvError::DuplicateAssignment { customer_id: 1 })));
    }

    #[test]
    fn test_reindex_onto_extended_catalog() {
        let a = SegmentAssignments::from_labels(catalog(), [(1, "A"), (2, "B")]).unwrap();
        let extended = catalog().with_absent_outcome();
        let moved = a.reindexed(&extended).unwrap();

        assert_eq!(moved.catalog(), &extended);
        assert_eq!(moved.counts(), vec![1, 1, 0]);
    }

    #[test]
    fn test_insert_rejects_id_from_reordered_catalog() {
        let reordered = SegmentCatalog::new(&["B", "A"]).unwrap();
        let mut a = SegmentAssignments::new(catalog());

        let result = a.insert(1, reordered.id("A").unwrap());
        assert!(matches!(result, Err(ClvError::CatalogMismatch)));
        assert!(a.is_empty());

        a.insert(1, catalog().id("A").unwrap()).unwrap();
        assert_eq!(a.counts(), vec![1, 0]);
    }
}
