//! Elements and their occurrence bounds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::relations::Relation;
use crate::vocabulary::{Category, Value};

/// Occurrence bounds of an element across the cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub min: u32,
    /// `Bounds::UNBOUNDED` when there is no upper limit.
    pub max: u32,
}

impl Bounds {
    pub const UNBOUNDED: u32 = u32::MAX;

    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// `[0, ∞)`.
    pub fn unbounded() -> Self {
        Self::new(0, Self::UNBOUNDED)
    }

    /// `[n, n]`.
    pub fn exact(n: u32) -> Self {
        Self::new(n, n)
    }

    /// `[0, 0]` - the element never occurs.
    pub fn never() -> Self {
        Self::new(0, 0)
    }

    pub fn is_consistent(&self) -> bool {
        self.min <= self.max
    }

    pub fn is_live(&self) -> bool {
        self.max > 0
    }

    pub fn contains(&self, count: u32) -> bool {
        self.min <= count && count <= self.max
    }

    /// Intersection of two intervals; may be inconsistent.
    pub fn intersect(&self, other: &Bounds) -> Bounds {
        Bounds::new(self.min.max(other.min), self.max.min(other.max))
    }

    /// Raise the minimum, returning whether anything changed.
    pub fn raise_min(&mut self, min: u32) -> bool {
        if min > self.min {
            self.min = min;
            true
        } else {
            false
        }
    }

    /// Lower the maximum, returning whether anything changed.
    pub fn lower_max(&mut self, max: u32) -> bool {
        if max < self.max {
            self.max = max;
            true
        } else {
            false
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// A value within a category, with its bounds and outgoing relations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub bounds: Bounds,
    /// Placeholder standing for one of several underlying identities.
    pub ambiguous: bool,
    pub relations: Vec<Relation>,
}

impl Element {
    /// Create an unambiguous element with unbounded occurrence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set bounds.
    pub fn with_bounds(mut self, min: u32, max: u32) -> Self {
        self.bounds = Bounds::new(min, max);
        self
    }

    /// Builder: mark as an ambiguous placeholder.
    pub fn ambiguous(mut self) -> Self {
        self.ambiguous = true;
        self
    }

    /// Builder: add a relation.
    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.add_relation(relation);
        self
    }

    /// Add a relation unless an identical one is already present.
    pub fn add_relation(&mut self, relation: Relation) -> bool {
        if self.relations.contains(&relation) {
            return false;
        }
        self.relations.push(relation);
        true
    }

    pub fn is_live(&self) -> bool {
        self.bounds.is_live()
    }

    /// Target set of the first forward relation into `category`.
    pub fn forward_targets(&self, category: Category) -> Option<&BTreeSet<Value>> {
        self.relations
            .iter()
            .find(|r| r.category == category && r.kind.is_forward())
            .map(|r| &r.targets)
    }

    /// Union another description of the same element into this one.
    pub fn merge(&mut self, other: &Element) {
        self.bounds = self.bounds.intersect(&other.bounds);
        self.ambiguous |= other.ambiguous;
        for relation in &other.relations {
            self.add_relation(relation.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::Symbol;

    #[test]
    fn test_bounds_tightening() {
        let mut bounds = Bounds::unbounded();
        assert!(bounds.raise_min(1));
        assert!(!bounds.raise_min(1));
        assert!(bounds.lower_max(3));
        assert!(bounds.contains(2));
        assert!(!bounds.contains(4));
        assert!(bounds.is_consistent());

        let clash = bounds.intersect(&Bounds::exact(5));
        assert!(!clash.is_consistent());
    }

    #[test]
    fn test_merge_dedupes_relations() {
        let title = Category(Symbol(1));
        let duke = Value::Named(Symbol(2));
        let mut a = Element::new().with_bounds(0, 4).with_relation(Relation::unique(title, duke));
        let b = Element::new()
            .with_bounds(1, 6)
            .ambiguous()
            .with_relation(Relation::unique(title, duke));

        a.merge(&b);
        assert_eq!(a.bounds, Bounds::new(1, 4));
        assert!(a.ambiguous);
        assert_eq!(a.relations.len(), 1);
        assert_eq!(a.forward_targets(title).map(|t| t.len()), Some(1));
    }
}
