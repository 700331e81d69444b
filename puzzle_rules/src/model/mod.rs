//! Constraint models - the shared representation for designer data, clue
//! fragments, cast baselines and the output of propagation.

mod element;

pub use element::*;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::relations::RelationKind;
use crate::vocabulary::{Category, ElementRef, Value};

/// One character's value per category. Missing categories read as `Undefined`.
pub type Assignment = BTreeMap<Category, Value>;

/// Category -> value -> element.
///
/// Models are plain values; callers share them behind `Arc` and clone before
/// writing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintModel {
    categories: BTreeMap<Category, BTreeMap<Value, Element>>,
}

impl ConstraintModel {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: insert (or merge into) an element.
    pub fn with_element(mut self, category: Category, value: Value, element: Element) -> Self {
        self.merge_element(category, value, &element);
        self
    }

    /// Insert an element, replacing whatever was there.
    pub fn insert(&mut self, category: Category, value: Value, element: Element) -> Option<Element> {
        self.categories.entry(category).or_default().insert(value, element)
    }

    /// Merge an element description into the model.
    pub fn merge_element(&mut self, category: Category, value: Value, element: &Element) {
        match self.categories.entry(category).or_default().get_mut(&value) {
            Some(existing) => existing.merge(element),
            None => {
                self.categories
                    .entry(category)
                    .or_default()
                    .insert(value, element.clone());
            }
        }
    }

    /// Make sure a category exists, even with no elements.
    pub fn ensure_category(&mut self, category: Category) {
        self.categories.entry(category).or_default();
    }

    /// Get an element, creating a default one if absent.
    pub fn entry(&mut self, category: Category, value: Value) -> &mut Element {
        self.categories
            .entry(category)
            .or_default()
            .entry(value)
            .or_default()
    }

    pub fn element(&self, category: Category, value: Value) -> Option<&Element> {
        self.categories.get(&category).and_then(|c| c.get(&value))
    }

    pub fn element_mut(&mut self, category: Category, value: Value) -> Option<&mut Element> {
        self.categories.get_mut(&category).and_then(|c| c.get_mut(&value))
    }

    pub fn contains_category(&self, category: Category) -> bool {
        self.categories.contains_key(&category)
    }

    /// Elements of a category, in value order.
    pub fn category(&self, category: Category) -> Option<&BTreeMap<Value, Element>> {
        self.categories.get(&category)
    }

    /// All categories, in order.
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.categories.keys().copied()
    }

    /// Every element in the model.
    pub fn elements(&self) -> impl Iterator<Item = (ElementRef, &Element)> {
        self.categories.iter().flat_map(|(category, elements)| {
            elements
                .iter()
                .map(move |(value, element)| (ElementRef::new(*category, *value), element))
        })
    }

    /// Forward targets of `(category, value)` into `target`.
    pub fn forward_targets(&self, category: Category, value: Value, target: Category) -> Option<&BTreeSet<Value>> {
        self.element(category, value)?.forward_targets(target)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn element_count(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    /// Whether a concrete cast satisfies every constraint the model states
    /// about the categories the assignments mention.
    ///
    /// Placeholders are skipped; they describe some carrier rather than a
    /// value carriers hold.
    pub fn admits(&self, assignments: &[Assignment]) -> bool {
        let considered: BTreeSet<Category> = assignments
            .iter()
            .flat_map(|a| a.keys().copied())
            .collect();
        let value_of = |row: &Assignment, category: Category| {
            row.get(&category).copied().unwrap_or(Value::Undefined)
        };
        let count = |category: Category, value: Value| {
            assignments
                .iter()
                .filter(|row| value_of(row, category) == value)
                .count() as u32
        };

        for (category, elements) in &self.categories {
            if !considered.contains(category) {
                continue;
            }
            for (value, element) in elements {
                if element.ambiguous {
                    continue;
                }
                if !element.bounds.contains(count(*category, *value)) {
                    return false;
                }

                let carriers: Vec<&Assignment> = assignments
                    .iter()
                    .filter(|row| value_of(row, *category) == *value)
                    .collect();

                for relation in &element.relations {
                    if !considered.contains(&relation.category) {
                        continue;
                    }
                    let names_placeholder = relation.targets.iter().any(|t| {
                        self.element(relation.category, *t)
                            .map(|e| e.ambiguous)
                            .unwrap_or(false)
                    });
                    if names_placeholder {
                        continue;
                    }

                    let satisfied = match relation.kind {
                        kind if kind.is_forward() => carriers
                            .iter()
                            .all(|row| relation.targets.contains(&value_of(row, relation.category))),
                        kind if kind.is_negation() => carriers
                            .iter()
                            .all(|row| !relation.targets.contains(&value_of(row, relation.category))),
                        RelationKind::Minimum(n) => relation
                            .targets
                            .iter()
                            .all(|t| count(relation.category, *t) >= n),
                        RelationKind::Maximum(n) => relation
                            .targets
                            .iter()
                            .all(|t| count(relation.category, *t) <= n),
                        _ => true,
                    };
                    if !satisfied {
                        return false;
                    }
                }
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::Relation;
    use crate::vocabulary::Vocabulary;

    #[test]
    fn test_merge_element_intersects_bounds() {
        let mut vocabulary = Vocabulary::new();
        let name = vocabulary.category("Name");
        let hugo = vocabulary.value("Hugo");

        let mut model = ConstraintModel::new()
            .with_element(name, hugo, Element::new().with_bounds(0, 3))
            .with_element(name, hugo, Element::new().with_bounds(1, 5));

        assert_eq!(model.element(name, hugo).unwrap().bounds, Bounds::new(1, 3));
        model.entry(name, Value::Undefined);
        assert_eq!(model.element_count(), 2);
    }

    #[test]
    fn test_admits_checks_forward_and_counts() {
        let mut vocabulary = Vocabulary::new();
        let name = vocabulary.category("Name");
        let title = vocabulary.category("Title");
        let hugo = vocabulary.value("Hugo");
        let ada = vocabulary.value("Ada");
        let duke = vocabulary.value("Duke");
        let earl = vocabulary.value("Earl");

        let model = ConstraintModel::new().with_element(
            name,
            hugo,
            Element::new()
                .with_bounds(1, 1)
                .with_relation(Relation::unique(title, duke)),
        );

        let truth = vec![
            Assignment::from([(name, hugo), (title, duke)]),
            Assignment::from([(name, ada), (title, earl)]),
        ];
        assert!(model.admits(&truth));

        let swapped = vec![
            Assignment::from([(name, hugo), (title, earl)]),
            Assignment::from([(name, ada), (title, duke)]),
        ];
        assert!(!model.admits(&swapped));

        let missing = vec![Assignment::from([(name, ada), (title, earl)])];
        assert!(!model.admits(&missing));
    }
}
