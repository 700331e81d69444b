//! Cast construction - turns ground-truth characters into the background
//! knowledge a search runs against.
//!
//! Three baselines are built, each propagated under the cast's size bounds:
//!
//! - **minimal**: the designer's given categories plus every value the cast
//!   uses, with the designer relations those values carry
//! - **partial**: minimal, with every used value known to occur
//! - **full**: partial plus the exact solution
//!
//! The first-order targets are read off the full baseline.

mod catalogue;
mod generator;

pub use catalogue::*;
pub use generator::*;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

use puzzle_rules::{
    Cast, CastBounds, CastSettings, Category, Character, ConstraintModel, DesignerData, Element, ElementRef,
    FirstOrderTargets, PuzzleConfig, Relation, TargetFact, Value, Vocabulary,
};

use crate::error::CastError;
use crate::fitness;
use crate::propagation::{PropagationLimits, Propagator};

/// Builds a [`Cast`] from explicit characters.
#[derive(Debug, Clone)]
pub struct CastBuilder {
    settings: CastSettings,
    first_order: Vec<String>,
    propagator: Propagator,
}

impl CastBuilder {
    pub fn new(config: &PuzzleConfig) -> Self {
        Self {
            settings: config.cast.clone(),
            first_order: config.first_order.clone(),
            propagator: Propagator::new(PropagationLimits::from(&config.search)),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&PuzzleConfig::default())
    }

    /// Builder: replace the propagator.
    pub fn with_propagator(mut self, propagator: Propagator) -> Self {
        self.propagator = propagator;
        self
    }

    pub fn propagator(&self) -> &Propagator {
        &self.propagator
    }

    /// Build the cast's baselines and targets.
    ///
    /// Characters missing a value in some category the cast uses are given
    /// `UNDEFINED` there.
    pub fn build(&self, designer: &DesignerData, mut characters: Vec<Character>) -> Result<Cast, CastError> {
        let vocabulary = designer.vocabulary.clone();
        let first_order = resolve(&vocabulary, &self.first_order)?;
        fill_undefined(&mut characters, &first_order);

        let principals = characters.iter().filter(|c| c.is_principal()).count() as u32;
        let bounds = CastBounds::new(principals, Some(characters.len() as u32));

        let counts = occurrences(&characters);
        let minimal = self.minimal(designer, &characters, &first_order, bounds)?;
        let partial = self.partial(&minimal, &counts, bounds)?;
        let full = self.propagator.propagate(&[&partial, &solution(&characters, &counts)], bounds)?;
        let targets = first_order_targets(&full, &characters, &first_order, &counts);

        let unknowns = fitness::unknowns([], &targets);
        let ambiguities = fitness::ambiguities(&partial, &targets);
        info!(
            characters = characters.len(),
            principals,
            targets = targets.len(),
            unknowns,
            ambiguities,
            "cast ready"
        );

        Ok(Cast {
            vocabulary,
            characters,
            minimal: Arc::new(minimal),
            partial: Arc::new(partial),
            full: Arc::new(full),
            targets,
            bounds,
            unknowns,
            ambiguities,
        })
    }

    fn minimal(
        &self,
        designer: &DesignerData,
        characters: &[Character],
        first_order: &BTreeSet<Category>,
        bounds: CastBounds,
    ) -> Result<ConstraintModel, CastError> {
        let mut model = ConstraintModel::new();
        for name in &self.settings.given_categories {
            let Some(category) = designer.vocabulary.symbol(name).map(Category) else {
                continue;
            };
            for (value, element) in designer.model.category(category).into_iter().flatten() {
                model.insert(category, *value, element.clone());
            }
        }

        for character in characters {
            for (category, value) in &character.assignment {
                if model.element(*category, *value).is_none() {
                    let described = designer.model.element(*category, *value).cloned().unwrap_or_default();
                    model.insert(*category, *value, described);
                }
                if first_order.contains(category) && *value != Value::Undefined {
                    let element = model.entry(*category, *value);
                    if self.settings.first_order_known {
                        element.bounds.raise_min(1);
                    }
                    if self.settings.first_order_unique {
                        element.bounds.lower_max(1);
                    }
                }
            }
        }

        scrub(&mut model);
        debug!(elements = model.element_count(), "minimal baseline assembled");
        Ok(self.propagator.propagate(&[&model], bounds)?)
    }

    fn partial(
        &self,
        minimal: &ConstraintModel,
        counts: &BTreeMap<ElementRef, u32>,
        bounds: CastBounds,
    ) -> Result<ConstraintModel, CastError> {
        let mut model = minimal.clone();
        for used in counts.keys() {
            model.entry(used.category, used.value).bounds.raise_min(1);
        }
        Ok(self.propagator.propagate(&[&model], bounds)?)
    }
}

fn resolve(vocabulary: &Vocabulary, names: &[String]) -> Result<BTreeSet<Category>, CastError> {
    names
        .iter()
        .map(|name| {
            vocabulary
                .symbol(name)
                .map(Category)
                .ok_or_else(|| CastError::UnknownCategory(name.clone()))
        })
        .collect()
}

fn fill_undefined(characters: &mut [Character], first_order: &BTreeSet<Category>) {
    let categories: BTreeSet<Category> = characters
        .iter()
        .flat_map(|c| c.assignment.keys().copied())
        .chain(first_order.iter().copied())
        .collect();
    for character in characters {
        for category in &categories {
            character.assignment.entry(*category).or_insert(Value::Undefined);
        }
    }
}

fn occurrences(characters: &[Character]) -> BTreeMap<ElementRef, u32> {
    let mut counts = BTreeMap::new();
    for character in characters {
        for (category, value) in &character.assignment {
            *counts.entry(ElementRef::new(*category, *value)).or_insert(0) += 1;
        }
    }
    counts
}

/// Drop relations into categories the model lacks and targets it does not
/// contain. A relation left with no targets points at `UNDEFINED`.
fn scrub(model: &mut ConstraintModel) {
    let present: BTreeSet<ElementRef> = model.elements().map(|(element_ref, _)| element_ref).collect();
    let categories: BTreeSet<Category> = model.categories().collect();

    let refs: Vec<ElementRef> = present.iter().copied().collect();
    for element_ref in refs {
        let Some(element) = model.element_mut(element_ref.category, element_ref.value) else {
            continue;
        };
        element.relations.retain(|r| categories.contains(&r.category));
        for relation in &mut element.relations {
            let category = relation.category;
            relation
                .targets
                .retain(|t| *t == Value::Undefined || present.contains(&ElementRef::new(category, *t)));
            if relation.targets.is_empty() {
                relation.targets.insert(Value::Undefined);
            }
        }
    }
}

/// Exact counts and co-occurrences of the ground truth.
fn solution(characters: &[Character], counts: &BTreeMap<ElementRef, u32>) -> ConstraintModel {
    let mut links: BTreeMap<ElementRef, BTreeMap<Category, BTreeSet<Value>>> = BTreeMap::new();
    for character in characters {
        for (category, value) in &character.assignment {
            let entry = links.entry(ElementRef::new(*category, *value)).or_default();
            for (other, held) in &character.assignment {
                entry.entry(*other).or_default().insert(*held);
            }
        }
    }

    let mut model = ConstraintModel::new();
    for (element_ref, count) in counts {
        let mut element = Element::new().with_bounds(*count, *count);
        for (category, targets) in links.remove(element_ref).unwrap_or_default() {
            element.add_relation(Relation::forward(category, targets));
        }
        model.insert(element_ref.category, element_ref.value, element);
    }
    model
}

fn first_order_targets(
    full: &ConstraintModel,
    characters: &[Character],
    first_order: &BTreeSet<Category>,
    counts: &BTreeMap<ElementRef, u32>,
) -> FirstOrderTargets {
    let mut targets = FirstOrderTargets::new(first_order.clone());
    for category in first_order {
        for (value, element) in full.category(*category).into_iter().flatten() {
            if value.is_sentinel() || !element.is_live() {
                continue;
            }
            if !characters.iter().any(|c| !c.red_herring && c.value(*category) == *value) {
                continue;
            }
            let fact = ElementRef::new(*category, *value);
            let resolved = first_order
                .iter()
                .filter(|other| *other != category)
                .filter_map(|other| element.forward_targets(*other).map(|set| (*other, set.clone())))
                .collect();
            targets.facts.insert(
                fact,
                TargetFact {
                    multiplicity: counts.get(&fact).copied().unwrap_or(element.bounds.min),
                    resolved,
                },
            );
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use puzzle_rules::Assignment;

    fn nobles() -> (DesignerData, Vec<Character>) {
        let designer = DesignerData::from_json(
            r#"{
                "Name": { "Hugo": [], "Ada": [], "Otto": [] },
                "Title": { "Duke": [["Title", "MAX:1", "Duke"]], "Earl": [] }
            }"#,
        )
        .unwrap();
        let name = designer.category("Name").unwrap();
        let title = designer.category("Title").unwrap();
        let value = |n: &str| Value::Named(designer.vocabulary.symbol(n).unwrap());

        let characters = vec![
            Character::new(Assignment::from([(name, value("Hugo")), (title, value("Duke"))])).with_identity("Hugo"),
            Character::new(Assignment::from([(name, value("Ada")), (title, value("Earl"))])).with_identity("Ada"),
        ];
        (designer, characters)
    }

    fn config() -> PuzzleConfig {
        let mut config = PuzzleConfig::default();
        config.first_order = vec!["Name".to_string(), "Title".to_string()];
        config.cast.given_categories = vec!["Title".to_string()];
        config
    }

    #[test]
    fn test_targets_cover_used_values() {
        let (designer, characters) = nobles();
        let cast = CastBuilder::new(&config()).build(&designer, characters).unwrap();

        assert_eq!(cast.bounds, CastBounds::new(2, Some(2)));
        // Hugo, Ada, Duke, Earl; Otto is not used by anyone.
        assert_eq!(cast.targets.len(), 4);
        assert_eq!(cast.unknowns, 4);

        let name = designer.category("Name").unwrap();
        let title = designer.category("Title").unwrap();
        let hugo = Value::Named(designer.vocabulary.symbol("Hugo").unwrap());
        let duke = Value::Named(designer.vocabulary.symbol("Duke").unwrap());
        let fact = cast.targets.get(&ElementRef::new(name, hugo)).unwrap();
        assert_eq!(fact.multiplicity, 1);
        assert_eq!(fact.resolved.get(&title), Some(&BTreeSet::from([duke])));
    }

    #[test]
    fn test_baselines_admit_the_ground_truth() {
        let (designer, characters) = nobles();
        let cast = CastBuilder::new(&config()).build(&designer, characters).unwrap();
        let truth = cast.assignments();
        assert!(cast.minimal.admits(&truth));
        assert!(cast.partial.admits(&truth));
        assert!(cast.full.admits(&truth));
        assert_eq!(fitness::ambiguities(&cast.full, &cast.targets), 0);
    }

    #[test]
    fn test_unknown_first_order_category() {
        let (designer, characters) = nobles();
        let mut config = config();
        config.first_order.push("Domain".to_string());
        assert!(matches!(
            CastBuilder::new(&config).build(&designer, characters),
            Err(CastError::UnknownCategory(name)) if name == "Domain"
        ));
    }

    #[test]
    fn test_missing_values_become_undefined() {
        let (designer, mut characters) = nobles();
        let title = designer.category("Title").unwrap();
        characters[1].assignment.remove(&title);
        let cast = CastBuilder::new(&config()).build(&designer, characters).unwrap();
        assert_eq!(cast.characters[1].value(title), Value::Undefined);
    }
}
