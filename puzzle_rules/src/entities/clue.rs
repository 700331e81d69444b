//! Clues - instantiated templates bound to an accusing character.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::{CharacterId, ClueId};
use crate::model::{ConstraintModel, Element};
use crate::relations::RelationKind;
use crate::vocabulary::{Category, ElementRef, Value};

/// A single clue.
///
/// The fragment holds the template category; its elements are the clue's
/// subjects and carry the relations the clue asserts about them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clue {
    pub id: ClueId,
    /// Template identity; also the category holding the subjects.
    pub template: Category,
    pub text: String,
    pub fragment: Arc<ConstraintModel>,
    pub accuser: CharacterId,
    /// Tie-break cost; lower is subtler.
    pub obviousness: u32,
    reveals: BTreeSet<ElementRef>,
}

impl Clue {
    /// Create a clue, precomputing the facts it reveals.
    pub fn new(
        template: Category,
        text: impl Into<String>,
        fragment: ConstraintModel,
        accuser: CharacterId,
    ) -> Self {
        let reveals = revealed_facts(template, &fragment);
        Self {
            id: ClueId::new(),
            template,
            text: text.into(),
            fragment: Arc::new(fragment),
            accuser,
            obviousness: 0,
            reveals,
        }
    }

    /// Builder: set the identifier.
    pub fn with_id(mut self, id: ClueId) -> Self {
        self.id = id;
        self
    }

    /// Builder: set the obviousness cost.
    pub fn with_obviousness(mut self, obviousness: u32) -> Self {
        self.obviousness = obviousness;
        self
    }

    /// Facts asserted to exist by a `MIN:n` (n >= 1) relation on a subject.
    pub fn reveals(&self) -> &BTreeSet<ElementRef> {
        &self.reveals
    }

    pub fn reveals_fact(&self, fact: &ElementRef) -> bool {
        self.reveals.contains(fact)
    }

    /// Subjects of the clue, excluding sentinels.
    pub fn subjects(&self) -> impl Iterator<Item = (Value, &Element)> {
        self.fragment
            .category(self.template)
            .into_iter()
            .flatten()
            .filter(|(value, _)| !value.is_sentinel())
            .map(|(value, element)| (*value, element))
    }

    /// For every unambiguous subject, the concrete values it is uniquely
    /// linked to within `categories`. Subjects with no such link are omitted.
    pub fn associations(&self, categories: &BTreeSet<Category>) -> Vec<BTreeMap<Category, Value>> {
        self.subjects()
            .filter(|(_, element)| !element.ambiguous)
            .filter_map(|(_, element)| {
                let association: BTreeMap<Category, Value> = element
                    .relations
                    .iter()
                    .filter(|r| r.kind.canonical(r.targets.len()) == RelationKind::ForwardUnique && categories.contains(&r.category))
                    .filter_map(|r| r.single_target().filter(|v| !v.is_sentinel()).map(|v| (r.category, v)))
                    .collect();
                (!association.is_empty()).then_some(association)
            })
            .collect()
    }
}

fn revealed_facts(template: Category, fragment: &ConstraintModel) -> BTreeSet<ElementRef> {
    fragment
        .category(template)
        .into_iter()
        .flatten()
        .flat_map(|(_, element)| element.relations.iter())
        .filter(|r| matches!(r.kind, RelationKind::Minimum(n) if n >= 1))
        .flat_map(|r| r.targets.iter().map(move |t| ElementRef::new(r.category, *t)))
        .collect()
}
