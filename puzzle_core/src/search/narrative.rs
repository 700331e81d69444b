//! Candidate puzzles.

use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

use puzzle_rules::{Cast, Category, Clue, ClueId, ConstraintModel};

use crate::fitness::Fitness;
use crate::propagation::{Contradiction, Propagator};

/// An ordered list of clues with the model they propagate to and cached
/// scores.
///
/// Narratives under construction may hold a model that does not yet include
/// their newest clues; [`super::Chooser`] folds those in before scoring.
#[derive(Debug, Clone, Serialize)]
pub struct Narrative {
    pub clues: Vec<Clue>,
    #[serde(skip)]
    pub model: Arc<ConstraintModel>,
    pub fitness: Fitness,
}

impl Narrative {
    /// The empty narrative, scored against the partial baseline.
    pub fn baseline(cast: &Cast) -> Self {
        Self {
            clues: Vec::new(),
            model: Arc::clone(&cast.partial),
            fitness: Fitness::new(cast.unknowns, cast.ambiguities, 0),
        }
    }

    /// Builder: a copy with `clue` appended. The model is shared, not
    /// re-propagated.
    pub fn with_clue(&self, clue: Clue) -> Self {
        let mut next = self.clone();
        next.clues.push(clue);
        next
    }

    pub fn len(&self) -> usize {
        self.clues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clues.is_empty()
    }

    pub fn contains_template(&self, template: Category) -> bool {
        self.clues.iter().any(|clue| clue.template == template)
    }

    /// Number of this narrative's clues whose template `other` also uses.
    pub fn collisions(&self, other: &Narrative) -> usize {
        self.clues
            .iter()
            .filter(|clue| other.contains_template(clue.template))
            .count()
    }

    pub fn clue_ids(&self) -> BTreeSet<ClueId> {
        self.clues.iter().map(|clue| clue.id).collect()
    }

    /// Same clues, in any order.
    pub fn same_clues(&self, other: &Narrative) -> bool {
        self.len() == other.len() && self.clue_ids() == other.clue_ids()
    }

    pub fn has_distinct_templates(&self) -> bool {
        let templates: BTreeSet<Category> = self.clues.iter().map(|clue| clue.template).collect();
        templates.len() == self.clues.len()
    }

    /// Re-propagate every clue from the partial baseline and score the result.
    pub fn recompute(&self, cast: &Cast, propagator: &Propagator) -> Result<Fitness, Contradiction> {
        let fragments: Vec<&ConstraintModel> = std::iter::once(cast.partial.as_ref())
            .chain(self.clues.iter().map(|clue| clue.fragment.as_ref()))
            .collect();
        let model = propagator.propagate(&fragments, cast.bounds)?;
        Ok(Fitness::evaluate(&self.clues, &model, &cast.targets))
    }
}
