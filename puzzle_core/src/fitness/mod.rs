//! Fitness Evaluator - scores a narrative against the first-order targets.
//!
//! Three metrics, compared in order:
//!
//! - **unknowns**: first-order facts no clue asserts to exist
//! - **ambiguities**: how far the propagated model is from fully resolving
//!   every first-order fact
//! - **obviousness**: summed clue costs, used only to break ties

use serde::{Deserialize, Serialize};
use std::fmt;

use puzzle_rules::{Cast, Clue, ConstraintModel, FirstOrderTargets};

use crate::propagation::Propagator;

/// Scores of one narrative. Lower is better in every field; the derived
/// ordering compares unknowns, then ambiguities, then obviousness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fitness {
    pub unknowns: u32,
    pub ambiguities: u32,
    pub obviousness: u32,
}

impl Fitness {
    pub fn new(unknowns: u32, ambiguities: u32, obviousness: u32) -> Self {
        Self {
            unknowns,
            ambiguities,
            obviousness,
        }
    }

    /// Score a set of clues and the model their union propagates to.
    pub fn evaluate<'a>(
        clues: impl IntoIterator<Item = &'a Clue> + Clone,
        model: &ConstraintModel,
        targets: &FirstOrderTargets,
    ) -> Self {
        Self::new(
            unknowns(clues.clone(), targets),
            ambiguities(model, targets),
            obviousness(clues),
        )
    }

    /// Whether this candidate is worth taking over `baseline`.
    ///
    /// Fewer unknowns always wins. Ambiguity only counts once nothing is
    /// unknown, and obviousness only once nothing is ambiguous either.
    pub fn improves_on(&self, baseline: &Fitness) -> bool {
        self.unknowns < baseline.unknowns
            || (self.unknowns == 0 && self.ambiguities < baseline.ambiguities)
            || (self.unknowns == 0 && self.ambiguities == 0 && self.obviousness < baseline.obviousness)
    }

    /// Every first-order fact is known and fully resolved.
    pub fn is_solved(&self) -> bool {
        self.unknowns == 0 && self.ambiguities == 0
    }
}

impl fmt::Display for Fitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknowns={} ambiguities={} obviousness={}",
            self.unknowns, self.ambiguities, self.obviousness
        )
    }
}

/// First-order facts not revealed by any of `clues`.
pub fn unknowns<'a>(clues: impl IntoIterator<Item = &'a Clue>, targets: &FirstOrderTargets) -> u32 {
    let clues: Vec<&Clue> = clues.into_iter().collect();
    targets
        .iter()
        .filter(|(fact, _)| !clues.iter().any(|clue| clue.reveals_fact(fact)))
        .count() as u32
}

/// Distance between `model` and the fully-resolved first-order targets.
///
/// For every target and every other first-order category, counts the extra
/// values the model still allows. A target missing from the model counts
/// every live named value of the category.
pub fn ambiguities(model: &ConstraintModel, targets: &FirstOrderTargets) -> u32 {
    let mut total = 0u32;
    for (fact, target) in targets.iter() {
        for (category, resolved) in &target.resolved {
            if *category == fact.category {
                continue;
            }
            let allowed = model
                .forward_targets(fact.category, fact.value, *category)
                .map(|set| set.len())
                .or_else(|| {
                    model.category(*category).map(|elements| {
                        elements
                            .iter()
                            .filter(|(value, element)| !value.is_sentinel() && element.is_live())
                            .count()
                    })
                })
                .unwrap_or(resolved.len());
            total = total.saturating_add(allowed.saturating_sub(resolved.len()) as u32);
        }
    }
    total
}

/// Summed obviousness costs.
pub fn obviousness<'a>(clues: impl IntoIterator<Item = &'a Clue>) -> u32 {
    clues.into_iter().fold(0u32, |sum, clue| sum.saturating_add(clue.obviousness))
}

/// How much ambiguity a clue removes on its own from the partial baseline.
///
/// `None` if the clue contradicts the baseline.
pub fn price(cast: &Cast, clue: &Clue, propagator: &Propagator) -> Option<u32> {
    let model = propagator
        .propagate(&[cast.partial.as_ref(), clue.fragment.as_ref()], cast.bounds)
        .ok()?;
    Some(cast.ambiguities.saturating_sub(ambiguities(&model, &cast.targets)))
}
