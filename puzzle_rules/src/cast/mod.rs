//! The cast - immutable background knowledge for one puzzle.
//!
//! A cast holds the ground truth (its characters), three progressively more
//! complete propagation baselines, and the first-order facts the puzzle is
//! designed to make solvable. It is built once by the engine and then only
//! read, apart from clue catalogues being attached.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::entities::{Character, CharacterId};
use crate::model::{Assignment, ConstraintModel};
use crate::vocabulary::{Category, ElementRef, Value, Vocabulary};

/// Global bounds on how many characters a category's occurrences add up to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastBounds {
    /// Number of principals; every category has at least this many occurrences.
    pub floor: u32,
    /// Total number of characters, if known.
    pub ceiling: Option<u32>,
}

impl CastBounds {
    pub fn new(floor: u32, ceiling: Option<u32>) -> Self {
        Self { floor, ceiling }
    }

    /// No global knowledge about cast size.
    pub fn open() -> Self {
        Self::new(0, None)
    }

    /// A world containing at most one character.
    pub fn single() -> Self {
        Self::new(0, Some(1))
    }
}

impl Default for CastBounds {
    fn default() -> Self {
        Self::open()
    }
}

/// Resolution target for one first-order fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetFact {
    /// Exact number of characters carrying the fact.
    pub multiplicity: u32,
    /// Fully-resolved forward targets into the other first-order categories.
    pub resolved: BTreeMap<Category, BTreeSet<Value>>,
}

/// The facts a finished puzzle must pin down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstOrderTargets {
    pub categories: BTreeSet<Category>,
    pub facts: BTreeMap<ElementRef, TargetFact>,
}

impl FirstOrderTargets {
    pub fn new(categories: BTreeSet<Category>) -> Self {
        Self {
            categories,
            facts: BTreeMap::new(),
        }
    }

    pub fn get(&self, fact: &ElementRef) -> Option<&TargetFact> {
        self.facts.get(fact)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ElementRef, &TargetFact)> {
        self.facts.iter()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

/// Background knowledge for one puzzle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cast {
    pub vocabulary: Vocabulary,
    pub characters: Vec<Character>,

    /// Designer givens plus the values the cast uses.
    pub minimal: Arc<ConstraintModel>,
    /// Minimal, plus every used value known to occur.
    pub partial: Arc<ConstraintModel>,
    /// The complete solution.
    pub full: Arc<ConstraintModel>,

    pub targets: FirstOrderTargets,
    pub bounds: CastBounds,

    /// Unknowns of the empty narrative.
    pub unknowns: u32,
    /// Ambiguities of the partial baseline.
    pub ambiguities: u32,
}

impl Cast {
    /// Number of principals.
    pub fn principals(&self) -> usize {
        self.characters.iter().filter(|c| c.is_principal()).count()
    }

    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    pub fn character_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.characters.iter_mut().find(|c| c.id == id)
    }

    /// Characters with at least one clue to give.
    pub fn characters_with_catalogue(&self) -> impl Iterator<Item = &Character> {
        self.characters.iter().filter(|c| c.has_catalogue())
    }

    /// Ground-truth rows, in cast order.
    pub fn assignments(&self) -> Vec<Assignment> {
        self.characters.iter().map(|c| c.assignment.clone()).collect()
    }
}
