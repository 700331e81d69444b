//! Constraint propagation.
//!
//! [`Propagator::propagate`] unions a set of model fragments and repeatedly
//! applies the deduction passes until nothing changes. The result is a new
//! model whose forward relations list exactly the targets each element may
//! still co-occur with, or a [`Contradiction`] if the fragments cannot hold
//! together.
//!
//! Passes run cheapest first and the loop restarts from the top whenever a
//! pass narrows anything:
//!
//! 1. forward consistency
//! 2. negation inference
//! 3. placeholder resolution
//! 4. cast-wide bound tightening
//! 5. Hall-style saturation

mod counting;
mod forward;
mod inference;
mod target_set;
mod workspace;

use thiserror::Error;
use tracing::{trace, warn};

use puzzle_rules::{CastBounds, Category, ConstraintModel, ElementRef, SearchSettings};

use workspace::Workspace;

/// Proof that a set of fragments admits no assignment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Contradiction {
    #[error("{element:?} must occur but has no admissible target in {category}")]
    NoTargets { element: ElementRef, category: Category },

    #[error("{element:?} has inverted bounds [{min}, {max}]")]
    InvertedBounds { element: ElementRef, min: u32, max: u32 },

    #[error("{category} demands {demand} occurrences but can supply only {supply}")]
    Overdemanded { category: Category, demand: u64, supply: u64 },
}

/// Work limits for a single propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationLimits {
    /// Largest value group the saturation pass considers.
    pub hall_subset_size: usize,
    /// Rounds before giving up on reaching a fixed point.
    pub max_rounds: usize,
}

impl Default for PropagationLimits {
    fn default() -> Self {
        Self {
            hall_subset_size: 5,
            max_rounds: 10_000,
        }
    }
}

impl From<&SearchSettings> for PropagationLimits {
    fn from(settings: &SearchSettings) -> Self {
        Self {
            hall_subset_size: settings.hall_subset_size,
            max_rounds: settings.max_rounds,
        }
    }
}

/// Runs the deduction passes to a fixed point.
#[derive(Debug, Clone, Default)]
pub struct Propagator {
    limits: PropagationLimits,
}

impl Propagator {
    pub fn new(limits: PropagationLimits) -> Self {
        Self { limits }
    }

    pub fn with_defaults() -> Self {
        Self::new(PropagationLimits::default())
    }

    pub fn limits(&self) -> PropagationLimits {
        self.limits
    }

    /// Union `fragments` and propagate them under `bounds`.
    ///
    /// The inputs are never modified. Propagating the output again yields
    /// the same model.
    pub fn propagate(&self, fragments: &[&ConstraintModel], bounds: CastBounds) -> Result<ConstraintModel, Contradiction> {
        let mut ws = Workspace::build(fragments, bounds);

        let mut rounds = 0;
        loop {
            if rounds >= self.limits.max_rounds {
                warn!(rounds, "propagation stopped before reaching a fixed point");
                break;
            }
            rounds += 1;

            if forward::forward_consistency(&mut ws)? {
                continue;
            }
            if inference::infer_negations(&mut ws) {
                continue;
            }
            if inference::resolve_placeholders(&mut ws) {
                continue;
            }
            if counting::tighten_bounds(&mut ws)? {
                continue;
            }
            if counting::saturate(&mut ws, self.limits.hall_subset_size)? {
                continue;
            }
            break;
        }

        trace!(rounds, slots = ws.slots.len(), "propagation settled");
        Ok(ws.emit())
    }
}
