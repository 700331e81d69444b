//! Engine-level errors.

use thiserror::Error;

use puzzle_rules::RulesError;

use crate::propagation::Contradiction;

/// Errors raised while building or generating a cast.
#[derive(Debug, Error)]
pub enum CastError {
    #[error("no consistent cast found after {attempts} attempts")]
    Infeasible { attempts: u32 },

    #[error("category '{0}' is not part of the designer data")]
    UnknownCategory(String),

    #[error("cast baseline is contradictory: {0}")]
    Contradiction(#[from] Contradiction),

    #[error(transparent)]
    Rules(#[from] RulesError),
}
