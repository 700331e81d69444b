//! # Puzzle Core (The Forge)
//!
//! The engine of the puzzle generator. This crate reads the data types of
//! `puzzle_rules`, deduces what a set of clues implies, and searches for the
//! clue subsets that make a cast's first-order facts solvable.
//!
//! ## Core Components
//!
//! - **propagation**: Sound, incomplete deduction over constraint models
//! - **admissibility**: Style rules deciding which clues may still be added
//! - **fitness**: Unknowns, ambiguities and obviousness of a narrative
//! - **casting**: Cast baselines, random casts and clue catalogues
//! - **search**: The evolutionary loop and its choice procedure
//!
//! ## Design Philosophy
//!
//! - **Value Models**: Propagation never mutates its inputs; models are shared through `Arc`
//! - **Seeded**: One seeded generator drives every random decision of a run
//! - **Time-Boxed**: Long phases poll a deadline and return their best so far

pub mod admissibility;
pub mod casting;
pub mod error;
pub mod fitness;
pub mod propagation;
pub mod search;

pub use admissibility::{admissible, Exposure};
pub use casting::*;
pub use error::CastError;
pub use fitness::Fitness;
pub use propagation::{Contradiction, PropagationLimits, Propagator};
pub use search::*;
