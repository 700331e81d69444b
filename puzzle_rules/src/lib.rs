//! # Puzzle Rules
//!
//! The rule book crate - vocabulary, constraint models, relation kinds,
//! characters, clues and the cast record, plus loaders for designer data and
//! puzzle configuration. This crate holds data only; all deduction lives in
//! `puzzle_core`.

pub mod cast;
pub mod config;
pub mod designer;
pub mod entities;
pub mod error;
pub mod model;
pub mod relations;
pub mod vocabulary;

pub use cast::*;
pub use config::*;
pub use designer::DesignerData;
pub use entities::*;
pub use error::RulesError;
pub use model::*;
pub use relations::*;
pub use vocabulary::*;
