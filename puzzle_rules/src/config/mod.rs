//! Puzzle configuration, read from TOML.
//!
//! ```toml
//! first_order = ["Christian Name", "Family Name", "Domain"]
//!
//! [cast]
//! principals = 5
//!
//! [search]
//! seed = 7
//! max_elapsed_ms = 30000
//! ```
//!
//! Every field is optional.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::RulesError;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PuzzleConfig {
    /// Categories the puzzle must make solvable.
    pub first_order: Vec<String>,
    pub cast: CastSettings,
    pub search: SearchSettings,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            first_order: ["Christian Name", "Family Name", "Nobility", "Domain", "Headline"]
                .map(String::from)
                .to_vec(),
            cast: CastSettings::default(),
            search: SearchSettings::default(),
        }
    }
}

impl PuzzleConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml(source: &str) -> Result<Self, RulesError> {
        Ok(toml::from_str(source)?)
    }

    /// Read configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml(&source)
    }
}

/// A category characters draw an identity value from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityCategory {
    pub name: String,
    /// No two characters may share a value.
    #[serde(default)]
    pub unique: bool,
}

impl IdentityCategory {
    pub fn new(name: impl Into<String>, unique: bool) -> Self {
        Self {
            name: name.into(),
            unique,
        }
    }
}

/// Settings for random cast generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CastSettings {
    pub principals: u32,
    pub red_herrings: u32,
    /// Categories drawn for every character, in draw order.
    pub identity_categories: Vec<IdentityCategory>,
    /// Category only principals receive.
    pub marker_category: Option<String>,
    /// Categories whose full element set is background knowledge.
    pub given_categories: Vec<String>,
    /// Display format; `#Category#` is replaced by the character's value.
    pub identity_format: String,
    /// Generation attempts before giving up.
    pub attempts: u32,
    /// Every first-order value the cast uses is known to occur.
    pub first_order_known: bool,
    /// Every first-order value the cast uses occurs at most once.
    pub first_order_unique: bool,
}

impl Default for CastSettings {
    fn default() -> Self {
        Self {
            principals: 5,
            red_herrings: 0,
            identity_categories: vec![
                IdentityCategory::new("Christian Name", true),
                IdentityCategory::new("Family Name", true),
                IdentityCategory::new("Nobility", true),
                IdentityCategory::new("Domain", true),
                IdentityCategory::new("Headline", true),
                IdentityCategory::new("Gender", false),
            ],
            marker_category: Some("Headline".to_string()),
            given_categories: vec!["Nobility".to_string(), "Gender".to_string()],
            identity_format: "#Christian Name# #Family Name#, #Nobility# of #Domain#".to_string(),
            attempts: 1,
            first_order_known: false,
            first_order_unique: false,
        }
    }
}

/// How generation g+1 is formed from the survivors of generation g.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverMode {
    /// The best narrative seeds every slot.
    #[default]
    Elitist,
    /// Parents survive and the best recombination of each pair joins them.
    Recombine,
}

/// Order in which characters contribute their first clue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterOrder {
    #[default]
    Random,
    /// Fewest admissible clues first.
    MostConstrained,
}

/// Settings for the evolutionary search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub population: usize,
    pub seed: u64,
    /// Stagnation only ends the search after this long.
    pub min_elapsed_ms: u64,
    /// Hard wall-clock budget.
    pub max_elapsed_ms: u64,
    /// Largest subset examined by the matching pass.
    pub hall_subset_size: usize,
    /// Propagation rounds before giving up on a fixed point.
    pub max_rounds: usize,
    pub crossover: CrossoverMode,
    pub character_order: CharacterOrder,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            population: 3,
            seed: 0,
            min_elapsed_ms: 0,
            max_elapsed_ms: 240_000,
            hall_subset_size: 5,
            max_rounds: 10_000,
            crossover: CrossoverMode::Elitist,
            character_order: CharacterOrder::Random,
        }
    }
}
