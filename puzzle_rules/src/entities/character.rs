//! Character definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{CharacterId, Clue};
use crate::model::Assignment;
use crate::vocabulary::{Category, Value, Vocabulary};

/// Delimiter around category names in identity formats.
pub const IDENTITY_DELIMITER: char = '#';

/// A member of the cast: the ground truth for one row of the puzzle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    /// Display identity; `None` when an identity category is undefined.
    pub identity: Option<String>,
    /// Red herrings never accuse and are not resolution targets.
    pub red_herring: bool,
    pub assignment: Assignment,
    /// Template -> clues this character can deliver.
    #[serde(default)]
    pub clues: BTreeMap<Category, Vec<Clue>>,
}

impl Character {
    /// Create a new character with the given ground-truth assignment.
    pub fn new(assignment: Assignment) -> Self {
        Self {
            id: CharacterId::new(),
            identity: None,
            red_herring: false,
            assignment,
            clues: BTreeMap::new(),
        }
    }

    /// Builder: set the identifier.
    pub fn with_id(mut self, id: CharacterId) -> Self {
        self.id = id;
        self
    }

    /// Builder: set the display identity.
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Builder: mark as a red herring.
    pub fn red_herring(mut self) -> Self {
        self.red_herring = true;
        self
    }

    /// The character's value in a category.
    pub fn value(&self, category: Category) -> Value {
        self.assignment.get(&category).copied().unwrap_or(Value::Undefined)
    }

    /// Principals have a defined identity, are not red herrings and count
    /// towards the cast floor.
    pub fn is_principal(&self) -> bool {
        !self.red_herring && self.identity.is_some()
    }

    pub fn has_catalogue(&self) -> bool {
        self.clues.values().any(|clues| !clues.is_empty())
    }

    pub fn catalogue_size(&self) -> usize {
        self.clues.values().map(Vec::len).sum()
    }

    /// Every clue in the catalogue, grouped template by template.
    pub fn catalogue(&self) -> impl Iterator<Item = &Clue> {
        self.clues.values().flatten()
    }

    /// Fill an identity format such as `"#Name#, #Title# of #Domain#"`.
    ///
    /// Returns `None` if a referenced category is missing or undefined.
    pub fn compose_identity(&self, format: &str, vocabulary: &Vocabulary) -> Option<String> {
        let mut parts = format.split(IDENTITY_DELIMITER);
        let mut identity = parts.next().unwrap_or_default().to_string();
        for (i, part) in parts.enumerate() {
            if i % 2 == 1 {
                identity.push_str(part);
                continue;
            }
            let category = Category(vocabulary.symbol(part)?);
            match self.value(category) {
                Value::Named(symbol) => identity.push_str(vocabulary.name(symbol)?),
                _ => return None,
            }
        }
        Some(identity)
    }
}
