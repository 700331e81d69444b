//! Relation kinds and their authoring tokens.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::RulesError;
use crate::vocabulary::{Category, Value};

/// Separator between members of a target set in designer data.
pub const SET_SEPARATOR: char = '/';

/// The closed set of relation kinds.
///
/// The first seven are canonical. The shorthands are only ever seen on
/// authored data; propagation rewrites them before doing anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    /// `=>&` - exactly one member of the target set co-occurs.
    ForwardUnique,
    /// `=>|` - at least one member of the target set co-occurs.
    ForwardSet,
    /// `==&` - forward-unique, mirrored onto every target.
    Equivalence,
    /// `==|` - disjunctive equivalence, narrows like a forward set.
    EquivalenceSet,
    /// `=<&` - every target forward-implies the source.
    Backward,
    /// `!=&` - no member of the target set co-occurs.
    Negation,
    /// `!!=&` - negation mirrored onto targets; separates placeholders.
    MutualNegation,
    /// `=>`
    Implies,
    /// `==`
    Equals,
    /// `=<`
    ImpliedBy,
    /// `!=`
    Not,
    /// `!!=`
    Distinct,
    /// `MIN:n` - every target occurs at least `n` times.
    Minimum(u32),
    /// `MAX:n` - every target occurs at most `n` times.
    Maximum(u32),
}

impl RelationKind {
    /// The authoring token for this kind.
    pub fn as_token(&self) -> String {
        match self {
            RelationKind::ForwardUnique => "=>&".to_string(),
            RelationKind::ForwardSet => "=>|".to_string(),
            RelationKind::Equivalence => "==&".to_string(),
            RelationKind::EquivalenceSet => "==|".to_string(),
            RelationKind::Backward => "=<&".to_string(),
            RelationKind::Negation => "!=&".to_string(),
            RelationKind::MutualNegation => "!!=&".to_string(),
            RelationKind::Implies => "=>".to_string(),
            RelationKind::Equals => "==".to_string(),
            RelationKind::ImpliedBy => "=<".to_string(),
            RelationKind::Not => "!=".to_string(),
            RelationKind::Distinct => "!!=".to_string(),
            RelationKind::Minimum(n) => format!("MIN:{n}"),
            RelationKind::Maximum(n) => format!("MAX:{n}"),
        }
    }

    /// Canonical form of a shorthand, given the size of its target set.
    pub fn canonical(self, targets: usize) -> Self {
        match self {
            RelationKind::Implies if targets == 1 => RelationKind::ForwardUnique,
            RelationKind::Implies => RelationKind::ForwardSet,
            RelationKind::Equals if targets == 1 => RelationKind::Equivalence,
            RelationKind::Equals => RelationKind::EquivalenceSet,
            RelationKind::ImpliedBy => RelationKind::Backward,
            RelationKind::Not => RelationKind::Negation,
            RelationKind::Distinct => RelationKind::MutualNegation,
            other => other,
        }
    }

    /// Kinds that narrow the source's allowed targets by intersection.
    pub fn is_forward(&self) -> bool {
        matches!(
            self,
            RelationKind::ForwardUnique
                | RelationKind::ForwardSet
                | RelationKind::Equivalence
                | RelationKind::EquivalenceSet
        )
    }

    /// Kinds that remove their targets from the source's allowed targets.
    pub fn is_negation(&self) -> bool {
        matches!(self, RelationKind::Negation | RelationKind::MutualNegation)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_token())
    }
}

impl FromStr for RelationKind {
    type Err = RulesError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let kind = match token {
            "=>&" => RelationKind::ForwardUnique,
            "=>|" => RelationKind::ForwardSet,
            "==&" => RelationKind::Equivalence,
            "==|" => RelationKind::EquivalenceSet,
            "=<&" => RelationKind::Backward,
            "!=&" => RelationKind::Negation,
            "!!=&" => RelationKind::MutualNegation,
            "=>" => RelationKind::Implies,
            "==" => RelationKind::Equals,
            "=<" => RelationKind::ImpliedBy,
            "!=" => RelationKind::Not,
            "!!=" => RelationKind::Distinct,
            _ => {
                let (prefix, count) = token
                    .split_once(':')
                    .ok_or_else(|| RulesError::UnknownToken(token.to_string()))?;
                let count: u32 = count
                    .parse()
                    .map_err(|_| RulesError::InvalidCount(token.to_string()))?;
                match prefix {
                    "MIN" => RelationKind::Minimum(count),
                    "MAX" => RelationKind::Maximum(count),
                    _ => return Err(RulesError::UnknownToken(token.to_string())),
                }
            }
        };
        Ok(kind)
    }
}

/// A directed constraint edge from an element into a category.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub category: Category,
    pub kind: RelationKind,
    pub targets: BTreeSet<Value>,
}

impl Relation {
    /// Create a relation from any iterator of targets.
    pub fn new(category: Category, kind: RelationKind, targets: impl IntoIterator<Item = Value>) -> Self {
        Self {
            category,
            kind,
            targets: targets.into_iter().collect(),
        }
    }

    /// Forward-unique relation to a single value.
    pub fn unique(category: Category, value: Value) -> Self {
        Self::new(category, RelationKind::ForwardUnique, [value])
    }

    /// Forward relation picking the unique or set form by size.
    pub fn forward(category: Category, targets: BTreeSet<Value>) -> Self {
        let kind = if targets.len() == 1 {
            RelationKind::ForwardUnique
        } else {
            RelationKind::ForwardSet
        };
        Self { category, kind, targets }
    }

    /// `MIN:n` assertion over the given targets.
    pub fn minimum(category: Category, count: u32, targets: impl IntoIterator<Item = Value>) -> Self {
        Self::new(category, RelationKind::Minimum(count), targets)
    }

    /// Negation of the given targets.
    pub fn negation(category: Category, targets: impl IntoIterator<Item = Value>) -> Self {
        Self::new(category, RelationKind::Negation, targets)
    }

    /// The single target of this relation, if it has exactly one.
    pub fn single_target(&self) -> Option<Value> {
        if self.targets.len() == 1 {
            self.targets.iter().next().copied()
        } else {
            None
        }
    }
}
