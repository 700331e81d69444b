//! Interned names for categories and element values.
//!
//! Designer data talks in strings ("Christian Name", "Hugo"); everything past
//! the loading boundary talks in [`Symbol`]s so that models can be compared,
//! hashed and cloned without touching string storage.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Token used by designer data for the "attribute deliberately unset" sentinel.
pub const UNDEFINED_NAME: &str = "UNDEFINED";

/// Token used by designer data for the void target placeholder.
pub const EMPTY_NAME: &str = "";

/// An interned name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(pub u32);

/// Name table shared by a designer file, its cast and its clues.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vocabulary {
    names: Vec<String>,
    #[serde(skip)]
    lookup: HashMap<String, Symbol>,
}

impl Vocabulary {
    /// Create an empty vocabulary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a name, returning the existing symbol if it is already known.
    pub fn intern(&mut self, name: impl AsRef<str>) -> Symbol {
        let name = name.as_ref();
        if let Some(symbol) = self.symbol(name) {
            self.lookup.entry(name.to_string()).or_insert(symbol);
            return symbol;
        }

        let symbol = Symbol(self.names.len() as u32);
        self.names.push(name.to_string());
        self.lookup.insert(name.to_string(), symbol);
        symbol
    }

    /// Look up a name without interning it.
    pub fn symbol(&self, name: &str) -> Option<Symbol> {
        self.lookup
            .get(name)
            .copied()
            .or_else(|| self.names.iter().position(|n| n == name).map(|i| Symbol(i as u32)))
    }

    /// Resolve a symbol back to its name.
    pub fn name(&self, symbol: Symbol) -> Option<&str> {
        self.names.get(symbol.0 as usize).map(String::as_str)
    }

    /// Intern a category name.
    pub fn category(&mut self, name: impl AsRef<str>) -> Category {
        Category(self.intern(name))
    }

    /// Intern an element name, mapping the sentinel tokens onto their [`Value`]s.
    pub fn value(&mut self, name: impl AsRef<str>) -> Value {
        match name.as_ref() {
            UNDEFINED_NAME => Value::Undefined,
            EMPTY_NAME => Value::Empty,
            other => Value::Named(self.intern(other)),
        }
    }

    /// Render a value for display.
    pub fn display_value(&self, value: Value) -> String {
        match value {
            Value::Undefined => UNDEFINED_NAME.to_string(),
            Value::Empty => "<empty>".to_string(),
            Value::Named(symbol) => self.name(symbol).unwrap_or("<unknown>").to_string(),
        }
    }

    /// Render a category for display.
    pub fn display_category(&self, category: Category) -> String {
        self.name(category.0).unwrap_or("<unknown>").to_string()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// An attribute dimension (e.g. "Domain").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(pub Symbol);

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0 .0)
    }
}

/// A value within a category.
///
/// Every category implicitly owns the two sentinels. `Undefined` stands for
/// characters that carry no value in the category; `Empty` never occurs and
/// is the target of relations from elements that are known not to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    Undefined,
    Empty,
    Named(Symbol),
}

impl Value {
    pub fn is_sentinel(&self) -> bool {
        !matches!(self, Value::Named(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "{UNDEFINED_NAME}"),
            Value::Empty => write!(f, "<empty>"),
            Value::Named(symbol) => write!(f, "#{}", symbol.0),
        }
    }
}

/// A `(category, value)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    pub category: Category,
    pub value: Value,
}

impl ElementRef {
    pub fn new(category: Category, value: Value) -> Self {
        Self { category, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_stable() {
        let mut vocabulary = Vocabulary::new();
        let a = vocabulary.intern("Domain");
        let b = vocabulary.intern("Domain");
        assert_eq!(a, b);
        assert_eq!(vocabulary.name(a), Some("Domain"));
        assert_eq!(vocabulary.len(), 1);
    }

    #[test]
    fn test_sentinel_tokens_map_to_sentinels() {
        let mut vocabulary = Vocabulary::new();
        assert_eq!(vocabulary.value("UNDEFINED"), Value::Undefined);
        assert_eq!(vocabulary.value(""), Value::Empty);
        assert!(matches!(vocabulary.value("Hugo"), Value::Named(_)));
        assert!(vocabulary.value("").is_sentinel());
    }

    #[test]
    fn test_symbol_lookup_after_deserialize() {
        let mut vocabulary = Vocabulary::new();
        vocabulary.intern("Title");
        let json = serde_json::to_string(&vocabulary).unwrap();
        let restored: Vocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.symbol("Title"), Some(Symbol(0)));
        assert_eq!(restored.symbol("Missing"), None);
    }
}
