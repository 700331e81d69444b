//! Errors raised while reading designer data and configuration.

use thiserror::Error;

/// Errors from the rule book.
#[derive(Debug, Error)]
pub enum RulesError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown relation token: {0:?}")]
    UnknownToken(String),

    #[error("Invalid occurrence count in {0:?}")]
    InvalidCount(String),

    #[error("Relation on {category}/{element} must have 3 parts, found {found}")]
    RelationArity {
        category: String,
        element: String,
        found: usize,
    },

    #[error("Designer data contains no categories")]
    EmptyDesigner,

    #[error("Unknown category: {0}")]
    UnknownCategory(String),
}
