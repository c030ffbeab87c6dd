//! Error types for the convergence engine

use serde::Serialize;
use thiserror::Error;

use crate::types::ConvergenceMode;

/// Raw input does not conform to the declared resource schema
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("{path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("{path}: unknown field '{field}'")]
    UnknownField { path: String, field: String },

    #[error("{path}: list element is missing identity field '{field}'")]
    MissingIdentity { path: String, field: String },

    #[error("{path}: value '{value}' is not one of [{}]", choices.join(", "))]
    InvalidChoice {
        path: String,
        value: String,
        choices: Vec<String>,
    },

    #[error("{path}: value {value} is outside the range {min}..={max}")]
    OutOfRange {
        path: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("{path}: '{value}' is not a valid {kind}")]
    InvalidAddress {
        path: String,
        value: String,
        kind: &'static str,
    },

    #[error("{path}: entity with identity ({identity}) appears more than once")]
    DuplicateIdentity { path: String, identity: String },
}

/// Which side of a comparison an identity problem was found on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Desired,
    Current,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Desired => write!(f, "desired"),
            Self::Current => write!(f, "current"),
        }
    }
}

/// Ambiguous or malformed entity identities
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DifferError {
    #[error("{path}: duplicate {side} entity with identity ({identity})")]
    DuplicateIdentity {
        path: String,
        identity: String,
        side: Side,
    },

    #[error("{path}: entity to add is missing identity field '{field}'")]
    MissingIdentity { path: String, field: String },
}

/// An entity to be created lacks fields the device needs to create it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{path}: cannot create entity without {}", missing.join(", "))]
pub struct IncompleteEntityError {
    pub path: String,
    pub missing: Vec<String>,
}

/// A change to an immutable field, resolved by destroy-and-recreate
///
/// Never returned as an `Err`; carried as a notice and reported as a warning.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{path}: {} cannot be changed in place, entity will be recreated", fields.join(", "))]
pub struct ImmutableFieldConflict {
    pub path: String,
    pub fields: Vec<String>,
}

/// Errors raised by a reconciliation call
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Differ(#[from] DifferError),

    #[error(transparent)]
    IncompleteEntity(#[from] IncompleteEntityError),

    #[error("resource '{resource}' does not support state '{mode}'")]
    UnsupportedMode {
        resource: String,
        mode: ConvergenceMode,
    },

    #[error("unknown resource '{0}'")]
    UnknownResource(String),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;
