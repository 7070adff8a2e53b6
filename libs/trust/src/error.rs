//! Errors for schema compilation and checking

use thiserror::Error;
use types::error::DecodeError;

/// Errors raised while parsing, compiling or loading a trust schema
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LvsError {
    /// The schema text fails the grammar
    #[error("syntax error: {0}")]
    Syntax(String),

    /// A named rule is defined more than once
    #[error("rule {0} is redefined")]
    Redefinition(String),

    /// A rule references an identifier that is never defined
    #[error("rule {rule} refers to a non-existing rule {target}")]
    DanglingReference { rule: String, target: String },

    /// A rule references an anonymous rule
    #[error("rule {rule} refers to a temporary rule {target}")]
    TemporaryReference { rule: String, target: String },

    /// Rule references form a cycle
    #[error("cyclic reference among rules: {0}")]
    CyclicReference(String),

    /// A constraint names a pattern with no prior occurrence
    #[error("pattern {0} never occurs before its constraint")]
    UnboundPattern(String),

    /// A temporary pattern appears on the right-hand side of a constraint
    #[error("temporary pattern {0} cannot be used in a constraint option")]
    TemporaryInOption(String),

    /// A signing constraint names a rule with no terminal nodes
    #[error("signed by a non-existing key {0}")]
    MissingKeyRule(String),

    /// The schema calls a user function the checker does not provide
    #[error("user function {0} is undefined")]
    UndefinedUserFn(String),

    /// The binary model is malformed or of an unsupported version
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

pub type LvsResult<T> = Result<T, LvsError>;
