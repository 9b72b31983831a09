//! Error types for the parser generator.

use thiserror::Error;

use crate::parser::ParseErrorDetail;

/// Errors that can occur during table generation and parsing.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Grammar has no productions")]
    EmptyGrammar,

    #[error("Start symbol `{0}` is not a nonterminal of the grammar")]
    UnknownStartSymbol(String),

    #[error("Operator declaration needs an associativity and at least one symbol")]
    InvalidOperatorDecl,

    #[error("Unknown associativity: {0}")]
    InvalidAssociativity(String),

    #[error("{0}")]
    Parse(ParseErrorDetail),

    #[error("Ambiguous parse table entry at state {state} on `{symbol}`")]
    AmbiguousCell { state: usize, symbol: String },

    #[error("Parsing aborted by a semantic action")]
    Aborted,
}

/// Type alias for Results in this crate.
pub type Result<T> = std::result::Result<T, Error>;
