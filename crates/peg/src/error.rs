//! Error types: grammar faults are raised, parse failures are returned.

use thiserror::Error;

/// A defect in the grammar itself. Raised by [`crate::compile`], or during a
/// parse when the grammar turns out to be structurally unusable (unbounded
/// recursion, a missing extension).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GrammarError {
    /// The grammar text did not parse as pPEG syntax.
    #[error("grammar error\n{report}")]
    Syntax { report: String },

    #[error("Duplicate rule: {0}")]
    DuplicateRule(String),

    #[error("Undefined rule: {0}")]
    UndefinedRule(String),

    #[error("undefined extension <{0}>")]
    UndefinedExtension(String),

    /// Rule recursion exceeded the depth bound; `trail` holds the last few
    /// rule names on the call stack.
    #[error("recursion depth exceeded in: {trail}")]
    DepthLimit { trail: String },

    /// The compiler was fed a ptree that is not a grammar parse.
    #[error("malformed grammar tree: {0}")]
    BadGrammarTree(String),
}

/// A failure to parse an input with a well-formed grammar.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// The parse failed outright. `rule` and `expected` name the deepest
    /// progress-making failure; `report` echoes the offending line with a
    /// caret.
    #[error("In rule: {rule}, expected: {expected}, failed at line: {line}.{col}\n{report}")]
    Failed {
        rule: String,
        expected: String,
        line: usize,
        col: usize,
        report: String,
    },

    /// The start rule matched but input remains (and the `short` option was
    /// not set).
    #[error("Fell short at line: {line}.{col}\n{report}")]
    FellShort {
        line: usize,
        col: usize,
        report: String,
    },

    #[error("empty input string")]
    EmptyInput,

    /// The parse consumed the input but left zero or several roots.
    #[error("parse produced a bad tree (internal error)")]
    BadTree,

    /// A grammar error surfaced mid-parse.
    #[error(transparent)]
    Grammar(#[from] GrammarError),
}
