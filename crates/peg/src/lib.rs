//! Portable PEG (pPEG)
//!
//! Grammars written in pPEG syntax compile to an instruction program; the
//! program runs over an input string and builds a parse tree (ptree). The
//! system is self-hosting: the grammar language is described by
//! [`PEG_GRAMMAR`], and the compiler parses user grammars with a
//! precompiled program for it.
//!
//! # Example
//!
//! ```ignore
//! use ppeg::{Bump, Peg};
//!
//! let date = Peg::compile(r#"
//!     Date  = year '-' month '-' day
//!     year  = [0-9]*4
//!     month = [0-9]*2
//!     day   = [0-9]*2
//! "#)?;
//!
//! let arena = Bump::new();
//! let tree = date.parse(&arena, "2021-04-05")?;
//! assert_eq!(
//!     tree.to_string(),
//!     r#"["Date", [["year", "2021"], ["month", "04"], ["day", "05"]]]"#,
//! );
//! ```
//!
//! Grammar compilation faults are raised as [`GrammarError`]; parse failures
//! come back as [`ParseError`] with an `In rule: ..., expected: ...` report
//! and a caret under the offending column.

mod bootstrap;
mod charset;
mod compiler;
mod error;
mod escape;
mod extensions;
mod format;
mod grammar;
mod instruction;
mod ptree;
mod vm;

pub use bumpalo::Bump;

// Re-export from ppeg-common
pub use common::{create_logger, Logger};

pub use bootstrap::PEG_GRAMMAR;
pub use charset::CharSet;
pub use error::{GrammarError, ParseError};
pub use extensions::{ExtFn, Extensions};
pub use format::{format_ptree, line_col, line_report};
pub use grammar::{Grammar, Rule};
pub use instruction::Instr;
pub use ptree::Ptree;
pub use vm::{Env, ParseOptions, TraceMode};

/// A compiled parser: a grammar program plus the extensions it may call.
///
/// The program is immutable and the parser may be shared; each parse gets
/// its own environment and allocates its ptree in the caller's arena.
#[derive(Debug)]
pub struct Peg {
    grammar: Grammar,
    extensions: Extensions,
}

impl Peg {
    /// Compile a pPEG grammar.
    pub fn compile(grammar: &str) -> Result<Self, GrammarError> {
        Self::compile_with(grammar, Extensions::new())
    }

    /// Compile a pPEG grammar with user extensions for its `<...>` calls.
    pub fn compile_with(grammar: &str, extensions: Extensions) -> Result<Self, GrammarError> {
        let arena = Bump::new();
        let no_extensions = Extensions::new();
        let tree = vm::parse(
            bootstrap::boot(),
            &no_extensions,
            &arena,
            grammar,
            &ParseOptions::default(),
        )
        .map_err(|err| match err {
            ParseError::Grammar(grammar_err) => grammar_err,
            other => GrammarError::Syntax {
                report: other.to_string(),
            },
        })?;
        let grammar = compiler::compile(tree)?;
        Ok(Self {
            grammar,
            extensions,
        })
    }

    /// Parse `input`, allocating the ptree in `arena`. The tree borrows the
    /// arena, the input, and this parser's rule names.
    pub fn parse<'a>(
        &'a self,
        arena: &'a Bump,
        input: &'a str,
    ) -> Result<&'a Ptree<'a>, ParseError> {
        self.parse_with(arena, input, &ParseOptions::default())
    }

    /// Parse with options: an alternate start rule, step tracing, the
    /// `short` mode that tolerates unconsumed input, or a different
    /// recursion bound.
    pub fn parse_with<'a>(
        &'a self,
        arena: &'a Bump,
        input: &'a str,
        options: &ParseOptions,
    ) -> Result<&'a Ptree<'a>, ParseError> {
        vm::parse(&self.grammar, &self.extensions, arena, input, options)
    }

    /// The compiled program (its `Display` lists the rules).
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }
}

/// Compile a pPEG grammar. Convenience for [`Peg::compile`].
pub fn compile(grammar: &str) -> Result<Peg, GrammarError> {
    Peg::compile(grammar)
}
