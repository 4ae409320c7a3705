//! The instruction model: the compiled form of a grammar expression.

use crate::charset::CharSet;

/// One machine instruction, executed by the parser machine in `vm`.
///
/// Instructions form a tree per rule; rule calls go through `Id` indices
/// into the owning [`crate::Grammar`].
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// Call the rule at `index`, labelling its result with the rule name.
    Id { index: usize, name: String },

    /// Ordered choice. `guards[i]` is the first codepoint alternative `i`
    /// must see, when one could be computed; a mismatch skips the attempt.
    Alt {
        alts: Vec<Instr>,
        guards: Vec<Option<char>>,
    },

    /// Children matched left to right, the whole sequence repeated
    /// `min..max` times. `max` 0 means unbounded.
    Seq {
        min: u32,
        max: u32,
        exprs: Vec<Instr>,
    },

    /// A single expression repeated `min..max` times. `max` 0 means
    /// unbounded.
    Rep {
        min: u32,
        max: u32,
        expr: Box<Instr>,
    },

    /// Lookahead prefix `&`, `!` or `~`.
    Pre { sign: char, expr: Box<Instr> },

    /// Literal codepoint sequence. Upper-cased at compile time when `icase`.
    Sq { icase: bool, text: String },

    /// Literal where every space codepoint also skips whitespace in the
    /// input.
    Dq { icase: bool, text: String },

    /// A codepoint set matched `min..max` times; `neg` flips membership.
    Chs {
        neg: bool,
        min: u32,
        max: u32,
        set: CharSet,
    },

    /// Host extension call; carries the text between `<` and `>`.
    Extn { text: String },
}
