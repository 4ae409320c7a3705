//! The parser machine: a recursive evaluator over compiled instructions,
//! threading a mutable environment that owns the cursor, the ptree stack,
//! and fault tracking.

use bumpalo::Bump;
use common::{create_logger, log, log_fail, log_success, Logger};

use crate::error::{GrammarError, ParseError};
use crate::extensions::Extensions;
use crate::format::{line_col, line_report};
use crate::grammar::Grammar;
use crate::instruction::Instr;
use crate::ptree::Ptree;

const DEFAULT_MAX_DEPTH: usize = 100;

/// Options accepted by [`crate::Peg::parse_with`].
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Parse from this rule instead of the grammar's first rule.
    pub start: Option<String>,
    /// Step tracing: off, everywhere, or only inside a named rule.
    pub trace: TraceMode,
    /// Return the root even when input remains unconsumed.
    pub short: bool,
    /// Override the rule recursion bound (default 100).
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TraceMode {
    #[default]
    Off,
    All,
    Rule(String),
}

struct Frame<'a> {
    name: &'a str,
    mark: usize,
    traced: bool,
}

/// The mutable parse environment. One is created per parse and threaded by
/// exclusive borrow through the whole evaluation; extensions receive it to
/// inspect and advance the parse.
pub struct Env<'a> {
    pub input: &'a str,
    /// Cursor: byte offset of the next codepoint to match.
    pub pos: usize,
    /// Flat ptree builder stack. Rules slice their children off the top.
    pub tree: Vec<&'a Ptree<'a>>,
    pub arena: &'a Bump,

    grammar: &'a Grammar,
    extensions: &'a Extensions,
    frames: Vec<Frame<'a>>,
    max_depth: usize,

    peak: usize,
    fault_pos: usize,
    fault_rule: Option<&'a str>,
    fault_exp: Option<&'a Instr>,

    trace_all: bool,
    trace_rule: Option<String>,
    trace_nest: usize,
    trace_ext: Option<usize>,
    pre_nest: usize,

    log: Logger,
}

/// Run `grammar` over `input`, allocating the resulting ptree in `arena`.
pub fn parse<'a>(
    grammar: &'a Grammar,
    extensions: &'a Extensions,
    arena: &'a Bump,
    input: &'a str,
    options: &ParseOptions,
) -> Result<&'a Ptree<'a>, ParseError> {
    let start = match &options.start {
        Some(name) => grammar
            .lookup(name)
            .ok_or_else(|| GrammarError::UndefinedRule(name.clone()))?,
        None => grammar.start,
    };

    let mut env = Env {
        input,
        pos: 0,
        tree: Vec::new(),
        arena,
        grammar,
        extensions,
        frames: Vec::new(),
        max_depth: options.max_depth.unwrap_or(DEFAULT_MAX_DEPTH),
        peak: 0,
        fault_pos: 0,
        fault_rule: None,
        fault_exp: None,
        trace_all: options.trace == TraceMode::All,
        trace_rule: match &options.trace {
            TraceMode::Rule(name) => Some(name.clone()),
            _ => None,
        },
        trace_nest: 0,
        trace_ext: None,
        pre_nest: 0,
        log: create_logger("parse"),
    };
    log!(
        env.log,
        "parse rule {} over {} bytes",
        grammar.rule(start).name,
        input.len()
    );

    let ok = env.call_rule(start)?;

    if input.is_empty() {
        if ok && env.tree.len() == 1 {
            return Ok(env.tree[0]);
        }
        return Err(ParseError::EmptyInput);
    }
    if !ok {
        let at = env.peak.max(env.fault_pos);
        let (line, col) = line_col(input, at);
        let (rule, expected) = match (env.fault_rule, env.fault_exp) {
            (Some(rule), Some(exp)) => (rule.to_string(), exp.to_string()),
            _ => (
                grammar.rule(start).name.clone(),
                grammar.rule(start).expr.to_string(),
            ),
        };
        log_fail!(env.log, "in rule {} at {}.{}", rule, line, col);
        return Err(ParseError::Failed {
            rule,
            expected,
            line,
            col,
            report: line_report(input, at),
        });
    }
    if env.pos < input.len() && !options.short {
        let (line, col) = line_col(input, env.pos);
        log_fail!(env.log, "fell short at {}.{}", line, col);
        return Err(ParseError::FellShort {
            line,
            col,
            report: line_report(input, env.pos),
        });
    }
    log_success!(env.log, "consumed {} of {} bytes", env.pos, input.len());
    match env.tree.len() {
        1 => Ok(env.tree[0]),
        _ => Err(ParseError::BadTree),
    }
}

impl<'a> Env<'a> {
    // -------------------------------------------------------------------
    // Extension-facing helpers
    // -------------------------------------------------------------------

    /// The input from the cursor onward.
    pub fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// A byte span of the input (e.g. a ptree node's `start..end`).
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.input[start..end]
    }

    /// Advance the cursor by `bytes`, updating the peak position.
    pub fn consume(&mut self, bytes: usize) {
        self.pos += bytes;
        if self.pos > self.peak {
            self.peak = self.pos;
        }
    }

    /// Ptree stack index where the current rule's children begin.
    pub fn rule_mark(&self) -> usize {
        self.frames.last().map(|f| f.mark).unwrap_or(0)
    }

    /// Name of the rule currently being evaluated.
    pub fn rule_name(&self) -> &'a str {
        self.frames.last().map(|f| f.name).unwrap_or("")
    }

    /// Matched text of the most recent sibling node named `name` in the
    /// current rule, if any.
    pub fn prior_match(&self, name: &str) -> Option<&'a str> {
        self.tree[self.rule_mark()..]
            .iter()
            .rev()
            .find(|node| node.name == name)
            .map(|node| self.slice(node.start, node.end))
    }

    /// Turn on step tracing until the enclosing rule invocation returns.
    /// Idempotent while tracing is already active.
    pub fn enable_trace(&mut self) {
        if !self.trace_all && self.trace_nest == 0 && self.trace_ext.is_none() {
            self.trace_ext = Some(self.frames.len());
        }
    }

    // -------------------------------------------------------------------
    // Rule invocation and ptree shaping
    // -------------------------------------------------------------------

    fn call_rule(&mut self, index: usize) -> Result<bool, GrammarError> {
        let grammar = self.grammar;
        let rule = &grammar.rules[index];
        let name = rule.name.as_str();
        if self.frames.len() >= self.max_depth {
            return Err(GrammarError::DepthLimit {
                trail: self.frame_trail(name),
            });
        }

        let start = self.pos;
        let mark = self.tree.len();
        let traced = self.trace_rule.as_deref() == Some(name);
        if traced {
            self.trace_nest += 1;
        }
        self.frames.push(Frame { name, mark, traced });
        if self.tracing() {
            self.trace_line(name);
        }

        let ok = self.eval(&rule.expr)?;

        if !ok {
            if self.tracing() {
                self.trace_line(&format!("{} != {}", name, clip(self.rest())));
            }
            // The deepest progress-making rule failure names the fault.
            if self.pos > start && self.pos > self.fault_pos {
                self.fault_pos = self.pos;
                self.fault_rule = Some(name);
                self.fault_exp = Some(&rule.expr);
            }
            self.pop_frame();
            self.pos = start;
            self.tree.truncate(mark);
            return Ok(false);
        }

        if name.starts_with('_') {
            self.pop_frame();
            self.tree.truncate(mark);
            return Ok(true);
        }
        let arity = self.tree.len() - mark;
        if arity == 0 {
            let leaf = Ptree::leaf(name, start, self.pos, &self.input[start..self.pos]);
            self.tree.push(self.arena.alloc(leaf));
            if self.tracing() {
                self.trace_line(&format!("{} == {:?}", name, &self.input[start..self.pos]));
            }
        } else if arity > 1 || name.starts_with(|c: char| c.is_ascii_uppercase()) {
            let children = self.arena.alloc_slice_copy(&self.tree[mark..]);
            self.tree.truncate(mark);
            let branch = Ptree::branch(name, start, self.pos, children);
            self.tree.push(self.arena.alloc(branch));
            if self.tracing() {
                self.trace_line(&format!("{} => {}", name, clip(&self.tree.last().unwrap().to_string())));
            }
        }
        // arity == 1 with a lowercase name: the child stands in for the rule.
        self.pop_frame();
        Ok(true)
    }

    fn pop_frame(&mut self) {
        if let Some(frame) = self.frames.pop() {
            if frame.traced {
                self.trace_nest -= 1;
            }
        }
        if let Some(depth) = self.trace_ext {
            if depth > self.frames.len() {
                self.trace_ext = None;
            }
        }
    }

    fn frame_trail(&self, name: &str) -> String {
        let mut names: Vec<&str> = self.frames.iter().rev().take(7).map(|f| f.name).collect();
        names.reverse();
        names.push(name);
        names.join(" ")
    }

    // -------------------------------------------------------------------
    // Instruction evaluation
    // -------------------------------------------------------------------

    fn eval(&mut self, instr: &'a Instr) -> Result<bool, GrammarError> {
        match instr {
            Instr::Id { index, .. } => self.call_rule(*index),

            Instr::Alt { alts, guards } => {
                let start = self.pos;
                let mark = self.tree.len();
                let next = self.rest().chars().next();
                for (i, alt) in alts.iter().enumerate() {
                    if let Some(guard) = guards.get(i).copied().flatten() {
                        if next != Some(guard) {
                            continue;
                        }
                    }
                    if self.eval(alt)? {
                        return Ok(true);
                    }
                    self.pos = start;
                    self.tree.truncate(mark);
                }
                Ok(false)
            }

            Instr::Seq { min, max, exprs } => {
                let start = self.pos;
                let mark = self.tree.len();
                let mut count = 0u32;
                'iterations: loop {
                    let iter_pos = self.pos;
                    let iter_mark = self.tree.len();
                    for expr in exprs {
                        if !self.eval(expr)? {
                            // Record the fault before rolling the partial
                            // iteration back.
                            if self.pos > iter_pos && self.pos > self.fault_pos {
                                self.fault_pos = self.pos;
                                self.fault_rule = self.frames.last().map(|f| f.name);
                                self.fault_exp = Some(expr);
                            }
                            self.pos = iter_pos;
                            self.tree.truncate(iter_mark);
                            break 'iterations;
                        }
                    }
                    count += 1;
                    if *max != 0 && count == *max {
                        break;
                    }
                    if self.pos == iter_pos {
                        break;
                    }
                }
                if count < *min {
                    self.pos = start;
                    self.tree.truncate(mark);
                    return Ok(false);
                }
                Ok(true)
            }

            Instr::Rep { min, max, expr } => {
                let mark = self.tree.len();
                let mut count = 0u32;
                loop {
                    let iter_pos = self.pos;
                    if !self.eval(expr)? {
                        break;
                    }
                    count += 1;
                    if *max != 0 && count == *max {
                        break;
                    }
                    if self.pos == iter_pos {
                        break;
                    }
                }
                if count < *min {
                    self.tree.truncate(mark);
                    return Ok(false);
                }
                Ok(true)
            }

            Instr::Pre { sign, expr } => {
                let start = self.pos;
                let mark = self.tree.len();
                let peak = self.peak;
                self.pre_nest += 1;
                let ok = self.eval(expr)?;
                self.pre_nest -= 1;
                self.pos = start;
                self.tree.truncate(mark);
                self.peak = peak;
                match sign {
                    '~' => {
                        if ok {
                            return Ok(false);
                        }
                        match self.rest().chars().next() {
                            Some(c) => {
                                self.consume(c.len_utf8());
                                Ok(true)
                            }
                            None => Ok(false),
                        }
                    }
                    '!' => Ok(!ok),
                    _ => Ok(ok),
                }
            }

            Instr::Sq { icase, text } => {
                let ok = self.match_sq(*icase, text);
                if self.tracing() {
                    self.trace_match(instr, ok);
                }
                Ok(ok)
            }

            Instr::Dq { icase, text } => {
                let ok = self.match_dq(*icase, text)?;
                if self.tracing() {
                    self.trace_match(instr, ok);
                }
                Ok(ok)
            }

            Instr::Chs { neg, min, max, set } => {
                let mut count = 0u32;
                loop {
                    let c = match self.rest().chars().next() {
                        Some(c) => c,
                        None => break,
                    };
                    if set.matches(c) == *neg {
                        break;
                    }
                    self.consume(c.len_utf8());
                    count += 1;
                    if *max != 0 && count == *max {
                        break;
                    }
                }
                let ok = count >= *min;
                if self.tracing() {
                    self.trace_match(instr, ok);
                }
                Ok(ok)
            }

            Instr::Extn { text } => {
                let args: Vec<&str> = text.split(' ').filter(|s| !s.is_empty()).collect();
                let name = args.first().copied().unwrap_or("");
                let ext = self
                    .extensions
                    .lookup(name)
                    .ok_or_else(|| GrammarError::UndefinedExtension(text.clone()))?;
                Ok(ext(&args, self))
            }
        }
    }

    // -------------------------------------------------------------------
    // Terminal matching
    // -------------------------------------------------------------------

    fn match_sq(&mut self, icase: bool, text: &str) -> bool {
        if !icase {
            if self.rest().starts_with(text) {
                self.consume(text.len());
                return true;
            }
            return false;
        }
        let mut pos = self.pos;
        for expected in text.chars() {
            match self.input[pos..].chars().next() {
                Some(c) if c.to_ascii_uppercase() == expected => pos += c.len_utf8(),
                _ => return false,
            }
        }
        let bytes = pos - self.pos;
        self.consume(bytes);
        true
    }

    /// Spaces in the literal skip whitespace in the input. On a mismatch the
    /// cursor stays where matching stopped: whitespace already skipped is
    /// kept.
    fn match_dq(&mut self, icase: bool, text: &str) -> Result<bool, GrammarError> {
        for expected in text.chars() {
            if expected == ' ' {
                self.skip_space()?;
                continue;
            }
            match self.rest().chars().next() {
                Some(c) if folded(c, icase) == expected => self.consume(c.len_utf8()),
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    /// Whitespace for `"..."` literals: the user's `_space_` rule when the
    /// grammar defines one, else ASCII space, tab, CR, LF.
    fn skip_space(&mut self) -> Result<(), GrammarError> {
        match self.grammar.space {
            Some(index) => {
                self.call_rule(index)?;
            }
            None => loop {
                match self.rest().chars().next() {
                    Some(c @ (' ' | '\t' | '\r' | '\n')) => self.consume(c.len_utf8()),
                    _ => break,
                }
            },
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Step trace
    // -------------------------------------------------------------------

    fn tracing(&self) -> bool {
        self.pre_nest == 0
            && (self.trace_all || self.trace_nest > 0 || self.trace_ext.is_some())
    }

    fn trace_line(&self, msg: &str) {
        let (line, col) = line_col(self.input, self.pos);
        let indent = "| ".repeat(self.frames.len().saturating_sub(1));
        eprintln!("{}.{} {}{}", line, col, indent, msg);
    }

    fn trace_match(&self, instr: &Instr, ok: bool) {
        if ok {
            self.trace_line(&format!("{} ==", instr));
        } else {
            self.trace_line(&format!("{} != {}", instr, clip(self.rest())));
        }
    }
}

fn folded(c: char, icase: bool) -> char {
    if icase {
        c.to_ascii_uppercase()
    } else {
        c
    }
}

fn clip(s: &str) -> String {
    let text: String = s.chars().take(12).collect();
    if text.len() < s.len() {
        format!("{:?}...", text)
    } else {
        format!("{:?}", text)
    }
}
