//! Host extensions: `<name args...>` instructions resolved against a user
//! registry first, then the built-ins `?` (trace), `same`/`@`, and `infix`.

use hashbrown::HashMap;

use crate::ptree::Ptree;
use crate::vm::Env;

/// A host function callable from a grammar. It receives the payload split at
/// spaces (the extension name first) and the parse environment, and reports
/// success or failure. An extension must leave the environment well-formed:
/// restore what it consumed on failure, and keep the ptree stack consistent.
pub type ExtFn = for<'a> fn(&[&str], &mut Env<'a>) -> bool;

/// Extension registry handed to [`crate::Peg::compile_with`]. User entries
/// shadow the built-ins.
#[derive(Debug, Clone, Default)]
pub struct Extensions {
    map: HashMap<String, ExtFn>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, ext: ExtFn) {
        self.map.insert(name.into(), ext);
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<ExtFn> {
        self.map.get(name).copied().or_else(|| builtin(name))
    }
}

fn builtin(name: &str) -> Option<ExtFn> {
    match name {
        "?" => Some(ext_trace),
        "same" | "@" => Some(ext_same),
        "infix" => Some(ext_infix),
        _ => None,
    }
}

/// `<?>`: turn on the step trace for the enclosing rule invocation.
fn ext_trace<'a>(_args: &[&str], env: &mut Env<'a>) -> bool {
    env.enable_trace();
    true
}

/// `<same NAME>`: the next input must repeat the text of the previous
/// sibling node named NAME. With no prior sibling it matches the empty
/// string.
fn ext_same<'a>(args: &[&str], env: &mut Env<'a>) -> bool {
    let name = match args.get(1) {
        Some(name) => *name,
        None => return false,
    };
    match env.prior_match(name) {
        Some(text) => {
            if env.rest().starts_with(text) {
                env.consume(text.len());
                true
            } else {
                false
            }
        }
        None => true,
    }
}

/// `<infix>`: fold the flat `operand (op operand)*` children of the
/// enclosing rule into a precedence tree. Binding powers come from the last
/// four characters of an operator's rule name: `_d__` is left-associative at
/// level `d`, `__d_` right-associative. The folded node is named by the
/// operator's matched text.
fn ext_infix<'a>(_args: &[&str], env: &mut Env<'a>) -> bool {
    let mark = env.rule_mark();
    if env.tree.len() - mark < 3 {
        // Already reduced (or nothing to fold): a second pass is a no-op.
        return true;
    }
    let items: Vec<&'a Ptree<'a>> = env.tree[mark..].to_vec();
    let mut index = 0;
    let root = pratt(env, &items, &mut index, 0);
    env.tree.truncate(mark);
    env.tree.push(root);
    true
}

fn pratt<'a>(
    env: &Env<'a>,
    items: &[&'a Ptree<'a>],
    index: &mut usize,
    min_bp: i32,
) -> &'a Ptree<'a> {
    let mut lhs = items[*index];
    *index += 1;
    while *index < items.len() {
        let op = items[*index];
        let (lbp, rbp) = bind_powers(op.name);
        if lbp <= min_bp {
            break;
        }
        *index += 1;
        if *index >= items.len() {
            // A trailing operator has nothing to bind; drop it.
            break;
        }
        let rhs = pratt(env, items, index, rbp);
        let name = env.slice(op.start, op.end);
        let children = env.arena.alloc_slice_copy(&[lhs, rhs]);
        lhs = env
            .arena
            .alloc(Ptree::branch(name, lhs.start, rhs.end, children));
    }
    lhs
}

/// Left and right binding powers of an operator rule name, derived from its
/// last four characters: `_d__` gives `(2d+1, 2d+2)`, `__d_` gives
/// `(2d+2, 2d+1)`. Anything else is an operand with no binding power.
fn bind_powers(name: &str) -> (i32, i32) {
    let tail: Vec<char> = name.chars().rev().take(4).collect();
    if tail.len() < 4 {
        return (0, 0);
    }
    // tail is reversed: tail[3] is the fourth-from-last character.
    let (a, b, c, d) = (tail[3], tail[2], tail[1], tail[0]);
    if a == '_' && c == '_' && d == '_' && b.is_ascii_digit() {
        let level = b as i32 - '0' as i32;
        (2 * level + 1, 2 * level + 2)
    } else if a == '_' && b == '_' && d == '_' && c.is_ascii_digit() {
        let level = c as i32 - '0' as i32;
        (2 * level + 2, 2 * level + 1)
    } else {
        (0, 0)
    }
}
