//! The precompiled instruction program for the pPEG grammar language.
//!
//! `compile` parses user grammars with this program, then rebuilds a fresh
//! program from the resulting ptree. The rules here are exactly what the
//! compiler produces from [`PEG_GRAMMAR`]; the self-hosting test keeps the
//! two in lock-step.

use std::sync::OnceLock;

use hashbrown::HashMap;

use crate::charset::CharSet;
use crate::compiler::attach_guards;
use crate::grammar::{Grammar, Rule};
use crate::instruction::Instr;

/// The pPEG grammar grammar.
pub static PEG_GRAMMAR: &str = r#"
    Peg   = " " (rule " ")+
    rule  = id " = " alt

    alt   = seq (" / " seq)*
    seq   = rep (" " rep)*
    rep   = pre sfx?
    pre   = pfx? term
    term  = call / sq / dq / chs / group / extn

    id    = [a-zA-Z_] [a-zA-Z0-9_]*
    pfx   = [&!~]
    sfx   = [+?] / '*' range?
    range = num (dots num?)?
    num   = [0-9]+
    dots  = '..'

    call  = id !" ="
    sq    = "'" ~"'"* "'" 'i'?
    dq    = '"' ~'"'* '"' 'i'?
    chs   = '[' ~']'* ']'
    group = "( " alt " )"
    extn  = '<' ~'>'* '>'

    _space_ = ('#' ~[\n\r]* / [ \t\n\r]+)*
"#;

static BOOT: OnceLock<Grammar> = OnceLock::new();

/// The bootstrap program, built once.
pub(crate) fn boot() -> &'static Grammar {
    BOOT.get_or_init(build)
}

fn build() -> Grammar {
    let names = [
        "Peg", "rule", "alt", "seq", "rep", "pre", "term", "id", "pfx", "sfx", "range", "num",
        "dots", "call", "sq", "dq", "chs", "group", "extn", "_space_",
    ];

    let exprs = vec![
        // Peg = " " (rule " ")+
        seq(vec![dq(" "), seq_n(1, 0, vec![id(1, "rule"), dq(" ")])]),
        // rule = id " = " alt
        seq(vec![id(7, "id"), dq(" = "), id(2, "alt")]),
        // alt = seq (" / " seq)*
        seq(vec![id(3, "seq"), seq_n(0, 0, vec![dq(" / "), id(3, "seq")])]),
        // seq = rep (" " rep)*
        seq(vec![id(4, "rep"), seq_n(0, 0, vec![dq(" "), id(4, "rep")])]),
        // rep = pre sfx?
        seq(vec![id(5, "pre"), rep(0, 1, id(9, "sfx"))]),
        // pre = pfx? term
        seq(vec![rep(0, 1, id(8, "pfx")), id(6, "term")]),
        // term = call / sq / dq / chs / group / extn
        alt(vec![
            id(13, "call"),
            id(14, "sq"),
            id(15, "dq"),
            id(16, "chs"),
            id(17, "group"),
            id(18, "extn"),
        ]),
        // id = [a-zA-Z_] [a-zA-Z0-9_]*
        seq(vec![chs(1, 1, "a-zA-Z_"), chs(0, 0, "a-zA-Z0-9_")]),
        // pfx = [&!~]
        chs(1, 1, "&!~"),
        // sfx = [+?] / '*' range?
        alt(vec![
            chs(1, 1, "+?"),
            seq(vec![sq("*"), rep(0, 1, id(10, "range"))]),
        ]),
        // range = num (dots num?)?
        seq(vec![
            id(11, "num"),
            seq_n(0, 1, vec![id(12, "dots"), rep(0, 1, id(11, "num"))]),
        ]),
        // num = [0-9]+
        chs(1, 0, "0-9"),
        // dots = '..'
        sq(".."),
        // call = id !" ="
        seq(vec![id(7, "id"), pre('!', dq(" ="))]),
        // sq = "'" ~"'"* "'" 'i'?
        seq(vec![
            dq("'"),
            rep(0, 0, pre('~', dq("'"))),
            dq("'"),
            chs(0, 1, "i"),
        ]),
        // dq = '"' ~'"'* '"' 'i'?
        seq(vec![
            sq("\""),
            chs_neg(0, 0, "\""),
            sq("\""),
            chs(0, 1, "i"),
        ]),
        // chs = '[' ~']'* ']'
        seq(vec![sq("["), chs_neg(0, 0, "]"), sq("]")]),
        // group = "( " alt " )"
        seq(vec![dq("( "), id(2, "alt"), dq(" )")]),
        // extn = '<' ~'>'* '>'
        seq(vec![sq("<"), chs_neg(0, 0, ">"), sq(">")]),
        // _space_ = ('#' ~[\n\r]* / [ \t\n\r]+)*
        rep(
            0,
            0,
            alt(vec![
                seq(vec![sq("#"), chs_neg(0, 0, "\n\r")]),
                chs(1, 0, " \t\n\r"),
            ]),
        ),
    ];

    let mut rules: Vec<Rule> = names
        .iter()
        .zip(exprs)
        .map(|(name, expr)| Rule {
            name: name.to_string(),
            expr,
        })
        .collect();
    attach_guards(&mut rules);

    let names: HashMap<String, usize> = names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.to_string(), i))
        .collect();
    let space = names.get("_space_").copied();
    Grammar {
        rules,
        names,
        start: 0,
        space,
    }
}

// Constructor shorthands for the rule table above.

fn id(index: usize, name: &str) -> Instr {
    Instr::Id {
        index,
        name: name.to_string(),
    }
}

fn alt(alts: Vec<Instr>) -> Instr {
    let guards = vec![None; alts.len()];
    Instr::Alt { alts, guards }
}

fn seq(exprs: Vec<Instr>) -> Instr {
    seq_n(1, 1, exprs)
}

fn seq_n(min: u32, max: u32, exprs: Vec<Instr>) -> Instr {
    Instr::Seq { min, max, exprs }
}

fn rep(min: u32, max: u32, expr: Instr) -> Instr {
    Instr::Rep {
        min,
        max,
        expr: Box::new(expr),
    }
}

fn pre(sign: char, expr: Instr) -> Instr {
    Instr::Pre {
        sign,
        expr: Box::new(expr),
    }
}

fn sq(text: &str) -> Instr {
    Instr::Sq {
        icase: false,
        text: text.to_string(),
    }
}

fn dq(text: &str) -> Instr {
    Instr::Dq {
        icase: false,
        text: text.to_string(),
    }
}

fn chs(min: u32, max: u32, body: &str) -> Instr {
    Instr::Chs {
        neg: false,
        min,
        max,
        set: CharSet::parse(body),
    }
}

fn chs_neg(min: u32, max: u32, body: &str) -> Instr {
    Instr::Chs {
        neg: true,
        min,
        max,
        set: CharSet::parse(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Peg;

    /// Compiling the published grammar with the bootstrap program must
    /// reproduce the bootstrap program, instruction for instruction.
    #[test]
    fn self_hosting_fixed_point() {
        let compiled = Peg::compile(PEG_GRAMMAR).unwrap();
        assert_eq!(compiled.grammar(), boot());
    }

    #[test]
    fn bootstrap_renders_as_rules() {
        let listing = boot().to_string();
        assert!(listing.contains("rule = (id \" = \" alt)"));
        assert!(listing.contains("num = [0-9]+"));
    }
}
