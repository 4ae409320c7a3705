//! Grammar compiler: turns a parsed grammar ptree into an instruction
//! program.

use common::{create_logger, log, log_detail};
use hashbrown::HashMap;

use crate::charset::CharSet;
use crate::error::GrammarError;
use crate::escape::unescape;
use crate::grammar::{Grammar, Rule};
use crate::instruction::Instr;
use crate::ptree::Ptree;

/// Compile the ptree of a grammar parse (`Peg = (rule ...)+`) into a
/// program. The first rule becomes the start rule; a rule named `_space_`
/// becomes the whitespace matcher for `"..."` literals.
pub fn compile(tree: &Ptree<'_>) -> Result<Grammar, GrammarError> {
    let log = create_logger("compile");
    if tree.name != "Peg" {
        return Err(GrammarError::BadGrammarTree(format!(
            "expected a Peg node, found {:?}",
            tree.name
        )));
    }

    let mut names: HashMap<String, usize> = HashMap::new();
    let mut bodies = Vec::new();
    for rule in tree.children() {
        let (id, body) = match (rule.name, rule.child(0), rule.child(1)) {
            ("rule", Some(id), Some(body)) if id.name == "id" => (id, body),
            _ => {
                return Err(GrammarError::BadGrammarTree(format!(
                    "expected a rule node, found {:?}",
                    rule.name
                )))
            }
        };
        let name = id
            .text()
            .ok_or_else(|| GrammarError::BadGrammarTree("rule id without text".into()))?;
        if names.insert(name.to_string(), bodies.len()).is_some() {
            return Err(GrammarError::DuplicateRule(name.to_string()));
        }
        bodies.push((name.to_string(), body));
    }
    if bodies.is_empty() {
        return Err(GrammarError::BadGrammarTree("grammar defines no rules".into()));
    }

    let mut rules = Vec::with_capacity(bodies.len());
    for (name, body) in bodies {
        let expr = emit(body, &names)?;
        log_detail!(log, "{} = {}", name, expr);
        rules.push(Rule { name, expr });
    }
    attach_guards(&mut rules);

    let space = names.get("_space_").copied();
    log!(log, "compiled {} rules", rules.len());
    Ok(Grammar {
        rules,
        names,
        start: 0,
        space,
    })
}

fn emit(node: &Ptree<'_>, names: &HashMap<String, usize>) -> Result<Instr, GrammarError> {
    match node.name {
        "id" => {
            let name = text_of(node)?;
            let index = names
                .get(name)
                .copied()
                .ok_or_else(|| GrammarError::UndefinedRule(name.to_string()))?;
            Ok(Instr::Id {
                index,
                name: name.to_string(),
            })
        }
        "alt" => {
            let alts = node
                .children()
                .iter()
                .map(|child| emit(child, names))
                .collect::<Result<Vec<_>, _>>()?;
            let guards = vec![None; alts.len()];
            Ok(Instr::Alt { alts, guards })
        }
        "seq" => {
            let exprs = node
                .children()
                .iter()
                .map(|child| emit(child, names))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Instr::Seq {
                min: 1,
                max: 1,
                exprs,
            })
        }
        "rep" => {
            let inner = node
                .child(0)
                .ok_or_else(|| GrammarError::BadGrammarTree("rep without body".into()))?;
            let tail = node
                .child(1)
                .ok_or_else(|| GrammarError::BadGrammarTree("rep without suffix".into()))?;
            let (min, max) = decode_suffix(tail)?;
            Ok(apply_repeat(emit(inner, names)?, min, max))
        }
        "pre" => {
            let sign = node
                .child(0)
                .and_then(|p| p.text())
                .and_then(|t| t.chars().next())
                .ok_or_else(|| GrammarError::BadGrammarTree("pre without prefix".into()))?;
            let inner = node
                .child(1)
                .ok_or_else(|| GrammarError::BadGrammarTree("pre without body".into()))?;
            Ok(apply_prefix(sign, emit(inner, names)?))
        }
        "sq" => {
            let (icase, text) = decode_literal(text_of(node)?);
            Ok(Instr::Sq { icase, text })
        }
        "dq" => {
            let (icase, text) = decode_literal(text_of(node)?);
            Ok(Instr::Dq { icase, text })
        }
        "chs" => {
            let t = text_of(node)?;
            let body = unescape(&t[1..t.len() - 1]);
            Ok(Instr::Chs {
                neg: false,
                min: 1,
                max: 1,
                set: CharSet::parse(&body),
            })
        }
        "extn" => {
            let t = text_of(node)?;
            Ok(Instr::Extn {
                text: t[1..t.len() - 1].to_string(),
            })
        }
        other => Err(GrammarError::BadGrammarTree(format!(
            "unexpected node {:?} in grammar",
            other
        ))),
    }
}

/// Decode a repeat suffix node: `sfx` carries `+ ? *`, a bare `num` is
/// `*N`, and a `range` branch is `*N..` or `*N..M`.
fn decode_suffix(tail: &Ptree<'_>) -> Result<(u32, u32), GrammarError> {
    match tail.name {
        "sfx" => match tail.text().and_then(|t| t.chars().next()) {
            Some('+') => Ok((1, 0)),
            Some('?') => Ok((0, 1)),
            Some('*') => Ok((0, 0)),
            _ => Err(GrammarError::BadGrammarTree("bad repeat suffix".into())),
        },
        "num" => {
            let n = decode_count(tail)?;
            Ok((n, n))
        }
        "range" => {
            let kids = tail.children();
            let min = decode_count(kids[0])?;
            match kids.len() {
                2 => Ok((min, 0)),
                3 => Ok((min, decode_count(kids[2])?)),
                _ => Err(GrammarError::BadGrammarTree("bad repeat range".into())),
            }
        }
        other => Err(GrammarError::BadGrammarTree(format!(
            "unexpected repeat suffix {:?}",
            other
        ))),
    }
}

fn decode_count(node: &Ptree<'_>) -> Result<u32, GrammarError> {
    text_of(node)?
        .parse()
        .map_err(|_| GrammarError::BadGrammarTree("repeat count out of range".into()))
}

/// Fold a repeat into the inner instruction where the instruction model
/// allows it: sequences and character sets carry their own bounds, and a
/// repeated single-codepoint literal becomes a character set.
fn apply_repeat(inner: Instr, min: u32, max: u32) -> Instr {
    match inner {
        Instr::Seq {
            min: 1,
            max: 1,
            exprs,
        } => Instr::Seq { min, max, exprs },
        Instr::Chs {
            neg,
            min: 1,
            max: 1,
            set,
        } => Instr::Chs { neg, min, max, set },
        Instr::Sq { icase: false, text } if single_char(&text).is_some() => Instr::Chs {
            neg: false,
            min,
            max,
            set: CharSet::singleton(single_char(&text).unwrap()),
        },
        other => Instr::Rep {
            min,
            max,
            expr: Box::new(other),
        },
    }
}

/// `~` over a plain character set or single-codepoint literal folds into a
/// negated set; everything else stays a lookahead prefix.
fn apply_prefix(sign: char, inner: Instr) -> Instr {
    if sign == '~' {
        match inner {
            Instr::Sq { icase: false, text } if single_char(&text).is_some() => {
                return Instr::Chs {
                    neg: true,
                    min: 1,
                    max: 1,
                    set: CharSet::singleton(single_char(&text).unwrap()),
                }
            }
            Instr::Chs {
                neg: false,
                min,
                max,
                set,
            } => {
                return Instr::Chs {
                    neg: true,
                    min,
                    max,
                    set,
                }
            }
            other => {
                return Instr::Pre {
                    sign,
                    expr: Box::new(other),
                }
            }
        }
    }
    Instr::Pre {
        sign,
        expr: Box::new(inner),
    }
}

fn single_char(text: &str) -> Option<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Strip the quotes off a literal, honour a trailing `i`, decode escapes,
/// and upper-case the text when case-insensitive.
fn decode_literal(t: &str) -> (bool, String) {
    let icase = t.ends_with('i');
    let body = if icase {
        &t[1..t.len() - 2]
    } else {
        &t[1..t.len() - 1]
    };
    let mut text = unescape(body);
    if icase {
        text = text.chars().map(|c| c.to_ascii_uppercase()).collect();
    }
    (icase, text)
}

fn text_of<'a>(node: &Ptree<'a>) -> Result<&'a str, GrammarError> {
    node.text().ok_or_else(|| {
        GrammarError::BadGrammarTree(format!("expected {:?} to be a terminal node", node.name))
    })
}

// ---------------------------------------------------------------------------
// ALT guards
// ---------------------------------------------------------------------------

/// Walk every rule and record, for each alternative of each choice, the
/// first codepoint it can possibly match. The machine skips alternatives
/// whose guard differs from the input.
pub(crate) fn attach_guards(rules: &mut [Rule]) {
    let snapshot: Vec<Instr> = rules.iter().map(|r| r.expr.clone()).collect();
    for rule in rules.iter_mut() {
        fill_guards(&mut rule.expr, &snapshot);
    }
}

fn fill_guards(instr: &mut Instr, rules: &[Instr]) {
    match instr {
        Instr::Alt { alts, guards } => {
            *guards = alts
                .iter()
                .map(|alt| first_codepoint(alt, rules, &mut Vec::new()))
                .collect();
            for alt in alts {
                fill_guards(alt, rules);
            }
        }
        Instr::Seq { exprs, .. } => {
            for expr in exprs {
                fill_guards(expr, rules);
            }
        }
        Instr::Rep { expr, .. } | Instr::Pre { expr, .. } => fill_guards(expr, rules),
        _ => {}
    }
}

/// The one codepoint an expression must start with, when that is knowable:
/// rule calls descend into the rule, sequences into their first element,
/// literals contribute their first codepoint. Case-insensitive literals and
/// leading spaces in `"..."` yield no guard, as do all other forms.
fn first_codepoint(instr: &Instr, rules: &[Instr], visiting: &mut Vec<usize>) -> Option<char> {
    match instr {
        Instr::Id { index, .. } => {
            if visiting.contains(index) {
                return None;
            }
            visiting.push(*index);
            let first = first_codepoint(&rules[*index], rules, visiting);
            visiting.pop();
            first
        }
        Instr::Seq { exprs, .. } => exprs
            .first()
            .and_then(|expr| first_codepoint(expr, rules, visiting)),
        Instr::Sq { icase: false, text } => text.chars().next(),
        Instr::Dq { icase: false, text } => text.chars().next().filter(|&c| c != ' '),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Peg;

    fn rule_expr(peg: &Peg, name: &str) -> Instr {
        let grammar = peg.grammar();
        let index = grammar.lookup(name).unwrap();
        grammar.rule(index).expr.clone()
    }

    #[test]
    fn repeated_single_literal_folds_to_charset() {
        let peg = Peg::compile("x = 'a'*3").unwrap();
        assert_eq!(
            rule_expr(&peg, "x"),
            Instr::Chs {
                neg: false,
                min: 3,
                max: 3,
                set: CharSet::singleton('a'),
            }
        );
    }

    #[test]
    fn negated_class_repeat_folds() {
        let peg = Peg::compile("x = ~[,\\n\\r]+").unwrap();
        assert_eq!(
            rule_expr(&peg, "x"),
            Instr::Chs {
                neg: true,
                min: 1,
                max: 0,
                set: CharSet::parse(",\n\r"),
            }
        );
    }

    #[test]
    fn repeated_group_folds_into_sequence_bounds() {
        let peg = Peg::compile("x = ('a' 'b')*2..4").unwrap();
        match rule_expr(&peg, "x") {
            Instr::Seq { min: 2, max: 4, exprs } => assert_eq!(exprs.len(), 2),
            other => panic!("expected folded sequence, got {}", other),
        }
    }

    #[test]
    fn open_range_and_optional() {
        let peg = Peg::compile("x = 'ab'*2.. y?\ny = 'y'").unwrap();
        match rule_expr(&peg, "x") {
            Instr::Seq { exprs, .. } => {
                assert_eq!(
                    exprs[0],
                    Instr::Rep {
                        min: 2,
                        max: 0,
                        expr: Box::new(Instr::Sq {
                            icase: false,
                            text: "ab".into()
                        }),
                    }
                );
                assert_eq!(
                    exprs[1],
                    Instr::Rep {
                        min: 0,
                        max: 1,
                        expr: Box::new(Instr::Id {
                            index: 1,
                            name: "y".into()
                        }),
                    }
                );
            }
            other => panic!("expected sequence, got {}", other),
        }
    }

    #[test]
    fn icase_literal_is_uppercased() {
        let peg = Peg::compile("x = 'abc'i").unwrap();
        assert_eq!(
            rule_expr(&peg, "x"),
            Instr::Sq {
                icase: true,
                text: "ABC".into(),
            }
        );
    }

    #[test]
    fn alt_guards_use_leading_literals() {
        let peg = Peg::compile("x = 'a' 'x' / \"b\" / [c]\n").unwrap();
        match rule_expr(&peg, "x") {
            Instr::Alt { guards, .. } => {
                assert_eq!(guards, vec![Some('a'), Some('b'), None]);
            }
            other => panic!("expected choice, got {}", other),
        }
    }

    #[test]
    fn guard_descends_through_rule_calls() {
        let peg = Peg::compile("x = y / 'z'\ny = 'q' 'r'").unwrap();
        match rule_expr(&peg, "x") {
            Instr::Alt { guards, .. } => assert_eq!(guards, vec![Some('q'), Some('z')]),
            other => panic!("expected choice, got {}", other),
        }
    }

    #[test]
    fn guard_survives_left_cycle() {
        // x refers back to itself through y; guard derivation must not loop.
        let peg = Peg::compile("x = y / 'a'\ny = x 'b'").unwrap();
        match rule_expr(&peg, "x") {
            Instr::Alt { guards, .. } => assert_eq!(guards, vec![None, Some('a')]),
            other => panic!("expected choice, got {}", other),
        }
    }

    #[test]
    fn duplicate_rule_is_an_error() {
        let err = Peg::compile("x = 'a'\nx = 'b'").unwrap_err();
        assert_eq!(err, GrammarError::DuplicateRule("x".into()));
    }

    #[test]
    fn undefined_rule_is_an_error() {
        let err = Peg::compile("x = missing").unwrap_err();
        assert_eq!(err, GrammarError::UndefinedRule("missing".into()));
        assert!(err.to_string().starts_with("Undefined rule: missing"));
    }
}
