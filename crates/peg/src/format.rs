//! Rendering: instructions back to grammar syntax, source-line reports with
//! a caret, and ptree debug output.

use std::fmt;

use crate::grammar::Grammar;
use crate::instruction::Instr;
use crate::ptree::Ptree;

/// Instructions render back to the grammar syntax they were compiled from,
/// which is what fault reports show as the expected expression.
impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Id { name, .. } => write!(f, "{}", name),
            Instr::Alt { alts, .. } => {
                write!(f, "(")?;
                for (i, alt) in alts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " / ")?;
                    }
                    write!(f, "{}", alt)?;
                }
                write!(f, ")")
            }
            Instr::Seq { min, max, exprs } => {
                write!(f, "(")?;
                for (i, expr) in exprs.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", expr)?;
                }
                write!(f, "){}", repeat_sigil(*min, *max))
            }
            Instr::Rep { min, max, expr } => {
                write!(f, "{}{}", expr, repeat_sigil(*min, *max))
            }
            Instr::Pre { sign, expr } => write!(f, "{}{}", sign, expr),
            Instr::Sq { icase, text } => {
                write!(f, "'{}'{}", LiteralText(text), if *icase { "i" } else { "" })
            }
            Instr::Dq { icase, text } => {
                write!(f, "\"{}\"{}", LiteralText(text), if *icase { "i" } else { "" })
            }
            Instr::Chs { neg, min, max, set } => {
                let tilde = if *neg { "~" } else { "" };
                write!(f, "{}[{}]{}", tilde, set, repeat_sigil(*min, *max))
            }
            Instr::Extn { text } => write!(f, "<{}>", text),
        }
    }
}

/// Renders the whole program as grammar rules, one per line.
impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{} = {}", rule.name, rule.expr)?;
        }
        Ok(())
    }
}

fn repeat_sigil(min: u32, max: u32) -> String {
    match (min, max) {
        (1, 1) => String::new(),
        (0, 0) => "*".to_string(),
        (1, 0) => "+".to_string(),
        (0, 1) => "?".to_string(),
        (n, 0) => format!("*{}..", n),
        (n, m) if n == m => format!("*{}", n),
        (n, m) => format!("*{}..{}", n, m),
    }
}

struct LiteralText<'a>(&'a str);

impl fmt::Display for LiteralText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '\t' => write!(f, "\\t")?,
                '\n' => write!(f, "\\n")?,
                '\r' => write!(f, "\\r")?,
                '\\' => write!(f, "\\\\")?,
                _ => write!(f, "{}", c)?,
            }
        }
        Ok(())
    }
}

/// 1-based line and codepoint column of a byte position.
pub fn line_col(input: &str, pos: usize) -> (usize, usize) {
    let pos = pos.min(input.len());
    let before = &input[..pos];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let col = before[line_start..].chars().count() + 1;
    (line, col)
}

/// Echo the line holding `pos` with up to two lines of context either side,
/// and a `^` caret under the position.
pub fn line_report(input: &str, pos: usize) -> String {
    let (line, col) = line_col(input, pos);
    let lines: Vec<&str> = input.split('\n').collect();
    let first = line.saturating_sub(2).max(1);
    let last = (line + 2).min(lines.len());

    let mut out = String::new();
    for ln in first..=line {
        out.push_str(lines[ln - 1]);
        out.push('\n');
    }
    out.push_str(&" ".repeat(col - 1));
    out.push('^');
    out.push('\n');
    for ln in line + 1..=last {
        out.push_str(lines[ln - 1]);
        out.push('\n');
    }
    out
}

/// Indented debug rendering of a ptree, one node per line.
pub fn format_ptree(node: &Ptree<'_>, indent: usize) -> String {
    let mut out = String::new();
    let pad = "  ".repeat(indent);
    match node.text() {
        Some(text) => out.push_str(&format!("{}{} {:?}\n", pad, node.name, text)),
        None => {
            out.push_str(&format!("{}{}\n", pad, node.name));
            for child in node.children() {
                out.push_str(&format_ptree(child, indent + 1));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::CharSet;

    #[test]
    fn chs_renders_with_repeat_sigil() {
        let instr = Instr::Chs {
            neg: false,
            min: 2,
            max: 2,
            set: CharSet::parse("0-9"),
        };
        assert_eq!(instr.to_string(), "[0-9]*2");
        let instr = Instr::Chs {
            neg: true,
            min: 1,
            max: 0,
            set: CharSet::parse(",\n\r"),
        };
        assert_eq!(instr.to_string(), "~[,\\n\\r]+");
    }

    #[test]
    fn literal_and_prefix_rendering() {
        let instr = Instr::Pre {
            sign: '!',
            expr: Box::new(Instr::Sq {
                icase: false,
                text: "=".into(),
            }),
        };
        assert_eq!(instr.to_string(), "!'='");
        let instr = Instr::Sq {
            icase: true,
            text: "ABC".into(),
        };
        assert_eq!(instr.to_string(), "'ABC'i");
    }

    #[test]
    fn line_col_counts_codepoints() {
        let input = "ab\ncd\u{e9}f";
        assert_eq!(line_col(input, 0), (1, 1));
        assert_eq!(line_col(input, 3), (2, 1));
        // After the two-byte e-acute the column is still per codepoint.
        let pos = input.find('f').unwrap();
        assert_eq!(line_col(input, pos), (2, 4));
    }

    #[test]
    fn line_report_places_caret() {
        let report = line_report("2021-4-05 xxx", 6);
        assert_eq!(report, "2021-4-05 xxx\n      ^\n");
    }
}
