//! End-to-end scenarios: grammars compiled from text and parsed into ptrees.

use indoc::indoc;
use ppeg::{Bump, ParseOptions, Peg};

#[test]
fn date_grammar() {
    let peg = Peg::compile(indoc! {"
        Date  = year '-' month '-' day
        year  = [0-9]*4
        month = [0-9]*2
        day   = [0-9]*2
    "})
    .unwrap();
    let arena = Bump::new();
    let tree = peg.parse(&arena, "2021-04-05").unwrap();
    assert_eq!(
        tree.to_string(),
        r#"["Date", [["year", "2021"], ["month", "04"], ["day", "05"]]]"#
    );
}

#[test]
fn csv_rows_and_empty_fields() {
    let peg = Peg::compile(indoc! {r#"
        CSV = Hdr Row+
        Hdr = Row
        Row = field (',' field)* '\r'? '\n'
        field = _string / _text / ''
        _text = ~[,\n\r]+
        _string = '"' (~'"' / '""')* '"'
    "#})
    .unwrap();
    let arena = Bump::new();
    let tree = peg.parse(&arena, "A,B,C\na1,b1,c1\na2,\"b,2\",c2\n").unwrap();
    assert_eq!(
        tree.to_string(),
        concat!(
            r#"["CSV", [["Hdr", [["Row", [["field", "A"], ["field", "B"], ["field", "C"]]]]], "#,
            r#"["Row", [["field", "a1"], ["field", "b1"], ["field", "c1"]]], "#,
            r#"["Row", [["field", "a2"], ["field", "\"b,2\""], ["field", "c2"]]]]]"#,
        )
    );
}

fn arithmetic() -> Peg {
    Peg::compile(indoc! {"
        add = sub ('+' sub)*
        sub = mul ('-' mul)*
        mul = div ('*' div)*
        div = pow ('/' pow)*
        pow = val ('^' val)*
        val = sym / num / grp
        grp = '(' add ')'
        sym = [a-zA-Z]+
        num = [0-9]+
    "})
    .unwrap()
}

#[test]
fn arithmetic_precedence_cascade() {
    let peg = arithmetic();
    let arena = Bump::new();
    let tree = peg.parse(&arena, "1+2*3").unwrap();
    assert_eq!(
        tree.to_string(),
        r#"["add", [["num", "1"], ["mul", [["num", "2"], ["num", "3"]]]]]"#
    );
}

#[test]
fn arithmetic_power_and_subtraction() {
    let peg = arithmetic();
    let arena = Bump::new();
    let tree = peg.parse(&arena, "x^2^3-1").unwrap();
    assert_eq!(
        tree.to_string(),
        r#"["sub", [["pow", [["sym", "x"], ["num", "2"], ["num", "3"]]], ["num", "1"]]]"#
    );
}

#[test]
fn positive_lookahead() {
    let peg = Peg::compile("S = &'a' [a-z]+").unwrap();
    let arena = Bump::new();
    let tree = peg.parse(&arena, "apple").unwrap();
    assert_eq!(tree.to_string(), r#"["S", "apple"]"#);
    assert!(peg.parse(&arena, "banana").is_err());
}

#[test]
fn negative_lookahead() {
    let peg = Peg::compile("S = !'x' [a-z]+").unwrap();
    let arena = Bump::new();
    assert_eq!(
        peg.parse(&arena, "abc").unwrap().to_string(),
        r#"["S", "abc"]"#
    );
    assert!(peg.parse(&arena, "xyz").is_err());
}

#[test]
fn fault_report_names_rule_and_expectation() {
    let peg = Peg::compile(indoc! {"
        Date  = year '-' month '-' day
        year  = [0-9]*4
        month = [0-9]*2
        day   = [0-9]*2
    "})
    .unwrap();
    let arena = Bump::new();
    let err = peg.parse(&arena, "2021-4-05 xxx").unwrap_err();
    let report = err.to_string();
    assert!(
        report.starts_with("In rule: month, expected: [0-9]*2, "),
        "unexpected report: {}",
        report
    );
    assert!(report.contains("failed at line: 1.7"));
    // Caret under column 7 of the echoed line.
    assert!(report.contains("\n2021-4-05 xxx\n      ^"));
}

#[test]
fn negated_class_repetition_stops_at_comma() {
    let peg = Peg::compile(r"S = ~[,\n\r]+").unwrap();
    let arena = Bump::new();
    let options = ParseOptions {
        short: true,
        ..Default::default()
    };
    let tree = peg.parse_with(&arena, "hello, world", &options).unwrap();
    assert_eq!(tree.to_string(), r#"["S", "hello"]"#);
    // Without `short` the unconsumed tail is an error.
    let err = peg.parse(&arena, "hello, world").unwrap_err();
    assert!(err.to_string().starts_with("Fell short at line: 1.6"));
}

#[test]
fn parses_are_deterministic() {
    let peg = arithmetic();
    let arena = Bump::new();
    let one = peg.parse(&arena, "1+2*(3-4)").unwrap().to_string();
    let two = peg.parse(&arena, "1+2*(3-4)").unwrap().to_string();
    assert_eq!(one, two);
}

#[test]
fn underscore_rules_never_appear() {
    let peg = Peg::compile(indoc! {"
        pair = word _sep word
        word = [a-z]+
        _sep = [ :]+
    "})
    .unwrap();
    let arena = Bump::new();
    let tree = peg.parse(&arena, "key: value").unwrap();
    assert_eq!(
        tree.to_string(),
        r#"["pair", [["word", "key"], ["word", "value"]]]"#
    );
}

#[test]
fn single_child_elision_and_capital_wrapping() {
    let peg = Peg::compile("x = y\ny = 'k'").unwrap();
    let arena = Bump::new();
    // A lowercase rule with one child stands aside for it.
    assert_eq!(
        peg.parse(&arena, "k").unwrap().to_string(),
        r#"["y", "k"]"#
    );

    let peg = Peg::compile("X = y\ny = 'k'").unwrap();
    assert_eq!(
        peg.parse(&arena, "k").unwrap().to_string(),
        r#"["X", [["y", "k"]]]"#
    );
}

#[test]
fn zero_length_match_terminates_repetition() {
    let peg = Peg::compile("S = ('a'?)*").unwrap();
    let arena = Bump::new();
    let options = ParseOptions {
        short: true,
        ..Default::default()
    };
    let tree = peg.parse_with(&arena, "aab", &options).unwrap();
    assert_eq!(tree.to_string(), r#"["S", "aa"]"#);
}

#[test]
fn optional_group_rolls_back_cleanly() {
    let peg = Peg::compile("S = ('ab' 'c')? 'abd'").unwrap();
    let arena = Bump::new();
    let tree = peg.parse(&arena, "abd").unwrap();
    assert_eq!(tree.to_string(), r#"["S", "abd"]"#);
}

#[test]
fn self_hosted_grammar_parses_grammars() {
    let peg = Peg::compile(ppeg::PEG_GRAMMAR).unwrap();
    let arena = Bump::new();
    let tree = peg.parse(&arena, "Date = [0-9]*4 '-' [0-9]*2\n").unwrap();
    assert_eq!(tree.name, "Peg");
    let rule = tree.child(0).unwrap();
    assert_eq!(rule.name, "rule");
    assert_eq!(rule.child(0).unwrap().text(), Some("Date"));
}
