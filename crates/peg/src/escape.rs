//! Escape decoding for literal strings and character classes.

/// Decode the escapes a grammar may use inside `'...'`, `"..."` and `[...]`:
/// `\t`, `\n`, `\r`, `\\` and `\uHHHH` (exactly four hex digits).
///
/// A backslash that does not start a recognised escape is kept literally,
/// along with the character after it. The same applies to a `\u` whose four
/// following characters are not all hex digits, or that names an invalid
/// scalar value.
pub fn unescape(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.clone().next() {
            Some('t') => {
                chars.next();
                out.push('\t');
            }
            Some('n') => {
                chars.next();
                out.push('\n');
            }
            Some('r') => {
                chars.next();
                out.push('\r');
            }
            Some('\\') => {
                chars.next();
                out.push('\\');
            }
            Some('u') => {
                let mut probe = chars.clone();
                probe.next(); // the 'u'
                let mut code = 0u32;
                let mut valid = true;
                for _ in 0..4 {
                    match probe.next().and_then(|d| d.to_digit(16)) {
                        Some(d) => code = code * 16 + d,
                        None => {
                            valid = false;
                            break;
                        }
                    }
                }
                match char::from_u32(code) {
                    Some(decoded) if valid => {
                        chars = probe;
                        out.push(decoded);
                    }
                    // The 'u' and the digits flow through as plain text.
                    _ => out.push('\\'),
                }
            }
            _ => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::unescape;

    #[test]
    fn basic_escapes() {
        assert_eq!(unescape(r"a\tb\nc\rd"), "a\tb\nc\rd");
        assert_eq!(unescape(r"a\\b"), "a\\b");
    }

    #[test]
    fn unicode_escape() {
        assert_eq!(unescape("\\u0041"), "A");
        assert_eq!(unescape("x\\u2713y"), "x\u{2713}y");
    }

    #[test]
    fn unrecognised_escape_is_kept() {
        assert_eq!(unescape(r"a\qb"), r"a\qb");
        assert_eq!(unescape("tail\\"), "tail\\");
    }

    #[test]
    fn bad_unicode_escape_is_kept() {
        assert_eq!(unescape(r"\uZZZZ"), r"\uZZZZ");
        assert_eq!(unescape(r"\u12"), r"\u12");
        // Lone surrogates are not scalar values.
        assert_eq!(unescape(r"\uD800"), r"\uD800");
    }
}
