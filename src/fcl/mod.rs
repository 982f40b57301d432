//! Fuzzy Control Language (IEC 61131-7)
//!
//! Reads and writes the FCL dialect this engine speaks:
//!
//! ```text
//! FUNCTION_BLOCK
//!   VAR_INPUT  id : REAL ; (* RANGE(lo .. hi) *)  ...  END_VAR
//!   VAR_OUTPUT id : REAL ; (* RANGE(lo .. hi) *)  END_VAR
//!   FUZZIFY id  TERM term_id := membership_function ;  ...  END_FUZZIFY
//!   DEFUZZIFY id  METHOD : CoG | MoM ;  END_DEFUZZIFY
//!   RULEBLOCK name
//!     AND : MIN ; | OR : MAX ;
//!     ACCU : BSUM | MAX ;
//!     RULE n : IF term AND term ... THEN term ;
//!       (or strict form: IF (var IS term) AND ... THEN (var IS term) ;)
//!   END_RULEBLOCK
//! END_FUNCTION_BLOCK
//! ```
//!
//! A membership-function literal is either a bare numeric (singleton) or a
//! sequence of `(x, y)` pairs; the pair count selects the shape (1, 3, 4,
//! or 7). The `RANGE` comment is the one extension to the IEC grammar:
//! the standard gives no way to declare a variable's domain, so it rides in
//! a comment and round-trips through the saver.
//!
//! Blocks are located by keyword, not position, so files may order the
//! FUZZIFY / DEFUZZIFY / RULEBLOCK sections freely. The reader aborts on
//! the first error; there is no recovery.

mod load;
mod save;

pub use load::load_str;
pub use save::save_str;

/// Strip `(* ... *)` comments from FCL source, replacing each comment with
/// a single space. Handles nested comments.
pub(crate) fn strip_comments(source: &str) -> String {
    let mut result = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut depth = 0u32;

    while let Some(c) = chars.next() {
        if c == '(' && chars.peek() == Some(&'*') {
            chars.next();
            depth += 1;
        } else if c == '*' && chars.peek() == Some(&')') && depth > 0 {
            chars.next();
            depth -= 1;
            if depth == 0 {
                result.push(' ');
            }
        } else if depth == 0 {
            result.push(c);
        } else if c == '\n' {
            // keep line structure even when a comment spans lines
            result.push('\n');
        }
    }

    result
}

/// Replace whitespace in an identifier so it survives the FCL token rules.
pub(crate) fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Format a number the way the saver writes them: no decimals when
/// integral, two otherwise.
pub(crate) fn fmt_num(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}
