//! FCL Reader
//!
//! Line-buffered where the grammar is line-shaped (variable declarations,
//! TERM lines) and token-buffered where it is not (the rule block). The
//! variable blocks are read from the raw source because the `RANGE`
//! extension lives in a comment; everything else reads the comment-stripped
//! text.

use crate::curve::{MemberFunc, Node, Shape};
use crate::defuzz::{CompositionOp, DefuzzMethod};
use crate::error::{EofSite, FuzzyError, Result};
use crate::grid::GridSpec;
use crate::model::{InferenceOp, Model, VarRef};
use crate::rules;

use super::strip_comments;

/// Default domain for variables declared without a RANGE comment.
const DEFAULT_RANGE: (f64, f64) = (0.0, 100.0);

/// Parse FCL text into a fresh model on the given grid.
pub fn load_str(text: &str, grid: GridSpec) -> Result<Model> {
    let stripped = strip_comments(text);

    if !stripped.split_whitespace().any(|t| t == "FUNCTION_BLOCK") {
        return Err(FuzzyError::InvalidFileFormat(
            "missing FUNCTION_BLOCK".to_string(),
        ));
    }

    let mut model = Model::new(grid);
    load_vars(&mut model, text, false)?;
    load_vars(&mut model, text, true)?;
    load_sets(&mut model, &stripped)?;
    load_defuzz(&mut model, &stripped)?;
    load_rules(&mut model, &stripped)?;
    Ok(model)
}

/// Read a `VAR_INPUT` or `VAR_OUTPUT` block from the raw source.
fn load_vars(model: &mut Model, raw: &str, output: bool) -> Result<()> {
    let start_token = if output { "VAR_OUTPUT" } else { "VAR_INPUT" };

    let mut lines = raw.lines();
    for line in lines.by_ref() {
        if line.split_whitespace().next() == Some(start_token) {
            break;
        }
        if line.split_whitespace().next() == Some("END_FUNCTION_BLOCK") {
            return Err(FuzzyError::UnexpectedEof(EofSite::Variables));
        }
    }

    // declarations until END_VAR
    loop {
        let Some(line) = lines.next() else {
            return Err(FuzzyError::UnexpectedEof(EofSite::Variables));
        };
        let mut words = line.split_whitespace();
        let Some(first) = words.next() else {
            continue;
        };
        if first == "END_VAR" {
            return Ok(());
        }

        let name = first.trim_end_matches([':', ';']);
        if name.is_empty() {
            continue;
        }

        let (left_x, right_x) = parse_range(line)?;
        if output {
            model.add_output_variable(name, left_x, right_x)?;
        } else {
            model.add_input_variable(name, left_x, right_x, false)?;
        }
    }
}

/// Pull `lo` and `hi` out of a `RANGE(lo .. hi)` comment, if the line has
/// one.
fn parse_range(line: &str) -> Result<(f64, f64)> {
    let Some(start) = line.find("RANGE(") else {
        return Ok(DEFAULT_RANGE);
    };
    let rest = &line[start + "RANGE(".len()..];
    let Some(dots) = rest.find("..") else {
        return Err(FuzzyError::RangeValue(line.trim().to_string()));
    };
    let Some(close) = rest.find(')') else {
        return Err(FuzzyError::RangeValue(line.trim().to_string()));
    };
    if close < dots {
        return Err(FuzzyError::RangeValue(line.trim().to_string()));
    }

    let lo = rest[..dots].trim();
    let hi = rest[dots + 2..close].trim();
    let lo: f64 = lo
        .parse()
        .map_err(|_| FuzzyError::RangeValue(lo.to_string()))?;
    let hi: f64 = hi
        .parse()
        .map_err(|_| FuzzyError::RangeValue(hi.to_string()))?;
    Ok((lo, hi))
}

/// Read the FUZZIFY block of every declared variable, adding sets in
/// declaration order.
fn load_sets(model: &mut Model, stripped: &str) -> Result<()> {
    let lines: Vec<&str> = stripped.lines().collect();

    let input_ids: Vec<String> = model.inputs().iter().map(|v| v.id().to_string()).collect();
    for (var_idx, id) in input_ids.iter().enumerate() {
        let block = fuzzify_block(&lines, id)?;
        load_terms(model, VarRef::Input(var_idx), &block)?;
    }

    if let Some(out) = model.output() {
        let id = out.id().to_string();
        let block = fuzzify_block(&lines, &id)?;
        load_terms(model, VarRef::Output, &block)?;
    }

    Ok(())
}

/// Locate `FUZZIFY <var_id> .. END_FUZZIFY` and return its body lines.
fn fuzzify_block<'a>(lines: &[&'a str], var_id: &str) -> Result<Vec<&'a str>> {
    for (i, line) in lines.iter().enumerate() {
        let mut words = line.split_whitespace();
        if words.next() != Some("FUZZIFY") {
            continue;
        }
        let Some(name) = words.next() else {
            continue;
        };
        if !name.eq_ignore_ascii_case(var_id) {
            continue;
        }

        let mut body = Vec::new();
        for rest in &lines[i + 1..] {
            if rest.split_whitespace().next() == Some("END_FUZZIFY") {
                return Ok(body);
            }
            body.push(*rest);
        }
        return Err(FuzzyError::UnexpectedEof(EofSite::Sets));
    }
    Err(FuzzyError::UnexpectedEof(EofSite::Sets))
}

/// Parse the TERM lines of one FUZZIFY block into sets.
fn load_terms(model: &mut Model, var: VarRef, body: &[&str]) -> Result<()> {
    let grid = model.grid();
    let map = match var {
        VarRef::Input(i) => *model
            .input(i)
            .ok_or_else(|| FuzzyError::UnknownHandle(format!("input variable index {i}")))?
            .map(),
        VarRef::Output => *model.output().ok_or(FuzzyError::NoOutputVariable)?.map(),
    };

    for line in body {
        let tokens = term_tokens(line);
        let mut tok = tokens.iter();
        let Some(first) = tok.next() else {
            continue;
        };
        if !first.eq_ignore_ascii_case("TERM") {
            return Err(FuzzyError::InvalidFileFormat(format!(
                "expected TERM, found '{first}'"
            )));
        }
        let Some(name) = tok.next() else {
            return Err(FuzzyError::InvalidFileFormat(
                "TERM without a name".to_string(),
            ));
        };

        // collect the numeric payload up to the terminating semicolon
        let mut values = Vec::new();
        let mut terminated = false;
        for t in tok {
            if t.as_str() == ";" {
                terminated = true;
                break;
            }
            let v: f64 = t.parse().map_err(|_| {
                FuzzyError::InvalidFileFormat(format!("expected a number, found '{t}'"))
            })?;
            values.push(v);
        }
        if !terminated {
            return Err(FuzzyError::InvalidFileFormat(format!(
                "membership function of '{name}' is not terminated with ';'"
            )));
        }

        let nodes = nodes_from_values(name, &values, &map, grid)?;
        let shape = Shape::from_point_count(nodes.len())?;
        let func = MemberFunc::new(shape, &nodes, grid)?;
        model.add_set(var, name, func, false)?;
    }

    Ok(())
}

/// Convert the numeric payload of a TERM into grid-space nodes.
///
/// One number is a singleton's x; otherwise the numbers pair up as
/// `(x, y)` with x in variable units and y in `[0, 1]`.
fn nodes_from_values(
    name: &str,
    values: &[f64],
    map: &crate::grid::DomainMap,
    grid: GridSpec,
) -> Result<Vec<Node>> {
    if values.is_empty() {
        return Err(FuzzyError::InvalidFileFormat(format!(
            "membership function of '{name}' has no points"
        )));
    }
    if values.len() == 1 {
        return Ok(vec![Node {
            x: map.index_of(values[0]),
            y: grid.y_max(),
        }]);
    }
    if values.len() % 2 != 0 {
        return Err(FuzzyError::InvalidFileFormat(format!(
            "membership function of '{name}' has an unpaired point value"
        )));
    }

    Ok(values
        .chunks_exact(2)
        .map(|pair| Node {
            x: map.index_of(pair[0]),
            y: ((pair[1] * f64::from(grid.y_max())).round())
                .clamp(0.0, f64::from(grid.y_max())) as u16,
        })
        .collect())
}

/// Tokenize a TERM line: parens, commas, colons, and equals are noise, the
/// semicolon is significant.
fn term_tokens(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    for c in line.chars() {
        match c {
            ';' => {
                if !cur.is_empty() {
                    out.push(std::mem::take(&mut cur));
                }
                out.push(";".to_string());
            }
            '(' | ')' | ',' | ':' | '=' => {
                if !cur.is_empty() {
                    out.push(std::mem::take(&mut cur));
                }
            }
            c if c.is_whitespace() => {
                if !cur.is_empty() {
                    out.push(std::mem::take(&mut cur));
                }
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

/// Read the optional DEFUZZIFY block. Absent block or absent METHOD line
/// defaults to Center of Gravity.
fn load_defuzz(model: &mut Model, stripped: &str) -> Result<()> {
    if model.output().is_none() {
        return Ok(());
    }

    let mut cur = Cursor {
        toks: rule_tokens(stripped),
        pos: 0,
    };
    if !cur.skip_to("DEFUZZIFY") {
        return model.set_defuzz_method(DefuzzMethod::Cog);
    }
    let _var_name = cur.next_word();
    if !cur.skip_to("METHOD") {
        return model.set_defuzz_method(DefuzzMethod::Cog);
    }

    let selector = cur.next_word().unwrap_or_default();
    let method = if selector.eq_ignore_ascii_case("CoG") {
        DefuzzMethod::Cog
    } else if selector.eq_ignore_ascii_case("MoM") {
        DefuzzMethod::Mom
    } else {
        return Err(FuzzyError::InvalidMethod(selector));
    };
    model.set_defuzz_method(method)
}

/// Read the RULEBLOCK: operator selections, then the rules. A model
/// without a RULEBLOCK keeps the defaults and zero rules.
fn load_rules(model: &mut Model, stripped: &str) -> Result<()> {
    let toks = rule_tokens(stripped);
    let mut cur = Cursor { toks, pos: 0 };

    if !cur.skip_to("RULEBLOCK") {
        return Ok(());
    }

    // optional block name, then the inference-op line
    let op = loop {
        let tok = cur.next().ok_or(FuzzyError::UnexpectedEof(EofSite::Rules))?;
        match tok.as_str() {
            "AND" | "OR" => break tok,
            ";" => continue,
            "RULE" | "END_RULEBLOCK" | "ACCU" | "ACCUM" => {
                return Err(FuzzyError::InvalidFileFormat(
                    "RULEBLOCK without an AND/OR operator line".to_string(),
                ))
            }
            _ => continue, // block name
        }
    };
    let selector = cur.next_word().ok_or(FuzzyError::UnexpectedEof(EofSite::Rules))?;
    match (op.as_str(), selector.as_str()) {
        ("AND", "MIN") => model.set_inference_op(InferenceOp::Min),
        ("OR", "MAX") => model.set_inference_op(InferenceOp::Max),
        _ => return Err(FuzzyError::InvalidMethod(format!("{op} : {selector}"))),
    }

    // the accumulation line
    let accu = cur.next_word().ok_or(FuzzyError::UnexpectedEof(EofSite::Rules))?;
    if !accu.starts_with("ACCU") {
        return Err(FuzzyError::InvalidFileFormat(format!(
            "expected ACCU, found '{accu}'"
        )));
    }
    let selector = cur.next_word().ok_or(FuzzyError::UnexpectedEof(EofSite::Rules))?;
    match selector.as_str() {
        "BSUM" => model.set_composition(CompositionOp::Min)?,
        "MAX" => model.set_composition(CompositionOp::Max)?,
        other => return Err(FuzzyError::InvalidMethod(other.to_string())),
    }

    // the rules
    loop {
        let tok = cur.next().ok_or(FuzzyError::UnexpectedEof(EofSite::Rules))?;
        match tok.as_str() {
            "END_RULEBLOCK" => return Ok(()),
            "RULE" => load_one_rule(model, &mut cur)?,
            _ => {}
        }
    }
}

/// Parse one `RULE n : IF .. THEN .. ;`.
///
/// The rule number is advisory: the cell index is computed from the named
/// terms alone. The first subcondition token decides between the shorthand
/// (positional term names) and the strict `(var IS term)` form; mixing the
/// two within a rule is a format error.
fn load_one_rule(model: &mut Model, cur: &mut Cursor) -> Result<()> {
    loop {
        let tok = cur.next().ok_or(FuzzyError::UnexpectedEof(EofSite::Rules))?;
        if tok == "IF" {
            break;
        }
        if tok == "END_RULEBLOCK" {
            return Err(FuzzyError::InvalidFileFormat(
                "RULE without an IF".to_string(),
            ));
        }
    }

    let strict = cur.peek().map(String::as_str) == Some("(");
    let num_inputs = model.num_inputs();
    let mut positions: Vec<Option<usize>> = vec![None; num_inputs];
    let mut shorthand_seen = 0usize;

    loop {
        if strict {
            cur.expect("(")?;
            let var_name = cur.next_word().ok_or(FuzzyError::UnexpectedEof(EofSite::Rules))?;
            cur.expect("IS")?;
            let term = cur.next_word().ok_or(FuzzyError::UnexpectedEof(EofSite::Rules))?;
            cur.expect(")")?;

            let var_idx = model.find_input(&var_name).ok_or_else(|| {
                FuzzyError::InvalidFileFormat(format!("unknown input variable '{var_name}'"))
            })?;
            if positions[var_idx].is_some() {
                return Err(FuzzyError::InvalidFileFormat(format!(
                    "variable '{var_name}' appears twice in one rule"
                )));
            }
            positions[var_idx] = Some(term_position(model, var_idx, &term)?);
        } else {
            let term = cur.next_word().ok_or(FuzzyError::UnexpectedEof(EofSite::Rules))?;
            if term == "(" {
                return Err(FuzzyError::InvalidFileFormat(
                    "rule mixes shorthand and strict subcondition forms".to_string(),
                ));
            }
            if shorthand_seen >= num_inputs {
                return Err(FuzzyError::InvalidFileFormat(
                    "rule names more terms than there are input variables".to_string(),
                ));
            }
            positions[shorthand_seen] = Some(term_position(model, shorthand_seen, &term)?);
            shorthand_seen += 1;
        }

        let link = cur.next_word().ok_or(FuzzyError::UnexpectedEof(EofSite::Rules))?;
        match link.as_str() {
            "AND" => continue,
            "THEN" => break,
            other => {
                return Err(FuzzyError::InvalidFileFormat(format!(
                    "expected AND or THEN, found '{other}'"
                )))
            }
        }
    }

    // the consequent
    let out_term = if strict {
        cur.expect("(")?;
        let var_name = cur.next_word().ok_or(FuzzyError::UnexpectedEof(EofSite::Rules))?;
        cur.expect("IS")?;
        let term = cur.next_word().ok_or(FuzzyError::UnexpectedEof(EofSite::Rules))?;
        cur.expect(")")?;

        let out = model.output().ok_or(FuzzyError::NoOutputVariable)?;
        if !out.id().eq_ignore_ascii_case(&var_name) {
            return Err(FuzzyError::InvalidFileFormat(format!(
                "'{var_name}' is not the output variable"
            )));
        }
        term
    } else {
        let term = cur.next_word().ok_or(FuzzyError::UnexpectedEof(EofSite::Rules))?;
        if term == "(" {
            return Err(FuzzyError::InvalidFileFormat(
                "rule mixes shorthand and strict subcondition forms".to_string(),
            ));
        }
        term
    };

    let components: Vec<usize> = positions
        .into_iter()
        .map(|p| {
            p.ok_or_else(|| {
                FuzzyError::InvalidFileFormat(
                    "rule does not name a term for every input variable".to_string(),
                )
            })
        })
        .collect::<Result<_>>()?;

    let out = model.output().ok_or(FuzzyError::NoOutputVariable)?;
    let out_pos = out
        .find_set(&out_term)
        .ok_or_else(|| {
            FuzzyError::InvalidFileFormat(format!("unknown output term '{out_term}'"))
        })?
        .position();

    let index = rules::encode(&components, &model.input_strides());
    model.add_rule(index, out_pos)
}

fn term_position(model: &Model, var_idx: usize, term: &str) -> Result<usize> {
    let var = model.input(var_idx).ok_or_else(|| {
        FuzzyError::InvalidFileFormat(format!("rule references input variable {var_idx}"))
    })?;
    var.find_set(term)
        .map(crate::set::FuzzySet::position)
        .ok_or_else(|| {
            FuzzyError::InvalidFileFormat(format!(
                "unknown term '{term}' for variable '{}'",
                var.id()
            ))
        })
}

/// Tokenize for the rule block: parens and semicolons stand alone, colons
/// and commas are separators.
fn rule_tokens(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    for c in text.chars() {
        match c {
            '(' | ')' | ';' => {
                if !cur.is_empty() {
                    out.push(std::mem::take(&mut cur));
                }
                out.push(c.to_string());
            }
            ':' | ',' => {
                if !cur.is_empty() {
                    out.push(std::mem::take(&mut cur));
                }
            }
            c if c.is_whitespace() => {
                if !cur.is_empty() {
                    out.push(std::mem::take(&mut cur));
                }
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

struct Cursor {
    toks: Vec<String>,
    pos: usize,
}

impl Cursor {
    fn next(&mut self) -> Option<String> {
        let tok = self.toks.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// Next token that is not a bare semicolon.
    fn next_word(&mut self) -> Option<String> {
        loop {
            let tok = self.next()?;
            if tok != ";" {
                return Some(tok);
            }
        }
    }

    fn peek(&self) -> Option<&String> {
        self.toks.get(self.pos)
    }

    fn expect(&mut self, want: &str) -> Result<()> {
        match self.next() {
            Some(tok) if tok == want => Ok(()),
            Some(tok) => Err(FuzzyError::InvalidFileFormat(format!(
                "expected '{want}', found '{tok}'"
            ))),
            None => Err(FuzzyError::UnexpectedEof(EofSite::Rules)),
        }
    }

    /// Advance past the first occurrence of `word`. False when absent.
    fn skip_to(&mut self, word: &str) -> bool {
        while let Some(tok) = self.next() {
            if tok == word {
                return true;
            }
        }
        false
    }
}
