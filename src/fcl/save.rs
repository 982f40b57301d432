//! FCL Writer
//!
//! Emits a model in the same dialect the reader accepts, such that loading
//! the output reproduces every observable of the model: variables in order,
//! sets in order, node positions, rule cells, and the inference /
//! composition / defuzzification selections. Unlike the reader, the writer
//! always names subconditions in the strict `(var IS term)` form.

use crate::curve::Shape;
use crate::defuzz::{CompositionOp, DefuzzMethod};
use crate::grid::DomainMap;
use crate::model::{InferenceOp, Model};
use crate::set::FuzzySet;
use crate::variable::Variable;

use super::{fmt_num, sanitize_id};

/// Serialize a model to FCL text.
pub fn save_str(model: &Model) -> String {
    let mut out = String::new();
    out.push_str("(* FCL export *)\n\n");
    out.push_str("FUNCTION_BLOCK\n\n");

    out.push_str("VAR_INPUT\n");
    for var in model.inputs() {
        push_var_decl(&mut out, var.id(), var.map());
    }
    out.push_str("END_VAR\n\n");

    if let Some(output) = model.output() {
        out.push_str("VAR_OUTPUT\n");
        push_var_decl(&mut out, output.id(), output.map());
        out.push_str("END_VAR\n\n");
    }

    for var in model.inputs() {
        push_fuzzify(&mut out, var.id(), var.sets(), var.map(), model);
    }
    if let Some(output) = model.output() {
        push_fuzzify(&mut out, output.id(), output.sets(), output.map(), model);

        out.push_str(&format!("DEFUZZIFY {}\n", sanitize_id(output.id())));
        let method = match output.defuzz_method() {
            DefuzzMethod::Cog => "CoG",
            DefuzzMethod::Mom => "MoM",
        };
        out.push_str(&format!("\tMETHOD : {method};\n"));
        out.push_str("END_DEFUZZIFY\n\n");
    }

    push_rules(&mut out, model);

    out.push_str("END_FUNCTION_BLOCK\n");
    out
}

fn push_var_decl(out: &mut String, id: &str, map: &DomainMap) {
    out.push_str(&format!(
        "\t{}\tREAL; (* RANGE({} .. {}) *)\n",
        sanitize_id(id),
        fmt_num(map.left_x()),
        fmt_num(map.right_x())
    ));
}

fn push_fuzzify(out: &mut String, id: &str, sets: &[FuzzySet], map: &DomainMap, model: &Model) {
    let y_max = f64::from(model.grid().y_max());

    out.push_str(&format!("FUZZIFY {}\n", sanitize_id(id)));
    for set in sets {
        out.push_str(&format!("\tTERM {} := ", sanitize_id(set.id())));
        if set.func().shape() == Shape::Singleton {
            out.push_str(&fmt_num(map.value_of(set.func().nodes()[0].x)));
        } else {
            for node in set.func().nodes() {
                out.push_str(&format!(
                    "({}, {}) ",
                    fmt_num(map.value_of(node.x)),
                    fmt_num(f64::from(node.y) / y_max)
                ));
            }
        }
        out.push_str(";\n");
    }
    out.push_str("END_FUZZIFY\n\n");
}

fn push_rules(out: &mut String, model: &Model) {
    out.push_str("RULEBLOCK first\n");

    match model.inference_op() {
        InferenceOp::Min => out.push_str("\tAND : MIN;\n"),
        InferenceOp::Max => out.push_str("\tOR : MAX;\n"),
    }
    if let Some(output) = model.output() {
        match output.composition() {
            CompositionOp::Min => out.push_str("\tACCU : BSUM;\n"),
            CompositionOp::Max => out.push_str("\tACCU : MAX;\n"),
        }
    }

    for index in 0..model.rules().len() {
        match model.rules().get(index) {
            None => {
                out.push_str(&format!("\t(* RULE {index} : no rule specified *)\n"));
            }
            Some(out_pos) => {
                let components = model.rule_components(index);
                out.push_str(&format!("\tRULE {index} : IF "));

                for (var_idx, position) in components.iter().enumerate() {
                    if var_idx > 0 {
                        out.push_str(" AND ");
                    }
                    let var = &model.inputs()[var_idx];
                    out.push_str(&subcondition(var, *position));
                }

                out.push_str(" THEN ");
                if let Some(output) = model.output() {
                    out.push_str(&subcondition(output.base(), out_pos));
                }
                out.push_str(";\n");
            }
        }
    }

    out.push_str("END_RULEBLOCK\n\n");
}

fn subcondition(var: &Variable, position: usize) -> String {
    let term: &str = var.set(position).map_or("", |s| s.id());
    format!("({} IS {})", sanitize_id(var.id()), sanitize_id(term))
}
