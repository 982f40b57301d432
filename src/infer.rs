//! Inference Evaluator
//!
//! Fire-all-rules traversal: descend the input variables in order, carrying
//! a running activation (combined by the inference op) and a running linear
//! rule index (accumulated by adding each chosen set's cached stride). Sets
//! whose DOM is zero at the session's input index contribute no active path
//! and are skipped, so the cost is the product of the *active* set counts,
//! not the table size.
//!
//! At the terminal depth the rule cell is consulted; a missing rule
//! discards the path, otherwise the activation is composed into the named
//! output set's DOM:
//! - composition Max: keep the larger of the stored DOM and the activation.
//! - composition Min: keep the smaller, except that a stored zero means
//!   "no value yet" and is simply replaced.

use crate::defuzz::{self, CompositionOp};
use crate::grid::Dom;
use crate::model::{InferenceOp, Model};
use crate::rules::RuleTable;
use crate::session::Session;
use crate::variable::Variable;

/// Evaluate `session` against `model` and defuzzify.
///
/// Returns `None` when no output set ends up active - the model has no
/// output variable, no rules, or every fired path landed on "no rule".
pub fn evaluate(model: &Model, session: &mut Session) -> Option<f64> {
    let out_var = model.output()?;
    let (input_idx, out_dom) = session.begin_eval(model.num_inputs(), out_var.num_sets());

    if !model.inputs().is_empty() && !model.rules().is_empty() {
        fire(
            model.inputs(),
            input_idx,
            model.rules(),
            model.inference_op(),
            out_var.composition(),
            0,
            0,
            0,
            out_dom,
        );
    }

    let method = out_var.defuzz_method();
    let left_x = out_var.map().left_x();
    let active = out_var
        .sets()
        .iter()
        .zip(out_dom.iter())
        .filter_map(|(set, &dom)| set.defuzz().map(|tables| (tables, dom)));
    defuzz::defuzzify(method, left_x, active)
}

#[allow(clippy::too_many_arguments)]
fn fire(
    inputs: &[Variable],
    input_idx: &[usize],
    rules: &RuleTable,
    inference_op: InferenceOp,
    composition: CompositionOp,
    depth: usize,
    activation: Dom,
    rule_index: usize,
    out_dom: &mut [Dom],
) {
    if depth == inputs.len() {
        if let Some(out_set) = rules.get(rule_index) {
            if let Some(slot) = out_dom.get_mut(out_set) {
                *slot = compose(composition, *slot, activation);
            }
        }
        return;
    }

    let var = &inputs[depth];
    let xi = input_idx[depth];

    for set in var.sets() {
        let dom = set.dom_at(xi);
        if dom == 0 {
            continue;
        }

        // the first variable seeds the activation; later ones combine
        let next_activation = if depth == 0 {
            dom
        } else {
            match inference_op {
                InferenceOp::Min => activation.min(dom),
                InferenceOp::Max => activation.max(dom),
            }
        };

        fire(
            inputs,
            input_idx,
            rules,
            inference_op,
            composition,
            depth + 1,
            next_activation,
            rule_index + set.rule_stride(),
            out_dom,
        );
    }
}

fn compose(op: CompositionOp, current: Dom, activation: Dom) -> Dom {
    match op {
        CompositionOp::Max => current.max(activation),
        // zero is the "no value yet" sentinel for the t-norm
        CompositionOp::Min if current == 0 => activation,
        CompositionOp::Min => current.min(activation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{MemberFunc, Node, Shape};
    use crate::defuzz::DefuzzMethod;
    use crate::grid::GridSpec;
    use crate::model::VarRef;

    fn tri(a: usize, b: usize, c: usize, grid: GridSpec) -> MemberFunc {
        MemberFunc::new(
            Shape::Triangle,
            &[
                Node { x: a, y: 0 },
                Node { x: b, y: 0 },
                Node { x: c, y: 0 },
            ],
            grid,
        )
        .unwrap()
    }

    fn singleton(x: usize, grid: GridSpec) -> MemberFunc {
        MemberFunc::new(Shape::Singleton, &[Node { x, y: 0 }], grid).unwrap()
    }

    /// One input with two overlapping triangles, two singleton outputs.
    /// Rules: Low -> O1, High -> O2.
    fn small_model() -> Model {
        let grid = GridSpec::default();
        let mut m = Model::new(grid);
        m.add_input_variable("X", 0.0, 100.0, false).unwrap();
        m.add_set(VarRef::Input(0), "Low", tri(0, 0, 200, grid), false)
            .unwrap();
        m.add_set(VarRef::Input(0), "High", tri(0, 200, 200, grid), false)
            .unwrap();
        m.add_output_variable("Y", 0.0, 4.0).unwrap();
        m.add_set(VarRef::Output, "O1", singleton(50, grid), false)
            .unwrap();
        m.add_set(VarRef::Output, "O2", singleton(150, grid), false)
            .unwrap();
        m.add_rule(0, 0).unwrap();
        m.add_rule(1, 1).unwrap();
        m
    }

    #[test]
    fn test_no_output_variable_yields_none() {
        let mut m = Model::new(GridSpec::default());
        m.add_input_variable("X", 0.0, 1.0, false).unwrap();
        let mut s = Session::new(&m);
        assert_eq!(evaluate(&m, &mut s), None);
    }

    #[test]
    fn test_empty_rulebase_yields_none() {
        let mut m = small_model();
        m.clear_rules();
        let mut s = Session::new(&m);
        s.set_input_idx(0, 100);
        assert_eq!(evaluate(&m, &mut s), None);
    }

    #[test]
    fn test_out_doms_reflect_memberships() {
        let m = small_model();
        let mut s = Session::new(&m);
        // Low and High cross at the midpoint
        s.set_input_idx(0, 100);
        evaluate(&m, &mut s).unwrap();
        assert_eq!(s.out_dom(), &[50, 50]);

        s.set_input_idx(0, 0);
        evaluate(&m, &mut s).unwrap();
        assert_eq!(s.out_dom(), &[100, 0]);
    }

    #[test]
    fn test_mom_tracks_winning_rule() {
        let mut m = small_model();
        m.set_defuzz_method(DefuzzMethod::Mom).unwrap();
        let mut s = Session::new(&m);

        s.set_input_idx(0, 20); // Low dominates
        assert!((evaluate(&m, &mut s).unwrap() - 1.0).abs() < 1e-9);

        s.set_input_idx(0, 180); // High dominates
        assert!((evaluate(&m, &mut s).unwrap() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_composition_max_keeps_strongest() {
        // two inputs, both routed to the same output set
        let grid = GridSpec::default();
        let mut m = Model::new(grid);
        for id in ["A", "B"] {
            m.add_input_variable(id, 0.0, 100.0, false).unwrap();
        }
        m.add_set(VarRef::Input(0), "Low", tri(0, 0, 200, grid), false)
            .unwrap();
        m.add_set(VarRef::Input(1), "Low", tri(0, 0, 200, grid), false)
            .unwrap();
        m.add_output_variable("Y", 0.0, 4.0).unwrap();
        m.add_set(VarRef::Output, "O", singleton(100, grid), false)
            .unwrap();
        m.add_rule(0, 0).unwrap();

        let mut s = Session::new(&m);
        s.set_input_idx(0, 40); // Low = 80
        s.set_input_idx(1, 120); // Low = 40
        evaluate(&m, &mut s).unwrap();
        // inference Min combines the antecedents to 40
        assert_eq!(s.out_dom(), &[40]);

        m.set_inference_op(InferenceOp::Max);
        evaluate(&m, &mut s).unwrap();
        assert_eq!(s.out_dom(), &[80]);
    }

    #[test]
    fn test_composition_min_zero_is_no_value_yet() {
        assert_eq!(compose(CompositionOp::Min, 0, 70), 70);
        assert_eq!(compose(CompositionOp::Min, 30, 70), 30);
        assert_eq!(compose(CompositionOp::Min, 70, 30), 30);
        assert_eq!(compose(CompositionOp::Max, 30, 70), 70);
        assert_eq!(compose(CompositionOp::Max, 70, 30), 70);
    }

    #[test]
    fn test_two_sessions_bitwise_identical() {
        let m = small_model();
        let mut s1 = Session::new(&m);
        let mut s2 = Session::new(&m);
        for idx in [0usize, 37, 100, 163, 200] {
            s1.set_input_idx(0, idx);
            s2.set_input_idx(0, idx);
            let a = evaluate(&m, &mut s1);
            let b = evaluate(&m, &mut s2);
            assert_eq!(a.map(f64::to_bits), b.map(f64::to_bits));
        }
    }
}
