//! FCL serialization round-trips and reader error reporting.

use fuzzkit::{
    CompositionOp, DefuzzMethod, EofSite, FuzzyError, GridSpec, InferenceOp, MemberFunc,
    Model, ModelRegistry, Node, Shape, VarRef,
};

/// A model exercising every shape and the non-default method selections.
fn build_kitchen_sink() -> Model {
    let grid = GridSpec::default();
    let mut m = Model::new(grid);

    m.add_input_variable("Temperature", -40.0, 60.0, false)
        .unwrap();
    m.add_set(
        VarRef::Input(0),
        "Freezing",
        MemberFunc::new(
            Shape::Trapezoid,
            &[
                Node { x: 0, y: 0 },
                Node { x: 0, y: 0 },
                Node { x: 60, y: 0 },
                Node { x: 90, y: 0 },
            ],
            grid,
        )
        .unwrap(),
        false,
    )
    .unwrap();
    m.add_set(
        VarRef::Input(0),
        "Mild",
        MemberFunc::new(
            Shape::SCurve,
            &[
                Node { x: 60, y: 0 },
                Node { x: 80, y: 0 },
                Node { x: 100, y: 0 },
                Node { x: 120, y: 0 },
                Node { x: 140, y: 0 },
                Node { x: 160, y: 0 },
                Node { x: 180, y: 0 },
            ],
            grid,
        )
        .unwrap(),
        false,
    )
    .unwrap();
    m.add_set(
        VarRef::Input(0),
        "Hot",
        MemberFunc::new(
            Shape::Triangle,
            &[
                Node { x: 140, y: 0 },
                Node { x: 200, y: 0 },
                Node { x: 200, y: 0 },
            ],
            grid,
        )
        .unwrap(),
        false,
    )
    .unwrap();

    m.add_output_variable("Power", 0.0, 10.0).unwrap();
    for (name, x) in [("Off", 0), ("Low", 60), ("High", 180)] {
        m.add_set(
            VarRef::Output,
            name,
            MemberFunc::new(Shape::Singleton, &[Node { x, y: 0 }], grid).unwrap(),
            false,
        )
        .unwrap();
    }

    m.set_inference_op(InferenceOp::Max);
    m.set_composition(CompositionOp::Min).unwrap();
    m.set_defuzz_method(DefuzzMethod::Mom).unwrap();

    m.add_rule(0, 2).unwrap();
    m.add_rule(1, 1).unwrap();
    // rule 2 left unset on purpose
    m
}

fn assert_models_equal(a: &Model, b: &Model) {
    assert_eq!(a.num_inputs(), b.num_inputs());
    for (va, vb) in a.inputs().iter().zip(b.inputs()) {
        assert_eq!(va.id(), vb.id());
        assert_eq!(va.map(), vb.map());
        assert_eq!(va.num_sets(), vb.num_sets());
        for (sa, sb) in va.sets().iter().zip(vb.sets()) {
            assert_eq!(sa.id(), sb.id());
            assert_eq!(sa.func().shape(), sb.func().shape());
            assert_eq!(sa.func().nodes(), sb.func().nodes());
            assert_eq!(sa.func().samples(), sb.func().samples());
        }
    }

    let (oa, ob) = (a.output().unwrap(), b.output().unwrap());
    assert_eq!(oa.id(), ob.id());
    assert_eq!(oa.map(), ob.map());
    assert_eq!(oa.defuzz_method(), ob.defuzz_method());
    assert_eq!(oa.composition(), ob.composition());
    for (sa, sb) in oa.sets().iter().zip(ob.sets()) {
        assert_eq!(sa.id(), sb.id());
        assert_eq!(sa.func().nodes(), sb.func().nodes());
    }

    assert_eq!(a.inference_op(), b.inference_op());
    assert_eq!(a.rules().cells(), b.rules().cells());
}

#[test]
fn test_save_load_preserves_every_observable() {
    let model = build_kitchen_sink();
    let text = fuzzkit::fcl::save_str(&model);
    let reloaded = fuzzkit::fcl::load_str(&text, model.grid()).unwrap();
    assert_models_equal(&model, &reloaded);
}

#[test]
fn test_mom_selection_survives_round_trip() {
    // the DEFUZZIFY block must be written, or MoM silently degrades to CoG
    let model = build_kitchen_sink();
    let text = fuzzkit::fcl::save_str(&model);
    assert!(text.contains("METHOD : MoM;"));
    let reloaded = fuzzkit::fcl::load_str(&text, model.grid()).unwrap();
    assert_eq!(reloaded.output().unwrap().defuzz_method(), DefuzzMethod::Mom);
}

#[test]
fn test_double_round_trip_is_stable() {
    let model = build_kitchen_sink();
    let once = fuzzkit::fcl::save_str(&model);
    let reloaded = fuzzkit::fcl::load_str(&once, model.grid()).unwrap();
    let twice = fuzzkit::fcl::save_str(&reloaded);
    assert_eq!(once, twice);
}

#[test]
fn test_file_round_trip_through_registry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("power.fcl");
    let path = path.to_str().unwrap();

    let registry = ModelRegistry::default();
    let model = registry.new_model();
    registry
        .with_model_mut(model, |m| *m = build_kitchen_sink())
        .unwrap();
    registry.save_fcl_file(model, path).unwrap();

    let reloaded = registry.new_model();
    registry.load_fcl_file(reloaded, path).unwrap();

    // equal observables imply equal serializations
    assert_eq!(
        registry.save_fcl_string(model).unwrap(),
        registry.save_fcl_string(reloaded).unwrap()
    );
}

#[test]
fn test_missing_file_is_file_open_error() {
    let registry = ModelRegistry::default();
    let model = registry.new_model();
    let err = registry.load_fcl_file(model, "/definitely/not/here.fcl");
    assert!(matches!(err, Err(FuzzyError::FileOpen { .. })));

    // and the message channel carries it, once
    let msg = registry.take_msg_text(model).unwrap().unwrap();
    assert!(msg.contains("not/here.fcl"));
    assert_eq!(registry.take_msg_text(model).unwrap(), None);
}

#[test]
fn test_parse_error_keeps_previous_model() {
    let registry = ModelRegistry::default();
    let model = registry.new_model();
    registry
        .with_model_mut(model, |m| *m = build_kitchen_sink())
        .unwrap();
    let good = registry.save_fcl_string(model).unwrap();

    let err = registry.load_fcl_string(model, "FUNCTION_BLOCK\ngarbage");
    assert!(err.is_err());
    assert!(registry.take_msg_text(model).unwrap().is_some());

    // the previous contents survived the failed load
    assert_eq!(registry.save_fcl_string(model).unwrap(), good);
}

#[test]
fn test_reload_drops_stale_sessions() {
    let registry = ModelRegistry::default();
    let model = registry.new_model();
    registry
        .with_model_mut(model, |m| *m = build_kitchen_sink())
        .unwrap();
    let text = registry.save_fcl_string(model).unwrap();

    let child = registry.new_child(model).unwrap();
    registry.load_fcl_string(model, &text).unwrap();
    assert!(matches!(
        registry.set_value(model, child, 0, 1.0),
        Err(FuzzyError::UnknownHandle(_))
    ));
}

#[test]
fn test_truncation_errors_name_their_site() {
    let model = build_kitchen_sink();
    let text = fuzzkit::fcl::save_str(&model);
    let grid = model.grid();

    // cut inside the variable declarations
    let cut = text.find("VAR_INPUT").unwrap() + "VAR_INPUT".len();
    assert!(matches!(
        fuzzkit::fcl::load_str(&text[..cut], grid),
        Err(FuzzyError::UnexpectedEof(EofSite::Variables))
    ));

    // cut inside a FUZZIFY block
    let cut = text.find("TERM Freezing").unwrap();
    assert!(matches!(
        fuzzkit::fcl::load_str(&text[..cut], grid),
        Err(FuzzyError::UnexpectedEof(EofSite::Sets))
    ));

    // cut inside the rule block
    let cut = text.find("RULE 0").unwrap();
    assert!(matches!(
        fuzzkit::fcl::load_str(&text[..cut], grid),
        Err(FuzzyError::UnexpectedEof(EofSite::Rules))
    ));
}
