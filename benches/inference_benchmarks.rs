//! Inference throughput benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use fuzzkit::infer;
use fuzzkit::{
    DefuzzMethod, GridSpec, MemberFunc, Model, Node, Session, Shape, VarRef,
};

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

/// Two inputs of three overlapping triangles each, fully ruled.
fn combat_model(method: DefuzzMethod) -> Model {
    let grid = GridSpec::default();
    let mut m = Model::new(grid);
    for id in ["Our_Health", "Enemy_Health"] {
        let v = m.add_input_variable(id, 0.0, 100.0, false).unwrap();
        m.add_set(VarRef::Input(v), "Near_Death", tri(0, 0, 100, grid), false)
            .unwrap();
        m.add_set(VarRef::Input(v), "Good", tri(28, 100, 166, grid), false)
            .unwrap();
        m.add_set(VarRef::Input(v), "Excellent", tri(100, 200, 200, grid), false)
            .unwrap();
    }
    m.add_output_variable("Aggressiveness", 0.0, 4.0).unwrap();
    for (id, x) in [("Run_Away", 50), ("Fight_Defensively", 100), ("All_Out_Attack", 150)] {
        m.add_set(
            VarRef::Output,
            id,
            MemberFunc::new(Shape::Singleton, &[Node { x, y: 0 }], grid).unwrap(),
            false,
        )
        .unwrap();
    }
    for idx in 0..9 {
        m.add_rule(idx, idx % 3).unwrap();
    }
    m.set_defuzz_method(method).unwrap();
    m
}

fn bench_inference(c: &mut Criterion) {
    let mom = combat_model(DefuzzMethod::Mom);
    let cog = combat_model(DefuzzMethod::Cog);

    c.bench_function("evaluate_mom_sweep", |b| {
        let mut session = Session::new(&mom);
        b.iter(|| {
            let mut acc = 0.0f64;
            for idx in (0..=200).step_by(20) {
                session.set_input_idx(0, idx);
                session.set_input_idx(1, 200 - idx);
                if let Some(out) = infer::evaluate(&mom, &mut session) {
                    acc += out;
                }
            }
            black_box(acc)
        });
    });

    c.bench_function("evaluate_cog_sweep", |b| {
        let mut session = Session::new(&cog);
        b.iter(|| {
            let mut acc = 0.0f64;
            for idx in (0..=200).step_by(20) {
                session.set_input_idx(0, idx);
                session.set_input_idx(1, 200 - idx);
                if let Some(out) = infer::evaluate(&cog, &mut session) {
                    acc += out;
                }
            }
            black_box(acc)
        });
    });
}

fn bench_rasterization(c: &mut Criterion) {
    let grid = GridSpec::default();
    c.bench_function("rasterize_scurve", |b| {
        b.iter(|| {
            let func = MemberFunc::new(
                Shape::SCurve,
                &[
                    Node { x: 0, y: 0 },
                    Node { x: 30, y: 0 },
                    Node { x: 60, y: 0 },
                    Node { x: 100, y: 0 },
                    Node { x: 140, y: 0 },
                    Node { x: 170, y: 0 },
                    Node { x: 200, y: 0 },
                ],
                grid,
            )
            .unwrap();
            black_box(func)
        });
    });
}

criterion_group!(benches, bench_inference, bench_rasterization);
criterion_main!(benches);
