use criterion::{Criterion, black_box, criterion_group, criterion_main};
use gostop_bot::{Capabilities, PolicyDispatcher, PolicyVariant};
use gostop_core::rules::MatgoRules;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn bench_first_decision(variant: PolicyVariant, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let state = MatgoRules.deal(&mut rng);
    let dispatcher = PolicyDispatcher::new(variant, Capabilities::default());
    let _ = black_box(dispatcher.decide_pending(&state, &mut rng));
}

fn decision_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("decision");
    for name in [
        "rule_ordered",
        "combo_guard",
        "weighted",
        "phase_weighted",
        "phase_profile",
        "gold_pressure",
        "gated",
    ] {
        let Some(variant) = PolicyVariant::from_name(name) else {
            continue;
        };
        for seed in [7u64, 1040, 1145] {
            group.bench_function(format!("{name}_{seed}"), |b| {
                b.iter(|| bench_first_decision(variant, seed))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, decision_bench);
criterion_main!(benches);
