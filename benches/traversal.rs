use criterion::{black_box, criterion_group, criterion_main, Criterion};

use threestep::config::Configuration;
use threestep::generate::generate_trial_mappings;
use threestep::prng::Prng;
use threestep::scene::{compose, SceneContext};
use threestep::stage::Stage;
use threestep::state::{Side, State};
use threestep::stimuli::StimulusFactory;

fn bench_traversal(c: &mut Criterion) {
    let mut rng = Prng::new(0x7357);
    let (mappings, _transitions) = generate_trial_mappings(&mut rng, 0.7);

    c.bench_function("state_walk", |b| {
        b.iter(|| {
            let mut state = State::new("bench", mappings.clone());
            state.advance(black_box(Some(Side::Right)));
            state.advance(black_box(Some(Side::Left)));
            state.advance(black_box(Some(Side::Left)));
            black_box(state.current_location().to_string())
        })
    });

    c.bench_function("generate_mappings", |b| {
        let mut rng = Prng::new(1);
        b.iter(|| black_box(generate_trial_mappings(&mut rng, 0.7)))
    });

    let cfg = Configuration::default();
    let state = State::new("bench", mappings.clone());
    let factory = StimulusFactory::new(&cfg, Stage::MainThree);
    let set = factory.decision(0, true);
    c.bench_function("compose_scene", |b| {
        let ctx = SceneContext {
            controller: cfg.controller,
            keymap: cfg.keymap(),
            timeouts_so_far: 0,
            timeout_threshold: cfg.manipulations.timeout_count,
        };
        b.iter(|| black_box(compose(&set, &state, &ctx)))
    });
}

criterion_group!(benches, bench_traversal);
criterion_main!(benches);
