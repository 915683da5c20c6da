use caplay::model::layer::{EmitterMode, EmitterShape};
use caplay::{
    CamlDocument, DrawOp, EmitterCell, EmitterLayer, EmitterSim, LayerKind, ParseOptions,
    TintCache, TintCacheOpts, TintKey, parse,
};

const LOCKSCREEN: &str = include_str!("data/lockscreen.caml");

fn snow_spec() -> EmitterLayer {
    let doc: CamlDocument = parse(LOCKSCREEN, &ParseOptions::default()).unwrap();
    let snow = doc
        .root
        .children
        .iter()
        .find(|l| l.id == "snow")
        .expect("snow layer");
    match &snow.kind {
        LayerKind::Emitter(spec) => spec.clone(),
        other => panic!("expected emitter, got {other:?}"),
    }
}

#[test]
fn parsed_emitter_drives_the_simulator() {
    let spec = snow_spec();
    assert_eq!(spec.shape, EmitterShape::Line);
    assert_eq!(spec.mode, EmitterMode::Outline);

    let mut sim = EmitterSim::new(spec, 11);
    sim.step(1.0);
    assert_eq!(sim.live_count(), 6); // birthRate 6/s

    // Line + outline spawns along the emitter line.
    for p in sim.particles() {
        assert_eq!(p.position.y, 0.0);
    }
}

#[test]
fn spawn_counts_do_not_drift_across_step_granularities() {
    let spec = snow_spec();
    let mut coarse = EmitterSim::new(spec.clone(), 5);
    let mut fine = EmitterSim::new(spec, 5);

    coarse.step(1.0);
    for _ in 0..20 {
        fine.step(0.05);
    }
    assert_eq!(coarse.live_count(), 6);
    assert_eq!(fine.live_count(), 6);
}

#[test]
fn pool_capacity_evicts_the_oldest_particles() {
    let cell = EmitterCell {
        birth_rate: 10.0,
        lifetime: 100.0,
        ..EmitterCell::default()
    };
    let spec = EmitterLayer {
        cells: vec![cell],
        ..snow_spec()
    };

    let mut sim = EmitterSim::with_capacity(spec, 2, 25);
    for _ in 0..5 {
        sim.step(1.0);
    }
    assert_eq!(sim.live_count(), 25);
    // Everything still alive was born in the last three steps.
    for p in sim.particles() {
        assert!(p.remaining_lifetime > 97.0);
    }
}

#[test]
fn draw_list_is_additive_and_sprites_carry_tint() {
    let spec = snow_spec();
    let mut sim = EmitterSim::new(spec, 11);
    sim.step(1.0);

    let list = sim.draw();
    assert!(list.additive); // renderMode="additive" in the document
    assert_eq!(list.ops.len(), 6);
    for op in &list.ops {
        match op {
            DrawOp::Sprite { image, tint, .. } => {
                assert_eq!(image, "flake.png");
                assert!((tint.b - 1.0).abs() < 1e-9);
            }
            DrawOp::Disc { .. } => panic!("cell has a contents image"),
        }
    }
}

#[test]
fn tinted_sprites_are_cached_across_frames() {
    let spec = snow_spec();
    let mut sim = EmitterSim::new(spec, 11);
    let mut cache: TintCache<u64> = TintCache::new(TintCacheOpts::default());
    let mut composites = 0u64;

    for _ in 0..30 {
        sim.step(1.0 / 30.0);
        for op in sim.draw().ops {
            if let DrawOp::Sprite { image, tint, .. } = op {
                cache.get_or_insert_with(TintKey::new(image, tint, (16, 16)), || {
                    composites += 1;
                    composites
                });
            }
        }
    }

    let stats = cache.stats();
    assert!(stats.hits > 0);
    // The cell has no color variance, so one tint entry serves every
    // frame.
    assert_eq!(cache.len(), 1);
    assert_eq!(composites, 1);
}
