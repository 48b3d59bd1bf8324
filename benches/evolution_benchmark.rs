use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use santa_fe_gp::config::Config;
use santa_fe_gp::evolution::population::Population;
use santa_fe_gp::trail::load_maps;
use std::path::Path;
use std::time::Duration;

// Helper to create a minimal but realistic test setup
fn setup_population(parallel: bool) -> Population {
    let mut config = Config::load(Path::new("config.toml")).unwrap();
    config.ga.population_size = 100;
    config.ga.parallel = parallel;
    let maps = load_maps(&config.trail.map_files, config.trail.action_limit).unwrap();

    let mut rng = StdRng::seed_from_u64(42);
    Population::new(&config.ga, maps, &mut rng)
}

fn benchmark_evaluate_population(c: &mut Criterion) {
    let serial = setup_population(false);
    let parallel = setup_population(true);

    let mut group = c.benchmark_group("Population Performance");
    group.measurement_time(Duration::from_secs(10));

    // `with_maps` re-scores a copy, so every iteration evaluates the whole population
    group.bench_function("evaluate_population_serial", |b| {
        b.iter(|| serial.with_maps(serial.maps().to_vec()))
    });
    group.bench_function("evaluate_population_parallel", |b| {
        b.iter(|| parallel.with_maps(parallel.maps().to_vec()))
    });

    group.bench_function("evolve_one_generation", |b| {
        let mut rng = StdRng::seed_from_u64(7);
        b.iter(|| {
            let mut next = serial.clone();
            next.evolve(&mut rng).unwrap();
            next
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_evaluate_population);
criterion_main!(benches);
