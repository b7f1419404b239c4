use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use touch_core::mocks::{Level, LevelSample};
use touch_core::{ParkMiller, ScanOrder, TouchArray};
use touch_traits::ManualClock;

fn settled_array(sensors: usize, per_sensor: usize) -> (TouchArray, ManualClock) {
    let clock = ManualClock::new();
    let level = Level::new(100);
    let mut array = (0..sensors)
        .fold(TouchArray::builder(), |b, _| b.add_sensor(LevelSample::new(&level)))
        .with_clock(Box::new(clock.clone()))
        .measurements_per_sensor(per_sensor)
        .build()
        .expect("build");
    for _ in 0..100 {
        clock.advance(10);
        array.run_cycle();
    }
    (array, clock)
}

fn bench_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_cycle");
    for &(sensors, per_sensor) in &[(1usize, 8usize), (8, 8), (32, 16)] {
        let (mut array, clock) = settled_array(sensors, per_sensor);
        group.bench_function(format!("{sensors}x{per_sensor}"), |b| {
            b.iter(|| {
                clock.advance(10);
                black_box(array.run_cycle())
            });
        });
    }
    group.finish();
}

fn bench_schedule(c: &mut Criterion) {
    c.bench_function("scan_order_32x16", |b| {
        b.iter_batched(
            ParkMiller::default,
            |mut rng| black_box(ScanOrder::build(32, 16, &mut rng)),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_cycle, bench_schedule);
criterion_main!(benches);
