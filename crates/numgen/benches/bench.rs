use core::{hint::black_box, time::Duration};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use numgen::{Dispatcher, Generator, SortedValues, channel};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use std::time::Instant;
use tokio::{runtime::Builder, sync::mpsc};

// Number of distinct values inserted per iteration.
const TOTAL_VALUES: u64 = 4096;

// Generators swept by every lifecycle round trip.
const NUM_GENERATORS: usize = 64;

/// Benchmarks sorted, deduplicating insertion of shuffled values, each offered
/// twice.
fn benchmark_sorted_insert(c: &mut Criterion) {
    let mut values: Vec<u64> = (0..TOTAL_VALUES).chain(0..TOTAL_VALUES).collect();
    values.shuffle(&mut StdRng::seed_from_u64(7));

    let mut group = c.benchmark_group("sorted_values");
    group.throughput(Throughput::Elements(values.len() as u64));

    group.bench_function(format!("elems/{}", values.len()), |b| {
        b.iter(|| {
            let mut store = SortedValues::with_capacity(TOTAL_VALUES as usize);
            for &value in &values {
                black_box(store.insert(value));
            }
            black_box(store.len())
        });
    });

    group.finish();
}

/// Benchmarks a `start_all` + `stop_all` round trip over idle generators.
fn benchmark_dispatch_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatcher");
    group.throughput(Throughput::Elements(NUM_GENERATORS as u64 * 2));

    group.bench_function(format!("generators/{NUM_GENERATORS}"), |b| {
        let rt = Builder::new_multi_thread()
            .enable_all()
            .worker_threads(2)
            .build()
            .unwrap();

        b.to_async(&rt).iter_custom(|iters| async move {
            let (values_tx, _values_rx) = mpsc::channel(NUM_GENERATORS);
            let mut dispatcher = Dispatcher::new(None);

            for index in 0..NUM_GENERATORS {
                let (handle, link) = channel();
                // Long enough that no generator ever ticks during a round.
                let generator = Generator::new(
                    index,
                    Duration::from_secs(3600),
                    TOTAL_VALUES,
                    link,
                    values_tx.clone(),
                )
                .unwrap();
                tokio::spawn(generator.run());
                dispatcher.append_generator(handle);
            }

            let start = Instant::now();
            for _ in 0..iters {
                dispatcher.start_all().await.unwrap();
                dispatcher.stop_all().await.unwrap();
            }
            let elapsed = start.elapsed();

            dispatcher.destroy_all().await.unwrap();
            elapsed
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_sorted_insert,
    benchmark_dispatch_round_trip,
);
criterion_main!(benches);
