use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tessel_map::OrderedMap;
use tessel_storage::{Blake3Hash, CborEncoder, MemoryStorageBackend, Storage};

const BENCH_SEED: u64 = 42;

fn make_storage() -> Storage<CborEncoder, MemoryStorageBackend<Blake3Hash, Vec<u8>>> {
    Storage {
        backend: MemoryStorageBackend::default(),
        encoder: CborEncoder,
    }
}

fn random_buffers<const N: usize>(rng: &mut StdRng, count: usize) -> Vec<Vec<u8>> {
    (0..count).map(|_| rng.r#gen::<[u8; N]>().to_vec()).collect()
}

fn bench_insert_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_sequential");
    let mut rng = StdRng::seed_from_u64(BENCH_SEED);

    for size in [10, 100, 1000, 10000] {
        let keys: Vec<Vec<u8>> = (0..size as u64)
            .map(|key| key.to_be_bytes().to_vec())
            .collect();
        let values = random_buffers::<32>(&mut rng, size);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.to_async(tokio::runtime::Runtime::new().unwrap())
                .iter(|| async {
                    let mut map = OrderedMap::new(make_storage()).await.unwrap();

                    for (key, value) in keys.iter().zip(values.iter()) {
                        map = map.set(key.clone(), value.clone()).await.unwrap();
                    }
                });
        });
    }

    group.finish();
}

fn bench_insert_random(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_random");
    let mut rng = StdRng::seed_from_u64(BENCH_SEED);

    for size in [10, 100, 1000, 10000] {
        let keys = random_buffers::<16>(&mut rng, size);
        let values = random_buffers::<32>(&mut rng, size);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.to_async(tokio::runtime::Runtime::new().unwrap())
                .iter(|| async {
                    let mut map = OrderedMap::new(make_storage()).await.unwrap();

                    for (key, value) in keys.iter().zip(values.iter()) {
                        map = map.set(key.clone(), value.clone()).await.unwrap();
                    }
                });
        });
    }

    group.finish();
}

fn bench_from_entries(c: &mut Criterion) {
    let mut group = c.benchmark_group("from_entries");
    let mut rng = StdRng::seed_from_u64(BENCH_SEED);

    for size in [100, 1000, 10000, 100000] {
        let keys = random_buffers::<16>(&mut rng, size);
        let values = random_buffers::<32>(&mut rng, size);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.to_async(tokio::runtime::Runtime::new().unwrap())
                .iter(|| async {
                    OrderedMap::from_entries(
                        keys.iter().cloned().zip(values.iter().cloned()),
                        make_storage(),
                    )
                    .await
                    .unwrap()
                });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_sequential,
    bench_insert_random,
    bench_from_entries
);
criterion_main!(benches);
