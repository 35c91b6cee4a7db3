//! Micro-operation benchmarks for every engine.
//!
//! Run with: `cargo bench --bench ops`
//!
//! Measures per-operation latency for hits, insert-with-eviction, a skewed
//! mixed workload, and multi-threaded contention on single-lock versus
//! sharded caches.

use std::hint::black_box;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use evictkit::policy::arc::ArcCache;
use evictkit::policy::lfu::LfuCache;
use evictkit::policy::lru::LruCache;
use evictkit::policy::lru_k::LrukCache;
use evictkit::policy::sharded::ShardedCache;
use evictkit::traits::CachePolicy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const CAPACITY: usize = 16_384;
const OPS: u64 = 100_000;
const THREADS: usize = 4;

type Engine = Box<dyn CachePolicy<u64, u64>>;

const ENGINES: [&str; 4] = ["lru", "lru_k", "lfu", "arc"];

/// The hybrid gets half the capacity since each part is sized to it.
fn make(name: &str) -> Engine {
    match name {
        "lru_k" => Box::new(LrukCache::<u64, u64>::new(CAPACITY, CAPACITY * 4, 2)),
        "lfu" => Box::new(LfuCache::<u64, u64>::new(CAPACITY)),
        "arc" => Box::new(ArcCache::<u64, u64>::new(CAPACITY / 2)),
        _ => Box::new(LruCache::<u64, u64>::new(CAPACITY)),
    }
}

/// Puts every key twice so history-gated engines admit it.
fn warm(cache: &dyn CachePolicy<u64, u64>) {
    for _ in 0..2 {
        for i in 0..CAPACITY as u64 {
            cache.put(i, i);
        }
    }
}

// ============================================================================
// Get Hit Latency
// ============================================================================

fn bench_get_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_hit_ns");
    group.throughput(Throughput::Elements(OPS));

    for name in ENGINES {
        group.bench_function(name, |b| {
            b.iter_custom(|iters| {
                let cache = make(name);
                warm(cache.as_ref());
                let start = Instant::now();
                for _ in 0..iters {
                    for i in 0..OPS {
                        black_box(cache.get(&(i % CAPACITY as u64)));
                    }
                }
                start.elapsed()
            })
        });
    }

    group.finish();
}

// ============================================================================
// Insert With Eviction
// ============================================================================

fn bench_insert_evict(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_evict_ns");
    group.throughput(Throughput::Elements(OPS));

    for name in ENGINES {
        group.bench_function(name, |b| {
            b.iter_custom(|iters| {
                let mut total = Duration::ZERO;
                for _ in 0..iters {
                    let cache = make(name);
                    warm(cache.as_ref());
                    let start = Instant::now();
                    for i in 0..OPS {
                        cache.put(CAPACITY as u64 + i, i);
                    }
                    total += start.elapsed();
                }
                total
            })
        });
    }

    group.finish();
}

// ============================================================================
// Mixed Skewed Workload
// ============================================================================

/// 80% of requests go to a hot set a tenth the size of the cache.
fn skewed_keys(seed: u64) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let hot = CAPACITY as u64 / 10;
    (0..OPS)
        .map(|_| {
            if rng.gen_bool(0.8) {
                rng.gen_range(0..hot)
            } else {
                rng.gen_range(0..CAPACITY as u64 * 4)
            }
        })
        .collect()
}

fn bench_mixed(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed_skewed_ns");
    group.throughput(Throughput::Elements(OPS));
    let keys = skewed_keys(42);

    for name in ENGINES {
        group.bench_function(name, |b| {
            b.iter_custom(|iters| {
                let mut total = Duration::ZERO;
                for _ in 0..iters {
                    let cache = make(name);
                    let start = Instant::now();
                    for &key in &keys {
                        if cache.get(&key).is_none() {
                            cache.put(key, key);
                        }
                    }
                    total += start.elapsed();
                }
                total
            })
        });
    }

    group.finish();
}

// ============================================================================
// Contention: single lock vs sharded
// ============================================================================

fn run_threads<C>(cache: Arc<C>, keys: Arc<Vec<u64>>) -> Duration
where
    C: CachePolicy<u64, u64> + 'static,
{
    let start = Instant::now();
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let cache = Arc::clone(&cache);
            let keys = Arc::clone(&keys);
            thread::spawn(move || {
                for &key in keys.iter().skip(t).step_by(THREADS) {
                    if cache.get(&key).is_none() {
                        cache.put(key, key);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        let _ = handle.join();
    }
    start.elapsed()
}

fn bench_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_ns");
    group.throughput(Throughput::Elements(OPS));
    let keys = Arc::new(skewed_keys(7));

    group.bench_function("lru_single_lock", |b| {
        b.iter_custom(|iters| {
            (0..iters)
                .map(|_| {
                    let cache = Arc::new(LruCache::<u64, u64>::new(CAPACITY));
                    run_threads(cache, Arc::clone(&keys))
                })
                .sum()
        })
    });

    group.bench_function("lru_sharded", |b| {
        b.iter_custom(|iters| {
            (0..iters)
                .map(|_| {
                    let cache = Arc::new(ShardedCache::<LruCache<u64, u64>>::lru(CAPACITY, 16));
                    run_threads(cache, Arc::clone(&keys))
                })
                .sum()
        })
    });

    group.bench_function("arc_sharded", |b| {
        b.iter_custom(|iters| {
            (0..iters)
                .map(|_| {
                    let cache =
                        Arc::new(ShardedCache::<ArcCache<u64, u64>>::arc(CAPACITY / 2, 16, 2));
                    run_threads(cache, Arc::clone(&keys))
                })
                .sum()
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_get_hit,
    bench_insert_evict,
    bench_mixed,
    bench_contention
);
criterion_main!(benches);
