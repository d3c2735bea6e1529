// Benchmark suite for the timespan tree against the linear-scan model
//
// - TimespanTree: augmented AVL tree, O(log n) edits
// - NaiveTimespans: sorted Vec, O(n) queries

use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput,
};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use offset_tree::Timespan;
use offset_tree::TimespanTree;
use offset_tree_reference::NaiveTimespans;

type Span = Timespan<i64, u32>;

// =============================================================================
// Benchmark Helpers
// =============================================================================

/// Random spans with starts spread over `10 * count` and short durations.
fn random_spans(count: usize, seed: u64) -> Vec<Span> {
    let mut rng = StdRng::seed_from_u64(seed);
    let range = (count as i64) * 10;
    return (0..count)
        .map(|i| {
            let start = rng.gen_range(0..range);
            let length = rng.gen_range(0..40);
            Timespan::new(start, start + length, i as u32).unwrap()
        })
        .collect();
}

fn probes(count: usize, range: i64, seed: u64) -> Vec<i64> {
    let mut rng = StdRng::seed_from_u64(seed);
    return (0..count).map(|_| rng.gen_range(0..range)).collect();
}

// =============================================================================
// Insertion
// =============================================================================

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for size in [100, 1000, 10000] {
        let spans = random_spans(size, 42);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("TimespanTree", size), &spans, |b, spans| {
            b.iter(|| {
                let mut tree = TimespanTree::new();
                for span in spans {
                    tree.insert(*span);
                }
                black_box(tree.len())
            });
        });

        group.bench_with_input(BenchmarkId::new("NaiveTimespans", size), &spans, |b, spans| {
            b.iter(|| {
                let mut naive = NaiveTimespans::new();
                for span in spans {
                    naive.insert(*span);
                }
                black_box(naive.len())
            });
        });

        group.bench_with_input(BenchmarkId::new("TimespanTree/batch", size), &spans, |b, spans| {
            b.iter(|| {
                let mut tree = TimespanTree::new();
                tree.insert_many(spans.iter().copied());
                black_box(tree.len())
            });
        });
    }

    group.finish();
}

// =============================================================================
// Queries
// =============================================================================

fn bench_overlap(c: &mut Criterion) {
    let mut group = c.benchmark_group("overlapping");

    for size in [100, 1000, 10000] {
        let spans = random_spans(size, 7);
        let points = probes(100, (size as i64) * 10, 8);
        let tree: TimespanTree<Span> = spans.iter().copied().collect();
        let naive: NaiveTimespans<Span> = spans.iter().copied().collect();
        group.throughput(Throughput::Elements(points.len() as u64));

        group.bench_with_input(BenchmarkId::new("TimespanTree", size), &points, |b, points| {
            b.iter(|| {
                let mut found = 0usize;
                for p in points {
                    found += tree.elements_overlapping(*p).len();
                }
                black_box(found)
            });
        });

        group.bench_with_input(BenchmarkId::new("NaiveTimespans", size), &points, |b, points| {
            b.iter(|| {
                let mut found = 0usize;
                for p in points {
                    found += naive.overlapping(*p).len();
                }
                black_box(found)
            });
        });
    }

    group.finish();
}

fn bench_stopping(c: &mut Criterion) {
    let mut group = c.benchmark_group("stopping_at");

    for size in [1000, 10000] {
        let spans = random_spans(size, 11);
        let points: Vec<i64> = spans.iter().take(100).map(|x| x.end()).collect();
        let tree: TimespanTree<Span> = spans.iter().copied().collect();
        let naive: NaiveTimespans<Span> = spans.iter().copied().collect();
        group.throughput(Throughput::Elements(points.len() as u64));

        group.bench_with_input(BenchmarkId::new("TimespanTree", size), &points, |b, points| {
            b.iter(|| {
                let mut found = 0usize;
                for p in points {
                    found += tree.elements_stopping_at(*p).len();
                }
                black_box(found)
            });
        });

        group.bench_with_input(BenchmarkId::new("NaiveTimespans", size), &points, |b, points| {
            b.iter(|| {
                let mut found = 0usize;
                for p in points {
                    found += naive.stopping_at(*p).len();
                }
                black_box(found)
            });
        });
    }

    group.finish();
}

fn bench_rank_access(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_access");

    for size in [1000, 10000] {
        let tree: TimespanTree<Span> = random_spans(size, 3).into_iter().collect();
        let mut rng = StdRng::seed_from_u64(4);
        let ranks: Vec<usize> = (0..100).map(|_| rng.gen_range(0..size)).collect();
        group.throughput(Throughput::Elements(ranks.len() as u64));

        group.bench_with_input(BenchmarkId::new("get", size), &ranks, |b, ranks| {
            b.iter(|| {
                let mut total = 0i64;
                for r in ranks {
                    total += tree[*r].start();
                }
                black_box(total)
            });
        });

        group.bench_with_input(BenchmarkId::new("index", size), &ranks, |b, ranks| {
            let items: Vec<Span> = ranks.iter().map(|r| tree[*r]).collect();
            b.iter(|| {
                let mut total = 0usize;
                for item in &items {
                    total += tree.index(item).unwrap_or(0);
                }
                black_box(total)
            });
        });
    }

    group.finish();
}

// =============================================================================
// Verticalities and Splitting
// =============================================================================

fn bench_verticalities(c: &mut Criterion) {
    let mut group = c.benchmark_group("verticalities");

    for size in [1000, 10000] {
        let tree: TimespanTree<Span> = random_spans(size, 5).into_iter().collect();
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(BenchmarkId::new("forward", size), |b| {
            b.iter(|| {
                let mut degree = 0usize;
                for v in tree.iter_verticalities(false) {
                    degree = degree.max(v.degree_of_overlap());
                }
                black_box(degree)
            });
        });
    }

    group.finish();
}

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_at");

    for size in [1000, 10000] {
        let tree: TimespanTree<Span> = random_spans(size, 9).into_iter().collect();
        let points = probes(20, (size as i64) * 10, 10);

        group.bench_with_input(BenchmarkId::new("TimespanTree", size), &points, |b, points| {
            b.iter(|| {
                let mut copy = tree.clone();
                black_box(copy.split_at_many(points.iter().copied()))
            });
        });
    }

    group.finish();
}

// =============================================================================
// Criterion Configuration
// =============================================================================

criterion_group!(
    benches,
    bench_insert,
    bench_overlap,
    bench_stopping,
    bench_rank_access,
    bench_verticalities,
    bench_split,
);

criterion_main!(benches);
