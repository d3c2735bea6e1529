// Quick timing run - build a large tree, then time each query family

use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use offset_tree::Timespan;
use offset_tree::TimespanTree;

fn main() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let num_spans = 100_000;
    let range = (num_spans as i64) * 10;

    println!("Building tree with {} spans...", num_spans);
    let start = Instant::now();
    let mut tree = TimespanTree::new();
    for i in 0..num_spans {
        let begin = rng.gen_range(0..range);
        let length = rng.gen_range(0..40);
        tree.insert(Timespan::new(begin, begin + length, i as u32).unwrap());
    }
    let build_time = start.elapsed();
    println!("  {:?} ({:?} per insert)", build_time, build_time / num_spans as u32);
    println!("  distinct offsets: {}, height: {}", tree.all_offsets().len(), tree.height());

    let iterations = 10_000;
    let points: Vec<i64> = (0..iterations).map(|_| rng.gen_range(0..range)).collect();

    println!("\n=== elements_overlapping() ===");
    let start = Instant::now();
    let mut found = 0usize;
    for p in &points {
        found += tree.elements_overlapping(*p).len();
    }
    let overlap_time = start.elapsed();
    println!("  {} iterations: {:?}, {} hits", iterations, overlap_time, found);
    println!("  per call: {:?}", overlap_time / iterations as u32);

    println!("\n=== elements_stopping_at() ===");
    let start = Instant::now();
    let mut found = 0usize;
    for p in &points {
        found += tree.elements_stopping_at(*p).len();
    }
    let stop_time = start.elapsed();
    println!("  {} iterations: {:?}, {} hits", iterations, stop_time, found);
    println!("  per call: {:?}", stop_time / iterations as u32);

    println!("\n=== tree[i] ===");
    let start = Instant::now();
    let mut total = 0i64;
    for i in 0..iterations {
        total += tree[(i * 7919) % tree.len()].start();
    }
    let rank_time = start.elapsed();
    println!("  {} iterations: {:?} (checksum {})", iterations, rank_time, total);
    println!("  per call: {:?}", rank_time / iterations as u32);

    println!("\n=== iter_verticalities() ===");
    let start = Instant::now();
    let mut widest = 0usize;
    let mut count = 0usize;
    for v in tree.iter_verticalities(false) {
        widest = widest.max(v.degree_of_overlap());
        count += 1;
    }
    let walk_time = start.elapsed();
    println!("  {} verticalities: {:?}, widest {}", count, walk_time, widest);

    println!("\n=== split_at() ===");
    let start = Instant::now();
    let mut cut = 0usize;
    for p in points.iter().take(1000) {
        cut += tree.split_at(*p);
    }
    let split_time = start.elapsed();
    println!("  1000 splits: {:?}, {} items cut, len now {}", split_time, cut, tree.len());

    if let Err(err) = tree.validate() {
        println!("\nvalidation failed: {}", err);
    }
}
