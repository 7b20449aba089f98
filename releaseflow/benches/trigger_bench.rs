//! Benchmarks for trigger matching.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use releaseflow::trigger::{matches, TriggerRule};

fn trigger_benchmark(c: &mut Criterion) {
    let rule = TriggerRule::tags("v*").unwrap();
    let classed = TriggerRule::tags("v[0-9].[0-9]*.?").unwrap();

    c.bench_function("match_release_tag", |b| {
        b.iter(|| matches(black_box("refs/tags/v6.9.6"), &rule));
    });

    c.bench_function("reject_branch", |b| {
        b.iter(|| matches(black_box("refs/heads/main"), &rule));
    });

    c.bench_function("match_character_class", |b| {
        b.iter(|| classed.matches(black_box("refs/tags/v1.10.3")));
    });

    c.bench_function("compile_rule", |b| {
        b.iter(|| TriggerRule::tags(black_box("release-[!a-z]*")));
    });
}

criterion_group!(benches, trigger_benchmark);
criterion_main!(benches);
