//! Benchmarks for slug resolution and artifact naming.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use podflow::config::PodcastConfig;
use podflow::context::RunContext;
use podflow::core::ArtifactKind;
use podflow::naming::ArtifactNamer;
use podflow::pipeline::StageGraph;
use podflow::slug;

fn slug_benchmark(c: &mut Criterion) {
    c.bench_function("slug_resolve_accented", |b| {
        b.iter(|| slug::resolve(black_box("¿Qué pasó antes del Big Bang? Él y la teoría de cuerdas")))
    });
    c.bench_function("slug_resolve_ascii", |b| b.iter(|| slug::resolve(black_box("El Universo"))));
}

fn naming_benchmark(c: &mut Criterion) {
    let Ok(slug) = slug::resolve("El Universo") else {
        return;
    };
    let namer = ArtifactNamer::new("outputs", slug);

    c.bench_function("namer_all_paths", |b| b.iter(|| black_box(&namer).all()));
    c.bench_function("namer_video_path", |b| {
        b.iter(|| black_box(&namer).path_for(ArtifactKind::Video))
    });
}

fn graph_benchmark(c: &mut Criterion) {
    let Ok(ctx) = RunContext::resolve(&PodcastConfig::default()) else {
        return;
    };
    c.bench_function("podcast_graph_build", |b| b.iter(|| StageGraph::podcast(black_box(&ctx))));
}

criterion_group!(benches, slug_benchmark, naming_benchmark, graph_benchmark);
criterion_main!(benches);
