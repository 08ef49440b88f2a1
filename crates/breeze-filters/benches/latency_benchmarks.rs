//! Latency benchmarks for the detection stack
//!
//! Run with: cargo bench -p breeze-filters

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio::runtime::Runtime;

use breeze_filters::{DetectionService, LayerToggles, Tokenizer};
use breeze_core::LayerId;

const MESSAGES: &[(&str, &str)] = &[
    ("short_clean", "hello everyone, good game!"),
    ("short_profane", "you are an a$$hole"),
    ("spaced_out", "what the f.u.c.k is this"),
    (
        "long_mixed",
        "ok so I was mining diamonds and then this absolute b1tch of a creeper blew up my whole base, what the hell",
    ),
];

/// Benchmark the tokenizer on its own
fn benchmark_tokenizer(c: &mut Criterion) {
    let tokenizer = Tokenizer::new().expect("Failed to create tokenizer");

    let mut group = c.benchmark_group("Tokenizer");
    for (name, text) in MESSAGES {
        group.bench_with_input(BenchmarkId::new("tokenize", name), text, |b, text| {
            b.iter(|| tokenizer.tokenize(black_box(text)));
        });
    }
    group.finish();
}

/// Benchmark the full layer stack
fn benchmark_check_and_censor(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let service = DetectionService::builtin().expect("Failed to create detection service");

    let mut group = c.benchmark_group("Detection_Service");
    group.sample_size(100);
    for (name, text) in MESSAGES {
        group.bench_with_input(BenchmarkId::new("all_layers", name), text, |b, text| {
            b.iter(|| rt.block_on(async { service.check_and_censor(black_box(text), None).await }));
        });
    }
    group.finish();
}

/// Benchmark each layer alone to compare their cost
fn benchmark_single_layers(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let service = DetectionService::builtin().expect("Failed to create detection service");
    let text = MESSAGES[3].1;

    let mut group = c.benchmark_group("Single_Layer");
    for layer in [LayerId::Statistical, LayerId::Extralist, LayerId::Longlist] {
        let toggles: LayerToggles = LayerId::ALL.iter().map(|id| (*id, *id == layer)).collect();
        group.bench_function(layer.as_str(), |b| {
            b.iter(|| rt.block_on(async { service.check_and_censor(black_box(text), Some(&toggles)).await }));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_tokenizer,
    benchmark_check_and_censor,
    benchmark_single_layers
);
criterion_main!(benches);
