//! Criterion benchmarks for splitter rendering.
//!
//! Measures routing overhead per topology with gain stages only, so the cost
//! is the splitter's copying, summing and filtering rather than module DSP.
//!
//! Run with: `cargo bench -p braid-graph`
#![allow(missing_docs)]

use braid_core::{AudioBuffer, ProcessSetup};
use braid_graph::{ModulationSourceSet, ProcessContext, SplitType, Splitter};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZES: &[usize] = &[64, 256, 1024];

fn generate_test_signal(size: usize) -> AudioBuffer {
    let left: Vec<f32> = (0..size)
        .map(|i| (std::f32::consts::TAU * 440.0 * i as f32 / SAMPLE_RATE).sin() * 0.5)
        .collect();
    let right = left.iter().map(|s| s * 0.8).collect();
    AudioBuffer::from_channels(vec![left, right])
}

fn make_splitter(split_type: SplitType, num_chains: usize, block_size: usize) -> Splitter {
    let mut splitter = Splitter::new(split_type, ProcessSetup::new(SAMPLE_RATE, block_size, 2));
    while splitter.num_chains() < num_chains && splitter.add_chain() {}
    for chain in 0..splitter.num_chains() {
        for pos in 0..4 {
            splitter.insert_gain_stage(chain, pos);
            splitter.set_gain_linear(chain, pos, 0.9);
        }
    }
    splitter
}

fn bench_topologies(c: &mut Criterion) {
    let mut group = c.benchmark_group("splitter/process");
    let sources = ModulationSourceSet::new(SAMPLE_RATE);

    for &block_size in BLOCK_SIZES {
        let input = generate_test_signal(block_size);
        for split_type in SplitType::ALL {
            let mut splitter = make_splitter(split_type, 4, block_size);
            let mut buffer = input.clone();
            group.bench_with_input(
                BenchmarkId::new(split_type.as_str(), block_size),
                &block_size,
                |b, _| {
                    b.iter(|| {
                        buffer.copy_from(black_box(&input));
                        let mut ctx = ProcessContext::new(&sources, None);
                        splitter.process(&mut buffer, &mut ctx);
                        black_box(&buffer);
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_latency_recompute(c: &mut Criterion) {
    let mut splitter = make_splitter(SplitType::Parallel, 8, 256);
    c.bench_function("splitter/recalculate_latency", |b| {
        b.iter(|| black_box(splitter.recalculate_latency()));
    });
}

criterion_group!(benches, bench_topologies, bench_latency_recompute);
criterion_main!(benches);
