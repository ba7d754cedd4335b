//! DSP Benchmarks
//!
//! Per-sample and per-block cost of the signal chain.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fuzzbox::analysis::sine_wave;
use fuzzbox::dsp::{DistortionStage, EffectChain, LowPassFilter};

fn benchmark_stages(c: &mut Criterion) {
    let input = sine_wave(440.0, 0.5, 1.0, 44100.0);

    let fuzz = DistortionStage::new(15.0, 0.4);
    c.bench_function("fuzz_1s_mono", |b| {
        b.iter(|| {
            let mut acc = 0.0_f32;
            for &x in &input {
                acc += fuzz.process(black_box(x));
            }
            acc
        })
    });

    let mut filter = LowPassFilter::lowpass(44100.0, 5000.0).unwrap();
    c.bench_function("lowpass_1s_mono", |b| {
        b.iter(|| {
            let mut acc = 0.0_f32;
            for &x in &input {
                acc += filter.process(black_box(x));
            }
            acc
        })
    });
}

fn benchmark_chain(c: &mut Criterion) {
    let input = sine_wave(440.0, 0.5, 1.0, 44100.0);
    let mut buffer = input.clone();

    let mut chain = EffectChain::new(44100.0).unwrap();
    let _controller = chain.controller();

    c.bench_function("chain_1s_blocks_256", |b| {
        b.iter(|| {
            buffer.copy_from_slice(&input);
            for block in buffer.chunks_mut(256) {
                chain.process_block(black_box(block));
            }
        })
    });
}

criterion_group!(benches, benchmark_stages, benchmark_chain);
criterion_main!(benches);
