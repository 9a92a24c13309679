use criterion::{black_box, criterion_group, criterion_main, Criterion};
use qoaf::Descriptor;
use std::time::Duration;

fn sine(freq: f64, samplerate: u32, seconds: f64) -> Vec<i16> {
    let n = (samplerate as f64 * seconds) as usize;
    (0..n)
        .map(|i| {
            let t = i as f64 / samplerate as f64;
            (f64::sin(t * freq * std::f64::consts::TAU) * 16000.0) as i16
        })
        .collect()
}

fn bench_encode(c: &mut Criterion) {
    let samples = sine(440.0, 44100, 5.0);
    let mut group = c.benchmark_group("encode");
    group.sample_size(20).measurement_time(Duration::new(10, 0));
    group.bench_function("mono_5s_44100", |b| {
        b.iter(|| {
            let mut desc = Descriptor::new(1, 44100, samples.len() as u32);
            qoaf::encode(black_box(&samples), &mut desc)
        })
    });
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let samples = sine(440.0, 44100, 5.0);
    let mut desc = Descriptor::new(1, 44100, samples.len() as u32);
    let encoded = qoaf::encode(&samples, &mut desc).expect("valid descriptor");

    let mut group = c.benchmark_group("decode");
    group.sample_size(20).measurement_time(Duration::new(10, 0));
    group.bench_function("mono_5s_44100", |b| {
        b.iter(|| qoaf::decode(black_box(&encoded)))
    });
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
