use clms_clipper::processing::select_window;
use clms_clipper::processing::ClipRequest;
use clms_clipper::utils::quantize::{quantize, sample_indices, Quantization};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Benchmark byte scaling of one quicklook-sized strip
fn benchmark_quantize(c: &mut Criterion) {
    // Synthetic LAI-like values with a sprinkling of fill
    let data: Vec<f64> = (0..1344 * 1344)
        .map(|i| if i % 97 == 0 { 255.0 } else { (i % 251) as f64 })
        .collect();

    let q = Quantization {
        src_min: 0.0,
        src_max: 250.0,
        src_nodata: Some(255.0),
        dst_min: 0,
        dst_max: 210,
        dst_nodata: 255,
        mask_out_of_range: false,
    };

    c.bench_function("quantize_1344x1344", |b| b.iter(|| quantize(black_box(&data), black_box(&q))));
}

/// Benchmark window selection on full-resolution global axes
fn benchmark_window(c: &mut Criterion) {
    let step = 1.0 / 336.0;
    let lat: Vec<f64> = (0..47040).map(|i| 80.0 - step * (i as f64 + 0.5)).collect();
    let lon: Vec<f64> = (0..120960).map(|i| -180.0 + step * (i as f64 + 0.5)).collect();
    let request = ClipRequest::Origin { lat: 20.001488095238095, lon: -110.001488095238102, width: 26880, height: 26880 };

    c.bench_function("select_window_global", |b| {
        b.iter(|| select_window(black_box(&lat), black_box(&lon), black_box(&request)))
    });

    c.bench_function("sample_indices_5pct", |b| b.iter(|| sample_indices(black_box(26880), black_box(1344))));
}

criterion_group!(benches, benchmark_quantize, benchmark_window);
criterion_main!(benches);
