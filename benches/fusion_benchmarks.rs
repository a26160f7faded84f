use criterion::{Criterion, black_box, criterion_group, criterion_main};
use fusion_compass::orientation::{quaternion_from_xyzw, quaternion_to_euler};
use fusion_compass::{
    CircularFilter, FusionSettings, GeoPoint, HeadingFusion, SmoothingSettings, SourceProbe,
    geodesy,
};
use std::f64::consts::PI;

// Deterministic heading sweep standing in for a hand-held device slowly
// panning with sensor jitter on top.
fn heading_sweep(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| {
            let t = i as f64 * 0.016;
            let pan = 120.0 * (t * 0.2 * 2.0 * PI).sin();
            let jitter = 2.5 * (t * 11.0).sin();
            geodesy::normalize_deg(180.0 + pan + jitter)
        })
        .collect()
}

fn bench_circular_filter(c: &mut Criterion) {
    let headings = heading_sweep(1024);

    c.bench_function("circular_filter_smooth", |b| {
        let mut filter = CircularFilter::new(SmoothingSettings::default()).unwrap();
        let mut index = 0;
        b.iter(|| {
            let heading = headings[index % headings.len()];
            index += 1;
            black_box(filter.smooth(black_box(heading)))
        });
    });
}

fn bench_quaternion_decode(c: &mut Criterion) {
    let q = quaternion_from_xyzw([0.1, 0.2, 0.3, 0.927]);

    c.bench_function("quaternion_to_euler", |b| {
        b.iter(|| black_box(quaternion_to_euler(black_box(&q))));
    });
}

fn bench_geodesy(c: &mut Criterion) {
    let paris = GeoPoint::new(48.8566, 2.3522);
    let london = GeoPoint::new(51.5074, -0.1278);

    c.bench_function("local_offset_meters", |b| {
        b.iter(|| {
            black_box(geodesy::local_offset_meters(
                black_box(paris),
                35.0,
                black_box(london),
                11.0,
            ))
        });
    });
}

fn bench_full_reading_path(c: &mut Criterion) {
    c.bench_function("fusion_quaternion_reading", |b| {
        let mut fusion = HeadingFusion::new(FusionSettings::default());
        fusion.start(SourceProbe {
            absolute_orientation: true,
            ..Default::default()
        });
        let q = quaternion_from_xyzw([0.0, 0.0, 0.383, 0.924]);
        let mut timestamp = 0.0;
        b.iter(|| {
            timestamp += 16.0;
            fusion.on_quaternion_reading(black_box(q), timestamp);
            black_box(fusion.current_sample())
        });
    });
}

criterion_group!(
    benches,
    bench_circular_filter,
    bench_quaternion_decode,
    bench_geodesy,
    bench_full_reading_path
);
criterion_main!(benches);
