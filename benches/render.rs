//! Benchmarks for snapshot loading and frame rendering.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use automata_render::{
    compute::map_intensities,
    render::{Overlay, TITLE, VideoComposer},
    schema::COLOR_SCHEMES,
    snapshot::{FrameLoader, FrameSequence, Snapshot, discover_snapshots},
};

fn snapshot(size: usize, generation: usize) -> Snapshot {
    let cells = (0..size * size)
        .map(|i| ((i * 31 + generation * 17) % 5) as u8)
        .collect();
    // Dimensions are non-zero and match the cell count.
    Snapshot::new(size, size, cells).unwrap()
}

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load");
    group.sample_size(20);

    for size in [64, 256] {
        let dir = tempfile::tempdir().unwrap();
        for g in 0..200 {
            let path = dir.path().join(format!("gen_{:06}.bin", g));
            std::fs::write(path, snapshot(size, g).to_bytes()).unwrap();
        }
        let paths = discover_snapshots(dir.path()).unwrap();
        let loader = FrameLoader::new();

        group.bench_with_input(
            BenchmarkId::new("parallel", format!("{}x{}", size, size)),
            &size,
            |b, _| b.iter(|| loader.load(black_box(&paths)).unwrap()),
        );
        group.bench_with_input(
            BenchmarkId::new("sequential", format!("{}x{}", size, size)),
            &size,
            |b, _| b.iter(|| loader.load_sequential(black_box(&paths)).unwrap()),
        );
    }

    group.finish();
}

fn bench_intensity(c: &mut Criterion) {
    let mut group = c.benchmark_group("intensity");

    for size in [128, 512] {
        let frames = FrameSequence::new((0..50).map(|g| snapshot(size, g)).collect()).unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", size, size)),
            &size,
            |b, _| b.iter(|| map_intensities(black_box(&frames))),
        );
    }

    group.finish();
}

fn bench_render_frame(c: &mut Criterion) {
    let overlay = Overlay {
        title: TITLE.into(),
        date_label: "01 January 2025".into(),
        activity: "12.34%".into(),
    };
    let composer = VideoComposer::new(700, 700, COLOR_SCHEMES[0], overlay);
    let grid: Vec<f32> = (0..256 * 256).map(|i| (i % 7) as f32 / 6.0).collect();

    c.bench_function("render_frame_700x700", |b| {
        b.iter(|| composer.render_frame(black_box(42), &grid, 256, 256, 1234))
    });
}

criterion_group!(benches, bench_load, bench_intensity, bench_render_frame);
criterion_main!(benches);
