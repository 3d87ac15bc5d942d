//! Benchmarks for pixel cursors

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tessella_core::image::{TileLayout, TiledImage};
use tessella_core::iterator::{PixelIterator, ReadCursor, WritablePixelIterator, WriteCursor};
use tessella_core::raster::{Interleave, SampleType};

fn create_image(size: usize, interleave: Interleave) -> TiledImage {
    let layout = TileLayout::new(size, size, 3, SampleType::F32)
        .with_tile_size(256, 256)
        .with_interleave(interleave);
    let mut image = TiledImage::new(layout).unwrap();
    let mut writer = WritablePixelIterator::new(&mut image).unwrap();
    while writer.next().unwrap() {
        let v = ((writer.x() * 7 + writer.y() * 13) % 200) as f32;
        writer.set_sample_f32(v).unwrap();
    }
    drop(writer);
    image
}

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("iteration/read");
    for interleave in [Interleave::Pixel, Interleave::Band] {
        for size in [256, 1024] {
            let image = create_image(size, interleave);
            let id = BenchmarkId::new(format!("{:?}", interleave), size);
            group.bench_with_input(id, &size, |b, _| {
                b.iter(|| {
                    let mut cursor = PixelIterator::new(black_box(&image)).unwrap();
                    let mut sum = 0.0;
                    while cursor.next().unwrap() {
                        sum += cursor.sample_f64().unwrap();
                    }
                    sum
                })
            });
        }
    }
    group.finish();
}

fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("iteration/write");
    for size in [256, 1024] {
        let mut image = create_image(size, Interleave::Pixel);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut cursor = WritablePixelIterator::new(&mut image).unwrap();
                while cursor.next().unwrap() {
                    cursor.set_sample_f64(black_box(1.5)).unwrap();
                }
                cursor.close().unwrap();
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_read, bench_write);
criterion_main!(benches);
