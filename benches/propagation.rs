//! Propagation throughput over representative graphs.

use criterion::{criterion_group, criterion_main, Criterion};
use image::RgbImage;

use videotracker::graph::{Graph, GraphBuilder, ImageData, NoopTap, ParamValue};
use videotracker::stages;

fn segmentation_graph() -> Graph {
    let mut graph = GraphBuilder::new()
        .stage("input", Box::new(stages::VideoInput))
        .stage("gray", Box::new(stages::Grayscale))
        .stage("blur", Box::new(stages::GaussianBlur))
        .stage("threshold", Box::new(stages::AdaptiveThreshold))
        .stage("contours", Box::new(stages::ContourExtract))
        .stage("filter", Box::new(stages::SizeFilter))
        .stage("features", Box::new(stages::FeatureExtract))
        .stage("data", Box::new(stages::DataOutput))
        .connect("input", "frame", "gray", "image")
        .connect("gray", "image", "blur", "image")
        .connect("blur", "image", "threshold", "image")
        .connect("threshold", "image", "contours", "image")
        .connect("contours", "contours", "filter", "contours")
        .connect("filter", "contours", "features", "contours")
        .connect("features", "records", "data", "records")
        .input_stage("input")
        .output_stage("data")
        .build()
        .unwrap();
    graph
        .set_parameter("filter", "minimum", ParamValue::Float(10.0))
        .unwrap();
    graph
}

fn disk_frame(size: u32) -> ImageData {
    let mut img = RgbImage::from_pixel(size, size, image::Rgb([255, 255, 255]));
    let centre = f64::from(size) / 2.0;
    let radius = f64::from(size) / 6.0;
    for y in 0..size {
        for x in 0..size {
            let (dx, dy) = (f64::from(x) - centre, f64::from(y) - centre);
            if dx * dx + dy * dy <= radius * radius {
                img.put_pixel(x, y, image::Rgb([30, 30, 30]));
            }
        }
    }
    ImageData::Rgb(img)
}

fn bench_feed_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("feed_frame");
    for size in [64u32, 128, 256] {
        let mut graph = segmentation_graph();
        let frame = disk_frame(size);
        group.bench_function(format!("segmentation_{size}px"), |b| {
            b.iter(|| {
                graph.feed_frame(frame.clone(), &mut NoopTap).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_parameter_recompute(c: &mut Criterion) {
    let mut graph = segmentation_graph();
    graph.feed_frame(disk_frame(128), &mut NoopTap).unwrap();
    let mut block = 11;
    c.bench_function("threshold_parameter_change_128px", |b| {
        b.iter(|| {
            block = if block == 11 { 13 } else { 11 };
            graph
                .set_parameter("threshold", "block_size", ParamValue::Int(block))
                .unwrap();
        });
    });
}

criterion_group!(benches, bench_feed_frame, bench_parameter_recompute);
criterion_main!(benches);
