//! End-to-end segmentation: a dark disk on a white background goes in,
//! its centroid and area come out.

mod common;

use common::disk_frame;
use videotracker::config::ParameterMap;
use videotracker::graph::{
    Graph, GraphBuilder, GraphDescription, ImageData, NoopTap, ParamValue, StageRegistry, Value,
};
use videotracker::run::{CsvSink, RunController, SinkBinding};
use videotracker::stages;

/// Radius^2 chosen so the disk's traced boundary encloses close to 500
/// pixels of area.
const DISK_R_SQUARED: f64 = 171.61;

fn segmentation_graph() -> Graph {
    let mut graph = GraphBuilder::new()
        .stage("input", Box::new(stages::VideoInput))
        .stage("gray", Box::new(stages::Grayscale))
        .stage("blur", Box::new(stages::GaussianBlur))
        .stage("threshold", Box::new(stages::AdaptiveThreshold))
        .stage("morph", Box::new(stages::Morphology))
        .stage("contours", Box::new(stages::ContourExtract))
        .stage("filter", Box::new(stages::SizeFilter))
        .stage("features", Box::new(stages::FeatureExtract))
        .stage("draw", Box::new(stages::DrawContours))
        .stage("view", Box::new(stages::ImageOutput))
        .stage("data", Box::new(stages::DataOutput))
        .connect("input", "frame", "gray", "image")
        .connect("gray", "image", "blur", "image")
        .connect("blur", "image", "threshold", "image")
        .connect("threshold", "image", "morph", "image")
        .connect("morph", "image", "contours", "image")
        .connect("contours", "contours", "filter", "contours")
        .connect("filter", "contours", "features", "contours")
        // The overlay draws on the original frame, not an intermediate.
        .connect("input", "frame", "draw", "image")
        .connect("filter", "contours", "draw", "contours")
        .connect("draw", "image", "view", "image")
        .connect("features", "records", "data", "records")
        .input_stage("input")
        .output_stage("view")
        .output_stage("data")
        .build()
        .unwrap();
    graph.set_parameter("blur", "size", ParamValue::Int(1)).unwrap();
    graph
        .set_parameter("morph", "operation", ParamValue::Str("close".into()))
        .unwrap();
    graph.set_parameter("morph", "ksize", ParamValue::Int(3)).unwrap();
    graph
        .set_parameter("filter", "minimum", ParamValue::Float(50.0))
        .unwrap();
    graph
}

fn extracted_records(graph: &Graph) -> Vec<videotracker::graph::FeatureRecord> {
    match graph.port_value("features", "records") {
        Some(Value::Records(records)) => records.clone(),
        other => panic!("expected records, got {other:?}"),
    }
}

#[test]
fn disk_centroid_and_area_are_recovered() {
    common::init_tracing();
    let mut graph = segmentation_graph();
    graph
        .feed_frame(disk_frame(100, 100, 50.0, 50.0, DISK_R_SQUARED), &mut NoopTap)
        .unwrap();

    let records = extracted_records(&graph);
    assert_eq!(records.len(), 1, "exactly one object: {records:?}");
    let r = &records[0];
    assert!((r.x - 50.0).abs() < 1.0, "centroid x {}", r.x);
    assert!((r.y - 50.0).abs() < 1.0, "centroid y {}", r.y);
    assert!(
        (r.area - 500.0).abs() < 25.0,
        "area {} outside 5% of 500",
        r.area
    );
}

#[test]
fn overlay_paints_the_boundary_on_the_original_frame() {
    let mut graph = segmentation_graph();
    graph
        .feed_frame(disk_frame(100, 100, 50.0, 50.0, DISK_R_SQUARED), &mut NoopTap)
        .unwrap();

    let Some(Value::Image(ImageData::Rgb(canvas))) = graph.port_value("view", "image") else {
        panic!("expected an RGB overlay");
    };
    // A red boundary pixel near the disk's left edge (x ~ 50 - 13).
    let near_edge = (35..=40).any(|x| (48..=52).any(|y| canvas.get_pixel(x, y).0 == [255, 0, 0]));
    assert!(near_edge, "no boundary pixel near the disk edge");
    // Disk interior keeps the original frame colour.
    assert_eq!(canvas.get_pixel(50, 50).0, [30, 30, 30]);
    // Background far from the disk stays white.
    assert_eq!(canvas.get_pixel(5, 5).0, [255, 255, 255]);
}

#[test]
fn identical_frames_produce_identical_records() {
    let mut graph = segmentation_graph();
    let frame = disk_frame(100, 100, 50.0, 50.0, DISK_R_SQUARED);
    graph.feed_frame(frame.clone(), &mut NoopTap).unwrap();
    let first = extracted_records(&graph);
    graph.feed_frame(frame, &mut NoopTap).unwrap();
    assert_eq!(extracted_records(&graph), first);
}

#[test]
fn moving_disk_is_tracked_across_a_batch_run() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("features.csv");
    let mut graph = segmentation_graph();
    let frames: Vec<ImageData> = (0..5)
        .map(|i| disk_frame(100, 100, 40.0 + 4.0 * f64::from(i), 50.0, DISK_R_SQUARED))
        .collect();
    let mut source = common::MockFrameSource::new(frames);
    let mut sinks = vec![SinkBinding::new(
        "data",
        "records",
        Box::new(CsvSink::new(&csv_path)),
    )];

    let report = RunController::new()
        .run(&mut graph, &mut source, &mut sinks)
        .unwrap();
    assert_eq!(report.frames_processed, 5);

    let contents = std::fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 6, "header plus one row per frame");
    for (i, line) in lines[1..].iter().enumerate() {
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields[1], i.to_string());
        let x: f64 = fields[2].parse().unwrap();
        assert!((x - (40.0 + 4.0 * i as f64)).abs() < 1.0, "frame {i}: x {x}");
    }
}

#[test]
fn saved_parameters_restore_into_a_fresh_graph() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("params.json");
    let graph = segmentation_graph();
    let saved = ParameterMap::capture(&graph);
    saved.save(&path)?;

    let loaded = ParameterMap::load(&path)?;
    assert_eq!(loaded, saved);
    let mut fresh = segmentation_graph();
    // Perturb, then restore from disk.
    fresh.set_parameter("threshold", "block_size", ParamValue::Int(21))?;
    loaded.apply(&mut fresh)?;
    assert_eq!(ParameterMap::capture(&fresh), saved);
    Ok(())
}

#[test]
fn stale_parameter_file_with_bad_values_is_rejected() {
    let json = r#"{"threshold": {"block_size": 4}}"#;
    let map = ParameterMap::from_json(json).unwrap();
    let mut graph = segmentation_graph();
    assert!(map.apply(&mut graph).is_err()); // 4 is not an odd block size
    // The graph keeps its previous value.
    assert_eq!(
        graph.parameter("threshold", "block_size"),
        Some(&ParamValue::Int(11))
    );
}

#[test]
fn rejected_parameter_file_leaves_no_partial_update() {
    // "blur" sorts before "threshold", so a naive single pass would store
    // the blur size before tripping over the bad block size.
    let json = r#"{"blur": {"size": 9}, "threshold": {"block_size": 4}}"#;
    let map = ParameterMap::from_json(json).unwrap();
    let mut graph = segmentation_graph();
    assert!(map.apply(&mut graph).is_err());
    assert_eq!(graph.parameter("blur", "size"), Some(&ParamValue::Int(1)));
    assert_eq!(
        graph.parameter("threshold", "block_size"),
        Some(&ParamValue::Int(11))
    );
}

#[test]
fn graph_description_round_trips_and_builds() {
    let description = GraphDescription::from_json(
        r#"{
            "stages": [
                {"type": "video_input", "name": "input"},
                {"type": "grayscale", "name": "gray"},
                {"type": "adaptive_threshold", "name": "threshold", "params": {"block_size": 15}},
                {"type": "contour_extract", "name": "contours"},
                {"type": "size_filter", "name": "filter", "params": {"minimum": 50.0}},
                {"type": "feature_extract", "name": "features"},
                {"type": "data_output", "name": "data"}
            ],
            "edges": [
                {"from": "input.frame", "to": "gray.image"},
                {"from": "gray.image", "to": "threshold.image"},
                {"from": "threshold.image", "to": "contours.image"},
                {"from": "contours.contours", "to": "filter.contours"},
                {"from": "filter.contours", "to": "features.contours"},
                {"from": "features.records", "to": "data.records"}
            ],
            "input": "input",
            "outputs": ["data"]
        }"#,
    )
    .unwrap();

    let reparsed = GraphDescription::from_json(&description.to_json().unwrap()).unwrap();
    assert_eq!(reparsed.stages.len(), description.stages.len());
    assert_eq!(reparsed.edges.len(), description.edges.len());

    let registry = StageRegistry::with_builtins();
    let mut graph = description.build(&registry).unwrap();
    assert_eq!(
        graph.parameter("threshold", "block_size"),
        Some(&ParamValue::Int(15))
    );
    graph
        .feed_frame(disk_frame(100, 100, 50.0, 50.0, DISK_R_SQUARED), &mut NoopTap)
        .unwrap();
    let records = extracted_records(&graph);
    assert_eq!(records.len(), 1);
}

#[test]
fn unknown_stage_type_is_reported_by_name() {
    let description = GraphDescription::from_json(
        r#"{
            "stages": [{"type": "sharpen", "name": "s"}],
            "edges": [],
            "input": "s",
            "outputs": ["s"]
        }"#,
    )
    .unwrap();
    let err = description.build(&StageRegistry::with_builtins()).unwrap_err();
    assert_eq!(err.to_string(), "unknown stage type 'sharpen'");
}
