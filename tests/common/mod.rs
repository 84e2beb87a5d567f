//! Shared fixtures: probe stages, scripted sources and recording sinks.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use image::{GrayImage, RgbImage};

use videotracker::error::{PipelineError, Result};
use videotracker::graph::{
    FeatureRecord, ImageData, Inputs, Outputs, ParamDecl, ParamSet, PortDecl, StageImpl, Value,
    ValueKind,
};
use videotracker::run::{FrameSource, Sink, SinkContext, StopHandle};

pub static IMG_IN: &[PortDecl] = &[PortDecl::new("image", ValueKind::Image)];
pub static IMG_OUT: &[PortDecl] = &[PortDecl::new("image", ValueKind::Image)];
pub static MERGE_IN: &[PortDecl] = &[
    PortDecl::new("left", ValueKind::Image),
    PortDecl::new("right", ValueKind::Image),
];
pub static REC_OUT: &[PortDecl] = &[PortDecl::new("records", ValueKind::Record)];

/// Everything the probes observe, in one ordered log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SourceRead(u64),
    SinkEnabled(&'static str),
    SinkWrite(&'static str, u64),
    SinkDisabled(&'static str),
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Routes engine logs into the test harness; safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Image pass-through that records its label each time it computes.
pub struct TraceStage {
    pub label: &'static str,
    pub log: Arc<Mutex<Vec<&'static str>>>,
}

impl StageImpl for TraceStage {
    fn type_name(&self) -> &'static str {
        "trace"
    }

    fn inputs(&self) -> &'static [PortDecl] {
        IMG_IN
    }

    fn outputs(&self) -> &'static [PortDecl] {
        IMG_OUT
    }

    fn compute(&self, _params: &ParamSet, inputs: &Inputs<'_>, outputs: &mut Outputs) -> Result<()> {
        self.log.lock().unwrap().push(self.label);
        let image = inputs.image("image")?;
        outputs.set("image", Value::Image(image.clone()))
    }
}

/// Two-input join that records its label; forwards the left image.
pub struct MergeStage {
    pub label: &'static str,
    pub log: Arc<Mutex<Vec<&'static str>>>,
}

impl StageImpl for MergeStage {
    fn type_name(&self) -> &'static str {
        "merge"
    }

    fn inputs(&self) -> &'static [PortDecl] {
        MERGE_IN
    }

    fn outputs(&self) -> &'static [PortDecl] {
        IMG_OUT
    }

    fn compute(&self, _params: &ParamSet, inputs: &Inputs<'_>, outputs: &mut Outputs) -> Result<()> {
        self.log.lock().unwrap().push(self.label);
        let left = inputs.image("left")?;
        inputs.image("right")?;
        outputs.set("image", Value::Image(left.clone()))
    }
}

static GATE_PARAMS: &[ParamDecl] = &[ParamDecl::bool("open", false)];

/// Pass-through that withholds its output while `open` is false, leaving
/// the downstream input port empty.
pub struct GateStage;

impl StageImpl for GateStage {
    fn type_name(&self) -> &'static str {
        "gate"
    }

    fn inputs(&self) -> &'static [PortDecl] {
        IMG_IN
    }

    fn outputs(&self) -> &'static [PortDecl] {
        IMG_OUT
    }

    fn params(&self) -> &'static [ParamDecl] {
        GATE_PARAMS
    }

    fn compute(&self, params: &ParamSet, inputs: &Inputs<'_>, outputs: &mut Outputs) -> Result<()> {
        if params.bool("open")? {
            let image = inputs.image("image")?;
            outputs.set("image", Value::Image(image.clone()))?;
        }
        Ok(())
    }
}

/// Pass-through that fails when the top-left pixel equals `trigger`.
pub struct FailOnValueStage {
    pub trigger: u8,
}

impl StageImpl for FailOnValueStage {
    fn type_name(&self) -> &'static str {
        "fail_on_value"
    }

    fn inputs(&self) -> &'static [PortDecl] {
        IMG_IN
    }

    fn outputs(&self) -> &'static [PortDecl] {
        IMG_OUT
    }

    fn compute(&self, _params: &ParamSet, inputs: &Inputs<'_>, outputs: &mut Outputs) -> Result<()> {
        let image = inputs.image("image")?;
        let marker = match image {
            ImageData::Gray(img) => img.get_pixel(0, 0).0[0],
            ImageData::Rgb(img) => img.get_pixel(0, 0).0[0],
        };
        if marker == self.trigger {
            return Err(PipelineError::Compute {
                stage: String::new(),
                message: format!("trigger value {marker} reached"),
            });
        }
        outputs.set("image", Value::Image(image.clone()))
    }
}

/// Produces one record per frame, tagged with the top-left pixel value.
pub struct ConstRecordsStage;

impl StageImpl for ConstRecordsStage {
    fn type_name(&self) -> &'static str {
        "const_records"
    }

    fn inputs(&self) -> &'static [PortDecl] {
        IMG_IN
    }

    fn outputs(&self) -> &'static [PortDecl] {
        REC_OUT
    }

    fn compute(&self, _params: &ParamSet, inputs: &Inputs<'_>, outputs: &mut Outputs) -> Result<()> {
        let marker = match inputs.image("image")? {
            ImageData::Gray(img) => img.get_pixel(0, 0).0[0],
            ImageData::Rgb(img) => img.get_pixel(0, 0).0[0],
        };
        let record = FeatureRecord {
            x: f64::from(marker),
            y: 0.0,
            area: 1.0,
        };
        outputs.set("records", Value::Records(vec![record]))
    }
}

/// In-memory frame source with optional read logging and an optional
/// self-triggered stop request at a given frame index.
pub struct MockFrameSource {
    frames: Vec<ImageData>,
    index: u64,
    pub log: Option<EventLog>,
    pub stop_at: Option<(StopHandle, u64)>,
}

impl MockFrameSource {
    pub fn new(frames: Vec<ImageData>) -> Self {
        Self {
            frames,
            index: 0,
            log: None,
            stop_at: None,
        }
    }

    /// `count` uniform grayscale frames.
    pub fn uniform(count: usize, value: u8) -> Self {
        Self::new(vec![gray_frame(16, 16, value); count])
    }
}

impl FrameSource for MockFrameSource {
    fn next_frame(&mut self) -> Result<Option<ImageData>> {
        if let Some((handle, at)) = &self.stop_at {
            if self.index == *at {
                handle.stop();
            }
        }
        let Some(frame) = self.frames.get(self.index as usize) else {
            return Ok(None);
        };
        if let Some(log) = &self.log {
            log.lock().unwrap().push(Event::SourceRead(self.index));
        }
        self.index += 1;
        Ok(Some(frame.clone()))
    }

    fn reset(&mut self) -> Result<()> {
        self.index = 0;
        Ok(())
    }

    fn seek(&mut self, index: u64) -> Result<()> {
        self.index = index;
        Ok(())
    }

    fn current_index(&self) -> u64 {
        self.index
    }

    fn frame_count(&self) -> Option<u64> {
        Some(self.frames.len() as u64)
    }

    fn frame_rate(&self) -> f64 {
        25.0
    }

    fn resolution(&self) -> (u32, u32) {
        self.frames
            .first()
            .map(|f| f.dimensions())
            .unwrap_or((0, 0))
    }
}

/// Source that hands out frames only when the test side permits one.
pub struct PacedSource {
    inner: MockFrameSource,
    pub permit: crossbeam_channel::Receiver<()>,
}

impl PacedSource {
    pub fn new(inner: MockFrameSource, permit: crossbeam_channel::Receiver<()>) -> Self {
        Self { inner, permit }
    }
}

impl FrameSource for PacedSource {
    fn next_frame(&mut self) -> Result<Option<ImageData>> {
        if self.permit.recv().is_err() {
            return Ok(None);
        }
        self.inner.next_frame()
    }

    fn reset(&mut self) -> Result<()> {
        self.inner.reset()
    }

    fn seek(&mut self, index: u64) -> Result<()> {
        self.inner.seek(index)
    }

    fn current_index(&self) -> u64 {
        self.inner.current_index()
    }

    fn frame_count(&self) -> Option<u64> {
        self.inner.frame_count()
    }

    fn frame_rate(&self) -> f64 {
        self.inner.frame_rate()
    }

    fn resolution(&self) -> (u32, u32) {
        self.inner.resolution()
    }
}

/// Sink that appends lifecycle events to the shared log.
pub struct RecordingSink {
    pub name: &'static str,
    pub log: EventLog,
    pub fail_enable: bool,
    pub fail_disable: bool,
}

impl RecordingSink {
    pub fn new(name: &'static str, log: EventLog) -> Self {
        Self {
            name,
            log,
            fail_enable: false,
            fail_disable: false,
        }
    }
}

impl Sink for RecordingSink {
    fn name(&self) -> &str {
        self.name
    }

    fn enable(&mut self, _ctx: &SinkContext) -> Result<()> {
        if self.fail_enable {
            return Err(PipelineError::Sink {
                sink: self.name.to_string(),
                frame: 0,
                message: "enable forced to fail".to_string(),
            });
        }
        self.log.lock().unwrap().push(Event::SinkEnabled(self.name));
        Ok(())
    }

    fn write(&mut self, frame: u64, _value: &Value) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(Event::SinkWrite(self.name, frame));
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        if self.fail_disable {
            return Err(PipelineError::Sink {
                sink: self.name.to_string(),
                frame: 0,
                message: "disable forced to fail".to_string(),
            });
        }
        self.log
            .lock()
            .unwrap()
            .push(Event::SinkDisabled(self.name));
        Ok(())
    }
}

// ── Frame builders ──

pub fn gray_frame(w: u32, h: u32, value: u8) -> ImageData {
    ImageData::Gray(GrayImage::from_pixel(w, h, image::Luma([value])))
}

pub fn rgb_frame(w: u32, h: u32, rgb: [u8; 3]) -> ImageData {
    ImageData::Rgb(RgbImage::from_pixel(w, h, image::Rgb(rgb)))
}

/// A dark disk on a white background, the shape the segmentation pipeline
/// is meant to find. `r_squared` keeps the radius sub-pixel precise.
pub fn disk_frame(w: u32, h: u32, cx: f64, cy: f64, r_squared: f64) -> ImageData {
    let mut img = RgbImage::from_pixel(w, h, image::Rgb([255, 255, 255]));
    for y in 0..h {
        for x in 0..w {
            let (dx, dy) = (f64::from(x) - cx, f64::from(y) - cy);
            if dx * dx + dy * dy <= r_squared {
                img.put_pixel(x, y, image::Rgb([30, 30, 30]));
            }
        }
    }
    ImageData::Rgb(img)
}
