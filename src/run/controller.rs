//! Batch run controller.
//!
//! Drives a whole source through a graph synchronously: read a frame, feed
//! it, let sinks persist the designated outputs, then read the next frame.
//! Frame N's sink writes complete before frame N+1 is requested, so run
//! output is deterministic for a given source and parameter set.
//!
//! Exclusivity between batch runs and interactive edits falls out of the
//! borrow rules: `run` holds `&mut Graph` for its full duration, so no
//! parameter assignment can interleave with a run on the same graph.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::graph::{FeatureRecord, Graph, OutputTap, Value};

use super::sink::{SinkBinding, SinkContext};
use super::source::FrameSource;

/// Lifecycle of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Stopped,
    Errored,
}

/// How a successful `run` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The source was exhausted.
    Completed,
    /// A stop request was honoured at a frame boundary.
    Stopped,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub frames_processed: u64,
}

/// Cloneable handle for requesting a cooperative stop. The request is
/// honoured at the next frame boundary; the frame in flight finishes,
/// including its sink writes.
#[derive(Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress notifications from a spawned run.
#[derive(Debug, Clone, Copy)]
pub enum RunEvent {
    /// One frame fully processed and persisted. `total` repeats the
    /// source's best-effort frame count.
    Frame { current: u64, total: Option<u64> },
    /// The run reached a terminal state.
    Finished(RunState),
}

/// Routes designated-output writes to the bound sinks during propagation.
struct SinkTap<'a> {
    sinks: &'a mut [SinkBinding],
    frame: u64,
}

impl OutputTap for SinkTap<'_> {
    fn on_output(&mut self, stage: &str, port: &str, value: &Value) -> Result<()> {
        for binding in self.sinks.iter_mut() {
            if binding.stage == stage && binding.port == port {
                binding.sink.write(self.frame, value)?;
            }
        }
        Ok(())
    }
}

/// Synchronous batch runner over a graph, a frame source and sinks.
#[derive(Clone)]
pub struct RunController {
    stop: Arc<AtomicBool>,
    frames_done: Arc<AtomicU64>,
    state: Arc<Mutex<RunState>>,
}

impl RunController {
    pub fn new() -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            frames_done: Arc::new(AtomicU64::new(0)),
            state: Arc::new(Mutex::new(RunState::Idle)),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.stop))
    }

    /// Frames fully processed by the current or most recent run.
    pub fn frames_done(&self) -> u64 {
        self.frames_done.load(Ordering::SeqCst)
    }

    /// State of the current or most recent run.
    pub fn state(&self) -> RunState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: RunState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Runs the whole source through the graph. Blocks until the source is
    /// exhausted, a stop request lands, or an error aborts the run.
    ///
    /// Sinks are enabled in binding order before the first frame and
    /// disabled in reverse order on every exit path. On an error,
    /// already-persisted frames remain on disk.
    pub fn run(
        &self,
        graph: &mut Graph,
        source: &mut dyn FrameSource,
        sinks: &mut [SinkBinding],
    ) -> Result<RunReport> {
        self.run_inner(graph, source, sinks, None)
    }

    /// Moves the graph onto a worker thread and runs there, reporting
    /// progress over a channel. The graph comes back through
    /// [`RunHandle::join`].
    pub fn spawn(
        &self,
        mut graph: Graph,
        mut source: Box<dyn FrameSource>,
        mut sinks: Vec<SinkBinding>,
    ) -> RunHandle {
        let controller = self.clone();
        let (tx, rx) = crossbeam_channel::unbounded();
        let join = std::thread::spawn(move || {
            let result = controller.run_inner(&mut graph, source.as_mut(), &mut sinks, Some(&tx));
            let _ = tx.send(RunEvent::Finished(controller.state()));
            (graph, result)
        });
        RunHandle {
            stop: self.stop_handle(),
            events: rx,
            join,
        }
    }

    fn run_inner(
        &self,
        graph: &mut Graph,
        source: &mut dyn FrameSource,
        sinks: &mut [SinkBinding],
        events: Option<&Sender<RunEvent>>,
    ) -> Result<RunReport> {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state == RunState::Running {
                return Err(PipelineError::NotIdle);
            }
            *state = RunState::Running;
        }
        self.stop.store(false, Ordering::SeqCst);
        self.frames_done.store(0, Ordering::SeqCst);

        // Every binding must target a designated output stage, or its sink
        // would silently never receive a frame.
        for binding in sinks.iter() {
            if !graph.output_stage_names().any(|n| n == binding.stage) {
                self.set_state(RunState::Errored);
                return Err(PipelineError::InvalidConnection(format!(
                    "sink '{}' bound to '{}', which is not an output stage",
                    binding.sink.name(),
                    binding.stage
                )));
            }
        }

        let ctx = SinkContext {
            resolution: source.resolution(),
            frame_rate: source.frame_rate(),
            codec_tag: source.codec_tag(),
            fields: FeatureRecord::FIELDS,
        };
        for i in 0..sinks.len() {
            if let Err(e) = sinks[i].sink.enable(&ctx) {
                // Roll back the sinks that did open, newest first.
                disable_reverse(&mut sinks[..i]);
                self.set_state(RunState::Errored);
                return Err(e);
            }
        }

        if let Err(e) = source.reset() {
            disable_reverse(sinks);
            self.set_state(RunState::Errored);
            return Err(e);
        }

        info!(frames = ?source.frame_count(), "run started");
        let mut frames = 0u64;
        let outcome = loop {
            if self.stop.load(Ordering::SeqCst) {
                info!(frames, "stop request honoured");
                break RunOutcome::Stopped;
            }
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break RunOutcome::Completed,
                Err(e) => {
                    disable_reverse(sinks);
                    self.set_state(RunState::Errored);
                    return Err(e);
                }
            };
            let mut tap = SinkTap {
                sinks: &mut *sinks,
                frame: frames,
            };
            if let Err(e) = graph.feed_frame(frame, &mut tap) {
                disable_reverse(sinks);
                self.set_state(RunState::Errored);
                return Err(e);
            }
            frames += 1;
            self.frames_done.store(frames, Ordering::SeqCst);
            if let Some(tx) = events {
                let _ = tx.send(RunEvent::Frame {
                    current: frames - 1,
                    total: source.frame_count(),
                });
            }
        };

        // A failing sink must not leave earlier-enabled sinks open and
        // unflushed; close them all, then report the first failure.
        let mut disable_err = None;
        for binding in sinks.iter_mut().rev() {
            if let Err(e) = binding.sink.disable() {
                warn!(sink = binding.sink.name(), error = %e, "sink disable failed");
                disable_err.get_or_insert(e);
            }
        }
        if let Some(e) = disable_err {
            self.set_state(RunState::Errored);
            return Err(e);
        }

        self.set_state(match outcome {
            RunOutcome::Completed => RunState::Completed,
            RunOutcome::Stopped => RunState::Stopped,
        });
        info!(frames, ?outcome, "run finished");
        Ok(RunReport {
            outcome,
            frames_processed: frames,
        })
    }
}

impl Default for RunController {
    fn default() -> Self {
        Self::new()
    }
}

/// Best-effort reverse-order disable used on abort paths; the original
/// error stays the one reported.
fn disable_reverse(sinks: &mut [SinkBinding]) {
    for binding in sinks.iter_mut().rev() {
        if let Err(e) = binding.sink.disable() {
            warn!(sink = binding.sink.name(), error = %e, "sink disable failed during abort");
        }
    }
}

/// A run executing on a worker thread.
pub struct RunHandle {
    pub stop: StopHandle,
    pub events: Receiver<RunEvent>,
    join: JoinHandle<(Graph, Result<RunReport>)>,
}

impl RunHandle {
    /// Waits for the run to end and returns the graph together with the
    /// run result.
    ///
    /// # Panics
    /// Panics if the run thread itself panicked.
    pub fn join(self) -> (Graph, Result<RunReport>) {
        self.join.join().expect("run thread panicked")
    }
}
