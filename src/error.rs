//! Error handling for the pipeline engine.
//!
//! One `thiserror` taxonomy covers the three failure classes the engine
//! distinguishes: construction errors (always fatal at build/assignment
//! time), computation errors (recoverable in interactive mode, fatal in a
//! batch run), and resource errors (fatal to the run that triggered them,
//! carrying the sink/source and frame index for diagnosis).

use crate::graph::ValueKind;
use thiserror::Error;

/// Main error type for pipeline operations.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The stage graph contains a dependency cycle. Carries the cycle as an
    /// ordered list of stage names.
    #[error("cyclic graph: {}", cycle.join(" -> "))]
    CyclicGraph { cycle: Vec<String> },

    /// A connection references a missing stage/port, rebinds an already
    /// connected consumer, or otherwise cannot be wired.
    #[error("invalid connection: {0}")]
    InvalidConnection(String),

    /// A value of the wrong kind was written to a port, or an edge joins
    /// ports of different kinds. Indicates a construction bug.
    #[error("type mismatch on port '{port}': expected {expected}, got {got}")]
    TypeMismatch {
        port: String,
        expected: ValueKind,
        got: ValueKind,
    },

    /// A parameter assignment failed validation against its declaration.
    #[error("invalid parameter '{param}' on stage '{stage}': {detail}")]
    InvalidParameter {
        stage: String,
        param: String,
        detail: String,
    },

    /// A graph description references a stage type the registry does not know.
    #[error("unknown stage type '{0}'")]
    UnknownStageType(String),

    /// A stage's compute function failed.
    #[error("stage '{stage}' failed: {message}")]
    Compute { stage: String, message: String },

    /// The frame source failed to open, seek or decode.
    #[error("frame source error at frame {frame}: {message}")]
    Source { frame: u64, message: String },

    /// A sink failed to open, write or close its resource.
    #[error("sink '{sink}' failed at frame {frame}: {message}")]
    Sink {
        sink: String,
        frame: u64,
        message: String,
    },

    /// A batch run was requested on a controller that is not idle.
    #[error("run controller is not idle")]
    NotIdle,

    /// Parameter or graph description serialization failed.
    #[error("persistence error: {0}")]
    Persist(String),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cyclic_graph_display_lists_cycle_in_order() {
        let err = PipelineError::CyclicGraph {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "cyclic graph: a -> b -> a");
    }

    #[test]
    fn sink_error_carries_frame_context() {
        let err = PipelineError::Sink {
            sink: "csv".into(),
            frame: 17,
            message: "disk full".into(),
        };
        let text = err.to_string();
        assert!(text.contains("csv"));
        assert!(text.contains("17"));
    }
}
